//! End-to-end tests of the conversion operations against an in-memory batch source.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::anyhow;
use arrow::buffer::{NullBuffer, OffsetBuffer};
use arrow_array::builder::{ListBuilder, StringBuilder};
use arrow_array::{
    Array, ArrayRef, BinaryArray, Float64Array, ListArray, RecordBatch, StringArray, StructArray,
};
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use async_trait::async_trait;
use datafusion::execution::SendableRecordBatchStream;
use datafusion::physical_plan::stream::RecordBatchStreamAdapter;
use featureclass_csv::FeatureClass;
use ovgis_core::error::OvertureError;
use ovgis_core::spatial::extension_name;
use ovgis_core::{
    Timeouts, add_access_restriction_fields, get_features, get_spatial_table,
};
use ovgis_core_common::{BatchRequest, BatchSource, FeatureTable};
use tempfile::TempDir;

const BBOX: [f64; 4] = [-122.9049, 47.0384, -122.8909, 47.0473];

struct MockSource {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
    fail: bool,
    calls: AtomicUsize,
}

impl MockSource {
    fn new(batches: Vec<RecordBatch>) -> Self {
        Self {
            schema: segment_schema(),
            batches,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(vec![])
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BatchSource for MockSource {
    async fn record_batches(
        &self,
        request: &BatchRequest,
    ) -> anyhow::Result<SendableRecordBatchStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(request.bbox.as_tuple(), (BBOX[0], BBOX[1], BBOX[2], BBOX[3]));
        if self.fail {
            return Err(anyhow!("connection refused"));
        }
        let batches: Vec<_> = self.batches.iter().cloned().map(Ok).collect();
        Ok(Box::pin(RecordBatchStreamAdapter::new(
            Arc::clone(&self.schema),
            futures::stream::iter(batches),
        )))
    }
}

fn linestring_wkb() -> Vec<u8> {
    let mut bytes = vec![1_u8];
    bytes.extend_from_slice(&2_u32.to_le_bytes());
    bytes.extend_from_slice(&2_u32.to_le_bytes());
    for value in [0.0_f64, 0.0, 1.0, 1.0] {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Rules per row: a heading rule, no rules, and a mode rule.
fn access_restrictions() -> ListArray {
    let mut modes = ListBuilder::new(StringBuilder::new());
    modes.append(false);
    modes.values().append_value("bicycle");
    modes.append(true);
    let modes = modes.finish();

    let when = StructArray::from(vec![
        (
            Arc::new(Field::new("heading", DataType::Utf8, true)),
            Arc::new(StringArray::from(vec![Some("backward"), None])) as ArrayRef,
        ),
        (
            Arc::new(Field::new("mode", modes.data_type().clone(), true)),
            Arc::new(modes) as ArrayRef,
        ),
    ]);
    let rules = StructArray::from(vec![
        (
            Arc::new(Field::new("access_type", DataType::Utf8, true)),
            Arc::new(StringArray::from(vec!["denied", "denied"])) as ArrayRef,
        ),
        (
            Arc::new(Field::new("when", when.data_type().clone(), true)),
            Arc::new(when) as ArrayRef,
        ),
    ]);

    ListArray::new(
        Arc::new(Field::new("element", rules.data_type().clone(), true)),
        OffsetBuffer::new(vec![0, 1, 1, 2].into()),
        Arc::new(rules),
        Some(NullBuffer::from(vec![true, false, true])),
    )
}

fn bbox_column(rows: usize) -> StructArray {
    StructArray::from(vec![
        (
            Arc::new(Field::new("xmin", DataType::Float64, true)),
            Arc::new(Float64Array::from(vec![-122.9; rows])) as ArrayRef,
        ),
        (
            Arc::new(Field::new("ymin", DataType::Float64, true)),
            Arc::new(Float64Array::from(vec![47.04; rows])) as ArrayRef,
        ),
    ])
}

fn segment_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new(
            "access_restrictions",
            access_restrictions().data_type().clone(),
            true,
        ),
        Field::new("bbox", bbox_column(0).data_type().clone(), true),
        Field::new("geometry", DataType::Binary, true),
    ]))
}

fn segment_batch() -> RecordBatch {
    let geometry = linestring_wkb();
    RecordBatch::try_new(
        segment_schema(),
        vec![
            Arc::new(StringArray::from(vec!["s1", "s2", "s3"])),
            Arc::new(access_restrictions()),
            Arc::new(bbox_column(3)),
            Arc::new(BinaryArray::from(vec![Some(geometry.as_slice()); 3])),
        ],
    )
    .unwrap()
}

fn text(values: &[&str]) -> Vec<Option<String>> {
    values.iter().map(|v| Some((*v).to_string())).collect()
}

#[tokio::test]
async fn test_invalid_type_rejected_before_fetch() {
    let source = MockSource::new(vec![segment_batch()]);
    let dir = TempDir::new().unwrap();

    let err = get_spatial_table(&source, "roads", &BBOX, Timeouts::default())
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert!(err.to_string().starts_with("Invalid overture type: roads."));

    let output = dir.path().join("roads.csv");
    let err = get_features(&source, &output, "roads", &BBOX, Timeouts::default())
        .await
        .unwrap_err();
    assert!(err.is_validation());

    assert_eq!(source.calls(), 0);
    assert!(!output.exists());
}

#[tokio::test]
async fn test_invalid_bbox_rejected_before_fetch() {
    let source = MockSource::new(vec![segment_batch()]);

    let err = get_spatial_table(&source, "segment", &[1.0, 0.0, 0.0, 1.0], Timeouts::default())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Invalid bounding box coordinates");

    let err = get_spatial_table(&source, "segment", &["a", "b", "c", "d"], Timeouts::default())
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "All coordinates in the bounding box must be numeric"
    );

    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn test_get_spatial_table_skips_empty_batches() {
    let source = MockSource::new(vec![
        RecordBatch::new_empty(segment_schema()),
        segment_batch(),
        segment_batch(),
    ]);

    let table = get_spatial_table(&source, "segment", &BBOX, Timeouts::default())
        .await
        .unwrap();

    assert_eq!(source.calls(), 1);
    assert_eq!(table.num_rows(), 6);
    assert_eq!(table.batches().len(), 2);

    let schema = table.schema();
    let rules = schema.field_with_name("access_restrictions").unwrap();
    assert_eq!(rules.data_type(), &DataType::Utf8);
    let geometry = schema.field_with_name("geometry").unwrap();
    assert_eq!(extension_name(geometry), Some("geoarrow.geometry"));
}

#[tokio::test]
async fn test_get_spatial_table_without_data_is_empty() {
    let source = MockSource::new(vec![RecordBatch::new_empty(segment_schema())]);
    let table = get_spatial_table(&source, "segment", &BBOX, Timeouts::default())
        .await
        .unwrap();
    assert!(table.is_empty());
    assert_eq!(table.schema().field(1).data_type(), &DataType::Utf8);
}

#[tokio::test]
async fn test_source_failure_is_reported() {
    let source = MockSource::failing();
    let err = get_spatial_table(&source, "segment", &BBOX, Timeouts::default())
        .await
        .unwrap_err();
    assert!(matches!(err, OvertureError::Source(_)));
    assert_eq!(
        err.to_string(),
        "Failed to fetch 'segment' data from Overture Maps: connection refused"
    );
}

#[tokio::test]
async fn test_get_features_merges_batches() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("segments.csv");
    let source = MockSource::new(vec![
        segment_batch(),
        RecordBatch::new_empty(segment_schema()),
        segment_batch(),
    ]);

    let path = get_features(&source, &output, "segment", &BBOX, Timeouts::default())
        .await
        .unwrap();
    assert_eq!(path, output);

    let fc = FeatureClass::open(&output).unwrap();
    assert_eq!(fc.count(), 6);
    assert_eq!(
        fc.field_names(),
        vec!["id", "access_restrictions", "bbox", "geometry"]
    );

    let rules = fc.read_text("access_restrictions").unwrap();
    assert_eq!(
        rules[0].as_deref(),
        Some(r#"[{"access_type":"denied","when":{"heading":"backward","mode":null}}]"#)
    );
    assert_eq!(rules[1].as_deref(), Some("null"));
    assert_eq!(
        rules[2].as_deref(),
        Some(r#"[{"access_type":"denied","when":{"heading":null,"mode":["bicycle"]}}]"#)
    );

    let bbox = fc.read_text("bbox").unwrap();
    assert_eq!(bbox[0].as_deref(), Some(r#"{"xmin":-122.9,"ymin":47.04}"#));
    let geometry = fc.read_text("geometry").unwrap();
    assert_eq!(geometry[5].as_deref(), Some("LINESTRING(0 0,1 1)"));
}

#[tokio::test]
async fn test_get_features_without_data_writes_header() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("empty.csv");
    let source = MockSource::new(vec![]);

    get_features(&source, &output, "segment", &BBOX, Timeouts::default())
        .await
        .unwrap();

    let content = std::fs::read_to_string(&output).unwrap();
    assert_eq!(content, "id,access_restrictions,bbox,geometry\n");
}

#[tokio::test]
async fn test_access_fields_on_fetched_features() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("segments.csv");
    let source = MockSource::new(vec![segment_batch()]);
    get_features(&source, &output, "segment", &BBOX, Timeouts::default())
        .await
        .unwrap();

    let summary = add_access_restriction_fields(&output, "access_restrictions").unwrap();
    assert_eq!(
        summary.keys,
        vec![
            "access_denied_when_heading_backward",
            "access_denied_when_mode_bicycle"
        ]
    );
    assert_eq!(summary.fields_added, summary.keys);
    assert_eq!(summary.rows_written, 3);

    let fc = FeatureClass::open(&output).unwrap();
    assert_eq!(
        fc.read_text("access_denied_when_heading_backward").unwrap(),
        text(&["1", "0", "0"])
    );
    assert_eq!(
        fc.read_text("access_denied_when_mode_bicycle").unwrap(),
        text(&["0", "0", "1"])
    );

    let before = std::fs::read_to_string(&output).unwrap();
    let rerun = add_access_restriction_fields(&output, "access_restrictions").unwrap();
    assert!(rerun.fields_added.is_empty());
    assert_eq!(std::fs::read_to_string(&output).unwrap(), before);
}
