//! Integration tests for feature class workspaces

use std::sync::Arc;

use arrow_array::{ArrayRef, BinaryArray, Int64Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};
use featureclass_csv::{
    FeatureClass, FeatureClassWriterOptions, TempWorkspace, merge_feature_classes,
};
use ovgis_core_common::{FeatureTable, FieldType, FieldValue};

fn linestring_wkb(coords: &[(f64, f64)]) -> Vec<u8> {
    let mut bytes = vec![1_u8];
    bytes.extend_from_slice(&2_u32.to_le_bytes());
    bytes.extend_from_slice(&u32::try_from(coords.len()).unwrap().to_le_bytes());
    for (x, y) in coords {
        bytes.extend_from_slice(&x.to_le_bytes());
        bytes.extend_from_slice(&y.to_le_bytes());
    }
    bytes
}

fn segment_batch(ids: &[&str], rules: &[Option<&str>]) -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("access_restrictions", DataType::Utf8, true),
        Field::new("geometry", DataType::Binary, true),
    ]));
    let geometries: Vec<Vec<u8>> = ids
        .iter()
        .map(|_| linestring_wkb(&[(0.0, 0.0), (1.0, 1.0)]))
        .collect();

    let id_array: ArrayRef = Arc::new(StringArray::from(ids.to_vec()));
    let rule_array: ArrayRef = Arc::new(StringArray::from(rules.to_vec()));
    let geometry_array: ArrayRef = Arc::new(BinaryArray::from(
        geometries.iter().map(|g| Some(g.as_slice())).collect::<Vec<_>>(),
    ));

    RecordBatch::try_new(schema, vec![id_array, rule_array, geometry_array]).unwrap()
}

#[test]
fn test_batches_merged_into_one_feature_class() {
    let temp = TempWorkspace::new().unwrap();
    let ws = temp.workspace();
    let options = FeatureClassWriterOptions::default();

    let first = segment_batch(&["s1", "s2"], &[Some(r#"[{"access_type":"denied"}]"#), None]);
    let second = segment_batch(&["s3"], &[Some("null")]);

    let a = ws
        .write("overture_segment_0000", &first.schema(), &[first.clone()], &options)
        .unwrap();
    let b = ws
        .write("overture_segment_0001", &second.schema(), &[second], &options)
        .unwrap();

    let output = ws.feature_class_path("segments");
    let rows = merge_feature_classes(&[a, b], &output).unwrap();
    assert_eq!(rows, 3);

    let fc = FeatureClass::open(&output).unwrap();
    assert_eq!(fc.count(), 3);
    assert_eq!(
        fc.field_names(),
        vec!["id", "access_restrictions", "geometry"]
    );
    let geometry = fc.read_text("geometry").unwrap();
    assert_eq!(geometry[0].as_deref(), Some("LINESTRING(0 0,1 1)"));

    let rules = fc.read_text("access_restrictions").unwrap();
    assert_eq!(rules[0].as_deref(), Some(r#"[{"access_type":"denied"}]"#));
    assert_eq!(rules[1], None);
    assert_eq!(rules[2].as_deref(), Some("null"));
}

#[test]
fn test_header_only_feature_class_round_trip() {
    let temp = TempWorkspace::new().unwrap();
    let ws = temp.workspace();
    let schema = segment_batch(&[], &[]).schema();

    let path = ws
        .write("empty", &schema, &[], &FeatureClassWriterOptions::default())
        .unwrap();

    let fc = FeatureClass::open(&path).unwrap();
    assert_eq!(fc.count(), 0);
    assert_eq!(
        fc.field_names(),
        vec!["id", "access_restrictions", "geometry"]
    );
}

#[test]
fn test_edits_persist_after_save() {
    let temp = TempWorkspace::new().unwrap();
    let ws = temp.workspace();
    let schema = Arc::new(Schema::new(vec![Field::new("id", DataType::Int64, false)]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![Arc::new(Int64Array::from(vec![10, 20, 30]))],
    )
    .unwrap();
    let path = ws
        .write("ids", &schema, &[batch], &FeatureClassWriterOptions::default())
        .unwrap();

    let mut fc = FeatureClass::open(&path).unwrap();
    fc.add_field("access_denied", FieldType::Short).unwrap();
    for row in 0..fc.row_count() {
        fc.write_value(row, "access_denied", FieldValue::from(row == 1))
            .unwrap();
    }
    fc.save().unwrap();

    let reopened = FeatureClass::open(&path).unwrap();
    assert_eq!(
        reopened.read_text("access_denied").unwrap(),
        vec![
            Some("0".to_string()),
            Some("1".to_string()),
            Some("0".to_string())
        ]
    );
    assert_eq!(ws.list().unwrap(), vec!["ids"]);
}
