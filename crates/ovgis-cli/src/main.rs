//! Command-line interface for `ovgis`, which turns Overture Maps data into GIS-ready tables.
//!
//! This binary provides a thin CLI over the [`ovgis_core`] library: it parses arguments,
//! configures logging, and delegates to command handlers.
//!
//! # Available Commands
//!
//! - `table` - Fetch features into an in-memory spatial table and describe it
//! - `features` - Fetch features into a feature class
//! - `access-fields` - Add boolean access restriction fields to a feature class
//! - `types` - List the Overture feature types
//! - `releases` - List the published Overture releases

mod display;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::{Level, info, warn};
use tracing_log::LogTracer;
use tracing_subscriber::FmtSubscriber;

use ovgis_core::materialize::ACCESS_RESTRICTIONS_COLUMN;
use ovgis_core::{
    FetchOptions, OvertureError, OvertureSource, Timeouts, add_access_restriction_fields,
    get_features, get_release_list, get_spatial_table,
};
use ovgis_core_common::overture::overture_types;

use crate::display::{display_summary, display_table_info, display_types};

#[derive(Parser)]
#[command(
    name = "ovgis",
    version,
    about = "Fetch Overture Maps data as GIS-ready tables",
    long_about = "ovgis reads Overture Maps GeoParquet releases for a bounding box and writes\n\
                  spatial tables and feature classes with flat, GIS-compatible attributes."
)]
/// Command-line arguments and options for the `ovgis` CLI.
struct Cli {
    /// Enable verbose (INFO level) logging output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug (DEBUG level) logging output with detailed diagnostics.
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Arguments selecting what to fetch.
#[derive(Args, Debug, Clone)]
struct FetchArgs {
    /// Overture feature type (see `ovgis types`).
    #[arg(short = 't', long = "type", value_name = "TYPE")]
    overture_type: String,

    /// Bounding box as minx,miny,maxx,maxy in EPSG:4326.
    #[arg(short, long, value_name = "BBOX", allow_hyphen_values = true)]
    bbox: String,

    /// Release to read (defaults to the latest).
    #[arg(long, value_name = "RELEASE")]
    release: Option<String>,

    /// Connection timeout in seconds.
    #[arg(long, value_name = "SECS")]
    connect_timeout: Option<u64>,

    /// Request timeout in seconds.
    #[arg(long, value_name = "SECS")]
    request_timeout: Option<u64>,
}

impl FetchArgs {
    fn bbox_values(&self) -> Vec<&str> {
        self.bbox.split(',').map(str::trim).collect()
    }

    fn timeouts(&self) -> Timeouts {
        Timeouts {
            connect: self.connect_timeout.map(Duration::from_secs),
            request: self.request_timeout.map(Duration::from_secs),
        }
    }

    fn source(&self) -> OvertureSource {
        let mut options = FetchOptions::default();
        if let Some(release) = &self.release {
            options = options.with_release(release.clone());
        }
        OvertureSource::new(options)
    }
}

/// Available subcommands for the `ovgis` CLI.
#[derive(Subcommand)]
enum Commands {
    /// Fetches features into a spatial table and prints its schema.
    Table {
        #[command(flatten)]
        fetch: FetchArgs,
    },

    /// Fetches features into a feature class.
    Features {
        /// Path of the feature class to create.
        #[arg(short, long, value_name = "PATH")]
        output: PathBuf,

        #[command(flatten)]
        fetch: FetchArgs,

        /// Add boolean access restriction fields (segments only).
        #[arg(long)]
        access_fields: bool,
    },

    /// Adds boolean access restriction fields to an existing feature class.
    AccessFields {
        /// Path of the feature class to update.
        #[arg(short, long, value_name = "PATH")]
        input: PathBuf,

        /// Column holding the serialized access restriction rules.
        #[arg(long, default_value = ACCESS_RESTRICTIONS_COLUMN)]
        column: String,
    },

    /// Lists the Overture feature types and their themes.
    Types,

    /// Lists the published Overture releases.
    Releases {
        /// Connection timeout in seconds.
        #[arg(long, value_name = "SECS")]
        connect_timeout: Option<u64>,

        /// Request timeout in seconds.
        #[arg(long, value_name = "SECS")]
        request_timeout: Option<u64>,
    },
}

/// Entry point for the `ovgis` command-line interface.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = init_logging(cli.verbose, cli.debug) {
        eprintln!("Error: failed to initialize logging: {err}");
        return ExitCode::FAILURE;
    }

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        },
    }
}

fn init_logging(verbose: bool, debug: bool) -> Result<()> {
    let log_level = if debug {
        Level::DEBUG
    } else if verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    // Bridge logs from the `log` crate to the `tracing` ecosystem.
    LogTracer::init()?;

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn report(err: &anyhow::Error) {
    match err.downcast_ref::<OvertureError>() {
        Some(err) => {
            eprintln!("Error: {}", err.user_message());
            if let Some(hint) = err.recovery_suggestion() {
                eprintln!("\nHint: {hint}");
            }
        },
        None => eprintln!("Error: {err:#}"),
    }
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Table { fetch } => handle_table(&fetch).await,
        Commands::Features {
            output,
            fetch,
            access_fields,
        } => handle_features(&output, &fetch, access_fields).await,
        Commands::AccessFields { input, column } => handle_access_fields(&input, &column),
        Commands::Types => {
            display_types(overture_types());
            Ok(())
        },
        Commands::Releases {
            connect_timeout,
            request_timeout,
        } => {
            let options = FetchOptions::default()
                .with_connect_timeout(connect_timeout.map(Duration::from_secs))
                .with_request_timeout(request_timeout.map(Duration::from_secs));
            handle_releases(&options).await
        },
    }
}

async fn handle_table(fetch: &FetchArgs) -> Result<()> {
    info!("Fetching '{}' within {}", fetch.overture_type, fetch.bbox);
    let table = get_spatial_table(
        &fetch.source(),
        &fetch.overture_type,
        &fetch.bbox_values(),
        fetch.timeouts(),
    )
    .await?;

    display_table_info(&table.info(&fetch.overture_type));
    Ok(())
}

async fn handle_features(output: &Path, fetch: &FetchArgs, access_fields: bool) -> Result<()> {
    info!(
        "Fetching '{}' within {} into {}",
        fetch.overture_type,
        fetch.bbox,
        output.display()
    );
    let path = get_features(
        &fetch.source(),
        output,
        &fetch.overture_type,
        &fetch.bbox_values(),
        fetch.timeouts(),
    )
    .await?;

    if access_fields {
        if fetch.overture_type == "segment" {
            let summary = add_access_restriction_fields(&path, ACCESS_RESTRICTIONS_COLUMN)?;
            display_summary(&summary);
        } else {
            warn!(
                "Access restriction fields only apply to segments, skipping for '{}'",
                fetch.overture_type
            );
        }
    }

    println!("Created feature class: {}", path.display());
    Ok(())
}

fn handle_access_fields(input: &Path, column: &str) -> Result<()> {
    info!("Adding access restriction fields to {}", input.display());
    let summary = add_access_restriction_fields(input, column)?;
    display_summary(&summary);
    Ok(())
}

async fn handle_releases(options: &FetchOptions) -> Result<()> {
    let releases = get_release_list(options).await?;
    println!("\nOverture Releases ({} total):\n", releases.len());
    let latest = releases.last().cloned();
    for release in &releases {
        if Some(release) == latest.as_ref() {
            println!("  {release} (latest)");
        } else {
            println!("  {release}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fetch_args(overture_type: &str, bbox: &str) -> FetchArgs {
        FetchArgs {
            overture_type: overture_type.to_string(),
            bbox: bbox.to_string(),
            release: Some("2025-01-22.0".to_string()),
            connect_timeout: Some(5),
            request_timeout: None,
        }
    }

    #[test]
    fn test_cli_parses_features() {
        let cli = Cli::parse_from([
            "ovgis",
            "features",
            "--output",
            "roads.csv",
            "--type",
            "segment",
            "--bbox",
            "-122.9049,47.0384,-122.8909,47.0473",
            "--access-fields",
        ]);
        match cli.command {
            Commands::Features {
                output,
                fetch,
                access_fields,
            } => {
                assert_eq!(output, PathBuf::from("roads.csv"));
                assert_eq!(fetch.overture_type, "segment");
                assert_eq!(fetch.bbox_values().len(), 4);
                assert!(access_fields);
            },
            _ => panic!("expected the features command"),
        }
    }

    #[test]
    fn test_fetch_args_timeouts() {
        let args = fetch_args("place", "1,2,3,4");
        assert_eq!(args.timeouts().connect, Some(Duration::from_secs(5)));
        assert_eq!(args.timeouts().request, None);
        assert_eq!(
            args.source().options().release.as_deref(),
            Some("2025-01-22.0")
        );
        assert_eq!(args.bbox_values(), vec!["1", "2", "3", "4"]);
    }

    #[tokio::test]
    async fn test_handle_table_invalid_type() {
        let err = handle_table(&fetch_args("roads", "1,2,3,4"))
            .await
            .unwrap_err();
        let err = err.downcast_ref::<OvertureError>().unwrap();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_handle_features_invalid_bbox() {
        let dir = tempfile::TempDir::new().unwrap();
        let output = dir.path().join("places.csv");
        let err = handle_features(&output, &fetch_args("place", "1,2,x,4"), false)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "All coordinates in the bounding box must be numeric"
        );
        assert!(!output.exists());
    }

    #[test]
    fn test_handle_access_fields() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("segments.csv");
        fs::write(
            &input,
            "id,access_restrictions\ns1,\"[{\"\"access_type\"\":\"\"denied\"\"}]\"\ns2,null\n",
        )
        .unwrap();

        handle_access_fields(&input, ACCESS_RESTRICTIONS_COLUMN).unwrap();
        let content = fs::read_to_string(&input).unwrap();
        assert!(content.starts_with("id,access_restrictions,access_denied\n"));
        assert!(content.ends_with("s2,null,0\n"));
    }
}
