pub mod app_config;
pub mod config;
pub mod export;
pub mod filter;
pub mod ingest;
pub mod present;
pub mod record;
pub mod submission;

mod error;

pub use app_config::{
    AppConfig, BoundaryOverlay, Environment, MapDefaults, SourceConfig, TileLayer,
};
pub use config::{load_app_config, load_app_config_from_env};
pub use error::{ConfigError, ExportError, SubmissionError};
pub use export::{to_csv_bytes, write_csv};
pub use filter::{apply_filters, DateRange, FilterQuery, FilterState, SalesRange};
pub use ingest::{ingest, Ingestion};
pub use present::{
    render_map, summarize, CategorySummary, ColorMap, HeatSample, LegendEntry, MapLayer,
    MapRender, MapView, Marker,
};
pub use record::{Column, Record, KNOWN_CATEGORIES};
pub use submission::{NewRecord, SubmissionForm};
