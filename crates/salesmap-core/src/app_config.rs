use std::net::SocketAddr;
use std::path::PathBuf;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Where sales records are read from and appended to.
#[derive(Clone, PartialEq, Eq)]
pub enum SourceConfig {
    /// A local CSV file with a header row.
    File(PathBuf),
    /// A Google Sheets range read through the Sheets v4 values API.
    Sheets {
        spreadsheet_id: String,
        range: String,
        access_token: Option<String>,
        base_url: String,
    },
}

impl std::fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceConfig::File(path) => f.debug_tuple("File").field(path).finish(),
            SourceConfig::Sheets {
                spreadsheet_id,
                range,
                access_token,
                base_url,
            } => f
                .debug_struct("Sheets")
                .field("spreadsheet_id", spreadsheet_id)
                .field("range", range)
                .field("access_token", &access_token.as_ref().map(|_| "[redacted]"))
                .field("base_url", base_url)
                .finish(),
        }
    }
}

/// Base tile layer for the map widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TileLayer {
    /// Tile provider name (e.g. `CartoDB dark_matter`) or an XYZ URL template.
    pub name: String,
    pub attribution: String,
}

/// A GeoJSON outline drawn over the tiles, stroke only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundaryOverlay {
    pub name: String,
    pub geojson_url: String,
    pub color: String,
    pub weight: f64,
}

/// Initial viewport and base layers handed to the map widget.
#[derive(Debug, Clone, PartialEq)]
pub struct MapDefaults {
    pub center_latitude: f64,
    pub center_longitude: f64,
    pub zoom: u8,
    pub tiles: TileLayer,
    pub overlays: Vec<BoundaryOverlay>,
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub dashboard_password: Option<String>,
    pub source: SourceConfig,
    pub request_timeout_secs: u64,
    pub cache_ttl_secs: u64,
    pub auto_refresh_secs: u64,
    pub export_file_name: String,
    pub map: MapDefaults,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field(
                "dashboard_password",
                &self.dashboard_password.as_ref().map(|_| "[redacted]"),
            )
            .field("source", &self.source)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .field("auto_refresh_secs", &self.auto_refresh_secs)
            .field("export_file_name", &self.export_file_name)
            .field("map", &self.map)
            .finish()
    }
}
