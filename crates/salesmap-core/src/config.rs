use crate::app_config::{
    AppConfig, BoundaryOverlay, Environment, MapDefaults, SourceConfig, TileLayer,
};
use crate::ConfigError;

const DEFAULT_SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/";
const DEFAULT_MAP_TILES: &str = "CartoDB dark_matter|CartoDB Dark Matter";
const DEFAULT_MAP_OVERLAYS: &str = "Chicago Boundary|https://data.cityofchicago.org/resource/ewy2-6yfk.geojson|white|2;\
     Neighborhoods|https://raw.githubusercontent.com/blackmad/neighborhoods/master/chicago.geojson|lightgray|1";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can drive it with a
/// plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    // Blank values are treated the same as unset ones.
    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let env = parse_environment(&or_default("SALESMAP_ENV", "development"));

    let bind_addr = or_default("SALESMAP_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("SALESMAP_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("SALESMAP_LOG_LEVEL", "info");
    let dashboard_password = optional("SALESMAP_DASHBOARD_PASSWORD");

    let source = if let Some(path) = optional("SALESMAP_RECORDS_FILE") {
        SourceConfig::File(PathBuf::from(path))
    } else {
        let spreadsheet_id = optional("SALESMAP_SHEET_ID")
            .ok_or_else(|| ConfigError::MissingEnvVar("SALESMAP_SHEET_ID".to_string()))?;
        SourceConfig::Sheets {
            spreadsheet_id,
            range: or_default("SALESMAP_SHEET_RANGE", "Sheet1"),
            access_token: optional("SALESMAP_SHEETS_ACCESS_TOKEN"),
            base_url: or_default("SALESMAP_SHEETS_BASE_URL", DEFAULT_SHEETS_BASE_URL),
        }
    };

    let request_timeout_secs = parse_u64("SALESMAP_REQUEST_TIMEOUT_SECS", "30")?;
    let cache_ttl_secs = parse_u64("SALESMAP_CACHE_TTL_SECS", "60")?;
    let auto_refresh_secs = parse_u64("SALESMAP_AUTO_REFRESH_SECS", "0")?;
    let export_file_name = or_default("SALESMAP_EXPORT_FILE_NAME", "chicago_sales.csv");

    let (center_latitude, center_longitude) =
        parse_map_center(&or_default("SALESMAP_MAP_CENTER", "41.8781,-87.6298"))
            .map_err(|reason| invalid("SALESMAP_MAP_CENTER", reason))?;
    let zoom = or_default("SALESMAP_MAP_ZOOM", "11")
        .parse::<u8>()
        .map_err(|e| invalid("SALESMAP_MAP_ZOOM", e.to_string()))?;
    let tiles = parse_tile_layer(
        &optional("SALESMAP_MAP_TILES").unwrap_or_else(|| DEFAULT_MAP_TILES.to_string()),
    );
    let overlays = parse_overlays(
        &optional("SALESMAP_MAP_OVERLAYS").unwrap_or_else(|| DEFAULT_MAP_OVERLAYS.to_string()),
    )
    .map_err(|reason| invalid("SALESMAP_MAP_OVERLAYS", reason))?;

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        dashboard_password,
        source,
        request_timeout_secs,
        cache_ttl_secs,
        auto_refresh_secs,
        export_file_name,
        map: MapDefaults {
            center_latitude,
            center_longitude,
            zoom,
            tiles,
            overlays,
        },
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

/// Parse a `"lat,lng"` pair.
fn parse_map_center(raw: &str) -> Result<(f64, f64), String> {
    let (lat, lng) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected \"lat,lng\", got \"{raw}\""))?;
    let lat = lat.trim().parse::<f64>().map_err(|e| e.to_string())?;
    let lng = lng.trim().parse::<f64>().map_err(|e| e.to_string())?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(format!("coordinates out of range: {lat},{lng}"));
    }
    Ok((lat, lng))
}

/// Parse `"name|attribution"`; a bare name is its own attribution.
fn parse_tile_layer(raw: &str) -> TileLayer {
    let (name, attribution) = raw.split_once('|').unwrap_or((raw, raw));
    TileLayer {
        name: name.trim().to_string(),
        attribution: attribution.trim().to_string(),
    }
}

/// Parse `;`-separated `"name|geojson_url|color|weight"` entries. `none`
/// disables overlays.
fn parse_overlays(raw: &str) -> Result<Vec<BoundaryOverlay>, String> {
    if raw.trim().eq_ignore_ascii_case("none") {
        return Ok(Vec::new());
    }
    raw.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let parts: Vec<&str> = entry.split('|').map(str::trim).collect();
            let [name, geojson_url, color, weight] = parts.as_slice() else {
                return Err(format!("expected \"name|url|color|weight\", got \"{entry}\""));
            };
            let weight = weight
                .parse::<f64>()
                .ok()
                .filter(|w| w.is_finite() && *w >= 0.0)
                .ok_or_else(|| format!("invalid stroke weight \"{weight}\""))?;
            Ok(BoundaryOverlay {
                name: (*name).to_string(),
                geojson_url: (*geojson_url).to_string(),
                color: (*color).to_string(),
                weight,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::env::VarError;
    use std::path::PathBuf;

    use super::*;

    fn lookup_from_map<'a>(
        map: &'a HashMap<&'a str, &'a str>,
    ) -> impl Fn(&str) -> Result<String, VarError> + 'a {
        move |key| {
            map.get(key)
                .map(|v| (*v).to_string())
                .ok_or(VarError::NotPresent)
        }
    }

    /// Returns a map with the minimum env vars for a Sheets-backed config.
    fn sheets_env<'a>() -> HashMap<&'a str, &'a str> {
        let mut m = HashMap::new();
        m.insert("SALESMAP_SHEET_ID", "sheet-123");
        m
    }

    #[test]
    fn parse_environment_production() {
        assert_eq!(parse_environment("production"), Environment::Production);
    }

    #[test]
    fn parse_environment_test() {
        assert_eq!(parse_environment("test"), Environment::Test);
    }

    #[test]
    fn parse_environment_unknown_defaults_to_development() {
        assert_eq!(parse_environment("staging"), Environment::Development);
    }

    #[test]
    fn build_app_config_fails_without_any_source() {
        let map: HashMap<&str, &str> = HashMap::new();
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "SALESMAP_SHEET_ID"),
            "expected MissingEnvVar(SALESMAP_SHEET_ID), got: {result:?}"
        );
    }

    #[test]
    fn build_app_config_blank_sheet_id_counts_as_missing() {
        let mut map = HashMap::new();
        map.insert("SALESMAP_SHEET_ID", "   ");
        let result = build_app_config(lookup_from_map(&map));
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(_))));
    }

    #[test]
    fn build_app_config_defaults_with_sheets_source() {
        let map = sheets_env();
        let cfg = build_app_config(lookup_from_map(&map)).expect("config should build");
        assert_eq!(cfg.env, Environment::Development);
        assert_eq!(cfg.bind_addr.to_string(), "0.0.0.0:3000");
        assert_eq!(cfg.log_level, "info");
        assert!(cfg.dashboard_password.is_none());
        assert_eq!(cfg.request_timeout_secs, 30);
        assert_eq!(cfg.cache_ttl_secs, 60);
        assert_eq!(cfg.auto_refresh_secs, 0);
        assert_eq!(cfg.export_file_name, "chicago_sales.csv");
        assert_eq!(cfg.map.zoom, 11);
        assert!((cfg.map.center_latitude - 41.8781).abs() < 1e-9);
        assert_eq!(
            cfg.source,
            SourceConfig::Sheets {
                spreadsheet_id: "sheet-123".to_string(),
                range: "Sheet1".to_string(),
                access_token: None,
                base_url: DEFAULT_SHEETS_BASE_URL.to_string(),
            }
        );
    }

    #[test]
    fn build_app_config_records_file_takes_precedence() {
        let mut map = sheets_env();
        map.insert("SALESMAP_RECORDS_FILE", "./data/sales.csv");
        let cfg = build_app_config(lookup_from_map(&map)).unwrap();
        assert_eq!(
            cfg.source,
            SourceConfig::File(PathBuf::from("./data/sales.csv"))
        );
    }

    #[test]
    fn build_app_config_records_file_without_sheet_id() {
        let mut map = HashMap::new();
        map.insert("SALESMAP_RECORDS_FILE", "sales.csv");
        assert!(build_app_config(lookup_from_map(&map)).is_ok());
    }

    #[test]
    fn build_app_config_fails_with_invalid_bind_addr() {
        let mut map = sheets_env();
        map.insert("SALESMAP_BIND_ADDR", "not-a-socket-addr");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "SALESMAP_BIND_ADDR"),
            "expected InvalidEnvVar(SALESMAP_BIND_ADDR), got: {result:?}"
        );
    }

    #[test]
    fn build_app_config_cache_ttl_override() {
        let mut map = sheets_env();
        map.insert("SALESMAP_CACHE_TTL_SECS", "300");
        let cfg = build_app_config(lookup_from_map(&map)).unwrap();
        assert_eq!(cfg.cache_ttl_secs, 300);
    }

    #[test]
    fn build_app_config_cache_ttl_invalid() {
        let mut map = sheets_env();
        map.insert("SALESMAP_CACHE_TTL_SECS", "a minute");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "SALESMAP_CACHE_TTL_SECS"),
            "expected InvalidEnvVar(SALESMAP_CACHE_TTL_SECS), got: {result:?}"
        );
    }

    #[test]
    fn build_app_config_auto_refresh_override() {
        let mut map = sheets_env();
        map.insert("SALESMAP_AUTO_REFRESH_SECS", "30");
        let cfg = build_app_config(lookup_from_map(&map)).unwrap();
        assert_eq!(cfg.auto_refresh_secs, 30);
    }

    #[test]
    fn build_app_config_reads_password_and_token() {
        let mut map = sheets_env();
        map.insert("SALESMAP_DASHBOARD_PASSWORD", "hunter2");
        map.insert("SALESMAP_SHEETS_ACCESS_TOKEN", "ya29.token");
        let cfg = build_app_config(lookup_from_map(&map)).unwrap();
        assert_eq!(cfg.dashboard_password.as_deref(), Some("hunter2"));
        let debug = format!("{cfg:?}");
        assert!(!debug.contains("hunter2"), "password leaked: {debug}");
        assert!(!debug.contains("ya29.token"), "token leaked: {debug}");
    }

    #[test]
    fn build_app_config_map_center_invalid() {
        let mut map = sheets_env();
        map.insert("SALESMAP_MAP_CENTER", "41.8");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "SALESMAP_MAP_CENTER"),
            "expected InvalidEnvVar(SALESMAP_MAP_CENTER), got: {result:?}"
        );
    }

    #[test]
    fn build_app_config_map_layers_default_to_chicago() {
        let map = sheets_env();
        let cfg = build_app_config(lookup_from_map(&map)).unwrap();
        assert_eq!(cfg.map.tiles.name, "CartoDB dark_matter");
        assert_eq!(cfg.map.tiles.attribution, "CartoDB Dark Matter");

        let names: Vec<&str> = cfg.map.overlays.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["Chicago Boundary", "Neighborhoods"]);
        assert_eq!(
            cfg.map.overlays[0].geojson_url,
            "https://data.cityofchicago.org/resource/ewy2-6yfk.geojson"
        );
        assert_eq!(cfg.map.overlays[0].color, "white");
        assert!((cfg.map.overlays[1].weight - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn build_app_config_map_layers_overridable() {
        let mut map = sheets_env();
        map.insert("SALESMAP_MAP_TILES", "OpenStreetMap");
        map.insert("SALESMAP_MAP_OVERLAYS", "none");
        let cfg = build_app_config(lookup_from_map(&map)).unwrap();
        assert_eq!(cfg.map.tiles.name, "OpenStreetMap");
        assert_eq!(cfg.map.tiles.attribution, "OpenStreetMap");
        assert!(cfg.map.overlays.is_empty());
    }

    #[test]
    fn build_app_config_malformed_overlay_is_invalid() {
        let mut map = sheets_env();
        map.insert("SALESMAP_MAP_OVERLAYS", "Wards|https://x.test/wards.geojson|red");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "SALESMAP_MAP_OVERLAYS"),
            "expected InvalidEnvVar for SALESMAP_MAP_OVERLAYS, got: {result:?}"
        );
    }

    #[test]
    fn parse_overlays_reads_multiple_entries() {
        let overlays =
            parse_overlays("A|https://a.test/a.geojson|blue|1.5; B|https://b.test/b.geojson|red|3")
                .unwrap();
        assert_eq!(overlays.len(), 2);
        assert_eq!(overlays[1].name, "B");
        assert!((overlays[0].weight - 1.5).abs() < f64::EPSILON);
        assert!(parse_overlays("A|u|c|heavy").is_err());
    }

    #[test]
    fn parse_map_center_rejects_out_of_range() {
        assert!(parse_map_center("91.0,0.0").is_err());
        assert_eq!(parse_map_center(" 40.5 , -73.9 "), Ok((40.5, -73.9)));
    }
}
