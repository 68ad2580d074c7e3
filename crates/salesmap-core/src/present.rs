//! Translation from a filtered record set to renderer-agnostic draw
//! instructions: colored markers, weighted heat samples, a legend, and a
//! per-category summary.
//!
//! Every function accepts an empty record set and returns an empty (or
//! [`MapLayer::NoData`]) result rather than failing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::record::Record;

/// Colors cycled through for categories outside the fixed mapping.
pub const FALLBACK_PALETTE: [&str; 7] = [
    "cadetblue",
    "pink",
    "darkred",
    "darkblue",
    "darkgreen",
    "lightgray",
    "black",
];

/// Color for a category that has no assignment at all.
pub const UNASSIGNED_COLOR: &str = "gray";

const MIN_MARKER_RADIUS: f64 = 4.0;
const MAX_MARKER_RADIUS: f64 = 15.0;

fn fixed_color(category: &str) -> Option<&'static str> {
    match category {
        "Deli" => Some("blue"),
        "Grocery" => Some("green"),
        "Hotel" => Some("purple"),
        "Restaurant" => Some("red"),
        "Other" => Some("orange"),
        _ => None,
    }
}

/// Category → color assignment for one rendering pass.
///
/// Categories outside the fixed mapping take fallback palette colors in the
/// order they are first encountered in the records the map was built from.
/// The same category can therefore get a different fallback color on a later
/// pass if the set of unmapped categories, or their order, changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorMap {
    fallback: Vec<(String, &'static str)>,
}

impl ColorMap {
    #[must_use]
    pub fn assign(records: &[Record]) -> Self {
        let mut fallback: Vec<(String, &'static str)> = Vec::new();
        for record in records {
            let category = record.category.as_str();
            if fixed_color(category).is_some() || fallback.iter().any(|(c, _)| c == category) {
                continue;
            }
            let color = FALLBACK_PALETTE[fallback.len() % FALLBACK_PALETTE.len()];
            fallback.push((category.to_string(), color));
        }
        Self { fallback }
    }

    #[must_use]
    pub fn color_of(&self, category: &str) -> &'static str {
        fixed_color(category)
            .or_else(|| {
                self.fallback
                    .iter()
                    .find(|(c, _)| c == category)
                    .map(|(_, color)| *color)
            })
            .unwrap_or(UNASSIGNED_COLOR)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendEntry {
    pub category: String,
    pub color: String,
}

/// Legend rows for the categories present in `records`, in first-encounter order.
#[must_use]
pub fn legend(records: &[Record], colors: &ColorMap) -> Vec<LegendEntry> {
    let mut entries: Vec<LegendEntry> = Vec::new();
    for record in records {
        if entries.iter().any(|e| e.category == record.category) {
            continue;
        }
        entries.push(LegendEntry {
            category: record.category.clone(),
            color: colors.color_of(&record.category).to_string(),
        });
    }
    entries
}

/// A circle marker plus the fields shown in its popup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub latitude: f64,
    pub longitude: f64,
    pub color: String,
    pub radius: f64,
    pub name: String,
    pub sales: Option<f64>,
    pub category: String,
    pub added_by: String,
}

/// Marker radius for `sales`, scaled against the largest sales value in the set.
///
/// Falls back to the minimum radius when either value is missing or the
/// maximum is not positive.
#[must_use]
pub fn marker_radius(sales: Option<f64>, max_sales: Option<f64>) -> f64 {
    match (sales, max_sales) {
        (Some(s), Some(max)) if max > 0.0 => (s / max * MAX_MARKER_RADIUS).max(MIN_MARKER_RADIUS),
        _ => MIN_MARKER_RADIUS,
    }
}

fn max_sales(records: &[Record]) -> Option<f64> {
    records
        .iter()
        .filter_map(|r| r.sales)
        .reduce(f64::max)
}

#[must_use]
pub fn markers(records: &[Record], colors: &ColorMap) -> Vec<Marker> {
    let max = max_sales(records);
    records
        .iter()
        .map(|r| Marker {
            latitude: r.latitude,
            longitude: r.longitude,
            color: colors.color_of(&r.category).to_string(),
            radius: marker_radius(r.sales, max),
            name: r.name.clone(),
            sales: r.sales,
            category: r.category.clone(),
            added_by: r.added_by.clone(),
        })
        .collect()
}

/// One weighted point for a heatmap layer. How weights combine is up to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatSample {
    pub latitude: f64,
    pub longitude: f64,
    pub weight: f64,
}

/// Heat samples weighted by sales. Records with missing sales carry no weight
/// and are left out.
#[must_use]
pub fn heat_samples(records: &[Record]) -> Vec<HeatSample> {
    records
        .iter()
        .filter_map(|r| {
            r.sales.map(|weight| HeatSample {
                latitude: r.latitude,
                longitude: r.longitude,
                weight,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapView {
    #[default]
    Markers,
    Heatmap,
}

impl std::fmt::Display for MapView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MapView::Markers => write!(f, "markers"),
            MapView::Heatmap => write!(f, "heatmap"),
        }
    }
}

impl std::str::FromStr for MapView {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "markers" | "marker" => Ok(MapView::Markers),
            "heatmap" | "heat" => Ok(MapView::Heatmap),
            other => Err(format!("unknown map view \"{other}\"")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "items", rename_all = "snake_case")]
pub enum MapLayer {
    /// The filtered set is empty; nothing to draw.
    NoData,
    Markers(Vec<Marker>),
    Heatmap(Vec<HeatSample>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapRender {
    pub layer: MapLayer,
    pub legend: Vec<LegendEntry>,
}

/// Build the draw layer and legend for `records`.
#[must_use]
pub fn render_map(records: &[Record], view: MapView) -> MapRender {
    if records.is_empty() {
        return MapRender {
            layer: MapLayer::NoData,
            legend: Vec::new(),
        };
    }

    let colors = ColorMap::assign(records);
    let layer = match view {
        MapView::Markers => MapLayer::Markers(markers(records, &colors)),
        MapView::Heatmap => MapLayer::Heatmap(heat_samples(records)),
    };
    MapRender {
        layer,
        legend: legend(records, &colors),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: String,
    pub count: usize,
    pub total_sales: f64,
}

/// Per-category location counts and sales totals, sorted by category name.
///
/// Missing sales count toward `count` but add nothing to `total_sales`.
#[must_use]
pub fn summarize(records: &[Record]) -> Vec<CategorySummary> {
    let mut groups: BTreeMap<&str, (usize, f64)> = BTreeMap::new();
    for record in records {
        let entry = groups.entry(record.category.as_str()).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += record.sales.unwrap_or(0.0);
    }
    groups
        .into_iter()
        .map(|(category, (count, total_sales))| CategorySummary {
            category: category.to_string(),
            count,
            total_sales,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, category: &str, sales: Option<f64>) -> Record {
        Record {
            name: name.to_string(),
            latitude: 41.9,
            longitude: -87.6,
            sales,
            category: category.to_string(),
            added_by: String::new(),
            recorded_at: None,
        }
    }

    #[test]
    fn fixed_categories_keep_their_colors() {
        let colors = ColorMap::assign(&[record("a", "Hotel", None)]);
        assert_eq!(colors.color_of("Deli"), "blue");
        assert_eq!(colors.color_of("Grocery"), "green");
        assert_eq!(colors.color_of("Hotel"), "purple");
        assert_eq!(colors.color_of("Restaurant"), "red");
        assert_eq!(colors.color_of("Other"), "orange");
    }

    #[test]
    fn unseen_categories_take_fallback_colors_in_encounter_order() {
        let records = vec![
            record("a", "Bakery", Some(1.0)),
            record("b", "Deli", Some(1.0)),
            record("c", "Cafe", Some(1.0)),
            record("d", "Bakery", Some(1.0)),
        ];
        let colors = ColorMap::assign(&records);
        assert_eq!(colors.color_of("Bakery"), "cadetblue");
        assert_eq!(colors.color_of("Cafe"), "pink");
        assert_eq!(colors.color_of("Never Seen"), UNASSIGNED_COLOR);
    }

    #[test]
    fn fallback_palette_wraps_around() {
        let records: Vec<Record> = (0..9)
            .map(|i| record("x", &format!("cat-{i}"), None))
            .collect();
        let colors = ColorMap::assign(&records);
        assert_eq!(colors.color_of("cat-6"), "black");
        assert_eq!(colors.color_of("cat-7"), "cadetblue");
        assert_eq!(colors.color_of("cat-8"), "pink");
    }

    #[test]
    fn fallback_colors_follow_encounter_order_across_passes() {
        let first = ColorMap::assign(&[record("a", "Bakery", None), record("b", "Cafe", None)]);
        let second = ColorMap::assign(&[record("b", "Cafe", None), record("a", "Bakery", None)]);
        assert_eq!(first.color_of("Bakery"), "cadetblue");
        assert_eq!(second.color_of("Bakery"), "pink");
    }

    #[test]
    fn marker_radius_scales_linearly_with_floor() {
        assert!((marker_radius(Some(300.0), Some(300.0)) - 15.0).abs() < 1e-9);
        assert!((marker_radius(Some(150.0), Some(300.0)) - 7.5).abs() < 1e-9);
        assert!((marker_radius(Some(10.0), Some(300.0)) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn marker_radius_never_divides_by_zero() {
        assert!((marker_radius(Some(0.0), Some(0.0)) - 4.0).abs() < 1e-9);
        assert!((marker_radius(None, Some(100.0)) - 4.0).abs() < 1e-9);
        assert!((marker_radius(Some(5.0), None) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn markers_for_empty_set_is_empty() {
        assert!(markers(&[], &ColorMap::default()).is_empty());
    }

    #[test]
    fn markers_with_all_zero_sales_use_minimum_radius() {
        let records = vec![record("a", "Deli", Some(0.0)), record("b", "Deli", Some(0.0))];
        let drawn = markers(&records, &ColorMap::assign(&records));
        assert!(drawn.iter().all(|m| (m.radius - 4.0).abs() < 1e-9));
        assert!(drawn.iter().all(|m| m.color == "blue"));
    }

    #[test]
    fn render_map_on_empty_set_is_no_data() {
        let render = render_map(&[], MapView::Heatmap);
        assert_eq!(render.layer, MapLayer::NoData);
        assert!(render.legend.is_empty());
    }

    #[test]
    fn render_map_heatmap_skips_missing_sales() {
        let records = vec![record("a", "Deli", Some(50.0)), record("b", "Cafe", None)];
        let render = render_map(&records, MapView::Heatmap);
        let MapLayer::Heatmap(samples) = render.layer else {
            panic!("expected heatmap layer");
        };
        assert_eq!(samples.len(), 1);
        assert!((samples[0].weight - 50.0).abs() < 1e-9);
        assert_eq!(
            render.legend,
            vec![
                LegendEntry {
                    category: "Deli".into(),
                    color: "blue".into()
                },
                LegendEntry {
                    category: "Cafe".into(),
                    color: "cadetblue".into()
                },
            ]
        );
    }

    #[test]
    fn map_layer_serializes_with_kind_tag() {
        let json = serde_json::to_value(MapLayer::NoData).unwrap();
        assert_eq!(json["kind"], "no_data");
    }

    #[test]
    fn map_view_parses_from_query_values() {
        assert_eq!("Heatmap".parse::<MapView>(), Ok(MapView::Heatmap));
        assert_eq!("markers".parse::<MapView>(), Ok(MapView::Markers));
        assert!("globe".parse::<MapView>().is_err());
    }

    #[test]
    fn summarize_groups_alphabetically() {
        let records = vec![
            record("a", "Restaurant", Some(10.0)),
            record("b", "Deli", Some(5.0)),
            record("c", "Restaurant", None),
            record("d", "Bakery", Some(2.5)),
        ];
        let summary = summarize(&records);
        let categories: Vec<&str> = summary.iter().map(|s| s.category.as_str()).collect();
        assert_eq!(categories, vec!["Bakery", "Deli", "Restaurant"]);
        assert_eq!(summary[2].count, 2);
        assert!((summary[2].total_sales - 10.0).abs() < 1e-9);
    }

    #[test]
    fn summarize_totals_match_the_record_set() {
        let records = vec![
            record("a", "Deli", Some(100.0)),
            record("b", "Grocery", Some(200.0)),
            record("c", "Deli", None),
            record("d", "Cafe", Some(0.5)),
        ];
        let summary = summarize(&records);
        let count: usize = summary.iter().map(|s| s.count).sum();
        let total: f64 = summary.iter().map(|s| s.total_sales).sum();
        let expected: f64 = records.iter().filter_map(|r| r.sales).sum();
        assert_eq!(count, records.len());
        assert!((total - expected).abs() < 1e-9);
    }

    #[test]
    fn summarize_empty_set_is_empty() {
        assert!(summarize(&[]).is_empty());
    }
}
