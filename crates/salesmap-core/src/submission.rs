//! Validation of user-submitted records before they reach a record source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SubmissionError;
use crate::record::{parse_number, Column, KNOWN_CATEGORIES};

/// Raw input from the "add a location" form.
///
/// Coordinates arrive as text, exactly as typed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmissionForm {
    pub name: String,
    pub latitude: String,
    pub longitude: String,
    pub sales: f64,
    pub category: String,
    #[serde(default)]
    pub added_by: Option<String>,
}

/// A validated record ready to be appended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewRecord {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub sales: f64,
    pub category: String,
    pub added_by: String,
}

impl SubmissionForm {
    /// Check the form and produce a [`NewRecord`].
    ///
    /// # Errors
    ///
    /// - [`SubmissionError::MissingField`] for a blank name, latitude or longitude.
    /// - [`SubmissionError::InvalidCoordinate`] when a coordinate is not a finite number.
    /// - [`SubmissionError::NonPositiveSales`] when sales is zero, negative or not finite.
    /// - [`SubmissionError::UnknownCategory`] for a category outside [`KNOWN_CATEGORIES`].
    pub fn validate(&self) -> Result<NewRecord, SubmissionError> {
        let name = required("name", &self.name)?;
        let latitude = coordinate("latitude", &self.latitude)?;
        let longitude = coordinate("longitude", &self.longitude)?;

        if !(self.sales.is_finite() && self.sales > 0.0) {
            return Err(SubmissionError::NonPositiveSales(self.sales));
        }

        let category = self.category.trim();
        if !KNOWN_CATEGORIES.contains(&category) {
            return Err(SubmissionError::UnknownCategory(category.to_string()));
        }

        Ok(NewRecord {
            name,
            latitude,
            longitude,
            sales: self.sales,
            category: category.to_string(),
            added_by: self
                .added_by
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .to_string(),
        })
    }
}

fn required(field: &'static str, value: &str) -> Result<String, SubmissionError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(SubmissionError::MissingField(field));
    }
    Ok(value.to_string())
}

fn coordinate(field: &'static str, value: &str) -> Result<f64, SubmissionError> {
    let raw = required(field, value)?;
    parse_number(&raw).ok_or(SubmissionError::InvalidCoordinate { field, value: raw })
}

impl NewRecord {
    /// The timestamp cell written alongside a new row: naive UTC ISO-8601
    /// with microseconds.
    #[must_use]
    pub fn timestamp_cell(recorded_at: DateTime<Utc>) -> String {
        recorded_at
            .naive_utc()
            .format("%Y-%m-%dT%H:%M:%S%.6f")
            .to_string()
    }

    /// Cells in canonical [`Column::ALL`] order.
    #[must_use]
    pub fn to_row(&self, recorded_at: DateTime<Utc>) -> Vec<String> {
        Column::ALL
            .iter()
            .map(|column| match column {
                Column::Name => self.name.clone(),
                Column::Latitude => self.latitude.to_string(),
                Column::Longitude => self.longitude.to_string(),
                Column::Sales => self.sales.to_string(),
                Column::Category => self.category.clone(),
                Column::AddedBy => self.added_by.clone(),
                Column::Timestamp => Self::timestamp_cell(recorded_at),
            })
            .collect()
    }
}
