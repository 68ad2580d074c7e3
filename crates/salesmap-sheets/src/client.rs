//! HTTP client for the Google Sheets v4 values API.
//!
//! Reads the configured range with unformatted values (so currency or
//! number formatting in the sheet does not leak into numeric cells) and
//! appends rows with `valueInputOption=RAW` so timestamps stay ISO-8601 text.

use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use salesmap_core::NewRecord;
use serde_json::Value;

use crate::error::SourceError;
use crate::source::RecordSource;
use crate::types::{cell_text, AppendBody, ErrorEnvelope, ValueRange};

const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com/";

/// Client for one spreadsheet range.
///
/// Use [`SheetsClient::new`] for production or [`SheetsClient::with_base_url`]
/// to point at a mock server in tests.
pub struct SheetsClient {
    client: Client,
    base_url: Url,
    spreadsheet_id: String,
    range: String,
    access_token: Option<String>,
}

impl SheetsClient {
    /// Creates a client pointed at the production Sheets API.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Unavailable`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        spreadsheet_id: &str,
        range: &str,
        access_token: Option<&str>,
        timeout_secs: u64,
    ) -> Result<Self, SourceError> {
        Self::with_base_url(
            spreadsheet_id,
            range,
            access_token,
            timeout_secs,
            DEFAULT_BASE_URL,
        )
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Unavailable`] if the HTTP client cannot be
    /// constructed or `base_url` is not a usable URL.
    pub fn with_base_url(
        spreadsheet_id: &str,
        range: &str,
        access_token: Option<&str>,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("salesmap/0.1 (sales-dashboard)")
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised)
            .ok()
            .filter(|u| !u.cannot_be_a_base())
            .ok_or_else(|| SourceError::Unavailable(format!("invalid base URL '{base_url}'")))?;

        Ok(Self {
            client,
            base_url,
            spreadsheet_id: spreadsheet_id.to_owned(),
            range: range.to_owned(),
            access_token: access_token.map(ToOwned::to_owned),
        })
    }

    /// Builds `{base}/v4/spreadsheets/{id}/values/{range}{suffix}`.
    fn values_url(&self, suffix: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push("v4")
                .push("spreadsheets")
                .push(&self.spreadsheet_id)
                .push("values")
                .push(&format!("{}{suffix}", self.range));
        }
        url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Fetches every row of the range, header first.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Unavailable`] on network failure, any non-2xx
    /// status, or an undecodable body.
    pub async fn get_values(&self) -> Result<Vec<Vec<String>>, SourceError> {
        let mut url = self.values_url("");
        url.query_pairs_mut()
            .append_pair("majorDimension", "ROWS")
            .append_pair("valueRenderOption", "UNFORMATTED_VALUE")
            .append_pair("dateTimeRenderOption", "FORMATTED_STRING");

        let response = self.authorize(self.client.get(url)).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SourceError::Unavailable(describe_failure(status, &body)));
        }

        let range: ValueRange = serde_json::from_str(&body).map_err(|e| {
            SourceError::Unavailable(format!("undecodable values response: {e}"))
        })?;

        Ok(range
            .values
            .iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect())
    }

    /// Appends one row in canonical column order.
    ///
    /// # Errors
    ///
    /// - [`SourceError::Unavailable`] on network failure, auth failure, or 5xx.
    /// - [`SourceError::Rejected`] when the API refuses the write (quota, 4xx).
    pub async fn append_row(
        &self,
        record: &NewRecord,
        recorded_at: DateTime<Utc>,
    ) -> Result<(), SourceError> {
        let mut url = self.values_url(":append");
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");

        let body = AppendBody {
            values: vec![vec![
                Value::from(record.name.clone()),
                Value::from(record.latitude),
                Value::from(record.longitude),
                Value::from(record.sales),
                Value::from(record.category.clone()),
                Value::from(record.added_by.clone()),
                Value::from(NewRecord::timestamp_cell(recorded_at)),
            ]],
        };

        let response = self
            .authorize(self.client.post(url))
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let text = response.text().await.unwrap_or_default();
        Err(classify_write_failure(status, &text))
    }
}

impl RecordSource for SheetsClient {
    fn describe(&self) -> String {
        format!("google-sheets:{}/{}", self.spreadsheet_id, self.range)
    }

    fn fetch_all(&self) -> BoxFuture<'_, Result<Vec<Vec<String>>, SourceError>> {
        self.get_values().boxed()
    }

    fn append<'a>(
        &'a self,
        record: &'a NewRecord,
        recorded_at: DateTime<Utc>,
    ) -> BoxFuture<'a, Result<(), SourceError>> {
        self.append_row(record, recorded_at).boxed()
    }
}

/// Map a failed write to the error taxonomy.
///
/// Auth, missing-sheet, timeout, and server errors mean the source could not
/// be used at all; every other refusal (quota, malformed request) is a
/// rejection of this particular write.
fn classify_write_failure(status: StatusCode, body: &str) -> SourceError {
    let reason = describe_failure(status, body);
    match status {
        StatusCode::UNAUTHORIZED
        | StatusCode::FORBIDDEN
        | StatusCode::NOT_FOUND
        | StatusCode::REQUEST_TIMEOUT => SourceError::Unavailable(reason),
        s if s.is_server_error() => SourceError::Unavailable(reason),
        _ => SourceError::Rejected(reason),
    }
}

fn describe_failure(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => match envelope.error.status {
            Some(code) => format!("HTTP {status} ({code}): {}", envelope.error.message),
            None => format!("HTTP {status}: {}", envelope.error.message),
        },
        Err(_) => format!("HTTP {status}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(base_url: &str) -> SheetsClient {
        SheetsClient::with_base_url("sheet-1", "Sheet1", None, 30, base_url)
            .expect("client construction should not fail")
    }

    #[test]
    fn values_url_builds_expected_path() {
        let client = SheetsClient::new("sheet-1", "Sheet1", Some("token"), 30)
            .expect("client construction should not fail");
        assert_eq!(
            client.values_url("").as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/sheet-1/values/Sheet1"
        );
    }

    #[test]
    fn values_url_keeps_base_path_prefix() {
        let client = test_client("http://localhost:8080/proxy/");
        assert_eq!(
            client.values_url(":append").as_str(),
            "http://localhost:8080/proxy/v4/spreadsheets/sheet-1/values/Sheet1:append"
        );
    }

    #[test]
    fn values_url_encodes_range_spaces() {
        let client = SheetsClient::with_base_url("id", "Sales Data!A:G", None, 30, "https://x.test")
            .unwrap();
        assert_eq!(
            client.values_url("").as_str(),
            "https://x.test/v4/spreadsheets/id/values/Sales%20Data!A:G"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(SheetsClient::with_base_url("id", "Sheet1", None, 30, "not a url").is_err());
    }

    #[test]
    fn quota_errors_are_rejections() {
        let body = r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#;
        let err = classify_write_failure(StatusCode::TOO_MANY_REQUESTS, body);
        assert_eq!(
            err,
            SourceError::Rejected(
                "HTTP 429 Too Many Requests (RESOURCE_EXHAUSTED): Quota exceeded".to_string()
            )
        );
    }

    #[test]
    fn auth_and_server_errors_are_unavailable() {
        assert!(matches!(
            classify_write_failure(StatusCode::FORBIDDEN, ""),
            SourceError::Unavailable(_)
        ));
        assert!(matches!(
            classify_write_failure(StatusCode::BAD_GATEWAY, "<html>"),
            SourceError::Unavailable(_)
        ));
        assert!(matches!(
            classify_write_failure(StatusCode::BAD_REQUEST, "{}"),
            SourceError::Rejected(_)
        ));
    }
}
