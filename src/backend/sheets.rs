//! Google Sheets v4 REST backend
//!
//! Talks to `spreadsheets.values.{get,append,update}`, `spreadsheets.batchUpdate`
//! and `spreadsheets.get` with a bearer token. Nothing here retries: transport
//! and HTTP failures surface as [`Error::BackendUnavailable`].

use super::{Backend, SheetProperties, SpreadsheetMetadata, StructuralRequest, UpdatedData};
use crate::config::Config;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Client for one spreadsheet
#[derive(Debug, Clone)]
pub struct SheetsBackend {
    client: Client,
    base_url: Url,
    spreadsheet_id: String,
    access_token: String,
}

impl SheetsBackend {
    /// Build a client from resolved configuration
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = Url::parse(&config.api_base_url).map_err(|e| Error::Config {
            message: format!("invalid api_base_url '{}': {}", config.api_base_url, e),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config {
                message: format!("api_base_url '{}' cannot be a base URL", config.api_base_url),
            });
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url,
            spreadsheet_id: config.spreadsheet_id.clone(),
            access_token: config.access_token()?.to_string(),
        })
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    /// `{base}/{id}{suffix}`
    fn spreadsheet_url(&self, suffix: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push(&format!("{}{}", self.spreadsheet_id, suffix));
        }
        url
    }

    /// `{base}/{id}/values/{range}{suffix}`
    fn values_url(&self, range: &str, suffix: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push(&self.spreadsheet_id)
                .push("values")
                .push(&format!("{}{}", range, suffix));
        }
        url
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        operation: &'static str,
    ) -> Result<T> {
        let started = Instant::now();
        let response = request.bearer_auth(&self.access_token).send().await?;
        let status = response.status();

        debug!(
            operation,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "sheets api call"
        );

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(operation, status = status.as_u16(), "sheets api call failed");
            return Err(Error::BackendUnavailable {
                message: format!("{} failed ({}): {}", operation, status, error_message(&body)),
                status: Some(status.as_u16()),
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| Error::malformed(format!("{} response: {}", operation, e)))
    }
}

#[async_trait]
impl Backend for SheetsBackend {
    async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>> {
        let url = self.values_url(range, "");
        let result: Result<ValueRange> = self.send(self.client.get(url), "values.get").await;

        match result {
            Ok(value_range) => Ok(value_range.into_text()),
            Err(Error::BackendUnavailable {
                status: Some(400),
                message,
            }) if message.contains("Unable to parse range") => Err(Error::TableNotFound {
                table: a1ref::parse(range)
                    .ok()
                    .and_then(|r| r.sheet)
                    .unwrap_or_else(|| range.to_string()),
            }),
            Err(e) => Err(e),
        }
    }

    async fn append(&self, range: &str, values: Vec<Option<String>>) -> Result<UpdatedData> {
        let mut url = self.values_url(range, ":append");
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS")
            .append_pair("includeValuesInResponse", "true");

        let body = serde_json::json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": [values],
        });

        let response: AppendResponse = self
            .send(self.client.post(url).json(&body), "values.append")
            .await?;
        Ok(response.updates.into_updated_data())
    }

    async fn update(&self, range: &str, values: Vec<Option<String>>) -> Result<UpdatedData> {
        let mut url = self.values_url(range, "");
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("includeValuesInResponse", "true");

        let body = serde_json::json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": [values],
        });

        let response: UpdateValuesResponse = self
            .send(self.client.put(url).json(&body), "values.update")
            .await?;
        Ok(response.into_updated_data())
    }

    async fn batch_update(&self, requests: Vec<StructuralRequest>) -> Result<()> {
        let requests: Vec<serde_json::Value> = requests
            .into_iter()
            .map(|request| match request {
                StructuralRequest::DeleteRows {
                    sheet_id,
                    start_index,
                    end_index,
                } => serde_json::json!({
                    "deleteDimension": {
                        "range": {
                            "sheetId": sheet_id,
                            "dimension": "ROWS",
                            "startIndex": start_index,
                            "endIndex": end_index,
                        }
                    }
                }),
            })
            .collect();

        let url = self.spreadsheet_url(":batchUpdate");
        let body = serde_json::json!({ "requests": requests });
        let _: serde_json::Value = self
            .send(self.client.post(url).json(&body), "batchUpdate")
            .await?;
        Ok(())
    }

    async fn spreadsheet_metadata(&self) -> Result<SpreadsheetMetadata> {
        let mut url = self.spreadsheet_url("");
        url.query_pairs_mut().append_pair("fields", "sheets.properties");

        let response: SpreadsheetResponse = self.send(self.client.get(url), "get").await?;
        Ok(response.into_metadata())
    }
}

/// Pull `error.message` out of a Google API error body, else the raw text
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

/// Cells come back formatted, i.e. as strings, but tolerate typed JSON too
fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

// Sheets API request/response types

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

impl ValueRange {
    fn into_text(self) -> Vec<Vec<String>> {
        self.values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct AppendResponse {
    updates: UpdateValuesResponse,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateValuesResponse {
    updated_range: String,
    #[serde(default)]
    updated_data: Option<ValueRange>,
}

impl UpdateValuesResponse {
    fn into_updated_data(self) -> UpdatedData {
        let values = self
            .updated_data
            .map(ValueRange::into_text)
            .filter(|rows| !rows.is_empty());
        UpdatedData {
            range: self.updated_range,
            values,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SpreadsheetResponse {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: WireSheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSheetProperties {
    title: String,
    sheet_id: i64,
    #[serde(default)]
    grid_properties: GridProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GridProperties {
    #[serde(default)]
    row_count: u32,
    #[serde(default)]
    column_count: u32,
}

impl SpreadsheetResponse {
    fn into_metadata(self) -> SpreadsheetMetadata {
        SpreadsheetMetadata {
            sheets: self
                .sheets
                .into_iter()
                .map(|entry| SheetProperties {
                    title: entry.properties.title,
                    sheet_id: entry.properties.sheet_id,
                    row_count: entry.properties.grid_properties.row_count,
                    column_count: entry.properties.grid_properties.column_count,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> SheetsBackend {
        let config = Config {
            spreadsheet_id: "sheet-123".into(),
            access_token: Some("token".into()),
            ..Config::default()
        };
        SheetsBackend::new(&config).unwrap()
    }

    #[test]
    fn test_values_url() {
        let url = backend().values_url("'Invite Codes'!A1:C1", ":append");
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/sheet-123/values/'Invite%20Codes'!A1:C1:append"
        );
    }

    #[test]
    fn test_spreadsheet_url() {
        let url = backend().spreadsheet_url(":batchUpdate");
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/sheet-123:batchUpdate"
        );
    }

    #[test]
    fn test_append_response_parsing() {
        let body = r#"{
            "spreadsheetId": "sheet-123",
            "tableRange": "users!A1:B4",
            "updates": {
                "spreadsheetId": "sheet-123",
                "updatedRange": "users!A5:B5",
                "updatedRows": 1,
                "updatedData": { "range": "users!A5:B5", "majorDimension": "ROWS", "values": [["5", 12]] }
            }
        }"#;
        let response: AppendResponse = serde_json::from_str(body).unwrap();
        let data = response.updates.into_updated_data();
        assert_eq!(data.range, "users!A5:B5");
        assert_eq!(data.values, Some(vec![vec!["5".to_string(), "12".to_string()]]));
    }

    #[test]
    fn test_blank_row_ack_has_no_values() {
        let body = r#"{ "updatedRange": "users!A5:B5", "updatedData": { "range": "users!A5:B5" } }"#;
        let response: UpdateValuesResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.into_updated_data().values, None);
    }

    #[test]
    fn test_metadata_parsing() {
        let body = r#"{ "sheets": [
            { "properties": { "sheetId": 0, "title": "users", "index": 0,
              "gridProperties": { "rowCount": 1000, "columnCount": 26 } } },
            { "properties": { "sheetId": 42, "title": "invites" } }
        ] }"#;
        let response: SpreadsheetResponse = serde_json::from_str(body).unwrap();
        let meta = response.into_metadata();
        assert_eq!(meta.sheets.len(), 2);
        assert_eq!(meta.sheet("invites").map(|s| s.sheet_id), Some(42));
        assert_eq!(meta.sheets[0].row_count, 1000);
    }

    #[test]
    fn test_error_message_extraction() {
        let body = r#"{ "error": { "code": 400, "message": "Unable to parse range: nope", "status": "INVALID_ARGUMENT" } }"#;
        assert_eq!(error_message(body), "Unable to parse range: nope");
        assert_eq!(error_message("  gateway timeout "), "gateway timeout");
    }
}
