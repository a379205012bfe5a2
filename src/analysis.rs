use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::config::AnalysisConfig;
use crate::error::{TablePullError, TablePullResult};
use crate::table::Cell;

const API_VERSION: &str = "2024-11-30";
const ANALYZE_FEATURES: &str = "keyValuePairs";

/// Long-running analyze operation as reported by the service.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeOperation {
    pub status: OperationStatus,
    pub created_date_time: Option<DateTime<Utc>>,
    pub last_updated_date_time: Option<DateTime<Utc>>,
    pub analyze_result: Option<AnalyzeResult>,
    pub error: Option<OperationError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationStatus {
    NotStarted,
    Running,
    Succeeded,
    Failed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
pub struct OperationError {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResult {
    pub model_id: Option<String>,
    pub tables: Option<Vec<DocumentTable>>,
    /// Present because the feature is requested; not consumed here.
    pub key_value_pairs: Option<Vec<Value>>,
}

/// One detected tabular region, as an unordered collection of cells.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentTable {
    pub row_count: usize,
    pub column_count: usize,
    #[serde(default)]
    pub cells: Vec<DocumentTableCell>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentTableCell {
    #[serde(default)]
    pub kind: Option<String>,
    pub row_index: i64,
    pub column_index: i64,
    #[serde(default)]
    pub row_span: Option<u32>,
    #[serde(default)]
    pub column_span: Option<u32>,
    #[serde(default)]
    pub content: String,
}

impl DocumentTable {
    /// Flatten the wire cells into reconstruction input. Span information
    /// is dropped; merged cells keep their content at the anchor position.
    pub fn to_cells(&self) -> Vec<Cell> {
        self.cells
            .iter()
            .map(|cell| Cell::new(cell.row_index, cell.column_index, cell.content.clone()))
            .collect()
    }
}

/// Client for the document analysis service's layout model.
pub struct LayoutAnalyzer {
    http: reqwest::Client,
    endpoint: String,
    key: String,
    model_id: String,
    poll_interval: Duration,
    max_polls: u32,
}

impl LayoutAnalyzer {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.request_timeout_secs))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            key: config.key.clone(),
            model_id: config.model_id.clone(),
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            max_polls: config.max_polls,
        }
    }

    /// Submit a document and wait for the operation to reach a terminal
    /// state. Requests are sent once; a transport failure is returned, not
    /// reattempted.
    pub async fn analyze(&self, document: Vec<u8>) -> TablePullResult<AnalyzeResult> {
        let operation_url = self.begin_analyze(document).await?;
        self.poll_operation(&operation_url).await
    }

    fn analyze_url(&self) -> String {
        format!(
            "{}/documentintelligence/documentModels/{}:analyze?api-version={}&features={}",
            self.endpoint, self.model_id, API_VERSION, ANALYZE_FEATURES
        )
    }

    async fn begin_analyze(&self, document: Vec<u8>) -> TablePullResult<String> {
        let url = self.analyze_url();
        info!("📨 Submitting document to layout model '{}'", self.model_id);
        debug!("Analyze request: {}", url);

        let response = self
            .http
            .post(&url)
            .header("Ocp-Apim-Subscription-Key", &self.key)
            .header("Content-Type", "application/pdf")
            .body(document)
            .send()
            .await
            .map_err(|e| {
                TablePullError::connectivity(
                    format!("Analyze request to {} failed", self.endpoint),
                    e,
                )
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(TablePullError::analysis(format!(
                "Analysis API error ({}): {}",
                status, text
            )));
        }

        response
            .headers()
            .get("operation-location")
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string())
            .ok_or_else(|| {
                TablePullError::analysis("Analyze response is missing the Operation-Location header")
            })
    }

    async fn poll_operation(&self, operation_url: &str) -> TablePullResult<AnalyzeResult> {
        let mut delay = self.poll_interval;

        for attempt in 1..=self.max_polls {
            sleep(delay).await;

            let response = self
                .http
                .get(operation_url)
                .header("Ocp-Apim-Subscription-Key", &self.key)
                .send()
                .await
                .map_err(|e| TablePullError::connectivity("Operation poll failed", e))?;

            if !response.status().is_success() {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                return Err(TablePullError::analysis(format!(
                    "Operation poll error ({}): {}",
                    status, text
                )));
            }

            if let Some(secs) = retry_after_secs(response.headers()) {
                delay = Duration::from_secs(secs);
            }

            let operation: AnalyzeOperation = response.json().await.map_err(|e| {
                TablePullError::analysis(format!("Failed to parse operation status: {}", e))
            })?;

            debug!(
                "Operation status {:?} (poll {}/{})",
                operation.status, attempt, self.max_polls
            );

            if let Some(result) = operation_outcome(operation)? {
                info!("✅ Analysis operation succeeded after {} polls", attempt);
                return Ok(result);
            }
        }

        Err(TablePullError::analysis(format!(
            "Operation still running after {} polls",
            self.max_polls
        )))
    }
}

/// Terminal-state handling shared by the poll loop: `Ok(Some)` on success,
/// `Ok(None)` to keep polling, `Err` when the service reports failure.
fn operation_outcome(operation: AnalyzeOperation) -> TablePullResult<Option<AnalyzeResult>> {
    match operation.status {
        OperationStatus::Succeeded => operation
            .analyze_result
            .map(Some)
            .ok_or_else(|| {
                TablePullError::analysis("Operation succeeded but carried no analyze result")
            }),
        OperationStatus::Failed => {
            let detail = operation
                .error
                .map(|e| format!("{}: {}", e.code, e.message))
                .unwrap_or_else(|| "no error detail".to_string());
            Err(TablePullError::analysis(format!(
                "Analysis operation failed ({})",
                detail
            )))
        }
        _ => Ok(None),
    }
}

fn retry_after_secs(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get("retry-after")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUCCEEDED_OPERATION: &str = r#"{
        "status": "succeeded",
        "createdDateTime": "2026-08-24T10:00:00Z",
        "lastUpdatedDateTime": "2026-08-24T10:00:09Z",
        "analyzeResult": {
            "apiVersion": "2024-11-30",
            "modelId": "prebuilt-layout",
            "content": "Importe Año 1250 2026",
            "tables": [
                {
                    "rowCount": 2,
                    "columnCount": 2,
                    "cells": [
                        {"kind": "columnHeader", "rowIndex": 0, "columnIndex": 0, "content": "Importe"},
                        {"kind": "columnHeader", "rowIndex": 0, "columnIndex": 1, "content": "Año"},
                        {"rowIndex": 1, "columnIndex": 0, "content": "1250"},
                        {"rowIndex": 1, "columnIndex": 1, "content": "2026"}
                    ]
                }
            ],
            "keyValuePairs": [
                {"key": {"content": "Total"}, "value": {"content": "1250"}}
            ]
        }
    }"#;

    #[test]
    fn test_deserialize_succeeded_operation() {
        let operation: AnalyzeOperation = serde_json::from_str(SUCCEEDED_OPERATION).unwrap();
        assert_eq!(operation.status, OperationStatus::Succeeded);
        assert!(operation.created_date_time.is_some());

        let result = operation.analyze_result.unwrap();
        assert_eq!(result.model_id.as_deref(), Some("prebuilt-layout"));
        assert_eq!(result.key_value_pairs.map(|kv| kv.len()), Some(1));

        let tables = result.tables.unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].row_count, 2);
        assert_eq!(tables[0].cells.len(), 4);
        assert_eq!(tables[0].cells[1].kind.as_deref(), Some("columnHeader"));
    }

    #[test]
    fn test_to_cells_keeps_positions_and_content() {
        let operation: AnalyzeOperation = serde_json::from_str(SUCCEEDED_OPERATION).unwrap();
        let result = operation.analyze_result.unwrap();
        let cells = result.tables.unwrap()[0].to_cells();

        assert_eq!(cells.len(), 4);
        assert_eq!(cells[0], Cell::new(0, 0, "Importe"));
        assert_eq!(cells[3], Cell::new(1, 1, "2026"));
    }

    #[test]
    fn test_negative_wire_index_survives_parsing() {
        // Rejection happens during reconstruction, not parsing.
        let cell: DocumentTableCell =
            serde_json::from_str(r#"{"rowIndex": -1, "columnIndex": 0, "content": "x"}"#).unwrap();
        assert_eq!(cell.row_index, -1);
    }

    #[test]
    fn test_operation_status_strings() {
        let running: OperationStatus = serde_json::from_str(r#""running""#).unwrap();
        assert_eq!(running, OperationStatus::Running);

        let not_started: OperationStatus = serde_json::from_str(r#""notStarted""#).unwrap();
        assert_eq!(not_started, OperationStatus::NotStarted);

        let unknown: OperationStatus = serde_json::from_str(r#""canceled""#).unwrap();
        assert_eq!(unknown, OperationStatus::Unknown);
    }

    #[test]
    fn test_operation_outcome_branches() {
        let running: AnalyzeOperation =
            serde_json::from_str(r#"{"status": "running"}"#).unwrap();
        assert!(matches!(operation_outcome(running), Ok(None)));

        let failed: AnalyzeOperation = serde_json::from_str(
            r#"{"status": "failed", "error": {"code": "InvalidRequest", "message": "bad pdf"}}"#,
        )
        .unwrap();
        match operation_outcome(failed).unwrap_err() {
            TablePullError::Analysis { message } => {
                assert!(message.contains("InvalidRequest"));
                assert!(message.contains("bad pdf"));
            }
            other => panic!("expected analysis error, got {:?}", other),
        }

        let empty_success: AnalyzeOperation =
            serde_json::from_str(r#"{"status": "succeeded"}"#).unwrap();
        assert!(operation_outcome(empty_success).is_err());
    }

    #[test]
    fn test_analyze_url_layout() {
        let mut config = AnalysisConfig::default();
        config.endpoint = "https://svc.example.com/".to_string();
        config.key = "secret".to_string();

        let analyzer = LayoutAnalyzer::new(&config);
        assert_eq!(
            analyzer.analyze_url(),
            "https://svc.example.com/documentintelligence/documentModels/prebuilt-layout:analyze?api-version=2024-11-30&features=keyValuePairs"
        );
    }

    #[test]
    fn test_retry_after_parsing() {
        let mut headers = reqwest::header::HeaderMap::new();
        assert_eq!(retry_after_secs(&headers), None);

        headers.insert("retry-after", "5".parse().unwrap());
        assert_eq!(retry_after_secs(&headers), Some(5));

        headers.insert("retry-after", "soon".parse().unwrap());
        assert_eq!(retry_after_secs(&headers), None, "non-numeric value is ignored");
    }
}
