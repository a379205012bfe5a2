use tablepull::analysis::{AnalyzeOperation, OperationStatus};
use tablepull::error::TablePullError;
use tablepull::render::TableFormatter;
use tablepull::table::Table;

const LAYOUT_PAYLOAD: &str = r#"{
    "status": "succeeded",
    "createdDateTime": "2026-08-24T10:00:00Z",
    "lastUpdatedDateTime": "2026-08-24T10:00:07Z",
    "analyzeResult": {
        "apiVersion": "2024-11-30",
        "modelId": "prebuilt-layout",
        "tables": [
            {
                "rowCount": 3,
                "columnCount": 2,
                "cells": [
                    {"kind": "columnHeader", "rowIndex": 0, "columnIndex": 0, "content": "Producto"},
                    {"kind": "columnHeader", "rowIndex": 0, "columnIndex": 1, "content": "Cantidad"},
                    {"rowIndex": 1, "columnIndex": 0, "content": "manzanas"},
                    {"rowIndex": 1, "columnIndex": 1, "content": "10"},
                    {"rowIndex": 2, "columnIndex": 0, "content": "peras"},
                    {"rowIndex": 2, "columnIndex": 1, "content": "3"}
                ]
            }
        ]
    }
}"#;

#[test]
fn test_analysis_payload_renders_as_aligned_text() {
    let operation: AnalyzeOperation = serde_json::from_str(LAYOUT_PAYLOAD).unwrap();
    assert_eq!(operation.status, OperationStatus::Succeeded);

    let result = operation.analyze_result.unwrap();
    let doc_tables = result.tables.unwrap_or_default();
    assert_eq!(doc_tables.len(), 1);

    let table = Table::from_cells(&doc_tables[0].to_cells()).unwrap();
    assert_eq!(table.height(), doc_tables[0].row_count);
    assert_eq!(table.width(), doc_tables[0].column_count);

    let rendered = TableFormatter::new().format_table(&table);
    assert_eq!(
        rendered,
        "Producto  Cantidad\n--------  --------\nmanzanas  10\nperas     3"
    );
}

#[test]
fn test_name_keyed_rows_follow_header() {
    let operation: AnalyzeOperation = serde_json::from_str(LAYOUT_PAYLOAD).unwrap();
    let doc_tables = operation.analyze_result.unwrap().tables.unwrap_or_default();
    let table = Table::from_cells(&doc_tables[0].to_cells()).unwrap();

    let records: Vec<_> = table.records().collect();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["Producto"], "manzanas");
    assert_eq!(records[0]["Cantidad"], "10");
    assert_eq!(records[1]["Producto"], "peras");
}

#[test]
fn test_no_tables_payload_reconstructs_nothing() {
    let payload = r#"{
        "status": "succeeded",
        "analyzeResult": {"modelId": "prebuilt-layout"}
    }"#;

    let operation: AnalyzeOperation = serde_json::from_str(payload).unwrap();
    let doc_tables = operation.analyze_result.unwrap().tables.unwrap_or_default();
    assert!(
        doc_tables.is_empty(),
        "a result without tables must reach the no-tables report, not reconstruction"
    );
}

#[test]
fn test_sparse_payload_disagrees_with_reported_dimensions() {
    let payload = r#"{
        "status": "succeeded",
        "analyzeResult": {
            "tables": [
                {
                    "rowCount": 4,
                    "columnCount": 2,
                    "cells": [
                        {"rowIndex": 0, "columnIndex": 0, "content": "H1"},
                        {"rowIndex": 0, "columnIndex": 1, "content": "H2"},
                        {"rowIndex": 1, "columnIndex": 1, "content": "v2"}
                    ]
                }
            ]
        }
    }"#;

    let operation: AnalyzeOperation = serde_json::from_str(payload).unwrap();
    let doc_tables = operation.analyze_result.unwrap().tables.unwrap_or_default();
    let table = Table::from_cells(&doc_tables[0].to_cells()).unwrap();

    // Observed cells are authoritative; the report claimed four rows.
    assert_eq!(table.height(), 2);
    assert_ne!(table.height(), doc_tables[0].row_count);
    assert_eq!(table.rows, vec![vec!["", "v2"]]);
}

#[test]
fn test_malformed_payload_fails_reconstruction() {
    let payload = r#"{
        "status": "succeeded",
        "analyzeResult": {
            "tables": [
                {
                    "rowCount": 1,
                    "columnCount": 1,
                    "cells": [
                        {"rowIndex": -2, "columnIndex": 0, "content": "bad"}
                    ]
                }
            ]
        }
    }"#;

    let operation: AnalyzeOperation = serde_json::from_str(payload).unwrap();
    let doc_tables = operation.analyze_result.unwrap().tables.unwrap_or_default();

    let err = Table::from_cells(&doc_tables[0].to_cells()).unwrap_err();
    assert!(matches!(
        err,
        TablePullError::InvalidIndex { row: -2, column: 0 }
    ));
}
