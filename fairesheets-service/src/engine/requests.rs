//! Wire-request mapping
//!
//! Typed serde mirror of the remote batch-update protocol. Every
//! [`Operation`] maps to exactly one request; field masks name precisely the
//! cell properties each request touches, so a request never clobbers
//! annotations written by an earlier one.

use fairesheets_core::ops::{CellRange, Operation, OperationKind};
use fairesheets_core::types::Color;
use serde::{Deserialize, Serialize};

/// One request in a remote batch-update call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MutationRequest {
    /// Write literal cell values
    UpdateCells(UpdateCellsRequest),
    /// Apply one cell's properties across a range
    RepeatCell(RepeatCellRequest),
    /// Attach an enumerated-choice rule to a range
    SetDataValidation(SetDataValidationRequest),
    /// Delete a run of rows or columns
    DeleteDimension(DeleteDimensionRequest),
    /// Update sheet-level properties (dimensions)
    UpdateSheetProperties(UpdateSheetPropertiesRequest),
}

/// Zero-based half-open rectangle on a remote sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridRange {
    /// Target sheet
    pub sheet_id: i64,
    /// First row, inclusive
    pub start_row_index: usize,
    /// Last row, exclusive
    pub end_row_index: usize,
    /// First column, inclusive
    pub start_column_index: usize,
    /// Last column, exclusive
    pub end_column_index: usize,
}

impl GridRange {
    fn new(sheet_id: i64, range: CellRange) -> Self {
        Self {
            sheet_id,
            start_row_index: range.start_row,
            end_row_index: range.end_row,
            start_column_index: range.start_col,
            end_column_index: range.end_col,
        }
    }
}

/// `updateCells`: a row-major block of cell data plus a field mask
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCellsRequest {
    /// Target range
    pub range: GridRange,
    /// Cell data, one entry per row of the range
    pub rows: Vec<RowData>,
    /// Field mask naming the touched cell properties
    pub fields: String,
}

/// `repeatCell`: one cell's properties stamped across a range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepeatCellRequest {
    /// Target range
    pub range: GridRange,
    /// Cell properties to repeat
    pub cell: CellData,
    /// Field mask naming the touched cell properties
    pub fields: String,
}

/// `setDataValidation`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetDataValidationRequest {
    /// Target range
    pub range: GridRange,
    /// Validation rule
    pub rule: DataValidationRule,
}

/// `deleteDimension`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteDimensionRequest {
    /// Dimension run to delete
    pub range: DimensionRange,
}

/// `updateSheetProperties`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSheetPropertiesRequest {
    /// New sheet properties
    pub properties: SheetProperties,
    /// Field mask naming the touched sheet properties
    pub fields: String,
}

/// One row of cell data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowData {
    /// Cells, left to right
    pub values: Vec<CellData>,
}

/// Cell properties; absent properties are untouched under the field mask
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellData {
    /// Literal value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_entered_value: Option<ExtendedValue>,
    /// Formatting
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_entered_format: Option<CellFormat>,
    /// Note text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// A literal cell value; all grid text travels as strings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedValue {
    /// String value
    pub string_value: String,
}

/// Cell formatting
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellFormat {
    /// Text formatting
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_format: Option<TextFormat>,
    /// Background color
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<Color>,
}

/// Text formatting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextFormat {
    /// Bold emphasis
    pub bold: bool,
}

/// Enumerated-choice validation rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataValidationRule {
    /// Rule condition
    pub condition: BooleanCondition,
    /// Render a dropdown in the remote UI
    pub show_custom_ui: bool,
    /// Reject values outside the list, or merely warn
    pub strict: bool,
}

/// Condition of a validation rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BooleanCondition {
    /// Condition type; always `ONE_OF_LIST` here
    #[serde(rename = "type")]
    pub condition_type: String,
    /// Permitted values
    pub values: Vec<ConditionValue>,
}

/// One permitted value of an enumerated-choice condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionValue {
    /// The value
    pub user_entered_value: String,
}

/// Row or column axis of a dimension operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Dimension {
    /// Row axis
    Rows,
    /// Column axis
    Columns,
}

/// A run of rows or columns on a sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionRange {
    /// Target sheet
    pub sheet_id: i64,
    /// Axis
    pub dimension: Dimension,
    /// First index, inclusive
    pub start_index: usize,
    /// Last index, exclusive
    pub end_index: usize,
}

/// Sheet-level properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetProperties {
    /// Target sheet
    pub sheet_id: i64,
    /// Grid dimensions
    pub grid_properties: GridProperties,
}

/// Sheet dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridProperties {
    /// Row count
    pub row_count: usize,
    /// Column count
    pub column_count: usize,
}

/// Map one operation to its wire request
#[must_use]
pub fn to_request(op: &Operation) -> MutationRequest {
    let range = GridRange::new(op.sheet_id, op.range);
    match &op.kind {
        OperationKind::SetValues { rows } => MutationRequest::UpdateCells(UpdateCellsRequest {
            range,
            rows: rows
                .iter()
                .map(|row| RowData {
                    values: row
                        .iter()
                        .map(|value| CellData {
                            user_entered_value: Some(ExtendedValue {
                                string_value: value.clone(),
                            }),
                            ..CellData::default()
                        })
                        .collect(),
                })
                .collect(),
            fields: "userEnteredValue".to_string(),
        }),
        OperationKind::SetEmphasis { bold } => MutationRequest::RepeatCell(RepeatCellRequest {
            range,
            cell: CellData {
                user_entered_format: Some(CellFormat {
                    text_format: Some(TextFormat { bold: *bold }),
                    background_color: None,
                }),
                ..CellData::default()
            },
            fields: "userEnteredFormat.textFormat.bold".to_string(),
        }),
        OperationKind::SetBackground { level } => MutationRequest::RepeatCell(RepeatCellRequest {
            range,
            cell: CellData {
                user_entered_format: Some(CellFormat {
                    text_format: None,
                    background_color: Some(level.color()),
                }),
                ..CellData::default()
            },
            fields: "userEnteredFormat.backgroundColor".to_string(),
        }),
        OperationKind::SetNote { note } => MutationRequest::RepeatCell(RepeatCellRequest {
            range,
            cell: CellData {
                note: Some(note.clone()),
                ..CellData::default()
            },
            fields: "note".to_string(),
        }),
        OperationKind::SetConstraint { values, strict } => {
            MutationRequest::SetDataValidation(SetDataValidationRequest {
                range,
                rule: DataValidationRule {
                    condition: BooleanCondition {
                        condition_type: "ONE_OF_LIST".to_string(),
                        values: values
                            .iter()
                            .map(|value| ConditionValue {
                                user_entered_value: value.clone(),
                            })
                            .collect(),
                    },
                    show_custom_ui: true,
                    strict: *strict,
                },
            })
        }
        OperationKind::DeleteRows => MutationRequest::DeleteDimension(DeleteDimensionRequest {
            range: DimensionRange {
                sheet_id: op.sheet_id,
                dimension: Dimension::Rows,
                start_index: op.range.start_row,
                end_index: op.range.end_row,
            },
        }),
        OperationKind::DeleteColumns => MutationRequest::DeleteDimension(DeleteDimensionRequest {
            range: DimensionRange {
                sheet_id: op.sheet_id,
                dimension: Dimension::Columns,
                start_index: op.range.start_col,
                end_index: op.range.end_col,
            },
        }),
        OperationKind::Resize { rows, cols } => {
            MutationRequest::UpdateSheetProperties(UpdateSheetPropertiesRequest {
                properties: SheetProperties {
                    sheet_id: op.sheet_id,
                    grid_properties: GridProperties {
                        row_count: *rows,
                        column_count: *cols,
                    },
                },
                fields: "gridProperties.rowCount,gridProperties.columnCount".to_string(),
            })
        }
    }
}
