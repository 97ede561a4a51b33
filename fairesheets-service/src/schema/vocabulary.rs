//! Controlled-vocabulary loading
//!
//! The vocabulary table carries one row per field: `term_name`, `n_options`,
//! and the permitted values in `vocab1..vocabN` columns. A field declared as
//! controlled vocabulary with no row here is not an error; it surfaces later
//! as a missing dropdown, never a crash.

use super::ChecklistTable;
use fairesheets_core::error::{FaireError, Result};
use fairesheets_core::types::VocabularyIndex;
use tracing::debug;

/// Load the vocabulary index from a `Drop-down values` style table.
///
/// Value columns are taken in `vocab1..vocabN` numeric order. When the
/// `n_options` column is present and parseable it bounds the value count;
/// otherwise values are read until the first empty cell.
///
/// # Errors
///
/// Returns [`FaireError::Schema`] if the table has no `term_name` column.
pub fn load_vocabulary(table: &ChecklistTable) -> Result<VocabularyIndex> {
    let mut term_col = None;
    let mut n_options_col = None;
    let mut value_cols: Vec<(usize, usize)> = Vec::new();

    for (idx, header) in table.headers.iter().enumerate() {
        let header = header.trim().to_lowercase();
        if header == "term_name" || header == "field_name" {
            term_col = Some(idx);
        } else if header == "n_options" {
            n_options_col = Some(idx);
        } else if let Some(rank) = header
            .strip_prefix("vocab")
            .and_then(|suffix| suffix.parse::<usize>().ok())
        {
            value_cols.push((rank, idx));
        }
    }
    let Some(term_col) = term_col else {
        return Err(FaireError::schema("vocabulary table has no term_name column"));
    };
    value_cols.sort_unstable();

    let mut index = VocabularyIndex::new();
    for (row_idx, _) in table.rows.iter().enumerate() {
        let name = table.cell(row_idx, term_col).trim();
        if name.is_empty() {
            continue;
        }

        let declared = n_options_col
            .map(|c| table.cell(row_idx, c).trim())
            .and_then(|s| s.parse::<usize>().ok());

        let mut values = Vec::new();
        for &(_, col) in &value_cols {
            if declared.is_some_and(|n| values.len() >= n) {
                break;
            }
            let value = table.cell(row_idx, col).trim();
            if value.is_empty() {
                if declared.is_none() {
                    break;
                }
                continue;
            }
            values.push(value.to_string());
        }

        if !values.is_empty() {
            index.insert(name, values);
        }
    }

    debug!(vocabularies = index.len(), "loaded vocabulary index");
    Ok(index)
}
