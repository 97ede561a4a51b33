//! README grid
//!
//! Human-facing front sheet of a generated template: checklist version,
//! generation timestamp, the template parameters, a requirement-level legend
//! with colored cells, and the sheet list.

use chrono::{DateTime, Utc};
use fairesheets_core::grid::{Grid, GridLayout};
use fairesheets_core::types::{RequirementLevel, SampleTypeFilter, Selection};

/// Build the README grid. The timestamp is passed in so callers control it.
#[must_use]
pub fn build_readme_grid(
    sheet_id: i64,
    checklist_version: &str,
    project_id: &str,
    selection: &Selection,
    sheet_names: &[String],
    generated_at: DateTime<Utc>,
) -> Grid {
    let mut grid = Grid::new("README", sheet_id, GridLayout::FieldPerRow);
    let mut row = 0;

    let title = grid.cell_mut(row, 0);
    title.value = "FAIR eDNA data template".to_string();
    title.emphasis = true;
    row += 1;

    let pair = |grid: &mut Grid, row: &mut usize, label: &str, value: String| {
        grid.cell_mut(*row, 0).value = label.to_string();
        grid.cell_mut(*row, 1).value = value;
        *row += 1;
    };
    pair(&mut grid, &mut row, "Checklist version", checklist_version.to_string());
    pair(
        &mut grid,
        &mut row,
        "Generated",
        generated_at.format("%Y-%m-%d %H:%M UTC").to_string(),
    );
    pair(&mut grid, &mut row, "Project ID", project_id.to_string());
    pair(
        &mut grid,
        &mut row,
        "Assays",
        selection.assay_names.join(" | "),
    );
    pair(
        &mut grid,
        &mut row,
        "Sample types",
        match &selection.sample_types {
            SampleTypeFilter::Other => "other".to_string(),
            SampleTypeFilter::Selected(types) => types.join(" | "),
        },
    );
    pair(
        &mut grid,
        &mut row,
        "Requirement levels",
        selection
            .requirement_levels
            .iter()
            .map(|l| l.code())
            .collect::<Vec<_>>()
            .join(" | "),
    );
    row += 1;

    let legend_title = grid.cell_mut(row, 0);
    legend_title.value = "Requirement level legend".to_string();
    legend_title.emphasis = true;
    row += 1;
    for level in RequirementLevel::ALL {
        let code_cell = grid.cell_mut(row, 0);
        code_cell.value = level.code().to_string();
        code_cell.background = Some(level);
        grid.cell_mut(row, 1).value = level.label().to_string();
        row += 1;
    }
    row += 1;

    let sheets_title = grid.cell_mut(row, 0);
    sheets_title.value = "Sheets".to_string();
    sheets_title.emphasis = true;
    row += 1;
    for name in sheet_names {
        grid.cell_mut(row, 0).value = name.clone();
        row += 1;
    }

    grid
}
