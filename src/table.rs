//! Plain-text rendering of an inferred table layout.

use std::fmt::Write as _;

use crate::{schema::Table, sql::AUDIT_COLUMN};

/// Aligns `rows` under `headers` in space-separated columns with a dashed
/// rule below the header.
pub fn render_grid(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths = headers
        .iter()
        .map(|h| h.chars().count().max(3))
        .collect::<Vec<_>>();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(flatten(cell).chars().count());
        }
    }

    let mut output = String::new();
    let header_cells = headers.iter().map(|h| h.to_string()).collect::<Vec<_>>();
    push_line(&mut output, &header_cells, &widths);
    let rule = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    push_line(&mut output, &rule, &widths);
    for row in rows {
        push_line(&mut output, row, &widths);
    }
    output
}

fn push_line(output: &mut String, cells: &[String], widths: &[usize]) {
    let mut line = String::new();
    for (idx, (cell, width)) in cells.iter().zip(widths).enumerate() {
        if idx > 0 {
            line.push_str("  ");
        }
        let _ = write!(line, "{:<width$}", flatten(cell), width = *width);
    }
    let _ = writeln!(output, "{}", line.trim_end());
}

fn flatten(value: &str) -> String {
    value.replace(['\n', '\r', '\t'], " ")
}

/// Describes the table a load would create, including the columns the
/// loader adds itself.
pub fn describe(table: &Table) -> String {
    let mut rows = vec![vec![
        table.surrogate_key(),
        "serial".to_string(),
        "-".to_string(),
    ]];
    rows.extend(table.columns.iter().map(|column| {
        vec![
            column.name.clone(),
            column.column_type.sql_type().to_string(),
            (column.source_position + 1).to_string(),
        ]
    }));
    rows.push(vec![
        AUDIT_COLUMN.to_string(),
        "timestamp".to_string(),
        "-".to_string(),
    ]);

    let mut output = String::new();
    let _ = writeln!(output, "Table: {}", table.name);
    let _ = writeln!(
        output,
        "Rows: {} loaded, {} skipped",
        table.row_count(),
        table.skipped
    );
    let _ = writeln!(
        output,
        "Dates: {}",
        if table.day_first_dates {
            "day/month (reordered on load)"
        } else {
            "month/day"
        }
    );
    output.push('\n');
    output.push_str(&render_grid(&["column", "type", "source"], &rows));
    output
}
