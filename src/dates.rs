//! Day/month reordering for tables whose dates turned out to be day-first.

use std::borrow::Cow;

use crate::schema::{ColumnType, Table};

/// Swaps the first two `/`-separated tokens, keeping whatever follows the
/// second separator. Values without a separator are returned unchanged.
pub fn swap_day_month(value: &str) -> Cow<'_, str> {
    let mut parts = value.splitn(3, '/');
    let (Some(first), Some(second)) = (parts.next(), parts.next()) else {
        return Cow::Borrowed(value);
    };
    match parts.next() {
        Some(rest) => Cow::Owned(format!("{second}/{first}/{rest}")),
        None => Cow::Owned(format!("{second}/{first}")),
    }
}

/// Rewrites every value of every timestamp column when the table's dates are
/// day-first. Tables without the flag come back untouched.
pub fn normalize(mut table: Table) -> Table {
    if !table.day_first_dates {
        return table;
    }
    let timestamp_columns = table
        .columns
        .iter()
        .enumerate()
        .filter(|(_, column)| column.column_type == ColumnType::Timestamp)
        .map(|(idx, _)| idx)
        .collect::<Vec<_>>();
    if timestamp_columns.is_empty() {
        return table;
    }
    for row in &mut table.rows {
        for &idx in &timestamp_columns {
            let Some(value) = row.values.get_mut(idx) else {
                continue;
            };
            if value.is_empty() {
                continue;
            }
            if let Cow::Owned(swapped) = swap_day_month(value) {
                *value = swapped;
            }
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infer;
    use crate::schema::{Column, Row};

    fn table_with(columns: &[(&str, ColumnType)], rows: &[&[&str]], day_first: bool) -> Table {
        let columns = columns
            .iter()
            .enumerate()
            .map(|(idx, (name, column_type))| Column {
                name: (*name).to_string(),
                source_position: idx,
                column_type: *column_type,
            })
            .collect();
        let mut table = Table::new("t", columns);
        table.rows = rows
            .iter()
            .map(|row| Row::new(row.iter().map(|v| (*v).to_string()).collect()))
            .collect();
        table.day_first_dates = day_first;
        table
    }

    #[test]
    fn swap_day_month_keeps_suffix() {
        assert_eq!(swap_day_month("13/5/2024"), "5/13/2024");
        assert_eq!(swap_day_month("13/5/2024 10:30"), "5/13/2024 10:30");
        assert_eq!(swap_day_month("13/5"), "5/13");
        assert_eq!(swap_day_month("42"), "42");
    }

    #[test]
    fn swap_day_month_handles_multibyte_tokens() {
        assert_eq!(swap_day_month("é13/5/2024"), "5/é13/2024");
        assert_eq!(swap_day_month("31/ß/ü"), "ß/31/ü");
    }

    #[test]
    fn text_prefixed_values_keep_month_first_tables_intact() {
        let raw = table_with(
            &[("note", ColumnType::Integer), ("on", ColumnType::Integer)],
            &[&["é13/5/2024", "1/5/2024"], &["due 31/01", "3/4/2024"]],
            false,
        );
        let outcome = infer::infer(&raw);
        assert!(!outcome.day_first_dates);
        let normalized = normalize(infer::apply(raw, &outcome));
        assert_eq!(normalized.rows[0].values, vec!["é13/5/2024", "1/5/2024"]);
    }

    #[test]
    fn normalize_rewrites_only_timestamp_columns() {
        let table = table_with(
            &[("when", ColumnType::Timestamp), ("note", ColumnType::Text)],
            &[&["13/5/2024", "1/2/3"], &["", "x"]],
            true,
        );
        let normalized = normalize(table);
        assert_eq!(normalized.rows[0].values, vec!["5/13/2024", "1/2/3"]);
        assert_eq!(normalized.rows[1].values, vec!["", "x"]);
    }

    #[test]
    fn normalize_is_a_no_op_without_flag() {
        let table = table_with(
            &[("when", ColumnType::Timestamp)],
            &[&["1/5/2024"]],
            false,
        );
        let normalized = normalize(table.clone());
        assert_eq!(normalized, table);
    }

    #[test]
    fn day_first_evidence_swaps_every_timestamp_value() {
        let raw = table_with(
            &[("a", ColumnType::Integer), ("b", ColumnType::Integer)],
            &[&["1/5/2024", "3/4/2024"], &["13/5/2024", "7/8/2024"]],
            false,
        );
        let outcome = infer::infer(&raw);
        assert!(outcome.day_first_dates);
        let normalized = normalize(infer::apply(raw, &outcome));
        assert_eq!(normalized.rows[0].values, vec!["5/1/2024", "4/3/2024"]);
        assert_eq!(normalized.rows[1].values, vec!["5/13/2024", "8/7/2024"]);
    }

    #[test]
    fn month_first_tables_are_left_alone() {
        let raw = table_with(
            &[("a", ColumnType::Integer)],
            &[&["1/5/2024"], &["3/4/2024"]],
            false,
        );
        let outcome = infer::infer(&raw);
        let normalized = normalize(infer::apply(raw, &outcome));
        assert!(!normalized.day_first_dates);
        assert_eq!(normalized.rows[0].values, vec!["1/5/2024"]);
        assert_eq!(normalized.rows[1].values, vec!["3/4/2024"]);
    }
}
