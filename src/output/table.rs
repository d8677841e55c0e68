//! Table output formatting

use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Rows},
};

/// Rounded table with centered headers, or a placeholder line when empty
pub fn format_table<T: Tabled>(rows: &[T], empty: &str) -> String {
    if rows.is_empty() {
        return empty.to_string();
    }

    let mut table = Table::new(rows);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));

    table.to_string()
}
