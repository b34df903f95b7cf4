//! Terminal styling helpers.

use std::sync::atomic::{AtomicBool, Ordering};

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use owo_colors::{OwoColorize, Style};

static NO_COLOR: AtomicBool = AtomicBool::new(false);

pub fn set_no_color(value: bool) {
    NO_COLOR.store(value, Ordering::SeqCst);
}

pub fn no_color() -> bool {
    NO_COLOR.load(Ordering::SeqCst)
}

fn styled(text: &str, style: Style) -> String {
    if no_color() {
        text.to_string()
    } else {
        text.style(style).to_string()
    }
}

pub fn print_success(msg: &str) {
    println!("{} {}", styled("✓", Style::new().green().bold()), msg);
}

pub fn print_hint(msg: &str) {
    println!(
        "{} {}",
        styled("→", Style::new().dimmed()),
        styled(msg, Style::new().dimmed())
    );
}

fn base_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Key-value table.
pub fn print_info_table(entries: &[(&str, String)]) {
    let mut table = base_table();
    for (key, value) in entries {
        let key_cell = if no_color() {
            Cell::new(key)
        } else {
            Cell::new(key).fg(Color::DarkGrey)
        };
        table.add_row(vec![key_cell, Cell::new(value)]);
    }
    println!("{table}");
}

/// Table with a bold header row.
pub fn print_table(columns: &[&str], rows: &[Vec<String>]) {
    let mut table = base_table();
    table.set_header(columns.iter().map(|col| {
        if no_color() {
            Cell::new(col)
        } else {
            Cell::new(col).add_attribute(Attribute::Bold).fg(Color::Cyan)
        }
    }));
    for row in rows {
        table.add_row(row);
    }
    println!("{table}");
}
