use std::{fmt::Write, path::Path};

use comfy_table::{
    Attribute, Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL,
};
use owo_colors::OwoColorize;

pub const fn app_name() -> &'static str {
    "stock-checker"
}

pub fn build_banner() -> String {
    let indent = "      ";
    let version = env!("CARGO_PKG_VERSION");
    let line = format!("{indent}{}", "━".repeat(52).dimmed());

    let ticker = format!(
        "{indent}  {} {}   {} {}   {} {}",
        "GOOG".bright_white().bold(),
        "▲".green(),
        "MSFT".bright_white().bold(),
        "▼".red(),
        "AAPL".bright_white().bold(),
        "▲".green(),
    );

    let name = "STOCK-CHECKER".bright_cyan().bold().to_string();
    let sep = "•".dimmed().to_string();
    let desc = "Prices & Likes API".white().to_string();
    let ver = format!("v{version}").bright_yellow().to_string();

    format!(
        "\n{line}\n\
         {ticker}\n\
         {line}\n\
         {indent}  {name} {sep} {desc} {sep} {ver}\n\
         {line}"
    )
}

fn new_table(width: u16) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_width(width);
    table
}

fn print_table(title: &str, table: &Table) {
    println!("\n  {}", title.bright_white().bold());
    for line in table.to_string().lines() {
        println!("  {line}");
    }
}

pub fn print_version() {
    let mut table = new_table(50);

    let version = env!("CARGO_PKG_VERSION");
    let authors = env!("CARGO_PKG_AUTHORS").replace(':', ", ");

    table.add_row(vec![
        Cell::new("STOCK-CHECKER")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(format!("v{version}"))
            .fg(Color::Yellow)
            .add_attribute(Attribute::Bold),
    ]);

    table.add_row(vec![
        Cell::new("Endpoint").fg(Color::White),
        Cell::new("GET /api/stock-prices").fg(Color::Green),
    ]);

    table.add_row(vec![
        Cell::new("Build Arch").fg(Color::White),
        Cell::new(std::env::consts::ARCH).fg(Color::Cyan),
    ]);

    if !authors.is_empty() {
        table.add_row(vec![
            Cell::new("Developers").fg(Color::White),
            Cell::new(authors).fg(Color::Magenta),
        ]);
    }

    print_table("  System Information", &table);
    println!();
}

pub fn print_config_error(path: &Path, error: &anyhow::Error) {
    let mut table = new_table(60);

    table.add_row(vec![
        Cell::new("CONFIG ERROR")
            .fg(Color::Red)
            .add_attribute(Attribute::Bold),
    ]);

    table.add_row(vec![
        Cell::new(format_config_error(path, error)).fg(Color::White),
    ]);

    print_table("  Configuration Issue", &table);
}

fn format_config_error(path: &Path, error: &anyhow::Error) -> String {
    let mut error_chain = String::new();
    for (i, cause) in error.chain().enumerate() {
        if i == 0 {
            let _ = writeln!(error_chain, "{cause}");
        } else {
            let _ = writeln!(error_chain, "  └─ Caused by: {cause}");
        }
    }

    format!(
        "Failed to load configuration file.\n\n\
         Path: {}\n\
         Error: {error_chain}\n\
         See config.example.toml for the supported sections.",
        path.display(),
    )
}

#[cfg(test)]
mod tests {
    use anyhow::Context;

    use super::*;

    #[test]
    fn test_format_config_error_lists_causes() {
        let error = Err::<(), _>(anyhow::anyhow!("hash_cost must be within 4..=31, got 2"))
            .context("invalid [likes] section")
            .unwrap_err();

        let text = format_config_error(Path::new("config.toml"), &error);

        assert!(text.contains("Path: config.toml"));
        assert!(text.contains("invalid [likes] section\n"));
        assert!(text.contains("Caused by: hash_cost must be within 4..=31, got 2"));
    }

    #[test]
    fn test_banner_mentions_version() {
        assert!(build_banner().contains(env!("CARGO_PKG_VERSION")));
    }
}
