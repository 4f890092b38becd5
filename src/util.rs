use std::io::IsTerminal;
use colored::Colorize;

/// Turns colour off when stdout is not a terminal.
pub fn init_colors() {
    if !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }
}

/// Prints a `==>` header, then any further lines verbatim.
pub fn ohai(title: &str, lines: &[&str]) {
    println!("{} {}", "==>".blue().bold(), title.bold());
    for line in lines {
        println!("{line}");
    }
}

pub fn opoo(warning: &str) {
    println!("{}: {}", "Warning".red().underline(), warning);
}

/// Prints the first line of `error` after an `Error:` tag and the rest as is.
pub fn onoe(error: &str) {
    let mut lines = error.lines();
    eprintln!("{}: {}", "Error".red().underline(), lines.next().unwrap_or_default());
    for line in lines {
        eprintln!("{line}");
    }
}

/// Prints identifiers in columns on a terminal, one per line otherwise.
pub fn puts_columns(items: &[String]) {
    if items.is_empty() {
        return;
    }
    if std::io::stdout().is_terminal() {
        let width = std::env::var("COLUMNS")
            .ok()
            .and_then(|c| c.parse::<usize>().ok())
            .filter(|c| *c > 0)
            .unwrap_or(80);
        print!("{}", format_columns(items, width));
    } else {
        for item in items {
            println!("{item}");
        }
    }
}

/// Lays `items` out column-major in as many columns as fit into `width`.
pub fn format_columns(items: &[String], width: usize) -> String {
    let longest = items.iter().map(|i| i.chars().count()).max().unwrap_or(0);
    let col_width = longest + 2;
    let cols = (width / col_width).max(1);
    let rows = items.len().div_ceil(cols);

    let mut out = String::new();
    for row in 0..rows {
        let mut line = String::new();
        for col in 0..cols {
            if let Some(item) = items.get(col * rows + row) {
                line.push_str(&format!("{item:<col_width$}"));
            }
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}
