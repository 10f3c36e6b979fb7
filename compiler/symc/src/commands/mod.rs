//! Command handlers for the symc CLI.

mod generate;

pub use generate::{generate, parse_generate_options, GenerateCommand};

use crate::catalogue::CATALOGUE;

/// Print the catalogue, one `name  summary` line per entry.
pub fn list() {
    let width = CATALOGUE.iter().map(|e| e.name.len()).max().unwrap_or(0);
    for entry in CATALOGUE {
        println!("  {:<width$}  {}", entry.name, entry.summary);
    }
}
