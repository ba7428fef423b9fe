//! `conveyor size` — staged asset sizes.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use conveyor_stages::{size, SizeReport};

use super::CommandContext;

/// Arguments for `conveyor size`.
#[derive(Args, Debug)]
pub struct SizeArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl SizeArgs {
    pub fn run(self) -> Result<()> {
        let ctx = CommandContext::resolve()?;
        let report = size::run(&ctx.root).context("size report failed")?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        print_size_table(&report);
        Ok(())
    }
}

#[derive(Tabled)]
struct SizeRow {
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "Size")]
    size: String,
}

pub(crate) fn print_size_table(report: &SizeReport) {
    if report.files.is_empty() {
        println!("staging root is empty — run `conveyor build` first");
        return;
    }

    let rows: Vec<SizeRow> = report
        .files
        .iter()
        .map(|file| SizeRow {
            file: file.path.display().to_string(),
            size: human_bytes(file.bytes),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    println!(
        "{} files, {} total",
        report.files.len(),
        human_bytes(report.total_bytes).bold()
    );
}

fn human_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_bytes_scales_units() {
        assert_eq!(human_bytes(0), "0 B");
        assert_eq!(human_bytes(512), "512 B");
        assert_eq!(human_bytes(2048), "2.0 KiB");
        assert_eq!(human_bytes(5 * 1024 * 1024), "5.0 MiB");
    }
}
