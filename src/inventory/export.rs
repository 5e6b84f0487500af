//! Table serialization: CSV for a single table, XLSX for one sheet per group

use super::record::Cell;
use super::table::Table;
use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};
use std::io::Write;
use std::path::Path;

/// Write a table as CSV (header row included) to any writer
pub fn write_csv_to<W: Write>(table: &Table, writer: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);

    writer
        .write_record(table.header())
        .context("Failed to write CSV header")?;
    for row in table.rows() {
        writer
            .write_record(row.iter().map(|cell| cell.to_string()))
            .context("Failed to write CSV row")?;
    }

    writer.flush().context("Failed to flush CSV output")?;
    Ok(())
}

/// Write a table as a CSV file
pub fn write_csv(table: &Table, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_csv_to(table, file)?;
    tracing::info!("Wrote {} rows to {}", table.len(), path.display());
    Ok(())
}

fn write_cell(sheet: &mut Worksheet, row: u32, col: u16, cell: &Cell) -> Result<()> {
    match cell {
        Cell::Text(s) => {
            sheet.write_string(row, col, s.as_str())?;
        },
        Cell::Int(n) => {
            sheet.write_number(row, col, *n as f64)?;
        },
        Cell::Bool(b) => {
            sheet.write_boolean(row, col, *b)?;
        },
        Cell::Empty => {},
    }
    Ok(())
}

fn fill_sheet(sheet: &mut Worksheet, table: &Table) -> Result<()> {
    for (col, name) in table.header().iter().enumerate() {
        sheet.write_string(0, col as u16, *name)?;
    }
    for (row, cells) in table.rows().enumerate() {
        for (col, cell) in cells.iter().enumerate() {
            write_cell(sheet, row as u32 + 1, col as u16, cell)?;
        }
    }
    Ok(())
}

/// Build a workbook with one sheet per `(name, table)`, in the given order.
///
/// Tables without rows still get a sheet with the header row.
pub fn build_workbook(sheets: &[(String, Table)]) -> Result<Workbook> {
    let mut workbook = Workbook::new();

    for (name, table) in sheets {
        let sheet = workbook.add_worksheet();
        sheet
            .set_name(name.as_str())
            .with_context(|| format!("Invalid sheet name '{}'", name))?;
        fill_sheet(sheet, table).with_context(|| format!("Failed to fill sheet '{}'", name))?;
    }

    Ok(workbook)
}

/// Check names against the worksheet naming rules before any work is done
pub fn validate_sheet_names<S: AsRef<str>>(names: &[S]) -> Result<()> {
    if names.is_empty() {
        anyhow::bail!("A workbook needs at least one sheet");
    }

    let mut seen: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let name = name.as_ref();
        if name.trim().is_empty() {
            anyhow::bail!("Sheet name must not be empty");
        }
        if name.chars().count() > 31 {
            anyhow::bail!("Sheet name '{}' is longer than 31 characters", name);
        }
        if name.contains(&['[', ']', ':', '*', '?', '/', '\\'][..]) {
            anyhow::bail!("Sheet name '{}' contains a character not allowed in sheet names", name);
        }
        if name.starts_with('\'') || name.ends_with('\'') {
            anyhow::bail!("Sheet name '{}' must not start or end with an apostrophe", name);
        }
        // Sheet names are case-insensitive
        let folded = name.to_lowercase();
        if seen.contains(&folded) {
            anyhow::bail!("Sheet name '{}' is used more than once", name);
        }
        seen.push(folded);
    }

    Ok(())
}

/// Write a multi-sheet workbook file.
///
/// The workbook is serialized in memory first; a failed save leaves no file behind.
pub fn write_workbook(sheets: &[(String, Table)], path: &Path) -> Result<()> {
    let mut workbook = build_workbook(sheets)?;
    let buffer = workbook
        .save_to_buffer()
        .with_context(|| format!("Failed to build workbook {}", path.display()))?;
    std::fs::write(path, buffer).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!("Wrote {} sheets to {}", sheets.len(), path.display());
    Ok(())
}
