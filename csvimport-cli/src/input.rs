//! Read CSV rows from a file or a directory of files

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::ReaderBuilder;

/// Byte-order mark some spreadsheet tools put in front of the first cell
const UTF8_BOM: char = '\u{feff}';

/// Read every row of a CSV file, or of all `*.csv` files in a directory
///
/// The header row, if any, is returned like any other row. Files in a
/// directory are read in name order and their rows concatenated; a file that
/// cannot be read is skipped with a warning.
pub fn read_rows(path: &Path) -> Result<Vec<Vec<String>>> {
    if !path.exists() {
        anyhow::bail!("File {} not found", path.display());
    }

    if !path.is_dir() {
        return read_file(path);
    }

    let mut rows = Vec::new();
    for file in csv_files(path)? {
        match read_file(&file) {
            Ok(mut file_rows) => {
                log::info!("Read {} rows from {}", file_rows.len(), file.display());
                rows.append(&mut file_rows);
            }
            Err(e) => log::warn!("Skipping {}: {:#}", file.display(), e),
        }
    }
    Ok(rows)
}

/// List `*.csv` files in a directory, sorted by name
fn csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        })
        .collect();
    files.sort();

    if files.is_empty() {
        log::warn!("No CSV files found in {}", dir.display());
    }
    Ok(files)
}

/// Read one CSV file into rows of text cells
fn read_file(path: &Path) -> Result<Vec<Vec<String>>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(BufReader::new(file));

    let mut rows = Vec::new();
    for (index, result) in reader.byte_records().enumerate() {
        let record = result.with_context(|| {
            format!("CSV parse error in {} at row {}", path.display(), index + 1)
        })?;

        let mut lossy = false;
        let mut row: Vec<String> = record
            .iter()
            .map(|cell| match std::str::from_utf8(cell) {
                Ok(text) => text.to_string(),
                Err(_) => {
                    lossy = true;
                    String::from_utf8_lossy(cell).into_owned()
                }
            })
            .collect();

        if lossy {
            log::warn!(
                "Row {} of {} is not valid UTF-8, invalid characters were replaced",
                index + 1,
                path.display()
            );
        }

        if index == 0 {
            if let Some(first) = row.first_mut() {
                if let Some(stripped) = first.strip_prefix(UTF8_BOM) {
                    *first = stripped.to_string();
                }
            }
        }

        rows.push(row);
    }

    Ok(rows)
}
