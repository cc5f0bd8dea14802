// Database discovery - correlate exported CSV files with their entry folders.
//
// Notion exports a database as:
//   Parent/Database <id>.csv          (filtered view)
//   Parent/Database <id>_all.csv      (all rows)
//   Parent/Database <id>/Entry <id>.md (one file per row)
//
// The CSV and the folder share the same base name before the ID, so the
// correlation strips the ID from both sides with the same function and
// must run while those IDs are still on disk.

use crate::error::Result;
use crate::names::{resolve_collision, strip_id_suffix};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One recognized database: its entry folder and the ordered property list
/// from the CSV header (everything after the "Name" column). Immutable once
/// built; descriptor order is the single source of truth for column order.
#[derive(Debug, Clone)]
pub struct Database {
    pub folder: PathBuf,
    pub properties: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DatabaseRegistry {
    pub databases: Vec<Database>,
}

impl DatabaseRegistry {
    /// Scan for database CSVs under `root` and bind each to its sibling
    /// entry folder. CSVs that fail to decode, have no header, have a first
    /// column other than "Name", have no remaining columns, or have no
    /// matching folder produce no descriptor and no error.
    pub fn build(root: &Path) -> Result<DatabaseRegistry> {
        let mut databases = Vec::new();

        for csv_path in csv_files(root) {
            if is_all_variant(&csv_path) {
                continue;
            }

            let Some(headers) = read_csv_header(&csv_path) else {
                continue;
            };
            let Some(properties) = database_properties(&headers) else {
                continue;
            };

            if let Some(folder) = matching_sibling_folder(&csv_path) {
                databases.push(Database { folder, properties });
            }
        }

        Ok(DatabaseRegistry { databases })
    }
}

/// Delete the filtered Name.csv when a Name_all.csv sibling exists, then
/// rename the _all file to the plain name. The complete view becomes the
/// sole surviving CSV for that database. Returns the number of filtered
/// files deleted.
pub fn dedupe_database_csvs(root: &Path) -> Result<usize> {
    let mut removed = 0;

    for all_csv in csv_files(root) {
        if !is_all_variant(&all_csv) {
            continue;
        }
        let Some(name) = all_csv.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let plain_name = name.replace("_all.csv", ".csv");
        let parent = all_csv.parent().unwrap_or(root);

        let filtered = parent.join(&plain_name);
        if filtered.exists() {
            fs::remove_file(&filtered)?;
            removed += 1;
        }

        let target = resolve_collision(&parent.join(&plain_name));
        fs::rename(&all_csv, target)?;
    }

    Ok(removed)
}

/// All .csv files under root, in path order for determinism.
fn csv_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "csv"))
        .collect();
    files.sort();
    files
}

fn is_all_variant(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with("_all.csv"))
}

/// Read and parse the first record of a CSV file: UTF-8 with optional BOM,
/// quote-aware (commas, newlines and doubled quotes inside quoted fields).
/// Returns None for undecodable bytes or an empty file.
pub fn read_csv_header(path: &Path) -> Option<Vec<String>> {
    let bytes = fs::read(path).ok()?;
    let text = match String::from_utf8(bytes) {
        Ok(t) => t,
        Err(_) => {
            log::warn!("Skipping undecodable CSV: {}", path.display());
            return None;
        }
    };
    parse_header_record(text.trim_start_matches('\u{feff}'))
}

/// Parse one CSV record from the start of `text`. Stops at the first
/// newline outside quotes. Returns None when there is no data at all.
fn parse_header_record(text: &str) -> Option<Vec<String>> {
    if text.is_empty() {
        return None;
    }

    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
        } else {
            match c {
                '"' => in_quotes = true,
                ',' => fields.push(std::mem::take(&mut field)),
                '\r' => {
                    if chars.peek() == Some(&'\n') {
                        chars.next();
                    }
                    break;
                }
                '\n' => break,
                _ => field.push(c),
            }
        }
    }

    fields.push(field);
    Some(fields)
}

/// The property columns of a database header: everything after a first
/// column that is exactly "Name" (trimmed), themselves trimmed, empties
/// dropped, duplicates and order preserved. None when the header does not
/// look like a database.
fn database_properties(headers: &[String]) -> Option<Vec<String>> {
    if headers.first().map(|h| h.trim()) != Some("Name") {
        return None;
    }

    let properties: Vec<String> = headers[1..]
        .iter()
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .collect();

    if properties.is_empty() {
        None
    } else {
        Some(properties)
    }
}

/// Find the sibling directory whose ID-stripped name equals the CSV's
/// ID-stripped stem. Both sides go through `strip_id_suffix`, so the match
/// works the same whether or not the IDs are still on disk.
pub fn matching_sibling_folder(csv_path: &Path) -> Option<PathBuf> {
    let stem = csv_path.file_stem()?.to_str()?;
    let wanted = strip_id_suffix(stem);
    let parent = csv_path.parent()?;

    let mut candidates: Vec<PathBuf> = fs::read_dir(parent)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    candidates.sort();

    candidates.into_iter().find(|dir| {
        dir.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| strip_id_suffix(n) == wanted)
    })
}
