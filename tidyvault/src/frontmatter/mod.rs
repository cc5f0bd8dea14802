// Frontmatter synthesis - rewrite the inline property block Notion puts at
// the top of database entry files into a YAML header.
//
// Before:                          After:
//   # Fix Security Issues            ---
//                                    title: "Fix Security Issues"
//   Scope: StandupBot                Scope: "StandupBot"
//   Status: Not started              Status: "Not started"
//                                    ---
//   ## About this project
//   ...                              ## About this project
//
// Runs while file and folder names still carry their export IDs; the
// registry was built from those same names.

use crate::error::Result;
use crate::registry::DatabaseRegistry;
use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use unicode_general_category::{get_general_category, GeneralCategory};

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Date/time shapes Notion writes into property values.
/// Formats with a time component come first so "October 13, 2022 6:09 PM"
/// is not truncated by a date-only parse.
const DATETIME_FORMATS: [&str; 3] = [
    "%B %d, %Y %I:%M %p",    // "October 13, 2022 6:09 PM"
    "%B %d, %Y %I:%M:%S %p", // "October 13, 2022 6:09:00 PM"
    "%b %d, %Y %I:%M %p",    // "Oct 13, 2022 6:09 PM"
];
const DATE_FORMATS: [&str; 2] = [
    "%B %d, %Y", // "October 13, 2022"
    "%b %d, %Y", // "Oct 13, 2022"
];

/// Convert entry files in every registered database folder. Returns the
/// number of files rewritten. Files whose first line is not a heading, or
/// with no recognized property line, are left untouched.
pub fn synthesize(registry: &DatabaseRegistry) -> Result<usize> {
    let mut converted = 0;

    for db in &registry.databases {
        for md_file in entry_files(&db.folder) {
            let text = match fs::read_to_string(&md_file) {
                Ok(t) => t,
                Err(e) => {
                    log::warn!("Skipping unreadable entry {}: {e}", md_file.display());
                    continue;
                }
            };

            if let Some(new_text) = convert_entry(&text, &db.properties) {
                fs::write(&md_file, new_text)?;
                converted += 1;
            }
        }
    }

    Ok(converted)
}

/// Direct-child markdown files of a database folder, in path order.
fn entry_files(folder: &std::path::Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = match fs::read_dir(folder) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "md"))
            .collect(),
        Err(_) => Vec::new(),
    };
    files.sort();
    files
}

/// Rewrite a single entry's text, or None when the file is not a
/// structured entry (no leading heading, or zero recognized properties).
fn convert_entry(text: &str, properties: &[String]) -> Option<String> {
    let lines: Vec<&str> = text.split('\n').collect();

    let first = lines.first()?;
    if !first.starts_with("# ") {
        return None;
    }
    let title = first[2..].trim();

    let props_lower: HashMap<String, &str> = properties
        .iter()
        .map(|p| (p.to_lowercase(), p.as_str()))
        .collect();

    // Skip blank lines after the title, then consume Key: Value lines that
    // match a known property. A blank line after at least one property ends
    // the block; any other unrecognized line ends it too.
    let mut found: HashMap<&str, &str> = HashMap::new();
    let mut found_any = false;
    let mut idx = 1;

    while idx < lines.len() {
        let line = lines[idx].trim();

        if line.is_empty() {
            if found_any {
                idx += 1;
                break;
            }
            idx += 1;
            continue;
        }

        let mut recognized = None;
        if let Some(colon) = line.find(':') {
            if colon > 0 {
                if let Some(&prop) = props_lower.get(&line[..colon].trim().to_lowercase()) {
                    recognized = Some((prop, line[colon + 1..].trim()));
                }
            }
        }

        match recognized {
            Some((prop, value)) => {
                found.insert(prop, value);
                found_any = true;
                idx += 1;
            }
            None => break,
        }
    }

    if !found_any {
        return None;
    }

    // Header block: title first, then properties in CSV column order with
    // the CSV's casing, regardless of the order they appeared in the file.
    let mut header = vec!["---".to_string()];
    header.push(format!("title: \"{}\"", yaml_escape(title)));

    for prop in properties {
        let Some(value) = found.get(prop.as_str()) else { continue };
        let key = strip_symbols(prop);
        if key.is_empty() {
            continue;
        }
        if value.is_empty() {
            header.push(format!("{key}: \"\""));
        } else if let Some(iso) = to_iso_date(value) {
            header.push(format!("{key}: {iso}"));
        } else {
            header.push(format!("{key}: \"{}\"", yaml_escape(value)));
        }
    }
    header.push("---".to_string());

    let mut rest = &lines[idx..];
    while rest.first().is_some_and(|l| l.trim().is_empty()) {
        rest = &rest[1..];
    }

    Some(format!("{}\n\n{}", header.join("\n"), rest.join("\n")))
}

/// Escape backslash and double-quote for a double-quoted YAML scalar.
fn yaml_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn is_symbol_char(c: char) -> bool {
    let cp = c as u32;
    matches!(
        get_general_category(c),
        GeneralCategory::OtherSymbol | GeneralCategory::ModifierSymbol | GeneralCategory::Unassigned
    ) || (0x1F000..=0x1FFFF).contains(&cp) // supplemental symbols & emoticons
        || (0x2600..=0x27BF).contains(&cp) // misc symbols & dingbats
        || (0xFE00..=0xFE0F).contains(&cp) // variation selectors
        || cp == 0x200D // zero-width joiner
}

/// Remove emoji and symbol characters and collapse the whitespace they
/// leave behind. Notion lets property names start with an emoji.
pub fn strip_symbols(text: &str) -> String {
    let kept: String = text.chars().filter(|c| !is_symbol_char(*c)).collect();
    WHITESPACE_RUN.replace_all(&kept, " ").trim().to_string()
}

/// Re-emit a Notion date string as ISO 8601, or None if it matches none of
/// the known shapes. Date-only inputs yield YYYY-MM-DD; inputs with a time
/// yield YYYY-MM-DDTHH:MM.
pub fn to_iso_date(value: &str) -> Option<String> {
    let value = value.trim();

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt.format("%Y-%m-%dT%H:%M").to_string());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(value, fmt) {
            return Some(d.format("%Y-%m-%d").to_string());
        }
    }

    None
}
