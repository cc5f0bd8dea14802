// Obsidian .base generation - one table-view descriptor per database.
// Runs after name cleaning and link rewriting, so the folder path baked
// into the filter is the final relative path.

use crate::error::Result;
use crate::frontmatter::strip_symbols;
use crate::registry::read_csv_header;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// For every surviving database CSV with a sibling folder of the same base
/// name, write `<name>.base` next to the CSV describing a table over the
/// folder's markdown files. Returns the number of descriptors created.
pub fn generate_bases(root: &Path) -> Result<usize> {
    let mut created = 0;

    for csv_path in csv_files(root) {
        let Some(headers) = read_csv_header(&csv_path) else {
            continue;
        };
        if headers.first().map(|h| h.trim()) != Some("Name") {
            continue;
        }

        let Some(stem) = csv_path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let Some(parent) = csv_path.parent() else { continue };

        // Post-cleaning the folder name matches the CSV stem exactly
        let folder = parent.join(stem);
        if !folder.is_dir() {
            continue;
        }

        let properties: Vec<String> = headers[1..]
            .iter()
            .map(|h| strip_symbols(h.trim()))
            .filter(|h| !h.is_empty())
            .collect();

        let rel_folder = folder.strip_prefix(root).unwrap_or(&folder);
        let folder_str = rel_folder.to_string_lossy().replace('\\', "/");

        let content = base_content(stem, &folder_str, &properties);
        fs::write(parent.join(format!("{stem}.base")), content)?;
        created += 1;
    }

    Ok(created)
}

/// The .base file body: a filter pinning the view to markdown files inside
/// the database folder, and a single table view with file.name first and
/// the header properties in CSV order.
fn base_content(name: &str, folder: &str, properties: &[String]) -> String {
    let mut lines = vec![
        "filters:".to_string(),
        "  and:".to_string(),
        format!("    - file.inFolder(\"{folder}\")"),
        "    - 'file.ext == \"md\"'".to_string(),
        String::new(),
        "views:".to_string(),
        "  - type: table".to_string(),
        format!("    name: \"{name}\""),
        "    order:".to_string(),
        "      - file.name".to_string(),
    ];
    for prop in properties {
        lines.push(format!("      - {prop}"));
    }
    lines.join("\n") + "\n"
}

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
