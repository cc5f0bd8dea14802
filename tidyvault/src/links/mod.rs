// Link rewriting - point intra-tree markdown links at the cleaned names.
// Must run after the physical renames so targets match what is on disk.

use crate::error::Result;
use crate::names::{clean_name, is_id_only};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// `[text](target)` - prefix, target, closing paren captured separately.
static MD_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\[[^\]]*\]\()([^)]+)(\))").unwrap());

/// Rewrite markdown link targets under `root`. External targets (web
/// schemes, in-page anchors, mailto) are left alone; everything else has
/// ID-only path segments dropped and the rest cleaned. Returns the number
/// of links changed.
pub fn rewrite_links(root: &Path) -> Result<usize> {
    let mut updated = 0;

    for md_file in markdown_files(root) {
        let text = match fs::read_to_string(&md_file) {
            Ok(t) => t,
            Err(e) => {
                log::warn!("Skipping unreadable file {}: {e}", md_file.display());
                continue;
            }
        };

        let mut changed = 0;
        let new_text = MD_LINK.replace_all(&text, |caps: &Captures| {
            match rewrite_target(&caps[2]) {
                Some(target) => {
                    changed += 1;
                    format!("{}{}{}", &caps[1], target, &caps[3])
                }
                None => caps[0].to_string(),
            }
        });

        if changed > 0 {
            fs::write(&md_file, new_text.as_bytes())?;
            updated += changed;
        }
    }

    Ok(updated)
}

/// The cleaned form of a link target, or None when nothing changes.
fn rewrite_target(target: &str) -> Option<String> {
    if target.starts_with("http://")
        || target.starts_with("https://")
        || target.starts_with('#')
        || target.starts_with("mailto:")
    {
        return None;
    }

    let cleaned: Vec<String> = target
        .split('/')
        .filter(|segment| !is_id_only(segment))
        .map(clean_name)
        .collect();
    let cleaned = cleaned.join("/");

    (cleaned != target).then_some(cleaned)
}

fn markdown_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "md"))
        .collect();
    files.sort();
    files
}
