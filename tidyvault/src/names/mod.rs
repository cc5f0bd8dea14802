// Name normalization - ID stripping, space decoding, collision suffixes

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Matches the trailing 32-char hex ID Notion appends after a space.
/// "Home e82f1f46f47e4859aef48d9da4875832" -> "Home"
static ID_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s+[0-9a-f]{32}$").unwrap());

/// Matches a name that is *entirely* a 32-char hex ID (no readable text).
static ID_ONLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^[0-9a-f]{32}$").unwrap());

/// Matches the top-level Export-UUID folder Notion creates.
static EXPORT_WRAPPER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^Export-[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
        .unwrap()
});

/// Remove a trailing hex ID from a bare stem (no extension handling).
/// Used on CSV stems and folder names when correlating databases, so both
/// sides of the match go through the same stripping.
pub fn strip_id_suffix(stem: &str) -> String {
    ID_SUFFIX.replace(stem, "").trim().to_string()
}

/// Remove the trailing hex ID from a file or folder name, keeping the
/// extension. If stripping would leave nothing, the name is returned as-is.
fn strip_id(name: &str) -> String {
    let (stem, ext) = match name.rfind('.') {
        Some(pos) if pos > 0 => (&name[..pos], &name[pos..]),
        _ => (name, ""),
    };

    let cleaned = strip_id_suffix(stem);
    if cleaned.is_empty() {
        name.to_string()
    } else {
        format!("{cleaned}{ext}")
    }
}

/// Strip the Notion ID and normalize the name. Idempotent.
pub fn clean_name(name: &str) -> String {
    strip_id(name).replace("%20", " ").trim().to_string()
}

/// Whether a name is just a hex ID with no readable text.
pub fn is_id_only(name: &str) -> bool {
    ID_ONLY.is_match(name)
}

/// Whether a name is the Export-UUID wrapper folder.
pub fn is_export_wrapper(name: &str) -> bool {
    EXPORT_WRAPPER.is_match(name)
}

/// If `target` already exists, append " (n)" before the extension for the
/// smallest free n. Checks live filesystem state, so it must be called
/// immediately before the rename it protects.
pub fn resolve_collision(target: &Path) -> PathBuf {
    if !target.exists() {
        return target.to_path_buf();
    }

    let parent = target.parent().unwrap_or_else(|| Path::new(""));
    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = target
        .extension()
        .map(|s| format!(".{}", s.to_string_lossy()))
        .unwrap_or_default();

    let mut counter = 1;
    loop {
        let candidate = parent.join(format!("{stem} ({counter}){ext}"));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}
