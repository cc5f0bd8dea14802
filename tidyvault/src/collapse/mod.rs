// Structural tree rewrites - wrapper flattening, ID-folder collapse, name cleaning.
// Depth-changing rewrites run before leaf renames, and every pass works
// deepest-first so a rename never goes through an already-moved ancestor.

use crate::error::Result;
use crate::names::{clean_name, is_export_wrapper, is_id_only, resolve_collision};
use std::cmp::Reverse;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Move every child of `dir` into `parent`, resolving name collisions
/// per child against live filesystem state.
fn promote_children(dir: &Path, parent: &Path) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let target = resolve_collision(&parent.join(entry.file_name()));
        fs::rename(entry.path(), target)?;
    }
    Ok(())
}

/// All paths under `root` (root excluded), deepest first.
fn paths_deepest_first(root: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .collect();
    paths.sort_by_key(|p| Reverse(p.components().count()));
    paths
}

/// Flatten top-level wrapper folders:
/// 1. the Export-UUID folder Notion always creates,
/// 2. a sole remaining top-level child folder after that.
/// At most two flattening operations; never recursive.
pub fn flatten_wrapper(root: &Path) -> Result<()> {
    let top_level: Vec<PathBuf> = fs::read_dir(root)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    for path in top_level {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if path.is_dir() && is_export_wrapper(name) {
            promote_children(&path, root)?;
            fs::remove_dir(&path)?;
            break;
        }
    }

    let children: Vec<PathBuf> = fs::read_dir(root)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    if children.len() == 1 && children[0].is_dir() {
        promote_children(&children[0], root)?;
        fs::remove_dir(&children[0])?;
    }

    Ok(())
}

/// Remove directories whose name is nothing but a hex ID by promoting
/// their children one level up. Scans repeat until a scan removes nothing,
/// which handles ID folders nested directly inside other ID folders.
/// Returns the number of folders removed.
pub fn collapse_id_folders(root: &Path) -> Result<usize> {
    let mut removed = 0;

    loop {
        let id_dirs: Vec<PathBuf> = paths_deepest_first(root)
            .into_iter()
            .filter(|p| {
                p.is_dir()
                    && p.file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(is_id_only)
            })
            .collect();

        let mut changed = false;
        for dir in id_dirs {
            // A shallower collapse in this scan may have moved this one
            if !dir.exists() {
                continue;
            }
            let Some(parent) = dir.parent() else { continue };
            promote_children(&dir, parent)?;
            fs::remove_dir(&dir)?;
            removed += 1;
            changed = true;
        }

        if !changed {
            return Ok(removed);
        }
    }
}

/// Delete the index.html Notion includes at the export root.
pub fn remove_index_html(root: &Path) -> Result<bool> {
    let index = root.join("index.html");
    if index.is_file() {
        fs::remove_file(index)?;
        return Ok(true);
    }
    Ok(false)
}

/// Strip Notion IDs from every file and folder name under `root`,
/// deepest first. Returns (files renamed, folders renamed).
pub fn clean_names(root: &Path) -> Result<(usize, usize)> {
    let mut files_cleaned = 0;
    let mut folders_cleaned = 0;

    for path in paths_deepest_first(root) {
        if !path.exists() {
            continue;
        }

        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            log::warn!("Skipping non-UTF-8 name: {}", path.display());
            continue;
        };

        let cleaned = clean_name(name);
        if cleaned != name {
            let parent = path.parent().unwrap_or(root);
            let target = resolve_collision(&parent.join(&cleaned));
            fs::rename(&path, &target)?;
            if target.is_file() {
                files_cleaned += 1;
            } else {
                folders_cleaned += 1;
            }
        }
    }

    Ok((files_cleaned, folders_cleaned))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ID: &str = "8f2fb47d8d79400e96243c1c411716dc";
    const ID2: &str = "1a2b3c4d5e6f7a8b9c0d1e2f3a4b5c6d";

    fn write(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_flatten_wrapper_promotes_children() {
        let tmp = TempDir::new().unwrap();
        let wrapper = tmp
            .path()
            .join("Export-d1a2b3c4-0e1f-4a5b-8c9d-0e1f2a3b4c5d");
        write(&wrapper.join("Home.md"), "hi");
        write(&wrapper.join("Projects/Task.md"), "task");

        flatten_wrapper(tmp.path()).unwrap();

        assert!(!wrapper.exists());
        assert!(tmp.path().join("Home.md").is_file());
        assert!(tmp.path().join("Projects/Task.md").is_file());
    }

    #[test]
    fn test_flatten_wrapper_then_sole_child() {
        // Wrapper contains a single folder; both levels flatten away
        let tmp = TempDir::new().unwrap();
        let wrapper = tmp
            .path()
            .join("Export-d1a2b3c4-0e1f-4a5b-8c9d-0e1f2a3b4c5d");
        write(&wrapper.join("My Workspace/Home.md"), "hi");

        flatten_wrapper(tmp.path()).unwrap();

        assert!(tmp.path().join("Home.md").is_file());
        assert!(!tmp.path().join("My Workspace").exists());
    }

    #[test]
    fn test_flatten_wrapper_leaves_multiple_children() {
        let tmp = TempDir::new().unwrap();
        write(&tmp.path().join("A/x.md"), "x");
        write(&tmp.path().join("B/y.md"), "y");

        flatten_wrapper(tmp.path()).unwrap();

        assert!(tmp.path().join("A/x.md").is_file());
        assert!(tmp.path().join("B/y.md").is_file());
    }

    #[test]
    fn test_collapse_id_folders_promotes_children() {
        let tmp = TempDir::new().unwrap();
        let id_dir = tmp.path().join("Projects").join(ID);
        write(&id_dir.join("a.md"), "a");
        write(&id_dir.join("b.md"), "b");

        let removed = collapse_id_folders(tmp.path()).unwrap();

        assert_eq!(removed, 1);
        assert!(!id_dir.exists());
        assert!(tmp.path().join("Projects/a.md").is_file());
        assert!(tmp.path().join("Projects/b.md").is_file());
    }

    #[test]
    fn test_collapse_nested_id_folders() {
        // ID folder directly inside another ID folder needs a second scan
        let tmp = TempDir::new().unwrap();
        let inner = tmp.path().join(ID).join(ID2);
        write(&inner.join("deep.md"), "deep");

        let removed = collapse_id_folders(tmp.path()).unwrap();

        assert_eq!(removed, 2);
        assert!(tmp.path().join("deep.md").is_file());
        assert!(!tmp.path().join(ID).exists());
    }

    #[test]
    fn test_collapse_resolves_name_collisions() {
        let tmp = TempDir::new().unwrap();
        write(&tmp.path().join("notes.md"), "outer");
        write(&tmp.path().join(ID).join("notes.md"), "inner");

        collapse_id_folders(tmp.path()).unwrap();

        assert_eq!(fs::read_to_string(tmp.path().join("notes.md")).unwrap(), "outer");
        assert_eq!(
            fs::read_to_string(tmp.path().join("notes (1).md")).unwrap(),
            "inner"
        );
    }

    #[test]
    fn test_remove_index_html() {
        let tmp = TempDir::new().unwrap();
        write(&tmp.path().join("index.html"), "<html/>");

        assert!(remove_index_html(tmp.path()).unwrap());
        assert!(!tmp.path().join("index.html").exists());
        // Second run is a no-op
        assert!(!remove_index_html(tmp.path()).unwrap());
    }

    #[test]
    fn test_clean_names_strips_ids_everywhere() {
        let tmp = TempDir::new().unwrap();
        write(
            &tmp.path()
                .join(format!("Projects {ID}"))
                .join(format!("Task A {ID2}.md")),
            "task",
        );

        let (files, folders) = clean_names(tmp.path()).unwrap();

        assert_eq!((files, folders), (1, 1));
        assert!(tmp.path().join("Projects/Task A.md").is_file());
    }

    #[test]
    fn test_clean_names_counts_nothing_on_clean_tree() {
        let tmp = TempDir::new().unwrap();
        write(&tmp.path().join("Projects/Task A.md"), "task");

        let (files, folders) = clean_names(tmp.path()).unwrap();
        assert_eq!((files, folders), (0, 0));
    }

    #[test]
    fn test_clean_names_resolves_collisions() {
        let tmp = TempDir::new().unwrap();
        write(&tmp.path().join("Page.md"), "plain");
        write(&tmp.path().join(format!("Page {ID}.md")), "suffixed");

        let (files, _) = clean_names(tmp.path()).unwrap();

        assert_eq!(files, 1);
        assert_eq!(fs::read_to_string(tmp.path().join("Page.md")).unwrap(), "plain");
        assert_eq!(
            fs::read_to_string(tmp.path().join("Page (1).md")).unwrap(),
            "suffixed"
        );
    }
}
