// Pipeline orchestration - the fixed step order over a working tree.
//
// Ordering constraints:
//   - structural rewrites (wrapper, ID folders) before any leaf rename
//   - registry binding and frontmatter before name cleaning (the CSV and
//     its folder are correlated through their ID-suffixed names)
//   - link rewriting after name cleaning (targets must match disk)
//   - .base generation last (embeds final relative paths)

use crate::error::Result;
use crate::registry::DatabaseRegistry;
use crate::{bases, collapse, frontmatter, links, registry};
use serde::Serialize;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Knobs for the optional pipeline steps.
#[derive(Debug, Clone)]
pub struct CleanOptions {
    /// Keep both Name.csv and Name_all.csv instead of merging to one.
    pub keep_all_csv: bool,
    /// Synthesize YAML frontmatter (and .base views) for database entries.
    pub frontmatter: bool,
}

impl Default for CleanOptions {
    fn default() -> Self {
        CleanOptions {
            keep_all_csv: false,
            frontmatter: true,
        }
    }
}

/// Per-step counts plus final tree tallies, reported at the end of a run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct Summary {
    pub id_folders_removed: usize,
    pub files_cleaned: usize,
    pub folders_cleaned: usize,
    pub csv_deduped: usize,
    pub frontmatter_added: usize,
    pub links_updated: usize,
    pub bases_created: usize,
    pub index_removed: bool,
    pub markdown_files: usize,
    pub csv_files: usize,
    pub base_files: usize,
    pub other_files: usize,
    pub folders: usize,
}

/// Run the full normalization pipeline over `root`, mutating it in place.
/// Per-file parse failures are logged and skipped; filesystem failures
/// propagate.
pub fn clean_tree(root: &Path, options: &CleanOptions) -> Result<Summary> {
    let mut summary = Summary::default();

    log::info!("Flattening wrapper folders");
    collapse::flatten_wrapper(root)?;

    summary.index_removed = collapse::remove_index_html(root)?;

    log::info!("Collapsing ID-only folders");
    summary.id_folders_removed = collapse::collapse_id_folders(root)?;

    if !options.keep_all_csv {
        log::info!("Deduplicating CSV exports");
        summary.csv_deduped = registry::dedupe_database_csvs(root)?;
    }

    if options.frontmatter {
        log::info!("Adding YAML frontmatter to database entries");
        let registry = DatabaseRegistry::build(root)?;
        summary.frontmatter_added = frontmatter::synthesize(&registry)?;
    }

    log::info!("Cleaning file and folder names");
    let (files, folders) = collapse::clean_names(root)?;
    summary.files_cleaned = files;
    summary.folders_cleaned = folders;

    log::info!("Updating internal links");
    summary.links_updated = links::rewrite_links(root)?;

    if options.frontmatter {
        log::info!("Generating .base files");
        summary.bases_created = bases::generate_bases(root)?;
    }

    tally(root, &mut summary);
    Ok(summary)
}

/// Final counts over the cleaned tree.
fn tally(root: &Path, summary: &mut Summary) {
    for entry in WalkDir::new(root).min_depth(1).into_iter().filter_map(|e| e.ok()) {
        if entry.file_type().is_dir() {
            summary.folders += 1;
            continue;
        }
        match entry.path().extension().and_then(|e| e.to_str()) {
            Some("md") => summary.markdown_files += 1,
            Some("csv") => summary.csv_files += 1,
            Some("base") => summary.base_files += 1,
            _ => summary.other_files += 1,
        }
    }
}

/// Replace `dest` with the finished working tree in a single directory
/// rename. The working tree and the destination must be on the same
/// filesystem.
pub fn publish(working: &Path, dest: &Path) -> Result<()> {
    if dest.exists() {
        fs::remove_dir_all(dest)?;
    }
    fs::rename(working, dest)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const ID: &str = "8f2fb47d8d79400e96243c1c411716dc";
    const ID2: &str = "1a2b3c4d5e6f7a8b9c0d1e2f3a4b5c6d";
    const ID3: &str = "aabbccddeeff00112233445566778899";

    fn write(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    /// A small but complete export: wrapper, index.html, a database with
    /// CSV variants and one entry, and a page linking into the database.
    fn seed_export(root: &Path) {
        let wrapper = root.join("Export-d1a2b3c4-0e1f-4a5b-8c9d-0e1f2a3b4c5d");
        write(&wrapper.join("index.html"), "<html></html>");
        write(
            &wrapper.join(format!("Home {ID3}.md")),
            &format!("Tasks live in [Task A](Projects {ID}/Task A {ID2}.csv)."),
        );

        let projects = wrapper.join(format!("Projects {ID}"));
        write(
            &projects.join(format!("Task A {ID2}.csv")),
            "\u{feff}Name,Status\nEntry 1,Done\n",
        );
        write(
            &projects.join(format!("Task A {ID2}_all.csv")),
            "\u{feff}Name,Status\nEntry 1,Done\nEntry 2,Archived\n",
        );
        write(
            &projects
                .join(format!("Task A {ID2}"))
                .join(format!("Entry 1 {ID3}.md")),
            "# Entry 1\n\nStatus: Done\n\nBody text",
        );
    }

    #[test]
    fn test_full_pipeline() {
        let tmp = TempDir::new().unwrap();
        seed_export(tmp.path());

        let summary = clean_tree(tmp.path(), &CleanOptions::default()).unwrap();

        // Wrapper and index are gone, names are clean
        assert!(tmp.path().join("Home.md").is_file());
        assert!(!tmp.path().join("index.html").exists());
        assert!(summary.index_removed);

        // The complete CSV survived under the plain name
        let csv = fs::read_to_string(tmp.path().join("Projects/Task A.csv")).unwrap();
        assert!(csv.contains("Entry 2"));
        assert_eq!(summary.csv_deduped, 1);

        // Entry got frontmatter from the pre-rename registry binding
        let entry = fs::read_to_string(tmp.path().join("Projects/Task A/Entry 1.md")).unwrap();
        assert_eq!(
            entry,
            "---\ntitle: \"Entry 1\"\nStatus: \"Done\"\n---\n\nBody text"
        );
        assert_eq!(summary.frontmatter_added, 1);

        // Link in Home.md points at the cleaned CSV path
        let home = fs::read_to_string(tmp.path().join("Home.md")).unwrap();
        assert!(home.contains("[Task A](Projects/Task A.csv)"));
        assert_eq!(summary.links_updated, 1);

        // View descriptor next to the cleaned CSV
        let base = fs::read_to_string(tmp.path().join("Projects/Task A.base")).unwrap();
        assert!(base.contains("file.inFolder(\"Projects/Task A\")"));
        assert!(base.contains("- file.name"));
        assert!(base.contains("- Status"));
        assert_eq!(summary.bases_created, 1);

        // Tallies
        assert_eq!(summary.markdown_files, 2);
        assert_eq!(summary.csv_files, 1);
        assert_eq!(summary.base_files, 1);
        assert_eq!(summary.other_files, 0);
        assert_eq!(summary.folders, 2);
    }

    #[test]
    fn test_pipeline_second_run_changes_nothing() {
        let tmp = TempDir::new().unwrap();
        seed_export(tmp.path());

        clean_tree(tmp.path(), &CleanOptions::default()).unwrap();
        let entry_before =
            fs::read_to_string(tmp.path().join("Projects/Task A/Entry 1.md")).unwrap();
        let base_before = fs::read_to_string(tmp.path().join("Projects/Task A.base")).unwrap();

        let second = clean_tree(tmp.path(), &CleanOptions::default()).unwrap();

        assert_eq!(second.id_folders_removed, 0);
        assert_eq!(second.files_cleaned, 0);
        assert_eq!(second.folders_cleaned, 0);
        assert_eq!(second.csv_deduped, 0);
        assert_eq!(second.frontmatter_added, 0);
        assert_eq!(second.links_updated, 0);
        assert!(!second.index_removed);

        assert_eq!(
            fs::read_to_string(tmp.path().join("Projects/Task A/Entry 1.md")).unwrap(),
            entry_before
        );
        assert_eq!(
            fs::read_to_string(tmp.path().join("Projects/Task A.base")).unwrap(),
            base_before
        );
    }

    #[test]
    fn test_pipeline_keep_all_csv() {
        let tmp = TempDir::new().unwrap();
        seed_export(tmp.path());

        let options = CleanOptions {
            keep_all_csv: true,
            frontmatter: true,
        };
        let summary = clean_tree(tmp.path(), &options).unwrap();

        assert_eq!(summary.csv_deduped, 0);
        assert!(tmp.path().join("Projects/Task A.csv").is_file());
        // The _all variant keeps its ID: the token is not directly before
        // the extension, so name cleaning leaves it alone
        assert!(tmp
            .path()
            .join(format!("Projects/Task A {ID2}_all.csv"))
            .is_file());
    }

    #[test]
    fn test_pipeline_no_frontmatter_skips_bases() {
        let tmp = TempDir::new().unwrap();
        seed_export(tmp.path());

        let options = CleanOptions {
            keep_all_csv: false,
            frontmatter: false,
        };
        let summary = clean_tree(tmp.path(), &options).unwrap();

        assert_eq!(summary.frontmatter_added, 0);
        assert_eq!(summary.bases_created, 0);
        let entry = fs::read_to_string(tmp.path().join("Projects/Task A/Entry 1.md")).unwrap();
        assert!(entry.starts_with("# Entry 1"));
        assert!(!tmp.path().join("Projects/Task A.base").exists());
    }

    #[test]
    fn test_pipeline_collapses_id_folders() {
        let tmp = TempDir::new().unwrap();
        write(
            &tmp.path().join("Notes").join(ID).join("page.md"),
            "content",
        );
        // Second root child so the sole-child flatten does not kick in
        write(&tmp.path().join("Home.md"), "home");

        let summary = clean_tree(tmp.path(), &CleanOptions::default()).unwrap();

        assert_eq!(summary.id_folders_removed, 1);
        assert!(tmp.path().join("Notes/page.md").is_file());
    }

    #[test]
    fn test_publish_replaces_destination() {
        let tmp = TempDir::new().unwrap();
        let working = tmp.path().join(".out_temp");
        write(&working.join("Home.md"), "new");
        let dest = tmp.path().join("out");
        write(&dest.join("stale.md"), "old");

        publish(&working, &dest).unwrap();

        assert!(!working.exists());
        assert!(dest.join("Home.md").is_file());
        assert!(!dest.join("stale.md").exists());
    }
}
