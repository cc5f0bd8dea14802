// Archive extraction - unpack a Notion export zip into a working tree.
// Large exports arrive as a zip whose only file entries are inner
// Part-N.zip archives; those are unpacked one level deeper.

use crate::error::{Result, TidyError};
use std::fs::{self, File};
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// Extract `archive` into `dest`, transparently handling the zip-of-zips
/// layout. Fails before any mutation when the input is missing or not a
/// valid zip archive.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<()> {
    if !archive.is_file() {
        return Err(TidyError::Input(format!(
            "'{}' not found",
            archive.display()
        )));
    }

    let mut zip = ZipArchive::new(File::open(archive)?)
        .map_err(|_| TidyError::Input(format!("'{}' is not a valid zip file", archive.display())))?;

    let names: Vec<String> = zip.file_names().map(String::from).collect();
    let mut inner_zips: Vec<&String> = names.iter().filter(|n| n.ends_with(".zip")).collect();
    let has_plain_files = names
        .iter()
        .any(|n| !n.ends_with(".zip") && !n.ends_with('/'));

    fs::create_dir_all(dest)?;

    if inner_zips.is_empty() || has_plain_files {
        return extract_into(&mut zip, dest);
    }

    // Zip-of-zips: stage the inner archives, then unpack each into dest
    inner_zips.sort();
    log::info!("Found {} inner zip(s)", inner_zips.len());

    let staging = tempfile::tempdir()?;
    extract_into(&mut zip, staging.path())?;

    for name in inner_zips {
        let inner_path = staging.path().join(name);
        let mut inner = ZipArchive::new(File::open(&inner_path)?)?;
        extract_into(&mut inner, dest)?;
    }

    Ok(())
}

/// Unpack every entry of an open archive under `dest`. Entries whose names
/// escape the destination are skipped.
fn extract_into<R: Read + Seek>(zip: &mut ZipArchive<R>, dest: &Path) -> Result<()> {
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let rel: PathBuf = match entry.enclosed_name() {
            Some(p) => p.to_owned(),
            None => {
                log::warn!("Skipping unsafe zip entry: {}", entry.name());
                continue;
            }
        };
        let out = dest.join(rel);

        if entry.is_dir() {
            fs::create_dir_all(&out)?;
            continue;
        }
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut target = File::create(&out)?;
        std::io::copy(&mut entry, &mut target)?;
    }
    Ok(())
}
