use crate::error::{DatasetError, Result};
use crate::pairing::{is_caption_file, is_image, pair_uploads, ImportBatch, UploadFile};
use ignore::WalkBuilder;
use std::path::{Component, Path};

#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions {
    /// Descend into subdirectories; pairing then happens per directory
    pub recursive: bool,
}

/// Read every image and caption file under `dir`.
///
/// Hidden files are ignored. Names are relative to `dir` with `/` separators,
/// sources are absolute, and the result is sorted by path.
pub fn scan_directory(dir: &Path, options: ScanOptions) -> Result<Vec<UploadFile>> {
    if !dir.is_dir() {
        return Err(DatasetError::NotADirectory(dir.to_path_buf()));
    }
    let root = dir.canonicalize()?;

    let mut builder = WalkBuilder::new(&root);
    builder
        .standard_filters(false)
        .hidden(true)
        .max_depth(if options.recursive { None } else { Some(1) })
        .sort_by_file_name(|a, b| a.cmp(b));

    let mut files = Vec::new();
    for result in builder.build() {
        let entry = match result {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Failed to read entry: {e}");
                continue;
            }
        };
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }

        let path = entry.path();
        let Some(name) = relative_name(&root, path) else {
            continue;
        };
        if !is_image(&name) && !is_caption_file(&name) {
            log::debug!("Skipping {}", path.display());
            continue;
        }

        match std::fs::read(path) {
            Ok(bytes) => files.push(UploadFile::new(name, bytes).with_source(path)),
            Err(e) => log::warn!("Failed to read {}: {e}", path.display()),
        }
    }

    log::info!("Found {} image and caption files in {}", files.len(), dir.display());
    Ok(files)
}

/// Scan `dir` and pair what was found
pub fn import_directory(dir: &Path, options: ScanOptions) -> Result<ImportBatch> {
    pair_uploads(scan_directory(dir, options)?)
}

fn relative_name(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<&str> = rel
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.png"), b"A").unwrap();
        fs::write(dir.path().join("a.txt"), b"cat").unwrap();
        fs::write(dir.path().join(".hidden.png"), b"H").unwrap();
        fs::write(dir.path().join("readme.md"), b"x").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("a.png"), b"SUB").unwrap();
        fs::write(dir.path().join("sub").join("a.txt"), b"dog").unwrap();
        dir
    }

    #[test]
    fn flat_scan_stays_in_top_level() {
        let dir = fixture();
        let files = scan_directory(dir.path(), ScanOptions::default()).unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.png", "a.txt"]);
        let expected = dir.path().canonicalize().unwrap().join("a.png");
        assert_eq!(files[0].source.as_deref(), Some(expected.as_path()));
    }

    #[test]
    fn recursive_scan_pairs_per_directory() {
        let dir = fixture();
        let batch = import_directory(dir.path(), ScanOptions { recursive: true }).unwrap();
        let pairs: Vec<(&str, &str)> = batch
            .items
            .iter()
            .map(|item| (item.name.as_str(), item.caption.as_str()))
            .collect();
        assert_eq!(pairs, vec![("a.png", "cat"), ("sub/a.png", "dog")]);
    }

    #[test]
    fn missing_directory_is_rejected() {
        let dir = TempDir::new().unwrap();
        let err = scan_directory(&dir.path().join("nope"), ScanOptions::default()).unwrap_err();
        assert!(matches!(err, DatasetError::NotADirectory(_)));
    }
}
