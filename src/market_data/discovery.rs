use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::debug;

use super::{QuoteStoreError, StoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Quotes,
    Status,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct DiscoveredFiles {
    pub quotes: Vec<PathBuf>,
    pub statuses: Vec<PathBuf>,
}

/// File-name matcher for one instrument:
/// `<QTE|STS>_<date>_<isin>_<a>_<b>_1.csv`, optionally gzip-compressed.
#[derive(Debug, Clone)]
pub struct FilePattern {
    re: Regex,
}

impl FilePattern {
    pub fn for_isin(isin: &str) -> StoreResult<Self> {
        let pattern = format!(r"^(QTE|STS)_([0-9\-]+)_{}_(.+?)_(.+?)_1\.csv(\.gz)?$", regex::escape(isin));
        Ok(Self { re: Regex::new(&pattern)? })
    }

    pub fn classify(&self, file_name: &str) -> Option<FileKind> {
        let caps = self.re.captures(file_name)?;
        match &caps[1] {
            "QTE" => Some(FileKind::Quotes),
            "STS" => Some(FileKind::Status),
            _ => None,
        }
    }
}

/// True for names ending in `.gz`; their content must go through a gzip decoder.
pub fn is_gzip(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "gz")
}

fn walk(dir: &Path, pattern: &FilePattern, found: &mut DiscoveredFiles) -> StoreResult<()> {
    let entries = fs::read_dir(dir).map_err(|source| QuoteStoreError::Io { path: dir.to_path_buf(), source })?;
    for entry in entries {
        let entry = entry.map_err(|source| QuoteStoreError::Io { path: dir.to_path_buf(), source })?;
        let path = entry.path();
        if path.is_dir() {
            walk(&path, pattern, found)?;
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else { continue };
        match pattern.classify(name) {
            Some(FileKind::Quotes) => found.quotes.push(path),
            Some(FileKind::Status) => found.statuses.push(path),
            None => {}
        }
    }
    Ok(())
}

/// Recursively collect the quote and status files of one instrument.
pub fn discover(root: &Path, isin: &str) -> StoreResult<DiscoveredFiles> {
    let mut found = DiscoveredFiles::default();
    walk(root, &FilePattern::for_isin(isin)?, &mut found)?;
    found.quotes.sort();
    found.statuses.sort();
    debug!(root = %root.display(), isin, quotes = found.quotes.len(), statuses = found.statuses.len(), "discovered files");
    Ok(found)
}
