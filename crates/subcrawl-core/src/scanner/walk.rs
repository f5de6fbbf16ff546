use crate::error::Error;
use glob::Pattern;
use std::path::{Path, PathBuf};
use tracing::error;
use walkdir::{DirEntry, WalkDir};

/// One directory and the names of the regular files directly inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryBatch {
    pub directory: PathBuf,
    pub file_names: Vec<String>,
}

impl DirectoryBatch {
    fn new(directory: PathBuf) -> Self {
        Self {
            directory,
            file_names: Vec::new(),
        }
    }
}

/// Lazy, top-down directory traversal yielding one `DirectoryBatch` per directory.
///
/// Children are sorted files-first, so every file of a directory is seen before the
/// walk descends into its subdirectories. A new directory entry closes the previous batch.
pub struct DirWalk {
    entries: Box<dyn Iterator<Item = walkdir::Result<DirEntry>> + Send>,
    current: Option<DirectoryBatch>,
}

impl Iterator for DirWalk {
    type Item = Result<DirectoryBatch, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.entries.next() {
                Some(Ok(entry)) => {
                    if entry.file_type().is_dir() {
                        let next = DirectoryBatch::new(entry.into_path());
                        if let Some(done) = self.current.replace(next) {
                            return Some(Ok(done));
                        }
                    } else if entry.file_type().is_file() {
                        if let Some(current) = self.current.as_mut() {
                            current
                                .file_names
                                .push(entry.file_name().to_string_lossy().into_owned());
                        }
                    }
                }
                Some(Err(err)) => return Some(Err(Error::Walk(err))),
                None => return self.current.take().map(Ok),
            }
        }
    }
}

/// Start a new traversal of `root`. Each call is independent of previous ones.
///
/// Directories and files matching any of `ignore_globs` are pruned. Symlinks are not followed.
pub fn walk(root: &Path, ignore_globs: &[String]) -> Result<DirWalk, Error> {
    if !root.is_dir() {
        return Err(Error::NotFound(root.to_path_buf()));
    }

    let ignore_patterns: Vec<Pattern> = ignore_globs
        .iter()
        .filter_map(|glob| match Pattern::new(glob) {
            Ok(p) => Some(p),
            Err(e) => {
                error!("Invalid glob pattern '{}': {}", glob, e);
                None
            }
        })
        .collect();

    let entries = WalkDir::new(root)
        .follow_links(false)
        .sort_by(|a, b| {
            a.file_type()
                .is_dir()
                .cmp(&b.file_type().is_dir())
                .then_with(|| a.file_name().cmp(b.file_name()))
        })
        .into_iter()
        .filter_entry(move |entry| {
            entry.depth() == 0
                || !ignore_patterns
                    .iter()
                    .any(|pattern| pattern.matches_path(entry.path()))
        });

    Ok(DirWalk {
        entries: Box::new(entries),
        current: None,
    })
}

/// Total number of files the walk would visit; used as the scan progress denominator.
pub fn count_files(root: &Path, ignore_globs: &[String]) -> Result<u64, Error> {
    let mut total = 0u64;
    for batch in walk(root, ignore_globs)? {
        total += batch?.file_names.len() as u64;
    }
    Ok(total)
}
