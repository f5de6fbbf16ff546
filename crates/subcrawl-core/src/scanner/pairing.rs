use super::extensions::{ExtensionSet, FileKind};
use super::walk::DirectoryBatch;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFile {
    pub path: PathBuf,
    pub kind: FileKind,
}

/// A directory's classified files. The file list is frozen once built.
#[derive(Debug, Clone)]
pub struct ScanFolder {
    pub path: PathBuf,
    files: Box<[ScanFile]>,
}

/// A media file together with every subtitle container sitting next to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPairing {
    pub media_path: PathBuf,
    pub subtitle_paths: Vec<PathBuf>,
}

impl ScanFolder {
    /// Classify a directory's files; files that are neither media nor subtitle containers are dropped.
    pub fn from_batch(batch: &DirectoryBatch, extensions: &ExtensionSet) -> Self {
        let files: Vec<ScanFile> = batch
            .file_names
            .iter()
            .filter_map(|name| {
                extensions.classify(name).map(|kind| ScanFile {
                    path: batch.directory.join(name),
                    kind,
                })
            })
            .collect();

        Self {
            path: batch.directory.clone(),
            files: files.into_boxed_slice(),
        }
    }

    pub fn files(&self) -> &[ScanFile] {
        &self.files
    }

    fn paths_of(&self, kind: FileKind) -> impl Iterator<Item = &PathBuf> {
        self.files
            .iter()
            .filter(move |f| f.kind == kind)
            .map(|f| &f.path)
    }

    /// One pairing per media file; each gets the full set of sibling subtitle containers.
    pub fn pairings(&self) -> Vec<MediaPairing> {
        let subtitles: Vec<PathBuf> = self.paths_of(FileKind::SubtitleContainer).cloned().collect();
        self.paths_of(FileKind::Media)
            .map(|media| MediaPairing {
                media_path: media.clone(),
                subtitle_paths: subtitles.clone(),
            })
            .collect()
    }
}
