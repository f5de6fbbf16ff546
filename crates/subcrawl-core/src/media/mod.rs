pub mod catalog;
pub mod title;

pub use catalog::{CatalogEntry, CatalogLookup, OfflineCatalog, OmdbCatalog};
pub use title::TitleYear;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Kind of media a file represents. Each kind carries its own title heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaKind {
    #[default]
    Movie,
}

impl MediaKind {
    pub fn extract(&self, raw_file_name: &str) -> TitleYear {
        match self {
            MediaKind::Movie => title::extract(raw_file_name),
        }
    }
}

/// A discovered media file as persisted in the store.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MediaRecord {
    pub id: String,
    pub file_name: String,
    pub path: String,
    pub extension: String,
    pub title: String,
    pub year: String,
    pub rating: String,
    pub has_subtitles: bool,
    pub subtitle_languages: BTreeSet<String>,
    /// Subtitle containers found next to the file at scan time.
    pub subtitle_paths: Vec<String>,
}

impl MediaRecord {
    /// Build a record from a file path, extracting title and year with `kind`'s heuristics.
    /// The id is left empty; the caller resolves or generates it.
    pub fn from_path(kind: MediaKind, path: &Path) -> Self {
        let file_name = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let TitleYear { title, year } = kind.extract(&file_name);

        Self {
            file_name,
            path: path.to_string_lossy().into_owned(),
            extension,
            title,
            year,
            ..Default::default()
        }
    }

    pub fn attach_subtitles(&mut self, subtitle_paths: &[PathBuf]) {
        if subtitle_paths.is_empty() {
            return;
        }
        self.has_subtitles = true;
        self.subtitle_paths = subtitle_paths
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
    }

    pub fn directory(&self) -> PathBuf {
        Path::new(&self.path)
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    /// Numeric IMDb id (without the `tt` prefix) when the id came from the catalog.
    pub fn catalog_id(&self) -> Option<&str> {
        let digits = self.id.strip_prefix("tt")?;
        if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
            Some(digits)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path_extracts_fields() {
        let record = MediaRecord::from_path(
            MediaKind::Movie,
            Path::new("/movies/12 Angry Men 1957 1080p BluRay x264 AAC - Ozlem.mkv"),
        );
        assert_eq!(record.file_name, "12 Angry Men 1957 1080p BluRay x264 AAC - Ozlem.mkv");
        assert_eq!(record.extension, ".mkv");
        assert_eq!(record.title, "12 Angry Men");
        assert_eq!(record.year, "1957");
        assert_eq!(record.directory(), PathBuf::from("/movies"));
        assert!(record.id.is_empty());
        assert!(!record.has_subtitles);
    }

    #[test]
    fn test_attach_subtitles_sets_flag() {
        let mut record = MediaRecord::from_path(MediaKind::Movie, Path::new("/m/Film.2001.mkv"));
        record.attach_subtitles(&[]);
        assert!(!record.has_subtitles);
        record.attach_subtitles(&[PathBuf::from("/m/Film.srt")]);
        assert!(record.has_subtitles);
        assert_eq!(record.subtitle_paths, vec!["/m/Film.srt".to_string()]);
    }

    #[test]
    fn test_catalog_id_only_for_imdb_ids() {
        let mut record = MediaRecord {
            id: "tt0050083".to_string(),
            ..Default::default()
        };
        assert_eq!(record.catalog_id(), Some("0050083"));
        record.id = "local-00ab".to_string();
        assert_eq!(record.catalog_id(), None);
        record.id = "tt".to_string();
        assert_eq!(record.catalog_id(), None);
    }
}
