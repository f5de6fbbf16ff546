use crate::error::Error;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;

/// Archive and raw subtitle formats that can hold subtitles for a sibling media file.
pub const SUBTITLE_CONTAINER_EXTENSIONS: [&str; 3] = [".RAR", ".ZIP", ".SRT"];

lazy_static! {
    static ref EXTENSION_TOKEN: Regex = Regex::new(r"(\.\w*)").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Media,
    SubtitleContainer,
}

/// Recognized media-file extensions, stored upper-case with the leading dot.
#[derive(Debug, Clone, Default)]
pub struct ExtensionSet {
    media: HashSet<String>,
}

impl ExtensionSet {
    /// Collect every dot-prefixed token in `text`, whatever the separators are.
    pub fn parse(text: &str) -> Self {
        let media = EXTENSION_TOKEN
            .find_iter(text)
            .map(|m| m.as_str().to_uppercase())
            .filter(|ext| ext.len() > 1)
            .collect();
        Self { media }
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(Self::parse(&text)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(Error::NotFound(path.to_path_buf()))
            }
            Err(err) => Err(Error::Io(err)),
        }
    }

    pub fn len(&self) -> usize {
        self.media.len()
    }

    pub fn is_empty(&self) -> bool {
        self.media.is_empty()
    }

    pub fn is_media(&self, file_name: &str) -> bool {
        dotted_extension(file_name).is_some_and(|ext| self.media.contains(&ext))
    }

    /// Media wins over subtitle container when an extension is listed as both.
    pub fn classify(&self, file_name: &str) -> Option<FileKind> {
        let ext = dotted_extension(file_name)?;
        if self.media.contains(&ext) {
            Some(FileKind::Media)
        } else if SUBTITLE_CONTAINER_EXTENSIONS.contains(&ext.as_str()) {
            Some(FileKind::SubtitleContainer)
        } else {
            None
        }
    }
}

/// Case-insensitive suffix test against the subtitle container formats.
pub fn is_subtitle_container(file_name: &str) -> bool {
    let upper = file_name.to_uppercase();
    SUBTITLE_CONTAINER_EXTENSIONS
        .iter()
        .any(|ext| upper.ends_with(ext))
}

/// Upper-cased extension with its leading dot, e.g. `".MKV"`.
pub fn dotted_extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_uppercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_any_separator() {
        let set = ExtensionSet::parse(".mkv\n.AVI .mp4, .m4v\n\n.");
        assert_eq!(set.len(), 4);
        assert!(set.is_media("Movie.MKV"));
        assert!(set.is_media("movie.avi"));
        assert!(!set.is_media("movie.srt"));
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        let set = ExtensionSet::parse(".mkv");
        assert_eq!(set.classify("a.MkV"), Some(FileKind::Media));
        assert_eq!(set.classify("a.SrT"), Some(FileKind::SubtitleContainer));
        assert_eq!(set.classify("a.rar"), Some(FileKind::SubtitleContainer));
        assert_eq!(set.classify("a.zip"), Some(FileKind::SubtitleContainer));
        assert_eq!(set.classify("a.nfo"), None);
        assert_eq!(set.classify("noextension"), None);
    }

    #[test]
    fn test_load_missing_file_is_not_found() {
        let result = ExtensionSet::load(Path::new("/definitely/not/here.txt"));
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_is_subtitle_container() {
        assert!(is_subtitle_container("Movie.2010.eng.srt"));
        assert!(is_subtitle_container("pack.ZIP"));
        assert!(!is_subtitle_container("Movie.sub"));
    }
}
