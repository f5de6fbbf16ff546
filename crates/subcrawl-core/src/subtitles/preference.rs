use crate::error::Error;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::Path;

/// One entry of the ISO 639 language directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Language {
    #[serde(rename = "English_Name")]
    pub name: String,
    #[serde(rename = "Alpha2_Code", default)]
    pub iso2: String,
    #[serde(rename = "Alpha3b_Code")]
    pub iso3: String,
}

#[derive(Debug, Clone, Default)]
pub struct LanguageDirectory {
    languages: Vec<Language>,
}

impl LanguageDirectory {
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        let languages = serde_json::from_str(json)?;
        Ok(Self { languages })
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        let json = match fs::read_to_string(path) {
            Ok(json) => json,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(Error::NotFound(path.to_path_buf()))
            }
            Err(err) => return Err(Error::Io(err)),
        };
        Self::parse(&json).map_err(|e| Error::Resource {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn find(&self, name: &str) -> Option<&Language> {
        self.languages.iter().find(|l| l.name == name)
    }

    /// Language names in directory order, for a picker.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.languages.iter().map(|l| l.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.languages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }
}

/// Language the user wants subtitles in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitlePreference {
    pub language_name: String,
    pub language_iso2: String,
    pub language_iso3: String,
}

impl Default for SubtitlePreference {
    fn default() -> Self {
        Self {
            language_name: "Albanian".to_string(),
            language_iso2: "sq".to_string(),
            language_iso3: "alb".to_string(),
        }
    }
}

impl SubtitlePreference {
    /// Switch to `name` if the directory knows it. Returns false and keeps the
    /// current language otherwise.
    pub fn set_language(&mut self, name: &str, directory: &LanguageDirectory) -> bool {
        match directory.find(name) {
            Some(language) => {
                self.language_name = language.name.clone();
                self.language_iso2 = language.iso2.clone();
                self.language_iso3 = language.iso3.clone();
                true
            }
            None => false,
        }
    }
}
