/// Tables that hold `MediaRecord` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaTable {
    /// Every media file found by scans.
    Library,
    /// Records the user wants subtitles for in the next cycle.
    Selection,
}

impl MediaTable {
    pub fn name(&self) -> &'static str {
        match self {
            MediaTable::Library => "media",
            MediaTable::Selection => "selected_media",
        }
    }
}

/// Every table in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Media(MediaTable),
    SearchCandidates,
    DownloadPayloads,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Media(table) => table.name(),
            Table::SearchCandidates => "search_candidates",
            Table::DownloadPayloads => "download_payloads",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaColumn {
    Id,
    FileName,
    Path,
    Extension,
    Title,
    Year,
    Rating,
    /// Stored as the text `true` or `false`.
    Subtitles,
}

impl MediaColumn {
    pub fn name(&self) -> &'static str {
        match self {
            MediaColumn::Id => "id",
            MediaColumn::FileName => "file_name",
            MediaColumn::Path => "path",
            MediaColumn::Extension => "extension",
            MediaColumn::Title => "title",
            MediaColumn::Year => "year",
            MediaColumn::Rating => "rating",
            MediaColumn::Subtitles => "subtitles",
        }
    }
}

/// Single-column equality filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub column: MediaColumn,
    pub value: String,
}

impl Condition {
    pub fn eq(column: MediaColumn, value: impl Into<String>) -> Self {
        Self {
            column,
            value: value.into(),
        }
    }

    pub fn id(value: impl Into<String>) -> Self {
        Self::eq(MediaColumn::Id, value)
    }

    pub fn path(value: impl Into<String>) -> Self {
        Self::eq(MediaColumn::Path, value)
    }

    pub fn has_subtitles(value: bool) -> Self {
        Self::eq(MediaColumn::Subtitles, value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// Path or id already present; counted, not stored.
    Duplicate,
    /// Record had no id.
    Skipped,
}

/// Best remote search hit for one selected media, pending download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCandidate {
    pub subtitle_id: i64,
    pub media_id: String,
    pub file_name: String,
    pub movie_directory: String,
}

/// Base64 text of a gzip-compressed subtitle, as returned by the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadPayload {
    pub subtitle_id: i64,
    pub encoded_bytes: String,
}
