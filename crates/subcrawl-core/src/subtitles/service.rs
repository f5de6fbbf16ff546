use crate::media::MediaRecord;
use thiserror::Error;

/// The only status the remote service uses for success.
pub const STATUS_OK: &str = "200 OK";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RemoteError {
    #[error("fault {code}: {message}")]
    Fault { code: i64, message: String },

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("connection failed: {0}")]
    Connectivity(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("response not ready: {0}")]
    NotReady(String),

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoginResponse {
    pub status: String,
    pub token: Option<String>,
}

/// Search criteria for one media. A catalog id takes precedence over the free-text query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub imdb_id: Option<String>,
    pub query: String,
    pub language: String,
}

impl SearchQuery {
    pub fn for_record(record: &MediaRecord, language: &str) -> Self {
        Self {
            imdb_id: record.catalog_id().map(String::from),
            query: record.title.clone(),
            language: language.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub subtitle_id: i64,
    pub sub_file_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResponse {
    pub status: String,
    pub data: Vec<SearchHit>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadedSubtitle {
    pub subtitle_id: i64,
    /// Base64 of the gzip-compressed subtitle file.
    pub encoded_bytes: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadResponse {
    pub status: String,
    pub data: Vec<DownloadedSubtitle>,
}

/// Remote subtitle provider. Implementations must be shareable across the
/// threads that run chunk downloads.
pub trait SubtitleService: Sync {
    fn log_in(
        &self,
        username: &str,
        password: &str,
        language: &str,
        user_agent: &str,
    ) -> Result<LoginResponse, RemoteError>;

    fn search_subtitles(
        &self,
        token: &str,
        queries: &[SearchQuery],
        limit: u32,
    ) -> Result<SearchResponse, RemoteError>;

    /// At most 19 ids per call.
    fn download_subtitles(
        &self,
        token: &str,
        subtitle_ids: &[i64],
    ) -> Result<DownloadResponse, RemoteError>;

    fn log_out(&self, token: &str) -> Result<(), RemoteError>;
}
