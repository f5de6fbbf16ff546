pub mod codec;
pub mod cycle;
pub mod opensubtitles;
pub mod preference;
pub mod service;
pub mod xmlrpc;

pub use cycle::{
    download_subtitles, CycleContext, CycleState, DownloadCycle, DownloadReport,
    MAX_IDS_PER_DOWNLOAD,
};
pub use opensubtitles::OpenSubtitlesClient;
pub use preference::{Language, LanguageDirectory, SubtitlePreference};
pub use service::{
    DownloadResponse, DownloadedSubtitle, LoginResponse, RemoteError, SearchHit, SearchQuery,
    SearchResponse, SubtitleService, STATUS_OK,
};
