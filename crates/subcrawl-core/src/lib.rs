pub mod config;
pub mod engine;
pub mod error;
pub mod media;
pub mod progress;
pub mod scanner;
pub mod storage;
pub mod subtitles;

pub use config::AppConfig;
pub use engine::{Library, ScanResult};
pub use error::Error;
pub use progress::{CancelToken, ProgressReporter, SilentReporter};
pub use subtitles::{DownloadReport, SubtitlePreference};
