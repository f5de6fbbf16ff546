pub mod models;
mod queries;
pub mod sqlite;

pub use models::{
    Condition, DownloadPayload, InsertOutcome, MediaColumn, MediaTable, SearchCandidate, Table,
};
pub use sqlite::{Database, OpenMode};
