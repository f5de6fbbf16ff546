use super::models::*;
use super::sqlite::Database;
use crate::media::MediaRecord;
use rusqlite::{params, OptionalExtension, Result, Row};
use std::path::Path;
use tracing::debug;

const MEDIA_COLUMNS: &str =
    "id, file_name, path, extension, title, year, rating, subtitles, sub_language, sub_paths";

fn media_from_row(row: &Row) -> Result<MediaRecord> {
    let subtitles: Option<String> = row.get(7)?;
    let languages: Option<String> = row.get(8)?;
    let sub_paths: Option<String> = row.get(9)?;
    Ok(MediaRecord {
        id: row.get(0)?,
        file_name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        path: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        extension: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        title: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        year: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        rating: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
        has_subtitles: subtitles.as_deref() == Some("true"),
        subtitle_languages: languages
            .unwrap_or_default()
            .split_whitespace()
            .map(String::from)
            .collect(),
        subtitle_paths: sub_paths
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default(),
    })
}

impl Database {
    // ── Media ────────────────────────────────────────────────────

    /// Insert a record unless its path, then its id, is already known.
    /// Duplicates bump the session's duplicate counter; records without an id are skipped.
    pub fn insert_media(&mut self, record: &MediaRecord, table: MediaTable) -> Result<InsertOutcome> {
        if self.row_exists(table, &Condition::path(record.path.as_str()))?
            || self.row_exists(table, &Condition::id(record.id.as_str()))?
        {
            self.duplicate_files += 1;
            debug!("Duplicate media skipped: {}", record.path);
            return Ok(InsertOutcome::Duplicate);
        }
        if record.id.is_empty() {
            debug!("Media without id skipped: {}", record.path);
            return Ok(InsertOutcome::Skipped);
        }

        let languages: Vec<&str> = record.subtitle_languages.iter().map(String::as_str).collect();
        let sub_paths = serde_json::to_string(&record.subtitle_paths).unwrap_or_default();
        self.connection().execute(
            &format!(
                "INSERT INTO {} ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                table.name(),
                MEDIA_COLUMNS
            ),
            params![
                record.id,
                record.file_name,
                record.path,
                record.extension,
                record.title,
                record.year,
                record.rating,
                record.has_subtitles.to_string(),
                languages.join(" "),
                sub_paths,
            ],
        )?;
        Ok(InsertOutcome::Inserted)
    }

    fn row_exists(&self, table: MediaTable, condition: &Condition) -> Result<bool> {
        self.connection()
            .query_row(
                &format!(
                    "SELECT 1 FROM {} WHERE {} = ?1 LIMIT 1",
                    table.name(),
                    condition.column.name()
                ),
                params![condition.value],
                |_| Ok(()),
            )
            .optional()
            .map(|found| found.is_some())
    }

    /// Rows in insertion order, optionally filtered by one column.
    pub fn retrieve(&self, table: MediaTable, condition: Option<&Condition>) -> Result<Vec<MediaRecord>> {
        let mut sql = format!("SELECT {} FROM {}", MEDIA_COLUMNS, table.name());
        if let Some(condition) = condition {
            sql.push_str(&format!(" WHERE {} = ?1", condition.column.name()));
        }
        sql.push_str(" ORDER BY rowid");

        let mut stmt = self.connection().prepare(&sql)?;
        let rows = match condition {
            Some(condition) => stmt.query_map(params![condition.value], media_from_row)?,
            None => stmt.query_map([], media_from_row)?,
        };
        rows.collect()
    }

    pub fn delete_by_condition(&self, table: MediaTable, condition: &Condition) -> Result<usize> {
        self.connection().execute(
            &format!(
                "DELETE FROM {} WHERE {} = ?1",
                table.name(),
                condition.column.name()
            ),
            params![condition.value],
        )
    }

    /// Remove every record whose file is gone from disk. Returns how many were removed.
    pub fn reconcile(&self, table: MediaTable) -> Result<usize> {
        let mut removed = 0;
        for record in self.retrieve(table, None)? {
            if !Path::new(&record.path).is_file() {
                removed += self.delete_by_condition(table, &Condition::path(record.path.as_str()))?;
                debug!("Removed missing file from {}: {}", table.name(), record.path);
            }
        }
        Ok(removed)
    }

    // ── Selection ────────────────────────────────────────────────

    /// Stage library rows matching `condition`; rows already staged are skipped.
    pub fn copy_selection(&self, condition: &Condition) -> Result<usize> {
        self.connection().execute(
            &format!(
                "INSERT OR IGNORE INTO {to} ({cols}) SELECT {cols} FROM {from} WHERE {col} = ?1",
                to = MediaTable::Selection.name(),
                from = MediaTable::Library.name(),
                cols = MEDIA_COLUMNS,
                col = condition.column.name(),
            ),
            params![condition.value],
        )
    }

    pub fn copy_all_to_selection(&self) -> Result<usize> {
        self.connection().execute(
            &format!(
                "INSERT OR IGNORE INTO {to} ({cols}) SELECT {cols} FROM {from}",
                to = MediaTable::Selection.name(),
                from = MediaTable::Library.name(),
                cols = MEDIA_COLUMNS,
            ),
            [],
        )
    }

    pub fn clear_selection(&self) -> Result<()> {
        self.connection()
            .execute(&format!("DELETE FROM {}", MediaTable::Selection.name()), [])?;
        Ok(())
    }

    /// Empty a table. The selection is row-deleted; every other table is dropped and recreated.
    pub fn clear_all(&self, table: Table) -> Result<()> {
        if table == Table::Media(MediaTable::Selection) {
            return self.clear_selection();
        }
        self.connection()
            .execute_batch(&format!("DROP TABLE IF EXISTS {};", table.name()))?;
        self.create_schema()?;
        debug!("Table {} cleared", table.name());
        Ok(())
    }

    pub fn count(&self, table: Table) -> Result<i64> {
        self.connection().query_row(
            &format!("SELECT COUNT(*) FROM {}", table.name()),
            [],
            |row| row.get(0),
        )
    }

    // ── Search candidates ────────────────────────────────────────

    /// Returns false when a candidate with the same subtitle id is already stored.
    pub fn insert_candidate(&self, candidate: &SearchCandidate) -> Result<bool> {
        let inserted = self.connection().execute(
            "INSERT OR IGNORE INTO search_candidates \
             (subtitle_id, media_id, file_name, movie_directory) VALUES (?1, ?2, ?3, ?4)",
            params![
                candidate.subtitle_id,
                candidate.media_id,
                candidate.file_name,
                candidate.movie_directory,
            ],
        )?;
        Ok(inserted > 0)
    }

    pub fn candidates(&self) -> Result<Vec<SearchCandidate>> {
        let mut stmt = self.connection().prepare(
            "SELECT subtitle_id, media_id, file_name, movie_directory \
             FROM search_candidates ORDER BY subtitle_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(SearchCandidate {
                subtitle_id: row.get(0)?,
                media_id: row.get(1)?,
                file_name: row.get(2)?,
                movie_directory: row.get(3)?,
            })
        })?;
        rows.collect()
    }

    pub fn candidate(&self, subtitle_id: i64) -> Result<Option<SearchCandidate>> {
        self.connection()
            .query_row(
                "SELECT subtitle_id, media_id, file_name, movie_directory \
                 FROM search_candidates WHERE subtitle_id = ?1",
                params![subtitle_id],
                |row| {
                    Ok(SearchCandidate {
                        subtitle_id: row.get(0)?,
                        media_id: row.get(1)?,
                        file_name: row.get(2)?,
                        movie_directory: row.get(3)?,
                    })
                },
            )
            .optional()
    }

    // ── Download payloads ────────────────────────────────────────

    pub fn insert_payload(&self, payload: &DownloadPayload) -> Result<bool> {
        let inserted = self.connection().execute(
            "INSERT OR IGNORE INTO download_payloads (subtitle_id, encoded_bytes) VALUES (?1, ?2)",
            params![payload.subtitle_id, payload.encoded_bytes],
        )?;
        Ok(inserted > 0)
    }

    pub fn payloads(&self) -> Result<Vec<DownloadPayload>> {
        let mut stmt = self
            .connection()
            .prepare("SELECT subtitle_id, encoded_bytes FROM download_payloads ORDER BY subtitle_id")?;
        let rows = stmt.query_map([], |row| {
            Ok(DownloadPayload {
                subtitle_id: row.get(0)?,
                encoded_bytes: row.get(1)?,
            })
        })?;
        rows.collect()
    }

    /// Drop both transient tables at the end of a download cycle.
    pub fn clear_transient(&self) -> Result<()> {
        self.clear_all(Table::SearchCandidates)?;
        self.clear_all(Table::DownloadPayloads)
    }
}
