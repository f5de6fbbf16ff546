use crate::config::AppConfig;
use crate::error::Error;
use crate::media::{CatalogLookup, MediaKind, MediaRecord};
use crate::progress::{percent, CancelToken, ProgressReporter};
use crate::scanner::{self, ExtensionSet, ScanFolder};
use crate::storage::{Condition, Database, InsertOutcome, MediaTable, OpenMode, Table};
use crate::subtitles::{
    self, CycleContext, CycleState, DownloadReport, LanguageDirectory, SubtitlePreference,
    SubtitleService,
};
use std::hash::Hasher as _;
use std::io;
use std::path::Path;
use twox_hash::XxHash64;
use tracing::{debug, info, warn};

/// Owns the store for one invocation and sequences the scan and download workflows.
pub struct Library {
    config: AppConfig,
    store: Database,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub files_scanned: u64,
    pub media_found: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub cancelled: bool,
}

impl Library {
    /// Open the configured store for writing and drop records whose files are gone.
    pub fn open(config: AppConfig) -> Result<Self, Error> {
        let store = Database::open(&config.database_path)?;
        Self::with_store(config, store)
    }

    /// Open for inspection only. Scanning, selecting and downloading will fail.
    pub fn open_read_only(config: AppConfig) -> Result<Self, Error> {
        let store = Database::open_read_only(&config.database_path)?;
        Self::with_store(config, store)
    }

    pub fn with_store(config: AppConfig, mut store: Database) -> Result<Self, Error> {
        if store.mode() == OpenMode::ReadWrite {
            let removed = store.reconcile(MediaTable::Library)?;
            store.commit_and_renew()?;
            if removed > 0 {
                info!("Removed {} media whose files no longer exist", removed);
            }
        }
        Ok(Self { config, store })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &Database {
        &self.store
    }

    /// Walk `root`, pair media with sibling subtitle containers and persist every new media.
    pub fn scan(
        &mut self,
        root: &Path,
        catalog: &dyn CatalogLookup,
        reporter: &dyn ProgressReporter,
        cancel: &CancelToken,
    ) -> Result<ScanResult, Error> {
        let extensions = ExtensionSet::load(&self.config.extensions_file)?;
        // Stored paths are the dedup key: always absolute, no `.` or `..` components.
        let root = root.canonicalize().map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => Error::NotFound(root.to_path_buf()),
            _ => Error::Io(err),
        })?;
        let root = root.as_path();
        let ignore = &self.config.ignore_patterns;
        let total = scanner::count_files(root, ignore)?;
        info!("Scanning {} ({} files)", root.display(), total);
        reporter.on_status(&format!("Scanning {}", root.display()));

        let mut result = ScanResult::default();
        for batch in scanner::walk(root, ignore)? {
            if cancel.is_cancelled() {
                result.cancelled = true;
                break;
            }
            let batch = batch?;
            result.files_scanned += batch.file_names.len() as u64;

            let folder = ScanFolder::from_batch(&batch, &extensions);
            for pairing in folder.pairings() {
                let mut record = MediaRecord::from_path(MediaKind::Movie, &pairing.media_path);
                record.attach_subtitles(&pairing.subtitle_paths);
                resolve_identity(&mut record, catalog);
                result.media_found += 1;

                match self.store.insert_media(&record, MediaTable::Library)? {
                    InsertOutcome::Inserted => result.inserted += 1,
                    InsertOutcome::Duplicate => result.duplicates += 1,
                    InsertOutcome::Skipped => {}
                }
            }
            reporter.on_progress(percent(result.files_scanned, total));
        }

        self.store.commit_and_renew()?;
        info!(
            "Scan finished: {} files, {} media, {} new, {} duplicates",
            result.files_scanned, result.media_found, result.inserted, result.duplicates
        );
        if result.cancelled {
            reporter.on_status("Scan cancelled");
        } else {
            reporter.on_status(&format!("Found {} new media", result.inserted));
        }
        Ok(result)
    }

    pub fn list(&self, table: MediaTable) -> Result<Vec<MediaRecord>, Error> {
        Ok(self.store.retrieve(table, None)?)
    }

    /// Only the media that do, or do not, have subtitle containers next to them.
    pub fn list_by_subtitles(
        &self,
        table: MediaTable,
        has_subtitles: bool,
    ) -> Result<Vec<MediaRecord>, Error> {
        Ok(self
            .store
            .retrieve(table, Some(&Condition::has_subtitles(has_subtitles)))?)
    }

    /// Stage the given library ids for download. Returns how many rows were staged.
    pub fn select(&mut self, ids: &[String]) -> Result<usize, Error> {
        let mut staged = 0;
        for id in ids {
            let copied = self.store.copy_selection(&Condition::id(id.as_str()))?;
            if copied == 0 {
                debug!("Nothing staged for id {}", id);
            }
            staged += copied;
        }
        self.store.commit_and_renew()?;
        Ok(staged)
    }

    pub fn select_all(&mut self) -> Result<usize, Error> {
        let staged = self.store.copy_all_to_selection()?;
        self.store.commit_and_renew()?;
        Ok(staged)
    }

    pub fn cancel_selection(&mut self) -> Result<(), Error> {
        self.store.clear_selection()?;
        self.store.commit_and_renew()?;
        Ok(())
    }

    /// Remove a media from both the library and the selection.
    pub fn remove_media(&mut self, id: &str) -> Result<usize, Error> {
        let condition = Condition::id(id);
        let removed = self.store.delete_by_condition(MediaTable::Library, &condition)?;
        self.store.delete_by_condition(MediaTable::Selection, &condition)?;
        self.store.commit_and_renew()?;
        Ok(removed)
    }

    pub fn clear_library(&mut self) -> Result<(), Error> {
        self.store.clear_all(Table::Media(MediaTable::Library))?;
        self.store.commit_and_renew()?;
        info!("Library cleared");
        Ok(())
    }

    /// Preference for the configured language, or `language` when given.
    pub fn subtitle_preference(&self, language: Option<&str>) -> Result<SubtitlePreference, Error> {
        let directory = LanguageDirectory::load(&self.config.languages_file)?;
        let name = language.unwrap_or(&self.config.language);
        let mut preference = SubtitlePreference::default();
        if !preference.set_language(name, &directory) {
            return Err(Error::Other(format!("Unknown subtitle language: {}", name)));
        }
        Ok(preference)
    }

    /// Run one download cycle over the selection. A cycle that reaches logout without
    /// being cancelled clears the selection.
    pub fn download_subtitles<S: SubtitleService>(
        &mut self,
        service: &S,
        preference: &SubtitlePreference,
        reporter: &dyn ProgressReporter,
        cancel: &CancelToken,
    ) -> Result<DownloadReport, Error> {
        let ctx = CycleContext {
            store: &mut self.store,
            preference,
            reporter,
            cancel,
        };
        let report = subtitles::download_subtitles(service, ctx)?;

        if report.final_state == CycleState::LoggedOut && !report.cancelled {
            self.store.clear_selection()?;
            self.store.commit_and_renew()?;
        }
        Ok(report)
    }

    pub fn close(self) -> Result<(), Error> {
        Ok(self.store.close()?)
    }
}

/// Give `record` its catalog identity, falling back to a surrogate id.
fn resolve_identity(record: &mut MediaRecord, catalog: &dyn CatalogLookup) {
    match catalog.resolve(&record.title, &record.year) {
        Ok(Some(entry)) => {
            debug!("Resolved {} as {}", record.path, entry.id);
            record.id = entry.id;
            if !entry.title.is_empty() {
                record.title = entry.title;
            }
            record.rating = entry.rating;
            if record.year.is_empty() {
                record.year = entry.year;
            }
        }
        Ok(None) => record.id = surrogate_id(&record.path),
        Err(e) => {
            warn!("Catalog lookup failed for {}: {}", record.title, e);
            record.id = surrogate_id(&record.path);
        }
    }
}

/// Deterministic local id derived from the file path.
pub fn surrogate_id(path: &str) -> String {
    let mut hasher = XxHash64::default();
    hasher.write(path.as_bytes());
    format!("local-{:016x}", hasher.finish())
}
