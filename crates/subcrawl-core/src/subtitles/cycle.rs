use super::codec;
use super::preference::SubtitlePreference;
use super::service::*;
use crate::error::Error;
use crate::media::MediaRecord;
use crate::progress::{percent, CancelToken, ProgressReporter};
use crate::scanner::extensions::is_subtitle_container;
use crate::storage::{Database, DownloadPayload, MediaTable, SearchCandidate};
use rayon::prelude::*;
use std::path::Path;
use tracing::{debug, info, warn};

/// The service rejects download calls with 20 or more ids.
pub const MAX_IDS_PER_DOWNLOAD: usize = 19;
pub const SEARCH_LIMIT: u32 = 10;

// Anonymous access: blank credentials are accepted by the service.
const USERNAME: &str = "";
const PASSWORD: &str = "";
const USER_AGENT: &str = "SubcrawlProjectUserAgent";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CycleState {
    #[default]
    Idle,
    LoggedIn,
    Searching,
    Downloading,
    Decoding,
    LoggedOut,
    Error,
}

/// Outcome of one search -> download -> decode cycle.
#[derive(Debug, Clone, Default)]
pub struct DownloadReport {
    pub final_state: CycleState,
    pub searched: usize,
    pub candidates: usize,
    /// Titles for which no usable subtitle was found.
    pub not_found: Vec<String>,
    pub download_calls: usize,
    pub failed_chunks: usize,
    pub downloaded_files: usize,
    pub cancelled: bool,
    /// Every status line reported during the cycle, in order.
    pub messages: Vec<String>,
}

/// Everything a cycle needs from its caller.
pub struct CycleContext<'a> {
    pub store: &'a mut Database,
    pub preference: &'a SubtitlePreference,
    pub reporter: &'a dyn ProgressReporter,
    pub cancel: &'a CancelToken,
}

enum ChunkOutcome {
    Skipped,
    Done(Result<DownloadResponse, RemoteError>),
}

pub struct DownloadCycle<'a, S: SubtitleService> {
    service: &'a S,
    ctx: CycleContext<'a>,
    state: CycleState,
    connection_lost: bool,
    report: DownloadReport,
}

/// Run a full cycle over the current selection.
pub fn download_subtitles<S: SubtitleService>(
    service: &S,
    ctx: CycleContext<'_>,
) -> Result<DownloadReport, Error> {
    DownloadCycle::new(service, ctx).run()
}

impl<'a, S: SubtitleService> DownloadCycle<'a, S> {
    pub fn new(service: &'a S, ctx: CycleContext<'a>) -> Self {
        Self {
            service,
            ctx,
            state: CycleState::Idle,
            connection_lost: false,
            report: DownloadReport::default(),
        }
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    /// Remote failures are reported through the status sink and never returned.
    /// Only store failures come back as `Err`, after logout and cleanup were attempted.
    pub fn run(mut self) -> Result<DownloadReport, Error> {
        let Some(token) = self.log_in() else {
            self.ctx.store.clear_transient()?;
            self.ctx.store.commit_and_renew()?;
            self.report.final_state = self.state;
            return Ok(self.report);
        };

        let outcome = self.transfer(&token);
        if let Err(err) = &outcome {
            self.status(format!("Download cycle stopped: {}", err));
            self.transition(CycleState::Error);
        }

        self.log_out(&token);

        let cleanup = self
            .ctx
            .store
            .clear_transient()
            .and_then(|_| self.ctx.store.commit_and_renew());
        outcome?;
        cleanup?;

        if self.report.cancelled {
            self.status(format!(
                "Download cancelled. Downloaded {} files",
                self.report.downloaded_files
            ));
        } else {
            self.status(format!(
                "Download finished! Downloaded {} files",
                self.report.downloaded_files
            ));
        }
        self.report.final_state = self.state;
        Ok(self.report)
    }

    fn transfer(&mut self, token: &str) -> Result<(), Error> {
        self.search_phase(token)?;
        if !self.connection_lost && !self.report.cancelled {
            self.download_phase(token)?;
        }
        self.decode_phase()
    }

    fn transition(&mut self, next: CycleState) {
        debug!("Cycle state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn status(&mut self, message: String) {
        info!("{}", message);
        self.ctx.reporter.on_status(&message);
        self.report.messages.push(message);
    }

    fn mark_cancelled(&mut self) {
        if !self.report.cancelled {
            self.report.cancelled = true;
            self.status("Cancellation requested, stopping".to_string());
        }
    }

    // ── Login / logout ───────────────────────────────────────────

    fn log_in(&mut self) -> Option<String> {
        self.status("Logging in to OpenSubtitles, please wait ...".to_string());
        let language = self.ctx.preference.language_iso2.clone();

        match self.service.log_in(USERNAME, PASSWORD, &language, USER_AGENT) {
            Ok(login) if login.status == STATUS_OK => match login.token {
                Some(token) if !token.is_empty() => {
                    self.transition(CycleState::LoggedIn);
                    self.status("Connected to OpenSubtitles database".to_string());
                    Some(token)
                }
                _ => {
                    self.fail_login("The received payload is probably incorrect".to_string());
                    None
                }
            },
            Ok(login) => {
                self.fail_login(format!("Login refused by OpenSubtitles: {}", login.status));
                None
            }
            Err(err) => {
                warn!("Login failed: {}", err);
                self.fail_login(login_failure_message(&err));
                None
            }
        }
    }

    fn fail_login(&mut self, message: String) {
        self.status(message);
        self.transition(CycleState::Error);
    }

    fn log_out(&mut self, token: &str) {
        self.status("Finishing up ...".to_string());
        match self.service.log_out(token) {
            Ok(()) => {
                if self.state != CycleState::Error && !self.connection_lost {
                    self.transition(CycleState::LoggedOut);
                } else {
                    self.transition(CycleState::Error);
                }
            }
            Err(err) => {
                self.status(format!("Logging out of OpenSubtitles failed: {}", err));
                self.transition(CycleState::Error);
            }
        }
    }

    // ── Search ───────────────────────────────────────────────────

    fn search_phase(&mut self, token: &str) -> Result<(), Error> {
        self.transition(CycleState::Searching);
        let selection = self.ctx.store.retrieve(MediaTable::Selection, None)?;
        let total = selection.len() as u64;
        info!("Searching subtitles for {} selected media", total);

        for (index, record) in selection.iter().enumerate() {
            if self.ctx.cancel.is_cancelled() {
                self.mark_cancelled();
                break;
            }
            self.search_one(token, record)?;
            if self.connection_lost {
                break;
            }
            self.ctx.reporter.on_progress(percent(index as u64 + 1, total));
        }

        self.ctx.store.commit_and_renew()?;
        Ok(())
    }

    fn search_one(&mut self, token: &str, record: &MediaRecord) -> Result<(), Error> {
        self.report.searched += 1;
        let query = SearchQuery::for_record(record, &self.ctx.preference.language_iso3);

        let response = match self
            .service
            .search_subtitles(token, std::slice::from_ref(&query), SEARCH_LIMIT)
        {
            Ok(response) => response,
            Err(RemoteError::Connectivity(reason)) => {
                warn!("Connection lost while searching: {}", reason);
                self.connection_lost = true;
                self.status("Please check your internet connection.".to_string());
                self.transition(CycleState::Error);
                return Ok(());
            }
            Err(RemoteError::Fault { code, message }) => {
                self.status(format!(
                    "A fault has occurred while searching for {}: {} {}",
                    record.title, code, message
                ));
                return Ok(());
            }
            Err(err) => {
                self.status(format!("Searching for {} failed: {}", record.title, err));
                return Ok(());
            }
        };

        if response.status != STATUS_OK {
            self.status(format!("Wrong status code: {}", response.status));
            return Ok(());
        }

        match select_candidate(&response.data, record) {
            Some(candidate) => {
                if self.ctx.store.insert_candidate(&candidate)? {
                    self.report.candidates += 1;
                    debug!(
                        "Candidate {} '{}' for {}",
                        candidate.subtitle_id, candidate.file_name, record.path
                    );
                }
            }
            None => {
                self.report.not_found.push(record.title.clone());
                self.status(format!("no subtitles found for {}", record.title));
            }
        }
        Ok(())
    }

    // ── Download ─────────────────────────────────────────────────

    fn download_phase(&mut self, token: &str) -> Result<(), Error> {
        self.transition(CycleState::Downloading);
        let ids: Vec<i64> = self
            .ctx
            .store
            .candidates()?
            .iter()
            .map(|c| c.subtitle_id)
            .collect();
        let chunks: Vec<&[i64]> = ids.chunks(MAX_IDS_PER_DOWNLOAD).collect();
        info!(
            "Downloading {} subtitles in {} batches",
            ids.len(),
            chunks.len()
        );

        let service = self.service;
        let cancel = self.ctx.cancel;
        let outcomes: Vec<ChunkOutcome> = chunks
            .par_iter()
            .map(|chunk| {
                if cancel.is_cancelled() {
                    return ChunkOutcome::Skipped;
                }
                ChunkOutcome::Done(service.download_subtitles(token, chunk))
            })
            .collect();

        for (index, outcome) in outcomes.into_iter().enumerate() {
            let response = match outcome {
                ChunkOutcome::Skipped => {
                    self.mark_cancelled();
                    continue;
                }
                ChunkOutcome::Done(response) => response,
            };
            self.report.download_calls += 1;

            match response {
                Ok(response) if response.status == STATUS_OK => {
                    for item in response.data {
                        self.ctx.store.insert_payload(&DownloadPayload {
                            subtitle_id: item.subtitle_id,
                            encoded_bytes: item.encoded_bytes,
                        })?;
                    }
                }
                Ok(response) => {
                    self.report.failed_chunks += 1;
                    self.status(format!(
                        "There was an error while trying to download your file: {}",
                        response.status
                    ));
                }
                Err(err) => {
                    self.report.failed_chunks += 1;
                    warn!("Batch {} failed: {}", index + 1, err);
                    self.status(download_failure_message(&err));
                }
            }
        }

        self.ctx.store.commit_and_renew()?;
        Ok(())
    }

    // ── Decode ───────────────────────────────────────────────────

    fn decode_phase(&mut self) -> Result<(), Error> {
        self.transition(CycleState::Decoding);
        let payloads = self.ctx.store.payloads()?;
        let total_bytes: u64 = payloads.iter().map(|p| p.encoded_bytes.len() as u64).sum();
        let mut processed = 0u64;

        for payload in &payloads {
            processed += payload.encoded_bytes.len() as u64;

            match self.ctx.store.candidate(payload.subtitle_id)? {
                Some(candidate) => self.write_one(&candidate, payload),
                None => self.status(format!(
                    "Received subtitle {} that was never requested",
                    payload.subtitle_id
                )),
            }
            self.ctx.reporter.on_progress(percent(processed, total_bytes));
        }
        Ok(())
    }

    fn write_one(&mut self, candidate: &SearchCandidate, payload: &DownloadPayload) {
        match codec::write_subtitle(
            Path::new(&candidate.movie_directory),
            &candidate.file_name,
            &payload.encoded_bytes,
        ) {
            Ok(path) => {
                self.report.downloaded_files += 1;
                debug!("Wrote {}", path.display());
            }
            Err(err) => {
                self.status(format!("Could not write {}: {}", candidate.file_name, err));
            }
        }
    }
}

/// First hit, in response order, whose file is a subtitle container.
fn select_candidate(hits: &[SearchHit], record: &MediaRecord) -> Option<SearchCandidate> {
    hits.iter()
        .find(|hit| is_subtitle_container(&hit.sub_file_name))
        .map(|hit| SearchCandidate {
            subtitle_id: hit.subtitle_id,
            media_id: record.id.clone(),
            file_name: hit.sub_file_name.clone(),
            movie_directory: record.directory().to_string_lossy().into_owned(),
        })
}

fn login_failure_message(err: &RemoteError) -> String {
    match err {
        RemoteError::Fault { .. } => {
            "There was a fault while logging in to OpenSubtitles. Please try again.".to_string()
        }
        RemoteError::Protocol(_) | RemoteError::NotReady(_) => {
            "There was an error with the server. Please try again later.".to_string()
        }
        RemoteError::Connectivity(_) => "Please check your internet connection.".to_string(),
        RemoteError::Malformed(_) => "The received payload is probably incorrect".to_string(),
        RemoteError::Other(reason) => format!("Be sure to send us this error: {}", reason),
    }
}

fn download_failure_message(err: &RemoteError) -> String {
    match err {
        RemoteError::Protocol(_) => "There has been a ProtocolError during downloading".to_string(),
        RemoteError::NotReady(_) => {
            "There has been a ResponseNotReady Error during downloading".to_string()
        }
        other => format!(
            "There was an error while trying to download your file: {}",
            other
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(id: i64, name: &str) -> SearchHit {
        SearchHit {
            subtitle_id: id,
            sub_file_name: name.to_string(),
        }
    }

    fn record() -> MediaRecord {
        MediaRecord {
            id: "tt0113277".to_string(),
            path: "/movies/Heat/Heat.1995.mkv".to_string(),
            title: "Heat".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_first_container_hit_wins() {
        let hits = vec![
            hit(1, "Heat.1995.sub"),
            hit(2, "Heat.1995.SRT"),
            hit(3, "Heat.1995.zip"),
        ];
        let candidate = select_candidate(&hits, &record()).unwrap();
        assert_eq!(candidate.subtitle_id, 2);
        assert_eq!(candidate.media_id, "tt0113277");
        assert_eq!(candidate.file_name, "Heat.1995.SRT");
        assert_eq!(candidate.movie_directory, "/movies/Heat");
    }

    #[test]
    fn test_no_container_hit() {
        let hits = vec![hit(1, "Heat.1995.sub"), hit(2, "Heat.1995.idx")];
        assert!(select_candidate(&hits, &record()).is_none());
        assert!(select_candidate(&[], &record()).is_none());
    }

    #[test]
    fn test_login_messages_are_distinct() {
        let errors = [
            RemoteError::Fault {
                code: 1,
                message: String::new(),
            },
            RemoteError::Protocol(String::new()),
            RemoteError::Connectivity(String::new()),
            RemoteError::Malformed(String::new()),
            RemoteError::Other("boom".to_string()),
        ];
        let mut messages: Vec<String> = errors.iter().map(login_failure_message).collect();
        messages.sort();
        messages.dedup();
        assert_eq!(messages.len(), errors.len());
    }
}
