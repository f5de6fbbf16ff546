use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::{tempdir, TempDir};

use subcrawl_core::media::OfflineCatalog;
use subcrawl_core::storage::{MediaTable, Table};
use subcrawl_core::subtitles::codec::encode_subtitle;
use subcrawl_core::subtitles::*;
use subcrawl_core::{AppConfig, CancelToken, Library, SilentReporter};

const TOKEN: &str = "session-token";

/// In-memory stand-in for the remote service. Every title in `hits` resolves to one
/// subtitle id; download calls are recorded in the order they arrive.
#[derive(Default)]
struct FakeService {
    login_error: Option<RemoteError>,
    search_error: Option<RemoteError>,
    hits: HashMap<String, i64>,
    failing_id: Option<i64>,
    /// Non-OK search status per title.
    search_status: HashMap<String, String>,
    /// Non-OK status for every download call.
    download_status: Option<String>,
    /// Subtitle whose payload is not valid base64.
    corrupt_id: Option<i64>,
    searches: Mutex<Vec<SearchQuery>>,
    download_calls: Mutex<Vec<Vec<i64>>>,
    logouts: Mutex<usize>,
}

fn subtitle_text(id: i64) -> String {
    format!("1\n00:00:01,000 --> 00:00:02,000\nLine for {}\n", id)
}

impl SubtitleService for FakeService {
    fn log_in(
        &self,
        _username: &str,
        _password: &str,
        _language: &str,
        _user_agent: &str,
    ) -> Result<LoginResponse, RemoteError> {
        match &self.login_error {
            Some(err) => Err(err.clone()),
            None => Ok(LoginResponse {
                status: STATUS_OK.to_string(),
                token: Some(TOKEN.to_string()),
            }),
        }
    }

    fn search_subtitles(
        &self,
        token: &str,
        queries: &[SearchQuery],
        _limit: u32,
    ) -> Result<SearchResponse, RemoteError> {
        assert_eq!(token, TOKEN);
        self.searches.lock().unwrap().extend_from_slice(queries);
        if let Some(err) = &self.search_error {
            return Err(err.clone());
        }
        if let Some(status) = queries.iter().find_map(|q| self.search_status.get(&q.query)) {
            return Ok(SearchResponse {
                status: status.clone(),
                data: Vec::new(),
            });
        }
        let data = queries
            .iter()
            .filter_map(|q| self.hits.get(&q.query).map(|id| (q, *id)))
            .flat_map(|(q, id)| {
                vec![
                    SearchHit {
                        subtitle_id: id + 50_000,
                        sub_file_name: format!("{}.sub", q.query),
                    },
                    SearchHit {
                        subtitle_id: id,
                        sub_file_name: format!("{}.srt", q.query),
                    },
                ]
            })
            .collect();
        Ok(SearchResponse {
            status: STATUS_OK.to_string(),
            data,
        })
    }

    fn download_subtitles(
        &self,
        _token: &str,
        subtitle_ids: &[i64],
    ) -> Result<DownloadResponse, RemoteError> {
        self.download_calls.lock().unwrap().push(subtitle_ids.to_vec());
        if self.failing_id.is_some_and(|id| subtitle_ids.contains(&id)) {
            return Err(RemoteError::Protocol("HTTP 503".to_string()));
        }
        if let Some(status) = &self.download_status {
            return Ok(DownloadResponse {
                status: status.clone(),
                data: Vec::new(),
            });
        }
        let data = subtitle_ids
            .iter()
            .map(|id| DownloadedSubtitle {
                subtitle_id: *id,
                encoded_bytes: if self.corrupt_id == Some(*id) {
                    "!!not base64!!".to_string()
                } else {
                    encode_subtitle(subtitle_text(*id).as_bytes()).unwrap()
                },
            })
            .collect();
        Ok(DownloadResponse {
            status: STATUS_OK.to_string(),
            data,
        })
    }

    fn log_out(&self, _token: &str) -> Result<(), RemoteError> {
        *self.logouts.lock().unwrap() += 1;
        Ok(())
    }
}

struct Fixture {
    _workspace: TempDir,
    root: PathBuf,
    library: Library,
}

fn title_for(index: usize) -> String {
    format!("Film {:02}", index)
}

/// Scan `count` single-movie directories and stage all of them.
fn staged_library(count: usize) -> Fixture {
    let workspace = tempdir().unwrap();
    let root = workspace.path().join("library");
    for index in 0..count {
        let dir = root.join(format!("movie_{:02}", index));
        fs::create_dir_all(&dir).unwrap();
        let name = format!("{} {} 1080p.mkv", title_for(index), 1950 + index);
        fs::write(dir.join(name), b"video").unwrap();
    }

    let extensions = workspace.path().join("file-extensions.txt");
    fs::write(&extensions, ".mkv\n").unwrap();
    let config = AppConfig {
        database_path: workspace.path().join("media.db"),
        extensions_file: extensions,
        ..Default::default()
    };

    let mut library = Library::open(config).unwrap();
    let scanned = library
        .scan(&root, &OfflineCatalog, &SilentReporter, &CancelToken::new())
        .unwrap();
    assert_eq!(scanned.inserted, count);
    assert_eq!(library.select_all().unwrap(), count);

    Fixture {
        _workspace: workspace,
        root,
        library,
    }
}

fn service_finding_all(count: usize) -> FakeService {
    FakeService {
        hits: (0..count)
            .map(|index| (title_for(index), 1000 + index as i64))
            .collect(),
        ..Default::default()
    }
}

fn run_cycle(fixture: &mut Fixture, service: &FakeService, cancel: &CancelToken) -> DownloadReport {
    fixture
        .library
        .download_subtitles(service, &SubtitlePreference::default(), &SilentReporter, cancel)
        .unwrap()
}

fn files_with_extension(root: &Path, extension: &str) -> usize {
    let mut found = 0;
    for dir in fs::read_dir(root).unwrap().flatten() {
        for file in fs::read_dir(dir.path()).unwrap().flatten() {
            if file.path().extension().is_some_and(|e| e == extension) {
                found += 1;
            }
        }
    }
    found
}

#[test]
fn test_full_cycle_downloads_every_selected_media() {
    let mut fixture = staged_library(25);
    let service = service_finding_all(25);

    let report = run_cycle(&mut fixture, &service, &CancelToken::new());

    assert_eq!(report.final_state, CycleState::LoggedOut);
    assert_eq!(report.searched, 25);
    assert_eq!(report.candidates, 25);
    assert_eq!(report.download_calls, 2);
    assert_eq!(report.failed_chunks, 0);
    assert_eq!(report.downloaded_files, 25);
    assert!(report.not_found.is_empty());
    assert_eq!(
        report.messages.last().map(String::as_str),
        Some("Download finished! Downloaded 25 files")
    );

    let mut sizes: Vec<usize> = service
        .download_calls
        .lock()
        .unwrap()
        .iter()
        .map(Vec::len)
        .collect();
    sizes.sort_unstable();
    assert_eq!(sizes, vec![6, 19]);

    assert_eq!(files_with_extension(&fixture.root, "srt"), 25);
    assert_eq!(files_with_extension(&fixture.root, "gzip"), 0);
    let written = fs::read_to_string(fixture.root.join("movie_03").join("Film 03.srt")).unwrap();
    assert_eq!(written, subtitle_text(1003));

    assert_eq!(*service.logouts.lock().unwrap(), 1);
    let store = fixture.library.store();
    assert_eq!(store.count(Table::Media(MediaTable::Selection)).unwrap(), 0);
    assert_eq!(store.count(Table::SearchCandidates).unwrap(), 0);
    assert_eq!(store.count(Table::DownloadPayloads).unwrap(), 0);
}

#[test]
fn test_download_calls_are_chunked_by_nineteen() {
    for count in [1usize, 19, 20, 38, 39] {
        let mut fixture = staged_library(count);
        let service = service_finding_all(count);

        let report = run_cycle(&mut fixture, &service, &CancelToken::new());

        let calls = service.download_calls.lock().unwrap();
        assert_eq!(calls.len(), count.div_ceil(MAX_IDS_PER_DOWNLOAD), "count {}", count);
        assert!(calls.iter().all(|c| !c.is_empty() && c.len() <= MAX_IDS_PER_DOWNLOAD));
        assert_eq!(calls.iter().map(Vec::len).sum::<usize>(), count);
        assert_eq!(report.downloaded_files, count);
    }
}

#[test]
fn test_search_uses_preferred_language_and_title() {
    let mut fixture = staged_library(2);
    let service = service_finding_all(2);

    run_cycle(&mut fixture, &service, &CancelToken::new());

    let searches = service.searches.lock().unwrap();
    assert_eq!(searches.len(), 2);
    assert!(searches.iter().all(|q| q.language == "alb" && q.imdb_id.is_none()));
    assert_eq!(searches[0].query, "Film 00");
}

#[test]
fn test_failed_chunk_is_reported_and_others_complete() {
    let mut fixture = staged_library(25);
    let service = FakeService {
        failing_id: Some(1000),
        ..service_finding_all(25)
    };

    let report = run_cycle(&mut fixture, &service, &CancelToken::new());

    assert_eq!(report.download_calls, 2);
    assert_eq!(report.failed_chunks, 1);
    assert_eq!(report.downloaded_files, 6);
    assert!(report
        .messages
        .iter()
        .any(|m| m.contains("ProtocolError during downloading")));
    assert_eq!(files_with_extension(&fixture.root, "srt"), 6);
    assert_eq!(files_with_extension(&fixture.root, "gzip"), 0);
}

#[test]
fn test_missing_subtitles_are_reported_per_title() {
    let mut fixture = staged_library(3);
    let mut service = service_finding_all(3);
    service.hits.remove(&title_for(1));

    let report = run_cycle(&mut fixture, &service, &CancelToken::new());

    assert_eq!(report.candidates, 2);
    assert_eq!(report.not_found, vec![title_for(1)]);
    assert!(report
        .messages
        .contains(&format!("no subtitles found for {}", title_for(1))));
    assert_eq!(report.downloaded_files, 2);
    assert_eq!(report.final_state, CycleState::LoggedOut);
}

#[test]
fn test_login_failure_stops_cycle_without_error() {
    let mut fixture = staged_library(2);
    let service = FakeService {
        login_error: Some(RemoteError::Connectivity("dns".to_string())),
        ..service_finding_all(2)
    };

    let report = run_cycle(&mut fixture, &service, &CancelToken::new());

    assert_eq!(report.final_state, CycleState::Error);
    assert!(report
        .messages
        .contains(&"Please check your internet connection.".to_string()));
    assert!(service.searches.lock().unwrap().is_empty());
    assert_eq!(*service.logouts.lock().unwrap(), 0);
    // Selection survives so the user can retry.
    let store = fixture.library.store();
    assert_eq!(store.count(Table::Media(MediaTable::Selection)).unwrap(), 2);
}

#[test]
fn test_lost_connection_skips_download_but_logs_out() {
    let mut fixture = staged_library(3);
    let service = FakeService {
        search_error: Some(RemoteError::Connectivity("reset".to_string())),
        ..service_finding_all(3)
    };

    let report = run_cycle(&mut fixture, &service, &CancelToken::new());

    assert_eq!(report.final_state, CycleState::Error);
    assert_eq!(service.searches.lock().unwrap().len(), 1);
    assert!(service.download_calls.lock().unwrap().is_empty());
    assert_eq!(*service.logouts.lock().unwrap(), 1);
    assert_eq!(report.downloaded_files, 0);
}

#[test]
fn test_search_fault_skips_entry_and_continues() {
    let mut fixture = staged_library(2);
    let service = FakeService {
        search_error: Some(RemoteError::Fault {
            code: 411,
            message: "Invalid query".to_string(),
        }),
        ..service_finding_all(2)
    };

    let report = run_cycle(&mut fixture, &service, &CancelToken::new());

    assert_eq!(service.searches.lock().unwrap().len(), 2);
    assert_eq!(report.candidates, 0);
    assert_eq!(report.final_state, CycleState::LoggedOut);
}

#[test]
fn test_cancelled_cycle_keeps_selection() {
    let mut fixture = staged_library(4);
    let service = service_finding_all(4);
    let cancel = CancelToken::new();
    cancel.cancel();

    let report = run_cycle(&mut fixture, &service, &cancel);

    assert!(report.cancelled);
    assert_eq!(report.searched, 0);
    assert!(service.download_calls.lock().unwrap().is_empty());
    assert_eq!(*service.logouts.lock().unwrap(), 1);
    let store = fixture.library.store();
    assert_eq!(store.count(Table::Media(MediaTable::Selection)).unwrap(), 4);
}

#[test]
fn test_corrupt_payload_does_not_block_other_files() {
    let mut fixture = staged_library(3);
    let service = FakeService {
        corrupt_id: Some(1001),
        ..service_finding_all(3)
    };

    let report = run_cycle(&mut fixture, &service, &CancelToken::new());

    assert_eq!(report.final_state, CycleState::LoggedOut);
    assert_eq!(report.download_calls, 1);
    assert_eq!(report.failed_chunks, 0);
    assert_eq!(report.downloaded_files, 2);
    assert!(report
        .messages
        .iter()
        .any(|m| m.starts_with("Could not write Film 01.srt")));
    assert_eq!(files_with_extension(&fixture.root, "srt"), 2);
    assert_eq!(files_with_extension(&fixture.root, "gzip"), 0);
    assert!(!fixture.root.join("movie_01").join("Film 01.srt").exists());
    let written = fs::read_to_string(fixture.root.join("movie_02").join("Film 02.srt")).unwrap();
    assert_eq!(written, subtitle_text(1002));
}

#[test]
fn test_wrong_search_status_skips_only_that_entry() {
    let mut fixture = staged_library(3);
    let mut service = service_finding_all(3);
    service
        .search_status
        .insert(title_for(1), "503 Service Unavailable".to_string());

    let report = run_cycle(&mut fixture, &service, &CancelToken::new());

    assert_eq!(service.searches.lock().unwrap().len(), 3);
    assert_eq!(report.searched, 3);
    assert_eq!(report.candidates, 2);
    assert!(report
        .messages
        .contains(&"Wrong status code: 503 Service Unavailable".to_string()));
    assert!(report.not_found.is_empty());
    assert_eq!(report.downloaded_files, 2);
    assert_eq!(report.final_state, CycleState::LoggedOut);
}

#[test]
fn test_wrong_download_status_counts_failed_chunk() {
    let mut fixture = staged_library(2);
    let service = FakeService {
        download_status: Some("407 Download limit reached".to_string()),
        ..service_finding_all(2)
    };

    let report = run_cycle(&mut fixture, &service, &CancelToken::new());

    assert_eq!(report.download_calls, 1);
    assert_eq!(report.failed_chunks, 1);
    assert_eq!(report.downloaded_files, 0);
    assert!(report.messages.contains(
        &"There was an error while trying to download your file: 407 Download limit reached"
            .to_string()
    ));
    assert_eq!(files_with_extension(&fixture.root, "srt"), 0);
    assert_eq!(report.final_state, CycleState::LoggedOut);
}
