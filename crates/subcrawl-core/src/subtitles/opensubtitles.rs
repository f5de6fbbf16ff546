use super::service::*;
use super::xmlrpc::{self, Value};
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::debug;

pub const ENDPOINT: &str = "https://api.opensubtitles.org/xml-rpc";

/// XML-RPC client for the OpenSubtitles API.
pub struct OpenSubtitlesClient {
    http: reqwest::blocking::Client,
    endpoint: String,
}

impl OpenSubtitlesClient {
    pub fn new() -> Result<Self, RemoteError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| RemoteError::Other(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: ENDPOINT.to_string(),
        })
    }

    fn call(&self, method: &str, params: &[Value]) -> Result<Value, RemoteError> {
        let body = xmlrpc::encode_call(method, params)?;
        debug!("XML-RPC {} ({} bytes)", method, body.len());

        let response = self
            .http
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "text/xml")
            .body(body)
            .send()
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Protocol(format!("HTTP {}", status)));
        }
        let text = response.text().map_err(transport_error)?;
        xmlrpc::decode_response(&text)
    }
}

fn transport_error(err: reqwest::Error) -> RemoteError {
    if err.is_connect() || err.is_timeout() {
        RemoteError::Connectivity(err.to_string())
    } else if err.is_body() || err.is_decode() {
        RemoteError::NotReady(err.to_string())
    } else if err.is_request() {
        RemoteError::Connectivity(err.to_string())
    } else {
        RemoteError::Other(err.to_string())
    }
}

fn status_of(value: &Value) -> Result<String, RemoteError> {
    value
        .get("status")
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| RemoteError::Malformed("response without status".to_string()))
}

fn query_value(query: &SearchQuery) -> Value {
    let lookup = match &query.imdb_id {
        Some(id) => ("imdbid", Value::str(id)),
        None => ("query", Value::str(&query.query)),
    };
    Value::structure([lookup, ("sublanguageid", Value::str(&query.language))])
}

pub(crate) fn login_from_value(value: &Value) -> Result<LoginResponse, RemoteError> {
    Ok(LoginResponse {
        status: status_of(value)?,
        token: value.get("token").and_then(Value::as_str).map(String::from),
    })
}

/// `data` is `false` rather than an empty array when nothing matched.
pub(crate) fn search_from_value(value: &Value) -> Result<SearchResponse, RemoteError> {
    let status = status_of(value)?;
    let hits = value
        .get("data")
        .and_then(Value::as_array)
        .unwrap_or_default();

    let mut data = Vec::with_capacity(hits.len());
    for hit in hits {
        let subtitle_id = hit
            .get("IDSubtitleFile")
            .and_then(Value::as_i64)
            .ok_or_else(|| RemoteError::Malformed("hit without IDSubtitleFile".to_string()))?;
        data.push(SearchHit {
            subtitle_id,
            sub_file_name: hit
                .get("SubFileName")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        });
    }
    Ok(SearchResponse { status, data })
}

pub(crate) fn download_from_value(value: &Value) -> Result<DownloadResponse, RemoteError> {
    let status = status_of(value)?;
    let items = value
        .get("data")
        .and_then(Value::as_array)
        .unwrap_or_default();

    let mut data = Vec::with_capacity(items.len());
    for item in items {
        let subtitle_id = item
            .get("idsubtitlefile")
            .and_then(Value::as_i64)
            .ok_or_else(|| RemoteError::Malformed("item without idsubtitlefile".to_string()))?;
        let encoded_bytes = item
            .get("data")
            .and_then(Value::as_str)
            .ok_or_else(|| RemoteError::Malformed("item without data".to_string()))?
            .to_string();
        data.push(DownloadedSubtitle {
            subtitle_id,
            encoded_bytes,
        });
    }
    Ok(DownloadResponse { status, data })
}

impl SubtitleService for OpenSubtitlesClient {
    fn log_in(
        &self,
        username: &str,
        password: &str,
        language: &str,
        user_agent: &str,
    ) -> Result<LoginResponse, RemoteError> {
        let value = self.call(
            "LogIn",
            &[
                Value::str(username),
                Value::str(password),
                Value::str(language),
                Value::str(user_agent),
            ],
        )?;
        login_from_value(&value)
    }

    fn search_subtitles(
        &self,
        token: &str,
        queries: &[SearchQuery],
        limit: u32,
    ) -> Result<SearchResponse, RemoteError> {
        let value = self.call(
            "SearchSubtitles",
            &[
                Value::str(token),
                Value::Array(queries.iter().map(query_value).collect()),
                Value::structure([("limit", Value::Int(i64::from(limit)))]),
            ],
        )?;
        search_from_value(&value)
    }

    fn download_subtitles(
        &self,
        token: &str,
        subtitle_ids: &[i64],
    ) -> Result<DownloadResponse, RemoteError> {
        let ids = subtitle_ids.iter().map(|id| Value::Int(*id)).collect();
        let value = self.call("DownloadSubtitles", &[Value::str(token), Value::Array(ids)])?;
        download_from_value(&value)
    }

    fn log_out(&self, token: &str) -> Result<(), RemoteError> {
        self.call("LogOut", &[Value::str(token)]).map(|_| ())
    }
}
