use crate::error::Error;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const OMDB_URL: &str = "http://www.omdbapi.com/";
const IMDB_RATING_SOURCE: &str = "Internet Movie Database";

/// Catalog identity for a title, as resolved by a remote movie database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: String,
    pub title: String,
    pub year: String,
    pub rating: String,
}

/// Resolves an extracted title/year to a catalog entry. `Ok(None)` means "not in the catalog".
pub trait CatalogLookup: Send + Sync {
    fn resolve(&self, title: &str, year: &str) -> Result<Option<CatalogEntry>, Error>;
}

/// Lookup that never resolves; every record gets a local surrogate id.
pub struct OfflineCatalog;

impl CatalogLookup for OfflineCatalog {
    fn resolve(&self, _title: &str, _year: &str) -> Result<Option<CatalogEntry>, Error> {
        Ok(None)
    }
}

pub struct OmdbCatalog {
    client: reqwest::blocking::Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OmdbResponse {
    response: String,
    title: Option<String>,
    year: Option<String>,
    #[serde(rename = "imdbID")]
    imdb_id: Option<String>,
    #[serde(default)]
    ratings: Vec<OmdbRating>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OmdbRating {
    source: String,
    value: String,
}

impl OmdbCatalog {
    pub fn new(api_key: &str) -> Result<Self, Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| Error::Catalog(e.to_string()))?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: OMDB_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }
}

impl CatalogLookup for OmdbCatalog {
    fn resolve(&self, title: &str, year: &str) -> Result<Option<CatalogEntry>, Error> {
        let body = self
            .client
            .get(&self.base_url)
            .query(&[
                ("apikey", self.api_key.as_str()),
                ("t", title),
                ("y", year),
                ("type", "movie"),
            ])
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.text())
            .map_err(|e| Error::Catalog(e.to_string()))?;

        let entry = parse_omdb_response(&body)?;
        debug!("OMDb lookup for '{}' ({}): {:?}", title, year, entry);
        Ok(entry)
    }
}

fn parse_omdb_response(body: &str) -> Result<Option<CatalogEntry>, Error> {
    let response: OmdbResponse =
        serde_json::from_str(body).map_err(|e| Error::Catalog(e.to_string()))?;

    if response.response != "True" {
        return Ok(None);
    }
    let Some(id) = response.imdb_id.filter(|id| !id.is_empty()) else {
        return Ok(None);
    };

    let rating = response
        .ratings
        .into_iter()
        .find(|r| r.source == IMDB_RATING_SOURCE)
        .map(|r| r.value)
        .unwrap_or_default();

    Ok(Some(CatalogEntry {
        id,
        title: response.title.unwrap_or_default(),
        year: response.year.unwrap_or_default(),
        rating,
    }))
}
