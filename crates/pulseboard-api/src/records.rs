// Record listing HTTP client
//
// Fetches the rows that seed (and later refresh) the primary table. The
// server decides ordering and filtering; the client only bounds how many
// rows it keeps. Both a bare JSON array and a paginated
// `{ "count": N, "results": [...] }` body are accepted.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// One record as served by the listing endpoint.
pub type RawRecord = Map<String, Value>;

/// Listing bodies seen in the wild.
#[derive(Deserialize)]
#[serde(untagged)]
enum ListingBody {
    Plain(Vec<RawRecord>),
    Paginated { results: Vec<RawRecord> },
}

/// HTTP client for the record listing endpoint.
#[derive(Debug, Clone)]
pub struct RecordsClient {
    http: reqwest::Client,
    url: Url,
}

impl RecordsClient {
    /// Create a client for `url` from a `TransportConfig`.
    pub fn new(url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
            url,
        })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, url: Url) -> Self {
        Self { http, url }
    }

    /// The listing URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Fetch the current page, keeping at most `limit` rows.
    pub async fn fetch_page(&self, limit: usize) -> Result<Vec<RawRecord>, Error> {
        debug!("GET {}", self.url);

        let resp = self
            .http
            .get(self.url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Http {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let body = resp.text().await.map_err(Error::Transport)?;
        let listing: ListingBody = serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: body.clone(),
            }
        })?;

        let mut rows = match listing {
            ListingBody::Plain(rows) | ListingBody::Paginated { results: rows } => rows,
        };
        rows.truncate(limit);
        debug!(rows = rows.len(), "fetched record page");
        Ok(rows)
    }
}
