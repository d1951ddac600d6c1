//! HTTP client for the ClinicalTrials.gov v2 API.

use thiserror::Error;
use tracing::{debug, info};
use trialscreen_core::{DataVersion, Study, StudyPage};

/// ClinicalTrials.gov v2 endpoints, relative to [`endpoints::BASE_URL`].
pub mod endpoints {
    pub const BASE_URL: &str = "https://clinicaltrials.gov/api/v2";
    /// Data version.
    pub const VERSION: &str = "/version";
    /// API definitions.
    pub const METADATA: &str = "/studies/metadata";
    pub const SEARCH_AREAS: &str = "/studies/search-areas";
    pub const FIELD_VALUES: &str = "/stats/field/values";
    pub const FIELD_SIZES: &str = "/stats/field/sizes";
    /// Full study records, cursor-paginated.
    pub const STUDIES: &str = "/studies";
}

/// Largest `pageSize` the registry accepts.
pub const MAX_PAGE_SIZE: u32 = 1000;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Which studies to harvest and how to page through them.
#[derive(Debug, Clone)]
pub struct StudyQuery {
    /// Records per page, clamped to `1..=1000`.
    pub page_size: u32,
    /// `filter.overallStatus`; `None` harvests every status.
    pub overall_status: Option<String>,
    /// Stop after this many pages.
    pub max_pages: Option<usize>,
}

impl Default for StudyQuery {
    fn default() -> Self {
        Self {
            page_size: MAX_PAGE_SIZE,
            overall_status: Some("RECRUITING".into()),
            max_pages: None,
        }
    }
}

/// HTTP client for the registry API.
pub struct RegistryClient {
    client: reqwest::Client,
    base_url: String,
}

impl Default for RegistryClient {
    fn default() -> Self {
        Self::new(endpoints::BASE_URL.to_string())
    }
}

impl RegistryClient {
    /// Create a client for the given API base URL.
    ///
    /// `base_url` should be like `https://clinicaltrials.gov/api/v2`; a trailing
    /// slash is removed.
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch the registry's data version.
    pub async fn version(&self) -> Result<DataVersion, RegistryError> {
        let url = format!("{}{}", self.base_url, endpoints::VERSION);
        let (version, _) = self.get_json(&url, &[]).await?;
        Ok(version)
    }

    /// Fetch one page of studies. `page_token` is the previous page's
    /// `nextPageToken`, or `None` for the first page.
    ///
    /// Returns the page and the size of the response body in bytes.
    pub async fn fetch_page(
        &self,
        query: &StudyQuery,
        page_token: Option<&str>,
    ) -> Result<(StudyPage, usize), RegistryError> {
        let url = format!("{}{}", self.base_url, endpoints::STUDIES);

        let mut params: Vec<(&str, String)> = vec![(
            "pageSize",
            query.page_size.clamp(1, MAX_PAGE_SIZE).to_string(),
        )];
        if let Some(status) = query.overall_status.as_deref()
            && !status.is_empty()
        {
            params.push(("filter.overallStatus", status.to_string()));
        }
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }

        self.get_json(&url, &params).await
    }

    /// Page through all studies matching `query`.
    pub fn studies(&self, query: StudyQuery) -> StudyPager<'_> {
        StudyPager {
            client: self,
            query,
            next_token: None,
            pages: 0,
            records: 0,
            bytes: 0,
            done: false,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<(T, usize), RegistryError> {
        debug!(url = %url, ?params, "registry request");
        let resp = self.client.get(url).query(params).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RegistryError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.bytes().await?;
        let value = serde_json::from_slice(&body)?;
        Ok((value, body.len()))
    }
}

/// Cursor over study pages. Each call to [`next_page`](Self::next_page)
/// issues one request, following `nextPageToken` until it is absent or
/// `max_pages` is reached.
pub struct StudyPager<'a> {
    client: &'a RegistryClient,
    query: StudyQuery,
    next_token: Option<String>,
    pages: usize,
    records: usize,
    bytes: usize,
    done: bool,
}

impl StudyPager<'_> {
    /// Fetch the next page, or `None` once pagination is exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Vec<Study>>, RegistryError> {
        if self.done {
            return Ok(None);
        }
        if let Some(max) = self.query.max_pages
            && self.pages >= max
        {
            self.done = true;
            return Ok(None);
        }

        let (page, size) = self
            .client
            .fetch_page(&self.query, self.next_token.as_deref())
            .await?;

        self.pages += 1;
        self.records += page.studies.len();
        self.bytes += size;
        self.next_token = page.next_page_token.filter(|t| !t.is_empty());
        self.done = self.next_token.is_none();

        info!(
            page = self.pages,
            records = self.records,
            mib = %format!("{:.2}", self.bytes as f64 / (1024.0 * 1024.0)),
            "total records retrieved"
        );
        Ok(Some(page.studies))
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages
    }

    pub fn records_fetched(&self) -> usize {
        self.records
    }

    pub fn bytes_fetched(&self) -> usize {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn study(id: &str) -> serde_json::Value {
        json!({
            "protocolSection": {
                "identificationModule": { "nctId": id },
                "eligibilityModule": {
                    "eligibilityCriteria": "Inclusion Criteria:\n* Adults",
                    "sex": "ALL",
                    "minimumAge": "18 Years"
                }
            }
        })
    }

    #[test]
    fn registry_client_trims_trailing_slash() {
        let client = RegistryClient::new("https://clinicaltrials.gov/api/v2/".into());
        assert_eq!(client.base_url, "https://clinicaltrials.gov/api/v2");
    }

    #[test]
    fn default_query_harvests_recruiting_at_max_page_size() {
        let q = StudyQuery::default();
        assert_eq!(q.page_size, 1000);
        assert_eq!(q.overall_status.as_deref(), Some("RECRUITING"));
        assert!(q.max_pages.is_none());
    }

    #[tokio::test]
    async fn pager_follows_next_page_token() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/studies"))
            .and(query_param("pageSize", "2"))
            .and(query_param("filter.overallStatus", "RECRUITING"))
            .and(query_param_is_missing("pageToken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "studies": [study("NCT00000001"), study("NCT00000002")],
                "nextPageToken": "page-2"
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/studies"))
            .and(query_param("pageToken", "page-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "studies": [study("NCT00000003")]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = RegistryClient::new(server.uri());
        let mut pager = client.studies(StudyQuery {
            page_size: 2,
            ..Default::default()
        });

        let mut ids = Vec::new();
        while let Some(studies) = pager.next_page().await.unwrap() {
            ids.extend(studies.iter().filter_map(|s| s.nct_id().map(str::to_string)));
        }

        assert_eq!(ids, vec!["NCT00000001", "NCT00000002", "NCT00000003"]);
        assert_eq!(pager.pages_fetched(), 2);
        assert_eq!(pager.records_fetched(), 3);
        assert!(pager.bytes_fetched() > 0);
        assert!(pager.next_page().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn pager_stops_at_max_pages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/studies"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "studies": [study("NCT00000001")],
                "nextPageToken": "more"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = RegistryClient::new(server.uri());
        let mut pager = client.studies(StudyQuery {
            max_pages: Some(1),
            ..Default::default()
        });
        assert_eq!(pager.next_page().await.unwrap().unwrap().len(), 1);
        assert!(pager.next_page().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_status_filter_is_omitted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/studies"))
            .and(query_param_is_missing("filter.overallStatus"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "studies": [] })))
            .expect(1)
            .mount(&server)
            .await;

        let client = RegistryClient::new(server.uri());
        let query = StudyQuery {
            overall_status: Some(String::new()),
            ..Default::default()
        };
        let (page, _) = client.fetch_page(&query, None).await.unwrap();
        assert!(page.studies.is_empty());
    }

    #[tokio::test]
    async fn server_error_surfaces_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/studies"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let client = RegistryClient::new(server.uri());
        let mut pager = client.studies(StudyQuery::default());
        let err = pager.next_page().await.unwrap_err();
        assert!(
            matches!(err, RegistryError::Server { status: 503, ref body } if body == "maintenance")
        );
    }

    #[tokio::test]
    async fn version_parses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/version"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "apiVersion": "2.0.3",
                "dataTimestamp": "2026-10-18T09:00:05"
            })))
            .mount(&server)
            .await;

        let client = RegistryClient::new(server.uri());
        let version = client.version().await.unwrap();
        assert_eq!(version.api_version, "2.0.3");
    }
}
