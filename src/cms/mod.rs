//! Headless CMS client (Prismic REST API v2)
//!
//! Issues search queries against the repository's master ref and maps the raw
//! documents into the view models under [`crate::content`]. There is no retry
//! and no caching; every failure is returned to the caller as a [`CmsError`].

mod error;
mod model;
mod query;

pub use error::{CmsError, Result};
pub use model::{ApiInfo, ApiRef, Document, SearchResponse};
pub use query::{Predicate, SearchQuery};

use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::config::{CmsConfig, ENDPOINT_ENV};
use crate::content::PostPage;
use error::redact;

const USER_AGENT: &str = concat!("prismic-blog/", env!("CARGO_PKG_VERSION"));

/// Page size used when walking every document of a type
const WALK_PAGE_SIZE: u32 = 100;

/// Thin async client over the CMS search API
#[derive(Clone, Debug)]
pub struct CmsClient {
    http: reqwest::Client,
    endpoint: String,
    access_token: Option<String>,
}

impl CmsClient {
    pub fn new(config: &CmsConfig) -> Result<Self> {
        let endpoint = config.endpoint.trim().trim_end_matches('/');
        if endpoint.is_empty() {
            return Err(CmsError::MissingEndpoint(ENDPOINT_ENV));
        }

        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            http: builder.build()?,
            endpoint: endpoint.to_string(),
            access_token: config.access_token.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
    ) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CmsError::Status {
                url: redact(url),
                status,
            });
        }
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Resolve the repository's current master ref
    pub async fn master_ref(&self) -> Result<String> {
        let mut request = self.http.get(&self.endpoint);
        if let Some(token) = &self.access_token {
            request = request.query(&[("access_token", token)]);
        }
        let info: ApiInfo = self.get_json(request, &self.endpoint).await?;
        info.master_ref()
            .map(str::to_string)
            .ok_or(CmsError::NoMasterRef)
    }

    /// Run a raw search at the master ref
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResponse> {
        let reference = self.master_ref().await?;
        let url = format!("{}/documents/search", self.endpoint);
        tracing::debug!(q = %query.q(), page_size = ?query.page_size, "CMS search");

        let request = self
            .http
            .get(&url)
            .query(&query.params(&reference, self.access_token.as_deref()));
        self.get_json(request, &url).await
    }

    /// First page of `document_type`, projected onto post summaries
    pub async fn query(
        &self,
        document_type: &str,
        fields: &[String],
        page_size: u32,
    ) -> Result<PostPage> {
        let query = SearchQuery::new(Predicate::document_type(document_type))
            .fetch(fields.to_vec())
            .page_size(page_size);
        self.search(&query).await?.into_post_page()
    }

    /// Follow an opaque `next_page` cursor
    pub async fn fetch_page(&self, cursor: &str) -> Result<PostPage> {
        tracing::debug!(cursor = %redact(cursor), "Fetching next page");
        let response: SearchResponse = self.get_json(self.http.get(cursor), cursor).await?;
        response.into_post_page()
    }

    /// The single document of `document_type` with this UID
    pub async fn get_by_uid(&self, document_type: &str, uid: &str) -> Result<Document> {
        let query = SearchQuery::new(Predicate::uid(document_type, uid)).page_size(1);
        let response = self.search(&query).await?;
        response
            .results
            .into_iter()
            .next()
            .ok_or_else(|| CmsError::NotFound {
                document_type: document_type.to_string(),
                uid: uid.to_string(),
            })
    }

    /// Every document of `document_type`, following cursors until exhausted
    pub async fn all_documents(&self, document_type: &str) -> Result<Vec<Document>> {
        let query =
            SearchQuery::new(Predicate::document_type(document_type)).page_size(WALK_PAGE_SIZE);
        let mut response = self.search(&query).await?;
        let mut documents = Vec::new();

        loop {
            documents.append(&mut response.results);
            match response.next_page.take() {
                Some(cursor) => {
                    response = self.get_json(self.http.get(&cursor), &cursor).await?;
                }
                None => break,
            }
        }

        tracing::debug!("Fetched {} {} documents", documents.len(), document_type);
        Ok(documents)
    }
}
