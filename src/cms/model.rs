//! Raw API payloads and their projection into view models

use serde::{Deserialize, Serialize};

use super::error::Result;
use crate::content::{DetailData, PostDetail, PostPage, PostSummary, SummaryData};

/// `GET {endpoint}` response (only the refs matter here)
#[derive(Debug, Clone, Deserialize)]
pub struct ApiInfo {
    #[serde(default)]
    pub refs: Vec<ApiRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiRef {
    pub id: String,
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "isMasterRef", default)]
    pub is_master_ref: bool,
}

impl ApiInfo {
    pub fn master_ref(&self) -> Option<&str> {
        self.refs
            .iter()
            .find(|r| r.is_master_ref)
            .map(|r| r.reference.as_str())
    }
}

/// One document as returned by the search API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(rename = "type")]
    pub document_type: String,
    #[serde(default)]
    pub first_publication_date: Option<String>,
    #[serde(default)]
    pub last_publication_date: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Document {
    /// Project onto the listing shape (uid, date, title/subtitle/author)
    pub fn to_summary(&self) -> Result<PostSummary> {
        let data: SummaryData = serde_json::from_value(self.data.clone())?;
        Ok(PostSummary {
            uid: self.uid.clone(),
            first_publication_date: self.first_publication_date.clone(),
            data,
        })
    }

    /// Project onto the detail shape (adds banner and content groups)
    pub fn to_detail(&self) -> Result<PostDetail> {
        let data: DetailData = serde_json::from_value(self.data.clone())?;
        Ok(PostDetail {
            uid: self.uid.clone(),
            first_publication_date: self.first_publication_date.clone(),
            data,
        })
    }
}

/// `/documents/search` response; `next_page` is the opaque pagination cursor
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results_size: u32,
    #[serde(default)]
    pub next_page: Option<String>,
    #[serde(default)]
    pub results: Vec<Document>,
}

impl SearchResponse {
    /// Map every result into a summary, keeping CMS order
    pub fn into_post_page(self) -> Result<PostPage> {
        let results = self
            .results
            .iter()
            .map(Document::to_summary)
            .collect::<Result<Vec<_>>>()?;
        Ok(PostPage {
            results,
            next_page: self.next_page,
        })
    }
}
