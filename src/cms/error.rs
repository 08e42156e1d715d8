//! Errors raised while talking to the CMS

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CmsError>;

#[derive(Debug, Error)]
pub enum CmsError {
    #[error("CMS endpoint is not configured (set cms.endpoint or {0})")]
    MissingEndpoint(&'static str),

    #[error("request to {url} failed")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("GET {url} failed with status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("invalid CMS response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CMS API did not advertise a master ref")]
    NoMasterRef,

    #[error("no {document_type} document with uid {uid:?}")]
    NotFound { document_type: String, uid: String },
}

impl CmsError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CmsError::NotFound { .. })
    }
}

impl From<reqwest::Error> for CmsError {
    /// The request URL carries the access token, so only a redacted copy is kept
    fn from(e: reqwest::Error) -> Self {
        let url = e.url().map(|u| redact(u.as_str())).unwrap_or_default();
        CmsError::Http {
            url,
            source: e.without_url(),
        }
    }
}

/// Drop the query string so access tokens never end up in logs
pub(crate) fn redact(url: &str) -> String {
    match url.split_once('?') {
        Some((base, _)) => format!("{}?…", base),
        None => url.to_string(),
    }
}
