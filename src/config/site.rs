//! Site configuration (_config.yml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Environment variable overriding `cms.endpoint`
pub const ENDPOINT_ENV: &str = "PRISMIC_API_ENDPOINT";

/// Environment variable overriding `cms.access_token`
pub const ACCESS_TOKEN_ENV: &str = "PRISMIC_ACCESS_TOKEN";

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub language: String,

    // URL
    pub url: String,
    pub root: String,

    // Directory
    pub public_dir: String,

    // Date format (date-fns tokens)
    pub date_format: String,

    #[serde(default)]
    pub cms: CmsConfig,

    #[serde(default)]
    pub content: ContentConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "spacetraveling".to_string(),
            description: String::new(),
            language: "pt-BR".to_string(),

            url: "http://localhost:4000".to_string(),
            root: "/".to_string(),

            public_dir: "public".to_string(),

            date_format: "dd MMM yyyy".to_string(),

            cms: CmsConfig::default(),
            content: ContentConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Apply `PRISMIC_API_ENDPOINT` / `PRISMIC_ACCESS_TOKEN` on top of the file values
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var(ENDPOINT_ENV).ok(),
            std::env::var(ACCESS_TOKEN_ENV).ok(),
        );
    }

    fn apply_overrides(&mut self, endpoint: Option<String>, access_token: Option<String>) {
        if let Some(endpoint) = endpoint.filter(|e| !e.trim().is_empty()) {
            tracing::debug!("CMS endpoint taken from {}", ENDPOINT_ENV);
            self.cms.endpoint = endpoint;
        }
        if let Some(token) = access_token.filter(|t| !t.trim().is_empty()) {
            self.cms.access_token = Some(token);
        }
    }
}

/// Headless CMS connection and query settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CmsConfig {
    /// API v2 entry point, e.g. `https://my-repo.cdn.prismic.io/api/v2`
    pub endpoint: String,
    pub access_token: Option<String>,
    pub document_type: String,
    /// Fields requested for the listing (without the document type prefix)
    pub fields: Vec<String>,
    pub page_size: u32,
    /// Request timeout; unset means requests never time out
    pub timeout_secs: Option<u64>,
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            access_token: None,
            document_type: "posts".to_string(),
            fields: vec![
                "title".to_string(),
                "subtitle".to_string(),
                "author".to_string(),
            ],
            page_size: 20,
            timeout_secs: None,
        }
    }
}

impl CmsConfig {
    /// Fields qualified with the document type, as the search API expects them
    pub fn qualified_fields(&self) -> Vec<String> {
        self.fields
            .iter()
            .map(|f| format!("{}.{}", self.document_type, f))
            .collect()
    }
}

/// Rendering options for post content
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    pub words_per_minute: u32,
    /// Run rich text through the sanitizer before it is injected into pages
    pub sanitize: bool,
    pub load_more_label: String,
    pub fallback_label: String,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            words_per_minute: 200,
            sanitize: true,
            load_more_label: "Carregar mais posts".to_string(),
            fallback_label: "Carregando...".to_string(),
        }
    }
}
