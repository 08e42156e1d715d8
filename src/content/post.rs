//! Post view models
//!
//! These mirror the CMS document shape (`uid`, `first_publication_date`,
//! `data`) so that a page of summaries serializes back into the same JSON the
//! API returns.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::null_as_default;
use super::rich_text::RichTextBlock;
use crate::helpers::parse_cms_date;

/// A post as shown in the listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    pub uid: Option<String>,
    pub first_publication_date: Option<String>,
    pub data: SummaryData,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subtitle: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub author: String,
}

impl PostSummary {
    pub fn published_at(&self) -> Option<DateTime<FixedOffset>> {
        self.first_publication_date.as_deref().and_then(parse_cms_date)
    }
}

/// One batch of summaries plus the cursor to the batch after it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostPage {
    pub results: Vec<PostSummary>,
    pub next_page: Option<String>,
}

/// A full post for the detail page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDetail {
    pub uid: Option<String>,
    pub first_publication_date: Option<String>,
    pub data: DetailData,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subtitle: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub banner: Banner,
    #[serde(default, deserialize_with = "null_as_default")]
    pub author: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Banner {
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub alt: String,
}

/// A content group: heading followed by a rich text body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(default, deserialize_with = "null_as_default")]
    pub heading: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub body: Vec<RichTextBlock>,
}

impl PostDetail {
    pub fn published_at(&self) -> Option<DateTime<FixedOffset>> {
        self.first_publication_date.as_deref().and_then(parse_cms_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_detail_from_cms_data() {
        let data: DetailData = serde_json::from_str(
            r#"{
                "title": "Criando um app CRA do zero",
                "banner": { "url": "https://images.prismic.io/banner.png", "alt": null },
                "author": "Danilo Vieira",
                "content": [
                    { "heading": "Proin et varius",
                      "body": [{ "type": "paragraph", "text": "Nullam dolor sapien", "spans": [] }] },
                    { "heading": null, "body": null }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(data.banner.url, "https://images.prismic.io/banner.png");
        assert_eq!(data.banner.alt, "");
        assert_eq!(data.subtitle, "");
        assert_eq!(data.content.len(), 2);
        assert_eq!(data.content[0].body[0].text, "Nullam dolor sapien");
        assert!(data.content[1].body.is_empty());
    }

    #[test]
    fn test_missing_banner() {
        let data: DetailData = serde_json::from_str(r#"{"title":"x","banner":null}"#).unwrap();
        assert_eq!(data.banner, Banner::default());
    }

    #[test]
    fn test_published_at() {
        let post = PostSummary {
            uid: Some("a".to_string()),
            first_publication_date: Some("2021-03-15T19:25:28+0000".to_string()),
            data: SummaryData::default(),
        };
        assert_eq!(post.published_at().unwrap().month(), 3);

        let unpublished = PostSummary {
            first_publication_date: None,
            ..post
        };
        assert!(unpublished.published_at().is_none());
    }

    #[test]
    fn test_page_serializes_in_cms_shape() {
        let page = PostPage {
            results: vec![],
            next_page: None,
        };
        assert_eq!(
            serde_json::to_string(&page).unwrap(),
            r#"{"results":[],"next_page":null}"#
        );
    }
}
