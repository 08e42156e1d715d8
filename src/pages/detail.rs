//! Post detail page

use anyhow::Result;
use serde::Serialize;

use crate::config::SiteConfig;
use crate::content::reading_time::estimate_minutes;
use crate::content::rich_text::{as_html, HtmlOptions};
use crate::content::sanitize::safe_url;
use crate::content::PostDetail;
use crate::helpers::{date_xml, format_date, full_url_for, post_path, url_for};
use crate::templates::TemplateRenderer;

/// A detail page is either still being generated or backed by a post
#[derive(Debug, Clone)]
pub enum DetailState {
    /// The slug was not generated at build time and is being rendered on demand
    Fallback,
    Resolved(Box<PostDetail>),
}

#[derive(Debug, Clone, Serialize)]
pub struct DetailPageData {
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub banner_url: String,
    pub banner_alt: String,
    pub date: String,
    pub datetime: String,
    pub reading_time: usize,
    pub path: String,
    pub canonical: String,
    pub sections: Vec<SectionData>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionData {
    pub heading: String,
    /// Rendered rich text, injected without escaping
    pub html: String,
}

impl DetailPageData {
    pub fn build(post: &PostDetail, config: &SiteConfig) -> Self {
        let options = HtmlOptions {
            root: config.root.clone(),
            document_type: config.cms.document_type.clone(),
            sanitize: config.content.sanitize,
        };
        let published = post.published_at();
        let banner_url = if options.sanitize {
            safe_url(&post.data.banner.url).unwrap_or_default().to_string()
        } else {
            post.data.banner.url.clone()
        };

        Self {
            title: post.data.title.clone(),
            subtitle: post.data.subtitle.clone(),
            author: post.data.author.clone(),
            banner_url,
            banner_alt: post.data.banner.alt.clone(),
            date: published
                .map(|d| format_date(&d, &config.date_format, &config.language))
                .unwrap_or_default(),
            datetime: published.map(|d| date_xml(&d)).unwrap_or_default(),
            reading_time: estimate_minutes(&post.data.content, config.content.words_per_minute),
            path: post
                .uid
                .as_deref()
                .map(|uid| url_for(config, &post_path(uid)))
                .unwrap_or_default(),
            canonical: post
                .uid
                .as_deref()
                .map(|uid| full_url_for(config, &post_path(uid)))
                .unwrap_or_default(),
            sections: post
                .data
                .content
                .iter()
                .map(|block| SectionData {
                    heading: block.heading.clone(),
                    html: as_html(&block.body, &options),
                })
                .collect(),
        }
    }
}

/// Render the placeholder for [`DetailState::Fallback`], the post otherwise
pub fn render_detail(
    renderer: &TemplateRenderer,
    config: &SiteConfig,
    state: &DetailState,
) -> Result<String> {
    match state {
        DetailState::Fallback => {
            let mut context = renderer.base_context(config);
            context.insert("page_title", &config.content.fallback_label);
            context.insert("fallback_label", &config.content.fallback_label);
            renderer.render("fallback.html", &context)
        }
        DetailState::Resolved(post) => {
            let page = DetailPageData::build(post, config);
            let mut context = renderer.base_context(config);
            context.insert("page_title", &page.title);
            context.insert("post", &page);
            renderer.render("post.html", &context)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{Banner, ContentBlock, DetailData, RichTextBlock};

    fn detail() -> PostDetail {
        PostDetail {
            uid: Some("criando-um-app".to_string()),
            first_publication_date: Some("2021-03-19T19:25:28+0000".to_string()),
            data: DetailData {
                title: "Criando um app CRA do zero".to_string(),
                subtitle: "Tudo sobre como criar".to_string(),
                banner: Banner {
                    url: "https://images.prismic.io/banner.png".to_string(),
                    alt: String::new(),
                },
                author: "Danilo Vieira".to_string(),
                content: vec![ContentBlock {
                    heading: "Proin et varius".to_string(),
                    body: vec![RichTextBlock::paragraph("Nullam <dolor> sapien")],
                }],
            },
        }
    }

    #[test]
    fn test_build_page_data() {
        let page = DetailPageData::build(&detail(), &SiteConfig::default());
        assert_eq!(page.date, "19 mar 2021");
        assert_eq!(page.reading_time, 1);
        assert_eq!(page.path, "/post/criando-um-app/");
        assert_eq!(page.canonical, "http://localhost:4000/post/criando-um-app/");
        assert_eq!(page.sections[0].html, "<p>Nullam &lt;dolor&gt; sapien</p>");
    }

    #[test]
    fn test_banner_url_is_sanitized() {
        let mut post = detail();
        post.data.banner.url = "javascript:alert(1)".to_string();
        let page = DetailPageData::build(&post, &SiteConfig::default());
        assert_eq!(page.banner_url, "");

        let mut config = SiteConfig::default();
        config.content.sanitize = false;
        let page = DetailPageData::build(&post, &config);
        assert_eq!(page.banner_url, "javascript:alert(1)");
    }

    #[test]
    fn test_fallback_renders_placeholder() {
        let renderer = TemplateRenderer::new().unwrap();
        let html = render_detail(&renderer, &SiteConfig::default(), &DetailState::Fallback).unwrap();
        assert!(html.contains("Carregando..."));
        assert!(!html.contains("class=\"post-content\""));
    }

    #[test]
    fn test_resolved_renders_content() {
        let renderer = TemplateRenderer::new().unwrap();
        let state = DetailState::Resolved(Box::new(detail()));
        let html = render_detail(&renderer, &SiteConfig::default(), &state).unwrap();
        assert!(html.contains("Criando um app CRA do zero"));
        assert!(html.contains("<h2>Proin et varius</h2>"));
        assert!(html.contains("<p>Nullam &lt;dolor&gt; sapien</p>"));
        assert!(html.contains("1 min"));
        assert!(html.contains("https://images.prismic.io/banner.png"));
        assert!(!html.contains("Carregando..."));
    }

    #[test]
    fn test_single_description_meta() {
        let renderer = TemplateRenderer::new().unwrap();
        let mut config = SiteConfig::default();
        config.description = "Site wide description".to_string();

        let state = DetailState::Resolved(Box::new(detail()));
        let html = render_detail(&renderer, &config, &state).unwrap();
        assert_eq!(html.matches("name=\"description\"").count(), 1);
        assert!(html.contains("content=\"Tudo sobre como criar\""));

        let mut post = detail();
        post.data.subtitle.clear();
        let html =
            render_detail(&renderer, &config, &DetailState::Resolved(Box::new(post))).unwrap();
        assert_eq!(html.matches("name=\"description\"").count(), 1);
        assert!(html.contains("content=\"Site wide description\""));
    }
}
