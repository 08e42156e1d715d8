//! Post listing with "load more" pagination
//!
//! The accumulated list and the cursor live in [`ListState`]. A load is split
//! into [`ListState::begin_load`], which hands out a [`PageRequest`] tagged with
//! a monotonically increasing sequence number, and
//! [`ListState::apply_next_page`], which only accepts the result of the most
//! recently issued request. Overlapping loads therefore never interleave
//! their results; the superseded ones are discarded.

use serde::Serialize;

use crate::cms::{CmsClient, Result};
use crate::config::SiteConfig;
use crate::content::{PostPage, PostSummary};
use crate::helpers::{date_xml, format_date, post_path, url_for};
use crate::templates::TemplateRenderer;

/// A pending "load more" fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub seq: u64,
    pub url: String,
}

/// What happened to a fetched page handed to [`ListState::apply_next_page`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Results were appended and the cursor replaced
    Applied { added: usize },
    /// A newer request was issued (or already applied); the page was dropped
    Stale,
}

/// Accumulated posts plus the cursor for the next batch
#[derive(Debug, Clone, Default)]
pub struct ListState {
    posts: Vec<PostSummary>,
    next_page: Option<String>,
    issued: u64,
    applied: u64,
}

impl ListState {
    /// Start from the statically fetched first page
    pub fn new(first: PostPage) -> Self {
        Self {
            posts: first.results,
            next_page: first.next_page,
            issued: 0,
            applied: 0,
        }
    }

    pub fn posts(&self) -> &[PostSummary] {
        &self.posts
    }

    pub fn next_page(&self) -> Option<&str> {
        self.next_page.as_deref()
    }

    /// Whether the "load more" control is shown
    pub fn has_more(&self) -> bool {
        self.next_page.is_some()
    }

    /// Issue a request for the next page, or `None` once the cursor is exhausted
    pub fn begin_load(&mut self) -> Option<PageRequest> {
        let url = self.next_page.clone()?;
        self.issued += 1;
        Some(PageRequest {
            seq: self.issued,
            url,
        })
    }

    /// Append `page` if it answers the latest request; otherwise drop it
    pub fn apply_next_page(&mut self, seq: u64, page: PostPage) -> ApplyOutcome {
        if seq != self.issued || seq <= self.applied {
            tracing::debug!(
                seq,
                latest = self.issued,
                "Discarding stale page of {} posts",
                page.results.len()
            );
            return ApplyOutcome::Stale;
        }

        let added = page.results.len();
        self.posts.extend(page.results);
        self.next_page = page.next_page;
        self.applied = seq;
        ApplyOutcome::Applied { added }
    }

    /// Fetch the cursor and apply the result; `None` when there is nothing to load
    pub async fn load_more(&mut self, client: &CmsClient) -> Result<Option<ApplyOutcome>> {
        let Some(request) = self.begin_load() else {
            return Ok(None);
        };
        let page = client.fetch_page(&request.url).await?;
        Ok(Some(self.apply_next_page(request.seq, page)))
    }

    /// Template data for this state
    pub fn view(&self, config: &SiteConfig, load_more_href: Option<String>) -> ListPageData {
        ListPageData {
            posts: self
                .posts
                .iter()
                .map(|post| PostItem::from_summary(post, config))
                .collect(),
            load_more_href: if self.has_more() { load_more_href } else { None },
            load_more_label: config.content.load_more_label.clone(),
        }
    }
}

/// Render the listing page for `data`
pub fn render_list(
    renderer: &TemplateRenderer,
    config: &SiteConfig,
    data: &ListPageData,
) -> anyhow::Result<String> {
    let mut context = renderer.base_context(config);
    context.insert("page_title", &config.title);
    context.insert("list", data);
    renderer.render("index.html", &context)
}

#[derive(Debug, Clone, Serialize)]
pub struct ListPageData {
    pub posts: Vec<PostItem>,
    /// Target of the "load more" control; absent hides the control
    pub load_more_href: Option<String>,
    pub load_more_label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostItem {
    pub href: Option<String>,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub date: String,
    pub datetime: String,
}

impl PostItem {
    fn from_summary(post: &PostSummary, config: &SiteConfig) -> Self {
        let published = post.published_at();
        Self {
            href: post
                .uid
                .as_deref()
                .map(|uid| url_for(config, &post_path(uid))),
            title: post.data.title.clone(),
            subtitle: post.data.subtitle.clone(),
            author: post.data.author.clone(),
            date: published
                .map(|d| format_date(&d, &config.date_format, &config.language))
                .unwrap_or_default(),
            datetime: published.map(|d| date_xml(&d)).unwrap_or_default(),
        }
    }
}
