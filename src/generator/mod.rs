//! Generator module - writes the rendered pages into the public directory

use anyhow::{Context as _, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::content::{PostDetail, PostPage, PostSummary};
use crate::helpers::{is_safe_slug, list_page_path, url_for};
use crate::pages::{render_detail, render_list, DetailState, ListState};
use crate::templates::TemplateRenderer;
use crate::Blog;

/// Name of the JSON file written next to every listing page
pub const POSTS_JSON: &str = "posts.json";

/// Name of the static paths manifest
pub const PATHS_JSON: &str = "paths.json";

/// Static site generator using Tera templates
pub struct Generator {
    blog: Blog,
    renderer: TemplateRenderer,
}

/// One batch of summaries as published for browser clients
#[derive(Debug, Serialize)]
struct PostsFeed<'a> {
    results: &'a [PostSummary],
    /// Local `posts.json` of the following listing page
    next_page: Option<String>,
}

/// `paths.json`: the slugs generated ahead of time
#[derive(Debug, Serialize)]
pub struct PathsManifest {
    pub paths: Vec<PathEntry>,
    /// Slugs outside `paths` are rendered on first request
    pub fallback: bool,
}

#[derive(Debug, Serialize)]
pub struct PathEntry {
    pub params: PathParams,
}

#[derive(Debug, Serialize)]
pub struct PathParams {
    pub slug: String,
}

impl PathsManifest {
    pub fn new(slugs: &[String]) -> Self {
        Self {
            paths: slugs
                .iter()
                .map(|slug| PathEntry {
                    params: PathParams { slug: slug.clone() },
                })
                .collect(),
            fallback: true,
        }
    }
}

impl Generator {
    /// Create a new generator
    pub fn new(blog: &Blog) -> Result<Self> {
        Ok(Self {
            blog: blog.clone(),
            renderer: TemplateRenderer::new()?,
        })
    }

    /// Write listing page `n` for `state` plus the `posts.json` of the batch
    /// that produced it
    pub fn write_list_page(&self, n: usize, state: &ListState, batch: &PostPage) -> Result<()> {
        let config = &self.blog.config;
        let next = list_page_path(n + 1);

        let view = state.view(config, Some(url_for(config, &next)));
        let html = render_list(&self.renderer, config, &view)?;

        let dir = list_page_dir(&self.blog.public_dir, n);
        write_file(&dir.join("index.html"), html.as_bytes())?;

        let feed = PostsFeed {
            results: &batch.results,
            next_page: state
                .has_more()
                .then(|| url_for(config, &format!("{}{}", next, POSTS_JSON))),
        };
        write_file(
            &dir.join(POSTS_JSON),
            serde_json::to_string_pretty(&feed)?.as_bytes(),
        )?;

        tracing::debug!("Generated list page {} ({} posts)", n, state.posts().len());
        Ok(())
    }

    /// Remove listing pages numbered above `last`
    pub fn remove_list_pages_after(&self, last: usize) -> Result<()> {
        let mut n = last.max(1) + 1;
        loop {
            let dir = list_page_dir(&self.blog.public_dir, n);
            if !dir.exists() {
                break;
            }
            fs::remove_dir_all(&dir).with_context(|| format!("Failed to remove {:?}", dir))?;
            tracing::debug!("Removed stale list page {}", n);
            n += 1;
        }
        Ok(())
    }

    /// Render a post into `post/<uid>/index.html`, returning that path
    /// relative to the public directory
    pub fn write_post_page(&self, post: &PostDetail) -> Result<String> {
        let uid = post.uid.as_deref().unwrap_or_default();
        if !is_safe_slug(uid) {
            anyhow::bail!("Cannot write a post page for uid {:?}", uid);
        }

        let state = DetailState::Resolved(Box::new(post.clone()));
        let html = render_detail(&self.renderer, &self.blog.config, &state)?;

        let relative = post_output_path(uid);
        write_file(&self.blog.public_dir.join(&relative), html.as_bytes())?;
        tracing::debug!("Generated post: {}", relative);
        Ok(relative)
    }

    /// Placeholder served while a post is generated on demand
    pub fn render_fallback(&self) -> Result<String> {
        render_detail(&self.renderer, &self.blog.config, &DetailState::Fallback)
    }

    /// Whether the page of this post has already been written
    pub fn post_exists(&self, uid: &str) -> bool {
        is_safe_slug(uid) && self.blog.public_dir.join(post_output_path(uid)).is_file()
    }

    /// Delete the page of a post that no longer exists in the CMS, returning
    /// whether there was one
    pub fn remove_post(&self, uid: &str) -> Result<bool> {
        if !is_safe_slug(uid) {
            anyhow::bail!("Refusing to remove the output of uid {:?}", uid);
        }
        let dir = self.blog.public_dir.join("post").join(uid);
        if !dir.exists() {
            return Ok(false);
        }
        fs::remove_dir_all(&dir).with_context(|| format!("Failed to remove {:?}", dir))?;
        tracing::info!("Deleted: {:?}", dir);
        Ok(true)
    }

    /// Write `paths.json`
    pub fn write_paths(&self, slugs: &[String]) -> Result<()> {
        let manifest = PathsManifest::new(slugs);
        let path = self.blog.public_dir.join(PATHS_JSON);
        write_file(&path, serde_json::to_string_pretty(&manifest)?.as_bytes())?;
        tracing::info!("Generated {} ({} paths)", PATHS_JSON, slugs.len());
        Ok(())
    }
}

/// Output path of a post page relative to the public directory
pub fn post_output_path(uid: &str) -> String {
    format!("post/{}/index.html", uid)
}

fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create dir {:?}", parent))?;
    }
    fs::write(path, contents).with_context(|| format!("Failed to write {:?}", path))?;
    Ok(())
}

/// Public directory path of listing page `n`
pub fn list_page_dir(public_dir: &Path, n: usize) -> PathBuf {
    public_dir.join(list_page_path(n))
}
