//! Generate static files

use anyhow::Result;
use std::collections::HashSet;

use crate::cache::{self, CacheDb, ChangeSet};
use crate::cms::CmsClient;
use crate::generator::{post_output_path, Generator};
use crate::helpers::is_safe_slug;
use crate::pages::{ApplyOutcome, ListState};
use crate::Blog;

/// What a generation run produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    /// Listing pages written (index plus `page/N/`)
    pub list_pages: usize,
    /// Posts known to the CMS with a usable uid
    pub posts: usize,
    /// Post pages rendered in this run
    pub rendered: usize,
    /// Post pages removed because their document is gone
    pub removed: usize,
}

/// Generate the static site (with incremental support)
pub async fn run(blog: &Blog) -> Result<Summary> {
    run_with_options(blog, false).await
}

/// Generate with force option
pub async fn run_with_options(blog: &Blog, force: bool) -> Result<Summary> {
    let start = std::time::Instant::now();
    let client = CmsClient::new(&blog.config.cms)?;
    let generator = Generator::new(blog)?;
    let mut summary = Summary::default();

    summary.list_pages = generate_list_pages(blog, &client, &generator).await?;

    let cms = &blog.config.cms;
    let documents = client.all_documents(&cms.document_type).await?;

    let mut seen = HashSet::new();
    let mut current = Vec::new();
    for document in &documents {
        let Some(uid) = document.uid.as_deref() else {
            tracing::warn!("Skipping document {} without uid", document.id);
            continue;
        };
        if !is_safe_slug(uid) {
            tracing::warn!("Skipping document {} with unusable uid {:?}", document.id, uid);
            continue;
        }
        if !seen.insert(uid) {
            tracing::warn!("Duplicate uid {:?}, keeping the first document", uid);
            continue;
        }
        let raw = serde_json::to_string(document)?;
        current.push((document, uid.to_string(), cache::hash_content(&raw)));
    }
    summary.posts = current.len();

    // Detect changes
    let cache = CacheDb::load(&blog.base_dir);
    let config_hash = cache::hash_config(&blog.config)?;
    let hashes: Vec<_> = current
        .iter()
        .map(|(_, uid, hash)| (uid.clone(), *hash))
        .collect();

    let changeset = if force || cache.is_empty() {
        tracing::info!(
            "Full generation (force={}, cache_empty={})",
            force,
            cache.is_empty()
        );
        let uids: Vec<&str> = current.iter().map(|(_, uid, _)| uid.as_str()).collect();
        ChangeSet::full_rebuild(cache::deleted_posts(&cache, &uids))
    } else {
        cache::detect_changes(&cache, config_hash, &hashes)
    };
    if changeset.has_changes() {
        tracing::info!("Changes detected: {}", changeset.summary());
    } else {
        tracing::info!("No post changes detected");
    }

    for uid in &changeset.deleted_posts {
        if !is_safe_slug(uid) {
            tracing::warn!("Ignoring cached entry with unusable uid {:?}", uid);
            continue;
        }
        tracing::info!("Removing deleted post {}", uid);
        if generator.remove_post(uid)? {
            summary.removed += 1;
        }
    }

    let mut posts_for_cache = Vec::with_capacity(current.len());
    for (document, uid, hash) in &current {
        if changeset.needs_render(uid) || !generator.post_exists(uid) {
            let detail = document.to_detail()?;
            generator.write_post_page(&detail)?;
            summary.rendered += 1;
        }
        posts_for_cache.push((uid.clone(), *hash, post_output_path(uid)));
    }

    let slugs: Vec<_> = current.iter().map(|(_, uid, _)| uid.clone()).collect();
    generator.write_paths(&slugs)?;

    // Update cache
    let mut new_cache = CacheDb::new();
    cache::update_cache(&mut new_cache, config_hash, &posts_for_cache);
    new_cache.save(&blog.base_dir)?;

    let duration = start.elapsed();
    tracing::info!(
        "Generated {} list pages and {} posts ({} rendered) in {:.2}s",
        summary.list_pages,
        summary.posts,
        summary.rendered,
        duration.as_secs_f64()
    );

    Ok(summary)
}

/// Write the index and one `page/N/` per "load more" step, returning the
/// number of listing pages
async fn generate_list_pages(
    blog: &Blog,
    client: &CmsClient,
    generator: &Generator,
) -> Result<usize> {
    let cms = &blog.config.cms;
    let first = client
        .query(&cms.document_type, &cms.qualified_fields(), cms.page_size)
        .await?;
    tracing::info!("Loaded first page with {} posts", first.results.len());

    let mut state = ListState::new(first.clone());
    generator.write_list_page(1, &state, &first)?;
    let mut pages = 1;

    let mut cursors = HashSet::new();
    while let Some(request) = state.begin_load() {
        if !cursors.insert(request.url.clone()) {
            tracing::warn!("CMS returned an already visited cursor, stopping pagination");
            break;
        }

        let batch = client.fetch_page(&request.url).await?;
        match state.apply_next_page(request.seq, batch.clone()) {
            ApplyOutcome::Applied { added } => {
                pages += 1;
                tracing::debug!("Page {} added {} posts", pages, added);
                generator.write_list_page(pages, &state, &batch)?;
            }
            ApplyOutcome::Stale => break,
        }
    }

    generator.remove_list_pages_after(pages)?;
    Ok(pages)
}

/// Fetch one post by uid, write its page and track it in the cache so a
/// later run can remove it
pub async fn generate_post(blog: &Blog, client: &CmsClient, uid: &str) -> Result<String> {
    let generator = Generator::new(blog)?;
    let document = client
        .get_by_uid(&blog.config.cms.document_type, uid)
        .await?;
    let detail = document.to_detail()?;
    let output_path = generator.write_post_page(&detail)?;

    let hash = cache::hash_content(&serde_json::to_string(&document)?);
    let mut cache = CacheDb::load(&blog.base_dir);
    let config_hash = cache::hash_config(&blog.config)?;
    cache::record_post(&mut cache, config_hash, uid, hash, &output_path);
    cache.save(&blog.base_dir)?;

    Ok(output_path)
}
