//! Print the detail paths generated ahead of time

use anyhow::Result;

use crate::cms::CmsClient;
use crate::helpers::{is_safe_slug, post_path, url_for};
use crate::Blog;

/// Slugs of every post that gets a static page, in CMS order
pub async fn static_slugs(blog: &Blog, client: &CmsClient) -> Result<Vec<String>> {
    let documents = client.all_documents(&blog.config.cms.document_type).await?;
    let mut slugs: Vec<String> = Vec::with_capacity(documents.len());
    for uid in documents.into_iter().filter_map(|d| d.uid) {
        if is_safe_slug(&uid) && !slugs.contains(&uid) {
            slugs.push(uid);
        }
    }
    Ok(slugs)
}

pub async fn run(blog: &Blog) -> Result<()> {
    let client = CmsClient::new(&blog.config.cms)?;
    let slugs = static_slugs(blog, &client).await?;

    println!("Paths ({}, fallback: on):", slugs.len());
    for slug in &slugs {
        println!("  {}", url_for(&blog.config, &post_path(slug)));
    }

    Ok(())
}
