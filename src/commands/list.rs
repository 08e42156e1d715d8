//! List the posts published in the CMS

use anyhow::Result;

use crate::cms::CmsClient;
use crate::config::SiteConfig;
use crate::content::PostSummary;
use crate::helpers::format_date;
use crate::Blog;

/// Print every post with its date, author and title
pub async fn run(blog: &Blog) -> Result<()> {
    let client = CmsClient::new(&blog.config.cms)?;
    let documents = client.all_documents(&blog.config.cms.document_type).await?;

    let posts = documents
        .iter()
        .map(|d| d.to_summary())
        .collect::<Result<Vec<_>, _>>()?;

    println!("Posts ({}):", posts.len());
    for post in &posts {
        println!("  {}", format_line(post, &blog.config));
    }

    Ok(())
}

fn format_line(post: &PostSummary, config: &SiteConfig) -> String {
    let date = post
        .published_at()
        .map(|d| format_date(&d, "yyyy-MM-dd", &config.language))
        .unwrap_or_else(|| "----------".to_string());
    let uid = post.uid.as_deref().unwrap_or("?");

    if post.data.author.is_empty() {
        format!("{} - {} [{}]", date, post.data.title, uid)
    } else {
        format!(
            "{} - {} ({}) [{}]",
            date, post.data.title, post.data.author, uid
        )
    }
}
