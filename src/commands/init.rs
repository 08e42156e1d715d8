//! Initialize a new blog site

use anyhow::Result;
use std::fs;
use std::path::Path;

use crate::Blog;

const CONFIG_TEMPLATE: &str = r#"# Blog configuration

# Site
title: spacetraveling
description: ''
language: pt-BR
date_format: dd MMM yyyy

# URL
url: http://localhost:4000
root: /

# Directory
public_dir: public

# Headless CMS
## The endpoint and token may also be set with PRISMIC_API_ENDPOINT
## and PRISMIC_ACCESS_TOKEN.
cms:
  endpoint: ''
  document_type: posts
  fields:
    - title
    - subtitle
    - author
  page_size: 20

# Content
content:
  words_per_minute: 200
  sanitize: true
  load_more_label: Carregar mais posts
  fallback_label: Carregando...
"#;

/// Initialize a new site in the given directory
pub fn init_site(target_dir: &Path) -> Result<()> {
    fs::create_dir_all(target_dir)?;

    let config_path = target_dir.join("_config.yml");
    if config_path.exists() {
        anyhow::bail!("{:?} already exists", config_path);
    }
    fs::write(&config_path, CONFIG_TEMPLATE)?;

    let gitignore = target_dir.join(".gitignore");
    if !gitignore.exists() {
        fs::write(gitignore, "public/\n.blog-cache/\n")?;
    }

    Ok(())
}

/// Run the init command with an existing Blog instance
pub fn run(blog: &Blog) -> Result<()> {
    init_site(&blog.base_dir)
}
