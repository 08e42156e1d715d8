//! Content module - post view models, rich text, and reading time

mod post;
pub mod reading_time;
pub mod rich_text;
pub mod sanitize;

pub use post::{Banner, ContentBlock, DetailData, PostDetail, PostPage, PostSummary, SummaryData};
pub use rich_text::{HtmlOptions, RichTextBlock};

use serde::{Deserialize, Deserializer};

/// Treat an explicit `null` like a missing field
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
