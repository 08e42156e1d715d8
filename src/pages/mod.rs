//! The two pages of the blog: the post listing and the post detail

pub mod detail;
pub mod list;

pub use detail::{render_detail, DetailPageData, DetailState};
pub use list::{render_list, ApplyOutcome, ListPageData, ListState, PageRequest};
