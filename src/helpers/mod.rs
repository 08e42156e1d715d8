//! Helper functions shared by the generator, templates and server
//!
//! URL generation, date formatting and HTML escaping.

mod date;
mod html;
mod url;

pub use date::*;
pub use html::*;
pub use url::*;
