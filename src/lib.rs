//! Serve Markdown documents as HTML wrapped in site-supplied style templates.
//!
//! A request's Markdown is gathered from the file its path names, text posted
//! in a form and a remote URL ([`acquire`]), converted to HTML ([`markdown`])
//! and written between the header and footer of a style template ([`style`]).

pub mod acquire;
pub mod buffer;
pub mod config;
pub mod error;
pub mod fetch;
pub mod markdown;
pub mod render;
pub mod server;
pub mod style;
pub mod telemetry;

pub use acquire::{Acquirer, ContentRequest};
pub use buffer::Buffer;
pub use config::{CliArgs, Settings};
pub use error::AcquireError;
pub use render::{Pipeline, Rendered};
