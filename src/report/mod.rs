//! Report module - HTML dashboard rendering

pub mod format;
mod html;

pub use html::{HtmlGenerator, RenderError, ReportMeta};
