//! # page-forge – themeable A4 pagination for Markdown-rendered HTML
//!
//! This crate splits one continuous HTML flow into fixed-height A4 pages
//! for print and PDF export. The pipeline stages are:
//!
//! 1. **Theme** – resolve the stylesheet for a theme name ([`theme`])
//! 2. **Parse** – HTML string → top-level blocks ([`dom`])
//! 3. **Measure** – block heights at page content width ([`measure`],
//!    backed by [`style`], [`layout`] and [`fonts`])
//! 4. **Paginate** – keep headings with their section, never split atomic
//!    blocks ([`pagination`])
//! 5. **Assemble** – header band, footer and page counter chrome in three
//!    output shapes ([`assemble`], [`assets`])
//!
//! A C-compatible FFI surface is exposed via the [`ffi`] module.

pub mod assemble;
pub mod assets;
pub mod dom;
pub mod error;
pub mod ffi;
pub mod fonts;
pub mod layout;
pub mod measure;
pub mod pagination;
pub mod pipeline;
pub mod report;
pub mod style;
pub mod templates;
pub mod theme;

// Re-exports for convenience
pub use assemble::{ExportBundle, PageAssembler};
pub use error::{Error, MeasureError, PaginateError, Result};
pub use measure::{LayoutMeasurer, Measure};
pub use pagination::{PageFragment, Paginator};
pub use pipeline::{OutputFormat, Pipeline, PipelineConfig};
pub use style::Stylesheet;
