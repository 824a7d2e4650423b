// src/pdf/mod.rs
pub mod document;
pub mod models;

// Re-export the page-level types used by the extractors
pub use document::{PageSource, PdfDocument};
pub use models::{group_lines, render_block, render_line, Glyph, PageLayout, RawTable};

#[cfg(test)]
pub(crate) use document::{fixtures, MemorySource};
