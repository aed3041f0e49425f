//! Seam between layout and rendering.

use super::RenderError;

/// Turns a complete Typst source into PDF bytes.
pub trait DocumentRenderer: Send + Sync {
    fn render(&self, typst_source: &str) -> Result<Vec<u8>, RenderError>;
}
