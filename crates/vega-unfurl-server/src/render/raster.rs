//! SVG to PNG rasterization.
//!
//! The font database is loaded once and shared by every request; parsing and
//! drawing run on the blocking pool.

use std::sync::Arc;

use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg::fontdb::Database;
use resvg::usvg::{Options, Tree};

use crate::error::RenderError;

/// Rasterizes SVG markup against a shared font database.
#[derive(Clone)]
pub struct Rasterizer {
    fontdb: Arc<Database>,
}

impl Default for Rasterizer {
    /// A rasterizer without fonts; text elements are dropped.
    fn default() -> Self {
        Self::new(Arc::new(Database::new()))
    }
}

impl Rasterizer {
    /// Create a rasterizer over an already loaded font database.
    pub fn new(fontdb: Arc<Database>) -> Self {
        Self { fontdb }
    }

    /// Create a rasterizer with the system fonts. Scans font directories.
    pub fn with_system_fonts() -> Self {
        let mut fontdb = Database::new();
        fontdb.load_system_fonts();
        tracing::info!(faces = fontdb.len(), "font database loaded");
        Self::new(Arc::new(fontdb))
    }

    /// Number of font faces available to rendered text.
    pub fn font_faces(&self) -> usize {
        self.fontdb.len()
    }

    /// Rasterize SVG markup to PNG bytes at its intrinsic size.
    pub async fn rasterize(&self, svg: String) -> Result<Vec<u8>, RenderError> {
        let fontdb = self.fontdb.clone();
        tokio::task::spawn_blocking(move || rasterize_with(&svg, fontdb))
            .await
            .map_err(|e| RenderError::Raster(format!("raster task failed: {e}")))?
    }
}

fn rasterize_with(svg: &str, fontdb: Arc<Database>) -> Result<Vec<u8>, RenderError> {
    let mut options = Options::default();
    options.fontdb = fontdb;

    let tree = Tree::from_str(svg, &options)
        .map_err(|e| RenderError::Raster(format!("SVG parse error: {e}")))?;

    let size = tree.size().to_int_size();
    let mut pixmap = Pixmap::new(size.width(), size.height())
        .ok_or_else(|| RenderError::Raster("failed to create pixmap".to_string()))?;

    resvg::render(&tree, Transform::default(), &mut pixmap.as_mut());

    pixmap
        .encode_png()
        .map_err(|e| RenderError::Raster(format!("PNG encode error: {e}")))
}
