//! SVG to PDF conversion with TRUE vector fidelity via svg2pdf.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};
use usvg::fontdb;

/// Failure raised by the rendering library.
#[derive(Debug, Error)]
pub enum ConverterError {
    #[error("failed to parse SVG content: {0}")]
    Parse(#[from] usvg::Error),

    #[error("invalid SVG dimensions: {width}x{height}")]
    InvalidDimensions { width: f32, height: f32 },
}

/// Opaque `svg bytes -> pdf bytes` capability the HTTP layer delegates to.
///
/// Implementations are called from the blocking thread pool and must not
/// assume an async context.
#[cfg_attr(test, mockall::automock)]
pub trait PdfConverter: Send + Sync {
    fn convert(&self, svg: &[u8]) -> Result<Vec<u8>, ConverterError>;
}

/// SVG to PDF converter using svg2pdf for true vector fidelity.
///
/// This converter uses the svg2pdf crate which converts SVG to PDF
/// maintaining complete vector graphics (no rasterization).
pub struct SvgToPdfConverter {
    fontdb: Arc<fontdb::Database>,
}

impl SvgToPdfConverter {
    /// Creates a converter with an empty font database.
    ///
    /// `<text>` elements are dropped unless fonts are available, see
    /// [`SvgToPdfConverter::with_system_fonts`].
    pub fn new() -> Self {
        Self {
            fontdb: Arc::new(fontdb::Database::new()),
        }
    }

    /// Creates a converter whose font database is populated from the host's
    /// installed fonts.
    pub fn with_system_fonts() -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        info!(faces = db.len(), "Loaded system fonts for SVG text rendering");

        Self {
            fontdb: Arc::new(db),
        }
    }

    fn options(&self) -> usvg::Options {
        let mut options = usvg::Options::default();
        options.fontdb = self.fontdb.clone();
        options
    }
}

impl PdfConverter for SvgToPdfConverter {
    /// Converts SVG content to PDF bytes.
    ///
    /// # Errors
    ///
    /// - SVG parsing errors (malformed XML, unsupported features)
    /// - Zero or negative document dimensions
    fn convert(&self, svg: &[u8]) -> Result<Vec<u8>, ConverterError> {
        debug!(input_bytes = svg.len(), "Converting SVG to PDF (VECTOR)");

        let tree = usvg::Tree::from_data(svg, &self.options())?;

        let size = tree.size();
        if size.width() <= 0.0 || size.height() <= 0.0 {
            return Err(ConverterError::InvalidDimensions {
                width: size.width(),
                height: size.height(),
            });
        }

        debug!(
            width = size.width(),
            height = size.height(),
            "SVG parsed successfully"
        );

        let pdf = svg2pdf::to_pdf(
            &tree,
            svg2pdf::ConversionOptions::default(),
            svg2pdf::PageOptions::default(),
        );

        debug!(output_bytes = pdf.len(), "PDF export complete (VECTOR)");
        Ok(pdf)
    }
}

impl Default for SvgToPdfConverter {
    fn default() -> Self {
        Self::new()
    }
}
