//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::converter::{PdfConverter, SvgToPdfConverter};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    converter: Arc<dyn PdfConverter>,
}

impl AppState {
    /// Create a new application state around an explicit converter
    pub fn new(config: Config, converter: Arc<dyn PdfConverter>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, converter }),
        }
    }

    /// Create a state backed by [`SvgToPdfConverter`], honouring
    /// `load_system_fonts`
    pub fn with_svg2pdf(config: Config) -> Self {
        let converter = if config.load_system_fonts {
            SvgToPdfConverter::with_system_fonts()
        } else {
            SvgToPdfConverter::new()
        };
        Self::new(config, Arc::new(converter))
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get a handle to the converter
    pub fn converter(&self) -> Arc<dyn PdfConverter> {
        self.inner.converter.clone()
    }
}
