//! Conversion requests, validation and the per-request lifecycle.
//!
//! A request moves through `Received -> Validated -> Converted`, or ends in
//! `Failed` at whichever step rejected it. Nothing here outlives the request.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};
use usvg::roxmltree;
use uuid::Uuid;

use crate::converter::{ConverterError, PdfConverter};
use crate::telemetry;

/// Attachment name used when the client supplied no usable filename.
pub const DEFAULT_OUTPUT_FILENAME: &str = "output.pdf";

/// Content type implied by the JSON endpoint.
const INLINE_CONTENT_TYPE: &str = "image/svg+xml";

const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

/// Errors produced while validating or converting a request.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("SVG content is empty")]
    EmptyInput,

    #[error("Invalid file type: expected image/svg+xml content or a .svg filename")]
    UnsupportedType,

    #[error("Invalid SVG content: {0}")]
    MalformedSvg(String),

    #[error("Error converting SVG to PDF: {0}")]
    Failed(#[from] ConverterError),

    #[error("SVG to PDF conversion timed out after {}s", .0.as_secs_f32())]
    TimedOut(Duration),

    #[error("SVG to PDF conversion aborted unexpectedly")]
    Aborted,
}

impl ConversionError {
    /// Short machine-readable label for logs and telemetry.
    pub fn kind(&self) -> &'static str {
        match self {
            ConversionError::EmptyInput => "empty_input",
            ConversionError::UnsupportedType => "unsupported_type",
            ConversionError::MalformedSvg(_) => "malformed_svg",
            ConversionError::Failed(_) => "conversion_failed",
            ConversionError::TimedOut(_) => "timed_out",
            ConversionError::Aborted => "aborted",
        }
    }
}

/// Where the SVG came from.
#[derive(Debug, Clone)]
pub enum SvgSource {
    /// `{"svg": ...}` body of the JSON endpoint.
    Inline { svg: String },
    /// A multipart file part.
    Upload {
        bytes: Vec<u8>,
        declared_content_type: Option<String>,
    },
}

/// One inbound conversion request.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    source: SvgSource,
    filename: Option<String>,
}

impl ConversionRequest {
    pub fn inline(svg: String, filename: Option<String>) -> Self {
        Self {
            source: SvgSource::Inline { svg },
            filename,
        }
    }

    pub fn upload(
        bytes: Vec<u8>,
        filename: Option<String>,
        declared_content_type: Option<String>,
    ) -> Self {
        Self {
            source: SvgSource::Upload {
                bytes,
                declared_content_type,
            },
            filename,
        }
    }

    pub fn content(&self) -> &[u8] {
        match &self.source {
            SvgSource::Inline { svg } => svg.as_bytes(),
            SvgSource::Upload { bytes, .. } => bytes,
        }
    }

    /// Declared content type, ignoring blank values.
    pub fn content_type(&self) -> Option<&str> {
        match &self.source {
            SvgSource::Inline { .. } => Some(INLINE_CONTENT_TYPE),
            SvgSource::Upload {
                declared_content_type,
                ..
            } => declared_content_type
                .as_deref()
                .map(str::trim)
                .filter(|ct| !ct.is_empty()),
        }
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Applies the validation rules in order: non-empty content, SVG type
    /// marker, well-formed XML with an `<svg>` root.
    pub fn validate(self) -> Result<ValidatedSvg, ConversionError> {
        if self.content().iter().all(u8::is_ascii_whitespace) {
            return Err(ConversionError::EmptyInput);
        }

        if !self.declares_svg() {
            return Err(ConversionError::UnsupportedType);
        }

        check_well_formed(self.content())?;

        let output_filename = output_filename(self.filename());
        let content = match self.source {
            SvgSource::Inline { svg } => svg.into_bytes(),
            SvgSource::Upload { bytes, .. } => bytes,
        };

        Ok(ValidatedSvg {
            content,
            output_filename,
        })
    }

    fn declares_svg(&self) -> bool {
        match self.content_type() {
            Some(content_type) => content_type.to_ascii_lowercase().contains("svg"),
            None => self.filename().is_some_and(|name| has_suffix(name.trim(), ".svg")),
        }
    }
}

/// Content that passed validation, ready for the converter.
#[derive(Debug, Clone)]
pub struct ValidatedSvg {
    content: Vec<u8>,
    output_filename: String,
}

impl ValidatedSvg {
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn output_filename(&self) -> &str {
        &self.output_filename
    }
}

/// PDF bytes plus the attachment name they should be served under.
#[derive(Debug, Clone)]
pub struct ConversionResult {
    pub pdf: Vec<u8>,
    pub filename: String,
}

/// Derives the attachment filename for a converted document.
///
/// Directory components and characters that cannot appear inside a quoted
/// header parameter are dropped. A trailing `.svg` or `.pdf` is replaced by
/// `.pdf`; anything else gets `.pdf` appended.
pub fn output_filename(requested: Option<&str>) -> String {
    let Some(requested) = requested else {
        return DEFAULT_OUTPUT_FILENAME.to_string();
    };

    let base = requested.rsplit(&['/', '\\'][..]).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .filter(|c| !c.is_control() && *c != '"')
        .collect();
    let cleaned = cleaned.trim();

    let stem = [".svg", ".pdf"]
        .iter()
        .find(|suffix| has_suffix(cleaned, suffix))
        .map(|suffix| &cleaned[..cleaned.len() - suffix.len()])
        .unwrap_or(cleaned);

    if stem.trim().is_empty() {
        return DEFAULT_OUTPUT_FILENAME.to_string();
    }

    format!("{stem}.pdf")
}

fn has_suffix(name: &str, suffix: &str) -> bool {
    name.len() >= suffix.len()
        && name
            .get(name.len() - suffix.len()..)
            .is_some_and(|tail| tail.eq_ignore_ascii_case(suffix))
}

/// Checks that `content` is a well-formed XML document whose root element is
/// `<svg>` in the SVG namespace.
///
/// Parsing uses the same XML reader and options as the renderer, so anything
/// accepted here reaches the converter as a document it can read.
fn check_well_formed(content: &[u8]) -> Result<(), ConversionError> {
    let text = std::str::from_utf8(content)
        .map_err(|e| ConversionError::MalformedSvg(format!("content is not valid UTF-8: {e}")))?;

    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    };
    let document = roxmltree::Document::parse_with_options(text, options)
        .map_err(|e| ConversionError::MalformedSvg(e.to_string()))?;

    let root = document.root_element().tag_name();
    if root.name() != "svg" {
        return Err(ConversionError::MalformedSvg(format!(
            "root element is <{}>, expected <svg>",
            root.name()
        )));
    }
    if root.namespace() != Some(SVG_NAMESPACE) {
        return Err(ConversionError::MalformedSvg(format!(
            "root <svg> element must declare xmlns=\"{SVG_NAMESPACE}\""
        )));
    }
    Ok(())
}

/// Lifecycle stage of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionStage {
    Received,
    Validated,
    Converted,
    Failed,
}

impl fmt::Display for ConversionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionStage::Received => write!(f, "received"),
            ConversionStage::Validated => write!(f, "validated"),
            ConversionStage::Converted => write!(f, "converted"),
            ConversionStage::Failed => write!(f, "failed"),
        }
    }
}

/// Bookkeeping for a single request, used for logs and telemetry.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub request_id: Uuid,
    pub stage: ConversionStage,
    pub input_bytes: usize,
    pub output_bytes: Option<usize>,
    pub filename: Option<String>,
    pub received_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub error_kind: Option<&'static str>,
    pub error: Option<String>,
}

impl ConversionJob {
    pub fn new(input_bytes: usize) -> Self {
        let now = Utc::now();
        Self {
            request_id: Uuid::new_v4(),
            stage: ConversionStage::Received,
            input_bytes,
            output_bytes: None,
            filename: None,
            received_at: now,
            updated_at: now,
            error_kind: None,
            error: None,
        }
    }

    pub fn mark_validated(&mut self, filename: &str) {
        self.stage = ConversionStage::Validated;
        self.filename = Some(filename.to_string());
        self.updated_at = Utc::now();
    }

    pub fn mark_converted(&mut self, output_bytes: usize) {
        self.stage = ConversionStage::Converted;
        self.output_bytes = Some(output_bytes);
        self.updated_at = Utc::now();
        self.error_kind = None;
        self.error = None;
    }

    pub fn mark_failed(&mut self, error: &ConversionError) {
        self.stage = ConversionStage::Failed;
        self.updated_at = Utc::now();
        self.error_kind = Some(error.kind());
        self.error = Some(error.to_string());
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self.stage,
            ConversionStage::Converted | ConversionStage::Failed
        )
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.is_finished().then(|| {
            self.updated_at
                .signed_duration_since(self.received_at)
                .num_milliseconds()
        })
    }
}

/// Validates `request`, hands it to `converter` on the blocking pool and
/// bounds the call by `timeout`.
///
/// The outcome is logged and recorded as telemetry whether it succeeds or not.
/// A conversion that exceeds `timeout` is detached rather than cancelled: the
/// caller gets `TimedOut` immediately and a warning is logged once the
/// abandoned work returns.
pub async fn run_conversion(
    converter: Arc<dyn PdfConverter>,
    request: ConversionRequest,
    timeout: Duration,
) -> Result<ConversionResult, ConversionError> {
    let mut job = ConversionJob::new(request.content().len());
    debug!(
        request_id = %job.request_id,
        input_bytes = job.input_bytes,
        filename = ?request.filename(),
        content_type = ?request.content_type(),
        "Conversion request received"
    );

    let result = convert_validated(&mut job, converter, request, timeout).await;

    match &result {
        Ok(result) => {
            job.mark_converted(result.pdf.len());
            info!(
                request_id = %job.request_id,
                filename = %result.filename,
                input_bytes = job.input_bytes,
                output_bytes = result.pdf.len(),
                duration_ms = job.duration_ms(),
                "SVG converted to PDF"
            );
        }
        Err(error) => {
            job.mark_failed(error);
            match error {
                ConversionError::TimedOut(_) | ConversionError::Aborted => warn!(
                    request_id = %job.request_id,
                    error = %error,
                    "SVG conversion did not complete"
                ),
                _ => debug!(
                    request_id = %job.request_id,
                    kind = error.kind(),
                    error = %error,
                    "SVG conversion rejected"
                ),
            }
        }
    }

    telemetry::record_conversion_telemetry(&job);
    result
}

async fn convert_validated(
    job: &mut ConversionJob,
    converter: Arc<dyn PdfConverter>,
    request: ConversionRequest,
    timeout: Duration,
) -> Result<ConversionResult, ConversionError> {
    let validated = request.validate()?;
    job.mark_validated(validated.output_filename());

    let ValidatedSvg {
        content,
        output_filename,
    } = validated;
    let mut task = tokio::task::spawn_blocking(move || converter.convert(&content));

    let pdf = match tokio::time::timeout(timeout, &mut task).await {
        Ok(Ok(converted)) => converted?,
        Ok(Err(join_error)) => {
            warn!(request_id = %job.request_id, error = %join_error, "Conversion task panicked");
            return Err(ConversionError::Aborted);
        }
        Err(_) => {
            // Blocking work cannot be cancelled; it keeps its pool thread
            // until the renderer returns.
            let request_id = job.request_id;
            tokio::spawn(async move {
                let outcome = match task.await {
                    Ok(Ok(_)) => "converted",
                    Ok(Err(_)) => "failed",
                    Err(_) => "panicked",
                };
                warn!(%request_id, outcome, "Abandoned conversion finished after timeout");
            });
            return Err(ConversionError::TimedOut(timeout));
        }
    };

    Ok(ConversionResult {
        pdf,
        filename: output_filename,
    })
}
