//! Batch PDF form filling
//!
//! This crate fills AcroForm templates from CSV rows using lopdf:
//! - `geometry`: PDF-space field rects to preview pixels, for every page rotation
//! - `bidi` / `naming`: Hebrew-aware field text and sanitized, unique filenames
//! - `pdf`: template inspection, value filling and appearance streams
//! - `batch::generate_batch`: the chunked, cancellable generation driver

pub mod archive;
pub mod batch;
pub mod bidi;
pub mod config;
pub mod csv_source;
pub mod error;
pub mod geometry;
pub mod naming;
pub mod pdf;

pub use archive::ArchiveBuilder;
pub use batch::{
    generate_batch, CancellationFlag, GenerationConfig, GenerationOutput, Progress, SkippedMapping,
};
pub use bidi::normalize_field_text;
pub use config::{BatchOptions, Compression, InputLimits};
pub use csv_source::{parse_csv, CsvTable};
pub use error::{ConfigError, CsvError, FillError, GenerationError, NamingError, PdfError, SkipReason};
pub use geometry::{field_to_screen, fit_preview, place_overlay, screen_to_field, OverlayPlacement};
pub use naming::{FilenameRegistry, NamingContext, NamingTemplate};
pub use pdf::{inspect_template, TemplateInfo};

/// Parse PDF bytes after checking them against `limits`
pub fn inspect_template_checked(bytes: &[u8], limits: &InputLimits) -> Result<TemplateInfo, PdfError> {
    if bytes.len() > limits.max_pdf_bytes {
        return Err(PdfError::ParseError(format!(
            "template is {} bytes (limit {})",
            bytes.len(),
            limits.max_pdf_bytes
        )));
    }
    inspect_template(bytes)
}
