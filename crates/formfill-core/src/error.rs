use formfill_types::GeometryError;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NamingError {
    #[error("Unbalanced braces in naming template ({open} '{{' vs {close} '}}')")]
    UnbalancedBraces { open: usize, close: usize },

    #[error("Naming template must contain at least one {{Placeholder}}")]
    NoPlaceholders,

    #[error("Naming template contains an empty placeholder")]
    EmptyPlaceholder,
}

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    #[error("Invalid page {page}: {message}")]
    InvalidPage { page: u32, message: String },

    #[error("Invalid page geometry: {0}")]
    Geometry(#[from] GeometryError),

    #[error("Font error: {0}")]
    Font(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Why a single mapping was not applied to a row
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "camelCase")]
pub enum SkipReason {
    #[error("field not found in template")]
    FieldNotFound,

    #[error("field of kind '{kind}' cannot take a value")]
    UnsupportedKind { kind: String },

    #[error("'{value}' is not an option of this field")]
    OptionNotFound { value: String },
}

#[derive(Error, Debug)]
pub enum FillError {
    #[error(transparent)]
    Skip(#[from] SkipReason),

    #[error("value cannot be drawn without an embedded font")]
    FontRequired,

    #[error(transparent)]
    Pdf(#[from] PdfError),
}

#[derive(Error, Debug)]
pub enum CsvError {
    #[error("Failed to parse CSV: {0}")]
    Parse(#[from] csv::Error),

    #[error("CSV file has no header row")]
    Empty,

    #[error("CSV file is {size} bytes (limit {limit})")]
    TooLarge { size: usize, limit: usize },

    #[error("CSV file has more than {limit} data rows")]
    TooManyRows { limit: usize },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Failures that abort a whole batch; no archive is produced
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Invalid generation input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Naming(#[from] NamingError),

    #[error("Failed to load template PDF: {0}")]
    TemplateLoad(String),

    #[error("Failed to serialize document for row {row}: {message}")]
    Serialization { row: usize, message: String },

    #[error("Failed to write archive: {0}")]
    Archive(String),

    #[error("Configured font is unusable: {0}")]
    FontUnavailable(String),

    #[error("Row {row}: value for field '{field}' needs an embedded font (none configured)")]
    FontRequired { row: usize, field: String },

    #[error("Generation cancelled")]
    Cancelled,
}
