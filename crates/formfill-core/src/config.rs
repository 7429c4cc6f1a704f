//! Batch and input-limit configuration
//!
//! Defaults are usable as-is; hosts may load overrides from environment
//! variables and then apply their own flags on top.

use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_CHUNK_SIZE: usize = 10;

const MB: usize = 1024 * 1024;

/// Entry compression in the output archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    Stored,
    #[default]
    Deflated,
}

impl FromStr for Compression {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stored" | "store" | "none" => Ok(Compression::Stored),
            "deflated" | "deflate" => Ok(Compression::Deflated),
            _ => Err(ConfigError::InvalidValue {
                key: "compression".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// How a batch is chunked and packaged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    /// Rows processed between cooperative yields
    pub chunk_size: usize,
    /// Pause after each chunk; zero yields without sleeping
    pub yield_delay: Duration,
    pub compression: Compression,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            yield_delay: Duration::ZERO,
            compression: Compression::default(),
        }
    }
}

impl BatchOptions {
    /// Load options from environment variables
    ///
    /// Expected variables (all optional):
    /// - FORMFILL_CHUNK_SIZE: rows per chunk, at least 1
    /// - FORMFILL_YIELD_DELAY_MS: milliseconds to sleep between chunks
    /// - FORMFILL_COMPRESSION: "stored" or "deflated"
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let chunk_size = match lookup("FORMFILL_CHUNK_SIZE") {
            Some(raw) => parse_positive("FORMFILL_CHUNK_SIZE", &raw)?,
            None => defaults.chunk_size,
        };

        let yield_delay = match lookup("FORMFILL_YIELD_DELAY_MS") {
            Some(raw) => Duration::from_millis(parse_value("FORMFILL_YIELD_DELAY_MS", &raw)?),
            None => defaults.yield_delay,
        };

        let compression = match lookup("FORMFILL_COMPRESSION") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "FORMFILL_COMPRESSION".to_string(),
                value: raw.clone(),
            })?,
            None => defaults.compression,
        };

        Ok(Self {
            chunk_size,
            yield_delay,
            compression,
        })
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}

/// Upper bounds checked before parsing untrusted input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputLimits {
    pub max_pdf_bytes: usize,
    pub max_csv_bytes: usize,
    pub max_rows: usize,
}

impl Default for InputLimits {
    fn default() -> Self {
        Self {
            max_pdf_bytes: 25 * MB,
            max_csv_bytes: 10 * MB,
            max_rows: 5000,
        }
    }
}

impl InputLimits {
    /// Load limits from environment variables
    ///
    /// Expected variables (all optional):
    /// - FORMFILL_MAX_PDF_MB: template size limit in megabytes
    /// - FORMFILL_MAX_CSV_MB: CSV size limit in megabytes
    /// - FORMFILL_MAX_ROWS: data row limit
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let max_pdf_bytes = match lookup("FORMFILL_MAX_PDF_MB") {
            Some(raw) => parse_positive("FORMFILL_MAX_PDF_MB", &raw)? * MB,
            None => defaults.max_pdf_bytes,
        };
        let max_csv_bytes = match lookup("FORMFILL_MAX_CSV_MB") {
            Some(raw) => parse_positive("FORMFILL_MAX_CSV_MB", &raw)? * MB,
            None => defaults.max_csv_bytes,
        };
        let max_rows = match lookup("FORMFILL_MAX_ROWS") {
            Some(raw) => parse_positive("FORMFILL_MAX_ROWS", &raw)?,
            None => defaults.max_rows,
        };

        Ok(Self {
            max_pdf_bytes,
            max_csv_bytes,
            max_rows,
        })
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
    })
}

fn parse_positive(key: &str, raw: &str) -> Result<usize, ConfigError> {
    match parse_value::<usize>(key, raw)? {
        0 => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
        }),
        n => Ok(n),
    }
}
