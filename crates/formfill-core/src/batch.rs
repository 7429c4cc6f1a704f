//! Batch generation: one filled document per row, bundled into a zip
//!
//! Rows run sequentially in chunks. Between chunks the driver yields to the
//! executor (or sleeps for the configured delay) and checks for cancellation.
//! Per-mapping problems are recorded and skipped; anything that would leave
//! the archive incomplete aborts the batch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use formfill_types::{GenerationRow, MappingSet};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::archive::ArchiveBuilder;
use crate::config::BatchOptions;
use crate::error::{FillError, GenerationError, SkipReason};
use crate::naming::{FilenameRegistry, NamingContext, NamingTemplate};
use crate::pdf::{fill_field, EmbeddedFont, PreparedTemplate};

/// Everything one batch needs; nothing is read from global state
#[derive(Debug, Clone, Default)]
pub struct GenerationConfig {
    pub mappings: MappingSet,
    pub naming_template: String,
    pub rows: Vec<GenerationRow>,
    pub template_pdf: Vec<u8>,
    /// TrueType font used for appearances; needed for non-Latin values
    pub font: Option<Vec<u8>>,
    pub options: BatchOptions,
}

/// Reported after every row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    pub fraction: f64,
    pub message: String,
}

impl Progress {
    fn new(completed: usize, total: usize, message: String) -> Self {
        let fraction = if total == 0 {
            1.0
        } else {
            completed as f64 / total as f64
        };
        Self {
            completed,
            total,
            fraction,
            message,
        }
    }
}

/// A mapping that was not applied to one row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedMapping {
    pub row_number: usize,
    pub field_name: String,
    pub column_name: String,
    #[serde(flatten)]
    pub reason: SkipReason,
}

#[derive(Debug, Clone)]
pub struct GenerationOutput {
    pub archive: Vec<u8>,
    /// Issued filenames in row order
    pub filenames: Vec<String>,
    pub skipped: Vec<SkippedMapping>,
}

/// Shared stop request, checked at chunk boundaries
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Generate every row of `config` and return the finished archive
pub async fn generate_batch<F>(
    config: GenerationConfig,
    mut progress: F,
    cancel: Option<&CancellationFlag>,
) -> Result<GenerationOutput, GenerationError>
where
    F: FnMut(&Progress),
{
    let naming = NamingTemplate::parse(&config.naming_template)?;
    if config.rows.is_empty() {
        return Err(GenerationError::InvalidInput("no rows to generate".into()));
    }

    let font = config
        .font
        .map(EmbeddedFont::from_bytes)
        .transpose()
        .map_err(|e| {
            error!(error = %e, "Configured font rejected");
            GenerationError::FontUnavailable(e.to_string())
        })?;

    let template = PreparedTemplate::prepare(&config.template_pdf, font.as_ref()).map_err(|e| {
        error!(error = %e, "Template failed to load");
        GenerationError::TemplateLoad(e.to_string())
    })?;

    for mapping in config.mappings.iter() {
        if !template.fields().contains(&mapping.field_name) {
            warn!(field = %mapping.field_name, "Mapped field not present in template; it will be skipped");
        }
    }

    let total = config.rows.len();
    let chunk_size = config.options.chunk_size.max(1);
    let chunk_count = total.div_ceil(chunk_size);
    info!(
        rows = total,
        mappings = config.mappings.len(),
        chunk_size,
        embedded_font = font.is_some(),
        "Starting batch generation"
    );

    let ctx = NamingContext::now();
    let mut registry = FilenameRegistry::new();
    let mut archive = ArchiveBuilder::new(config.options.compression);
    let mut skipped = Vec::new();
    let mut completed = 0;

    for (chunk_index, chunk) in config.rows.chunks(chunk_size).enumerate() {
        if cancel.is_some_and(CancellationFlag::is_cancelled) {
            info!(completed, total, "Batch cancelled");
            return Err(GenerationError::Cancelled);
        }

        for row in chunk {
            let row_number = completed + 1;
            let bytes = render_row(&template, &config.mappings, row, row_number, &mut skipped)?;

            let name = registry.claim(&naming.render(row_number, row, &config.mappings, &ctx));
            archive.add(&name, &bytes)?;
            debug!(row = row_number, file = %name, size = bytes.len(), "Row generated");

            completed += 1;
            progress(&Progress::new(
                completed,
                total,
                format!("Generated {} ({}/{})", name, completed, total),
            ));
        }

        if chunk_index + 1 < chunk_count {
            if config.options.yield_delay.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(config.options.yield_delay).await;
            }
        }
    }

    let archive = archive.finish()?;
    info!(
        files = registry.len(),
        skipped = skipped.len(),
        archive_bytes = archive.len(),
        "Batch generation complete"
    );

    Ok(GenerationOutput {
        archive,
        filenames: registry.into_names(),
        skipped,
    })
}

/// Fill a private copy of the template for one row and serialize it
fn render_row(
    template: &PreparedTemplate,
    mappings: &MappingSet,
    row: &GenerationRow,
    row_number: usize,
    skipped: &mut Vec<SkippedMapping>,
) -> Result<Vec<u8>, GenerationError> {
    let mut doc = template.instance();

    for mapping in mappings.iter() {
        let value = row.get(&mapping.column_name).unwrap_or_default();

        let result = match template.fields().get(&mapping.field_name) {
            Some(field) => fill_field(&mut doc, field, value, template.fonts()),
            None => Err(SkipReason::FieldNotFound.into()),
        };

        match result {
            Ok(()) => debug!(row = row_number, field = %mapping.field_name, "Field filled"),
            Err(FillError::Skip(reason)) => {
                warn!(row = row_number, field = %mapping.field_name, %reason, "Skipping mapping");
                skipped.push(SkippedMapping {
                    row_number,
                    field_name: mapping.field_name.clone(),
                    column_name: mapping.column_name.clone(),
                    reason,
                });
            }
            Err(FillError::FontRequired) => {
                error!(row = row_number, field = %mapping.field_name, "Value needs an embedded font");
                return Err(GenerationError::FontRequired {
                    row: row_number,
                    field: mapping.field_name.clone(),
                });
            }
            Err(FillError::Pdf(e)) => {
                error!(row = row_number, field = %mapping.field_name, error = %e, "Failed to fill field");
                return Err(GenerationError::Serialization {
                    row: row_number,
                    message: e.to_string(),
                });
            }
        }
    }

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).map_err(|e| {
        error!(row = row_number, error = %e, "Failed to serialize document");
        GenerationError::Serialization {
            row: row_number,
            message: e.to_string(),
        }
    })?;
    Ok(bytes)
}
