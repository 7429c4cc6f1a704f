//! Form filler command line
//!
//! Inspect AcroForm templates, preview output filenames and generate a zip
//! of filled documents from a CSV file. Results go to stdout as JSON; logs go
//! to stderr.

mod mapping;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use formfill_core::geometry::{fit_preview, place_overlay, AspectMismatch};
use formfill_core::{
    generate_batch, inspect_template_checked, parse_csv, BatchOptions, GenerationConfig,
    InputLimits, NamingContext, NamingTemplate, SkippedMapping,
};
use formfill_types::{RenderedPreview, ScreenRect};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "formfill")]
#[command(version, about = "Fill PDF form templates from CSV rows")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Describe a template's pages and form fields
    Inspect {
        template: PathBuf,
    },

    /// Field overlay rectangles for a preview image of the given size
    Overlay {
        template: PathBuf,

        /// Preview width in pixels
        #[arg(long)]
        width: f64,

        /// Preview height in pixels (derived from the page aspect when omitted)
        #[arg(long)]
        height: Option<f64>,
    },

    /// Column names, inferred kinds and sample values of a CSV file
    Columns {
        csv: PathBuf,
    },

    /// Sample output filenames for the first rows
    Preview {
        #[command(flatten)]
        inputs: BatchInputs,

        #[arg(long, default_value = "3")]
        count: usize,
    },

    /// Generate one filled document per CSV row into a zip archive
    Generate {
        #[command(flatten)]
        inputs: BatchInputs,

        /// Output zip path
        #[arg(long)]
        out: PathBuf,

        /// TrueType font for values outside Latin-1 (e.g. Hebrew)
        #[arg(long)]
        font: Option<PathBuf>,

        /// Rows per chunk (overrides FORMFILL_CHUNK_SIZE)
        #[arg(long)]
        chunk_size: Option<usize>,
    },
}

#[derive(clap::Args, Debug)]
struct BatchInputs {
    /// CSV file with a header row
    #[arg(long)]
    csv: PathBuf,

    /// Template PDF with an AcroForm
    #[arg(long)]
    template: PathBuf,

    /// Mapping JSON: list of mappings or {"field": "column"}
    #[arg(long)]
    mapping: PathBuf,

    /// Filename template, e.g. "invoice_{Row_Number}_{Customer}"
    #[arg(long)]
    name: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OverlayEntry {
    field: String,
    field_id: String,
    page: u32,
    rect: ScreenRect,
    aspect_mismatch: Option<AspectMismatch>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateSummary {
    archive: PathBuf,
    archive_bytes: usize,
    files: Vec<String>,
    skipped: Vec<SkippedMapping>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // stdout carries JSON results; all logs go to stderr
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let limits = InputLimits::from_env()?;

    match args.command {
        Command::Inspect { template } => {
            let bytes = read(&template)?;
            let info = inspect_template_checked(&bytes, &limits)
                .with_context(|| format!("inspecting {}", template.display()))?;
            print_json(&info)
        }
        Command::Overlay {
            template,
            width,
            height,
        } => {
            let bytes = read(&template)?;
            let info = inspect_template_checked(&bytes, &limits)
                .with_context(|| format!("inspecting {}", template.display()))?;

            let mut entries = Vec::new();
            for field in &info.fields {
                let Some(page) = info.page_for(field) else {
                    tracing::warn!(field = %field.name, page = field.page_index, "Field references a missing page");
                    continue;
                };
                let preview = match height {
                    Some(height) => RenderedPreview::new(width, height),
                    None => fit_preview(page, width, None),
                };
                let placement = place_overlay(&field.rect, page, &preview);
                entries.push(OverlayEntry {
                    field: field.name.clone(),
                    field_id: field.field_id.clone(),
                    page: field.page_number(),
                    rect: placement.rect,
                    aspect_mismatch: placement.aspect_mismatch,
                });
            }
            print_json(&entries)
        }
        Command::Columns { csv } => {
            let table = parse_csv(&read(&csv)?, &limits)
                .with_context(|| format!("parsing {}", csv.display()))?;
            print_json(&table.columns)
        }
        Command::Preview { inputs, count } => {
            let loaded = inputs.load(&limits)?;
            let naming = NamingTemplate::parse(&inputs.name)?;
            let names = naming.preview(&loaded.config.rows, &loaded.config.mappings, &NamingContext::now(), count);
            print_json(&names)
        }
        Command::Generate {
            inputs,
            out,
            font,
            chunk_size,
        } => {
            let mut loaded = inputs.load(&limits)?;
            if let Some(font) = font {
                loaded.config.font = Some(read(&font)?);
            }
            if let Some(chunk_size) = chunk_size {
                loaded.config.options = loaded.config.options.with_chunk_size(chunk_size);
            }

            let output = generate_batch(
                loaded.config,
                |p| tracing::info!(completed = p.completed, total = p.total, "{}", p.message),
                None,
            )
            .await?;

            std::fs::write(&out, &output.archive)
                .with_context(|| format!("writing {}", out.display()))?;

            print_json(&GenerateSummary {
                archive: out,
                archive_bytes: output.archive.len(),
                files: output.filenames,
                skipped: output.skipped,
            })
        }
    }
}

struct LoadedInputs {
    config: GenerationConfig,
}

impl BatchInputs {
    fn load(&self, limits: &InputLimits) -> Result<LoadedInputs> {
        let table = parse_csv(&read(&self.csv)?, limits)
            .with_context(|| format!("parsing {}", self.csv.display()))?;

        let template_pdf = read(&self.template)?;
        if template_pdf.len() > limits.max_pdf_bytes {
            bail!(
                "{} is {} bytes (limit {})",
                self.template.display(),
                template_pdf.len(),
                limits.max_pdf_bytes
            );
        }

        let mapping_json = std::fs::read_to_string(&self.mapping)
            .with_context(|| format!("reading {}", self.mapping.display()))?;
        let mappings = mapping::parse_mappings(&mapping_json)
            .with_context(|| format!("parsing {}", self.mapping.display()))?;

        let headers = table.headers();
        for m in mappings.iter() {
            if !headers.contains(&m.column_name.as_str()) {
                tracing::warn!(column = %m.column_name, field = %m.field_name, "Mapped column not in CSV; field will be empty");
            }
        }

        Ok(LoadedInputs {
            config: GenerationConfig {
                mappings,
                naming_template: self.name.clone(),
                rows: table.rows,
                template_pdf,
                font: None,
                options: BatchOptions::from_env()?,
            },
        })
    }
}

fn read(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("reading {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
