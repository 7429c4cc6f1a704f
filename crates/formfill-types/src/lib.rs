//! Shared data model for the form filler
//!
//! Plain serde types exchanged between the core engine and its hosts:
//! page geometry, extracted fields, field-to-column mappings and CSV rows.

pub mod fields;
pub mod geometry;
pub mod rows;

pub use fields::{ExtractedField, FieldKind, FieldMapping, MappingSet};
pub use geometry::{FieldRect, GeometryError, PageGeometry, RenderedPreview, Rotation, ScreenRect};
pub use rows::{ColumnDescriptor, ColumnKind, GenerationRow};
