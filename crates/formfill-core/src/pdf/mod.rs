//! AcroForm templates: inspection, filling and appearance generation

pub mod appearance;
pub mod extract;
pub mod fill;
pub mod text;

pub use appearance::{EmbeddedFont, FontResources};
pub use extract::{inspect_template, FormField, TemplateInfo};
pub use fill::{fill_field, FieldIndex, PreparedTemplate};
