//! Writing row values into a template's form fields

use std::collections::HashMap;

use formfill_types::FieldKind;
use lopdf::{Document, Object, ObjectId};

use crate::bidi::{normalize_field_text, truncate_normalized};
use crate::error::{FillError, PdfError, SkipReason};
use crate::pdf::appearance::{
    install_fonts, retarget_default_appearance, write_text_appearance, EmbeddedFont, FontResources, TextStyle,
};
use crate::pdf::extract::{collect_form_fields, load_document, on_states, FormField};
use crate::pdf::text::encode_text_string;

/// Values that check a checkbox (compared case-insensitively, trimmed)
const TRUTHY: &[&str] = &["true", "yes", "y", "1", "x", "on", "checked", "v", "כן"];

pub fn is_truthy(value: &str) -> bool {
    let value = value.trim().to_lowercase();
    TRUTHY.contains(&value.as_str())
}

/// Terminal form fields by fully qualified name
#[derive(Debug, Clone, Default)]
pub struct FieldIndex {
    by_name: HashMap<String, FormField>,
}

impl FieldIndex {
    pub fn build(doc: &Document) -> Self {
        let mut by_name = HashMap::new();
        for field in collect_form_fields(doc) {
            // First occurrence wins for duplicated names
            by_name.entry(field.name.clone()).or_insert(field);
        }
        Self { by_name }
    }

    pub fn get(&self, name: &str) -> Option<&FormField> {
        self.by_name.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// A parsed template with fonts installed, cloned once per row
///
/// Object ids in the index stay valid in every clone.
#[derive(Debug, Clone)]
pub struct PreparedTemplate {
    document: Document,
    fields: FieldIndex,
    fonts: FontResources,
}

impl PreparedTemplate {
    pub fn prepare(bytes: &[u8], font: Option<&EmbeddedFont>) -> Result<Self, PdfError> {
        let mut document = load_document(bytes)?;
        let fields = FieldIndex::build(&document);
        let fonts = install_fonts(&mut document, font)?;
        Ok(Self {
            document,
            fields,
            fonts,
        })
    }

    pub fn fields(&self) -> &FieldIndex {
        &self.fields
    }

    pub fn fonts(&self) -> &FontResources {
        &self.fonts
    }

    /// A private deep copy for one row
    pub fn instance(&self) -> Document {
        self.document.clone()
    }
}

/// Apply one raw cell value to a field in `doc`
///
/// Text values are bidi-normalized here, exactly once.
pub fn fill_field(
    doc: &mut Document,
    field: &FormField,
    raw_value: &str,
    fonts: &FontResources,
) -> Result<(), FillError> {
    let is_selection = matches!(
        field.kind,
        FieldKind::RadioGroup { .. } | FieldKind::ListBox { .. } | FieldKind::ComboBox { editable: false, .. }
    );
    if is_selection && raw_value.trim().is_empty() {
        // Nothing selected: leave the template's default in place
        return Ok(());
    }

    match &field.kind {
        FieldKind::Text { multiline, max_len } => {
            let normalized = normalize_field_text(raw_value);
            let value = match max_len {
                Some(limit) => truncate_normalized(&normalized, *limit as usize),
                None => normalized,
            };
            write_text_value(doc, field, &value, *multiline, fonts)
        }
        FieldKind::ComboBox { options, editable } => {
            let value = match match_option(options, raw_value) {
                Some(option) => option.to_string(),
                None if *editable || options.is_empty() => normalize_field_text(raw_value),
                None => return Err(option_not_found(raw_value)),
            };
            write_text_value(doc, field, &value, false, fonts)
        }
        FieldKind::ListBox { options } => {
            let value = match match_option(options, raw_value) {
                Some(option) => option.to_string(),
                None if options.is_empty() => normalize_field_text(raw_value),
                None => return Err(option_not_found(raw_value)),
            };
            write_text_value(doc, field, &value, false, fonts)
        }
        FieldKind::Checkbox { on_state } => {
            let checked = is_truthy(raw_value);
            let state = if checked { on_state.as_str() } else { "Off" };
            set_entry(doc, field.id, "V", Object::Name(state.as_bytes().to_vec()))?;
            for widget in &field.widgets {
                let widget_state = if checked {
                    on_states(doc, *widget)
                        .into_iter()
                        .next()
                        .unwrap_or_else(|| on_state.clone())
                } else {
                    "Off".to_string()
                };
                set_entry(doc, *widget, "AS", Object::Name(widget_state.into_bytes()))?;
            }
            Ok(())
        }
        FieldKind::RadioGroup { options } => {
            let option = match_option(options, raw_value)
                .ok_or_else(|| option_not_found(raw_value))?
                .to_string();
            set_entry(doc, field.id, "V", Object::Name(option.as_bytes().to_vec()))?;
            for widget in &field.widgets {
                let state = if on_states(doc, *widget).contains(&option) {
                    option.as_str()
                } else {
                    "Off"
                };
                set_entry(doc, *widget, "AS", Object::Name(state.as_bytes().to_vec()))?;
            }
            Ok(())
        }
        FieldKind::PushButton | FieldKind::Signature => Err(SkipReason::UnsupportedKind {
            kind: field.kind.label().to_string(),
        }
        .into()),
    }
}

fn write_text_value(
    doc: &mut Document,
    field: &FormField,
    value: &str,
    multiline: bool,
    fonts: &FontResources,
) -> Result<(), FillError> {
    if !fonts.can_render(value) {
        return Err(FillError::FontRequired);
    }

    set_entry(doc, field.id, "V", encode_text_string(value))?;
    if fonts.has_embedded() {
        // Viewers regenerating from /DA must pick the font that covers the value
        let da = retarget_default_appearance(field.default_appearance.as_deref(), fonts.resource_name());
        set_entry(doc, field.id, "DA", Object::string_literal(da.clone()))?;
        for widget in field.widgets.iter().filter(|w| **w != field.id) {
            set_entry(doc, *widget, "DA", Object::string_literal(da.clone()))?;
        }
    }

    let style = TextStyle::from_default_appearance(field.default_appearance.as_deref(), field.quadding, multiline);
    for widget in &field.widgets {
        write_text_appearance(doc, *widget, value, &style, fonts)?;
    }
    Ok(())
}

/// Exact match first, then trimmed case-insensitive
fn match_option<'a>(options: &'a [String], value: &str) -> Option<&'a str> {
    if let Some(exact) = options.iter().find(|o| o.as_str() == value) {
        return Some(exact);
    }
    let wanted = value.trim().to_lowercase();
    options
        .iter()
        .find(|o| o.trim().to_lowercase() == wanted)
        .map(String::as_str)
}

fn option_not_found(value: &str) -> FillError {
    SkipReason::OptionNotFound {
        value: value.to_string(),
    }
    .into()
}

fn set_entry(doc: &mut Document, id: ObjectId, key: &str, value: Object) -> Result<(), PdfError> {
    let dict = doc
        .get_object_mut(id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| PdfError::ParseError(format!("object {} {}: {}", id.0, id.1, e)))?;
    dict.set(key, value);
    Ok(())
}
