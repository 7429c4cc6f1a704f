use serde::{Deserialize, Serialize};

use crate::geometry::FieldRect;

/// Kind of an AcroForm field, classified once when the template is inspected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum FieldKind {
    Text {
        multiline: bool,
        max_len: Option<u32>,
    },
    Checkbox {
        /// Appearance state name used when checked (usually `Yes`)
        on_state: String,
    },
    RadioGroup {
        options: Vec<String>,
    },
    ComboBox {
        options: Vec<String>,
        editable: bool,
    },
    ListBox {
        options: Vec<String>,
    },
    PushButton,
    Signature,
}

impl FieldKind {
    /// Whether a CSV value can be written into this kind of field
    pub fn accepts_value(&self) -> bool {
        !matches!(self, FieldKind::PushButton | FieldKind::Signature)
    }

    /// Short lowercase label for logs and listings
    pub fn label(&self) -> &'static str {
        match self {
            FieldKind::Text { .. } => "text",
            FieldKind::Checkbox { .. } => "checkbox",
            FieldKind::RadioGroup { .. } => "radio",
            FieldKind::ComboBox { .. } => "combobox",
            FieldKind::ListBox { .. } => "listbox",
            FieldKind::PushButton => "button",
            FieldKind::Signature => "signature",
        }
    }
}

/// One widget of a form field as found in the template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedField {
    pub field_id: String,
    /// Fully qualified name (`parent.child`)
    pub name: String,
    pub kind: FieldKind,
    pub rect: FieldRect,
    /// Page index (0-indexed)
    pub page_index: u32,
}

impl ExtractedField {
    /// Page number (1-indexed)
    pub fn page_number(&self) -> u32 {
        self.page_index + 1
    }
}

/// Link between one PDF field and one CSV column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    /// Falls back to the field name when omitted
    #[serde(default)]
    pub field_id: String,
    #[serde(default)]
    pub column_id: String,
    pub field_name: String,
    pub column_name: String,
}

impl FieldMapping {
    /// Mapping where ids and names coincide, as when loaded from a name-to-name table
    pub fn by_name(field_name: &str, column_name: &str) -> Self {
        Self {
            field_id: field_name.to_string(),
            column_id: column_name.to_string(),
            field_name: field_name.to_string(),
            column_name: column_name.to_string(),
        }
    }
}

/// Canonical mapping list: at most one mapping per field id
///
/// Deserializing a list goes through [`MappingSet::assign`], so a repeated
/// field id keeps the last mapping in the position of the first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<FieldMapping>", into = "Vec<FieldMapping>")]
pub struct MappingSet {
    mappings: Vec<FieldMapping>,
}

impl MappingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a field to a column, replacing any existing mapping for that field in place
    pub fn assign(&mut self, mapping: FieldMapping) {
        match self
            .mappings
            .iter_mut()
            .find(|m| m.field_id == mapping.field_id)
        {
            Some(existing) => *existing = mapping,
            None => self.mappings.push(mapping),
        }
    }

    /// Remove the mapping for a field, returning it if present
    pub fn remove(&mut self, field_id: &str) -> Option<FieldMapping> {
        let index = self.mappings.iter().position(|m| m.field_id == field_id)?;
        Some(self.mappings.remove(index))
    }

    pub fn get(&self, field_id: &str) -> Option<&FieldMapping> {
        self.mappings.iter().find(|m| m.field_id == field_id)
    }

    /// First mapping targeting a field with this name
    pub fn by_field_name(&self, field_name: &str) -> Option<&FieldMapping> {
        self.mappings.iter().find(|m| m.field_name == field_name)
    }

    /// All fields fed by one column
    pub fn for_column(&self, column_name: &str) -> Vec<&FieldMapping> {
        self.mappings
            .iter()
            .filter(|m| m.column_name == column_name)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldMapping> {
        self.mappings.iter()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn clear(&mut self) {
        self.mappings.clear();
    }
}

impl FromIterator<FieldMapping> for MappingSet {
    fn from_iter<I: IntoIterator<Item = FieldMapping>>(iter: I) -> Self {
        let mut set = MappingSet::new();
        for mapping in iter {
            set.assign(mapping);
        }
        set
    }
}

impl From<Vec<FieldMapping>> for MappingSet {
    fn from(mappings: Vec<FieldMapping>) -> Self {
        mappings.into_iter().collect()
    }
}

impl From<MappingSet> for Vec<FieldMapping> {
    fn from(set: MappingSet) -> Self {
        set.mappings
    }
}
