//! Mapping file formats accepted on the command line

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use formfill_types::{FieldMapping, MappingSet};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(untagged)]
enum MappingFile {
    /// Full mapping records, as produced by a mapping UI
    List(Vec<FieldMapping>),
    /// Shorthand `{"field name": "column name"}`
    Object(BTreeMap<String, String>),
}

pub fn parse_mappings(json: &str) -> Result<MappingSet> {
    let file: MappingFile = serde_json::from_str(json)
        .context("mapping file must be a list of mappings or a {\"field\": \"column\"} object")?;

    let mappings = match file {
        MappingFile::List(list) => list
            .into_iter()
            .map(|mut mapping| {
                if mapping.field_id.is_empty() {
                    mapping.field_id = mapping.field_name.clone();
                }
                if mapping.column_id.is_empty() {
                    mapping.column_id = mapping.column_name.clone();
                }
                mapping
            })
            .collect(),
        MappingFile::Object(pairs) => pairs
            .iter()
            .map(|(field, column)| FieldMapping::by_name(field, column))
            .collect(),
    };
    Ok(mappings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_object_shorthand() {
        let set = parse_mappings(r#"{"customer": "Customer", "amount": "Total"}"#).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.by_field_name("amount").unwrap().column_name, "Total");
    }

    #[test]
    fn test_full_records() {
        let json = r#"[
            {"fieldId": "12-0", "columnId": "c1", "fieldName": "customer", "columnName": "Customer"}
        ]"#;
        let set = parse_mappings(json).unwrap();
        let mapping = set.by_field_name("customer").unwrap();
        assert_eq!(mapping.field_id, "12-0");
        assert_eq!(mapping.column_id, "c1");
    }

    #[test]
    fn test_rejects_other_shapes() {
        assert!(parse_mappings("42").is_err());
        assert!(parse_mappings(r#"{"customer": 1}"#).is_err());
    }
}
