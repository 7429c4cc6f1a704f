//! Output filename templates
//!
//! Templates such as `invoice_{Customer}_{Row_Number}` are resolved per row,
//! each value sanitized into a cross-platform filename fragment, and the
//! final names de-duplicated across a batch.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use formfill_types::{GenerationRow, MappingSet};
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use unicode_normalization::UnicodeNormalization;

use crate::bidi::is_bidi_control;
use crate::error::NamingError;

/// Longest sanitized value, in characters
pub const MAX_COMPONENT_CHARS: usize = 120;

/// Reserved placeholder: 1-based row index
pub const ROW_NUMBER: &str = "Row_Number";
/// Reserved placeholder: batch timestamp
pub const TIMESTAMP: &str = "Timestamp";

const PDF_EXTENSION: &str = ".pdf";
const FALLBACK_STEM: &str = "document";

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"\{([^{}]*)\}").unwrap();
}

/// System values shared by every row of one batch
#[derive(Debug, Clone)]
pub struct NamingContext {
    timestamp: String,
}

impl NamingContext {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            timestamp: format_timestamp(now),
        }
    }

    pub fn now() -> Self {
        Self::new(Utc::now())
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }
}

/// ISO-8601 UTC with milliseconds, made filename-safe (`2024-05-01T12-30-00-000Z`)
fn format_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
        .replace([':', '.'], "-")
}

/// Parsed, validated naming template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingTemplate {
    template: String,
    placeholders: Vec<String>,
}

impl NamingTemplate {
    pub fn parse(template: &str) -> Result<Self, NamingError> {
        let open = template.matches('{').count();
        let close = template.matches('}').count();
        if open != close {
            return Err(NamingError::UnbalancedBraces { open, close });
        }

        let mut placeholders: Vec<String> = Vec::new();
        for caps in PLACEHOLDER.captures_iter(template) {
            let name = caps[1].trim();
            if name.is_empty() {
                return Err(NamingError::EmptyPlaceholder);
            }
            if !placeholders.iter().any(|p| p == name) {
                placeholders.push(name.to_string());
            }
        }

        if placeholders.is_empty() {
            return Err(NamingError::NoPlaceholders);
        }

        Ok(Self {
            template: template.to_string(),
            placeholders,
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Distinct placeholder names in order of first appearance
    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }

    /// Filename for one row (1-based `row_number`), before batch de-duplication
    ///
    /// Placeholders resolve, in order, against a CSV column of that name, a
    /// mapped field of that name (yielding the column value mapped to it),
    /// `Row_Number`, `Timestamp`, and finally `Unknown_<name>`.
    pub fn render(
        &self,
        row_number: usize,
        row: &GenerationRow,
        mappings: &MappingSet,
        ctx: &NamingContext,
    ) -> String {
        let substituted = PLACEHOLDER.replace_all(&self.template, |caps: &Captures| {
            let value = resolve_placeholder(caps[1].trim(), row_number, row, mappings, ctx);
            sanitize_filename_component(&value)
        });

        ensure_pdf_extension(&strip_path_characters(&substituted))
    }

    /// Sample filenames for the first `count` rows, de-duplicated as a batch would be
    pub fn preview(
        &self,
        rows: &[GenerationRow],
        mappings: &MappingSet,
        ctx: &NamingContext,
        count: usize,
    ) -> Vec<String> {
        let mut registry = FilenameRegistry::new();
        rows.iter()
            .take(count)
            .enumerate()
            .map(|(index, row)| registry.claim(&self.render(index + 1, row, mappings, ctx)))
            .collect()
    }
}

fn resolve_placeholder(
    name: &str,
    row_number: usize,
    row: &GenerationRow,
    mappings: &MappingSet,
    ctx: &NamingContext,
) -> String {
    if let Some(value) = row.get(name) {
        return value.to_string();
    }

    if let Some(mapping) = mappings.by_field_name(name) {
        return row.get(&mapping.column_name).unwrap_or_default().to_string();
    }

    match name {
        ROW_NUMBER => row_number.to_string(),
        TIMESTAMP => ctx.timestamp().to_string(),
        _ => format!("Unknown_{}", name),
    }
}

fn is_allowed_filename_char(c: char) -> bool {
    c.is_alphabetic()
        || c.is_numeric()
        || c.is_whitespace()
        // Hebrew geresh and gershayim
        || matches!(c, '.' | '_' | '-' | '\u{05F3}' | '\u{05F4}')
}

/// Reduce an arbitrary value to a safe filename fragment of at most 120 characters
pub fn sanitize_filename_component(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut previous: Option<char> = None;

    for c in value.nfc().filter(|c| !is_bidi_control(*c)) {
        let c = if !is_allowed_filename_char(c) {
            '_'
        } else if c.is_whitespace() {
            ' '
        } else {
            c
        };

        if matches!(c, ' ' | '_') && previous == Some(c) {
            continue;
        }
        out.push(c);
        previous = Some(c);
    }

    let trimmed = out.trim();
    if trimmed.chars().count() <= MAX_COMPONENT_CHARS {
        return trimmed.to_string();
    }

    let truncated: String = trimmed.chars().take(MAX_COMPONENT_CHARS).collect();
    truncated.trim_end().to_string()
}

/// Literal template text may still carry separators; values are already clean
fn strip_path_characters(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() || is_bidi_control(c) => '_',
            c => c,
        })
        .collect()
}

fn ends_with_pdf(name: &str) -> bool {
    name.len() >= PDF_EXTENSION.len()
        && name
            .get(name.len() - PDF_EXTENSION.len()..)
            .is_some_and(|tail| tail.eq_ignore_ascii_case(PDF_EXTENSION))
}

/// Ensure exactly one trailing `.pdf` (case-insensitive)
pub fn ensure_pdf_extension(name: &str) -> String {
    let mut name = name.trim().to_string();

    while ends_with_pdf(&name) && ends_with_pdf(&name[..name.len() - PDF_EXTENSION.len()]) {
        name.truncate(name.len() - PDF_EXTENSION.len());
    }

    if !ends_with_pdf(&name) {
        name.push_str(PDF_EXTENSION);
    }

    if name.len() == PDF_EXTENSION.len() {
        return format!("{}{}", FALLBACK_STEM, PDF_EXTENSION);
    }

    name
}

/// Filenames issued within one batch
#[derive(Debug, Clone, Default)]
pub struct FilenameRegistry {
    issued: HashSet<String>,
    order: Vec<String>,
}

impl FilenameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue `name`, or `name_<n>.ext` with the smallest free counter
    pub fn claim(&mut self, name: &str) -> String {
        let unique = if self.issued.contains(name) {
            let (stem, extension) = split_extension(name);
            (1..)
                .map(|counter| format!("{}_{}{}", stem, counter, extension))
                .find(|candidate| !self.issued.contains(candidate))
                .unwrap_or_else(|| name.to_string())
        } else {
            name.to_string()
        };

        self.issued.insert(unique.clone());
        self.order.push(unique.clone());
        unique
    }

    pub fn contains(&self, name: &str) -> bool {
        self.issued.contains(name)
    }

    pub fn len(&self) -> usize {
        self.issued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issued.is_empty()
    }

    /// Issued names in the order they were claimed
    pub fn into_names(self) -> Vec<String> {
        self.order
    }
}

fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(index) if index > 0 => name.split_at(index),
        _ => (name, ""),
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: sanitized values are bounded and free of separators and controls
        #[test]
        fn sanitized_is_safe(s in any::<String>()) {
            let out = sanitize_filename_component(&s);
            prop_assert!(out.chars().count() <= MAX_COMPONENT_CHARS);
            prop_assert!(!out.contains('/') && !out.contains('\\') && !out.contains('#'));
            prop_assert!(!out.chars().any(|c| c.is_control() || is_bidi_control(c)));
            prop_assert!(!out.contains("__") && !out.contains("  "));
        }

        /// Property: rendered names always end in exactly one `.pdf`
        #[test]
        fn single_pdf_suffix(value in "[a-zA-Z. ]{0,30}(\\.pdf){0,3}") {
            let template = NamingTemplate::parse("{V}").unwrap();
            let row: GenerationRow = [("V", value.as_str())].into_iter().collect();
            let name = template.render(1, &row, &MappingSet::new(), &NamingContext::now());
            prop_assert!(name.to_lowercase().ends_with(".pdf"));
            prop_assert!(!name.to_lowercase().ends_with(".pdf.pdf"));
        }

        /// Property: registry never issues the same name twice
        #[test]
        fn registry_unique(names in prop::collection::vec("[ab]{1,2}\\.pdf", 1..30)) {
            let mut registry = FilenameRegistry::new();
            let issued: Vec<String> = names.iter().map(|n| registry.claim(n)).collect();
            let distinct: HashSet<&String> = issued.iter().collect();
            prop_assert_eq!(distinct.len(), issued.len());
            prop_assert_eq!(registry.len(), names.len());
        }
    }
}
