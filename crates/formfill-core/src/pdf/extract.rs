//! Template inspection: page boxes, rotation and AcroForm fields

use std::collections::{HashMap, HashSet};

use formfill_types::{ExtractedField, FieldKind, FieldRect, PageGeometry};
use lopdf::{Dictionary, Document, Object, ObjectId};
use serde::Serialize;

use crate::error::PdfError;
use crate::pdf::text::decode_text_string;

/// Maximum depth for `/Parent` and `/Kids` traversal
const MAX_TREE_DEPTH: usize = 32;

/// US Letter, used when no page box is found anywhere in the tree
const DEFAULT_PAGE_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

// Field flag bits (`/Ff`), 1-based in the PDF reference
const FF_MULTILINE: i64 = 1 << 12;
const FF_RADIO: i64 = 1 << 15;
const FF_PUSHBUTTON: i64 = 1 << 16;
const FF_COMBO: i64 = 1 << 17;
const FF_EDIT: i64 = 1 << 18;

/// Everything a mapping UI needs to know about a template
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateInfo {
    pub page_count: u32,
    pub pages: Vec<PageGeometry>,
    pub fields: Vec<ExtractedField>,
}

impl TemplateInfo {
    /// Geometry of the page a field sits on
    pub fn page_for(&self, field: &ExtractedField) -> Option<&PageGeometry> {
        self.pages.get(field.page_index as usize)
    }
}

/// A terminal AcroForm field with its widget annotations
#[derive(Debug, Clone)]
pub struct FormField {
    pub id: ObjectId,
    /// Fully qualified name (`parent.child`)
    pub name: String,
    pub kind: FieldKind,
    pub widgets: Vec<ObjectId>,
    /// Inherited `/DA` default appearance string
    pub default_appearance: Option<String>,
    /// Inherited `/Q` quadding (0 left, 1 center, 2 right)
    pub quadding: i64,
}

pub fn load_document(bytes: &[u8]) -> Result<Document, PdfError> {
    Document::load_mem(bytes).map_err(|e| PdfError::ParseError(e.to_string()))
}

/// Parse PDF bytes and describe pages and fields
pub fn inspect_template(bytes: &[u8]) -> Result<TemplateInfo, PdfError> {
    let doc = load_document(bytes)?;
    inspect_document(&doc)
}

pub fn inspect_document(doc: &Document) -> Result<TemplateInfo, PdfError> {
    let pages = page_geometries(doc)?;
    let page_index = page_index_by_id(doc);
    let annot_pages = widget_pages(doc, &page_index);

    let mut fields = Vec::new();
    for field in collect_form_fields(doc) {
        for (n, widget_id) in field.widgets.iter().enumerate() {
            let Ok(widget) = doc.get_dictionary(*widget_id) else {
                continue;
            };

            let rect = widget
                .get(b"Rect")
                .ok()
                .and_then(|obj| parse_box(doc, obj))
                .map(FieldRect::from_corners)
                .unwrap_or_default();

            let page_index = widget
                .get(b"P")
                .and_then(Object::as_reference)
                .ok()
                .and_then(|page_id| page_index.get(&page_id).copied())
                .or_else(|| annot_pages.get(widget_id).copied())
                .unwrap_or(0);

            let field_id = if n == 0 {
                format!("{}-{}", field.id.0, field.id.1)
            } else {
                format!("{}-{}#{}", field.id.0, field.id.1, n)
            };

            fields.push(ExtractedField {
                field_id,
                name: field.name.clone(),
                kind: field.kind.clone(),
                rect,
                page_index,
            });
        }
    }

    Ok(TemplateInfo {
        page_count: pages.len() as u32,
        pages,
        fields,
    })
}

/// Visible box and rotation of every page, in page order
pub fn page_geometries(doc: &Document) -> Result<Vec<PageGeometry>, PdfError> {
    doc.get_pages()
        .iter()
        .map(|(&page_num, &page_id)| page_geometry(doc, page_num, page_id))
        .collect()
}

/// CropBox (falling back to MediaBox) and `/Rotate`, both inheritable
pub fn page_geometry(
    doc: &Document,
    page_num: u32,
    page_id: ObjectId,
) -> Result<PageGeometry, PdfError> {
    let page_dict = doc
        .get_dictionary(page_id)
        .map_err(|e| PdfError::InvalidPage {
            page: page_num,
            message: e.to_string(),
        })?;

    let pdf_box = page_attribute(doc, page_dict, b"CropBox")
        .and_then(|obj| parse_box(doc, obj))
        .or_else(|| page_attribute(doc, page_dict, b"MediaBox").and_then(|obj| parse_box(doc, obj)))
        .unwrap_or(DEFAULT_PAGE_BOX);

    let rotate = page_attribute(doc, page_dict, b"Rotate")
        .and_then(|obj| as_number(resolve(doc, obj)))
        .map(|angle| angle as i64)
        .unwrap_or(0);

    Ok(PageGeometry::from_pdf_box(page_num, rotate, pdf_box)?)
}

/// Walk `/AcroForm /Fields` and return every terminal field
pub fn collect_form_fields(doc: &Document) -> Vec<FormField> {
    let Some(acroform) = acroform(doc) else {
        return Vec::new();
    };

    let inherited = Inherited {
        field_type: None,
        flags: 0,
        default_appearance: acroform
            .get(b"DA")
            .ok()
            .and_then(|obj| resolve(doc, obj).as_str().ok())
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned()),
        quadding: acroform
            .get(b"Q")
            .ok()
            .and_then(|obj| resolve(doc, obj).as_i64().ok())
            .unwrap_or(0),
    };

    let roots = acroform
        .get(b"Fields")
        .ok()
        .and_then(|obj| resolve(doc, obj).as_array().ok())
        .cloned()
        .unwrap_or_default();

    let mut out = Vec::new();
    let mut visited = HashSet::new();
    for root in roots {
        if let Ok(id) = root.as_reference() {
            visit_field(doc, id, "", &inherited, 0, &mut visited, &mut out);
        }
    }
    out
}

/// The catalog's `/AcroForm` dictionary, if any
pub fn acroform(doc: &Document) -> Option<&Dictionary> {
    let catalog = doc.catalog().ok()?;
    let obj = catalog.get(b"AcroForm").ok()?;
    resolve(doc, obj).as_dict().ok()
}

/// Attributes a field inherits from its ancestors
#[derive(Debug, Clone)]
struct Inherited {
    field_type: Option<Vec<u8>>,
    flags: i64,
    default_appearance: Option<String>,
    quadding: i64,
}

fn visit_field(
    doc: &Document,
    id: ObjectId,
    parent_name: &str,
    parent: &Inherited,
    depth: usize,
    visited: &mut HashSet<ObjectId>,
    out: &mut Vec<FormField>,
) {
    if depth > MAX_TREE_DEPTH || !visited.insert(id) {
        return;
    }
    let Ok(dict) = doc.get_dictionary(id) else {
        return;
    };

    let partial = dict
        .get(b"T")
        .ok()
        .and_then(|obj| resolve(doc, obj).as_str().ok())
        .map(decode_text_string);
    let name = match (&partial, parent_name.is_empty()) {
        (Some(partial), true) => partial.clone(),
        (Some(partial), false) => format!("{}.{}", parent_name, partial),
        (None, _) => parent_name.to_string(),
    };

    let inherited = Inherited {
        field_type: dict
            .get(b"FT")
            .ok()
            .and_then(|obj| resolve(doc, obj).as_name().ok())
            .map(<[u8]>::to_vec)
            .or_else(|| parent.field_type.clone()),
        flags: dict
            .get(b"Ff")
            .ok()
            .and_then(|obj| resolve(doc, obj).as_i64().ok())
            .unwrap_or(parent.flags),
        default_appearance: dict
            .get(b"DA")
            .ok()
            .and_then(|obj| resolve(doc, obj).as_str().ok())
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .or_else(|| parent.default_appearance.clone()),
        quadding: dict
            .get(b"Q")
            .ok()
            .and_then(|obj| resolve(doc, obj).as_i64().ok())
            .unwrap_or(parent.quadding),
    };

    let kids: Vec<ObjectId> = dict
        .get(b"Kids")
        .ok()
        .and_then(|obj| resolve(doc, obj).as_array().ok())
        .map(|kids| kids.iter().filter_map(|k| k.as_reference().ok()).collect())
        .unwrap_or_default();

    // Kids carrying their own /T are child fields; kids without it are widgets
    let has_child_fields = kids.iter().any(|kid| {
        doc.get_dictionary(*kid)
            .map(|d| d.has(b"T"))
            .unwrap_or(false)
    });

    if has_child_fields {
        for kid in kids {
            visit_field(doc, kid, &name, &inherited, depth + 1, visited, out);
        }
        return;
    }

    if name.is_empty() {
        return;
    }

    let widgets = if kids.is_empty() { vec![id] } else { kids };
    let kind = classify(doc, dict, &inherited, &widgets);

    out.push(FormField {
        id,
        name,
        kind,
        widgets,
        default_appearance: inherited.default_appearance,
        quadding: inherited.quadding,
    });
}

fn classify(doc: &Document, dict: &Dictionary, inherited: &Inherited, widgets: &[ObjectId]) -> FieldKind {
    let flags = inherited.flags;
    match inherited.field_type.as_deref() {
        Some(b"Btn") if flags & FF_PUSHBUTTON != 0 => FieldKind::PushButton,
        Some(b"Btn") if flags & FF_RADIO != 0 => FieldKind::RadioGroup {
            options: widgets
                .iter()
                .flat_map(|w| on_states(doc, *w))
                .fold(Vec::new(), |mut acc, state| {
                    if !acc.contains(&state) {
                        acc.push(state);
                    }
                    acc
                }),
        },
        Some(b"Btn") => FieldKind::Checkbox {
            on_state: widgets
                .iter()
                .find_map(|w| on_states(doc, *w).into_iter().next())
                .unwrap_or_else(|| "Yes".to_string()),
        },
        Some(b"Ch") if flags & FF_COMBO != 0 => FieldKind::ComboBox {
            options: choice_options(doc, dict),
            editable: flags & FF_EDIT != 0,
        },
        Some(b"Ch") => FieldKind::ListBox {
            options: choice_options(doc, dict),
        },
        Some(b"Sig") => FieldKind::Signature,
        _ => FieldKind::Text {
            multiline: flags & FF_MULTILINE != 0,
            max_len: dict
                .get(b"MaxLen")
                .ok()
                .and_then(|obj| resolve(doc, obj).as_i64().ok())
                .and_then(|n| u32::try_from(n).ok()),
        },
    }
}

/// Appearance state names other than `Off` in a widget's `/AP /N`
pub fn on_states(doc: &Document, widget_id: ObjectId) -> Vec<String> {
    let Ok(widget) = doc.get_dictionary(widget_id) else {
        return Vec::new();
    };
    widget
        .get(b"AP")
        .ok()
        .and_then(|ap| resolve(doc, ap).as_dict().ok())
        .and_then(|ap| ap.get(b"N").ok())
        .and_then(|normal| resolve(doc, normal).as_dict().ok())
        .map(|normal| {
            normal
                .iter()
                .map(|(key, _)| String::from_utf8_lossy(key).into_owned())
                .filter(|state| state != "Off")
                .collect()
        })
        .unwrap_or_default()
}

/// Export values of a choice field's `/Opt` (plain strings or `[export display]` pairs)
fn choice_options(doc: &Document, dict: &Dictionary) -> Vec<String> {
    let Some(options) = dict
        .get(b"Opt")
        .ok()
        .and_then(|obj| resolve(doc, obj).as_array().ok())
    else {
        return Vec::new();
    };

    options
        .iter()
        .filter_map(|opt| match resolve(doc, opt) {
            Object::String(bytes, _) => Some(decode_text_string(bytes)),
            Object::Array(pair) => pair.first().and_then(|first| match resolve(doc, first) {
                Object::String(bytes, _) => Some(decode_text_string(bytes)),
                _ => None,
            }),
            _ => None,
        })
        .collect()
}

/// Look up a page attribute on the page or its ancestors
fn page_attribute<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    let mut current = dict;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(value);
        }
        let parent_id = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = doc.get_dictionary(parent_id).ok()?;
    }
    None
}

/// Follow indirect references (bounded)
pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    let mut current = obj;
    for _ in 0..MAX_TREE_DEPTH {
        match current {
            Object::Reference(id) => match doc.get_object(*id) {
                Ok(target) => current = target,
                Err(_) => return current,
            },
            _ => return current,
        }
    }
    current
}

pub(crate) fn as_number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(n) => Some(*n as f64),
        Object::Real(n) => Some(*n as f64),
        _ => None,
    }
}

/// Parse a box or rect array `[x1 y1 x2 y2]`
pub(crate) fn parse_box(doc: &Document, obj: &Object) -> Option<[f64; 4]> {
    let array = resolve(doc, obj).as_array().ok()?;
    if array.len() != 4 {
        return None;
    }

    let mut result = [0.0; 4];
    for (i, item) in array.iter().enumerate() {
        result[i] = as_number(resolve(doc, item))?;
    }
    Some(result)
}

fn page_index_by_id(doc: &Document) -> HashMap<ObjectId, u32> {
    doc.get_pages()
        .iter()
        .map(|(&page_num, &page_id)| (page_id, page_num - 1))
        .collect()
}

/// Page index of every annotation listed in a page's `/Annots`
fn widget_pages(doc: &Document, page_index: &HashMap<ObjectId, u32>) -> HashMap<ObjectId, u32> {
    let mut result = HashMap::new();
    for (page_id, index) in page_index {
        let Ok(page) = doc.get_dictionary(*page_id) else {
            continue;
        };
        let Some(annots) = page
            .get(b"Annots")
            .ok()
            .and_then(|obj| resolve(doc, obj).as_array().ok())
        else {
            continue;
        };
        for annot in annots {
            if let Ok(annot_id) = annot.as_reference() {
                result.insert(annot_id, *index);
            }
        }
    }
    result
}
