//! Font resources and `/AP /N` appearance streams for filled widgets

use std::collections::BTreeMap;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use ttf_parser::{name_id, Face, GlyphId};

use crate::bidi::{contains_hebrew, strip_bidi_controls, visual_order};
use crate::error::{FillError, PdfError};
use crate::pdf::extract::{parse_box, resolve};
use crate::pdf::text::{helvetica_width, to_winansi_bytes};

/// `/DR` resource name of the standard Helvetica font
pub const HELVETICA_RESOURCE: &str = "Helv";
/// `/DR` resource name of the configured TrueType font
pub const EMBEDDED_RESOURCE: &str = "FormFillUni";

const AUTO_SIZE_MIN: f64 = 4.0;
const AUTO_SIZE_MAX: f64 = 12.0;
const AUTO_SIZE_RATIO: f64 = 0.7;
const PADDING: f64 = 2.0;
const LINE_SPACING: f64 = 1.15;

/// A validated TrueType font with the metrics needed for embedding
#[derive(Debug, Clone)]
pub struct EmbeddedFont {
    data: Vec<u8>,
    base_font: String,
    units_per_em: f64,
    ascender: i16,
    descender: i16,
    cap_height: i16,
    bbox: [i16; 4],
    /// Advance widths in 1000-unit glyph space, indexed by glyph id
    widths: Vec<f64>,
}

impl EmbeddedFont {
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, PdfError> {
        let face = Face::parse(&data, 0).map_err(|e| PdfError::Font(e.to_string()))?;

        let units_per_em = face.units_per_em() as f64;
        if units_per_em <= 0.0 {
            return Err(PdfError::Font("font reports zero units per em".into()));
        }

        let base_font = face
            .names()
            .into_iter()
            .filter(|name| name.name_id == name_id::POST_SCRIPT_NAME)
            .find_map(|name| name.to_string())
            .map(|name| sanitize_font_name(&name))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "FormFillEmbedded".to_string());

        let bbox = face.global_bounding_box();
        let widths = (0..face.number_of_glyphs())
            .map(|gid| {
                face.glyph_hor_advance(GlyphId(gid))
                    .map(|adv| adv as f64 * 1000.0 / units_per_em)
                    .unwrap_or(0.0)
            })
            .collect();

        let ascender = face.ascender();
        let descender = face.descender();
        let cap_height = face.capital_height().unwrap_or(ascender);
        drop(face);

        Ok(Self {
            base_font,
            units_per_em,
            ascender,
            descender,
            cap_height,
            bbox: [bbox.x_min, bbox.y_min, bbox.x_max, bbox.y_max],
            widths,
            data,
        })
    }

    pub fn base_font(&self) -> &str {
        &self.base_font
    }

    pub fn glyph_count(&self) -> usize {
        self.widths.len()
    }

    fn scale(&self, units: i16) -> i64 {
        (units as f64 * 1000.0 / self.units_per_em).round() as i64
    }

    /// Two-byte glyph ids for Identity-H plus the advance in 1000-unit space
    ///
    /// Characters missing from the font are drawn as `.notdef`.
    fn encode(&self, text: &str) -> Option<EncodedText> {
        let face = Face::parse(&self.data, 0).ok()?;
        let mut bytes = Vec::with_capacity(text.len() * 2);
        let mut width = 0.0;
        for c in text.chars() {
            let gid = face.glyph_index(c).unwrap_or_else(|| {
                tracing::debug!(character = %c, font = %self.base_font, "Glyph missing, using .notdef");
                GlyphId(0)
            });
            bytes.extend_from_slice(&gid.0.to_be_bytes());
            width += self.widths.get(gid.0 as usize).copied().unwrap_or(0.0);
        }
        Some(EncodedText {
            bytes,
            width,
            format: StringFormat::Hexadecimal,
        })
    }

    /// `bfchar` entries mapping glyph ids back to Unicode, for text extraction
    fn to_unicode_cmap(&self) -> Vec<u8> {
        let mut reverse: BTreeMap<u16, u32> = BTreeMap::new();
        if let Ok(face) = Face::parse(&self.data, 0) {
            if let Some(cmap) = face.tables().cmap {
                for subtable in cmap.subtables {
                    if !subtable.is_unicode() {
                        continue;
                    }
                    subtable.codepoints(|cp| {
                        if cp > 0xFFFF {
                            return;
                        }
                        if let Some(gid) = subtable.glyph_index(cp) {
                            reverse.entry(gid.0).or_insert(cp);
                        }
                    });
                }
            }
        }

        let mut cmap = String::from(
            "/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n\
             /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
             /CMapName /Adobe-Identity-UCS def\n/CMapType 2 def\n\
             1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n",
        );
        let entries: Vec<(u16, u32)> = reverse.into_iter().collect();
        for chunk in entries.chunks(100) {
            cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
            for (gid, cp) in chunk {
                cmap.push_str(&format!("<{:04X}> <{:04X}>\n", gid, cp));
            }
            cmap.push_str("endbfchar\n");
        }
        cmap.push_str("endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n");
        cmap.into_bytes()
    }
}

fn sanitize_font_name(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}

/// Encoded string operand for `Tj`
#[derive(Debug, Clone)]
struct EncodedText {
    bytes: Vec<u8>,
    /// Advance in 1000-unit glyph space
    width: f64,
    format: StringFormat,
}

impl EncodedText {
    fn width_at(&self, size: f64) -> f64 {
        self.width * size / 1000.0
    }
}

/// Font objects installed in a template, shared by every row clone
#[derive(Debug, Clone)]
pub struct FontResources {
    helvetica: ObjectId,
    embedded: Option<(ObjectId, EmbeddedFont)>,
}

impl FontResources {
    pub fn has_embedded(&self) -> bool {
        self.embedded.is_some()
    }

    /// `/DR` name of the font used for appearances
    pub fn resource_name(&self) -> &'static str {
        self.resource().0
    }

    fn resource(&self) -> (&'static str, ObjectId) {
        match &self.embedded {
            Some((id, _)) => (EMBEDDED_RESOURCE, *id),
            None => (HELVETICA_RESOURCE, self.helvetica),
        }
    }

    /// Encode display text with the active font; `None` when Helvetica cannot draw it
    fn encode(&self, text: &str) -> Option<EncodedText> {
        match &self.embedded {
            Some((_, font)) => font.encode(text),
            None => to_winansi_bytes(text).map(|bytes| EncodedText {
                width: bytes.iter().map(|b| helvetica_width(*b)).sum(),
                bytes,
                format: StringFormat::Literal,
            }),
        }
    }

    /// Whether `value` can be drawn with the installed fonts
    pub fn can_render(&self, value: &str) -> bool {
        self.embedded.is_some() || to_winansi_bytes(&strip_bidi_controls(value)).is_some()
    }
}

/// Add Helvetica (and the configured font) to the document and its AcroForm `/DR`
///
/// Also sets `/NeedAppearances true` so viewers may refresh what we draw.
pub fn install_fonts(doc: &mut Document, font: Option<&EmbeddedFont>) -> Result<FontResources, PdfError> {
    let helvetica = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
        ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
    ]));

    let embedded = font.map(|font| (embed_font(doc, font), font.clone()));

    let mut font_entries = vec![(HELVETICA_RESOURCE, helvetica)];
    if let Some((id, _)) = &embedded {
        font_entries.push((EMBEDDED_RESOURCE, *id));
    }
    let default_font = if embedded.is_some() {
        EMBEDDED_RESOURCE
    } else {
        HELVETICA_RESOURCE
    };
    register_in_acroform(doc, &font_entries, default_font)?;

    Ok(FontResources { helvetica, embedded })
}

fn embed_font(doc: &mut Document, font: &EmbeddedFont) -> ObjectId {
    let font_file = Stream::new(
        Dictionary::from_iter(vec![("Length1", Object::Integer(font.data.len() as i64))]),
        font.data.clone(),
    );
    let font_file_id = doc.add_object(font_file);

    let base_font = Object::Name(font.base_font.clone().into_bytes());
    let descriptor_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"FontDescriptor".to_vec())),
        ("FontName", base_font.clone()),
        ("Flags", Object::Integer(4)),
        (
            "FontBBox",
            Object::Array(font.bbox.iter().map(|v| Object::Integer(font.scale(*v))).collect()),
        ),
        ("ItalicAngle", Object::Integer(0)),
        ("Ascent", Object::Integer(font.scale(font.ascender))),
        ("Descent", Object::Integer(font.scale(font.descender))),
        ("CapHeight", Object::Integer(font.scale(font.cap_height))),
        ("StemV", Object::Integer(80)),
        ("FontFile2", Object::Reference(font_file_id)),
    ]));

    let widths = Object::Array(
        font.widths
            .iter()
            .map(|w| Object::Integer(w.round() as i64))
            .collect(),
    );
    let cid_font_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"CIDFontType2".to_vec())),
        ("BaseFont", base_font.clone()),
        (
            "CIDSystemInfo",
            Object::Dictionary(Dictionary::from_iter(vec![
                ("Registry", Object::string_literal("Adobe")),
                ("Ordering", Object::string_literal("Identity")),
                ("Supplement", Object::Integer(0)),
            ])),
        ),
        ("FontDescriptor", Object::Reference(descriptor_id)),
        ("W", Object::Array(vec![Object::Integer(0), widths])),
        ("CIDToGIDMap", Object::Name(b"Identity".to_vec())),
    ]));

    let to_unicode_id = doc.add_object(Stream::new(Dictionary::new(), font.to_unicode_cmap()));

    doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type0".to_vec())),
        ("BaseFont", base_font),
        ("Encoding", Object::Name(b"Identity-H".to_vec())),
        ("DescendantFonts", Object::Array(vec![Object::Reference(cid_font_id)])),
        ("ToUnicode", Object::Reference(to_unicode_id)),
    ]))
}

/// Rebuild the AcroForm `/DR` inline with our fonts added to any existing ones
fn register_in_acroform(
    doc: &mut Document,
    fonts: &[(&str, ObjectId)],
    default_font: &str,
) -> Result<(), PdfError> {
    let acroform_obj = doc
        .catalog()
        .map_err(|e| PdfError::ParseError(e.to_string()))?
        .get(b"AcroForm")
        .ok()
        .cloned();

    let Some(acroform_obj) = acroform_obj else {
        return Ok(());
    };

    let existing = resolve(doc, &acroform_obj)
        .as_dict()
        .map_err(|e| PdfError::ParseError(format!("AcroForm is not a dictionary: {}", e)))?;

    let mut resources = existing
        .get(b"DR")
        .ok()
        .and_then(|dr| resolve(doc, dr).as_dict().ok())
        .cloned()
        .unwrap_or_default();
    let mut font_dict = resources
        .get(b"Font")
        .ok()
        .and_then(|f| resolve(doc, f).as_dict().ok())
        .cloned()
        .unwrap_or_default();
    for (name, id) in fonts {
        font_dict.set(*name, Object::Reference(*id));
    }
    resources.set("Font", Object::Dictionary(font_dict));
    let existing_da = existing
        .get(b"DA")
        .ok()
        .and_then(|da| resolve(doc, da).as_str().ok())
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned());
    let default_da = match existing_da {
        Some(da) if default_font == HELVETICA_RESOURCE => da,
        other => retarget_default_appearance(other.as_deref(), default_font),
    };

    let acroform = match acroform_obj {
        Object::Reference(id) => doc
            .get_object_mut(id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| PdfError::ParseError(e.to_string()))?,
        _ => doc
            .catalog_mut()
            .and_then(|catalog| catalog.get_mut(b"AcroForm"))
            .and_then(Object::as_dict_mut)
            .map_err(|e| PdfError::ParseError(e.to_string()))?,
    };
    acroform.set("DR", Object::Dictionary(resources));
    acroform.set("NeedAppearances", Object::Boolean(true));
    acroform.set("DA", Object::string_literal(default_da));
    Ok(())
}

/// Point a default appearance string at another `/DR` font, keeping size and colour
///
/// A missing or font-less string gets an auto-sized `Tf` in black.
pub fn retarget_default_appearance(da: Option<&str>, resource: &str) -> String {
    let mut tokens: Vec<String> = da
        .unwrap_or_default()
        .split_whitespace()
        .map(str::to_string)
        .collect();
    match tokens.iter().position(|t| t == "Tf") {
        Some(tf) if tf >= 2 && tokens[tf - 2].starts_with('/') => {
            tokens[tf - 2] = format!("/{}", resource);
            tokens.join(" ")
        }
        _ => {
            let colour = if tokens.is_empty() {
                "0 g".to_string()
            } else {
                tokens.join(" ")
            };
            format!("/{} 0 Tf {}", resource, colour)
        }
    }
}

/// How a text or choice value is laid out in its widget
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    /// Explicit size from `/DA`; `0` means auto
    pub font_size: f64,
    /// `/Q`: 0 left, 1 center, 2 right
    pub quadding: i64,
    pub multiline: bool,
}

impl TextStyle {
    pub fn from_default_appearance(da: Option<&str>, quadding: i64, multiline: bool) -> Self {
        Self {
            font_size: da.and_then(da_font_size).unwrap_or(0.0),
            quadding,
            multiline,
        }
    }
}

/// The operand before `Tf` in a default appearance string
pub fn da_font_size(da: &str) -> Option<f64> {
    let tokens: Vec<&str> = da.split_whitespace().collect();
    let tf = tokens.iter().position(|t| *t == "Tf")?;
    tokens.get(tf.checked_sub(1)?)?.parse().ok()
}

/// Draw `value` into a fresh `/AP /N` stream on the widget
pub fn write_text_appearance(
    doc: &mut Document,
    widget_id: ObjectId,
    value: &str,
    style: &TextStyle,
    fonts: &FontResources,
) -> Result<(), FillError> {
    let rect = doc
        .get_dictionary(widget_id)
        .ok()
        .and_then(|widget| widget.get(b"Rect").ok())
        .and_then(|obj| parse_box(doc, obj));
    let Some([x1, y1, x2, y2]) = rect else {
        return Ok(());
    };
    let (width, height) = ((x2 - x1).abs(), (y2 - y1).abs());
    if width <= 0.0 || height <= 0.0 {
        return Ok(());
    }

    let logical = strip_bidi_controls(value);
    let size = font_size(style, height, width, &logical, fonts)?;
    let lines = if style.multiline {
        wrap_lines(&logical, width - 2.0 * PADDING, size, fonts)?
    } else {
        vec![logical.replace(['\r', '\n'], " ")]
    };

    let quadding = if style.quadding == 0 && contains_hebrew(&logical) {
        2
    } else {
        style.quadding
    };

    let (resource, font_id) = fonts.resource();
    let mut operations = vec![
        Operation::new("BMC", vec![Object::Name(b"Tx".to_vec())]),
        Operation::new("q", vec![]),
        Operation::new(
            "re",
            vec![
                real(1.0),
                real(1.0),
                real((width - 2.0).max(0.0)),
                real((height - 2.0).max(0.0)),
            ],
        ),
        Operation::new("W", vec![]),
        Operation::new("n", vec![]),
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![Object::Name(resource.as_bytes().to_vec()), real(size)]),
        Operation::new("g", vec![real(0.0)]),
    ];

    let mut baseline = if style.multiline {
        height - PADDING - size
    } else {
        (height - size) / 2.0 + size * 0.22
    };
    for line in &lines {
        if baseline < 0.0 {
            break;
        }
        let encoded = fonts
            .encode(&visual_order(line))
            .ok_or(FillError::FontRequired)?;
        let line_width = encoded.width_at(size);
        let x = match quadding {
            1 => (width - line_width) / 2.0,
            2 => width - PADDING - line_width,
            _ => PADDING,
        };
        operations.push(Operation::new(
            "Tm",
            vec![real(1.0), real(0.0), real(0.0), real(1.0), real(x), real(baseline)],
        ));
        operations.push(Operation::new(
            "Tj",
            vec![Object::String(encoded.bytes, encoded.format)],
        ));
        baseline -= size * LINE_SPACING;
    }
    operations.extend([
        Operation::new("ET", vec![]),
        Operation::new("Q", vec![]),
        Operation::new("EMC", vec![]),
    ]);

    let content = Content { operations }
        .encode()
        .map_err(|e| PdfError::SerializationError(e.to_string()))?;

    let stream = Stream::new(
        Dictionary::from_iter(vec![
            ("Type", Object::Name(b"XObject".to_vec())),
            ("Subtype", Object::Name(b"Form".to_vec())),
            (
                "BBox",
                Object::Array(vec![real(0.0), real(0.0), real(width), real(height)]),
            ),
            (
                "Resources",
                Object::Dictionary(Dictionary::from_iter(vec![(
                    "Font",
                    Object::Dictionary(Dictionary::from_iter(vec![(
                        resource,
                        Object::Reference(font_id),
                    )])),
                )])),
            ),
        ]),
        content,
    );
    let stream_id = doc.add_object(stream);

    let widget = doc
        .get_object_mut(widget_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| PdfError::ParseError(e.to_string()))?;
    widget.set(
        "AP",
        Object::Dictionary(Dictionary::from_iter(vec![("N", Object::Reference(stream_id))])),
    );
    Ok(())
}

fn real(value: f64) -> Object {
    Object::Real(value as f32)
}

fn font_size(
    style: &TextStyle,
    height: f64,
    width: f64,
    text: &str,
    fonts: &FontResources,
) -> Result<f64, FillError> {
    if style.font_size > 0.0 {
        return Ok(style.font_size);
    }

    let by_height = (height * AUTO_SIZE_RATIO).clamp(AUTO_SIZE_MIN, AUTO_SIZE_MAX);
    if style.multiline {
        return Ok(by_height);
    }

    let encoded = fonts.encode(text).ok_or(FillError::FontRequired)?;
    let available = width - 2.0 * PADDING;
    if encoded.width <= 0.0 || available <= 0.0 {
        return Ok(by_height);
    }
    let by_width = available * 1000.0 / encoded.width;
    Ok(by_height.min(by_width).max(AUTO_SIZE_MIN))
}

/// Greedy word wrap in logical order; explicit newlines always break
fn wrap_lines(text: &str, max_width: f64, size: f64, fonts: &FontResources) -> Result<Vec<String>, FillError> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let paragraph = paragraph.trim_end_matches('\r');
        let mut current = String::new();
        for word in paragraph.split(' ') {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", current, word)
            };
            let fits = fonts
                .encode(&candidate)
                .ok_or(FillError::FontRequired)?
                .width_at(size)
                <= max_width;
            if fits || current.is_empty() {
                current = candidate;
            } else {
                lines.push(std::mem::replace(&mut current, word.to_string()));
            }
        }
        lines.push(current);
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::Content;
    use pretty_assertions::assert_eq;

    fn form_doc() -> (Document, ObjectId) {
        let mut doc = Document::with_version("1.7");
        let widget = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Annot".to_vec())),
            ("Subtype", Object::Name(b"Widget".to_vec())),
            ("FT", Object::Name(b"Tx".to_vec())),
            ("T", Object::string_literal("name")),
            (
                "Rect",
                Object::Array(vec![
                    Object::Integer(100),
                    Object::Integer(700),
                    Object::Integer(300),
                    Object::Integer(720),
                ]),
            ),
        ]));
        let acroform = doc.add_object(Dictionary::from_iter(vec![(
            "Fields",
            Object::Array(vec![Object::Reference(widget)]),
        )]));
        let catalog = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("AcroForm", Object::Reference(acroform)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog));
        (doc, widget)
    }

    /// Minimal TrueType face: space, digits, ASCII letters and the Hebrew letters
    const MINI_FONT: &[u8] = include_bytes!("../../tests/fixtures/FormFillMini.ttf");

    fn mini_font() -> EmbeddedFont {
        EmbeddedFont::from_bytes(MINI_FONT.to_vec()).unwrap()
    }

    fn acroform(doc: &Document) -> &Dictionary {
        crate::pdf::extract::acroform(doc).unwrap()
    }

    fn appearance_ops(doc: &Document, widget: ObjectId) -> Vec<Operation> {
        let ap = doc.get_dictionary(widget).unwrap().get(b"AP").unwrap().as_dict().unwrap();
        let stream_id = ap.get(b"N").unwrap().as_reference().unwrap();
        let stream = doc.get_object(stream_id).unwrap().as_stream().unwrap();
        Content::decode(&stream.content).unwrap().operations
    }

    #[test]
    fn test_install_registers_helvetica_and_need_appearances() {
        let (mut doc, _) = form_doc();
        let fonts = install_fonts(&mut doc, None).unwrap();
        assert!(!fonts.has_embedded());

        let form = acroform(&doc);
        assert!(matches!(form.get(b"NeedAppearances"), Ok(Object::Boolean(true))));
        let dr_fonts = form.get(b"DR").unwrap().as_dict().unwrap().get(b"Font").unwrap().as_dict().unwrap();
        assert!(dr_fonts.has(HELVETICA_RESOURCE.as_bytes()));
        assert!(form.has(b"DA"));
    }

    #[test]
    fn test_install_without_acroform_is_noop() {
        let mut doc = Document::with_version("1.7");
        let catalog = doc.add_object(Dictionary::from_iter(vec![(
            "Type",
            Object::Name(b"Catalog".to_vec()),
        )]));
        doc.trailer.set("Root", Object::Reference(catalog));
        assert!(install_fonts(&mut doc, None).is_ok());
    }

    #[test]
    fn test_latin_appearance_stream() {
        let (mut doc, widget) = form_doc();
        let fonts = install_fonts(&mut doc, None).unwrap();
        let style = TextStyle::from_default_appearance(Some("/Helv 10 Tf 0 g"), 0, false);
        write_text_appearance(&mut doc, widget, "Acme Inc.", &style, &fonts).unwrap();

        let ops = appearance_ops(&doc, widget);
        let names: Vec<&str> = ops.iter().map(|op| op.operator.as_str()).collect();
        assert_eq!(names.first(), Some(&"BMC"));
        assert_eq!(names.last(), Some(&"EMC"));
        let tj = ops.iter().find(|op| op.operator == "Tj").unwrap();
        match &tj.operands[0] {
            Object::String(bytes, _) => assert_eq!(bytes.as_slice(), b"Acme Inc."),
            other => panic!("unexpected {:?}", other),
        }
        let tf = ops.iter().find(|op| op.operator == "Tf").unwrap();
        assert_eq!(tf.operands[0].as_name().unwrap(), HELVETICA_RESOURCE.as_bytes());
    }

    #[test]
    fn test_hebrew_without_font_requires_font() {
        let (mut doc, widget) = form_doc();
        let fonts = install_fonts(&mut doc, None).unwrap();
        assert!(!fonts.can_render("שלום"));
        assert!(fonts.can_render("\u{200E}Caf\u{e9}"));

        let style = TextStyle::from_default_appearance(None, 0, false);
        let result = write_text_appearance(&mut doc, widget, "שלום", &style, &fonts);
        assert!(matches!(result, Err(FillError::FontRequired)));
    }

    #[test]
    fn test_da_font_size() {
        assert_eq!(da_font_size("/Helv 9 Tf 0 g"), Some(9.0));
        assert_eq!(da_font_size("0 g /F1 0 Tf"), Some(0.0));
        assert_eq!(da_font_size("0 g"), None);
        assert_eq!(da_font_size("Tf"), None);
    }

    #[test]
    fn test_auto_size_fits_height_and_width() {
        let (mut doc, _) = form_doc();
        let fonts = install_fonts(&mut doc, None).unwrap();
        let style = TextStyle::from_default_appearance(None, 0, false);

        // 20pt tall widget: 14 clamps to 12
        assert_eq!(font_size(&style, 20.0, 500.0, "abc", &fonts).unwrap(), 12.0);
        // narrow widget shrinks the size but not below the minimum
        let narrow = font_size(&style, 20.0, 30.0, "a long value", &fonts).unwrap();
        assert!(narrow < 12.0 && narrow >= AUTO_SIZE_MIN);
    }

    #[test]
    fn test_wrap_lines() {
        let (mut doc, _) = form_doc();
        let fonts = install_fonts(&mut doc, None).unwrap();
        let lines = wrap_lines("one two three\nfour", 40.0, 10.0, &fonts).unwrap();
        assert_eq!(lines, vec!["one two", "three", "four"]);
    }

    #[test]
    fn test_invalid_font_bytes_rejected() {
        assert!(matches!(
            EmbeddedFont::from_bytes(b"not a font".to_vec()),
            Err(PdfError::Font(_))
        ));
    }

    #[test]
    fn test_font_fixture_metrics() {
        let font = mini_font();
        assert_eq!(font.base_font(), "FormFillMini");
        assert_eq!(font.glyph_count(), 91);

        // "42": '4' is glyph 6 and '2' glyph 4; digits advance 500
        let encoded = font.encode("42").unwrap();
        assert_eq!(encoded.bytes, vec![0, 6, 0, 4]);
        assert_eq!(encoded.width, 1000.0);
    }

    #[test]
    fn test_embedded_font_registered_as_type0() {
        let (mut doc, _) = form_doc();
        let fonts = install_fonts(&mut doc, Some(&mini_font())).unwrap();
        assert!(fonts.has_embedded());
        assert_eq!(fonts.resource_name(), EMBEDDED_RESOURCE);

        let form = acroform(&doc);
        let dr_fonts = form.get(b"DR").unwrap().as_dict().unwrap().get(b"Font").unwrap().as_dict().unwrap();
        assert!(dr_fonts.has(HELVETICA_RESOURCE.as_bytes()));
        let type0_id = dr_fonts.get(EMBEDDED_RESOURCE.as_bytes()).unwrap().as_reference().unwrap();
        let type0 = doc.get_dictionary(type0_id).unwrap();
        assert_eq!(type0.get(b"Subtype").unwrap().as_name().unwrap(), b"Type0");
        assert_eq!(type0.get(b"Encoding").unwrap().as_name().unwrap(), b"Identity-H");
        assert_eq!(type0.get(b"BaseFont").unwrap().as_name().unwrap(), b"FormFillMini");

        let descendants = type0.get(b"DescendantFonts").unwrap().as_array().unwrap();
        let cid_font = doc.get_dictionary(descendants[0].as_reference().unwrap()).unwrap();
        assert_eq!(cid_font.get(b"Subtype").unwrap().as_name().unwrap(), b"CIDFontType2");

        // shin (U+05E9) is glyph 0x59
        let to_unicode_id = type0.get(b"ToUnicode").unwrap().as_reference().unwrap();
        let cmap = &doc.get_object(to_unicode_id).unwrap().as_stream().unwrap().content;
        let cmap = String::from_utf8_lossy(cmap);
        assert!(cmap.contains("<0059> <05E9>"), "{}", cmap);
        assert!(cmap.contains("<0006> <0034>"), "{}", cmap);

        let da = form.get(b"DA").unwrap().as_str().unwrap();
        assert_eq!(da, b"/FormFillUni 0 Tf 0 g");
    }

    #[test]
    fn test_hebrew_appearance_uses_glyph_ids_in_visual_order() {
        let (mut doc, widget) = form_doc();
        let fonts = install_fonts(&mut doc, Some(&mini_font())).unwrap();
        let style = TextStyle::from_default_appearance(Some("/Helv 10 Tf 0 g"), 0, false);
        let value = crate::bidi::normalize_field_text("שלום 42");
        write_text_appearance(&mut doc, widget, &value, &style, &fonts).unwrap();

        let ops = appearance_ops(&doc, widget);
        let tf = ops.iter().find(|op| op.operator == "Tf").unwrap();
        assert_eq!(tf.operands[0].as_name().unwrap(), EMBEDDED_RESOURCE.as_bytes());

        // Drawn left to right as "42 םולש"; controls produce no glyphs
        let tj = ops.iter().find(|op| op.operator == "Tj").unwrap();
        match &tj.operands[0] {
            Object::String(bytes, _) => assert_eq!(
                bytes.as_slice(),
                &[0, 6, 0, 4, 0, 1, 0, 0x4D, 0, 0x45, 0, 0x4C, 0, 0x59]
            ),
            other => panic!("unexpected {:?}", other),
        }

        // /Q 0 with Hebrew aligns right: 200 wide, 2pt padding, 3650 units at 10pt
        let tm = ops.iter().find(|op| op.operator == "Tm").unwrap();
        assert_eq!(tm.operands[4].as_float().unwrap(), 161.5);
    }

    #[test]
    fn test_latin_with_embedded_font_stays_left_aligned() {
        let (mut doc, widget) = form_doc();
        let fonts = install_fonts(&mut doc, Some(&mini_font())).unwrap();
        let style = TextStyle::from_default_appearance(Some("/Helv 10 Tf 0 g"), 0, false);
        write_text_appearance(&mut doc, widget, "Acme", &style, &fonts).unwrap();

        let ops = appearance_ops(&doc, widget);
        let tm = ops.iter().find(|op| op.operator == "Tm").unwrap();
        assert_eq!(tm.operands[4].as_float().unwrap(), PADDING as f32);
    }

    #[test]
    fn test_retarget_default_appearance() {
        assert_eq!(
            retarget_default_appearance(Some("/Helv 9 Tf 0.2 g"), EMBEDDED_RESOURCE),
            "/FormFillUni 9 Tf 0.2 g"
        );
        assert_eq!(
            retarget_default_appearance(Some("0 0 1 rg /F1 0 Tf"), EMBEDDED_RESOURCE),
            "0 0 1 rg /FormFillUni 0 Tf"
        );
        assert_eq!(retarget_default_appearance(None, EMBEDDED_RESOURCE), "/FormFillUni 0 Tf 0 g");
        assert_eq!(
            retarget_default_appearance(Some("1 g"), EMBEDDED_RESOURCE),
            "/FormFillUni 0 Tf 1 g"
        );
    }
}
