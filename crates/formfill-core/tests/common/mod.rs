//! Shared fixtures: small AcroForm PDFs built in memory with lopdf

#![allow(dead_code)]

use formfill_core::pdf::text::decode_text_string;
use formfill_core::pdf::FieldIndex;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

fn rect(values: [i64; 4]) -> Object {
    Object::Array(values.iter().map(|v| Object::Integer(*v)).collect())
}

fn text_widget(doc: &mut Document, page: ObjectId, name: &str, y: i64, max_len: Option<i64>) -> ObjectId {
    let mut widget = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Annot".to_vec())),
        ("Subtype", Object::Name(b"Widget".to_vec())),
        ("FT", Object::Name(b"Tx".to_vec())),
        ("T", Object::string_literal(name)),
        ("Rect", rect([72, y, 320, y + 20])),
        ("DA", Object::string_literal("/Helv 0 Tf 0 g")),
        ("P", Object::Reference(page)),
    ]);
    if let Some(max_len) = max_len {
        widget.set("MaxLen", Object::Integer(max_len));
    }
    doc.add_object(widget)
}

/// One page (optionally rotated) with text fields `customer` and `amount` and checkbox `paid`
pub fn invoice_form(rotate: i64) -> Vec<u8> {
    build_invoice_form(rotate, None)
}

/// The unrotated invoice form with `/MaxLen` on the `customer` field
pub fn invoice_form_with_max_len(max_len: i64) -> Vec<u8> {
    build_invoice_form(0, Some(max_len))
}

fn build_invoice_form(rotate: i64, customer_max_len: Option<i64>) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let page_id = doc.new_object_id();

    let customer = text_widget(&mut doc, page_id, "customer", 700, customer_max_len);
    let amount = text_widget(&mut doc, page_id, "amount", 660, None);

    let on = doc.add_object(Stream::new(Dictionary::new(), b"0 g 0 0 10 10 re f".to_vec()));
    let off = doc.add_object(Stream::new(Dictionary::new(), Vec::new()));
    let paid = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Annot".to_vec())),
        ("Subtype", Object::Name(b"Widget".to_vec())),
        ("FT", Object::Name(b"Btn".to_vec())),
        ("T", Object::string_literal("paid")),
        ("Rect", rect([72, 620, 84, 632])),
        ("P", Object::Reference(page_id)),
        ("AS", Object::Name(b"Off".to_vec())),
        (
            "AP",
            Object::Dictionary(Dictionary::from_iter(vec![(
                "N",
                Object::Dictionary(Dictionary::from_iter(vec![
                    ("Yes", Object::Reference(on)),
                    ("Off", Object::Reference(off)),
                ])),
            )])),
        ),
    ]));

    let widgets = vec![
        Object::Reference(customer),
        Object::Reference(amount),
        Object::Reference(paid),
    ];

    let content_id = doc.add_object(Stream::new(Dictionary::new(), Vec::new()));
    doc.objects.insert(
        page_id,
        Object::Dictionary(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("Contents", Object::Reference(content_id)),
            ("Rotate", Object::Integer(rotate)),
            ("Annots", Object::Array(widgets.clone())),
        ])),
    );
    doc.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(vec![Object::Reference(page_id)])),
            ("Count", Object::Integer(1)),
            ("MediaBox", rect([0, 0, 595, 842])),
        ])),
    );

    let acroform = doc.add_object(Dictionary::from_iter(vec![("Fields", Object::Array(widgets))]));
    let catalog = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
        ("AcroForm", Object::Reference(acroform)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog));

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("save test form");
    bytes
}

/// Decoded `/V` of a text field, if set
pub fn text_value(pdf: &[u8], field: &str) -> Option<String> {
    let doc = Document::load_mem(pdf).expect("load generated pdf");
    let index = FieldIndex::build(&doc);
    let id = index.get(field)?.id;
    let value = doc.get_dictionary(id).ok()?.get(b"V").ok()?;
    match value {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}

/// Minimal TrueType face covering space, digits, ASCII letters and the Hebrew letters
///
/// Glyph ids: space 1, `0`-`9` 2..=11, `A`-`Z` 12..=37, `a`-`z` 38..=63,
/// alef-tav 64..=90. Hebrew advances 600 units, space 250, the rest 500.
pub fn hebrew_font() -> Vec<u8> {
    include_bytes!("../fixtures/FormFillMini.ttf").to_vec()
}

/// Resolved dictionary of a named field in a loaded document
pub fn field_dict<'a>(doc: &'a Document, field: &str) -> &'a Dictionary {
    let index = FieldIndex::build(doc);
    let id = index.get(field).expect("field in template").id;
    doc.get_dictionary(id).expect("field dictionary")
}

/// Decoded operations of a widget's `/AP /N` stream
pub fn appearance_operations(doc: &Document, widget: &Dictionary) -> Vec<Operation> {
    let ap = widget.get(b"AP").expect("appearance").as_dict().expect("AP dictionary");
    let stream_id = ap.get(b"N").unwrap().as_reference().unwrap();
    let stream = doc.get_object(stream_id).unwrap().as_stream().unwrap();
    Content::decode(&stream.content).expect("content stream").operations
}
