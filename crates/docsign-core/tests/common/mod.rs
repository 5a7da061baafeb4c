//! In-memory fixtures for end-to-end signing tests

#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream, StringFormat};

/// Text drawn at an absolute position with font F1 (every glyph 500/1000 em)
pub struct Line<'a> {
    pub x: i64,
    pub y: i64,
    pub size: i64,
    /// Each piece is shown by its own `Tj`, continuing where the last ended
    pub pieces: &'a [&'a str],
}

impl<'a> Line<'a> {
    pub fn new(x: i64, y: i64, pieces: &'a [&'a str]) -> Self {
        Self {
            x,
            y,
            size: 12,
            pieces,
        }
    }

    fn operations(&self) -> Vec<Operation> {
        let mut ops = vec![
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(b"F1".to_vec()), Object::Integer(self.size)],
            ),
            Operation::new("Td", vec![Object::Integer(self.x), Object::Integer(self.y)]),
        ];
        for piece in self.pieces {
            ops.push(Operation::new(
                "Tj",
                vec![Object::String(
                    piece.as_bytes().to_vec(),
                    StringFormat::Literal,
                )],
            ));
        }
        ops.push(Operation::new("ET", vec![]));
        ops
    }
}

/// Build a Letter-sized PDF with one entry per page
pub fn build_pdf(pages: &[Vec<Line>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "FirstChar" => 32,
        "Widths" => Object::Array((32..127).map(|_| Object::Integer(500)).collect()),
    });

    let mut kids = Vec::new();
    for lines in pages {
        let operations: Vec<_> = lines.iter().flat_map(Line::operations).collect();
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()]),
            "Contents" => Object::Reference(content_id),
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => Object::Reference(font_id) },
            },
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// A small translucent RGBA PNG
pub fn signature_png() -> Vec<u8> {
    let (width, height) = (8u32, 4u32);
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().unwrap();
        let data: Vec<u8> = (0..width * height)
            .flat_map(|i| [0, 0, 128, if i % 2 == 0 { 255 } else { 0 }])
            .collect();
        writer.write_image_data(&data).unwrap();
    }
    out
}

/// Content stream text of the last `Contents` entry on a 1-based page
pub fn last_content_stream(pdf: &[u8], page: u32) -> String {
    let doc = Document::load_mem(pdf).unwrap();
    let page_id = doc.get_pages()[&page];
    let contents = doc
        .get_dictionary(page_id)
        .unwrap()
        .get(b"Contents")
        .unwrap()
        .clone();
    let last = match contents {
        Object::Array(items) => items.last().unwrap().as_reference().unwrap(),
        Object::Reference(id) => id,
        other => panic!("unexpected Contents: {:?}", other),
    };
    let stream = doc.get_object(last).unwrap().as_stream().unwrap();
    String::from_utf8(stream.content.clone()).unwrap()
}

/// Names registered under the page's `/XObject` resources
pub fn xobject_names(pdf: &[u8], page: u32) -> Vec<String> {
    let doc = Document::load_mem(pdf).unwrap();
    let page_id = doc.get_pages()[&page];
    let resources = match doc.get_dictionary(page_id).unwrap().get(b"Resources") {
        Ok(Object::Dictionary(dict)) => dict.clone(),
        Ok(Object::Reference(id)) => doc.get_dictionary(*id).unwrap().clone(),
        _ => return Vec::new(),
    };
    match resources.get(b"XObject") {
        Ok(Object::Dictionary(xobjects)) => xobjects
            .iter()
            .map(|(k, _)| String::from_utf8_lossy(k).into_owned())
            .collect(),
        _ => Vec::new(),
    }
}
