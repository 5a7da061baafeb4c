//! Positioned text extraction
//!
//! Walks each page's content stream with a reduced text-rendering state
//! machine and emits one [`TextFragment`] per string-showing operation,
//! the same granularity pdf.js uses for its text items.
//!
//! | Operator            | Action |
//! |---------------------|--------|
//! | `q` / `Q` / `cm`    | Save / restore / concatenate the CTM and text parameters |
//! | `BT`                | Reset text and line matrices |
//! | `Tf`                | Select font and size |
//! | `Tm` `Td` `TD` `T*` | Position the text cursor |
//! | `TL` `Tc` `Tw` `Tz` `Ts` | Text parameters |
//! | `Tj` `TJ` `'` `"`   | Show text |
//!
//! Form XObjects (`Do`) are not descended into.

use crate::coords::Matrix;
use crate::error::PdfError;
use crate::fonts::{number, resolve, FontInfo};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId};
use shared_types::{PageFragments, PageNumber, TextFragment};
use std::collections::HashMap;
use tracing::debug;

/// Kerning adjustment (thousandths of em) past which a `TJ` gap reads as a space
const TJ_SPACE_THRESHOLD: f64 = -100.0;

/// Lazily extracted pages, in document order
pub type FragmentPages = Box<dyn Iterator<Item = Result<PageFragments, PdfError>>>;

/// Source of positioned text fragments for a document
pub trait FragmentSource {
    /// Parse `document` and return its pages for sequential scanning.
    ///
    /// Pages are extracted on demand, so a consumer that stops early never
    /// pays for the remaining pages.
    fn pages(&self, document: &[u8]) -> Result<FragmentPages, PdfError>;

    /// Extract every page eagerly
    fn extract_fragments(&self, document: &[u8]) -> Result<Vec<PageFragments>, PdfError> {
        self.pages(document)?.collect()
    }
}

/// [`FragmentSource`] backed by lopdf content-stream decoding
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfFragmentSource;

impl LopdfFragmentSource {
    pub fn new() -> Self {
        Self
    }
}

impl FragmentSource for LopdfFragmentSource {
    fn pages(&self, document: &[u8]) -> Result<FragmentPages, PdfError> {
        let doc = Document::load_mem(document).map_err(|e| PdfError::Parse(e.to_string()))?;
        let page_ids: Vec<(u32, ObjectId)> = doc.get_pages().into_iter().collect();
        debug!("Loaded document with {} pages", page_ids.len());

        Ok(Box::new(page_ids.into_iter().map(move |(number, page_id)| {
            let page = PageNumber::new(number).map_err(|e| PdfError::Parse(e.to_string()))?;
            Ok(PageFragments::new(page, page_fragments(&doc, page_id, page)))
        })))
    }
}

/// Text parameters saved and restored with the graphics state
#[derive(Debug, Clone)]
struct TextParams {
    font_key: Vec<u8>,
    font_size: f64,
    char_spacing: f64,
    word_spacing: f64,
    horiz_scale: f64,
    leading: f64,
    rise: f64,
}

impl Default for TextParams {
    fn default() -> Self {
        Self {
            font_key: Vec::new(),
            font_size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horiz_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

struct PageScanner<'a> {
    doc: &'a Document,
    page: PageNumber,
    font_dicts: HashMap<Vec<u8>, &'a Dictionary>,
    fonts: HashMap<Vec<u8>, FontInfo>,
    fallback_font: FontInfo,
    ctm: Matrix,
    params: TextParams,
    stack: Vec<(Matrix, TextParams)>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    fragments: Vec<TextFragment>,
}

fn page_fragments(doc: &Document, page_id: ObjectId, page: PageNumber) -> Vec<TextFragment> {
    let content = match doc.get_page_content(page_id) {
        Ok(content) => content,
        Err(e) => {
            debug!("Page {} has no readable content: {}", page, e);
            return Vec::new();
        }
    };
    let operations = match Content::decode(&content) {
        Ok(content) => content.operations,
        Err(e) => {
            debug!("Page {} content stream failed to decode: {}", page, e);
            return Vec::new();
        }
    };

    let mut scanner = PageScanner {
        doc,
        page,
        font_dicts: page_font_dicts(doc, page_id),
        fonts: HashMap::new(),
        fallback_font: FontInfo::fallback(),
        ctm: Matrix::IDENTITY,
        params: TextParams::default(),
        stack: Vec::new(),
        text_matrix: Matrix::IDENTITY,
        line_matrix: Matrix::IDENTITY,
        fragments: Vec::new(),
    };
    for op in &operations {
        scanner.apply(op);
    }
    scanner.fragments
}

/// Font dictionaries from the page resources, following inheritance up the page tree
fn page_font_dicts(doc: &Document, page_id: ObjectId) -> HashMap<Vec<u8>, &Dictionary> {
    let mut fonts = HashMap::new();
    let mut current = Some(page_id);
    let mut depth = 0;

    while let Some(id) = current {
        let Ok(node) = doc.get_dictionary(id) else {
            break;
        };
        if let Some(font_dict) = node
            .get(b"Resources")
            .ok()
            .map(|r| resolve(doc, r))
            .and_then(|r| r.as_dict().ok())
            .and_then(|res| res.get(b"Font").ok())
            .map(|f| resolve(doc, f))
            .and_then(|f| f.as_dict().ok())
        {
            for (key, value) in font_dict.iter() {
                if let Ok(dict) = resolve(doc, value).as_dict() {
                    fonts.entry(key.clone()).or_insert(dict);
                }
            }
            // Nearest Resources wins; ancestors only fill gaps for pages without their own
            break;
        }
        depth += 1;
        if depth > 32 {
            break;
        }
        current = node.get(b"Parent").and_then(|p| p.as_reference()).ok();
    }
    fonts
}

fn operand(op: &Operation, i: usize) -> Option<f64> {
    op.operands.get(i).and_then(number)
}

impl<'a> PageScanner<'a> {
    fn apply(&mut self, op: &Operation) {
        match op.operator.as_str() {
            "q" => self.stack.push((self.ctm, self.params.clone())),
            "Q" => {
                if let Some((ctm, params)) = self.stack.pop() {
                    self.ctm = ctm;
                    self.params = params;
                }
            }
            "cm" => {
                if let Some(m) = self.matrix_operands(op) {
                    self.ctm = m.then(&self.ctm);
                }
            }
            "BT" => {
                self.text_matrix = Matrix::IDENTITY;
                self.line_matrix = Matrix::IDENTITY;
            }
            "Tf" => {
                if let Some(Object::Name(key)) = op.operands.first() {
                    self.params.font_key = key.clone();
                }
                if let Some(size) = operand(op, 1) {
                    self.params.font_size = size;
                }
            }
            "Tm" => {
                if let Some(m) = self.matrix_operands(op) {
                    self.text_matrix = m;
                    self.line_matrix = m;
                }
            }
            "Td" => {
                if let (Some(tx), Some(ty)) = (operand(op, 0), operand(op, 1)) {
                    self.next_line(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (operand(op, 0), operand(op, 1)) {
                    self.params.leading = -ty;
                    self.next_line(tx, ty);
                }
            }
            "T*" => self.next_line(0.0, -self.params.leading),
            "TL" => {
                if let Some(v) = operand(op, 0) {
                    self.params.leading = v;
                }
            }
            "Tc" => {
                if let Some(v) = operand(op, 0) {
                    self.params.char_spacing = v;
                }
            }
            "Tw" => {
                if let Some(v) = operand(op, 0) {
                    self.params.word_spacing = v;
                }
            }
            "Tz" => {
                if let Some(v) = operand(op, 0) {
                    self.params.horiz_scale = v / 100.0;
                }
            }
            "Ts" => {
                if let Some(v) = operand(op, 0) {
                    self.params.rise = v;
                }
            }
            "Tj" => {
                if let Some(obj) = op.operands.first() {
                    self.show(std::slice::from_ref(obj));
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = op.operands.first() {
                    self.show(items);
                }
            }
            "'" => {
                self.next_line(0.0, -self.params.leading);
                if let Some(obj) = op.operands.first() {
                    self.show(std::slice::from_ref(obj));
                }
            }
            "\"" => {
                if let (Some(aw), Some(ac)) = (operand(op, 0), operand(op, 1)) {
                    self.params.word_spacing = aw;
                    self.params.char_spacing = ac;
                }
                self.next_line(0.0, -self.params.leading);
                if let Some(obj) = op.operands.get(2) {
                    self.show(std::slice::from_ref(obj));
                }
            }
            _ => {}
        }
    }

    fn matrix_operands(&self, op: &Operation) -> Option<Matrix> {
        if op.operands.len() < 6 {
            return None;
        }
        Some(Matrix::new(
            operand(op, 0)?,
            operand(op, 1)?,
            operand(op, 2)?,
            operand(op, 3)?,
            operand(op, 4)?,
            operand(op, 5)?,
        ))
    }

    fn next_line(&mut self, tx: f64, ty: f64) {
        self.line_matrix = Matrix::translation(tx, ty).then(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn font(&mut self) -> &FontInfo {
        let key = &self.params.font_key;
        if !self.fonts.contains_key(key) {
            match self.font_dicts.get(key) {
                Some(dict) => {
                    let info = FontInfo::from_dict(self.doc, dict);
                    self.fonts.insert(key.clone(), info);
                }
                None => return &self.fallback_font,
            }
        }
        self.fonts.get(key).unwrap_or(&self.fallback_font)
    }

    /// Show one `Tj` string or the elements of a `TJ` array as a single fragment
    fn show(&mut self, items: &[Object]) {
        let start = self.text_matrix.then(&self.ctm);
        let params = self.params.clone();
        let font_size = params.font_size;
        let scale = params.horiz_scale;

        let mut text = String::new();
        let mut advance = 0.0;

        for item in items {
            match item {
                Object::String(bytes, _) => {
                    let glyphs = self.font().decode(bytes);
                    for glyph in glyphs {
                        let mut spacing = params.char_spacing;
                        if glyph.is_space {
                            spacing += params.word_spacing;
                        }
                        advance += (glyph.width / 1000.0 * font_size + spacing) * scale;
                        text.push_str(&glyph.text);
                    }
                }
                other => {
                    if let Some(adjust) = number(other) {
                        if adjust < TJ_SPACE_THRESHOLD && !text.is_empty() && !text.ends_with(' ') {
                            text.push(' ');
                        }
                        advance -= adjust / 1000.0 * font_size * scale;
                    }
                }
            }
        }

        self.text_matrix = Matrix::translation(advance, 0.0).then(&self.text_matrix);

        if text.is_empty() {
            return;
        }

        let size_matrix = Matrix::new(font_size * scale, 0.0, 0.0, font_size, 0.0, params.rise);
        let rendering = size_matrix.then(&start);
        let width = advance * start.horizontal_scale();
        let height = rendering.vertical_scale();

        match TextFragment::new(text, rendering.e, rendering.f, width, height, self.page) {
            Ok(fragment) => self.fragments.push(fragment),
            Err(e) => debug!("Dropping fragment on page {}: {}", self.page, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Stream, StringFormat};
    use pretty_assertions::assert_eq;

    fn text(s: &str) -> Object {
        Object::String(s.as_bytes().to_vec(), StringFormat::Literal)
    }

    /// Build a PDF whose pages carry the given operations, with a width-table font F1
    fn pdf_with_pages(pages: Vec<Vec<Operation>>) -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "FirstChar" => 32,
            "Widths" => Object::Array((32..127).map(|_| Object::Integer(500)).collect()),
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => Object::Reference(font_id) },
        });

        let mut kids = Vec::new();
        for operations in pages {
            let content = Content { operations };
            let content_id =
                doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => Object::Reference(pages_id),
                "MediaBox" => Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()]),
                "Contents" => Object::Reference(content_id),
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
                "Resources" => Object::Reference(resources_id),
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

    fn line(x: i64, y: i64, s: &str) -> Vec<Operation> {
        vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(12)]),
            Operation::new("Td", vec![Object::Integer(x), Object::Integer(y)]),
            Operation::new("Tj", vec![text(s)]),
            Operation::new("ET", vec![]),
        ]
    }

    #[test]
    fn test_tj_fragment_position_and_size() {
        let pdf = pdf_with_pages(vec![line(100, 200, "Hello")]);
        let pages = LopdfFragmentSource::new().extract_fragments(&pdf).unwrap();

        assert_eq!(pages.len(), 1);
        let frag = &pages[0].fragments[0];
        assert_eq!(frag.text, "Hello");
        assert_eq!(frag.x, 100.0);
        assert_eq!(frag.y, 200.0);
        // 5 glyphs * 500/1000 em * 12pt
        assert_eq!(frag.width, 30.0);
        assert_eq!(frag.height, 12.0);
        assert_eq!(frag.page, PageNumber::FIRST);
    }

    #[test]
    fn test_fragments_keep_draw_order_and_pages() {
        let mut first = line(72, 700, "Title");
        first.extend(line(72, 100, "./."));
        let pdf = pdf_with_pages(vec![first, line(300, 150, "Nguyen Van A")]);

        let pages = LopdfFragmentSource::new().extract_fragments(&pdf).unwrap();
        assert_eq!(pages.len(), 2);
        let texts: Vec<&str> = pages[0].fragments.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(texts, vec!["Title", "./."]);
        assert_eq!(pages[1].page.get(), 2);
        assert_eq!(pages[1].fragments[0].x, 300.0);
    }

    #[test]
    fn test_ctm_and_text_matrix_compose() {
        let ops = vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![2.into(), 0.into(), 0.into(), 2.into(), 10.into(), 20.into()],
            ),
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(10)]),
            Operation::new(
                "Tm",
                vec![1.into(), 0.into(), 0.into(), 1.into(), 50.into(), 60.into()],
            ),
            Operation::new("Tj", vec![text("AB")]),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(10)]),
            Operation::new("Td", vec![5.into(), 5.into()]),
            Operation::new("Tj", vec![text("C")]),
            Operation::new("ET", vec![]),
        ];
        let pdf = pdf_with_pages(vec![ops]);
        let pages = LopdfFragmentSource::new().extract_fragments(&pdf).unwrap();
        let frags = &pages[0].fragments;

        assert_eq!(frags[0].x, 110.0);
        assert_eq!(frags[0].y, 140.0);
        // 2 glyphs * 0.5em * 10pt, doubled by the CTM
        assert_eq!(frags[0].width, 20.0);
        assert_eq!(frags[0].height, 20.0);

        // CTM restored by Q
        assert_eq!(frags[1].x, 5.0);
        assert_eq!(frags[1].y, 5.0);
    }

    #[test]
    fn test_consecutive_tj_advance_cursor() {
        let ops = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(10)]),
            Operation::new("Td", vec![100.into(), 100.into()]),
            Operation::new("Tj", vec![text("Ngu")]),
            Operation::new("Tj", vec![text("yen Van A")]),
            Operation::new("ET", vec![]),
        ];
        let pdf = pdf_with_pages(vec![ops]);
        let pages = LopdfFragmentSource::new().extract_fragments(&pdf).unwrap();
        let frags = &pages[0].fragments;

        assert_eq!(frags.len(), 2);
        assert_eq!(frags[0].width, 15.0);
        assert_eq!(frags[1].x, 115.0);
        assert_eq!(frags[1].text, "yen Van A");
    }

    #[test]
    fn test_tj_array_kerning_gap_becomes_space() {
        let ops = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(10)]),
            Operation::new(
                "TJ",
                vec![Object::Array(vec![
                    text("Van"),
                    Object::Integer(-300),
                    text("A"),
                    Object::Integer(20),
                    text("B"),
                ])],
            ),
            Operation::new("ET", vec![]),
        ];
        let pdf = pdf_with_pages(vec![ops]);
        let pages = LopdfFragmentSource::new().extract_fragments(&pdf).unwrap();
        assert_eq!(pages[0].fragments[0].text, "Van AB");
    }

    #[test]
    fn test_quote_operator_moves_to_next_line() {
        let ops = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(10)]),
            Operation::new("TL", vec![14.into()]),
            Operation::new("Td", vec![50.into(), 500.into()]),
            Operation::new("Tj", vec![text("one")]),
            Operation::new("'", vec![text("two")]),
            Operation::new("ET", vec![]),
        ];
        let pdf = pdf_with_pages(vec![ops]);
        let pages = LopdfFragmentSource::new().extract_fragments(&pdf).unwrap();
        let frags = &pages[0].fragments;
        assert_eq!(frags[1].x, 50.0);
        assert_eq!(frags[1].y, 486.0);
    }

    #[test]
    fn test_invalid_bytes_fail_to_parse() {
        let result = LopdfFragmentSource::new().pages(b"not a pdf");
        assert!(matches!(result, Err(PdfError::Parse(_))));
    }

    #[test]
    fn test_pages_are_lazy() {
        let pdf = pdf_with_pages(vec![line(10, 10, "a"), line(10, 10, "b")]);
        let mut pages = LopdfFragmentSource::new().pages(&pdf).unwrap();
        let first = pages.next().unwrap().unwrap();
        assert_eq!(first.fragments[0].text, "a");
        assert!(pages.next().is_some());
        assert!(pages.next().is_none());
    }
}
