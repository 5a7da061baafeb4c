//! Minimal font model for text positioning
//!
//! Only what fragment extraction needs: turning shown bytes into Unicode
//! and knowing each glyph's advance width. Glyph outlines are never read.

use lopdf::{Dictionary, Document, Object};
use std::collections::HashMap;
use tracing::debug;

/// Advance used when a font carries no width information (thousandths of em)
const DEFAULT_GLYPH_WIDTH: f64 = 500.0;

/// Resolve an indirect reference, leaving direct objects untouched
pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        other => other,
    }
}

pub(crate) fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

fn dict_entry<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    dict.get(key).ok().map(|obj| resolve(doc, obj))
}

/// One decoded glyph: its Unicode text and advance in thousandths of em
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub text: String,
    pub width: f64,
    /// Single-byte code 32, which also receives word spacing
    pub is_space: bool,
}

#[derive(Debug, Clone, Default)]
pub struct FontInfo {
    /// Type0 fonts use 2-byte codes (Identity-H and friends)
    two_byte: bool,
    to_unicode: Option<HashMap<u32, String>>,
    widths: HashMap<u32, f64>,
    /// `c_first c_last w` entries of a CID font's `/W`, kept unexpanded
    width_ranges: Vec<WidthRange>,
    default_width: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct WidthRange {
    first: u32,
    last: u32,
    width: f64,
}

#[derive(Debug, Default)]
struct CidWidths {
    codes: HashMap<u32, f64>,
    ranges: Vec<WidthRange>,
}

impl FontInfo {
    /// Font used when `Tf` names a resource that does not exist
    pub fn fallback() -> Self {
        Self {
            default_width: DEFAULT_GLYPH_WIDTH,
            ..Self::default()
        }
    }

    pub fn from_dict(doc: &Document, font: &Dictionary) -> Self {
        let subtype = dict_entry(doc, font, b"Subtype")
            .and_then(|o| o.as_name().ok())
            .unwrap_or(b"Type1".as_slice());

        let to_unicode = load_to_unicode(doc, font);

        if subtype == b"Type0" {
            let (widths, default_width) = cid_widths(doc, font);
            Self {
                two_byte: true,
                to_unicode,
                widths: widths.codes,
                width_ranges: widths.ranges,
                default_width,
            }
        } else {
            let (widths, default_width) = simple_widths(doc, font);
            Self {
                two_byte: false,
                to_unicode,
                widths,
                width_ranges: Vec::new(),
                default_width,
            }
        }
    }

    fn width_of(&self, code: u32) -> f64 {
        self.widths
            .get(&code)
            .copied()
            .or_else(|| {
                self.width_ranges
                    .iter()
                    .find(|r| (r.first..=r.last).contains(&code))
                    .map(|r| r.width)
            })
            .unwrap_or(self.default_width)
    }

    fn codes(&self, bytes: &[u8]) -> Vec<u32> {
        if self.two_byte {
            bytes
                .chunks(2)
                .map(|pair| match pair {
                    [hi, lo] => u32::from(*hi) << 8 | u32::from(*lo),
                    [single] => u32::from(*single),
                    _ => 0,
                })
                .collect()
        } else {
            bytes.iter().map(|&b| u32::from(b)).collect()
        }
    }

    /// Decode a shown string into glyphs.
    ///
    /// Without a ToUnicode map, single-byte fonts fall back to UTF-8, then
    /// UTF-16BE (with BOM), then Latin-1 for the whole string. Widths are
    /// still taken per code.
    pub fn decode(&self, bytes: &[u8]) -> Vec<Glyph> {
        let codes = self.codes(bytes);

        if let Some(map) = &self.to_unicode {
            return codes
                .into_iter()
                .map(|code| Glyph {
                    text: map.get(&code).cloned().unwrap_or_default(),
                    width: self.width_of(code),
                    is_space: !self.two_byte && code == 32,
                })
                .collect();
        }

        if self.two_byte {
            return codes
                .into_iter()
                .map(|code| Glyph {
                    text: char::from_u32(code).map(String::from).unwrap_or_default(),
                    width: self.width_of(code),
                    is_space: false,
                })
                .collect();
        }

        let mut glyphs: Vec<Glyph> = codes
            .iter()
            .map(|&code| Glyph {
                text: String::new(),
                width: self.width_of(code),
                is_space: code == 32,
            })
            .collect();

        // Attach the whole decoded string to the first glyph; widths stay per code
        if let Some(first) = glyphs.first_mut() {
            first.text = decode_unmapped(bytes);
        }
        glyphs
    }
}

/// Whole-string decoding for fonts without a ToUnicode map
fn decode_unmapped(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        if let Ok(s) = String::from_utf16(&units) {
            return s;
        }
    }
    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }
    bytes.iter().map(|&b| b as char).collect()
}

fn load_to_unicode(doc: &Document, font: &Dictionary) -> Option<HashMap<u32, String>> {
    let stream = match dict_entry(doc, font, b"ToUnicode")? {
        Object::Stream(stream) => stream,
        _ => return None,
    };
    let content = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());

    let cmap = match adobe_cmap_parser::get_unicode_map(&content) {
        Ok(cmap) => cmap,
        Err(_) => {
            debug!("Ignoring unparseable ToUnicode CMap");
            return None;
        }
    };

    let mut map = HashMap::with_capacity(cmap.len());
    for (code, utf16be) in cmap {
        let units: Vec<u16> = utf16be
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        match String::from_utf16(&units) {
            Ok(text) => {
                map.insert(code, text);
            }
            Err(_) => debug!("Invalid UTF-16 in ToUnicode entry for code {}", code),
        }
    }
    Some(map)
}

fn simple_widths(doc: &Document, font: &Dictionary) -> (HashMap<u32, f64>, f64) {
    let missing_width = dict_entry(doc, font, b"FontDescriptor")
        .and_then(|o| o.as_dict().ok())
        .and_then(|fd| dict_entry(doc, fd, b"MissingWidth"))
        .and_then(number);

    let first_char = dict_entry(doc, font, b"FirstChar").and_then(number);
    let widths = dict_entry(doc, font, b"Widths").and_then(|o| o.as_array().ok());

    let mut map = HashMap::new();
    if let (Some(first), Some(widths)) = (first_char, widths) {
        for (i, w) in widths.iter().enumerate() {
            if let Some(w) = number(resolve(doc, w)) {
                map.insert(first as u32 + i as u32, w);
            }
        }
        (map, missing_width.unwrap_or(0.0))
    } else {
        // Standard 14 fonts may omit /Widths entirely
        (map, missing_width.unwrap_or(DEFAULT_GLYPH_WIDTH))
    }
}

fn cid_widths(doc: &Document, font: &Dictionary) -> (CidWidths, f64) {
    let descendant = dict_entry(doc, font, b"DescendantFonts")
        .and_then(|o| o.as_array().ok())
        .and_then(|arr| arr.first())
        .map(|o| resolve(doc, o))
        .and_then(|o| o.as_dict().ok());

    let Some(cid_font) = descendant else {
        return (CidWidths::default(), 1000.0);
    };

    let default_width = dict_entry(doc, cid_font, b"DW")
        .and_then(number)
        .unwrap_or(1000.0);

    let mut widths = CidWidths::default();
    let Some(w) = dict_entry(doc, cid_font, b"W").and_then(|o| o.as_array().ok()) else {
        return (widths, default_width);
    };

    let mut i = 0;
    while i < w.len() {
        let Some(start) = number(resolve(doc, &w[i])) else {
            break;
        };
        match w.get(i + 1).map(|o| resolve(doc, o)) {
            // c [w1 w2 ...]
            Some(Object::Array(run)) => {
                for (j, width) in run.iter().enumerate() {
                    if let Some(width) = number(resolve(doc, width)) {
                        widths.codes.insert(start as u32 + j as u32, width);
                    }
                }
                i += 2;
            }
            // c_first c_last w
            Some(end) => {
                let (Some(end), Some(width)) = (
                    number(end),
                    w.get(i + 2).map(|o| resolve(doc, o)).and_then(number),
                ) else {
                    break;
                };
                if end >= start {
                    widths.ranges.push(WidthRange {
                        first: start as u32,
                        last: end as u32,
                        width,
                    });
                }
                i += 3;
            }
            None => break,
        }
    }

    (widths, default_width)
}
