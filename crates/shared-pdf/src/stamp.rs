//! Signature image embedding
//!
//! The image becomes an XObject registered in the target page's resources
//! and drawn by a content stream appended after the page's own content.
//! The original content is wrapped in `q`/`Q` first so any graphics state
//! it leaves behind cannot skew the stamp.

use crate::error::PdfError;
use crate::fonts::resolve;
use crate::image::{attach_soft_mask, to_pdf_image};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use shared_types::{ImageFormat, PageIndex, PlacementRect};
use tracing::debug;

const XOBJECT_PREFIX: &str = "ImSig";

/// Writes a raster image onto one page of a document
pub trait DocumentMutator {
    /// Draw `image` into `rect` on the page at `page` and serialize the result.
    ///
    /// The input bytes are never modified; a new document is returned.
    fn embed_image(
        &self,
        document: &[u8],
        image: &[u8],
        format: ImageFormat,
        rect: &PlacementRect,
        page: PageIndex,
    ) -> Result<Vec<u8>, PdfError>;
}

/// [`DocumentMutator`] that adds an image XObject with lopdf
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfStamper;

impl LopdfStamper {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentMutator for LopdfStamper {
    fn embed_image(
        &self,
        document: &[u8],
        image: &[u8],
        format: ImageFormat,
        rect: &PlacementRect,
        page: PageIndex,
    ) -> Result<Vec<u8>, PdfError> {
        let mut doc = Document::load_mem(document).map_err(|e| PdfError::Parse(e.to_string()))?;

        let pages = doc.get_pages();
        let page_id = page
            .to_number()
            .ok()
            .and_then(|number| pages.get(&number.get()))
            .copied()
            .ok_or(PdfError::PageOutOfRange {
                index: page.get(),
                page_count: pages.len(),
            })?;

        let mut pdf_image = to_pdf_image(image, format)?;
        if let Some(mask) = pdf_image.soft_mask.take() {
            let mask_id = doc.add_object(mask);
            attach_soft_mask(&mut pdf_image.stream, mask_id);
        }
        let image_id = doc.add_object(pdf_image.stream);

        let name = register_xobject(&mut doc, page_id, image_id)?;
        append_draw_stream(&mut doc, page_id, &name, rect)?;
        debug!(
            "Embedded {}x{} image as /{} on page index {}",
            pdf_image.width, pdf_image.height, name, page
        );

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer)
            .map_err(|e| PdfError::Serialization(e.to_string()))?;
        Ok(buffer)
    }
}

fn page_dict(doc: &Document, page_id: ObjectId) -> Result<&Dictionary, PdfError> {
    doc.get_dictionary(page_id)
        .map_err(|e| PdfError::Parse(format!("Failed to get page object: {}", e)))
}

/// Resources in effect for a page, resolved and copied.
///
/// Inherited resources are copied onto the page itself so the new XObject
/// entry never leaks into sibling pages.
fn effective_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    let mut current = Some(page_id);
    let mut depth = 0;

    while let Some(id) = current {
        let Ok(node) = doc.get_dictionary(id) else {
            break;
        };
        if let Some(resources) = node
            .get(b"Resources")
            .ok()
            .map(|r| resolve(doc, r))
            .and_then(|r| r.as_dict().ok())
        {
            return resources.clone();
        }
        depth += 1;
        if depth > 32 {
            break;
        }
        current = node.get(b"Parent").and_then(|p| p.as_reference()).ok();
    }
    Dictionary::new()
}

/// Add `image_id` to the page's `/XObject` resources under an unused name
fn register_xobject(
    doc: &mut Document,
    page_id: ObjectId,
    image_id: ObjectId,
) -> Result<String, PdfError> {
    let mut resources = effective_resources(doc, page_id);

    let mut xobjects = resources
        .get(b"XObject")
        .ok()
        .map(|x| resolve(doc, x))
        .and_then(|x| x.as_dict().ok())
        .cloned()
        .unwrap_or_else(Dictionary::new);

    let name = (1..)
        .map(|n| format!("{}{}", XOBJECT_PREFIX, n))
        .find(|candidate| !xobjects.has(candidate.as_bytes()))
        .unwrap_or_else(|| XOBJECT_PREFIX.to_string());

    xobjects.set(name.as_bytes(), Object::Reference(image_id));
    resources.set("XObject", Object::Dictionary(xobjects));

    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| PdfError::Parse(format!("Page is not a dictionary: {}", e)))?;
    page.set("Resources", Object::Dictionary(resources));

    Ok(name)
}

/// Existing content streams of a page, as a flat list of objects
fn existing_contents(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>, PdfError> {
    let page = page_dict(doc, page_id)?;
    let contents = match page.get(b"Contents") {
        Ok(contents) => contents,
        Err(_) => return Ok(Vec::new()),
    };
    let items = match contents {
        Object::Array(items) => items.clone(),
        Object::Reference(id) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![contents.clone()],
        },
        other => vec![other.clone()],
    };
    Ok(items)
}

fn draw_operations(name: &str, rect: &PlacementRect) -> String {
    format!(
        "Q\nq\n{w} 0 0 {h} {x} {y} cm\n/{name} Do\nQ\n",
        w = rect.width,
        h = rect.height,
        x = rect.x,
        y = rect.y,
        name = name,
    )
}

fn append_draw_stream(
    doc: &mut Document,
    page_id: ObjectId,
    name: &str,
    rect: &PlacementRect,
) -> Result<(), PdfError> {
    let existing = existing_contents(doc, page_id)?;

    let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let draw_id = doc.add_object(Stream::new(
        Dictionary::new(),
        draw_operations(name, rect).into_bytes(),
    ));

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(save_id));
    contents.extend(existing);
    contents.push(Object::Reference(draw_id));

    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| PdfError::Parse(format!("Page is not a dictionary: {}", e)))?;
    page.set("Contents", Object::Array(contents));
    Ok(())
}
