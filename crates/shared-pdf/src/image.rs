//! Signature image sniffing and conversion to PDF image XObjects

use crate::error::PdfError;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::codecs::jpeg::JpegDecoder;
use image::ImageDecoder;
use lopdf::{dictionary, Dictionary, Object, Stream};
use shared_types::ImageFormat;
use std::io::{Cursor, Write};

const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'];
const JPEG_SOI: [u8; 3] = [0xFF, 0xD8, 0xFF];

/// How far into the data to look for a JFIF/Exif tag
const JPEG_TAG_WINDOW: usize = 20;

/// Identify an image by its content, never by file extension
pub fn identify_image_format(data: &[u8]) -> ImageFormat {
    if data.starts_with(&PNG_MAGIC) {
        return ImageFormat::Png;
    }
    if data.starts_with(&JPEG_SOI) {
        return ImageFormat::Jpeg;
    }
    let head = &data[..data.len().min(JPEG_TAG_WINDOW)];
    if contains(head, b"JFIF") || contains(head, b"Exif") {
        return ImageFormat::Jpeg;
    }
    ImageFormat::Unknown
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// An image ready to be added to a document
#[derive(Debug)]
pub struct PdfImage {
    pub width: u32,
    pub height: u32,
    pub stream: Stream,
    /// Soft mask carrying the alpha channel, if the source had one
    pub soft_mask: Option<Stream>,
}

/// Convert raster bytes into an image XObject stream
pub fn to_pdf_image(data: &[u8], format: ImageFormat) -> Result<PdfImage, PdfError> {
    match format {
        ImageFormat::Png => png_image(data),
        ImageFormat::Jpeg => jpeg_image(data),
        ImageFormat::Unknown => Err(PdfError::Image("unsupported image format".to_string())),
    }
}

fn jpeg_image(data: &[u8]) -> Result<PdfImage, PdfError> {
    let decoder =
        JpegDecoder::new(Cursor::new(data)).map_err(|e| PdfError::Image(e.to_string()))?;
    let (width, height) = decoder.dimensions();

    // The decoder reports CMYK as RGB, so the frame header decides
    let layout = jpeg_layout(data)
        .ok_or_else(|| PdfError::Image("JPEG frame header not found".to_string()))?;

    Ok(PdfImage {
        width,
        height,
        stream: Stream::new(jpeg_dictionary(width, height, layout)?, data.to_vec()),
        soft_mask: None,
    })
}

fn jpeg_dictionary(width: u32, height: u32, layout: JpegLayout) -> Result<Dictionary, PdfError> {
    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => i64::from(width),
        "Height" => i64::from(height),
        "BitsPerComponent" => 8,
        "Filter" => "DCTDecode",
    };
    match layout.components {
        1 => dict.set("ColorSpace", "DeviceGray"),
        3 => dict.set("ColorSpace", "DeviceRGB"),
        4 => {
            dict.set("ColorSpace", "DeviceCMYK");
            // Adobe writes CMYK and YCCK JPEGs with inverted samples
            if layout.adobe {
                let decode = [1, 0, 1, 0, 1, 0, 1, 0].map(Object::Integer).to_vec();
                dict.set("Decode", Object::Array(decode));
            }
        }
        n => {
            return Err(PdfError::Image(format!(
                "unsupported JPEG with {} color components",
                n
            )))
        }
    }
    Ok(dict)
}

/// What the JPEG marker segments say about the sample layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct JpegLayout {
    components: u8,
    /// An Adobe APP14 segment precedes the frame
    adobe: bool,
}

/// Walk the marker segments up to the first frame header (SOFn)
fn jpeg_layout(data: &[u8]) -> Option<JpegLayout> {
    let mut adobe = false;
    let mut pos = 2;
    if !data.starts_with(&JPEG_SOI[..2]) {
        return None;
    }

    loop {
        if *data.get(pos)? != 0xFF {
            return None;
        }
        let marker = *data.get(pos + 1)?;
        pos += 2;
        match marker {
            // Fill bytes
            0xFF => pos -= 1,
            // Standalone markers carry no length
            0x01 | 0xD0..=0xD7 => {}
            // Start of scan or end of image before any frame
            0xDA | 0xD9 => return None,
            _ => {
                let len = usize::from(u16::from_be_bytes([*data.get(pos)?, *data.get(pos + 1)?]));
                if len < 2 {
                    return None;
                }
                let body = data.get(pos + 2..pos + len)?;
                match marker {
                    0xC0..=0xCF if !matches!(marker, 0xC4 | 0xC8 | 0xCC) => {
                        // precision, height, width, component count
                        return body.get(5).map(|&components| JpegLayout { components, adobe });
                    }
                    0xEE if body.starts_with(b"Adobe") => adobe = true,
                    _ => {}
                }
                pos += len;
            }
        }
    }
}

fn png_image(data: &[u8]) -> Result<PdfImage, PdfError> {
    let mut decoder = png::Decoder::new(Cursor::new(data));
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder
        .read_info()
        .map_err(|e| PdfError::Image(e.to_string()))?;
    let mut buffer = vec![0; reader.output_buffer_size()];
    let info = reader
        .next_frame(&mut buffer)
        .map_err(|e| PdfError::Image(e.to_string()))?;
    let pixels = &buffer[..info.buffer_size()];

    let (color, alpha, color_space) = split_channels(pixels, info.color_type);

    let stream = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(info.width),
            "Height" => i64::from(info.height),
            "ColorSpace" => color_space,
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
        },
        deflate(&color)?,
    );

    let soft_mask = match alpha {
        Some(alpha) => Some(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(info.width),
                "Height" => i64::from(info.height),
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
                "Filter" => "FlateDecode",
            },
            deflate(&alpha)?,
        )),
        None => None,
    };

    Ok(PdfImage {
        width: info.width,
        height: info.height,
        stream,
        soft_mask,
    })
}

/// Separate 8-bit pixels into color samples and an optional alpha plane
fn split_channels(
    pixels: &[u8],
    color_type: png::ColorType,
) -> (Vec<u8>, Option<Vec<u8>>, &'static str) {
    match color_type {
        png::ColorType::Rgba => {
            let mut rgb = Vec::with_capacity(pixels.len() / 4 * 3);
            let mut alpha = Vec::with_capacity(pixels.len() / 4);
            for px in pixels.chunks_exact(4) {
                rgb.extend_from_slice(&px[..3]);
                alpha.push(px[3]);
            }
            (rgb, opaque_or(alpha), "DeviceRGB")
        }
        png::ColorType::GrayscaleAlpha => {
            let mut gray = Vec::with_capacity(pixels.len() / 2);
            let mut alpha = Vec::with_capacity(pixels.len() / 2);
            for px in pixels.chunks_exact(2) {
                gray.push(px[0]);
                alpha.push(px[1]);
            }
            (gray, opaque_or(alpha), "DeviceGray")
        }
        png::ColorType::Grayscale => (pixels.to_vec(), None, "DeviceGray"),
        // EXPAND turns indexed images into RGB(A)
        _ => (pixels.to_vec(), None, "DeviceRGB"),
    }
}

/// Drop an alpha plane that is fully opaque
fn opaque_or(alpha: Vec<u8>) -> Option<Vec<u8>> {
    if alpha.iter().all(|&a| a == u8::MAX) {
        None
    } else {
        Some(alpha)
    }
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, PdfError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| PdfError::Image(e.to_string()))?;
    encoder.finish().map_err(|e| PdfError::Image(e.to_string()))
}

/// Point an image XObject at its soft mask object
pub(crate) fn attach_soft_mask(image: &mut Stream, mask_id: lopdf::ObjectId) {
    image.dict.set("SMask", Object::Reference(mask_id));
}
