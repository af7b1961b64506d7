//! Rasterizer for scanned PDFs that reuses each page's embedded image.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, GrayImage, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, trace};

use super::{Rasterizer, Result};
use crate::error::RenderError;
use crate::models::pixels::PixelBuffer;

/// US Letter in points, used when a page declares no MediaBox.
const DEFAULT_PAGE_SIZE: (f32, f32) = (612.0, 792.0);

/// Rasterizer for image-only PDFs, backed by lopdf.
///
/// The largest image on a page is resized to the size a renderer would
/// produce for that page (MediaBox points × scale), so OCR coordinates stay
/// comparable with [`PdfiumRasterizer`](super::PdfiumRasterizer) output.
#[derive(Debug, Default, Clone)]
pub struct EmbeddedImageRasterizer;

impl EmbeddedImageRasterizer {
    pub fn new() -> Self {
        Self
    }

    fn load(&self, data: &[u8]) -> Result<Document> {
        let mut doc = Document::load_mem(data).map_err(|e| RenderError::Parse(e.to_string()))?;

        if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(RenderError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");
        }

        Ok(doc)
    }

    fn page_images(&self, doc: &Document, page_id: ObjectId) -> Vec<DynamicImage> {
        let mut images = Vec::new();

        let Some(resources) = lookup_inherited(doc, page_id, b"Resources") else {
            return images;
        };
        let Ok(xobjects) = resources.get(b"XObject") else {
            return images;
        };
        if let Ok((_, Object::Dictionary(xobj_dict))) = doc.dereference(xobjects) {
            for (_name, obj_ref) in xobj_dict.iter() {
                if let Ok((_, obj)) = doc.dereference(obj_ref) {
                    if let Some(img) = decode_image_object(doc, obj) {
                        images.push(img);
                    }
                }
            }
        }

        images
    }
}

impl Rasterizer for EmbeddedImageRasterizer {
    fn page_count(&self, data: &[u8]) -> Result<usize> {
        Ok(self.load(data)?.get_pages().len())
    }

    fn render_page(&self, data: &[u8], index: usize, scale: f32) -> Result<PixelBuffer> {
        let doc = self.load(data)?;
        let pages = doc.get_pages();
        let page_id = *pages
            .get(&(index as u32 + 1))
            .ok_or(RenderError::InvalidPage {
                index,
                count: pages.len(),
            })?;

        let image = self
            .page_images(&doc, page_id)
            .into_iter()
            .max_by_key(|img| img.width() as u64 * img.height() as u64)
            .ok_or_else(|| RenderError::Rasterize {
                index,
                reason: "page has no decodable embedded image".to_string(),
            })?;

        let (page_w, page_h) = media_box_size(&doc, page_id).unwrap_or(DEFAULT_PAGE_SIZE);
        let width = (page_w * scale).round().max(1.0) as u32;
        let height = (page_h * scale).round().max(1.0) as u32;

        debug!(
            "Page {}: embedded image {}x{} -> {}x{}",
            index,
            image.width(),
            image.height(),
            width,
            height
        );

        let resized = image.resize_exact(width, height, FilterType::Triangle);
        Ok(PixelBuffer::from_rgb_image(resized.to_rgb8()))
    }
}

/// Look up `key` on a page node, walking up the page tree for inherited
/// attributes.
fn lookup_inherited(doc: &Document, node_id: ObjectId, key: &[u8]) -> Option<Dictionary> {
    let node = doc.get_object(node_id).ok()?;
    let Object::Dictionary(dict) = node else {
        return None;
    };

    if let Ok(value) = dict.get(key) {
        if let Ok((_, Object::Dictionary(found))) = doc.dereference(value) {
            return Some(found.clone());
        }
    }

    match dict.get(b"Parent") {
        Ok(Object::Reference(parent_id)) => lookup_inherited(doc, *parent_id, key),
        _ => None,
    }
}

/// Width and height of the page's MediaBox in points.
fn media_box_size(doc: &Document, node_id: ObjectId) -> Option<(f32, f32)> {
    let Object::Dictionary(dict) = doc.get_object(node_id).ok()? else {
        return None;
    };

    if let Ok(value) = dict.get(b"MediaBox") {
        if let Ok((_, Object::Array(bounds))) = doc.dereference(value) {
            let nums: Vec<f32> = bounds.iter().filter_map(number).collect();
            if let &[x0, y0, x1, y1] = nums.as_slice() {
                return Some(((x1 - x0).abs(), (y1 - y0).abs()));
            }
        }
    }

    match dict.get(b"Parent") {
        Ok(Object::Reference(parent_id)) => media_box_size(doc, *parent_id),
        _ => None,
    }
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

fn decode_image_object(doc: &Document, obj: &Object) -> Option<DynamicImage> {
    let Object::Stream(stream) = obj else {
        return None;
    };
    let dict = &stream.dict;

    if dict.get(b"Subtype").ok()?.as_name().ok()? != b"Image" {
        return None;
    }

    let width = dict.get(b"Width").ok()?.as_i64().ok()? as u32;
    let height = dict.get(b"Height").ok()?.as_i64().ok()? as u32;
    trace!("Found image object: {}x{}", width, height);

    let filter = dict.get(b"Filter").ok().and_then(|filter| match filter {
        Object::Name(name) => Some(name.as_slice()),
        Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
        _ => None,
    });

    match filter {
        Some(b"DCTDecode") => {
            return image::load_from_memory_with_format(&stream.content, image::ImageFormat::Jpeg).ok();
        }
        Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
            trace!("Unsupported image filter");
            return None;
        }
        _ => {}
    }

    let data = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());

    let color_space = dict
        .get(b"ColorSpace")
        .ok()
        .and_then(|o| match o {
            Object::Name(name) => Some(name.as_slice()),
            Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
            Object::Reference(r) => doc.get_object(*r).ok().and_then(|o| o.as_name().ok()),
            _ => None,
        })
        .unwrap_or(b"DeviceRGB");

    let bits = dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(8);

    decode_raw(&data, width, height, color_space, bits)
}

fn decode_raw(data: &[u8], width: u32, height: u32, color_space: &[u8], bits: i64) -> Option<DynamicImage> {
    if bits != 8 {
        trace!("Unsupported bits per component: {}", bits);
        return None;
    }

    let pixels = width as usize * height as usize;
    match color_space {
        b"DeviceRGB" | b"RGB" if data.len() >= pixels * 3 => {
            RgbImage::from_raw(width, height, data[..pixels * 3].to_vec()).map(DynamicImage::ImageRgb8)
        }
        b"DeviceGray" | b"G" if data.len() >= pixels => {
            GrayImage::from_raw(width, height, data[..pixels].to_vec()).map(DynamicImage::ImageLuma8)
        }
        _ => {
            trace!(
                "Could not decode image: data_len={}, colorspace={:?}",
                data.len(),
                String::from_utf8_lossy(color_space)
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{Stream, dictionary};
    use pretty_assertions::assert_eq;

    /// One 72x36 point page showing a 4x2 gray image.
    fn scanned_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let image = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 4,
                "Height" => 2,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            vec![200u8; 8],
        );
        let image_id = doc.add_object(image);

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 72.into(), 36.into()],
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => image_id },
            },
        });

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_page_count() {
        let rasterizer = EmbeddedImageRasterizer::new();
        assert_eq!(rasterizer.page_count(&scanned_pdf()).unwrap(), 1);
    }

    #[test]
    fn test_render_scales_to_media_box() {
        let rasterizer = EmbeddedImageRasterizer::new();
        let buffer = rasterizer.render_page(&scanned_pdf(), 0, 2.0).unwrap();
        assert_eq!((buffer.width(), buffer.height()), (144, 72));
    }

    #[test]
    fn test_invalid_bytes() {
        let rasterizer = EmbeddedImageRasterizer::new();
        assert!(matches!(
            rasterizer.page_count(b"not a pdf"),
            Err(RenderError::Parse(_))
        ));
    }

    #[test]
    fn test_page_out_of_range() {
        let rasterizer = EmbeddedImageRasterizer::new();
        let err = rasterizer.render_page(&scanned_pdf(), 3, 1.0).unwrap_err();
        assert!(matches!(err, RenderError::InvalidPage { index: 3, count: 1 }));
    }
}
