#![allow(dead_code)]

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use pdf_image_compressor::render::{check_page_number, scaled_dimensions};
use pdf_image_compressor::{CompressError, PageRasterizer, RasterDocument, RenderedPage, Result};

/// Media box width and height of every page, in page order. The box may be
/// inherited from an ancestor in the page tree.
pub fn page_sizes(bytes: &[u8]) -> Result<Vec<(f32, f32)>> {
    let parse = |e: lopdf::Error| CompressError::Parse(e.to_string());
    let doc = Document::load_mem(bytes).map_err(parse)?;
    doc.get_pages()
        .values()
        .map(|&page_id| {
            let coords = media_box(&doc, page_id).map_err(parse)?;
            match coords.as_slice() {
                [x0, y0, x1, y1] => Ok((x1 - x0, y1 - y0)),
                _ => Err(CompressError::Parse(format!(
                    "page {} has a malformed MediaBox",
                    page_id.0
                ))),
            }
        })
        .collect()
}

fn media_box(doc: &Document, page_id: ObjectId) -> lopdf::Result<Vec<f32>> {
    let mut node = doc.get_dictionary(page_id)?;
    loop {
        if let Ok(obj) = node.get(b"MediaBox") {
            let (_, array) = doc.dereference(obj)?;
            return Ok(array
                .as_array()?
                .iter()
                .filter_map(|o| o.as_float().ok())
                .collect());
        }
        node = doc.get_dictionary(node.get(b"Parent")?.as_reference()?)?;
    }
}

/// Moves every page's MediaBox up to the page tree root.
pub fn hoist_media_box(bytes: &[u8]) -> Vec<u8> {
    let mut doc = Document::load_mem(bytes).expect("parse fixture PDF");
    let pages_id = doc
        .catalog()
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(|obj| obj.as_reference())
        .expect("page tree root");
    let mut media_box = None;
    for page_id in doc.get_pages().into_values() {
        let page = doc.get_dictionary_mut(page_id).expect("page dictionary");
        media_box = page.remove(b"MediaBox");
    }
    doc.get_dictionary_mut(pages_id)
        .expect("pages dictionary")
        .set("MediaBox", media_box.expect("fixture has pages"));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).expect("save fixture PDF");
    buffer
}

/// Renders every page as a smooth gradient sized from its MediaBox.
#[derive(Default)]
pub struct GradientRasterizer {
    pub fail_on_page: Option<usize>,
}

struct GradientDocument {
    sizes: Vec<(f32, f32)>,
    fail_on_page: Option<usize>,
}

impl PageRasterizer for GradientRasterizer {
    fn open<'a>(&'a self, bytes: &'a [u8]) -> Result<Box<dyn RasterDocument + 'a>> {
        Ok(Box::new(GradientDocument {
            sizes: page_sizes(bytes)?,
            fail_on_page: self.fail_on_page,
        }))
    }
}

impl RasterDocument for GradientDocument {
    fn page_count(&self) -> usize {
        self.sizes.len()
    }

    fn render_page(&self, page_number: usize, scale: f32) -> Result<RenderedPage> {
        check_page_number(page_number, self.page_count())?;
        if self.fail_on_page == Some(page_number) {
            return Err(CompressError::Render {
                page: page_number,
                message: "unsupported filter".to_string(),
            });
        }
        let (w, h) = self.sizes[page_number - 1];
        let (width, height) = scaled_dimensions(w, h, scale);
        let image = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 255 / width) as u8, (y * 255 / height) as u8, 128])
        });
        Ok(RenderedPage {
            page_number,
            width,
            height,
            image: DynamicImage::ImageRgb8(image),
        })
    }
}

/// Deterministic noise; compresses badly under both Flate and JPEG.
pub fn noise(len: usize, seed: u32) -> Vec<u8> {
    let mut state = seed | 1;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        })
        .collect()
}

/// A PDF with pages of the given point sizes. With `payload > 0` every page
/// also draws an uncompressed noise image of about that many bytes.
pub fn build_pdf(pages: &[(i64, i64)], payload: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();

    for (index, &(w, h)) in pages.iter().enumerate() {
        let mut resources = lopdf::Dictionary::new();
        let content = if payload > 0 {
            let side = (payload as f64).sqrt().ceil() as i64;
            let samples = noise((side * side) as usize, index as u32 + 7);
            let image_id = doc.add_object(
                Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => Object::Integer(side),
                        "Height" => Object::Integer(side),
                        "ColorSpace" => "DeviceGray",
                        "BitsPerComponent" => Object::Integer(8),
                    },
                    samples,
                )
                .with_compression(false),
            );
            resources.set("XObject", dictionary! { "Im0" => image_id });
            format!("q {} 0 0 {} 0 0 cm /Im0 Do Q", w, h)
        } else {
            format!("0 0 m {} {} l S", w, h)
        };
        let content_id =
            doc.add_object(Stream::new(lopdf::Dictionary::new(), content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(w),
                Object::Integer(h),
            ],
            "Contents" => content_id,
            "Resources" => resources,
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(count),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).expect("save fixture PDF");
    buffer
}

pub fn textured_image(width: u32, height: u32) -> DynamicImage {
    let grain = noise((width * height) as usize, 99);
    let img = RgbImage::from_fn(width, height, |x, y| {
        let n = grain[(y * width + x) as usize] / 3;
        Rgb([
            ((x * 7) % 256) as u8 ^ n,
            ((y * 5) % 256) as u8 ^ n,
            ((x + y) % 256) as u8,
        ])
    });
    DynamicImage::ImageRgb8(img)
}

pub fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format).expect("encode fixture image");
    out.into_inner()
}

/// Dictionaries of all image XObjects in a PDF.
pub fn image_dictionaries(bytes: &[u8]) -> Vec<lopdf::Dictionary> {
    let doc = Document::load_mem(bytes).expect("reparse output PDF");
    doc.objects
        .values()
        .filter_map(|obj| match obj {
            Object::Stream(s) => Some(s.dict.clone()),
            _ => None,
        })
        .filter(|dict| {
            dict.get(b"Subtype")
                .and_then(|o| o.as_name())
                .map(|n| n == b"Image")
                .unwrap_or(false)
        })
        .collect()
}
