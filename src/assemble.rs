//! Builds image-only PDFs with lopdf: one page per image, page size equal to
//! the image size in points, image drawn from the origin over the whole page.

use std::io::Write;

use image::DynamicImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, SaveOptions, Stream};

use crate::error::{CompressError, Result};
use crate::raster::{CompressedImage, JpegColor};

pub struct PdfAssembler {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
}

impl Default for PdfAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfAssembler {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Appends a page showing an already encoded JPEG (embedded as DCTDecode).
    pub fn add_jpeg_page(&mut self, jpeg: &CompressedImage) -> Result<()> {
        let color_space = match jpeg.color {
            JpegColor::Gray => "DeviceGray",
            JpegColor::Rgb => "DeviceRGB",
        };
        let stream = Stream::new(
            image_dictionary(jpeg.width, jpeg.height, color_space, "DCTDecode"),
            jpeg.bytes.clone(),
        )
        .with_compression(false);
        let image_id = self.doc.add_object(stream);
        self.add_page(image_id, jpeg.width, jpeg.height)
    }

    /// Appends a page showing `img` losslessly: Flate-compressed samples, with
    /// the alpha channel as a soft mask when present.
    pub fn add_lossless_page(&mut self, img: &DynamicImage) -> Result<()> {
        let (width, height) = (img.width(), img.height());
        let color = img.color();

        let (color_space, samples) = if color.has_color() {
            ("DeviceRGB", img.to_rgb8().into_raw())
        } else {
            ("DeviceGray", img.to_luma8().into_raw())
        };

        let mut dict = image_dictionary(width, height, color_space, "FlateDecode");

        if color.has_alpha() {
            let alpha: Vec<u8> = img.to_rgba8().pixels().map(|p| p[3]).collect();
            let mask = Stream::new(
                image_dictionary(width, height, "DeviceGray", "FlateDecode"),
                deflate(&alpha)?,
            )
            .with_compression(false);
            let mask_id = self.doc.add_object(mask);
            dict.set("SMask", mask_id);
        }

        let stream = Stream::new(dict, deflate(&samples)?).with_compression(false);
        let image_id = self.doc.add_object(stream);
        self.add_page(image_id, width, height)
    }

    fn add_page(&mut self, image_id: ObjectId, width: u32, height: u32) -> Result<()> {
        let (w, h) = (width as i64, height as i64);
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Integer(w),
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Integer(h),
                        Object::Integer(0),
                        Object::Integer(0),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = self
            .doc
            .add_object(Stream::new(lopdf::Dictionary::new(), content.encode()?));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(w),
                Object::Integer(h),
            ],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    "Im0" => image_id,
                },
            },
        });
        self.kids.push(Object::Reference(page_id));
        Ok(())
    }

    /// Writes the page tree and catalog and serializes the document.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        let count = self.kids.len() as i64;
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => self.kids,
            "Count" => Object::Integer(count),
        };
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.compress();

        save_with_object_streams(&mut self.doc)
    }
}

fn image_dictionary(
    width: u32,
    height: u32,
    color_space: &str,
    filter: &str,
) -> lopdf::Dictionary {
    dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => Object::Integer(width as i64),
        "Height" => Object::Integer(height as i64),
        "ColorSpace" => Object::Name(color_space.as_bytes().to_vec()),
        "BitsPerComponent" => Object::Integer(8),
        "Filter" => Object::Name(filter.as_bytes().to_vec()),
    }
}

fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::best());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Serializes with object streams and a cross-reference stream.
pub fn save_with_object_streams(doc: &mut Document) -> Result<Vec<u8>> {
    // Object streams need PDF 1.5.
    if doc.version.as_str() < "1.5" {
        doc.version = "1.5".to_string();
    }
    let options = SaveOptions::builder()
        .use_object_streams(true)
        .use_xref_streams(true)
        .build();
    let mut buffer = Vec::new();
    doc.save_with_options(&mut buffer, options)
        .map_err(|e| CompressError::Save(e.to_string()))?;
    Ok(buffer)
}
