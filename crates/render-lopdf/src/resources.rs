//! Fonts and images shared by every page through one resource dictionary.

use crate::writer::StreamingPdfWriter;
use folio_layout::{LaidOutPage, LayoutElement};
use folio_traits::{ImageData, ImageFilter};
use lopdf::{Dictionary, Object, Stream, dictionary};
use std::collections::{BTreeMap, BTreeSet};
use std::io::{Seek, Write};

#[derive(Debug, Default)]
pub(crate) struct ResourceRegistry {
    /// PostScript name → resource name (`F1`, `F2`, ...).
    fonts: BTreeMap<&'static str, String>,
    /// Image source → resource name (`Im1`, ...), for images with samples.
    images: BTreeMap<String, String>,
}

impl ResourceRegistry {
    /// Names every face and image the pages use. Names are assigned in sorted
    /// order so the same pages always produce the same resources.
    pub fn collect(pages: &[LaidOutPage]) -> Self {
        let mut faces = BTreeSet::new();
        let mut sources = BTreeSet::new();
        for el in pages.iter().flat_map(|p| &p.elements) {
            match &el.element {
                LayoutElement::Text(_) => {
                    faces.insert(el.style.font_spec().base_font());
                }
                LayoutElement::Image(image) if image.data.is_some() => {
                    sources.insert(image.src.clone());
                }
                _ => {}
            }
        }
        Self {
            fonts: faces.into_iter().enumerate().map(|(i, f)| (f, format!("F{}", i + 1))).collect(),
            images: sources.into_iter().enumerate().map(|(i, s)| (s, format!("Im{}", i + 1))).collect(),
        }
    }

    pub fn font_name(&self, base_font: &str) -> Option<&str> {
        self.fonts.get(base_font).map(String::as_str)
    }

    pub fn image_name(&self, src: &str) -> Option<&str> {
        self.images.get(src).map(String::as_str)
    }

    /// Writes the image XObjects and the shared resource dictionary.
    pub fn write<W: Write + Seek>(&self, writer: &mut StreamingPdfWriter<W>, pages: &[LaidOutPage]) {
        let mut font_dict = Dictionary::new();
        for (base_font, name) in &self.fonts {
            let face = dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => *base_font,
                "Encoding" => "WinAnsiEncoding",
            };
            font_dict.set(name.as_bytes(), Object::Dictionary(face));
        }

        let mut xobjects = Dictionary::new();
        let mut written = BTreeSet::new();
        for el in pages.iter().flat_map(|p| &p.elements) {
            let LayoutElement::Image(image) = &el.element else { continue };
            let (Some(data), Some(name)) = (&image.data, self.images.get(&image.src)) else { continue };
            if written.insert(name.clone()) {
                let id = writer.buffer_object(Object::Stream(image_stream(data)));
                xobjects.set(name.as_bytes(), id);
            }
        }

        let mut resources = dictionary! { "Font" => font_dict };
        if !xobjects.is_empty() {
            resources.set("XObject", xobjects);
        }
        writer.buffer_object_at_id(writer.resources_id, resources.into());
        log::debug!("Resources: {} fonts, {} images", self.fonts.len(), written.len());
    }
}

fn image_stream(data: &ImageData) -> Stream {
    let color_space = if data.components == 1 { "DeviceGray" } else { "DeviceRGB" };
    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => data.width as i64,
        "Height" => data.height as i64,
        "ColorSpace" => color_space,
        "BitsPerComponent" => data.bits_per_component as i64,
    };
    if data.filter == ImageFilter::Dct {
        dict.set("Filter", "DCTDecode");
    }
    Stream::new(dict, data.bytes.as_ref().clone())
}
