//! [`PdfSource`] backed by lopdf.
//!
//! Overlays are appended as extra content streams. The page's original
//! streams are wrapped in a `q`/`Q` pair first, so any graphics state they
//! leave behind cannot leak into the overlay.

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use super::content::{self, FONT_BOLD, FONT_REGULAR};
use super::{PageBox, PdfCanvas, PdfError, PdfSource};
use crate::render::{RasterImage, Surface};

/// Default page box when a page carries no usable MediaBox (US Letter).
const FALLBACK_BOX: PageBox = PageBox {
    x: 0.0,
    y: 0.0,
    width: 612.0,
    height: 792.0,
    rotation: 0,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfSource;

impl PdfSource for LopdfSource {
    fn open(&self, bytes: &[u8]) -> Result<Box<dyn PdfCanvas>, PdfError> {
        let doc = Document::load_mem(bytes).map_err(|e| PdfError::Parse(e.to_string()))?;
        if doc.is_encrypted() {
            return Err(PdfError::Encrypted);
        }
        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        tracing::debug!(pages = pages.len(), bytes = bytes.len(), "PDF opened");
        Ok(Box::new(LopdfCanvas {
            doc,
            pages,
            fonts: None,
            image_count: 0,
        }))
    }
}

pub struct LopdfCanvas {
    doc: Document,
    pages: Vec<ObjectId>,
    fonts: Option<(ObjectId, ObjectId)>,
    image_count: usize,
}

fn obj_to_f64(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(f) => Some((*f).into()),
        _ => None,
    }
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// Look up `key` on the page, then up the page tree for inheritable keys.
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = Some(page_id);
    let mut depth = 0;
    while let Some(id) = current {
        let dict = doc.get_dictionary(id).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(resolve(doc, value));
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
        depth += 1;
        if depth > 64 {
            return None;
        }
    }
    None
}

/// Rectangle stored under `key` (MediaBox, CropBox), normalized so that
/// (x, y) is the lower-left corner.
fn box_entry(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<PageBox> {
    let arr = inherited(doc, page_id, key)?.as_array().ok()?;
    if arr.len() != 4 {
        return None;
    }
    let coords: Vec<f64> = arr
        .iter()
        .map(|o| obj_to_f64(resolve(doc, o)))
        .collect::<Option<_>>()?;
    let (llx, urx) = (coords[0].min(coords[2]), coords[0].max(coords[2]));
    let (lly, ury) = (coords[1].min(coords[3]), coords[1].max(coords[3]));
    if urx - llx <= 0.0 || ury - lly <= 0.0 {
        return None;
    }
    Some(PageBox {
        x: llx,
        y: lly,
        width: urx - llx,
        height: ury - lly,
        rotation: 0,
    })
}

fn intersect(a: PageBox, b: PageBox) -> Option<PageBox> {
    let (llx, lly) = (a.x.max(b.x), a.y.max(b.y));
    let urx = (a.x + a.width).min(b.x + b.width);
    let ury = (a.y + a.height).min(b.y + b.height);
    (urx > llx && ury > lly).then(|| PageBox {
        x: llx,
        y: lly,
        width: urx - llx,
        height: ury - lly,
        rotation: 0,
    })
}

/// Inherited `/Rotate`, folded into 0..360. Values that are not a multiple
/// of 90 are ignored, as viewers do.
fn rotation(doc: &Document, page_id: ObjectId) -> u16 {
    let degrees = inherited(doc, page_id, b"Rotate")
        .and_then(obj_to_f64)
        .map(|d| d as i64)
        .unwrap_or(0);
    match degrees.rem_euclid(360) {
        90 => 90,
        180 => 180,
        270 => 270,
        _ => 0,
    }
}

/// Displayed page box: the CropBox clipped to the MediaBox, falling back to
/// the MediaBox, then to Letter.
fn page_box(doc: &Document, page_id: ObjectId) -> PageBox {
    let media = box_entry(doc, page_id, b"MediaBox").unwrap_or(FALLBACK_BOX);
    let visible = box_entry(doc, page_id, b"CropBox")
        .and_then(|crop| intersect(crop, media))
        .unwrap_or(media);
    PageBox {
        rotation: rotation(doc, page_id),
        ..visible
    }
}

/// Owned copy of a sub-dictionary of `resources`, following references.
fn owned_subdict(doc: &Document, resources: &Dictionary, key: &[u8]) -> Dictionary {
    resources
        .get(key)
        .ok()
        .map(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_dict().ok())
        .cloned()
        .unwrap_or_default()
}

impl LopdfCanvas {
    fn page_id(&self, page: usize) -> Result<ObjectId, PdfError> {
        self.pages.get(page).copied().ok_or(PdfError::PageOutOfRange {
            page,
            count: self.pages.len(),
        })
    }

    fn ensure_fonts(&mut self) -> (ObjectId, ObjectId) {
        if let Some(fonts) = self.fonts {
            return fonts;
        }
        let mut font = |base: &str| {
            self.doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => base,
                "Encoding" => "WinAnsiEncoding",
            })
        };
        let fonts = (font("Helvetica"), font("Helvetica-Bold"));
        self.fonts = Some(fonts);
        fonts
    }

    fn add_image(&mut self, image: &RasterImage) -> ObjectId {
        let smask_id = self.doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => image.width as i64,
                "Height" => image.height as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            image.alpha.clone(),
        ));
        self.doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => image.width as i64,
                "Height" => image.height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "SMask" => smask_id,
            },
            image.rgb.clone(),
        ))
    }

    /// Give the page its own resources dictionary with the overlay fonts
    /// and images merged in. Shared or inherited resources are copied, not
    /// edited in place.
    fn merge_resources(
        &mut self,
        page_id: ObjectId,
        fonts: Option<(ObjectId, ObjectId)>,
        images: &[(String, ObjectId)],
    ) -> Result<(), PdfError> {
        let mut resources = inherited(&self.doc, page_id, b"Resources")
            .and_then(|obj| obj.as_dict().ok())
            .cloned()
            .unwrap_or_default();

        if let Some((regular, bold)) = fonts {
            let mut font_dict = owned_subdict(&self.doc, &resources, b"Font");
            font_dict.set(FONT_REGULAR, regular);
            font_dict.set(FONT_BOLD, bold);
            resources.set("Font", font_dict);
        }
        if !images.is_empty() {
            let mut xobjects = owned_subdict(&self.doc, &resources, b"XObject");
            for (name, id) in images {
                xobjects.set(name.as_bytes().to_vec(), *id);
            }
            resources.set("XObject", xobjects);
        }

        let page = self
            .doc
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| PdfError::Structure(format!("page dictionary: {e}")))?;
        page.set("Resources", resources);
        Ok(())
    }

    /// Replace the page's Contents with `[q, original..., Q, overlay]`.
    fn wrap_contents(&mut self, page_id: ObjectId, overlay: Vec<u8>) -> Result<(), PdfError> {
        let existing: Vec<Object> = {
            let page = self
                .doc
                .get_dictionary(page_id)
                .map_err(|e| PdfError::Structure(format!("page dictionary: {e}")))?;
            match page.get(b"Contents") {
                Ok(Object::Array(items)) => items.clone(),
                Ok(Object::Reference(id)) => match self.doc.get_object(*id) {
                    Ok(Object::Array(items)) => items.clone(),
                    _ => vec![Object::Reference(*id)],
                },
                _ => Vec::new(),
            }
        };

        let open_id = self.doc.add_object(Stream::new(dictionary! {}, b"q\n".to_vec()));
        let close_id = self.doc.add_object(Stream::new(dictionary! {}, b"\nQ\n".to_vec()));
        let overlay_id = self.doc.add_object(Stream::new(dictionary! {}, overlay));

        let mut contents = Vec::with_capacity(existing.len() + 3);
        contents.push(Object::Reference(open_id));
        contents.extend(existing);
        contents.push(Object::Reference(close_id));
        contents.push(Object::Reference(overlay_id));

        let page = self
            .doc
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| PdfError::Structure(format!("page dictionary: {e}")))?;
        page.set("Contents", contents);
        Ok(())
    }
}

impl PdfCanvas for LopdfCanvas {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_bounds(&self, page: usize) -> Option<PageBox> {
        let id = *self.pages.get(page)?;
        Some(page_box(&self.doc, id))
    }

    fn draw_overlay(&mut self, page: usize, overlay: &Surface) -> Result<(), PdfError> {
        let page_id = self.page_id(page)?;
        if overlay.is_empty() {
            return Ok(());
        }
        let bounds = page_box(&self.doc, page_id);
        let fonts = content::uses_text(overlay).then(|| self.ensure_fonts());

        let mut pending: Vec<RasterImage> = Vec::new();
        let base = self.image_count;
        let bytes = content::encode(overlay, bounds, &mut |image| {
            pending.push(image.clone());
            format!("CmIm{}", base + pending.len())
        });

        let mut images = Vec::with_capacity(pending.len());
        for (i, image) in pending.iter().enumerate() {
            let id = self.add_image(image);
            images.push((format!("CmIm{}", base + i + 1), id));
        }
        self.image_count += images.len();

        self.merge_resources(page_id, fonts, &images)?;
        self.wrap_contents(page_id, bytes)?;
        tracing::debug!(page, ops = overlay.ops().len(), images = images.len(), "Overlay drawn");
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<Vec<u8>, PdfError> {
        let mut doc = self.doc;
        let mut buf = Vec::new();
        doc.save_to(&mut buf).map_err(|e| PdfError::Write(e.to_string()))?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{PageSize, RenderPoint, RenderRect};
    use crate::pdf::fixtures::{page_contents, pdf_with_pages, with_page_entries};
    use crate::render::{DrawOp, FontFace, Rgb};

    fn overlay_with_text(text: &str) -> Surface {
        let mut surface = Surface::new(PageSize::new(600.0, 800.0));
        surface.text(RenderPoint { x: 100.0, y: 100.0 }, text, 10.0, FontFace::Bold, Rgb::INK);
        surface
    }

    #[test]
    fn reports_pages_and_bounds() {
        let canvas = LopdfSource.open(&pdf_with_pages(&[(600, 800), (842, 595)])).unwrap();
        assert_eq!(canvas.page_count(), 2);
        assert_eq!(canvas.page_bounds(0).unwrap().size(), PageSize::new(600.0, 800.0));
        assert_eq!(canvas.page_bounds(1).unwrap().size(), PageSize::new(842.0, 595.0));
        assert!(canvas.page_bounds(2).is_none());
    }

    #[test]
    fn crop_box_and_rotation_shape_the_bounds() {
        let source = pdf_with_pages(&[(600, 800), (600, 800)]);
        let source = with_page_entries(
            &source,
            1,
            dictionary! {
                "CropBox" => vec![50.into(), 100.into(), 550.into(), 700.into()],
                "Rotate" => 90,
            },
        );
        let source = with_page_entries(
            &source,
            2,
            dictionary! {
                "CropBox" => vec![(-10).into(), (-10).into(), 300.into(), 400.into()],
                "Rotate" => -90,
            },
        );
        let canvas = LopdfSource.open(&source).unwrap();

        let first = canvas.page_bounds(0).unwrap();
        assert_eq!(
            first,
            PageBox { x: 50.0, y: 100.0, width: 500.0, height: 600.0, rotation: 90 }
        );
        assert_eq!(first.size(), PageSize::new(600.0, 500.0));

        let second = canvas.page_bounds(1).unwrap();
        assert_eq!(
            second,
            PageBox { x: 0.0, y: 0.0, width: 300.0, height: 400.0, rotation: 270 }
        );
    }

    #[test]
    fn rotated_page_overlay_is_turned_upright() {
        let source = with_page_entries(
            &pdf_with_pages(&[(600, 800)]),
            1,
            dictionary! {
                "CropBox" => vec![50.into(), 100.into(), 550.into(), 700.into()],
                "Rotate" => 90,
            },
        );
        let mut canvas = LopdfSource.open(&source).unwrap();
        canvas.draw_overlay(0, &overlay_with_text("Graded")).unwrap();
        let out = canvas.finish().unwrap();

        let contents = page_contents(&out);
        assert!(contents[0].contains("0 1 -1 0 550 100 cm"));
        assert!(contents[0].contains("(Graded) Tj"));
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(matches!(LopdfSource.open(b"not a pdf"), Err(PdfError::Parse(_))));
    }

    #[test]
    fn overlay_keeps_original_content_first() {
        let mut canvas = LopdfSource.open(&pdf_with_pages(&[(600, 800)])).unwrap();
        canvas.draw_overlay(0, &overlay_with_text("Graded")).unwrap();
        let out = canvas.finish().unwrap();

        let contents = page_contents(&out);
        assert_eq!(contents.len(), 1);
        let original = contents[0].find("(Page 1) Tj").unwrap();
        let overlay = contents[0].find("(Graded) Tj").unwrap();
        assert!(original < overlay);
        assert!(contents[0].trim_start().starts_with('q'));
    }

    #[test]
    fn fonts_merge_with_existing_resources() {
        let mut canvas = LopdfSource.open(&pdf_with_pages(&[(600, 800)])).unwrap();
        canvas.draw_overlay(0, &overlay_with_text("x")).unwrap();
        let out = canvas.finish().unwrap();

        let doc = Document::load_mem(&out).unwrap();
        let page_id = *doc.get_pages().get(&1).unwrap();
        let page = doc.get_dictionary(page_id).unwrap();
        let resources = resolve(&doc, page.get(b"Resources").unwrap()).as_dict().unwrap();
        let fonts = resolve(&doc, resources.get(b"Font").unwrap()).as_dict().unwrap();
        assert!(fonts.has(b"F1"));
        assert!(fonts.has(FONT_REGULAR.as_bytes()));
        assert!(fonts.has(FONT_BOLD.as_bytes()));
    }

    #[test]
    fn images_become_xobjects_with_soft_mask() {
        let mut surface = Surface::new(PageSize::new(600.0, 800.0));
        surface.push(DrawOp::Image {
            rect: RenderRect { x: 10.0, y: 10.0, width: 20.0, height: 20.0 },
            image: RasterImage { width: 1, height: 1, rgb: vec![255, 0, 0], alpha: vec![128] },
        });
        let mut canvas = LopdfSource.open(&pdf_with_pages(&[(600, 800)])).unwrap();
        canvas.draw_overlay(0, &surface).unwrap();
        let out = canvas.finish().unwrap();

        let doc = Document::load_mem(&out).unwrap();
        let page_id = *doc.get_pages().get(&1).unwrap();
        let page = doc.get_dictionary(page_id).unwrap();
        let resources = resolve(&doc, page.get(b"Resources").unwrap()).as_dict().unwrap();
        let xobjects = resolve(&doc, resources.get(b"XObject").unwrap()).as_dict().unwrap();
        let image_id = xobjects.get(b"CmIm1").unwrap().as_reference().unwrap();
        let image = doc.get_object(image_id).unwrap().as_stream().unwrap();
        assert!(image.dict.has(b"SMask"));
    }

    #[test]
    fn empty_overlay_leaves_page_alone() {
        let source = pdf_with_pages(&[(600, 800)]);
        let mut canvas = LopdfSource.open(&source).unwrap();
        canvas.draw_overlay(0, &Surface::new(PageSize::new(600.0, 800.0))).unwrap();
        assert!(matches!(
            canvas.draw_overlay(3, &overlay_with_text("x")),
            Err(PdfError::PageOutOfRange { page: 3, count: 1 })
        ));
        let out = canvas.finish().unwrap();
        assert_eq!(page_contents(&out), page_contents(&source));
    }
}
