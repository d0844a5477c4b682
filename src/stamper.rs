use log::warn;
use lopdf::{dictionary, Document, Object, Stream};

use crate::error::StampError;
use crate::geometry::{self, DrawRect, PlacementBox};

/// Output of a single stamping call: the serialized document plus the
/// resolved placement, kept for the audit record.
#[derive(Debug, Clone)]
pub struct StampedPage {
    pub bytes: Vec<u8>,
    pub rect: DrawRect,
    pub page: u32,
}

/// Composites a raster signature onto one page of a PDF and returns the
/// re-serialized document. Inputs are never mutated; stamping several
/// fields means calling this once per field, re-parsing the previous
/// output each time.
pub fn stamp(
    document: &[u8],
    signature: &[u8],
    page_index: u32,
    placement: &PlacementBox,
) -> Result<StampedPage, StampError> {
    let mut doc = Document::load_mem(document)
        .map_err(|e| StampError::DocumentParse(e.to_string()))?;
    if doc.is_encrypted() {
        return Err(StampError::DocumentParse(
            "encrypted documents are not supported".into(),
        ));
    }

    let pages = doc.get_pages();
    let page_count = pages.len() as u32;
    let page_id = *pages
        .get(&page_index)
        .ok_or(StampError::PageOutOfRange {
            page: page_index,
            count: page_count,
        })?;

    let img = image::load_from_memory(signature)
        .map_err(|e| StampError::ImageDecode(e.to_string()))?
        .to_rgba8();
    let (img_w, img_h) = img.dimensions();

    let (page_width, page_height) = page_dimensions(&doc, page_id)?;
    let rect = geometry::resolve(
        page_width,
        page_height,
        placement,
        f64::from(img_w),
        f64::from(img_h),
    )?;

    // Split the decoded RGBA into an RGB image stream and a DeviceGray
    // soft mask carrying the alpha channel.
    let mut rgb = Vec::with_capacity((img_w * img_h * 3) as usize);
    let mut alpha = Vec::with_capacity((img_w * img_h) as usize);
    for pixel in img.pixels() {
        rgb.push(pixel[0]);
        rgb.push(pixel[1]);
        rgb.push(pixel[2]);
        alpha.push(pixel[3]);
    }

    let smask_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => img_w as i64,
            "Height" => img_h as i64,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
        },
        alpha,
    ));
    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => img_w as i64,
            "Height" => img_h as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "SMask" => smask_id,
        },
        rgb,
    ));

    register_xobject(&mut doc, page_id, image_id)?;

    let content = format!(
        "q {} 0 0 {} {} {} cm /ImSig Do Q",
        rect.width, rect.height, rect.x, rect.y
    );
    doc.add_page_contents(page_id, content.into_bytes())
        .map_err(|e| StampError::Serialization(e.to_string()))?;

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| StampError::Serialization(e.to_string()))?;

    Ok(StampedPage {
        bytes,
        rect,
        page: page_index,
    })
}

/// Injects the image XObject into the page's resource dictionary, whether
/// the resources live inline or behind a reference.
fn register_xobject(
    doc: &mut Document,
    page_id: lopdf::ObjectId,
    image_id: lopdf::ObjectId,
) -> Result<(), StampError> {
    let mut resources_obj = {
        let page_dict = doc
            .get_object_mut(page_id)
            .and_then(|o| o.as_dict_mut())
            .map_err(|e| StampError::DocumentParse(format!("page dictionary: {e}")))?;
        page_dict
            .remove(b"Resources")
            .unwrap_or_else(|| Object::Dictionary(dictionary! {}))
    };

    match &mut resources_obj {
        Object::Reference(id) => {
            let res_dict = doc
                .get_object_mut(*id)
                .and_then(|o| o.as_dict_mut())
                .map_err(|e| StampError::DocumentParse(format!("resources dictionary: {e}")))?;
            ensure_xobject_dict(res_dict)?.set("ImSig", image_id);
        }
        Object::Dictionary(ref mut dict) => {
            ensure_xobject_dict(dict)?.set("ImSig", image_id);
        }
        _ => {
            return Err(StampError::DocumentParse(
                "page resources are neither a dictionary nor a reference".into(),
            ))
        }
    }

    let page_dict = doc
        .get_object_mut(page_id)
        .and_then(|o| o.as_dict_mut())
        .map_err(|e| StampError::DocumentParse(format!("page dictionary: {e}")))?;
    page_dict.set("Resources", resources_obj);
    Ok(())
}

fn ensure_xobject_dict(
    res_dict: &mut lopdf::Dictionary,
) -> Result<&mut lopdf::Dictionary, StampError> {
    let xobj_owned = res_dict
        .remove(b"XObject")
        .unwrap_or_else(|| Object::Dictionary(dictionary! {}));

    // An XObject entry held behind a reference would be shared with other
    // pages; replace it with a fresh inline dictionary rather than mutate
    // the shared one.
    let sanitized = match xobj_owned {
        Object::Dictionary(dict) => Object::Dictionary(dict),
        Object::Reference(_) => Object::Dictionary(dictionary! {}),
        _ => {
            return Err(StampError::DocumentParse(
                "XObject resource entry has an unexpected type".into(),
            ))
        }
    };

    res_dict.set("XObject", sanitized);
    match res_dict.get_mut(b"XObject") {
        Ok(Object::Dictionary(ref mut dict)) => Ok(dict),
        _ => Err(StampError::DocumentParse(
            "XObject resource entry has an unexpected type".into(),
        )),
    }
}

/// Page dimensions from the MediaBox, walking Parent links when the page
/// inherits it. Falls back to A4 when no MediaBox is present anywhere.
fn page_dimensions(
    doc: &Document,
    page_id: lopdf::ObjectId,
) -> Result<(f64, f64), StampError> {
    let mut current = Some(page_id);
    while let Some(id) = current {
        let dict = doc
            .get_object(id)
            .and_then(|o| o.as_dict())
            .map_err(|e| StampError::DocumentParse(format!("page dictionary: {e}")))?;
        if let Some((w, h)) = extract_media_box(doc, dict) {
            return Ok((w, h));
        }
        current = dict.get(b"Parent").and_then(|p| p.as_reference()).ok();
    }
    warn!("page {page_id:?} has no MediaBox, assuming A4");
    Ok((595.0, 842.0))
}

fn extract_media_box(doc: &Document, dict: &lopdf::Dictionary) -> Option<(f64, f64)> {
    let raw = dict.get(b"MediaBox").ok()?;
    let resolved = match raw {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    let arr = resolved.as_array().ok()?;
    if arr.len() != 4 {
        return None;
    }
    let llx = obj_to_f64(&arr[0])?;
    let lly = obj_to_f64(&arr[1])?;
    let urx = obj_to_f64(&arr[2])?;
    let ury = obj_to_f64(&arr[3])?;
    Some((urx - llx, ury - lly))
}

fn obj_to_f64(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(f) => Some((*f).into()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testdoc::{minimal_pdf, png_bytes};
    use crate::fingerprint::fingerprint;

    fn box_at(x: f64, y: f64, w: f64, h: f64) -> PlacementBox {
        PlacementBox {
            x_pct: x,
            y_pct: y,
            w_pct: w,
            h_pct: h,
        }
    }

    #[test]
    fn stamps_a_single_page_document() {
        let pdf = minimal_pdf(1, 612.0, 792.0);
        let sig = png_bytes(480, 200);
        let out = stamp(&pdf, &sig, 1, &box_at(0.42, 0.31, 0.25, 0.08)).unwrap();
        assert_ne!(fingerprint(&out.bytes), fingerprint(&pdf));
        assert_eq!(out.page, 1);
        assert!((out.rect.height - 63.36).abs() < 1e-6);
        assert!((out.rect.width - 152.064).abs() < 1e-6);
        // Output is itself a loadable document with the same page count.
        let reparsed = Document::load_mem(&out.bytes).unwrap();
        assert_eq!(reparsed.get_pages().len(), 1);
    }

    #[test]
    fn output_contains_the_image_xobject() {
        let pdf = minimal_pdf(2, 612.0, 792.0);
        let sig = png_bytes(64, 32);
        let out = stamp(&pdf, &sig, 2, &box_at(0.1, 0.1, 0.3, 0.1)).unwrap();
        let reparsed = Document::load_mem(&out.bytes).unwrap();
        let page_id = reparsed.get_pages()[&2];
        let resources = reparsed.get_page_resources(page_id);
        let res_dict = resources.0.expect("page resources");
        let xobjects = res_dict
            .get(b"XObject")
            .and_then(|o| o.as_dict())
            .expect("XObject dictionary");
        assert!(xobjects.get(b"ImSig").is_ok());
    }

    #[test]
    fn page_out_of_range() {
        let pdf = minimal_pdf(3, 612.0, 792.0);
        let sig = png_bytes(64, 32);
        let err = stamp(&pdf, &sig, 5, &box_at(0.1, 0.1, 0.3, 0.1)).unwrap_err();
        match err {
            StampError::PageOutOfRange { page, count } => {
                assert_eq!(page, 5);
                assert_eq!(count, 3);
            }
            other => panic!("expected PageOutOfRange, got {other:?}"),
        }
    }

    #[test]
    fn malformed_document_is_rejected() {
        let sig = png_bytes(64, 32);
        let err = stamp(b"not a pdf", &sig, 1, &box_at(0.1, 0.1, 0.3, 0.1)).unwrap_err();
        assert!(matches!(err, StampError::DocumentParse(_)));
    }

    #[test]
    fn malformed_image_is_rejected() {
        let pdf = minimal_pdf(1, 612.0, 792.0);
        let err = stamp(&pdf, b"not an image", 1, &box_at(0.1, 0.1, 0.3, 0.1)).unwrap_err();
        assert!(matches!(err, StampError::ImageDecode(_)));
    }

    #[test]
    fn inputs_are_left_untouched() {
        let pdf = minimal_pdf(1, 612.0, 792.0);
        let sig = png_bytes(64, 32);
        let before = fingerprint(&pdf);
        let _ = stamp(&pdf, &sig, 1, &box_at(0.1, 0.1, 0.3, 0.1)).unwrap();
        assert_eq!(fingerprint(&pdf), before);
    }

    #[test]
    fn sequential_stamps_re_parse_previous_output() {
        let pdf = minimal_pdf(1, 612.0, 792.0);
        let first = stamp(&pdf, &png_bytes(64, 32), 1, &box_at(0.1, 0.1, 0.3, 0.1)).unwrap();
        let second = stamp(
            &first.bytes,
            &png_bytes(32, 64),
            1,
            &box_at(0.6, 0.6, 0.3, 0.1),
        )
        .unwrap();
        assert_ne!(fingerprint(&second.bytes), fingerprint(&first.bytes));
        assert!(Document::load_mem(&second.bytes).is_ok());
    }
}
