use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::StampError;
use crate::geometry::PlacementBox;

/// Fully decoded stamping request: raw document and signature bytes plus
/// the relative placement of the signature field.
#[derive(Debug, Clone)]
pub struct PlacementRequest {
    /// 1-based page index.
    pub page_index: u32,
    pub placement: PlacementBox,
    pub document: Vec<u8>,
    pub signature: Vec<u8>,
}

impl PlacementRequest {
    /// Fail-fast well-formedness check, run before any parsing or
    /// decoding work. Percentages outside [0,1] pass here; off-page
    /// placement is the caller's call.
    pub fn validate(&self) -> Result<(), StampError> {
        if self.page_index == 0 {
            return Err(StampError::InvalidRequest(
                "page index is 1-based and must be at least 1".into(),
            ));
        }
        let b = &self.placement;
        for (name, value) in [
            ("xPct", b.x_pct),
            ("yPct", b.y_pct),
            ("wPct", b.w_pct),
            ("hPct", b.h_pct),
        ] {
            if !value.is_finite() {
                return Err(StampError::InvalidRequest(format!(
                    "{name} is not a finite number"
                )));
            }
        }
        if b.w_pct <= 0.0 || b.h_pct <= 0.0 {
            return Err(StampError::InvalidRequest(
                "placement box has a non-positive size".into(),
            ));
        }
        if self.document.is_empty() {
            return Err(StampError::InvalidRequest("document is empty".into()));
        }
        if self.signature.is_empty() {
            return Err(StampError::InvalidRequest("signature is empty".into()));
        }
        if !infer::is_image(&self.signature) {
            return Err(StampError::InvalidRequest(
                "signature bytes are not a recognized raster image".into(),
            ));
        }
        Ok(())
    }
}

/// Placement fields as they arrive on the wire.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Coordinates {
    pub page: u32,
    #[serde(flatten)]
    pub placement: PlacementBox,
}

/// Transport-level request: base64 payloads (optionally carrying a
/// `data:<mime>;base64,` prefix) plus coordinates, the shape the signing
/// UI posts.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignRequest {
    pub pdf_base64: String,
    pub signature: String,
    pub coordinates: Coordinates,
}

impl SignRequest {
    /// Decodes both payloads into a core request. Decoding failures are
    /// `InvalidRequest`; the core only ever sees byte buffers.
    pub fn into_placement(self) -> Result<PlacementRequest, StampError> {
        let document = decode_payload(&self.pdf_base64, "pdfBase64")?;
        let signature = decode_payload(&self.signature, "signature")?;
        Ok(PlacementRequest {
            page_index: self.coordinates.page,
            placement: self.coordinates.placement,
            document,
            signature,
        })
    }
}

/// Strips an optional data-URL prefix and base64-decodes the remainder.
pub fn decode_payload(payload: &str, field: &str) -> Result<Vec<u8>, StampError> {
    let encoded = match payload.split_once(',') {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => payload,
    };
    B64.decode(encoded.trim().as_bytes())
        .map_err(|e| StampError::InvalidRequest(format!("{field} is not valid base64: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testdoc::{minimal_pdf, png_bytes};

    fn valid_request() -> PlacementRequest {
        PlacementRequest {
            page_index: 1,
            placement: PlacementBox {
                x_pct: 0.42,
                y_pct: 0.31,
                w_pct: 0.25,
                h_pct: 0.08,
            },
            document: minimal_pdf(1, 612.0, 792.0),
            signature: png_bytes(64, 32),
        }
    }

    #[test]
    fn valid_request_passes() {
        valid_request().validate().unwrap();
    }

    #[test]
    fn zero_page_index_fails() {
        let mut req = valid_request();
        req.page_index = 0;
        assert!(matches!(
            req.validate(),
            Err(StampError::InvalidRequest(_))
        ));
    }

    #[test]
    fn non_finite_percentage_fails() {
        let mut req = valid_request();
        req.placement.x_pct = f64::NAN;
        assert!(req.validate().is_err());
    }

    #[test]
    fn zero_sized_box_fails() {
        let mut req = valid_request();
        req.placement.h_pct = 0.0;
        assert!(req.validate().is_err());
    }

    #[test]
    fn non_image_signature_fails() {
        let mut req = valid_request();
        req.signature = b"just text".to_vec();
        assert!(req.validate().is_err());
    }

    #[test]
    fn decode_strips_data_url_prefix() {
        let encoded = B64.encode(b"hello");
        let with_prefix = format!("data:image/png;base64,{encoded}");
        assert_eq!(decode_payload(&with_prefix, "signature").unwrap(), b"hello");
        assert_eq!(decode_payload(&encoded, "signature").unwrap(), b"hello");
    }

    #[test]
    fn wire_form_round_trips_to_core_request() {
        let json = format!(
            r#"{{
                "pdfBase64": "data:application/pdf;base64,{}",
                "signature": "{}",
                "coordinates": {{"page": 2, "xPct": 0.1, "yPct": 0.2, "wPct": 0.3, "hPct": 0.05}}
            }}"#,
            B64.encode(minimal_pdf(2, 612.0, 792.0)),
            B64.encode(png_bytes(64, 32)),
        );
        let wire: SignRequest = serde_json::from_str(&json).unwrap();
        let req = wire.into_placement().unwrap();
        assert_eq!(req.page_index, 2);
        assert!((req.placement.w_pct - 0.3).abs() < 1e-12);
        req.validate().unwrap();
    }

    #[test]
    fn bad_base64_is_an_invalid_request() {
        let err = decode_payload("%%%not base64%%%", "pdfBase64").unwrap_err();
        assert!(matches!(err, StampError::InvalidRequest(_)));
        assert!(err.to_string().contains("pdfBase64"));
    }
}
