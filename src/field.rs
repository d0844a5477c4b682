use serde::{Deserialize, Serialize};

use crate::error::StampError;
use crate::geometry::PlacementBox;
use crate::request::{decode_payload, PlacementRequest};

/// An interactive field placed over a rendered page, as the editing UI
/// describes it. Each kind carries only the attributes that matter to it;
/// only finalized signature fields with captured image data participate in
/// stamping.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Field {
    Text {
        #[serde(flatten)]
        placement: Placement,
        #[serde(default)]
        value: String,
    },
    Date {
        #[serde(flatten)]
        placement: Placement,
        #[serde(default)]
        value: String,
    },
    Radio {
        #[serde(flatten)]
        placement: Placement,
        #[serde(default)]
        checked: bool,
    },
    Image {
        #[serde(flatten)]
        placement: Placement,
        /// Base64 payload, optionally a data URL.
        image: Option<String>,
    },
    Signature {
        #[serde(flatten)]
        placement: Placement,
        /// Captured signature strokes as a base64 raster, optionally a
        /// data URL. Absent until the user has drawn one.
        image: Option<String>,
        #[serde(rename = "isFinal", default)]
        is_final: bool,
    },
}

/// Where a field sits: page plus relative box.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Placement {
    pub page: u32,
    #[serde(flatten)]
    pub placement: PlacementBox,
}

impl Field {
    /// Converts a finalized signature field into a stamping request against
    /// the given document bytes. Returns `None` for every other kind, and
    /// for signature fields with no captured image yet.
    pub fn to_placement_request(
        &self,
        document: &[u8],
    ) -> Option<Result<PlacementRequest, StampError>> {
        match self {
            Field::Signature {
                placement,
                image: Some(image),
                is_final: true,
            } => Some(decode_payload(image, "signature").map(|signature| PlacementRequest {
                page_index: placement.page,
                placement: placement.placement,
                document: document.to_vec(),
                signature,
            })),
            _ => None,
        }
    }
}
