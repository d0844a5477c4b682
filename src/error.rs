use thiserror::Error;

/// Failure taxonomy for the stamping pipeline.
///
/// Everything except `Serialization` and `Storage` is a caller input error.
/// `Serialization` means the document structure went inconsistent mid-save
/// and is surfaced as an internal failure; `Storage` means the stamp itself
/// succeeded but the audit append or artifact write did not.
#[derive(Debug, Error)]
pub enum StampError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("document parse failed: {0}")]
    DocumentParse(String),

    #[error("page {page} out of range, document has {count} pages")]
    PageOutOfRange { page: u32, count: u32 },

    #[error("signature image decode failed: {0}")]
    ImageDecode(String),

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("document serialization failed: {0}")]
    Serialization(String),

    #[error("storage failed: {0}")]
    Storage(String),
}

impl StampError {
    /// True when the failure is attributable to caller input rather than
    /// the service or its storage collaborators.
    pub fn is_input_error(&self) -> bool {
        !matches!(
            self,
            StampError::Serialization(_) | StampError::Storage(_)
        )
    }
}
