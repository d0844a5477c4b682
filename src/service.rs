use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use log::{debug, error};
use time::OffsetDateTime;

use crate::artifact::{ArtifactRef, ArtifactStore};
use crate::audit::{AuditRecord, AuditStore};
use crate::error::StampError;
use crate::fingerprint::fingerprint;
use crate::request::PlacementRequest;
use crate::stamper;

/// Result of a successful stamping run: where the signed document landed,
/// the audit record that was appended for it, and the signed bytes for
/// callers that respond inline.
#[derive(Debug, Clone)]
pub struct StampOutcome {
    pub artifact: ArtifactRef,
    pub record: AuditRecord,
    pub signed_bytes: Vec<u8>,
}

impl StampOutcome {
    /// Inline representation of the signed document, as the signing UI
    /// consumes it.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:application/pdf;base64,{}",
            B64.encode(&self.signed_bytes)
        )
    }
}

/// Orchestrates one stamping operation end to end. Stateless per request;
/// the only shared collaborators are the injected stores, so one service
/// instance can process many requests concurrently.
pub struct StampingService<A: AuditStore, S: ArtifactStore> {
    audit: A,
    artifacts: S,
}

impl<A: AuditStore, S: ArtifactStore> StampingService<A, S> {
    pub fn new(audit: A, artifacts: S) -> Self {
        Self { audit, artifacts }
    }

    pub fn audit_store(&self) -> &A {
        &self.audit
    }

    pub fn artifact_store(&self) -> &S {
        &self.artifacts
    }

    /// Single pass, no retries: validate, fingerprint the pristine input,
    /// stamp, fingerprint the output, append the audit record, persist the
    /// artifact. Any failure short-circuits; nothing is recorded or
    /// persisted for a failed run, and a persistence failure after a
    /// successful stamp is still an overall failure so no signed artifact
    /// ever exists without its audit record.
    pub fn process(&self, request: &PlacementRequest) -> Result<StampOutcome, StampError> {
        request.validate()?;

        // Integrity anchor: hashed before any mutation, never recomputed.
        let original_hash = fingerprint(&request.document);

        let stamped = stamper::stamp(
            &request.document,
            &request.signature,
            request.page_index,
            &request.placement,
        )?;
        let signed_hash = fingerprint(&stamped.bytes);
        debug!(
            "stamped page {} at ({:.2}, {:.2}), {} -> {}",
            stamped.page, stamped.rect.x, stamped.rect.y, original_hash, signed_hash
        );

        let record = AuditRecord {
            original_hash,
            signed_hash,
            timestamp: OffsetDateTime::now_utc(),
            page: stamped.page,
            x_pos: stamped.rect.x,
            y_pos: stamped.rect.y,
        };
        self.audit.append(&record).map_err(|e| {
            error!("audit append failed: {e}");
            e
        })?;

        let artifact = self.artifacts.persist(&stamped.bytes).map_err(|e| {
            error!("artifact persistence failed: {e}");
            e
        })?;

        Ok(StampOutcome {
            artifact,
            record,
            signed_bytes: stamped.bytes,
        })
    }
}
