//! Signature placement and PDF stamping pipeline.
//!
//! Converts a relative, percentage-based field placement on a rendered page
//! into an absolute draw rectangle, composites a hand-drawn signature image
//! onto that page, and records a before/after content fingerprint of the
//! transformation in an append-only audit trail.

mod artifact;
mod audit;
mod error;
mod field;
mod fingerprint;
mod geometry;
mod request;
mod service;
mod stamper;

pub use artifact::{ArtifactRef, ArtifactStore, DirArtifactStore};
pub use audit::{AuditRecord, AuditStore, MemoryAuditStore, SqliteAuditStore};
pub use error::StampError;
pub use field::{Field, Placement};
pub use fingerprint::{fingerprint, fingerprint_reader};
pub use geometry::{resolve, DrawRect, PlacementBox};
pub use request::{decode_payload, Coordinates, PlacementRequest, SignRequest};
pub use service::{StampOutcome, StampingService};
pub use stamper::{stamp, StampedPage};
