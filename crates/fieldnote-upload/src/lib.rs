#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

//! Session upload orchestration
//!
//! [`Uploader`] turns a [`SessionDraft`] into a remote session: it resolves
//! the conference and vendor, normalizes the audio, sends the primary body
//! and falls back once to the alternate encoding or endpoint when the server
//! rejects the first one.

mod draft;
pub mod error;
pub mod media;
mod orchestrator;
pub mod payload;
mod poll;
mod resolver;

pub use draft::SessionDraft;
pub use error::{EnrichmentError, Result, UploadError};
pub use media::{AudioClip, AudioFormat, ImageFile};
pub use orchestrator::{Attempt, Endpoint, Enrichment, UploadOutcome, Uploader, should_fall_back};
pub use payload::{Encoding, UploadFields, UploadPayload};
pub use poll::poll_status;
pub use resolver::{EntityRequest, EntityResolver, ResolvedEntities, UNKNOWN_CONFERENCE, UNKNOWN_VENDOR};
