use std::time::Duration;

use jiff::{SignedDuration, Timestamp};

use crate::media::{AudioClip, ImageFile};

/// Everything collected for one session, awaiting upload
///
/// Consumed by [`crate::Uploader::upload`]; never persisted.
#[derive(Debug, Clone)]
pub struct SessionDraft {
    pub conference_id: Option<String>,
    pub vendor_id: Option<String>,
    /// Vendor name used when a placeholder vendor must be found or created
    pub vendor_name: Option<String>,
    /// Free text typed by the user
    pub notes: String,
    pub audio: Option<AudioClip>,
    pub images: Vec<ImageFile>,
    pub started_at: Timestamp,
    /// Explicit end; derived from `recording_duration` when absent
    pub ended_at: Option<Timestamp>,
    pub recording_duration: Option<Duration>,
}

impl SessionDraft {
    pub fn new(started_at: Timestamp) -> Self {
        Self {
            conference_id: None,
            vendor_id: None,
            vendor_name: None,
            notes: String::new(),
            audio: None,
            images: Vec::new(),
            started_at,
            ended_at: None,
            recording_duration: None,
        }
    }

    #[must_use]
    pub fn conference(mut self, id: impl Into<String>) -> Self {
        self.conference_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn vendor(mut self, id: impl Into<String>) -> Self {
        self.vendor_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    #[must_use]
    pub fn audio(mut self, clip: AudioClip) -> Self {
        self.audio = Some(clip);
        self
    }

    #[must_use]
    pub fn image(mut self, image: ImageFile) -> Self {
        self.images.push(image);
        self
    }

    /// End of the session
    ///
    /// The explicit end if set, else start plus a non-zero recording
    /// duration, else the start itself.
    pub fn end_time(&self) -> Timestamp {
        if let Some(end) = self.ended_at {
            return end;
        }

        self.recording_duration
            .filter(|d| !d.is_zero())
            .and_then(|d| SignedDuration::try_from(d).ok())
            .and_then(|d| self.started_at.checked_add(d).ok())
            .unwrap_or(self.started_at)
    }
}
