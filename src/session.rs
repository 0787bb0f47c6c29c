//! Key session container.
//!
//! Thin facade over the environment's session handle, keeping the content
//! identifier the session was opened for so later events can be correlated.

use crate::error::Result;
use crate::sink::{KeySessionHandle, SessionEvent, VideoSink, VIDEO_MIME_TYPE};

/// One active DRM key session, associated 1:1 with a content identifier.
pub struct KeySession {
    handle: Box<dyn KeySessionHandle>,
    content_id: String,
}

impl KeySession {
    /// Request a new `video/mp4` key session from the environment.
    ///
    /// Returns `None` when the environment declines; callers must treat that
    /// as a no-op rather than an error.
    pub fn open(
        sink: &dyn VideoSink,
        key_system: &str,
        request: &[u8],
        content_id: &str,
    ) -> Option<Self> {
        let handle = sink.create_key_session(key_system, VIDEO_MIME_TYPE, request)?;
        Some(Self {
            handle,
            content_id: content_id.to_string(),
        })
    }

    /// Content identifier this session was opened for.
    #[must_use]
    pub fn content_id(&self) -> &str {
        &self.content_id
    }

    /// Next environment event for this session, or `None` once the
    /// environment has torn the session down.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.handle.next_event().await
    }

    /// Apply license bytes to the session.
    ///
    /// The environment is the sole authority on whether decryption
    /// subsequently succeeds.
    pub async fn apply_license(&mut self, license: &[u8]) -> Result<()> {
        self.handle.update(license).await
    }
}
