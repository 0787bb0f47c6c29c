//! Playback environment surface.
//!
//! The decryption capability itself lives in the playback environment, not in
//! this crate. These traits are the seam: a sink advertises key-management
//! support, raises init data once per encrypted stream, and hands out key
//! session handles for the handshake to drive.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;

/// MIME type FairPlay key sessions are negotiated under.
pub const VIDEO_MIME_TYPE: &str = "video/mp4";

/// Events raised by the environment on an open key session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Opaque request buffer to forward to the license server.
    KeyMessage(Vec<u8>),
    /// A key was accepted. Informational only.
    KeyAdded,
    /// The environment reported a key error. Diagnostic only.
    KeyError(String),
}

/// A key session created by the environment.
///
/// The environment owns the session lifetime; the event stream ends when it
/// tears the session down.
#[async_trait]
pub trait KeySessionHandle: Send {
    /// Next session event, or `None` once the session is gone.
    async fn next_event(&mut self) -> Option<SessionEvent>;

    /// Push license bytes into the session.
    async fn update(&mut self, license: &[u8]) -> Result<()>;
}

/// A video sink exposing the environment's key-management capability.
pub trait VideoSink: Send + Sync {
    /// Whether the sink exposes a key-management object at all.
    fn has_media_keys(&self) -> bool;

    /// Whether the environment reports `key_system` as supported for
    /// `mime_type`.
    fn supports_key_system(&self, key_system: &str, mime_type: &str) -> bool;

    /// Ask the environment for a key session initialized with `request`.
    ///
    /// `None` means the environment declined (unacceptable init data,
    /// resource exhaustion); callers must treat it as a no-op, not an error.
    fn create_key_session(
        &self,
        key_system: &str,
        mime_type: &str,
        request: &[u8],
    ) -> Option<Box<dyn KeySessionHandle>>;

    /// Subscribe to key-needed events.
    ///
    /// One long-lived subscription per handshake. Each received buffer is the
    /// initialization data of one encrypted stream; occurrences are unbounded
    /// in count and timing.
    fn subscribe_key_needed(&self) -> mpsc::UnboundedReceiver<Vec<u8>>;
}

/// Whether `sink` can run the FairPlay handshake for `key_system`.
///
/// True only when the sink has a key-management object and the environment
/// reports the key system as supported for `video/mp4`. Absence of a
/// capability is `false`, never an error.
#[must_use]
pub fn is_fairplay_supported(sink: &dyn VideoSink, key_system: &str) -> bool {
    sink.has_media_keys() && sink.supports_key_system(key_system, VIDEO_MIME_TYPE)
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::{is_fairplay_supported, KeySessionHandle, VideoSink};

    struct StubSink {
        media_keys: bool,
        key_system_ok: bool,
    }

    impl VideoSink for StubSink {
        fn has_media_keys(&self) -> bool {
            self.media_keys
        }

        fn supports_key_system(&self, _key_system: &str, mime_type: &str) -> bool {
            assert_eq!(mime_type, "video/mp4");
            self.key_system_ok
        }

        fn create_key_session(
            &self,
            _key_system: &str,
            _mime_type: &str,
            _request: &[u8],
        ) -> Option<Box<dyn KeySessionHandle>> {
            None
        }

        fn subscribe_key_needed(&self) -> mpsc::UnboundedReceiver<Vec<u8>> {
            let (_, rx) = mpsc::unbounded_channel();
            rx
        }
    }

    #[test]
    fn supported_requires_both_checks() {
        let sink = StubSink { media_keys: true, key_system_ok: true };
        assert!(is_fairplay_supported(&sink, "com.apple.fps.1_0"));

        let sink = StubSink { media_keys: false, key_system_ok: true };
        assert!(!is_fairplay_supported(&sink, "com.apple.fps.1_0"));

        let sink = StubSink { media_keys: true, key_system_ok: false };
        assert!(!is_fairplay_supported(&sink, "com.apple.fps.1_0"));
    }
}
