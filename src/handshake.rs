//! FairPlay license-acquisition handshake.
//!
//! One handshake per playback start: gate on capability, fetch the
//! application certificate, then answer every key-needed event with its own
//! key session and license exchange. Branches are independent; a failed
//! branch never affects its siblings or the certificate state.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use url::Url;

#[cfg(feature = "http")]
use crate::error::Result;
use crate::framing::{build_key_request, extract_content_id};
use crate::license::{LicenseClient, Transport};
use crate::session::KeySession;
use crate::sink::{is_fairplay_supported, SessionEvent, VideoSink};

/// Configuration for one license-acquisition handshake.
///
/// Immutable for the handshake lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeConfig {
    /// Opaque credential forwarded to both license server endpoints.
    pub token: String,
    /// Key system identifier, e.g. `com.apple.fps.1_0`.
    pub key_system: String,
    /// Application certificate endpoint.
    pub certificate_url: Url,
    /// License endpoint.
    pub license_url: Url,
}

/// Top-level handshake phase.
///
/// Per-session branches progress independently and are not reflected here;
/// observe them through [`HandshakeEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakePhase {
    /// Not started.
    Idle,
    /// Certificate request in flight.
    CertificatePending,
    /// Certificate held; key-needed events are being answered.
    CertificateReady,
    /// Capability rejected or certificate fetch failed. Terminal.
    Failed,
}

/// Observable handshake outcomes.
///
/// The baseline policy stays no-retry and nothing throws; this channel exists
/// so callers can surface failures instead of reading logs. Ignoring it is
/// fine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeEvent {
    /// Capability gate rejected the key system; no network activity happened.
    Unsupported,
    /// Certificate fetched; further playback steps may proceed.
    CertificateReady,
    /// Certificate fetch failed (bad status, transport error or timeout).
    CertificateFailed(String),
    /// A key session was opened for a content item.
    SessionOpened { content_id: String },
    /// The environment declined a key session; the branch is a no-op.
    SessionDeclined { content_id: String },
    /// License applied to the originating session.
    LicenseApplied { content_id: String },
    /// License fetch or update failed; siblings are unaffected.
    LicenseFailed { content_id: String },
}

/// Handle to a running handshake.
///
/// Dropping the handle detaches the background work, leaving the handshake
/// fire-and-forget; [`Handshake::abort`] cancels it instead, including
/// in-flight requests and per-session branches.
pub struct Handshake {
    phase: watch::Receiver<HandshakePhase>,
    events: mpsc::UnboundedReceiver<HandshakeEvent>,
    task: JoinHandle<()>,
}

impl Handshake {
    /// Current top-level phase.
    #[must_use]
    pub fn phase(&self) -> HandshakePhase {
        *self.phase.borrow()
    }

    /// Subscribe to top-level phase changes.
    #[must_use]
    pub fn subscribe_phase(&self) -> watch::Receiver<HandshakePhase> {
        self.phase.clone()
    }

    /// Next handshake event, or `None` once the handshake has wound down.
    pub async fn next_event(&mut self) -> Option<HandshakeEvent> {
        self.events.recv().await
    }

    /// Cancel the handshake and all in-flight branches.
    pub fn abort(&self) {
        self.task.abort();
    }
}

/// Start the handshake over a caller-supplied transport.
///
/// Returns synchronously; all work happens on a spawned task and is
/// observable through `on_certificate_ready` (invoked exactly once, on
/// certificate arrival, never on failure), the returned handle's event
/// stream, and diagnostic logging.
pub fn start<F>(
    config: HandshakeConfig,
    sink: Arc<dyn VideoSink>,
    transport: Arc<dyn Transport>,
    on_certificate_ready: F,
) -> Handshake
where
    F: FnOnce() + Send + 'static,
{
    let (phase_tx, phase_rx) = watch::channel(HandshakePhase::Idle);
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    let task = tokio::spawn(run(
        Arc::new(config),
        sink,
        transport,
        Box::new(on_certificate_ready),
        phase_tx,
        event_tx,
    ));

    Handshake {
        phase: phase_rx,
        events: event_rx,
        task,
    }
}

/// Start the handshake over the default HTTP transport.
#[cfg(feature = "http")]
pub fn start_http<F>(
    config: HandshakeConfig,
    sink: Arc<dyn VideoSink>,
    on_certificate_ready: F,
) -> Result<Handshake>
where
    F: FnOnce() + Send + 'static,
{
    let transport = Arc::new(crate::license::HttpTransport::new()?);
    Ok(start(config, sink, transport, on_certificate_ready))
}

async fn run(
    config: Arc<HandshakeConfig>,
    sink: Arc<dyn VideoSink>,
    transport: Arc<dyn Transport>,
    on_certificate_ready: Box<dyn FnOnce() + Send>,
    phase: watch::Sender<HandshakePhase>,
    events: mpsc::UnboundedSender<HandshakeEvent>,
) {
    if !is_fairplay_supported(sink.as_ref(), &config.key_system) {
        error!("FairPlay is not supported for key system {}", &config.key_system);
        let _ = phase.send(HandshakePhase::Failed);
        let _ = events.send(HandshakeEvent::Unsupported);
        return;
    }

    let client = Arc::new(LicenseClient::new(config.clone(), transport));

    let _ = phase.send(HandshakePhase::CertificatePending);
    let certificate: Arc<[u8]> = match client.fetch_certificate().await {
        Ok(bytes) => bytes.into(),
        Err(err) => {
            error!("Certificate request failed: {}", &err);
            let _ = phase.send(HandshakePhase::Failed);
            let _ = events.send(HandshakeEvent::CertificateFailed(err.to_string()));
            return;
        }
    };
    debug!("Certificate loaded ({} bytes)", certificate.len());

    // Subscribe before releasing the caller, or an encrypted stream surfacing
    // during their next playback step could go unanswered.
    let mut key_needed = sink.subscribe_key_needed();

    let _ = phase.send(HandshakePhase::CertificateReady);
    on_certificate_ready();
    let _ = events.send(HandshakeEvent::CertificateReady);

    let mut branches = JoinSet::new();
    loop {
        tokio::select! {
            maybe_init = key_needed.recv() => match maybe_init {
                Some(init_data) => {
                    let sink = sink.clone();
                    let config = config.clone();
                    let client = client.clone();
                    let certificate = certificate.clone();
                    let events = events.clone();
                    branches.spawn(async move {
                        run_session(
                            sink.as_ref(),
                            &config.key_system,
                            &client,
                            &init_data,
                            certificate.as_ref(),
                            &events,
                        )
                        .await;
                    });
                }
                None => break,
            },
            Some(_) = branches.join_next(), if !branches.is_empty() => {}
        }
    }

    while branches.join_next().await.is_some() {}
}

/// One per-session branch: open a key session for the init data and answer
/// its key messages until the environment tears it down.
async fn run_session(
    sink: &dyn VideoSink,
    key_system: &str,
    client: &LicenseClient,
    init_data: &[u8],
    certificate: &[u8],
    events: &mpsc::UnboundedSender<HandshakeEvent>,
) {
    let content_id = extract_content_id(init_data);
    let request = build_key_request(init_data, &content_id, certificate);

    let Some(mut session) = KeySession::open(sink, key_system, &request, &content_id) else {
        debug!("Key session declined for content id {:?}", &content_id);
        let _ = events.send(HandshakeEvent::SessionDeclined { content_id });
        return;
    };
    debug!("Key session open for content id {:?}", &content_id);
    let _ = events.send(HandshakeEvent::SessionOpened {
        content_id: content_id.clone(),
    });

    while let Some(event) = session.next_event().await {
        match event {
            SessionEvent::KeyMessage(message) => {
                let license = match client.fetch_license(&content_id, &message).await {
                    Ok(license) => license,
                    Err(err) => {
                        error!("License request failed for {:?}: {}", &content_id, &err);
                        let _ = events.send(HandshakeEvent::LicenseFailed {
                            content_id: content_id.clone(),
                        });
                        continue;
                    }
                };

                if let Err(err) = session.apply_license(&license).await {
                    error!("License update rejected for {:?}: {}", &content_id, &err);
                    let _ = events.send(HandshakeEvent::LicenseFailed {
                        content_id: content_id.clone(),
                    });
                    continue;
                }

                let _ = events.send(HandshakeEvent::LicenseApplied {
                    content_id: content_id.clone(),
                });
            }
            SessionEvent::KeyAdded => {
                info!("Key added for content id {:?}", &content_id);
            }
            SessionEvent::KeyError(message) => {
                error!("Key error for content id {:?}: {}", &content_id, &message);
            }
        }
    }
}
