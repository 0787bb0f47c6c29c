//! rsfairplay - FairPlay Streaming license-acquisition handshake.
//!
//! This crate provides:
//! - Base64 and UTF-16 byte-buffer codecs.
//! - Combined key-request framing for FairPlay license servers.
//! - Capability checks against a playback sink.
//! - The asynchronous certificate/license handshake choreography.
//! - A thin key-session gateway over the environment's key management.
//!
//! Feature flags:
//! - `http`: enable the reqwest-backed default transport.
//! - `log`: enable diagnostic logging through the `log` facade.

#[macro_use]
mod macros;

/// Byte-buffer codec helpers.
pub mod codec;
/// Common error types and Result alias.
pub mod error;
/// Key-request framing.
pub mod framing;
/// Handshake orchestration and configuration.
pub mod handshake;
/// License server client and transport abstraction.
pub mod license;
/// Key session container.
pub mod session;
/// Playback environment traits and capability checks.
pub mod sink;
