//! Error and outcome types for the compressor entry points (§7).
//!
//! Ineligibility is reported through [`ContextMatch`], not `Err` — a
//! packet that doesn't belong to this profile or this context isn't a
//! failure, it's a routing decision for the host multiplexer (§6).
//! [`CompressError`] is reserved for the few genuinely exceptional
//! conditions: a destination buffer too small to hold the result.

use thiserror::Error;

/// Outcome of `check_context` (§3 invariant I5, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextMatch {
    /// The packet matches this context's flow identity and can be
    /// compressed against it.
    Belongs,
    /// The packet's flow identity doesn't match this context; the host
    /// should try a different context or profile.
    NotBelongs,
    /// The packet matches the flow but uses a feature this profile
    /// doesn't cover (fragmentation, IPv4 options, unsupported IPv6
    /// extension combination, unknown TCP option kind with generic
    /// options disabled, ESP). Not a routing decision — the packet
    /// simply cannot be compressed by any context of this profile.
    CannotCompress,
}

#[derive(Debug, Error)]
pub enum CompressError {
    #[error("destination buffer too small: need at least {needed} bytes, have {available}")]
    BufferTooSmall { needed: usize, available: usize },

    #[error("packet does not belong to this context or cannot be compressed by this profile")]
    NotCompressible(ContextMatch),
}
