//! Compressor-side engine for the ROHC TCP/IP header compression
//! profile (RFC 6846, profile `0x0006`).
//!
//! On every packet of a long-lived TCP flow, [`builder::compress`]
//! replaces the outer IP header(s), the TCP header, and the TCP
//! options with a short compressed header a cooperating decompressor
//! can expand back to the original bytes using synchronized per-flow
//! [`context::Context`]. Decompression, CID framing, profile
//! multiplexing across flows, and the feedback channel are external
//! concerns — see [`iface`] for the seams a host plugs into.
//!
//! ```text
//! ip::walk + tcp::parse  ->  classifier::classify  ->  builder::compress
//!        (packet.rs)              (picks a format)      (emits bytes,
//!                                                         commits context)
//! ```

pub mod bitstream;
pub mod builder;
pub mod classifier;
pub mod codec;
pub mod context;
pub mod crc;
pub mod error;
pub mod format;
pub mod iface;
pub mod ip;
pub mod packet;
pub mod tcp;

pub use builder::{compress, CompressOutput};
pub use context::Context;
pub use error::{CompressError, ContextMatch};
