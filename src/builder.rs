//! Header builder and context updater (component C5, §4.5): the
//! `compress()` entry point that ties the classifier, codecs, and IP/
//! TCP chain writers together into an emitted packet.

use crate::bitstream::BitWriter;
use crate::classifier::{classify, ClassifyInput};
use crate::codec::{lsb, observed_stride, ScaledValue, VarLen32};
use crate::context::{CompressorState, Context, IpStackEntry};
use crate::crc::CrcWidth;
use crate::error::CompressError;
use crate::format::{self, PacketFormat};
use crate::ip::{self, IpHeaderView};
use crate::packet::{parse_packet, PacketParseError};
use crate::tcp::options::{self, CompressedOptionValue, OptionTable};
use crate::tcp::TcpHeaderFields;

/// Result of a successful `compress()` call (§4.5, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressOutput {
    /// Number of compressed-header bytes written to the destination
    /// buffer, starting at offset 0.
    pub header_len: usize,
    /// Offset into the *original* packet where the TCP payload began;
    /// the host copies `packet[payload_offset..]` after the emitted
    /// header.
    pub payload_offset: usize,
    /// Whether this packet was forced to `IR` (a decompressor-visible
    /// resync, not a failure).
    pub forced_ir: bool,
}

/// Compresses one packet against `ctx`, writing the result into
/// `dest` and committing the new context state on success (§4.5's
/// "Commit", invariant I2).
pub fn compress(ctx: &mut Context, packet: &[u8], dest: &mut [u8]) -> Result<CompressOutput, CompressError> {
    let parsed = parse_packet(packet).map_err(ineligible_to_error)?;
    let payload_len = packet.len().saturating_sub(parsed.payload_offset);

    if ctx.state != CompressorState::Ir
        && crate::classifier::requires_ir_resync(ctx, &parsed.ip_stack.headers, &parsed.tcp)
    {
        log::info!("forcing IR resync");
        ctx.force_ir();
    }
    let forced_ir = ctx.state == CompressorState::Ir;

    let mut w = BitWriter::new();
    let mut options = ctx.options.clone();
    match ctx.state {
        CompressorState::Ir => build_ir(
            ctx,
            &parsed.ip_stack.headers,
            &parsed.ip_stack.extensions,
            &parsed.tcp,
            &mut options,
            &mut w,
        ),
        CompressorState::Fo => {
            build_ir_dyn(ctx, &parsed.ip_stack.headers, &parsed.tcp, &mut options, &mut w)
        }
        CompressorState::So => {
            let format = classify(ClassifyInput {
                ip_headers: &parsed.ip_stack.headers,
                tcp: &parsed.tcp,
                ctx,
                payload_len,
            });
            build_co(
                ctx,
                format,
                &parsed.ip_stack.headers,
                &parsed.ip_stack.extensions,
                &parsed.tcp,
                payload_len,
                &mut options,
                &mut w,
            );
        }
    }

    let bytes = w.into_vec();
    if bytes.len() > dest.len() {
        return Err(CompressError::BufferTooSmall { needed: bytes.len(), available: dest.len() });
    }
    dest[..bytes.len()].copy_from_slice(&bytes);

    // The option table built against a scratch clone above only becomes
    // real once this packet's bytes are known to fit; it lands in the
    // context alongside the rest of commit's bookkeeping.
    ctx.options = options;
    ctx.commit(&parsed.ip_stack.headers, &parsed.tcp, payload_len);

    Ok(CompressOutput {
        header_len: bytes.len(),
        payload_offset: parsed.payload_offset,
        forced_ir,
    })
}

fn ineligible_to_error(err: PacketParseError) -> CompressError {
    log::debug!("packet ineligible for compression: {err}");
    CompressError::NotCompressible(crate::error::ContextMatch::CannotCompress)
}

/// Writes the full static + dynamic chains plus the TCP static/
/// dynamic parts and option list, then an overall CRC-8 — the `IR`
/// format (§4.5).
fn build_ir(
    ctx: &Context,
    ip_headers: &[IpHeaderView],
    extensions: &[Vec<ip::ext::ExtensionHeader>],
    tcp: &TcpHeaderFields,
    options: &mut OptionTable,
    w: &mut BitWriter,
) {
    w.write_u8(PacketFormat::Ir.discriminator().pattern as u8);
    w.write_u8(0x06); // ROHC TCP profile number
    let crc_offset = w.len();
    w.write_u8(0); // CRC-8 placeholder

    for (header, exts) in ip_headers.iter().zip(extensions.iter()) {
        ip::write_static_chain(header, w);
        ip::write_extensions_static(exts, w);
    }
    write_tcp_static(tcp, w);

    write_ip_dynamic_chains(ctx, ip_headers, w);
    write_tcp_dynamic(ctx, tcp, options, w);

    let crc = CrcWidth::Crc8.compute(w.as_slice());
    w.patch_u8(crc_offset, crc);
}

/// Like `build_ir` but omits the static chain — used once the
/// compressor has reached `FO` and only needs to refresh the dynamic
/// fields (§4.5).
fn build_ir_dyn(
    ctx: &Context,
    ip_headers: &[IpHeaderView],
    tcp: &TcpHeaderFields,
    options: &mut OptionTable,
    w: &mut BitWriter,
) {
    w.write_u8(PacketFormat::IrDyn.discriminator().pattern as u8);
    w.write_u8(0x06);
    let crc_offset = w.len();
    w.write_u8(0);

    write_ip_dynamic_chains(ctx, ip_headers, w);
    write_tcp_dynamic(ctx, tcp, options, w);

    let crc = CrcWidth::Crc8.compute(w.as_slice());
    w.patch_u8(crc_offset, crc);
}

/// Writes one of the small compressed-only formats (§4.5): base
/// header (classifier's chosen format), irregular IP chain, TCP
/// irregular part, compressed option list, CRC.
fn build_co(
    ctx: &mut Context,
    format: PacketFormat,
    ip_headers: &[IpHeaderView],
    extensions: &[Vec<ip::ext::ExtensionHeader>],
    tcp: &TcpHeaderFields,
    payload_len: usize,
    options: &mut OptionTable,
    w: &mut BitWriter,
) {
    let d = format.discriminator();
    w.write_bits(d.pattern as u64, d.width);

    if format == PacketFormat::CoCommon {
        write_co_common_base(ctx, ip_headers, tcp, w);
    } else {
        write_co_base(ctx, format, ip_headers, tcp, payload_len, w);
    }
    w.align_to_byte();
    let crc_offset_bit_aligned = w.len();
    w.write_u8(0); // CRC placeholder, width-specific patch below

    let last_index = ip_headers.len().saturating_sub(1);
    let ecn_used = ctx.tcp.ecn_used;
    let ttl_irregular_chain_flag = ctx.ttl_irregular_chain_flag;
    for (i, (header, exts)) in ip_headers.iter().zip(extensions.iter()).enumerate() {
        let is_innermost = i == last_index;
        ip::write_irregular_chain(header, is_innermost, ecn_used, ttl_irregular_chain_flag, w);
        if let Some(IpStackEntry::V6(fields)) = ctx.ip_stack.get_mut(i) {
            ip::write_extensions_irregular(exts, &mut fields.extensions, w);
        }
    }

    write_tcp_option_list(ctx, options, tcp, w);

    let width = format::crc_width(format);
    let crc = width.compute(w.as_slice());
    w.patch_u8(crc_offset_bit_aligned, crc);
}

/// Writes a `seq_*`/`rnd_*` base header (§4.4): the 4-bit MSN and
/// `psh_flag` every format in both families carries, then `seq_*`'s
/// `ip_id` offset (`rnd_*` carries none — its innermost IP-ID, when
/// `Random`, rides the irregular chain instead via
/// `ip::write_irregular_chain`), then whichever of the seq/ack fields
/// this format's table entry names — scaled quotient or raw LSB, per
/// `format::seq_is_scaled`/`ack_is_scaled`.
fn write_co_base(
    ctx: &Context,
    format: PacketFormat,
    ip_headers: &[IpHeaderView],
    tcp: &TcpHeaderFields,
    payload_len: usize,
    w: &mut BitWriter,
) {
    w.write_bits(lsb(4, ctx.msn as u32) as u64, 4);
    w.write_bit(tcp.flags.psh);

    if let Some(spec) = format::ip_id_field_spec(format) {
        let (behavior, ip_id) = innermost_ip_id(ctx, ip_headers);
        let offset = crate::codec::ip_id_lsb(behavior, spec.k, ip_id, ctx.msn);
        w.write_bits(offset as u64, spec.k);
    }
    if let Some(spec) = format::seq_field_spec(format) {
        let value = if format::seq_is_scaled(format) {
            ScaledValue::compute(tcp.seq_number, payload_len as u32).scaled
        } else {
            tcp.seq_number
        };
        w.write_bits(lsb(spec.k, value) as u64, spec.k);
    }
    if let Some(spec) = format::ack_field_spec(format) {
        let value = if format::ack_is_scaled(format) {
            ScaledValue::compute(tcp.ack_number, ctx.tcp.ack_stride as u32).scaled
        } else {
            tcp.ack_number
        };
        w.write_bits(lsb(spec.k, value) as u64, spec.k);
    }
}

/// The innermost IPv4 header's current wire `ip_id` and the context's
/// established IP-ID behavior for it, for `ip_id_lsb`. Non-IPv4 flows
/// have no IP-ID at all; `Unknown`/`0` degenerates `ip_id_lsb` to an
/// all-zero offset, which is fine since `ip_id_field_spec` only ever
/// applies to `seq_*` formats and an IPv6-only flow always classifies
/// into the `seq_*` family (`classifier::family_priority`).
fn innermost_ip_id(ctx: &Context, ip_headers: &[IpHeaderView]) -> (crate::context::IpIdBehavior, u16) {
    let behavior = match ctx.ip_stack.last() {
        Some(IpStackEntry::V4(f)) => f.ip_id_behavior,
        _ => crate::context::IpIdBehavior::Unknown,
    };
    let ip_id = match ip_headers.last() {
        Some(IpHeaderView::V4(h)) => h.id,
        _ => 0,
    };
    (behavior, ip_id)
}

/// `co_common` always succeeds (§7): a wider, flag-carrying base
/// header used whenever a forcing condition applies or no `seq_*`/
/// `rnd_*` candidate's window covered the real delta. Carries every
/// field a decompressor might need to recover this packet standalone:
/// variable-length-32 seq, ack, ack_stride, a fixed-width window,
/// variable-length-32 ip_id/dscp/ttl for the innermost header, and the
/// MSN, ahead of the option list and CRC `build_co` appends.
fn write_co_common_base(
    ctx: &Context,
    ip_headers: &[IpHeaderView],
    tcp: &TcpHeaderFields,
    w: &mut BitWriter,
) {
    w.write_bit(tcp.flags.ece);
    w.write_bit(tcp.flags.cwr);
    w.write_bit(tcp.flags.urg);
    w.write_bit(tcp.flags.ack);
    w.write_bit(tcp.flags.psh);
    w.write_bits(tcp.rsf_byte() as u64, 3);

    write_var32(VarLen32::encode(ctx.tcp.seq_number, tcp.seq_number), w);
    write_var32(VarLen32::encode(ctx.tcp.ack_number, tcp.ack_number), w);

    let new_ack_stride = match observed_stride(ctx.tcp.ack_number, tcp.ack_number) {
        0 => ctx.tcp.ack_stride,
        delta => delta,
    };
    write_var32(
        VarLen32::encode(ctx.tcp.ack_stride as u32, new_ack_stride as u32),
        w,
    );

    w.write_u16_be(tcp.window);

    let (new_ip_id, new_dscp, new_ttl) = innermost_ip_triplet(ip_headers);
    let (prev_ip_id, prev_dscp, prev_ttl) = innermost_ctx_triplet(ctx);
    write_var32(VarLen32::encode(prev_ip_id, new_ip_id), w);
    write_var32(VarLen32::encode(prev_dscp, new_dscp), w);
    write_var32(VarLen32::encode(prev_ttl, new_ttl), w);

    w.write_u16_be(ctx.msn);

    if tcp.flags.urg {
        w.write_u16_be(tcp.urgent_ptr);
    }
}

/// The innermost header's `(ip_id, dscp, ttl)` as seen on the wire
/// this packet — IPv6 has no IP-ID, so that slot reads 0 and the
/// matching context side (below) also reads 0, keeping the VarLen32
/// encoding `Absent` rather than spuriously signaling a change.
fn innermost_ip_triplet(ip_headers: &[IpHeaderView]) -> (u32, u32, u32) {
    match ip_headers.last() {
        Some(IpHeaderView::V4(h)) => (h.id as u32, h.dscp as u32, h.ttl as u32),
        Some(IpHeaderView::V6(h)) => (0, h.dscp as u32, h.hop_limit as u32),
        None => (0, 0, 0),
    }
}

fn innermost_ctx_triplet(ctx: &Context) -> (u32, u32, u32) {
    match ctx.ip_stack.last() {
        Some(IpStackEntry::V4(f)) => (f.last_ip_id as u32, f.dscp as u32, f.ttl as u32),
        Some(IpStackEntry::V6(f)) => (0, f.dscp as u32, f.ttl as u32),
        None => (0, 0, 0),
    }
}

/// Writes one `variable_length_32` field together with its 2-bit
/// indicator tag — `VarLen32::write` only emits the value bytes, the
/// indicator has to be written alongside for the field to be
/// self-describing on the wire.
fn write_var32(value: VarLen32, w: &mut BitWriter) {
    w.write_bits(value.indicator() as u64, 2);
    value.write(w);
}

fn write_tcp_static(tcp: &TcpHeaderFields, w: &mut BitWriter) {
    w.write_u16_be(tcp.src_port);
    w.write_u16_be(tcp.dst_port);
}

fn write_tcp_dynamic(
    ctx: &Context,
    tcp: &TcpHeaderFields,
    options: &mut OptionTable,
    w: &mut BitWriter,
) {
    w.write_u32_be(tcp.seq_number);
    w.write_u32_be(tcp.ack_number);
    w.write_u16_be(tcp.window);
    w.write_u16_be(tcp.urgent_ptr);
    w.write_u8(tcp.rsf_byte());
    w.write_u16_be(ctx.msn);
    write_tcp_option_list(ctx, options, tcp, w);
}

fn write_ip_dynamic_chains(ctx: &Context, ip_headers: &[IpHeaderView], w: &mut BitWriter) {
    let last_index = ip_headers.len().saturating_sub(1);
    for (i, (header, entry)) in ip_headers.iter().zip(ctx.ip_stack.iter()).enumerate() {
        let is_innermost = i == last_index;
        ip::write_dynamic_chain(header, entry, is_innermost, w);
    }
}

/// Writes the compressed TCP option list: a list-present byte, then
/// one 8-bit XI item (1-bit value-present + 7-bit index) per option.
/// `table` is the caller's scratch clone of `ctx.options` (§4.3): the
/// established/reuse/reallocate bookkeeping lands here and only
/// becomes the context's real table once the caller commits.
fn write_tcp_option_list(
    ctx: &Context,
    table: &mut OptionTable,
    tcp: &TcpHeaderFields,
    w: &mut BitWriter,
) {
    let compressible: Vec<_> = tcp
        .options
        .iter()
        .filter(|o| options::is_compressible(o))
        .collect();

    if compressible.is_empty() {
        w.write_u8(0);
        return;
    }

    w.write_u8(1);
    w.write_u8(compressible.len() as u8);

    for option in &compressible {
        let Some(index) = table.index_for(option.kind()) else {
            continue;
        };
        let established_before = table.is_established(index);
        table.mark_established(index);

        // Timestamp/SACK carry a live value every packet by design
        // (§4.3 step 3's note) regardless of the table's own reuse
        // tracking. MSS/WS instead go through the table's value cache,
        // which also runs step 4's reallocate-on-change path.
        let (index, send_value) = match option_value_bytes(option) {
            Some(bytes) => match table.note_value(index, option.kind(), &bytes) {
                Some(result) => result,
                None => continue,
            },
            None => (
                index,
                !established_before
                    || matches!(
                        option,
                        crate::tcp::options::TcpOptionElement::Timestamp { .. }
                            | crate::tcp::options::TcpOptionElement::Sack(_)
                    ),
            ),
        };

        w.write_bit(send_value);
        w.write_bits(index as u64, 7);
        if send_value {
            write_option_value(ctx, option, tcp.ack_number, w);
        }
    }
}

/// Raw bytes of a fixed-shape option's value, used as the table's
/// value-change key (§4.3 steps 3/4). Only `Mss`/`WindowScale` carry a
/// value stable enough to compare this way: `Sack`/`Timestamp` already
/// resend unconditionally, and `Fixed` options carry no value at all.
fn option_value_bytes(option: &crate::tcp::options::TcpOptionElement) -> Option<Vec<u8>> {
    use crate::tcp::options::TcpOptionElement;
    match option {
        TcpOptionElement::Mss(v) => Some(v.to_be_bytes().to_vec()),
        TcpOptionElement::WindowScale(v) => Some(vec![*v]),
        _ => None,
    }
}

fn write_option_value(
    ctx: &Context,
    option: &crate::tcp::options::TcpOptionElement,
    ack_number: u32,
    w: &mut BitWriter,
) {
    let Some(value) =
        options::compress_value(option, ctx.tcp.last_ts_val, ctx.tcp.last_ts_ecr, ack_number)
    else {
        return;
    };
    match value {
        CompressedOptionValue::Fixed => {}
        CompressedOptionValue::Mss(v) => w.write_u16_be(v),
        CompressedOptionValue::WindowScale(v) => w.write_u8(v),
        CompressedOptionValue::Timestamp(ts) => {
            ts.val.write(w);
            ts.ecr.write(w);
        }
        CompressedOptionValue::Sack(blocks) => {
            w.write_u8(blocks.len() as u8);
            for block in blocks {
                block.left.write(w);
                block.right.write(w);
            }
        }
    }
}
