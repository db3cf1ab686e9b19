//! TCP option parsing and the option interning table (component C3).
//!
//! Option element layout follows RFC 793/1323/2018; parsing style is
//! adapted from how `etherparse` walks a TCP option buffer byte by
//! byte rather than overlaying a struct.

use crate::codec::{SackEncoding, TsEncoding};

/// A single TCP option, decoded from its kind byte and, where
/// applicable, its length-prefixed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TcpOptionElement {
    Eol,
    Nop,
    Mss(u16),
    WindowScale(u8),
    SackPermitted,
    Sack(Vec<(u32, u32)>),
    Timestamp { val: u32, ecr: u32 },
    /// An option kind this profile doesn't interpret. Carried opaquely
    /// so the index-table bookkeeping still works, but context C3
    /// refuses to compress it (see `OptionTable::classify`).
    Unknown { kind: u8, data: Vec<u8> },
}

impl TcpOptionElement {
    pub fn kind(&self) -> u8 {
        match self {
            TcpOptionElement::Eol => 0,
            TcpOptionElement::Nop => 1,
            TcpOptionElement::Mss(_) => 2,
            TcpOptionElement::WindowScale(_) => 3,
            TcpOptionElement::SackPermitted => 4,
            TcpOptionElement::Sack(_) => 5,
            TcpOptionElement::Timestamp { .. } => 8,
            TcpOptionElement::Unknown { kind, .. } => *kind,
        }
    }
}

/// Walks a raw TCP options buffer (already sliced to `data_offset`)
/// into a list of elements. Malformed trailing bytes (declared length
/// running past the buffer) truncate the walk rather than erroring —
/// the option list is advisory context, not something whose corruption
/// should abort header parsing.
pub fn parse_options(mut data: &[u8]) -> Vec<TcpOptionElement> {
    let mut out = Vec::new();
    while !data.is_empty() {
        match data[0] {
            0 => {
                out.push(TcpOptionElement::Eol);
                break;
            }
            1 => {
                out.push(TcpOptionElement::Nop);
                data = &data[1..];
            }
            kind => {
                if data.len() < 2 {
                    break;
                }
                let len = data[1] as usize;
                if len < 2 || data.len() < len {
                    break;
                }
                let value = &data[2..len];
                let element = match kind {
                    2 if value.len() == 2 => {
                        TcpOptionElement::Mss(u16::from_be_bytes([value[0], value[1]]))
                    }
                    3 if value.len() == 1 => TcpOptionElement::WindowScale(value[0]),
                    4 if value.is_empty() => TcpOptionElement::SackPermitted,
                    5 if value.len() % 8 == 0 => {
                        let blocks = value
                            .chunks_exact(8)
                            .map(|c| {
                                (
                                    u32::from_be_bytes([c[0], c[1], c[2], c[3]]),
                                    u32::from_be_bytes([c[4], c[5], c[6], c[7]]),
                                )
                            })
                            .collect();
                        TcpOptionElement::Sack(blocks)
                    }
                    8 if value.len() == 8 => TcpOptionElement::Timestamp {
                        val: u32::from_be_bytes([value[0], value[1], value[2], value[3]]),
                        ecr: u32::from_be_bytes([value[4], value[5], value[6], value[7]]),
                    },
                    _ => TcpOptionElement::Unknown {
                        kind,
                        data: value.to_vec(),
                    },
                };
                out.push(element);
                data = &data[len..];
            }
        }
    }
    out
}

/// Reserved indices for option kinds the profile always recognizes
/// (§4.3). Dynamic slots fill the rest of the 16-entry table.
pub const INDEX_EOL: u8 = 0;
pub const INDEX_NOP: u8 = 1;
pub const INDEX_MSS: u8 = 2;
pub const INDEX_WS: u8 = 3;
pub const INDEX_SACK_PERMITTED: u8 = 4;
pub const INDEX_SACK: u8 = 5;
pub const INDEX_TIMESTAMP: u8 = 8;

pub const MAX_TCP_OPTION_INDEX: usize = 16;

const DYNAMIC_INDICES: [u8; 9] = [6, 7, 9, 10, 11, 12, 13, 14, 15];
const ARENA_SIZE: usize = 128;

/// A single occupied slot in the option table: which option kind owns
/// it and a snapshot of the raw option bytes last seen for it (used to
/// detect a value change that forces reallocation, §4.3 step 4).
#[derive(Debug, Clone, PartialEq, Eq)]
struct Slot {
    kind: u8,
    /// Offset and length into the table's arena of the value bytes
    /// last cached for this slot (MSS/WS's verbatim value, or an
    /// unknown kind's opaque payload).
    arena_range: Option<(usize, usize)>,
    established: bool,
}

/// The per-context TCP option index table (component C3): a 16-slot
/// allocator mapping option kinds to small indices, plus a bump arena
/// for caching the raw value of non-fixed-shape options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionTable {
    slots: [Option<Slot>; MAX_TCP_OPTION_INDEX],
    arena: Vec<u8>,
}

impl Default for OptionTable {
    fn default() -> Self {
        Self::new()
    }
}

impl OptionTable {
    pub fn new() -> Self {
        const NONE: Option<Slot> = None;
        let mut slots = [NONE; MAX_TCP_OPTION_INDEX];
        // The kind-to-index mapping for these seven is fixed by the
        // profile, so no packet ever needs to allocate it — but that is
        // not the same as the decompressor already knowing the *value*.
        // Eol/Nop/SackPermitted carry no value at all (`Fixed`), so
        // there is nothing to establish; Mss/WindowScale start
        // unestablished so their first real occurrence still transmits
        // a value. Sack/Timestamp are written unconditionally by
        // `builder::write_tcp_option_list` regardless of `established`,
        // so their initial flag value doesn't matter.
        slots[INDEX_EOL as usize] = Some(Slot { kind: 0, arena_range: None, established: true });
        slots[INDEX_NOP as usize] = Some(Slot { kind: 1, arena_range: None, established: true });
        slots[INDEX_MSS as usize] = Some(Slot { kind: 2, arena_range: None, established: false });
        slots[INDEX_WS as usize] = Some(Slot { kind: 3, arena_range: None, established: false });
        slots[INDEX_SACK_PERMITTED as usize] =
            Some(Slot { kind: 4, arena_range: None, established: true });
        slots[INDEX_SACK as usize] = Some(Slot { kind: 5, arena_range: None, established: false });
        slots[INDEX_TIMESTAMP as usize] =
            Some(Slot { kind: 8, arena_range: None, established: false });
        Self { slots, arena: Vec::with_capacity(ARENA_SIZE) }
    }

    /// Finds the existing index for `kind`, if any reserved or dynamic
    /// slot already holds it.
    pub fn find_index(&self, kind: u8) -> Option<u8> {
        self.slots.iter().enumerate().find_map(|(i, slot)| {
            slot.as_ref()
                .filter(|s| s.kind == kind)
                .map(|_| i as u8)
        })
    }

    /// Runs the per-packet indexing protocol for one option kind:
    /// returns `Some(index)` if the kind already has (or was just
    /// given) a stable slot, establishing it as needed; `None` if the
    /// table is full and the kind is being dropped as uncompressible.
    pub fn index_for(&mut self, kind: u8) -> Option<u8> {
        if let Some(i) = self.find_index(kind) {
            return Some(i);
        }
        for &i in &DYNAMIC_INDICES {
            if self.slots[i as usize].is_none() {
                self.slots[i as usize] =
                    Some(Slot { kind, arena_range: None, established: false });
                return Some(i);
            }
        }
        log::warn!("tcp option table full, dropping option kind {kind} as uncompressible");
        None
    }

    /// Whether index `i`'s kind has already been confirmed to the
    /// decompressor (an IR/IR-DYN or acknowledged update was sent for
    /// it), per the index-established/reuse/reallocate state machine.
    pub fn is_established(&self, index: u8) -> bool {
        self.slots[index as usize]
            .as_ref()
            .map(|s| s.established)
            .unwrap_or(false)
    }

    pub fn mark_established(&mut self, index: u8) {
        if let Some(slot) = &mut self.slots[index as usize] {
            slot.established = true;
        }
    }

    /// Bump-allocates `data` into the arena and points slot `index` at
    /// it. Returns the byte range the value now occupies, or `None` if
    /// the arena is full (the slot keeps whatever it cached before).
    fn cache_value(&mut self, index: u8, data: &[u8]) -> Option<(usize, usize)> {
        if self.arena.len() + data.len() > ARENA_SIZE {
            log::warn!("tcp option arena exhausted, dropping value for index {index}");
            return None;
        }
        let start = self.arena.len();
        self.arena.extend_from_slice(data);
        let range = (start, start + data.len());
        if let Some(slot) = &mut self.slots[index as usize] {
            slot.arena_range = Some(range);
        }
        Some(range)
    }

    /// The value bytes last cached for slot `index`, if any.
    pub fn cached_value(&self, index: u8) -> Option<&[u8]> {
        let (start, end) = self.slots[index as usize].as_ref()?.arena_range?;
        Some(&self.arena[start..end])
    }

    /// Runs §4.3 steps 3/4 for an option that already has a slot: if
    /// `value` matches what's cached, this is a plain index reuse
    /// (`Some(index), false`). If it differs, a reserved slot (its
    /// index fixed by `kind_to_index`, step 1) just updates its cached
    /// value in place; a dynamic slot instead searches the other
    /// dynamic indices for a free one and reallocates there, freeing
    /// the old slot, so a stale kind/value pairing never lingers under
    /// two indices at once. Either way the caller gets back the index
    /// to use and whether a value must be sent this packet. Returns
    /// `None` only when a dynamic slot needed reallocation and the
    /// table was full (the caller drops the option, per step 4).
    pub fn note_value(&mut self, index: u8, kind: u8, value: &[u8]) -> Option<(u8, bool)> {
        if self.cached_value(index) == Some(value) {
            return Some((index, false));
        }
        if DYNAMIC_INDICES.contains(&index) {
            let free = DYNAMIC_INDICES
                .iter()
                .copied()
                .find(|&i| i != index && self.slots[i as usize].is_none());
            let Some(new_index) = free else {
                log::warn!("tcp option table full, dropping kind {kind} on value change");
                return None;
            };
            self.slots[index as usize] = None;
            self.slots[new_index as usize] =
                Some(Slot { kind, arena_range: None, established: false });
            self.cache_value(new_index, value);
            return Some((new_index, true));
        }
        self.cache_value(index, value);
        Some((index, true))
    }
}

/// Whether a given option can be compressed by this profile at all.
/// Per the reserved-kind-only policy: an unrecognized option kind is
/// refused rather than ever emitted as an opaque filler item.
pub fn is_compressible(option: &TcpOptionElement) -> bool {
    !matches!(option, TcpOptionElement::Unknown { .. })
}

/// A compressed-form representation of one option slot's value, ready
/// for `builder` to write into the compressed option list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompressedOptionValue {
    /// Reserved option with no per-packet value (NOP, SACK-permitted,
    /// EOL): presence alone is enough.
    Fixed,
    Mss(u16),
    WindowScale(u8),
    Timestamp(TsValueEncoding),
    Sack(Vec<SackBlockEncoding>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsValueEncoding {
    pub val: TsEncoding,
    pub ecr: TsEncoding,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SackBlockEncoding {
    pub left: SackEncoding,
    pub right: SackEncoding,
}

/// Builds the compressed value for one option against the context's
/// remembered previous value, per §4.3's per-kind codecs: Timestamp's
/// TSval and TSecr are each `ts_lsb`-encoded against their own cached
/// previous value, not against each other. Returns `None` for options
/// this profile never emits a value (the reserved fixed-shape markers).
pub fn compress_value(
    option: &TcpOptionElement,
    prev_ts_val: u32,
    prev_ts_ecr: u32,
    ack_number: u32,
) -> Option<CompressedOptionValue> {
    match option {
        TcpOptionElement::Eol
        | TcpOptionElement::Nop
        | TcpOptionElement::SackPermitted => Some(CompressedOptionValue::Fixed),
        TcpOptionElement::Mss(v) => Some(CompressedOptionValue::Mss(*v)),
        TcpOptionElement::WindowScale(v) => Some(CompressedOptionValue::WindowScale(*v)),
        TcpOptionElement::Timestamp { val, ecr } => Some(CompressedOptionValue::Timestamp(
            TsValueEncoding {
                val: TsEncoding::encode(prev_ts_val, *val),
                ecr: TsEncoding::encode(prev_ts_ecr, *ecr),
            },
        )),
        TcpOptionElement::Sack(blocks) => Some(CompressedOptionValue::Sack(
            blocks
                .iter()
                .map(|(l, r)| SackBlockEncoding {
                    left: SackEncoding::encode(ack_number, *l),
                    right: SackEncoding::encode(ack_number, *r),
                })
                .collect(),
        )),
        TcpOptionElement::Unknown { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opt(kind: u8, value: &[u8]) -> Vec<u8> {
        let mut v = vec![kind, (value.len() + 2) as u8];
        v.extend_from_slice(value);
        v
    }

    #[test]
    fn parses_nop_and_eol() {
        let data = [1, 1, 0];
        let parsed = parse_options(&data);
        assert_eq!(parsed, vec![TcpOptionElement::Nop, TcpOptionElement::Nop, TcpOptionElement::Eol]);
    }

    #[test]
    fn parses_mss_and_window_scale() {
        let mut data = opt(2, &1460u16.to_be_bytes());
        data.extend(opt(3, &[7]));
        let parsed = parse_options(&data);
        assert_eq!(
            parsed,
            vec![TcpOptionElement::Mss(1460), TcpOptionElement::WindowScale(7)]
        );
    }

    #[test]
    fn parses_timestamp() {
        let mut value = Vec::new();
        value.extend_from_slice(&1000u32.to_be_bytes());
        value.extend_from_slice(&2000u32.to_be_bytes());
        let data = opt(8, &value);
        let parsed = parse_options(&data);
        assert_eq!(parsed, vec![TcpOptionElement::Timestamp { val: 1000, ecr: 2000 }]);
    }

    #[test]
    fn unknown_kind_is_not_compressible() {
        let el = TcpOptionElement::Unknown { kind: 253, data: vec![1, 2] };
        assert!(!is_compressible(&el));
        assert!(compress_value(&el, 0, 0, 0).is_none());
    }

    #[test]
    fn reserved_kinds_are_preindexed() {
        let table = OptionTable::new();
        assert_eq!(table.find_index(2), Some(INDEX_MSS));
        assert_eq!(table.find_index(8), Some(INDEX_TIMESTAMP));
        // The kind-to-index mapping is fixed by the profile, but the
        // actual value still needs a first transmission.
        assert!(!table.is_established(INDEX_MSS));
        assert!(table.is_established(INDEX_NOP));
    }

    #[test]
    fn dynamic_kind_gets_allocated_and_reused() {
        let mut table = OptionTable::new();
        let i1 = table.index_for(250).unwrap();
        assert!(!table.is_established(i1));
        table.mark_established(i1);
        let i2 = table.index_for(250).unwrap();
        assert_eq!(i1, i2);
        assert!(table.is_established(i2));
    }

    #[test]
    fn table_exhaustion_drops_new_kinds() {
        let mut table = OptionTable::new();
        for kind in 200..209u8 {
            table.index_for(kind);
        }
        assert!(table.index_for(209).is_none());
    }

    #[test]
    fn note_value_reuses_index_when_value_unchanged() {
        let mut table = OptionTable::new();
        let i = table.index_for(2).unwrap();
        let (idx, changed) = table.note_value(i, 2, &1460u16.to_be_bytes()).unwrap();
        assert_eq!(idx, INDEX_MSS);
        assert!(changed, "first value always needs sending");
        let (idx, changed) = table.note_value(i, 2, &1460u16.to_be_bytes()).unwrap();
        assert_eq!(idx, INDEX_MSS);
        assert!(!changed, "unchanged value is a plain reuse");
    }

    #[test]
    fn note_value_on_reserved_slot_updates_in_place() {
        let mut table = OptionTable::new();
        let i = table.index_for(2).unwrap();
        table.note_value(i, 2, &1460u16.to_be_bytes());
        let (idx, changed) = table.note_value(i, 2, &1400u16.to_be_bytes()).unwrap();
        // MSS's index is fixed by kind_to_index; a changed value can't
        // move it, it just resends in place.
        assert_eq!(idx, INDEX_MSS);
        assert!(changed);
    }

    #[test]
    fn note_value_on_dynamic_slot_reallocates_on_change() {
        let mut table = OptionTable::new();
        let i1 = table.index_for(250).unwrap();
        table.note_value(i1, 250, &[1, 2, 3]);
        let (i2, changed) = table.note_value(i1, 250, &[9, 9, 9]).unwrap();
        assert_ne!(i1, i2, "a changed value on a dynamic slot reallocates");
        assert!(changed);
        // the old slot is freed, not left dangling under the same kind
        assert_eq!(table.find_index(250), Some(i2));
    }

    #[test]
    fn note_value_drops_option_when_no_dynamic_slot_is_free() {
        let mut table = OptionTable::new();
        for kind in 200..209u8 {
            let i = table.index_for(kind).unwrap();
            table.note_value(i, kind, &[kind]);
        }
        let i = table.index_for(200).unwrap();
        assert!(table.note_value(i, 200, &[255]).is_none());
    }
}
