//! The compressed packet formats (component C4's output alphabet) and
//! their wire discriminators and field widths (§4.4, §6).
//!
//! Discriminator bit patterns follow RFC 6846 §7.3.2 variable-length
//! "this is my shape" prefixes: `co_common` and the IR formats use a
//! full leading octet, `seq_*`/`rnd_*` use the shortest unambiguous
//! prefix the family allows.

/// One compressed-header shape the classifier can choose (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketFormat {
    Ir,
    IrDyn,
    CoCommon,
    Rnd1,
    Rnd2,
    Rnd3,
    Rnd4,
    Rnd5,
    Rnd6,
    Rnd7,
    Rnd8,
    Seq1,
    Seq2,
    Seq3,
    Seq4,
    Seq5,
    Seq6,
    Seq7,
    Seq8,
}

/// A format's first-byte (or first-bits) discriminator: `width` bits
/// of `pattern`, MSB-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Discriminator {
    pub pattern: u32,
    pub width: u8,
}

impl PacketFormat {
    pub fn discriminator(self) -> Discriminator {
        match self {
            PacketFormat::Ir => Discriminator { pattern: 0b1111_1101, width: 8 },
            PacketFormat::IrDyn => Discriminator { pattern: 0b1111_1000, width: 8 },
            PacketFormat::CoCommon => Discriminator { pattern: 0b1111_1010, width: 8 },
            PacketFormat::Rnd1 => Discriminator { pattern: 0b1, width: 1 },
            PacketFormat::Rnd2 => Discriminator { pattern: 0b0000_0001, width: 8 },
            PacketFormat::Rnd3 => Discriminator { pattern: 0b00, width: 2 },
            PacketFormat::Rnd4 => Discriminator { pattern: 0b0000_0001_1, width: 9 },
            PacketFormat::Rnd5 => Discriminator { pattern: 0b0000_0001_0, width: 9 },
            PacketFormat::Rnd6 => Discriminator { pattern: 0b0000_0011, width: 8 },
            PacketFormat::Rnd7 => Discriminator { pattern: 0b1010, width: 4 },
            PacketFormat::Rnd8 => Discriminator { pattern: 0b1011_1101, width: 8 },
            PacketFormat::Seq1 => Discriminator { pattern: 0b1010, width: 4 },
            PacketFormat::Seq2 => Discriminator { pattern: 0b11000, width: 5 },
            PacketFormat::Seq3 => Discriminator { pattern: 0b0, width: 1 },
            PacketFormat::Seq4 => Discriminator { pattern: 0b0001, width: 4 },
            PacketFormat::Seq5 => Discriminator { pattern: 0b1000, width: 4 },
            PacketFormat::Seq6 => Discriminator { pattern: 0b1001, width: 4 },
            PacketFormat::Seq7 => Discriminator { pattern: 0b1100, width: 4 },
            PacketFormat::Seq8 => Discriminator { pattern: 0b1011_1100, width: 8 },
        }
    }
}

/// The `(k, p)` interpretation-interval parameters for the primary
/// field a format carries (§4.1's `lsb`/`lsb_window_covers`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub k: u8,
    pub p: i64,
}

/// Width/offset of the sequence-number field each `seq_*`/`rnd_*`
/// format carries — transcribed directly from §4.4's condensed
/// per-format table. `seq_3`/`rnd_3` and `seq_7`/`rnd_7` carry no seq
/// field at all (seq must match the context exactly); `seq_2`/`rnd_2`
/// and `seq_6`/`rnd_6` carry the *scaled* quotient rather than a raw
/// LSB window (see `seq_is_scaled`), over the same `(k, p)`.
pub fn seq_field_spec(format: PacketFormat) -> Option<FieldSpec> {
    match format {
        PacketFormat::Seq1 | PacketFormat::Rnd1 => Some(FieldSpec { k: 16, p: 32767 }),
        PacketFormat::Seq2 | PacketFormat::Rnd2 => Some(FieldSpec { k: 4, p: 7 }),
        PacketFormat::Seq3 | PacketFormat::Rnd3 => None,
        PacketFormat::Seq4 | PacketFormat::Rnd4 => None,
        PacketFormat::Seq5 | PacketFormat::Rnd5 => Some(FieldSpec { k: 16, p: 32767 }),
        PacketFormat::Seq6 | PacketFormat::Rnd6 => Some(FieldSpec { k: 4, p: 7 }),
        PacketFormat::Seq7 | PacketFormat::Rnd7 => None,
        PacketFormat::Seq8 => Some(FieldSpec { k: 14, p: 8191 }),
        PacketFormat::Rnd8 => Some(FieldSpec { k: 16, p: 65535 }),
        PacketFormat::Ir | PacketFormat::IrDyn | PacketFormat::CoCommon => None,
    }
}

/// ACK-number field spec, carried by formats that include an ACK
/// delta (the rest recover ACK either from context or, for
/// `ack_is_scaled` formats, from the scaled residue, §4.1).
pub fn ack_field_spec(format: PacketFormat) -> Option<FieldSpec> {
    match format {
        PacketFormat::Seq1 | PacketFormat::Rnd1 => None,
        PacketFormat::Seq2 | PacketFormat::Rnd2 => None,
        PacketFormat::Seq3 | PacketFormat::Rnd3 => Some(FieldSpec { k: 16, p: 16383 }),
        PacketFormat::Seq4 | PacketFormat::Rnd4 => Some(FieldSpec { k: 4, p: 3 }),
        PacketFormat::Seq5 | PacketFormat::Rnd5 => Some(FieldSpec { k: 16, p: 16383 }),
        PacketFormat::Seq6 | PacketFormat::Rnd6 => Some(FieldSpec { k: 16, p: 16383 }),
        PacketFormat::Seq7 | PacketFormat::Rnd7 => Some(FieldSpec { k: 16, p: 32767 }),
        PacketFormat::Seq8 => Some(FieldSpec { k: 15, p: 8191 }),
        PacketFormat::Rnd8 => Some(FieldSpec { k: 16, p: 65535 }),
        PacketFormat::Ir | PacketFormat::IrDyn | PacketFormat::CoCommon => None,
    }
}

/// Width/offset of the `ip_id` field a `seq_*` format carries (§4.4):
/// the `rnd_*` family has none at all — an innermost `Random` IP-ID
/// rides the irregular chain as a full 16-bit value instead
/// (`ip::write_irregular_chain`), and `co_common`'s ip_id is the
/// self-describing `variable_length_32` form, not an LSB window.
pub fn ip_id_field_spec(format: PacketFormat) -> Option<FieldSpec> {
    match format {
        PacketFormat::Seq1 | PacketFormat::Seq3 | PacketFormat::Seq5 | PacketFormat::Seq8 => {
            Some(FieldSpec { k: 4, p: 3 })
        }
        PacketFormat::Seq2 | PacketFormat::Seq6 => Some(FieldSpec { k: 7, p: 3 }),
        PacketFormat::Seq4 => Some(FieldSpec { k: 3, p: 1 }),
        PacketFormat::Seq7 => Some(FieldSpec { k: 5, p: 3 }),
        PacketFormat::Rnd1
        | PacketFormat::Rnd2
        | PacketFormat::Rnd3
        | PacketFormat::Rnd4
        | PacketFormat::Rnd5
        | PacketFormat::Rnd6
        | PacketFormat::Rnd7
        | PacketFormat::Rnd8
        | PacketFormat::Ir
        | PacketFormat::IrDyn
        | PacketFormat::CoCommon => None,
    }
}

/// Whether a format's seq field (see `seq_field_spec`) carries the
/// scaled quotient (`seq_number / payload_len`) rather than the raw
/// value — `seq_2`/`rnd_2`, `seq_6`/`rnd_6` (§4.1, §4.4).
pub fn seq_is_scaled(format: PacketFormat) -> bool {
    matches!(
        format,
        PacketFormat::Seq2 | PacketFormat::Rnd2 | PacketFormat::Seq6 | PacketFormat::Rnd6
    )
}

/// Whether a format's ack field (see `ack_field_spec`) carries the
/// scaled quotient (`ack_number / ack_stride`) rather than the raw
/// value — `seq_4`/`rnd_4` (§4.1, §4.4).
pub fn ack_is_scaled(format: PacketFormat) -> bool {
    matches!(format, PacketFormat::Seq4 | PacketFormat::Rnd4)
}

/// Which CRC width a format's trailing CRC field uses (§4.1).
pub fn crc_width(format: PacketFormat) -> crate::crc::CrcWidth {
    match format {
        PacketFormat::Ir | PacketFormat::IrDyn => crate::crc::CrcWidth::Crc8,
        PacketFormat::CoCommon | PacketFormat::Rnd8 | PacketFormat::Seq8 => {
            crate::crc::CrcWidth::Crc7
        }
        _ => crate::crc::CrcWidth::Crc3,
    }
}

/// Priority order the classifier tries `seq_*` formats in, first
/// covering candidate wins (§4.4).
pub const SEQ_PRIORITY: [PacketFormat; 8] = [
    PacketFormat::Seq1,
    PacketFormat::Seq2,
    PacketFormat::Seq3,
    PacketFormat::Seq4,
    PacketFormat::Seq5,
    PacketFormat::Seq6,
    PacketFormat::Seq7,
    PacketFormat::Seq8,
];

/// Priority order for the `rnd_*` family.
pub const RND_PRIORITY: [PacketFormat; 8] = [
    PacketFormat::Rnd1,
    PacketFormat::Rnd2,
    PacketFormat::Rnd3,
    PacketFormat::Rnd4,
    PacketFormat::Rnd5,
    PacketFormat::Rnd6,
    PacketFormat::Rnd7,
    PacketFormat::Rnd8,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_seq_and_rnd_format_has_a_field_spec() {
        for f in SEQ_PRIORITY.iter().chain(RND_PRIORITY.iter()) {
            assert!(
                seq_field_spec(*f).is_some() || ack_field_spec(*f).is_some(),
                "{f:?} missing a field spec"
            );
        }
    }

    #[test]
    fn scaled_formats_carry_the_field_they_scale() {
        for f in [PacketFormat::Seq2, PacketFormat::Rnd2, PacketFormat::Seq6, PacketFormat::Rnd6] {
            assert!(seq_is_scaled(f));
            assert!(seq_field_spec(f).is_some());
        }
        for f in [PacketFormat::Seq4, PacketFormat::Rnd4] {
            assert!(ack_is_scaled(f));
            assert!(ack_field_spec(f).is_some());
        }
    }

    #[test]
    fn seq_formats_carry_ip_id_and_rnd_formats_never_do() {
        for f in SEQ_PRIORITY {
            assert!(ip_id_field_spec(f).is_some(), "{f:?} should carry an ip_id field");
        }
        for f in RND_PRIORITY {
            assert!(ip_id_field_spec(f).is_none(), "{f:?} should carry no ip_id field");
        }
    }

    #[test]
    fn discriminators_are_distinct_within_each_family() {
        let mut seen = Vec::new();
        for f in SEQ_PRIORITY {
            let d = f.discriminator();
            assert!(!seen.contains(&(d.pattern, d.width)));
            seen.push((d.pattern, d.width));
        }
    }
}
