//! Kernel modes and the per-lane record layout each one writes.
//!
//! The kernel writes records back to back without any tag or length prefix;
//! the only thing that tells a consumer where a field starts is the mode the
//! session was bound with. Every offset used by the decoder and by the host
//! encoder is derived from [`KernelMode::fields`].

use crate::error::{PipelineError, Result};

pub const NUM_BYTES_PRIVATE_KEY: usize = 32;
pub const NUM_BYTES_COORDINATE: usize = 32;
pub const NUM_BYTES_PUBLIC_KEY: usize = 65;
pub const NUM_BYTES_SHA256: usize = 32;
pub const NUM_BYTES_RIPEMD160: usize = 20;
pub const NUM_BYTES_ADDRESS: usize = 25;

/// Prefix of an uncompressed SEC1 public key.
pub const UNCOMPRESSED_PREFIX: u8 = 0x04;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum KernelMode {
    /// Affine x and y only; the host adds the `0x04` prefix.
    XyCoordinatesOnly = 0,
    UntilPublicKey = 1,
    Ripemd160Only = 2,
    AddressOnly = 3,
    UntilFirstSha256 = 4,
    UntilRipemd160 = 5,
    UntilSecondSha256 = 6,
    UntilThirdSha256 = 7,
    UntilAddress = 8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    PrivateKey,
    /// x (32 bytes) followed by y (32 bytes), both big-endian.
    XyCoordinates,
    PublicKey,
    FirstSha256,
    Ripemd160,
    SecondSha256,
    ThirdSha256,
    Address,
}

impl Field {
    pub const fn len(self) -> usize {
        match self {
            Field::PrivateKey => NUM_BYTES_PRIVATE_KEY,
            Field::XyCoordinates => 2 * NUM_BYTES_COORDINATE,
            Field::PublicKey => NUM_BYTES_PUBLIC_KEY,
            Field::FirstSha256 | Field::SecondSha256 | Field::ThirdSha256 => NUM_BYTES_SHA256,
            Field::Ripemd160 => NUM_BYTES_RIPEMD160,
            Field::Address => NUM_BYTES_ADDRESS,
        }
    }
}

/// Position of one field inside a lane record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldSpan {
    pub field: Field,
    pub offset: usize,
    pub len: usize,
}

impl FieldSpan {
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.len
    }
}

const XY_ONLY: &[Field] = &[Field::XyCoordinates];
const ALL_STAGES: &[Field] = &[
    Field::PrivateKey,
    Field::PublicKey,
    Field::FirstSha256,
    Field::Ripemd160,
    Field::SecondSha256,
    Field::ThirdSha256,
    Field::Address,
];
const RIPEMD160_ONLY: &[Field] = &[Field::PrivateKey, Field::Ripemd160];
const ADDRESS_ONLY: &[Field] = &[Field::PrivateKey, Field::Address];

impl KernelMode {
    pub const ALL: [KernelMode; 9] = [
        KernelMode::XyCoordinatesOnly,
        KernelMode::UntilPublicKey,
        KernelMode::Ripemd160Only,
        KernelMode::AddressOnly,
        KernelMode::UntilFirstSha256,
        KernelMode::UntilRipemd160,
        KernelMode::UntilSecondSha256,
        KernelMode::UntilThirdSha256,
        KernelMode::UntilAddress,
    ];

    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Fields in the order the kernel writes them.
    pub const fn fields(self) -> &'static [Field] {
        match self {
            KernelMode::XyCoordinatesOnly => XY_ONLY,
            KernelMode::Ripemd160Only => RIPEMD160_ONLY,
            KernelMode::AddressOnly => ADDRESS_ONLY,
            // the "until" modes write a prefix of the full stage list
            KernelMode::UntilPublicKey => ALL_STAGES.split_at(2).0,
            KernelMode::UntilFirstSha256 => ALL_STAGES.split_at(3).0,
            KernelMode::UntilRipemd160 => ALL_STAGES.split_at(4).0,
            KernelMode::UntilSecondSha256 => ALL_STAGES.split_at(5).0,
            KernelMode::UntilThirdSha256 => ALL_STAGES.split_at(6).0,
            KernelMode::UntilAddress => ALL_STAGES,
        }
    }

    /// Bytes per lane record.
    pub const fn stride(self) -> usize {
        let fields = self.fields();
        let mut total = 0;
        let mut i = 0;
        while i < fields.len() {
            total += fields[i].len();
            i += 1;
        }
        total
    }

    pub fn layout(self) -> Vec<FieldSpan> {
        let mut offset = 0;
        self.fields()
            .iter()
            .map(|&field| {
                let span = FieldSpan { field, offset, len: field.len() };
                offset += span.len;
                span
            })
            .collect()
    }

    pub fn contains(self, field: Field) -> bool {
        self.fields().contains(&field)
    }

    /// Size of the raw result buffer for `work_size` lanes.
    pub const fn buffer_len(self, work_size: usize) -> usize {
        work_size * self.stride()
    }
}

const _: () = {
    assert!(KernelMode::XyCoordinatesOnly.stride() == 64);
    assert!(KernelMode::UntilPublicKey.stride() == 97);
    assert!(KernelMode::Ripemd160Only.stride() == 52);
    assert!(KernelMode::AddressOnly.stride() == 57);
    assert!(KernelMode::UntilRipemd160.stride() == 149);
    assert!(KernelMode::UntilAddress.stride() == 238);
};

impl TryFrom<u8> for KernelMode {
    type Error = PipelineError;

    fn try_from(id: u8) -> Result<Self> {
        KernelMode::ALL
            .into_iter()
            .find(|m| m.id() == id)
            .ok_or(PipelineError::UnknownKernelMode(id))
    }
}

impl std::fmt::Display for KernelMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}({})", self, self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn until_modes_grow_by_one_stage() {
        let until = [
            KernelMode::UntilPublicKey,
            KernelMode::UntilFirstSha256,
            KernelMode::UntilRipemd160,
            KernelMode::UntilSecondSha256,
            KernelMode::UntilThirdSha256,
            KernelMode::UntilAddress,
        ];
        for pair in until.windows(2) {
            let (short, long) = (pair[0].fields(), pair[1].fields());
            assert_eq!(long.len(), short.len() + 1);
            assert_eq!(&long[..short.len()], short);
        }
    }

    #[test]
    fn layout_is_contiguous() {
        for mode in KernelMode::ALL {
            let layout = mode.layout();
            assert_eq!(layout[0].offset, 0);
            for pair in layout.windows(2) {
                assert_eq!(pair[0].offset + pair[0].len, pair[1].offset);
            }
            let last = layout.last().unwrap();
            assert_eq!(last.offset + last.len, mode.stride());
        }
    }

    #[test]
    fn unknown_ids_are_rejected() {
        assert_eq!(KernelMode::try_from(8).unwrap(), KernelMode::UntilAddress);
        assert!(matches!(KernelMode::try_from(9), Err(PipelineError::UnknownKernelMode(9))));
    }

    #[test]
    fn ripemd_offset_in_full_record() {
        let offset = |mode: KernelMode| {
            mode.layout().into_iter().find(|s| s.field == Field::Ripemd160).unwrap().offset
        };
        assert_eq!(offset(KernelMode::UntilAddress), 32 + 65 + 32);
        assert_eq!(offset(KernelMode::Ripemd160Only), 32);
    }
}
