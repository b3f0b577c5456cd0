use crate::mode::{
    Field, NUM_BYTES_ADDRESS, NUM_BYTES_PRIVATE_KEY, NUM_BYTES_PUBLIC_KEY,
    NUM_BYTES_RIPEMD160, NUM_BYTES_SHA256, UNCOMPRESSED_PREFIX,
};
use crate::scalar::PrivateKey;

/// One lane of a decoded grid.
///
/// `key` is the private key the lane worked on as known to the host; the
/// remaining fields are `Some` exactly when the kernel mode writes them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResultRecord {
    key: PrivateKey,
    private_key: Option<[u8; NUM_BYTES_PRIVATE_KEY]>,
    public_key: Option<[u8; NUM_BYTES_PUBLIC_KEY]>,
    first_sha256: Option<[u8; NUM_BYTES_SHA256]>,
    ripemd160: Option<[u8; NUM_BYTES_RIPEMD160]>,
    second_sha256: Option<[u8; NUM_BYTES_SHA256]>,
    third_sha256: Option<[u8; NUM_BYTES_SHA256]>,
    address: Option<[u8; NUM_BYTES_ADDRESS]>,
}

fn array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    out
}

impl ResultRecord {
    pub(crate) fn empty(key: PrivateKey) -> Self {
        Self {
            key,
            private_key: None,
            public_key: None,
            first_sha256: None,
            ripemd160: None,
            second_sha256: None,
            third_sha256: None,
            address: None,
        }
    }

    /// Stores `bytes` as `field`; `bytes.len()` must equal `field.len()`.
    pub(crate) fn put(&mut self, field: Field, bytes: &[u8]) {
        debug_assert_eq!(bytes.len(), field.len());
        match field {
            Field::PrivateKey => self.private_key = Some(array(bytes)),
            Field::XyCoordinates => {
                let mut pk = [0u8; NUM_BYTES_PUBLIC_KEY];
                pk[0] = UNCOMPRESSED_PREFIX;
                pk[1..].copy_from_slice(bytes);
                self.public_key = Some(pk);
            }
            Field::PublicKey => self.public_key = Some(array(bytes)),
            Field::FirstSha256 => self.first_sha256 = Some(array(bytes)),
            Field::Ripemd160 => self.ripemd160 = Some(array(bytes)),
            Field::SecondSha256 => self.second_sha256 = Some(array(bytes)),
            Field::ThirdSha256 => self.third_sha256 = Some(array(bytes)),
            Field::Address => self.address = Some(array(bytes)),
        }
    }

    /// Bytes the kernel writes for `field`, if this record carries it.
    pub fn field_bytes(&self, field: Field) -> Option<&[u8]> {
        match field {
            Field::PrivateKey => self.private_key.as_ref().map(|b| &b[..]),
            Field::XyCoordinates => self.public_key.as_ref().map(|b| &b[1..]),
            Field::PublicKey => self.public_key.as_ref().map(|b| &b[..]),
            Field::FirstSha256 => self.first_sha256.as_ref().map(|b| &b[..]),
            Field::Ripemd160 => self.ripemd160.as_ref().map(|b| &b[..]),
            Field::SecondSha256 => self.second_sha256.as_ref().map(|b| &b[..]),
            Field::ThirdSha256 => self.third_sha256.as_ref().map(|b| &b[..]),
            Field::Address => self.address.as_ref().map(|b| &b[..]),
        }
    }

    pub fn key(&self) -> &PrivateKey {
        &self.key
    }

    /// Private key as written back by the kernel.
    pub fn private_key(&self) -> Option<&[u8; NUM_BYTES_PRIVATE_KEY]> {
        self.private_key.as_ref()
    }

    /// Uncompressed SEC1 public key (`0x04 || x || y`).
    pub fn public_key(&self) -> Option<&[u8; NUM_BYTES_PUBLIC_KEY]> {
        self.public_key.as_ref()
    }

    pub fn first_sha256(&self) -> Option<&[u8; NUM_BYTES_SHA256]> {
        self.first_sha256.as_ref()
    }

    pub fn ripemd160(&self) -> Option<&[u8; NUM_BYTES_RIPEMD160]> {
        self.ripemd160.as_ref()
    }

    pub fn second_sha256(&self) -> Option<&[u8; NUM_BYTES_SHA256]> {
        self.second_sha256.as_ref()
    }

    pub fn third_sha256(&self) -> Option<&[u8; NUM_BYTES_SHA256]> {
        self.third_sha256.as_ref()
    }

    /// Binary address: version byte, RIPEMD-160, 4-byte checksum.
    pub fn address(&self) -> Option<&[u8; NUM_BYTES_ADDRESS]> {
        self.address.as_ref()
    }

    pub fn address_base58(&self) -> Option<String> {
        self.address.map(|a| bs58::encode(a).into_string())
    }
}
