//! Host-side computation of every pipeline stage.
//!
//! Used to verify what the kernel wrote, and to build raw buffers with the
//! exact layout the kernel produces. Not part of the dispatch hot path.

use std::sync::LazyLock;

use rayon::prelude::*;
use ripemd::Ripemd160;
use secp256k1::{All, PublicKey, Secp256k1, SecretKey};
use sha2::{Digest, Sha256};

use crate::error::{PipelineError, Result};
use crate::mode::{
    Field, KernelMode, NUM_BYTES_ADDRESS, NUM_BYTES_PUBLIC_KEY, NUM_BYTES_RIPEMD160,
    NUM_BYTES_SHA256,
};
use crate::record::ResultRecord;
use crate::scalar::PrivateKey;

/// P2PKH mainnet version byte, the one the kernel prepends.
pub const VERSION_BYTE_MAINNET: u8 = 0x00;

const CHECKSUM_LEN: usize = 4;

static SECP256K1: LazyLock<Secp256k1<All>> = LazyLock::new(Secp256k1::new);

pub fn public_key_uncompressed(key: &PrivateKey) -> Result<[u8; NUM_BYTES_PUBLIC_KEY]> {
    let sk = SecretKey::from_slice(key.as_bytes())
        .map_err(|e| PipelineError::InvalidPrivateKey(format!("{key}: {e}")))?;
    Ok(PublicKey::from_secret_key(&SECP256K1, &sk).serialize_uncompressed())
}

pub fn sha256(data: &[u8]) -> [u8; NUM_BYTES_SHA256] {
    Sha256::digest(data).into()
}

pub fn ripemd160(data: &[u8]) -> [u8; NUM_BYTES_RIPEMD160] {
    Ripemd160::digest(data).into()
}

/// RIPEMD-160 of SHA-256.
pub fn hash160(data: &[u8]) -> [u8; NUM_BYTES_RIPEMD160] {
    ripemd160(&sha256(data))
}

/// SHA-256 over `version || hash`, the second SHA-256 stage.
pub fn versioned_sha256(version: u8, hash: &[u8; NUM_BYTES_RIPEMD160]) -> [u8; NUM_BYTES_SHA256] {
    let mut hasher = Sha256::new();
    hasher.update([version]);
    hasher.update(hash);
    hasher.finalize().into()
}

pub fn address_bytes(version: u8, hash: &[u8; NUM_BYTES_RIPEMD160]) -> [u8; NUM_BYTES_ADDRESS] {
    let checksum = sha256(&versioned_sha256(version, hash));
    let mut out = [0u8; NUM_BYTES_ADDRESS];
    out[0] = version;
    out[1..1 + NUM_BYTES_RIPEMD160].copy_from_slice(hash);
    out[1 + NUM_BYTES_RIPEMD160..].copy_from_slice(&checksum[..CHECKSUM_LEN]);
    out
}

pub fn base58check(payload: &[u8]) -> String {
    let c = sha256(&sha256(payload));
    let mut v = payload.to_vec();
    v.extend_from_slice(&c[..CHECKSUM_LEN]);
    bs58::encode(v).into_string()
}

/// Uncompressed P2PKH address in base58.
pub fn p2pkh_uncompressed(key: &PrivateKey) -> Result<String> {
    let rip = hash160(&public_key_uncompressed(key)?);
    let mut payload = Vec::with_capacity(1 + NUM_BYTES_RIPEMD160);
    payload.push(VERSION_BYTE_MAINNET);
    payload.extend_from_slice(&rip);
    Ok(base58check(&payload))
}

/// Every intermediate value the full kernel pipeline produces for one key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stages {
    pub public_key: [u8; NUM_BYTES_PUBLIC_KEY],
    pub first_sha256: [u8; NUM_BYTES_SHA256],
    pub ripemd160: [u8; NUM_BYTES_RIPEMD160],
    pub second_sha256: [u8; NUM_BYTES_SHA256],
    pub third_sha256: [u8; NUM_BYTES_SHA256],
    pub address: [u8; NUM_BYTES_ADDRESS],
}

impl Stages {
    pub fn derive(key: &PrivateKey) -> Result<Self> {
        let public_key = public_key_uncompressed(key)?;
        let first_sha256 = sha256(&public_key);
        let ripemd160 = ripemd160(&first_sha256);
        let second_sha256 = versioned_sha256(VERSION_BYTE_MAINNET, &ripemd160);
        let third_sha256 = sha256(&second_sha256);

        let mut address = [0u8; NUM_BYTES_ADDRESS];
        address[0] = VERSION_BYTE_MAINNET;
        address[1..1 + NUM_BYTES_RIPEMD160].copy_from_slice(&ripemd160);
        address[1 + NUM_BYTES_RIPEMD160..].copy_from_slice(&third_sha256[..CHECKSUM_LEN]);

        Ok(Self {
            public_key,
            first_sha256,
            ripemd160,
            second_sha256,
            third_sha256,
            address,
        })
    }
}

/// The record a correct kernel run in `mode` yields for `key`.
pub fn expected_record(key: &PrivateKey, mode: KernelMode) -> Result<ResultRecord> {
    let stages = Stages::derive(key)?;
    let mut record = ResultRecord::empty(*key);
    for &field in mode.fields() {
        match field {
            Field::PrivateKey => record.put(field, key.as_bytes()),
            Field::XyCoordinates => record.put(field, &stages.public_key[1..]),
            Field::PublicKey => record.put(field, &stages.public_key),
            Field::FirstSha256 => record.put(field, &stages.first_sha256),
            Field::Ripemd160 => record.put(field, &stages.ripemd160),
            Field::SecondSha256 => record.put(field, &stages.second_sha256),
            Field::ThirdSha256 => record.put(field, &stages.third_sha256),
            Field::Address => record.put(field, &stages.address),
        }
    }
    Ok(record)
}

pub fn expected_records(keys: &[PrivateKey], mode: KernelMode) -> Result<Vec<ResultRecord>> {
    keys.par_iter().map(|k| expected_record(k, mode)).collect()
}

/// Writes `record` into `out` using the layout of `mode`.
///
/// Panics if `out` is not exactly one stride long or the record lacks a field
/// the mode writes.
pub fn encode_record(record: &ResultRecord, mode: KernelMode, out: &mut [u8]) {
    assert_eq!(out.len(), mode.stride(), "lane slice length");
    for span in mode.layout() {
        let bytes = record
            .field_bytes(span.field)
            .unwrap_or_else(|| panic!("record has no {:?} for {mode}", span.field));
        out[span.range()].copy_from_slice(bytes);
    }
}

/// Raw result buffer laid out as the kernel writes it for `keys`.
pub fn encode_lanes(keys: &[PrivateKey], mode: KernelMode) -> Result<Vec<u8>> {
    let records = expected_records(keys, mode)?;
    let mut raw = vec![0u8; mode.buffer_len(keys.len())];
    raw.par_chunks_exact_mut(mode.stride())
        .zip(records.par_iter())
        .for_each(|(lane, record)| encode_record(record, mode, lane));
    Ok(raw)
}
