//! Decoding raw grid buffers laid out exactly as the kernel writes them.

use cl_bitfinder::expected::{encode_lanes, expected_records};
use cl_bitfinder::grid::{GridResult, decode};
use cl_bitfinder::scalar::expand_chunk;
use cl_bitfinder::{Field, KernelMode, PipelineError, PrivateKey};
use rstest::rstest;

const SEED_HEX: &str = "c297e4944f46f3b9f04cf4b3984f49bd4ee40dec33991066fa15cdb227933400";

fn seed() -> PrivateKey {
    PrivateKey::from_hex(SEED_HEX).unwrap()
}

fn direct_keys(n: usize) -> Vec<PrivateKey> {
    (1..=n as u64)
        .map(|i| PrivateKey::from_hex(&format!("{:x}", i * 0x1_0000_0001)).unwrap())
        .collect()
}

fn all_modes() -> impl Iterator<Item = KernelMode> {
    KernelMode::ALL.into_iter()
}

#[rstest]
fn chunk_grid_decodes_every_lane(
    #[values(
        KernelMode::XyCoordinatesOnly,
        KernelMode::UntilPublicKey,
        KernelMode::Ripemd160Only,
        KernelMode::AddressOnly,
        KernelMode::UntilFirstSha256,
        KernelMode::UntilRipemd160,
        KernelMode::UntilSecondSha256,
        KernelMode::UntilThirdSha256,
        KernelMode::UntilAddress
    )]
    mode: KernelMode,
) {
    let work_size = 16;
    let lanes = expand_chunk(&seed(), work_size);
    let raw = encode_lanes(&lanes, mode).unwrap();
    assert_eq!(raw.len(), work_size * mode.stride());

    let grid = GridResult::new(vec![seed()], work_size, raw, true, mode);
    let records = grid.decode().unwrap();

    assert_eq!(records, expected_records(&lanes, mode).unwrap());
    for (lane, record) in records.iter().enumerate() {
        assert_eq!(*record.key(), seed().lane(lane as u32));
    }
}

#[rstest]
fn direct_grid_decodes_every_lane(
    #[values(
        KernelMode::XyCoordinatesOnly,
        KernelMode::Ripemd160Only,
        KernelMode::AddressOnly,
        KernelMode::UntilRipemd160,
        KernelMode::UntilAddress
    )]
    mode: KernelMode,
) {
    let keys = direct_keys(8);
    let raw = encode_lanes(&keys, mode).unwrap();
    let records = decode(&raw, &keys, false, mode, keys.len()).unwrap();

    assert_eq!(records, expected_records(&keys, mode).unwrap());
    for (record, key) in records.iter().zip(&keys) {
        assert_eq!(record.key(), key);
        if mode.contains(Field::PrivateKey) {
            assert_eq!(record.private_key(), Some(key.as_bytes()));
        }
    }
}

#[test]
fn only_declared_fields_are_present() {
    let keys = direct_keys(1);
    for mode in all_modes() {
        let raw = encode_lanes(&keys, mode).unwrap();
        let record = &decode(&raw, &keys, false, mode, 1).unwrap()[0];

        let has_public_key = mode.contains(Field::PublicKey) || mode.contains(Field::XyCoordinates);
        assert_eq!(record.private_key().is_some(), mode.contains(Field::PrivateKey), "{mode}");
        assert_eq!(record.public_key().is_some(), has_public_key, "{mode}");
        assert_eq!(record.first_sha256().is_some(), mode.contains(Field::FirstSha256), "{mode}");
        assert_eq!(record.ripemd160().is_some(), mode.contains(Field::Ripemd160), "{mode}");
        assert_eq!(record.second_sha256().is_some(), mode.contains(Field::SecondSha256), "{mode}");
        assert_eq!(record.third_sha256().is_some(), mode.contains(Field::ThirdSha256), "{mode}");
        assert_eq!(record.address().is_some(), mode.contains(Field::Address), "{mode}");
    }
}

#[test]
fn public_key_only_yields_no_hashes() {
    let keys = direct_keys(2);
    let raw = encode_lanes(&keys, KernelMode::XyCoordinatesOnly).unwrap();
    assert_eq!(raw.len(), 2 * 64);
    for record in decode(&raw, &keys, false, KernelMode::XyCoordinatesOnly, 2).unwrap() {
        assert_eq!(record.public_key().unwrap()[0], 0x04);
        assert!(record.ripemd160().is_none());
        assert!(record.first_sha256().is_none());
    }
}

#[test]
fn fields_sit_at_fixed_offsets() {
    let keys = direct_keys(3);
    let mode = KernelMode::UntilAddress;
    let raw = encode_lanes(&keys, mode).unwrap();
    let records = decode(&raw, &keys, false, mode, 3).unwrap();

    let lane = 2;
    let base = lane * mode.stride();
    assert_eq!(&raw[base..base + 32], keys[lane].as_bytes());
    assert_eq!(&raw[base + 32..base + 97], records[lane].public_key().unwrap());
    assert_eq!(&raw[base + 129..base + 149], records[lane].ripemd160().unwrap());
    assert_eq!(&raw[base + 213..base + 238], records[lane].address().unwrap());
}

#[test]
fn buffer_length_must_match_stride() {
    let keys = direct_keys(4);
    let mode = KernelMode::UntilRipemd160;
    let mut raw = encode_lanes(&keys, mode).unwrap();
    raw.push(0);
    assert!(matches!(
        decode(&raw, &keys, false, mode, 4),
        Err(PipelineError::MalformedBuffer { expected: 596, actual: 597 })
    ));
    raw.truncate(3 * mode.stride());
    assert!(matches!(
        decode(&raw, &keys, false, mode, 4),
        Err(PipelineError::MalformedBuffer { .. })
    ));
}

#[test]
fn direct_mode_rejects_short_batches() {
    let keys = direct_keys(4);
    let mode = KernelMode::Ripemd160Only;
    let raw = encode_lanes(&keys, mode).unwrap();
    let lanes = decode(&raw, &keys[..3], false, mode, 4);
    assert!(matches!(
        lanes,
        Err(PipelineError::InvalidWorkSize { expected: 4, actual: 3 })
    ));
}

#[test]
fn chunk_mode_ignores_pre_expanded_tail() {
    let lanes = expand_chunk(&seed(), 4);
    let mode = KernelMode::AddressOnly;
    let raw = encode_lanes(&lanes, mode).unwrap();
    let from_seed = decode(&raw, &[seed()], true, mode, 4).unwrap();
    let from_chunk = decode(&raw, &lanes, true, mode, 4).unwrap();
    assert_eq!(from_seed, from_chunk);
}

#[test]
fn one_corrupt_byte_changes_one_lane() {
    let keys = direct_keys(4);
    let mode = KernelMode::Ripemd160Only;
    let mut raw = encode_lanes(&keys, mode).unwrap();
    let expected = expected_records(&keys, mode).unwrap();
    raw[mode.stride() + 40] ^= 0xff;
    let records = decode(&raw, &keys, false, mode, 4).unwrap();
    let differing: Vec<usize> = (0..4).filter(|&i| records[i] != expected[i]).collect();
    assert_eq!(differing, vec![1]);
}
