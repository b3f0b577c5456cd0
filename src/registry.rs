//! Kernel entry points compiled into the program, keyed by mode and batch
//! expansion strategy.

use crate::error::{PipelineError, Result};
use crate::mode::KernelMode;

struct EntryPoints {
    mode: KernelMode,
    chunk: &'static str,
    non_chunk: &'static str,
}

const ENTRY_POINTS: &[EntryPoints] = &[
    EntryPoints {
        mode: KernelMode::XyCoordinatesOnly,
        chunk: "generateKeyChunkKernel_grid",
        non_chunk: "generateKeysKernel_grid",
    },
    EntryPoints {
        mode: KernelMode::UntilPublicKey,
        chunk: "generate_chunk_until_publickey",
        non_chunk: "generate_until_publickey",
    },
    EntryPoints {
        mode: KernelMode::Ripemd160Only,
        chunk: "generate_ripemd160_chunk",
        non_chunk: "generate_ripemd160_nonchunk",
    },
    EntryPoints {
        mode: KernelMode::AddressOnly,
        chunk: "generate_address_chunk",
        non_chunk: "generate_address",
    },
    EntryPoints {
        mode: KernelMode::UntilFirstSha256,
        chunk: "generate_chunk_until_first_sha256",
        non_chunk: "generate_until_first_sha256",
    },
    EntryPoints {
        mode: KernelMode::UntilRipemd160,
        chunk: "generate_chunk_until_ripemd160",
        non_chunk: "generate_until_ripemd160",
    },
    EntryPoints {
        mode: KernelMode::UntilSecondSha256,
        chunk: "generate_chunk_until_second_sha256",
        non_chunk: "generate_until_second_sha256",
    },
    EntryPoints {
        mode: KernelMode::UntilThirdSha256,
        chunk: "generate_chunk_until_third_sha256",
        non_chunk: "generate_until_third_sha256",
    },
    EntryPoints {
        mode: KernelMode::UntilAddress,
        chunk: "generate_chunk_until_address",
        non_chunk: "generate_until_address",
    },
];

/// Kernel function name for `mode`; chunk kernels expand a single seed key
/// per lane, non-chunk kernels read one key per lane.
pub fn entry_point(mode: KernelMode, chunk_mode: bool) -> Result<&'static str> {
    ENTRY_POINTS
        .iter()
        .find(|e| e.mode == mode)
        .map(|e| if chunk_mode { e.chunk } else { e.non_chunk })
        .ok_or(PipelineError::UnknownKernelMode(mode.id()))
}

/// Resolves a numeric mode id as found in configuration files.
pub fn entry_point_for_id(id: u8, chunk_mode: bool) -> Result<(KernelMode, &'static str)> {
    let mode = KernelMode::try_from(id)?;
    Ok((mode, entry_point(mode, chunk_mode)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn every_mode_has_two_distinct_kernels() {
        let mut names = HashSet::new();
        for mode in KernelMode::ALL {
            names.insert(entry_point(mode, true).unwrap());
            names.insert(entry_point(mode, false).unwrap());
        }
        assert_eq!(names.len(), 2 * KernelMode::ALL.len());
    }

    #[test]
    fn numeric_ids_resolve() {
        assert_eq!(
            entry_point_for_id(0, true).unwrap(),
            (KernelMode::XyCoordinatesOnly, "generateKeyChunkKernel_grid")
        );
        assert_eq!(
            entry_point_for_id(3, false).unwrap(),
            (KernelMode::AddressOnly, "generate_address")
        );
        assert!(matches!(
            entry_point_for_id(42, true),
            Err(PipelineError::UnknownKernelMode(42))
        ));
    }
}
