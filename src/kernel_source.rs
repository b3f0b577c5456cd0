//! The OpenCL program is assembled from a fixed, ordered list of source
//! fragments. Fragments are passed to the compiler as separate strings after
//! two rewrites: include directives are dropped (every fragment is already
//! part of the bundle) and the address-space qualifier in front of the
//! precomputed-table parameter is removed.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{PipelineError, Result};

pub const FRAGMENTS: [&str; 17] = [
    "inc_defines.h",
    "copyfromhashcat/inc_vendor.h",
    "copyfromhashcat/inc_types.h",
    "copyfromhashcat/inc_platform.h",
    "copyfromhashcat/inc_platform.cl",
    "copyfromhashcat/inc_common.h",
    "copyfromhashcat/inc_common.cl",
    "copyfromhashcat/inc_ecc_secp256k1.h",
    "copyfromhashcat/inc_ecc_secp256k1.cl",
    "copyfromhashcat/inc_hash_sha256.h",
    "copyfromhashcat/inc_hash_sha256.cl",
    "copyfromhashcat/inc_hash_ripemd160.h",
    "copyfromhashcat/inc_hash_ripemd160.cl",
    "generator_utilities.cl",
    "inc_ecc_secp256k1custom.cl",
    "generate_btc_address.cl",
    "generate_btc_ripemd160.cl",
];

const INCLUDE_DIRECTIVE: &str = "#include";
const QUALIFIED_TABLE_PARAM: &str = "GLOBAL_AS const secp256k1_t *tmps";
const TABLE_PARAM: &str = "const secp256k1_t *tmps";

/// Applies both rewrites to one fragment.
///
/// Everything from `#include` to the end of its line is removed; the line
/// terminator itself is kept.
pub fn normalize(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    for line in source.split_inclusive('\n') {
        let Some(pos) = line.find(INCLUDE_DIRECTIVE) else {
            out.push_str(line);
            continue;
        };
        out.push_str(&line[..pos]);
        if line.ends_with("\r\n") {
            out.push_str("\r\n");
        } else if line.ends_with('\n') {
            out.push('\n');
        }
    }
    out.replace(QUALIFIED_TABLE_PARAM, TABLE_PARAM)
}

/// Reads and normalizes every fragment under `dir`, in bundle order.
pub fn load(dir: &Path) -> Result<Vec<String>> {
    FRAGMENTS
        .iter()
        .map(|name| {
            let path = dir.join(name);
            let raw = fs::read_to_string(&path)
                .map_err(|source| PipelineError::KernelSource { path: path.clone(), source })?;
            debug!(fragment = name, bytes = raw.len(), "loaded kernel fragment");
            Ok(normalize(&raw))
        })
        .collect()
}
