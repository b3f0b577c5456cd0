//! Demarshaling of the raw grid buffer into typed records.

use rayon::prelude::*;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::mode::KernelMode;
use crate::record::ResultRecord;
use crate::scalar::PrivateKey;

/// Output of one dispatch: the raw device buffer plus everything needed to
/// interpret it. Consumed by [`GridResult::decode`].
#[derive(Debug)]
pub struct GridResult {
    keys: Vec<PrivateKey>,
    work_size: usize,
    raw: Vec<u8>,
    chunk_mode: bool,
    kernel_mode: KernelMode,
}

impl GridResult {
    pub fn new(
        keys: Vec<PrivateKey>,
        work_size: usize,
        raw: Vec<u8>,
        chunk_mode: bool,
        kernel_mode: KernelMode,
    ) -> Self {
        Self {
            keys,
            work_size,
            raw,
            chunk_mode,
            kernel_mode,
        }
    }

    pub fn work_size(&self) -> usize {
        self.work_size
    }

    pub fn kernel_mode(&self) -> KernelMode {
        self.kernel_mode
    }

    pub fn chunk_mode(&self) -> bool {
        self.chunk_mode
    }

    /// Decodes every lane and releases the buffer.
    pub fn decode(self) -> Result<Vec<ResultRecord>> {
        let records = decode(
            &self.raw,
            &self.keys,
            self.chunk_mode,
            self.kernel_mode,
            self.work_size,
        )?;
        self.free();
        Ok(records)
    }

    /// Releases the buffer without decoding it.
    pub fn free(self) {
        debug!(bytes = self.raw.len(), "releasing grid result buffer");
    }
}

/// Private key processed by `lane`.
pub fn lane_key(keys: &[PrivateKey], chunk_mode: bool, lane: usize) -> PrivateKey {
    if chunk_mode {
        keys[0].lane(lane as u32)
    } else {
        keys[lane]
    }
}

/// Splits `raw` into `work_size` records of `kernel_mode.stride()` bytes.
///
/// In chunk mode only `keys[0]` is consulted; lane keys are rebuilt with the
/// same OR formula the kernel applies. Otherwise `keys` must hold one key per
/// lane.
pub fn decode(
    raw: &[u8],
    keys: &[PrivateKey],
    chunk_mode: bool,
    kernel_mode: KernelMode,
    work_size: usize,
) -> Result<Vec<ResultRecord>> {
    let expected = kernel_mode.buffer_len(work_size);
    if raw.len() != expected {
        return Err(PipelineError::MalformedBuffer {
            expected,
            actual: raw.len(),
        });
    }
    if chunk_mode && keys.is_empty() {
        return Err(PipelineError::InvalidWorkSize {
            expected: 1,
            actual: 0,
        });
    }
    if !chunk_mode && keys.len() != work_size {
        return Err(PipelineError::InvalidWorkSize {
            expected: work_size,
            actual: keys.len(),
        });
    }

    let layout = kernel_mode.layout();
    let records: Vec<ResultRecord> = raw
        .par_chunks_exact(kernel_mode.stride())
        .enumerate()
        .map(|(lane, bytes)| {
            let mut record = ResultRecord::empty(lane_key(keys, chunk_mode, lane));
            for span in &layout {
                record.put(span.field, &bytes[span.range()]);
            }
            record
        })
        .collect();

    debug!(lanes = records.len(), mode = %kernel_mode, chunk_mode, "decoded grid");
    Ok(records)
}
