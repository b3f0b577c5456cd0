//! Device buffers and the synchronous dispatch of one batch.

use ocl::{Buffer, Kernel, MemFlags, Queue};
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::mode::KernelMode;
use crate::scalar::{PRIVATE_KEY_LEN, PrivateKey};

/// Checks a batch before anything touches the device.
///
/// Chunk mode needs the seed key; a longer, already expanded slice is
/// accepted and only its first key is used. Non-chunk mode needs exactly one
/// key per lane.
pub fn validate_batch(chunk_mode: bool, work_size: usize, num_keys: usize) -> Result<()> {
    if chunk_mode {
        if num_keys == 0 {
            return Err(PipelineError::InvalidWorkSize {
                expected: 1,
                actual: 0,
            });
        }
    } else if num_keys != work_size {
        return Err(PipelineError::InvalidWorkSize {
            expected: work_size,
            actual: num_keys,
        });
    }
    Ok(())
}

/// Input buffer contents: 32 big-endian bytes per key, only the seed in
/// chunk mode.
pub fn marshal_keys(keys: &[PrivateKey], chunk_mode: bool) -> Vec<u8> {
    let keys = if chunk_mode { &keys[..keys.len().min(1)] } else { keys };
    keys.iter().flat_map(|k| k.to_be_bytes()).collect()
}

/// Number of keys the input buffer holds.
pub const fn input_keys(chunk_mode: bool, work_size: usize) -> usize {
    if chunk_mode { 1 } else { work_size }
}

pub struct BatchExecutor {
    src: Buffer<u8>,
    dst: Buffer<u8>,
    work_size: usize,
    chunk_mode: bool,
    kernel_mode: KernelMode,
}

impl BatchExecutor {
    pub(crate) fn new(
        queue: &Queue,
        work_size: usize,
        chunk_mode: bool,
        kernel_mode: KernelMode,
    ) -> Result<Self> {
        let src = Buffer::<u8>::builder()
            .queue(queue.clone())
            .flags(MemFlags::new().read_only())
            .len(input_keys(chunk_mode, work_size) * PRIVATE_KEY_LEN)
            .build()
            .map_err(PipelineError::runtime("clCreateBuffer(src)"))?;

        let dst = Buffer::<u8>::builder()
            .queue(queue.clone())
            .flags(MemFlags::new().write_only())
            .len(kernel_mode.buffer_len(work_size))
            .build()
            .map_err(PipelineError::runtime("clCreateBuffer(dst)"))?;

        Ok(Self {
            src,
            dst,
            work_size,
            chunk_mode,
            kernel_mode,
        })
    }

    /// Kernel argument 0.
    pub(crate) fn dst(&self) -> &Buffer<u8> {
        &self.dst
    }

    /// Kernel argument 1.
    pub(crate) fn src(&self) -> &Buffer<u8> {
        &self.src
    }

    /// Uploads `keys`, runs `kernel` over every lane and blocks until the
    /// output buffer has been read back.
    pub(crate) fn execute(&self, kernel: &Kernel, queue: &Queue, keys: &[PrivateKey]) -> Result<Vec<u8>> {
        validate_batch(self.chunk_mode, self.work_size, keys.len())?;

        let input = marshal_keys(keys, self.chunk_mode);
        self.src
            .write(&input[..])
            .enq()
            .map_err(PipelineError::runtime("clEnqueueWriteBuffer"))?;

        debug!(
            lanes = self.work_size,
            mode = %self.kernel_mode,
            chunk_mode = self.chunk_mode,
            "dispatching kernel"
        );
        // SAFETY: both kernel arguments are this executor's buffers, sized for
        // `work_size` lanes of the bound mode.
        unsafe { kernel.enq() }.map_err(PipelineError::runtime("clEnqueueNDRangeKernel"))?;
        queue.finish().map_err(PipelineError::runtime("clFinish"))?;

        let mut raw = vec![0u8; self.kernel_mode.buffer_len(self.work_size)];
        self.dst
            .read(&mut raw[..])
            .enq()
            .map_err(PipelineError::runtime("clEnqueueReadBuffer"))?;
        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(hex: &str) -> PrivateKey {
        PrivateKey::from_hex(hex).unwrap()
    }

    #[test]
    fn chunk_mode_uploads_only_the_seed() {
        let keys = [key("01"), key("02"), key("03")];
        let input = marshal_keys(&keys, true);
        assert_eq!(input.len(), PRIVATE_KEY_LEN);
        assert_eq!(input[31], 0x01);
    }

    #[test]
    fn non_chunk_mode_uploads_every_key_big_endian() {
        let keys = [key("0102"), key("ff")];
        let input = marshal_keys(&keys, false);
        assert_eq!(input.len(), 2 * PRIVATE_KEY_LEN);
        assert_eq!(&input[30..32], &[0x01, 0x02]);
        assert_eq!(input[63], 0xff);
    }

    #[test]
    fn chunk_mode_needs_a_seed() {
        assert!(validate_batch(true, 256, 1).is_ok());
        assert!(validate_batch(true, 256, 256).is_ok());
        assert!(matches!(
            validate_batch(true, 256, 0),
            Err(PipelineError::InvalidWorkSize { expected: 1, actual: 0 })
        ));
    }
}
