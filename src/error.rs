use std::path::PathBuf;

use ocl::core::Status;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("unknown kernel mode: {0}")]
    UnknownKernelMode(u8),

    #[error("invalid work size: expected {expected} private keys, got {actual}")]
    InvalidWorkSize { expected: usize, actual: usize },

    #[error("kernel build failed:\n{0}")]
    AcceleratorBuildFailure(String),

    #[error("OpenCL {call} failed ({status:?}): {message}")]
    AcceleratorRuntime {
        call: &'static str,
        status: Option<Status>,
        message: String,
    },

    #[error("OpenCL platform {index} not found ({available} available)")]
    PlatformNotFound { index: usize, available: usize },

    #[error("OpenCL device {index} not found ({available} available)")]
    DeviceNotFound { index: usize, available: usize },

    #[error("kernel source {}: {source}", path.display())]
    KernelSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("result buffer holds {actual} bytes, expected {expected}")]
    MalformedBuffer { expected: usize, actual: usize },

    #[error("configuration: {0}")]
    Config(String),
}

impl PipelineError {
    /// Wraps an `ocl` error raised by the named API call.
    pub(crate) fn runtime<E: Into<ocl::Error>>(call: &'static str) -> impl FnOnce(E) -> Self {
        move |err| {
            let err: ocl::Error = err.into();
            PipelineError::AcceleratorRuntime {
                call,
                status: err.api_status(),
                message: err.to_string(),
            }
        }
    }

    /// The OpenCL status code carried by this error, if any.
    pub fn status(&self) -> Option<Status> {
        match self {
            PipelineError::AcceleratorRuntime { status, .. } => *status,
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
