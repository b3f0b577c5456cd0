//! GPU pipeline for secp256k1 key search.
//!
//! An [`AcceleratorSession`] compiles the OpenCL kernel bundle and binds one
//! kernel chosen by [`KernelMode`] and chunk mode. Each call to
//! [`AcceleratorSession::create_result`] derives public keys, SHA-256,
//! RIPEMD-160 and addresses for a whole grid of private keys in a single
//! dispatch; [`GridResult::decode`] turns the flat device buffer back into
//! [`ResultRecord`]s.
//!
//! - `scalar`, `expected`: key codec and host-side reference values
//! - `mode`, `registry`: record layouts and kernel entry points
//! - `kernel_source`: the program source bundle
//! - `session`, `executor`: device resources and dispatch
//! - `grid`, `record`: demarshaling

pub mod config;
pub mod error;
pub mod executor;
pub mod expected;
pub mod grid;
pub mod kernel_source;
pub mod mode;
pub mod record;
pub mod registry;
pub mod scalar;
pub mod session;

pub use config::{DeviceKind, ProducerConfig};
pub use error::{PipelineError, Result};
pub use grid::GridResult;
pub use mode::{Field, FieldSpan, KernelMode};
pub use record::ResultRecord;
pub use scalar::PrivateKey;
pub use session::AcceleratorSession;
