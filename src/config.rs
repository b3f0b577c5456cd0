use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use ocl::flags::DeviceType;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::mode::KernelMode;

/// Lane indices are OR-ed into 32 bits of the seed key.
pub const MAX_GRID_NUM_BITS: u8 = 32;

#[derive(ValueEnum, Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum DeviceKind {
    #[default]
    All,
    Gpu,
    Cpu,
    Accelerator,
    Default,
}

impl DeviceKind {
    pub fn flags(self) -> DeviceType {
        match self {
            DeviceKind::All => DeviceType::ALL,
            DeviceKind::Gpu => DeviceType::GPU,
            DeviceKind::Cpu => DeviceType::CPU,
            DeviceKind::Accelerator => DeviceType::ACCELERATOR,
            DeviceKind::Default => DeviceType::DEFAULT,
        }
    }
}

/// Everything needed to open an accelerator session.
///
/// Field names follow the camelCase keys of the JSON configuration file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct ProducerConfig {
    pub platform_index: usize,
    pub device_index: usize,
    pub device_type: DeviceKind,
    /// Work size is `1 << grid_num_bits`.
    pub grid_num_bits: u8,
    pub chunk_mode: bool,
    /// Numeric kernel mode id, see [`KernelMode`].
    pub kernel_mode: u8,
    /// Directory holding the kernel source fragments.
    pub kernel_dir: PathBuf,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            platform_index: 0,
            device_index: 0,
            device_type: DeviceKind::All,
            grid_num_bits: 8,
            chunk_mode: true,
            kernel_mode: KernelMode::Ripemd160Only.id(),
            kernel_dir: PathBuf::from("kernels"),
        }
    }
}

impl ProducerConfig {
    /// `1 << grid_num_bits`, or a configuration error when that does not fit
    /// the 32-bit lane index or `usize`.
    pub fn work_size(&self) -> Result<usize> {
        if self.grid_num_bits > MAX_GRID_NUM_BITS {
            return Err(PipelineError::Config(format!(
                "gridNumBits {} exceeds {MAX_GRID_NUM_BITS}",
                self.grid_num_bits
            )));
        }
        1usize.checked_shl(u32::from(self.grid_num_bits)).ok_or_else(|| {
            PipelineError::Config(format!(
                "gridNumBits {} overflows usize",
                self.grid_num_bits
            ))
        })
    }

    pub fn kernel_mode(&self) -> Result<KernelMode> {
        KernelMode::try_from(self.kernel_mode)
    }

    pub fn validate(&self) -> Result<()> {
        self.work_size()?;
        self.kernel_mode()?;
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| PipelineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .map_err(|e| PipelineError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }
}
