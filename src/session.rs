//! Ownership of the OpenCL objects behind one bound kernel.

use ocl::core::{DeviceInfo, Status};
use ocl::{Context, Device, Kernel, Platform, Program, Queue};
use tracing::{info, warn};

use crate::config::{DeviceKind, ProducerConfig};
use crate::error::{PipelineError, Result};
use crate::executor::BatchExecutor;
use crate::grid::GridResult;
use crate::kernel_source;
use crate::mode::KernelMode;
use crate::registry;
use crate::scalar::PrivateKey;

/// One row of `list_devices`.
#[derive(Debug, Clone)]
pub struct DeviceDescription {
    pub platform_index: usize,
    pub platform_name: String,
    pub device_index: usize,
    pub name: String,
    pub vendor: String,
    pub version: String,
    pub compute_units: String,
    pub global_mem_size: String,
}

impl std::fmt::Display for DeviceDescription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "platform {} ({}) device {}: {} [{}, {}] compute units: {}, global memory: {}",
            self.platform_index,
            self.platform_name,
            self.device_index,
            self.name,
            self.vendor,
            self.version,
            self.compute_units,
            self.global_mem_size
        )
    }
}

/// Installed OpenCL platforms; a failed query is returned as an error.
fn platforms() -> Result<Vec<Platform>> {
    let ids = ocl::core::get_platform_ids().map_err(PipelineError::runtime("clGetPlatformIDs"))?;
    Ok(ids.into_iter().map(Platform::new).collect())
}

pub(crate) fn select_platform(platforms: &[Platform], index: usize) -> Result<Platform> {
    platforms
        .get(index)
        .copied()
        .ok_or(PipelineError::PlatformNotFound {
            index,
            available: platforms.len(),
        })
}

pub(crate) fn select_device(devices: &[Device], index: usize) -> Result<Device> {
    devices
        .get(index)
        .copied()
        .ok_or(PipelineError::DeviceNotFound {
            index,
            available: devices.len(),
        })
}

/// Every device of `kind` on every platform.
pub fn list_devices(kind: DeviceKind) -> Result<Vec<DeviceDescription>> {
    let mut out = Vec::new();
    for (platform_index, platform) in platforms()?.iter().enumerate() {
        let platform_name = platform.name().map_err(PipelineError::runtime("clGetPlatformInfo"))?;
        let devices =
            Device::list(platform, Some(kind.flags())).map_err(PipelineError::runtime("clGetDeviceIDs"))?;
        for (device_index, device) in devices.iter().enumerate() {
            out.push(DeviceDescription {
                platform_index,
                platform_name: platform_name.clone(),
                device_index,
                name: device.name().map_err(PipelineError::runtime("clGetDeviceInfo"))?,
                vendor: device.vendor().map_err(PipelineError::runtime("clGetDeviceInfo"))?,
                version: device
                    .info(DeviceInfo::Version)
                    .map_err(PipelineError::runtime("clGetDeviceInfo"))?
                    .to_string(),
                compute_units: device
                    .info(DeviceInfo::MaxComputeUnits)
                    .map_err(PipelineError::runtime("clGetDeviceInfo"))?
                    .to_string(),
                global_mem_size: device
                    .info(DeviceInfo::GlobalMemSize)
                    .map_err(PipelineError::runtime("clGetDeviceInfo"))?
                    .to_string(),
            });
        }
    }
    Ok(out)
}

/// A compiled program with one bound kernel on one device.
///
/// Fields are declared in release order: device buffers, kernel, program,
/// command queue, context. [`AcceleratorSession::release`] consumes the
/// session, so a released session cannot be used or released again.
pub struct AcceleratorSession {
    executor: BatchExecutor,
    kernel: Kernel,
    program: Program,
    queue: Queue,
    context: Context,
    platform: Platform,
    device: Device,
    config: ProducerConfig,
    kernel_mode: KernelMode,
    entry_point: &'static str,
    work_size: usize,
    status: Option<Status>,
}

impl AcceleratorSession {
    pub fn init(config: ProducerConfig) -> Result<Self> {
        config.validate()?;
        let (kernel_mode, entry_point) =
            registry::entry_point_for_id(config.kernel_mode, config.chunk_mode)?;
        let work_size = config.work_size()?;

        let platform = select_platform(&platforms()?, config.platform_index)?;
        let devices = Device::list(platform, Some(config.device_type.flags()))
            .map_err(PipelineError::runtime("clGetDeviceIDs"))?;
        let device = select_device(&devices, config.device_index)?;

        info!(
            platform = %platform.name().unwrap_or_else(|_| "unknown".into()),
            device = %device.name().unwrap_or_else(|_| "unknown".into()),
            "selected OpenCL device"
        );

        let context = Context::builder()
            .platform(platform)
            .devices(device)
            .build()
            .map_err(PipelineError::runtime("clCreateContext"))?;

        let queue = Queue::new(&context, device, None)
            .map_err(PipelineError::runtime("clCreateCommandQueue"))?;

        let fragments = kernel_source::load(&config.kernel_dir)?;
        let mut builder = Program::builder();
        builder.devices(device);
        for fragment in fragments {
            builder.src(fragment);
        }
        let program = builder
            .build(&context)
            .map_err(|e| PipelineError::AcceleratorBuildFailure(e.to_string()))?;

        let executor = BatchExecutor::new(&queue, work_size, config.chunk_mode, kernel_mode)?;

        let kernel = Kernel::builder()
            .program(&program)
            .name(entry_point)
            .queue(queue.clone())
            .global_work_size(work_size)
            .arg(executor.dst())
            .arg(executor.src())
            .build()
            .map_err(PipelineError::runtime("clCreateKernel"))?;

        info!(
            kernel = entry_point,
            mode = %kernel_mode,
            chunk_mode = config.chunk_mode,
            work_size,
            "kernel bound"
        );

        Ok(Self {
            executor,
            kernel,
            program,
            queue,
            context,
            platform,
            device,
            config,
            kernel_mode,
            entry_point,
            work_size,
            status: Some(Status::CL_SUCCESS),
        })
    }

    /// Runs one batch.
    ///
    /// In chunk mode `keys[0]` seeds every lane; otherwise `keys` must hold
    /// exactly `work_size` keys. The status register is updated whenever the
    /// device was involved.
    pub fn create_result(&mut self, keys: &[PrivateKey]) -> Result<GridResult> {
        match self.executor.execute(&self.kernel, &self.queue, keys) {
            Ok(raw) => {
                self.status = Some(Status::CL_SUCCESS);
                Ok(GridResult::new(
                    keys.to_vec(),
                    self.work_size,
                    raw,
                    self.config.chunk_mode,
                    self.kernel_mode,
                ))
            }
            Err(err) => {
                if let PipelineError::AcceleratorRuntime { call, status, .. } = &err {
                    warn!(call, ?status, "dispatch failed");
                    self.status = *status;
                }
                Err(err)
            }
        }
    }

    /// Status of the last device interaction; `None` when the last failure
    /// carried no OpenCL status code.
    pub fn error_code(&self) -> Option<Status> {
        self.status
    }

    pub fn error_code_string(&self) -> String {
        match self.status {
            Some(status) => format!("{status:?}"),
            None => "UNKNOWN".to_string(),
        }
    }

    pub fn config(&self) -> &ProducerConfig {
        &self.config
    }

    pub fn kernel_mode(&self) -> KernelMode {
        self.kernel_mode
    }

    pub fn entry_point(&self) -> &'static str {
        self.entry_point
    }

    pub fn work_size(&self) -> usize {
        self.work_size
    }

    pub fn device_name(&self) -> String {
        self.device.name().unwrap_or_else(|_| "unknown".into())
    }

    pub fn platform_name(&self) -> String {
        self.platform.name().unwrap_or_else(|_| "unknown".into())
    }

    /// Frees device buffers, kernel, program, queue and context, in that order.
    pub fn release(self) {
        let Self {
            executor,
            kernel,
            program,
            queue,
            context,
            entry_point,
            ..
        } = self;
        drop(executor);
        drop(kernel);
        drop(program);
        drop(queue);
        drop(context);
        info!(kernel = entry_point, "released OpenCL session");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_platforms_is_platform_not_found() {
        assert!(matches!(
            select_platform(&[], 0),
            Err(PipelineError::PlatformNotFound { index: 0, available: 0 })
        ));
        assert!(matches!(
            select_platform(&[], 3),
            Err(PipelineError::PlatformNotFound { index: 3, available: 0 })
        ));
    }

    #[test]
    fn no_devices_is_device_not_found() {
        assert!(matches!(
            select_device(&[], 1),
            Err(PipelineError::DeviceNotFound { index: 1, available: 0 })
        ));
    }
}
