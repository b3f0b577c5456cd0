use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use cl_bitfinder::executor::validate_batch;
use cl_bitfinder::expected::expected_records;
use cl_bitfinder::grid::lane_key;
use cl_bitfinder::session::list_devices;
use cl_bitfinder::{AcceleratorSession, DeviceKind, PrivateKey, ProducerConfig, ResultRecord};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Run private-key grids through the OpenCL address pipeline.
#[derive(Parser, Debug)]
#[command(name = "cl-bitfinder")]
#[command(about = "Derive public keys, hashes and addresses for private-key grids on an OpenCL device")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List OpenCL platforms and devices
    Info {
        #[arg(long, value_enum, default_value_t = DeviceKind::All)]
        device_type: DeviceKind,
    },
    /// Run one grid and print every lane
    Grid(GridArgs),
}

#[derive(Args, Debug)]
struct GridArgs {
    /// Private keys as hex. In chunk mode the first key seeds every lane
    #[arg(required = true)]
    keys: Vec<String>,

    /// JSON producer configuration; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    platform: Option<usize>,

    #[arg(long)]
    device: Option<usize>,

    #[arg(long, value_enum)]
    device_type: Option<DeviceKind>,

    /// Work size is 2^grid-bits lanes
    #[arg(long)]
    grid_bits: Option<u8>,

    /// Kernel mode id, 0-8
    #[arg(long)]
    kernel_mode: Option<u8>,

    /// One key per lane instead of one seed key
    #[arg(long)]
    no_chunk: bool,

    /// Directory with the kernel source fragments
    #[arg(long)]
    kernel_dir: Option<PathBuf>,

    /// Recompute every lane on the CPU and compare
    #[arg(long)]
    verify: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Info { device_type } => info_cmd(device_type),
        Command::Grid(args) => grid_cmd(args),
    }
}

fn info_cmd(device_type: DeviceKind) -> Result<()> {
    let devices = list_devices(device_type)?;
    if devices.is_empty() {
        println!("No OpenCL devices found.");
    }
    for device in devices {
        println!("{device}");
    }
    Ok(())
}

fn producer_config(args: &GridArgs) -> Result<ProducerConfig> {
    let mut config = match &args.config {
        Some(path) => ProducerConfig::from_file(path)?,
        None => ProducerConfig::default(),
    };
    if let Some(v) = args.platform {
        config.platform_index = v;
    }
    if let Some(v) = args.device {
        config.device_index = v;
    }
    if let Some(v) = args.device_type {
        config.device_type = v;
    }
    if let Some(v) = args.grid_bits {
        config.grid_num_bits = v;
    }
    if let Some(v) = args.kernel_mode {
        config.kernel_mode = v;
    }
    if args.no_chunk {
        config.chunk_mode = false;
    }
    if let Some(dir) = &args.kernel_dir {
        config.kernel_dir = dir.clone();
    }
    config.validate()?;
    Ok(config)
}

fn grid_cmd(args: GridArgs) -> Result<()> {
    let keys = args
        .keys
        .iter()
        .map(|k| PrivateKey::from_hex(k))
        .collect::<Result<Vec<_>, _>>()?;
    let config = producer_config(&args)?;
    validate_batch(config.chunk_mode, config.work_size()?, keys.len())?;

    let mut session = AcceleratorSession::init(config).context("opening OpenCL session")?;
    info!(
        device = %session.device_name(),
        kernel = session.entry_point(),
        "running grid"
    );
    let chunk_mode = session.config().chunk_mode;
    let mode = session.kernel_mode();

    let outcome = session.create_result(&keys);
    let status = session.error_code_string();
    session.release();
    let records = outcome?.decode()?;

    for (lane, record) in records.iter().enumerate() {
        println!("{}", format_record(lane, record));
    }

    if args.verify {
        let lane_keys: Vec<PrivateKey> = (0..records.len())
            .map(|lane| lane_key(&keys, chunk_mode, lane))
            .collect();
        let expected = expected_records(&lane_keys, mode)?;
        let mismatches: Vec<usize> = records
            .iter()
            .zip(&expected)
            .enumerate()
            .filter(|(_, (got, want))| got != want)
            .map(|(lane, _)| lane)
            .collect();
        if let Some(first) = mismatches.first() {
            bail!(
                "{} of {} lanes differ from the CPU result (first: lane {first}, key {})",
                mismatches.len(),
                records.len(),
                lane_keys[*first]
            );
        }
        println!("verified {} lanes", records.len());
    }

    if status != "CL_SUCCESS" {
        return Err(anyhow!("OpenCL status after dispatch: {status}"));
    }
    Ok(())
}

fn format_record(lane: usize, record: &ResultRecord) -> String {
    let mut line = format!("{lane:>8} {}", record.key());
    let mut field = |name: &str, bytes: Option<&[u8]>| {
        if let Some(b) = bytes {
            line.push_str(&format!(" {name}={}", hex::encode(b)));
        }
    };
    field("pub", record.public_key().map(|b| &b[..]));
    field("sha256", record.first_sha256().map(|b| &b[..]));
    field("ripemd160", record.ripemd160().map(|b| &b[..]));
    field("sha256_2", record.second_sha256().map(|b| &b[..]));
    field("sha256_3", record.third_sha256().map(|b| &b[..]));
    field("addr", record.address().map(|b| &b[..]));
    if let Some(a) = record.address_base58() {
        line.push_str(&format!(" {a}"));
    }
    line
}
