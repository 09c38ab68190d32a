// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

use anyhow::bail;
use anyhow::Context;
use clap::Parser;
use clap::Subcommand;
use itertools::Itertools;
use sfp_hal::decode::checksum::validate_region;
use sfp_hal::decode::Monitor;
use sfp_hal::registers::detected_ports;
use sfp_hal::ConfigBuilder;
use sfp_hal::IoError;
use sfp_hal::Platform;
use sfp_hal::Poller;
use sfp_hal::PresenceAndControl;
use sfp_hal::RawByteReader;
use sfp_hal::Region;
use sfp_hal::RegisterAccess;
use sfp_hal::SfpDevice;
use sfp_hal::SfpPort;
use sfp_hal::Speed;
use sfp_hal::ThresholdKind;
use sfp_hal::VendorDatabase;
use sfp_types::Medium;
use slog::Drain;
use slog::Level;
use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tabled::settings::Style;
use tabled::Table;
use tabled::Tabled;
use tokio::sync::oneshot;

fn parse_log_level(s: &str) -> Result<Level, String> {
    s.parse().map_err(|_| String::from("invalid log level"))
}

// Parse a decimal, or hex with a `0x` prefix.
fn parse_int(s: &str) -> Result<u64, String> {
    match s.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    }
    .map_err(|e| format!("invalid integer '{s}': {e}"))
}

/// The value read from one platform register.
#[derive(Clone, Copy, Debug, PartialEq)]
struct RegisterValue {
    offset: u32,
    value: u64,
}

fn parse_register_value(s: &str) -> Result<RegisterValue, String> {
    let (offset, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected OFFSET=VALUE, found '{s}'"))?;
    let offset = u32::try_from(parse_int(offset)?)
        .map_err(|_| format!("register offset '{offset}' is out of range"))?;
    Ok(RegisterValue {
        offset,
        value: parse_int(value)?,
    })
}

/// Inspect SFP transceiver modules from dumps of their memory.
///
/// Dumps are raw binary images of one memory region each, as read from
/// 2-wire addresses 0xA0, 0xA2 or 0xAC.
#[derive(Parser)]
#[command(version, about, long_about)]
struct Args {
    #[command(subcommand)]
    cmd: Cmd,

    /// The log-level.
    #[arg(
        short,
        long,
        default_value_t = Level::Info,
        value_parser = parse_log_level
    )]
    log_level: Level,
}

/// The dumps describing one module.
#[derive(clap::Args)]
struct Dumps {
    /// The interface ID memory, at 0xA0.
    #[arg(long)]
    a0: PathBuf,

    /// The diagnostic monitoring memory, at 0xA2.
    #[arg(long)]
    a2: Option<PathBuf>,

    /// The copper PHY memory, at 0xAC.
    #[arg(long)]
    ac: Option<PathBuf>,

    /// Classify from compliance codes only, ignoring the vendor database.
    #[arg(long)]
    no_database: bool,
}

#[derive(Subcommand)]
enum Cmd {
    /// Decode the identity, capabilities and diagnostics of a module.
    Decode {
        #[command(flatten)]
        dumps: Dumps,
    },

    /// Validate the check codes of a memory dump.
    Checksum {
        /// The region the dump was read from.
        #[arg(short, long, value_enum)]
        region: Region,

        file: PathBuf,
    },

    /// Print one region of a module's memory, after it has been loaded.
    Dump {
        /// The region to print.
        #[arg(short, long, value_enum)]
        region: Region,

        #[command(flatten)]
        dumps: Dumps,
    },

    /// Print the vendor parts with known capabilities.
    Database,

    /// Decode a snapshot of a platform's status registers into the ports
    /// holding a module.
    Ports {
        /// The platform the registers were read from.
        #[arg(short, long, value_enum)]
        platform: Platform,

        /// Register values, as `OFFSET=VALUE`, for example `0x502=0xffdf`.
        #[arg(value_parser = parse_register_value, required = true)]
        registers: Vec<RegisterValue>,
    },

    /// Repeatedly reload dumps through a polled port, printing the live
    /// diagnostics each time.
    Watch {
        #[command(flatten)]
        dumps: Dumps,

        /// The platform whose quirks to apply.
        #[arg(short, long, value_enum, default_value_t = Platform::Clipper)]
        platform: Platform,

        /// The refresh interval, in milliseconds.
        #[arg(
            short,
            long,
            default_value_t = 1000,
            value_parser = clap::value_parser!(u64).range(1..=60000)
        )]
        interval: u64,

        /// The number of refreshes to print.
        #[arg(short, long, default_value_t = 5)]
        count: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let drain = slog::LevelFilter::new(drain, args.log_level).fuse();
    let log = slog::Logger::root(drain, slog::o!());

    match args.cmd {
        Cmd::Decode { dumps } => {
            let device = load_device(&log, &dumps)?;
            print_identity(&device);
            print_capabilities(&device);
            if dumps.a2.is_some() {
                print_diagnostics(&device);
            }
        }
        Cmd::Checksum { region, file } => {
            let buf = read_dump(&file)?;
            match validate_region(region, &buf) {
                Ok(()) => println!("{region}: check codes valid"),
                Err(e) => bail!("{}: {e}", file.display()),
            }
        }
        Cmd::Dump { region, dumps } => {
            let device = load_device(&log, &dumps)?;
            let mut buf = vec![0; region.read_len()];
            device.get_memory(region.address(), &mut buf)?;
            print_hex(&buf);
        }
        Cmd::Database => print_database(&VendorDatabase::with_known_modules()),
        Cmd::Ports {
            platform,
            registers,
        } => {
            let mut snapshot = RegisterSnapshot::new(&registers);
            let present = detected_ports(platform, &mut snapshot)?;
            println!(
                "{platform}: {} of {} ports present",
                present.selected_port_count(),
                platform.port_count(),
            );
            if !present.is_empty() {
                println!("{}", present.to_ports().join(", "));
            }
        }
        Cmd::Watch {
            dumps,
            platform,
            interval,
            count,
        } => watch(&log, dumps, platform, Duration::from_millis(interval), count).await?,
    }
    Ok(())
}

// The largest dump accepted for any region.
const MAX_DUMP_LEN: u64 = Region::PAGE_SIZE as u64;

fn read_dump(path: &Path) -> anyhow::Result<Vec<u8>> {
    let len = std::fs::metadata(path)
        .with_context(|| format!("failed to stat {}", path.display()))?
        .len();
    if len > MAX_DUMP_LEN {
        bail!(
            "{} is {len} bytes, larger than a {MAX_DUMP_LEN}-byte page",
            path.display()
        );
    }
    std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

fn database(dumps: &Dumps) -> VendorDatabase {
    if dumps.no_database {
        VendorDatabase::new()
    } else {
        VendorDatabase::with_known_modules()
    }
}

fn load_device(log: &slog::Logger, dumps: &Dumps) -> anyhow::Result<SfpDevice> {
    let mut device = SfpDevice::new(log.new(slog::o!("source" => "file")), Speed::Speed1G);
    device.set_present(true);
    device.enable();
    let db = database(dumps);
    let a0 = read_dump(&dumps.a0)?;
    if let Err(e) = device.load_interface_data(&a0, &db) {
        // Keep going with what's valid, so the dump can still be inspected.
        eprintln!("warning: {}: {e}", dumps.a0.display());
    }
    if let Some(path) = &dumps.a2 {
        device
            .load_diagnostic_data(&read_dump(path)?)
            .with_context(|| format!("failed to load {}", path.display()))?;
    }
    if let Some(path) = &dumps.ac {
        device
            .load_copper_phy_data(&read_dump(path)?)
            .with_context(|| format!("failed to load {}", path.display()))?;
    }
    Ok(device)
}

// Column width for printing data below.
const WIDTH: usize = 24;

fn print_identity(device: &SfpDevice) {
    let vendor = device.vendor();
    println!("{:WIDTH$} {}", "Identifier:", device.identifier());
    println!("{:WIDTH$} {}", "Extended identifier:", device.extended_identifier());
    println!("{:WIDTH$} {}", "Connector:", device.connector());
    println!("{:WIDTH$} {}", "Encoding:", device.encoding());
    println!(
        "{:WIDTH$} {} x 100 Mbit/s",
        "Nominal bit rate:",
        device.nominal_bit_rate()
    );
    println!("{:WIDTH$} {}", "Rate select:", device.rate_identifier());
    println!("{:WIDTH$} {}", "Vendor:", vendor.name);
    println!("{:WIDTH$} {}", "OUI:", vendor.format_oui());
    println!("{:WIDTH$} {}", "Part number:", vendor.part);
    println!("{:WIDTH$} {}", "Revision:", vendor.revision);
    println!("{:WIDTH$} {}", "Serial number:", vendor.serial);
    println!("{:WIDTH$} {}", "Date code:", vendor.date);
    println!("{:WIDTH$} {} nm", "Wavelength:", device.wavelength());
    match device.length() {
        Some(m) => println!("{:WIDTH$} {m} m", "Length:"),
        None => println!("{:WIDTH$} unspecified", "Length:"),
    }
}

fn print_capabilities(device: &SfpDevice) {
    let codes = device.transceiver_codes();
    println!("{:WIDTH$} {}", "Compliance:", codes.names().iter().join(", "));
    println!("{:WIDTH$} {}", "Speeds:", device.speed_capabilities());
    println!("{:WIDTH$} {}", "Medium:", device.medium());
    if let Some((tx, rx)) = device.database_wavelengths() {
        println!("{:WIDTH$} tx {tx} nm, rx {rx} nm", "Known part:");
    }
    println!(
        "{:WIDTH$} {} (SFF-8472 revision 0x{:02x})",
        "Diagnostics:",
        if device.is_diag_capable() {
            "supported"
        } else {
            "not supported"
        },
        device.diag_monitoring_revision(),
    );
    println!(
        "{:WIDTH$} {}",
        "Calibration:",
        if device.is_internally_calibrated() {
            "internal"
        } else {
            "external"
        },
    );
}

#[derive(Tabled)]
struct DiagnosticRow {
    #[tabled(rename = "Monitor")]
    monitor: Monitor,
    #[tabled(rename = "Value")]
    value: i64,
    #[tabled(rename = "Units")]
    units: &'static str,
    #[tabled(rename = "High alarm")]
    high_alarm: i64,
    #[tabled(rename = "High warning")]
    high_warning: i64,
    #[tabled(rename = "Low warning")]
    low_warning: i64,
    #[tabled(rename = "Low alarm")]
    low_alarm: i64,
}

fn diagnostic_rows(device: &SfpDevice) -> Vec<DiagnosticRow> {
    Monitor::ALL
        .into_iter()
        .map(|monitor| DiagnosticRow {
            monitor,
            value: device.reading(monitor),
            units: monitor.units(),
            high_alarm: device.threshold(monitor, ThresholdKind::HighAlarm),
            high_warning: device.threshold(monitor, ThresholdKind::HighWarning),
            low_warning: device.threshold(monitor, ThresholdKind::LowWarning),
            low_alarm: device.threshold(monitor, ThresholdKind::LowAlarm),
        })
        .collect()
}

fn print_diagnostics(device: &SfpDevice) {
    println!();
    println!("{}", Table::new(diagnostic_rows(device)).with(Style::sharp()));
}

fn print_hex(buf: &[u8]) {
    for (i, chunk) in buf.chunks(16).enumerate() {
        println!(
            "{:02x}: {}",
            i * 16,
            chunk.iter().map(|b| format!("{b:02x}")).join(" ")
        );
    }
}

fn yes_no(x: bool) -> &'static str {
    if x {
        "Y"
    } else {
        "N"
    }
}

#[derive(Tabled)]
struct DatabaseRow {
    #[tabled(rename = "Part")]
    part: String,
    #[tabled(rename = "Type")]
    medium: Medium,
    #[tabled(rename = "10M")]
    speed_10m: &'static str,
    #[tabled(rename = "100M")]
    speed_100m: &'static str,
    #[tabled(rename = "1G")]
    speed_1g: &'static str,
    #[tabled(rename = "10G")]
    speed_10g: &'static str,
    #[tabled(rename = "Tx (nm)")]
    tx: u16,
    #[tabled(rename = "Rx (nm)")]
    rx: u16,
}

fn database_rows(db: &VendorDatabase) -> Vec<DatabaseRow> {
    db.iter()
        .map(|(part, desc)| DatabaseRow {
            part: String::from(part),
            medium: desc.medium(),
            speed_10m: yes_no(desc.speeds.supports(Speed::Speed10M)),
            speed_100m: yes_no(desc.speeds.supports(Speed::Speed100M)),
            speed_1g: yes_no(desc.speeds.supports(Speed::Speed1G)),
            speed_10g: yes_no(desc.speeds.supports(Speed::Speed10G)),
            tx: desc.tx_wavelength_nm,
            rx: desc.rx_wavelength_nm,
        })
        .collect()
}

fn print_database(db: &VendorDatabase) {
    println!("{}", Table::new(database_rows(db)).with(Style::sharp()));
}

/// A reader which serves module memory from dump files, rereading them on
/// every access.
struct FileReader {
    paths: Vec<(Region, PathBuf)>,
}

impl RawByteReader for FileReader {
    fn read_region(&mut self, region: Region, len: usize) -> Result<Vec<u8>, IoError> {
        let Some((_, path)) = self.paths.iter().find(|(r, _)| *r == region) else {
            return Err(IoError::Read {
                region,
                len,
                reason: String::from("no dump provided"),
            });
        };
        let mut buf = read_dump(path).map_err(|e| IoError::Read {
            region,
            len,
            reason: e.to_string(),
        })?;
        buf.resize(len, 0);
        Ok(buf)
    }
}

/// Read-only registers, holding values captured from a platform.
struct RegisterSnapshot {
    values: BTreeMap<u32, u64>,
}

impl RegisterSnapshot {
    fn new(values: &[RegisterValue]) -> Self {
        Self {
            values: values.iter().map(|r| (r.offset, r.value)).collect(),
        }
    }
}

impl RegisterAccess for RegisterSnapshot {
    fn read(&mut self, offset: u32) -> Result<u64, IoError> {
        self.values
            .get(&offset)
            .copied()
            .ok_or_else(|| IoError::Register {
                offset,
                reason: String::from("not in the snapshot"),
            })
    }

    fn write(&mut self, offset: u32, _: u64) -> Result<(), IoError> {
        Err(IoError::Register {
            offset,
            reason: String::from("snapshot is read-only"),
        })
    }
}

/// A module which is always seated, with no control signals.
struct AlwaysPresent;

impl PresenceAndControl for AlwaysPresent {
    fn is_detected(&mut self) -> Result<bool, IoError> {
        Ok(true)
    }

    fn set_enable(&mut self, _: bool) -> Result<(), IoError> {
        Ok(())
    }

    fn set_tx_enable(&mut self, _: bool) -> Result<(), IoError> {
        Ok(())
    }
}

async fn watch(
    log: &slog::Logger,
    dumps: Dumps,
    platform: Platform,
    interval: Duration,
    count: usize,
) -> anyhow::Result<()> {
    let config = ConfigBuilder::new(platform, 1)
        .poll_interval(interval)
        .build()?;
    let mut paths = vec![(Region::InterfaceId, dumps.a0.clone())];
    paths.extend(dumps.a2.clone().map(|p| (Region::Diagnostic, p)));
    paths.extend(dumps.ac.clone().map(|p| (Region::CopperPhy, p)));
    let port = SfpPort::new(
        log,
        config.clone(),
        AlwaysPresent,
        FileReader { paths },
        Arc::new(database(&dumps)),
    );

    let poller = Poller::new(log, config.poll_interval, vec![port]);
    poller.enable(config.port).await?;
    let ports = poller.ports();
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let task = tokio::spawn(poller.run(shutdown_rx));

    let mut ticker = tokio::time::interval(config.poll_interval);
    for _ in 0..count {
        ticker.tick().await;
        let ports = ports.lock().await;
        let Some(port) = ports.first() else {
            break;
        };
        let device = port.device();
        println!(
            "{:?} {}",
            device.state(),
            Monitor::ALL
                .iter()
                .map(|m| format!("{m}: {} {}", device.reading(*m), m.units()))
                .join(", ")
        );
    }
    // The poller stops when the channel closes, so a failed send is harmless.
    let _ = shutdown_tx.send(());
    task.await?;
    Ok(())
}
