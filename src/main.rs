//! preenfm3-editor: talk to a PreenFM3 over MIDI from the command line
//!
//! - `ports`: list MIDI inputs and outputs
//! - `init`: write an init patch as JSON
//! - `dump`: request the current patch from the device
//! - `send`: push a JSON patch to the device
//! - `monitor`: follow edits made on the device and print the patch after each change
//! - `decode-sysex` / `encode-sysex`: convert between `.syx` files and JSON patches

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use crossbeam_channel::{unbounded, RecvTimeoutError};
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use preenfm3_editor::config::EditorConfig;
use preenfm3_editor::core::codec::{
    assemble_patch, decode_patch_sysex, encode_patch, encode_patch_sysex, AssembleOptions,
};
use preenfm3_editor::core::midi::{DeviceConnection, DeviceEvent, ReceivedDump, WireMessage};
use preenfm3_editor::core::patch::LfoRate;
use preenfm3_editor::core::Patch;
use preenfm3_editor::messaging::{EditorMessage, MessageBus};
use preenfm3_editor::utils::helpers::{format_frequency, format_time};

/// Command line patch editor for the PreenFM3
#[derive(Parser)]
#[command(name = "preenfm3-editor")]
#[command(about = "Read, write and convert PreenFM3 patches")]
#[command(version)]
struct Cli {
    /// Path to the config file (default: user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "table")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List available MIDI ports
    Ports,

    /// Write an init patch
    Init {
        /// Algorithm index, 0..=31
        #[arg(short, long, default_value = "0")]
        algorithm: usize,

        /// Preset name
        #[arg(short, long, default_value = "Init")]
        name: String,

        /// Output file (default: stdout)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Request the current patch from the device
    Dump {
        /// Write the patch as JSON to this file
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Send a JSON patch to the device
    Send {
        patch: PathBuf,

        /// Send as one SysEx frame instead of NRPN writes
        #[arg(long)]
        sysex: bool,
    },

    /// Load the device patch, then print it again whenever it changes on the device
    Monitor,

    /// Convert a SysEx patch dump to JSON
    DecodeSysex {
        input: PathBuf,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Convert a JSON patch to a SysEx patch dump
    EncodeSysex { patch: PathBuf, out: PathBuf },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => EditorConfig::default_path()?,
    };
    let config = EditorConfig::load_or_create(&config_path)?;

    match cli.command {
        Commands::Ports => cmd_ports(&config, cli.format),
        Commands::Init {
            algorithm,
            name,
            out,
        } => {
            let mut patch = Patch::new(name);
            patch
                .select_algorithm(algorithm)
                .map_err(|err| anyhow!("{err}"))?;
            write_patch(&patch, out.as_deref(), cli.format)
        }
        Commands::Dump { out } => cmd_dump(&config, out.as_deref(), cli.format),
        Commands::Send { patch, sysex } => cmd_send(&config, &patch, sysex),
        Commands::Monitor => cmd_monitor(&config, cli.format),
        Commands::DecodeSysex { input, out } => {
            let bytes = fs::read(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let options = AssembleOptions {
                default_name: config.default_patch_name.clone(),
                ..AssembleOptions::default()
            };
            let patch = decode_patch_sysex(&bytes, &options)
                .map_err(|err| anyhow!("{}: {err}", input.display()))?;
            write_patch(&patch, out.as_deref(), cli.format)
        }
        Commands::EncodeSysex { patch, out } => {
            let patch = read_patch(&patch)?;
            fs::write(&out, encode_patch_sysex(&patch))
                .with_context(|| format!("Failed to write {}", out.display()))?;
            info!("Wrote '{}' to {}", patch.name, out.display());
            Ok(())
        }
    }
}

fn cmd_ports(config: &EditorConfig, format: OutputFormat) -> Result<()> {
    let connection = DeviceConnection::new(config);
    let (inputs, outputs) = connection.list_ports();

    if format == OutputFormat::Json {
        let json = serde_json::json!({ "inputs": inputs, "outputs": outputs });
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    println!("Inputs:");
    for port in &inputs {
        println!("  {port}");
    }
    println!("Outputs:");
    for port in &outputs {
        println!("  {port}");
    }
    Ok(())
}

fn cmd_dump(config: &EditorConfig, out: Option<&Path>, format: OutputFormat) -> Result<()> {
    let mut connection = DeviceConnection::new(config);
    connection.connect(config).map_err(|err| anyhow!(err))?;
    connection.request_dump().map_err(|err| anyhow!(err))?;

    let dump = connection.wait_for_dump(
        Duration::from_millis(config.dump_idle_ms),
        Duration::from_millis(config.dump_timeout_ms),
    );
    let options = config.assemble_options(&Patch::default());
    let patch = match dump {
        Some(ReceivedDump::Nrpn(dump)) => {
            info!("Received {} NRPN values", dump.len());
            assemble_patch(&dump, &options)
        }
        Some(ReceivedDump::SysEx(bytes)) => {
            decode_patch_sysex(&bytes, &options).map_err(|err| anyhow!("{err}"))?
        }
        None => bail!("The device did not answer the dump request"),
    };

    connection.input.disconnect();
    connection.output.disconnect();
    write_patch(&patch, out, format)
}

fn cmd_send(config: &EditorConfig, path: &Path, sysex: bool) -> Result<()> {
    let patch = read_patch(path)?;
    let mut connection = DeviceConnection::new(config);
    connection.connect(config).map_err(|err| anyhow!(err))?;

    if sysex {
        connection
            .send(&WireMessage::SysEx(encode_patch_sysex(&patch)))
            .map_err(|err| anyhow!(err))?;
    } else {
        let writes = encode_patch(&patch);
        let count = writes.len();
        for nrpn in writes {
            connection
                .send(&WireMessage::Nrpn(nrpn))
                .map_err(|err| anyhow!(err))?;
        }
        info!("Sent {} NRPN writes", count);
    }

    connection.output.disconnect();
    println!("Sent '{}'", patch.name);
    Ok(())
}

fn cmd_monitor(config: &EditorConfig, format: OutputFormat) -> Result<()> {
    let mut connection = DeviceConnection::new(config);
    connection.connect(config).map_err(|err| anyhow!(err))?;

    let (outbound, wire) = unbounded();
    let bus = MessageBus::new(Arc::new(RwLock::new(Patch::default())), outbound)
        .with_default_patch_name(config.default_patch_name.clone());
    let sender = bus.sender();
    connection.request_dump().map_err(|err| anyhow!(err))?;

    let idle = Duration::from_millis(config.dump_idle_ms);
    let mut pending_dump = false;
    loop {
        let message = match connection.events().recv_timeout(idle) {
            Ok(DeviceEvent::Nrpn(_)) => {
                pending_dump = true;
                None
            }
            Ok(event) => EditorMessage::from_device_event(event),
            Err(RecvTimeoutError::Timeout) if pending_dump => {
                pending_dump = false;
                let dump = connection.snapshot();
                connection.reset_accumulator();
                Some(EditorMessage::DumpReceived(dump))
            }
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => break,
        };
        if let Some(message) = message {
            sender
                .send(message)
                .map_err(|_| anyhow!("Message bus closed"))?;
        }

        if bus.process_messages(64) > 0 {
            let patch = bus.patch();
            let patch = patch
                .read()
                .map_err(|_| anyhow!("Patch lock poisoned"))?
                .clone();
            write_patch(&patch, None, format)?;
        }
        for message in wire.try_iter() {
            debug!("Sending {:?}", message);
            connection.send(&message).map_err(|err| anyhow!(err))?;
        }
    }

    connection.input.disconnect();
    connection.output.disconnect();
    Ok(())
}

fn read_patch(path: &Path) -> Result<Patch> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let patch: Patch = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse patch {}", path.display()))?;
    if let Err(err) = patch.algorithm.validate() {
        warn!("{}: {}", path.display(), err);
    }
    Ok(patch)
}

fn write_patch(patch: &Patch, out: Option<&Path>, format: OutputFormat) -> Result<()> {
    let json = serde_json::to_string_pretty(patch).context("Failed to serialize patch")?;

    match out {
        Some(path) => {
            fs::write(path, &json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote '{}' to {}", patch.name, path.display());
            if format == OutputFormat::Table {
                print_summary(patch);
            }
        }
        None if format == OutputFormat::Json => println!("{json}"),
        None => print_summary(patch),
    }
    Ok(())
}

fn print_summary(patch: &Patch) {
    println!(
        "'{}'  algorithm {} ({})",
        patch.name,
        patch.algorithm.index + 1,
        patch.algorithm.name
    );

    for op in &patch.operators {
        let adsr = op.adsr;
        let mix = if op.is_carrier() {
            format!("mix {:>3} pan {:+.2}", op.amplitude, op.pan)
        } else {
            String::from("modulator")
        };
        println!(
            "  Op{} {:<10} {:>7.2} {:<9}  A {} D {} S {} R {}",
            op.id,
            format!("{:?}", op.waveform),
            op.frequency,
            mix,
            format_time(adsr.attack.time),
            format_time(adsr.decay.time),
            format_time(adsr.sustain.time),
            format_time(adsr.release.time),
        );
        for link in &op.targets {
            println!(
                "      -> Op{} im {:.2} velo {:.2}",
                link.target_operator_id, link.im, link.velocity_sensitivity
            );
        }
    }

    for (index, lfo) in patch.lfos.iter().enumerate() {
        let rate = match lfo.rate {
            LfoRate::Hz(hz) => format_frequency(hz),
            LfoRate::MidiClock(division) => division.label().to_string(),
        };
        println!("  LFO{} {:?} {}", index + 1, lfo.shape, rate);
    }
}
