mod audio;
mod cli;
mod config;
mod error;
mod light;
mod pipeline;
mod proto;

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Read;
use std::sync::Arc;

use audio::detectors::{default_detectors, init_detectors};
use audio::ingest::SampleIngestor;
use audio::spectrum::SpectrumEngine;
use cli::Cli;
use config::Settings;
use error::Error;
use light::state::{LightingState, ZoneTopology};
use light::visualizer::PulseVisualizer;
use pipeline::{RenderStage, SpectrumSlot};
use proto::encode::{ProtocolEncoder, Volumes};
use proto::packet::Revision;
use proto::transport::{NullTransport, SerialConfig, SerialTransport, Transport};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();

    if cli.list_ports {
        let ports = serialport::available_ports().context("Failed to enumerate serial ports")?;
        if ports.is_empty() {
            println!("No serial ports found");
        }
        for port in ports {
            println!("{}", port.port_name);
        }
        return Ok(());
    }

    // Load settings: config values apply only where the CLI is at its default.
    let mut serial = SerialConfig::default();
    let mut topology = ZoneTopology::default();
    if let Some(path) = cli.config.clone() {
        let settings = Settings::load(&path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        log::info!("Loaded {} settings from {}", settings.len(), path.display());
        merge_settings(&settings, &mut cli, &mut serial, &mut topology)?;
    }

    if cli.port.is_some() {
        serial.port = cli.port.clone().unwrap();
    }
    serial.baud = cli.baud;

    if cli.format != "s16le" {
        return Err(Error::UnsupportedFormat(cli.format.clone()).into());
    }

    let revision = match cli.revision {
        8 => Revision::EightBit,
        16 => Revision::SixteenBit,
        other => anyhow::bail!("Unknown protocol revision: {} (expected 8 or 16)", other),
    };

    // Build the analysis side first: the ingestor validates buffer size and
    // overlap, so the update-rate division below cannot hit a zero stride.
    let mut ingestor =
        SampleIngestor::new(cli.buffer_size, cli.overlap, cli.channels, cli.channel)?;
    let mut engine = SpectrumEngine::new(cli.buffer_size, cli.sample_rate as f32)?;

    let updates_per_second =
        cli.sample_rate as f32 / (cli.buffer_size / cli.overlap) as f32;

    log::info!("lumen - audio-reactive lighting controller");
    log::info!(
        "Input: s16le, {} Hz, {} channels (analyzing channel {})",
        cli.sample_rate,
        cli.channels,
        cli.channel
    );
    log::info!(
        "Analysis: {}-point FFT, {}x overlap, {:.1} updates/s",
        cli.buffer_size,
        cli.overlap,
        updates_per_second
    );
    log::info!(
        "Protocol: {}-bit revision, sync 0x{:02X}",
        cli.revision,
        revision.sync()
    );

    let mut detectors = default_detectors();
    init_detectors(&mut detectors, cli.buffer_size, cli.sample_rate as f32, updates_per_second)?;

    // Build the render side.
    let transport: Box<dyn Transport> = if serial.port.is_empty() {
        log::warn!("No serial port configured; running against a null transport");
        Box::new(NullTransport)
    } else {
        Box::new(SerialTransport::open(&serial)?)
    };

    let volumes = Volumes {
        master: cli.volume,
        front: cli.front_volume,
        rear: cli.rear_volume,
        strobe: cli.strobe_volume,
    };
    let encoder = ProtocolEncoder::new(revision, volumes);
    let state = LightingState::new(topology);

    let mut stage = RenderStage::new(
        detectors,
        Box::new(PulseVisualizer::new()),
        encoder,
        transport,
        state,
    );

    let slot = Arc::new(SpectrumSlot::new());
    let consumer = {
        let slot = Arc::clone(&slot);
        std::thread::spawn(move || stage.run(&slot))
    };

    // Producer loop: stdin PCM -> ring windows -> FFT -> handoff slot.
    // Spectrum work stays on this thread; the slot never blocks it.
    let mut stdin = std::io::stdin().lock();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stdin.read(&mut chunk).context("Failed to read PCM input")?;
        if n == 0 {
            break;
        }
        let mut transform_error = None;
        ingestor.feed(&chunk[..n], |window| {
            match engine.transform(window) {
                Ok(spectrum) => slot.publish(spectrum),
                Err(err) => transform_error = Some(err),
            }
        });
        if let Some(err) = transform_error {
            slot.close();
            return Err(err.into());
        }
    }

    log::info!("PCM input ended");
    slot.close();
    consumer
        .join()
        .map_err(|_| anyhow::anyhow!("Render thread panicked"))?;

    Ok(())
}

fn merge_settings(
    settings: &Settings,
    cli: &mut Cli,
    serial: &mut SerialConfig,
    topology: &mut ZoneTopology,
) -> Result<()> {
    if let Some(port) = settings.get("serial_port") {
        if cli.port.is_none() {
            cli.port = Some(port.to_string());
        }
    }
    if let Some(baud) = settings.get_parsed("baud")? {
        if cli.baud == 115_200 {
            cli.baud = baud;
        }
    }
    if let Some(bits) = settings.get_parsed("data_bits")? {
        serial.data_bits = bits;
    }
    if let Some(parity) = settings.get("parity") {
        serial.parity = parity.to_string();
    }
    if let Some(stop) = settings.get_parsed("stop_bits")? {
        serial.stop_bits = stop;
    }

    if let Some(v) = settings.get_parsed("leds_per_panel")? {
        topology.leds_per_panel = v;
    }
    if let Some(v) = settings.get_parsed("front_panels")? {
        topology.front_panels = v;
    }
    if let Some(v) = settings.get_parsed("rear_panels")? {
        topology.rear_panels = v;
    }
    if let Some(v) = settings.get_parsed("uv_white_panels")? {
        topology.uv_white_panels = v;
    }
    if let Some(v) = settings.get_parsed("rear_address_offset")? {
        topology.rear_address_offset = v;
    }
    if let Some(v) = settings.get_parsed("uv_white_address_offset")? {
        topology.uv_white_address_offset = v;
    }

    Ok(())
}
