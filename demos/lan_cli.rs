//! CLI application for controlling LIFX lights.
//!
//! This demo shows discovery, fire-and-forget commands and request/response
//! queries through a single connector.
//!
//! Run with: cargo run --example lan_cli -- --help
//! Set RUST_LOG=debug to see the traffic.

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::time::Duration;
use lifx_lan_rs::{Connector, Device, Hsbk, Kelvin, MessageType, NORMAL_TIMEOUT, Payload, PowerLevel};

#[derive(Parser)]
#[command(name = "lifx-cli")]
#[command(about = "Control LIFX lights on the local network", long_about = None)]
struct Cli {
    /// Device identity (MAC), e.g. d0:73:d5:12:34:56. Omit to address every light.
    #[arg(short, long, global = true, value_parser = parse_identity)]
    identity: Option<u64>,

    /// Device address; skips discovery when given with --identity
    #[arg(short, long, global = true)]
    addr: Option<SocketAddr>,

    /// How long to wait for replies, in milliseconds
    #[arg(short, long, global = true, default_value_t = NORMAL_TIMEOUT.as_millis() as u64)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover all lights on the network
    Discover,

    /// Show label, power and color
    Status,

    /// Turn the light on
    On,

    /// Turn the light off
    Off,

    /// Set color from hue (0-360), saturation and brightness (0-100)
    Color {
        #[arg(value_parser = clap::value_parser!(u16).range(0..=360))]
        hue: u16,
        #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
        saturation: u8,
        #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
        brightness: u8,
        /// Color temperature in Kelvin (2500-9000)
        #[arg(short, long, default_value = "3500")]
        kelvin: u16,
        /// Transition time in milliseconds
        #[arg(short, long, default_value = "0")]
        duration: u32,
    },

    /// Rename the light
    Label { label: String },

    /// Show firmware version and uptime
    Info,

    /// Dump connector diagnostics after discovery
    Diagnostics,
}

fn parse_identity(s: &str) -> Result<u64, String> {
    let hex: String = s.chars().filter(|c| *c != ':').collect();
    u64::from_str_radix(&hex, 16).map_err(|e| format!("invalid identity {s:?}: {e}"))
}

async fn resolve(connector: &Connector, cli: &Cli, timeout: Duration) -> Result<Vec<Device>, Box<dyn std::error::Error>> {
    match (cli.identity, cli.addr) {
        (Some(identity), Some(addr)) => Ok(vec![Device::new(addr, identity)]),
        (Some(identity), None) => {
            connector.discover(timeout, None).await?;
            Ok(vec![connector.find_device(identity)?])
        }
        (None, _) => Ok(connector.discover(timeout, None).await?),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let cli = Cli::parse();
    let timeout = Duration::from_millis(cli.timeout);
    let connector = Connector::connect().await?;

    match &cli.command {
        Commands::Discover => {
            println!("Discovering lights on the network (timeout: {}ms)...", cli.timeout);
            let devices = connector.discover(timeout, None).await?;
            if devices.is_empty() {
                println!("No lights found on the network.");
            } else {
                println!("\nFound {} light(s):", devices.len());
                for device in devices {
                    println!("  {device}");
                }
            }
        }

        Commands::Status => {
            let devices = resolve(&connector, &cli, timeout).await?;
            let responses = connector
                .request_all(
                    &devices,
                    connector.builder().light_get(),
                    Some(Connector::type_filter(MessageType::LightState)),
                    timeout,
                )
                .await?;
            for response in &responses {
                if let Payload::LightState(state) = &response.message.payload {
                    println!(
                        "  {:<32} {:3} hue={} sat={} bri={} {}K",
                        state.label.as_str(),
                        if state.power.is_on() { "ON" } else { "OFF" },
                        state.color.hue,
                        state.color.saturation,
                        state.color.brightness,
                        state.color.kelvin
                    );
                }
            }
            let missing = devices.len() - responses.len();
            if missing > 0 {
                println!("{missing} light(s) did not answer");
            }
        }

        Commands::On | Commands::Off => {
            let level = PowerLevel::from(matches!(cli.command, Commands::On));
            let msg = connector.builder().set_power(level);
            match cli.identity {
                None => connector.send_broadcast(msg).await?,
                Some(_) => {
                    let devices = resolve(&connector, &cli, timeout).await?;
                    connector.send_to(&devices, msg).await?;
                }
            }
            println!("Power set to {}", if level.is_on() { "ON" } else { "OFF" });
        }

        Commands::Color {
            hue,
            saturation,
            brightness,
            kelvin,
            duration,
        } => {
            let kelvin = Kelvin::create(*kelvin).ok_or("kelvin must be within 2500-9000")?;
            let color = Hsbk::from_degrees(*hue, *saturation, *brightness, kelvin)
                .ok_or("color out of range")?;
            let msg = connector.builder().light_set_color(color, *duration);
            match cli.identity {
                None => connector.send_broadcast(msg).await?,
                Some(_) => {
                    let devices = resolve(&connector, &cli, timeout).await?;
                    connector.send_to(&devices, msg).await?;
                }
            }
            println!("Color set");
        }

        Commands::Label { label } => {
            let identity = cli.identity.ok_or("--identity is required to rename a light")?;
            let devices = resolve(&connector, &cli, timeout).await?;
            let device = devices.first().ok_or("light not found")?;
            let reply = connector
                .request(device, connector.builder().set_label(label), None, timeout)
                .await?;
            println!("Light {identity:x} replied with {}", reply.message.kind());
        }

        Commands::Info => {
            for device in resolve(&connector, &cli, timeout).await? {
                let firmware = connector
                    .request(&device, connector.builder().get_host_firmware(), None, timeout)
                    .await;
                let info = connector
                    .request(&device, connector.builder().get_info(), None, timeout)
                    .await;
                println!("{device}");
                if let Ok(Payload::StateHostFirmware(fw)) = firmware.map(|r| r.message.payload) {
                    println!("  firmware: {}.{}", fw.version >> 16, fw.version & 0xffff);
                }
                if let Ok(Payload::StateInfo(info)) = info.map(|r| r.message.payload) {
                    println!("  uptime: {}s", info.uptime / 1_000_000_000);
                }
            }
        }

        Commands::Diagnostics => {
            resolve(&connector, &cli, timeout).await?;
            let diag = connector.diagnostics().await;
            println!("{}", serde_json::to_string_pretty(&diag)?);
        }
    }

    Ok(())
}
