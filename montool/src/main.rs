use std::{time::Duration, path::PathBuf, io::ErrorKind, io::Write};

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use serialport::SerialPort;
use clap::{Args, Parser};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod image;
mod proto;

use image::Format;

/// A tool for loading programs into the FPCA through its tinyboot serial
/// bootloader.
#[derive(Debug, Parser)]
#[clap(version)]
struct BootTool {
    /// Baud rate of serial port.
    #[clap(long, short, global = true, default_value_t = 9600)]
    baud_rate: u32,
    /// More diagnostics on stderr; repeat for more. RUST_LOG overrides.
    #[clap(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[clap(subcommand)]
    cmd: SubCmd,
}

#[derive(Debug, Args)]
struct Port {
    /// Path to serial port on your machine, e.g. /dev/ttyUSB0 or COM1:
    port: String,
}

#[derive(Debug, Parser)]
enum SubCmd {
    /// Wait for the bootloader to announce itself, then send it an image.
    Upload {
        #[clap(flatten)]
        port: Port,
        /// Address to load the image at.
        #[clap(value_parser = parse_int::parse::<u32>)]
        address: u32,
        /// Program image, raw binary or ASCII hex.
        image_file: PathBuf,
        /// Image format; by default, files ending .hex are hex and anything
        /// else is binary.
        #[clap(long, value_enum)]
        format: Option<Format>,
        /// Seconds to wait for the bootloader.
        #[clap(long, default_value_t = 30)]
        timeout: u64,
        /// If provided, the tool will immediately begin echoing back data
        /// received on the serial report until you kill it. This is useful for
        /// seeing what the bootloader and then the program have to say.
        #[clap(long)]
        then_echo: bool,
    },
    /// Perform a basic check to see if tinyboot appears to be running.
    Wait {
        #[clap(flatten)]
        port: Port,
        /// Seconds to wait for the bootloader.
        #[clap(long, default_value_t = 30)]
        timeout: u64,
    },
    /// Echo everything the device sends until you kill it.
    Listen {
        #[clap(flatten)]
        port: Port,
    },
    /// Reverse the byte order of each word in an ASCII hex file.
    Swap {
        input: PathBuf,
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = BootTool::parse();

    let default_level = match args.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match args.cmd {
        SubCmd::Upload { port, address, image_file, format, timeout, then_echo } => {
            let image = image::load(&image_file, format)?;
            let transfer = proto::frame(address, &image)
                .with_context(|| format!("framing {}", image_file.display()))?;

            let mut port = open(&port.port, args.baud_rate)?;
            wait(&mut port, timeout)?;

            let bar = ProgressBar::new(transfer.len() as u64);
            for chunk in transfer.chunks(64) {
                port.write_all(chunk)
                    .context("sending image")?;
                bar.inc(chunk.len() as u64);
            }
            port.flush().context("sending image")?;
            bar.finish();
            println!("note: {} bytes sent to {address:#x}", image.len());

            if then_echo {
                echo(&mut port)?;
            }
        }
        SubCmd::Wait { port, timeout } => {
            let mut port = open(&port.port, args.baud_rate)?;
            wait(&mut port, timeout)?;
        }
        SubCmd::Listen { port } => {
            let mut port = open(&port.port, args.baud_rate)?;
            drain(&mut port)?;
            echo(&mut port)?;
        }
        SubCmd::Swap { input, output } => {
            let text = std::fs::read_to_string(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            let swapped = image::swap_hex(&text)
                .with_context(|| format!("swapping {}", input.display()))?;
            std::fs::write(&output, swapped)
                .with_context(|| format!("writing {}", output.display()))?;
        }
    }

    Ok(())
}

fn open(path: &str, baud_rate: u32) -> Result<Box<dyn SerialPort>> {
    let port = serialport::new(path, baud_rate)
        .timeout(Duration::from_millis(500))
        .open()
        .with_context(|| format!("opening serial port {path}"))?;
    tracing::info!(port = path, baud = baud_rate, "port open");
    Ok(port)
}

fn wait(port: &mut Box<dyn SerialPort>, timeout: u64) -> Result<()> {
    println!("note: waiting for bootloader; reset the board with SW15 up");
    let chatter = proto::wait_for_xon(port, Duration::from_secs(timeout))?;
    if !chatter.is_empty() {
        tracing::info!(said = %String::from_utf8_lossy(&chatter).trim_end(), "device");
    }
    println!("note: bootloader is listening");
    Ok(())
}

fn echo(port: &mut Box<dyn SerialPort>) -> Result<()> {
    let stdout = std::io::stdout();
    let mut stdout = stdout.lock();
    proto::echo(port, &mut stdout)
}

fn drain(port: &mut Box<dyn SerialPort>) -> Result<()> {
    let saved_timeout = port.timeout();

    port.set_timeout(Duration::from_millis(1))
        .context("reducing timeout for drain")?;

    let mut buffer = [0; 32];
    let mut cruft = 0_usize;
    loop {
        match port.read(&mut buffer) {
            Ok(n) => cruft += n,
            Err(e) if e.kind() == ErrorKind::TimedOut => {
                break;
            }
            Err(e) => return Err(e)
                .context("attempting to drain buffer"),
        }
    }
    port.set_timeout(saved_timeout)
        .context("restoring timeout after drain")?;

    if cruft > 0 {
        println!("note: {cruft} bytes of cruft drained from serial port");
    }

    Ok(())
}
