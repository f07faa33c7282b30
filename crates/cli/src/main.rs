use std::io;
use std::process;
use std::time::Duration;

use clap::Parser;
use mjpeg::media::display::{DEFAULT_HEIGHT, DEFAULT_WIDTH, LogRenderer, Viewport};
use mjpeg::media::jpeg::JpegProbe;
use mjpeg::session::NoisePolicy;
use mjpeg::{Receiver, ReceiverConfig, SessionConfig};

#[derive(Parser)]
#[command(
    name = "mjpeg-receiver",
    about = "Receive a raw MJPEG stream over TCP and report decoded frames"
)]
struct Args {
    /// Bind address (host:port)
    #[arg(long, short, default_value = "0.0.0.0:8090")]
    bind: String,

    /// Frame buffer size in KiB (largest frame that fits)
    #[arg(long, default_value_t = 100)]
    buffer_kb: usize,

    /// Statistics reporting interval in milliseconds
    #[arg(long, default_value_t = 2000)]
    stats_interval_ms: u64,

    /// Drop bytes that cannot belong to a frame instead of keeping them
    #[arg(long)]
    discard_noise: bool,

    /// Display width in pixels
    #[arg(long, default_value_t = DEFAULT_WIDTH)]
    width: u16,

    /// Display height in pixels
    #[arg(long, default_value_t = DEFAULT_HEIGHT)]
    height: u16,
}

fn main() {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let config = ReceiverConfig {
        bind_addr: args.bind.clone(),
        session: SessionConfig {
            buffer_capacity: args.buffer_kb * 1024,
            stats_interval: Duration::from_millis(args.stats_interval_ms),
            noise_policy: if args.discard_noise {
                NoisePolicy::Discard
            } else {
                NoisePolicy::Retain
            },
            ..SessionConfig::default()
        },
        ..ReceiverConfig::default()
    };

    let mut receiver = Receiver::with_config(config);
    let renderer = LogRenderer::new(Viewport::new(args.width, args.height));

    let addr = match receiver.start(JpegProbe::new(), renderer) {
        Ok(addr) => addr,
        Err(e) => {
            eprintln!("Startup failed: {e}");
            eprintln!("Fix the problem and restart the receiver.");
            process::exit(1);
        }
    };

    println!("MJPEG receiver on {addr} - press Enter to stop");
    let mut input = String::new();
    if let Err(e) = io::stdin().read_line(&mut input) {
        eprintln!("Failed to read stdin: {e}");
    }

    if let Err(e) = receiver.stop() {
        eprintln!("Failed to stop receiver: {e}");
    }
}
