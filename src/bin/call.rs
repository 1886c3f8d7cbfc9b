//! Voice Call Application
//!
//! Interactive two-party audio call over UDP. Reads call commands from
//! stdin and reports operation outcomes through the session observer.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use voip_call::{
    config::AppConfig,
    engine::BuiltinEngine,
    net::{discover_local_ip, resolve_local_address, AddressFamily},
    session::{Session, SessionObserver},
};

/// Logs every completion as it arrives on the session context.
struct LoggingObserver;

impl SessionObserver for LoggingObserver {
    fn on_start_session_completed(&self, success: bool) {
        tracing::info!("start session completed: {}", success);
    }
    fn on_stop_session_completed(&self, success: bool) {
        tracing::info!("stop session completed: {}", success);
    }
    fn on_start_send_completed(&self, success: bool) {
        tracing::info!("start send completed: {}", success);
    }
    fn on_stop_send_completed(&self, success: bool) {
        tracing::info!("stop send completed: {}", success);
    }
    fn on_start_playout_completed(&self, success: bool) {
        tracing::info!("start playout completed: {}", success);
    }
    fn on_stop_playout_completed(&self, success: bool) {
        tracing::info!("stop playout completed: {}", success);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting voice call client");

    // Load config from the first argument, or fall back to defaults
    let config = match std::env::args().nth(1) {
        Some(path) => AppConfig::load(Path::new(&path))?,
        None => AppConfig::default(),
    };

    let local_ip = match config.local_ip {
        Some(ip) => ip,
        None => resolve_local_address(AddressFamily::V4)
            .ok_or_else(|| anyhow::anyhow!("no local IPv4 address available"))?,
    };
    tracing::info!("Local address: {} (discovered: {})", local_ip, discover_local_ip());

    let observer: Arc<dyn SessionObserver> = Arc::new(LoggingObserver);
    let session = Session::spawn(
        Box::new(BuiltinEngine::new()),
        Arc::downgrade(&observer),
    );
    let handle = session.handle();

    println!("\n=== Available Input Devices ===");
    for name in voip_call::audio::device::input_device_names() {
        println!("  {}", name);
    }

    println!("\n=== Supported Codecs ===");
    for codec in handle.supported_codecs() {
        println!(
            "  {} (pt {}, {} Hz, {} ch)",
            codec.name, codec.payload_type, codec.clock_rate, codec.channels
        );
    }
    println!();
    println!(
        "Commands: start | stop | send on|off | play on|off | codec <name> | decoders <names> | quit"
    );

    handle.set_local_address(local_ip, config.rtp_port);
    handle.set_remote_address(config.remote_ip, config.remote_rtp_port);

    let encoder = config.encoder.clone();
    let decoders = config.decoders.clone();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let mut words = line.split_whitespace();
        match (words.next(), words.next()) {
            (Some("start"), _) => {
                handle.start_session();
                // Codec preferences only apply to a live channel
                handle.set_encoder(&encoder);
                handle.set_decoders(&decoders);
            }
            (Some("stop"), _) => handle.stop_session(),
            (Some("send"), Some("on")) => handle.start_send(),
            (Some("send"), Some("off")) => handle.stop_send(),
            (Some("play"), Some("on")) => handle.start_playout(),
            (Some("play"), Some("off")) => handle.stop_playout(),
            (Some("codec"), Some(name)) => handle.set_encoder(name),
            (Some("decoders"), Some(first)) => {
                let mut names = vec![first.to_string()];
                names.extend(words.map(str::to_string));
                handle.set_decoders(&names);
            }
            (Some("quit"), _) | (Some("exit"), _) => break,
            (None, _) => {}
            _ => println!("unrecognized command: {}", line),
        }
    }

    tracing::info!("Shutting down");
    session.shutdown().await;
    Ok(())
}
