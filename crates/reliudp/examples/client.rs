//! Simple client that sends messages to a reliudp server and prints replies.
//!
//! Run the server first:
//! - cargo run -p reliudp --example server -- 127.0.0.1:7777
//!
//! Then run the client:
//! - cargo run -p reliudp --example client -- 127.0.0.1:7777
//! - cargo run -p reliudp --example client -- 127.0.0.1:7777 10 200
//!   (sends 10 messages, 200ms apart)

use std::{
    env,
    net::SocketAddr,
    thread,
    time::{Duration, Instant},
};

use reliudp::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Args: <server_addr> [count] [interval_ms]
    let mut args = env::args().skip(1);
    let server_addr: SocketAddr =
        args.next().unwrap_or_else(|| "127.0.0.1:9000".to_string()).parse()?;
    let count: usize = args.next().unwrap_or_else(|| "5".into()).parse().unwrap_or(5);
    let interval_ms: u64 = args.next().unwrap_or_else(|| "300".into()).parse().unwrap_or(300);

    let mut context = NetContext::initialize()?;
    let mut peer = context.create_peer("127.0.0.1:0", Config::default())?;
    let local = peer.local_addr()?;
    info!(
        "client bound to {} -> sending {} messages to {} (every {}ms)",
        local, count, server_addr, interval_ms
    );

    let mut buffer = vec![0u8; peer.config().max_payload_size()];
    for i in 0..count {
        let msg = format!("hello {} from {}", i, local);
        peer.send(server_addr, msg.as_bytes(), DeliveryGuarantee::Reliable)?;

        let start = Instant::now();
        let wait = Duration::from_millis(interval_ms);
        while start.elapsed() < wait {
            let event = peer.receive(&mut buffer)?;
            if event.is_none() {
                thread::sleep(Duration::from_millis(5));
                continue;
            }
            if event.is_connect() {
                info!("[connect] {:?}", event.address);
            }
            if event.is_receive() {
                info!("[reply] payload=\"{}\"", String::from_utf8_lossy(&buffer[..event.len]));
            }
            if event.is_disconnect() {
                info!("[disconnect] {:?}", event.address);
            }
        }
    }

    peer.dispose();
    context.deinitialize();
    Ok(())
}
