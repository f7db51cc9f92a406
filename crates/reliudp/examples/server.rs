//! Simple echo server using reliudp.
//!
//! Run:
//! - cargo run -p reliudp --example server
//! - RUST_LOG=debug cargo run -p reliudp --example server -- 127.0.0.1:7777

use std::{env, net::SocketAddr, thread, time::Duration};

use reliudp::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn parse_bind_addr() -> Option<SocketAddr> {
    let mut args = env::args().skip(1);
    args.next().and_then(|s| s.parse().ok())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let bind_addr = parse_bind_addr().unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 9000)));
    let mut context = NetContext::initialize()?;
    let mut peer = context.create_peer(bind_addr, Config::default())?;
    info!("echo server listening on {}", peer.local_addr()?);

    let mut buffer = vec![0u8; peer.config().max_payload_size()];
    loop {
        let event = match peer.receive(&mut buffer) {
            Ok(event) => event,
            Err(ErrorKind::CapacityExceeded { address, .. }) => {
                warn!(%address, "turning away remote, table full");
                continue;
            }
            Err(err) => return Err(err.into()),
        };
        if event.is_none() {
            thread::sleep(Duration::from_millis(10));
            continue;
        }
        let Some(from) = event.address else { continue };

        if event.is_connect() {
            info!("[connect] {}", from);
        }
        if event.is_disconnect() {
            info!("[disconnect] {}", from);
        }
        if event.is_receive() {
            let payload = &buffer[..event.len];
            info!("[packet] from={} payload=\"{}\"", from, String::from_utf8_lossy(payload));
            peer.send(from, payload, DeliveryGuarantee::Reliable)?;
        }
    }
}
