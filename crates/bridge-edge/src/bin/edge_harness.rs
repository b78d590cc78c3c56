//! A standalone harness that drives an [`EdgeSession`] against a
//! [`SimulatedHost`] and a bare-bones TCP echo stub standing in for the
//! bridge session service, so the state machine can be exercised without
//! a real softswitch or AI provider on the other end.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use rvoip_bridge_edge::host::{InboundFrame, ReadCodec, SimulatedHost, WriteCodec};
use rvoip_bridge_edge::session::EdgeSession;
use rvoip_bridge_wire::handshake::HandshakeRecord;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "edge-harness", about = "Exercise the edge session state machine locally")]
struct Args {
    /// Address the stub bridge listens on.
    #[arg(long, default_value = "127.0.0.1:0")]
    listen: String,

    /// Number of synthetic 160-byte µ-law inbound frames to feed the host.
    #[arg(long, default_value_t = 5)]
    frames: usize,

    /// Tracing filter, e.g. "info" or "rvoip_bridge_edge=debug".
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&args.log_level))
        .init();

    let listener = TcpListener::bind(&args.listen).await?;
    let addr = listener.local_addr()?;
    info!(%addr, "stub bridge listening");

    let stub = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.expect("accept");
        let (mut r, mut w) = tokio::io::split(socket);

        let mut line = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            r.read_exact(&mut byte).await.expect("handshake byte");
            if byte[0] == b'\n' {
                break;
            }
            line.push(byte[0]);
        }
        info!(handshake = %String::from_utf8_lossy(&line), "stub bridge received handshake");

        // Echo back two PCM16 audio records as if the AI had something to say.
        for i in 0..2u8 {
            let mut frame = vec![0u8; 320];
            frame[0] = i;
            w.write_all(&[0x01]).await.expect("tag");
            w.write_all(&frame).await.expect("frame");
            w.flush().await.expect("flush");
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        let mut buf = [0u8; 320];
        loop {
            match r.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
        }
    });

    let host = Arc::new(SimulatedHost::new());
    for _ in 0..args.frames {
        host.push_inbound(InboundFrame { data: vec![0xFFu8; 160], codec: ReadCodec::MuLaw });
    }
    host.set_write_codec(WriteCodec::MuLaw);

    let handshake = HandshakeRecord {
        call_uuid: uuid::Uuid::new_v4().to_string(),
        caller: "+15559876543".to_string(),
        sample_rate: 8000,
        channels: 1,
        format: "PCM16".to_string(),
    };

    let host_for_run = host.clone();
    let bridge_addr = addr.to_string();
    let run = tokio::spawn(async move {
        let _ = tokio::time::timeout(
            Duration::from_millis(500),
            EdgeSession::run(host_for_run, &bridge_addr, handshake),
        )
        .await;
    });

    let _ = run.await;
    stub.abort();

    info!(
        answered = host.was_answered(),
        outbound_frames = host.outbound_frames().len(),
        "harness run complete"
    );
    Ok(())
}
