//! Minimal frame consumer for trying the relay locally.
//!
//! Accepts WebSocket connections and logs a line per received frame.

use clap::Parser;
use futures_util::StreamExt;
use log::{info, warn};
use shared::decode_frame;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(short = 'l', long, default_value = "127.0.0.1:8080")]
    listen: String,

    /// Also print every player in each frame
    #[arg(short = 'v', long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let listener = TcpListener::bind(&args.listen).await?;
    info!("Frame sink listening on ws://{}", listener.local_addr()?);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, addr) = accepted?;
                tokio::spawn(handle_connection(stream, addr, args.verbose));
            }
            _ = tokio::signal::ctrl_c() => {
                println!("Received Ctrl+C, shutting down...");
                return Ok(());
            }
        }
    }
}

/// Reads frames from one relay connection until it closes.
async fn handle_connection(stream: TcpStream, addr: SocketAddr, verbose: bool) {
    let mut ws = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("Handshake with {} failed: {}", addr, e);
            return;
        }
    };
    info!("Relay connected from {}", addr);

    while let Some(message) = ws.next().await {
        match message {
            Ok(Message::Text(text)) => match decode_frame(&text) {
                Ok(frame) => {
                    info!(
                        "{} tick {}: {} players",
                        frame.source,
                        frame.tick,
                        frame.players.len()
                    );
                    if verbose {
                        for player in &frame.players {
                            println!(
                                "  {:<16} team={} hp={:>3} armor={:>3} pos=({:.1}, {:.1}, {:.1})",
                                player.name,
                                player.team.as_num(),
                                player.health,
                                player.armor,
                                player.position.x,
                                player.position.y,
                                player.position.z
                            );
                        }
                    }
                }
                Err(e) => warn!("Undecodable frame from {}: {}", addr, e),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("Connection error from {}: {}", addr, e);
                break;
            }
        }
    }

    info!("Relay from {} disconnected", addr);
}
