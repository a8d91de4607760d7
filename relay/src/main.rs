use clap::Parser;
use log::{error, info};
use relay::channel::WsConnector;
use relay::config::RelayConfig;
use relay::discovery;
use relay::error::RelayError;
use relay::pipeline::Relay;
use relay::retry::FixedDelay;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Tick feed to tail. When omitted, waits for a new file in --dir
    #[arg(short = 'f', long)]
    demo: Option<PathBuf>,

    /// Directory where new replay files appear
    #[arg(short = 'd', long, default_value = ".")]
    dir: PathBuf,

    /// Extension of tick feed files to watch for
    #[arg(short = 'e', long, default_value = "jsonl")]
    extension: String,

    /// WebSocket endpoint of the frame consumer
    #[arg(short = 'u', long, default_value = "ws://127.0.0.1:8080")]
    url: String,

    /// Milliseconds between frame deliveries
    #[arg(short = 'p', long, default_value = "50")]
    period_ms: u64,

    /// Per-attempt send deadline in milliseconds
    #[arg(long, default_value = "100")]
    send_timeout_ms: u64,

    /// Milliseconds between reconnect attempts
    #[arg(long, default_value = "5000")]
    reconnect_ms: u64,
}

impl Args {
    fn config(&self) -> RelayConfig {
        let mut config = RelayConfig {
            endpoint: self.url.clone(),
            broadcast_period: Duration::from_millis(self.period_ms.max(1)),
            ..RelayConfig::default()
        };
        config.channel.send_timeout = Duration::from_millis(self.send_timeout_ms);
        config.channel.reconnect = FixedDelay::new(Duration::from_millis(self.reconnect_ms));
        config.discovery.dir = self.dir.clone();
        config.discovery.extension = self.extension.trim_start_matches('.').to_string();
        config
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = args.config();
    let started = SystemTime::now();

    info!("Consumer endpoint: {}", config.endpoint);
    info!(
        "Delivering every {:?} (~{:.0} frames/s)",
        config.broadcast_period,
        config.broadcast_rate()
    );

    // Ctrl+C stops discovery or the running relay
    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                println!("Received Ctrl+C, shutting down gracefully...");
                shutdown.cancel();
            }
        });
    }

    // Use the given feed, or wait for the next match to start recording
    let demo_path = match args.demo {
        Some(path) => path,
        None => match discovery::wait_for_new_file(&config.discovery, started, &shutdown).await {
            Ok(path) => path,
            Err(RelayError::DiscoveryCancelled { .. }) => return Ok(()),
            Err(e) => return Err(e.into()),
        },
    };

    let relay = Relay::new(config.clone(), WsConnector::new(config.endpoint.clone()));

    tokio::select! {
        result = relay.run_file(&demo_path) => match result {
            Ok(summary) => info!(
                "Replay processed: {} snapshots produced, {} frames delivered",
                summary.producer.snapshots, summary.broadcast.delivered
            ),
            Err(e) => {
                error!("Relay stopped: {}", e);
                return Err(e.into());
            }
        },
        _ = shutdown.cancelled() => {}
    }

    Ok(())
}
