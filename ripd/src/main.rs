use std::{error::Error, net::Ipv4Addr, time::Duration};

use clap::Parser;
use rip::{metric::Metric, router, Config, Node};
use tracing::debug;
#[cfg(target_family = "unix")]
use tokio::signal::{self, unix::SignalKind};
use tracing_subscriber::{filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// A distance vector routing daemon. The node periodically advertises its
/// routing table to its statically configured neighbours, converges on
/// shortest paths, and removes neighbours which stop sending traffic.
#[derive(Parser)]
#[command(version)]
struct Cli {
    /// The address of this node, as known to its neighbours.
    node_addr: Ipv4Addr,

    /// A neighbour and its direct link cost, in the form `address=cost`. Can
    /// be repeated.
    #[arg(short = 'n', long = "neighbour", value_parser = parse_neighbour, required = true)]
    neighbours: Vec<(Ipv4Addr, Metric)>,

    /// Port to listen on for routing traffic. All neighbours must use the
    /// same port.
    #[arg(short = 'p', long = "port", default_value_t = rip::DEFAULT_LISTEN_PORT)]
    port: u16,

    /// Seconds between periodic table advertisements.
    #[arg(long = "advertise-interval", default_value_t = router::ADVERTISE_INTERVAL.as_secs())]
    advertise_interval: u64,

    /// Seconds a neighbour may stay silent before it is declared down.
    #[arg(long = "liveness-interval", default_value_t = router::LIVENESS_CHECK_INTERVAL.as_secs())]
    liveness_interval: u64,

    /// Enable debug logging. Does nothing if `--silent` is set.
    #[arg(short = 'd', long = "debug", default_value_t = false)]
    debug: bool,

    /// Disable all logs except error logs.
    #[arg(long = "silent", default_value_t = false)]
    silent: bool,
}

/// Parse a neighbour argument of the form `address=cost`.
fn parse_neighbour(s: &str) -> Result<(Ipv4Addr, Metric), String> {
    let (addr, cost) = s
        .split_once('=')
        .ok_or_else(|| format!("expected `address=cost`, got `{s}`"))?;
    let addr = addr
        .parse::<Ipv4Addr>()
        .map_err(|e| format!("invalid neighbour address `{addr}`: {e}"))?;
    let cost = cost
        .parse::<u32>()
        .map_err(|e| format!("invalid link cost `{cost}`: {e}"))?;
    Ok((addr, Metric::new(cost)))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let level = if cli.silent {
        LevelFilter::ERROR
    } else if cli.debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::registry()
        .with(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with(tracing_logfmt::layer())
        .init();

    let config = Config {
        node_addr: cli.node_addr,
        neighbours: cli.neighbours,
        listen_port: cli.port,
        advertise_interval: Duration::from_secs(cli.advertise_interval),
        liveness_interval: Duration::from_secs(cli.liveness_interval),
    };

    let _node = Node::new(config).await?;

    #[cfg(target_family = "unix")]
    {
        let mut sigint =
            signal::unix::signal(SignalKind::interrupt()).expect("Can install SIGINT handler");
        let mut sigterm =
            signal::unix::signal(SignalKind::terminate()).expect("Can install SIGTERM handler");

        tokio::select! {
            _ = sigint.recv() => { }
            _ = sigterm.recv() => { }
        }
    }
    #[cfg(not(target_family = "unix"))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to wait for SIGINT: {e}");
        }
    }

    debug!("Shutting down");

    Ok(())
}
