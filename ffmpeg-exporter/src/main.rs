use std::{net::SocketAddr, sync::Arc};

use clap::Parser;
use prometheus_client::registry::Registry;
use tracing as _;

mod metrics;
mod progress;
mod server;

use metrics::ProgressCollector;
use progress::DirectoryStore;

#[derive(Debug, Parser)]
#[command(about = "ffmpeg progress file exporter")]
struct Cli {
    /// Watch for ffmpeg progress files in this path
    #[arg(short('i'), long, env = "WatchPath", default_value = "/tmp/ffmpeg")]
    watch_path: String,

    /// IP address on which the metrics are exposed
    #[arg(short, long, env = "ListenIp", default_value = "0.0.0.0")]
    listen_ip: String,

    /// Expose Prometheus metrics on this port
    #[arg(short('p'), long, env = "ListenPort", default_value_t = 2342)]
    listen_port: u16,

    /// Increase verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn log_level(&self) -> log::LevelFilter {
        match self.verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

/// Wait for termination signal (either SIGINT or SIGTERM)
#[cfg(unix)]
async fn wait_terminate() {
    use futures::{stream::FuturesUnordered, StreamExt};
    use tokio::signal::unix::{signal, SignalKind};
    let mut signals = Vec::new();

    for sig in [SignalKind::terminate(), SignalKind::interrupt()] {
        match signal(sig) {
            Ok(sig) => signals.push(sig),
            Err(err) => log::error!("Could not register signal handler: {err}"),
        }
    }

    let mut signals = signals
        .iter_mut()
        .map(|sig| sig.recv())
        .collect::<FuturesUnordered<_>>();

    loop {
        match signals.next().await {
            Some(Some(())) => break,
            // This handler has been stopped, the others may still trigger
            Some(None) => (),
            None => futures::future::pending::<()>().await,
        }
    }
}

#[cfg(windows)]
macro_rules! win_signal {
    ($($sig:ident),*$(,)?) => {
        $(
            let $sig = async {
                match tokio::signal::windows::$sig() {
                    Ok(mut $sig) => {
                        if $sig.recv().await.is_some() {
                            return;
                        }
                    }
                    Err(err) => log::error!(
                        "Could not register signal handler for {}: {err}",
                        stringify!($sig),
                    ),
                }
                futures::future::pending::<()>().await;
            };
        )*
        tokio::select! {
            $(
                _ = $sig => {}
            )*
        }
    }
}

/// Wait for termination signal (console control events)
#[cfg(windows)]
async fn wait_terminate() {
    win_signal!(ctrl_c, ctrl_close, ctrl_shutdown);
}

#[tokio::main]
async fn main() -> Result<(), eyre::Report> {
    let cli = Cli::parse();

    env_logger::builder()
        .filter_level(cli.log_level())
        .filter_module("tracing", log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let store = DirectoryStore::new(&cli.watch_path);
    log::info!("watching {}", store.path().display());

    let mut registry = Registry::default();
    registry.register_collector(Box::new(ProgressCollector::new(store)));

    let addr = SocketAddr::new(cli.listen_ip.parse()?, cli.listen_port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let router = server::router(Arc::new(registry));

    let mut service_future = tokio::spawn(async move { axum::serve(listener, router).await });

    log::info!("Exposing metrics on http://{addr}/metrics");

    tokio::select! {
        output = &mut service_future => {
            match output {
                Ok(Ok(())) => (),
                Ok(Err(err)) => {
                    log::error!("Service had an error: {err:?}");
                }
                Err(err) => {
                    log::error!("Service future had an error: {err:?}");
                }
            }
        }
        _ = wait_terminate() => {
            log::info!("Application stopping");
        }
    }

    service_future.abort();
    _ = service_future.await;

    log::info!("Application stopped");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["ffmpeg-exporter"]).unwrap();

        assert_eq!(cli.watch_path, "/tmp/ffmpeg");
        assert_eq!(cli.listen_ip, "0.0.0.0");
        assert_eq!(cli.listen_port, 2342);
        assert_eq!(cli.log_level(), log::LevelFilter::Info);
    }

    #[test]
    fn verbosity() {
        let level = |args: &[&str]| {
            Cli::try_parse_from(std::iter::once("ffmpeg-exporter").chain(args.iter().copied()))
                .unwrap()
                .log_level()
        };

        assert_eq!(level(&["-v"]), log::LevelFilter::Debug);
        assert_eq!(level(&["-vv"]), log::LevelFilter::Trace);
        assert_eq!(level(&["-v", "-v", "-v"]), log::LevelFilter::Trace);
    }

    #[test]
    fn arguments() {
        let cli = Cli::try_parse_from([
            "ffmpeg-exporter",
            "-i",
            "/var/run/ffmpeg",
            "-p",
            "9100",
            "--listen-ip",
            "127.0.0.1",
        ])
        .unwrap();

        assert_eq!(cli.watch_path, "/var/run/ffmpeg");
        assert_eq!(cli.listen_port, 9100);
        assert_eq!(cli.listen_ip, "127.0.0.1");
    }
}
