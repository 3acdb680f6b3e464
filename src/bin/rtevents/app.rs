use async_channel::bounded;
use runtime_events::Result;
use runtime_events::Watcher;
use runtime_events::config::Config;
use runtime_events::error::{ConfigError, Error as AppError};
use runtime_events::sink::{ChannelSink, NotificationSink};
use runtime_events::stream::EventStream;
use runtime_events::telemetry::init_tracing;
use tokio::signal;
use tokio::time::{MissedTickBehavior, interval, sleep};
use tracing::{debug, info, warn};

use super::cli::Cli;
use super::notifier::run_notifier;

const DEFAULT_CONFIG: &str = "config.toml";

pub async fn run(cli: Cli) -> Result<()> {
    init_tracing(cli.log_filter.as_deref(), cli.json_logs)?;

    let mut config = match cli.config.as_deref() {
        Some(path) => Config::from_env_and_required_file(path)?,
        None => Config::from_env_and_file(DEFAULT_CONFIG)?,
    };

    if let Some(drain_interval) = cli.interval {
        if drain_interval.is_zero() {
            return Err(AppError::from(ConfigError::InvalidField {
                field: "cli.interval",
                message: "interval must be greater than zero".to_string(),
            }));
        }
        config.drain_interval = drain_interval;
    }
    if let Some(machine_id) = cli.machine_id {
        let machine_id = machine_id.trim().to_string();
        config.events.machine_id = (!machine_id.is_empty()).then_some(machine_id);
    }
    if config.events.filter.is_none() {
        warn!("no event filter configured; every runtime event will be dropped");
    }

    let watcher = Watcher::new(config.events.normalizer());
    let stream = EventStream::new(
        &config.runtime.url,
        config.runtime.api_version.as_deref(),
        config.runtime.connect_timeout,
        config.runtime.reconnect_max_interval,
    )?;
    info!(endpoint = %stream.endpoint(), "watching runtime events");

    let (tx, rx) = bounded(config.queue_capacity);
    let notifier = tokio::spawn(run_notifier(rx, cli.dry_run));
    let sink = ChannelSink::new(tx.clone());

    if cli.once {
        let intake = watcher.intake();
        tokio::select! {
            res = stream.send_request(&intake) => {
                res?;
            }
            () = sleep(config.drain_interval) => {}
        }
        drain_once(&watcher, &sink);
    } else {
        let intake = watcher.intake();
        let stream_task = tokio::spawn(async move { stream.run(intake).await });

        let mut ticker = interval(config.drain_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut was_alive = true;
        loop {
            tokio::select! {
                biased;
                _ = signal::ctrl_c() => {
                    info!("shutdown signal received, stopping loop");
                    break;
                }
                _ = ticker.tick() => {
                    drain_once(&watcher, &sink);
                    let alive = watcher.is_alive();
                    if alive != was_alive {
                        if alive {
                            info!("runtime event stream is back");
                        } else {
                            debug!("runtime event stream is not alive; waiting for reconnection");
                        }
                        was_alive = alive;
                    }
                }
            }
        }

        stream_task.abort();
        drain_once(&watcher, &sink);
    }

    drop(sink);
    tx.close();
    match notifier.await {
        Ok(delivered) => debug!(delivered, "notifier finished"),
        Err(err) => warn!(error = %err, "notifier task terminated unexpectedly"),
    }

    Ok(())
}

fn drain_once(watcher: &Watcher, sink: &dyn NotificationSink) {
    let report = watcher.collect(sink);
    if report.total() > 0 {
        debug!(
            emitted = report.emitted,
            filtered = report.filtered,
            unsupported = report.unsupported,
            malformed = report.malformed,
            unscoped = report.unscoped,
            "runtime event batch processed"
        );
    }
}
