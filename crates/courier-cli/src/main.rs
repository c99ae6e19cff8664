//! courier: drain a queue into an append-only record table.
//!
//! 終了コード:
//! - 0: graceful shutdown（SIGINT / SIGTERM）
//! - 69: キューが存在しない（Fatal）
//! - 78: 設定エラー
//! - 1: その他の起動失敗

mod logging;

use std::process::ExitCode;
use std::sync::Arc;

use courier_core::app::shutdown::{self, ShutdownHandle, ShutdownSignal};
use courier_core::domain::QueueError;
use courier_core::impls::{DynamoDbRecordStore, SdkConfig, SqsQueueClient, load_aws_config};
use courier_core::{ExitStatus, WorkerBuilder, WorkerConfig};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    // .env は任意（コンテナでは環境変数が直接渡される）
    let _ = dotenvy::dotenv();
    logging::init_tracing(logging::LogFormat::from_env());

    let status = run().await;
    ExitCode::from(status.code())
}

async fn run() -> ExitStatus {
    let config = match WorkerConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "invalid configuration");
            return ExitStatus::ConfigError;
        }
    };
    info!(
        table = %config.table_name,
        queue = %config.queue_name,
        wait_secs = config.wait_seconds,
        backoff_base_ms = config.backoff_base_ms,
        backoff_max_ms = config.backoff_max_ms,
        backoff_multiplier = config.backoff_multiplier,
        error_marker = %config.error_marker,
        error_kinds = %config.active_error_kinds(),
        "configuration loaded"
    );

    let (handle, mut signal) = shutdown::channel();
    tokio::spawn(forward_signals(handle));

    let aws_config = load_aws_config().await;
    let queue = match connect_queue(&aws_config, &config, &mut signal).await {
        Ok(Some(queue)) => queue,
        Ok(None) => return ExitStatus::Graceful,
        Err(err) => {
            error!(error = %err, "queue not found, entering fatal state");
            return ExitStatus::QueueGone;
        }
    };
    let store = DynamoDbRecordStore::from_config(&aws_config, &config.table_name);
    info!(queue_url = queue.queue_url(), table = store.table_name(), "connected");

    let worker = match WorkerBuilder::new()
        .queue(Arc::new(queue))
        .store(Arc::new(store))
        .classifier(config.classifier())
        .retry_policy(config.retry_policy())
        .wait(config.wait())
        .shutdown(signal)
        .build()
    {
        Ok(worker) => worker,
        Err(err) => {
            error!(error = %err, "could not build worker");
            return ExitStatus::StartupFailure;
        }
    };

    match worker.run().await {
        Ok(stats) => {
            info!(?stats, "shutdown complete");
            ExitStatus::Graceful
        }
        Err(err) => {
            error!(error = %err, "worker stopped");
            ExitStatus::from(&err)
        }
    }
}

/// Resolve the queue, retrying transient failures. `Ok(None)` means shutdown was requested.
async fn connect_queue(
    aws_config: &SdkConfig,
    config: &WorkerConfig,
    signal: &mut ShutdownSignal,
) -> Result<Option<SqsQueueClient>, QueueError> {
    let policy = config.retry_policy();
    let mut attempts = 0u32;
    loop {
        match SqsQueueClient::from_config(aws_config, &config.queue_name).await {
            Ok(queue) => return Ok(Some(queue)),
            Err(err @ QueueError::NotFound(_)) => return Err(err),
            Err(QueueError::Unavailable(reason)) => {
                attempts += 1;
                let delay = policy.next_delay(attempts);
                warn!(attempt = attempts, delay_ms = delay.as_millis() as u64, %reason, "could not resolve queue, backing off");
                tokio::select! {
                    biased;
                    _ = signal.requested() => return Ok(None),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }
}

/// Turn SIGINT / SIGTERM into a shutdown request.
async fn forward_signals(handle: ShutdownHandle) {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("received SIGINT, finishing current cycle"),
        result = wait_for_sigterm() => match result {
            Ok(()) => info!("received SIGTERM, finishing current cycle"),
            Err(err) => {
                warn!(error = %err, "could not install SIGTERM handler");
                // still honour Ctrl+C
                let _ = tokio::signal::ctrl_c().await;
                info!("received SIGINT, finishing current cycle");
            }
        },
    }
    handle.request_shutdown();
}

/// Wait for SIGTERM signal (for container deployments)
#[cfg(unix)]
async fn wait_for_sigterm() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};
    let mut sigterm = signal(SignalKind::terminate())?;
    sigterm.recv().await;
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_sigterm() -> std::io::Result<()> {
    std::future::pending::<()>().await;
    Ok(())
}
