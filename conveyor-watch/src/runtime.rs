use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Serialize;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, oneshot, RwLock};
use tokio::time::Instant;

use conveyor_bundler::{script, ScriptBundler, ToolchainStyleTransformer};
use conveyor_core::{BuildConfig, Environment};
use conveyor_stages::{pipeline, BuildScope, StageKind};

use crate::error::{io_err, WatchError};
use crate::paths::{watch_bindings, WatchBinding, DEBOUNCE_WINDOW};
use crate::reload::{ReloadEvent, ReloadReply, ReloadRequest};

/// Per-stage rebuild counters surfaced by the `status` request.
pub type RebuildCounts = HashMap<String, u64>;

struct RebuildJob {
    stage: StageKind,
    source: &'static str,
    respond_to: oneshot::Sender<Result<RebuildSummary, String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RebuildSummary {
    pub stage: String,
    pub source: String,
    pub written: usize,
    pub failed: usize,
    pub duration_ms: u128,
}

/// Start the watch runtime and block the current thread until it exits.
pub fn start_blocking(root: &Path) -> Result<(), WatchError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(root.to_path_buf()))
}

/// Run the watch runtime: filesystem watcher, rebuild processor, live-reload
/// server, and ctrl-c handler, joined under one shutdown broadcast.
pub async fn run(root: PathBuf) -> Result<(), WatchError> {
    let env = Arc::new(Environment::from_env());
    let config = Arc::new(BuildConfig::load_at(&root)?);
    let transformer = Arc::new(ToolchainStyleTransformer::from_config(
        &config.tools,
        env.mode,
    ));
    let bundler: Arc<dyn ScriptBundler> = Arc::from(script::from_config(&root, &env, &config.tools));
    let counts = Arc::new(RwLock::new(RebuildCounts::new()));
    let started_at_unix = unix_seconds_now();

    let (rebuild_tx, rebuild_rx) = mpsc::channel::<RebuildJob>(64);
    let (shutdown_tx, _) = broadcast::channel::<()>(16);
    let (reload_tx, _) = broadcast::channel::<ReloadEvent>(16);

    let watcher_handle = {
        let shutdown = shutdown_tx.clone();
        let root = root.clone();
        let config = config.clone();
        let rebuild_tx = rebuild_tx.clone();
        let reload_tx = reload_tx.clone();
        tokio::spawn(async move {
            let result =
                watcher_task(root, config, rebuild_tx, reload_tx, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let processor_handle = {
        let shutdown = shutdown_tx.clone();
        let root = root.clone();
        let env = env.clone();
        let config = config.clone();
        let transformer = transformer.clone();
        let bundler = bundler.clone();
        let counts = counts.clone();
        tokio::spawn(async move {
            let result = rebuild_processor_task(
                root,
                env,
                config,
                transformer,
                bundler,
                counts,
                rebuild_rx,
                shutdown.subscribe(),
            )
            .await;
            let _ = shutdown.send(());
            result
        })
    };

    let server_handle = {
        let shutdown = shutdown_tx.clone();
        let counts = counts.clone();
        let reload_tx = reload_tx.clone();
        let port = env.port;
        tokio::spawn(async move {
            let result = reload_server_task(
                port,
                counts,
                reload_tx,
                shutdown.clone(),
                shutdown.subscribe(),
                started_at_unix,
            )
            .await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            let mut shutdown_rx = shutdown.subscribe();
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, shutting down watch runtime");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(WatchError::Protocol(format!("ctrl-c handler failed: {err}"))),
                    }
                }
            }
        })
    };

    let (watcher_result, processor_result, server_result, signal_result) = tokio::join!(
        watcher_handle,
        processor_handle,
        server_handle,
        signal_handle
    );

    handle_join("watcher", watcher_result)?;
    handle_join("rebuild_processor", processor_result)?;
    handle_join("reload_server", server_result)?;
    handle_join("signal_handler", signal_result)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Watcher task
// ---------------------------------------------------------------------------

async fn watcher_task(
    root: PathBuf,
    config: Arc<BuildConfig>,
    rebuild_tx: mpsc::Sender<RebuildJob>,
    reload_tx: broadcast::Sender<ReloadEvent>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), WatchError> {
    // Canonicalize so that watcher event paths (which arrive as real paths,
    // e.g. /private/var/... on macOS) match the `starts_with` checks below.
    let mut bindings = watch_bindings(&root, &config);
    for binding in &mut bindings {
        if !binding.dir.exists() {
            fs::create_dir_all(&binding.dir).map_err(|e| io_err(&binding.dir, e))?;
        }
        binding.dir = fs::canonicalize(&binding.dir).unwrap_or_else(|_| binding.dir.clone());
    }

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
    let mut _watcher: RecommendedWatcher = recommended_watcher(move |event| {
        let _ = event_tx.send(event);
    })?;
    for binding in &bindings {
        _watcher.watch(&binding.dir, RecursiveMode::Recursive)?;
        tracing::debug!(path = %binding.dir.display(), stage = %binding.stage, "watching");
    }

    let mut debounce = HashMap::<PathBuf, Instant>::new();

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            event = event_rx.recv() => {
                let Some(event) = event else { break };
                let event = match event {
                    Ok(event) => event,
                    Err(err) => {
                        tracing::warn!(error = %err, "watcher event error");
                        continue;
                    }
                };
                if !is_relevant_event_kind(&event.kind) {
                    continue;
                }

                for path in event.paths {
                    let Some(stage) = stage_for_path(&bindings, &path) else {
                        continue;
                    };
                    if !should_process_event(&mut debounce, &path, Instant::now()) {
                        continue;
                    }

                    match enqueue_rebuild(&rebuild_tx, stage, "watcher").await {
                        Ok(summary) => {
                            tracing::info!(
                                stage = %summary.stage,
                                written = summary.written,
                                failed = summary.failed,
                                duration_ms = summary.duration_ms,
                                "watcher-triggered rebuild completed",
                            );
                            let _ = reload_tx.send(ReloadEvent::for_stage(stage.name()));
                        }
                        Err(err) => {
                            tracing::error!(error = %err, "watcher-triggered rebuild failed");
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Rebuild processor task
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
async fn rebuild_processor_task(
    root: PathBuf,
    env: Arc<Environment>,
    config: Arc<BuildConfig>,
    transformer: Arc<ToolchainStyleTransformer>,
    bundler: Arc<dyn ScriptBundler>,
    counts: Arc<RwLock<RebuildCounts>>,
    mut rebuild_rx: mpsc::Receiver<RebuildJob>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), WatchError> {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            maybe_job = rebuild_rx.recv() => {
                let Some(job) = maybe_job else { break };
                let started = Instant::now();

                let stage = job.stage;
                let source = job.source;
                let root = root.clone();
                let env = env.clone();
                let config = config.clone();
                let transformer = transformer.clone();
                let bundler = bundler.clone();
                let build_result = tokio::task::spawn_blocking(move || {
                    pipeline::run(
                        &root,
                        &env,
                        &config,
                        transformer.as_ref(),
                        bundler.as_ref(),
                        BuildScope::Stage(stage),
                    )
                })
                .await
                .map_err(|err| WatchError::Protocol(format!("rebuild task join error: {err}")))?;

                let outcome = match build_result {
                    Ok(report) => {
                        {
                            let mut counts = counts.write().await;
                            *counts.entry(stage.name().to_string()).or_insert(0) += 1;
                        }
                        let (written, failed) = report
                            .stages
                            .iter()
                            .fold((0, 0), |(w, f), s| (w + s.written(), f + s.failed()));
                        Ok(RebuildSummary {
                            stage: stage.name().to_string(),
                            source: source.to_string(),
                            written,
                            failed,
                            duration_ms: started.elapsed().as_millis(),
                        })
                    }
                    Err(err) => Err(err.to_string()),
                };

                let _ = job.respond_to.send(outcome);
            }
        }
    }

    Ok(())
}

async fn enqueue_rebuild(
    rebuild_tx: &mpsc::Sender<RebuildJob>,
    stage: StageKind,
    source: &'static str,
) -> Result<RebuildSummary, WatchError> {
    let (tx, rx) = oneshot::channel();
    rebuild_tx
        .send(RebuildJob {
            stage,
            source,
            respond_to: tx,
        })
        .await
        .map_err(|_| WatchError::ChannelClosed("rebuild queue"))?;

    let outcome = rx
        .await
        .map_err(|_| WatchError::ChannelClosed("rebuild response"))?;
    outcome.map_err(WatchError::Protocol)
}

// ---------------------------------------------------------------------------
// Reload server task
// ---------------------------------------------------------------------------

async fn reload_server_task(
    port: u16,
    counts: Arc<RwLock<RebuildCounts>>,
    reload_tx: broadcast::Sender<ReloadEvent>,
    shutdown_tx: broadcast::Sender<()>,
    shutdown_rx: broadcast::Receiver<()>,
    started_at_unix: u64,
) -> Result<(), WatchError> {
    let listener = TcpListener::bind(("127.0.0.1", port))
        .await
        .map_err(|e| io_err(format!("127.0.0.1:{port}"), e))?;
    tracing::info!(port, "reload server listening");
    serve(listener, counts, reload_tx, shutdown_tx, shutdown_rx, started_at_unix).await
}

async fn serve(
    listener: TcpListener,
    counts: Arc<RwLock<RebuildCounts>>,
    reload_tx: broadcast::Sender<ReloadEvent>,
    shutdown_tx: broadcast::Sender<()>,
    mut shutdown_rx: broadcast::Receiver<()>,
    started_at_unix: u64,
) -> Result<(), WatchError> {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            accepted = listener.accept() => {
                let (stream, _) = accepted.map_err(|e| io_err("reload listener", e))?;
                let counts = counts.clone();
                let reload_tx = reload_tx.clone();
                let shutdown_tx = shutdown_tx.clone();
                tokio::spawn(async move {
                    if let Err(err) = handle_reload_client(
                        stream,
                        counts,
                        reload_tx,
                        shutdown_tx,
                        started_at_unix,
                    ).await {
                        tracing::error!(error = %err, "reload client error");
                    }
                });
            }
        }
    }
    Ok(())
}

async fn handle_reload_client(
    stream: TcpStream,
    counts: Arc<RwLock<RebuildCounts>>,
    reload_tx: broadcast::Sender<ReloadEvent>,
    shutdown_tx: broadcast::Sender<()>,
    started_at_unix: u64,
) -> Result<(), WatchError> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| io_err("reload socket read", e))?
    {
        if line.trim().is_empty() {
            continue;
        }

        let request: Result<ReloadRequest, _> = serde_json::from_str(&line);
        let request = match request {
            Ok(request) => request,
            Err(err) => {
                write_reply(&mut writer, &ReloadReply::error(format!("invalid request JSON: {err}")))
                    .await?;
                continue;
            }
        };

        match request.cmd.as_str() {
            "status" => {
                let payload = build_status_payload(counts.clone(), started_at_unix).await;
                write_reply(&mut writer, &ReloadReply::ok(payload)).await?;
            }
            "reload" => {
                // Manual trigger: notify every subscriber.
                let notified = reload_tx.send(ReloadEvent::for_stage("manual")).unwrap_or(0);
                write_reply(&mut writer, &ReloadReply::ok(json!({ "notified": notified }))).await?;
            }
            "stop" => {
                let _ = shutdown_tx.send(());
                write_reply(&mut writer, &ReloadReply::ok(json!({ "stopping": true }))).await?;
                break;
            }
            "subscribe" => {
                // Register before acknowledging so no event can slip past.
                let mut events = reload_tx.subscribe();
                let mut shutdown = shutdown_tx.subscribe();
                write_reply(&mut writer, &ReloadReply::ok(json!({ "subscribed": true }))).await?;

                loop {
                    tokio::select! {
                        _ = shutdown.recv() => return Ok(()),
                        event = events.recv() => {
                            let event = match event {
                                Ok(event) => event,
                                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                                    tracing::warn!(skipped, "subscriber lagged; collapsing to one reload");
                                    ReloadEvent::for_stage("lagged")
                                }
                                Err(broadcast::error::RecvError::Closed) => return Ok(()),
                            };
                            if write_event(&mut writer, &event).await.is_err() {
                                // Client went away.
                                return Ok(());
                            }
                        }
                    }
                }
            }
            other => {
                write_reply(&mut writer, &ReloadReply::error(format!("unknown command '{other}'")))
                    .await?;
            }
        }
    }

    Ok(())
}

async fn build_status_payload(counts: Arc<RwLock<RebuildCounts>>, started_at_unix: u64) -> serde_json::Value {
    let snapshot: RebuildCounts = {
        let counts = counts.read().await;
        counts.clone()
    };
    let total: u64 = snapshot.values().copied().sum();
    json!({
        "running": true,
        "started_at_unix": started_at_unix,
        "rebuilds": snapshot,
        "total_rebuilds": total,
    })
}

async fn write_reply(writer: &mut OwnedWriteHalf, reply: &ReloadReply) -> Result<(), WatchError> {
    write_line(writer, &serde_json::to_string(reply)?).await
}

async fn write_event(writer: &mut OwnedWriteHalf, event: &ReloadEvent) -> Result<(), WatchError> {
    write_line(writer, &serde_json::to_string(event)?).await
}

async fn write_line(writer: &mut OwnedWriteHalf, payload: &str) -> Result<(), WatchError> {
    writer
        .write_all(payload.as_bytes())
        .await
        .map_err(|e| io_err("reload socket write", e))?;
    writer
        .write_all(b"\n")
        .await
        .map_err(|e| io_err("reload socket write", e))?;
    writer
        .flush()
        .await
        .map_err(|e| io_err("reload socket flush", e))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn is_relevant_event_kind(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(_) | EventKind::Modify(_))
}

fn stage_for_path(bindings: &[WatchBinding], path: &Path) -> Option<StageKind> {
    bindings
        .iter()
        .find(|binding| path.starts_with(&binding.dir))
        .map(|binding| binding.stage)
}

fn should_process_event(
    debounce: &mut HashMap<PathBuf, Instant>,
    path: &Path,
    now: Instant,
) -> bool {
    should_process_event_with_threshold(debounce, path, now, DEBOUNCE_WINDOW)
}

fn should_process_event_with_threshold(
    debounce: &mut HashMap<PathBuf, Instant>,
    path: &Path,
    now: Instant,
    threshold: Duration,
) -> bool {
    debounce.retain(|_, seen_at| now.duration_since(*seen_at) <= Duration::from_secs(30));
    match debounce.get(path) {
        Some(last_seen) if now.duration_since(*last_seen) < threshold => false,
        _ => {
            debounce.insert(path.to_path_buf(), now);
            true
        }
    }
}

fn handle_join(
    task: &str,
    result: Result<Result<(), WatchError>, tokio::task::JoinError>,
) -> Result<(), WatchError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(WatchError::Protocol(format!("{task} task join failure: {err}"))),
    }
}

fn unix_seconds_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
