//! Script bundling seam — the two bundler strategies.
//!
//! Both strategies make the resolved environment statically visible to
//! bundled code (the bundler child sees `NODE_ENV` / `ASSET_HOST` / `PORT`)
//! and downlevel syntax; how minification and reuse happen differs:
//!
//! - [`CachedBundler`] — one external invocation per entry
//!   (`<command> <entry>`, plus `--minify --map <path>` in production),
//!   gated by the digest cache in [`crate::cache`]. Emits a source map in
//!   production.
//! - [`WorkerBundler`] — a long-lived worker process spawned once; each
//!   entry is a JSON-lines request over the worker's stdio. Production
//!   minification is a separate post-bundle pass; no source map.

use std::ffi::OsStr;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::Mutex;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use conveyor_core::{Environment, Mode, ToolConfig};

use crate::cache::{self, CachedBundle};
use crate::error::{io_err, BundleError};
use crate::tool::Tool;

// ---------------------------------------------------------------------------
// Trait and output
// ---------------------------------------------------------------------------

/// Output of bundling one script entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptBundle {
    pub code: String,
    /// Present only for the incremental strategy in production mode.
    pub source_map: Option<String>,
}

/// Bundles one script entry into deployable form.
pub trait ScriptBundler: Send + Sync {
    fn bundle(&self, entry: &Path) -> Result<ScriptBundle, BundleError>;
}

/// Construct the strategy selected in the build config.
pub fn from_config(
    root: &Path,
    env: &Environment,
    tools: &ToolConfig,
) -> Box<dyn ScriptBundler> {
    match tools.bundler {
        conveyor_core::BundlerChoice::Incremental => {
            Box::new(CachedBundler::new(root, env.clone(), tools))
        }
        conveyor_core::BundlerChoice::Persistent => {
            Box::new(WorkerBundler::new(env.clone(), tools))
        }
    }
}

/// Environment made statically visible to bundled code.
fn child_envs(env: &Environment) -> Vec<(&'static str, String)> {
    let mut envs = vec![
        ("NODE_ENV", env.mode.to_string()),
        ("PORT", env.port.to_string()),
    ];
    if let Some(host) = &env.asset_host {
        envs.push(("ASSET_HOST", host.clone()));
    }
    envs
}

// ---------------------------------------------------------------------------
// Source-tree digest
// ---------------------------------------------------------------------------

/// Digest of the entry plus every file under its directory, so edits to
/// imported siblings bust the cache even though the external bundler resolves
/// imports invisibly to us. The mode participates because production and
/// development outputs differ.
fn tree_digest(entry: &Path, mode: Mode) -> Result<String, BundleError> {
    let mut files = Vec::new();
    match entry.parent() {
        Some(dir) if dir.is_dir() => collect_files(dir, &mut files)?,
        _ => files.push(entry.to_path_buf()),
    }
    files.sort();

    let mut hasher = Sha256::new();
    hasher.update(mode.to_string().as_bytes());
    for file in &files {
        let contents = std::fs::read(file).map_err(|e| io_err(file, e))?;
        hasher.update(file.to_string_lossy().as_bytes());
        hasher.update([0]);
        hasher.update(&contents);
        hasher.update([0]);
    }
    Ok(hex::encode(hasher.finalize()))
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), BundleError> {
    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        let meta = entry.metadata().map_err(|e| io_err(&path, e))?;
        if meta.is_dir() {
            collect_files(&path, out)?;
        } else if meta.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// CachedBundler — incremental strategy
// ---------------------------------------------------------------------------

/// Digest-gated external bundler. The cache file lives at
/// `<root>/tmp/bundle-cache.json`; a hit skips spawning entirely.
pub struct CachedBundler {
    tool: Tool,
    env: Environment,
    cache_path: PathBuf,
    map_scratch: PathBuf,
}

impl CachedBundler {
    pub fn new(root: &Path, env: Environment, tools: &ToolConfig) -> Self {
        CachedBundler {
            tool: Tool::from_command(&tools.bundle_command),
            env,
            cache_path: conveyor_core::paths::bundle_cache_path(root),
            map_scratch: root.join("tmp").join("map.json"),
        }
    }

    fn invoke(&self, entry: &Path) -> Result<ScriptBundle, BundleError> {
        let envs = child_envs(&self.env);
        let mut args: Vec<&OsStr> = vec![entry.as_os_str()];
        let minify: [&OsStr; 3];
        if self.env.mode.is_production() {
            if let Some(dir) = self.map_scratch.parent() {
                std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
            }
            minify = [
                OsStr::new("--minify"),
                OsStr::new("--map"),
                self.map_scratch.as_os_str(),
            ];
            args.extend_from_slice(&minify);
        }

        let stdout = self.tool.capture(&args, &envs)?;
        let code = String::from_utf8(stdout).map_err(|_| BundleError::NonUtf8Output {
            program: self.tool.program().to_string(),
        })?;

        let source_map = if self.env.mode.is_production() && self.map_scratch.exists() {
            let map = std::fs::read_to_string(&self.map_scratch)
                .map_err(|e| io_err(&self.map_scratch, e))?;
            let _ = std::fs::remove_file(&self.map_scratch);
            Some(map)
        } else {
            None
        };

        Ok(ScriptBundle { code, source_map })
    }
}

impl ScriptBundler for CachedBundler {
    fn bundle(&self, entry: &Path) -> Result<ScriptBundle, BundleError> {
        let digest = tree_digest(entry, self.env.mode)?;
        let key = entry.to_string_lossy().to_string();

        let mut store = cache::load(&self.cache_path)?;
        if let Some(cached) = store.entries.get(&key) {
            if cached.digest == digest {
                log::debug!("bundle cache hit: {}", entry.display());
                return Ok(ScriptBundle {
                    code: cached.code.clone(),
                    source_map: cached.source_map.clone(),
                });
            }
        }

        let bundle = self.invoke(entry)?;
        store.entries.insert(
            key,
            CachedBundle {
                digest,
                code: bundle.code.clone(),
                source_map: bundle.source_map.clone(),
            },
        );
        store.updated_at = Utc::now();
        cache::save(&self.cache_path, &store)?;
        Ok(bundle)
    }
}

// ---------------------------------------------------------------------------
// WorkerBundler — persistent strategy
// ---------------------------------------------------------------------------

/// JSON newline-delimited request to the worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkerRequest {
    cmd: String,
    entry: String,
    mode: String,
}

/// JSON newline-delimited reply from the worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkerReply {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

struct WorkerProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl WorkerProcess {
    fn round_trip(&mut self, request: &WorkerRequest) -> Result<WorkerReply, BundleError> {
        let payload = serde_json::to_string(request)?;
        self.stdin
            .write_all(payload.as_bytes())
            .and_then(|()| self.stdin.write_all(b"\n"))
            .and_then(|()| self.stdin.flush())
            .map_err(|e| BundleError::Protocol(format!("write to worker failed: {e}")))?;

        let mut line = String::new();
        let read = self
            .stdout
            .read_line(&mut line)
            .map_err(|e| BundleError::Protocol(format!("read from worker failed: {e}")))?;
        if read == 0 {
            return Err(BundleError::Protocol(
                "worker closed connection before replying".to_string(),
            ));
        }
        Ok(serde_json::from_str(line.trim_end())?)
    }
}

/// Persistent worker-process bundler. The worker is spawned on first use and
/// reused for every subsequent entry; losing it (crash, closed pipes) drops
/// the handle so the next call respawns.
pub struct WorkerBundler {
    command: Vec<String>,
    minifier: Tool,
    env: Environment,
    worker: Mutex<Option<WorkerProcess>>,
}

impl WorkerBundler {
    pub fn new(env: Environment, tools: &ToolConfig) -> Self {
        WorkerBundler {
            command: tools.worker_command.clone(),
            minifier: Tool::from_command(&tools.script_minifier),
            env,
            worker: Mutex::new(None),
        }
    }

    fn spawn_worker(&self) -> Result<WorkerProcess, BundleError> {
        let program = &self.command[0];
        let mut child = Command::new(program)
            .args(&self.command[1..])
            .envs(child_envs(&self.env).iter().map(|(k, v)| (*k, v.as_str())))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| BundleError::Spawn {
                program: program.clone(),
                source,
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BundleError::Protocol("worker has no stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .map(BufReader::new)
            .ok_or_else(|| BundleError::Protocol("worker has no stdout".to_string()))?;

        log::info!("spawned bundler worker: {program}");
        Ok(WorkerProcess { child, stdin, stdout })
    }
}

impl ScriptBundler for WorkerBundler {
    fn bundle(&self, entry: &Path) -> Result<ScriptBundle, BundleError> {
        let request = WorkerRequest {
            cmd: "bundle".to_string(),
            entry: entry.to_string_lossy().to_string(),
            mode: self.env.mode.to_string(),
        };

        let mut slot = self
            .worker
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if slot.is_none() {
            *slot = Some(self.spawn_worker()?);
        }
        let Some(worker) = slot.as_mut() else {
            return Err(BundleError::Protocol("worker unavailable".to_string()));
        };

        let reply = match worker.round_trip(&request) {
            Ok(reply) => reply,
            Err(err) => {
                // Worker is unusable; drop it so the next call respawns.
                *slot = None;
                return Err(err);
            }
        };

        if !reply.ok {
            return Err(BundleError::Protocol(
                reply.error.unwrap_or_else(|| "unknown worker error".to_string()),
            ));
        }
        let code = reply
            .code
            .ok_or_else(|| BundleError::Protocol("worker reply missing code".to_string()))?;
        drop(slot);

        let code = if self.env.mode.is_production() {
            let minified = self.minifier.filter(code.as_bytes(), None)?;
            String::from_utf8(minified).map_err(|_| BundleError::NonUtf8Output {
                program: self.minifier.program().to_string(),
            })?
        } else {
            code
        };

        Ok(ScriptBundle {
            code,
            source_map: None,
        })
    }
}

impl Drop for WorkerBundler {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.worker.lock() {
            if let Some(mut worker) = slot.take() {
                let _ = worker.child.kill();
                let _ = worker.child.wait();
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
