//! `conveyor watch` — development loop lifecycle.

use anyhow::{Context, Result};
use clap::Subcommand;

use conveyor_core::Environment;
use conveyor_watch::{request_reload, request_status, request_stop, WatchError};

#[derive(Subcommand, Debug)]
pub enum WatchCommand {
    /// Run the watch runtime in the foreground (watcher + reload server).
    Start,
    /// Query runtime status over the reload port.
    Status,
    /// Ask the runtime to notify every connected live-reload client.
    Reload,
    /// Request graceful runtime shutdown.
    Stop,
}

pub fn run(command: WatchCommand) -> Result<()> {
    let root = std::env::current_dir().context("could not determine current directory")?;
    let port = Environment::from_env().port;

    match command {
        WatchCommand::Start => {
            conveyor_watch::start_blocking(&root).context("watch runtime exited with error")?;
        }
        WatchCommand::Status => match request_status(port) {
            Ok(status) => {
                println!("{}", serde_json::to_string_pretty(&status)?);
            }
            Err(WatchError::ServerNotRunning { .. }) => {
                println!("watch runtime is not running on port {port}");
            }
            Err(err) => return Err(err).context("failed to query watch status"),
        },
        WatchCommand::Reload => match request_reload(port) {
            Ok(()) => println!("reload notification sent"),
            Err(WatchError::ServerNotRunning { .. }) => {
                println!("watch runtime is not running on port {port}");
            }
            Err(err) => return Err(err).context("failed to trigger reload"),
        },
        WatchCommand::Stop => match request_stop(port) {
            Ok(()) => println!("watch runtime stop requested"),
            Err(WatchError::ServerNotRunning { .. }) => {
                println!("watch runtime is not running on port {port}");
            }
            Err(err) => return Err(err).context("failed to stop watch runtime"),
        },
    }

    Ok(())
}
