//! Watch runtime: filesystem watcher + rebuild processor + live-reload server.

mod error;
pub mod paths;
pub mod reload;
mod runtime;

pub use error::WatchError;
pub use reload::{
    request_reload, request_status, request_stop, send_request, subscribe, ReloadEvent,
    ReloadReply, ReloadRequest, Subscription,
};
pub use runtime::{run, start_blocking, RebuildCounts, RebuildSummary};
