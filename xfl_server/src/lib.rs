pub mod adapter;
pub mod bridge;
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod error;
pub mod main_loop;
pub mod memory;
pub mod net;
pub mod procedures;
pub mod protocol;
pub mod resolver;
pub mod xfl_api;

pub use crate::bridge::Bridge;
pub use crate::client::RpcClient;
pub use crate::config::ServerConfig;
pub use crate::dispatcher::{Args, Dispatcher};
pub use crate::error::{CallError, ServerError};
pub use crate::main_loop::OwnerLoop;
pub use crate::memory::MemoryXfl;
pub use crate::net::{Server, StopHandle};
pub use crate::protocol::INBOUND_CAP;
pub use crate::xfl_api::XflApi;

use std::sync::Arc;

/// Binds a server with every procedure registered and starts accepting.
///
/// The returned [`OwnerLoop`] must be driven on the thread that owns the
/// application state, or no call ever completes.
pub fn start(config: ServerConfig) -> Result<(Server, OwnerLoop), ServerError> {
    let (bridge, owner) = Bridge::channel(config.queue_capacity);
    let dispatcher = Arc::new(Dispatcher::new());
    let server = Server::bind(config, Arc::clone(&dispatcher), bridge.clone())?;
    procedures::register_all(&dispatcher, &bridge, server.stop_handle());
    server.serve()?;
    Ok((server, owner))
}
