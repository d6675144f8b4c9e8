use std::sync::Arc;

use forum_client_core::{ClientConfig, ClientCoreError, ForumRest};
use tokio::sync::{mpsc, oneshot};

use crate::token_store::TokenStore;

pub mod api;
pub mod backend;
pub mod controller;
pub mod reconnect;
pub mod types;

pub use backend::{SessionDeps, SessionOptions};
pub use controller::{SessionCommand, SessionController, ShutdownHandle};
pub use types::{CreateFailure, SessionEvent};

/// Spawn the session task on the current runtime.
pub fn start_session(deps: SessionDeps) -> (SessionController, mpsc::UnboundedReceiver<SessionEvent>, ShutdownHandle) {
	let (cmd_tx, cmd_rx) = mpsc::channel::<SessionCommand>(128);
	let (ui_tx, ui_rx) = mpsc::unbounded_channel::<SessionEvent>();
	let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

	let controller = SessionController::new(cmd_tx);
	let join_handle = tokio::spawn(backend::run_session_task(cmd_rx, ui_tx, shutdown_rx, deps));
	let shutdown = ShutdownHandle::new(shutdown_tx, join_handle);

	(controller, ui_rx, shutdown)
}

/// Dependencies backed by the real REST API and WebSocket rooms.
pub fn live_deps(
	cfg: ClientConfig,
	tokens: Arc<dyn TokenStore>,
	options: SessionOptions,
) -> Result<SessionDeps, ClientCoreError> {
	let rest = ForumRest::new(cfg.clone())?;
	Ok(SessionDeps {
		api: Arc::new(rest),
		connector: Arc::new(api::WsRoomConnector::new(cfg)),
		tokens,
		options,
	})
}
