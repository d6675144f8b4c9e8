use std::sync::Arc;
use std::time::Duration;

use forum_client_core::{AccessToken, ClientCoreError, SocketEnd};
use forum_domain::{AuthState, ChatName, ChatStatus, OutgoingText, ServerFrame, UserProfile};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::api::{BoxedRoomSocket, ForumApi, RoomConnector};
use super::controller::SessionCommand;
use super::reconnect::{bump_attempt, schedule_reconnect};
use super::types::{CreateFailure, SessionEvent};
use crate::token_store::TokenStore;

const SOCKET_OUTGOING_CAPACITY: usize = 64;
const SOCKET_CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Timing and defaults for one session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
	pub default_chat: ChatName,
	pub chat_list_poll: Duration,
	pub readiness_poll: Duration,
}

impl Default for SessionOptions {
	fn default() -> Self {
		Self {
			default_chat: ChatName::default_room(),
			chat_list_poll: Duration::from_secs(5),
			readiness_poll: Duration::from_secs(1),
		}
	}
}

/// Everything the session task talks to.
#[derive(Clone)]
pub struct SessionDeps {
	pub api: Arc<dyn ForumApi>,
	pub connector: Arc<dyn RoomConnector>,
	pub tokens: Arc<dyn TokenStore>,
	pub options: SessionOptions,
}

/// Results of work spawned by the session task.
///
/// `epoch` changes whenever the signed-in identity may have changed; `generation` changes
/// whenever the room state is reset. Results carrying an old value are dropped.
enum Internal {
	AuthChecked {
		epoch: u64,
		result: Result<UserProfile, ClientCoreError>,
	},
	LoggedIn {
		epoch: u64,
		result: Result<AccessToken, ClientCoreError>,
	},
	ChatsFetched {
		epoch: u64,
		result: Result<Vec<ChatName>, ClientCoreError>,
	},
	Created {
		epoch: u64,
		chat: ChatName,
		result: Result<String, ClientCoreError>,
	},
	StatusChecked {
		generation: u64,
		chat: ChatName,
		result: Result<ChatStatus, ClientCoreError>,
	},
	SocketOpened {
		generation: u64,
		result: Result<BoxedRoomSocket, ClientCoreError>,
	},
	Frame {
		generation: u64,
		frame: ServerFrame,
	},
	SocketEnded {
		generation: u64,
		result: Result<SocketEnd, ClientCoreError>,
	},
}

struct SocketHandle {
	outgoing: mpsc::Sender<String>,
	task: tokio::task::JoinHandle<()>,
}

struct SessionState {
	api: Arc<dyn ForumApi>,
	connector: Arc<dyn RoomConnector>,
	tokens: Arc<dyn TokenStore>,
	options: SessionOptions,
	ui_tx: mpsc::UnboundedSender<SessionEvent>,
	internal_tx: mpsc::UnboundedSender<Internal>,

	epoch: u64,
	token: Option<AccessToken>,
	auth: AuthState,
	user: Option<UserProfile>,
	chats_in_flight: bool,

	chat: ChatName,
	generation: u64,
	ready: bool,
	readiness_deadline: Option<Instant>,
	socket: Option<SocketHandle>,
	socket_pending: bool,

	reconnect_attempt: u32,
	reconnect_deadline: Option<Instant>,
	last_connected: Option<Instant>,
}

pub async fn run_session_task(
	mut cmd_rx: mpsc::Receiver<SessionCommand>,
	ui_tx: mpsc::UnboundedSender<SessionEvent>,
	mut shutdown_rx: oneshot::Receiver<()>,
	deps: SessionDeps,
) {
	let (internal_tx, mut internal_rx) = mpsc::unbounded_channel::<Internal>();

	let mut chat_list_tick = tokio::time::interval(deps.options.chat_list_poll);
	chat_list_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

	let mut st = SessionState::new(deps, ui_tx, internal_tx);

	loop {
		let poll_chats = st.auth.is_active();
		let readiness_at = st.readiness_deadline;
		let reconnect_at = st.reconnect_deadline;

		tokio::select! {
			_ = &mut shutdown_rx => {
				st.shutdown("shutdown").await;
				break;
			}

			cmd = cmd_rx.recv() => {
				let Some(cmd) = cmd else {
					st.shutdown("controller dropped").await;
					break;
				};
				st.on_command(cmd);
			}

			Some(msg) = internal_rx.recv() => st.on_internal(msg),

			_ = chat_list_tick.tick(), if poll_chats => st.spawn_list_chats(),

			_ = sleep_until_opt(readiness_at), if readiness_at.is_some() => st.on_readiness_due(),

			_ = sleep_until_opt(reconnect_at), if reconnect_at.is_some() => st.on_reconnect_due(),
		}
	}
}

async fn sleep_until_opt(deadline: Option<Instant>) {
	match deadline {
		Some(deadline) => tokio::time::sleep_until(deadline).await,
		None => std::future::pending().await,
	}
}

impl SessionState {
	fn new(
		deps: SessionDeps,
		ui_tx: mpsc::UnboundedSender<SessionEvent>,
		internal_tx: mpsc::UnboundedSender<Internal>,
	) -> Self {
		let chat = deps.options.default_chat.clone();
		Self {
			api: deps.api,
			connector: deps.connector,
			tokens: deps.tokens,
			options: deps.options,
			ui_tx,
			internal_tx,
			epoch: 0,
			token: None,
			auth: AuthState::Loading,
			user: None,
			chats_in_flight: false,
			chat,
			generation: 0,
			ready: false,
			readiness_deadline: None,
			socket: None,
			socket_pending: false,
			reconnect_attempt: 0,
			reconnect_deadline: None,
			last_connected: None,
		}
	}

	fn emit(&self, ev: SessionEvent) {
		if let Err(e) = self.ui_tx.send(ev) {
			debug!(event = ?e.0, "session event dropped; receiver gone");
		}
	}

	fn on_command(&mut self, cmd: SessionCommand) {
		match cmd {
			SessionCommand::Authenticate => self.authenticate(),
			SessionCommand::Login { username, password } => self.login(username, password),
			SessionCommand::Logout => {
				info!(user = ?self.user.as_ref().map(|u| u.username.as_str()), "signing out");
				self.sign_out("logout");
			}
			SessionCommand::SelectChat { chat } => self.select_chat(chat),
			SessionCommand::CreateChat { name } => self.create_chat(&name),
			SessionCommand::SendText { text } => self.send_text(&text),
			SessionCommand::RefreshChats => {
				if self.auth.is_active() {
					self.spawn_list_chats();
				} else {
					debug!(auth = %self.auth, "chat refresh ignored; not signed in");
				}
			}
		}
	}

	fn on_internal(&mut self, msg: Internal) {
		match msg {
			Internal::AuthChecked { epoch, result } => {
				if epoch != self.epoch {
					debug!(epoch, current = self.epoch, "stale auth check dropped");
					return;
				}
				self.on_auth_checked(result);
			}
			Internal::LoggedIn { epoch, result } => {
				if epoch != self.epoch {
					debug!(epoch, current = self.epoch, "stale login result dropped");
					return;
				}
				self.on_logged_in(result);
			}
			Internal::ChatsFetched { epoch, result } => {
				self.chats_in_flight = false;
				if epoch != self.epoch {
					return;
				}
				match result {
					Ok(chats) => self.emit(SessionEvent::ChatList { chats }),
					Err(e) if e.is_unauthorized() => self.handle_unauthorized(),
					Err(e) => warn!(error = %e, "chat list refresh failed"),
				}
			}
			Internal::Created { epoch, chat, result } => {
				if epoch != self.epoch {
					return;
				}
				self.on_created(chat, result);
			}
			Internal::StatusChecked {
				generation,
				chat,
				result,
			} => {
				if generation != self.generation {
					debug!(%chat, generation, current = self.generation, "stale readiness result dropped");
					return;
				}
				self.on_status_checked(chat, result);
			}
			Internal::SocketOpened { generation, result } => {
				if generation != self.generation {
					debug!(generation, current = self.generation, "stale room socket dropped");
					return;
				}
				self.socket_pending = false;
				self.on_socket_opened(result);
			}
			Internal::Frame { generation, frame } => {
				if generation != self.generation {
					return;
				}
				self.on_frame(frame);
			}
			Internal::SocketEnded { generation, result } => {
				if generation != self.generation {
					debug!(generation, current = self.generation, "previous room socket finished");
					return;
				}
				self.on_socket_ended(result);
			}
		}
	}

	fn authenticate(&mut self) {
		self.epoch += 1;
		self.chats_in_flight = false;
		self.reset_room("re-authenticating");

		let token = self.token.clone().or_else(|| self.tokens.load());
		let Some(token) = token else {
			info!("no stored token");
			self.set_auth(AuthState::Unauthenticated, None);
			return;
		};

		self.token = Some(token.clone());
		self.auth = AuthState::Loading;
		self.emit(SessionEvent::AuthChanged {
			state: AuthState::Loading,
			user: None,
		});

		let api = Arc::clone(&self.api);
		let tx = self.internal_tx.clone();
		let epoch = self.epoch;
		tokio::spawn(async move {
			let result = api.me(&token).await;
			let _ = tx.send(Internal::AuthChecked { epoch, result });
		});
	}

	fn on_auth_checked(&mut self, result: Result<UserProfile, ClientCoreError>) {
		match result {
			Ok(profile) => {
				let state = if profile.is_active {
					AuthState::Active
				} else {
					AuthState::Locked
				};
				info!(username = %profile.username, %state, "authenticated");
				self.set_auth(state, Some(profile));
			}
			Err(e) if e.is_unauthorized() => self.handle_unauthorized(),
			Err(ClientCoreError::Rejected { status, detail }) => {
				info!(status, detail = ?detail, "profile request refused; account is locked");
				self.set_auth(AuthState::Locked, None);
			}
			Err(e) => {
				warn!(error = %e, "auth check failed; treating as signed out");
				self.set_auth(AuthState::Unauthenticated, None);
			}
		}
	}

	fn set_auth(&mut self, state: AuthState, user: Option<UserProfile>) {
		self.auth = state;
		self.user = user.clone();
		self.emit(SessionEvent::AuthChanged { state, user });

		if state.is_active() {
			self.spawn_list_chats();
			self.begin_readiness();
		}
	}

	fn login(&mut self, username: String, password: String) {
		let api = Arc::clone(&self.api);
		let tx = self.internal_tx.clone();
		let epoch = self.epoch;
		tokio::spawn(async move {
			let result = api.login(&username, &password).await;
			let _ = tx.send(Internal::LoggedIn { epoch, result });
		});
	}

	fn on_logged_in(&mut self, result: Result<AccessToken, ClientCoreError>) {
		match result {
			Ok(token) => {
				if let Err(e) = self.tokens.store(&token) {
					warn!(error = %e, "failed to persist token; keeping it for this session only");
				}
				self.token = Some(token);
				self.authenticate();
			}
			Err(e) => {
				let reason = e.detail().map(str::to_string).unwrap_or_else(|| e.to_string());
				warn!(%reason, "login failed");
				self.emit(SessionEvent::LoginFailed { reason });
			}
		}
	}

	fn handle_unauthorized(&mut self) {
		warn!("token rejected by server; signing out");
		self.sign_out("unauthorized");
	}

	fn sign_out(&mut self, reason: &str) {
		self.epoch += 1;
		self.chats_in_flight = false;
		if let Err(e) = self.tokens.clear() {
			warn!(error = %e, "failed to clear stored token");
		}
		self.token = None;
		self.reset_room(reason);
		self.set_auth(AuthState::Unauthenticated, None);
	}

	/// Forget readiness, drop the socket and invalidate every in-flight room result.
	///
	/// Deliberate closes are not reported as `Disconnected`.
	fn reset_room(&mut self, reason: &str) {
		self.generation += 1;
		self.ready = false;
		self.readiness_deadline = None;
		self.socket_pending = false;
		self.reconnect_deadline = None;
		self.reconnect_attempt = 0;

		if let Some(handle) = self.socket.take() {
			debug!(chat = %self.chat, %reason, "closing room socket");
			drop(handle.outgoing);
		}
	}

	fn select_chat(&mut self, chat: ChatName) {
		if chat == self.chat {
			debug!(%chat, "chat already selected");
			return;
		}

		info!(from = %self.chat, to = %chat, "switching room");
		self.reset_room("room change");
		self.chat = chat.clone();
		self.emit(SessionEvent::ChatSelected { chat });

		if self.auth.is_active() {
			self.begin_readiness();
		}
	}

	fn begin_readiness(&mut self) {
		self.ready = false;
		self.readiness_deadline = Some(Instant::now());
	}

	fn on_readiness_due(&mut self) {
		self.readiness_deadline = None;
		if !self.auth.is_active() {
			return;
		}
		let Some(token) = self.token.clone() else {
			return;
		};

		let api = Arc::clone(&self.api);
		let tx = self.internal_tx.clone();
		let generation = self.generation;
		let chat = self.chat.clone();
		tokio::spawn(async move {
			let result = api.chat_status(&token, &chat).await;
			let _ = tx.send(Internal::StatusChecked {
				generation,
				chat,
				result,
			});
		});
	}

	fn on_status_checked(&mut self, chat: ChatName, result: Result<ChatStatus, ClientCoreError>) {
		match result {
			Ok(status) => {
				let ready = status.is_ready();
				debug!(%chat, %status, "room status");
				self.emit(SessionEvent::ChatStatus { chat, status });
				if ready {
					self.ready = true;
					self.open_socket();
				} else {
					self.readiness_deadline = Some(Instant::now() + self.options.readiness_poll);
				}
			}
			Err(e) if e.is_unauthorized() => self.handle_unauthorized(),
			Err(e) => {
				warn!(%chat, error = %e, "room status check failed; retrying");
				self.readiness_deadline = Some(Instant::now() + self.options.readiness_poll);
			}
		}
	}

	fn open_socket(&mut self) {
		if !self.auth.is_active() || self.user.is_none() || !self.ready {
			return;
		}
		if self.socket.is_some() || self.socket_pending {
			return;
		}
		let Some(token) = self.token.clone() else {
			return;
		};

		self.socket_pending = true;
		self.emit(SessionEvent::Connecting {
			chat: self.chat.clone(),
		});

		let connector = Arc::clone(&self.connector);
		let tx = self.internal_tx.clone();
		let generation = self.generation;
		let chat = self.chat.clone();
		tokio::spawn(async move {
			let result = connector.connect(&chat, &token).await;
			let _ = tx.send(Internal::SocketOpened { generation, result });
		});
	}

	fn on_socket_opened(&mut self, result: Result<BoxedRoomSocket, ClientCoreError>) {
		match result {
			Ok(socket) => {
				let (out_tx, out_rx) = mpsc::channel::<String>(SOCKET_OUTGOING_CAPACITY);
				let generation = self.generation;
				let frames_tx = self.internal_tx.clone();
				let end_tx = self.internal_tx.clone();

				let task = tokio::spawn(async move {
					let result = socket
						.run_frames_loop(
							out_rx,
							Box::new(move |frame| {
								let _ = frames_tx.send(Internal::Frame { generation, frame });
							}),
						)
						.await;
					let _ = end_tx.send(Internal::SocketEnded { generation, result });
				});

				self.socket = Some(SocketHandle { outgoing: out_tx, task });
				self.last_connected = Some(Instant::now());
				info!(chat = %self.chat, "room connected");
				self.emit(SessionEvent::Connected {
					chat: self.chat.clone(),
				});
			}
			Err(e) if e.is_unauthorized() => self.handle_unauthorized(),
			Err(e) => {
				warn!(chat = %self.chat, error = %e, "room connect failed");
				self.emit(SessionEvent::Error {
					message: format!("connect failed: {e}"),
				});
				self.schedule_reconnect();
			}
		}
	}

	fn on_frame(&mut self, frame: ServerFrame) {
		let chat = self.chat.clone();
		match frame {
			ServerFrame::History { messages } => self.emit(SessionEvent::History { chat, messages }),
			ServerFrame::Message(message) => self.emit(SessionEvent::Message { chat, message }),
			ServerFrame::System { message } => self.emit(SessionEvent::System { chat, message }),
			ServerFrame::Unknown => debug!(%chat, "ignoring unknown frame"),
		}
	}

	fn on_socket_ended(&mut self, result: Result<SocketEnd, ClientCoreError>) {
		self.socket = None;
		let chat = self.chat.clone();

		match result {
			Ok(SocketEnd::ClosedByClient) => debug!(%chat, "room socket closed locally"),
			Ok(SocketEnd::ClosedByServer { reason }) => {
				info!(%chat, %reason, "room socket closed by server");
				self.emit(SessionEvent::Disconnected { chat, reason });
				self.schedule_reconnect();
			}
			Err(e) if e.is_unauthorized() => self.handle_unauthorized(),
			Err(e) => {
				warn!(%chat, error = %e, "room socket failed");
				self.emit(SessionEvent::Disconnected {
					chat,
					reason: e.to_string(),
				});
				self.schedule_reconnect();
			}
		}
	}

	fn schedule_reconnect(&mut self) {
		if !self.auth.is_active() {
			return;
		}

		let attempt = bump_attempt(self.reconnect_attempt, self.last_connected.take());
		self.reconnect_attempt = attempt;
		let (deadline, next_retry_in_ms) = schedule_reconnect(attempt);
		self.reconnect_deadline = Some(deadline);
		info!(chat = %self.chat, attempt, next_retry_in_ms, "scheduling room reconnect");
		self.emit(SessionEvent::Reconnecting {
			attempt,
			next_retry_in_ms,
		});
	}

	fn on_reconnect_due(&mut self) {
		self.reconnect_deadline = None;
		if self.auth.is_active() {
			self.begin_readiness();
		}
	}

	fn send_text(&mut self, text: &str) {
		let Some(text) = OutgoingText::new(text) else {
			return;
		};

		let Some(handle) = self.socket.as_ref() else {
			self.emit(SessionEvent::NotConnected);
			return;
		};

		match handle.outgoing.try_send(text.into_string()) {
			Ok(()) => debug!(chat = %self.chat, "queued chat line"),
			Err(TrySendError::Full(_)) => self.emit(SessionEvent::Error {
				message: "send queue full".to_string(),
			}),
			Err(TrySendError::Closed(_)) => self.emit(SessionEvent::NotConnected),
		}
	}

	fn create_chat(&mut self, name: &str) {
		let name = name.trim();
		if name.is_empty() {
			return;
		}

		let chat = match ChatName::new(name) {
			Ok(chat) => chat,
			Err(e) => {
				self.emit(SessionEvent::CreateFailed {
					name: name.to_string(),
					reason: CreateFailure::InvalidName(e.to_string()),
				});
				return;
			}
		};

		let token = match (&self.token, self.auth.is_active()) {
			(Some(token), true) => token.clone(),
			_ => {
				self.emit(SessionEvent::CreateFailed {
					name: name.to_string(),
					reason: CreateFailure::NotSignedIn,
				});
				return;
			}
		};

		info!(%chat, "creating room");
		self.emit(SessionEvent::CreateStarted { chat: chat.clone() });

		let api = Arc::clone(&self.api);
		let tx = self.internal_tx.clone();
		let epoch = self.epoch;
		tokio::spawn(async move {
			let result = api.create_chat(&token, &chat).await;
			let _ = tx.send(Internal::Created { epoch, chat, result });
		});
	}

	fn on_created(&mut self, chat: ChatName, result: Result<String, ClientCoreError>) {
		match result {
			Ok(message) => {
				info!(%chat, "room created");
				self.emit(SessionEvent::CreateSucceeded { chat, message });
				self.spawn_list_chats();
			}
			Err(e) if e.is_unauthorized() => {
				self.emit(SessionEvent::CreateFailed {
					name: chat.into_string(),
					reason: CreateFailure::NotSignedIn,
				});
				self.handle_unauthorized();
			}
			Err(e) => {
				warn!(%chat, error = %e, "room creation failed");
				let reason = if e.is_transport() {
					CreateFailure::Connection
				} else {
					CreateFailure::Rejected(e.detail().map(str::to_string))
				};
				self.emit(SessionEvent::CreateFailed {
					name: chat.into_string(),
					reason,
				});
			}
		}
	}

	fn spawn_list_chats(&mut self) {
		if self.chats_in_flight {
			return;
		}
		let Some(token) = self.token.clone() else {
			return;
		};

		self.chats_in_flight = true;
		let api = Arc::clone(&self.api);
		let tx = self.internal_tx.clone();
		let epoch = self.epoch;
		tokio::spawn(async move {
			let result = api.list_chats(&token).await;
			let _ = tx.send(Internal::ChatsFetched { epoch, result });
		});
	}

	async fn shutdown(&mut self, reason: &str) {
		info!(%reason, "session task stopping");
		self.generation += 1;
		if let Some(handle) = self.socket.take() {
			drop(handle.outgoing);
			if tokio::time::timeout(SOCKET_CLOSE_GRACE, handle.task).await.is_err() {
				debug!("room socket did not close in time");
			}
		}
		self.emit(SessionEvent::Disconnected {
			chat: self.chat.clone(),
			reason: reason.to_string(),
		});
	}
}
