use tokio::sync::{mpsc, oneshot};

#[derive(Debug)]
pub enum SessionCommand {
	Authenticate,
	Login { username: String, password: String },
	Logout,
	SelectChat { chat: forum_domain::ChatName },
	CreateChat { name: String },
	SendText { text: String },
	RefreshChats,
}

#[derive(Clone)]
pub struct SessionController {
	pub(super) cmd_tx: mpsc::Sender<SessionCommand>,
}

impl SessionController {
	pub fn new(cmd_tx: mpsc::Sender<SessionCommand>) -> Self {
		Self { cmd_tx }
	}

	async fn send(&self, cmd: SessionCommand) -> Result<(), String> {
		self.cmd_tx
			.send(cmd)
			.await
			.map_err(|_| "session task is not running".to_string())
	}

	/// Re-check the stored token.
	pub async fn authenticate(&self) -> Result<(), String> {
		self.send(SessionCommand::Authenticate).await
	}

	pub async fn login(&self, username: impl Into<String>, password: impl Into<String>) -> Result<(), String> {
		self.send(SessionCommand::Login {
			username: username.into(),
			password: password.into(),
		})
		.await
	}

	pub async fn logout(&self) -> Result<(), String> {
		self.send(SessionCommand::Logout).await
	}

	pub async fn select_chat(&self, chat: forum_domain::ChatName) -> Result<(), String> {
		self.send(SessionCommand::SelectChat { chat }).await
	}

	pub async fn create_chat(&self, name: impl Into<String>) -> Result<(), String> {
		self.send(SessionCommand::CreateChat { name: name.into() }).await
	}

	pub async fn send_text(&self, text: impl Into<String>) -> Result<(), String> {
		self.send(SessionCommand::SendText { text: text.into() }).await
	}

	pub async fn refresh_chats(&self) -> Result<(), String> {
		self.send(SessionCommand::RefreshChats).await
	}
}

pub struct ShutdownHandle {
	pub(super) shutdown_tx: oneshot::Sender<()>,
	pub(super) join_handle: tokio::task::JoinHandle<()>,
}

impl ShutdownHandle {
	pub fn new(shutdown_tx: oneshot::Sender<()>, join_handle: tokio::task::JoinHandle<()>) -> Self {
		Self {
			shutdown_tx,
			join_handle,
		}
	}

	pub async fn shutdown(self) {
		let _ = self.shutdown_tx.send(());
		let _ = self.join_handle.await;
	}
}
