use std::future::Future;
use std::pin::Pin;

use forum_client_core::{AccessToken, ClientConfig, ClientCoreError, ForumRest, RoomSocket, SocketEnd};
use forum_domain::{ChatName, ChatStatus, ServerFrame, UserProfile};
use tokio::sync::mpsc;

pub type BoxedRoomSocket = Box<dyn RoomSocketApi>;

/// REST calls the session task makes.
pub trait ForumApi: Send + Sync {
	fn login<'a>(
		&'a self,
		username: &'a str,
		password: &'a str,
	) -> Pin<Box<dyn Future<Output = Result<AccessToken, ClientCoreError>> + Send + 'a>>;

	fn me<'a>(
		&'a self,
		token: &'a AccessToken,
	) -> Pin<Box<dyn Future<Output = Result<UserProfile, ClientCoreError>> + Send + 'a>>;

	fn list_chats<'a>(
		&'a self,
		token: &'a AccessToken,
	) -> Pin<Box<dyn Future<Output = Result<Vec<ChatName>, ClientCoreError>> + Send + 'a>>;

	fn chat_status<'a>(
		&'a self,
		token: &'a AccessToken,
		chat: &'a ChatName,
	) -> Pin<Box<dyn Future<Output = Result<ChatStatus, ClientCoreError>> + Send + 'a>>;

	fn create_chat<'a>(
		&'a self,
		token: &'a AccessToken,
		chat: &'a ChatName,
	) -> Pin<Box<dyn Future<Output = Result<String, ClientCoreError>> + Send + 'a>>;
}

/// Opens authenticated room sockets.
pub trait RoomConnector: Send + Sync {
	fn connect<'a>(
		&'a self,
		chat: &'a ChatName,
		token: &'a AccessToken,
	) -> Pin<Box<dyn Future<Output = Result<BoxedRoomSocket, ClientCoreError>> + Send + 'a>>;
}

pub trait RoomSocketApi: Send {
	fn run_frames_loop(
		self: Box<Self>,
		outgoing: mpsc::Receiver<String>,
		on_frame: Box<dyn FnMut(ServerFrame) + Send>,
	) -> Pin<Box<dyn Future<Output = Result<SocketEnd, ClientCoreError>> + Send>>;
}

impl ForumApi for ForumRest {
	fn login<'a>(
		&'a self,
		username: &'a str,
		password: &'a str,
	) -> Pin<Box<dyn Future<Output = Result<AccessToken, ClientCoreError>> + Send + 'a>> {
		Box::pin(async move { ForumRest::login(self, username, password).await })
	}

	fn me<'a>(
		&'a self,
		token: &'a AccessToken,
	) -> Pin<Box<dyn Future<Output = Result<UserProfile, ClientCoreError>> + Send + 'a>> {
		Box::pin(async move { ForumRest::me(self, token).await })
	}

	fn list_chats<'a>(
		&'a self,
		token: &'a AccessToken,
	) -> Pin<Box<dyn Future<Output = Result<Vec<ChatName>, ClientCoreError>> + Send + 'a>> {
		Box::pin(async move { ForumRest::list_chats(self, token).await })
	}

	fn chat_status<'a>(
		&'a self,
		token: &'a AccessToken,
		chat: &'a ChatName,
	) -> Pin<Box<dyn Future<Output = Result<ChatStatus, ClientCoreError>> + Send + 'a>> {
		Box::pin(async move { ForumRest::chat_status(self, token, chat).await })
	}

	fn create_chat<'a>(
		&'a self,
		token: &'a AccessToken,
		chat: &'a ChatName,
	) -> Pin<Box<dyn Future<Output = Result<String, ClientCoreError>> + Send + 'a>> {
		Box::pin(async move { ForumRest::create_chat(self, token, chat).await })
	}
}

/// Connector backed by real WebSocket connections.
#[derive(Debug, Clone)]
pub struct WsRoomConnector {
	cfg: ClientConfig,
}

impl WsRoomConnector {
	pub fn new(cfg: ClientConfig) -> Self {
		Self { cfg }
	}
}

impl RoomConnector for WsRoomConnector {
	fn connect<'a>(
		&'a self,
		chat: &'a ChatName,
		token: &'a AccessToken,
	) -> Pin<Box<dyn Future<Output = Result<BoxedRoomSocket, ClientCoreError>> + Send + 'a>> {
		Box::pin(async move {
			RoomSocket::connect(&self.cfg, chat, token)
				.await
				.map(|s| Box::new(s) as BoxedRoomSocket)
		})
	}
}

impl RoomSocketApi for RoomSocket {
	fn run_frames_loop(
		self: Box<Self>,
		outgoing: mpsc::Receiver<String>,
		on_frame: Box<dyn FnMut(ServerFrame) + Send>,
	) -> Pin<Box<dyn Future<Output = Result<SocketEnd, ClientCoreError>> + Send>> {
		Box::pin(async move { RoomSocket::run_frames_loop(*self, outgoing, on_frame).await })
	}
}
