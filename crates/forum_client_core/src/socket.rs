use forum_domain::{ChatName, ServerFrame};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tracing::{debug, info, warn};

use crate::{AccessToken, ClientConfig, ClientCoreError};

type RoomWs = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// How a room socket ended without an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEnd {
	/// The outgoing channel was dropped; we closed the socket.
	ClosedByClient,
	/// The server closed the socket or the stream ended.
	ClosedByServer { reason: String },
}

/// One authenticated socket to one room.
pub struct RoomSocket {
	ws: RoomWs,
	chat: ChatName,
}

impl RoomSocket {
	/// Open `/api/ws/chat/{chat}` and authenticate by sending the token as the first frame.
	pub async fn connect(cfg: &ClientConfig, chat: &ChatName, token: &AccessToken) -> Result<Self, ClientCoreError> {
		let url = cfg.api.ws_url(&format!("/api/ws/chat/{}", chat.as_str()));
		debug!(%url, "opening room socket");

		let (mut ws, _resp) = tokio::time::timeout(cfg.connect_timeout, tokio_tungstenite::connect_async(url.as_str()))
			.await
			.map_err(|_| ClientCoreError::Socket(format!("connect timeout after {:?} ({url})", cfg.connect_timeout)))?
			.map_err(|e| ClientCoreError::Socket(format!("connect {url}: {e}")))?;

		ws.send(Message::Text(token.expose().to_string().into()))
			.await
			.map_err(|e| ClientCoreError::Socket(format!("send token: {e}")))?;

		info!(chat = %chat, "room socket open");

		Ok(Self {
			ws,
			chat: chat.clone(),
		})
	}

	pub fn chat(&self) -> &ChatName {
		&self.chat
	}

	/// Send one chat line (the server interprets lines starting with `/`).
	pub async fn send_text(&mut self, text: &str) -> Result<(), ClientCoreError> {
		self.ws
			.send(Message::Text(text.to_string().into()))
			.await
			.map_err(|e| ClientCoreError::Socket(format!("send: {e}")))
	}

	/// Next decoded frame; `None` once the server closed the socket.
	pub async fn next_frame(&mut self) -> Result<Option<ServerFrame>, ClientCoreError> {
		loop {
			let Some(msg) = self.ws.next().await else {
				return Ok(None);
			};

			match msg.map_err(|e| ClientCoreError::Socket(e.to_string()))? {
				Message::Text(text) => match serde_json::from_str::<ServerFrame>(&text) {
					Ok(frame) => return Ok(Some(frame)),
					Err(e) => {
						warn!(chat = %self.chat, error = %e, "undecodable room frame; skipping");
					}
				},
				Message::Ping(p) => {
					let _ = self.ws.send(Message::Pong(p)).await;
				}
				Message::Close(frame) => {
					if frame.as_ref().is_some_and(|f| f.code == CloseCode::Policy) {
						return Err(ClientCoreError::AuthRejected);
					}
					debug!(chat = %self.chat, ?frame, "room socket closed by server");
					return Ok(None);
				}
				_ => {}
			}
		}
	}

	/// Best-effort close handshake.
	pub async fn close(&mut self) {
		if let Err(e) = self.ws.close(None).await {
			debug!(chat = %self.chat, error = %e, "room socket close failed");
		}
	}

	/// Pump the socket until either side closes: lines from `outgoing` are sent, frames go to `on_frame`.
	pub async fn run_frames_loop<F>(
		mut self,
		mut outgoing: mpsc::Receiver<String>,
		mut on_frame: F,
	) -> Result<SocketEnd, ClientCoreError>
	where
		F: FnMut(ServerFrame),
	{
		loop {
			tokio::select! {
				out = outgoing.recv() => {
					let Some(text) = out else {
						self.close().await;
						return Ok(SocketEnd::ClosedByClient);
					};
					self.send_text(&text).await?;
				}
				frame = self.next_frame() => {
					match frame? {
						Some(frame) => {
							debug!(chat = %self.chat, kind = frame.kind(), "room frame decoded");
							on_frame(frame);
						}
						None => {
							return Ok(SocketEnd::ClosedByServer {
								reason: "socket closed".to_string(),
							});
						}
					}
				}
			}
		}
	}
}
