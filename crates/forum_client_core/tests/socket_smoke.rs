#![forbid(unsafe_code)]

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context as _;
use forum_client_core::{AccessToken, ClientConfig, ClientCoreError, RoomSocket, SocketEnd};
use forum_domain::{ChatName, ServerFrame};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

const GOOD_TOKEN: &str = "good-token";
const WAIT: Duration = Duration::from_secs(5);

/// One-connection room server: checks the token frame, greets, replays history, echoes lines.
async fn spawn_fake_room() -> anyhow::Result<SocketAddr> {
	let listener = TcpListener::bind("127.0.0.1:0").await.context("bind fake room")?;
	let addr = listener.local_addr()?;

	tokio::spawn(async move {
		let Ok((stream, _)) = listener.accept().await else {
			return;
		};
		let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
			return;
		};

		let token = match ws.next().await {
			Some(Ok(Message::Text(t))) => t.as_str().to_string(),
			_ => return,
		};
		if token != GOOD_TOKEN {
			let _ = ws
				.close(Some(CloseFrame {
					code: CloseCode::Policy,
					reason: "invalid token".into(),
				}))
				.await;
			return;
		}

		let _ = ws.send(Message::Text("{not json".into())).await;
		let _ = ws
			.send(Message::Text(
				r#"{"type":"system","message":"Welcome to chat main"}"#.into(),
			))
			.await;
		let _ = ws
			.send(Message::Text(
				r#"{"type":"history","messages":[{"username":"ann","message":"earlier","timestamp":"2025-01-02T03:04:05"}]}"#
					.into(),
			))
			.await;

		while let Some(Ok(msg)) = ws.next().await {
			let Message::Text(text) = msg else {
				continue;
			};
			if text.as_str() == "bye" {
				let _ = ws.close(None).await;
				return;
			}
			let echo = serde_json::json!({
				"type": "message",
				"username": "bob",
				"message": text.as_str(),
				"timestamp": "2025-01-02T03:04:06",
			});
			let _ = ws.send(Message::Text(echo.to_string().into())).await;
		}
	});

	Ok(addr)
}

fn config_for(addr: SocketAddr) -> anyhow::Result<ClientConfig> {
	Ok(ClientConfig::from_api_url(&format!("http://{addr}"))?)
}

#[tokio::test]
async fn frames_arrive_in_order_and_lines_echo() -> anyhow::Result<()> {
	let cfg = config_for(spawn_fake_room().await?)?;
	let room = ChatName::default_room();
	let mut socket = RoomSocket::connect(&cfg, &room, &AccessToken::new(GOOD_TOKEN)).await?;
	assert_eq!(socket.chat(), &room);

	// The undecodable frame is skipped.
	let first = tokio::time::timeout(WAIT, socket.next_frame()).await??;
	assert_eq!(
		first,
		Some(ServerFrame::System {
			message: "Welcome to chat main".into()
		})
	);

	let second = tokio::time::timeout(WAIT, socket.next_frame()).await??;
	match second {
		Some(ServerFrame::History { messages }) => {
			assert_eq!(messages.len(), 1);
			assert_eq!(messages[0].username, "ann");
		}
		other => panic!("expected history, got {other:?}"),
	}

	socket.send_text("hello").await?;
	let echoed = tokio::time::timeout(WAIT, socket.next_frame()).await??;
	match echoed {
		Some(ServerFrame::Message(m)) => assert_eq!(m.message, "hello"),
		other => panic!("expected message, got {other:?}"),
	}

	socket.send_text("bye").await?;
	let end = tokio::time::timeout(WAIT, socket.next_frame()).await??;
	assert_eq!(end, None);
	Ok(())
}

#[tokio::test]
async fn bad_token_is_auth_rejected() -> anyhow::Result<()> {
	let cfg = config_for(spawn_fake_room().await?)?;
	let mut socket = RoomSocket::connect(&cfg, &ChatName::default_room(), &AccessToken::new("stale")).await?;

	let err = tokio::time::timeout(WAIT, socket.next_frame())
		.await?
		.unwrap_err();
	assert!(matches!(err, ClientCoreError::AuthRejected), "got {err:?}");
	assert!(err.is_unauthorized());
	Ok(())
}

#[tokio::test]
async fn frames_loop_reports_who_closed() -> anyhow::Result<()> {
	let cfg = config_for(spawn_fake_room().await?)?;
	let socket = RoomSocket::connect(&cfg, &ChatName::default_room(), &AccessToken::new(GOOD_TOKEN)).await?;

	let (out_tx, out_rx) = mpsc::channel::<String>(4);
	let (seen_tx, mut seen_rx) = mpsc::unbounded_channel::<ServerFrame>();
	let pump = tokio::spawn(socket.run_frames_loop(out_rx, move |frame| {
		let _ = seen_tx.send(frame);
	}));

	let welcome = tokio::time::timeout(WAIT, seen_rx.recv()).await?;
	assert_eq!(welcome.map(|f| f.kind()), Some("system"));
	let history = tokio::time::timeout(WAIT, seen_rx.recv()).await?;
	assert_eq!(history.map(|f| f.kind()), Some("history"));

	out_tx.send("ping from test".into()).await?;
	let echoed = tokio::time::timeout(WAIT, seen_rx.recv()).await?;
	match echoed {
		Some(ServerFrame::Message(m)) => assert_eq!(m.message, "ping from test"),
		other => panic!("expected message, got {other:?}"),
	}

	out_tx.send("bye".into()).await?;
	let end = tokio::time::timeout(WAIT, pump).await???;
	assert!(matches!(end, SocketEnd::ClosedByServer { .. }), "got {end:?}");
	Ok(())
}

#[tokio::test]
async fn dropping_outgoing_closes_from_client() -> anyhow::Result<()> {
	let cfg = config_for(spawn_fake_room().await?)?;
	let socket = RoomSocket::connect(&cfg, &ChatName::default_room(), &AccessToken::new(GOOD_TOKEN)).await?;

	let (out_tx, out_rx) = mpsc::channel::<String>(1);
	drop(out_tx);

	let end = tokio::time::timeout(WAIT, socket.run_frames_loop(out_rx, |_| {})).await??;
	assert_eq!(end, SocketEnd::ClosedByClient);
	Ok(())
}
