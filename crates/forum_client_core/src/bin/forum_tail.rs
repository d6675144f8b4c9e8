#![forbid(unsafe_code)]

use std::time::Duration;

use forum_client_core::{AccessToken, ClientConfig, DEFAULT_API_URL, ForumRest, RoomSocket};
use forum_domain::{ChatName, ServerFrame};
use tokio::sync::mpsc;
use tracing::{info, warn};

const READINESS_POLL: Duration = Duration::from_secs(1);

fn usage_and_exit() -> ! {
	eprintln!(
		"Usage: forum_tail [--api http(s)://host:port] [--room name]\n\
\n\
Options:\n\
	--api       API base URL (default: $FORUM_API_URL or the local dev API)\n\
	--room      Room to follow (default: main)\n\
	--help      Show this help\n\
\n\
Environment:\n\
	FORUM_CLIENT_TOKEN  Access token (required; see `forum login`)\n\
\n\
Examples:\n\
	forum_tail --api http://127.0.0.1:8000 --room main\n\
	FORUM_CLIENT_TOKEN=... forum_tail --api https://forum.example.com --room off-topic\n"
	);
	std::process::exit(2)
}

fn init_tracing() {
	let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info,forum_client_core=debug".to_string());
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_target(false)
		.with_writer(std::io::stderr)
		.init();
}

fn parse_args() -> (String, ChatName) {
	let mut api = std::env::var("FORUM_API_URL")
		.ok()
		.map(|v| v.trim().to_string())
		.filter(|v| !v.is_empty())
		.unwrap_or_else(|| DEFAULT_API_URL.to_string());
	let mut room = ChatName::default_room();

	let mut it = std::env::args().skip(1);
	while let Some(arg) = it.next() {
		match arg.as_str() {
			"--help" | "-h" => usage_and_exit(),
			"--api" => {
				let v = it.next().unwrap_or_else(|| usage_and_exit());
				if v.trim().is_empty() {
					eprintln!("--api must be non-empty (expected http(s)://host:port)");
					usage_and_exit();
				}
				api = v;
			}
			"--room" => {
				let v = it.next().unwrap_or_else(|| usage_and_exit());
				room = ChatName::new(v.trim()).unwrap_or_else(|e| {
					eprintln!("Invalid --room value: {e}");
					usage_and_exit()
				});
			}
			other => {
				eprintln!("Unknown argument: {other}");
				usage_and_exit();
			}
		}
	}

	(api, room)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	init_tracing();
	let (api, room) = parse_args();

	let token = std::env::var("FORUM_CLIENT_TOKEN")
		.ok()
		.map(|v| v.trim().to_string())
		.filter(|v| !v.is_empty())
		.map(AccessToken::new)
		.ok_or_else(|| anyhow::anyhow!("FORUM_CLIENT_TOKEN is not set"))?;

	let cfg = ClientConfig {
		user_agent: format!("forum-tail/{}", env!("CARGO_PKG_VERSION")),
		..ClientConfig::from_api_url(&api)?
	};
	let rest = ForumRest::new(cfg.clone())?;

	info!(api = %cfg.api, room = %room, "waiting for room to become ready");
	loop {
		match rest.chat_status(&token, &room).await {
			Ok(status) if status.is_ready() => break,
			Ok(status) => info!(%status, "room not ready yet"),
			Err(e) if e.is_unauthorized() => return Err(e.into()),
			Err(e) => warn!(error = %e, "status check failed"),
		}
		tokio::time::sleep(READINESS_POLL).await;
	}

	let socket = RoomSocket::connect(&cfg, &room, &token).await?;

	// Holding the sender keeps the socket open until the server closes it.
	let (_outgoing_tx, outgoing_rx) = mpsc::channel::<String>(1);

	let end = socket
		.run_frames_loop(outgoing_rx, |frame| match frame {
			ServerFrame::System { message } => println!("* {message}"),
			ServerFrame::History { messages } => {
				for m in messages {
					println!("[{}] {}: {}", m.timestamp, m.username, m.message);
				}
			}
			ServerFrame::Message(m) => println!("[{}] {}: {}", m.timestamp, m.username, m.message),
			ServerFrame::Unknown => warn!("unknown frame type"),
		})
		.await?;

	info!(?end, "room socket ended");
	Ok(())
}
