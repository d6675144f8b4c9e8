#![forbid(unsafe_code)]

#[macro_use]
extern crate rust_i18n;

i18n!("locales", fallback = "en");

use std::io::Write as _;
use std::sync::Arc;

use anyhow::{Context as _, anyhow, bail};
use forum_client::app_state::AppState;
use forum_client::net::{self, SessionController, SessionEvent};
use forum_client::reducer::{UiCommand, reduce};
use forum_client::render;
use forum_client::settings::{self, ClientSettings};
use forum_client::token_store::{self, TokenStore};
use forum_client_core::{ClientConfig, ClientCoreError, ForumRest};
use forum_domain::{AuthState, ChatName, RegistrationForm};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::info;

type Input = Lines<BufReader<Stdin>>;

enum Command {
	Register,
	Login { user: Option<String> },
	Logout,
	Chat { room: Option<ChatName> },
}

fn usage_and_exit() -> ! {
	eprintln!(
		"Usage: forum <command> [options]\n\
\n\
Commands:\n\
\tregister              Create an account\n\
\tlogin [--user NAME]   Sign in and remember the token\n\
\tlogout                Forget the stored token\n\
\tchat [--room NAME]    Join a room (default: settings or main)\n\
\n\
Environment:\n\
\tFORUM_API_URL       API base URL (http(s)://host[:port])\n\
\tFORUM_DEFAULT_CHAT  Room to join when --room is not given\n\
\tFORUM_LOCALE        en or pl\n\
\tFORUM_TOKEN_STORE   file, keyring or memory\n\
\n\
Examples:\n\
\tforum login --user alice\n\
\tFORUM_API_URL=https://forum.example.com forum chat --room off-topic\n"
	);
	std::process::exit(2)
}

fn init_tracing() {
	let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string());
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_target(false)
		.with_writer(std::io::stderr)
		.init();
}

fn parse_args() -> Command {
	let mut args = std::env::args().skip(1);
	let Some(sub) = args.next() else {
		usage_and_exit();
	};

	match sub.as_str() {
		"--help" | "-h" | "help" => usage_and_exit(),
		"register" => {
			if let Some(extra) = args.next() {
				eprintln!("Unknown argument: {extra}");
				usage_and_exit();
			}
			Command::Register
		}
		"logout" => {
			if let Some(extra) = args.next() {
				eprintln!("Unknown argument: {extra}");
				usage_and_exit();
			}
			Command::Logout
		}
		"login" => {
			let mut user = None;
			while let Some(arg) = args.next() {
				match arg.as_str() {
					"--user" | "-u" => {
						let v = args.next().unwrap_or_else(|| usage_and_exit());
						if v.trim().is_empty() {
							eprintln!("--user must be non-empty");
							usage_and_exit();
						}
						user = Some(v.trim().to_string());
					}
					other => {
						eprintln!("Unknown argument: {other}");
						usage_and_exit();
					}
				}
			}
			Command::Login { user }
		}
		"chat" => {
			let mut room = None;
			while let Some(arg) = args.next() {
				match arg.as_str() {
					"--room" | "-r" => {
						let v = args.next().unwrap_or_else(|| usage_and_exit());
						room = Some(ChatName::new(v.trim()).unwrap_or_else(|e| {
							eprintln!("Invalid --room value: {e}");
							usage_and_exit()
						}));
					}
					other => {
						eprintln!("Unknown argument: {other}");
						usage_and_exit();
					}
				}
			}
			Command::Chat { room }
		}
		other => {
			eprintln!("Unknown command: {other}");
			usage_and_exit();
		}
	}
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	init_tracing();
	let cmd = parse_args();

	let settings = settings::load().context("load settings")?;
	forum_client::set_locale(&settings.locale);

	let cfg = settings::build_client_config(&settings).map_err(anyhow::Error::msg)?;
	let tokens = token_store::open_token_store(settings.token_store, &settings::settings_dir());
	info!(api = %cfg.api, token_store = ?settings.token_store, "forum client starting");

	let mut input = BufReader::new(tokio::io::stdin()).lines();

	match cmd {
		Command::Register => register(&cfg, &mut input).await,
		Command::Login { user } => login(&cfg, tokens.as_ref(), user, &mut input).await,
		Command::Logout => {
			tokens.clear().context("clear stored token")?;
			println!("{}", t!("auth.logged_out"));
			Ok(())
		}
		Command::Chat { room } => chat(cfg, tokens, &settings, room, &mut input).await,
	}
}

async fn ask(input: &mut Input, label: &str) -> anyhow::Result<String> {
	print!("{label}");
	std::io::stdout().flush().context("flush stdout")?;
	let line = input
		.next_line()
		.await
		.context("read stdin")?
		.ok_or_else(|| anyhow!("stdin closed"))?;
	Ok(line)
}

fn error_text(e: &ClientCoreError) -> String {
	e.detail().map(str::to_string).unwrap_or_else(|| e.to_string())
}

async fn register(cfg: &ClientConfig, input: &mut Input) -> anyhow::Result<()> {
	let form = RegistrationForm {
		username: ask(input, &t!("cli.username")).await?.trim().to_string(),
		email: ask(input, &t!("cli.email")).await?.trim().to_string(),
		password: ask(input, &t!("cli.password")).await?,
		confirm_password: ask(input, &t!("cli.confirm_password")).await?,
	};

	let user = form
		.validate()
		.map_err(|e| anyhow!("{}", t!("cli.register_failed", reason = e)))?;

	let rest = ForumRest::new(cfg.clone())?;
	match rest.register(&user).await {
		Ok(profile) => {
			println!("{}", t!("cli.registered", user = profile.username));
			Ok(())
		}
		Err(e) => bail!("{}", t!("cli.register_failed", reason = error_text(&e))),
	}
}

async fn login(cfg: &ClientConfig, tokens: &dyn TokenStore, user: Option<String>, input: &mut Input) -> anyhow::Result<()> {
	let username = match user {
		Some(u) => u,
		None => ask(input, &t!("cli.username")).await?.trim().to_string(),
	};
	let password = ask(input, &t!("cli.password")).await?;

	let rest = ForumRest::new(cfg.clone())?;
	let token = rest
		.login(&username, &password)
		.await
		.map_err(|e| anyhow!("{}", t!("auth.login_failed", reason = error_text(&e))))?;
	tokens.store(&token).context("store token")?;

	match rest.me(&token).await {
		Ok(profile) => {
			println!("{}", t!("cli.logged_in", user = profile.username));
			if !profile.is_active {
				println!("{}", t!("auth.locked"));
			}
		}
		Err(ClientCoreError::Rejected { .. }) => println!("{}", t!("auth.locked")),
		Err(e) => return Err(e).context("fetch profile"),
	}
	Ok(())
}

async fn chat(
	cfg: ClientConfig,
	tokens: Arc<dyn TokenStore>,
	settings: &ClientSettings,
	room: Option<ChatName>,
	input: &mut Input,
) -> anyhow::Result<()> {
	let mut options = settings.session_options();
	if let Some(room) = room {
		options.default_chat = room;
	}

	let mut state = AppState::new(options.default_chat.clone(), settings.max_log_items);
	let deps = net::live_deps(cfg, tokens, options)?;
	let (ctl, mut events, shutdown) = net::start_session(deps);
	ctl.authenticate().await.map_err(anyhow::Error::msg)?;

	loop {
		tokio::select! {
			ev = events.recv() => {
				let Some(ev) = ev else {
					break;
				};
				let ended = matches!(
					&ev,
					SessionEvent::AuthChanged { state: AuthState::Unauthenticated | AuthState::Locked, .. }
				);
				for cmd in reduce(&mut state, ev) {
					print_command(cmd);
				}
				if ended {
					break;
				}
				print_prompt(&state);
			}

			line = input.next_line() => {
				let Some(line) = line.context("read stdin")? else {
					break;
				};
				if handle_line(&ctl, &state, &line).await? {
					break;
				}
				print_prompt(&state);
			}
		}
	}

	shutdown.shutdown().await;
	Ok(())
}

fn print_command(cmd: UiCommand) {
	match cmd {
		UiCommand::ShowMessages(msgs) => {
			for msg in msgs {
				println!("\r{}", render::format_message(&msg));
			}
		}
		UiCommand::Notice { kind, text } => println!("\r{}", render::format_notice(kind, &text)),
	}
}

fn print_prompt(state: &AppState) {
	if state.auth.is_active() {
		print!("{}", render::prompt(state));
		let _ = std::io::stdout().flush();
	}
}

/// Returns `true` when the user asked to quit.
async fn handle_line(ctl: &SessionController, state: &AppState, line: &str) -> anyhow::Result<bool> {
	let trimmed = line.trim();
	if trimmed.is_empty() {
		return Ok(false);
	}

	let (head, rest) = trimmed
		.split_once(char::is_whitespace)
		.map(|(h, r)| (h, r.trim()))
		.unwrap_or((trimmed, ""));

	match head {
		"/quit" | "/exit" => return Ok(true),
		"/help" => println!("{}", t!("cli.help")),
		"/rooms" => {
			println!("{}", render::format_rooms(state));
			ctl.refresh_chats().await.map_err(anyhow::Error::msg)?;
		}
		"/join" => {
			if rest.is_empty() {
				println!("{}", t!("cli.join_usage"));
			} else {
				match ChatName::new(rest) {
					Ok(chat) => ctl.select_chat(chat).await.map_err(anyhow::Error::msg)?,
					Err(e) => println!("{}", t!("cli.invalid_room", detail = e)),
				}
			}
		}
		"/create" => {
			if rest.is_empty() {
				println!("{}", t!("cli.create_usage"));
			} else {
				ctl.create_chat(rest).await.map_err(anyhow::Error::msg)?;
			}
		}
		_ => ctl.send_text(trimmed).await.map_err(anyhow::Error::msg)?,
	}

	Ok(false)
}
