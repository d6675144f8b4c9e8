use forum_domain::AuthState;
use rust_i18n::t;

use crate::app_state::{AppState, ConnectionStatus, DisplayMessage};
use crate::net::{CreateFailure, SessionEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
	Info,
	Warning,
	Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCommand {
	ShowMessages(Vec<DisplayMessage>),
	Notice { kind: NoticeKind, text: String },
}

fn notice(kind: NoticeKind, text: impl Into<String>) -> UiCommand {
	UiCommand::Notice {
		kind,
		text: text.into(),
	}
}

pub fn describe_create_failure(reason: &CreateFailure) -> String {
	match reason {
		CreateFailure::InvalidName(detail) => t!("create.invalid_name", detail = detail).to_string(),
		CreateFailure::Rejected(Some(detail)) => detail.clone(),
		CreateFailure::Rejected(None) => t!("create.failed").to_string(),
		CreateFailure::Connection => t!("create.connection_error").to_string(),
		CreateFailure::NotSignedIn => t!("create.not_signed_in").to_string(),
	}
}

pub fn reduce(state: &mut AppState, event: SessionEvent) -> Vec<UiCommand> {
	let mut commands = Vec::new();
	match event {
		SessionEvent::AuthChanged { state: auth, user } => {
			state.auth = auth;
			match auth {
				AuthState::Loading => {}
				AuthState::Active => {
					let name = user.as_ref().map(|u| u.username.clone()).unwrap_or_default();
					state.user = user;
					commands.push(notice(NoticeKind::Info, t!("auth.signed_in", user = name)));
				}
				AuthState::Locked => {
					state.user = user;
					commands.push(notice(NoticeKind::Warning, t!("auth.locked")));
				}
				AuthState::Unauthenticated => {
					state.reset_session();
					commands.push(notice(NoticeKind::Warning, t!("auth.signed_out")));
				}
			}
		}
		SessionEvent::LoginFailed { reason } => {
			commands.push(notice(NoticeKind::Error, t!("auth.login_failed", reason = reason)));
		}
		SessionEvent::ChatList { chats } => {
			state.chats = chats;
		}
		SessionEvent::ChatSelected { chat } => {
			state.log.clear();
			state.connection = ConnectionStatus::WaitingForRoom { status: None };
			commands.push(notice(NoticeKind::Info, t!("room.selected", room = chat.as_str())));
			state.selected = chat;
		}
		SessionEvent::ChatStatus { chat, status } => {
			if chat != state.selected || status.is_ready() {
				return commands;
			}
			let changed = !matches!(&state.connection, ConnectionStatus::WaitingForRoom { status: Some(prev) } if *prev == status);
			if changed {
				commands.push(notice(
					NoticeKind::Info,
					t!("room.provisioning", room = chat.as_str(), status = status.to_string()),
				));
			}
			state.connection = ConnectionStatus::WaitingForRoom { status: Some(status) };
		}
		SessionEvent::Connecting { chat } => {
			if chat == state.selected {
				state.connection = ConnectionStatus::Connecting;
			}
		}
		SessionEvent::Connected { chat } => {
			if chat == state.selected {
				state.connection = ConnectionStatus::Connected;
				state.log.clear();
				commands.push(notice(NoticeKind::Info, t!("room.connected", room = chat.as_str())));
			}
		}
		SessionEvent::Disconnected { chat, reason } => {
			if chat == state.selected && state.auth.is_active() {
				state.connection = ConnectionStatus::Disconnected { reason: reason.clone() };
				commands.push(notice(
					NoticeKind::Warning,
					t!("room.disconnected", room = chat.as_str(), reason = reason),
				));
			}
		}
		SessionEvent::Reconnecting {
			attempt,
			next_retry_in_ms,
		} => {
			state.connection = ConnectionStatus::Reconnecting {
				attempt,
				next_retry_in_ms,
			};
			let secs = format!("{:.1}", next_retry_in_ms as f64 / 1000.0);
			commands.push(notice(
				NoticeKind::Warning,
				t!("room.reconnecting", secs = secs, attempt = attempt),
			));
		}
		SessionEvent::History { chat, messages } => {
			if chat == state.selected {
				let own = state.user.as_ref().map(|u| u.username.clone());
				let shown = state.log.replace(messages, own.as_deref());
				commands.push(UiCommand::ShowMessages(shown));
			}
		}
		SessionEvent::Message { chat, message } => {
			if chat == state.selected {
				let own = state.user.as_ref().map(|u| u.username.clone());
				let shown = state.log.push(message, own.as_deref());
				commands.push(UiCommand::ShowMessages(vec![shown]));
			}
		}
		SessionEvent::System { chat, message } => {
			if chat == state.selected {
				commands.push(notice(NoticeKind::Info, message));
			}
		}
		SessionEvent::CreateStarted { chat } => {
			state.create.pending = Some(chat.clone());
			state.create.error = None;
			commands.push(notice(NoticeKind::Info, t!("create.started", room = chat.as_str())));
		}
		SessionEvent::CreateSucceeded { chat, .. } => {
			state.create.pending = None;
			state.create.error = None;
			commands.push(notice(NoticeKind::Info, t!("create.succeeded", room = chat.as_str())));
		}
		SessionEvent::CreateFailed { name, reason } => {
			state.create.pending = None;
			let text = describe_create_failure(&reason);
			state.create.error = Some(reason);
			commands.push(notice(NoticeKind::Error, t!("create.failed_named", room = name, reason = text)));
		}
		SessionEvent::NotConnected => {
			commands.push(notice(NoticeKind::Error, t!("error.not_connected")));
		}
		SessionEvent::Error { message } => {
			commands.push(notice(NoticeKind::Error, message));
		}
	}
	commands
}
