use core::fmt;

use forum_domain::{AuthState, ChatMessage, ChatName, ChatStatus, UserProfile};

/// Why a room could not be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateFailure {
	/// The name failed local validation; nothing was sent.
	InvalidName(String),
	/// The server refused, with its `detail` when present.
	Rejected(Option<String>),
	/// The server could not be reached.
	Connection,
	/// No usable session to create rooms with.
	NotSignedIn,
}

/// Events emitted by the session task.
#[derive(Clone, PartialEq)]
pub enum SessionEvent {
	AuthChanged {
		state: AuthState,
		user: Option<UserProfile>,
	},
	LoginFailed {
		reason: String,
	},
	ChatList {
		chats: Vec<ChatName>,
	},
	ChatSelected {
		chat: ChatName,
	},
	ChatStatus {
		chat: ChatName,
		status: ChatStatus,
	},
	Connecting {
		chat: ChatName,
	},
	Connected {
		chat: ChatName,
	},
	Disconnected {
		chat: ChatName,
		reason: String,
	},
	Reconnecting {
		attempt: u32,
		next_retry_in_ms: u64,
	},
	History {
		chat: ChatName,
		messages: Vec<ChatMessage>,
	},
	Message {
		chat: ChatName,
		message: ChatMessage,
	},
	System {
		chat: ChatName,
		message: String,
	},
	CreateStarted {
		chat: ChatName,
	},
	CreateSucceeded {
		chat: ChatName,
		message: String,
	},
	CreateFailed {
		name: String,
		reason: CreateFailure,
	},
	/// Text was sent while no room socket was open.
	NotConnected,
	Error {
		message: String,
	},
}

impl fmt::Debug for SessionEvent {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SessionEvent::AuthChanged { state, user } => write!(
				f,
				"SessionEvent::AuthChanged {{ state: {state}, user: {:?} }}",
				user.as_ref().map(|u| u.username.as_str())
			),
			SessionEvent::LoginFailed { reason } => write!(f, "SessionEvent::LoginFailed {{ reason: {reason:?} }}"),
			SessionEvent::ChatList { chats } => write!(f, "SessionEvent::ChatList {{ count: {} }}", chats.len()),
			SessionEvent::ChatSelected { chat } => write!(f, "SessionEvent::ChatSelected {{ chat: {chat} }}"),
			SessionEvent::ChatStatus { chat, status } => {
				write!(f, "SessionEvent::ChatStatus {{ chat: {chat}, status: {status} }}")
			}
			SessionEvent::Connecting { chat } => write!(f, "SessionEvent::Connecting {{ chat: {chat} }}"),
			SessionEvent::Connected { chat } => write!(f, "SessionEvent::Connected {{ chat: {chat} }}"),
			SessionEvent::Disconnected { chat, reason } => {
				write!(f, "SessionEvent::Disconnected {{ chat: {chat}, reason: {reason:?} }}")
			}
			SessionEvent::Reconnecting {
				attempt,
				next_retry_in_ms,
			} => write!(
				f,
				"SessionEvent::Reconnecting {{ attempt: {attempt}, next_retry_in_ms: {next_retry_in_ms} }}"
			),
			SessionEvent::History { chat, messages } => {
				write!(f, "SessionEvent::History {{ chat: {chat}, count: {} }}", messages.len())
			}
			SessionEvent::Message { chat, message } => write!(
				f,
				"SessionEvent::Message {{ chat: {chat}, username: {:?}, len: {} }}",
				message.username,
				message.message.len()
			),
			SessionEvent::System { chat, message } => {
				write!(f, "SessionEvent::System {{ chat: {chat}, message: {message:?} }}")
			}
			SessionEvent::CreateStarted { chat } => write!(f, "SessionEvent::CreateStarted {{ chat: {chat} }}"),
			SessionEvent::CreateSucceeded { chat, .. } => write!(f, "SessionEvent::CreateSucceeded {{ chat: {chat} }}"),
			SessionEvent::CreateFailed { name, reason } => {
				write!(f, "SessionEvent::CreateFailed {{ name: {name:?}, reason: {reason:?} }}")
			}
			SessionEvent::NotConnected => f.write_str("SessionEvent::NotConnected"),
			SessionEvent::Error { message } => write!(f, "SessionEvent::Error {{ message: {message:?} }}"),
		}
	}
}
