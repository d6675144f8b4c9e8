use std::collections::VecDeque;

use forum_domain::{AuthState, ChatMessage, ChatName, ChatStatus, UserProfile};

use crate::net::CreateFailure;

/// One chat line as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayMessage {
	/// Local id, unique for the lifetime of the log.
	pub id: u64,
	pub username: String,
	pub text: String,
	pub timestamp: String,
	/// Written by the signed-in user.
	pub is_own: bool,
}

/// Bounded message list for the selected room.
#[derive(Debug, Clone)]
pub struct MessageLog {
	items: VecDeque<DisplayMessage>,
	max_items: usize,
	next_id: u64,
}

impl MessageLog {
	pub fn new(max_items: usize) -> Self {
		Self {
			items: VecDeque::new(),
			max_items: max_items.max(1),
			next_id: 1,
		}
	}

	pub fn push(&mut self, msg: ChatMessage, own_username: Option<&str>) -> DisplayMessage {
		let is_own = own_username.is_some_and(|u| u == msg.username);
		let item = DisplayMessage {
			id: self.next_id,
			username: msg.username,
			text: msg.message,
			timestamp: msg.timestamp,
			is_own,
		};
		self.next_id += 1;

		self.items.push_back(item.clone());
		while self.items.len() > self.max_items {
			self.items.pop_front();
		}
		item
	}

	/// Replace the whole list (history replay).
	pub fn replace(&mut self, msgs: Vec<ChatMessage>, own_username: Option<&str>) -> Vec<DisplayMessage> {
		self.items.clear();
		for msg in msgs {
			self.push(msg, own_username);
		}
		self.items.iter().cloned().collect()
	}

	pub fn clear(&mut self) {
		self.items.clear();
	}

	pub fn items(&self) -> impl Iterator<Item = &DisplayMessage> {
		self.items.iter()
	}

	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
	Idle,
	/// Waiting for the room to finish provisioning.
	WaitingForRoom {
		status: Option<ChatStatus>,
	},
	Connecting,
	Connected,
	Reconnecting {
		attempt: u32,
		next_retry_in_ms: u64,
	},
	Disconnected {
		reason: String,
	},
}

/// State of the "new room" form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateForm {
	pub pending: Option<ChatName>,
	pub error: Option<CreateFailure>,
}

#[derive(Debug, Clone)]
pub struct AppState {
	pub auth: AuthState,
	pub user: Option<UserProfile>,
	pub chats: Vec<ChatName>,
	pub selected: ChatName,
	pub connection: ConnectionStatus,
	pub log: MessageLog,
	pub create: CreateForm,
}

impl AppState {
	pub fn new(selected: ChatName, max_log_items: usize) -> Self {
		Self {
			auth: AuthState::Loading,
			user: None,
			chats: Vec::new(),
			selected,
			connection: ConnectionStatus::Idle,
			log: MessageLog::new(max_log_items),
			create: CreateForm::default(),
		}
	}

	pub fn username(&self) -> Option<&str> {
		self.user.as_ref().map(|u| u.username.as_str())
	}

	pub fn is_connected(&self) -> bool {
		matches!(self.connection, ConnectionStatus::Connected)
	}

	/// Forget everything tied to the signed-in user.
	pub fn reset_session(&mut self) {
		self.user = None;
		self.chats.clear();
		self.connection = ConnectionStatus::Idle;
		self.log.clear();
		self.create = CreateForm::default();
	}
}
