use serde::{Deserialize, Serialize};

/// Account as returned by `/api/register` and `/api/users/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
	pub username: String,
	pub email: String,
	pub created_at: String,
	pub is_active: bool,
}

/// A stored or broadcast chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
	pub username: String,
	pub message: String,
	/// ISO-8601, not necessarily carrying an offset.
	pub timestamp: String,
}

/// JSON frame pushed by the server over a room socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
	System { message: String },
	History { messages: Vec<ChatMessage> },
	Message(ChatMessage),
	#[serde(other)]
	Unknown,
}

impl ServerFrame {
	pub fn kind(&self) -> &'static str {
		match self {
			ServerFrame::System { .. } => "system",
			ServerFrame::History { .. } => "history",
			ServerFrame::Message(_) => "message",
			ServerFrame::Unknown => "unknown",
		}
	}
}
