#![forbid(unsafe_code)]

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod registration;
mod wire;

pub use registration::{NewUser, RegistrationError, RegistrationForm};
pub use wire::{ChatMessage, ServerFrame, UserProfile};

/// Errors for parsing chat names.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChatNameError {
	#[error("empty chat name")]
	Empty,
	#[error("chat name may only contain letters, digits, '-' and '_' (found {0:?})")]
	InvalidCharacter(char),
}

/// Validated room name (`[a-zA-Z0-9-_]+`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChatName(String);

impl ChatName {
	/// Room every fresh session starts in.
	pub const DEFAULT: &'static str = "main";

	/// Server-side table prefix reported by the chat list endpoint.
	pub const TABLE_PREFIX: &'static str = "chat_";

	pub fn new(name: impl Into<String>) -> Result<Self, ChatNameError> {
		let name = name.into();
		if name.is_empty() {
			return Err(ChatNameError::Empty);
		}
		if let Some(bad) = name.chars().find(|c| !is_chat_name_char(*c)) {
			return Err(ChatNameError::InvalidCharacter(bad));
		}
		Ok(Self(name))
	}

	/// The default room (`main`).
	pub fn default_room() -> Self {
		Self(Self::DEFAULT.to_string())
	}

	/// Parse a server table name (`chat_<name>`); the prefix is optional.
	pub fn from_table_name(table: &str) -> Result<Self, ChatNameError> {
		let name = table.strip_prefix(Self::TABLE_PREFIX).unwrap_or(table);
		Self::new(name)
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn into_string(self) -> String {
		self.0
	}
}

fn is_chat_name_char(c: char) -> bool {
	c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

impl fmt::Display for ChatName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl FromStr for ChatName {
	type Err = ChatNameError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		ChatName::new(s.to_string())
	}
}

impl TryFrom<String> for ChatName {
	type Error = ChatNameError;

	fn try_from(s: String) -> Result<Self, Self::Error> {
		ChatName::new(s)
	}
}

impl From<ChatName> for String {
	fn from(name: ChatName) -> Self {
		name.0
	}
}

/// Where the user stands with respect to authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AuthState {
	#[default]
	Loading,
	Unauthenticated,
	/// Valid token, but the account is deactivated.
	Locked,
	Active,
}

impl AuthState {
	pub const fn as_str(self) -> &'static str {
		match self {
			AuthState::Loading => "loading",
			AuthState::Unauthenticated => "unauthenticated",
			AuthState::Locked => "locked",
			AuthState::Active => "active",
		}
	}

	pub const fn is_active(self) -> bool {
		matches!(self, AuthState::Active)
	}
}

impl fmt::Display for AuthState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Provisioning status of a room as reported by the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChatStatus {
	Active,
	Creating,
	NotFound,
	Other(String),
}

impl ChatStatus {
	pub fn parse(s: &str) -> Self {
		match s.trim() {
			"ACTIVE" => ChatStatus::Active,
			"CREATING" => ChatStatus::Creating,
			"NOT_FOUND" => ChatStatus::NotFound,
			other => ChatStatus::Other(other.to_string()),
		}
	}

	/// Only a fully active room accepts socket connections.
	pub fn is_ready(&self) -> bool {
		matches!(self, ChatStatus::Active)
	}
}

impl fmt::Display for ChatStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ChatStatus::Active => f.write_str("ACTIVE"),
			ChatStatus::Creating => f.write_str("CREATING"),
			ChatStatus::NotFound => f.write_str("NOT_FOUND"),
			ChatStatus::Other(s) => f.write_str(s),
		}
	}
}

/// Chat text ready to go out on the socket: trimmed and non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingText(String);

impl OutgoingText {
	pub fn new(text: &str) -> Option<Self> {
		let text = text.trim();
		(!text.is_empty()).then(|| Self(text.to_string()))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn into_string(self) -> String {
		self.0
	}
}
