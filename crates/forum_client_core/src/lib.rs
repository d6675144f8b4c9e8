#![forbid(unsafe_code)]

use std::fmt;
use std::time::Duration;

use forum_domain::ChatNameError;
use forum_util::endpoint::ApiEndpoint;

mod rest;
mod socket;

pub use rest::ForumRest;
pub use socket::{RoomSocket, SocketEnd};

/// Local dev API; release deployments pass their own base URL.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

/// Client configuration shared by the REST client and room sockets.
#[derive(Debug, Clone)]
pub struct ClientConfig {
	/// API base (`http(s)://host[:port]`); sockets derive `ws(s)://` from it.
	pub api: ApiEndpoint,

	/// `User-Agent` sent with every request.
	pub user_agent: String,

	/// Timeout for ordinary REST calls.
	pub request_timeout: Duration,

	/// Timeout for room creation; the server answers only once the room is provisioned.
	pub provision_timeout: Duration,

	/// Timeout for TCP connect and the socket upgrade.
	pub connect_timeout: Duration,
}

impl ClientConfig {
	/// Convenience: create a config from `http(s)://host[:port]`.
	pub fn from_api_url(url: &str) -> Result<Self, ClientCoreError> {
		let api = ApiEndpoint::parse(url).map_err(ClientCoreError::Endpoint)?;
		Ok(Self { api, ..Self::default() })
	}
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			api: ApiEndpoint::parse(DEFAULT_API_URL).expect("valid default api url"),
			user_agent: format!("forum-client-core/{}", env!("CARGO_PKG_VERSION")),
			request_timeout: Duration::from_secs(15),
			provision_timeout: Duration::from_secs(90),
			connect_timeout: Duration::from_secs(15),
		}
	}
}

/// Errors for client core operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientCoreError {
	/// Endpoint or HTTP client setup failed.
	#[error("invalid endpoint: {0}")]
	Endpoint(String),

	/// The request never produced a response (DNS, connect, timeout).
	#[error("request failed: {0}")]
	Http(String),

	/// The server refused the bearer token.
	#[error("unauthorized")]
	Unauthorized,

	/// Non-success status with the server's `detail`, if any.
	#[error("request rejected (status {status}): {}", .detail.as_deref().unwrap_or("no detail"))]
	Rejected { status: u16, detail: Option<String> },

	/// Response body did not match the expected shape.
	#[error("failed to decode response: {0}")]
	Decode(String),

	/// Socket transport error.
	#[error("socket error: {0}")]
	Socket(String),

	/// The server closed the room socket with a policy violation (bad token).
	#[error("server rejected the socket token")]
	AuthRejected,

	#[error(transparent)]
	InvalidChatName(#[from] ChatNameError),

	/// Protocol error (unexpected message ordering/types).
	#[error("protocol error: {0}")]
	Protocol(String),

	/// Other error.
	#[error("error: {0}")]
	Other(String),
}

impl ClientCoreError {
	/// The stored token is no longer usable.
	pub fn is_unauthorized(&self) -> bool {
		matches!(self, ClientCoreError::Unauthorized | ClientCoreError::AuthRejected)
	}

	/// The server was never reached or the connection dropped.
	pub fn is_transport(&self) -> bool {
		matches!(self, ClientCoreError::Http(_) | ClientCoreError::Socket(_))
	}

	/// Server-provided explanation for a rejected request.
	pub fn detail(&self) -> Option<&str> {
		match self {
			ClientCoreError::Rejected { detail, .. } => detail.as_deref(),
			_ => None,
		}
	}
}

impl From<anyhow::Error> for ClientCoreError {
	fn from(e: anyhow::Error) -> Self {
		ClientCoreError::Other(format!("{e:#}"))
	}
}

/// Bearer token; redacted in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
	pub fn new(token: impl Into<String>) -> Self {
		Self(token.into())
	}

	/// Access the raw token.
	pub fn expose(&self) -> &str {
		&self.0
	}

	pub(crate) fn bearer(&self) -> String {
		format!("Bearer {}", self.0.trim())
	}
}

impl fmt::Debug for AccessToken {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("AccessToken(<redacted>)")
	}
}

impl fmt::Display for AccessToken {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("<redacted>")
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_config_is_sane() {
		let cfg = ClientConfig::default();
		assert_eq!(cfg.api.as_str(), DEFAULT_API_URL);
		assert!(cfg.provision_timeout > cfg.request_timeout);
	}

	#[test]
	fn from_api_url_rejects_bad_scheme() {
		let err = ClientConfig::from_api_url("quic://127.0.0.1:18203").unwrap_err();
		assert!(matches!(err, ClientCoreError::Endpoint(_)));
	}

	#[test]
	fn token_is_redacted() {
		let t = AccessToken::new("secret-jwt");
		assert_eq!(format!("{t:?}"), "AccessToken(<redacted>)");
		assert_eq!(t.to_string(), "<redacted>");
		assert_eq!(t.bearer(), "Bearer secret-jwt");
	}

	#[test]
	fn rejected_error_renders_detail() {
		let e = ClientCoreError::Rejected {
			status: 400,
			detail: Some("Username already registered".into()),
		};
		assert_eq!(e.to_string(), "request rejected (status 400): Username already registered");
		assert_eq!(e.detail(), Some("Username already registered"));
		assert!(ClientCoreError::AuthRejected.is_unauthorized());
		assert!(ClientCoreError::Http("x".into()).is_transport());
	}
}
