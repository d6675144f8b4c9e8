use forum_domain::{ChatMessage, ChatName, ChatStatus, NewUser, UserProfile};
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::{AccessToken, ClientConfig, ClientCoreError};

/// REST half of the forum API.
#[derive(Debug, Clone)]
pub struct ForumRest {
	cfg: ClientConfig,
	client: reqwest::Client,
}

impl ForumRest {
	pub fn new(cfg: ClientConfig) -> Result<Self, ClientCoreError> {
		let client = reqwest::Client::builder()
			.user_agent(cfg.user_agent.clone())
			.connect_timeout(cfg.connect_timeout)
			.build()
			.map_err(|e| ClientCoreError::Endpoint(format!("build http client: {e}")))?;
		Ok(Self { cfg, client })
	}

	pub fn config(&self) -> &ClientConfig {
		&self.cfg
	}

	/// `POST /api/register`.
	pub async fn register(&self, user: &NewUser) -> Result<UserProfile, ClientCoreError> {
		let resp = self
			.client
			.post(self.cfg.api.http_url("/api/register"))
			.timeout(self.cfg.request_timeout)
			.json(user)
			.send()
			.await
			.map_err(|e| ClientCoreError::Http(format!("register: {e}")))?;

		let resp = check_status(resp, false).await?;
		decode_json(resp, "register").await
	}

	/// `POST /api/token` (OAuth2 password form). Bad credentials come back as `Rejected { status: 401 }`.
	pub async fn login(&self, username: &str, password: &str) -> Result<AccessToken, ClientCoreError> {
		let resp = self
			.client
			.post(self.cfg.api.http_url("/api/token"))
			.timeout(self.cfg.request_timeout)
			.form(&[("username", username), ("password", password)])
			.send()
			.await
			.map_err(|e| ClientCoreError::Http(format!("login: {e}")))?;

		let resp = check_status(resp, false).await?;
		let body: TokenResponse = decode_json(resp, "login").await?;
		if !body.token_type.eq_ignore_ascii_case("bearer") {
			warn!(token_type = %body.token_type, "unexpected token type; using it as bearer anyway");
		}
		Ok(AccessToken::new(body.access_token))
	}

	/// `GET /api/users/me`.
	pub async fn me(&self, token: &AccessToken) -> Result<UserProfile, ClientCoreError> {
		let resp = self.get_authed("/api/users/me", token).await?;
		decode_json(resp, "users/me").await
	}

	/// `GET /api/chat/list`; table prefixes are stripped and invalid names skipped.
	pub async fn list_chats(&self, token: &AccessToken) -> Result<Vec<ChatName>, ClientCoreError> {
		let resp = self.get_authed("/api/chat/list", token).await?;
		let tables: Vec<String> = decode_json(resp, "chat/list").await?;

		let chats = tables
			.into_iter()
			.filter_map(|table| match ChatName::from_table_name(&table) {
				Ok(name) => Some(name),
				Err(e) => {
					warn!(%table, error = %e, "skipping chat with unusable name");
					None
				}
			})
			.collect::<Vec<_>>();

		debug!(count = chats.len(), "chat list fetched");
		Ok(chats)
	}

	/// `GET /api/chat/status/{chat}`.
	pub async fn chat_status(&self, token: &AccessToken, chat: &ChatName) -> Result<ChatStatus, ClientCoreError> {
		let resp = self
			.get_authed(&format!("/api/chat/status/{}", chat.as_str()), token)
			.await?;
		let body: StatusResponse = decode_json(resp, "chat/status").await?;
		Ok(ChatStatus::parse(&body.status))
	}

	/// `POST /api/chat/create/{chat}`; resolves once the server reports the room provisioned.
	pub async fn create_chat(&self, token: &AccessToken, chat: &ChatName) -> Result<String, ClientCoreError> {
		let resp = self
			.client
			.post(self.cfg.api.http_url(&format!("/api/chat/create/{}", chat.as_str())))
			.timeout(self.cfg.provision_timeout)
			.header("Authorization", token.bearer())
			.send()
			.await
			.map_err(|e| ClientCoreError::Http(format!("chat/create: {e}")))?;

		let resp = check_status(resp, true).await?;
		let body: CreateResponse = decode_json(resp, "chat/create").await?;
		Ok(body.message)
	}

	/// `GET /api/chat/history/{chat}?limit=N` (oldest first).
	pub async fn history(&self, chat: &ChatName, limit: u32) -> Result<Vec<ChatMessage>, ClientCoreError> {
		let resp = self
			.client
			.get(
				self.cfg
					.api
					.http_url(&format!("/api/chat/history/{}?limit={limit}", chat.as_str())),
			)
			.timeout(self.cfg.request_timeout)
			.send()
			.await
			.map_err(|e| ClientCoreError::Http(format!("chat/history: {e}")))?;

		let resp = check_status(resp, false).await?;
		decode_json(resp, "chat/history").await
	}

	async fn get_authed(&self, path: &str, token: &AccessToken) -> Result<reqwest::Response, ClientCoreError> {
		let resp = self
			.client
			.get(self.cfg.api.http_url(path))
			.timeout(self.cfg.request_timeout)
			.header("Authorization", token.bearer())
			.send()
			.await
			.map_err(|e| ClientCoreError::Http(format!("GET {path}: {e}")))?;
		check_status(resp, true).await
	}
}

async fn check_status(resp: reqwest::Response, authenticated: bool) -> Result<reqwest::Response, ClientCoreError> {
	let status = resp.status();
	if status.is_success() {
		return Ok(resp);
	}

	if authenticated && status == StatusCode::UNAUTHORIZED {
		return Err(ClientCoreError::Unauthorized);
	}

	let detail = resp.text().await.ok().and_then(|body| parse_detail(&body));
	Err(ClientCoreError::Rejected {
		status: status.as_u16(),
		detail,
	})
}

async fn decode_json<T: DeserializeOwned>(resp: reqwest::Response, what: &str) -> Result<T, ClientCoreError> {
	resp.json::<T>()
		.await
		.map_err(|e| ClientCoreError::Decode(format!("{what}: {e}")))
}

/// Extracts `detail` from an error body: either a string or a list of validation errors.
pub(crate) fn parse_detail(body: &str) -> Option<String> {
	let parsed: ErrorBody = serde_json::from_str(body).ok()?;
	match parsed.detail? {
		serde_json::Value::String(s) => (!s.trim().is_empty()).then_some(s),
		serde_json::Value::Array(items) => {
			let msgs: Vec<String> = items
				.iter()
				.filter_map(|item| item.get("msg").and_then(|m| m.as_str()).map(str::to_string))
				.collect();
			(!msgs.is_empty()).then(|| msgs.join("; "))
		}
		serde_json::Value::Null => None,
		other => Some(other.to_string()),
	}
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
	#[serde(default)]
	detail: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
	access_token: String,
	#[serde(default = "default_token_type")]
	token_type: String,
}

fn default_token_type() -> String {
	"bearer".to_string()
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
	status: String,
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
	#[serde(default)]
	message: String,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn detail_string() {
		assert_eq!(
			parse_detail(r#"{"detail":"Email already registered"}"#).as_deref(),
			Some("Email already registered")
		);
	}

	#[test]
	fn detail_validation_list() {
		let body = r#"{"detail":[{"type":"value_error","loc":["body","password"],"msg":"Value error, Password must be at least 12 characters long"},{"type":"x","loc":["body","email"],"msg":"not an email"}]}"#;
		assert_eq!(
			parse_detail(body).as_deref(),
			Some("Value error, Password must be at least 12 characters long; not an email")
		);
	}

	#[test]
	fn detail_missing_or_garbage() {
		assert_eq!(parse_detail("{}"), None);
		assert_eq!(parse_detail(r#"{"detail":null}"#), None);
		assert_eq!(parse_detail("<html>502</html>"), None);
		assert_eq!(parse_detail(r#"{"detail":"  "}"#), None);
	}
}
