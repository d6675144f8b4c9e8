use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context as _;
use forum_client_core::{ClientConfig, DEFAULT_API_URL};
use forum_domain::ChatName;
use forum_util::endpoint::validate_api_endpoint;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::net::SessionOptions;

pub const CURRENT_SETTINGS_VERSION: u32 = 1;

pub const AVAILABLE_LOCALES: &[&str] = &["en", "pl"];

const CHAT_LIST_POLL_RANGE_MS: (u64, u64) = (1_000, 60_000);
const READINESS_POLL_RANGE_MS: (u64, u64) = (200, 10_000);
const MAX_LOG_ITEMS_RANGE: (usize, usize) = (50, 20_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TokenStoreKind {
	#[default]
	File,
	Keyring,
	Memory,
}

impl FromStr for TokenStoreKind {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"file" => Ok(TokenStoreKind::File),
			"keyring" => Ok(TokenStoreKind::Keyring),
			"memory" => Ok(TokenStoreKind::Memory),
			other => Err(format!("unknown token store {other:?} (expected file, keyring or memory)")),
		}
	}
}

pub fn default_settings_version() -> u32 {
	CURRENT_SETTINGS_VERSION
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
	#[serde(default = "default_settings_version")]
	pub settings_version: u32,
	pub api_url: String,
	pub default_chat: String,
	pub chat_list_poll_ms: u64,
	pub readiness_poll_ms: u64,
	pub max_log_items: usize,
	pub locale: String,
	pub token_store: TokenStoreKind,
}

impl Default for ClientSettings {
	fn default() -> Self {
		Self {
			settings_version: default_settings_version(),
			api_url: DEFAULT_API_URL.to_string(),
			default_chat: ChatName::DEFAULT.to_string(),
			chat_list_poll_ms: 5_000,
			readiness_poll_ms: 1_000,
			max_log_items: 500,
			locale: "en".to_string(),
			token_store: TokenStoreKind::File,
		}
	}
}

impl ClientSettings {
	/// Replace unusable values with defaults and clamp intervals.
	pub fn sanitize(mut self) -> Self {
		let defaults = ClientSettings::default();

		if let Err(e) = validate_api_endpoint(&self.api_url) {
			warn!(api_url = %self.api_url, error = %e, "invalid api_url; using default");
			self.api_url = defaults.api_url.clone();
		}

		if let Err(e) = ChatName::new(self.default_chat.trim()) {
			warn!(default_chat = %self.default_chat, error = %e, "invalid default_chat; using default");
			self.default_chat = defaults.default_chat.clone();
		} else {
			self.default_chat = self.default_chat.trim().to_string();
		}

		self.chat_list_poll_ms = clamp_logged(
			"chat_list_poll_ms",
			self.chat_list_poll_ms,
			CHAT_LIST_POLL_RANGE_MS.0,
			CHAT_LIST_POLL_RANGE_MS.1,
		);
		self.readiness_poll_ms = clamp_logged(
			"readiness_poll_ms",
			self.readiness_poll_ms,
			READINESS_POLL_RANGE_MS.0,
			READINESS_POLL_RANGE_MS.1,
		);
		self.max_log_items = clamp_logged(
			"max_log_items",
			self.max_log_items,
			MAX_LOG_ITEMS_RANGE.0,
			MAX_LOG_ITEMS_RANGE.1,
		);

		if !AVAILABLE_LOCALES.contains(&self.locale.as_str()) {
			warn!(locale = %self.locale, "unsupported locale; using en");
			self.locale = defaults.locale;
		}

		self
	}

	pub fn default_chat(&self) -> ChatName {
		ChatName::new(self.default_chat.trim()).unwrap_or_else(|_| ChatName::default_room())
	}

	pub fn session_options(&self) -> SessionOptions {
		SessionOptions {
			default_chat: self.default_chat(),
			chat_list_poll: Duration::from_millis(self.chat_list_poll_ms),
			readiness_poll: Duration::from_millis(self.readiness_poll_ms),
		}
	}
}

fn clamp_logged<T>(name: &str, value: T, min: T, max: T) -> T
where
	T: Copy + Ord + std::fmt::Display,
{
	let clamped = value.clamp(min, max);
	if clamped != value {
		warn!("{} = {} out of range; using {}", name, value, clamped);
	}
	clamped
}

pub fn settings_dir() -> PathBuf {
	if let Some(cfg) = dirs::config_dir() {
		let mut dir = cfg;
		dir.push("forum");
		return dir;
	}

	if let Some(home) = dirs::home_dir() {
		let mut dir = home.join(".config");
		dir.push("forum");
		return dir;
	}

	let mut dir = PathBuf::from(".");
	dir.push("forum");
	dir
}

pub fn settings_path() -> PathBuf {
	let mut p = settings_dir();
	p.push("settings.toml");
	p
}

pub fn migrate_settings_toml(mut v: toml::Value) -> toml::Value {
	let version = v.get("settings_version").and_then(|x| x.as_integer()).unwrap_or(0) as u32;
	if version < CURRENT_SETTINGS_VERSION {
		if let Some(table) = v.as_table_mut() {
			// Unversioned files called the API base `server_url`.
			if let Some(old) = table.remove("server_url")
				&& !table.contains_key("api_url")
			{
				table.insert("api_url".to_string(), old);
			}
			table.insert(
				"settings_version".to_string(),
				toml::Value::Integer(CURRENT_SETTINGS_VERSION as i64),
			);
		} else {
			let mut tbl = toml::map::Map::new();
			tbl.insert(
				"settings_version".to_string(),
				toml::Value::Integer(CURRENT_SETTINGS_VERSION as i64),
			);
			return toml::Value::Table(tbl);
		}
	}
	v
}

/// Load settings from `path`; a missing file yields defaults.
pub fn load_from_path(path: &Path) -> anyhow::Result<ClientSettings> {
	info!("loading settings from {}", path.display());
	let data = match fs::read_to_string(path) {
		Ok(d) => d,
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
			info!("no settings file at {}; using defaults", path.display());
			return Ok(ClientSettings::default());
		}
		Err(e) => return Err(e).with_context(|| format!("read settings file {}", path.display())),
	};

	let v = toml::from_str::<toml::Value>(&data).with_context(|| format!("parse settings TOML {}", path.display()))?;
	let v = migrate_settings_toml(v);
	let pretty = toml::to_string_pretty(&v).context("serialize migrated settings")?;
	let settings = toml::from_str::<ClientSettings>(&pretty).context("deserialize migrated settings")?;
	Ok(settings)
}

/// Load from the default location, apply environment overrides and sanitize.
pub fn load() -> anyhow::Result<ClientSettings> {
	let mut settings = load_from_path(&settings_path())?;
	apply_env_overrides(&mut settings);
	Ok(settings.sanitize())
}

pub fn persist_to_path(settings: &ClientSettings, path: &Path) -> anyhow::Result<()> {
	if let Some(parent) = path.parent() {
		fs::create_dir_all(parent).with_context(|| format!("create settings dir {}", parent.display()))?;
	}
	let data = toml::to_string_pretty(settings).context("serialize settings")?;
	let len = data.len();
	fs::write(path, data).with_context(|| format!("write settings file {}", path.display()))?;
	info!("wrote settings file {} ({} bytes)", path.display(), len);
	Ok(())
}

pub fn apply_env_overrides(settings: &mut ClientSettings) {
	apply_overrides_from(settings, |key| std::env::var(key).ok());
}

fn apply_overrides_from(settings: &mut ClientSettings, lookup: impl Fn(&str) -> Option<String>) {
	if let Some(v) = lookup("FORUM_API_URL") {
		let v = v.trim().to_string();
		if !v.is_empty() {
			settings.api_url = v;
			info!("settings: api_url overridden by env");
		}
	}

	if let Some(v) = lookup("FORUM_DEFAULT_CHAT") {
		let v = v.trim().to_string();
		if !v.is_empty() {
			settings.default_chat = v;
			info!("settings: default_chat overridden by env");
		}
	}

	if let Some(v) = lookup("FORUM_LOCALE") {
		let v = v.trim().to_string();
		if !v.is_empty() {
			settings.locale = v;
			info!("settings: locale overridden by env");
		}
	}

	if let Some(v) = lookup("FORUM_TOKEN_STORE") {
		match v.parse::<TokenStoreKind>() {
			Ok(kind) => {
				settings.token_store = kind;
				info!("settings: token_store overridden by env");
			}
			Err(e) => warn!("ignoring FORUM_TOKEN_STORE: {}", e),
		}
	}
}

pub fn build_client_config(settings: &ClientSettings) -> Result<ClientConfig, String> {
	let endpoint = settings.api_url.trim();
	if endpoint.is_empty() {
		return Ok(ClientConfig::default());
	}
	validate_api_endpoint(endpoint).map_err(|err| format!("Invalid API endpoint: {err}"))?;
	let mut cfg = ClientConfig::from_api_url(endpoint).map_err(|err| format!("Invalid API endpoint: {err}"))?;
	cfg.user_agent = format!("forum/{}", env!("CARGO_PKG_VERSION"));
	Ok(cfg)
}
