#![forbid(unsafe_code)]

pub mod endpoint {
	use url::Url;

	/// Parsed `http(s)://host[:port][/prefix]` API base.
	#[derive(Debug, Clone, PartialEq, Eq, Hash)]
	pub struct ApiEndpoint {
		/// Normalized base without a trailing slash.
		base: String,
		secure: bool,
	}

	impl ApiEndpoint {
		/// Parse an API base URL in the form `http://host[:port]` or `https://host[:port]`.
		pub fn parse(s: &str) -> Result<Self, String> {
			let s = s.trim();
			if s.is_empty() {
				return Err("endpoint must be non-empty (expected http(s)://host[:port])".to_string());
			}

			let url = Url::parse(s).map_err(|e| format!("invalid endpoint {s}: {e}"))?;

			let secure = match url.scheme() {
				"https" => true,
				"http" => false,
				other => {
					return Err(format!(
						"invalid endpoint scheme {other:?} (expected http(s)://host[:port]): {s}"
					));
				}
			};

			if url.host_str().is_none_or(|h| h.is_empty()) {
				return Err(format!("invalid endpoint host (expected http(s)://host[:port]): {s}"));
			}

			if url.query().is_some() || url.fragment().is_some() {
				return Err(format!(
					"invalid endpoint (expected http(s)://host[:port] without query/fragment): {s}"
				));
			}

			if !url.username().is_empty() || url.password().is_some() {
				return Err(format!("invalid endpoint (credentials are not allowed in the URL): {s}"));
			}

			Ok(Self {
				base: url.as_str().trim_end_matches('/').to_string(),
				secure,
			})
		}

		/// True for `https` bases (sockets then use `wss`).
		pub fn is_secure(&self) -> bool {
			self.secure
		}

		pub fn as_str(&self) -> &str {
			&self.base
		}

		/// Absolute REST URL for `path` (which should start with `/`).
		pub fn http_url(&self, path: &str) -> String {
			format!("{}{}", self.base, path)
		}

		/// WebSocket base: `https` becomes `wss`, `http` becomes `ws`.
		pub fn ws_base(&self) -> String {
			match self.base.split_once("://") {
				Some((_, rest)) if self.secure => format!("wss://{rest}"),
				Some((_, rest)) => format!("ws://{rest}"),
				None => self.base.clone(),
			}
		}

		/// Absolute socket URL for `path`.
		pub fn ws_url(&self, path: &str) -> String {
			format!("{}{}", self.ws_base(), path)
		}
	}

	impl std::fmt::Display for ApiEndpoint {
		fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
			f.write_str(&self.base)
		}
	}

	/// Validate `http(s)://host[:port]`.
	pub fn validate_api_endpoint(s: &str) -> Result<(), String> {
		let _ = ApiEndpoint::parse(s)?;
		Ok(())
	}

	#[cfg(test)]
	mod tests {
		use super::*;

		#[test]
		fn parses_https_hostname() {
			let e = ApiEndpoint::parse("https://forum.example.com").unwrap();
			assert!(e.is_secure());
			assert_eq!(e.as_str(), "https://forum.example.com");
			assert_eq!(e.http_url("/api/chat/list"), "https://forum.example.com/api/chat/list");
			assert_eq!(e.ws_url("/api/ws/chat/main"), "wss://forum.example.com/api/ws/chat/main");
		}

		#[test]
		fn parses_http_with_port_and_trailing_slash() {
			let e = ApiEndpoint::parse("  http://127.0.0.1:8000/ ").unwrap();
			assert!(!e.is_secure());
			assert_eq!(e.as_str(), "http://127.0.0.1:8000");
			assert_eq!(e.ws_base(), "ws://127.0.0.1:8000");
		}

		#[test]
		fn keeps_path_prefix() {
			let e = ApiEndpoint::parse("https://example.com/forum/").unwrap();
			assert_eq!(e.http_url("/api/token"), "https://example.com/forum/api/token");
			assert_eq!(e.ws_url("/api/ws/chat/a"), "wss://example.com/forum/api/ws/chat/a");
		}

		#[test]
		fn parses_bracketed_ipv6() {
			let e = ApiEndpoint::parse("http://[::1]:8000").unwrap();
			assert_eq!(e.ws_base(), "ws://[::1]:8000");
		}

		#[test]
		fn rejects_other_schemes_and_garbage() {
			assert!(ApiEndpoint::parse("").is_err());
			assert!(ApiEndpoint::parse("ftp://example.com").is_err());
			assert!(ApiEndpoint::parse("ws://example.com").is_err());
			assert!(ApiEndpoint::parse("example.com").is_err());
		}

		#[test]
		fn rejects_query_fragment_and_credentials() {
			assert!(ApiEndpoint::parse("https://example.com/?x=y").is_err());
			assert!(ApiEndpoint::parse("https://example.com/#frag").is_err());
			assert!(ApiEndpoint::parse("https://user:pw@example.com").is_err());
		}

		#[test]
		fn validate_helper() {
			assert!(validate_api_endpoint("http://localhost:8000").is_ok());
			assert!(validate_api_endpoint("quic://localhost:8000").is_err());
		}
	}
}
