use chrono::{DateTime, Local, NaiveDateTime, Utc};
use rust_i18n::t;

use crate::app_state::{AppState, ConnectionStatus, DisplayMessage};
use crate::reducer::NoticeKind;

/// Server timestamps are ISO-8601; naive ones are UTC.
pub fn parse_timestamp(ts: &str) -> Option<DateTime<Utc>> {
	let ts = ts.trim();
	if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
		return Some(dt.with_timezone(&Utc));
	}
	NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S%.f")
		.ok()
		.map(|naive| naive.and_utc())
}

/// Local wall-clock time for a message, or the raw value if it does not parse.
pub fn format_time(ts: &str) -> String {
	match parse_timestamp(ts) {
		Some(dt) => dt.with_timezone(&Local).format("%H:%M:%S").to_string(),
		None => ts.to_string(),
	}
}

pub fn format_message(msg: &DisplayMessage) -> String {
	let marker = if msg.is_own { '>' } else { ' ' };
	format!("[{}]{marker}{}: {}", format_time(&msg.timestamp), msg.username, msg.text)
}

pub fn format_notice(kind: NoticeKind, text: &str) -> String {
	match kind {
		NoticeKind::Info => format!("* {text}"),
		NoticeKind::Warning => format!("! {text}"),
		NoticeKind::Error => format!("!! {text}"),
	}
}

pub fn prompt(state: &AppState) -> String {
	let suffix = match &state.connection {
		ConnectionStatus::Connected => "",
		_ => "?",
	};
	format!("#{}{suffix}> ", state.selected)
}

/// Room list with the selected room marked.
pub fn format_rooms(state: &AppState) -> String {
	if state.chats.is_empty() {
		return t!("rooms.none").to_string();
	}
	let mut out = t!("rooms.header").to_string();
	for chat in &state.chats {
		let mark = if *chat == state.selected { '*' } else { ' ' };
		out.push_str(&format!("\n {mark} #{chat}"));
	}
	out
}
