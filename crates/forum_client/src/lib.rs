#![forbid(unsafe_code)]

#[macro_use]
extern crate rust_i18n;

i18n!("locales", fallback = "en");

pub mod app_state;
pub mod net;
pub mod reducer;
pub mod render;
pub mod settings;
pub mod token_store;

/// Switch the language of every user-facing string.
pub fn set_locale(locale: &str) {
	rust_i18n::set_locale(locale);
}
