use serde::Serialize;
use thiserror::Error;

pub const MIN_USERNAME_CHARS: usize = 3;
pub const MIN_PASSWORD_CHARS: usize = 12;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationError {
	#[error("username must be at least 3 characters long")]
	UsernameTooShort,
	#[error("enter a valid email address")]
	InvalidEmail,
	#[error("password must be at least 12 characters long")]
	PasswordTooShort,
	#[error("passwords do not match")]
	PasswordMismatch,
}

/// Raw input of the sign-up form.
#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
	pub username: String,
	pub email: String,
	pub password: String,
	pub confirm_password: String,
}

/// Body of `POST /api/register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewUser {
	pub username: String,
	pub email: String,
	pub password: String,
}

impl RegistrationForm {
	/// Checks run in the order a user would fix them; the first failure wins.
	pub fn validate(&self) -> Result<NewUser, RegistrationError> {
		if self.username.chars().count() < MIN_USERNAME_CHARS {
			return Err(RegistrationError::UsernameTooShort);
		}
		if !is_plausible_email(&self.email) {
			return Err(RegistrationError::InvalidEmail);
		}
		if self.password.chars().count() < MIN_PASSWORD_CHARS {
			return Err(RegistrationError::PasswordTooShort);
		}
		if self.password != self.confirm_password {
			return Err(RegistrationError::PasswordMismatch);
		}

		Ok(NewUser {
			username: self.username.clone(),
			email: self.email.clone(),
			password: self.password.clone(),
		})
	}
}

/// `local@domain.tld`: no whitespace, a single `@`, and a dot inside the domain.
fn is_plausible_email(email: &str) -> bool {
	if email.chars().any(char::is_whitespace) {
		return false;
	}

	let Some((local, domain)) = email.split_once('@') else {
		return false;
	};
	if local.is_empty() || domain.contains('@') {
		return false;
	}

	domain
		.char_indices()
		.any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn form(username: &str, email: &str, password: &str, confirm: &str) -> RegistrationForm {
		RegistrationForm {
			username: username.into(),
			email: email.into(),
			password: password.into(),
			confirm_password: confirm.into(),
		}
	}

	#[test]
	fn accepts_valid_form() {
		let user = form("bob", "bob@example.com", "correct horse", "correct horse")
			.validate()
			.unwrap();
		assert_eq!(user.username, "bob");
		assert_eq!(user.email, "bob@example.com");
	}

	#[test]
	fn first_failing_rule_is_reported() {
		assert_eq!(
			form("bo", "nope", "short", "other").validate(),
			Err(RegistrationError::UsernameTooShort)
		);
		assert_eq!(
			form("bob", "nope", "short", "other").validate(),
			Err(RegistrationError::InvalidEmail)
		);
		assert_eq!(
			form("bob", "bob@example.com", "short", "other").validate(),
			Err(RegistrationError::PasswordTooShort)
		);
		assert_eq!(
			form("bob", "bob@example.com", "long enough pw", "long enough pX").validate(),
			Err(RegistrationError::PasswordMismatch)
		);
	}

	#[test]
	fn email_shapes() {
		for ok in ["a@b.c", "first.last@mail.example.org", "x@y.z.w"] {
			assert!(is_plausible_email(ok), "{ok}");
		}
		for bad in ["", "a@b", "@b.c", "a@.c", "a@b.", "a b@c.d", "a@b@c.d", "plain"] {
			assert!(!is_plausible_email(bad), "{bad}");
		}
	}
}
