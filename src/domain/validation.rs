//! Field-level validation rules shared by request payloads and value objects.
//!
//! The functions returning `Result<(), ValidationError>` plug into
//! `#[validate(custom(function = "..."))]`.

use std::borrow::Cow;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use validator::{ValidateEmail, ValidationError};

use crate::config::{MIN_PASSWORD_LENGTH, PASSWORD_SPECIAL_CHARS};

pub const PASSWORD_STRENGTH_MESSAGE: &str = "Password must contain at least one uppercase letter, one lowercase letter, one number, and one special character";

pub const PASSWORDS_DO_NOT_MATCH: &str = "Passwords do not match";

/// Whether `value` satisfies the password policy: at least
/// `MIN_PASSWORD_LENGTH` characters drawn only from letters, digits and
/// `@$!%*?&`, with one of each class present.
pub fn is_strong_password(value: &str) -> bool {
    let is_special = |c: char| PASSWORD_SPECIAL_CHARS.contains(c);

    value.chars().count() >= MIN_PASSWORD_LENGTH
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || is_special(c))
        && value.chars().any(|c| c.is_ascii_lowercase())
        && value.chars().any(|c| c.is_ascii_uppercase())
        && value.chars().any(|c| c.is_ascii_digit())
        && value.chars().any(is_special)
}

/// A request field as the client sent it.
///
/// Deserializing never fails: an absent or `null` value is `Missing` and a
/// value of the wrong shape is kept as `Invalid`, so a whole payload can be
/// checked by `validator` in one pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Input<T> {
    Missing,
    Invalid(Value),
    Present(T),
}

impl<T> Default for Input<T> {
    fn default() -> Self {
        Input::Missing
    }
}

impl<T> From<T> for Input<T> {
    fn from(value: T) -> Self {
        Input::Present(value)
    }
}

impl<T> Input<T> {
    pub fn is_missing(&self) -> bool {
        matches!(self, Input::Missing)
    }

    pub fn as_present(&self) -> Option<&T> {
        match self {
            Input::Present(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Input::Present(value) => Some(value),
            _ => None,
        }
    }

    /// The value, or `fallback()` when it was not usable.
    pub fn or_else(self, fallback: impl FnOnce() -> T) -> T {
        self.into_option().unwrap_or_else(fallback)
    }

    pub fn or_default(self) -> T
    where
        T: Default,
    {
        self.into_option().unwrap_or_default()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Input<U> {
        match self {
            Input::Missing => Input::Missing,
            Input::Invalid(raw) => Input::Invalid(raw),
            Input::Present(value) => Input::Present(f(value)),
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Input<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        if raw.is_null() {
            return Ok(Input::Missing);
        }
        Ok(match T::deserialize(&raw) {
            Ok(value) => Input::Present(value),
            Err(_) => Input::Invalid(raw),
        })
    }
}

impl<T: Serialize> Serialize for Input<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Input::Missing => serializer.serialize_none(),
            Input::Invalid(raw) => raw.serialize(serializer),
            Input::Present(value) => value.serialize(serializer),
        }
    }
}

impl ValidateEmail for Input<String> {
    fn as_email_string(&self) -> Option<Cow<str>> {
        self.as_present().map(|s| Cow::from(s.as_str()))
    }
}

/// Fails with code `required` when the field was not sent.
pub fn required<T>(input: &Input<T>) -> Result<(), ValidationError> {
    if input.is_missing() {
        Err(ValidationError::new("required"))
    } else {
        Ok(())
    }
}

/// Fails with code `invalid` when the field could not be read as its type.
pub fn well_formed<T>(input: &Input<T>) -> Result<(), ValidationError> {
    match input {
        Input::Invalid(_) => Err(ValidationError::new("invalid")),
        _ => Ok(()),
    }
}

pub fn password_strength(value: &Input<String>) -> Result<(), ValidationError> {
    match value.as_present() {
        Some(password) if !is_strong_password(password) => {
            Err(error("password_strength", PASSWORD_STRENGTH_MESSAGE))
        }
        _ => Ok(()),
    }
}

/// Rejects empty or whitespace-only strings.
pub fn not_blank(value: &Input<String>) -> Result<(), ValidationError> {
    match value.as_present() {
        Some(text) if text.trim().is_empty() => Err(ValidationError::new("not_blank")),
        _ => Ok(()),
    }
}

/// Build a `ValidationError` carrying a human-readable message.
pub fn error(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}
