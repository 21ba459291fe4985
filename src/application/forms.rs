//! Submitted form payloads and their field-level validation.
//!
//! Each form deserializes from an `application/x-www-form-urlencoded` body
//! with every field optional, then `clean` turns it into a typed input or a
//! [`FormErrors`] map keyed by field name.

use std::collections::BTreeMap;

use serde::Deserialize;
use time::OffsetDateTime;

use crate::domain::{
    entities::PostRecord,
    posts::MAX_TITLE_CHARS,
    users::{MAX_NAME_CHARS, validate_password, validate_username},
};
use crate::util::datetime::{matches_input_precision, parse_datetime};

pub const FIELD_REQUIRED: &str = "This field is required.";
const NON_FIELD: &str = "__all__";

/// Validation messages grouped by field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    fields: BTreeMap<&'static str, Vec<String>>,
}

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.entry(field).or_default().push(message.into());
    }

    pub fn add_non_field(&mut self, message: impl Into<String>) {
        self.add(NON_FIELD, message);
    }

    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn non_field(&self) -> &[String] {
        self.get(NON_FIELD)
    }

    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.keys().copied()
    }

    fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

fn required<'a>(errors: &mut FormErrors, field: &'static str, value: &'a str) -> &'a str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.add(field, FIELD_REQUIRED);
    }
    trimmed
}

fn parse_checkbox(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "1" | "yes" => Some(true),
        "" | "off" | "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn parse_id(errors: &mut FormErrors, field: &'static str, value: &str) -> Option<i64> {
    match value.trim().parse::<i64>() {
        Ok(id) if id > 0 => Some(id),
        _ => {
            errors.add(field, "Select a valid choice.");
            None
        }
    }
}

/// Post editor payload: `title`, `text`, `pub_date`, `category` required,
/// `location` and `is_published` optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PostForm {
    pub title: String,
    pub text: String,
    pub pub_date: Option<String>,
    pub category: String,
    pub location: Option<String>,
    pub is_published: Option<String>,
}

/// A validated post payload; related ids still need to be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostInput {
    pub title: String,
    pub text: String,
    pub pub_date: OffsetDateTime,
    pub category_id: i64,
    pub location_id: Option<i64>,
    pub is_published: bool,
}

impl PostForm {
    /// Prefill the editor from a stored post.
    pub fn from_record(post: &PostRecord) -> Self {
        Self {
            title: post.title.clone(),
            text: post.text.clone(),
            pub_date: Some(crate::util::datetime::format_input(post.pub_date)),
            category: post.category_id.map(|id| id.to_string()).unwrap_or_default(),
            location: post.location_id.map(|id| id.to_string()),
            is_published: Some(post.is_published.to_string()),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.clean(None).is_ok()
    }

    /// Validate the submission. When `existing` is given, fields that were not
    /// submitted at all keep the stored value.
    pub fn clean(&self, existing: Option<&PostRecord>) -> Result<PostInput, FormErrors> {
        let mut errors = FormErrors::new();

        let title = required(&mut errors, "title", &self.title);
        if title.chars().count() > MAX_TITLE_CHARS {
            errors.add(
                "title",
                format!("Ensure this value has at most {MAX_TITLE_CHARS} characters."),
            );
        }
        let text = required(&mut errors, "text", &self.text);

        let pub_date = match (self.pub_date.as_deref(), existing) {
            (None, Some(post)) => Some(post.pub_date),
            (None, None) => {
                errors.add("pub_date", FIELD_REQUIRED);
                None
            }
            (Some(raw), _) if raw.trim().is_empty() => {
                errors.add("pub_date", FIELD_REQUIRED);
                None
            }
            (Some(raw), existing) => match parse_datetime(raw) {
                Some(parsed) => match existing {
                    Some(post) if matches_input_precision(post.pub_date, parsed) => {
                        Some(post.pub_date)
                    }
                    _ => Some(parsed),
                },
                None => {
                    errors.add("pub_date", "Enter a valid date/time.");
                    None
                }
            },
        };

        let category_raw = required(&mut errors, "category", &self.category);
        let category_id = if category_raw.is_empty() {
            None
        } else {
            parse_id(&mut errors, "category", category_raw)
        };

        let location_id = match (self.location.as_deref(), existing) {
            (None, Some(post)) => post.location_id,
            (None, None) => None,
            (Some(raw), _) if raw.trim().is_empty() => None,
            (Some(raw), _) => parse_id(&mut errors, "location", raw),
        };

        let is_published = match self.is_published.as_deref() {
            None => existing.is_none_or(|post| post.is_published),
            Some(raw) => match parse_checkbox(raw) {
                Some(flag) => flag,
                None => {
                    errors.add("is_published", "Enter a valid boolean.");
                    false
                }
            },
        };

        match (pub_date, category_id) {
            (Some(pub_date), Some(category_id)) => errors.into_result(|| PostInput {
                title: title.to_string(),
                text: text.to_string(),
                pub_date,
                category_id,
                location_id,
                is_published,
            }),
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CommentForm {
    pub text: String,
}

impl CommentForm {
    pub fn is_valid(&self) -> bool {
        self.clean().is_ok()
    }

    pub fn clean(&self) -> Result<String, FormErrors> {
        let mut errors = FormErrors::new();
        let text = required(&mut errors, "text", &self.text);
        errors.into_result(|| text.to_string())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegistrationForm {
    pub username: String,
    pub email: String,
    pub password1: String,
    pub password2: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegistrationForm {
    pub fn clean(&self) -> Result<RegistrationInput, FormErrors> {
        let mut errors = FormErrors::new();

        let username = required(&mut errors, "username", &self.username);
        if !username.is_empty()
            && let Err(err) = validate_username(username)
        {
            errors.add("username", domain_message(&err));
        }

        let email = self.email.trim();
        if !email.is_empty() && !email.contains('@') {
            errors.add("email", "Enter a valid email address.");
        }

        if self.password1.is_empty() {
            errors.add("password1", FIELD_REQUIRED);
        }
        if self.password2.is_empty() {
            errors.add("password2", FIELD_REQUIRED);
        }
        if !self.password1.is_empty() && !self.password2.is_empty() {
            if self.password1 != self.password2 {
                errors.add("password2", "The two password fields didn't match.");
            } else if let Err(err) = validate_password(&self.password1) {
                errors.add("password2", domain_message(&err));
            }
        }

        errors.into_result(|| RegistrationInput {
            username: username.to_string(),
            email: email.to_string(),
            password: self.password1.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub next: Option<String>,
}

impl LoginForm {
    pub fn clean(&self) -> Result<(String, String), FormErrors> {
        let mut errors = FormErrors::new();
        let username = required(&mut errors, "username", &self.username);
        if self.password.is_empty() {
            errors.add("password", FIELD_REQUIRED);
        }
        errors.into_result(|| (username.to_string(), self.password.clone()))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProfileForm {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileInput {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl ProfileForm {
    pub fn from_user(user: &crate::domain::entities::UserRecord) -> Self {
        Self {
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
        }
    }

    pub fn clean(&self) -> Result<ProfileInput, FormErrors> {
        let mut errors = FormErrors::new();

        let username = required(&mut errors, "username", &self.username);
        if !username.is_empty()
            && let Err(err) = validate_username(username)
        {
            errors.add("username", domain_message(&err));
        }

        let email = self.email.trim();
        if !email.is_empty() && !email.contains('@') {
            errors.add("email", "Enter a valid email address.");
        }

        for (field, value) in [("first_name", &self.first_name), ("last_name", &self.last_name)] {
            if value.chars().count() > MAX_NAME_CHARS {
                errors.add(
                    field,
                    format!("Ensure this value has at most {MAX_NAME_CHARS} characters."),
                );
            }
        }

        errors.into_result(|| ProfileInput {
            username: username.to_string(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: email.to_string(),
        })
    }
}

pub(crate) fn domain_message(err: &crate::domain::error::DomainError) -> String {
    match err {
        crate::domain::error::DomainError::Validation { message } => {
            let mut chars = message.chars();
            match chars.next() {
                Some(first) => format!("{}{}.", first.to_uppercase(), chars.as_str()),
                None => String::new(),
            }
        }
        other => other.to_string(),
    }
}
