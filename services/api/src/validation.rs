//! Input validation utilities
//!
//! [`FieldCheck`] reads fields out of a [`FormPayload`] and collects one
//! message per problem, so a client learns about every missing field at
//! once.

use regex::Regex;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::{ApiError, ApiResult};
use crate::extract::{FormPayload, UploadedFile};

/// Collects field problems while reading a payload
pub struct FieldCheck<'a> {
    form: &'a FormPayload,
    errors: Vec<String>,
}

impl<'a> FieldCheck<'a> {
    pub fn new(form: &'a FormPayload) -> Self {
        Self {
            form,
            errors: Vec::new(),
        }
    }

    /// Record a problem found outside of the field readers
    pub fn reject(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// A mandatory text field
    pub fn required(&mut self, name: &str, label: &str) -> String {
        match self.form.text(name) {
            Some(value) => value.to_string(),
            None => {
                self.errors.push(format!("{} is required.", label));
                String::new()
            }
        }
    }

    /// An optional text field
    pub fn optional(&self, name: &str) -> Option<String> {
        self.form.text(name).map(str::to_owned)
    }

    /// A mandatory list field with at least one item
    pub fn required_list(&mut self, name: &str, label: &str) -> Vec<String> {
        match self.form.list(name) {
            Some(items) if !items.is_empty() => items,
            _ => {
                self.errors.push(format!("{} is required.", label));
                Vec::new()
            }
        }
    }

    /// An optional list field; an empty list is reported as a problem
    pub fn optional_list(&mut self, name: &str, label: &str) -> Option<Vec<String>> {
        let items = self.form.list(name)?;
        if items.is_empty() {
            self.errors.push(format!("{} cannot be empty.", label));
            return None;
        }
        Some(items)
    }

    /// An optional field parsed into `T`
    pub fn parsed<T: FromStr>(&mut self, name: &str, label: &str) -> Option<T> {
        let raw = self.form.text(name)?;
        match raw.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                self.errors.push(format!("{} is not valid: {}.", label, raw));
                None
            }
        }
    }

    /// A mandatory field parsed into `T`
    pub fn required_parsed<T: FromStr>(&mut self, name: &str, label: &str) -> Option<T> {
        if self.form.text(name).is_none() {
            self.errors.push(format!("{} is required.", label));
            return None;
        }
        self.parsed(name, label)
    }

    /// A mandatory single file
    pub fn required_file(&mut self, name: &str, label: &str) -> Option<&'a UploadedFile> {
        let form: &'a FormPayload = self.form;
        match form.file(name) {
            Ok(Some(file)) => Some(file),
            Ok(None) => {
                self.errors.push(format!("{} is required.", label));
                None
            }
            Err(e) => {
                self.errors.push(e.to_string());
                None
            }
        }
    }

    /// An optional single file
    pub fn optional_file(&mut self, name: &str) -> Option<&'a UploadedFile> {
        let form: &'a FormPayload = self.form;
        match form.file(name) {
            Ok(file) => file,
            Err(e) => {
                self.errors.push(e.to_string());
                None
            }
        }
    }

    /// Fail with every collected message, if any
    pub fn finish(self) -> ApiResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self.errors))
        }
    }
}

/// Unwrap a value whose absence was already recorded by a [`FieldCheck`]
pub fn checked<T>(value: Option<T>, label: &str) -> ApiResult<T> {
    value.ok_or_else(|| ApiError::validation(format!("{} is required.", label)))
}

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.len() > 254 {
        return Err("Email must be at most 254 characters long.".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("Please provide a valid email.".to_string());
    }

    Ok(())
}

/// Validate password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < 8 {
        return Err("Password must be at least 8 characters long.".to_string());
    }

    if password.len() > 128 {
        return Err("Password must be at most 128 characters long.".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_are_all_reported() {
        let mut form = FormPayload::default();
        form.push_field("title", "Portfolio");

        let mut check = FieldCheck::new(&form);
        assert_eq!(check.required("title", "Title"), "Portfolio");
        check.required("description", "Description");
        check.required_list("technologies", "Technologies");
        assert!(check.required_file("projectBanner", "Project banner").is_none());

        let err = check.finish().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Description is required. Technologies is required. Project banner is required."
        );
    }

    #[test]
    fn test_parsed_reports_bad_values() {
        let mut form = FormPayload::default();
        form.push_field("proficiency", "lots");

        let mut check = FieldCheck::new(&form);
        assert_eq!(check.parsed::<u8>("proficiency", "Proficiency"), None);
        assert_eq!(check.parsed::<u8>("missing", "Missing"), None);
        assert_eq!(
            check.finish().unwrap_err().to_string(),
            "Proficiency is not valid: lots."
        );
    }

    #[test]
    fn test_empty_optional_list_is_rejected() {
        let mut form = FormPayload::default();
        form.push_field("skills", " , ");

        let mut check = FieldCheck::new(&form);
        assert_eq!(check.optional_list("skills", "Skills"), None);
        assert!(check.finish().is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("owner@example.com").is_ok());
        assert!(validate_email("owner@example").is_err());
        assert!(validate_email("not an email").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("long enough").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_password(&"x".repeat(129)).is_err());
    }
}
