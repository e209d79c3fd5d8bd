//! Site owner model, credentials and password reset tokens

use anyhow::Result;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use chrono::{DateTime, Duration, Utc};
use common::document::Document;
use common::storage::StoredAsset;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::extract::{FormPayload, UploadedFile};
use crate::validation::{FieldCheck, checked, validate_email, validate_password};

/// Lifetime of a password reset token
pub const RESET_TOKEN_TTL_MINUTES: i64 = 15;

/// Public profile links
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocialLinks {
    #[serde(rename = "portfolioURL")]
    pub portfolio_url: String,
    #[serde(rename = "githubURL", default, skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
    #[serde(rename = "instagramURL", default, skip_serializing_if = "Option::is_none")]
    pub instagram_url: Option<String>,
    #[serde(rename = "twitterURL", default, skip_serializing_if = "Option::is_none")]
    pub twitter_url: Option<String>,
    #[serde(rename = "linkedInURL", default, skip_serializing_if = "Option::is_none")]
    pub linkedin_url: Option<String>,
    #[serde(rename = "facebookURL", default, skip_serializing_if = "Option::is_none")]
    pub facebook_url: Option<String>,
}

/// Links present in a request; absent ones are left untouched
#[derive(Debug, Default)]
pub struct SocialLinksUpdate {
    pub portfolio_url: Option<String>,
    pub github_url: Option<String>,
    pub instagram_url: Option<String>,
    pub twitter_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub facebook_url: Option<String>,
}

impl SocialLinksUpdate {
    fn read(check: &FieldCheck<'_>) -> Self {
        Self {
            portfolio_url: check.optional("portfolioURL"),
            github_url: check.optional("githubURL"),
            instagram_url: check.optional("instagramURL"),
            twitter_url: check.optional("twitterURL"),
            linkedin_url: check.optional("linkedInURL"),
            facebook_url: check.optional("facebookURL"),
        }
    }

    pub fn apply(&self, links: &mut SocialLinks) {
        if let Some(url) = &self.portfolio_url {
            links.portfolio_url = url.clone();
        }
        for (update, slot) in [
            (&self.github_url, &mut links.github_url),
            (&self.instagram_url, &mut links.instagram_url),
            (&self.twitter_url, &mut links.twitter_url),
            (&self.linkedin_url, &mut links.linkedin_url),
            (&self.facebook_url, &mut links.facebook_url),
        ] {
            if update.is_some() {
                slot.clone_from(update);
            }
        }
    }
}

/// User entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub about_me: String,
    /// Argon2 PHC string
    pub password: String,
    pub avatar: StoredAsset,
    pub resume: StoredAsset,
    #[serde(flatten)]
    pub links: SocialLinks,
    #[serde(default)]
    pub reset_password_token: Option<String>,
    #[serde(default)]
    pub reset_password_expire: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Document for User {
    const KIND: &'static str = "user";
    const UNIQUE_FIELDS: &'static [&'static str] = &["email"];

    fn id(&self) -> Uuid {
        self.id
    }
}

impl User {
    /// Verify a user's password
    pub fn verify_password(&self, password: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(&self.password)
            .map_err(|e| anyhow::anyhow!("Failed to parse password hash: {}", e))?;

        let argon2 = Argon2::default();
        let result = argon2.verify_password(password.as_bytes(), &parsed_hash);

        Ok(result.is_ok())
    }

    /// Store a fresh reset token and return its clear form
    ///
    /// Only the SHA-256 digest is kept on the document.
    pub fn issue_reset_token(&mut self) -> String {
        let mut bytes = [0u8; 20];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = hex::encode(bytes);

        self.reset_password_token = Some(hash_reset_token(&token));
        self.reset_password_expire = Some(Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES));
        token
    }

    /// Forget any pending reset token
    pub fn clear_reset_token(&mut self) {
        self.reset_password_token = None;
        self.reset_password_expire = None;
    }

    /// Whether the pending reset token is still usable at `now`
    pub fn reset_token_active(&self, now: DateTime<Utc>) -> bool {
        self.reset_password_token.is_some()
            && self.reset_password_expire.is_some_and(|expire| expire > now)
    }
}

/// Hash a password with a random salt
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();
    Ok(password_hash)
}

/// Digest under which a reset token is stored and looked up
pub fn hash_reset_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// User as returned to clients
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub about_me: String,
    pub avatar: StoredAsset,
    pub resume: StoredAsset,
    #[serde(flatten)]
    pub links: SocialLinks,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            about_me: user.about_me.clone(),
            avatar: user.avatar.clone(),
            resume: user.resume.clone(),
            links: user.links.clone(),
            created_at: user.created_at,
        }
    }
}

fn check_email(check: &mut FieldCheck<'_>, email: &str) {
    if !email.is_empty() {
        if let Err(message) = validate_email(email) {
            check.reject(message);
        }
    }
}

fn check_password(check: &mut FieldCheck<'_>, password: &str) {
    if !password.is_empty() {
        if let Err(message) = validate_password(password) {
            check.reject(message);
        }
    }
}

fn check_confirmation(check: &mut FieldCheck<'_>, password: &str, confirmation: &str) {
    if !password.is_empty() && !confirmation.is_empty() && password != confirmation {
        check.reject("Password and confirmation do not match.");
    }
}

/// Request for user registration
pub struct RegisterRequest<'a> {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub about_me: String,
    pub password: String,
    pub links: SocialLinks,
    pub avatar: &'a UploadedFile,
    pub resume: &'a UploadedFile,
}

impl<'a> RegisterRequest<'a> {
    pub fn from_form(form: &'a FormPayload) -> ApiResult<Self> {
        let mut check = FieldCheck::new(form);
        let full_name = check.required("fullName", "Full name");
        let email = check.required("email", "Email");
        let phone = check.required("phone", "Phone");
        let about_me = check.required("aboutMe", "About me");
        let password = check.required("password", "Password");
        let mut links = SocialLinks {
            portfolio_url: check.required("portfolioURL", "Portfolio URL"),
            ..SocialLinks::default()
        };
        SocialLinksUpdate::read(&check).apply(&mut links);
        let avatar = check.required_file("avatar", "Avatar");
        let resume = check.required_file("resume", "Resume");
        check_email(&mut check, &email);
        check_password(&mut check, &password);
        check.finish()?;

        Ok(Self {
            full_name,
            email,
            phone,
            about_me,
            password,
            links,
            avatar: checked(avatar, "Avatar")?,
            resume: checked(resume, "Resume")?,
        })
    }

    /// Build the user once both assets are stored
    pub fn into_user(
        self,
        password_hash: String,
        avatar: StoredAsset,
        resume: StoredAsset,
    ) -> User {
        User {
            id: Uuid::new_v4(),
            full_name: self.full_name,
            email: self.email,
            phone: self.phone,
            about_me: self.about_me,
            password: password_hash,
            avatar,
            resume,
            links: self.links,
            reset_password_token: None,
            reset_password_expire: None,
            created_at: Utc::now(),
        }
    }
}

/// Request for user login
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn from_form(form: &FormPayload) -> ApiResult<Self> {
        let mut check = FieldCheck::new(form);
        let email = check.required("email", "Email");
        let password = check.required("password", "Password");
        check.finish()?;

        Ok(Self { email, password })
    }
}

/// Request for profile update
pub struct UpdateProfileRequest<'a> {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub about_me: Option<String>,
    pub links: SocialLinksUpdate,
    pub avatar: Option<&'a UploadedFile>,
    pub resume: Option<&'a UploadedFile>,
}

impl<'a> UpdateProfileRequest<'a> {
    pub fn from_form(form: &'a FormPayload) -> ApiResult<Self> {
        let mut check = FieldCheck::new(form);
        let email = check.optional("email");
        if let Some(email) = &email {
            check_email(&mut check, email);
        }
        let avatar = check.optional_file("avatar");
        let resume = check.optional_file("resume");
        let full_name = check.optional("fullName");
        let phone = check.optional("phone");
        let about_me = check.optional("aboutMe");
        let links = SocialLinksUpdate::read(&check);
        check.finish()?;

        Ok(Self {
            full_name,
            email,
            phone,
            about_me,
            links,
            avatar,
            resume,
        })
    }

    /// Apply the scalar changes; assets are handled by the caller
    pub fn apply(&self, user: &mut User) {
        if let Some(full_name) = &self.full_name {
            user.full_name = full_name.clone();
        }
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
        if let Some(phone) = &self.phone {
            user.phone = phone.clone();
        }
        if let Some(about_me) = &self.about_me {
            user.about_me = about_me.clone();
        }
        self.links.apply(&mut user.links);
    }
}

/// Request for password update
pub struct UpdatePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

impl UpdatePasswordRequest {
    pub fn from_form(form: &FormPayload) -> ApiResult<Self> {
        let mut check = FieldCheck::new(form);
        let current_password = check.required("currentPassword", "Current password");
        let new_password = check.required("newPassword", "New password");
        let confirmation = check.required("confirmNewPassword", "Password confirmation");
        check_password(&mut check, &new_password);
        check_confirmation(&mut check, &new_password, &confirmation);
        check.finish()?;

        Ok(Self {
            current_password,
            new_password,
        })
    }
}

/// Request for a password reset email
pub struct ForgotPasswordRequest {
    pub email: String,
}

impl ForgotPasswordRequest {
    pub fn from_form(form: &FormPayload) -> ApiResult<Self> {
        let mut check = FieldCheck::new(form);
        let email = check.required("email", "Email");
        check.finish()?;

        Ok(Self { email })
    }
}

/// Request for a password reset with an emailed token
pub struct ResetPasswordRequest {
    pub password: String,
}

impl ResetPasswordRequest {
    pub fn from_form(form: &FormPayload) -> ApiResult<Self> {
        let mut check = FieldCheck::new(form);
        let password = check.required("password", "Password");
        let confirmation = check.required("confirmPassword", "Password confirmation");
        check_password(&mut check, &password);
        check_confirmation(&mut check, &password, &confirmation);
        check.finish()?;

        Ok(Self { password })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(id: &str) -> StoredAsset {
        StoredAsset {
            storage_id: id.to_string(),
            url: format!("https://cdn.test/{}", id),
        }
    }

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            full_name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone: "123".to_string(),
            about_me: "Engineer".to_string(),
            password: String::new(),
            avatar: asset("avatars/a.png"),
            resume: asset("resumes/r.pdf"),
            links: SocialLinks {
                portfolio_url: "https://ada.dev".to_string(),
                github_url: Some("https://github.com/ada".to_string()),
                ..SocialLinks::default()
            },
            reset_password_token: None,
            reset_password_expire: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_password_hash_round_trip() {
        let mut user = user();
        user.password = hash_password("correct horse").unwrap();

        assert!(user.verify_password("correct horse").unwrap());
        assert!(!user.verify_password("wrong horse").unwrap());
    }

    #[test]
    fn test_reset_token_is_stored_hashed() {
        let mut user = user();
        let token = user.issue_reset_token();

        assert_eq!(
            user.reset_password_token.as_deref(),
            Some(hash_reset_token(&token).as_str())
        );
        assert_ne!(user.reset_password_token.as_deref(), Some(token.as_str()));
        assert!(user.reset_token_active(Utc::now()));
        assert!(!user.reset_token_active(Utc::now() + Duration::minutes(16)));

        user.clear_reset_token();
        assert!(!user.reset_token_active(Utc::now()));
    }

    #[test]
    fn test_response_hides_secrets() {
        let mut user = user();
        user.password = "hash".to_string();
        user.issue_reset_token();

        let json = serde_json::to_value(UserResponse::from(&user)).unwrap();
        assert!(json.get("password").is_none());
        assert!(json.get("resetPasswordToken").is_none());
        assert_eq!(json["fullName"], "Ada Lovelace");
        assert_eq!(json["portfolioURL"], "https://ada.dev");
        assert_eq!(json["githubURL"], "https://github.com/ada");
        assert!(json.get("twitterURL").is_none());
    }

    #[test]
    fn test_document_round_trip_keeps_links() {
        let user = user();
        let json = serde_json::to_value(&user).unwrap();
        let back: User = serde_json::from_value(json).unwrap();
        assert_eq!(back.links, user.links);
    }

    #[test]
    fn test_profile_update_applies_only_present_fields() {
        let mut form = FormPayload::default();
        form.push_field("aboutMe", "Mathematician");
        form.push_field("twitterURL", "https://x.com/ada");

        let request = UpdateProfileRequest::from_form(&form).unwrap();
        let mut user = user();
        request.apply(&mut user);

        assert_eq!(user.about_me, "Mathematician");
        assert_eq!(user.full_name, "Ada Lovelace");
        assert_eq!(user.links.twitter_url.as_deref(), Some("https://x.com/ada"));
        assert_eq!(user.links.portfolio_url, "https://ada.dev");
    }

    #[test]
    fn test_password_update_requires_matching_confirmation() {
        let mut form = FormPayload::default();
        form.push_field("currentPassword", "old password");
        form.push_field("newPassword", "new password");
        form.push_field("confirmNewPassword", "other password");

        let err = UpdatePasswordRequest::from_form(&form).err().unwrap();
        assert_eq!(err.to_string(), "Password and confirmation do not match.");
    }
}
