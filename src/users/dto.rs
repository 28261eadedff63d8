use serde::{Deserialize, Serialize};

use crate::error::AppError;

// Every field is optional on the wire so that a missing field is reported as a
// validation error rather than a deserialization failure. Password-bearing
// requests deliberately do not implement Debug.

/// Request body for `POST /users`.
#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Request body for `PUT /user/{id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Request body for `PUT /user/{id}/password`.
#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// Request body for `POST /login`.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub status: &'static str,
    pub user_id: i64,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

// ---- validated forms ----

pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
}

pub struct Credentials {
    pub email: String,
    pub password: String,
}

pub struct PasswordChange {
    pub current: String,
    pub new: String,
}

impl CreateUserRequest {
    pub fn validate(self) -> Result<NewUser, AppError> {
        match (text(self.name), email(self.email), secret(self.password)) {
            (Some(name), Some(email), Some(password)) => Ok(NewUser {
                name,
                email,
                password,
            }),
            (name, email, password) => Err(missing(&[
                ("name", name.is_none()),
                ("email", email.is_none()),
                ("password", password.is_none()),
            ])),
        }
    }
}

impl UpdateUserRequest {
    pub fn validate(self) -> Result<UserUpdate, AppError> {
        if self.name.is_none() && self.email.is_none() {
            return Err(AppError::validation("No data provided for update"));
        }
        let name = match self.name {
            Some(n) => Some(text(Some(n)).ok_or_else(|| blank("name"))?),
            None => None,
        };
        let email = match self.email {
            Some(e) => Some(email(Some(e)).ok_or_else(|| blank("email"))?),
            None => None,
        };
        Ok(UserUpdate { name, email })
    }
}

impl LoginRequest {
    pub fn validate(self) -> Result<Credentials, AppError> {
        match (email(self.email), secret(self.password)) {
            (Some(email), Some(password)) => Ok(Credentials { email, password }),
            (email, password) => Err(missing(&[
                ("email", email.is_none()),
                ("password", password.is_none()),
            ])),
        }
    }
}

impl ChangePasswordRequest {
    pub fn validate(self) -> Result<PasswordChange, AppError> {
        match (secret(self.current_password), secret(self.new_password)) {
            (Some(current), Some(new)) => Ok(PasswordChange { current, new }),
            (current, new) => Err(missing(&[
                ("current_password", current.is_none()),
                ("new_password", new.is_none()),
            ])),
        }
    }
}

impl SearchParams {
    pub fn term(self) -> Result<String, AppError> {
        text(self.name)
            .ok_or_else(|| AppError::validation("Please provide a 'name' query parameter to search"))
    }
}

fn text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Emails compare case-insensitively, so they are stored lowercased.
fn email(value: Option<String>) -> Option<String> {
    text(value).map(|v| v.to_lowercase())
}

fn secret(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn missing(fields: &[(&str, bool)]) -> AppError {
    let absent: Vec<&str> = fields
        .iter()
        .filter(|(_, is_missing)| *is_missing)
        .map(|(name, _)| *name)
        .collect();
    AppError::validation(format!("Missing required field(s): {}", absent.join(", ")))
}

fn blank(field: &str) -> AppError {
    AppError::validation(format!("{field} must not be empty"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(err: AppError) -> String {
        match err {
            AppError::Validation(msg) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn create_normalizes_name_and_email() {
        let req = CreateUserRequest {
            name: Some("  Alice ".into()),
            email: Some(" A@X.com ".into()),
            password: Some(" pw123 ".into()),
        };
        let user = req.validate().unwrap();
        assert_eq!(user.name, "Alice");
        assert_eq!(user.email, "a@x.com");
        // passwords are taken verbatim
        assert_eq!(user.password, " pw123 ");
    }

    #[test]
    fn create_lists_every_missing_field() {
        let req = CreateUserRequest {
            name: Some("   ".into()),
            email: Some("a@x.com".into()),
            password: None,
        };
        assert_eq!(
            message(req.validate().err().expect("validation error")),
            "Missing required field(s): name, password"
        );
    }

    #[test]
    fn update_requires_at_least_one_field() {
        let req = UpdateUserRequest {
            name: None,
            email: None,
        };
        assert_eq!(
            message(req.validate().err().expect("validation error")),
            "No data provided for update"
        );
    }

    #[test]
    fn update_rejects_blank_supplied_field() {
        let req = UpdateUserRequest {
            name: Some("Bob".into()),
            email: Some("  ".into()),
        };
        assert_eq!(
            message(req.validate().err().expect("validation error")),
            "email must not be empty"
        );
    }

    #[test]
    fn login_requires_both_fields() {
        let req = LoginRequest {
            email: Some("a@x.com".into()),
            password: Some(String::new()),
        };
        assert_eq!(
            message(req.validate().err().expect("validation error")),
            "Missing required field(s): password"
        );
    }

    #[test]
    fn search_term_is_trimmed_and_required() {
        let p = SearchParams {
            name: Some(" jo ".into()),
        };
        assert_eq!(p.term().unwrap(), "jo");
        assert!(SearchParams { name: None }.term().is_err());
    }
}
