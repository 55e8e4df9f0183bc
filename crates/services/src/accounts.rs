//! # Account Service
//!
//! Registration, login and role management. Hashing and token formats are
//! owned by the auth adapters behind `PasswordHasher` and `TokenService`.

use std::sync::Arc;

use chrono::Utc;
use domains::{DomainError, PasswordHasher, Result, Role, TokenService, User, UserRepository};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::utils::required_text;

fn username_chars(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().chars().all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.')) {
        Ok(())
    } else {
        Err(ValidationError::new("username_chars")
            .with_message("username may only contain letters, digits, '_', '-' and '.'".into()))
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Registration {
    #[validate(
        length(min = 1, max = 150, message = "username must be 1 to 150 characters"),
        custom(function = "username_chars")
    )]
    pub username: String,
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub user: User,
}

pub struct AccountService {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<dyn TokenService>,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserRepository>, hasher: Arc<dyn PasswordHasher>, tokens: Arc<dyn TokenService>) -> Self {
        Self { users, hasher, tokens }
    }

    async fn create(&self, input: &Registration, role: Role) -> Result<User> {
        input.validate()?;
        let username = required_text("username", &input.username)?;
        let email = input.email.trim().to_lowercase();
        if self.users.get_user_by_username(&username).await?.is_some() {
            return Err(DomainError::Conflict(format!("username '{username}' is taken")));
        }

        let user = self
            .users
            .create_user(User {
                id: Uuid::now_v7(),
                username,
                email,
                password_hash: self.hasher.hash(&input.password)?,
                role,
                created_at: Utc::now(),
            })
            .await?;
        info!(user_id = %user.id, role = user.role.as_str(), "account created");
        Ok(user)
    }

    /// New accounts are always authors.
    pub async fn register(&self, input: Registration) -> Result<User> {
        self.create(&input, Role::Author).await
    }

    pub async fn login(&self, credentials: Credentials) -> Result<Session> {
        let user = self.users.get_user_by_username(credentials.username.trim()).await?;
        match user {
            Some(user) if self.hasher.verify(&credentials.password, &user.password_hash) => {
                let token = self.tokens.issue(&user)?;
                Ok(Session { token, user })
            }
            _ => {
                warn!(username = %credentials.username, "failed login");
                Err(DomainError::NotAuthorized("invalid username or password".into()))
            }
        }
    }

    pub async fn profile(&self, id: Uuid) -> Result<User> {
        self.users.get_user(id).await?.ok_or_else(|| DomainError::not_found("user", id))
    }

    /// Creates the account as a moderator, or promotes it if it already exists.
    pub async fn ensure_moderator(&self, input: Registration) -> Result<User> {
        match self.users.get_user_by_username(input.username.trim()).await? {
            Some(user) if user.role == Role::Moderator => Ok(user),
            Some(user) => {
                let promoted = self.users.set_role(user.id, Role::Moderator).await?;
                info!(user_id = %promoted.id, "account promoted to moderator");
                Ok(promoted)
            }
            None => self.create(&input, Role::Moderator).await,
        }
    }
}
