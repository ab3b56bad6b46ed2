//! Identity of the person using the app.
//!
//! A `Session` is created once (at login, or as guest) and handed to the
//! client and to every screen that needs identity. A missing token means
//! guest browsing, never an error.

use crate::error::ApiError;
use crate::types::{Role, User, UserId};

/// Name of the header carrying the session token.
pub const TOKEN_HEADER: &str = "token";

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Session {
    #[default]
    Guest,
    Authenticated { token: String, user: User },
}

impl Session {
    pub fn guest() -> Self {
        Session::Guest
    }

    pub fn authenticated(token: String, user: User) -> Self {
        Session::Authenticated { token, user }
    }

    pub fn token(&self) -> Option<&str> {
        match self {
            Session::Guest => None,
            Session::Authenticated { token, .. } => Some(token),
        }
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            Session::Guest => None,
            Session::Authenticated { user, .. } => Some(user),
        }
    }

    /// Guests and accounts with the `invitado` role browse without adopting.
    pub fn is_guest(&self) -> bool {
        match self {
            Session::Guest => true,
            Session::Authenticated { user, .. } => user.role == Role::Invitado,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.user().is_some_and(|u| u.role.is_admin())
    }

    pub fn user_id(&self) -> Result<UserId, ApiError> {
        match self {
            Session::Authenticated { user, .. } if user.role != Role::Invitado => Ok(user.id),
            _ => Err(ApiError::Unauthenticated),
        }
    }

    /// Headers attached to every request.
    pub fn headers(&self) -> Vec<(String, String)> {
        match self.token() {
            Some(token) => vec![(TOKEN_HEADER.to_string(), token.to_string())],
            None => Vec::new(),
        }
    }
}
