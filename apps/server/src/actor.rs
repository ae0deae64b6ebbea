//! # Acting User
//!
//! The authenticating proxy in front of the server puts the user name in
//! `X-Actor`. Handlers that write to the ledger or change a sale take an
//! [`Actor`] and are refused without it.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::{ApiError, ErrorCode};

pub const ACTOR_HEADER: &str = "x-actor";

/// Longest accepted user name.
const MAX_ACTOR_LEN: usize = 150;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor(pub String);

impl Actor {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(ACTOR_HEADER)
            .ok_or_else(|| ApiError::new(ErrorCode::MissingActor, "X-Actor header is required"))?;

        let name = value
            .to_str()
            .map_err(|_| ApiError::new(ErrorCode::MissingActor, "X-Actor header is not valid text"))?
            .trim();

        if name.is_empty() {
            return Err(ApiError::new(ErrorCode::MissingActor, "X-Actor header is empty"));
        }
        if name.chars().count() > MAX_ACTOR_LEN {
            return Err(ApiError::validation(format!(
                "X-Actor must be at most {MAX_ACTOR_LEN} characters"
            )));
        }

        Ok(Actor(name.to_string()))
    }
}
