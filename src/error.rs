use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;
use thiserror::Error;

/// Session gate failures. Anonymous visitors are bounced to the login page
/// the way the page routes expect; a role mismatch is terminal for the
/// request.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Authentication required")]
    Unauthorized,
    #[error("Access denied. Admin only.")]
    Forbidden,
}

#[derive(Error, Debug)]
pub enum VoteError {
    #[error("Authentication required")]
    Unauthorized,
    #[error("Nomination not found")]
    NominationNotFound,
    #[error("Voting for category \"{0}\" has ended")]
    VotingClosed(String),
    #[error("Database error: {0}")]
    Database(String),
}

#[derive(Error, Debug)]
pub enum AdminError {
    #[error("Authentication required")]
    Unauthorized,
    #[error("Access denied. Admin only.")]
    Forbidden,
    #[error("{0}")]
    InvalidRequest(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("Database error: {0}")]
    Database(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::Unauthorized => Redirect::to("/login").into_response(),
            AuthError::Forbidden => {
                (StatusCode::FORBIDDEN, "Access denied. Admin only.").into_response()
            }
        }
    }
}

impl IntoResponse for VoteError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            VoteError::Unauthorized => return Redirect::to("/login").into_response(),
            VoteError::NominationNotFound => (StatusCode::NOT_FOUND, self.to_string()),
            VoteError::VotingClosed(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            VoteError::Database(msg) => {
                tracing::error!("vote database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AdminError::Unauthorized => return Redirect::to("/login").into_response(),
            AdminError::Forbidden => {
                return (StatusCode::FORBIDDEN, "Access denied. Admin only.").into_response();
            }
            AdminError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AdminError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AdminError::Conflict(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AdminError::Database(msg) => {
                tracing::error!("admin database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
        };

        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}

impl From<sqlx::Error> for VoteError {
    fn from(error: sqlx::Error) -> Self {
        VoteError::Database(error.to_string())
    }
}

impl From<sqlx::Error> for AdminError {
    fn from(error: sqlx::Error) -> Self {
        AdminError::Database(error.to_string())
    }
}

impl From<AuthError> for VoteError {
    fn from(_: AuthError) -> Self {
        VoteError::Unauthorized
    }
}

impl From<AuthError> for AdminError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Forbidden => AdminError::Forbidden,
            AuthError::Unauthorized => AdminError::Unauthorized,
        }
    }
}

pub fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voting_closed_interpolates_category_name() {
        let err = VoteError::VotingClosed("Chemistry".to_string());
        assert_eq!(
            err.to_string(),
            "Voting for category \"Chemistry\" has ended"
        );
    }

    #[test]
    fn not_found_names_the_entity() {
        assert_eq!(AdminError::NotFound("Category").to_string(), "Category not found");
        assert_eq!(
            AdminError::NotFound("Nomination").to_string(),
            "Nomination not found"
        );
    }
}
