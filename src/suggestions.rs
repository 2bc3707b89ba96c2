use crate::auth::{require_user, set_flash};
use crate::db::repositories as db;
use crate::error::AuthError;
use crate::startup::AppState;
use axum::{Form, extract::Extension, response::Redirect};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::warn;

#[derive(Debug, Deserialize)]
pub struct SuggestNominationForm {
    pub name: String,
    pub description: String,
    pub category: String,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackForm {
    pub title: String,
    pub description: String,
}

/// POST /suggest-nomination: users propose nominees; the category is folded
/// into the description, an admin decides what becomes a real nomination.
pub async fn suggest_nomination(
    Extension(app_state): Extension<AppState>,
    session: Session,
    Form(form): Form<SuggestNominationForm>,
) -> Result<Redirect, AuthError> {
    let user = require_user(&session).await?;

    if form.name.is_empty() || form.description.is_empty() || form.category.is_empty() {
        set_flash(&session, "error", "All fields are required").await;
        return Ok(Redirect::to("/suggest-nomination"));
    }

    let description = format!("{} - Category: {}", form.description, form.category);
    match db::create_suggestion(&app_state.db, user.id, "nomination", &form.name, &description)
        .await
    {
        Ok(_) => {
            set_flash(
                &session,
                "success",
                "Thank you! Your nomination has been submitted.",
            )
            .await;
            Ok(Redirect::to("/"))
        }
        Err(e) => {
            warn!("failed to store nomination suggestion: {}", e);
            set_flash(&session, "error", "Failed to submit nomination").await;
            Ok(Redirect::to("/suggest-nomination"))
        }
    }
}

/// POST /feedback
pub async fn feedback(
    Extension(app_state): Extension<AppState>,
    session: Session,
    Form(form): Form<FeedbackForm>,
) -> Result<Redirect, AuthError> {
    let user = require_user(&session).await?;

    if form.title.is_empty() || form.description.is_empty() {
        set_flash(&session, "error", "All fields are required").await;
        return Ok(Redirect::to("/feedback"));
    }

    match db::create_suggestion(&app_state.db, user.id, "feedback", &form.title, &form.description)
        .await
    {
        Ok(_) => {
            set_flash(&session, "success", "Thank you! Your feedback has been submitted.").await;
            Ok(Redirect::to("/"))
        }
        Err(e) => {
            warn!("failed to store feedback: {}", e);
            set_flash(&session, "error", "Failed to submit feedback").await;
            Ok(Redirect::to("/feedback"))
        }
    }
}
