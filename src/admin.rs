use crate::auth::{require_admin, set_flash};
use crate::db::connection::store_now;
use crate::db::repositories as db;
use crate::error::{AdminError, is_unique_violation};
use crate::startup::AppState;
use crate::votes::decorate_categories;
use axum::{
    Form, Json,
    extract::{Extension, Path},
    response::Redirect,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_sessions::Session;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
pub struct AddCategoryRequest {
    pub name: String,
    pub end_date: Option<String>,
    pub end_time: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCategoryEndTimeRequest {
    #[serde(rename = "categoryId")]
    pub category_id: Option<i32>,
    pub end_date: Option<String>,
    pub end_time: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddNominationForm {
    pub name: String,
    pub description: String,
    pub category: String,
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    #[serde(rename = "nominationIds")]
    pub nomination_ids: Vec<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSettingRequest {
    pub key: String,
    pub value: String,
}

/// The admin form posts the voting deadline as separate date and time
/// fields; both must be present for a deadline to be set at all.
fn parse_end_time(
    end_date: Option<&str>,
    end_time: Option<&str>,
) -> Result<Option<DateTime<Utc>>, AdminError> {
    let (date, time) = match (end_date, end_time) {
        (Some(d), Some(t)) if !d.is_empty() && !t.is_empty() => (d, t),
        _ => return Ok(None),
    };

    let raw = format!("{} {}", date, time);
    let parsed = NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M"))
        .map_err(|_| AdminError::InvalidRequest("Invalid end time format".to_string()))?;

    Ok(Some(parsed.and_utc()))
}

/// GET /api/nominations
pub async fn list_nominations(
    Extension(app_state): Extension<AppState>,
    session: Session,
) -> Result<Json<Value>, AdminError> {
    require_admin(&session).await?;

    let nominations = db::list_admin_nominations(&app_state.db).await?;
    Ok(Json(json!(nominations)))
}

/// GET /manage-categories
pub async fn manage_categories(
    Extension(app_state): Extension<AppState>,
    session: Session,
) -> Result<Json<Value>, AdminError> {
    let user = require_admin(&session).await?;

    let categories = db::list_active_categories(&app_state.db).await?;
    let now = store_now(&app_state.db).await?;

    Ok(Json(json!({
        "categories": decorate_categories(categories, now),
        "user": user,
    })))
}

/// POST /add-category
pub async fn add_category(
    Extension(app_state): Extension<AppState>,
    session: Session,
    Json(payload): Json<AddCategoryRequest>,
) -> Result<Json<Value>, AdminError> {
    let user = require_admin(&session).await?;

    if payload.name.is_empty() {
        return Err(AdminError::InvalidRequest(
            "Category name is required".to_string(),
        ));
    }

    let end_time = parse_end_time(payload.end_date.as_deref(), payload.end_time.as_deref())?;

    let category_id = match db::create_category(&app_state.db, &payload.name, end_time).await {
        Ok(id) => id,
        Err(e) if is_unique_violation(&e) => {
            return Err(AdminError::Conflict(
                "This category already exists".to_string(),
            ));
        }
        Err(e) => return Err(e.into()),
    };

    info!("category created: {} (id {})", payload.name, category_id);

    if let Err(e) = db::log_activity(
        &app_state.db,
        Some(user.id),
        "create",
        "categories",
        Some(category_id),
        None,
        Some(&payload.name),
    )
    .await
    {
        warn!("failed to log category creation: {}", e);
    }

    Ok(Json(json!({
        "success": true,
        "message": "Category created successfully",
        "categoryId": category_id,
    })))
}

/// POST /update-category-end-time
pub async fn update_category_end_time(
    Extension(app_state): Extension<AppState>,
    session: Session,
    Json(payload): Json<UpdateCategoryEndTimeRequest>,
) -> Result<Json<Value>, AdminError> {
    let user = require_admin(&session).await?;

    let category_id = payload
        .category_id
        .ok_or_else(|| AdminError::InvalidRequest("Category ID is required".to_string()))?;

    let end_time = parse_end_time(payload.end_date.as_deref(), payload.end_time.as_deref())?;

    let affected = db::update_category_end_time(&app_state.db, category_id, end_time).await?;
    if affected == 0 {
        return Err(AdminError::NotFound("Category"));
    }

    if let Err(e) = db::log_activity(
        &app_state.db,
        Some(user.id),
        "update_end_time",
        "categories",
        Some(category_id),
        None,
        end_time.map(|t| t.to_rfc3339()).as_deref(),
    )
    .await
    {
        warn!("failed to log end time update: {}", e);
    }

    Ok(Json(json!({
        "success": true,
        "message": "Category end time updated successfully"
    })))
}

/// POST /add-nomination
pub async fn add_nomination(
    Extension(app_state): Extension<AppState>,
    session: Session,
    Form(form): Form<AddNominationForm>,
) -> Result<Redirect, AdminError> {
    let user = require_admin(&session).await?;

    if form.name.is_empty() || form.description.is_empty() || form.category.is_empty() {
        set_flash(&session, "error", "All fields are required").await;
        return Ok(Redirect::to("/manage-categories"));
    }

    let category = match db::find_active_category_by_name(&app_state.db, &form.category).await {
        Ok(Some(category)) => category,
        Ok(None) => {
            set_flash(&session, "error", "Category not found").await;
            return Ok(Redirect::to("/manage-categories"));
        }
        Err(e) => {
            warn!("category lookup failed: {}", e);
            set_flash(&session, "error", "Failed to add nomination").await;
            return Ok(Redirect::to("/manage-categories"));
        }
    };

    match db::create_nomination(
        &app_state.db,
        &form.name,
        &form.description,
        category.id,
        Some(user.id),
    )
    .await
    {
        Ok(_) => {
            set_flash(&session, "success", "Nomination added successfully!").await;
        }
        Err(e) if is_unique_violation(&e) => {
            set_flash(
                &session,
                "error",
                "This nomination already exists in the category",
            )
            .await;
        }
        Err(e) => {
            warn!("nomination insert failed: {}", e);
            set_flash(&session, "error", "Failed to add nomination").await;
        }
    }

    Ok(Redirect::to("/manage-categories"))
}

/// DELETE /categories/:id/delete
pub async fn delete_category(
    Extension(app_state): Extension<AppState>,
    session: Session,
    Path(category_id): Path<i32>,
) -> Result<Json<Value>, AdminError> {
    let user = require_admin(&session).await?;

    let affected = db::soft_delete_category(&app_state.db, category_id).await?;
    if affected == 0 {
        return Err(AdminError::NotFound("Category"));
    }

    if let Err(e) = db::log_activity(
        &app_state.db,
        Some(user.id),
        "soft_delete",
        "categories",
        Some(category_id),
        None,
        None,
    )
    .await
    {
        warn!("failed to log category deletion: {}", e);
    }

    Ok(Json(json!({
        "success": true,
        "message": "Category moved to trash successfully"
    })))
}

/// POST /categories/:id/restore
pub async fn restore_category(
    Extension(app_state): Extension<AppState>,
    session: Session,
    Path(category_id): Path<i32>,
) -> Result<Json<Value>, AdminError> {
    let user = require_admin(&session).await?;

    let affected = db::restore_category(&app_state.db, category_id).await?;
    if affected == 0 {
        return Err(AdminError::NotFound("Category"));
    }

    if let Err(e) = db::log_activity(
        &app_state.db,
        Some(user.id),
        "restore",
        "categories",
        Some(category_id),
        None,
        None,
    )
    .await
    {
        warn!("failed to log category restore: {}", e);
    }

    Ok(Json(json!({
        "success": true,
        "message": "Category restored successfully"
    })))
}

/// DELETE /nominations/:id/delete
pub async fn delete_nomination(
    Extension(app_state): Extension<AppState>,
    session: Session,
    Path(nomination_id): Path<i32>,
) -> Result<Json<Value>, AdminError> {
    let user = require_admin(&session).await?;

    let affected = db::soft_delete_nomination(&app_state.db, nomination_id).await?;
    if affected == 0 {
        return Err(AdminError::NotFound("Nomination"));
    }

    if let Err(e) = db::log_activity(
        &app_state.db,
        Some(user.id),
        "soft_delete",
        "nominations",
        Some(nomination_id),
        None,
        None,
    )
    .await
    {
        warn!("failed to log nomination deletion: {}", e);
    }

    Ok(Json(json!({
        "success": true,
        "message": "Nomination moved to trash successfully"
    })))
}

/// POST /nominations/:id/restore
pub async fn restore_nomination(
    Extension(app_state): Extension<AppState>,
    session: Session,
    Path(nomination_id): Path<i32>,
) -> Result<Json<Value>, AdminError> {
    let user = require_admin(&session).await?;

    let affected = db::restore_nomination(&app_state.db, nomination_id).await?;
    if affected == 0 {
        return Err(AdminError::NotFound("Nomination"));
    }

    if let Err(e) = db::log_activity(
        &app_state.db,
        Some(user.id),
        "restore",
        "nominations",
        Some(nomination_id),
        None,
        None,
    )
    .await
    {
        warn!("failed to log nomination restore: {}", e);
    }

    Ok(Json(json!({
        "success": true,
        "message": "Nomination restored successfully"
    })))
}

/// POST /nominations/bulk-delete
pub async fn bulk_delete_nominations(
    Extension(app_state): Extension<AppState>,
    session: Session,
    Json(payload): Json<BulkDeleteRequest>,
) -> Result<Json<Value>, AdminError> {
    let user = require_admin(&session).await?;

    if payload.nomination_ids.is_empty() {
        return Err(AdminError::InvalidRequest(
            "Invalid nomination IDs".to_string(),
        ));
    }

    let deleted =
        db::bulk_soft_delete_nominations(&app_state.db, &payload.nomination_ids).await?;

    if let Err(e) = db::log_activity(
        &app_state.db,
        Some(user.id),
        "bulk_soft_delete",
        "nominations",
        None,
        None,
        Some(&format!("{} rows", deleted)),
    )
    .await
    {
        warn!("failed to log bulk deletion: {}", e);
    }

    Ok(Json(json!({
        "success": true,
        "message": format!("{} nominations moved to trash successfully", deleted),
        "deletedCount": deleted,
    })))
}

/// GET /suggestions
pub async fn list_suggestions(
    Extension(app_state): Extension<AppState>,
    session: Session,
) -> Result<Json<Value>, AdminError> {
    let user = require_admin(&session).await?;

    let suggestions = db::list_suggestions(&app_state.db).await?;
    let categories = db::list_active_categories(&app_state.db).await?;
    let now = store_now(&app_state.db).await?;

    Ok(Json(json!({
        "suggestions": suggestions,
        "categories": decorate_categories(categories, now),
        "user": user,
    })))
}

/// POST /suggestions/:id/process
pub async fn process_suggestion(
    Extension(app_state): Extension<AppState>,
    session: Session,
    Path(suggestion_id): Path<i32>,
) -> Result<Json<Value>, AdminError> {
    require_admin(&session).await?;

    let affected = db::mark_suggestion_processed(&app_state.db, suggestion_id).await?;
    if affected == 0 {
        return Err(AdminError::NotFound("Suggestion"));
    }

    Ok(Json(json!({
        "success": true,
        "message": "Suggestion marked as processed"
    })))
}

/// DELETE /suggestions/:id/delete
pub async fn delete_suggestion(
    Extension(app_state): Extension<AppState>,
    session: Session,
    Path(suggestion_id): Path<i32>,
) -> Result<Json<Value>, AdminError> {
    require_admin(&session).await?;

    let affected = db::delete_suggestion(&app_state.db, suggestion_id).await?;
    if affected == 0 {
        return Err(AdminError::NotFound("Suggestion"));
    }

    Ok(Json(json!({
        "success": true,
        "message": "Suggestion deleted successfully"
    })))
}

/// GET /trash: soft-deleted categories and nominations, newest first.
pub async fn trash(
    Extension(app_state): Extension<AppState>,
    session: Session,
) -> Result<Json<Value>, AdminError> {
    let user = require_admin(&session).await?;

    let deleted_categories = db::list_deleted_categories(&app_state.db).await?;
    let deleted_nominations = db::list_deleted_nominations(&app_state.db).await?;

    Ok(Json(json!({
        "deletedCategories": deleted_categories,
        "deletedNominations": deleted_nominations,
        "user": user,
    })))
}

/// GET /admin/settings
pub async fn list_settings(
    Extension(app_state): Extension<AppState>,
    session: Session,
) -> Result<Json<Value>, AdminError> {
    require_admin(&session).await?;

    let settings = db::list_settings(&app_state.db).await?;
    Ok(Json(json!({ "settings": settings })))
}

/// POST /admin/settings
pub async fn update_setting(
    Extension(app_state): Extension<AppState>,
    session: Session,
    Json(payload): Json<UpdateSettingRequest>,
) -> Result<Json<Value>, AdminError> {
    require_admin(&session).await?;

    if payload.key.is_empty() {
        return Err(AdminError::InvalidRequest(
            "Setting key is required".to_string(),
        ));
    }

    db::set_setting(&app_state.db, &payload.key, &payload.value).await?;

    Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_deadline_when_either_field_is_missing() {
        assert_eq!(parse_end_time(None, None).unwrap(), None);
        assert_eq!(parse_end_time(Some("2026-01-01"), None).unwrap(), None);
        assert_eq!(parse_end_time(None, Some("12:00")).unwrap(), None);
        assert_eq!(parse_end_time(Some(""), Some("12:00")).unwrap(), None);
    }

    #[test]
    fn parses_date_and_time_with_and_without_seconds() {
        let with_seconds = parse_end_time(Some("2026-12-31"), Some("23:59:59"))
            .unwrap()
            .unwrap();
        assert_eq!(with_seconds.to_rfc3339(), "2026-12-31T23:59:59+00:00");

        let without_seconds = parse_end_time(Some("2026-12-31"), Some("23:59"))
            .unwrap()
            .unwrap();
        assert_eq!(without_seconds.to_rfc3339(), "2026-12-31T23:59:00+00:00");
    }

    #[test]
    fn rejects_garbage_deadlines() {
        assert!(parse_end_time(Some("not-a-date"), Some("12:00")).is_err());
        assert!(parse_end_time(Some("2026-12-31"), Some("25:99")).is_err());
    }
}
