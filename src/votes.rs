use crate::auth::{current_user, require_admin, require_user, take_flash};
use crate::db::connection::store_now;
use crate::db::repositories as db;
use crate::db::repositories::{CategoryOverview, NominationOverview, NominationResult};
use crate::error::{AdminError, VoteError};
use crate::lifecycle::{VotingStatus, voting_status};
use crate::startup::AppState;
use axum::{Json, extract::Extension};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use tower_sessions::Session;
use tracing::warn;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub nomination_id: i32,
}

#[derive(Debug, Serialize)]
pub struct CategoryListing {
    #[serde(flatten)]
    pub category: CategoryOverview,
    pub voting_status: VotingStatus,
}

#[derive(Debug, Serialize)]
pub struct NominationListing {
    #[serde(flatten)]
    pub nomination: NominationOverview,
    pub voting_status: VotingStatus,
}

#[derive(Debug, Serialize)]
pub struct ResultEntry {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub vote_count: i64,
    pub voting_status: VotingStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub voters: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CategoryResults {
    pub category: String,
    pub nominations: Vec<ResultEntry>,
}

pub fn decorate_categories(rows: Vec<CategoryOverview>, now: DateTime<Utc>) -> Vec<CategoryListing> {
    rows.into_iter()
        .map(|category| CategoryListing {
            voting_status: voting_status(category.end_time, now),
            category,
        })
        .collect()
}

fn decorate_nominations(
    rows: Vec<NominationOverview>,
    now: DateTime<Utc>,
) -> Vec<NominationListing> {
    rows.into_iter()
        .map(|nomination| NominationListing {
            voting_status: voting_status(nomination.end_time, now),
            nomination,
        })
        .collect()
}

/// Rows arrive ordered by category then vote count; grouping preserves that
/// order. Status is derived from the category end time, never stored.
fn group_results(
    rows: Vec<NominationResult>,
    now: DateTime<Utc>,
    mut voters: HashMap<i32, Vec<String>>,
) -> Vec<CategoryResults> {
    let mut grouped: Vec<CategoryResults> = Vec::new();

    for row in rows {
        if grouped.last().map_or(true, |g| g.category != row.category) {
            grouped.push(CategoryResults {
                category: row.category.clone(),
                nominations: Vec::new(),
            });
        }

        let entry = ResultEntry {
            id: row.id,
            name: row.name,
            description: row.description,
            image_url: row.image_url,
            vote_count: row.vote_count,
            voting_status: voting_status(row.end_time, now),
            voters: voters.remove(&row.id).unwrap_or_default(),
        };

        if let Some(group) = grouped.last_mut() {
            group.nominations.push(entry);
        }
    }

    grouped
}

/// GET /: active categories and nominations with their computed status.
pub async fn index(
    Extension(app_state): Extension<AppState>,
    session: Session,
) -> Result<Json<Value>, VoteError> {
    let categories = db::list_active_categories(&app_state.db).await?;
    let nominations = db::list_active_nominations(&app_state.db).await?;
    let now = store_now(&app_state.db).await?;

    let user = current_user(&session).await;
    let messages = take_flash(&session).await;

    Ok(Json(json!({
        "user": user,
        "messages": messages,
        "categories": decorate_categories(categories, now),
        "nominations": decorate_nominations(nominations, now),
    })))
}

/// POST /vote: one ballot per (user, nomination); voting again replaces
/// the earlier ballot.
pub async fn cast_vote(
    Extension(app_state): Extension<AppState>,
    session: Session,
    Json(payload): Json<VoteRequest>,
) -> Result<Json<Value>, VoteError> {
    let user = require_user(&session).await?;

    let target = db::resolve_vote_target(&app_state.db, payload.nomination_id)
        .await?
        .ok_or(VoteError::NominationNotFound)?;

    if voting_status(target.end_time, target.now) == VotingStatus::Expired {
        return Err(VoteError::VotingClosed(target.category_name));
    }

    db::cast_vote(&app_state.db, user.id, payload.nomination_id).await?;

    if let Err(e) = db::log_activity(
        &app_state.db,
        Some(user.id),
        "vote",
        "votes",
        Some(payload.nomination_id),
        None,
        None,
    )
    .await
    {
        warn!("failed to log vote activity: {}", e);
    }

    Ok(Json(json!({
        "success": true,
        "message": "Vote recorded successfully"
    })))
}

/// GET /results: public tallies grouped by category.
pub async fn results(
    Extension(app_state): Extension<AppState>,
    session: Session,
) -> Result<Json<Value>, VoteError> {
    let rows = db::list_results(&app_state.db).await?;
    let now = store_now(&app_state.db).await?;
    let user = current_user(&session).await;

    Ok(Json(json!({
        "results": group_results(rows, now, HashMap::new()),
        "user": user,
    })))
}

/// GET /admin/results: same tallies plus who voted for what.
pub async fn admin_results(
    Extension(app_state): Extension<AppState>,
    session: Session,
) -> Result<Json<Value>, AdminError> {
    let user = require_admin(&session).await?;

    let rows = db::list_results(&app_state.db).await?;
    let now = store_now(&app_state.db).await?;

    let mut voters: HashMap<i32, Vec<String>> = HashMap::new();
    for voter in db::list_voters(&app_state.db).await? {
        voters
            .entry(voter.nomination_id)
            .or_default()
            .push(voter.username);
    }

    Ok(Json(json!({
        "results": group_results(rows, now, voters),
        "user": user,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn row(id: i32, name: &str, category: &str, votes: i64, end: Option<i64>) -> NominationResult {
        NominationResult {
            id,
            name: name.to_string(),
            description: None,
            category: category.to_string(),
            image_url: None,
            vote_count: votes,
            end_time: end.map(at),
        }
    }

    #[test]
    fn groups_consecutive_rows_by_category() {
        let rows = vec![
            row(1, "Ada", "CS", 5, None),
            row(2, "Grace", "CS", 3, None),
            row(3, "Marie", "Chemistry", 7, None),
        ];

        let grouped = group_results(rows, at(0), HashMap::new());
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].category, "CS");
        assert_eq!(grouped[0].nominations.len(), 2);
        assert_eq!(grouped[0].nominations[0].name, "Ada");
        assert_eq!(grouped[1].category, "Chemistry");
        assert_eq!(grouped[1].nominations.len(), 1);
    }

    #[test]
    fn status_comes_from_the_category_end_time() {
        let rows = vec![row(1, "Ada", "CS", 0, Some(100)), row(2, "Marie", "Chem", 0, None)];

        let grouped = group_results(rows, at(100), HashMap::new());
        assert_eq!(grouped[0].nominations[0].voting_status, VotingStatus::Expired);
        assert_eq!(grouped[1].nominations[0].voting_status, VotingStatus::Active);
    }

    #[test]
    fn attaches_voters_to_their_nomination() {
        let rows = vec![row(1, "Ada", "CS", 2, None), row(2, "Grace", "CS", 0, None)];
        let mut voters = HashMap::new();
        voters.insert(1, vec!["alice".to_string(), "bob".to_string()]);

        let grouped = group_results(rows, at(0), voters);
        assert_eq!(grouped[0].nominations[0].voters, vec!["alice", "bob"]);
        assert!(grouped[0].nominations[1].voters.is_empty());
    }
}
