//! Aggregate profile statistics: how many posts the caller published and how
//! many likes, comments and completed rewards those posts received.

use crate::littlejoys::handlers::bearer_token;
use crate::littlejoys::{envelope, state::AppState};
use anyhow::Result;
use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::Response,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub posts_count: u64,
    pub likes_received: u64,
    pub comments_received: u64,
    pub rewards_received: u64,
}

#[utoipa::path(
    get,
    path = "/api/users/stats",
    responses(
        (status = 200, description = "Aggregate counts for the caller", body = UserStats),
        (status = 401, description = "Missing or invalid bearer token")
    ),
    tag = "users"
)]
pub async fn stats(headers: HeaderMap, state: Extension<Arc<AppState>>) -> Response {
    let Some(token) = bearer_token(&headers) else {
        return envelope::failure(StatusCode::UNAUTHORIZED, "Unauthorized");
    };

    let user = match state.auth.get_user(&token).await {
        Ok(user) => user,
        Err(err) => {
            debug!("stats request rejected: {err}");
            return envelope::failure(StatusCode::UNAUTHORIZED, "Invalid access token");
        }
    };

    match collect_stats(&state, user.id).await {
        Ok(stats) => envelope::ok(stats, "User statistics fetched"),
        Err(err) => {
            error!("Failed to collect user stats: {err}");
            envelope::failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch user statistics",
            )
        }
    }
}

async fn collect_stats(state: &AppState, user_id: Uuid) -> Result<UserStats> {
    let own_posts = format!("select=id&user_id=eq.{user_id}&is_deleted=eq.false");

    let posts_count = state.rest.count("posts", &own_posts).await?;

    let rows = state.rest.select("posts", &own_posts).await?;
    let post_ids: Vec<&str> = rows
        .iter()
        .filter_map(|row| row.get("id").and_then(Value::as_str))
        .collect();

    if post_ids.is_empty() {
        return Ok(UserStats {
            posts_count,
            likes_received: 0,
            comments_received: 0,
            rewards_received: 0,
        });
    }

    let id_list = post_ids.join(",");
    let likes_received = state
        .rest
        .count("likes", &format!("select=id&post_id=in.({id_list})"))
        .await?;
    let comments_received = state
        .rest
        .count("comments", &format!("select=id&post_id=in.({id_list})"))
        .await?;
    let rewards_received = state
        .rest
        .count(
            "rewards",
            &format!("select=id&post_id=in.({id_list})&status=eq.completed"),
        )
        .await?;

    Ok(UserStats {
        posts_count,
        likes_received,
        comments_received,
        rewards_received,
    })
}
