//! Post listing and creation, proxied to PostgREST.
//!
//! Creation validates content locally before any credential or row work: an
//! empty or oversized body never reaches the persistence layer.

use crate::littlejoys::handlers::bearer_token;
use crate::littlejoys::{envelope, state::AppState};
use axum::{
    extract::{Extension, Query},
    http::{HeaderMap, StatusCode},
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error};
use utoipa::{IntoParams, ToSchema};

/// Content length ceiling, counted in characters like the frontend does.
pub const MAX_CONTENT_CHARS: usize = 500;

/// Columns returned for every post, author profile embedded.
const POST_COLUMNS: &str = "id,content,image_url,audio_url,location_data,weather_data,\
likes_count,comments_count,rewards_count,rewards_amount,created_at,\
user_profiles!posts_user_id_fkey(nickname,avatar_url)";

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PostsQuery {
    /// 1-based page number.
    pub page: Option<u32>,
    /// Page size, capped at 100.
    pub limit: Option<u32>,
    /// `latest` (default) or `hottest`.
    pub sort_type: Option<String>,
    /// Restrict to a single author.
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PostsPage {
    #[schema(value_type = Vec<Object>)]
    pub posts: Vec<Value>,
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePost {
    pub content: String,
    pub image_url: Option<String>,
    pub audio_url: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub location_data: Option<Value>,
    #[schema(value_type = Option<Object>)]
    pub weather_data: Option<Value>,
}

#[utoipa::path(
    get,
    path = "/api/posts",
    params(PostsQuery),
    responses(
        (status = 200, description = "Paginated post list", body = PostsPage),
        (status = 500, description = "Upstream failure")
    ),
    tag = "posts"
)]
pub async fn list(Query(query): Query<PostsQuery>, state: Extension<Arc<AppState>>) -> Response {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let offset = u64::from(page - 1) * u64::from(limit);
    let order = if query.sort_type.as_deref() == Some("hottest") {
        "likes_count.desc"
    } else {
        "created_at.desc"
    };

    let mut filters =
        format!("select={POST_COLUMNS}&is_deleted=eq.false&order={order}&offset={offset}&limit={limit}");
    let mut count_filters = String::from("select=id&is_deleted=eq.false");
    if let Some(user_id) = &query.user_id {
        filters.push_str(&format!("&user_id=eq.{user_id}"));
        count_filters.push_str(&format!("&user_id=eq.{user_id}"));
    }

    let posts = match state.rest.select("posts", &filters).await {
        Ok(rows) => rows,
        Err(err) => {
            error!("Failed to list posts: {err}");
            return envelope::failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch posts");
        }
    };

    let total = match state.rest.count("posts", &count_filters).await {
        Ok(total) => total,
        Err(err) => {
            error!("Failed to count posts: {err}");
            return envelope::failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch posts");
        }
    };

    let page_data = PostsPage {
        posts,
        pagination: Pagination {
            page,
            limit,
            total,
            pages: total.div_ceil(u64::from(limit)),
        },
    };

    envelope::ok(page_data, "Posts fetched")
}

#[utoipa::path(
    post,
    path = "/api/posts",
    request_body = CreatePost,
    responses(
        (status = 200, description = "Post created"),
        (status = 400, description = "Empty or oversized content"),
        (status = 401, description = "Missing or invalid bearer token")
    ),
    tag = "posts"
)]
pub async fn create(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    payload: Option<Json<CreatePost>>,
) -> Response {
    let Some(Json(post)) = payload else {
        return envelope::failure(StatusCode::BAD_REQUEST, "Missing payload");
    };

    // Validation runs before any credential or network work.
    let content = post.content.trim();
    if content.is_empty() {
        return envelope::failure(StatusCode::BAD_REQUEST, "Content must not be empty");
    }
    if post.content.chars().count() > MAX_CONTENT_CHARS {
        return envelope::failure(
            StatusCode::BAD_REQUEST,
            "Content must not exceed 500 characters",
        );
    }

    let Some(token) = bearer_token(&headers) else {
        return envelope::failure(StatusCode::UNAUTHORIZED, "Not signed in, please sign in first");
    };

    let user = match state.auth.get_user(&token).await {
        Ok(user) => user,
        Err(err) => {
            debug!("post creation rejected: {err}");
            return envelope::failure(
                StatusCode::UNAUTHORIZED,
                "Authentication failed, please sign in again",
            );
        }
    };

    let mut row = json!({
        "user_id": user.id,
        "content": content,
    });
    for (field, value) in [
        ("image_url", post.image_url.map(Value::String)),
        ("audio_url", post.audio_url.map(Value::String)),
        ("location_data", post.location_data),
        ("weather_data", post.weather_data),
    ] {
        if let Some(value) = value {
            row[field] = value;
        }
    }

    match state.rest.insert("posts", &row).await {
        Ok(created) => envelope::ok(created, "Post created"),
        Err(err) => {
            error!("Failed to create post: {err}");
            envelope::failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create post")
        }
    }
}
