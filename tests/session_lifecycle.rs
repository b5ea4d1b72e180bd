//! End-to-end tests for the client session lifecycle: sign-in, token
//! canonicalization, 401-triggered teardown, single-shot refresh and the
//! auth-event subscription, all driven against in-process mock servers.

use axum::{
    extract::RawQuery,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use base64ct::{Base64UrlUnpadded, Encoding};
use littlejoys::auth::AuthFlow;
use littlejoys::gateway::navigate::{Navigator, LOGIN_PATH};
use littlejoys::gateway::notify::{Notifier, Severity};
use littlejoys::gateway::{ApiError, Gateway};
use littlejoys::session::events::StoreSync;
use littlejoys::session::storage::{MemoryStorage, Storage};
use littlejoys::session::store::SessionStore;
use littlejoys::supabase::auth::AuthClient;
use littlejoys::token::{claims, TokenAccessor, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const PROJECT_REF: &str = "qnwmhygv";

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_secs() as i64
}

fn mint_token(exp: i64) -> String {
    let header = Base64UrlUnpadded::encode_string(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = Base64UrlUnpadded::encode_string(
        json!({ "sub": "u1", "email": "user@x.com", "exp": exp })
            .to_string()
            .as_bytes(),
    );
    format!("{header}.{payload}.signature")
}

async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("should bind an ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .await
            .expect("mock server");
    });
    format!("http://{addr}")
}

#[derive(Default)]
struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    fn messages(&self) -> Vec<String> {
        self.messages.lock().expect("lock").clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, _severity: Severity, message: &str) {
        self.messages.lock().expect("lock").push(message.to_string());
    }
}

struct RecordingNavigator {
    current: String,
    visits: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    fn at(path: &str) -> Self {
        Self {
            current: path.to_string(),
            visits: Mutex::new(Vec::new()),
        }
    }

    fn visits(&self) -> Vec<String> {
        self.visits.lock().expect("lock").clone()
    }
}

impl Navigator for RecordingNavigator {
    fn current_path(&self) -> String {
        self.current.clone()
    }

    fn navigate(&self, path: &str) {
        self.visits.lock().expect("lock").push(path.to_string());
    }
}

struct Harness {
    storage: Arc<MemoryStorage>,
    store: SessionStore,
    tokens: TokenAccessor,
    notifier: Arc<RecordingNotifier>,
    navigator: Arc<RecordingNavigator>,
}

fn harness(current_path: &str) -> Harness {
    let storage = Arc::new(MemoryStorage::new());
    let store = SessionStore::load(storage.clone() as Arc<dyn Storage>);
    let tokens = TokenAccessor::new(storage.clone() as Arc<dyn Storage>, PROJECT_REF);
    Harness {
        storage,
        store,
        tokens,
        notifier: Arc::new(RecordingNotifier::default()),
        navigator: Arc::new(RecordingNavigator::at(current_path)),
    }
}

fn gateway(h: &Harness, base_url: &str) -> Gateway {
    Gateway::new(
        base_url,
        h.tokens.clone(),
        h.store.clone(),
        h.notifier.clone(),
        h.navigator.clone(),
    )
    .expect("gateway should build")
}

fn auth_key_count(storage: &MemoryStorage) -> usize {
    storage
        .keys()
        .into_iter()
        .filter(|key| {
            let lowered = key.to_lowercase();
            lowered.contains("auth")
                || lowered.contains("token")
                || lowered.contains("supabase")
                || lowered.contains("sb-")
        })
        .count()
}

/// Mock GoTrue with password + refresh grants and a user endpoint.
fn mock_gotrue() -> Router {
    Router::new()
        .route(
            "/auth/v1/token",
            post(|RawQuery(query): RawQuery, Json(body): Json<Value>| async move {
                let query = query.unwrap_or_default();
                if query.contains("grant_type=password") {
                    if body["password"] == "Password1" {
                        return (
                            StatusCode::OK,
                            Json(json!({
                                "access_token": mint_token(unix_now() + 3600),
                                "refresh_token": "r1",
                                "expires_at": unix_now() + 3600,
                                "user": {
                                    "id": "6a96e0a1-6f54-4d4c-8329-4d55e1a0e6cb",
                                    "email": "user@x.com",
                                    "created_at": "2024-05-01T00:00:00Z",
                                    "user_metadata": { "nickname": "joy" }
                                }
                            })),
                        );
                    }
                    return (
                        StatusCode::BAD_REQUEST,
                        Json(json!({ "error_description": "Invalid login credentials" })),
                    );
                }
                if query.contains("grant_type=refresh_token") {
                    if body["refresh_token"] == "r1" {
                        return (
                            StatusCode::OK,
                            Json(json!({
                                "access_token": mint_token(unix_now() + 7200),
                                "refresh_token": "r2",
                                "expires_at": unix_now() + 7200
                            })),
                        );
                    }
                    return (
                        StatusCode::BAD_REQUEST,
                        Json(json!({ "error_description": "Invalid Refresh Token" })),
                    );
                }
                (StatusCode::BAD_REQUEST, Json(json!({ "msg": "bad grant" })))
            }),
        )
        .route(
            "/auth/v1/logout",
            post(|| async { StatusCode::NO_CONTENT }),
        )
}

fn flow(h: &Harness, provider: Arc<AuthClient>) -> AuthFlow {
    AuthFlow::new(
        provider,
        h.store.clone(),
        h.tokens.clone(),
        h.notifier.clone(),
        h.navigator.clone(),
    )
}

#[tokio::test]
async fn teardown_after_401_is_complete() {
    let h = harness("/profile");
    // A live token plus provider-managed and ad-hoc leftovers.
    h.storage.set(ACCESS_TOKEN_KEY, &mint_token(unix_now() + 3600));
    h.storage.set(REFRESH_TOKEN_KEY, "r1");
    h.storage.set("user_info", r#"{"id":"u1"}"#);
    h.storage
        .set(&format!("sb-{PROJECT_REF}-auth-token"), "{}");
    h.storage.set("supabase.gotrue.session", "{}");
    h.storage.set("theme", "dark");

    let base_url = spawn_server(Router::new().route(
        "/api/users/stats",
        get(|| async {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "success": false, "message": "Invalid access token" })),
            )
        }),
    ))
    .await;

    let gateway = gateway(&h, &base_url);
    let result = gateway.get_json::<Value>("/api/users/stats").await;
    assert!(matches!(result, Err(ApiError::Unauthorized)));

    // Storage holds nothing auth-related, the store is signed out, exactly
    // one notice fired, and the user landed on the login page.
    assert_eq!(auth_key_count(&h.storage), 0);
    assert_eq!(h.storage.get("theme"), Some("dark".to_string()));
    assert!(!h.store.is_authenticated());
    assert_eq!(h.store.user(), None);
    assert_eq!(h.notifier.messages().len(), 1);
    assert_eq!(h.navigator.visits(), vec![LOGIN_PATH.to_string()]);
}

#[tokio::test]
async fn teardown_at_login_does_not_redirect() {
    let h = harness(LOGIN_PATH);
    h.storage.set(ACCESS_TOKEN_KEY, &mint_token(unix_now() + 3600));

    let base_url = spawn_server(Router::new().route(
        "/api/posts",
        get(|| async { StatusCode::UNAUTHORIZED }),
    ))
    .await;

    let gateway = gateway(&h, &base_url);
    let result = gateway.get_json::<Value>("/api/posts").await;
    assert!(matches!(result, Err(ApiError::Unauthorized)));

    assert_eq!(auth_key_count(&h.storage), 0);
    assert!(!h.store.is_authenticated());
    assert!(h.navigator.visits().is_empty());
}

#[tokio::test]
async fn expired_token_is_not_attached_and_401_still_tears_down() {
    let h = harness("/");
    h.storage.set(ACCESS_TOKEN_KEY, &mint_token(unix_now() - 60));

    // The route answers 400 if any Authorization header arrives, otherwise
    // the 401 the property calls for.
    let base_url = spawn_server(Router::new().route(
        "/api/users/stats",
        get(|headers: HeaderMap| async move {
            if headers.contains_key("authorization") {
                StatusCode::BAD_REQUEST.into_response()
            } else {
                StatusCode::UNAUTHORIZED.into_response()
            }
        }),
    ))
    .await;

    let gateway = gateway(&h, &base_url);
    let result = gateway.get_json::<Value>("/api/users/stats").await;

    assert!(matches!(result, Err(ApiError::Unauthorized)));
    assert_eq!(auth_key_count(&h.storage), 0);
    assert!(!h.store.is_authenticated());
}

#[tokio::test]
async fn non_auth_failures_leave_the_session_alone() {
    let h = harness("/");
    let token = mint_token(unix_now() + 3600);
    h.storage.set(ACCESS_TOKEN_KEY, &token);

    let base_url = spawn_server(
        Router::new()
            .route("/forbidden", get(|| async { StatusCode::FORBIDDEN }))
            .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
            .route(
                "/broken",
                get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
            ),
    )
    .await;

    let gateway = gateway(&h, &base_url);
    assert!(matches!(
        gateway.get_json::<Value>("/forbidden").await,
        Err(ApiError::Forbidden)
    ));
    assert!(matches!(
        gateway.get_json::<Value>("/missing").await,
        Err(ApiError::NotFound)
    ));
    assert!(matches!(
        gateway.get_json::<Value>("/broken").await,
        Err(ApiError::Server { status: 500 })
    ));

    // Only the 401 path mutates session state.
    assert_eq!(h.storage.get(ACCESS_TOKEN_KEY), Some(token));
    assert!(h.navigator.visits().is_empty());
    assert_eq!(h.notifier.messages().len(), 3);
}

#[tokio::test]
async fn sign_in_happy_path_populates_session_and_tokens() {
    let h = harness("/");
    let base_url = spawn_server(mock_gotrue()).await;
    let provider = Arc::new(AuthClient::new(&base_url, "anon-key").expect("client"));
    let flow = flow(&h, provider);

    let result = flow.sign_in("user@x.com", "Password1").await;

    assert!(result.success);
    let user = result.user.expect("user should be returned");
    assert_eq!(user.id.to_string(), "6a96e0a1-6f54-4d4c-8329-4d55e1a0e6cb");
    assert_eq!(h.store.user().map(|u| u.id), Some(user.id));
    assert!(h.store.is_authenticated());
    assert!(!h.store.is_loading());

    // Canonical keys are populated and the accessor resolves the token.
    assert!(h.storage.get(ACCESS_TOKEN_KEY).is_some());
    assert_eq!(h.storage.get(REFRESH_TOKEN_KEY), Some("r1".to_string()));
    assert!(h.tokens.access_token().is_some());
}

#[tokio::test]
async fn sign_in_rejection_resolves_loading() {
    let h = harness("/");
    let base_url = spawn_server(mock_gotrue()).await;
    let provider = Arc::new(AuthClient::new(&base_url, "anon-key").expect("client"));
    let flow = flow(&h, provider);

    let result = flow.sign_in("user@x.com", "wrong").await;

    assert!(!result.success);
    assert!(result
        .error
        .as_deref()
        .is_some_and(|err| err.contains("Invalid login credentials")));
    assert!(!h.store.is_loading());
    assert!(!h.store.is_authenticated());
}

#[tokio::test]
async fn unreachable_provider_resolves_loading() {
    let h = harness("/");
    // Nothing listens here; the connection is refused immediately.
    let provider = Arc::new(AuthClient::new("http://127.0.0.1:9", "anon-key").expect("client"));
    let flow = flow(&h, provider);

    let result = flow.sign_in("user@x.com", "Password1").await;

    assert!(!result.success);
    assert!(!h.store.is_loading());
}

#[tokio::test]
async fn refresh_then_retry_yields_a_later_expiry() {
    let h = harness("/");
    let stale = mint_token(unix_now() + 10); // inside the 30s skew
    let stale_exp = claims::decode(&stale).expect("claims").exp.expect("exp");
    h.storage.set(ACCESS_TOKEN_KEY, &stale);
    h.storage.set(REFRESH_TOKEN_KEY, "r1");

    let base_url = spawn_server(mock_gotrue()).await;
    let provider = Arc::new(AuthClient::new(&base_url, "anon-key").expect("client"));
    let flow = flow(&h, provider);

    // The stale token cannot be resolved directly.
    assert_eq!(h.tokens.access_token(), None);

    assert!(flow.try_refresh_token().await);

    let fresh = h.tokens.access_token().expect("fresh token");
    let fresh_exp = claims::decode(&fresh).expect("claims").exp.expect("exp");
    assert!(fresh_exp > stale_exp);
    assert_eq!(h.storage.get(REFRESH_TOKEN_KEY), Some("r2".to_string()));
}

#[tokio::test]
async fn ensure_valid_token_refreshes_once_and_tears_down_on_dead_refresh() {
    let h = harness("/settings");
    h.storage.set(REFRESH_TOKEN_KEY, "r1");

    let base_url = spawn_server(mock_gotrue()).await;
    let provider = Arc::new(AuthClient::new(&base_url, "anon-key").expect("client"));
    let flow = flow(&h, provider.clone());

    let token = flow.ensure_valid_token().await;
    assert!(token.is_some());
    assert!(h.navigator.visits().is_empty());

    // Now with a refresh token the provider rejects: full teardown.
    h.tokens.purge();
    h.storage.set(REFRESH_TOKEN_KEY, "revoked");
    let token = flow.ensure_valid_token().await;
    assert!(token.is_none());
    assert_eq!(auth_key_count(&h.storage), 0);
    assert_eq!(h.navigator.visits(), vec![LOGIN_PATH.to_string()]);
}

#[tokio::test]
async fn sign_out_clears_locally_even_when_offline() {
    let h = harness("/");
    h.storage.set(ACCESS_TOKEN_KEY, &mint_token(unix_now() + 3600));
    h.storage.set(REFRESH_TOKEN_KEY, "r1");

    // Provider is unreachable; local cleanup must still succeed.
    let provider = Arc::new(AuthClient::new("http://127.0.0.1:9", "anon-key").expect("client"));
    let flow = flow(&h, provider);

    let result = flow.sign_out().await;

    assert!(result.success);
    assert_eq!(auth_key_count(&h.storage), 0);
    assert!(!h.store.is_authenticated());
    assert!(!h.store.is_loading());
}

#[tokio::test]
async fn auth_events_reach_subscribed_stores() {
    let h = harness("/");
    let base_url = spawn_server(mock_gotrue()).await;
    let provider = Arc::new(AuthClient::new(&base_url, "anon-key").expect("client"));

    // A second store, synchronized purely through the event subscription.
    let mirror = SessionStore::load(Arc::new(MemoryStorage::new()));
    let sync = StoreSync::attach(&provider, mirror.clone());

    let flow = flow(&h, provider);
    let result = flow.sign_in("user@x.com", "Password1").await;
    assert!(result.success);

    // Give the forwarding task a moment to drain the event.
    for _ in 0..50 {
        if mirror.is_authenticated() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(mirror.is_authenticated());

    flow.sign_out().await;
    for _ in 0..50 {
        if !mirror.is_authenticated() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(!mirror.is_authenticated());

    drop(sync);
}
