mod support;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::Response,
};
use pomo_auth::create_router;
use serde_json::{Value, json};
use support::{RecordingNotifier, app_state};
use tower::ServiceExt;

fn app() -> Router {
    create_router(app_state(RecordingNotifier::default()))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// `name=value` pair of the named cookie from Set-Cookie headers
fn cookie_pair(cookies: &[String], name: &str) -> Option<String> {
    cookies
        .iter()
        .find(|c| c.starts_with(&format!("{}=", name)))
        .and_then(|c| c.split(';').next())
        .map(str::to_string)
}

async fn register_and_login(app: &Router) -> Response {
    let response = app
        .clone()
        .oneshot(post_json(
            "/auth/register",
            json!({"email": "ada@example.com", "password": "hunter22"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    app.clone()
        .oneshot(post_json(
            "/auth/login",
            json!({"email": "ada@example.com", "password": "hunter22"}),
        ))
        .await
        .unwrap()
}

#[tokio::test]
async fn health_check() {
    let response = app()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn register_returns_user_without_hash() {
    let response = app()
        .oneshot(post_json(
            "/auth/register",
            json!({"email": "ada@example.com", "password": "hunter22"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["email"], "ada@example.com");
    assert!(body["data"].get("passwordHash").is_none());
}

#[tokio::test]
async fn duplicate_registration_is_a_conflict() {
    let app = app();
    let payload = json!({"email": "ada@example.com", "password": "hunter22"});
    app.clone()
        .oneshot(post_json("/auth/register", payload.clone()))
        .await
        .unwrap();

    let response = app
        .oneshot(post_json("/auth/register", payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["statusCode"], 409);
    assert_eq!(body["path"], "/auth/register");
}

#[tokio::test]
async fn invalid_registration_input_is_rejected() {
    let app = app();
    let response = app
        .clone()
        .oneshot(post_json(
            "/auth/register",
            json!({"email": "not-an-email", "password": "hunter22"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(post_json(
            "/auth/register",
            json!({"email": "ada@example.com", "password": "short"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(post_json("/auth/register", json!({"email": "ada@example.com"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_sets_http_only_cookies_and_returns_tokens() {
    let response = register_and_login(&app()).await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookies = set_cookies(&response);
    let access = cookies
        .iter()
        .find(|c| c.starts_with("access_token="))
        .unwrap();
    assert!(access.contains("HttpOnly"));
    assert!(access.contains("SameSite=Lax"));
    assert!(access.contains("Path=/"));
    assert!(access.contains("Max-Age=3600"));
    assert!(!access.contains("Secure"));

    let refresh = cookies
        .iter()
        .find(|c| c.starts_with("refresh_token="))
        .unwrap();
    assert!(refresh.contains("Max-Age=604800"));

    let body = body_json(response).await;
    let access_token = body["data"]["access_token"].as_str().unwrap();
    assert!(access.starts_with(&format!("access_token={}", access_token)));
    assert!(body["data"]["refresh_token"].is_string());
    assert_eq!(body["data"]["token_type"], "Bearer");
    assert_eq!(body["path"], "/auth/login");
}

#[tokio::test]
async fn bad_credentials_are_unauthorized() {
    let app = app();
    register_and_login(&app).await;

    for payload in [
        json!({"email": "ada@example.com", "password": "wrong-password"}),
        json!({"email": "nobody@example.com", "password": "hunter22"}),
    ] {
        let response = app
            .clone()
            .oneshot(post_json("/auth/login", payload))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["message"], "Invalid credentials");
    }
}

#[tokio::test]
async fn refresh_reads_cookie_only() {
    let app = app();
    let login = register_and_login(&app).await;
    let cookies = set_cookies(&login);
    let refresh_cookie = cookie_pair(&cookies, "refresh_token").unwrap();
    let body = body_json(login).await;

    // Token in the body is ignored
    let response = app
        .clone()
        .oneshot(post_json(
            "/auth/refresh",
            json!({"refresh_token": body["data"]["refresh_token"]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["message"], "Missing refresh token");

    let request = Request::post("/auth/refresh")
        .header(header::COOKIE, &refresh_cookie)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let rotated = cookie_pair(&set_cookies(&response), "refresh_token").unwrap();
    assert_ne!(rotated, refresh_cookie);

    // The rotated-away cookie no longer works
    let request = Request::post("/auth/refresh")
        .header(header::COOKIE, &refresh_cookie)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn profile_requires_access_token() {
    let app = app();
    let login = register_and_login(&app).await;
    let cookies = set_cookies(&login);
    let body = body_json(login).await;
    let access_token = body["data"]["access_token"].as_str().unwrap().to_string();
    let refresh_token = body["data"]["refresh_token"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(Request::get("/auth/profile").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["path"], "/auth/profile");

    let request = Request::get("/auth/profile")
        .header(header::AUTHORIZATION, format!("Bearer {}", access_token))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["email"], "ada@example.com");

    let request = Request::get("/auth/profile")
        .header(header::COOKIE, cookie_pair(&cookies, "access_token").unwrap())
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // A refresh token is not an access token
    let request = Request::get("/auth/profile")
        .header(header::AUTHORIZATION, format!("Bearer {}", refresh_token))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_clears_cookies_and_revokes_refresh() {
    let app = app();
    let login = register_and_login(&app).await;
    let cookies = set_cookies(&login);
    let access = cookie_pair(&cookies, "access_token").unwrap();
    let refresh = cookie_pair(&cookies, "refresh_token").unwrap();

    let request = Request::post("/auth/logout")
        .header(header::COOKIE, format!("{}; {}", access, refresh))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cleared = set_cookies(&response);
    assert!(cleared.iter().any(|c| c.starts_with("access_token=")));
    assert!(cleared.iter().any(|c| c.starts_with("refresh_token=")));

    let request = Request::post("/auth/refresh")
        .header(header::COOKIE, &refresh)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn otp_request_and_verify() {
    let notifier = RecordingNotifier::default();
    let app = create_router(app_state(notifier.clone()));

    let response = app
        .clone()
        .oneshot(post_json(
            "/otp/request",
            json!({"email": "ada@example.com", "reason": "login"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"], json!({"sent": true}));

    let code = notifier.last_code("ada@example.com").await.unwrap();
    let verify = json!({"email": "ada@example.com", "code": code});

    let response = app
        .clone()
        .oneshot(post_json("/otp/verify", verify.clone()))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["data"], json!({"valid": true}));

    let response = app
        .clone()
        .oneshot(post_json("/otp/verify", verify))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["data"], json!({"valid": false}));

    let response = app
        .oneshot(post_json(
            "/otp/request",
            json!({"email": "ada@example.com", "reason": "x"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn user_routes_require_authentication() {
    let app = app();
    let login = register_and_login(&app).await;
    let body = body_json(login).await;
    let bearer = format!("Bearer {}", body["data"]["access_token"].as_str().unwrap());

    let response = app
        .clone()
        .oneshot(Request::get("/users").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let request = Request::get("/users")
        .header(header::AUTHORIZATION, &bearer)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let users = body_json(response).await;
    let id = users["data"][0]["id"].as_str().unwrap().to_string();

    let request = Request::patch(format!("/users/{}", id))
        .header(header::AUTHORIZATION, &bearer)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"isActive": true}).to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["isActive"], true);

    let request = Request::get("/users/not-a-uuid")
        .header(header::AUTHORIZATION, &bearer)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let request = Request::delete(format!("/users/{}", id))
        .header(header::AUTHORIZATION, &bearer)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let request = Request::get(format!("/users/{}", id))
        .header(header::AUTHORIZATION, &bearer)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn users_cannot_modify_or_delete_other_accounts() {
    let app = app();
    let login = register_and_login(&app).await;
    let body = body_json(login).await;
    let bearer = format!("Bearer {}", body["data"]["access_token"].as_str().unwrap());

    let response = app
        .clone()
        .oneshot(post_json(
            "/auth/register",
            json!({"email": "bob@example.com", "password": "hunter22"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let bob_id = body_json(response).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let request = Request::patch(format!("/users/{}", bob_id))
        .header(header::AUTHORIZATION, &bearer)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"email": "mallory@example.com"}).to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let request = Request::delete(format!("/users/{}", bob_id))
        .header(header::AUTHORIZATION, &bearer)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Bob's account is untouched
    let response = app
        .oneshot(post_json(
            "/auth/login",
            json!({"email": "bob@example.com", "password": "hunter22"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
