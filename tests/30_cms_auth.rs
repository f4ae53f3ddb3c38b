mod common;

use anyhow::Result;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use common::{json_request, test_config, TestApp, ADMIN_PASSWORD};
use serde_json::json;

#[tokio::test]
async fn cms_requires_credentials() -> Result<()> {
    let app = TestApp::new();
    let res = app.get("/api/cms/gallery-images").await?;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["message"], "Authentication required");
    assert_eq!(res.body["code"], "UNAUTHORIZED");
    Ok(())
}

#[tokio::test]
async fn wrong_password_is_rejected() -> Result<()> {
    let app = TestApp::new();

    let res = app
        .send(json_request(Method::POST, "/api/cms/login", json!({ "password": "nope" }))?)
        .await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = app
        .send(
            Request::get("/api/cms/session")
                .header("x-cms-password", "nope")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn login_issues_token_and_cookie() -> Result<()> {
    let app = TestApp::new();
    let res = app
        .send(json_request(Method::POST, "/api/cms/login", json!({ "password": ADMIN_PASSWORD }))?)
        .await?;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["token_type"], "bearer");
    assert_eq!(res.data()["expires_in"], 3600);

    let token = res.data()["access_token"].as_str().unwrap();
    let cookie = res.headers[header::SET_COOKIE].to_str()?;
    assert!(cookie.starts_with(&format!("cms_token={};", token)));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(!cookie.contains("Secure"));
    Ok(())
}

#[tokio::test]
async fn bearer_token_opens_session() -> Result<()> {
    let app = TestApp::new();
    let token = app.login().await?;

    let res = app
        .send(
            Request::get("/api/cms/session")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["authenticated"], true);
    assert_eq!(res.data()["role"], "admin");
    assert!(res.data()["expires_at"].is_string());
    Ok(())
}

#[tokio::test]
async fn session_cookie_is_accepted() -> Result<()> {
    let app = TestApp::new();
    let token = app.login().await?;

    let res = app
        .send(
            Request::get("/api/cms/gallery-images")
                .header(header::COOKIE, format!("cms_token={}", token))
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data().as_array().map(Vec::len), Some(0));
    Ok(())
}

#[tokio::test]
async fn forged_token_is_rejected() -> Result<()> {
    let app = TestApp::new();

    let res = app
        .send(
            Request::get("/api/cms/session")
                .header(header::AUTHORIZATION, "Bearer not.a.jwt")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    // Token signed with another secret
    let mut other = test_config().security;
    other.jwt_secret = "someone-else".to_string();
    let (token, _) = gallery_api::auth::generate_jwt(&other)?;
    let res = app
        .send(
            Request::get("/api/cms/session")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn logout_expires_cookie() -> Result<()> {
    let app = TestApp::new();
    let res = app.admin(Method::POST, "/api/cms/logout", None).await?;

    assert_eq!(res.status, StatusCode::OK);
    let cookie = res.headers[header::SET_COOKIE].to_str()?;
    assert!(cookie.starts_with("cms_token=;"));
    assert!(cookie.contains("Max-Age=0"));
    Ok(())
}

#[tokio::test]
async fn login_is_rate_limited_per_client() -> Result<()> {
    let mut config = test_config();
    config.api.enable_rate_limiting = true;
    let app = TestApp::with_config(config);

    let attempt = |ip: &'static str| -> Result<Request<Body>> {
        Ok(Request::post("/api/cms/login")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", ip)
            .body(Body::from(json!({ "password": "wrong" }).to_string()))?)
    };

    for _ in 0..5 {
        let res = app.send(attempt("198.51.100.1")?).await?;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    }

    let res = app.send(attempt("198.51.100.1")?).await?;
    assert_eq!(res.status, StatusCode::TOO_MANY_REQUESTS);
    assert!(res.headers.contains_key(header::RETRY_AFTER));

    let res = app.send(attempt("198.51.100.2")?).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    Ok(())
}
