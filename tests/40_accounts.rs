mod common;

use anyhow::Result;
use docreq_api::database::ProfileStore;
use reqwest::StatusCode;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn app_with_identity() -> Result<(common::TestApp, MockServer)> {
    let identity = MockServer::start().await;
    let app = common::spawn_app_with(common::TestOptions {
        identity_base_url: Some(format!("{}/v1", identity.uri())),
        ..Default::default()
    })
    .await?;
    Ok((app, identity))
}

async fn mock_sign_in(server: &MockServer, email: &str, uid: &str, id_token: String) {
    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithPassword"))
        .and(body_partial_json(json!({ "email": email })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "idToken": id_token,
            "localId": uid,
            "email": email,
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn admin_login_checks_role_and_verification() -> Result<()> {
    let (app, identity) = app_with_identity().await?;
    mock_sign_in(&identity, "boss@school.test", "boss", common::token("boss", Some("admin"))).await;
    mock_sign_in(
        &identity,
        "new@school.test",
        "new",
        common::token_with("new", Some("admin"), false, 3600),
    )
    .await;
    mock_sign_in(&identity, "teach@school.test", "teach", common::token("teach", Some("personnel"))).await;
    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithPassword"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "code": 400, "message": "INVALID_LOGIN_CREDENTIALS" }
        })))
        .mount(&identity)
        .await;

    let login = |email: &str| {
        app.client
            .post(app.url("/auth/login"))
            .json(&json!({ "email": email, "password": "pw" }))
            .send()
    };

    let res = login("boss@school.test").await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    assert_eq!(body["uid"], "boss");
    assert_eq!(body["role"], "admin");
    assert_eq!(body["email"], "boss@school.test");
    assert!(body["token"].as_str().is_some());

    assert_eq!(login("new@school.test").await?.status(), StatusCode::FORBIDDEN);
    assert_eq!(login("teach@school.test").await?.status(), StatusCode::FORBIDDEN);
    assert_eq!(login("stranger@school.test").await?.status(), StatusCode::UNAUTHORIZED);

    let res = app
        .client
        .post(app.url("/auth/login"))
        .json(&json!({ "email": "boss@school.test" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn user_login_uses_profile_role() -> Result<()> {
    let (app, identity) = app_with_identity().await?;
    app.add_profile("kid", "étudiant").await;
    mock_sign_in(&identity, "kid@school.test", "kid", common::token("kid", None)).await;
    mock_sign_in(&identity, "ghost@school.test", "ghost", common::token("ghost", None)).await;

    let res = app
        .client
        .post(app.url("/auth/user/login"))
        .json(&json!({ "email": "kid@school.test", "password": "pw" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    assert_eq!(body["role"], "étudiant");
    assert_eq!(body["uid"], "kid");

    let res = app
        .client
        .post(app.url("/auth/user/login"))
        .json(&json!({ "email": "ghost@school.test", "password": "pw" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn password_reset_round_trip() -> Result<()> {
    let (app, identity) = app_with_identity().await?;
    Mock::given(method("POST"))
        .and(path("/v1/accounts:sendOobCode"))
        .and(body_partial_json(json!({ "requestType": "PASSWORD_RESET", "email": "kid@school.test" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "email": "kid@school.test" })))
        .expect(1)
        .mount(&identity)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/accounts:resetPassword"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "message": "INVALID_OOB_CODE" }
        })))
        .mount(&identity)
        .await;

    let res = app
        .client
        .post(app.url("/auth/password-reset"))
        .json(&json!({ "email": "kid@school.test" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .client
        .post(app.url("/auth/reset-password"))
        .json(&json!({ "oobCode": "stale", "newPassword": "new-secret" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn admin_manages_users() -> Result<()> {
    let (app, identity) = app_with_identity().await?;
    app.add_profile("boss", "admin").await;
    app.add_profile("teach", "personnel").await;
    let admin = common::token("boss", Some("admin"));

    Mock::given(method("POST"))
        .and(path("/v1/accounts:signUp"))
        .and(header("authorization", format!("Bearer {}", common::SERVICE_TOKEN).as_str()))
        .and(body_partial_json(json!({ "email": "new@school.test", "displayName": "Ada Lovelace" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "localId": "new-uid" })))
        .mount(&identity)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/accounts:delete"))
        .and(header("authorization", format!("Bearer {}", common::SERVICE_TOKEN).as_str()))
        .and(body_partial_json(json!({ "localId": "teach" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&identity)
        .await;

    // Only admins
    let res = app.get("/auth/users", &common::token("teach", Some("personnel"))).send().await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = app
        .post("/auth/add-user", &admin)
        .json(&json!({ "email": "x@school.test" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app
        .post("/auth/users", &admin)
        .json(&json!({
            "email": "new@school.test",
            "password": "secret-1",
            "firstName": "Ada",
            "lastName": "Lovelace",
            "role": "student"
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(res.json::<Value>().await?["uid"], "new-uid");

    let stored = app.store.get_profile("new-uid").await?.unwrap();
    assert_eq!(stored.status, "inactive");
    assert_eq!(stored.promotion, "");
    let sent = app.mailer.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "new@school.test");
    assert!(!sent[0].body.contains("secret-1"));

    let users = app.get("/auth/users", &admin).send().await?.json::<Value>().await?;
    let uids: Vec<&str> = users.as_array().unwrap().iter().map(|u| u["uid"].as_str().unwrap()).collect();
    assert_eq!(uids, vec!["new-uid", "teach"]);

    let profile = app.get("/auth/profile", &admin).send().await?.json::<Value>().await?;
    assert_eq!(profile, json!({ "firstName": "boss", "lastName": "", "email": "boss@school.test" }));

    let res = app
        .put("/auth/users/new-uid", &admin)
        .json(&json!({ "firstName": "Augusta", "email": "new@school.test", "role": "parent" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let updated = app.store.get_profile("new-uid").await?.unwrap();
    assert_eq!(updated.first_name, "Augusta");
    assert_eq!(updated.last_name, "");
    assert_eq!(updated.role, "parent");

    let res = app.delete("/auth/users/teach", &admin).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(app.store.get_profile("teach").await?.is_none());

    for res in [
        app.get("/auth/users/teach", &admin).send().await?,
        app.delete("/auth/users/teach", &admin).send().await?,
        app.put("/auth/users/ghost", &admin).json(&json!({})).send().await?,
    ] {
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
    Ok(())
}
