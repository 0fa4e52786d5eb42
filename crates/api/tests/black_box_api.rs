use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

use astral_api::identity::Hs256IdentityProvider;
use astral_auth::SessionClaims;
use astral_core::{CourseId, StudentId, SystemClock};
use astral_infra::{Database, OperationSettings, Operations};

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod over a fresh in-memory database, on an ephemeral port.
        let operations = Operations::new(
            Arc::new(Database::new()),
            Arc::new(SystemClock),
            OperationSettings::default(),
        );
        let provider = Arc::new(Hs256IdentityProvider::new(JWT_SECRET.as_bytes()));
        let app = astral_api::app::build_app_with(operations, provider);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post(&self, token: &str, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap();
        read(res).await
    }

    async fn put(&self, token: &str, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self
            .client
            .put(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap();
        read(res).await
    }

    async fn get(&self, token: &str, path: &str) -> (StatusCode, Value) {
        let res = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        read(res).await
    }

    /// Register a user for `subject` and return its bearer token.
    async fn register(&self, subject: &str, email: &str) -> String {
        let token = mint_jwt(subject);
        let (status, _) = self
            .post(&token, "/users", json!({ "display_name": subject, "email": email }))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        token
    }

    /// Register a school founded by a fresh admin; returns (admin token, institution id).
    async fn school(&self, admin_subject: &str, name: &str) -> (String, String) {
        let admin = self
            .register(admin_subject, &format!("{admin_subject}@astral.test"))
            .await;
        let (status, body) = self.post(&admin, "/institutions", json!({ "name": name })).await;
        assert_eq!(status, StatusCode::CREATED);
        (admin, body["id"].as_str().unwrap().to_string())
    }

    /// Invite `subject` into the admin's school with `role` and accept.
    async fn join(&self, admin: &str, institution_id: &str, subject: &str, role: &str) -> String {
        let email = format!("{subject}@astral.test");
        let token = self.register(subject, &email).await;

        let (status, _) = self
            .post(admin, "/memberships/invitations", json!({ "email": email, "role": role }))
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) = self
            .post(&token, &format!("/institutions/{institution_id}/accept"), json!({}))
            .await;
        assert_eq!(status, StatusCode::OK);
        token
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn read(res: reqwest::Response) -> (StatusCode, Value) {
    let status = res.status();
    let body = res.json().await.unwrap_or(Value::Null);
    (status, body)
}

fn mint_jwt(subject: &str) -> String {
    let now = Utc::now();
    let claims = SessionClaims::new(
        subject,
        now - ChronoDuration::minutes(1),
        now + ChronoDuration::minutes(10),
    );

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn class_content(course_id: CourseId, date: &str) -> Value {
    json!({
        "course_id": course_id,
        "date": date,
        "body": { "type": "CLASS_CONTENT", "content": "Fracciones equivalentes" },
    })
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_token_is_authentication_required() {
    let srv = TestServer::spawn().await;

    let res = srv.client.get(srv.url("/whoami")).send().await.unwrap();
    let (status, body) = read(res).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "authentication_required");
}

#[tokio::test]
async fn token_signed_with_another_secret_is_rejected() {
    let srv = TestServer::spawn().await;

    let now = Utc::now();
    let claims = SessionClaims::new("auth|intruso", now, now + ChronoDuration::minutes(5));
    let forged = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(b"not-the-secret"),
    )
    .unwrap();

    let (status, body) = srv.get(&forged, "/whoami").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_token");
}

#[tokio::test]
async fn unregistered_subject_is_user_not_found() {
    let srv = TestServer::spawn().await;
    let (status, body) = srv.get(&mint_jwt("auth|nadie"), "/whoami").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "user_not_found");
}

#[tokio::test]
async fn tenancy_is_derived_from_membership() {
    let srv = TestServer::spawn().await;
    let (admin, institution_id) = srv.school("auth|directora", "Escuela Los Aromos").await;

    let (status, body) = srv.get(&admin, "/whoami").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["institution"]["id"], institution_id.as_str());
    assert_eq!(body["membership_role"], "ADMIN");
    assert_eq!(body["is_master"], false);
}

#[tokio::test]
async fn record_lifecycle_over_http() {
    let srv = TestServer::spawn().await;
    let (admin, institution_id) = srv.school("auth|directora", "Escuela Los Aromos").await;
    let profe = srv.join(&admin, &institution_id, "auth|profe", "PROFESOR").await;
    let course_id = CourseId::new();

    // create
    let (status, created) = srv.post(&profe, "/records", class_content(course_id, "2025-03-10")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["state"], "OPEN");
    assert_eq!(created["record"]["period"], "2025-S1");
    let record_id = created["record"]["id"].as_str().unwrap().to_string();

    // sign
    let (status, signature) = srv
        .post(
            &profe,
            &format!("/records/{record_id}/signatures"),
            json!({ "payload": "sha256:abc", "method": "ELECTRONIC" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(signature["record_id"], record_id.as_str());

    let (_, view) = srv.get(&profe, &format!("/records/{record_id}")).await;
    assert_eq!(view["state"], "SIGNED");

    // certify
    let (status, certification) = srv
        .post(
            &admin,
            &format!("/records/{record_id}/certifications"),
            json!({ "certification_type": "DAILY" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(certification["status"], "CERTIFIED");

    let (_, history) = srv.get(&admin, &format!("/records/{record_id}/certifications")).await;
    assert_eq!(history.as_array().unwrap().len(), 1);

    // certified records are frozen
    let (status, body) = srv
        .put(
            &profe,
            &format!("/records/{record_id}"),
            json!({ "body": { "type": "CLASS_CONTENT", "content": "Otra cosa" } }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "record_certified");

    // lock the period; new records in scope are refused
    let (status, lock) = srv
        .post(
            &admin,
            "/locks",
            json!({ "course_id": course_id, "period": "2025-S1", "target": "ALL", "reason": "cierre" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = srv.post(&profe, "/records", class_content(course_id, "2025-03-11")).await;
    assert_eq!(status, StatusCode::LOCKED);
    assert_eq!(body["error"], "record_locked");

    let (_, view) = srv.get(&profe, &format!("/records/{record_id}")).await;
    assert_eq!(view["state"], "LOCKED");

    // unlock restores create
    let lock_id = lock["id"].as_str().unwrap();
    let (status, _) = srv.post(&admin, &format!("/locks/{lock_id}/unlock"), json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = srv.post(&profe, "/records", class_content(course_id, "2025-03-11")).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, listed) = srv
        .get(&profe, &format!("/courses/{course_id}/records?period=2025-S1"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn future_dates_are_refused() {
    let srv = TestServer::spawn().await;
    let (admin, institution_id) = srv.school("auth|directora", "Escuela Los Aromos").await;
    let profe = srv.join(&admin, &institution_id, "auth|profe", "PROFESOR").await;

    let (status, body) = srv
        .post(&profe, "/records", class_content(CourseId::new(), "2099-01-01"))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "future_date");
}

#[tokio::test]
async fn records_of_another_school_are_not_found() {
    let srv = TestServer::spawn().await;
    let (admin_a, school_a) = srv.school("auth|directora-a", "Escuela A").await;
    let profe = srv.join(&admin_a, &school_a, "auth|profe", "PROFESOR").await;
    let (admin_b, _) = srv.school("auth|directora-b", "Escuela B").await;

    let (_, created) = srv.post(&profe, "/records", class_content(CourseId::new(), "2025-03-10")).await;
    let record_id = created["record"]["id"].as_str().unwrap();

    let (status, body) = srv.get(&admin_b, &format!("/records/{record_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn parents_cannot_author_records() {
    let srv = TestServer::spawn().await;
    let (admin, institution_id) = srv.school("auth|directora", "Escuela Los Aromos").await;
    let parent = srv.join(&admin, &institution_id, "auth|apoderado", "PARENT").await;

    let body = json!({
        "course_id": CourseId::new(),
        "date": "2025-03-10",
        "body": { "type": "ATTENDANCE", "student_id": StudentId::new(), "status": "PRESENT" },
    });
    let (status, body) = srv.post(&parent, "/records", body).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "insufficient_role");
}

#[tokio::test]
async fn malformed_path_ids_are_bad_requests() {
    let srv = TestServer::spawn().await;
    let (admin, _) = srv.school("auth|directora", "Escuela Los Aromos").await;

    let (status, body) = srv.get(&admin, "/records/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_id");
}
