mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
};
use common::{MockRepository, USER_ID, access_cookie, profile, signed_in_auth, test_state};
use guia_puntana::{AppState, MockStorageService, create_router, models::UploadResponse};
use std::sync::Arc;
use tower::util::ServiceExt;

fn state_with_profile() -> AppState {
    let repo = MockRepository::default().with_profile(profile(USER_ID, "user"));
    test_state(repo, signed_in_auth(USER_ID))
}

async fn post_upload(state: AppState, uri: &str, filename: &str, file_type: &str) -> Response {
    let body = serde_json::json!({ "filename": filename, "file_type": file_type });
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::COOKIE, access_cookie())
        .body(Body::from(body.to_string()))
        .unwrap();

    create_router(state).oneshot(request).await.unwrap()
}

async fn upload_body(response: Response) -> UploadResponse {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_avatar_upload_returns_presigned_and_public_urls() {
    let response = post_upload(state_with_profile(), "/perfil/avatar", "yo.PNG", "image/png").await;

    assert_eq!(response.status(), StatusCode::OK);
    let upload = upload_body(response).await;

    assert!(upload.upload_url.starts_with("http://localhost:9000/mock-avatars/"));
    assert!(upload.resource_key.starts_with(&format!("{USER_ID}/")));
    assert!(upload.resource_key.ends_with(".png"));

    let public_url = upload.public_url.unwrap();
    assert!(public_url.starts_with("http://localhost:54321/storage/v1/object/public/avatars/"));
    assert!(public_url.ends_with(&upload.resource_key));
}

#[tokio::test]
async fn test_avatar_must_be_an_image() {
    let response =
        post_upload(state_with_profile(), "/perfil/avatar", "cv.pdf", "application/pdf").await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_onboarding_avatar_upload_before_profile_exists() {
    let state = test_state(MockRepository::default(), signed_in_auth(USER_ID));

    let response =
        post_upload(state, "/completar-perfil/avatar", "foto.jpg", "image/jpeg").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(upload_body(response).await.public_url.is_some());
}

#[tokio::test]
async fn test_storage_failure_is_500() {
    let state = AppState {
        storage: Arc::new(MockStorageService::new_failing()),
        ..state_with_profile()
    };

    let response = post_upload(state, "/perfil/avatar", "yo.png", "image/png").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "internal error");
}

#[tokio::test]
async fn test_anonymous_upload_is_redirected_to_login() {
    let state = test_state(MockRepository::default(), guia_puntana::MockAuthService::new());
    let request = Request::builder()
        .method("POST")
        .uri("/perfil/avatar")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"filename":"a.png","file_type":"image/png"}"#))
        .unwrap();

    let response = create_router(state).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.headers()[header::LOCATION], "/login");
}

#[tokio::test]
async fn test_verification_request_goes_to_documents_bucket_once() {
    let state = state_with_profile();

    let first = post_upload(
        state.clone(),
        "/perfil/verificacion",
        "dni.frente.pdf",
        "application/pdf",
    )
    .await;
    assert_eq!(first.status(), StatusCode::CREATED);
    let upload = upload_body(first).await;
    assert!(upload.upload_url.starts_with("http://localhost:9000/mock-documents/"));
    assert!(upload.resource_key.ends_with(".pdf"));
    assert!(upload.public_url.is_none());

    // A second request while the first is pending.
    let second = post_upload(state, "/perfil/verificacion", "dni.jpg", "image/jpeg").await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_verified_profile_cannot_request_again() {
    let verified = guia_puntana::models::Profile {
        is_verified: true,
        ..profile(USER_ID, "user")
    };
    let state = test_state(
        MockRepository::default().with_profile(verified),
        signed_in_auth(USER_ID),
    );

    let response = post_upload(state, "/perfil/verificacion", "dni.pdf", "application/pdf").await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_verification_rejects_unsupported_documents() {
    let response = post_upload(
        state_with_profile(),
        "/perfil/verificacion",
        "dni.docx",
        "application/msword",
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
