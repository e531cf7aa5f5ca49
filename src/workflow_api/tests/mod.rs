use super::*;
use crate::error::ApiError;
use crate::types::{ArtifactId, RunConclusion, RunId, RunStatus};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{bearer_token, body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "ghp_test_token";

fn token() -> SecretString {
    SecretString::from(TOKEN.to_string())
}

fn client_for(server: &MockServer) -> WorkflowClient {
    let config = ApiConfig {
        api_base_url: server.uri(),
        metadata_timeout: Duration::from_secs(5),
        download_timeout: Duration::from_secs(5),
        ..ApiConfig::default()
    };
    WorkflowClient::new(&config).unwrap()
}

fn api_status(err: Error) -> ApiError {
    match err {
        Error::Api(api) => api,
        other => panic!("expected an API error, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Identity and repositories
// ---------------------------------------------------------------------------

#[tokio::test]
async fn current_user_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .and(bearer_token(TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "login": "octo",
            "name": "Octo Cat",
            "email": null,
            "id": 1
        })))
        .expect(1)
        .mount(&server)
        .await;

    let identity = client_for(&server).current_user(&token()).await.unwrap();

    assert_eq!(identity.login, "octo");
    assert_eq!(identity.display_name(), "Octo Cat");
    assert_eq!(
        identity.commit_email("users.noreply.github.com"),
        "octo@users.noreply.github.com"
    );
}

#[tokio::test]
async fn rejected_token_reports_status_and_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "Bad credentials" })),
        )
        .mount(&server)
        .await;

    let err = client_for(&server).current_user(&token()).await.unwrap_err();

    match api_status(err) {
        ApiError::AuthenticationFailed { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Bad credentials");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn failure_without_json_message_uses_default() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(403).set_body_string("<html>nope</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server).current_user(&token()).await.unwrap_err();

    match api_status(err) {
        ApiError::AuthenticationFailed { status, message } => {
            assert_eq!(status, 403);
            assert_eq!(message, "Invalid token");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn repo_exists_maps_200_and_404() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/present"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "present",
            "full_name": "octo/present",
            "private": true
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/absent"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" })))
        .mount(&server)
        .await;

    let client = client_for(&server);

    assert!(client.repo_exists(&token(), "octo", "present").await.unwrap());
    assert!(!client.repo_exists(&token(), "octo", "absent").await.unwrap());
}

#[tokio::test]
async fn repo_lookup_server_error_is_not_absence() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/flaky"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "message": "boom" })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .repo_exists(&token(), "octo", "flaky")
        .await
        .unwrap_err();

    match api_status(err) {
        ApiError::RepoLookupFailed {
            repo,
            status,
            message,
        } => {
            assert_eq!(repo, "octo/flaky");
            assert_eq!(status, 500);
            assert_eq!(message, "boom");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn create_repo_posts_visibility_without_auto_init() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/user/repos"))
        .and(bearer_token(TOKEN))
        .and(body_json(json!({
            "name": "my-store",
            "private": true,
            "auto_init": false
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "name": "my-store",
            "full_name": "octo/my-store",
            "private": true,
            "html_url": "https://github.com/octo/my-store"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let repo = client_for(&server)
        .create_repo(&token(), "my-store", true)
        .await
        .unwrap();

    assert_eq!(repo.full_name, "octo/my-store");
    assert!(repo.private);
}

#[tokio::test]
async fn create_repo_failure_carries_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/user/repos"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "message": "Repository creation failed."
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .create_repo(&token(), "my-store", false)
        .await
        .unwrap_err();

    match api_status(err) {
        ApiError::RepoCreationFailed {
            name,
            status,
            message,
        } => {
            assert_eq!(name, "my-store");
            assert_eq!(status, 422);
            assert_eq!(message, "Repository creation failed.");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Workflow runs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_runs_filters_push_events_on_branch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/my-store/actions/runs"))
        .and(query_param("event", "push"))
        .and(query_param("branch", "main"))
        .and(query_param("per_page", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 2,
            "workflow_runs": [
                {
                    "id": 12,
                    "name": "Android",
                    "status": "in_progress",
                    "conclusion": null,
                    "created_at": "2026-01-01T10:00:05Z"
                },
                {
                    "id": 11,
                    "name": null,
                    "status": "completed",
                    "conclusion": "failure",
                    "created_at": "2026-01-01T10:00:01Z"
                }
            ]
        })))
        .mount(&server)
        .await;

    let runs = client_for(&server)
        .list_runs(&token(), "octo", "my-store", "main")
        .await
        .unwrap();

    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].id, RunId(12));
    assert_eq!(runs[0].status, RunStatus::InProgress);
    assert_eq!(runs[1].display_name(), "Run #11");
    assert_eq!(runs[1].conclusion, Some(RunConclusion::Failure));
}

#[tokio::test]
async fn list_runs_failure_is_typed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/my-store/actions/runs"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .list_runs(&token(), "octo", "my-store", "main")
        .await
        .unwrap_err();

    assert!(matches!(
        api_status(err),
        ApiError::RunListFailed { status: 503, .. }
    ));
}

#[tokio::test]
async fn get_run_returns_current_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/my-store/actions/runs/77"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 77,
            "name": "iOS",
            "status": "completed",
            "conclusion": "success",
            "created_at": "2026-01-01T10:00:00Z",
            "html_url": "https://github.com/octo/my-store/actions/runs/77"
        })))
        .mount(&server)
        .await;

    let run = client_for(&server)
        .get_run(&token(), "octo", "my-store", RunId(77))
        .await
        .unwrap();

    assert!(run.succeeded());
    assert_eq!(run.display_name(), "iOS");
}

#[tokio::test]
async fn get_run_not_found_names_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/my-store/actions/runs/78"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .get_run(&token(), "octo", "my-store", RunId(78))
        .await
        .unwrap_err();

    match api_status(err) {
        ApiError::RunFetchFailed {
            run_id,
            status,
            message,
        } => {
            assert_eq!(run_id, RunId(78));
            assert_eq!(status, 404);
            assert_eq!(message, "Not Found");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Artifacts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_artifacts_includes_expired() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/my-store/actions/runs/5/artifacts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 2,
            "artifacts": [
                { "id": 1, "name": "app-debug", "expired": false, "size_in_bytes": 1024 },
                { "id": 2, "name": "old-build", "expired": true, "size_in_bytes": 10 }
            ]
        })))
        .mount(&server)
        .await;

    let artifacts = client_for(&server)
        .list_artifacts(&token(), "octo", "my-store", RunId(5))
        .await
        .unwrap();

    assert_eq!(artifacts.len(), 2);
    assert_eq!(artifacts[0].id, ArtifactId(1));
    assert!(!artifacts[0].expired);
    assert!(artifacts[1].expired);
}

#[tokio::test]
async fn download_follows_redirect_without_credentials() {
    let server = MockServer::start().await;
    let signed = format!("{}/signed/blob-1?sig=abc", server.uri());

    Mock::given(method("GET"))
        .and(path("/repos/octo/my-store/actions/artifacts/9/zip"))
        .and(bearer_token(TOKEN))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", signed.as_str()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/signed/blob-1"))
        .and(query_param("sig", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK zip bytes".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let bytes = client_for(&server)
        .download_artifact(&token(), "octo", "my-store", ArtifactId(9))
        .await
        .unwrap();

    assert_eq!(bytes, b"PK zip bytes");

    let requests = server.received_requests().await.unwrap();
    let signed_fetch = requests
        .iter()
        .find(|r| r.url.path() == "/signed/blob-1")
        .expect("signed URL was fetched");
    assert!(
        signed_fetch.headers.get("authorization").is_none(),
        "signed URL must be fetched without credentials"
    );
}

#[tokio::test]
async fn artifact_location_captures_relative_redirect() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/my-store/actions/artifacts/3/zip"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/signed/three"))
        .mount(&server)
        .await;

    let location = client_for(&server)
        .artifact_location(&token(), "octo", "my-store", ArtifactId(3))
        .await
        .unwrap();

    match location {
        DownloadLocation::Redirect(url) => assert_eq!(url.path(), "/signed/three"),
        other => panic!("expected a redirect, got {other:?}"),
    }
}

#[tokio::test]
async fn inline_body_is_rejected_as_missing_redirect() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/my-store/actions/artifacts/4/zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"inline".to_vec()))
        .mount(&server)
        .await;

    let client = client_for(&server);

    let location = client
        .artifact_location(&token(), "octo", "my-store", ArtifactId(4))
        .await
        .unwrap();
    assert_eq!(location, DownloadLocation::Body(b"inline".to_vec()));

    let err = client
        .download_artifact(&token(), "octo", "my-store", ArtifactId(4))
        .await
        .unwrap_err();
    assert!(matches!(
        api_status(err),
        ApiError::ExpectedRedirect {
            artifact_id: ArtifactId(4),
            status: 200
        }
    ));
}

#[tokio::test]
async fn artifact_endpoint_error_is_expected_redirect() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/my-store/actions/artifacts/6/zip"))
        .respond_with(ResponseTemplate::new(410).set_body_json(json!({ "message": "Gone" })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .download_artifact(&token(), "octo", "my-store", ArtifactId(6))
        .await
        .unwrap_err();

    assert!(matches!(
        api_status(err),
        ApiError::ExpectedRedirect { status: 410, .. }
    ));
}

#[tokio::test]
async fn signed_url_failure_is_download_failed() {
    let server = MockServer::start().await;
    let signed = format!("{}/signed/expired", server.uri());
    Mock::given(method("GET"))
        .and(path("/repos/octo/my-store/actions/artifacts/8/zip"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", signed.as_str()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/signed/expired"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .download_artifact(&token(), "octo", "my-store", ArtifactId(8))
        .await
        .unwrap_err();

    assert!(matches!(
        api_status(err),
        ApiError::DownloadFailed {
            artifact_id: ArtifactId(8),
            status: 403
        }
    ));
}

#[tokio::test]
async fn slow_metadata_call_times_out_as_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "login": "octo" }))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let config = ApiConfig {
        api_base_url: server.uri(),
        metadata_timeout: Duration::from_millis(50),
        ..ApiConfig::default()
    };
    let err = WorkflowClient::new(&config)
        .unwrap()
        .current_user(&token())
        .await
        .unwrap_err();

    match err {
        Error::Network(e) => assert!(e.is_timeout()),
        other => panic!("expected a network timeout, got {other:?}"),
    }
}

#[test]
fn malformed_base_url_is_rejected() {
    let config = ApiConfig {
        api_base_url: "not a url".to_string(),
        ..ApiConfig::default()
    };
    assert!(matches!(
        WorkflowClient::new(&config),
        Err(Error::InvalidUrl(_))
    ));
}
