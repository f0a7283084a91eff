use httpmock::prelude::*;
use pragma_sdk::{
    BuildStatus, ClientConfig, ClientError, DeploymentStatus, LifecycleState, PragmaClient,
    Resource, ResourceFilter,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
struct StubConfig {
    name: String,
    #[serde(default)]
    size: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
struct StubOutputs {
    url: String,
}

type StubResource = Resource<StubConfig, StubOutputs>;

fn client(server: &MockServer) -> PragmaClient {
    PragmaClient::new(ClientConfig::new(server.base_url()).anonymous()).unwrap()
}

/// Resource payload as the API returns it, without `provider`/`resource`.
fn resource_json(name: &str, state: &str) -> Value {
    json!({
        "name": name,
        "config": {"name": name},
        "lifecycle_state": state
    })
}

#[test]
fn test_client_requires_auth_when_asked() {
    let config = ClientConfig::new("http://localhost:8000")
        .anonymous()
        .require_auth(true);

    let err = PragmaClient::new(config).unwrap_err();
    assert!(matches!(err, ClientError::AuthenticationRequired(_)));
    assert!(err.to_string().contains("Authentication required"));
}

#[test]
fn test_client_rejects_invalid_base_url() {
    let err = PragmaClient::new(ClientConfig::new("not a url").anonymous()).unwrap_err();
    assert!(matches!(err, ClientError::InvalidUrl(_)));
}

#[test]
fn test_client_rejects_empty_explicit_token() {
    let err = PragmaClient::new(ClientConfig::new("http://localhost:8000").with_token(""))
        .unwrap_err();
    assert!(matches!(err, ClientError::InvalidCredentials(_)));
}

#[tokio::test]
async fn test_is_healthy_returns_true_when_api_ok() {
    let server = MockServer::start_async().await;
    let health = server
        .mock_async(|when, then| {
            when.method(GET).path("/health");
            then.status(200).json_body(json!({"status": "ok"}));
        })
        .await;

    assert!(client(&server).is_healthy().await);
    health.assert_async().await;
}

#[tokio::test]
async fn test_is_healthy_returns_false_on_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/health");
            then.status(500).json_body(json!({"status": "error"}));
        })
        .await;

    assert!(!client(&server).is_healthy().await);
}

#[tokio::test]
async fn test_is_healthy_returns_false_when_unreachable() {
    let client = PragmaClient::new(ClientConfig::new("http://127.0.0.1:9").anonymous()).unwrap();
    assert!(!client.is_healthy().await);
}

#[tokio::test]
async fn test_bearer_token_is_sent() {
    let server = MockServer::start_async().await;
    let me = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/auth/me")
                .header("authorization", "Bearer secret-token");
            then.status(200).json_body(json!({
                "user_id": "user_1",
                "email": "dev@example.com",
                "organization_id": "org_1",
                "organization_name": "Example"
            }));
        })
        .await;

    let client =
        PragmaClient::new(ClientConfig::new(server.base_url()).with_token("secret-token")).unwrap();
    assert!(client.is_authenticated());

    let user = client.get_me().await.unwrap();
    me.assert_async().await;
    assert_eq!(user.user_id, "user_1");
    assert_eq!(user.organization_name.as_deref(), Some("Example"));
}

#[tokio::test]
async fn test_list_resources_returns_json_values() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/resources/");
            then.status(200).json_body(json!([
                resource_json("db1", "ready"),
                resource_json("db2", "pending")
            ]));
        })
        .await;

    let resources: Vec<Value> = client(&server)
        .list_resources(&ResourceFilter::default())
        .await
        .unwrap();

    assert_eq!(resources.len(), 2);
    assert_eq!(resources[0]["name"], "db1");
    assert_eq!(resources[0]["lifecycle_state"], "ready");
    assert_eq!(resources[1]["lifecycle_state"], "pending");
}

#[tokio::test]
async fn test_list_resources_returns_typed_resources() {
    let server = MockServer::start_async().await;
    let list = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/resources/")
                .query_param("provider", "test")
                .query_param("resource", "stub");
            then.status(200).json_body(json!([
                resource_json("db1", "ready"),
                resource_json("db2", "pending")
            ]));
        })
        .await;

    let filter = ResourceFilter::provider("test").with_resource("stub");
    let resources: Vec<StubResource> = client(&server).list_resources(&filter).await.unwrap();

    list.assert_async().await;
    assert_eq!(resources[0].name, "db1");
    assert_eq!(resources[0].lifecycle_state, LifecycleState::Ready);
    assert_eq!(resources[1].lifecycle_state, LifecycleState::Pending);
    assert_eq!(resources[1].id(), "resource:test_stub_db2");
}

#[tokio::test]
async fn test_get_resource_uses_resource_id() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/resources/resource:test_stub_mydb");
            then.status(200).json_body(resource_json("mydb", "ready"));
        })
        .await;

    let client = client(&server);
    let raw: Value = client.get_resource("test", "stub", "mydb").await.unwrap();
    assert_eq!(raw["name"], "mydb");

    let typed: StubResource = client.get_resource("test", "stub", "mydb").await.unwrap();
    assert_eq!(typed.lifecycle_state, LifecycleState::Ready);
    assert_eq!(typed.config.name, "mydb");
    assert_eq!(typed.provider, "test");
    assert_eq!(typed.resource, "stub");
    assert_eq!(typed.id(), "resource:test_stub_mydb");
}

#[tokio::test]
async fn test_get_resource_keeps_payload_scope() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/resources/resource:test_stub_mydb");
            then.status(200).json_body(json!({
                "provider": "test",
                "resource": "stub",
                "name": "mydb",
                "config": {"name": "mydb"},
                "outputs": {"url": "postgres://mydb"},
                "lifecycle_state": "ready"
            }));
        })
        .await;

    let typed: StubResource = client(&server)
        .get_resource("test", "stub", "mydb")
        .await
        .unwrap();
    assert_eq!(typed.id(), "resource:test_stub_mydb");
    assert_eq!(typed.outputs.unwrap().url, "postgres://mydb");
}

#[tokio::test]
async fn test_get_resource_encodes_name() {
    let server = MockServer::start_async().await;
    let truncated = server
        .mock_async(|when, then| {
            when.method(GET).path("/resources/resource:test_stub_a");
            then.status(200).json_body(resource_json("a", "ready"));
        })
        .await;

    let result = client(&server)
        .get_resource::<Value>("test", "stub", "a#b")
        .await;

    assert!(result.is_err());
    assert_eq!(truncated.hits_async().await, 0);
}

#[tokio::test]
async fn test_apply_resource_posts_body() {
    let server = MockServer::start_async().await;
    let apply = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/resources/apply")
                .json_body_partial(r#"{"name": "mydb", "config": {"name": "mydb", "size": 5}}"#);
            then.status(200).json_body(resource_json("mydb", "pending"));
        })
        .await;

    let resource = StubResource::new(
        "test",
        "stub",
        "mydb",
        StubConfig {
            name: "mydb".to_string(),
            size: 5,
        },
    );
    let applied: StubResource = client(&server).apply_resource(&resource).await.unwrap();

    apply.assert_async().await;
    assert_eq!(applied.name, "mydb");
    assert_eq!(applied.lifecycle_state, LifecycleState::Pending);
    assert_eq!(applied.id(), "resource:test_stub_mydb");
}

#[tokio::test]
async fn test_apply_resource_accepts_raw_json() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/resources/apply");
            then.status(200).json_body(resource_json("mydb", "pending"));
        })
        .await;

    let applied: Value = client(&server)
        .apply_resource(&json!({"name": "mydb", "config": {}}))
        .await
        .unwrap();
    assert_eq!(applied["lifecycle_state"], "pending");
}

#[tokio::test]
async fn test_delete_resource() {
    let server = MockServer::start_async().await;
    let delete = server
        .mock_async(|when, then| {
            when.method(DELETE).path("/resources/resource:test_stub_mydb");
            then.status(204);
        })
        .await;

    client(&server)
        .delete_resource("test", "stub", "mydb")
        .await
        .unwrap();
    delete.assert_async().await;
}

#[tokio::test]
async fn test_not_found_maps_to_status_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/resources/resource:test_db_notfound");
            then.status(404).json_body(json!({"detail": "Not found"}));
        })
        .await;

    let err = client(&server)
        .get_resource::<Value>("test", "db", "notfound")
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    match err {
        ClientError::Status { status, detail, url } => {
            assert_eq!(status, 404);
            assert_eq!(detail, "Not found");
            assert!(url.ends_with("/resources/resource:test_db_notfound"));
        },
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_invalid_body_maps_to_decode_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/providers/my-provider/deployment");
            then.status(200).json_body(json!({"unexpected": true}));
        })
        .await;

    let err = client(&server)
        .get_deployment_status("my-provider")
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Decode(_)));
}

#[tokio::test]
async fn test_push_provider_uploads_multipart() {
    let server = MockServer::start_async().await;
    let push = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/providers/my-provider/push")
                .body_contains("name=\"code\"")
                .body_contains("tarball-content");
            then.status(202).json_body(json!({
                "version": "20250115.120000",
                "status": "pending",
                "message": "Build started"
            }));
        })
        .await;

    let result = client(&server)
        .push_provider("my-provider", b"tarball-content".to_vec())
        .await
        .unwrap();

    push.assert_async().await;
    assert_eq!(result.version, "20250115.120000");
    assert_eq!(result.status, BuildStatus::Pending);
    assert_eq!(result.message, "Build started");
}

#[tokio::test]
async fn test_get_build_status() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/providers/my-provider/builds/20250115.120000");
            then.status(200).json_body(json!({
                "provider_id": "my-provider",
                "version": "20250115.120000",
                "status": "failed",
                "error_message": "Dockerfile syntax error",
                "created_at": "2025-01-15T12:00:00Z"
            }));
        })
        .await;

    let build = client(&server)
        .get_build_status("my-provider", "20250115.120000")
        .await
        .unwrap();

    assert_eq!(build.provider_id, "my-provider");
    assert_eq!(build.status, BuildStatus::Failed);
    assert_eq!(build.error_message.as_deref(), Some("Dockerfile syntax error"));
}

#[tokio::test]
async fn test_get_build_status_not_found() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/providers/my-provider/builds/20250115.999999");
            then.status(404).json_body(json!({"detail": "Build not found"}));
        })
        .await;

    let err = client(&server)
        .get_build_status("my-provider", "20250115.999999")
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_list_builds() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/providers/my-provider/builds");
            then.status(200).json_body(json!([
                {
                    "provider_id": "my-provider",
                    "version": "20250115.120000",
                    "status": "success",
                    "created_at": "2025-01-15T12:00:00Z"
                },
                {
                    "provider_id": "my-provider",
                    "version": "20250115.130000",
                    "status": "building",
                    "created_at": "2025-01-15T13:00:00Z"
                }
            ]));
        })
        .await;

    let builds = client(&server).list_builds("my-provider").await.unwrap();
    assert_eq!(builds.len(), 2);
    assert_eq!(builds[0].status, BuildStatus::Success);
    assert_eq!(builds[1].status, BuildStatus::Building);
}

#[tokio::test]
async fn test_deploy_provider_with_version() {
    let server = MockServer::start_async().await;
    let deploy = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/providers/my-provider/deploy")
                .json_body(json!({"version": "20250115.120000"}));
            then.status(202).json_body(json!({
                "status": "progressing",
                "version": "20250115.120000",
                "updated_at": null,
                "healthy": false
            }));
        })
        .await;

    let status = client(&server)
        .deploy_provider("my-provider", Some("20250115.120000"))
        .await
        .unwrap();

    deploy.assert_async().await;
    assert_eq!(status.status, DeploymentStatus::Progressing);
    assert_eq!(status.version.as_deref(), Some("20250115.120000"));
    assert!(!status.healthy);
}

#[tokio::test]
async fn test_deploy_provider_without_version_deploys_latest() {
    let server = MockServer::start_async().await;
    let deploy = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/providers/my-provider/deploy")
                .json_body(json!({}));
            then.status(202).json_body(json!({
                "status": "progressing",
                "version": "20250115.130000",
                "updated_at": null,
                "healthy": false
            }));
        })
        .await;

    let status = client(&server)
        .deploy_provider("my-provider", None)
        .await
        .unwrap();

    deploy.assert_async().await;
    assert_eq!(status.version.as_deref(), Some("20250115.130000"));
}

#[tokio::test]
async fn test_rollback_provider() {
    let server = MockServer::start_async().await;
    let rollback = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/providers/my-provider/rollback")
                .json_body(json!({"version": "20250114.090000"}));
            then.status(202).json_body(json!({
                "status": "progressing",
                "version": "20250114.090000",
                "healthy": false
            }));
        })
        .await;

    let status = client(&server)
        .rollback_provider("my-provider", "20250114.090000")
        .await
        .unwrap();

    rollback.assert_async().await;
    assert_eq!(status.version.as_deref(), Some("20250114.090000"));
}

#[tokio::test]
async fn test_get_deployment_status() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/providers/my-provider/deployment");
            then.status(200).json_body(json!({
                "status": "available",
                "version": "20250115.120000",
                "updated_at": "2025-01-15T12:00:00Z",
                "healthy": true
            }));
        })
        .await;

    let status = client(&server)
        .get_deployment_status("my-provider")
        .await
        .unwrap();

    assert_eq!(status.status, DeploymentStatus::Available);
    assert!(status.healthy);
    assert!(status.updated_at.is_some());
}

#[tokio::test]
async fn test_list_and_delete_providers() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/providers/");
            then.status(200).json_body(json!([
                {"provider_id": "postgres", "current_version": "20250115.120000", "deployment_status": "available"},
                {"provider_id": "redis"}
            ]));
        })
        .await;
    let delete = server
        .mock_async(|when, then| {
            when.method(DELETE)
                .path("/providers/postgres")
                .query_param("cascade", "true");
            then.status(200).json_body(json!({
                "provider_id": "postgres",
                "deployment_deleted": true,
                "resources_deleted": 3
            }));
        })
        .await;

    let client = client(&server);
    let providers = client.list_providers().await.unwrap();
    assert_eq!(providers.len(), 2);
    assert_eq!(providers[0].deployment_status, Some(DeploymentStatus::Available));
    assert_eq!(providers[1].current_version, None);

    let result = client.delete_provider("postgres", true).await.unwrap();
    delete.assert_async().await;
    assert!(result.deployment_deleted);
    assert_eq!(result.resources_deleted, 3);
}
