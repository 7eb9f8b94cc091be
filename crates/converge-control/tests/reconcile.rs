//! End-to-end reconciliation scenarios against a scripted orchestrator.

use std::sync::Arc;

use converge_client::{Method, MockTransport, StatusCode};
use converge_control::{
    AppSpec, DeploymentSource, DesiredState, Operation, Reconcile, ReconcileError, Reconciler,
    ReconcilerConfig, ReconciliationRequest,
};
use serde_json::json;

const URI: &str = "http://marathon.mesos:8080/";

fn setup() -> (Reconciler<MockTransport>, Arc<MockTransport>) {
    let transport = Arc::new(MockTransport::new());
    let reconciler = Reconciler::new(Arc::clone(&transport), URI, &ReconcilerConfig::default());
    (reconciler, transport)
}

fn cache_spec() -> AppSpec {
    AppSpec::new("/cache")
        .with_resources(0.5, 256.0)
        .with_instances(1)
        .with_docker_image("redis:6")
}

#[tokio::test(start_paused = true)]
async fn creates_missing_app_and_waits_for_deployment() {
    let (reconciler, transport) = setup();
    transport
        .on_status(Method::GET, "/apps/cache", 404)
        .on(
            Method::POST,
            "/apps",
            201,
            json!({"id": "/cache", "deployments": [{"id": "dep-1"}]}),
        )
        .on(Method::GET, "/deployments", 200, json!([{"id": "dep-1"}]))
        .on(Method::GET, "/deployments", 200, json!([{"id": "dep-1"}]))
        .on(Method::GET, "/deployments", 200, json!([]));

    let request =
        ReconciliationRequest::new(cache_spec(), DesiredState::Present).with_wait_timeout(30);
    let outcome = reconciler.reconcile(&request).await.unwrap();

    assert!(outcome.result.changed);
    assert_eq!(outcome.uri, URI);
    assert_eq!(outcome.state, DesiredState::Present);
    assert_eq!(outcome.result.meta["id"], "/cache");
    let deployment = outcome.result.deployment.unwrap();
    assert_eq!(deployment.id.as_str(), "dep-1");
    assert_eq!(deployment.source, DeploymentSource::Response);

    assert_eq!(transport.count(&Method::POST, "/apps"), 1);
    assert_eq!(transport.count(&Method::GET, "/deployments"), 3);

    let create = transport
        .calls()
        .into_iter()
        .find(|call| call.method == Method::POST)
        .unwrap();
    assert_eq!(
        create.body,
        Some(json!({
            "id": "/cache",
            "cpus": 0.5,
            "mem": 256.0,
            "instances": 1,
            "container": {
                "type": "DOCKER",
                "docker": {
                    "image": "redis:6",
                    "network": "NONE",
                    "forcePullImage": false,
                    "privileged": false,
                    "parameters": [],
                    "portMappings": []
                },
                "volumes": []
            }
        }))
    );
}

#[tokio::test]
async fn present_is_idempotent() {
    let (reconciler, transport) = setup();
    transport
        .on(Method::GET, "/apps/cache", 200, json!({"app": {"id": "/cache", "deployments": []}}))
        .on(
            Method::PUT,
            "/apps/cache?force=false",
            200,
            json!({"deploymentId": "dep-2", "version": "2024-05-01T10:00:00.000Z"}),
        )
        .on(
            Method::PUT,
            "/apps/cache?force=false",
            200,
            json!({"version": "2024-05-01T10:00:00.000Z"}),
        );

    let request = ReconciliationRequest::new(cache_spec(), DesiredState::Present);

    let first = reconciler.reconcile(&request).await.unwrap();
    assert!(first.result.changed);
    assert_eq!(first.result.deployment.unwrap().id.as_str(), "dep-2");

    let second = reconciler.reconcile(&request).await.unwrap();
    assert!(!second.result.changed);
    assert!(second.result.deployment.is_none());

    assert_eq!(transport.count_method(&Method::POST), 0);
    assert_eq!(transport.count_method(&Method::PUT), 2);
}

#[tokio::test]
async fn update_sends_force_flag() {
    let (reconciler, transport) = setup();
    transport
        .on(Method::GET, "/apps/cache", 200, json!({"app": {"id": "/cache"}}))
        .on(Method::PUT, "/apps/cache?force=true", 200, json!({"deploymentId": "dep-3"}));

    let request =
        ReconciliationRequest::new(cache_spec(), DesiredState::Present).with_force(true);
    let outcome = reconciler.reconcile(&request).await.unwrap();

    assert!(outcome.result.changed);
    assert_eq!(transport.count(&Method::PUT, "/apps/cache?force=true"), 1);
}

#[tokio::test(start_paused = true)]
async fn stuck_app_is_destroyed_and_recreated() {
    let (reconciler, transport) = setup();
    transport
        .on(
            Method::GET,
            "/apps/cache",
            200,
            json!({"app": {"id": "/cache", "deployments": [{"id": "stuck-1"}]}}),
        )
        .on(Method::DELETE, "/apps/cache?force=true", 200, json!({"deploymentId": "del-1"}))
        .on(
            Method::POST,
            "/apps",
            201,
            json!({"id": "/cache", "deployments": [{"id": "dep-4"}]}),
        );

    let request = ReconciliationRequest::new(cache_spec(), DesiredState::Present);
    let outcome = reconciler.reconcile(&request).await.unwrap();

    assert!(outcome.result.changed);
    assert_eq!(transport.count_method(&Method::DELETE), 1);
    assert_eq!(transport.count_method(&Method::POST), 1);
    assert_eq!(transport.count_method(&Method::PUT), 0);

    let methods: Vec<_> = transport.calls().into_iter().map(|c| c.method).collect();
    assert_eq!(methods, [Method::GET, Method::DELETE, Method::POST]);

    let recovery = outcome.result.recovery.unwrap();
    assert_eq!(recovery.stuck_deployments.len(), 1);
    assert_eq!(recovery.stuck_deployments[0].id.as_str(), "stuck-1");
    assert_eq!(recovery.stuck_deployments[0].source, DeploymentSource::LiveDeployments);
    assert_eq!(
        outcome.result.meta["stuckDeploymentRecovery"]["stuckDeployments"][0]["id"],
        "stuck-1"
    );
}

#[tokio::test(start_paused = true)]
async fn stuck_recovery_waits_for_removal_before_create() {
    let (reconciler, transport) = setup();
    transport
        .on(
            Method::GET,
            "/apps/cache",
            200,
            json!({"app": {"id": "/cache", "deployments": [{"id": "stuck-1"}]}}),
        )
        .on(Method::DELETE, "/apps/cache?force=true", 200, json!({"deploymentId": "del-1"}))
        .on(Method::GET, "/deployments", 200, json!([{"id": "del-1"}]))
        .on(Method::GET, "/deployments", 200, json!([]))
        .on(Method::POST, "/apps", 201, json!({"id": "/cache", "deploymentId": "dep-5"}));

    let request =
        ReconciliationRequest::new(cache_spec(), DesiredState::Present).with_wait_timeout(10);
    let outcome = reconciler.reconcile(&request).await.unwrap();

    assert!(outcome.result.changed);
    let paths: Vec<_> = transport
        .calls()
        .into_iter()
        .map(|c| format!("{} {}", c.method, c.path))
        .collect();
    assert_eq!(
        paths,
        [
            "GET /apps/cache",
            "DELETE /apps/cache?force=true",
            "GET /deployments",
            "GET /deployments",
            "POST /apps",
            "GET /deployments",
        ]
    );
}

#[tokio::test]
async fn absent_on_missing_app_is_unchanged() {
    let (reconciler, transport) = setup();
    transport.on(
        Method::DELETE,
        "/apps/cache?force=false",
        404,
        json!({"message": "App '/cache' does not exist"}),
    );

    let request = ReconciliationRequest::new(AppSpec::new("cache"), DesiredState::Absent);
    let outcome = reconciler.reconcile(&request).await.unwrap();

    assert!(!outcome.result.changed);
    assert_eq!(outcome.state, DesiredState::Absent);
    assert_eq!(transport.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn absent_waits_and_drops_deployment() {
    let (reconciler, transport) = setup();
    transport
        .on(Method::DELETE, "/apps/cache?force=false", 200, json!({"deploymentId": "del-2"}))
        .on(Method::GET, "/deployments", 200, json!([{"id": "del-2"}]))
        .on(Method::GET, "/deployments", 200, json!([]));

    let request =
        ReconciliationRequest::new(AppSpec::new("/cache"), DesiredState::Absent).with_wait_timeout(5);
    let outcome = reconciler.reconcile(&request).await.unwrap();

    assert!(outcome.result.changed);
    assert!(outcome.result.deployment.is_none());
    assert_eq!(transport.count(&Method::GET, "/deployments"), 2);
}

#[tokio::test]
async fn absent_without_wait_keeps_deployment() {
    let (reconciler, transport) = setup();
    transport.on(Method::DELETE, "/apps/cache?force=false", 200, json!({"deploymentId": "del-3"}));

    let request = ReconciliationRequest::new(AppSpec::new("/cache"), DesiredState::Absent);
    let outcome = reconciler.reconcile(&request).await.unwrap();

    assert!(outcome.result.changed);
    assert_eq!(outcome.result.deployment.unwrap().id.as_str(), "del-3");
    assert_eq!(transport.count(&Method::GET, "/deployments"), 0);
}

#[tokio::test(start_paused = true)]
async fn restart_always_changes() {
    let (reconciler, transport) = setup();
    transport
        .on(
            Method::POST,
            "/apps/cache/restart?force=false",
            200,
            json!({"deploymentId": "rst-1", "version": "2024-05-01T10:00:00.000Z"}),
        )
        .on(Method::GET, "/deployments", 200, json!([]));

    let request =
        ReconciliationRequest::new(AppSpec::new("/cache"), DesiredState::Restarted).with_wait_timeout(5);
    let outcome = reconciler.reconcile(&request).await.unwrap();

    assert!(outcome.result.changed);
    assert_eq!(outcome.state, DesiredState::Restarted);
    assert_eq!(transport.count(&Method::GET, "/deployments"), 1);

    let calls = transport.calls();
    assert_eq!(calls[0].body, Some(json!({"force": false})));
}

#[tokio::test]
async fn kill_with_no_tasks_does_not_poll() {
    let (reconciler, transport) = setup();
    transport.on(Method::DELETE, "/apps/cache/tasks", 200, json!({"tasks": []}));

    let request =
        ReconciliationRequest::new(AppSpec::new("/cache"), DesiredState::Killed).with_wait_timeout(30);
    let outcome = reconciler.reconcile(&request).await.unwrap();

    assert!(!outcome.result.changed);
    assert_eq!(transport.count(&Method::GET, "/deployments"), 0);
}

#[tokio::test(start_paused = true)]
async fn kill_with_deployment_waits() {
    let (reconciler, transport) = setup();
    transport
        .on(
            Method::DELETE,
            "/apps/cache/tasks",
            200,
            json!({"tasks": [{"id": "cache.1"}], "deployments": [{"id": "kill-1"}]}),
        )
        .on(Method::GET, "/deployments", 200, json!([]));

    let request =
        ReconciliationRequest::new(AppSpec::new("/cache"), DesiredState::Killed).with_wait_timeout(30);
    let outcome = reconciler.reconcile(&request).await.unwrap();

    assert!(outcome.result.changed);
    assert_eq!(outcome.result.deployment.unwrap().id.as_str(), "kill-1");
    assert_eq!(transport.count(&Method::GET, "/deployments"), 1);
}

#[tokio::test]
async fn kill_on_missing_app_is_unchanged() {
    let (reconciler, transport) = setup();
    transport.on_status(Method::DELETE, "/apps/cache/tasks", 404);

    let request = ReconciliationRequest::new(AppSpec::new("/cache"), DesiredState::Killed);
    let outcome = reconciler.reconcile(&request).await.unwrap();

    assert!(!outcome.result.changed);
}

#[tokio::test]
async fn missing_id_fails_before_any_call() {
    let (reconciler, transport) = setup();

    let request = ReconciliationRequest::new(AppSpec::new(""), DesiredState::Present);
    let err = reconciler.reconcile(&request).await.unwrap_err();

    assert!(matches!(err, ReconcileError::Validation(_)));
    assert_eq!(err.exit_code(), 2);
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn malformed_id_fails_before_any_call() {
    let (reconciler, transport) = setup();

    let request = ReconciliationRequest::new(AppSpec::new("/Team/Cache"), DesiredState::Absent);
    let err = reconciler.reconcile(&request).await.unwrap_err();

    assert!(matches!(err, ReconcileError::Validation(_)));
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn rejected_update_reports_status_and_document() {
    let (reconciler, transport) = setup();
    transport
        .on(Method::GET, "/apps/cache", 200, json!({"app": {"id": "/cache"}}))
        .on(
            Method::PUT,
            "/apps/cache?force=false",
            409,
            json!({"message": "App is locked by one or more deployments."}),
        );

    let request = ReconciliationRequest::new(cache_spec(), DesiredState::Present);
    let err = reconciler.reconcile(&request).await.unwrap_err();

    let ReconcileError::Transport {
        operation,
        status,
        message,
        request,
        ..
    } = &err
    else {
        panic!("expected transport error, got {err:?}");
    };
    assert_eq!(*operation, Operation::Update);
    assert_eq!(*status, StatusCode::CONFLICT);
    assert_eq!(message, "App is locked by one or more deployments.");
    assert_eq!(request.as_ref().unwrap()["id"], "/cache");
    assert_eq!(err.exit_code(), 3);
}

#[tokio::test]
async fn failed_fetch_aborts_present() {
    let (reconciler, transport) = setup();
    transport.on_status(Method::GET, "/apps/cache", 500);

    let request = ReconciliationRequest::new(cache_spec(), DesiredState::Present);
    let err = reconciler.reconcile(&request).await.unwrap_err();

    assert!(matches!(
        err,
        ReconcileError::Transport {
            operation: Operation::Fetch,
            ..
        }
    ));
    assert_eq!(transport.calls().len(), 1);
}

#[tokio::test]
async fn unreachable_orchestrator_is_a_client_error() {
    let (reconciler, transport) = setup();
    transport.fail(Method::GET, "/apps/cache", "connection refused");

    let request = ReconciliationRequest::new(cache_spec(), DesiredState::Present);
    let err = reconciler.reconcile(&request).await.unwrap_err();

    assert!(matches!(err, ReconcileError::Client(_)));
    assert_eq!(err.exit_code(), 3);
}

#[tokio::test(start_paused = true)]
async fn wait_timeout_surfaces_as_timeout_error() {
    let (reconciler, transport) = setup();
    transport
        .on(Method::POST, "/apps/cache/restart?force=false", 200, json!({"deploymentId": "rst-2"}))
        .on(Method::GET, "/deployments", 200, json!([{"id": "rst-2"}]));

    let request =
        ReconciliationRequest::new(AppSpec::new("/cache"), DesiredState::Restarted).with_wait_timeout(2);
    let err = reconciler.reconcile(&request).await.unwrap_err();

    assert!(matches!(err, ReconcileError::DeploymentTimeout { timeout_secs: 2, .. }));
    assert_eq!(err.exit_code(), 4);
}

#[tokio::test]
async fn zero_wait_timeout_does_not_poll() {
    let (reconciler, transport) = setup();
    transport.on(Method::POST, "/apps/cache/restart?force=false", 200, json!({"deploymentId": "rst-3"}));

    let request =
        ReconciliationRequest::new(AppSpec::new("/cache"), DesiredState::Restarted).with_wait_timeout(0);
    let outcome = reconciler.reconcile(&request).await.unwrap();

    assert!(outcome.result.changed);
    assert_eq!(transport.count(&Method::GET, "/deployments"), 0);
}

#[tokio::test(start_paused = true)]
async fn huge_wait_timeout_still_waits() {
    let (reconciler, transport) = setup();
    transport
        .on(Method::POST, "/apps/cache/restart?force=false", 200, json!({"deploymentId": "rst-4"}))
        .on(Method::GET, "/deployments", 200, json!([{"id": "rst-4"}]))
        .on(Method::GET, "/deployments", 200, json!([]));

    let request = ReconciliationRequest::new(AppSpec::new("/cache"), DesiredState::Restarted)
        .with_wait_timeout(u64::MAX);
    let outcome = reconciler.reconcile(&request).await.unwrap();

    assert!(outcome.result.changed);
    assert_eq!(transport.count(&Method::GET, "/deployments"), 2);
}

#[tokio::test]
async fn rejected_destroy_is_fatal() {
    for status in [409, 500] {
        let (reconciler, transport) = setup();
        transport.on(
            Method::DELETE,
            "/apps/cache?force=false",
            status,
            json!({"message": "App is locked by one or more deployments."}),
        );

        let request = ReconciliationRequest::new(AppSpec::new("/cache"), DesiredState::Absent)
            .with_wait_timeout(30);
        let err = reconciler.reconcile(&request).await.unwrap_err();

        let ReconcileError::Transport {
            operation,
            status: returned,
            request: sent,
            ..
        } = &err
        else {
            panic!("expected transport error, got {err:?}");
        };
        assert_eq!(*operation, Operation::Destroy);
        assert_eq!(returned.as_u16(), status);
        assert!(sent.is_none());
        assert_eq!(err.exit_code(), 3);
        assert_eq!(transport.count(&Method::GET, "/deployments"), 0);
    }
}

#[tokio::test]
async fn rejected_create_after_stuck_recovery_is_fatal() {
    let (reconciler, transport) = setup();
    transport
        .on(
            Method::GET,
            "/apps/cache",
            200,
            json!({"app": {"id": "/cache", "deployments": [{"id": "stuck-2"}]}}),
        )
        .on(Method::DELETE, "/apps/cache?force=true", 200, json!({"deploymentId": "del-4"}))
        .on(
            Method::POST,
            "/apps",
            422,
            json!({"message": "Object is not valid"}),
        );

    let request = ReconciliationRequest::new(cache_spec(), DesiredState::Present);
    let err = reconciler.reconcile(&request).await.unwrap_err();

    let ReconcileError::Transport {
        operation,
        status,
        request: sent,
        ..
    } = &err
    else {
        panic!("expected transport error, got {err:?}");
    };
    assert_eq!(*operation, Operation::Create);
    assert_eq!(*status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(sent.as_ref().unwrap()["container"]["docker"]["image"], "redis:6");
    assert_eq!(transport.count_method(&Method::DELETE), 1);
    assert_eq!(transport.count_method(&Method::POST), 1);
    assert_eq!(transport.count_method(&Method::PUT), 0);
}

#[tokio::test]
async fn missing_deployment_id_skips_wait() {
    let (reconciler, transport) = setup();
    transport
        .on_status(Method::GET, "/apps/cache", 404)
        .on(Method::POST, "/apps", 201, json!({"id": "/cache"}));

    let request =
        ReconciliationRequest::new(cache_spec(), DesiredState::Present).with_wait_timeout(30);
    let outcome = reconciler.reconcile(&request).await.unwrap();

    assert!(outcome.result.changed);
    assert!(outcome.result.deployment.is_none());
    assert_eq!(transport.count(&Method::GET, "/deployments"), 0);
}
