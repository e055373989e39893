use std::sync::Arc;
use std::time::Duration;

use activity_sync::collections::Collection;
use activity_sync::config::AppConfig;
use activity_sync::models::integration;
use activity_sync::repositories::{CollectionRepository, IntegrationRepository};
use activity_sync::sync::{ResyncError, ResyncService};
use sea_orm::{ActiveModelTrait, ConnectionTrait, DatabaseConnection, IntoActiveModel, Set};
use serde_json::{Value, json};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{any, header, method, path},
};
mod test_utils;
use test_utils::{seed_integration, setup_test_db_arc, test_config};

async fn mount_json(server: &MockServer, route: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_status(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status).set_body_json(json!({"message": "failure"})))
        .mount(server)
        .await;
}

/// One organization `acme` with one repository `acme/site`.
async fn mount_acme_site(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/user/orgs"))
        .and(header("authorization", "Bearer gho_test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"login": "acme", "id": 1}])))
        .mount(server)
        .await;
    mount_json(
        server,
        "/orgs/acme/repos",
        json!([{"id": 10, "name": "site", "full_name": "acme/site"}]),
    )
    .await;
}

async fn mount_site_activity(server: &MockServer) {
    mount_json(
        server,
        "/repos/acme/site/commits",
        json!([
            {"sha": "c1", "author": {"login": "alice", "id": 1}},
            {"sha": "c2", "author": {"login": "bob", "id": 2}}
        ]),
    )
    .await;
    mount_json(
        server,
        "/repos/acme/site/pulls",
        json!([{"number": 3, "user": {"login": "alice", "id": 1}}]),
    )
    .await;
    mount_json(
        server,
        "/repos/acme/site/issues",
        json!([
            {"number": 7, "user": {"login": "bob", "id": 2, "site_admin": true}},
            {"number": 8, "user": {"login": "alice", "id": 1, "type": "User"}}
        ]),
    )
    .await;
}

fn service(db: &Arc<DatabaseConnection>, config: AppConfig) -> ResyncService {
    ResyncService::new(db.clone(), Arc::new(config))
}

#[tokio::test]
async fn test_full_resync_writes_every_collection() {
    let mock_server = MockServer::start().await;
    mount_acme_site(&mock_server).await;
    mount_site_activity(&mock_server).await;
    mount_json(
        &mock_server,
        "/repos/acme/site/issues/7/timeline",
        json!([{"event": "labeled", "id": 70}]),
    )
    .await;
    mount_json(
        &mock_server,
        "/repos/acme/site/issues/8/timeline",
        json!([{"event": "closed", "id": 80}, {"event": "reopened", "id": 81}]),
    )
    .await;

    let db = setup_test_db_arc().await.unwrap();
    seed_integration(&db, "gho_test").await.unwrap();

    let summary = service(&db, test_config(&mock_server.uri()))
        .resync()
        .await
        .unwrap();

    assert_eq!(summary.organizations, 1);
    assert_eq!(summary.repositories, 1);
    assert_eq!(summary.commits, 2);
    assert_eq!(summary.pulls, 1);
    assert_eq!(summary.issues, 2);
    assert_eq!(summary.issue_changelogs, 3);
    assert_eq!(summary.users, 2);
    assert_eq!(summary.failed_repositories, 0);
    assert_eq!(summary.failed_resources, 0);
    assert_eq!(summary.failed_timelines, 0);
    assert!(!summary.run_id.is_empty());

    let collections = CollectionRepository::new(db.clone());
    let users = collections.list(Collection::Users).await.unwrap();
    assert_eq!(
        users,
        vec![
            json!({"login": "alice", "id": 1, "type": "User"}),
            json!({"login": "bob", "id": 2, "site_admin": true}),
        ]
    );

    let events = collections.list(Collection::IssueChangelogs).await.unwrap();
    let ids: Vec<u64> = events.iter().map(|event| event["id"].as_u64().unwrap()).collect();
    assert_eq!(ids, vec![70, 80, 81]);
}

#[tokio::test]
async fn test_failed_timeline_is_skipped() {
    let mock_server = MockServer::start().await;
    mount_acme_site(&mock_server).await;
    mount_site_activity(&mock_server).await;
    mount_status(&mock_server, "/repos/acme/site/issues/7/timeline", 500).await;
    mount_json(
        &mock_server,
        "/repos/acme/site/issues/8/timeline",
        json!([{"event": "closed", "id": 80}]),
    )
    .await;

    let db = setup_test_db_arc().await.unwrap();
    seed_integration(&db, "gho_test").await.unwrap();

    let summary = service(&db, test_config(&mock_server.uri()))
        .resync()
        .await
        .unwrap();

    assert_eq!(summary.issues, 2);
    assert_eq!(summary.issue_changelogs, 1);
    assert_eq!(summary.failed_timelines, 1);

    let events = CollectionRepository::new(db.clone())
        .list(Collection::IssueChangelogs)
        .await
        .unwrap();
    assert_eq!(events, vec![json!({"event": "closed", "id": 80})]);
}

#[tokio::test]
async fn test_failed_commits_keep_pulls_and_issues() {
    let mock_server = MockServer::start().await;
    mount_acme_site(&mock_server).await;
    mount_status(&mock_server, "/repos/acme/site/commits", 409).await;
    mount_json(
        &mock_server,
        "/repos/acme/site/pulls",
        json!([{"number": 3, "user": {"login": "alice"}}]),
    )
    .await;
    mount_json(&mock_server, "/repos/acme/site/issues", json!([])).await;

    let db = setup_test_db_arc().await.unwrap();
    seed_integration(&db, "gho_test").await.unwrap();

    let summary = service(&db, test_config(&mock_server.uri()))
        .resync()
        .await
        .unwrap();

    assert_eq!(summary.commits, 0);
    assert_eq!(summary.pulls, 1);
    assert_eq!(summary.users, 1);
    assert_eq!(summary.failed_repositories, 0);
    assert_eq!(summary.failed_resources, 1);
}

#[tokio::test]
async fn test_repository_without_full_name_is_skipped() {
    let mock_server = MockServer::start().await;
    mount_json(&mock_server, "/user/orgs", json!([{"login": "acme"}])).await;
    mount_json(
        &mock_server,
        "/orgs/acme/repos",
        json!([{"name": "broken"}, {"name": "site", "full_name": "acme/site"}]),
    )
    .await;
    mount_json(&mock_server, "/repos/acme/site/commits", json!([{"sha": "c1"}])).await;
    mount_json(&mock_server, "/repos/acme/site/pulls", json!([])).await;
    mount_json(&mock_server, "/repos/acme/site/issues", json!([])).await;

    let db = setup_test_db_arc().await.unwrap();
    seed_integration(&db, "gho_test").await.unwrap();

    let summary = service(&db, test_config(&mock_server.uri()))
        .resync()
        .await
        .unwrap();

    // Both listed repositories are stored; only one contributes activity
    assert_eq!(summary.repositories, 2);
    assert_eq!(summary.commits, 1);
    assert_eq!(summary.failed_repositories, 1);
}

#[tokio::test]
async fn test_missing_integration_makes_no_requests() {
    let mock_server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let db = setup_test_db_arc().await.unwrap();
    let result = service(&db, test_config(&mock_server.uri())).resync().await;

    assert!(matches!(result, Err(ResyncError::NoActiveIntegration)));
}

#[tokio::test]
async fn test_disconnected_integration_makes_no_requests() {
    let mock_server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let db = setup_test_db_arc().await.unwrap();
    let stored = IntegrationRepository::new(db.clone())
        .upsert("gho_test", None)
        .await
        .unwrap();
    let mut am: integration::ActiveModel = stored.into_active_model();
    am.connected = Set(false);
    am.update(&*db).await.unwrap();

    let result = service(&db, test_config(&mock_server.uri())).resync().await;
    assert!(matches!(result, Err(ResyncError::NoActiveIntegration)));

    // A blank token is treated the same way
    IntegrationRepository::new(db.clone())
        .upsert("   ", None)
        .await
        .unwrap();
    let result = service(&db, test_config(&mock_server.uri())).resync().await;
    assert!(matches!(result, Err(ResyncError::NoActiveIntegration)));
}

#[tokio::test]
async fn test_organization_listing_failure_aborts_run() {
    let mock_server = MockServer::start().await;
    mount_status(&mock_server, "/user/orgs", 500).await;

    let db = setup_test_db_arc().await.unwrap();
    seed_integration(&db, "gho_test").await.unwrap();
    CollectionRepository::new(db.clone())
        .replace_collection(Collection::Organizations, &[json!({"login": "old"})], 500)
        .await
        .unwrap();

    let result = service(&db, test_config(&mock_server.uri())).resync().await;
    assert!(matches!(result, Err(ResyncError::Fetch { .. })));

    // Collections are untouched when the fetch phase fails
    let organizations = CollectionRepository::new(db.clone())
        .list(Collection::Organizations)
        .await
        .unwrap();
    assert_eq!(organizations, vec![json!({"login": "old"})]);
}

#[tokio::test]
async fn test_empty_result_keeps_previous_collection() {
    let mock_server = MockServer::start().await;
    mount_acme_site(&mock_server).await;
    mount_json(&mock_server, "/repos/acme/site/commits", json!([{"sha": "new"}])).await;
    mount_json(&mock_server, "/repos/acme/site/pulls", json!([])).await;
    mount_json(&mock_server, "/repos/acme/site/issues", json!([])).await;

    let db = setup_test_db_arc().await.unwrap();
    seed_integration(&db, "gho_test").await.unwrap();
    let collections = CollectionRepository::new(db.clone());
    collections
        .replace_collection(Collection::Commits, &[json!({"sha": "old1"}), json!({"sha": "old2"})], 500)
        .await
        .unwrap();
    collections
        .replace_collection(Collection::Pulls, &[json!({"number": 1})], 500)
        .await
        .unwrap();

    let summary = service(&db, test_config(&mock_server.uri()))
        .resync()
        .await
        .unwrap();
    assert_eq!(summary.commits, 1);
    assert_eq!(summary.pulls, 0);

    assert_eq!(
        collections.list(Collection::Commits).await.unwrap(),
        vec![json!({"sha": "new"})]
    );
    assert_eq!(
        collections.list(Collection::Pulls).await.unwrap(),
        vec![json!({"number": 1})]
    );
}

#[tokio::test]
async fn test_run_deadline_is_enforced() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/orgs"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let db = setup_test_db_arc().await.unwrap();
    seed_integration(&db, "gho_test").await.unwrap();

    let mut config = test_config(&mock_server.uri());
    config.sync.run_timeout_seconds = 1;

    let result = service(&db, config).resync().await;
    assert!(matches!(result, Err(ResyncError::TimedOut { seconds: 1 })));
}

#[tokio::test]
async fn test_persistence_failure_keeps_earlier_collections() {
    let mock_server = MockServer::start().await;
    mount_acme_site(&mock_server).await;
    mount_site_activity(&mock_server).await;
    mount_json(&mock_server, "/repos/acme/site/issues/7/timeline", json!([])).await;
    mount_json(&mock_server, "/repos/acme/site/issues/8/timeline", json!([])).await;

    let db = setup_test_db_arc().await.unwrap();
    seed_integration(&db, "gho_test").await.unwrap();
    let collections = CollectionRepository::new(db.clone());
    collections
        .replace_collection(Collection::Commits, &[json!({"sha": "old"})], 500)
        .await
        .unwrap();
    collections
        .replace_collection(Collection::Issues, &[json!({"number": 1})], 500)
        .await
        .unwrap();

    db.execute_unprepared(
        "CREATE TRIGGER reject_pulls BEFORE INSERT ON synced_records \
         WHEN NEW.collection = 'github_pulls' \
         BEGIN SELECT RAISE(ABORT, 'pulls rejected'); END;",
    )
    .await
    .unwrap();

    let result = service(&db, test_config(&mock_server.uri())).resync().await;
    assert!(matches!(
        result,
        Err(ResyncError::Persistence {
            collection: Collection::Pulls,
            ..
        })
    ));

    // Collections written before the failure keep the new batch
    assert_eq!(
        collections.list(Collection::Organizations).await.unwrap(),
        vec![json!({"login": "acme", "id": 1})]
    );
    let shas: Vec<Value> = collections
        .list(Collection::Commits)
        .await
        .unwrap()
        .into_iter()
        .map(|commit| commit["sha"].clone())
        .collect();
    assert_eq!(shas, vec![json!("c1"), json!("c2")]);

    // Collections after it are never reached
    assert_eq!(
        collections.list(Collection::Issues).await.unwrap(),
        vec![json!({"number": 1})]
    );
}
