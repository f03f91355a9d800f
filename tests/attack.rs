//! Full goose attacks against a mocked gateway: one owner, one iteration.

use goose::config::GooseConfiguration;
use goose::prelude::*;
use msa_load::scenario::{run_attack_with, AttackSummary};
use msa_load::{LoadConfig, ScenarioSelection};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ok(body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

async fn run_one_owner(server: &MockServer) -> AttackSummary {
    let config = LoadConfig {
        host: server.uri(),
        scenario: ScenarioSelection::Owner,
        users: 1,
        hatch_rate: 1.0,
        iterations: 1,
        think_time: false,
        ..LoadConfig::default()
    };
    let attack = GooseAttack::initialize_with_config(GooseConfiguration::default())
        .unwrap()
        .set_default(GooseDefault::NoTelnet, true)
        .unwrap()
        .set_default(GooseDefault::NoWebSocket, true)
        .unwrap();
    run_attack_with(*attack, &config).await.unwrap()
}

async fn received_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| r.url.path().to_string())
        .collect()
}

fn counts(summary: &AttackSummary, name: &str) -> Option<(usize, usize)> {
    summary.request(name).map(|r| (r.success, r.fail))
}

#[tokio::test]
async fn rejected_login_is_counted_once_and_owner_sends_nothing_else() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/user/user/signup"))
        .respond_with(ok(json!({"result": null})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(path("/store/store/owner"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let summary = run_one_owner(&server).await;

    // On-start requests survive into the final metrics.
    assert_eq!(counts(&summary, "Owner: Signup"), Some((1, 0)), "{summary:?}");
    assert_eq!(counts(&summary, "Owner: Login"), Some((0, 1)), "{summary:?}");
    assert!(summary.request("Owner: Create Store").is_none());
    assert_eq!(summary.total, 2);
    assert_eq!(summary.errors, 1);
    assert_eq!(received_paths(&server).await, ["/user/user/signup", "/auth/auth/login"]);
}

#[tokio::test]
async fn store_without_id_fails_that_request_and_stops_owner() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/user/user/signup"))
        .respond_with(ok(json!({"result": null})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/auth/login"))
        .respond_with(ok(json!({"result": {"accessToken": "T"}})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/store/store/owner"))
        .and(header("authorization", "Bearer T"))
        .respond_with(ok(json!({"result": {}})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(path("/store/store/owner/menu"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(path("/store/store/owner/menu/stock"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let summary = run_one_owner(&server).await;

    assert_eq!(counts(&summary, "Owner: Signup"), Some((1, 0)), "{summary:?}");
    assert_eq!(counts(&summary, "Owner: Login"), Some((1, 0)), "{summary:?}");
    // A 200 without a store id is turned into a failure after the fact.
    assert_eq!(counts(&summary, "Owner: Create Store"), Some((0, 1)), "{summary:?}");
    assert!(summary.request("Owner: Create Menu").is_none());
    assert!(summary.request("Owner: Update Stock").is_none());
    assert_eq!(summary.errors, 1);
    assert_eq!(
        received_paths(&server).await,
        ["/user/user/signup", "/auth/auth/login", "/store/store/owner"]
    );
}

#[tokio::test]
async fn owner_provisioning_passes_under_goose() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/user/user/signup"))
        .respond_with(ok(json!({"result": null})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/auth/login"))
        .respond_with(ok(json!({"result": {"accessToken": "T"}})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/store/store/owner"))
        .and(header("authorization", "Bearer T"))
        .respond_with(ok(json!({"result": {"storeId": "S"}})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/store/store/owner/menu"))
        .and(header("authorization", "Bearer T"))
        .respond_with(ok(json!({"result": {"menuId": "M"}})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/store/store/owner/menu/stock"))
        .and(header("authorization", "Bearer T"))
        .respond_with(ok(json!({"result": null})))
        .expect(1)
        .mount(&server)
        .await;

    let summary = run_one_owner(&server).await;

    assert_eq!(summary.total, 5, "{summary:?}");
    assert_eq!(summary.errors, 0, "{summary:?}");
    assert_eq!(summary.success_rate, 100.0);
    assert_eq!(counts(&summary, "Owner: Update Stock"), Some((1, 0)));
}
