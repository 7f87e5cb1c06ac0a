use notelock_policy::{
    BreachLookup, PolicyConfig, PolicyError, PwnedPasswordsClient, breach_count, hash_prefix,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PASSWORD_SUFFIX: &str = "1E4C9B93F3F0682250B6CF8331B7EE68FD8";

fn setup(server: &MockServer) -> PwnedPasswordsClient {
    PwnedPasswordsClient::new(PolicyConfig {
        api_base_url: server.uri(),
        request_timeout_secs: 1,
        ..PolicyConfig::default()
    })
    .unwrap()
}

fn range_body() -> String {
    format!(
        "0018A45C4D1DEF81644B54AB7F969B88D65:1\r\n\
         {PASSWORD_SUFFIX}:9545824\r\n\
         011053FD0102E94D6AE2F8B83D76FAF94F6:0\r\n"
    )
}

// --- Range lookup ---

#[tokio::test]
async fn lookup_sends_only_the_prefix() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/range/5BAA6"))
        .and(header("Add-Padding", "true"))
        .and(header("user-agent", "notelock-policy"))
        .respond_with(ResponseTemplate::new(200).set_body_string(range_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = setup(&server);
    let entries = client.lookup_prefix("5BAA6").await.unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().any(|e| e.suffix == PASSWORD_SUFFIX && e.count == 9545824));

    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| !r.url.as_str().contains(PASSWORD_SUFFIX)));
}

#[tokio::test]
async fn lookup_rejects_bad_prefix_without_request() {
    let server = MockServer::start().await;
    let client = setup(&server);
    assert!(matches!(
        client.lookup_prefix("XYZ").await,
        Err(PolicyError::Protocol(_))
    ));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn lookup_surfaces_http_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = setup(&server);
    assert!(matches!(
        client.lookup_prefix("5BAA6").await,
        Err(PolicyError::Http(_))
    ));
}

// --- breach_count ---

#[tokio::test]
async fn breached_password_is_counted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/range/5BAA6"))
        .respond_with(ResponseTemplate::new(200).set_body_string(range_body()))
        .mount(&server)
        .await;

    let client = setup(&server);
    assert_eq!(breach_count(&client, "password").await, 9545824);
}

#[tokio::test]
async fn unknown_password_counts_zero() {
    let server = MockServer::start().await;
    let (prefix, _) = hash_prefix("a-password-nobody-uses-3f9c");
    Mock::given(method("GET"))
        .and(path(format!("/range/{prefix}")))
        .respond_with(ResponseTemplate::new(200).set_body_string(range_body()))
        .mount(&server)
        .await;

    let client = setup(&server);
    assert_eq!(breach_count(&client, "a-password-nobody-uses-3f9c").await, 0);
}

#[tokio::test]
async fn server_error_counts_zero() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = setup(&server);
    assert_eq!(breach_count(&client, "password").await, 0);
}

#[tokio::test]
async fn malformed_body_counts_zero() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let client = setup(&server);
    assert_eq!(breach_count(&client, "password").await, 0);
}

#[tokio::test]
async fn slow_server_counts_zero() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(range_body())
                .set_delay(std::time::Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let client = setup(&server);
    assert_eq!(breach_count(&client, "password").await, 0);
}

#[tokio::test]
async fn unreachable_service_counts_zero() {
    let client = PwnedPasswordsClient::new(PolicyConfig {
        api_base_url: "http://127.0.0.1:1".to_string(),
        request_timeout_secs: 1,
        ..PolicyConfig::default()
    })
    .unwrap();
    assert_eq!(breach_count(&client, "password").await, 0);
}
