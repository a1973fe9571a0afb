//! Integration tests for `Client` running curl commands against wiremock.

use assert2::{check, let_assert};
use curlkit::{Client, DEFAULT_USER_AGENT, Error, ErrorKind, Method, ValidationError, Variables};
use serde::{Deserialize, Serialize};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, body_string, body_string_contains, header, header_regex, method, path, query_param},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct User {
    id: u64,
    name: String,
}

fn no_vars() -> Variables {
    Variables::new()
}

#[tokio::test]
async fn test_get_request() {
    let mock_server = MockServer::start().await;

    let user = User {
        id: 1,
        name: "Alice".to_string(),
    };

    Mock::given(method("GET"))
        .and(path("/users/1"))
        .and(header("Accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&user))
        .mount(&mock_server)
        .await;

    let command = format!(
        r#"curl -H "Accept: application/json" {}/users/1"#,
        mock_server.uri()
    );
    let response = Client::new()
        .run(&command, &no_vars())
        .await
        .expect("response");

    assert!(response.is_success());
    let body: User = serde_json::from_slice(response.body()).expect("json");
    assert_eq!(body, user);
}

#[tokio::test]
async fn test_post_request_with_json_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/items"))
        .and(header("Content-Type", "application/json"))
        .and(body_json(serde_json::json!({ "a": 1 })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&mock_server)
        .await;

    let command = format!(
        r#"curl -X POST -H "Content-Type: application/json" -d '{{"a":1}}' {}/items"#,
        mock_server.uri()
    );
    let response = Client::new()
        .run(&command, &no_vars())
        .await
        .expect("response");

    assert_eq!(response.status(), 201);
}

#[tokio::test]
async fn test_data_promotes_to_form_post() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/form"))
        .and(header("Content-Type", "application/x-www-form-urlencoded"))
        .and(body_string("x=1&y=2"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let command = format!("curl -d x=1 -d y=2 {}/form", mock_server.uri());
    let response = Client::new()
        .run(&command, &no_vars())
        .await
        .expect("response");

    assert!(response.is_success());
}

#[tokio::test]
async fn test_json_flag() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/json"))
        .and(header("Content-Type", "application/json"))
        .and(header("Accept", "application/json"))
        .and(body_json(serde_json::json!({ "name": "Bob" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let command = format!(r#"curl --json '{{"name":"Bob"}}' {}/json"#, mock_server.uri());
    let response = Client::new()
        .run(&command, &no_vars())
        .await
        .expect("response");

    assert!(response.is_success());
}

#[tokio::test]
async fn test_get_flag_moves_data_to_query() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "rust lang"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let command = format!(
        "curl -G --data-urlencode 'q=rust lang' -d page=2 {}/search",
        mock_server.uri()
    );
    let response = Client::new()
        .run(&command, &no_vars())
        .await
        .expect("response");

    assert!(response.is_success());
}

#[tokio::test]
async fn test_variables_are_expanded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("X-Token", "s3cr3t"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let vars = Variables::new()
        .with("base", mock_server.uri())
        .with("token", "s3cr3t");
    let response = Client::new()
        .run(r#"curl -H "X-Token: $token" ${base}/me"#, &vars)
        .await
        .expect("response");

    assert!(response.is_success());
}

#[tokio::test]
async fn test_undefined_variable_sends_nothing() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let command = format!("curl -H 'X-Token: $token' {}/me", mock_server.uri());
    let result = Client::new().run(&command, &no_vars()).await;

    let_assert!(Err(Error::UndefinedVariable { name, .. }) = result);
    check!(name == "token");
}

#[tokio::test]
async fn test_run_args() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/users/1"))
        .and(body_string("name=Carol"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = format!("{}/users/1", mock_server.uri());
    let response = Client::new()
        .run_args(["curl", "-X", "PUT", "-d", "name=Carol", url.as_str()], &no_vars())
        .await
        .expect("response");

    assert_eq!(response.status(), 204);
}

#[tokio::test]
async fn test_head_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/doc"))
        .respond_with(ResponseTemplate::new(200).insert_header("X-Size", "42"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let command = format!("curl -I {}/doc", mock_server.uri());
    let response = Client::new()
        .run(&command, &no_vars())
        .await
        .expect("response");

    assert_eq!(response.header("x-size"), Some("42"));
}

#[tokio::test]
async fn test_multipart_form() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/upload"))
        .and(header_regex("Content-Type", "^multipart/form-data; boundary="))
        .and(body_string_contains(r#"name="title""#))
        .and(body_string_contains("hello"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let command = format!(
        "curl -F title=hello --form-string note=@literal {}/upload",
        mock_server.uri()
    );
    let response = Client::new()
        .run(&command, &no_vars())
        .await
        .expect("response");

    assert!(response.is_success());
}

#[tokio::test]
async fn test_cookies_and_user_agent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(header("Cookie", "a=1; b=2"))
        .and(header("User-Agent", DEFAULT_USER_AGENT))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let command = format!("curl -b 'a=1; b=2' {}", mock_server.uri());
    let response = Client::new()
        .run(&command, &no_vars())
        .await
        .expect("response");

    assert!(response.is_success());
}

#[tokio::test]
async fn test_custom_user_agent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(header("User-Agent", "curlkit-test/2.0"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let command = format!("curl -A curlkit-test/2.0 {}", mock_server.uri());
    let response = Client::new()
        .run(&command, &no_vars())
        .await
        .expect("response");

    assert!(response.is_success());
}

#[tokio::test]
async fn test_basic_auth_over_plain_http_is_rejected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let command = format!("curl -u user:pass {}/basic", mock_server.uri());
    let err = Client::new()
        .run(&command, &no_vars())
        .await
        .expect_err("insecure credentials");

    check!(err.kind() == ErrorKind::Validation);
    let_assert!(Some(ValidationError::InsecureCredentials { auth, .. }) = err.as_validation());
    check!(*auth == "basic");
}

#[tokio::test]
async fn test_basic_auth_when_allowed() {
    let mock_server = MockServer::start().await;

    // "user:pass" -> "dXNlcjpwYXNz"
    Mock::given(method("GET"))
        .and(path("/basic"))
        .and(header("Authorization", "Basic dXNlcjpwYXNz"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let command = format!(
        "curl -u user:pass --allow-insecure-auth {}/basic",
        mock_server.uri()
    );
    let response = Client::new()
        .run(&command, &no_vars())
        .await
        .expect("response");

    assert!(response.is_success());
}

#[tokio::test]
async fn test_http_error_status_is_a_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("nope"))
        .mount(&mock_server)
        .await;

    let command = format!("curl {}/missing", mock_server.uri());
    let response = Client::new()
        .run(&command, &no_vars())
        .await
        .expect("response");

    assert_eq!(response.status(), 404);
    assert!(response.is_client_error());
}

#[tokio::test]
async fn test_fail_flag_turns_status_into_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("nope"))
        .mount(&mock_server)
        .await;

    let command = format!("curl -f {}/missing", mock_server.uri());
    let err = Client::new()
        .run(&command, &no_vars())
        .await
        .expect_err("fail on error");

    let_assert!(Error::Http { status, body: Some(body) } = err);
    check!(status == 404);
    check!(body == "nope");
}

#[tokio::test]
async fn test_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(std::time::Duration::from_secs(5)))
        .mount(&mock_server)
        .await;

    let command = format!("curl -m 0.1 {}/slow", mock_server.uri());
    let err = Client::new()
        .run(&command, &no_vars())
        .await
        .expect_err("expected timeout error");

    assert!(err.is_timeout(), "Expected timeout error, got: {err}");
}

#[tokio::test]
async fn test_connection_error() {
    let err = Client::new()
        .run("curl http://127.0.0.1:1", &no_vars())
        .await
        .expect_err("expected connection error");

    assert!(err.is_connection(), "Expected connection error, got: {err}");
    assert_eq!(err.kind(), ErrorKind::Request);
}

#[tokio::test]
async fn test_response_size_limit() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/big"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'x'; 4096]))
        .mount(&mock_server)
        .await;

    let command = format!("curl --max-filesize 1k {}/big", mock_server.uri());
    let err = Client::new()
        .run(&command, &no_vars())
        .await
        .expect_err("body too large");

    check!(err.kind() == ErrorKind::Response);
}

#[tokio::test]
async fn test_response_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/with-headers"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Custom-Header", "custom-value")
                .insert_header("X-Request-Id", "12345"),
        )
        .mount(&mock_server)
        .await;

    let command = format!("curl -sS {}/with-headers", mock_server.uri());
    let response = Client::new()
        .run(&command, &no_vars())
        .await
        .expect("response");

    assert_eq!(response.header("x-custom-header"), Some("custom-value"));
    assert_eq!(response.header("X-Request-Id"), Some("12345"));
}

#[tokio::test]
async fn test_pool_reuses_transports() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(3)
        .mount(&mock_server)
        .await;

    let client = Client::new();
    let uri = mock_server.uri();
    client
        .run(&format!("curl {uri}/a"), &no_vars())
        .await
        .expect("first");
    client
        .run(&format!("curl -X GET {uri}/b"), &no_vars())
        .await
        .expect("second");
    assert_eq!(client.pool().len(), 1);

    client
        .run(&format!("curl --connect-timeout 2 {uri}/c"), &no_vars())
        .await
        .expect("third");
    assert_eq!(client.pool().len(), 2);
}

#[tokio::test]
async fn test_builder_configuration() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/users/7"))
        .and(query_param("force", "true"))
        .and(header("X-Request-Id", "abc"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = curlkit::RequestConfiguration::builder()
        .method(Method::Delete)
        .url(format!("{}/users/7", mock_server.uri()))
        .query("force", "true")
        .header("X-Request-Id", "abc")
        .try_build()
        .expect("valid configuration");

    let response = Client::new().execute(&config).await.expect("response");
    assert_eq!(response.status(), 204);
}
