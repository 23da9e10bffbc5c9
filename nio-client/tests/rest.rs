use nio_client::{Instance, InstanceConfig, RestClient, Transport};
use nioprops::Value;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// `Admin:Admin`
const DEFAULT_AUTH: &str = "Basic QWRtaW46QWRtaW4=";

fn config_for(server: &MockServer) -> InstanceConfig {
    let address = server.address();
    InstanceConfig {
        host: address.ip().to_string(),
        port: address.port(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_fetch_sends_basic_auth() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/nio"))
        .and(header("Authorization", DEFAULT_AUTH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"version": "2.1"})))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let result = tokio::task::spawn_blocking(move || {
        let client = RestClient::new(&config).unwrap();
        client.fetch("nio").unwrap()
    })
    .await
    .unwrap();

    assert_eq!(result, json!({"version": "2.1"}));
}

#[tokio::test]
async fn test_send_puts_json_and_accepts_empty_body() {
    let server = MockServer::start().await;

    let payload = json!({"name": "c1", "type": "Counter", "interval": 5});
    Mock::given(method("PUT"))
        .and(path("/blocks/c1"))
        .and(body_json(&payload))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let result = tokio::task::spawn_blocking(move || {
        let client = RestClient::new(&config).unwrap();
        client.send("blocks/c1", &payload).unwrap()
    })
    .await
    .unwrap();

    assert!(result.is_null());
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/blocks/c1"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let message = tokio::task::spawn_blocking(move || {
        let client = RestClient::new(&config).unwrap();
        client.remove("blocks/c1").unwrap_err().to_string()
    })
    .await
    .unwrap();

    assert!(message.contains("DELETE"), "{message}");
    assert!(message.contains("blocks/c1"), "{message}");
    assert!(message.contains("500"), "{message}");
}

#[tokio::test]
async fn test_connect_loads_instance() {
    let server = MockServer::start().await;

    let listings = [
        (
            "/blocks_types",
            json!({
                "Counter": {"properties": {
                    "interval": {"type": "timedelta", "default": {"seconds": 1}},
                    "tags": {"type": "list", "template": {"type": "str"}, "default": []},
                }}
            }),
        ),
        (
            "/blocks",
            json!({"c1": {"name": "c1", "type": "Counter", "interval": {"seconds": 3}, "tags": [1, 2]}}),
        ),
        ("/services", json!({})),
    ];
    for (listing, body) in listings {
        Mock::given(method("GET"))
            .and(path(listing))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;
    }

    let config = config_for(&server);
    let (interval, tags) = tokio::task::spawn_blocking(move || {
        let instance = Instance::connect(&config).unwrap();
        let c1 = &instance.blocks["c1"];
        (
            c1.config.dict("interval").unwrap().as_duration().unwrap(),
            c1.config.list("tags").unwrap().as_slice().to_vec(),
        )
    })
    .await
    .unwrap();

    assert_eq!(interval, std::time::Duration::from_secs(3));
    assert_eq!(tags, vec![Value::from("1"), Value::from("2")]);
}
