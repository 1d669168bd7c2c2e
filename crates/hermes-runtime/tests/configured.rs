//! Clients built from loaded configuration and plugins.

use hermes_config::ConfigLoader;
use hermes_runtime::{Client, ClientConfig};
use hermes_test::fixtures::{self, GetWidgetInput};
use hermes_test::{StubReply, StubTransport};
use std::time::Duration;

const CONFIG: &str = r#"
[retry]
max_retries = 1
scale_factor_ms = 10
jitter = "none"

[auth]
scheme_preference = "noAuth"

[endpoint]
url = "https://widgets.example.com"
region = "eu-central-1"
"#;

#[tokio::test(start_paused = true)]
async fn test_file_settings_drive_the_client() {
    let settings = ConfigLoader::new().with_string(CONFIG, "toml").unwrap().load().unwrap();
    let transport = StubTransport::new().repeat(StubReply::error(429, "ThrottlingException", "slow down"));
    let config = ClientConfig::builder()
        .transport(transport.clone())
        .apply_config(&settings)
        .build()
        .unwrap();
    assert_eq!(config.region(), Some("eu-central-1"));

    let client = Client::new(config);
    let err = client
        .invoke(&fixtures::get_widget(), GetWidgetInput::new("w-1"))
        .await
        .unwrap_err();

    assert!(err.as_service_error().is_some());
    assert_eq!(transport.invocations(), 2);
    assert_eq!(transport.gaps(), vec![Duration::from_millis(10)]);
    assert!(transport.requests().iter().all(|r| r.header("authorization").is_none()));
}

#[tokio::test]
async fn test_plugins_can_register_plugins() {
    let transport = StubTransport::new().reply(StubReply::json(200, serde_json::json!({"id": "w-1", "name": "gear"})));
    let config = ClientConfig::builder()
        .plugin(move |builder| {
            builder
                .transport(transport.clone())
                .plugin(|builder| builder.endpoint_url(fixtures::ENDPOINT).region(fixtures::REGION))
        })
        .build()
        .unwrap();

    assert_eq!(config.endpoint().host(), "widgets.example.com");
    assert_eq!(config.region(), Some(fixtures::REGION));

    let widget = Client::new(config)
        .invoke(&fixtures::get_widget(), GetWidgetInput::new("w-1"))
        .await
        .unwrap();
    assert_eq!(widget.color, None);
}

#[test]
fn test_missing_transport_is_rejected() {
    let err = ClientConfig::builder().endpoint_url(fixtures::ENDPOINT).build().unwrap_err();
    assert!(err.to_string().contains("transport"));
}
