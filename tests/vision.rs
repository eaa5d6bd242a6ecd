//! Cloud Vision request/response handling tests.
//!
//! No network access: these exercise the JSON bodies and configuration only.

use std::time::Duration;

use framelabel::{
    CloudVisionClient, Credential, LabelError, VisionConfig,
    vision::{
        DEFAULT_ENDPOINT, DEFAULT_MAX_RESULTS, build_annotate_request, parse_annotate_response,
    },
};

#[test]
fn request_carries_base64_image_and_label_feature() {
    let body = build_annotate_request(b"\xFF\xD8\xFF", 5).expect("Failed to build request");

    let request = &body["requests"][0];
    assert_eq!(request["image"]["content"], "/9j/");
    assert_eq!(request["features"][0]["type"], "LABEL_DETECTION");
    assert_eq!(request["features"][0]["maxResults"], 5);
    assert_eq!(body["requests"].as_array().map(Vec::len), Some(1));
}

#[test]
fn response_labels_keep_service_order() {
    let body = r#"{
        "responses": [{
            "labelAnnotations": [
                {"mid": "/m/01bqvp", "description": "Sky", "score": 0.97, "topicality": 0.97},
                {"mid": "/m/0csby", "description": "Cloud", "score": 0.93},
                {"mid": "/m/07j7r", "description": "Tree", "score": 0.81}
            ]
        }]
    }"#;

    let labels = parse_annotate_response(body).expect("Failed to parse");
    assert_eq!(labels, vec!["Sky", "Cloud", "Tree"]);
}

#[test]
fn image_without_labels_yields_empty_list() {
    assert!(parse_annotate_response(r#"{"responses": [{}]}"#).unwrap().is_empty());
    assert!(parse_annotate_response(r#"{"responses": []}"#).unwrap().is_empty());
    assert!(parse_annotate_response("{}").unwrap().is_empty());
}

#[test]
fn per_image_error_is_a_detection_error() {
    let body = r#"{"responses": [{"error": {"code": 3, "message": "Bad image data."}}]}"#;

    match parse_annotate_response(body) {
        Err(LabelError::Detection(message)) => {
            assert!(message.contains("Bad image data."), "{message}");
            assert!(message.contains('3'));
        }
        other => panic!("Expected Detection error, got: {other:?}"),
    }
}

#[test]
fn non_json_body_is_invalid_response() {
    assert!(matches!(
        parse_annotate_response("<html>502</html>"),
        Err(LabelError::InvalidResponse(_))
    ));
}

#[test]
fn config_defaults_and_builders() {
    let config = VisionConfig::new(Credential::ApiKey("secret-key".to_string()));
    assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
    assert_eq!(config.max_results, DEFAULT_MAX_RESULTS);
    assert_eq!(config.quota_project, None);

    let config = config
        .with_max_results(0)
        .with_endpoint("http://localhost:9000/v1/images:annotate")
        .with_timeout(Duration::from_secs(5));
    assert_eq!(config.max_results, 1);
    assert_eq!(config.endpoint, "http://localhost:9000/v1/images:annotate");
    assert_eq!(config.timeout, Duration::from_secs(5));
}

#[test]
fn credentials_are_not_printed() {
    let config = VisionConfig::new(Credential::AccessToken("ya29.secret".to_string()));
    let debug = format!("{config:?}");
    assert!(debug.contains("AccessToken"));
    assert!(!debug.contains("ya29.secret"));
}

#[test]
fn client_builds_from_config() {
    let config = VisionConfig::new(Credential::ApiKey("k".to_string())).with_max_results(3);
    let client = CloudVisionClient::new(config).expect("Failed to build client");
    assert_eq!(client.config().max_results, 3);
}
