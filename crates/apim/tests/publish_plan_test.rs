//! Integration test for planning APIs from an api-config file

use ado_cli_apim::{load_api_configs, plan_api, publish_all, ApimError, PublishTarget};
use ado_cli_openapi::OpenApiSpec;
use std::io::Write;
use std::sync::Arc;

const SPEC: &str = r#"{
    "swagger": "2.0",
    "info": { "title": "Experimentations", "version": "1.0.0" },
    "host": "func-experimentations.azurewebsites.net",
    "basePath": "/api/",
    "paths": {
        "/ping": { "get": { "operationId": "ping", "responses": {} } },
        "/health": { "get": { "operationId": "health", "responses": {} } },
        "/v1/resources": {
            "get": { "operationId": "list-resources", "responses": {} },
            "post": { "operationId": "create-resource", "responses": {} }
        },
        "/v1/resources/{id}": {
            "get": { "operationId": "get-resource", "responses": {} },
            "delete": { "operationId": "delete-resource", "responses": {} }
        }
    },
    "definitions": { "Resource": { "type": "object" } }
}"#;

const API_CONFIG: &str = r#"[
    {
        "displayName": "Utilities API",
        "description": "Monitoring endpoints",
        "path": "utilities",
        "serviceUrlSuffix": "monitoring",
        "operations": [{ "id": "ping" }, { "id": "health" }],
        "name": "utilities",
        "products": ["internal"]
    },
    {
        "displayName": "Resources API",
        "description": "Read access to resources",
        "path": "resources",
        "dropRoutePrefix": "/v1",
        "operations": [{ "id": "list-resources" }, { "id": "get-resource" }],
        "name": "resources",
        "products": ["starter", "unlimited"],
        "parameters": { "subscriptionRequired": true }
    }
]"#;

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".json")
        .tempfile()
        .expect("temp file");
    file.write_all(content.as_bytes()).expect("write config");
    file
}

fn spec() -> OpenApiSpec {
    OpenApiSpec::from_json(SPEC).expect("example spec parses")
}

#[test]
fn test_plan_from_config_file() {
    let file = write_config(API_CONFIG);
    let configs = load_api_configs(file.path()).unwrap();
    let spec = spec();

    let utilities = plan_api(&configs[0], &spec).unwrap();
    assert_eq!(
        utilities.parameters.service_url,
        "https://func-experimentations.azurewebsites.net/api/monitoring"
    );
    assert_eq!(utilities.products, vec!["internal"]);
    let published = OpenApiSpec::from_json(&utilities.parameters.value).unwrap();
    assert_eq!(published.path_keys(), vec!["/health", "/ping"]);
    assert_eq!(published.extra["definitions"], spec.extra["definitions"]);

    let resources = plan_api(&configs[1], &spec).unwrap();
    assert_eq!(
        resources.parameters.service_url,
        "https://func-experimentations.azurewebsites.net/api"
    );
    assert_eq!(resources.parameters.additional["subscriptionRequired"], true);
    let published = OpenApiSpec::from_json(&resources.parameters.value).unwrap();
    assert_eq!(published.path_keys(), vec!["/resources", "/resources/{id}"]);
    assert!(published.paths["/resources/{id}"].delete.is_none());
}

#[test]
fn test_collision_aborts_only_that_api() {
    let mut spec = spec();
    spec.paths
        .insert("/resources".to_string(), Default::default());

    let file = write_config(API_CONFIG);
    let configs = load_api_configs(file.path()).unwrap();

    assert!(plan_api(&configs[0], &spec).is_ok());
    assert!(matches!(
        plan_api(&configs[1], &spec),
        Err(ApimError::Collision { .. })
    ));
}

#[tokio::test]
async fn test_dry_run_batch() {
    let file = write_config(API_CONFIG);
    let configs = load_api_configs(file.path()).unwrap();

    let outcomes = publish_all(PublishTarget::DryRun, configs, Arc::new(spec())).await;

    let names: Vec<&str> = outcomes.iter().map(|o| o.api_name.as_str()).collect();
    assert_eq!(names, vec!["utilities", "resources"]);
    assert!(outcomes.iter().all(|o| o.result.is_ok()));
}
