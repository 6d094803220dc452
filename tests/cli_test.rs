//! Integration tests for the api-agent binary

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value as JsonValue;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

fn fixture(name: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
        .to_string_lossy()
        .into_owned()
}

/// Binary pointed at an empty settings file so the user's config is ignored
fn api_agent(config: &NamedTempFile) -> Command {
    let mut cmd = Command::cargo_bin("api-agent").unwrap();
    cmd.arg("--config").arg(config.path());
    cmd
}

#[test]
fn test_inspect_lists_endpoints_and_warnings() {
    let config = NamedTempFile::new().unwrap();
    api_agent(&config)
        .args(["inspect", "--spec", &fixture("shop.openapi.yaml")])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Shop API 2.1.0"))
        .stdout(predicate::str::contains("Endpoints (4):"))
        .stdout(predicate::str::contains("/products/{productId} (getProduct)"))
        .stdout(predicate::str::contains(
            "Missing operationId for GET /inventory/{sku}",
        ));
}

#[test]
fn test_inspect_missing_file_fails() {
    let config = NamedTempFile::new().unwrap();
    api_agent(&config)
        .args(["inspect", "--spec", "/nonexistent/api.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load API description"));
}

#[test]
fn test_run_with_mock_executor() {
    let config = NamedTempFile::new().unwrap();
    let output = api_agent(&config)
        .args([
            "run",
            "--spec",
            &fixture("shop.openapi.yaml"),
            "--agent",
            &fixture("shop.agent.yaml"),
            "--scenario",
            "product_price",
            "--entity",
            "product_id=P1",
            "--mock",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let response: JsonValue = serde_json::from_slice(&output).unwrap();
    assert_eq!(response["answer"], "Laptop costs $100");
    assert_eq!(response["scenarioUsed"], "product_price");
    assert_eq!(
        response["apiCallsMade"][0]["endpoint"],
        "GET /products/{productId}"
    );
}

#[test]
fn test_run_reports_missing_entities() {
    let config = NamedTempFile::new().unwrap();
    api_agent(&config)
        .args([
            "run",
            "--spec",
            &fixture("shop.openapi.yaml"),
            "--agent",
            &fixture("shop.agent.yaml"),
            "--scenario",
            "product_price",
            "--mock",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Please provide more information: product_id",
        ));
}

#[test]
fn test_template_validate() {
    let config = NamedTempFile::new().unwrap();
    api_agent(&config)
        .args(["template", "validate", "--text", "{{ name }}"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Template is valid"));

    api_agent(&config)
        .args(["template", "validate", "--text", "{% if name %}open"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Syntax error at line 1"));
}

#[test]
fn test_template_variables_and_render() {
    let config = NamedTempFile::new().unwrap();
    api_agent(&config)
        .args([
            "template",
            "variables",
            "--text",
            "{{ name }} {{ price | format_currency('USD') }}",
        ])
        .assert()
        .success()
        .stdout("name\nprice\n");

    let mut data = NamedTempFile::new().unwrap();
    write!(data, r#"{{"name": "Laptop", "price": 100}}"#).unwrap();
    api_agent(&config)
        .args([
            "template",
            "render",
            "--text",
            "{{ name }}: {{ price | format_currency('USD') }}",
            "--data",
        ])
        .arg(data.path())
        .assert()
        .success()
        .stdout("Laptop: $100\n");
}
