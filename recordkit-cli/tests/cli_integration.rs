//! End-to-end tests of the `recordkit` binary against a temporary schema directory.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

fn recordkit(temp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("recordkit").unwrap();
    cmd.arg("--root")
        .arg(temp.path().join("schema"))
        .env_remove("RECORDKIT_SORT_ORDER_STEP")
        .env_remove("RECORDKIT_MAX_CREATE_RETRIES")
        .env("RECORDKIT_ACTOR", "cli-test");
    cmd
}

fn json_output(cmd: &mut Command) -> Value {
    let output = cmd.arg("--format").arg("json").assert().success();
    serde_json::from_slice(&output.get_output().stdout).unwrap()
}

fn init(temp: &TempDir) {
    recordkit(temp)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized schema directory"));
}

#[test]
fn test_commands_require_init() {
    let temp = TempDir::new().unwrap();
    recordkit(&temp)
        .args(["field", "list", "--entity", "job"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("schema directory not found"));
}

#[test]
fn test_field_administration_flow() {
    let temp = TempDir::new().unwrap();
    init(&temp);

    let title = json_output(recordkit(&temp).args([
        "field", "create", "--entity", "job", "--label", "Title", "--type", "text", "--required",
    ]));
    assert_eq!(title["fieldName"], "Field_1");
    assert_eq!(title["sortOrder"], 10);
    let title_id = title["id"].as_str().unwrap().to_string();

    let openings = json_output(recordkit(&temp).args([
        "field", "create", "--entity", "job", "--label", "Openings", "--type", "number",
    ]));
    assert_eq!(openings["fieldName"], "Field_2");
    let openings_id = openings["id"].as_str().unwrap().to_string();

    // Duplicate explicit names are rejected
    recordkit(&temp)
        .args([
            "field", "create", "--entity", "job", "--label", "Other", "--type", "text",
            "--name", "Field_1",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Field_1"));

    // Untouched flags survive a relabel
    let updated = json_output(recordkit(&temp).args([
        "field", "update", &title_id, "--label", "Job Title",
    ]));
    assert_eq!(updated["fieldLabel"], "Job Title");
    assert_eq!(updated["isRequired"], true);

    let reordered = json_output(recordkit(&temp).args([
        "field", "reorder", "--entity", "job", &openings_id,
    ]));
    let names: Vec<_> = reordered
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["fieldName"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Field_2", "Field_1"]);

    recordkit(&temp)
        .args(["field", "list", "--entity", "job"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Job Title"));

    let audit = json_output(recordkit(&temp).args(["audit", "--limit", "2"]));
    let audit = audit.as_array().unwrap();
    assert_eq!(audit.len(), 2);
    assert_eq!(audit[0]["action"], "UPDATE");
    assert!(audit.iter().all(|r| r["actor"] == "cli-test"));

    recordkit(&temp)
        .args(["field", "delete", &openings_id])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted Field_2"));
    recordkit(&temp)
        .args(["field", "show", &openings_id])
        .assert()
        .code(2);
}

#[test]
fn test_validate_record_file() {
    let temp = TempDir::new().unwrap();
    init(&temp);
    recordkit(&temp)
        .args([
            "field", "create", "--entity", "lead", "--label", "Company", "--type", "text",
            "--required",
        ])
        .assert()
        .success();
    recordkit(&temp)
        .args(["field", "create", "--entity", "lead", "--label", "Email", "--type", "email"])
        .assert()
        .success();

    let values = temp.path().join("record.json");
    std::fs::write(&values, r#"{"Email": "not-an-email", "Unknown": "x"}"#).unwrap();
    recordkit(&temp)
        .args(["validate", "--entity", "lead", "--values"])
        .arg(&values)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Invalid: Company is required"));

    // A malformed optional value is reported but does not block the form
    std::fs::write(&values, r#"{"Company": "Acme", "Email": "not-an-email"}"#).unwrap();
    let output = recordkit(&temp)
        .args(["--format", "json", "validate", "--entity", "lead", "--values"])
        .arg(&values)
        .assert()
        .success();
    let report: Value = serde_json::from_slice(&output.get_output().stdout).unwrap();
    assert_eq!(report["form"]["isValid"], true);
    assert_eq!(report["issues"][0]["fieldLabel"], "Email");
}

#[test]
fn test_match_exit_codes() {
    let temp = TempDir::new().unwrap();
    let matches = |args: &[&str]| recordkit(&temp).arg("match").args(args).assert();

    matches(&["--type", "number", "--op", "greaterThan", "--operand", "2", "$5.00"])
        .success()
        .stdout("match\n");
    matches(&["--type", "number", "--op", "greaterThan", "--operand", "2", "1"]).code(1);
    matches(&["--type", "date", "--op", "after", "--operand", "2024-03-10", "03/15/2024"])
        .success();
    matches(&["--type", "text", "--op", "notEquals", "--operand", "x"]).success();
    matches(&["--type", "checkbox", "--flag", "no"]).success();
    matches(&["--type", "multiselect", "--op", "contains", "--operand", "rust", "go", "rust"])
        .success();
}
