use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;

fn bundle_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("create temp bundle file");
    file.write_all(contents.as_bytes()).expect("write bundle contents");
    file
}

const MINIMAL_BUNDLE: &str = r#"
- kind: User
  namespace: system
  name: root
  role: domain_admin
- kind: Cluster
  namespace: p
  name: eu-1
  driver_type: chart
- kind: Service
  namespace: p
  name: web
  components:
    - name: app
      spec:
        type: code
        driver_type: chart
- kind: Contract
  namespace: p
  name: analytics
  contexts:
    - name: default
      allocation:
        service_namespace: p
        service_name: web
- kind: Claim
  namespace: p
  name: ask-analytics
  user_namespace: system
  user_name: root
  contract_namespace: p
  contract_name: analytics
"#;

#[test]
fn apply_resolves_a_minimal_bundle_into_a_create_plan() {
    let file = bundle_file(MINIMAL_BUNDLE);

    Command::cargo_bin("meridian")
        .unwrap()
        .arg("apply")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("create"));
}

#[test]
fn validate_accepts_a_well_formed_bundle() {
    let file = bundle_file(MINIMAL_BUNDLE);

    Command::cargo_bin("meridian")
        .unwrap()
        .arg("validate")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("ok:"));
}

#[test]
fn validate_rejects_a_rule_routing_to_a_missing_cluster() {
    let bundle = r#"
- kind: Rule
  namespace: p
  name: route-bad
  weight: 10
  scope:
    kind: contract
    contract: "*"
  effect:
    action: route_cluster
    cluster_namespace: p
    cluster_name: does-not-exist
"#;
    let file = bundle_file(bundle);

    Command::cargo_bin("meridian")
        .unwrap()
        .arg("validate")
        .arg(file.path())
        .assert()
        .failure()
        .code(3);
}

#[test]
fn get_prints_the_requested_object_as_json() {
    let file = bundle_file(MINIMAL_BUNDLE);

    Command::cargo_bin("meridian")
        .unwrap()
        .args(["get"])
        .arg(file.path())
        .args(["p", "Cluster", "eu-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"driver_type\": \"chart\""));
}

#[test]
fn get_reports_a_missing_key() {
    let file = bundle_file(MINIMAL_BUNDLE);

    Command::cargo_bin("meridian")
        .unwrap()
        .args(["get"])
        .arg(file.path())
        .args(["p", "Cluster", "does-not-exist"])
        .assert()
        .failure()
        .code(3);
}
