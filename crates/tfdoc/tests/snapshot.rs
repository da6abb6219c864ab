//! Fixture tests
//!
//! Loads each configuration directory in /tests/fixtures/ and checks the converted document.
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use tfdoc::loader::{LoadError, LoaderOptions};
use tfdoc::value::Value;
use tfdoc::Diagnostics;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("TFDOC_LOG"))
        .with_test_writer()
        .try_init();
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn convert_fixture(name: &str, options: &LoaderOptions) -> Value {
    init_logging();
    tfdoc::convert_dir(&fixture(name), options).expect("fixture converts")
}

fn documents<'v>(value: &'v Value, key: &str) -> &'v [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .unwrap_or_else(|| panic!("no {key} documents in {value:#?}"))
}

fn meta<'v>(document: &'v Value, key: &str) -> Option<&'v Value> {
    document.get("__tfmeta").and_then(|meta| meta.get(key))
}

#[test]
fn basic() {
    let value = convert_fixture("basic", &LoaderOptions::default());
    let json = serde_json::to_string_pretty(&value).expect("serializable");

    insta::assert_snapshot!(json, @r###"
    {
      "variable": [
        {
          "type": "string",
          "default": "logs",
          "id": "var.bucket_name",
          "__tfmeta": {
            "filename": "main.tf",
            "line_start": 1,
            "line_end": 4,
            "label": "bucket_name",
            "path": "var.bucket_name"
          }
        }
      ],
      "aws_s3_bucket": [
        {
          "versioning": {
            "enabled": true,
            "__tfmeta": {
              "filename": "main.tf",
              "line_start": 9,
              "line_end": 11
            }
          },
          "bucket": "logs",
          "id": "aws_s3_bucket.main",
          "__tfmeta": {
            "filename": "main.tf",
            "line_start": 6,
            "line_end": 12,
            "label": "aws_s3_bucket",
            "references": [
              {
                "id": "var.bucket_name",
                "label": "bucket_name",
                "name": ""
              }
            ],
            "path": "aws_s3_bucket.main",
            "type": "resource"
          }
        }
      ]
    }
    "###);
}

#[test]
fn local_modules() {
    let value = convert_fixture("modules", &LoaderOptions::default());

    let instances = documents(&value, "aws_instance");
    assert_eq!(instances.len(), 1);
    assert_eq!(instances[0].get("subnet_id"), Some(&Value::from("10.0.0.0/16")));
    let references = meta(&instances[0], "references").and_then(Value::as_array);
    assert_eq!(
        references.and_then(|references| references[0].get("id")),
        Some(&Value::from("module.network"))
    );

    let vpcs = documents(&value, "aws_vpc");
    assert_eq!(vpcs[0].get("id"), Some(&Value::from("module.network.aws_vpc.main")));
    assert_eq!(vpcs[0].get("cidr_block"), Some(&Value::from("10.0.0.0/16")));
    assert_eq!(
        meta(&vpcs[0], "path"),
        Some(&Value::from("module.network.aws_vpc.main"))
    );
    assert_eq!(
        meta(&vpcs[0], "filename"),
        Some(&Value::from("modules/network/main.tf"))
    );
    assert_eq!(
        meta(&vpcs[0], "references")
            .and_then(Value::as_array)
            .and_then(|references| references[0].get("id")),
        Some(&Value::from("module.network.var.cidr"))
    );

    let variables = documents(&value, "variable");
    assert_eq!(
        variables[0].get("id"),
        Some(&Value::from("module.network.var.cidr"))
    );
}

#[test]
fn modules_are_stored_depth_first() {
    init_logging();
    let config =
        tfdoc::load_dir(&fixture("modules"), &LoaderOptions::default()).expect("fixture loads");

    assert_eq!(config.modules().len(), 2);
    let child = &config.modules()[1];
    let module_block = child.blocks()[0]
        .module_block()
        .and_then(|id| config.block(id))
        .expect("child blocks point at their module block");
    assert_eq!(module_block.kind(), "module");
    assert_eq!(module_block.type_label(), Some("network"));
}

#[test]
fn variable_files_override_defaults() {
    let value = convert_fixture("tfvars", &LoaderOptions::default());
    assert_eq!(
        documents(&value, "aws_s3_bucket")[0].get("bucket"),
        Some(&Value::from("logs-dev"))
    );

    let options = LoaderOptions::default().with_var_files([fixture("tfvars/prod.tfvars")]);
    let value = convert_fixture("tfvars", &options);
    assert_eq!(
        documents(&value, "aws_s3_bucket")[0].get("bucket"),
        Some(&Value::from("logs-prod"))
    );
}

#[test]
fn module_cycles_fail() {
    init_logging();
    let err = tfdoc::load_dir(&fixture("cycle"), &LoaderOptions::default())
        .expect_err("module includes itself");
    assert!(matches!(err, LoadError::ModuleCycle(_)), "{err:?}");
}

#[test]
fn invalid_files_are_skipped() {
    let value = convert_fixture("invalid", &LoaderOptions::default());
    assert_eq!(documents(&value, "aws_s3_bucket").len(), 1);

    let err = tfdoc::load_dir(
        &fixture("invalid"),
        &LoaderOptions::default().with_stop_on_hcl_error(true),
    )
    .expect_err("broken.tf is not valid");
    assert!(matches!(err, LoadError::HclParseFailed { .. }), "{err:?}");
}

#[test]
fn remote_modules_from_manifest() {
    let value = convert_fixture("manifest", &LoaderOptions::default());

    let queues = documents(&value, "aws_sqs_queue");
    assert_eq!(queues.len(), 1);
    assert_eq!(queues[0].get("name"), Some(&Value::from("jobs")));
    assert_eq!(queues[0].get("id"), Some(&Value::from("module.queue.aws_sqs_queue.this")));

    // not downloaded, only the module block itself
    assert_eq!(documents(&value, "module").len(), 2);
}

#[test]
fn dynamic_blocks() {
    init_logging();
    let config =
        tfdoc::load_dir(&fixture("dynamic"), &LoaderOptions::default()).expect("fixture loads");
    let mut diagnostics = Diagnostics::new();
    let value = tfdoc::convert(&config, &mut diagnostics).expect("fixture converts");

    let group = &documents(&value, "aws_security_group")[0];
    assert!(group.get("dynamic").is_none());
    assert_eq!(
        group.get("egress").and_then(|egress| egress.get("from_port")),
        Some(&Value::from(0i64))
    );

    let ingress = group
        .get("ingress")
        .and_then(Value::as_array)
        .expect("two ingress blocks");
    let ports: Vec<_> = ingress
        .iter()
        .filter_map(|ingress| ingress.get("from_port").and_then(Value::as_i64))
        .collect();
    assert_eq!(ports, vec![80, 443]);
    assert_eq!(meta(&ingress[0], "line_start"), Some(&Value::from(15usize)));

    assert_eq!(diagnostics.entries().len(), 1);
    assert!(diagnostics.entries()[0]
        .to_string()
        .starts_with("unknown block type: terraform_unknown"));
}

#[test]
fn yaml_output() {
    let value = convert_fixture("tfvars", &LoaderOptions::default());
    let yaml = serde_yaml::to_string(&value).expect("serializable");
    let parsed: serde_yaml::Value = serde_yaml::from_str(&yaml).expect("valid yaml");

    assert_eq!(
        parsed["aws_s3_bucket"][0]["__tfmeta"]["path"],
        serde_yaml::Value::from("aws_s3_bucket.main")
    );
}

#[test]
fn missing_directory() {
    let err = tfdoc::load_dir(&fixture("does-not-exist"), &LoaderOptions::default())
        .expect_err("no such directory");
    assert!(matches!(err, LoadError::NotADirectory(_)), "{err:?}");
}
