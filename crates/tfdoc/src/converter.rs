//! conversion of a [Config] into one document
//!
//! Every module is walked in order, every supported root block becomes an object in the output, collected under the
//! resource/data type or the block type:
//!
//! ```json
//! {
//!   "aws_s3_bucket": [
//!     {
//!       "bucket": "logs",
//!       "versioning": { "enabled": true, "__tfmeta": { ... } },
//!       "id": "aws_s3_bucket.main",
//!       "__tfmeta": {
//!         "filename": "main.tf",
//!         "line_start": 1,
//!         "line_end": 7,
//!         "label": "aws_s3_bucket",
//!         "path": "aws_s3_bucket.main",
//!         "type": "resource"
//!       }
//!     }
//!   ],
//!   "variable": [ ... ]
//! }
//! ```
//!
//! `__tfmeta.references` lists the blocks an attribute refers to, as far as they were visited before. A `locals` block
//! is registered as `locals`, so `local.<name>` references never resolve.
use crate::collector::BlockCollector;
use crate::config::{Block, Config, Module};
use crate::dedup::logical_children;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::path::{self, module_path};
use crate::references::ReferenceIndex;
use crate::value::{Object, Value};
use indexmap::{IndexMap, IndexSet};

/// Key of the metadata object attached to every document
pub const META_KEY: &str = "__tfmeta";

/// Root block types that are converted, everything else is skipped
pub const SUPPORTED_BLOCKS: &[&str] = &[
    "data",
    "locals",
    "output",
    "provider",
    "terraform",
    "variable",
    "module",
    "moved",
    "resource",
];

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ConvertError {
    #[error("module has conflicting paths: {first} and {second}")]
    ModulePathConflict { first: String, second: String },
}

/// Convert all modules of `config`
pub fn convert(config: &Config, diagnostics: &mut Diagnostics) -> Result<Value, ConvertError> {
    Converter::new(config, diagnostics).run()
}

struct Converter<'c, 'd> {
    config: &'c Config,
    references: ReferenceIndex<'c>,
    diagnostics: &'d mut Diagnostics,
    output: IndexMap<String, Vec<Value>>,
}

impl<'c, 'd> Converter<'c, 'd> {
    fn new(config: &'c Config, diagnostics: &'d mut Diagnostics) -> Self {
        Self {
            config,
            references: ReferenceIndex::default(),
            diagnostics,
            output: IndexMap::new(),
        }
    }

    fn run(mut self) -> Result<Value, ConvertError> {
        let config = self.config;
        for module in config.modules() {
            self.visit_module(module)?;
        }

        Ok(Value::Object(
            self.output
                .into_iter()
                .map(|(key, documents)| (key, Value::Array(documents)))
                .collect(),
        ))
    }

    #[tracing::instrument(level = "debug", skip_all, fields(dir = ?module.dir()))]
    fn visit_module(&mut self, module: &'c Module) -> Result<(), ConvertError> {
        let module_path = module_path(self.config, module)?;

        for block in module.blocks() {
            self.visit_block(block, &module_path);
        }

        Ok(())
    }

    fn visit_block(&mut self, block: &'c Block, module_path: &str) {
        let block_path = path::path(block, module_path);
        self.references.register(block_path.clone(), block);

        if !SUPPORTED_BLOCKS.contains(&block.kind()) {
            self.diagnostics.log(Diagnostic::UnknownBlockType {
                kind: block.kind().to_string(),
                range: block.range().clone(),
            });
            return;
        }

        let mut document = self.build_block(block, module_path);

        let key = match block.kind() {
            "data" | "resource" => block.type_label().unwrap_or(block.kind()).to_string(),
            kind => kind.to_string(),
        };

        if let Some(Value::Object(meta)) = document.get_mut(META_KEY) {
            meta.insert("path".into(), block_path.into());
            if matches!(block.kind(), "data" | "resource") {
                meta.insert("type".into(), block.kind().into());
            }
        }

        tracing::trace!(%key, "document added");
        self.output
            .entry(key)
            .or_default()
            .push(Value::Object(document));
    }

    /// Document for `block` and its children
    fn build_block(&self, block: &Block, module_path: &str) -> Object {
        let mut document = Object::new();

        let mut children = BlockCollector::default();
        for child in logical_children(block) {
            children.add(
                child.kind(),
                Value::Object(self.build_block(child, module_path)),
            );
        }
        document.extend(children.finalize());

        let mut references = IndexSet::new();
        for attribute in block.attributes() {
            let value = if block.kind() == "variable" && attribute.name() == "type" {
                // the value of a type expression is meaningless, keep its name
                attribute
                    .decode_type()
                    .map(|constraint| Value::from(constraint.to_string()))
                    .unwrap_or_else(|| attribute.raw().into())
            } else {
                Value::from_typed(attribute.value()).unwrap_or_else(|| {
                    tracing::debug!(attribute = attribute.name(), "using raw expression");
                    attribute.raw().into()
                })
            };
            document.insert(attribute.name().to_string(), value);

            references.extend(attribute.references().iter().map(String::as_str));
        }

        if let Some(id) = block.id().filter(|id| !id.is_empty()) {
            document.insert("id".into(), id.into());
        }

        let range = block.range();
        let mut meta = Object::new();
        meta.insert("filename".into(), range.filename.as_str().into());
        meta.insert("line_start".into(), range.start_line.into());
        meta.insert("line_end".into(), range.end_line.into());
        if let Some(label) = block.type_label() {
            meta.insert("label".into(), label.into());
        }

        let resolved: Vec<Value> = references
            .into_iter()
            .filter_map(|reference| {
                self.references
                    .descriptor(&path::join(module_path, reference))
            })
            .collect();
        if !resolved.is_empty() {
            meta.insert("references".into(), Value::Array(resolved));
        }

        document.insert(META_KEY.into(), Value::Object(meta));
        document
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::{Attribute, BlockId, SourceRange};
    use crate::typed::{Number, TypedValue};
    use pretty_assertions::assert_eq;

    fn block(kind: &str, labels: &[&str], start: usize, end: usize) -> Block {
        Block::new(kind, SourceRange::new("main.tf".into(), start, end)).with_labels(labels.to_vec())
    }

    fn attribute(name: &str, value: impl Into<TypedValue>) -> Attribute {
        Attribute::new(name, value.into(), "raw")
    }

    fn convert_blocks(blocks: Vec<Block>) -> (Value, Diagnostics) {
        let mut config = Config::default();
        let mut module = Module::new(None);
        for block in blocks {
            module.push_block(block);
        }
        config.push_module(module);

        let mut diagnostics = Diagnostics::new();
        let value = convert(&config, &mut diagnostics).expect("conversion succeeds");
        (value, diagnostics)
    }

    fn documents<'v>(value: &'v Value, key: &str) -> &'v [Value] {
        value
            .get(key)
            .and_then(Value::as_array)
            .unwrap_or_else(|| panic!("{key} documents"))
    }

    #[test]
    fn resource_document() {
        let bucket = block("resource", &["aws_s3_bucket", "main"], 1, 7)
            .with_id("aws_s3_bucket.main")
            .with_attribute(attribute("bucket", "logs"))
            .with_child(
                block("versioning", &[], 3, 5).with_attribute(attribute("enabled", true)),
            );

        let (value, diagnostics) = convert_blocks(vec![bucket]);
        assert!(diagnostics.is_empty());

        let bucket = &documents(&value, "aws_s3_bucket")[0];
        assert_eq!(bucket.get("bucket"), Some(&Value::from("logs")));
        assert_eq!(bucket.get("id"), Some(&Value::from("aws_s3_bucket.main")));
        assert_eq!(
            bucket.get("versioning").and_then(|v| v.get("enabled")),
            Some(&Value::Boolean(true))
        );

        let meta = bucket.get(META_KEY).expect("metadata");
        assert_eq!(meta.get("filename"), Some(&Value::from("main.tf")));
        assert_eq!(meta.get("line_start"), Some(&Value::Integer(1)));
        assert_eq!(meta.get("line_end"), Some(&Value::Integer(7)));
        assert_eq!(meta.get("label"), Some(&Value::from("aws_s3_bucket")));
        assert_eq!(meta.get("path"), Some(&Value::from("aws_s3_bucket.main")));
        assert_eq!(meta.get("type"), Some(&Value::from("resource")));
        assert_eq!(meta.get("references"), None);
    }

    #[test]
    fn collection_keys() {
        let (value, _) = convert_blocks(vec![
            block("variable", &["region"], 1, 3),
            block("data", &["aws_caller_identity", "current"], 4, 4),
            block("terraform", &[], 5, 7),
            block("locals", &[], 8, 10),
        ]);

        let keys: Vec<_> = value.as_object().expect("object").keys().cloned().collect();
        assert_eq!(
            keys,
            vec!["variable", "aws_caller_identity", "terraform", "locals"]
        );

        let variable = &documents(&value, "variable")[0];
        let meta = variable.get(META_KEY).expect("metadata");
        assert_eq!(meta.get("type"), None);
        assert_eq!(meta.get("label"), Some(&Value::from("region")));
        assert_eq!(meta.get("path"), Some(&Value::from("var.region")));

        let terraform = &documents(&value, "terraform")[0];
        assert_eq!(terraform.get(META_KEY).and_then(|m| m.get("label")), None);
    }

    #[test]
    fn unknown_block_types_are_skipped() {
        let (value, diagnostics) = convert_blocks(vec![
            block("import", &[], 1, 4),
            block("variable", &["region"], 5, 7),
        ]);

        assert_eq!(value.get("import"), None);
        assert_eq!(documents(&value, "variable").len(), 1);
        assert_eq!(
            diagnostics.entries(),
            &[Diagnostic::UnknownBlockType {
                kind: "import".into(),
                range: SourceRange::new("main.tf".into(), 1, 4),
            }]
        );
    }

    #[test]
    fn singleton_flattening() {
        let group = block("resource", &["aws_security_group", "web"], 1, 20)
            .with_child(block("ingress", &[], 2, 5).with_attribute(attribute("from_port", Number::from(80i64))))
            .with_child(block("ingress", &[], 6, 9).with_attribute(attribute("from_port", Number::from(443i64))))
            .with_child(block("egress", &[], 10, 13));

        let (value, _) = convert_blocks(vec![group]);
        let group = &documents(&value, "aws_security_group")[0];

        let ingress = group.get("ingress").and_then(Value::as_array).expect("list");
        let ports: Vec<_> = ingress
            .iter()
            .map(|rule| rule.get("from_port").and_then(Value::as_i64))
            .collect();
        assert_eq!(ports, vec![Some(80), Some(443)]);

        assert!(group.get("egress").and_then(Value::as_object).is_some());
    }

    #[test]
    fn dynamic_blocks_are_resolved() {
        let for_each = TypedValue::List(vec!["a".into(), "b".into()]);
        let group = block("resource", &["aws_security_group", "web"], 1, 20)
            .with_child(
                block("dynamic", &["ingress"], 2, 9)
                    .with_attribute(attribute("for_each", for_each)),
            )
            .with_child(block("ingress", &[], 4, 8))
            .with_child(block("ingress", &[], 4, 8))
            .with_child(block("ingress", &[], 4, 8));

        let (value, _) = convert_blocks(vec![group]);
        let group = &documents(&value, "aws_security_group")[0];

        assert_eq!(group.get("dynamic"), None);
        assert_eq!(group.get("ingress").and_then(Value::as_array).map(<[_]>::len), Some(2));
    }

    #[test]
    fn child_metadata() {
        let bucket = block("resource", &["aws_s3_bucket", "main"], 1, 7)
            .with_child(block("versioning", &[], 3, 5));

        let (value, _) = convert_blocks(vec![bucket]);
        let meta = documents(&value, "aws_s3_bucket")[0]
            .get("versioning")
            .and_then(|v| v.get(META_KEY))
            .expect("child metadata");

        assert_eq!(meta.get("line_start"), Some(&Value::Integer(3)));
        assert_eq!(meta.get("line_end"), Some(&Value::Integer(5)));
        assert_eq!(meta.get("path"), None);
        assert_eq!(meta.get("label"), None);
    }

    #[test]
    fn opaque_values_fall_back_to_raw_text() {
        let bucket = block("resource", &["aws_s3_bucket", "main"], 1, 7)
            .with_attribute(Attribute::new(
                "policy",
                TypedValue::Opaque("function call".into()),
                "file(\"policy.json\")",
            ))
            .with_attribute(attribute("bucket", "logs"))
            .with_attribute(attribute("arn", TypedValue::Unknown));

        let (value, _) = convert_blocks(vec![bucket]);
        let bucket = &documents(&value, "aws_s3_bucket")[0];

        assert_eq!(bucket.get("policy"), Some(&Value::from("file(\"policy.json\")")));
        assert_eq!(bucket.get("bucket"), Some(&Value::from("logs")));
        assert_eq!(bucket.get("arn"), Some(&Value::Null));
    }

    #[test]
    fn variable_type_uses_friendly_name() {
        let body = hcl::parse("type = map(string)").expect("valid hcl");
        let expr = body.attributes().next().expect("attribute").expr().clone();

        let variable = block("variable", &["tags"], 1, 3)
            .with_attribute(Attribute::new("type", TypedValue::Unknown, "map(string)").with_expr(expr));
        let (value, _) = convert_blocks(vec![variable]);

        assert_eq!(
            documents(&value, "variable")[0].get("type"),
            Some(&Value::from("map of string"))
        );
    }

    #[test]
    fn references_resolve_to_visited_blocks() {
        let referencing = |name: &str, start| {
            block("resource", &["aws_s3_bucket_policy", name], start, start + 2).with_attribute(
                Attribute::new("bucket", TypedValue::Unknown, "aws_s3_bucket.main.id")
                    .with_references(vec!["aws_s3_bucket.main".into()]),
            )
        };

        let (value, _) = convert_blocks(vec![
            referencing("before", 1),
            block("resource", &["aws_s3_bucket", "main"], 4, 6).with_id("aws_s3_bucket.main"),
            referencing("after", 7),
        ]);

        let policies = documents(&value, "aws_s3_bucket_policy");
        let references = |doc: &Value| doc.get(META_KEY).and_then(|m| m.get("references")).cloned();

        // visited before the bucket: unresolved and omitted
        assert_eq!(references(&policies[0]), None);

        let mut expected = Object::new();
        expected.insert("id".into(), "aws_s3_bucket.main".into());
        expected.insert("label".into(), "aws_s3_bucket".into());
        expected.insert("name".into(), "main".into());
        assert_eq!(
            references(&policies[1]),
            Some(Value::Array(vec![Value::Object(expected)]))
        );
    }

    #[test]
    fn references_are_collected_across_attributes() {
        let variable = block("variable", &["name"], 1, 1).with_id("var.name");
        let region =
            block("data", &["aws_region", "current"], 2, 2).with_id("data.aws_region.current");
        let locals = block("locals", &[], 3, 5);
        let bucket = block("resource", &["aws_s3_bucket", "main"], 6, 10)
            .with_attribute(
                Attribute::new("bucket", TypedValue::Unknown, "var.name")
                    .with_references(vec!["var.name".into()]),
            )
            .with_attribute(
                Attribute::new("tags", TypedValue::Unknown, "{...}").with_references(vec![
                    "var.name".into(),
                    "data.aws_region.current".into(),
                    "local.prefix".into(),
                ]),
            );

        let (value, _) = convert_blocks(vec![variable, region, locals, bucket]);
        let ids: Vec<_> = documents(&value, "aws_s3_bucket")[0]
            .get(META_KEY)
            .and_then(|m| m.get("references"))
            .and_then(Value::as_array)
            .expect("references")
            .iter()
            .filter_map(|reference| reference.get("id").and_then(Value::as_str))
            .collect();

        // locals register as a whole, `local.prefix` has no block of its own
        assert_eq!(ids, vec!["var.name", "data.aws_region.current"]);
    }

    fn module_config(blocks_in_child: Vec<Block>) -> Config {
        let mut config = Config::default();

        let mut root = Module::new(None);
        root.push_block(block("module", &["infra"], 1, 3));
        config.push_module(root);

        let mut child = Module::new(None);
        for block in blocks_in_child {
            child.push_block(block);
        }
        child.set_module_block(BlockId {
            module: 0,
            block: 0,
        });
        config.push_module(child);
        config
    }

    #[test]
    fn module_paths_prefix_block_paths() {
        let config = module_config(vec![
            block("resource", &["aws_s3_bucket", "main"], 1, 3),
            block("resource", &["aws_s3_bucket_policy", "main"], 4, 6).with_attribute(
                Attribute::new("bucket", TypedValue::Unknown, "aws_s3_bucket.main.id")
                    .with_references(vec!["aws_s3_bucket.main".into()]),
            ),
        ]);

        let mut diagnostics = Diagnostics::new();
        let value = convert(&config, &mut diagnostics).expect("conversion succeeds");

        let bucket_meta = documents(&value, "aws_s3_bucket")[0].get(META_KEY).expect("meta");
        assert_eq!(
            bucket_meta.get("path"),
            Some(&Value::from("module.infra.aws_s3_bucket.main"))
        );

        let module_meta = documents(&value, "module")[0].get(META_KEY).expect("meta");
        assert_eq!(module_meta.get("path"), Some(&Value::from("module.infra")));

        // references stay inside their module
        let policy_meta = documents(&value, "aws_s3_bucket_policy")[0]
            .get(META_KEY)
            .expect("meta");
        assert!(policy_meta.get("references").is_some());
    }

    #[test]
    fn module_path_conflict_aborts() {
        let mut config = Config::default();

        let mut root = Module::new(None);
        root.push_block(block("module", &["one"], 1, 3));
        root.push_block(block("module", &["two"], 4, 6));
        config.push_module(root);

        let mut child = Module::new(None);
        child.push_block(block("variable", &["a"], 1, 1).with_module_block(BlockId { module: 0, block: 0 }));
        child.push_block(block("variable", &["b"], 2, 2).with_module_block(BlockId { module: 0, block: 1 }));
        config.push_module(child);

        let mut diagnostics = Diagnostics::new();
        assert_eq!(
            convert(&config, &mut diagnostics),
            Err(ConvertError::ModulePathConflict {
                first: "module.one".into(),
                second: "module.two".into()
            })
        );
    }

    #[test]
    fn line_ranges_are_ordered() {
        let (value, _) = convert_blocks(vec![
            block("variable", &["a"], 1, 1),
            block("resource", &["aws_s3_bucket", "main"], 2, 9)
                .with_child(block("versioning", &[], 3, 5)),
        ]);

        for documents in value.as_object().expect("object").values() {
            for document in documents.as_array().expect("list") {
                let meta = document.get(META_KEY).expect("meta");
                let start = meta.get("line_start").and_then(Value::as_i64).expect("start");
                let end = meta.get("line_end").and_then(Value::as_i64).expect("end");
                assert!(start <= end);
            }
        }
    }
}
