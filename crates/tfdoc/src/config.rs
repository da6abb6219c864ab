//! evaluated configuration tree (input of the converter)
//!
//! A [Config] owns every [Module], and every module owns its root [Block]s. Blocks own their attributes and children.
//! The only relation pointing upwards is [Block::module_block]: a [BlockId] naming the `module` block that included
//! the module a root block belongs to. It is a plain index into the [Config], only ever used for lookups.
use crate::typed::TypedValue;
use crate::var_type::TypeConstraint;
use std::fmt;
use std::path::{Path, PathBuf};

/// Location of a root block inside a [Config]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId {
    pub module: usize,
    pub block: usize,
}

#[derive(Debug, Default)]
pub struct Config {
    modules: Vec<Module>,
}

impl Config {
    /// Adds a module, returns its index
    pub fn push_module(&mut self, module: Module) -> usize {
        self.modules.push(module);
        self.modules.len() - 1
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn module_mut(&mut self, index: usize) -> Option<&mut Module> {
        self.modules.get_mut(index)
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.modules.get(id.module)?.blocks.get(id.block)
    }
}

/// One module instance: the root module or a module included via a `module` block
#[derive(Debug, Default)]
pub struct Module {
    dir: Option<PathBuf>,
    blocks: Vec<Block>,
}

impl Module {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self {
            dir,
            blocks: Vec::new(),
        }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Adds a root block, returns its index
    pub fn push_block(&mut self, block: Block) -> usize {
        self.blocks.push(block);
        self.blocks.len() - 1
    }

    /// Points every root block at the `module` block that included this module
    pub fn set_module_block(&mut self, id: BlockId) {
        for block in &mut self.blocks {
            block.module_block = Some(id);
        }
    }
}

/// File and line range of a block (lines are 1-based and inclusive)
#[derive(Debug, Clone, PartialEq, Eq, derive_new::new)]
pub struct SourceRange {
    pub filename: String,
    pub start_line: usize,
    pub end_line: usize,
}

/// Distinguishes the instances of a block expanded by `count` or `for_each`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceKey {
    Index(usize),
    Key(String),
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceKey::Index(index) => write!(f, "[{index}]"),
            InstanceKey::Key(key) => write!(f, "[{key:?}]"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Block {
    kind: String,
    labels: Vec<String>,
    key: Option<InstanceKey>,
    attributes: Vec<Attribute>,
    children: Vec<Block>,
    id: Option<String>,
    range: SourceRange,
    module_block: Option<BlockId>,
}

impl Block {
    pub fn new(kind: impl Into<String>, range: SourceRange) -> Self {
        Self {
            kind: kind.into(),
            labels: Vec::new(),
            key: None,
            attributes: Vec::new(),
            children: Vec::new(),
            id: None,
            range,
            module_block: None,
        }
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_key(mut self, key: InstanceKey) -> Self {
        self.key = Some(key);
        self
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn with_child(mut self, child: Block) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_module_block(mut self, id: BlockId) -> Self {
        self.module_block = Some(id);
        self
    }

    /// Block type (`resource`, `variable`, `dynamic`, ...)
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// First label (resource type, variable name, ...)
    pub fn type_label(&self) -> Option<&str> {
        self.labels.first().map(String::as_str)
    }

    /// Second label (resource name, ...)
    pub fn name_label(&self) -> Option<&str> {
        self.labels.get(1).map(String::as_str)
    }

    pub fn key(&self) -> Option<&InstanceKey> {
        self.key.as_ref()
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attribute| attribute.name == name)
    }

    /// Raw child blocks in source order, including `dynamic` templates and their expansions
    pub fn children(&self) -> &[Block] {
        &self.children
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn range(&self) -> &SourceRange {
        &self.range
    }

    /// The `module` block that included this block's module, if any
    pub fn module_block(&self) -> Option<BlockId> {
        self.module_block
    }

    /// Position-qualified name, unique within a module
    ///
    /// This is also the string other blocks of the same module use to reference this block:
    /// `aws_s3_bucket.main[0]`, `data.aws_iam_policy.admin`, `var.region`, `module.vpc`, ...
    pub fn reference(&self) -> String {
        let labels = &self.labels;
        let mut reference = match (self.kind.as_str(), labels.as_slice()) {
            ("resource", [kind, name, ..]) => format!("{kind}.{name}"),
            ("data", [kind, name, ..]) => format!("data.{kind}.{name}"),
            ("variable", [name, ..]) => format!("var.{name}"),
            (kind, []) => kind.to_string(),
            (kind, labels) => format!("{kind}.{}", labels.join(".")),
        };

        if let Some(key) = &self.key {
            reference.push_str(&key.to_string());
        }

        reference
    }
}

#[derive(Debug, Clone)]
pub struct Attribute {
    name: String,
    value: TypedValue,
    raw: String,
    expr: Option<hcl::Expression>,
    references: Vec<String>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: TypedValue, raw: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value,
            raw: raw.into(),
            expr: None,
            references: Vec::new(),
        }
    }

    /// Keep the source expression, used to decode type declarations
    pub fn with_expr(mut self, expr: hcl::Expression) -> Self {
        self.expr = Some(expr);
        self
    }

    pub fn with_references(mut self, references: Vec<String>) -> Self {
        self.references = references;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &TypedValue {
        &self.value
    }

    /// Textual representation of the source expression
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Reference strings found in the expression (`var.x`, `aws_s3_bucket.main`, ...)
    pub fn references(&self) -> &[String] {
        &self.references
    }

    /// Decode the attribute as a type declaration
    pub fn decode_type(&self) -> Option<TypeConstraint> {
        if let Some(constraint) = self.expr.as_ref().and_then(TypeConstraint::decode) {
            return Some(constraint);
        }

        match &self.value {
            TypedValue::String(legacy) => {
                TypeConstraint::decode(&hcl::Expression::String(legacy.clone()))
            }
            _ => None,
        }
    }
}
