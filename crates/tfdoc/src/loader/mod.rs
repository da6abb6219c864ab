//! loading terraform configuration
//!
//! A directory is loaded as the root module. All `*.tf` files of a module are parsed (in file name order) and their
//! blocks evaluated against what is known statically:
//!
//! - `variable` defaults, overridden by variable files (root module) or `module` block arguments (child modules)
//! - `locals`, resolved until no more can be evaluated
//! - attributes of `resource` and `data` blocks that do not depend on anything unknown
//! - outputs of child modules
//!
//! Everything else (resource ids, remote data, ...) is unknown. Unsupported expressions keep their raw text.
//!
//! `resource` and `data` blocks with a known `count` or `for_each` are expanded into one block per instance.
//! `dynamic` blocks are kept and followed by one block per item of their `for_each`.
//!
//! Local child modules (`source = "./..."`) are loaded recursively. Remote modules are only loaded when
//! `terraform init` already downloaded them (see [manifest]).
use crate::config::{BlockId, Config, Module};
use crate::path;
use eval::{known_attributes, Expansion, Scope};
use hcl::eval::{Context, Evaluate};
use hcl::value::Map;
use hcl::Value;
use manifest::ModuleManifest;
use source::{display_name, RawBlock, SourceFile};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

mod eval;
mod functions;
pub mod manifest;
mod materialize;
mod references;
mod source;

/// Arguments of `module` blocks that are not inputs of the module
const MODULE_META_ARGUMENTS: &[&str] = &[
    "source",
    "version",
    "providers",
    "count",
    "for_each",
    "depends_on",
];

#[derive(Debug, Clone, Default)]
pub struct LoaderOptions {
    /// Report every expression that could not be evaluated
    pub debug: bool,
    /// Fail on files that are not valid HCL instead of skipping them
    pub stop_on_hcl_error: bool,
    /// Remote modules would be downloaded, downloads are not supported so this only changes what is reported
    pub allow_downloads: bool,
    /// Variable files (`*.tfvars`) applied to the root module, later files win
    pub var_files: Vec<PathBuf>,
}

impl LoaderOptions {
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_stop_on_hcl_error(mut self, stop: bool) -> Self {
        self.stop_on_hcl_error = stop;
        self
    }

    pub fn with_allow_downloads(mut self, allow: bool) -> Self {
        self.allow_downloads = allow;
        self
    }

    pub fn with_var_files(mut self, var_files: impl IntoIterator<Item = PathBuf>) -> Self {
        self.var_files.extend(var_files);
        self
    }
}

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),
    #[error("No configuration files found in {0}")]
    NoFilesFound(PathBuf),
    #[error("IO error")]
    IoError(#[from] std::io::Error),
    #[error("Unable to parse {path}")]
    HclParseFailed {
        path: PathBuf,
        #[source]
        source: hcl_edit::parser::Error,
    },
    #[error("Unable to parse variable file {path}")]
    VarFileParseFailed {
        path: PathBuf,
        #[source]
        source: hcl::Error,
    },
    #[error("Module {0} includes itself")]
    ModuleCycle(PathBuf),
    #[error("Invalid module manifest")]
    ManifestInvalid(#[from] serde_json::Error),
}

/// Load the root module in `dir` and all child modules it includes
#[tracing::instrument(skip(options))]
pub fn load_dir(dir: &Path, options: &LoaderOptions) -> Result<Config, LoadError> {
    if !dir.is_dir() {
        return Err(LoadError::NotADirectory(dir.to_path_buf()));
    }

    let root = dir.canonicalize()?;
    let manifest = ModuleManifest::load(&root)?;
    let inputs = load_var_files(&options.var_files)?;

    let mut loader = Loader::new(options, Some(root.clone()), manifest);
    let files = loader.read_dir(&root)?;
    if files.is_empty() {
        return Err(LoadError::NoFilesFound(root));
    }

    loader.load_module(Some(root), &files, inputs, &Call::root())?;
    Ok(loader.config)
}

/// Load a single file as the root module
///
/// Child modules are not loaded, there is no directory to resolve them from.
pub fn load_str(name: &str, text: &str, options: &LoaderOptions) -> Result<Config, LoadError> {
    load_sources([(name, text)], options)
}

/// Load files given as `(name, text)` pairs as the root module
pub fn load_sources<'a>(
    sources: impl IntoIterator<Item = (&'a str, &'a str)>,
    options: &LoaderOptions,
) -> Result<Config, LoadError> {
    let files = sources
        .into_iter()
        .map(|(name, text)| {
            SourceFile::parse(name, text).map_err(|source| LoadError::HclParseFailed {
                path: name.into(),
                source,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let inputs = load_var_files(&options.var_files)?;

    let mut loader = Loader::new(options, None, ModuleManifest::default());
    loader.load_module(None, &files, inputs, &Call::root())?;
    Ok(loader.config)
}

fn load_var_files(paths: &[PathBuf]) -> Result<Map<String, Value>, LoadError> {
    let ctx = Scope::default().context();
    let mut values = Map::new();

    for path in paths {
        tracing::debug!(path = %path.display(), "loading variable file");
        let contents = std::fs::read_to_string(path)?;
        let body = hcl::parse(&contents).map_err(|source| LoadError::VarFileParseFailed {
            path: path.clone(),
            source,
        })?;

        for attribute in body.attributes() {
            match attribute.expr().evaluate(&ctx) {
                Ok(value) => {
                    values.insert(attribute.key().to_string(), value);
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), key = attribute.key(), %err, "ignoring variable value")
                }
            }
        }
    }

    Ok(values)
}

/// Where a module is included from
struct Call {
    /// Path of the `module` block chain (`module.a.module.b`), empty for the root module
    path: String,
    /// Key of the module in the module manifest (`a.b`)
    key: String,
}

impl Call {
    fn root() -> Self {
        Self {
            path: String::new(),
            key: String::new(),
        }
    }
}

struct LoadedModule {
    index: usize,
    outputs: Value,
}

struct Loader<'o> {
    options: &'o LoaderOptions,
    root: Option<PathBuf>,
    manifest: ModuleManifest,
    config: Config,
    /// directories of the modules currently being loaded
    stack: Vec<PathBuf>,
}

impl<'o> Loader<'o> {
    fn new(options: &'o LoaderOptions, root: Option<PathBuf>, manifest: ModuleManifest) -> Self {
        Self {
            options,
            root,
            manifest,
            config: Config::default(),
            stack: vec![],
        }
    }

    /// Parse all `*.tf` files in `dir`, sorted by name
    fn read_dir(&self, dir: &Path) -> Result<Vec<SourceFile>, LoadError> {
        let mut paths = vec![];
        for dir_entry in std::fs::read_dir(dir)? {
            let dir_entry = dir_entry?;
            if !dir_entry.file_type()?.is_file() {
                continue;
            }

            let path = dir_entry.path();
            if path.extension().is_some_and(|extension| extension == "tf") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut files = vec![];
        for path in paths {
            tracing::info!(path = %path.display(), "loading file");
            let contents = std::fs::read_to_string(&path)?;
            let name = display_name(&path, self.root.as_deref().unwrap_or(dir));

            match SourceFile::parse(name, &contents) {
                Ok(file) => files.push(file),
                Err(source) if self.options.stop_on_hcl_error => {
                    return Err(LoadError::HclParseFailed { path, source });
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), %err, "skipping file that is not valid HCL")
                }
            }
        }

        Ok(files)
    }

    fn load_module(
        &mut self,
        dir: Option<PathBuf>,
        files: &[SourceFile],
        inputs: Map<String, Value>,
        call: &Call,
    ) -> Result<LoadedModule, LoadError> {
        if let Some(dir) = &dir {
            if self.stack.contains(dir) {
                return Err(LoadError::ModuleCycle(dir.clone()));
            }
            self.stack.push(dir.clone());
        }

        let index = self.config.push_module(Module::new(dir.clone()));
        let blocks: Vec<RawBlock> = files.iter().flat_map(SourceFile::blocks).collect();

        let mut scope = Scope {
            path: self.path_object(dir.as_deref()),
            ..Scope::default()
        };
        declare_variables(&mut scope, &blocks, &inputs);
        refresh(&mut scope, &blocks);

        let mut children = HashMap::new();
        for block in blocks.iter().filter(|block| block.kind == "module") {
            let Some(name) = block.name() else {
                continue;
            };

            if let Some(child) = self.load_call(dir.as_deref(), block, name, &scope, call)? {
                scope.modules.insert(name.to_string(), child.outputs);
                children.insert(name.to_string(), child.index);
            }
        }
        if !children.is_empty() {
            refresh(&mut scope, &blocks);
        }

        let ctx = scope.context();
        let outputs = outputs(&blocks, &ctx);

        let materialized: Vec<_> = blocks
            .iter()
            .flat_map(|block| self.materialize_root(block, &ctx, &call.path))
            .collect();

        for (position, block) in materialized.iter().enumerate() {
            if block.kind() != "module" {
                continue;
            }
            let Some(child) = block.type_label().and_then(|name| children.get(name)) else {
                continue;
            };
            if let Some(module) = self.config.module_mut(*child) {
                module.set_module_block(BlockId {
                    module: index,
                    block: position,
                });
            }
        }

        if let Some(module) = self.config.module_mut(index) {
            for block in materialized {
                module.push_block(block);
            }
        }

        if dir.is_some() {
            self.stack.pop();
        }

        Ok(LoadedModule { index, outputs })
    }

    /// Load the module included by the `module` block `block`
    fn load_call(
        &mut self,
        dir: Option<&Path>,
        block: &RawBlock,
        name: &str,
        scope: &Scope,
        call: &Call,
    ) -> Result<Option<LoadedModule>, LoadError> {
        let ctx = scope.context();
        let source = match block.attribute("source").map(|expr| expr.evaluate(&ctx)) {
            Some(Ok(Value::String(source))) => source,
            _ => {
                tracing::warn!(module = name, "skipping module without a known source");
                return Ok(None);
            }
        };

        let key = path::join(&call.key, name);
        let Some(module_dir) = self.resolve_source(dir, &source, &key) else {
            return Ok(None);
        };

        let inputs: Map<String, Value> = block
            .attributes
            .iter()
            .filter(|(argument, _)| !MODULE_META_ARGUMENTS.contains(&argument.as_str()))
            .filter_map(|(argument, expr)| Some((argument.clone(), expr.evaluate(&ctx).ok()?)))
            .collect();

        let files = self.read_dir(&module_dir)?;
        if files.is_empty() {
            tracing::warn!(module = name, dir = %module_dir.display(), "skipping module without configuration files");
            return Ok(None);
        }

        tracing::debug!(module = name, %source, "loading module");
        let call = Call {
            path: path::join(&call.path, &format!("module.{name}")),
            key,
        };
        self.load_module(Some(module_dir), &files, inputs, &call)
            .map(Some)
    }

    fn resolve_source(&self, dir: Option<&Path>, source: &str, key: &str) -> Option<PathBuf> {
        if source.starts_with("./") || source.starts_with("../") || Path::new(source).is_absolute() {
            let Some(dir) = dir else {
                tracing::warn!(source, "skipping local module, there is no directory to resolve it from");
                return None;
            };

            return match dir.join(source).canonicalize() {
                Ok(module_dir) => Some(module_dir),
                Err(err) => {
                    tracing::warn!(source, %err, "skipping local module");
                    None
                }
            };
        }

        if let (Some(root), Some(module_dir)) = (&self.root, self.manifest.dir(key)) {
            return root.join(module_dir).canonicalize().ok();
        }

        if self.options.allow_downloads {
            tracing::warn!(source, "skipping remote module, downloading is not supported (run `terraform init` first)");
        } else {
            tracing::warn!(source, "skipping remote module, downloads are disabled");
        }
        None
    }

    fn path_object(&self, dir: Option<&Path>) -> Map<String, Value> {
        let display = |path: Option<&Path>| {
            path.map_or_else(|| ".".to_string(), |path| path.display().to_string())
        };
        let cwd = std::env::current_dir().ok();

        let mut path = Map::new();
        path.insert("module".to_string(), Value::from(display(dir)));
        path.insert("root".to_string(), Value::from(display(self.root.as_deref())));
        path.insert("cwd".to_string(), Value::from(display(cwd.as_deref())));
        path
    }
}

fn declare_variables(scope: &mut Scope, blocks: &[RawBlock], inputs: &Map<String, Value>) {
    let ctx = Scope::default().context();
    for block in blocks.iter().filter(|block| block.kind == "variable") {
        let Some(name) = block.name() else {
            continue;
        };

        let value = match inputs.get(name) {
            Some(value) => Some(value.clone()),
            None => block
                .attribute("default")
                .and_then(|expr| expr.evaluate(&ctx).ok()),
        };

        if let Some(value) = value {
            scope.vars.insert(name.to_string(), value);
        }
    }
}

/// Evaluate what became known: locals, then resources and data sources, then locals depending on those
fn refresh(scope: &mut Scope, blocks: &[RawBlock]) {
    resolve_locals(scope, blocks);

    let ctx = scope.context();
    let mut known = vec![];
    for block in blocks {
        if !matches!(block.kind.as_str(), "resource" | "data") {
            continue;
        }
        let (Some(kind), Some(name)) = (block.labels.first(), block.labels.get(1)) else {
            continue;
        };

        let instances = Expansion::of(block, &ctx)
            .instances()
            .into_iter()
            .map(|(key, iteration)| {
                let mut instance_ctx = ctx.child();
                if let Some((variable, value)) = iteration {
                    instance_ctx.declare_var(variable, value);
                }
                (key, known_attributes(block, &instance_ctx))
            })
            .collect();

        known.push((block.kind == "data", kind, name, Expansion::scope_value(instances)));
    }

    for (data, kind, name, value) in known {
        if data {
            scope.set_data(kind, name, value);
        } else {
            scope.set_resource(kind, name, value);
        }
    }

    resolve_locals(scope, blocks);
}

fn resolve_locals(scope: &mut Scope, blocks: &[RawBlock]) {
    let locals: Vec<_> = blocks
        .iter()
        .filter(|block| block.kind == "locals")
        .flat_map(|block| block.attributes.iter())
        .collect();

    // every round resolves at least one more local or stops
    loop {
        let ctx = scope.context();
        let resolved: Vec<(String, Value)> = locals
            .iter()
            .filter(|(name, _)| !scope.locals.contains_key(name))
            .filter_map(|(name, expr)| Some((name.clone(), expr.evaluate(&ctx).ok()?)))
            .collect();

        if resolved.is_empty() {
            break;
        }
        scope.locals.extend(resolved);
    }
}

fn outputs(blocks: &[RawBlock], ctx: &Context) -> Value {
    Value::Object(
        blocks
            .iter()
            .filter(|block| block.kind == "output")
            .filter_map(|block| {
                let value = block.attribute("value")?.evaluate(ctx).ok()?;
                Some((block.name()?.to_string(), value))
            })
            .collect(),
    )
}

/// Utility macro to load a [Config] from source text
///
/// Load a single file
/// ```
/// # use tfdoc::tf_config;
/// tf_config!(r#"resource "aws_s3_bucket" "main" {}"#);
/// ```
///
/// Load multiple files
/// ```
/// # use tfdoc::tf_config;
/// tf_config! {
///   "main.tf" => r#"resource "aws_s3_bucket" "main" {}"#,
///   "variables.tf" => r#"variable "region" {}"#
/// };
/// ```
///
/// # Panic
/// Panics on invalid input
///
/// ```should_panic
/// # use tfdoc::tf_config;
/// tf_config!("not = valid = hcl");
/// ```
#[macro_export]
macro_rules! tf_config {
    // single file named main.tf
    { $text:expr } => {
        $crate::loader::load_str("main.tf", $text, &$crate::loader::LoaderOptions::default())
            .expect("configuration must load")
    };
    // multiple files
    { $($name:expr => $text:expr),+ } => {
        $crate::loader::load_sources(
            [$(($name, $text)),+],
            &$crate::loader::LoaderOptions::default(),
        )
        .expect("configuration must load")
    };
}
