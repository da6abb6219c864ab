//! # tfdoc - terraform configuration as one document
//!
//! Loads a terraform configuration directory (including its child modules) and converts it into a single JSON/YAML
//! document for policy engines and other tools that want plain data instead of HCL.
//!
//! ## Introduction for developers
//!
//! Read this to understand how `tfdoc` works internally.
//!
//! ### Terraform terms
//!
//! A terraform configuration is a directory of `*.tf` files, the _root module_. All files of a directory are read as
//! one body, a list of root blocks:
//!
//! ```hcl
//! variable "bucket_name" {
//!   type    = string
//!   default = "logs"
//! }
//!
//! resource "aws_s3_bucket" "main" {
//!   bucket = var.bucket_name
//!
//!   versioning {
//!     enabled = true
//!   }
//! }
//!
//! module "vpc" {
//!   source = "./modules/vpc"
//! }
//! ```
//!
//! A `module` block includes another directory as a _child module_. Child modules can include further modules.
//!
//! ### Loading
//!
//! see [loader::load_dir]
//!
//! Every module is parsed with [hcl_edit] (we need byte spans for line numbers) and its expressions are evaluated
//! with [hcl::eval] against what can be known without running terraform: variable defaults and `*.tfvars`, locals,
//! literal attributes of other blocks and outputs of child modules. Anything else is _unknown_
//! ([typed::TypedValue::Unknown]).
//!
//! `count`/`for_each` instances and `dynamic` blocks are expanded while loading.
//!
//! The result is a [config::Config]: a list of modules, the root module first, each holding its root blocks. A root
//! block of a child module points back at the `module` block that included it ([config::BlockId]).
//!
//! ### Conversion
//!
//! see [converter::convert]
//!
//! Modules are walked in order and every root block of a supported type becomes a document:
//!
//! - child blocks first, grouped by type (a single child is an object, several are a list)
//! - attributes, converted to [value::Value] or kept as raw expression text when they can not be represented
//! - `id`, the block's path
//! - `__tfmeta`, where the block was found and which blocks it references
//!
//! Blocks generated from `dynamic` blocks are recognized by their line ranges, see [dedup].
//!
//! Every block is known by its _path_: its reference (`aws_s3_bucket.main`, `var.region`, ...) prefixed by the chain
//! of `module` blocks that lead to it (`module.vpc.aws_subnet.private`), see [path].
//!
//! ### Output
//!
//! [value::Value] implements [serde::Serialize] and is written with `serde_json` or `serde_yaml`.
//!
pub mod collector;
pub mod config;
pub mod converter;
pub mod dedup;
pub mod diagnostics;
pub mod loader;
pub mod path;
pub mod references;
pub mod typed;
pub mod value;
pub mod var_type;
mod visit;

pub use converter::{convert, ConvertError};
pub use diagnostics::Diagnostics;
pub use loader::{load_dir, LoaderOptions};

/// Load the configuration in `dir` and convert it
///
/// Diagnostics are only logged.
pub fn convert_dir(dir: &std::path::Path, options: &LoaderOptions) -> anyhow::Result<value::Value> {
    let config = load_dir(dir, options)?;

    let mut diagnostics = Diagnostics::new();
    let value = convert(&config, &mut diagnostics)?;
    if !diagnostics.is_empty() {
        tracing::info!(count = diagnostics.entries().len(), "blocks skipped");
    }

    Ok(value)
}
