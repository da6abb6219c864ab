//! parsed configuration files
use crate::config::SourceRange;
use hcl::Expression;
use hcl_edit::structure::{Block, Body, Structure};
use hcl_edit::Span;
use std::ops::Range;
use std::path::Path;

/// One parsed file and what is needed to turn byte spans into lines
#[derive(Debug)]
pub struct SourceFile {
    /// Name reported in metadata, relative to the loaded root directory when possible
    pub name: String,
    pub body: Body,
    line_starts: Vec<usize>,
}

impl SourceFile {
    pub fn parse(name: impl Into<String>, text: &str) -> Result<Self, hcl_edit::parser::Error> {
        let body = hcl_edit::parser::parse_body(text)?;

        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(offset, _)| offset + 1))
            .collect();

        Ok(Self {
            name: name.into(),
            body,
            line_starts,
        })
    }

    /// 1-based line containing byte `offset`
    pub fn line(&self, offset: usize) -> usize {
        self.line_starts.partition_point(|&start| start <= offset)
    }

    /// Line range of a parsed element
    pub fn range(&self, element: &impl Span) -> SourceRange {
        let span = element.span().unwrap_or(Range { start: 0, end: 0 });
        self.range_of(span)
    }

    pub fn range_of(&self, span: Range<usize>) -> SourceRange {
        let start_line = self.line(span.start);
        // `end` is exclusive
        let end_line = self.line(span.end.saturating_sub(1).max(span.start));
        SourceRange::new(self.name.clone(), start_line, end_line)
    }

    /// Top level blocks, attributes outside of blocks are not valid terraform and are skipped
    pub fn blocks(&self) -> Vec<RawBlock> {
        self.body
            .iter()
            .filter_map(|structure| match structure {
                Structure::Block(block) => Some(self.raw_block(block)),
                Structure::Attribute(attribute) => {
                    tracing::debug!(
                        file = %self.name,
                        key = attribute.key.value().as_str(),
                        "skipping top level attribute"
                    );
                    None
                }
            })
            .collect()
    }

    fn raw_block(&self, block: &Block) -> RawBlock {
        let mut raw = RawBlock {
            kind: block.ident.value().as_str().to_string(),
            labels: block
                .labels
                .iter()
                .map(|label| label.as_str().to_string())
                .collect(),
            range: self.range(block),
            attributes: vec![],
            children: vec![],
        };

        for structure in block.body.iter() {
            match structure {
                Structure::Attribute(attribute) => raw.attributes.push((
                    attribute.key.value().as_str().to_string(),
                    attribute.value.clone().into(),
                )),
                Structure::Block(child) => raw.children.push(self.raw_block(child)),
            }
        }

        raw
    }
}

/// A block as written, before evaluation
#[derive(Debug, Clone)]
pub struct RawBlock {
    pub kind: String,
    pub labels: Vec<String>,
    pub range: SourceRange,
    pub attributes: Vec<(String, Expression)>,
    pub children: Vec<RawBlock>,
}

impl RawBlock {
    pub fn attribute(&self, name: &str) -> Option<&Expression> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, expr)| expr)
    }

    /// First label, the name of variables, outputs and modules
    pub fn name(&self) -> Option<&str> {
        self.labels.first().map(String::as_str)
    }
}

/// Name of `path` relative to `root`, with `/` separators
pub fn display_name(path: &Path, root: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(relative) => relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => path.display().to_string(),
    }
}
