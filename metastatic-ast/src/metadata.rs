//! Per-node metadata.

use indexmap::IndexMap;
use serde::Serialize;

use crate::MetaNode;
use crate::OpKind;

/// An opaque metadata value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetaValue {
    /// A string value.
    Str(String),
    /// An integer value.
    Int(i64),
    /// A boolean value.
    Bool(bool),
}

impl MetaValue {
    /// Gets the value as a string, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Gets the value as a boolean, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for MetaValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for MetaValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for MetaValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Metadata attached to every MetaAST node.
///
/// Recognized keys are first-class fields; anything else is preserved
/// opaquely in the extension table. Language-specific hints use
/// `"<language>."`-prefixed keys in the extension table (for example
/// `erlang.strict_eq`).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metadata {
    /// The one-based source line of the node; zero when synthetic.
    #[serde(skip_serializing_if = "line_is_synthetic")]
    line: u32,
    /// The verbatim source fragment the node was abstracted from.
    #[serde(skip_serializing_if = "Option::is_none")]
    original_source: Option<String>,
    /// The semantic classification attached by enrichment.
    #[serde(skip_serializing_if = "Option::is_none")]
    op_kind: Option<OpKind>,
    /// Guard clauses for function definitions that carry them.
    #[serde(skip_serializing_if = "Option::is_none")]
    guards: Option<Box<MetaNode>>,
    /// Opaquely preserved keys.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    extra: IndexMap<String, MetaValue>,
}

/// Determines whether a line number denotes a synthetic node.
fn line_is_synthetic(line: &u32) -> bool {
    *line == 0
}

impl Metadata {
    /// Creates empty metadata for a synthetic node.
    pub fn synthetic() -> Self {
        Self::default()
    }

    /// Creates metadata anchored at the given one-based source line.
    pub fn at_line(line: u32) -> Self {
        Self {
            line,
            ..Default::default()
        }
    }

    /// Gets the one-based source line; zero when synthetic.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Sets the source line.
    pub fn set_line(&mut self, line: u32) {
        self.line = line;
    }

    /// Gets the verbatim source fragment, when recorded.
    pub fn original_source(&self) -> Option<&str> {
        self.original_source.as_deref()
    }

    /// Records the verbatim source fragment.
    pub fn with_original_source(mut self, source: impl Into<String>) -> Self {
        self.original_source = Some(source.into());
        self
    }

    /// Gets the semantic classification, when attached.
    pub fn op_kind(&self) -> Option<&OpKind> {
        self.op_kind.as_ref()
    }

    /// Attaches a semantic classification.
    pub fn set_op_kind(&mut self, op_kind: OpKind) {
        self.op_kind = Some(op_kind);
    }

    /// Gets the guard clauses, when present.
    pub fn guards(&self) -> Option<&MetaNode> {
        self.guards.as_deref()
    }

    /// Sets the guard clauses.
    pub fn set_guards(&mut self, guards: MetaNode) {
        self.guards = Some(Box::new(guards));
    }

    /// Gets an opaque metadata value by key.
    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.extra.get(key)
    }

    /// Inserts an opaque metadata value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<MetaValue>) {
        self.extra.insert(key.into(), value.into());
    }

    /// Inserts an opaque metadata value, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Iterates the opaquely preserved keys in insertion order.
    pub fn extra(&self) -> impl Iterator<Item = (&str, &MetaValue)> {
        self.extra.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_preserves_unrecognized_keys_in_order() {
        let mut meta = Metadata::at_line(3);
        meta.insert("erlang.strict_eq", true);
        meta.insert("elixir.keyword", "andalso");
        meta.insert("weight", 12i64);

        let keys: Vec<_> = meta.extra().map(|(k, _)| k).collect();
        assert_eq!(keys, ["erlang.strict_eq", "elixir.keyword", "weight"]);
        assert_eq!(meta.get("erlang.strict_eq").unwrap().as_bool(), Some(true));
        assert_eq!(meta.get("missing"), None);
    }

    #[test]
    fn it_distinguishes_synthetic_nodes() {
        assert_eq!(Metadata::synthetic().line(), 0);
        assert_eq!(Metadata::at_line(7).line(), 7);
    }
}
