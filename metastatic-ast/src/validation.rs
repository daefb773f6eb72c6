//! Structural validation of MetaAST trees.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::Diagnostic;
use crate::Document;
use crate::Error;
use crate::Layer;
use crate::MetaNode;

/// The depth past which standard validation emits a warning.
const DEPTH_WARNING_THRESHOLD: usize = 15;

/// The node count past which standard validation emits a warning.
const NODE_COUNT_WARNING_THRESHOLD: usize = 10_000;

/// How strictly a tree is validated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[derive(strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ValidationMode {
    /// Core and extended layers only; native escape hatches fail.
    Strict,
    /// All layers accepted; native escape hatches and unusually large trees
    /// warn.
    #[default]
    Standard,
    /// Structural well-formedness only.
    Permissive,
}

/// A summary of a validated tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationMeta {
    /// The highest layer observed in the tree.
    pub level: Layer,
    /// The depth of the tree.
    pub depth: usize,
    /// The number of nodes in the tree.
    pub node_count: usize,
    /// The names of all variables referenced by the tree.
    pub variables: BTreeSet<String>,
    /// Warnings emitted during validation.
    pub warnings: Vec<Diagnostic>,
}

/// Determines whether a node conforms structurally.
///
/// MetaAST nodes built through the crate's constructors are well-formed by
/// construction; conformance therefore reduces to walking the children, which
/// also guards against pathological trees assembled by hand.
pub fn conforms(node: &MetaNode) -> bool {
    node.children().iter().all(|child| conforms(child))
}

/// Validates a document's tree under the given mode.
///
/// Strict mode fails on the first native escape hatch encountered, carrying
/// the path of the offending node; standard mode accepts it with a warning.
pub fn validate(document: &Document, mode: ValidationMode) -> Result<ValidationMeta, Error> {
    let mut warnings = Vec::new();
    let mut level = Layer::Core;
    walk(&document.ast, mode, "ast", &mut level, &mut warnings)?;

    let depth = document.ast.depth();
    let node_count = document.ast.node_count();

    if mode == ValidationMode::Standard {
        if depth > DEPTH_WARNING_THRESHOLD {
            warnings.push(Diagnostic::warning(format!(
                "tree depth {depth} exceeds {DEPTH_WARNING_THRESHOLD}"
            )));
        }

        if node_count > NODE_COUNT_WARNING_THRESHOLD {
            warnings.push(Diagnostic::warning(format!(
                "tree contains {node_count} nodes (more than {NODE_COUNT_WARNING_THRESHOLD})"
            )));
        }
    }

    Ok(ValidationMeta {
        level,
        depth,
        node_count,
        variables: document.ast.variables(),
        warnings,
    })
}

/// Recursively checks one node, tracking the highest layer observed.
fn walk(
    node: &MetaNode,
    mode: ValidationMode,
    path: &str,
    level: &mut Layer,
    warnings: &mut Vec<Diagnostic>,
) -> Result<(), Error> {
    *level = (*level).max(node.layer());

    if let MetaNode::LanguageSpecific { language, hint, .. } = node {
        match mode {
            ValidationMode::Strict => {
                return Err(Error::Validation {
                    path: path.to_string(),
                    message: format!(
                        "native {language} fragment is not allowed in strict mode"
                    ),
                });
            }
            ValidationMode::Standard => {
                let hint = hint.as_deref().unwrap_or("unknown construct");
                let mut diagnostic = Diagnostic::warning(format!(
                    "native {language} fragment ({hint}) at `{path}` is opaque to analyses"
                ));
                let line = node.metadata().line();
                if line > 0 {
                    diagnostic =
                        diagnostic.with_location(crate::Location::new(line, 1));
                }
                warnings.push(diagnostic);
            }
            ValidationMode::Permissive => {}
        }
    }

    for (index, child) in node.children().into_iter().enumerate() {
        let child_path = format!(
            "{path}.{kind}[{index}]",
            kind = child.kind_name(),
        );
        walk(child, mode, &child_path, level, warnings)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Language;

    /// Builds a document with a native fragment buried in a block.
    fn native_document() -> Document {
        let ast = MetaNode::block(vec![
            MetaNode::assignment(MetaNode::variable("x"), MetaNode::integer(1)),
            MetaNode::language_specific(Language::Python, "yield x", Some("yield".into())),
        ]);
        Document::new(ast, Language::Python)
    }

    #[test]
    fn strict_mode_rejects_native_fragments() {
        let err = validate(&native_document(), ValidationMode::Strict).unwrap_err();
        match err {
            Error::Validation { path, .. } => {
                assert_eq!(path, "ast.language_specific[1]");
            }
            _ => panic!("expected a validation error"),
        }
    }

    #[test]
    fn standard_mode_warns_on_native_fragments() {
        let meta = validate(&native_document(), ValidationMode::Standard).unwrap();
        assert_eq!(meta.level, Layer::Native);
        assert_eq!(meta.warnings.len(), 1);
        assert!(meta.warnings[0].message().contains("yield"));
    }

    #[test]
    fn permissive_mode_accepts_everything_silently() {
        let meta = validate(&native_document(), ValidationMode::Permissive).unwrap();
        assert!(meta.warnings.is_empty());
    }

    #[test]
    fn standard_mode_warns_on_deep_trees() {
        let mut ast = MetaNode::integer(0);
        for _ in 0..20 {
            ast = MetaNode::unary(crate::UnaryCategory::Arithmetic, "-", ast);
        }

        let meta = validate(&Document::new(ast, Language::Ruby), ValidationMode::Standard)
            .unwrap();
        assert_eq!(meta.depth, 21);
        assert_eq!(meta.warnings.len(), 1);
        assert!(meta.warnings[0].message().contains("depth"));
    }

    #[test]
    fn level_reports_the_highest_layer_observed() {
        let core = Document::new(
            MetaNode::arithmetic("+", MetaNode::variable("x"), MetaNode::integer(5)),
            Language::Python,
        );
        let meta = validate(&core, ValidationMode::Standard).unwrap();
        assert_eq!(meta.level, Layer::Core);

        let extended = Document::new(
            MetaNode::while_loop(MetaNode::boolean(true), MetaNode::block(vec![])),
            Language::Python,
        );
        let meta = validate(&extended, ValidationMode::Standard).unwrap();
        assert_eq!(meta.level, Layer::Extended);
    }
}
