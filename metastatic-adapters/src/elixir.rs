//! The Elixir adapter.
//!
//! Covers the expression subset: matches, operators, calls, `if`, `case`,
//! `fn`, `try`, and the `Enum` collection pipeline. Definitions, pipelines,
//! and other macro-heavy forms are kept verbatim and abstract into the
//! native escape hatch. Strict comparisons (`===`, `!==`) and the
//! `&&`/`||`/`!` operator family normalize on abstraction with the original
//! spelling kept in metadata for reification.

pub mod ast;
mod lexer;
mod parser;
mod printer;

use metastatic_ast::AsyncKind;
use metastatic_ast::BinaryCategory;
use metastatic_ast::CatchClause;
use metastatic_ast::CollectionKind;
use metastatic_ast::DocumentMetadata;
use metastatic_ast::Error;
use metastatic_ast::Language;
use metastatic_ast::LiteralValue;
use metastatic_ast::LoopForm;
use metastatic_ast::MatchArm;
use metastatic_ast::Metadata;
use metastatic_ast::MetaNode;
use metastatic_ast::UnaryCategory;

pub use ast::Ast;

use ast::Clause;
use ast::Expr;
use ast::Form;

use crate::Adapter;
use crate::NativeAst;
use crate::foreign_fragment_error;

/// The metadata key recording an operator's original spelling.
const SPELLING_KEY: &str = "elixir.op";

/// The metadata key recording strict (`===`) comparison.
const STRICT_KEY: &str = "elixir.strict";

/// The bidirectional Elixir bridge.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElixirAdapter;

impl Adapter for ElixirAdapter {
    fn language(&self) -> Language {
        Language::Elixir
    }

    fn parse(&self, source: &str) -> Result<NativeAst, Error> {
        parser::parse(source)
            .map(NativeAst::Elixir)
            .map_err(Error::Parse)
    }

    fn to_meta(&self, native: &NativeAst) -> Result<(MetaNode, DocumentMetadata), Error> {
        let NativeAst::Elixir(ast) = native else {
            return Err(Error::UnsupportedConstruct {
                construct: format!("{} tree", native.language()),
                language: Language::Elixir,
            });
        };

        let metadata = DocumentMetadata {
            line_count: ast.line_count,
            comment_count: ast.comment_count,
            ..Default::default()
        };

        let mut nodes: Vec<MetaNode> = ast.forms.iter().map(form_to_meta).collect();
        let node = if nodes.len() == 1 {
            nodes.remove(0)
        } else {
            MetaNode::block(nodes)
        };

        Ok((node, metadata))
    }

    fn from_meta(&self, node: &MetaNode) -> Result<NativeAst, Error> {
        let forms = meta_to_forms(node)?;
        Ok(NativeAst::Elixir(Ast {
            forms,
            ..Default::default()
        }))
    }

    fn unparse(&self, native: &NativeAst) -> Result<String, Error> {
        let NativeAst::Elixir(ast) = native else {
            return Err(Error::reify(format!(
                "elixir cannot print a {} tree",
                native.language()
            )));
        };

        Ok(printer::print(ast))
    }
}

/// Abstracts one top-level form.
fn form_to_meta(form: &Form) -> MetaNode {
    expr_to_meta(&form.expr).at_line(form.line)
}

/// Abstracts a block body, unwrapping a single expression.
fn body_to_meta(body: &[Expr]) -> MetaNode {
    let mut nodes: Vec<MetaNode> = body.iter().map(expr_to_meta).collect();
    if nodes.len() == 1 {
        nodes.remove(0)
    } else {
        MetaNode::block(nodes)
    }
}

/// Abstracts one expression.
fn expr_to_meta(expr: &Expr) -> MetaNode {
    match expr {
        Expr::Int(value) => MetaNode::integer(*value),
        Expr::Float(value) => MetaNode::float(*value),
        Expr::Str(value) => MetaNode::string(value.clone()),
        Expr::Atom(name) => MetaNode::symbol(name.clone()),
        Expr::Bool(value) => MetaNode::boolean(*value),
        Expr::Nil => MetaNode::null(),
        Expr::Var(name) => MetaNode::variable(name.clone()),
        Expr::Wildcard => MetaNode::wildcard(),
        Expr::BinOp { op, left, right } => {
            bin_op_to_meta(op, expr_to_meta(left), expr_to_meta(right))
        }
        Expr::UnaryOp { op, operand } => match op.as_str() {
            "not" | "!" => {
                let mut node =
                    MetaNode::unary(UnaryCategory::Boolean, "not", expr_to_meta(operand));
                if op == "!" {
                    node.metadata_mut().insert(SPELLING_KEY, "!");
                }
                node
            }
            _ => MetaNode::unary(UnaryCategory::Arithmetic, op.clone(), expr_to_meta(operand)),
        },
        Expr::Call { name, args } => call_to_meta(name, args),
        Expr::If {
            condition,
            do_block,
            else_block,
        } => MetaNode::conditional(
            expr_to_meta(condition),
            body_to_meta(do_block),
            else_block.as_deref().map(body_to_meta),
        ),
        Expr::Case { subject, clauses } => MetaNode::pattern_match(
            expr_to_meta(subject),
            clauses
                .iter()
                .map(|clause| MatchArm {
                    pattern: expr_to_meta(&clause.pattern),
                    guard: clause.guard.as_ref().map(expr_to_meta),
                    body: body_to_meta(&clause.body),
                })
                .collect(),
        ),
        Expr::Fn { params, body } => MetaNode::lambda(
            params.iter().map(expr_to_meta).collect(),
            body_to_meta(body),
        ),
        Expr::Try {
            body,
            rescue,
            else_block,
        } => MetaNode::ExceptionHandling {
            meta: Metadata::synthetic(),
            body: Box::new(body_to_meta(body)),
            catches: rescue.iter().map(clause_to_catch).collect(),
            else_body: if else_block.is_empty() {
                None
            } else {
                Some(Box::new(body_to_meta(else_block)))
            },
        },
        Expr::Match { left, right } => match &**left {
            Expr::Var(name) => {
                MetaNode::assignment(MetaNode::variable(name.clone()), expr_to_meta(right))
            }
            pattern => MetaNode::inline_match(expr_to_meta(pattern), expr_to_meta(right)),
        },
        Expr::List(items) => MetaNode::List {
            meta: Metadata::synthetic(),
            items: items.iter().map(expr_to_meta).collect(),
        },
        Expr::Tuple(items) => MetaNode::Tuple {
            meta: Metadata::synthetic(),
            items: items.iter().map(expr_to_meta).collect(),
        },
        Expr::MapLit(entries) => MetaNode::MapLiteral {
            meta: Metadata::synthetic(),
            entries: entries
                .iter()
                .map(|(key, value)| (expr_to_meta(key), expr_to_meta(value)))
                .collect(),
        },
        Expr::Raw(text) => {
            let hint = text.split_whitespace().next().map(str::to_string);
            MetaNode::language_specific(Language::Elixir, text.as_str(), hint)
                .with_metadata(Metadata::synthetic().with_original_source(text))
        }
    }
}

/// Abstracts a binary operator, normalizing spellings.
fn bin_op_to_meta(op: &str, lhs: MetaNode, rhs: MetaNode) -> MetaNode {
    match op {
        "===" | "!==" => {
            let normalized = if op == "===" { "==" } else { "!=" };
            let mut node = MetaNode::comparison(normalized, lhs, rhs);
            node.metadata_mut().insert(STRICT_KEY, true);
            node
        }
        "==" | "!=" | "<=" | ">=" | "<" | ">" => MetaNode::comparison(op, lhs, rhs),
        "and" | "&&" | "or" | "||" => {
            let normalized = if op == "and" || op == "&&" { "and" } else { "or" };
            let mut node = MetaNode::boolean_op(normalized, lhs, rhs);
            if op == "&&" || op == "||" {
                node.metadata_mut().insert(SPELLING_KEY, op);
            }
            node
        }
        _ => MetaNode::arithmetic(op, lhs, rhs),
    }
}

/// Abstracts a call, recognizing `Enum` collection operations and task
/// primitives.
fn call_to_meta(name: &str, args: &[Expr]) -> MetaNode {
    match (name, args.len()) {
        ("Enum.map", 2) => MetaNode::collection_op(
            CollectionKind::Map,
            expr_to_meta(&args[1]),
            expr_to_meta(&args[0]),
            None,
        ),
        ("Enum.filter", 2) => MetaNode::collection_op(
            CollectionKind::Filter,
            expr_to_meta(&args[1]),
            expr_to_meta(&args[0]),
            None,
        ),
        ("Enum.reduce", 3) => MetaNode::collection_op(
            CollectionKind::Reduce,
            expr_to_meta(&args[2]),
            expr_to_meta(&args[0]),
            Some(expr_to_meta(&args[1])),
        ),
        ("Enum.reduce", 2) => MetaNode::collection_op(
            CollectionKind::Reduce,
            expr_to_meta(&args[1]),
            expr_to_meta(&args[0]),
            None,
        ),
        ("Enum.each", 2) => {
            // A single-parameter fn recovers the iterator-loop shape.
            if let Expr::Fn { params, body } = &args[1] {
                if params.len() == 1 {
                    return MetaNode::for_each(
                        expr_to_meta(&params[0]),
                        expr_to_meta(&args[0]),
                        body_to_meta(body),
                    );
                }
            }

            MetaNode::call("Enum.each", args.iter().map(expr_to_meta).collect())
        }
        ("Task.await", 1) => MetaNode::AsyncOperation {
            meta: Metadata::synthetic(),
            kind: AsyncKind::Await,
            body: Box::new(expr_to_meta(&args[0])),
        },
        ("Task.async", 1) => MetaNode::AsyncOperation {
            meta: Metadata::synthetic(),
            kind: AsyncKind::Async,
            body: Box::new(expr_to_meta(&args[0])),
        },
        ("spawn", 1) => MetaNode::AsyncOperation {
            meta: Metadata::synthetic(),
            kind: AsyncKind::Spawn,
            body: Box::new(expr_to_meta(&args[0])),
        },
        _ => MetaNode::call(name, args.iter().map(expr_to_meta).collect()),
    }
}

/// Abstracts a rescue clause; a guard folds into the pattern's metadata.
fn clause_to_catch(clause: &Clause) -> CatchClause {
    let mut pattern = expr_to_meta(&clause.pattern);
    if let Some(guard) = &clause.guard {
        pattern.metadata_mut().set_guards(expr_to_meta(guard));
    }

    CatchClause {
        pattern: Some(pattern),
        body: body_to_meta(&clause.body),
    }
}

/// Reifies a node into a top-level form sequence.
fn meta_to_forms(node: &MetaNode) -> Result<Vec<Form>, Error> {
    if let MetaNode::Block { statements, .. } = node {
        let mut forms = Vec::with_capacity(statements.len());
        for statement in statements {
            forms.push(Form {
                line: statement.metadata().line(),
                expr: meta_to_expr(statement)?,
            });
        }
        return Ok(forms);
    }

    Ok(vec![Form {
        line: node.metadata().line(),
        expr: meta_to_expr(node)?,
    }])
}

/// Reifies a node into a block body.
fn meta_to_body(node: &MetaNode) -> Result<Vec<Expr>, Error> {
    if let MetaNode::Block { statements, .. } = node {
        return statements.iter().map(meta_to_expr).collect();
    }

    Ok(vec![meta_to_expr(node)?])
}

/// Reifies one node into an expression.
fn meta_to_expr(node: &MetaNode) -> Result<Expr, Error> {
    match node {
        MetaNode::Literal { value, subtype, .. } => Ok(match (subtype, value) {
            (metastatic_ast::LiteralKind::Symbol, LiteralValue::Str(name)) => {
                Expr::Atom(name.clone())
            }
            (_, LiteralValue::Int(v)) => Expr::Int(*v),
            (_, LiteralValue::Float(v)) => Expr::Float(*v),
            (_, LiteralValue::Str(v)) => Expr::Str(v.clone()),
            (_, LiteralValue::Bool(v)) => Expr::Bool(*v),
            (_, LiteralValue::Null) => Expr::Nil,
        }),
        MetaNode::Variable { name, .. } => Ok(Expr::Var(name.clone())),
        MetaNode::Wildcard { .. } => Ok(Expr::Wildcard),
        MetaNode::BinaryOp {
            category,
            op,
            lhs,
            rhs,
            ..
        } => {
            let spelled = match category {
                BinaryCategory::Comparison
                    if node.metadata().get(STRICT_KEY).and_then(|v| v.as_bool())
                        == Some(true) =>
                {
                    if op == "==" { "===" } else { "!==" }.to_string()
                }
                BinaryCategory::Boolean => node
                    .metadata()
                    .get(SPELLING_KEY)
                    .and_then(|v| v.as_str())
                    .unwrap_or(op)
                    .to_string(),
                _ => op.clone(),
            };

            Ok(Expr::BinOp {
                op: spelled,
                left: Box::new(meta_to_expr(lhs)?),
                right: Box::new(meta_to_expr(rhs)?),
            })
        }
        MetaNode::UnaryOp { op, operand, .. } => {
            let spelled = node
                .metadata()
                .get(SPELLING_KEY)
                .and_then(|v| v.as_str())
                .unwrap_or(op)
                .to_string();
            Ok(Expr::UnaryOp {
                op: spelled,
                operand: Box::new(meta_to_expr(operand)?),
            })
        }
        MetaNode::FunctionCall { name, args, .. } => Ok(Expr::Call {
            name: name.clone(),
            args: args.iter().map(meta_to_expr).collect::<Result<_, _>>()?,
        }),
        MetaNode::Conditional {
            condition,
            then_branch,
            else_branch,
            ..
        } => Ok(Expr::If {
            condition: Box::new(meta_to_expr(condition)?),
            do_block: meta_to_body(then_branch)?,
            else_block: else_branch.as_deref().map(meta_to_body).transpose()?,
        }),
        MetaNode::Block { .. } => Err(Error::reify(
            "a bare block has no elixir expression rendering",
        )),
        MetaNode::Assignment { target, value, .. } => Ok(Expr::Match {
            left: Box::new(meta_to_expr(target)?),
            right: Box::new(meta_to_expr(value)?),
        }),
        MetaNode::InlineMatch { pattern, value, .. } => Ok(Expr::Match {
            left: Box::new(meta_to_expr(pattern)?),
            right: Box::new(meta_to_expr(value)?),
        }),
        MetaNode::Loop { form, .. } => match form {
            LoopForm::ForEach {
                binding,
                iterable,
                body,
            } => Ok(Expr::Call {
                name: "Enum.each".to_string(),
                args: vec![
                    meta_to_expr(iterable)?,
                    Expr::Fn {
                        params: vec![meta_to_expr(binding)?],
                        body: meta_to_body(body)?,
                    },
                ],
            }),
            _ => Err(Error::reify(
                "elixir has no while loop; only iterator loops reify",
            )),
        },
        MetaNode::Lambda { params, body, .. } => Ok(Expr::Fn {
            params: params.iter().map(meta_to_expr).collect::<Result<_, _>>()?,
            body: meta_to_body(body)?,
        }),
        MetaNode::CollectionOp {
            kind,
            func,
            collection,
            init,
            ..
        } => {
            let mut args = vec![meta_to_expr(collection)?];
            if let Some(init) = init {
                args.push(meta_to_expr(init)?);
            }
            args.push(meta_to_expr(func)?);

            let name = match kind {
                CollectionKind::Map => "Enum.map",
                CollectionKind::Filter => "Enum.filter",
                CollectionKind::Reduce => "Enum.reduce",
            };

            Ok(Expr::Call {
                name: name.to_string(),
                args,
            })
        }
        MetaNode::PatternMatch {
            scrutinee, arms, ..
        } => {
            let mut clauses = Vec::with_capacity(arms.len());
            for arm in arms {
                clauses.push(Clause {
                    pattern: meta_to_expr(&arm.pattern)?,
                    guard: arm.guard.as_ref().map(meta_to_expr).transpose()?,
                    body: meta_to_body(&arm.body)?,
                });
            }

            Ok(Expr::Case {
                subject: Box::new(meta_to_expr(scrutinee)?),
                clauses,
            })
        }
        MetaNode::ExceptionHandling {
            body,
            catches,
            else_body,
            ..
        } => {
            let mut rescue = Vec::with_capacity(catches.len());
            for clause in catches {
                let pattern = match &clause.pattern {
                    Some(pattern) => pattern.clone(),
                    None => MetaNode::wildcard(),
                };
                rescue.push(Clause {
                    guard: pattern.metadata().guards().map(meta_to_expr).transpose()?,
                    pattern: meta_to_expr(&pattern)?,
                    body: meta_to_body(&clause.body)?,
                });
            }

            Ok(Expr::Try {
                body: meta_to_body(body)?,
                rescue,
                else_block: match else_body {
                    Some(else_body) => meta_to_body(else_body)?,
                    None => Vec::new(),
                },
            })
        }
        MetaNode::AsyncOperation { kind, body, .. } => {
            let name = match kind {
                AsyncKind::Await => "Task.await",
                AsyncKind::Async => "Task.async",
                AsyncKind::Spawn => "spawn",
            };

            Ok(Expr::Call {
                name: name.to_string(),
                args: vec![meta_to_expr(body)?],
            })
        }
        MetaNode::List { items, .. } => Ok(Expr::List(
            items.iter().map(meta_to_expr).collect::<Result<_, _>>()?,
        )),
        MetaNode::Tuple { items, .. } => Ok(Expr::Tuple(
            items.iter().map(meta_to_expr).collect::<Result<_, _>>()?,
        )),
        MetaNode::Pair { first, second, .. } => Ok(Expr::Tuple(vec![
            meta_to_expr(first)?,
            meta_to_expr(second)?,
        ])),
        MetaNode::MapLiteral { entries, .. } => {
            let mut rendered = Vec::with_capacity(entries.len());
            for (key, value) in entries {
                rendered.push((meta_to_expr(key)?, meta_to_expr(value)?));
            }
            Ok(Expr::MapLit(rendered))
        }
        MetaNode::EarlyReturn { .. } => Err(Error::reify(
            "elixir has no early return; restructure the tree first",
        )),
        MetaNode::LanguageSpecific {
            language, native, ..
        } => {
            if *language != Language::Elixir {
                return Err(foreign_fragment_error(*language, Language::Elixir));
            }

            Ok(Expr::Raw(native.as_str().to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    /// Quotes source through the adapter.
    fn quote(source: &str) -> MetaNode {
        let adapter = ElixirAdapter;
        let native = adapter.parse(source).unwrap();
        adapter.to_meta(&native).unwrap().0
    }

    /// Unquotes a tree through the adapter.
    fn unquote(node: &MetaNode) -> String {
        let adapter = ElixirAdapter;
        adapter.unparse(&adapter.from_meta(node).unwrap()).unwrap()
    }

    #[test]
    fn arithmetic_abstracts_like_python() {
        let node = quote("x + 5");
        assert!(node.structurally_equal(&MetaNode::arithmetic(
            "+",
            MetaNode::variable("x"),
            MetaNode::integer(5),
        )));
    }

    #[test]
    fn strict_equality_normalizes_with_metadata() {
        let node = quote("a === b");
        match &node {
            MetaNode::BinaryOp { op, .. } => assert_eq!(op, "=="),
            other => panic!("expected a comparison, got {other:?}"),
        }
        assert_eq!(
            node.metadata().get(STRICT_KEY).and_then(|v| v.as_bool()),
            Some(true)
        );

        // The strict spelling comes back on reification.
        assert_eq!(unquote(&node), "a === b");
    }

    #[test]
    fn enum_calls_become_collection_ops() {
        let node = quote("Enum.reduce(items, 0, fn v, acc -> acc + v end)");
        match &node {
            MetaNode::CollectionOp { kind, init, .. } => {
                assert_eq!(*kind, CollectionKind::Reduce);
                assert!(init.is_some());
            }
            other => panic!("expected a collection op, got {other:?}"),
        }
    }

    #[test]
    fn semantic_round_trip_holds_on_the_core_subset() {
        let sources = [
            "x + 5",
            "x = y * 2",
            "if x > 0 do\n  :pos\nelse\n  :neg\nend",
            "case v do\n  1 -> :one\n  _ -> :other\nend",
            "Enum.map(items, fn v -> v * 2 end)",
            "{:ok, result} = fetch(url)",
            "a && b || not c",
        ];

        for source in sources {
            let first = quote(source);
            let second = quote(&unquote(&first));
            assert!(
                first.structurally_equal(&second),
                "round trip diverged for {source:?}"
            );
        }
    }
}
