//! The Erlang adapter.
//!
//! Covers the expression subset: matches, operators, local and remote
//! calls, `case`, `if`, `fun`, `try`, and the `lists` collection functions.
//! Module attributes and function definitions are kept verbatim. The strict
//! comparison family (`=:=`, `=/=`) and the `=<`/`andalso`/`orelse`
//! spellings normalize on abstraction; strictness and original spellings
//! ride along in metadata so reification can restore them.

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
use ast::IfClause;

use crate::Adapter;
use crate::NativeAst;
use crate::foreign_fragment_error;

/// The metadata key recording strict (`=:=`/`=/=`) comparison.
const STRICT_KEY: &str = "erlang.strict_eq";

/// The metadata key recording an operator's original spelling.
const SPELLING_KEY: &str = "erlang.op";

/// The bidirectional Erlang bridge.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErlangAdapter;

impl Adapter for ErlangAdapter {
    fn language(&self) -> Language {
        Language::Erlang
    }

    fn parse(&self, source: &str) -> Result<NativeAst, Error> {
        parser::parse(source)
            .map(NativeAst::Erlang)
            .map_err(Error::Parse)
    }

    fn to_meta(&self, native: &NativeAst) -> Result<(MetaNode, DocumentMetadata), Error> {
        let NativeAst::Erlang(ast) = native else {
            return Err(Error::UnsupportedConstruct {
                construct: format!("{} tree", native.language()),
                language: Language::Erlang,
            });
        };

        let metadata = DocumentMetadata {
            line_count: ast.line_count,
            comment_count: ast.comment_count,
            ..Default::default()
        };

        let mut nodes: Vec<MetaNode> = ast
            .forms
            .iter()
            .map(|form| expr_to_meta(&form.expr).at_line(form.line))
            .collect();
        let node = if nodes.len() == 1 {
            nodes.remove(0)
        } else {
            MetaNode::block(nodes)
        };

        Ok((node, metadata))
    }

    fn from_meta(&self, node: &MetaNode) -> Result<NativeAst, Error> {
        let forms = match node {
            MetaNode::Block { statements, .. } => {
                let mut forms = Vec::with_capacity(statements.len());
                for statement in statements {
                    forms.push(Form {
                        line: statement.metadata().line(),
                        expr: meta_to_expr(statement)?,
                    });
                }
                forms
            }
            _ => vec![Form {
                line: node.metadata().line(),
                expr: meta_to_expr(node)?,
            }],
        };

        Ok(NativeAst::Erlang(Ast {
            forms,
            ..Default::default()
        }))
    }

    fn unparse(&self, native: &NativeAst) -> Result<String, Error> {
        let NativeAst::Erlang(ast) = native else {
            return Err(Error::reify(format!(
                "erlang cannot print a {} tree",
                native.language()
            )));
        };

        Ok(printer::print(ast))
    }
}

/// Abstracts a body, unwrapping a single expression.
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
        Expr::Atom(name) => match name.as_str() {
            "true" => MetaNode::boolean(true),
            "false" => MetaNode::boolean(false),
            "undefined" => {
                let mut node = MetaNode::null();
                node.metadata_mut().insert("erlang.atom", "undefined");
                node
            }
            _ => MetaNode::symbol(name.clone()),
        },
        Expr::Var(name) => MetaNode::variable(name.clone()),
        Expr::Wildcard => MetaNode::wildcard(),
        Expr::BinOp { op, left, right } => {
            bin_op_to_meta(op, expr_to_meta(left), expr_to_meta(right))
        }
        Expr::UnaryOp { op, operand } => match op.as_str() {
            "not" => MetaNode::unary(UnaryCategory::Boolean, "not", expr_to_meta(operand)),
            _ => MetaNode::unary(UnaryCategory::Arithmetic, op.clone(), expr_to_meta(operand)),
        },
        Expr::Call { module, name, args } => call_to_meta(module.as_deref(), name, args),
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
        Expr::If { clauses } => if_to_meta(clauses),
        Expr::Fun { params, body } => MetaNode::lambda(
            params.iter().map(expr_to_meta).collect(),
            body_to_meta(body),
        ),
        Expr::Try { body, catches } => MetaNode::ExceptionHandling {
            meta: Metadata::synthetic(),
            body: Box::new(body_to_meta(body)),
            catches: catches
                .iter()
                .map(|clause| {
                    let mut pattern = expr_to_meta(&clause.pattern);
                    if let Some(guard) = &clause.guard {
                        pattern.metadata_mut().set_guards(expr_to_meta(guard));
                    }
                    CatchClause {
                        pattern: Some(pattern),
                        body: body_to_meta(&clause.body),
                    }
                })
                .collect(),
            else_body: None,
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
            MetaNode::language_specific(Language::Erlang, text.as_str(), hint)
                .with_metadata(Metadata::synthetic().with_original_source(text))
        }
    }
}

/// Abstracts a binary operator, normalizing spellings.
fn bin_op_to_meta(op: &str, lhs: MetaNode, rhs: MetaNode) -> MetaNode {
    match op {
        "=:=" | "=/=" => {
            let normalized = if op == "=:=" { "==" } else { "!=" };
            let mut node = MetaNode::comparison(normalized, lhs, rhs);
            node.metadata_mut().insert(STRICT_KEY, true);
            node
        }
        "==" => MetaNode::comparison("==", lhs, rhs),
        "/=" => MetaNode::comparison("!=", lhs, rhs),
        "=<" => MetaNode::comparison("<=", lhs, rhs),
        ">=" | "<" | ">" => MetaNode::comparison(op, lhs, rhs),
        "and" | "andalso" | "or" | "orelse" => {
            let normalized = if op.starts_with("and") { "and" } else { "or" };
            let mut node = MetaNode::boolean_op(normalized, lhs, rhs);
            node.metadata_mut().insert(SPELLING_KEY, op);
            node
        }
        "div" => MetaNode::arithmetic("//", lhs, rhs),
        "rem" => MetaNode::arithmetic("%", lhs, rhs),
        _ => MetaNode::arithmetic(op, lhs, rhs),
    }
}

/// Abstracts a call, recognizing `lists` collection functions and spawn.
fn call_to_meta(module: Option<&str>, name: &str, args: &[Expr]) -> MetaNode {
    match (module, name, args.len()) {
        (Some("lists"), "map", 2) => MetaNode::collection_op(
            CollectionKind::Map,
            expr_to_meta(&args[0]),
            expr_to_meta(&args[1]),
            None,
        ),
        (Some("lists"), "filter", 2) => MetaNode::collection_op(
            CollectionKind::Filter,
            expr_to_meta(&args[0]),
            expr_to_meta(&args[1]),
            None,
        ),
        (Some("lists"), "foldl", 3) => MetaNode::collection_op(
            CollectionKind::Reduce,
            expr_to_meta(&args[0]),
            expr_to_meta(&args[2]),
            Some(expr_to_meta(&args[1])),
        ),
        (Some("lists"), "foreach", 2) => {
            // A single-parameter fun recovers the iterator-loop shape.
            if let Expr::Fun { params, body } = &args[0] {
                if params.len() == 1 {
                    return MetaNode::for_each(
                        expr_to_meta(&params[0]),
                        expr_to_meta(&args[1]),
                        body_to_meta(body),
                    );
                }
            }

            MetaNode::call(
                "lists.foreach",
                args.iter().map(expr_to_meta).collect(),
            )
        }
        (None, "spawn", 1) => MetaNode::AsyncOperation {
            meta: Metadata::synthetic(),
            kind: AsyncKind::Spawn,
            body: Box::new(expr_to_meta(&args[0])),
        },
        _ => {
            let dotted = match module {
                Some(module) => format!("{module}.{name}"),
                None => name.to_string(),
            };
            MetaNode::call(dotted, args.iter().map(expr_to_meta).collect())
        }
    }
}

/// Abstracts an `if` of guard clauses into a conditional chain.
///
/// A trailing `true -> …` clause becomes the else branch.
fn if_to_meta(clauses: &[IfClause]) -> MetaNode {
    let mut else_branch = None;
    let mut remaining = clauses;
    if let Some((last, rest)) = clauses.split_last() {
        if last.guard == Expr::Atom("true".to_string()) {
            else_branch = Some(body_to_meta(&last.body));
            remaining = rest;
        }
    }

    let mut result = else_branch;
    for clause in remaining.iter().rev() {
        result = Some(MetaNode::conditional(
            expr_to_meta(&clause.guard),
            body_to_meta(&clause.body),
            result,
        ));
    }

    result.unwrap_or_else(|| MetaNode::block(Vec::new()))
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
            (_, LiteralValue::Bool(v)) => Expr::Atom(v.to_string()),
            (_, LiteralValue::Null) => Expr::Atom("undefined".to_string()),
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
            let strict = node.metadata().get(STRICT_KEY).and_then(|v| v.as_bool())
                == Some(true);
            let spelled = match (category, op.as_str()) {
                (BinaryCategory::Comparison, "==") if strict => "=:=".to_string(),
                (BinaryCategory::Comparison, "!=") if strict => "=/=".to_string(),
                (BinaryCategory::Comparison, "!=") => "/=".to_string(),
                (BinaryCategory::Comparison, "<=") => "=<".to_string(),
                (BinaryCategory::Boolean, _) => node
                    .metadata()
                    .get(SPELLING_KEY)
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| {
                        // Short-circuit forms are the idiomatic default.
                        if op == "and" { "andalso" } else { "orelse" }.to_string()
                    }),
                (_, "//") => "div".to_string(),
                (_, "%") => "rem".to_string(),
                _ => op.clone(),
            };

            Ok(Expr::BinOp {
                op: spelled,
                left: Box::new(meta_to_expr(lhs)?),
                right: Box::new(meta_to_expr(rhs)?),
            })
        }
        MetaNode::UnaryOp { op, operand, .. } => Ok(Expr::UnaryOp {
            op: op.clone(),
            operand: Box::new(meta_to_expr(operand)?),
        }),
        MetaNode::FunctionCall { name, args, .. } => {
            let args = args
                .iter()
                .map(meta_to_expr)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(match name.rsplit_once('.') {
                Some((module, fun)) => Expr::Call {
                    module: Some(module.to_string()),
                    name: fun.to_string(),
                    args,
                },
                None => Expr::Call {
                    module: None,
                    name: name.clone(),
                    args,
                },
            })
        }
        MetaNode::Conditional {
            condition,
            then_branch,
            else_branch,
            ..
        } => {
            let mut clauses = vec![IfClause {
                guard: meta_to_expr(condition)?,
                body: meta_to_body(then_branch)?,
            }];
            if let Some(else_branch) = else_branch {
                clauses.push(IfClause {
                    guard: Expr::Atom("true".to_string()),
                    body: meta_to_body(else_branch)?,
                });
            }

            Ok(Expr::If { clauses })
        }
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
                module: Some("lists".to_string()),
                name: "foreach".to_string(),
                args: vec![
                    Expr::Fun {
                        params: vec![meta_to_expr(binding)?],
                        body: meta_to_body(body)?,
                    },
                    meta_to_expr(iterable)?,
                ],
            }),
            _ => Err(Error::reify(
                "erlang has no while loop; only iterator loops reify",
            )),
        },
        MetaNode::Lambda { params, body, .. } => Ok(Expr::Fun {
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
            let func = meta_to_expr(func)?;
            let collection = meta_to_expr(collection)?;
            let (name, args) = match (kind, init) {
                (CollectionKind::Map, _) => ("map", vec![func, collection]),
                (CollectionKind::Filter, _) => ("filter", vec![func, collection]),
                (CollectionKind::Reduce, Some(init)) => {
                    ("foldl", vec![func, meta_to_expr(init)?, collection])
                }
                (CollectionKind::Reduce, None) => {
                    return Err(Error::reify(
                        "erlang lists:foldl needs an initial accumulator",
                    ));
                }
            };

            Ok(Expr::Call {
                module: Some("lists".to_string()),
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
        MetaNode::ExceptionHandling { body, catches, .. } => {
            let mut catch_clauses = Vec::with_capacity(catches.len());
            for clause in catches {
                let pattern = match &clause.pattern {
                    Some(pattern) => pattern.clone(),
                    None => MetaNode::wildcard(),
                };
                catch_clauses.push(Clause {
                    guard: pattern.metadata().guards().map(meta_to_expr).transpose()?,
                    pattern: meta_to_expr(&pattern)?,
                    body: meta_to_body(&clause.body)?,
                });
            }

            Ok(Expr::Try {
                body: meta_to_body(body)?,
                catches: catch_clauses,
            })
        }
        MetaNode::AsyncOperation { kind, body, .. } => match kind {
            AsyncKind::Spawn => Ok(Expr::Call {
                module: None,
                name: "spawn".to_string(),
                args: vec![meta_to_expr(body)?],
            }),
            other => Err(Error::reify(format!(
                "erlang has no rendering for `{other}` operations"
            ))),
        },
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
        MetaNode::Block { .. } => Err(Error::reify(
            "a bare block has no erlang expression rendering",
        )),
        MetaNode::EarlyReturn { .. } => Err(Error::reify(
            "erlang has no early return; restructure the tree first",
        )),
        MetaNode::LanguageSpecific {
            language, native, ..
        } => {
            if *language != Language::Erlang {
                return Err(foreign_fragment_error(*language, Language::Erlang));
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
        let adapter = ErlangAdapter;
        let native = adapter.parse(source).unwrap();
        adapter.to_meta(&native).unwrap().0
    }

    /// Unquotes a tree through the adapter.
    fn unquote(node: &MetaNode) -> String {
        let adapter = ErlangAdapter;
        adapter.unparse(&adapter.from_meta(node).unwrap()).unwrap()
    }

    #[test]
    fn arithmetic_abstracts_like_the_other_languages() {
        let node = quote("X + 5");
        assert!(node.structurally_equal(&MetaNode::arithmetic(
            "+",
            MetaNode::variable("X"),
            MetaNode::integer(5),
        )));
    }

    #[test]
    fn strict_equality_normalizes_and_restores() {
        let node = quote("A =:= B");
        match &node {
            MetaNode::BinaryOp { op, .. } => assert_eq!(op, "=="),
            other => panic!("expected a comparison, got {other:?}"),
        }
        assert_eq!(unquote(&node), "A =:= B.");
    }

    #[test]
    fn remote_calls_become_dotted_names() {
        let node = quote("io:format(\"hi\")");
        match &node {
            MetaNode::FunctionCall { name, .. } => assert_eq!(name, "io.format"),
            other => panic!("expected a call, got {other:?}"),
        }
    }

    #[test]
    fn guard_chains_abstract_to_conditionals() {
        let node = quote("if X > 0 -> pos; true -> neg end");
        match &node {
            MetaNode::Conditional { else_branch, .. } => assert!(else_branch.is_some()),
            other => panic!("expected a conditional, got {other:?}"),
        }
    }

    #[test]
    fn semantic_round_trip_holds_on_the_core_subset() {
        let sources = [
            "X + 5",
            "X = Y * 2",
            "case X of\n    1 -> one;\n    _ -> other\nend",
            "F = fun(V) -> V + 1 end",
            "lists:foldl(fun(V, Acc) -> Acc + V end, 0, Items)",
            "A =< B orelse C /= D",
            "{ok, Result} = fetch(Url)",
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
