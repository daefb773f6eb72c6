//! The Python adapter.
//!
//! Parses with an indentation-layout lexer and a recursive-descent parser
//! into a small native tree, abstracts the tree into MetaAST, and reifies
//! MetaAST back into native form for pretty-printing. Statements the parser
//! does not model (definitions, imports, decorators) are kept verbatim and
//! abstract into the native escape hatch.

pub mod ast;
mod lexer;
mod parser;
mod printer;

use metastatic_ast::CatchClause;
use metastatic_ast::CollectionKind;
use metastatic_ast::DocumentMetadata;
use metastatic_ast::Error;
use metastatic_ast::Language;
use metastatic_ast::LoopForm;
use metastatic_ast::MatchArm;
use metastatic_ast::MetaNode;
use metastatic_ast::UnaryCategory;

pub use ast::Ast;

use ast::Expr;
use ast::ExceptHandler;
use ast::MatchCase;
use ast::Stmt;
use ast::StmtKind;

use crate::Adapter;
use crate::NativeAst;
use crate::foreign_fragment_error;

/// The bidirectional Python bridge.
#[derive(Debug, Clone, Copy, Default)]
pub struct PythonAdapter;

impl Adapter for PythonAdapter {
    fn language(&self) -> Language {
        Language::Python
    }

    fn parse(&self, source: &str) -> Result<NativeAst, Error> {
        parser::parse(source)
            .map(NativeAst::Python)
            .map_err(Error::Parse)
    }

    fn to_meta(&self, native: &NativeAst) -> Result<(MetaNode, DocumentMetadata), Error> {
        let NativeAst::Python(ast) = native else {
            return Err(Error::UnsupportedConstruct {
                construct: format!("{} tree", native.language()),
                language: Language::Python,
            });
        };

        let metadata = DocumentMetadata {
            line_count: ast.line_count,
            comment_count: ast.comment_count,
            ..Default::default()
        };

        Ok((module_to_meta(ast), metadata))
    }

    fn from_meta(&self, node: &MetaNode) -> Result<NativeAst, Error> {
        Ok(NativeAst::Python(Ast {
            body: meta_to_stmts(node)?,
            ..Default::default()
        }))
    }

    fn unparse(&self, native: &NativeAst) -> Result<String, Error> {
        let NativeAst::Python(ast) = native else {
            return Err(Error::reify(format!(
                "python cannot print a {} tree",
                native.language()
            )));
        };

        Ok(printer::print(ast))
    }
}

/// Abstracts a module, unwrapping a single statement.
fn module_to_meta(ast: &Ast) -> MetaNode {
    let mut nodes: Vec<MetaNode> = ast.body.iter().map(stmt_to_meta).collect();
    if nodes.len() == 1 {
        nodes.remove(0)
    } else {
        MetaNode::block(nodes)
    }
}

/// Abstracts a suite, unwrapping a single statement.
fn block_of(stmts: &[Stmt]) -> MetaNode {
    let mut nodes: Vec<MetaNode> = stmts.iter().map(stmt_to_meta).collect();
    if nodes.len() == 1 {
        nodes.remove(0)
    } else {
        MetaNode::block(nodes)
    }
}

/// Abstracts one statement.
fn stmt_to_meta(stmt: &Stmt) -> MetaNode {
    let node = match &stmt.kind {
        StmtKind::Expr(expr) => expr_to_meta(expr),
        StmtKind::Assign { target, value } => {
            MetaNode::assignment(expr_to_meta(target), expr_to_meta(value))
        }
        StmtKind::If { test, body, orelse } => MetaNode::conditional(
            expr_to_meta(test),
            block_of(body),
            if orelse.is_empty() {
                None
            } else {
                Some(block_of(orelse))
            },
        ),
        StmtKind::While { test, body } => {
            MetaNode::while_loop(expr_to_meta(test), block_of(body))
        }
        StmtKind::For { target, iter, body } => {
            MetaNode::for_each(expr_to_meta(target), expr_to_meta(iter), block_of(body))
        }
        StmtKind::Return(value) => MetaNode::early_return(value.as_ref().map(expr_to_meta)),
        StmtKind::Try {
            body,
            handlers,
            orelse,
        } => MetaNode::ExceptionHandling {
            meta: Default::default(),
            body: Box::new(block_of(body)),
            catches: handlers
                .iter()
                .map(|handler| CatchClause {
                    pattern: handler.kind.as_ref().map(expr_to_meta),
                    body: block_of(&handler.body),
                })
                .collect(),
            else_body: if orelse.is_empty() {
                None
            } else {
                Some(Box::new(block_of(orelse)))
            },
        },
        StmtKind::Match { subject, cases } => MetaNode::pattern_match(
            expr_to_meta(subject),
            cases
                .iter()
                .map(|case| MatchArm {
                    pattern: expr_to_meta(&case.pattern),
                    guard: case.guard.as_ref().map(expr_to_meta),
                    body: block_of(&case.body),
                })
                .collect(),
        ),
        StmtKind::Raw(text) => {
            let hint = text.split_whitespace().next().map(str::to_string);
            return MetaNode::language_specific(Language::Python, text.as_str(), hint)
                .with_metadata(
                    metastatic_ast::Metadata::at_line(stmt.line).with_original_source(text),
                );
        }
    };

    node.at_line(stmt.line)
}

/// Abstracts one expression.
fn expr_to_meta(expr: &Expr) -> MetaNode {
    match expr {
        Expr::Int(value) => MetaNode::integer(*value),
        Expr::Float(value) => MetaNode::float(*value),
        Expr::Str(value) => MetaNode::string(value.clone()),
        Expr::Bool(value) => MetaNode::boolean(*value),
        Expr::None => MetaNode::null(),
        Expr::Name(name) => MetaNode::variable(name.clone()),
        Expr::Wildcard => MetaNode::wildcard(),
        Expr::BinOp { op, left, right } => {
            MetaNode::arithmetic(op.clone(), expr_to_meta(left), expr_to_meta(right))
        }
        Expr::BoolOp { op, left, right } => {
            MetaNode::boolean_op(op.clone(), expr_to_meta(left), expr_to_meta(right))
        }
        Expr::Compare { op, left, right } => {
            MetaNode::comparison(op.clone(), expr_to_meta(left), expr_to_meta(right))
        }
        Expr::UnaryOp { op, operand } => {
            let category = if op == "not" {
                UnaryCategory::Boolean
            } else {
                UnaryCategory::Arithmetic
            };
            MetaNode::unary(category, op.clone(), expr_to_meta(operand))
        }
        Expr::Call { func, args } => call_to_meta(func, args),
        Expr::Lambda { params, body } => MetaNode::lambda(
            params.iter().map(MetaNode::variable).collect(),
            expr_to_meta(body),
        ),
        Expr::IfExp { test, body, orelse } => MetaNode::conditional(
            expr_to_meta(test),
            expr_to_meta(body),
            Some(expr_to_meta(orelse)),
        ),
        Expr::List(items) => MetaNode::List {
            meta: Default::default(),
            items: items.iter().map(expr_to_meta).collect(),
        },
        Expr::Tuple(items) => MetaNode::Tuple {
            meta: Default::default(),
            items: items.iter().map(expr_to_meta).collect(),
        },
        Expr::Dict(entries) => MetaNode::MapLiteral {
            meta: Default::default(),
            entries: entries
                .iter()
                .map(|(key, value)| (expr_to_meta(key), expr_to_meta(value)))
                .collect(),
        },
        Expr::Await(operand) => MetaNode::AsyncOperation {
            meta: Default::default(),
            kind: metastatic_ast::AsyncKind::Await,
            body: Box::new(expr_to_meta(operand)),
        },
    }
}

/// Abstracts a call, recognizing the built-in collection operations.
fn call_to_meta(func: &str, args: &[Expr]) -> MetaNode {
    let collection = match func {
        "map" => Some(CollectionKind::Map),
        "filter" => Some(CollectionKind::Filter),
        "reduce" | "functools.reduce" => Some(CollectionKind::Reduce),
        _ => None,
    };

    if let Some(kind) = collection {
        if args.len() == 2 || (kind == CollectionKind::Reduce && args.len() == 3) {
            return MetaNode::collection_op(
                kind,
                expr_to_meta(&args[0]),
                expr_to_meta(&args[1]),
                args.get(2).map(expr_to_meta),
            );
        }
    }

    MetaNode::call(func, args.iter().map(expr_to_meta).collect())
}

/// Reifies a node into a statement sequence.
fn meta_to_stmts(node: &MetaNode) -> Result<Vec<Stmt>, Error> {
    match node {
        MetaNode::Block { statements, .. } => {
            let mut stmts = Vec::with_capacity(statements.len());
            for statement in statements {
                stmts.extend(meta_to_stmts(statement)?);
            }
            Ok(stmts)
        }
        MetaNode::Assignment { target, value, .. } => Ok(vec![stmt(
            node,
            StmtKind::Assign {
                target: meta_to_expr(target)?,
                value: meta_to_expr(value)?,
            },
        )]),
        MetaNode::InlineMatch { pattern, value, .. } => Ok(vec![stmt(
            node,
            StmtKind::Assign {
                target: meta_to_expr(pattern)?,
                value: meta_to_expr(value)?,
            },
        )]),
        MetaNode::Conditional {
            condition,
            then_branch,
            else_branch,
            ..
        } => Ok(vec![stmt(
            node,
            StmtKind::If {
                test: meta_to_expr(condition)?,
                body: meta_to_stmts(then_branch)?,
                orelse: match else_branch {
                    Some(else_branch) => meta_to_stmts(else_branch)?,
                    None => Vec::new(),
                },
            },
        )]),
        MetaNode::Loop { form, .. } => meta_loop_to_stmts(node, form),
        MetaNode::PatternMatch {
            scrutinee, arms, ..
        } => {
            let mut cases = Vec::with_capacity(arms.len());
            for arm in arms {
                cases.push(MatchCase {
                    pattern: meta_to_expr(&arm.pattern)?,
                    guard: arm.guard.as_ref().map(meta_to_expr).transpose()?,
                    body: meta_to_stmts(&arm.body)?,
                });
            }

            Ok(vec![stmt(
                node,
                StmtKind::Match {
                    subject: meta_to_expr(scrutinee)?,
                    cases,
                },
            )])
        }
        MetaNode::ExceptionHandling {
            body,
            catches,
            else_body,
            ..
        } => {
            let mut handlers = Vec::with_capacity(catches.len());
            for clause in catches {
                handlers.push(ExceptHandler {
                    kind: clause.pattern.as_ref().map(meta_to_expr).transpose()?,
                    body: meta_to_stmts(&clause.body)?,
                });
            }

            Ok(vec![stmt(
                node,
                StmtKind::Try {
                    body: meta_to_stmts(body)?,
                    handlers,
                    orelse: match else_body {
                        Some(else_body) => meta_to_stmts(else_body)?,
                        None => Vec::new(),
                    },
                },
            )])
        }
        MetaNode::EarlyReturn { value, .. } => Ok(vec![stmt(
            node,
            StmtKind::Return(value.as_deref().map(meta_to_expr).transpose()?),
        )]),
        MetaNode::LanguageSpecific {
            language, native, ..
        } => {
            if *language != Language::Python {
                return Err(foreign_fragment_error(*language, Language::Python));
            }

            Ok(vec![stmt(node, StmtKind::Raw(native.as_str().to_string()))])
        }
        _ => Ok(vec![stmt(node, StmtKind::Expr(meta_to_expr(node)?))]),
    }
}

/// Reifies a loop node, desugaring three-part loops into `while`.
fn meta_loop_to_stmts(node: &MetaNode, form: &LoopForm) -> Result<Vec<Stmt>, Error> {
    match form {
        LoopForm::While { condition, body } => Ok(vec![stmt(
            node,
            StmtKind::While {
                test: meta_to_expr(condition)?,
                body: meta_to_stmts(body)?,
            },
        )]),
        LoopForm::ForEach {
            binding,
            iterable,
            body,
        } => Ok(vec![stmt(
            node,
            StmtKind::For {
                target: meta_to_expr(binding)?,
                iter: meta_to_expr(iterable)?,
                body: meta_to_stmts(body)?,
            },
        )]),
        LoopForm::For {
            init,
            condition,
            step,
            body,
        } => {
            let mut stmts = meta_to_stmts(init)?;
            let mut loop_body = meta_to_stmts(body)?;
            loop_body.extend(meta_to_stmts(step)?);
            stmts.push(stmt(
                node,
                StmtKind::While {
                    test: meta_to_expr(condition)?,
                    body: loop_body,
                },
            ));
            Ok(stmts)
        }
    }
}

/// Wraps a statement kind with the node's source line.
fn stmt(node: &MetaNode, kind: StmtKind) -> Stmt {
    Stmt {
        line: node.metadata().line(),
        kind,
    }
}

/// Reifies a node into an expression.
fn meta_to_expr(node: &MetaNode) -> Result<Expr, Error> {
    match node {
        MetaNode::Literal { value, .. } => Ok(match value {
            metastatic_ast::LiteralValue::Int(v) => Expr::Int(*v),
            metastatic_ast::LiteralValue::Float(v) => Expr::Float(*v),
            // Python has no symbols; both subtypes render as strings.
            metastatic_ast::LiteralValue::Str(v) => Expr::Str(v.clone()),
            metastatic_ast::LiteralValue::Bool(v) => Expr::Bool(*v),
            metastatic_ast::LiteralValue::Null => Expr::None,
        }),
        MetaNode::Variable { name, .. } => Ok(Expr::Name(name.clone())),
        MetaNode::Wildcard { .. } => Ok(Expr::Wildcard),
        MetaNode::BinaryOp {
            category,
            op,
            lhs,
            rhs,
            ..
        } => {
            let left = Box::new(meta_to_expr(lhs)?);
            let right = Box::new(meta_to_expr(rhs)?);
            Ok(match category {
                metastatic_ast::BinaryCategory::Boolean => Expr::BoolOp {
                    op: op.clone(),
                    left,
                    right,
                },
                metastatic_ast::BinaryCategory::Comparison => Expr::Compare {
                    op: op.clone(),
                    left,
                    right,
                },
                _ => Expr::BinOp {
                    op: op.clone(),
                    left,
                    right,
                },
            })
        }
        MetaNode::UnaryOp { op, operand, .. } => Ok(Expr::UnaryOp {
            op: op.clone(),
            operand: Box::new(meta_to_expr(operand)?),
        }),
        MetaNode::FunctionCall { name, args, .. } => Ok(Expr::Call {
            func: name.clone(),
            args: args.iter().map(meta_to_expr).collect::<Result<_, _>>()?,
        }),
        MetaNode::Conditional {
            condition,
            then_branch,
            else_branch,
            ..
        } => {
            let orelse = else_branch.as_deref().ok_or_else(|| {
                Error::reify("a conditional expression needs an else branch in python")
            })?;
            Ok(Expr::IfExp {
                test: Box::new(meta_to_expr(condition)?),
                body: Box::new(meta_to_expr(then_branch)?),
                orelse: Box::new(meta_to_expr(orelse)?),
            })
        }
        MetaNode::Lambda { params, body, .. } => {
            let mut names = Vec::with_capacity(params.len());
            for param in params {
                match param {
                    MetaNode::Variable { name, .. } => names.push(name.clone()),
                    _ => {
                        return Err(Error::reify(
                            "python lambdas only bind plain parameter names",
                        ));
                    }
                }
            }

            Ok(Expr::Lambda {
                params: names,
                body: Box::new(meta_to_expr(body)?),
            })
        }
        MetaNode::CollectionOp {
            kind,
            func,
            collection,
            init,
            ..
        } => {
            let func = meta_to_expr(func)?;
            let collection = meta_to_expr(collection)?;
            let (name, mut args) = match kind {
                CollectionKind::Map => ("map", vec![func, collection]),
                CollectionKind::Filter => ("filter", vec![func, collection]),
                CollectionKind::Reduce => ("functools.reduce", vec![func, collection]),
            };
            if let Some(init) = init {
                args.push(meta_to_expr(init)?);
            }

            Ok(Expr::Call {
                func: name.to_string(),
                args,
            })
        }
        MetaNode::AsyncOperation { kind, body, .. } => match kind {
            metastatic_ast::AsyncKind::Await => {
                Ok(Expr::Await(Box::new(meta_to_expr(body)?)))
            }
            other => Err(Error::reify(format!(
                "python has no expression rendering for `{other}` blocks"
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
            Ok(Expr::Dict(rendered))
        }
        other => Err(Error::reify(format!(
            "`{kind}` has no python expression rendering",
            kind = other.kind_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use metastatic_ast::LiteralKind;
    use pretty_assertions::assert_eq;

    use super::*;

    /// Quotes source through the adapter.
    fn quote(source: &str) -> MetaNode {
        let adapter = PythonAdapter;
        let native = adapter.parse(source).unwrap();
        adapter.to_meta(&native).unwrap().0
    }

    /// Unquotes a tree through the adapter.
    fn unquote(node: &MetaNode) -> String {
        let adapter = PythonAdapter;
        adapter.unparse(&adapter.from_meta(node).unwrap()).unwrap()
    }

    #[test]
    fn it_abstracts_arithmetic() {
        let node = quote("x + 5");
        assert!(node.structurally_equal(&MetaNode::arithmetic(
            "+",
            MetaNode::variable("x"),
            MetaNode::integer(5),
        )));
    }

    #[test]
    fn it_reifies_arithmetic() {
        let node = MetaNode::arithmetic("+", MetaNode::variable("x"), MetaNode::integer(5));
        assert_eq!(unquote(&node), "x + 5");
    }

    #[test]
    fn it_abstracts_collection_operations() {
        let node = quote("map(lambda v: v + 1, items)");
        match node {
            MetaNode::CollectionOp { kind, .. } => assert_eq!(kind, CollectionKind::Map),
            other => panic!("expected a collection op, got {other:?}"),
        }
    }

    #[test]
    fn unmodeled_statements_become_native_fragments() {
        let node = quote("import os\nx = 1");
        match &node {
            MetaNode::Block { statements, .. } => match &statements[0] {
                MetaNode::LanguageSpecific { language, hint, .. } => {
                    assert_eq!(*language, Language::Python);
                    assert_eq!(hint.as_deref(), Some("import"));
                }
                other => panic!("expected a native fragment, got {other:?}"),
            },
            other => panic!("expected a block, got {other:?}"),
        }
    }

    #[test]
    fn foreign_fragments_refuse_to_reify() {
        let node = MetaNode::language_specific(Language::Ruby, "puts 1", None);
        let err = PythonAdapter.from_meta(&node).unwrap_err();
        assert!(matches!(err, Error::Reify { .. }));
    }

    #[test]
    fn literals_keep_their_subtypes() {
        let node = quote("3.5");
        match node {
            MetaNode::Literal { subtype, .. } => assert_eq!(subtype, LiteralKind::Float),
            other => panic!("expected a literal, got {other:?}"),
        }
    }

    #[test]
    fn semantic_round_trip_holds_on_the_core_subset() {
        let sources = [
            "x + 5",
            "x = 1\ny = x * 2",
            "if a: x = 1\nelse: x = 2",
            "while x < 10:\n    x = x + 1",
            "for v in items:\n    total = total + v",
            "result = map(lambda v: v + 1, items)",
            "try:\n    risky()\nexcept ValueError:\n    handle()",
            "match v:\n    case 1:\n        a = 1\n    case _:\n        a = 2",
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
