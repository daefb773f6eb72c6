//! The Haskell adapter.
//!
//! Covers equations, application by juxtaposition, operators,
//! `if`/`then`/`else`, `case … of`, lambdas, `let … in`, and the
//! `map`/`filter`/`foldr` family. Imports, type signatures, `do` blocks,
//! and operator sections are kept verbatim. Expressions the MetaAST cannot
//! name (such as applying a parenthesized lambda) abstract into the native
//! escape hatch using their printed form.

pub mod ast;
mod lexer;
mod parser;
mod printer;

use metastatic_ast::AsyncKind;
use metastatic_ast::BinaryCategory;
use metastatic_ast::CollectionKind;
use metastatic_ast::DocumentMetadata;
use metastatic_ast::Error;
use metastatic_ast::Language;
use metastatic_ast::LiteralValue;
use metastatic_ast::Metadata;
use metastatic_ast::MetaNode;
use metastatic_ast::UnaryCategory;

pub use ast::Ast;

use ast::Alt;
use ast::Decl;
use ast::DeclKind;
use ast::Expr;

use crate::Adapter;
use crate::NativeAst;
use crate::foreign_fragment_error;

/// The metadata key marking an assignment that came from an equation with
/// parameters.
const EQUATION_KEY: &str = "haskell.equation";

/// The metadata key marking a block that came from a `let … in`.
const LET_KEY: &str = "haskell.let";

/// The bidirectional Haskell bridge.
#[derive(Debug, Clone, Copy, Default)]
pub struct HaskellAdapter;

impl Adapter for HaskellAdapter {
    fn language(&self) -> Language {
        Language::Haskell
    }

    fn parse(&self, source: &str) -> Result<NativeAst, Error> {
        parser::parse(source)
            .map(NativeAst::Haskell)
            .map_err(Error::Parse)
    }

    fn to_meta(&self, native: &NativeAst) -> Result<(MetaNode, DocumentMetadata), Error> {
        let NativeAst::Haskell(ast) = native else {
            return Err(Error::UnsupportedConstruct {
                construct: format!("{} tree", native.language()),
                language: Language::Haskell,
            });
        };

        let metadata = DocumentMetadata {
            line_count: ast.line_count,
            comment_count: ast.comment_count,
            ..Default::default()
        };

        let mut nodes: Vec<MetaNode> = ast.decls.iter().map(decl_to_meta).collect();
        let node = if nodes.len() == 1 {
            nodes.remove(0)
        } else {
            MetaNode::block(nodes)
        };

        Ok((node, metadata))
    }

    fn from_meta(&self, node: &MetaNode) -> Result<NativeAst, Error> {
        let decls = match node {
            MetaNode::Block { statements, .. }
                if node.metadata().get(LET_KEY).is_none() =>
            {
                statements
                    .iter()
                    .map(meta_to_decl)
                    .collect::<Result<Vec<_>, _>>()?
            }
            _ => vec![meta_to_decl(node)?],
        };

        Ok(NativeAst::Haskell(Ast {
            decls,
            ..Default::default()
        }))
    }

    fn unparse(&self, native: &NativeAst) -> Result<String, Error> {
        let NativeAst::Haskell(ast) = native else {
            return Err(Error::reify(format!(
                "haskell cannot print a {} tree",
                native.language()
            )));
        };

        Ok(printer::print(ast))
    }
}

/// Abstracts one declaration.
fn decl_to_meta(decl: &Decl) -> MetaNode {
    let node = match &decl.kind {
        DeclKind::Bind { name, params, body } => {
            if params.is_empty() {
                MetaNode::assignment(MetaNode::variable(name.clone()), expr_to_meta(body))
            } else {
                let lambda = MetaNode::lambda(
                    params.iter().map(MetaNode::variable).collect(),
                    expr_to_meta(body),
                );
                let mut node =
                    MetaNode::assignment(MetaNode::variable(name.clone()), lambda);
                node.metadata_mut().insert(EQUATION_KEY, true);
                node
            }
        }
        DeclKind::Expr(expr) => expr_to_meta(expr),
        DeclKind::Raw(text) => {
            let hint = text.split_whitespace().next().map(str::to_string);
            return MetaNode::language_specific(Language::Haskell, text.as_str(), hint)
                .with_metadata(
                    Metadata::at_line(decl.line).with_original_source(text),
                );
        }
    };

    node.at_line(decl.line)
}

/// Abstracts one expression.
fn expr_to_meta(expr: &Expr) -> MetaNode {
    match expr {
        Expr::Int(value) => MetaNode::integer(*value),
        Expr::Float(value) => MetaNode::float(*value),
        Expr::Str(value) => MetaNode::string(value.clone()),
        Expr::Bool(value) => MetaNode::boolean(*value),
        Expr::Var(name) => MetaNode::variable(name.clone()),
        Expr::Wildcard => MetaNode::wildcard(),
        Expr::App { func, args } => app_to_meta(func, args),
        Expr::BinOp { op, left, right } => {
            let lhs = expr_to_meta(left);
            let rhs = expr_to_meta(right);
            match op.as_str() {
                "/=" => MetaNode::comparison("!=", lhs, rhs),
                "==" | "<=" | ">=" | "<" | ">" => MetaNode::comparison(op, lhs, rhs),
                "&&" => MetaNode::boolean_op("and", lhs, rhs),
                "||" => MetaNode::boolean_op("or", lhs, rhs),
                _ => MetaNode::arithmetic(op, lhs, rhs),
            }
        }
        Expr::UnaryOp { op, operand } => {
            MetaNode::unary(UnaryCategory::Arithmetic, op.clone(), expr_to_meta(operand))
        }
        Expr::If {
            cond,
            then_value,
            else_value,
        } => MetaNode::conditional(
            expr_to_meta(cond),
            expr_to_meta(then_value),
            Some(expr_to_meta(else_value)),
        ),
        Expr::Case { scrutinee, alts } => MetaNode::pattern_match(
            expr_to_meta(scrutinee),
            alts.iter()
                .map(|Alt { pattern, body }| {
                    metastatic_ast::MatchArm::new(expr_to_meta(pattern), expr_to_meta(body))
                })
                .collect(),
        ),
        Expr::Lambda { params, body } => MetaNode::lambda(
            params.iter().map(MetaNode::variable).collect(),
            expr_to_meta(body),
        ),
        Expr::Let { name, value, body } => {
            let mut node = MetaNode::block(vec![
                MetaNode::assignment(MetaNode::variable(name.clone()), expr_to_meta(value)),
                expr_to_meta(body),
            ]);
            node.metadata_mut().insert(LET_KEY, true);
            node
        }
        Expr::List(items) => MetaNode::List {
            meta: Metadata::synthetic(),
            items: items.iter().map(expr_to_meta).collect(),
        },
        Expr::Tuple(items) => MetaNode::Tuple {
            meta: Metadata::synthetic(),
            items: items.iter().map(expr_to_meta).collect(),
        },
    }
}

/// Abstracts an application, recognizing the collection and concurrency
/// vocabulary.
fn app_to_meta(func: &Expr, args: &[Expr]) -> MetaNode {
    let Expr::Var(name) = func else {
        // Applying anything but a name has no MetaAST spelling; keep the
        // printed form.
        let rendered = printer::print(&Ast {
            decls: vec![Decl {
                line: 0,
                kind: DeclKind::Expr(Expr::App {
                    func: Box::new(func.clone()),
                    args: args.to_vec(),
                }),
            }],
            ..Default::default()
        });
        return MetaNode::language_specific(
            Language::Haskell,
            rendered.as_str(),
            Some("application".to_string()),
        );
    };

    match (name.as_str(), args.len()) {
        ("map", 2) => MetaNode::collection_op(
            CollectionKind::Map,
            expr_to_meta(&args[0]),
            expr_to_meta(&args[1]),
            None,
        ),
        ("filter", 2) => MetaNode::collection_op(
            CollectionKind::Filter,
            expr_to_meta(&args[0]),
            expr_to_meta(&args[1]),
            None,
        ),
        ("foldr" | "foldl", 3) => {
            let mut node = MetaNode::collection_op(
                CollectionKind::Reduce,
                expr_to_meta(&args[0]),
                expr_to_meta(&args[2]),
                Some(expr_to_meta(&args[1])),
            );
            node.metadata_mut().insert("haskell.fold", name.as_str());
            node
        }
        ("not", 1) => MetaNode::unary(
            UnaryCategory::Boolean,
            "not",
            expr_to_meta(&args[0]),
        ),
        ("forkIO", 1) => MetaNode::AsyncOperation {
            meta: Metadata::synthetic(),
            kind: AsyncKind::Spawn,
            body: Box::new(expr_to_meta(&args[0])),
        },
        _ => MetaNode::call(name.clone(), args.iter().map(expr_to_meta).collect()),
    }
}

/// Reifies one node into a declaration.
fn meta_to_decl(node: &MetaNode) -> Result<Decl, Error> {
    let line = node.metadata().line();
    let kind = match node {
        MetaNode::Assignment { target, value, .. } => {
            let MetaNode::Variable { name, .. } = &**target else {
                return Err(Error::reify(
                    "haskell equations only bind plain names",
                ));
            };

            match &**value {
                MetaNode::Lambda { params, body, .. }
                    if node.metadata().get(EQUATION_KEY).and_then(|v| v.as_bool())
                        == Some(true) =>
                {
                    let mut names = Vec::with_capacity(params.len());
                    for param in params {
                        match param {
                            MetaNode::Variable { name, .. } => names.push(name.clone()),
                            _ => {
                                return Err(Error::reify(
                                    "haskell equations only bind plain parameter names",
                                ));
                            }
                        }
                    }

                    DeclKind::Bind {
                        name: name.clone(),
                        params: names,
                        body: meta_to_expr(body)?,
                    }
                }
                _ => DeclKind::Bind {
                    name: name.clone(),
                    params: Vec::new(),
                    body: meta_to_expr(value)?,
                },
            }
        }
        MetaNode::LanguageSpecific {
            language, native, ..
        } => {
            if *language != Language::Haskell {
                return Err(foreign_fragment_error(*language, Language::Haskell));
            }

            DeclKind::Raw(native.as_str().to_string())
        }
        _ => DeclKind::Expr(meta_to_expr(node)?),
    };

    Ok(Decl { line, kind })
}

/// Reifies one node into an expression.
fn meta_to_expr(node: &MetaNode) -> Result<Expr, Error> {
    match node {
        MetaNode::Literal { value, .. } => Ok(match value {
            LiteralValue::Int(v) => Expr::Int(*v),
            LiteralValue::Float(v) => Expr::Float(*v),
            // Symbols and strings both render as strings.
            LiteralValue::Str(v) => Expr::Str(v.clone()),
            LiteralValue::Bool(v) => Expr::Bool(*v),
            LiteralValue::Null => Expr::Var("Nothing".to_string()),
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
            let spelled = match (category, op.as_str()) {
                (BinaryCategory::Comparison, "!=") => "/=".to_string(),
                (BinaryCategory::Boolean, "and") => "&&".to_string(),
                (BinaryCategory::Boolean, "or") => "||".to_string(),
                (_, "%" | "//") => {
                    return Err(Error::reify(
                        "haskell integer division is not in the modeled subset",
                    ));
                }
                _ => op.clone(),
            };

            Ok(Expr::BinOp {
                op: spelled,
                left: Box::new(meta_to_expr(lhs)?),
                right: Box::new(meta_to_expr(rhs)?),
            })
        }
        MetaNode::UnaryOp {
            category,
            op,
            operand,
            ..
        } => {
            if *category == UnaryCategory::Boolean || op == "not" {
                return Ok(Expr::App {
                    func: Box::new(Expr::Var("not".to_string())),
                    args: vec![meta_to_expr(operand)?],
                });
            }

            Ok(Expr::UnaryOp {
                op: op.clone(),
                operand: Box::new(meta_to_expr(operand)?),
            })
        }
        MetaNode::FunctionCall { name, args, .. } => {
            if args.is_empty() {
                return Ok(Expr::Var(name.clone()));
            }

            Ok(Expr::App {
                func: Box::new(Expr::Var(name.clone())),
                args: args.iter().map(meta_to_expr).collect::<Result<_, _>>()?,
            })
        }
        MetaNode::Conditional {
            condition,
            then_branch,
            else_branch,
            ..
        } => {
            let else_value = else_branch.as_deref().ok_or_else(|| {
                Error::reify("haskell conditionals always need an else branch")
            })?;

            Ok(Expr::If {
                cond: Box::new(meta_to_expr(condition)?),
                then_value: Box::new(meta_to_expr(then_branch)?),
                else_value: Box::new(meta_to_expr(else_value)?),
            })
        }
        MetaNode::Block { statements, .. }
            if node.metadata().get(LET_KEY).and_then(|v| v.as_bool()) == Some(true) =>
        {
            let [binding, body] = statements.as_slice() else {
                return Err(Error::reify("a let block holds a binding and a body"));
            };
            let MetaNode::Assignment { target, value, .. } = binding else {
                return Err(Error::reify("a let block starts with a binding"));
            };
            let MetaNode::Variable { name, .. } = &**target else {
                return Err(Error::reify("haskell lets only bind plain names"));
            };

            Ok(Expr::Let {
                name: name.clone(),
                value: Box::new(meta_to_expr(value)?),
                body: Box::new(meta_to_expr(body)?),
            })
        }
        MetaNode::PatternMatch {
            scrutinee, arms, ..
        } => {
            let mut alts = Vec::with_capacity(arms.len());
            for arm in arms {
                if arm.guard.is_some() {
                    return Err(Error::reify(
                        "guarded case alternatives are not in the modeled subset",
                    ));
                }

                alts.push(Alt {
                    pattern: meta_to_expr(&arm.pattern)?,
                    body: meta_to_expr(&arm.body)?,
                });
            }

            Ok(Expr::Case {
                scrutinee: Box::new(meta_to_expr(scrutinee)?),
                alts,
            })
        }
        MetaNode::Lambda { params, body, .. } => {
            let mut names = Vec::with_capacity(params.len());
            for param in params {
                match param {
                    MetaNode::Variable { name, .. } => names.push(name.clone()),
                    _ => {
                        return Err(Error::reify(
                            "haskell lambdas only bind plain parameter names",
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
            let (name, args) = match (kind, init) {
                (CollectionKind::Map, _) => ("map", vec![func, collection]),
                (CollectionKind::Filter, _) => ("filter", vec![func, collection]),
                (CollectionKind::Reduce, Some(init)) => {
                    let fold = node
                        .metadata()
                        .get("haskell.fold")
                        .and_then(|v| v.as_str())
                        .unwrap_or("foldr");
                    return Ok(Expr::App {
                        func: Box::new(Expr::Var(fold.to_string())),
                        args: vec![func, meta_to_expr(init)?, collection],
                    });
                }
                (CollectionKind::Reduce, None) => {
                    return Err(Error::reify(
                        "haskell folds need an initial accumulator",
                    ));
                }
            };

            Ok(Expr::App {
                func: Box::new(Expr::Var(name.to_string())),
                args,
            })
        }
        MetaNode::AsyncOperation { kind, body, .. } => match kind {
            AsyncKind::Spawn => Ok(Expr::App {
                func: Box::new(Expr::Var("forkIO".to_string())),
                args: vec![meta_to_expr(body)?],
            }),
            other => Err(Error::reify(format!(
                "haskell has no rendering for `{other}` operations"
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
            let mut pairs = Vec::with_capacity(entries.len());
            for (key, value) in entries {
                pairs.push(Expr::Tuple(vec![
                    meta_to_expr(key)?,
                    meta_to_expr(value)?,
                ]));
            }

            Ok(Expr::App {
                func: Box::new(Expr::Var("Data.Map.fromList".to_string())),
                args: vec![Expr::List(pairs)],
            })
        }
        MetaNode::LanguageSpecific {
            language, native, ..
        } => {
            if *language != Language::Haskell {
                return Err(foreign_fragment_error(*language, Language::Haskell));
            }

            Ok(Expr::Var(native.as_str().to_string()))
        }
        other => Err(Error::reify(format!(
            "`{kind}` has no haskell expression rendering",
            kind = other.kind_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    /// Quotes source through the adapter.
    fn quote(source: &str) -> MetaNode {
        let adapter = HaskellAdapter;
        let native = adapter.parse(source).unwrap();
        adapter.to_meta(&native).unwrap().0
    }

    /// Unquotes a tree through the adapter.
    fn unquote(node: &MetaNode) -> String {
        let adapter = HaskellAdapter;
        adapter.unparse(&adapter.from_meta(node).unwrap()).unwrap()
    }

    #[test]
    fn arithmetic_abstracts_like_the_other_languages() {
        let node = quote("x + 5");
        assert!(node.structurally_equal(&MetaNode::arithmetic(
            "+",
            MetaNode::variable("x"),
            MetaNode::integer(5),
        )));
    }

    #[test]
    fn equations_become_lambda_assignments() {
        let node = quote("double x = x * 2");
        match &node {
            MetaNode::Assignment { value, .. } => {
                assert!(matches!(&**value, MetaNode::Lambda { .. }));
            }
            other => panic!("expected an assignment, got {other:?}"),
        }

        assert_eq!(unquote(&node), "double x = x * 2");
    }

    #[test]
    fn folds_become_collection_ops() {
        let node = quote("total = foldl add 0 items");
        match &node {
            MetaNode::Assignment { value, .. } => match &**value {
                MetaNode::CollectionOp { kind, init, .. } => {
                    assert_eq!(*kind, CollectionKind::Reduce);
                    assert!(init.is_some());
                }
                other => panic!("expected a collection op, got {other:?}"),
            },
            other => panic!("expected an assignment, got {other:?}"),
        }

        // The original fold direction survives through metadata.
        assert_eq!(unquote(&node), "total = foldl add 0 items");
    }

    #[test]
    fn semantic_round_trip_holds_on_the_core_subset() {
        let sources = [
            "x + 5",
            "double x = x * 2",
            "sign x = if x > 0 then 1 else -1",
            "describe v = case v of\n    1 -> \"one\"\n    _ -> \"other\"",
            "add = \\a b -> a + b",
            "area r = let squared = r * r in pi * squared",
            "evens = filter isEven numbers",
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
