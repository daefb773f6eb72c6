//! The Ruby adapter.
//!
//! Covers assignments, operators, method calls with blocks, `if`/`elsif`,
//! `while`, `case`/`when`, `begin`/`rescue`, lambdas, and the
//! `map`/`select`/`reduce` enumerable family. Definitions, modules, and
//! operator-assignment forms are kept verbatim and abstract into the native
//! escape hatch. Method calls keep their receiver chain as a dotted name
//! when the chain is plain; otherwise the receiver travels as a marked
//! first argument.

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

use ast::Block;
use ast::Expr;
use ast::Rescue;
use ast::Stmt;
use ast::StmtKind;
use ast::When;

use crate::Adapter;
use crate::NativeAst;
use crate::foreign_fragment_error;

/// The metadata key recording an operator's original spelling.
const SPELLING_KEY: &str = "ruby.op";

/// The metadata key marking a call whose first argument is its receiver.
const RECEIVER_KEY: &str = "ruby.receiver_arg";

/// The metadata key marking a call whose last argument was a block.
const BLOCK_KEY: &str = "ruby.block";

/// The bidirectional Ruby bridge.
#[derive(Debug, Clone, Copy, Default)]
pub struct RubyAdapter;

impl Adapter for RubyAdapter {
    fn language(&self) -> Language {
        Language::Ruby
    }

    fn parse(&self, source: &str) -> Result<NativeAst, Error> {
        parser::parse(source)
            .map(NativeAst::Ruby)
            .map_err(Error::Parse)
    }

    fn to_meta(&self, native: &NativeAst) -> Result<(MetaNode, DocumentMetadata), Error> {
        let NativeAst::Ruby(ast) = native else {
            return Err(Error::UnsupportedConstruct {
                construct: format!("{} tree", native.language()),
                language: Language::Ruby,
            });
        };

        let metadata = DocumentMetadata {
            line_count: ast.line_count,
            comment_count: ast.comment_count,
            ..Default::default()
        };

        let mut nodes: Vec<MetaNode> = ast.body.iter().map(stmt_to_meta).collect();
        let node = if nodes.len() == 1 {
            nodes.remove(0)
        } else {
            MetaNode::block(nodes)
        };

        Ok((node, metadata))
    }

    fn from_meta(&self, node: &MetaNode) -> Result<NativeAst, Error> {
        Ok(NativeAst::Ruby(Ast {
            body: meta_to_stmts(node)?,
            ..Default::default()
        }))
    }

    fn unparse(&self, native: &NativeAst) -> Result<String, Error> {
        let NativeAst::Ruby(ast) = native else {
            return Err(Error::reify(format!(
                "ruby cannot print a {} tree",
                native.language()
            )));
        };

        Ok(printer::print(ast))
    }
}

/// Abstracts a statement body, unwrapping a single statement.
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
        StmtKind::If {
            cond,
            then_body,
            elsifs,
            else_body,
        } => {
            let mut else_branch = if else_body.is_empty() {
                None
            } else {
                Some(block_of(else_body))
            };

            for (elsif_cond, elsif_body) in elsifs.iter().rev() {
                else_branch = Some(MetaNode::conditional(
                    expr_to_meta(elsif_cond),
                    block_of(elsif_body),
                    else_branch,
                ));
            }

            MetaNode::conditional(expr_to_meta(cond), block_of(then_body), else_branch)
        }
        StmtKind::While { cond, body } => {
            MetaNode::while_loop(expr_to_meta(cond), block_of(body))
        }
        StmtKind::Case {
            subject,
            whens,
            else_body,
        } => {
            let mut arms: Vec<MatchArm> = whens.iter().map(when_to_arm).collect();
            if !else_body.is_empty() {
                arms.push(MatchArm::new(MetaNode::wildcard(), block_of(else_body)));
            }

            MetaNode::pattern_match(expr_to_meta(subject), arms)
        }
        StmtKind::Begin {
            body,
            rescues,
            else_body,
        } => MetaNode::ExceptionHandling {
            meta: Metadata::synthetic(),
            body: Box::new(block_of(body)),
            catches: rescues
                .iter()
                .map(|rescue| CatchClause {
                    pattern: rescue.class.as_ref().map(expr_to_meta),
                    body: block_of(&rescue.body),
                })
                .collect(),
            else_body: if else_body.is_empty() {
                None
            } else {
                Some(Box::new(block_of(else_body)))
            },
        },
        StmtKind::Return(value) => MetaNode::early_return(value.as_ref().map(expr_to_meta)),
        StmtKind::Raw(text) => {
            let hint = text.split_whitespace().next().map(str::to_string);
            return MetaNode::language_specific(Language::Ruby, text.as_str(), hint)
                .with_metadata(
                    Metadata::at_line(stmt.line).with_original_source(text),
                );
        }
    };

    node.at_line(stmt.line)
}

/// Abstracts one `when` branch into a match arm.
fn when_to_arm(when: &When) -> MatchArm {
    let pattern = if when.values.len() == 1 {
        expr_to_meta(&when.values[0])
    } else {
        MetaNode::List {
            meta: Metadata::synthetic(),
            items: when.values.iter().map(expr_to_meta).collect(),
        }
    };

    MatchArm::new(pattern, block_of(&when.body))
}

/// Renders a plain receiver chain as a dotted path, when possible.
fn receiver_path(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Var(name) => Some(name.clone()),
        Expr::Ivar(name) => Some(name.clone()),
        Expr::MethodCall {
            recv: Some(recv),
            name,
            args,
            block: None,
        } if args.is_empty() => Some(format!(
            "{path}.{name}",
            path = receiver_path(recv)?
        )),
        _ => None,
    }
}

/// Abstracts a block into a lambda node.
fn block_to_lambda(block: &Block) -> MetaNode {
    MetaNode::lambda(
        block.params.iter().map(MetaNode::variable).collect(),
        block_of(&block.body),
    )
}

/// Abstracts one expression.
fn expr_to_meta(expr: &Expr) -> MetaNode {
    match expr {
        Expr::Int(value) => MetaNode::integer(*value),
        Expr::Float(value) => MetaNode::float(*value),
        Expr::Str(value) => MetaNode::string(value.clone()),
        Expr::Sym(name) => MetaNode::symbol(name.clone()),
        Expr::Bool(value) => MetaNode::boolean(*value),
        Expr::Nil => MetaNode::null(),
        Expr::Var(name) => MetaNode::variable(name.clone()),
        Expr::Ivar(name) => MetaNode::variable(name.clone()),
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
        Expr::MethodCall {
            recv,
            name,
            args,
            block,
        } => method_call_to_meta(recv.as_deref(), name, args, block.as_ref()),
        Expr::Lambda { params, body } => MetaNode::lambda(
            params.iter().map(MetaNode::variable).collect(),
            block_of(body),
        ),
        Expr::Ternary {
            cond,
            then_value,
            else_value,
        } => MetaNode::conditional(
            expr_to_meta(cond),
            expr_to_meta(then_value),
            Some(expr_to_meta(else_value)),
        ),
        Expr::Array(items) => MetaNode::List {
            meta: Metadata::synthetic(),
            items: items.iter().map(expr_to_meta).collect(),
        },
        Expr::Hash(entries) => MetaNode::MapLiteral {
            meta: Metadata::synthetic(),
            entries: entries
                .iter()
                .map(|(key, value)| (expr_to_meta(key), expr_to_meta(value)))
                .collect(),
        },
    }
}

/// Abstracts a binary operator, normalizing the boolean family.
fn bin_op_to_meta(op: &str, lhs: MetaNode, rhs: MetaNode) -> MetaNode {
    match op {
        "==" | "!=" | "<=" | ">=" | "<" | ">" => MetaNode::comparison(op, lhs, rhs),
        "and" | "&&" | "or" | "||" => {
            let normalized = if op == "and" || op == "&&" { "and" } else { "or" };
            let mut node = MetaNode::boolean_op(normalized, lhs, rhs);
            node.metadata_mut().insert(SPELLING_KEY, op);
            node
        }
        _ => MetaNode::arithmetic(op, lhs, rhs),
    }
}

/// Abstracts a method call, recognizing the enumerable family and blocks.
fn method_call_to_meta(
    recv: Option<&Expr>,
    name: &str,
    args: &[Expr],
    block: Option<&Block>,
) -> MetaNode {
    if let (Some(recv), Some(block)) = (recv, block) {
        match (name, block.params.len()) {
            ("each", 1) => {
                return MetaNode::for_each(
                    MetaNode::variable(block.params[0].clone()),
                    expr_to_meta(recv),
                    block_of(&block.body),
                );
            }
            ("map" | "collect", _) => {
                return MetaNode::collection_op(
                    CollectionKind::Map,
                    block_to_lambda(block),
                    expr_to_meta(recv),
                    None,
                );
            }
            ("select" | "filter", _) => {
                return MetaNode::collection_op(
                    CollectionKind::Filter,
                    block_to_lambda(block),
                    expr_to_meta(recv),
                    None,
                );
            }
            ("reduce" | "inject", _) => {
                return MetaNode::collection_op(
                    CollectionKind::Reduce,
                    block_to_lambda(block),
                    expr_to_meta(recv),
                    args.first().map(expr_to_meta),
                );
            }
            _ => {}
        }
    }

    // `Thread.new { … }` is the spawn primitive.
    if name == "new" {
        if let (Some(Expr::Var(receiver)), Some(block)) = (recv, block) {
            if receiver == "Thread" {
                return MetaNode::AsyncOperation {
                    meta: Metadata::synthetic(),
                    kind: AsyncKind::Spawn,
                    body: Box::new(block_to_lambda(block)),
                };
            }
        }
    }

    let mut meta_args: Vec<MetaNode> = Vec::new();
    let mut metadata = Metadata::synthetic();

    let dotted = match recv {
        None => name.to_string(),
        Some(recv) => match receiver_path(recv) {
            Some(path) => format!("{path}.{name}"),
            None => {
                // Complex receivers travel as a marked first argument.
                metadata.insert(RECEIVER_KEY, true);
                meta_args.push(expr_to_meta(recv));
                name.to_string()
            }
        },
    };

    meta_args.extend(args.iter().map(expr_to_meta));
    if let Some(block) = block {
        metadata.insert(BLOCK_KEY, true);
        meta_args.push(block_to_lambda(block));
    }

    MetaNode::call(dotted, meta_args).with_metadata(metadata)
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
        MetaNode::Conditional {
            condition,
            then_branch,
            else_branch,
            ..
        } => Ok(vec![stmt(
            node,
            StmtKind::If {
                cond: meta_to_expr(condition)?,
                then_body: meta_to_stmts(then_branch)?,
                elsifs: Vec::new(),
                else_body: match else_branch {
                    Some(else_branch) => meta_to_stmts(else_branch)?,
                    None => Vec::new(),
                },
            },
        )]),
        MetaNode::Loop { form, .. } => meta_loop_to_stmts(node, form),
        MetaNode::PatternMatch {
            scrutinee, arms, ..
        } => {
            let mut whens = Vec::new();
            let mut else_body = Vec::new();
            for arm in arms {
                if arm.guard.is_some() {
                    return Err(Error::reify(
                        "ruby case/when arms cannot carry guards",
                    ));
                }

                match &arm.pattern {
                    MetaNode::Wildcard { .. } => else_body = meta_to_stmts(&arm.body)?,
                    MetaNode::List { items, .. } => whens.push(When {
                        values: items
                            .iter()
                            .map(meta_to_expr)
                            .collect::<Result<_, _>>()?,
                        body: meta_to_stmts(&arm.body)?,
                    }),
                    pattern => whens.push(When {
                        values: vec![meta_to_expr(pattern)?],
                        body: meta_to_stmts(&arm.body)?,
                    }),
                }
            }

            Ok(vec![stmt(
                node,
                StmtKind::Case {
                    subject: meta_to_expr(scrutinee)?,
                    whens,
                    else_body,
                },
            )])
        }
        MetaNode::ExceptionHandling {
            body,
            catches,
            else_body,
            ..
        } => {
            let mut rescues = Vec::with_capacity(catches.len());
            for clause in catches {
                rescues.push(Rescue {
                    class: clause.pattern.as_ref().map(meta_to_expr).transpose()?,
                    body: meta_to_stmts(&clause.body)?,
                });
            }

            Ok(vec![stmt(
                node,
                StmtKind::Begin {
                    body: meta_to_stmts(body)?,
                    rescues,
                    else_body: match else_body {
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
        MetaNode::InlineMatch { .. } => Err(Error::reify(
            "ruby has no pattern-matched binding in the modeled subset",
        )),
        MetaNode::LanguageSpecific {
            language, native, ..
        } => {
            if *language != Language::Ruby {
                return Err(foreign_fragment_error(*language, Language::Ruby));
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
                cond: meta_to_expr(condition)?,
                body: meta_to_stmts(body)?,
            },
        )]),
        LoopForm::ForEach {
            binding,
            iterable,
            body,
        } => {
            let param = match &**binding {
                MetaNode::Variable { name, .. } => name.clone(),
                _ => {
                    return Err(Error::reify(
                        "ruby each blocks only bind plain parameter names",
                    ));
                }
            };

            Ok(vec![stmt(
                node,
                StmtKind::Expr(Expr::MethodCall {
                    recv: Some(Box::new(meta_to_expr(iterable)?)),
                    name: "each".to_string(),
                    args: Vec::new(),
                    block: Some(Block {
                        params: vec![param],
                        body: meta_to_stmts(body)?,
                    }),
                }),
            )])
        }
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
                    cond: meta_to_expr(condition)?,
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

/// Reifies a lambda node into a block.
fn lambda_to_block(node: &MetaNode) -> Result<Block, Error> {
    let MetaNode::Lambda { params, body, .. } = node else {
        return Err(Error::reify("a ruby block needs a lambda body"));
    };

    let mut names = Vec::with_capacity(params.len());
    for param in params {
        match param {
            MetaNode::Variable { name, .. } => names.push(name.clone()),
            _ => {
                return Err(Error::reify(
                    "ruby blocks only bind plain parameter names",
                ));
            }
        }
    }

    Ok(Block {
        params: names,
        body: meta_to_stmts(body)?,
    })
}

/// Reifies one node into an expression.
fn meta_to_expr(node: &MetaNode) -> Result<Expr, Error> {
    match node {
        MetaNode::Literal { value, subtype, .. } => Ok(match (subtype, value) {
            (metastatic_ast::LiteralKind::Symbol, LiteralValue::Str(name)) => {
                Expr::Sym(name.clone())
            }
            (_, LiteralValue::Int(v)) => Expr::Int(*v),
            (_, LiteralValue::Float(v)) => Expr::Float(*v),
            (_, LiteralValue::Str(v)) => Expr::Str(v.clone()),
            (_, LiteralValue::Bool(v)) => Expr::Bool(*v),
            (_, LiteralValue::Null) => Expr::Nil,
        }),
        MetaNode::Variable { name, .. } => {
            if name.starts_with('@') {
                Ok(Expr::Ivar(name.clone()))
            } else {
                Ok(Expr::Var(name.clone()))
            }
        }
        MetaNode::Wildcard { .. } => Err(Error::reify(
            "ruby has no wildcard pattern outside case/else",
        )),
        MetaNode::BinaryOp {
            category,
            op,
            lhs,
            rhs,
            ..
        } => {
            let spelled = match category {
                BinaryCategory::Boolean => node
                    .metadata()
                    .get(SPELLING_KEY)
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| {
                        if op == "and" { "&&" } else { "||" }.to_string()
                    }),
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
        MetaNode::FunctionCall { name, args, .. } => {
            let mut args = args.iter().collect::<Vec<_>>();

            let block = if node.metadata().get(BLOCK_KEY).and_then(|v| v.as_bool())
                == Some(true)
            {
                let lambda = args
                    .pop()
                    .ok_or_else(|| Error::reify("a block-marked call lost its block"))?;
                Some(lambda_to_block(lambda)?)
            } else {
                None
            };

            let explicit_recv = if node
                .metadata()
                .get(RECEIVER_KEY)
                .and_then(|v| v.as_bool())
                == Some(true)
            {
                if args.is_empty() {
                    return Err(Error::reify("a receiver-marked call lost its receiver"));
                }
                Some(Box::new(meta_to_expr(args.remove(0))?))
            } else {
                None
            };

            let args = args
                .into_iter()
                .map(meta_to_expr)
                .collect::<Result<Vec<_>, _>>()?;

            if let Some(recv) = explicit_recv {
                return Ok(Expr::MethodCall {
                    recv: Some(recv),
                    name: name.clone(),
                    args,
                    block,
                });
            }

            Ok(match name.rsplit_once('.') {
                Some((path, method)) => Expr::MethodCall {
                    recv: Some(Box::new(path_to_expr(path))),
                    name: method.to_string(),
                    args,
                    block,
                },
                None => Expr::MethodCall {
                    recv: None,
                    name: name.clone(),
                    args,
                    block,
                },
            })
        }
        MetaNode::Conditional {
            condition,
            then_branch,
            else_branch,
            ..
        } => {
            let else_value = else_branch.as_deref().ok_or_else(|| {
                Error::reify("a ternary needs an else branch in ruby")
            })?;
            Ok(Expr::Ternary {
                cond: Box::new(meta_to_expr(condition)?),
                then_value: Box::new(meta_to_expr(then_branch)?),
                else_value: Box::new(meta_to_expr(else_value)?),
            })
        }
        MetaNode::Lambda { .. } => {
            let block = lambda_to_block(node)?;
            Ok(Expr::Lambda {
                params: block.params,
                body: block.body,
            })
        }
        MetaNode::CollectionOp {
            kind,
            func,
            collection,
            init,
            ..
        } => {
            let recv = Some(Box::new(meta_to_expr(collection)?));
            let block = match &**func {
                MetaNode::Lambda { .. } => lambda_to_block(func)?,
                // A named function becomes a block that applies it.
                MetaNode::Variable { name, .. } => Block {
                    params: vec!["v".to_string()],
                    body: vec![Stmt::synthetic(StmtKind::Expr(Expr::MethodCall {
                        recv: None,
                        name: name.clone(),
                        args: vec![Expr::Var("v".to_string())],
                        block: None,
                    }))],
                },
                _ => {
                    return Err(Error::reify(
                        "ruby collection blocks need a lambda or named function",
                    ));
                }
            };

            let (name, args) = match kind {
                CollectionKind::Map => ("map", Vec::new()),
                CollectionKind::Filter => ("select", Vec::new()),
                CollectionKind::Reduce => (
                    "reduce",
                    match init {
                        Some(init) => vec![meta_to_expr(init)?],
                        None => Vec::new(),
                    },
                ),
            };

            Ok(Expr::MethodCall {
                recv,
                name: name.to_string(),
                args,
                block: Some(block),
            })
        }
        MetaNode::AsyncOperation { kind, body, .. } => match kind {
            AsyncKind::Spawn => Ok(Expr::MethodCall {
                recv: Some(Box::new(Expr::Var("Thread".to_string()))),
                name: "new".to_string(),
                args: Vec::new(),
                block: Some(lambda_to_block(body)?),
            }),
            other => Err(Error::reify(format!(
                "ruby has no rendering for `{other}` operations"
            ))),
        },
        MetaNode::List { items, .. } | MetaNode::Tuple { items, .. } => Ok(Expr::Array(
            items.iter().map(meta_to_expr).collect::<Result<_, _>>()?,
        )),
        MetaNode::Pair { first, second, .. } => Ok(Expr::Array(vec![
            meta_to_expr(first)?,
            meta_to_expr(second)?,
        ])),
        MetaNode::MapLiteral { entries, .. } => {
            let mut rendered = Vec::with_capacity(entries.len());
            for (key, value) in entries {
                rendered.push((meta_to_expr(key)?, meta_to_expr(value)?));
            }
            Ok(Expr::Hash(rendered))
        }
        other => Err(Error::reify(format!(
            "`{kind}` has no ruby expression rendering",
            kind = other.kind_name()
        ))),
    }
}

/// Rebuilds a dotted receiver path as a call chain.
fn path_to_expr(path: &str) -> Expr {
    let mut segments = path.split('.');
    let first = segments.next().expect("split yields at least one segment");
    let mut expr = if first.starts_with('@') {
        Expr::Ivar(first.to_string())
    } else {
        Expr::Var(first.to_string())
    };

    for segment in segments {
        expr = Expr::MethodCall {
            recv: Some(Box::new(expr)),
            name: segment.to_string(),
            args: Vec::new(),
            block: None,
        };
    }

    expr
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    /// Quotes source through the adapter.
    fn quote(source: &str) -> MetaNode {
        let adapter = RubyAdapter;
        let native = adapter.parse(source).unwrap();
        adapter.to_meta(&native).unwrap().0
    }

    /// Unquotes a tree through the adapter.
    fn unquote(node: &MetaNode) -> String {
        let adapter = RubyAdapter;
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
    fn each_blocks_become_iterator_loops() {
        let node = quote("items.each do |v|\n  puts v\nend");
        assert!(matches!(node, MetaNode::Loop { .. }));
    }

    #[test]
    fn enumerable_blocks_become_collection_ops() {
        let node = quote("items.reduce(0) { |acc, v| acc + v }");
        match &node {
            MetaNode::CollectionOp { kind, init, .. } => {
                assert_eq!(*kind, CollectionKind::Reduce);
                assert!(init.is_some());
            }
            other => panic!("expected a collection op, got {other:?}"),
        }
    }

    #[test]
    fn instance_variables_stay_named() {
        let node = quote("@count = 1");
        match &node {
            MetaNode::Assignment { target, .. } => match &**target {
                MetaNode::Variable { name, .. } => assert_eq!(name, "@count"),
                other => panic!("expected a variable, got {other:?}"),
            },
            other => panic!("expected an assignment, got {other:?}"),
        }
    }

    #[test]
    fn semantic_round_trip_holds_on_the_core_subset() {
        let sources = [
            "x + 5",
            "x = y * 2",
            "puts \"hi\"",
            "if a\n  x = 1\nelse\n  x = 2\nend",
            "while x < 10\n  x = x + 1\nend",
            "items.map { |v| v * 2 }",
            "case v\nwhen 1\n  puts \"one\"\nelse\n  puts \"other\"\nend",
            "begin\n  risky(1)\nrescue StandardError\n  handle(2)\nend",
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
