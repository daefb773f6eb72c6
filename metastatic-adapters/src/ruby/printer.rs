//! Pretty-printing of native Ruby trees.

use super::ast::Ast;
use super::ast::Block;
use super::ast::Expr;
use super::ast::Stmt;
use super::ast::StmtKind;

/// Identifiers printed without parentheses, command style.
const COMMANDS: &[&str] = &["p", "print", "puts", "raise", "require"];

/// Renders a program with two-space indentation.
pub fn print(ast: &Ast) -> String {
    let mut lines = Vec::new();
    for stmt in &ast.body {
        print_stmt(&mut lines, stmt, 0);
    }

    lines.join("\n")
}

/// Pushes the rendering of one statement at the given indent level.
fn print_stmt(lines: &mut Vec<String>, stmt: &Stmt, indent: usize) {
    let pad = "  ".repeat(indent);
    match &stmt.kind {
        StmtKind::Expr(expr) => lines.push(format!("{pad}{expr}", expr = inline(expr))),
        StmtKind::Assign { target, value } => lines.push(format!(
            "{pad}{target} = {value}",
            target = inline(target),
            value = inline(value)
        )),
        StmtKind::Return(value) => match value {
            Some(value) => lines.push(format!("{pad}return {value}", value = inline(value))),
            None => lines.push(format!("{pad}return")),
        },
        StmtKind::If {
            cond,
            then_body,
            elsifs,
            else_body,
        } => {
            lines.push(format!("{pad}if {cond}", cond = inline(cond)));
            print_body(lines, then_body, indent + 1);
            for (elsif_cond, elsif_body) in elsifs {
                lines.push(format!("{pad}elsif {cond}", cond = inline(elsif_cond)));
                print_body(lines, elsif_body, indent + 1);
            }

            // A lone nested `if` in the else branch folds into `elsif`.
            if let [only] = else_body.as_slice() {
                if let StmtKind::If {
                    cond,
                    then_body,
                    elsifs,
                    else_body,
                } = &only.kind
                {
                    lines.push(format!("{pad}elsif {cond}", cond = inline(cond)));
                    print_body(lines, then_body, indent + 1);
                    for (elsif_cond, elsif_body) in elsifs {
                        lines.push(format!("{pad}elsif {cond}", cond = inline(elsif_cond)));
                        print_body(lines, elsif_body, indent + 1);
                    }
                    if !else_body.is_empty() {
                        lines.push(format!("{pad}else"));
                        print_body(lines, else_body, indent + 1);
                    }
                    lines.push(format!("{pad}end"));
                    return;
                }
            }

            if !else_body.is_empty() {
                lines.push(format!("{pad}else"));
                print_body(lines, else_body, indent + 1);
            }
            lines.push(format!("{pad}end"));
        }
        StmtKind::While { cond, body } => {
            lines.push(format!("{pad}while {cond}", cond = inline(cond)));
            print_body(lines, body, indent + 1);
            lines.push(format!("{pad}end"));
        }
        StmtKind::Case {
            subject,
            whens,
            else_body,
        } => {
            lines.push(format!("{pad}case {subject}", subject = inline(subject)));
            for when in whens {
                let values: Vec<_> = when.values.iter().map(inline).collect();
                lines.push(format!("{pad}when {values}", values = values.join(", ")));
                print_body(lines, &when.body, indent + 1);
            }
            if !else_body.is_empty() {
                lines.push(format!("{pad}else"));
                print_body(lines, else_body, indent + 1);
            }
            lines.push(format!("{pad}end"));
        }
        StmtKind::Begin {
            body,
            rescues,
            else_body,
        } => {
            lines.push(format!("{pad}begin"));
            print_body(lines, body, indent + 1);
            for rescue in rescues {
                match &rescue.class {
                    Some(class) => lines.push(format!(
                        "{pad}rescue {class}",
                        class = inline(class)
                    )),
                    None => lines.push(format!("{pad}rescue")),
                }
                print_body(lines, &rescue.body, indent + 1);
            }
            if !else_body.is_empty() {
                lines.push(format!("{pad}else"));
                print_body(lines, else_body, indent + 1);
            }
            lines.push(format!("{pad}end"));
        }
        StmtKind::Raw(text) => {
            for raw_line in text.lines() {
                lines.push(format!("{pad}{raw_line}"));
            }
        }
    }
}

/// Pushes a statement body.
fn print_body(lines: &mut Vec<String>, body: &[Stmt], indent: usize) {
    for stmt in body {
        print_stmt(lines, stmt, indent);
    }
}

/// The precedence rank of an expression; higher binds tighter.
fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Ternary { .. } => 1,
        Expr::BinOp { op, .. } => match op.as_str() {
            "or" | "||" => 2,
            "and" | "&&" => 3,
            "==" | "!=" | "<=" | ">=" | "<" | ">" => 5,
            "+" | "-" => 6,
            "**" => 9,
            _ => 7,
        },
        Expr::UnaryOp { op, .. } => {
            if op == "-" {
                8
            } else {
                4
            }
        }
        _ => 10,
    }
}

/// Renders a subexpression, parenthesizing when it binds looser than its
/// context.
fn child(expr: &Expr, min: u8) -> String {
    let rendered = inline(expr);
    if precedence(expr) < min {
        format!("({rendered})")
    } else {
        rendered
    }
}

/// Renders an expression on a single line.
pub fn inline(expr: &Expr) -> String {
    match expr {
        Expr::Int(value) => value.to_string(),
        Expr::Float(value) => print_float(*value),
        Expr::Str(value) => escape(value),
        Expr::Sym(name) => format!(":{name}"),
        Expr::Bool(true) => "true".to_string(),
        Expr::Bool(false) => "false".to_string(),
        Expr::Nil => "nil".to_string(),
        Expr::Var(name) => name.clone(),
        Expr::Ivar(name) => name.clone(),
        Expr::BinOp { op, left, right } => {
            let prec = precedence(expr);
            if op == "**" {
                format!(
                    "{left} ** {right}",
                    left = child(left, prec + 1),
                    right = child(right, prec)
                )
            } else {
                format!(
                    "{left} {op} {right}",
                    left = child(left, prec),
                    right = child(right, prec + 1)
                )
            }
        }
        Expr::UnaryOp { op, operand } => {
            let prec = precedence(expr);
            if op == "not" {
                format!("not {operand}", operand = child(operand, prec))
            } else {
                format!("{op}{operand}", operand = child(operand, prec))
            }
        }
        Expr::MethodCall {
            recv,
            name,
            args,
            block,
        } => {
            let mut rendered = String::new();
            if let Some(recv) = recv {
                rendered.push_str(&child(recv, 10));
                rendered.push('.');
            }
            rendered.push_str(name);

            let args: Vec<_> = args.iter().map(inline).collect();
            if !args.is_empty() {
                if recv.is_none() && COMMANDS.contains(&name.as_str()) {
                    rendered.push(' ');
                    rendered.push_str(&args.join(", "));
                } else {
                    rendered.push('(');
                    rendered.push_str(&args.join(", "));
                    rendered.push(')');
                }
            }

            if let Some(block) = block {
                rendered.push_str(&render_block(block));
            }

            rendered
        }
        Expr::Lambda { params, body } => {
            let body: Vec<_> = body.iter().map(inline_stmt).collect();
            if params.is_empty() {
                format!("-> {{ {body} }}", body = body.join("; "))
            } else {
                format!(
                    "->({params}) {{ {body} }}",
                    params = params.join(", "),
                    body = body.join("; ")
                )
            }
        }
        Expr::Ternary {
            cond,
            then_value,
            else_value,
        } => format!(
            "{cond} ? {then_value} : {else_value}",
            cond = child(cond, 2),
            then_value = child(then_value, 2),
            else_value = child(else_value, 2)
        ),
        Expr::Array(items) => {
            let items: Vec<_> = items.iter().map(inline).collect();
            format!("[{items}]", items = items.join(", "))
        }
        Expr::Hash(entries) => {
            let entries: Vec<_> = entries
                .iter()
                .map(|(key, value)| {
                    format!("{key} => {value}", key = inline(key), value = inline(value))
                })
                .collect();
            format!("{{{entries}}}", entries = entries.join(", "))
        }
    }
}

/// Renders an attached block inline.
fn render_block(block: &Block) -> String {
    let body: Vec<_> = block.body.iter().map(inline_stmt).collect();
    if block.params.is_empty() {
        format!(" {{ {body} }}", body = body.join("; "))
    } else {
        format!(
            " {{ |{params}| {body} }}",
            params = block.params.join(", "),
            body = body.join("; ")
        )
    }
}

/// Renders a statement on a single line (for block and lambda bodies).
fn inline_stmt(stmt: &Stmt) -> String {
    let mut lines = Vec::new();
    print_stmt(&mut lines, stmt, 0);
    lines.join("; ")
}

/// Renders a float, keeping a decimal point so it re-parses as a float.
fn print_float(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

/// Renders a string literal with double quotes.
fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::super::parser::parse;
    use super::*;

    /// Parses, prints, and reparses source, asserting the printed form is a
    /// fixed point.
    fn round_trip(source: &str) {
        let ast = parse(source).unwrap();
        let printed = print(&ast);
        let reparsed = parse(&printed).unwrap();
        assert_eq!(print(&reparsed), printed, "print of {source:?} was not stable");
    }

    #[test]
    fn printing_is_a_parse_fixed_point() {
        round_trip("x + 5");
        round_trip("puts \"hi\"");
        round_trip("total = items.reduce(0) { |acc, v| acc + v }");
        round_trip("if a\n  x = 1\nelsif b\n  x = 2\nelse\n  x = 3\nend");
        round_trip("while x < 10\n  x = x + 1\nend");
        round_trip("case v\nwhen 1\n  puts \"one\"\nelse\n  puts \"other\"\nend");
        round_trip("begin\n  risky()\nrescue StandardError\n  handle()\nend");
        round_trip("f = ->(a, b) { a + b }");
        round_trip("x = cond ? 1 : 2");
    }
}
