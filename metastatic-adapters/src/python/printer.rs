//! Pretty-printing of native Python trees.

use super::ast::Ast;
use super::ast::Expr;
use super::ast::Stmt;
use super::ast::StmtKind;

/// Renders a module to source with four-space indentation.
pub fn print(ast: &Ast) -> String {
    let mut lines = Vec::new();
    for stmt in &ast.body {
        print_stmt(&mut lines, stmt, 0);
    }

    lines.join("\n")
}

/// Pushes the rendering of one statement at the given indent level.
fn print_stmt(lines: &mut Vec<String>, stmt: &Stmt, indent: usize) {
    let pad = "    ".repeat(indent);
    match &stmt.kind {
        StmtKind::Expr(expr) => lines.push(format!("{pad}{expr}", expr = print_expr(expr))),
        StmtKind::Assign { target, value } => lines.push(format!(
            "{pad}{target} = {value}",
            target = print_expr(target),
            value = print_expr(value)
        )),
        StmtKind::Return(value) => match value {
            Some(value) => lines.push(format!("{pad}return {value}", value = print_expr(value))),
            None => lines.push(format!("{pad}return")),
        },
        StmtKind::If { test, body, orelse } => {
            lines.push(format!("{pad}if {test}:", test = print_expr(test)));
            print_suite(lines, body, indent + 1);
            print_orelse(lines, orelse, indent);
        }
        StmtKind::While { test, body } => {
            lines.push(format!("{pad}while {test}:", test = print_expr(test)));
            print_suite(lines, body, indent + 1);
        }
        StmtKind::For { target, iter, body } => {
            lines.push(format!(
                "{pad}for {target} in {iter}:",
                target = print_expr(target),
                iter = print_expr(iter)
            ));
            print_suite(lines, body, indent + 1);
        }
        StmtKind::Try {
            body,
            handlers,
            orelse,
        } => {
            lines.push(format!("{pad}try:"));
            print_suite(lines, body, indent + 1);
            for handler in handlers {
                match &handler.kind {
                    Some(kind) => lines.push(format!(
                        "{pad}except {kind}:",
                        kind = print_expr(kind)
                    )),
                    None => lines.push(format!("{pad}except:")),
                }
                print_suite(lines, &handler.body, indent + 1);
            }
            if !orelse.is_empty() {
                lines.push(format!("{pad}else:"));
                print_suite(lines, orelse, indent + 1);
            }
        }
        StmtKind::Match { subject, cases } => {
            lines.push(format!("{pad}match {subject}:", subject = print_expr(subject)));
            let case_pad = "    ".repeat(indent + 1);
            for case in cases {
                let pattern = print_expr(&case.pattern);
                match &case.guard {
                    Some(guard) => lines.push(format!(
                        "{case_pad}case {pattern} if {guard}:",
                        guard = print_expr(guard)
                    )),
                    None => lines.push(format!("{case_pad}case {pattern}:")),
                }
                print_suite(lines, &case.body, indent + 2);
            }
        }
        StmtKind::Raw(text) => {
            for raw_line in text.lines() {
                lines.push(format!("{pad}{raw_line}"));
            }
        }
    }
}

/// Pushes a suite, rendering an explicit `pass`-free empty body as `pass`.
fn print_suite(lines: &mut Vec<String>, body: &[Stmt], indent: usize) {
    if body.is_empty() {
        lines.push(format!("{pad}pass", pad = "    ".repeat(indent)));
        return;
    }

    for stmt in body {
        print_stmt(lines, stmt, indent);
    }
}

/// Pushes an `else`/`elif` chain.
fn print_orelse(lines: &mut Vec<String>, orelse: &[Stmt], indent: usize) {
    if orelse.is_empty() {
        return;
    }

    let pad = "    ".repeat(indent);

    // A lone nested `if` renders as `elif`.
    if orelse.len() == 1 {
        if let StmtKind::If { test, body, orelse } = &orelse[0].kind {
            lines.push(format!("{pad}elif {test}:", test = print_expr(test)));
            print_suite(lines, body, indent + 1);
            print_orelse(lines, orelse, indent);
            return;
        }
    }

    lines.push(format!("{pad}else:"));
    print_suite(lines, orelse, indent + 1);
}

/// The precedence rank of an expression; higher binds tighter.
fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::IfExp { .. } => 1,
        Expr::Lambda { .. } => 1,
        Expr::BoolOp { op, .. } => {
            if op == "or" {
                2
            } else {
                3
            }
        }
        Expr::UnaryOp { op, .. } => {
            if op == "not" {
                4
            } else {
                8
            }
        }
        Expr::Compare { .. } => 5,
        Expr::BinOp { op, .. } => match op.as_str() {
            "+" | "-" => 6,
            "**" => 9,
            _ => 7,
        },
        Expr::Await(_) => 8,
        _ => 10,
    }
}

/// Renders a subexpression, parenthesizing when it binds looser than its
/// context.
fn child(expr: &Expr, min: u8) -> String {
    let rendered = print_expr(expr);
    if precedence(expr) < min {
        format!("({rendered})")
    } else {
        rendered
    }
}

/// Renders an expression to source.
pub fn print_expr(expr: &Expr) -> String {
    match expr {
        Expr::Int(value) => value.to_string(),
        Expr::Float(value) => print_float(*value),
        Expr::Str(value) => escape(value),
        Expr::Bool(true) => "True".to_string(),
        Expr::Bool(false) => "False".to_string(),
        Expr::None => "None".to_string(),
        Expr::Name(name) => name.clone(),
        Expr::Wildcard => "_".to_string(),
        Expr::BinOp { op, left, right } => {
            let prec = precedence(expr);
            if op == "**" {
                // Right-associative.
                format!("{left} ** {right}", left = child(left, prec + 1), right = child(right, prec))
            } else {
                format!(
                    "{left} {op} {right}",
                    left = child(left, prec),
                    right = child(right, prec + 1)
                )
            }
        }
        Expr::BoolOp { op, left, right } => {
            let prec = precedence(expr);
            format!(
                "{left} {op} {right}",
                left = child(left, prec),
                right = child(right, prec)
            )
        }
        Expr::Compare { op, left, right } => {
            let prec = precedence(expr);
            format!(
                "{left} {op} {right}",
                left = child(left, prec + 1),
                right = child(right, prec + 1)
            )
        }
        Expr::UnaryOp { op, operand } => {
            let prec = precedence(expr);
            if op == "not" {
                format!("not {operand}", operand = child(operand, prec))
            } else {
                format!("{op}{operand}", operand = child(operand, prec))
            }
        }
        Expr::Call { func, args } => {
            let args: Vec<_> = args.iter().map(print_expr).collect();
            format!("{func}({args})", args = args.join(", "))
        }
        Expr::Lambda { params, body } => {
            if params.is_empty() {
                format!("lambda: {body}", body = print_expr(body))
            } else {
                format!(
                    "lambda {params}: {body}",
                    params = params.join(", "),
                    body = print_expr(body)
                )
            }
        }
        Expr::IfExp { test, body, orelse } => format!(
            "{body} if {test} else {orelse}",
            body = child(body, 2),
            test = child(test, 2),
            orelse = print_expr(orelse)
        ),
        Expr::List(items) => {
            let items: Vec<_> = items.iter().map(print_expr).collect();
            format!("[{items}]", items = items.join(", "))
        }
        Expr::Tuple(items) => {
            let items: Vec<_> = items.iter().map(print_expr).collect();
            if items.len() == 1 {
                format!("({item},)", item = &items[0])
            } else {
                format!("({items})", items = items.join(", "))
            }
        }
        Expr::Dict(entries) => {
            let entries: Vec<_> = entries
                .iter()
                .map(|(key, value)| {
                    format!("{key}: {value}", key = print_expr(key), value = print_expr(value))
                })
                .collect();
            format!("{{{entries}}}", entries = entries.join(", "))
        }
        Expr::Await(operand) => format!("await {operand}", operand = child(operand, 8)),
    }
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
            '\r' => out.push_str("\\r"),
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
    /// fixed point (source lines may move between the two parses).
    fn round_trip(source: &str) {
        let ast = parse(source).unwrap();
        let printed = print(&ast);
        let reparsed = parse(&printed).unwrap();
        assert_eq!(print(&reparsed), printed, "print of {source:?} was not stable");
    }

    #[test]
    fn printing_is_a_parse_fixed_point() {
        round_trip("x + 5");
        round_trip("x = 1\ny = x * (2 + 3)");
        round_trip("if a: x = 1\nelse: x = 2");
        round_trip("while x < 10:\n    x = x + 1");
        round_trip("for v in items:\n    total = total + v");
        round_trip("try:\n    risky()\nexcept ValueError:\n    handle()\nelse:\n    done()");
        round_trip("print(\"hi\")");
        round_trip("f = lambda a, b: a + b");
        round_trip("x = -y ** 2");
        round_trip("z = await fetch(url)");
    }

    #[test]
    fn it_preserves_precedence_with_parentheses() {
        let ast = parse("(x + 5) * y").unwrap();
        assert_eq!(print(&ast), "(x + 5) * y");
    }
}
