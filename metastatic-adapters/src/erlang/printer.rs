//! Pretty-printing of native Erlang trees.

use super::ast::Ast;
use super::ast::Clause;
use super::ast::Expr;

/// Renders a source fragment; every top-level form ends with `.`.
pub fn print(ast: &Ast) -> String {
    let mut out = Vec::new();
    for form in &ast.forms {
        let rendered = render(&form.expr, 0);
        if rendered.ends_with('.') {
            out.push(rendered);
        } else {
            out.push(format!("{rendered}."));
        }
    }

    out.join("\n")
}

/// The precedence rank of an expression; higher binds tighter.
fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Match { .. } => 1,
        Expr::BinOp { op, .. } => match op.as_str() {
            "orelse" | "or" => 2,
            "andalso" | "and" => 3,
            "=:=" | "=/=" | "==" | "/=" | "=<" | ">=" | "<" | ">" => 5,
            "++" => 6,
            "+" | "-" => 7,
            _ => 8,
        },
        Expr::UnaryOp { op, .. } => {
            if op == "-" {
                9
            } else {
                4
            }
        }
        _ => 10,
    }
}

/// Renders a subexpression, parenthesizing when it binds looser than its
/// context.
fn child(expr: &Expr, min: u8, indent: usize) -> String {
    let rendered = render(expr, indent);
    if precedence(expr) < min {
        format!("({rendered})")
    } else {
        rendered
    }
}

/// Renders an expression at the given indent level.
fn render(expr: &Expr, indent: usize) -> String {
    let pad = "    ".repeat(indent);
    let inner_pad = "    ".repeat(indent + 1);
    match expr {
        Expr::Int(value) => value.to_string(),
        Expr::Float(value) => print_float(*value),
        Expr::Atom(name) => name.clone(),
        Expr::Str(value) => escape(value),
        Expr::Var(name) => name.clone(),
        Expr::Wildcard => "_".to_string(),
        Expr::Match { left, right } => format!(
            "{left} = {right}",
            left = child(left, 2, indent),
            right = child(right, 1, indent)
        ),
        Expr::BinOp { op, left, right } => {
            let prec = precedence(expr);
            format!(
                "{left} {op} {right}",
                left = child(left, prec, indent),
                right = child(right, prec + 1, indent)
            )
        }
        Expr::UnaryOp { op, operand } => {
            let prec = precedence(expr);
            if op == "not" {
                format!("not {operand}", operand = child(operand, prec, indent))
            } else {
                format!("{op}{operand}", operand = child(operand, prec, indent))
            }
        }
        Expr::Call { module, name, args } => {
            let args: Vec<_> = args.iter().map(|arg| render(arg, indent)).collect();
            match module {
                Some(module) => format!("{module}:{name}({args})", args = args.join(", ")),
                None => format!("{name}({args})", args = args.join(", ")),
            }
        }
        Expr::Case { subject, clauses } => {
            let mut lines = vec![format!(
                "case {subject} of",
                subject = render(subject, indent)
            )];
            lines.push(render_clauses(clauses, indent + 1));
            lines.push(format!("{pad}end"));
            lines.join("\n")
        }
        Expr::If { clauses } => {
            let mut rendered = Vec::new();
            for clause in clauses {
                let body: Vec<_> = clause.body.iter().map(|e| render(e, indent + 1)).collect();
                rendered.push(format!(
                    "{inner_pad}{guard} -> {body}",
                    guard = render(&clause.guard, indent + 1),
                    body = body.join(", ")
                ));
            }
            format!(
                "if\n{clauses}\n{pad}end",
                clauses = rendered.join(";\n")
            )
        }
        Expr::Fun { params, body } => {
            let params: Vec<_> = params.iter().map(|p| render(p, indent)).collect();
            let body: Vec<_> = body.iter().map(|e| render(e, indent)).collect();
            format!(
                "fun({params}) -> {body} end",
                params = params.join(", "),
                body = body.join(", ")
            )
        }
        Expr::Try { body, catches } => {
            let body: Vec<_> = body.iter().map(|e| render(e, indent + 1)).collect();
            if catches.is_empty() {
                return format!(
                    "try\n{inner_pad}{body}\n{pad}end",
                    body = body.join(", ")
                );
            }

            format!(
                "try\n{inner_pad}{body}\n{pad}catch\n{catches}\n{pad}end",
                body = body.join(", "),
                catches = render_clauses(catches, indent + 1)
            )
        }
        Expr::List(items) => {
            let items: Vec<_> = items.iter().map(|i| render(i, indent)).collect();
            format!("[{items}]", items = items.join(", "))
        }
        Expr::Tuple(items) => {
            let items: Vec<_> = items.iter().map(|i| render(i, indent)).collect();
            format!("{{{items}}}", items = items.join(", "))
        }
        Expr::MapLit(entries) => {
            let entries: Vec<_> = entries
                .iter()
                .map(|(key, value)| {
                    format!(
                        "{key} => {value}",
                        key = render(key, indent),
                        value = render(value, indent)
                    )
                })
                .collect();
            format!("#{{{entries}}}", entries = entries.join(", "))
        }
        Expr::Raw(text) => text.clone(),
    }
}

/// Renders `pattern [when guard] -> body` clauses joined by `;`.
fn render_clauses(clauses: &[Clause], indent: usize) -> String {
    let pad = "    ".repeat(indent);
    let mut rendered = Vec::new();
    for clause in clauses {
        let body: Vec<_> = clause.body.iter().map(|e| render(e, indent)).collect();
        let head = match &clause.guard {
            Some(guard) => format!(
                "{pad}{pattern} when {guard}",
                pattern = render(&clause.pattern, indent),
                guard = render(guard, indent)
            ),
            None => format!("{pad}{pattern}", pattern = render(&clause.pattern, indent)),
        };
        rendered.push(format!("{head} -> {body}", body = body.join(", ")));
    }

    rendered.join(";\n")
}

/// Renders a float, keeping a decimal point so it re-parses as a float.
fn print_float(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

/// Renders a string literal.
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
        round_trip("X + 5");
        round_trip("X = lists:map(F, Items)");
        round_trip("case X of\n    1 -> one;\n    _ -> other\nend");
        round_trip("F = fun(V) -> V * 2 end");
        round_trip("A =:= B andalso C =/= D");
        round_trip("-module(sample).");
        round_trip("try\n    risky()\ncatch\n    Error -> handle(Error)\nend");
    }
}
