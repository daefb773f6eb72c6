//! Pretty-printing of native Elixir trees.

use super::ast::Ast;
use super::ast::Clause;
use super::ast::Expr;

/// Renders a source file with two-space indentation.
pub fn print(ast: &Ast) -> String {
    let mut lines = Vec::new();
    for form in &ast.forms {
        print_expr_lines(&mut lines, &form.expr, 0);
    }

    lines.join("\n")
}

/// Pushes the rendering of an expression as one or more lines.
fn print_expr_lines(lines: &mut Vec<String>, expr: &Expr, indent: usize) {
    let pad = "  ".repeat(indent);
    match expr {
        Expr::If {
            condition,
            do_block,
            else_block,
        } => {
            lines.push(format!("{pad}if {condition} do", condition = inline(condition)));
            for inner in do_block {
                print_expr_lines(lines, inner, indent + 1);
            }
            if let Some(else_block) = else_block {
                lines.push(format!("{pad}else"));
                for inner in else_block {
                    print_expr_lines(lines, inner, indent + 1);
                }
            }
            lines.push(format!("{pad}end"));
        }
        Expr::Case { subject, clauses } => {
            lines.push(format!("{pad}case {subject} do", subject = inline(subject)));
            print_clauses(lines, clauses, indent + 1);
            lines.push(format!("{pad}end"));
        }
        Expr::Try {
            body,
            rescue,
            else_block,
        } => {
            lines.push(format!("{pad}try do"));
            for inner in body {
                print_expr_lines(lines, inner, indent + 1);
            }
            if !rescue.is_empty() {
                lines.push(format!("{pad}rescue"));
                print_clauses(lines, rescue, indent + 1);
            }
            if !else_block.is_empty() {
                lines.push(format!("{pad}else"));
                for inner in else_block {
                    print_expr_lines(lines, inner, indent + 1);
                }
            }
            lines.push(format!("{pad}end"));
        }
        Expr::Raw(text) => {
            for raw_line in text.lines() {
                lines.push(format!("{pad}{raw_line}"));
            }
        }
        other => lines.push(format!("{pad}{other}", other = inline(other))),
    }
}

/// Pushes `pattern [when guard] ->` clauses with indented bodies.
fn print_clauses(lines: &mut Vec<String>, clauses: &[Clause], indent: usize) {
    let pad = "  ".repeat(indent);
    for clause in clauses {
        let head = match &clause.guard {
            Some(guard) => format!(
                "{pad}{pattern} when {guard} ->",
                pattern = inline(&clause.pattern),
                guard = inline(guard)
            ),
            None => format!("{pad}{pattern} ->", pattern = inline(&clause.pattern)),
        };
        lines.push(head);
        for inner in &clause.body {
            print_expr_lines(lines, inner, indent + 1);
        }
    }
}

/// The precedence rank of an expression; higher binds tighter.
fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Match { .. } => 1,
        Expr::BinOp { op, .. } => match op.as_str() {
            "or" | "||" => 2,
            "and" | "&&" => 3,
            "===" | "!==" | "==" | "!=" | "<=" | ">=" | "<" | ">" => 5,
            "++" | "<>" => 6,
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
        Expr::Atom(name) => format!(":{name}"),
        Expr::Bool(true) => "true".to_string(),
        Expr::Bool(false) => "false".to_string(),
        Expr::Nil => "nil".to_string(),
        Expr::Var(name) => name.clone(),
        Expr::Wildcard => "_".to_string(),
        Expr::Match { left, right } => format!(
            "{left} = {right}",
            left = child(left, 2),
            right = child(right, 1)
        ),
        Expr::BinOp { op, left, right } => {
            let prec = precedence(expr);
            format!(
                "{left} {op} {right}",
                left = child(left, prec),
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
        Expr::Call { name, args } => {
            let args: Vec<_> = args.iter().map(inline).collect();
            format!("{name}({args})", args = args.join(", "))
        }
        Expr::Fn { params, body } => {
            let params: Vec<_> = params.iter().map(inline).collect();
            let body: Vec<_> = body.iter().map(inline).collect();
            if params.is_empty() {
                format!("fn -> {body} end", body = body.join("; "))
            } else {
                format!(
                    "fn {params} -> {body} end",
                    params = params.join(", "),
                    body = body.join("; ")
                )
            }
        }
        Expr::If {
            condition,
            do_block,
            else_block,
        } => {
            // Inline contexts use the keyword form.
            let do_block: Vec<_> = do_block.iter().map(inline).collect();
            match else_block {
                Some(else_block) => {
                    let else_block: Vec<_> = else_block.iter().map(inline).collect();
                    format!(
                        "if {condition}, do: {do_block}, else: {else_block}",
                        condition = inline(condition),
                        do_block = do_block.join("; "),
                        else_block = else_block.join("; ")
                    )
                }
                None => format!(
                    "if {condition}, do: {do_block}",
                    condition = inline(condition),
                    do_block = do_block.join("; ")
                ),
            }
        }
        Expr::Case { .. } | Expr::Try { .. } => {
            // Block constructs flatten onto one line only via their own
            // multi-line rendering.
            let mut lines = Vec::new();
            print_expr_lines(&mut lines, expr, 0);
            lines.join("\n")
        }
        Expr::List(items) => {
            let items: Vec<_> = items.iter().map(inline).collect();
            format!("[{items}]", items = items.join(", "))
        }
        Expr::Tuple(items) => {
            let items: Vec<_> = items.iter().map(inline).collect();
            format!("{{{items}}}", items = items.join(", "))
        }
        Expr::MapLit(entries) => {
            let entries: Vec<_> = entries
                .iter()
                .map(|(key, value)| {
                    format!("{key} => {value}", key = inline(key), value = inline(value))
                })
                .collect();
            format!("%{{{entries}}}", entries = entries.join(", "))
        }
        Expr::Raw(text) => text.clone(),
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
        round_trip("x = Enum.map(items, fn v -> v * 2 end)");
        round_trip("if x > 0 do\n  :pos\nelse\n  :neg\nend");
        round_trip("case v do\n  1 -> :one\n  _ -> :other\nend");
        round_trip("try do\n  risky()\nrescue\n  e -> handle(e)\nend");
        round_trip("%{\"a\" => 1, \"b\" => 2}");
        round_trip("total = a * (b + c)");
    }
}
