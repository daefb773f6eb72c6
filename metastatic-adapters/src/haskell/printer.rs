//! Pretty-printing of native Haskell trees.

use super::ast::Alt;
use super::ast::Ast;
use super::ast::Decl;
use super::ast::DeclKind;
use super::ast::Expr;

/// Renders a source fragment.
pub fn print(ast: &Ast) -> String {
    let mut lines = Vec::new();
    for decl in &ast.decls {
        print_decl(&mut lines, decl);
    }

    lines.join("\n")
}

/// Pushes the rendering of one declaration.
fn print_decl(lines: &mut Vec<String>, decl: &Decl) {
    match &decl.kind {
        DeclKind::Bind { name, params, body } => {
            let head = if params.is_empty() {
                name.clone()
            } else {
                format!("{name} {params}", params = params.join(" "))
            };
            lines.push(format!("{head} = {body}", body = render(body, 0)));
        }
        DeclKind::Expr(expr) => lines.push(render(expr, 0)),
        DeclKind::Raw(text) => {
            for raw_line in text.lines() {
                lines.push(raw_line.to_string());
            }
        }
    }
}

/// The precedence rank of an expression; higher binds tighter.
fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Lambda { .. } | Expr::Let { .. } | Expr::If { .. } | Expr::Case { .. } => 1,
        Expr::BinOp { op, .. } => match op.as_str() {
            "||" => 2,
            "&&" => 3,
            "==" | "/=" | "<=" | ">=" | "<" | ">" => 4,
            "++" => 5,
            "+" | "-" => 6,
            _ => 7,
        },
        Expr::UnaryOp { .. } => 8,
        Expr::App { .. } => 9,
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
    match expr {
        Expr::Int(value) => value.to_string(),
        Expr::Float(value) => print_float(*value),
        Expr::Str(value) => escape(value),
        Expr::Bool(true) => "True".to_string(),
        Expr::Bool(false) => "False".to_string(),
        Expr::Var(name) => name.clone(),
        Expr::Wildcard => "_".to_string(),
        Expr::App { func, args } => {
            let mut rendered = child(func, 10, indent);
            for arg in args {
                rendered.push(' ');
                rendered.push_str(&child(arg, 10, indent));
            }
            rendered
        }
        Expr::BinOp { op, left, right } => {
            let prec = precedence(expr);
            format!(
                "{left} {op} {right}",
                left = child(left, prec, indent),
                right = child(right, prec + 1, indent)
            )
        }
        Expr::UnaryOp { op, operand } => {
            format!("{op}{operand}", operand = child(operand, 10, indent))
        }
        Expr::If {
            cond,
            then_value,
            else_value,
        } => format!(
            "if {cond} then {then_value} else {else_value}",
            cond = child(cond, 2, indent),
            then_value = child(then_value, 2, indent),
            else_value = child(else_value, 2, indent)
        ),
        Expr::Case { scrutinee, alts } => {
            let pad = "    ".repeat(indent + 1);
            let mut lines = vec![format!(
                "case {scrutinee} of",
                scrutinee = child(scrutinee, 2, indent)
            )];
            for Alt { pattern, body } in alts {
                lines.push(format!(
                    "{pad}{pattern} -> {body}",
                    pattern = render(pattern, indent + 1),
                    body = render(body, indent + 1)
                ));
            }
            lines.join("\n")
        }
        Expr::Lambda { params, body } => format!(
            "\\{params} -> {body}",
            params = params.join(" "),
            body = render(body, indent)
        ),
        Expr::Let { name, value, body } => format!(
            "let {name} = {value} in {body}",
            value = render(value, indent),
            body = render(body, indent)
        ),
        Expr::List(items) => {
            let items: Vec<_> = items.iter().map(|i| render(i, indent)).collect();
            format!("[{items}]", items = items.join(", "))
        }
        Expr::Tuple(items) => {
            let items: Vec<_> = items.iter().map(|i| render(i, indent)).collect();
            format!("({items})", items = items.join(", "))
        }
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
        round_trip("x + 5");
        round_trip("double x = x * 2");
        round_trip("total = foldr add 0 items");
        round_trip("sign x = if x > 0 then 1 else -1");
        round_trip("describe v = case v of\n    1 -> \"one\"\n    _ -> \"other\"");
        round_trip("add = \\a b -> a + b");
        round_trip("area r = let squared = r * r in pi * squared");
    }
}
