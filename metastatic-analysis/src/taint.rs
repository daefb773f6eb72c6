//! The taint-flow analysis.

use std::collections::HashMap;

use metastatic_ast::DbOperation;
use metastatic_ast::Document;
use metastatic_ast::Domain;
use metastatic_ast::Language;
use metastatic_ast::LoopForm;
use metastatic_ast::MetaNode;
use metastatic_ast::Operation;
use serde::Serialize;

use crate::AnalysisReport;
use crate::Analyzer;

/// How dangerous a detected flow is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[derive(strum::Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum Risk {
    Low,
    Medium,
    High,
    Critical,
}

/// One detected source-to-sink flow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaintFlow {
    /// The call that introduced the tainted value.
    pub source: String,
    /// The call the tainted value reached.
    pub sink: String,
    /// The risk level of the flow.
    pub risk: Risk,
    /// The names the value travelled through, source first.
    pub path: Vec<String>,
    /// What to do about it.
    pub recommendation: String,
}

/// The result of the taint analysis.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TaintResult {
    /// The detected flows in source order.
    pub flows: Vec<TaintFlow>,
}

impl TaintResult {
    /// Determines whether any flow was found.
    pub fn has_flows(&self) -> bool {
        !self.flows.is_empty()
    }
}

/// What kind of sink a call is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SinkKind {
    /// Code evaluation.
    Eval,
    /// Shell execution.
    Shell,
    /// SQL construction or execution.
    Sql,
    /// Template or response rendering.
    Template,
}

impl SinkKind {
    /// The risk of a tainted value reaching this sink.
    fn risk(self) -> Risk {
        match self {
            Self::Eval | Self::Shell => Risk::Critical,
            Self::Sql => Risk::High,
            Self::Template => Risk::Medium,
        }
    }

    /// The remediation advice for this sink.
    fn recommendation(self) -> &'static str {
        match self {
            Self::Eval => "never evaluate user-controlled input; parse it instead",
            Self::Shell => "pass arguments as a list and avoid the shell, or validate strictly",
            Self::Sql => "use parameterized queries instead of string construction",
            Self::Template => "escape the value before rendering it",
        }
    }
}

/// Taint source call names per language (entries ending in `.` are
/// prefixes).
fn source_names(language: Language) -> &'static [&'static str] {
    match language {
        Language::Python => &[
            "input",
            "sys.argv",
            "os.environ.get",
            "os.getenv",
            "request.",
        ],
        Language::Elixir => &["IO.gets", "System.get_env", "System.argv"],
        Language::Erlang => &["io.get_line", "os.getenv", "init.get_plain_arguments"],
        Language::Ruby => &["gets", "params.", "ENV.fetch"],
        Language::Haskell => &["getLine", "getArgs", "getEnv"],
    }
}

/// Classifies a call name as a sink.
fn sink_kind(language: Language, name: &str, node: &MetaNode) -> Option<SinkKind> {
    if let Some(op_kind) = node.metadata().op_kind() {
        if op_kind.domain == Domain::Db && op_kind.operation == Operation::Db(DbOperation::Query)
        {
            return Some(SinkKind::Sql);
        }
    }

    let eval: &[&str] = match language {
        Language::Python => &["eval", "exec", "compile"],
        Language::Elixir => &["Code.eval_string", "Code.eval_quoted"],
        Language::Erlang => &["erl_eval.exprs"],
        Language::Ruby => &["eval", "instance_eval", "class_eval"],
        Language::Haskell => &[],
    };
    if eval.contains(&name) {
        return Some(SinkKind::Eval);
    }

    let shell: &[&str] = match language {
        Language::Python => &["os.system", "os.popen", "subprocess.run", "subprocess.call"],
        Language::Elixir => &["System.cmd", "System.shell"],
        Language::Erlang => &["os.cmd"],
        Language::Ruby => &["system", "exec", "spawn"],
        Language::Haskell => &["callCommand", "system"],
    };
    if shell.contains(&name) {
        return Some(SinkKind::Shell);
    }

    if name == "execute" || name.ends_with(".execute") || name.ends_with(".query") {
        return Some(SinkKind::Sql);
    }

    let template: &[&str] = match language {
        Language::Python => &["render_template", "render"],
        Language::Elixir => &["render"],
        Language::Erlang => &[],
        Language::Ruby => &["render"],
        Language::Haskell => &[],
    };
    if template.contains(&name) {
        return Some(SinkKind::Template);
    }

    None
}

/// Determines whether a call breaks taint propagation.
fn is_sanitizer(name: &str) -> bool {
    let last = name.rsplit('.').next().unwrap_or(name);
    last.contains("escape") || last.contains("sanitize") || last == "quote" || last == "int"
}

/// What is known about a tainted value.
#[derive(Debug, Clone)]
struct TaintInfo {
    /// The source call that introduced the value.
    source: String,
    /// The names the value has travelled through.
    path: Vec<String>,
}

/// The taint walker: statement-ordered, with assignment tracking.
struct TaintWalker {
    /// The document's source language.
    language: Language,
    /// Currently tainted variable names.
    tainted: HashMap<String, TaintInfo>,
    /// Detected flows.
    flows: Vec<TaintFlow>,
}

impl TaintWalker {
    /// Walks one node in statement order, returning its taint when it is an
    /// expression that produces one.
    fn walk(&mut self, node: &MetaNode) -> Option<TaintInfo> {
        match node {
            MetaNode::FunctionCall { name, args, .. } => {
                let arg_taint = args.iter().filter_map(|arg| self.walk(arg)).next();

                if let Some(kind) = sink_kind(self.language, name, node) {
                    if let Some(info) = &arg_taint {
                        let mut path = info.path.clone();
                        path.push(name.clone());
                        self.flows.push(TaintFlow {
                            source: info.source.clone(),
                            sink: name.clone(),
                            risk: kind.risk(),
                            path,
                            recommendation: kind.recommendation().to_string(),
                        });
                    }
                }

                if is_sanitizer(name) {
                    return None;
                }

                if matches_source(name, source_names(self.language)) {
                    return Some(TaintInfo {
                        source: name.clone(),
                        path: vec![name.clone()],
                    });
                }

                // Taint propagates through ordinary calls.
                arg_taint.map(|mut info| {
                    info.path.push(name.clone());
                    info
                })
            }
            MetaNode::Variable { name, .. } => self.tainted.get(name).cloned(),
            MetaNode::Assignment { target, value, .. } => {
                let taint = self.walk(value);
                if let MetaNode::Variable { name, .. } = &**target {
                    match taint {
                        Some(mut info) => {
                            info.path.push(name.clone());
                            self.tainted.insert(name.clone(), info);
                        }
                        None => {
                            self.tainted.remove(name);
                        }
                    }
                }
                None
            }
            MetaNode::InlineMatch { value, .. } => {
                self.walk(value);
                None
            }
            MetaNode::Block { statements, .. } => {
                for statement in statements {
                    self.walk(statement);
                }
                None
            }
            MetaNode::BinaryOp { lhs, rhs, .. } => {
                let left = self.walk(lhs);
                let right = self.walk(rhs);
                left.or(right)
            }
            MetaNode::UnaryOp { operand, .. } => self.walk(operand),
            MetaNode::Conditional {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                self.walk(condition);
                let then_taint = self.walk(then_branch);
                let else_taint = else_branch.as_deref().and_then(|e| self.walk(e));
                then_taint.or(else_taint)
            }
            MetaNode::Loop { form, .. } => {
                match form {
                    LoopForm::While { condition, body } => {
                        self.walk(condition);
                        self.walk(body);
                    }
                    LoopForm::For {
                        init,
                        condition,
                        step,
                        body,
                    } => {
                        self.walk(init);
                        self.walk(condition);
                        self.walk(step);
                        self.walk(body);
                    }
                    LoopForm::ForEach {
                        binding,
                        iterable,
                        body,
                    } => {
                        // The binding inherits the iterable's taint.
                        let taint = self.walk(iterable);
                        if let (MetaNode::Variable { name, .. }, Some(info)) =
                            (&**binding, taint)
                        {
                            self.tainted.insert(name.clone(), info);
                        }
                        self.walk(body);
                    }
                }
                None
            }
            MetaNode::Lambda { body, .. } => {
                self.walk(body);
                None
            }
            MetaNode::CollectionOp {
                func,
                collection,
                init,
                ..
            } => {
                self.walk(func);
                let taint = self.walk(collection);
                if let Some(init) = init {
                    self.walk(init);
                }
                taint
            }
            MetaNode::PatternMatch {
                scrutinee, arms, ..
            } => {
                self.walk(scrutinee);
                let mut taint = None;
                for arm in arms {
                    if let Some(guard) = &arm.guard {
                        self.walk(guard);
                    }
                    taint = self.walk(&arm.body).or(taint);
                }
                taint
            }
            MetaNode::ExceptionHandling {
                body,
                catches,
                else_body,
                ..
            } => {
                self.walk(body);
                for clause in catches {
                    self.walk(&clause.body);
                }
                if let Some(else_body) = else_body {
                    self.walk(else_body);
                }
                None
            }
            MetaNode::AsyncOperation { body, .. } => self.walk(body),
            MetaNode::List { items, .. } | MetaNode::Tuple { items, .. } => {
                items.iter().filter_map(|item| self.walk(item)).next()
            }
            MetaNode::MapLiteral { entries, .. } => {
                let mut taint = None;
                for (key, value) in entries {
                    taint = self.walk(key).or(taint);
                    taint = self.walk(value).or(taint);
                }
                taint
            }
            MetaNode::Pair { first, second, .. } => {
                let first = self.walk(first);
                let second = self.walk(second);
                first.or(second)
            }
            MetaNode::EarlyReturn { value, .. } => {
                if let Some(value) = value {
                    self.walk(value);
                }
                None
            }
            MetaNode::Literal { .. }
            | MetaNode::Wildcard { .. }
            | MetaNode::LanguageSpecific { .. } => None,
        }
    }
}

/// Determines whether a call name matches a source list.
fn matches_source(name: &str, patterns: &[&str]) -> bool {
    patterns.iter().any(|pattern| {
        if let Some(prefix) = pattern.strip_suffix('.') {
            name.starts_with(prefix) && name[prefix.len()..].starts_with('.')
        } else {
            name == *pattern
        }
    })
}

/// The taint analyzer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaintAnalyzer;

impl Analyzer for TaintAnalyzer {
    fn name(&self) -> &'static str {
        "taint"
    }

    fn analyze(&self, document: &Document) -> AnalysisReport {
        let mut walker = TaintWalker {
            language: document.language,
            tainted: HashMap::new(),
            flows: Vec::new(),
        };
        walker.walk(&document.ast);

        AnalysisReport::Taint(TaintResult {
            flows: walker.flows,
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    /// Runs the analyzer and unwraps the taint result.
    fn run(document: &Document) -> TaintResult {
        match TaintAnalyzer.analyze(document) {
            AnalysisReport::Taint(result) => result,
            other => panic!("expected a taint report, got {other:?}"),
        }
    }

    #[test]
    fn eval_of_input_is_critical() {
        let document = Document::new(
            MetaNode::call("eval", vec![MetaNode::call("input", vec![])]),
            Language::Python,
        );

        let result = run(&document);
        assert_eq!(result.flows.len(), 1);
        let flow = &result.flows[0];
        assert_eq!(flow.source, "input");
        assert_eq!(flow.sink, "eval");
        assert_eq!(flow.risk, Risk::Critical);
        assert_eq!(flow.path, ["input", "eval"]);
    }

    #[test]
    fn taint_propagates_through_assignments() {
        let document = Document::new(
            MetaNode::block(vec![
                MetaNode::assignment(
                    MetaNode::variable("name"),
                    MetaNode::call("input", vec![]),
                ),
                MetaNode::call(
                    "cursor.execute",
                    vec![MetaNode::arithmetic(
                        "+",
                        MetaNode::string("SELECT * FROM users WHERE name = "),
                        MetaNode::variable("name"),
                    )],
                ),
            ]),
            Language::Python,
        );

        let result = run(&document);
        assert_eq!(result.flows.len(), 1);
        let flow = &result.flows[0];
        assert_eq!(flow.risk, Risk::High);
        assert_eq!(flow.path, ["input", "name", "cursor.execute"]);
    }

    #[test]
    fn sanitizers_break_the_flow() {
        let document = Document::new(
            MetaNode::call(
                "eval",
                vec![MetaNode::call(
                    "shlex.quote",
                    vec![MetaNode::call("input", vec![])],
                )],
            ),
            Language::Python,
        );

        let result = run(&document);
        assert!(result.flows.is_empty());
    }

    #[test]
    fn clean_reassignment_clears_taint() {
        let document = Document::new(
            MetaNode::block(vec![
                MetaNode::assignment(
                    MetaNode::variable("value"),
                    MetaNode::call("gets", vec![]),
                ),
                MetaNode::assignment(MetaNode::variable("value"), MetaNode::integer(1)),
                MetaNode::call("eval", vec![MetaNode::variable("value")]),
            ]),
            Language::Ruby,
        );

        let result = run(&document);
        assert!(result.flows.is_empty());
    }
}
