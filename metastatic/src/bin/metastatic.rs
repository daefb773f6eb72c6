//! The `metastatic` command line tool.

use std::fs;
use std::io::IsTerminal;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use clap_verbosity_flag::Verbosity;
use clap_verbosity_flag::WarnLevel;
use codespan_reporting::files::SimpleFile;
use codespan_reporting::term::Config;
use codespan_reporting::term::emit;
use codespan_reporting::term::termcolor::ColorChoice;
use codespan_reporting::term::termcolor::StandardStream;
use colored::Colorize;
use metastatic::AnalysisKind;
use metastatic::AnalysisReport;
use metastatic::Language;
use metastatic::ast::Diagnostic;
use metastatic::ast::Layer;
use metastatic::ast::LoopForm;
use metastatic::ast::MetaNode;
use metastatic::ast::ValidationMode;
use metastatic::ast::validate;
use tracing_log::AsTrace;

/// The exit code for failed translations or findings.
const EXIT_FINDINGS: u8 = 1;

/// The exit code for usage and I/O errors.
const EXIT_USAGE: u8 = 2;

/// Emits the given diagnostics to the output stream.
///
/// The use of color is determined by the presence of a terminal.
fn emit_diagnostics(path: &str, source: &str, diagnostics: &[Diagnostic]) -> Result<()> {
    let file = SimpleFile::new(path, source);
    let mut stream = StandardStream::stderr(if std::io::stderr().is_terminal() {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    });

    for diagnostic in diagnostics {
        emit(
            &mut stream,
            &Config::default(),
            &file,
            &diagnostic.to_codespan(),
        )
        .context("failed to emit diagnostic")?;
    }

    Ok(())
}

/// Reads source from the given path.
///
/// If the path is simply `-`, the source is read from STDIN.
fn read_source(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .context("failed to read source from stdin")?;
        Ok(source)
    } else {
        fs::read_to_string(path)
            .with_context(|| format!("failed to read source file `{path}`", path = path.display()))
    }
}

/// Resolves the language of a source file from an override or its
/// extension.
fn resolve_language(path: &Path, explicit: Option<Language>) -> Result<Language> {
    if let Some(language) = explicit {
        return Ok(language);
    }

    metastatic::adapter_registry()
        .detect_language(path)
        .with_context(|| {
            format!(
                "cannot detect the language of `{path}`; pass --language",
                path = path.display()
            )
        })
}

/// Quotes a file, emitting parse diagnostics on failure.
fn quote_file(path: &Path, language: Language) -> Result<Option<metastatic::Document>> {
    let source = read_source(path)?;
    match metastatic::quote(&source, language) {
        Ok(document) => Ok(Some(document)),
        Err(metastatic::Error::Parse(diagnostic)) => {
            emit_diagnostics(&path.to_string_lossy(), &source, &[diagnostic])?;
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Translates a source file between languages.
#[derive(Args)]
#[clap(disable_version_flag = true)]
pub struct TranslateCommand {
    /// The path to the source file, or a directory of sources.
    #[clap(value_name = "PATH")]
    pub path: PathBuf,

    /// The source language (auto-detected from the extension by default).
    #[clap(long, value_name = "LANG")]
    pub from: Option<Language>,

    /// The target language.
    #[clap(long, value_name = "LANG")]
    pub to: Language,

    /// The output path (required when translating a directory).
    #[clap(long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

impl TranslateCommand {
    /// Executes the `translate` subcommand.
    fn exec(self) -> Result<ExitCode> {
        if self.path.is_dir() {
            return self.exec_directory();
        }

        let language = resolve_language(&self.path, self.from)?;
        let Some(document) = quote_file(&self.path, language)? else {
            return Ok(ExitCode::from(EXIT_FINDINGS));
        };

        match metastatic::unquote(&document.ast, self.to) {
            Ok(translated) => {
                match &self.output {
                    Some(output) => fs::write(output, translated + "\n")
                        .with_context(|| {
                            format!("failed to write `{path}`", path = output.display())
                        })?,
                    None => println!("{translated}"),
                }
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => {
                eprintln!("{error}: {e}", error = "error".red().bold());
                Ok(ExitCode::from(EXIT_FINDINGS))
            }
        }
    }

    /// Translates every recognized file under a directory, preserving
    /// relative paths and renaming extensions.
    fn exec_directory(self) -> Result<ExitCode> {
        let Some(output_root) = &self.output else {
            bail!("translating a directory requires --output");
        };

        let target_ext = self.to.extensions()[0];
        let mut failures = 0usize;

        for entry in walkdir::WalkDir::new(&self.path) {
            let entry = entry.context("failed to walk the source directory")?;
            if !entry.file_type().is_file() {
                continue;
            }

            let Some(language) = metastatic::adapter_registry().detect_language(entry.path())
            else {
                continue;
            };

            let relative = entry
                .path()
                .strip_prefix(&self.path)
                .expect("entries live under the walk root");
            let destination = output_root.join(relative).with_extension(target_ext);

            let Some(document) = quote_file(entry.path(), language)? else {
                failures += 1;
                continue;
            };

            match metastatic::unquote(&document.ast, self.to) {
                Ok(translated) => {
                    if let Some(parent) = destination.parent() {
                        fs::create_dir_all(parent).with_context(|| {
                            format!("failed to create `{path}`", path = parent.display())
                        })?;
                    }
                    fs::write(&destination, translated + "\n").with_context(|| {
                        format!("failed to write `{path}`", path = destination.display())
                    })?;
                }
                Err(e) => {
                    eprintln!(
                        "{error}: {path}: {e}",
                        error = "error".red().bold(),
                        path = entry.path().display()
                    );
                    failures += 1;
                }
            }
        }

        if failures > 0 {
            return Ok(ExitCode::from(EXIT_FINDINGS));
        }

        Ok(ExitCode::SUCCESS)
    }
}

/// The output format of the `inspect` subcommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InspectFormat {
    /// An indented tree.
    Tree,
    /// The JSON form of the tree.
    Json,
    /// One node kind per line.
    Plain,
}

/// Inspects the MetaAST of a source file.
#[derive(Args)]
#[clap(disable_version_flag = true)]
pub struct InspectCommand {
    /// The path to the source file.
    #[clap(value_name = "PATH")]
    pub path: PathBuf,

    /// The output format.
    #[clap(long, value_enum, default_value = "tree")]
    pub format: InspectFormat,

    /// The highest layer the document is expected to use; exceeding nodes
    /// are reported as warnings.
    #[clap(long, value_name = "LAYER")]
    pub layer: Option<Layer>,

    /// Also print the referenced variables.
    #[clap(long)]
    pub variables: bool,

    /// Overrides language detection.
    #[clap(long, value_name = "LANG")]
    pub language: Option<Language>,
}

impl InspectCommand {
    /// Executes the `inspect` subcommand.
    fn exec(self) -> Result<ExitCode> {
        let language = resolve_language(&self.path, self.language)?;
        let Some(document) = quote_file(&self.path, language)? else {
            return Ok(ExitCode::from(EXIT_USAGE));
        };

        let mode = match self.layer {
            Some(Layer::Core) | Some(Layer::Extended) => ValidationMode::Strict,
            _ => ValidationMode::Standard,
        };
        let meta = match validate(&document, mode) {
            Ok(meta) => meta,
            Err(e) => {
                eprintln!("{error}: {e}", error = "error".red().bold());
                return Ok(ExitCode::from(EXIT_USAGE));
            }
        };

        if let Some(source) = &document.original_source {
            emit_diagnostics(&self.path.to_string_lossy(), source, &meta.warnings)?;
        }

        match self.format {
            InspectFormat::Tree => {
                let mut lines = Vec::new();
                render_tree(&document.ast, 0, &mut lines);
                println!("{lines}", lines = lines.join("\n"));
            }
            InspectFormat::Json => {
                println!("{json}", json = serde_json::to_string_pretty(&document.ast)?)
            }
            InspectFormat::Plain => {
                let mut lines = Vec::new();
                render_plain(&document.ast, &mut lines);
                println!("{lines}", lines = lines.join("\n"));
            }
        }

        println!(
            "{summary}: level {level}, depth {depth}, {count} nodes",
            summary = "summary".bold(),
            level = meta.level,
            depth = meta.depth,
            count = meta.node_count
        );

        if self.variables {
            let variables: Vec<_> = meta.variables.iter().cloned().collect();
            println!(
                "{label}: {variables}",
                label = "variables".bold(),
                variables = variables.join(", ")
            );
        }

        Ok(ExitCode::SUCCESS)
    }
}

/// Renders an indented tree view.
fn render_tree(node: &MetaNode, indent: usize, lines: &mut Vec<String>) {
    let pad = "  ".repeat(indent);
    lines.push(format!("{pad}{label}", label = node_label(node)));
    for child in node.children() {
        render_tree(child, indent + 1, lines);
    }
}

/// Renders a flat one-node-per-line view.
fn render_plain(node: &MetaNode, lines: &mut Vec<String>) {
    lines.push(node_label(node));
    for child in node.children() {
        render_plain(child, lines);
    }
}

/// Builds a short label for a node.
fn node_label(node: &MetaNode) -> String {
    match node {
        MetaNode::Literal { subtype, value, .. } => {
            format!("literal({subtype}, {value})", value = value.as_text())
        }
        MetaNode::Variable { name, .. } => format!("variable({name})"),
        MetaNode::BinaryOp { category, op, .. } => format!("binary_op({category}, {op})"),
        MetaNode::UnaryOp { op, .. } => format!("unary_op({op})"),
        MetaNode::FunctionCall { name, .. } => format!("function_call({name})"),
        MetaNode::Loop { form, .. } => {
            let kind = match form {
                LoopForm::While { .. } => "while",
                LoopForm::For { .. } => "for",
                LoopForm::ForEach { .. } => "for_each",
            };
            format!("loop({kind})")
        }
        MetaNode::CollectionOp { kind, .. } => format!("collection_op({kind})"),
        MetaNode::AsyncOperation { kind, .. } => format!("async_operation({kind})"),
        MetaNode::LanguageSpecific { language, hint, .. } => match hint {
            Some(hint) => format!("language_specific({language}, {hint})"),
            None => format!("language_specific({language})"),
        },
        other => other.kind_name().to_string(),
    }
}

/// The output format of the analysis subcommands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable text.
    Text,
    /// JSON.
    Json,
}

/// Checks a source file for taint flows.
#[derive(Args)]
#[clap(disable_version_flag = true)]
pub struct TaintCheckCommand {
    /// The path to the source file.
    #[clap(value_name = "PATH")]
    pub path: PathBuf,

    /// The output format.
    #[clap(long, value_enum, default_value = "text")]
    pub format: ReportFormat,

    /// Overrides language detection.
    #[clap(long, value_name = "LANG")]
    pub language: Option<Language>,
}

impl TaintCheckCommand {
    /// Executes the `taint-check` subcommand.
    fn exec(self) -> Result<ExitCode> {
        let language = resolve_language(&self.path, self.language)?;
        let Some(document) = quote_file(&self.path, language)? else {
            return Ok(ExitCode::from(EXIT_USAGE));
        };

        let report = metastatic::analyze(&document, AnalysisKind::Taint)?;
        let AnalysisReport::Taint(result) = &report else {
            unreachable!("the taint analyzer produces taint reports");
        };

        match self.format {
            ReportFormat::Json => {
                println!("{json}", json = serde_json::to_string_pretty(&report)?)
            }
            ReportFormat::Text => {
                for flow in &result.flows {
                    println!(
                        "{risk}: {source} reaches {sink} via {path}\n  {hint}",
                        risk = flow.risk.to_string().red().bold(),
                        source = flow.source,
                        sink = flow.sink,
                        path = flow.path.join(" -> "),
                        hint = flow.recommendation
                    );
                }
                if result.flows.is_empty() {
                    println!("no taint flows found");
                }
            }
        }

        if result.has_flows() {
            return Ok(ExitCode::from(EXIT_FINDINGS));
        }

        Ok(ExitCode::SUCCESS)
    }
}

/// Reports complexity metrics for a source file.
#[derive(Args)]
#[clap(disable_version_flag = true)]
pub struct ComplexityCommand {
    /// The path to the source file.
    #[clap(value_name = "PATH")]
    pub path: PathBuf,

    /// The output format.
    #[clap(long, value_enum, default_value = "text")]
    pub format: ReportFormat,

    /// Overrides language detection.
    #[clap(long, value_name = "LANG")]
    pub language: Option<Language>,
}

impl ComplexityCommand {
    /// Executes the `complexity` subcommand.
    fn exec(self) -> Result<ExitCode> {
        let language = resolve_language(&self.path, self.language)?;
        let Some(document) = quote_file(&self.path, language)? else {
            return Ok(ExitCode::from(EXIT_USAGE));
        };

        let report = metastatic::analyze(&document, AnalysisKind::Complexity)?;
        let AnalysisReport::Complexity(result) = &report else {
            unreachable!("the complexity analyzer produces complexity reports");
        };

        match self.format {
            ReportFormat::Json => {
                println!("{json}", json = serde_json::to_string_pretty(&report)?)
            }
            ReportFormat::Text => {
                println!(
                    "cyclomatic {cyclomatic}, cognitive {cognitive}, nesting {nesting}, \
                     logical loc {loc}",
                    cyclomatic = result.cyclomatic,
                    cognitive = result.cognitive,
                    nesting = result.max_nesting,
                    loc = result.logical_loc
                );
                for function in &result.functions {
                    println!(
                        "  {name}: cyclomatic {cyclomatic}, cognitive {cognitive}",
                        name = function.name,
                        cyclomatic = function.cyclomatic,
                        cognitive = function.cognitive
                    );
                }
                for warning in &result.warnings {
                    println!("{warn}: {warning}", warn = "warning".yellow().bold());
                }
            }
        }

        if !result.warnings.is_empty() {
            return Ok(ExitCode::from(EXIT_FINDINGS));
        }

        Ok(ExitCode::SUCCESS)
    }
}

/// Reports the purity classification of a source file.
#[derive(Args)]
#[clap(disable_version_flag = true)]
pub struct PurityCommand {
    /// The path to the source file.
    #[clap(value_name = "PATH")]
    pub path: PathBuf,

    /// The output format.
    #[clap(long, value_enum, default_value = "text")]
    pub format: ReportFormat,

    /// Overrides language detection.
    #[clap(long, value_name = "LANG")]
    pub language: Option<Language>,
}

impl PurityCommand {
    /// Executes the `purity` subcommand.
    fn exec(self) -> Result<ExitCode> {
        let language = resolve_language(&self.path, self.language)?;
        let Some(document) = quote_file(&self.path, language)? else {
            return Ok(ExitCode::from(EXIT_USAGE));
        };

        let report = metastatic::analyze(&document, AnalysisKind::Purity)?;
        let AnalysisReport::Purity(result) = &report else {
            unreachable!("the purity analyzer produces purity reports");
        };

        match self.format {
            ReportFormat::Json => {
                println!("{json}", json = serde_json::to_string_pretty(&report)?)
            }
            ReportFormat::Text => {
                let effects: Vec<_> = result.effects.iter().map(ToString::to_string).collect();
                println!(
                    "pure: {pure} (confidence {confidence})",
                    pure = result.pure,
                    confidence = result.confidence
                );
                if !effects.is_empty() {
                    println!("effects: {effects}", effects = effects.join(", "));
                }
                if !result.unknown.is_empty() {
                    println!("unknown: {unknown}", unknown = result.unknown.join(", "));
                }
            }
        }

        if !result.pure {
            return Ok(ExitCode::from(EXIT_FINDINGS));
        }

        Ok(ExitCode::SUCCESS)
    }
}

/// The `metastatic` subcommands.
#[derive(Subcommand)]
enum Command {
    /// Translates source between languages through the MetaAST.
    Translate(TranslateCommand),
    /// Prints the MetaAST of a source file.
    Inspect(InspectCommand),
    /// Checks a source file for taint flows.
    TaintCheck(TaintCheckCommand),
    /// Reports complexity metrics.
    Complexity(ComplexityCommand),
    /// Reports the purity classification.
    Purity(PurityCommand),
}

/// The command line application.
#[derive(Parser)]
#[clap(
    bin_name = "metastatic",
    version,
    propagate_version = true,
    arg_required_else_help = true
)]
struct App {
    /// The subcommand to run.
    #[command(subcommand)]
    command: Command,

    /// The verbosity flags.
    #[command(flatten)]
    verbosity: Verbosity<WarnLevel>,
}

fn main() -> ExitCode {
    let app = App::parse();

    tracing_subscriber::fmt()
        .with_max_level(app.verbosity.log_level_filter().as_trace())
        .with_writer(std::io::stderr)
        .init();

    let result = match app.command {
        Command::Translate(cmd) => cmd.exec(),
        Command::Inspect(cmd) => cmd.exec(),
        Command::TaintCheck(cmd) => cmd.exec(),
        Command::Complexity(cmd) => cmd.exec(),
        Command::Purity(cmd) => cmd.exec(),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{error}: {e:?}", error = "error".red().bold());
            ExitCode::from(EXIT_USAGE)
        }
    }
}
