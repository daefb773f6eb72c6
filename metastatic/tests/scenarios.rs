//! End-to-end scenarios across the quote, unquote, and analysis pipelines.

use metastatic::AnalysisKind;
use metastatic::AnalysisReport;
use metastatic::Language;
use metastatic::MetaNode;
use metastatic::analysis::Effect;
use metastatic::analysis::Risk;
use pretty_assertions::assert_eq;

/// The `x + 5` reference tree.
fn sum() -> MetaNode {
    MetaNode::arithmetic("+", MetaNode::variable("x"), MetaNode::integer(5))
}

#[test]
fn quoting_arithmetic_yields_the_canonical_tree() {
    let document = metastatic::quote("x + 5", Language::Python).unwrap();
    assert!(document.ast.structurally_equal(&sum()));
}

#[test]
fn quoting_is_language_independent_on_the_shared_subset() {
    let python = metastatic::quote("x + 5", Language::Python).unwrap();
    let elixir = metastatic::quote("x + 5", Language::Elixir).unwrap();
    let erlang = metastatic::quote("x + 5", Language::Erlang).unwrap();
    let ruby = metastatic::quote("x + 5", Language::Ruby).unwrap();
    let haskell = metastatic::quote("x + 5", Language::Haskell).unwrap();

    assert!(python.ast.structurally_equal(&elixir.ast));
    assert!(python.ast.structurally_equal(&ruby.ast));
    assert!(python.ast.structurally_equal(&haskell.ast));

    // Erlang capitalizes variables; compare the shape instead.
    assert_eq!(erlang.ast.kind_name(), "binary_op");
}

#[test]
fn unquoting_the_canonical_tree_renders_each_language() {
    assert_eq!(metastatic::unquote(&sum(), Language::Python).unwrap(), "x + 5");
    assert_eq!(metastatic::unquote(&sum(), Language::Elixir).unwrap(), "x + 5");
    assert_eq!(metastatic::unquote(&sum(), Language::Ruby).unwrap(), "x + 5");
    assert_eq!(metastatic::unquote(&sum(), Language::Haskell).unwrap(), "x + 5");
    assert_eq!(
        metastatic::unquote(&sum(), Language::Erlang).unwrap(),
        "x + 5."
    );
}

#[test]
fn print_is_impure_with_an_io_effect() {
    let document = metastatic::quote("print(\"hi\")", Language::Python).unwrap();
    let AnalysisReport::Purity(result) =
        metastatic::analyze(&document, AnalysisKind::Purity).unwrap()
    else {
        panic!("expected a purity report");
    };

    assert!(!result.pure);
    assert_eq!(result.effects.iter().collect::<Vec<_>>(), [&Effect::Io]);
}

#[test]
fn a_two_way_branch_scores_cyclomatic_two() {
    let document = metastatic::quote("if a: x = 1\nelse: x = 2", Language::Python).unwrap();
    let AnalysisReport::Complexity(result) =
        metastatic::analyze(&document, AnalysisKind::Complexity).unwrap()
    else {
        panic!("expected a complexity report");
    };

    assert_eq!(result.cyclomatic, 2);
    assert_eq!(result.max_nesting, 1);
    assert_eq!(result.logical_loc, 3);
}

#[test]
fn eval_of_input_is_a_critical_flow() {
    let document = metastatic::quote("eval(input())", Language::Python).unwrap();
    let AnalysisReport::Taint(result) =
        metastatic::analyze(&document, AnalysisKind::Taint).unwrap()
    else {
        panic!("expected a taint report");
    };

    assert_eq!(result.flows.len(), 1);
    assert_eq!(result.flows[0].source, "input");
    assert_eq!(result.flows[0].sink, "eval");
    assert_eq!(result.flows[0].risk, Risk::Critical);
}

#[test]
fn unsupported_language_tags_are_rejected() {
    assert!(matches!(
        Language::parse_tag("cobol"),
        Err(metastatic::Error::UnsupportedLanguage(tag)) if tag == "cobol"
    ));
}

#[test]
fn extensions_detect_registered_languages() {
    let registry = metastatic::adapter_registry();
    assert_eq!(registry.detect_language("script.py"), Some(Language::Python));
    assert_eq!(registry.detect_language("app.exs"), Some(Language::Elixir));
    assert_eq!(registry.detect_language("file.xyz"), None);
}

#[test]
fn analysis_reports_serialize_with_their_tag() {
    let document = metastatic::quote("print(\"hi\")", Language::Python).unwrap();
    let report = metastatic::analyze(&document, AnalysisKind::Purity).unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["analysis"], "purity");
    assert_eq!(json["pure"], false);
    assert_eq!(json["effects"][0], "io");
}

#[test]
fn enrichment_feeds_the_purity_analysis() {
    let source = "MyApp.Repo.get(User, user_id)";
    let document = metastatic::quote(source, Language::Elixir).unwrap();
    let AnalysisReport::Purity(result) =
        metastatic::analyze(&document, AnalysisKind::Purity).unwrap()
    else {
        panic!("expected a purity report");
    };

    assert!(result.effects.contains(&Effect::Db));
}
