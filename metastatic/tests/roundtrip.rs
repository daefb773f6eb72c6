//! Round-trip and containment properties across the adapters.

use metastatic::Language;
use metastatic::MetaNode;

/// Per-language sources inside the shared core subset.
fn core_sources(language: Language) -> &'static [&'static str] {
    match language {
        Language::Python => &[
            "x + 5",
            "x = 1\ny = x * 2",
            "if a: x = 1\nelse: x = 2",
            "while x < 10:\n    x = x + 1",
            "result = map(lambda v: v + 1, items)",
        ],
        Language::Elixir => &[
            "x + 5",
            "x = y * 2",
            "if x > 0 do\n  :pos\nelse\n  :neg\nend",
            "Enum.map(items, fn v -> v * 2 end)",
        ],
        Language::Erlang => &[
            "X + 5",
            "X = Y * 2",
            "case X of\n    1 -> one;\n    _ -> other\nend",
            "F = fun(V) -> V + 1 end",
        ],
        Language::Ruby => &[
            "x + 5",
            "x = y * 2",
            "if a\n  x = 1\nelse\n  x = 2\nend",
            "items.map { |v| v * 2 }",
        ],
        Language::Haskell => &[
            "x + 5",
            "double x = x * 2",
            "sign x = if x > 0 then 1 else -1",
            "evens = filter isEven numbers",
        ],
    }
}

#[test]
fn requoting_unquoted_source_is_a_fixed_point() {
    for language in Language::all() {
        for source in core_sources(*language) {
            let first = metastatic::quote(source, *language).expect(source);
            let unquoted = metastatic::unquote(&first.ast, *language).expect(source);
            let second = metastatic::quote(&unquoted, *language).expect(source);

            assert!(
                first.ast.structurally_equal(&second.ast),
                "{language}: round trip diverged for {source:?} (unquoted to {unquoted:?})"
            );
        }
    }
}

#[test]
fn abstraction_output_always_conforms_in_standard_mode() {
    use metastatic::ast::ValidationMode;
    use metastatic::ast::validate;

    for language in Language::all() {
        for source in core_sources(*language) {
            let document = metastatic::quote(source, *language).expect(source);
            let meta =
                validate(&document, ValidationMode::Standard).expect("standard mode accepts");
            assert!(meta.node_count >= 1);
        }
    }
}

#[test]
fn translating_there_and_back_is_a_fixed_point() {
    // Expression-level sources every adapter can render.
    let sources = ["x + 5", "f(1, 2)", "x == y"];
    let pairs = [
        (Language::Python, Language::Elixir),
        (Language::Python, Language::Ruby),
        (Language::Elixir, Language::Ruby),
        (Language::Python, Language::Haskell),
    ];

    for source in sources {
        for (a, b) in pairs {
            let original = metastatic::quote(source, a).expect(source);

            let there = metastatic::translate(source, a, b).expect(source);
            let back = metastatic::translate(&there, b, a).expect(source);
            let requoted = metastatic::quote(&back, a).expect(source);

            assert!(
                original.ast.structurally_equal(&requoted.ast),
                "{a} -> {b} -> {a} diverged for {source:?} (came back as {back:?})"
            );
        }
    }
}

#[test]
fn native_fragments_reify_only_under_their_own_language() {
    for owner in Language::all() {
        let node = MetaNode::language_specific(*owner, "opaque fragment", None);
        for target in Language::all() {
            let result = metastatic::unquote(&node, *target);
            if target == owner {
                assert!(
                    result.is_ok(),
                    "{owner} should re-embed its own fragment"
                );
            } else {
                assert!(
                    matches!(result, Err(metastatic::Error::Reify { .. })),
                    "{target} must reject a {owner} fragment"
                );
            }
        }
    }
}

#[test]
fn unmodeled_source_survives_a_same_language_round_trip() {
    let source = "import os\nx = 1";
    let document = metastatic::quote(source, Language::Python).unwrap();
    let unquoted = metastatic::unquote(&document.ast, Language::Python).unwrap();
    assert!(unquoted.contains("import os"));
    assert!(unquoted.contains("x = 1"));
}
