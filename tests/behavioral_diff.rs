//! End-to-end behavior of `behavioral_diff`: cosmetic edits vanish, behavioral edits show up as
//! `-`/`+` records of the canonical lines.

use bdiff::bdiff::lexing::LexErrorKind;
use bdiff::{behavioral_diff, CanonicalError, ChangeOp, ChangeRecord, DiffError, Side};
use proptest::prelude::*;
use rstest::rstest;

fn rendered(before: &str, after: &str) -> Vec<String> {
    behavioral_diff(before, after, "python")
        .unwrap()
        .iter()
        .map(ToString::to_string)
        .collect()
}

#[test]
fn docstring_only_change_is_not_behavioral() {
    let before = r#"
def area(w, h):
    """Compute the area."""
    return w * h
"#;
    let after = r#"
def area(w, h):
    """
    Compute the area of a rectangle.

    Both sides must be positive.
    """
    return w * h
"#;
    assert_eq!(behavioral_diff(before, after, "python"), Ok(vec![]));
}

#[test]
fn changed_constant_in_return() {
    let records = behavioral_diff(
        "def f(x):\n    return x+1\n",
        "def f(x):\n    return x+2\n",
        "python",
    )
    .unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].op, ChangeOp::Remove);
    assert_eq!(records[0].side, Side::Before);
    assert_eq!(records[0].text, "return x + 1");
    assert_eq!(records[1].op, ChangeOp::Add);
    assert_eq!(records[1].side, Side::After);
    assert_eq!(records[1].text, "return x + 2");
}

#[test]
fn unterminated_string_is_a_lex_error() {
    let err = behavioral_diff("s = 'abc\n", "s = 'abc'\n", "python").unwrap_err();
    match err {
        DiffError::Canonicalize {
            side: Side::Before,
            source: CanonicalError::Lex(lex),
        } => {
            assert_eq!(lex.kind, LexErrorKind::UnterminatedString);
            assert_eq!(lex.position.line, 1);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[rstest]
#[case::comment_added("x = 1\n", "x = 1  # one\n# trailing note\n")]
#[case::blank_lines("a = 1\nb = 2\n", "a = 1\n\n\n\nb = 2\n")]
#[case::reindented("if a:\n  b()\n", "if a:\n        b()\n")]
#[case::quote_style("s = 'x'\n", "s = \"x\"\n")]
#[case::redundant_parentheses("y = a + b * c\n", "y = (a + (b * c))\n")]
#[case::numeric_spelling("n = 255\n", "n = 0xff\n")]
#[case::semicolons("a = 1\nb = 2\n", "a = 1; b = 2\n")]
#[case::bracket_continuation("t = [1, 2, 3]\n", "t = [\n    1,\n    2,\n    3,\n]\n")]
#[case::backslash_continuation("z = 1 + 2\n", "z = 1 + \\\n    2\n")]
#[case::class_docstring(
    "class A:\n    'old'\n    x = 1\n",
    "class A:\n    \"\"\"new\n    text\"\"\"\n    x = 1\n"
)]
#[case::module_docstring("'''v1'''\nimport os\n", "'''v2'''\nimport os\n")]
#[case::empty_class_parentheses("class A():\n    pass\n", "class A:\n    pass\n")]
#[case::elif_spelling(
    "if a:\n    f()\nelse:\n    if b:\n        g()\n",
    "if a:\n    f()\nelif b:\n    g()\n"
)]
#[case::backslash_after_keyword("y = not x\n", "y = not \\\nx\n")]
#[case::backslash_after_return(
    "def f(x):\n    return x\n",
    "def f(x):\n    return \\\n        x\n"
)]
#[case::backslash_in_boolean("c = a or b\n", "c = a or \\\n    b\n")]
#[case::lone_carriage_returns("if a:\n    b()\n", "if a:\r    b()  # call\r")]
#[case::fstring_quote_style("x = f'{a}'\n", "x = f\"{a}\"\n")]
#[case::fstring_field_spacing("x = f'{a+b}'\n", "x = f'{ a + b }'\n")]
#[case::fstring_concatenation("x = f'a{b}c'\n", "x = 'a' f'{b}' \"c\"\n")]
#[case::named_escape("s = '\u{2022}'\n", "s = '\\N{BULLET}'\n")]
#[case::match_layout(
    "match p:\n    case [a, b]:\n        pass\n",
    "match p:\n    case (a,b):  # pair\n        pass\n"
)]
#[case::type_alias_spacing("type X=int\n", "type X = int\n")]
fn cosmetic_edits_produce_no_records(#[case] before: &str, #[case] after: &str) {
    assert_eq!(rendered(before, after), Vec::<String>::new());
}

#[rstest]
#[case::operator("r = a + b\n", "r = a - b\n", &["-r = a + b", "+r = a - b"])]
#[case::comparison("ok = n < 3\n", "ok = n <= 3\n", &["-ok = n < 3", "+ok = n <= 3"])]
#[case::boolean("c = p and q\n", "c = p or q\n", &["-c = p and q", "+c = p or q"])]
#[case::string_content("print('hi')\n", "print('bye')\n", &["-print('hi')", "+print('bye')"])]
#[case::renamed("total = 0\n", "count = 0\n", &["-total = 0", "+count = 0"])]
#[case::unary("y = -x\n", "y = x\n", &["-y = -x", "+y = x"])]
#[case::fstring_at_body_head(
    "def f():\n    f\"{a()}\"\n    return 1\n",
    "def f():\n    f\"{b()}\"\n    return 1\n",
    &["-f'{a()}'", "+f'{b()}'"]
)]
#[case::fstring_at_module_head("f\"{launch()}\"\nx = 1\n", "x = 1\n", &["-f'{launch()}'"])]
#[case::bytes_at_module_head("b'v1'\nx = 1\n", "b'v2'\nx = 1\n", &["-b'v1'", "+b'v2'"])]
#[case::named_escape_versus_backslash(
    "s = '\\N{BULLET}'\n",
    "s = '\\\\N{BULLET}'\n",
    &["-s = '\u{2022}'", "+s = '\\\\N{BULLET}'"]
)]
#[case::distinct_surrogates(
    "s = '\\ud800'\n",
    "s = '\\udfff'\n",
    &["-s = '\\ud800'", "+s = '\\udfff'"]
)]
#[case::fstring_field(
    "x = f'{a}'\n",
    "x = f'{b}'\n",
    &["-x = f'{a}'", "+x = f'{b}'"]
)]
#[case::match_case("match p:\n    case 1:\n        pass\n", "match p:\n    case 2:\n        pass\n", &["-case 1:", "+case 2:"])]
fn behavioral_edits_produce_records(
    #[case] before: &str,
    #[case] after: &str,
    #[case] expected: &[&str],
) {
    assert_eq!(rendered(before, after), expected);
}

#[test]
fn added_statement_is_a_single_addition() {
    assert_eq!(
        behavioral_diff("a = 1\nb = 2\n", "a = 1\nc = 3\nb = 2\n", "python").unwrap(),
        vec![ChangeRecord::added("c = 3")]
    );
}

#[test]
fn removed_statement_is_a_single_removal() {
    assert_eq!(
        rendered("a = 1\nlog(a)\nb = 2\n", "a = 1\nb = 2\n"),
        vec!["-log(a)"]
    );
}

#[test]
fn string_statement_after_code_is_behavioral() {
    assert_eq!(
        rendered("x = 1\n'note'\n", "x = 1\n'other'\n"),
        vec!["-'note'", "+'other'"]
    );
}

#[test]
fn parse_error_never_yields_a_partial_diff() {
    let result = behavioral_diff("x = 1\n", "def broken(:\n    pass\n", "python");
    assert!(matches!(
        result,
        Err(DiffError::Canonicalize {
            side: Side::After,
            source: CanonicalError::Parse(_)
        })
    ));
}

#[test]
fn language_alias_is_accepted() {
    assert_eq!(behavioral_diff("a = 1\n", "a = 1\n", "py"), Ok(vec![]));
}

fn statements() -> impl Strategy<Value = Vec<(String, u32)>> {
    prop::collection::vec(("[a-z]{1,6}", 0u32..1000), 1..8)
        .prop_map(|items| items.into_iter().map(|(name, n)| (format!("v_{name}"), n)).collect())
}

fn render(statements: &[(String, u32)]) -> String {
    statements
        .iter()
        .map(|(name, value)| format!("{name} = {value}\n"))
        .collect()
}

proptest! {
    #[test]
    fn diff_is_deterministic(before in statements(), after in statements()) {
        let (before, after) = (render(&before), render(&after));
        let first = behavioral_diff(&before, &after, "python");
        let second = behavioral_diff(&before, &after, "python");
        prop_assert_eq!(first, second);
    }

    #[test]
    fn identical_sources_have_no_records(statements in statements()) {
        let source = render(&statements);
        prop_assert_eq!(behavioral_diff(&source, &source, "python"), Ok(vec![]));
    }

    #[test]
    fn backslash_continuations_are_ignored(statements in statements()) {
        let before = render(&statements);
        let after: String = statements
            .iter()
            .map(|(name, value)| format!("{name} = \\\n    {value}\n"))
            .collect();
        prop_assert_eq!(behavioral_diff(&before, &after, "python"), Ok(vec![]));
    }

    #[test]
    fn inserted_comments_are_ignored(
        statements in statements(),
        comments in prop::collection::vec("[a-zA-Z0-9 ]{0,20}", 1..8),
    ) {
        let before = render(&statements);
        let mut after = String::new();
        for (index, (name, value)) in statements.iter().enumerate() {
            let comment = &comments[index % comments.len()];
            after.push_str(&format!("# {comment}\n{name}   =   {value}  # {comment}\n\n"));
        }
        prop_assert_eq!(behavioral_diff(&before, &after, "python"), Ok(vec![]));
    }
}
