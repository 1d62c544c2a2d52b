use ruleval::{parse, Condition, Operator, ParseError, Rule, ScalarCondition, ScalarRule};

fn body(rule: &Rule) -> &ScalarCondition {
    match rule {
        Rule::Scalar(ScalarRule {
            condition: Condition::Scalar(c),
            ..
        }) => c,
        other => panic!("expected a scalar rule with a scalar condition, got {other:?}"),
    }
}

#[test]
fn parse_transaction_rule() {
    let rule = parse(r#"IF: { amount >= 10000 && type == "CREDIT_CARD" } THEN: { }"#).unwrap();
    let root = body(&rule);
    assert_eq!(root.operator(), Operator::And);
    assert_eq!(
        rule.to_string(),
        r#"IF: { amount >= 10000 && type == "CREDIT_CARD" } THEN: { }"#
    );
}

#[test]
fn parse_accepts_newlines_and_tabs() {
    let rule = parse("IF:\n{\n\ta == 1\n\t&& b == 2\n}\nTHEN: {\n}\n").unwrap();
    assert_eq!(rule, parse("IF: { a == 1 && b == 2 }").unwrap());
}

#[test]
fn glued_braces_are_split() {
    let rule = parse("IF: {a == 1 && b == true}").unwrap();
    assert_eq!(rule, parse("IF: { a == 1 && b == true }").unwrap());
}

#[test]
fn comparisons_bind_tighter_than_logic() {
    let rule = parse("IF: { x > 1 || y < 2 }").unwrap();
    let ScalarCondition::Binary { operator, lhs, rhs } = body(&rule) else {
        panic!("expected binary root");
    };
    assert_eq!(*operator, Operator::Or);
    assert_eq!(lhs.operator(), Operator::Gt);
    assert_eq!(rhs.operator(), Operator::Lt);
}

#[test]
fn all_operators_parse() {
    for op in ["==", ">=", ">", "<=", "<", "&&", "||"] {
        let rule = parse(&format!("IF: {{ a {op} b }}")).unwrap();
        assert_eq!(body(&rule).operator().token(), op);
    }
}

#[test]
fn parse_vector_rule_with_vector_condition() {
    let text = "FOR: i=0:rows.size() IF: { FOR: j=0:rows[i].cells.size() { rows[i].cells[j] > 0 } } THEN: { }";
    let rule = parse(text).unwrap();
    assert!(rule.is_vector());
    assert_eq!(rule.to_string(), text);
}

#[test]
fn display_round_trips() {
    for text in [
        "IF: { enabled }",
        "IF: { a == 10 && c == true }",
        "IF: { t == 5.9 || t < -1 }",
        "IF: { FOR: i=0:domino.size() { domino[i].type == 10 } }",
        "FOR: i=2:domino.size() IF: { domino[i].type == 1 && domino[i+1] == 0 }",
        "IF: { x == +inf || x == -nan || x == 1e400 || x == +infinity }",
    ] {
        let rule = parse(text).unwrap();
        let again = parse(&rule.to_string()).unwrap();
        assert_eq!(rule, again, "round trip failed for {text}");
    }
}

#[test]
fn structured_form_is_stable() {
    let text = "FOR: i=0:domino.size() IF: { domino[i].type == 10 && domino[i].dpEnabled == true }";
    let first = serde_json::to_string(&parse(text).unwrap()).unwrap();
    let second = serde_json::to_string(&parse(text).unwrap()).unwrap();
    assert_eq!(first, second);

    let restored: Rule = serde_json::from_str(&first).unwrap();
    assert_eq!(restored, parse(text).unwrap());
}

#[test]
fn malformed_leftover_operand() {
    assert!(matches!(
        parse("IF: { a == 10 && c == true extrajunk}"),
        Err(ParseError::MalformedRule { .. })
    ));
}

#[test]
fn missing_opening_brace() {
    let err = parse("IF:").unwrap_err();
    assert_eq!(
        err,
        ParseError::Syntax {
            expected: "{".to_owned(),
            found: "end of input".to_owned(),
            position: 3,
        }
    );
    assert_eq!(
        err.to_string(),
        "syntax error at offset 3: expected {, found end of input"
    );
}

#[test]
fn wrong_token_reports_position() {
    assert_eq!(
        parse("IF: a == 1 }"),
        Err(ParseError::Syntax {
            expected: "{".to_owned(),
            found: "a".to_owned(),
            position: 4,
        })
    );
}

#[test]
fn unknown_leading_token() {
    for text in ["JUNK: ( )", "THEN: { }", "{ a == 1 }", "a == 1"] {
        assert!(
            matches!(parse(text), Err(ParseError::MalformedRule { .. })),
            "expected malformed for {text}"
        );
    }
}

#[test]
fn vector_condition_missing_for() {
    // a braced group that does not open with FOR: is not a term
    assert!(parse("IF: { { a == 1 } }").is_err());
}

#[test]
fn from_str_and_parse_agree() {
    let text = "IF: { a <= 3 }";
    let via_from_str: Rule = text.parse().unwrap();
    assert_eq!(via_from_str, parse(text).unwrap());
    assert_eq!(Rule::parse(text).unwrap(), via_from_str);
}

#[test]
fn from_file_reads_and_parses() {
    let dir = std::env::temp_dir().join("ruleval_test_dsl_parse");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("domino.rule");
    std::fs::write(
        &path,
        "FOR: i=0:domino.size()\nIF: { domino[i].type == 10 }\nTHEN: { }\n",
    )
    .unwrap();

    let rule = Rule::from_file(&path).unwrap();
    assert!(rule.is_vector());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn from_file_missing_is_io_error() {
    let result = Rule::from_file("/definitely/not/a/real/path.rule");
    assert!(matches!(result, Err(ruleval::RulevalError::Io(_))));
}
