use std::sync::Arc;
use std::thread;

use ruleval::{Engine, Rule, Verdict};
use serde_json::json;

#[test]
fn evaluate_across_threads() {
    let rule = Arc::new(
        Rule::parse(
            "FOR: i=0:domino.size() IF: { domino[i].type == 10 && domino[i].dpEnabled == true }",
        )
        .unwrap(),
    );
    let engine = Arc::new(Engine::new());

    let inputs = vec![
        (
            json!({"domino": [{"type": 10, "dpEnabled": true}]}),
            vec![true],
        ),
        (
            json!({"domino": [
                {"type": 10, "dpEnabled": true},
                {"type": 9, "dpEnabled": true},
                {"type": 10, "dpEnabled": false},
                {"type": 9, "dpEnabled": false}
            ]}),
            vec![true, false, false, false],
        ),
        (json!({"domino": []}), vec![]),
        (
            json!({"domino": [{"type": 9, "dpEnabled": true}, {"type": 10, "dpEnabled": true}]}),
            vec![false, true],
        ),
    ];

    let mut handles = vec![];
    for (input, expected) in inputs {
        let rule = Arc::clone(&rule);
        let engine = Arc::clone(&engine);
        handles.push(thread::spawn(move || {
            let bytes = serde_json::to_vec(&input).unwrap();
            (engine.evaluate(&rule, &bytes).unwrap(), expected)
        }));
    }

    for handle in handles {
        let (verdict, expected) = handle.join().unwrap();
        assert_eq!(verdict, Verdict::Vector(expected));
    }
}

#[test]
fn many_threads_same_rule() {
    let rule = Arc::new(Rule::parse("IF: { amount >= 10000 }").unwrap());

    let handles: Vec<_> = (0..16_i64)
        .map(|t| {
            let rule = Arc::clone(&rule);
            thread::spawn(move || {
                let engine = Engine::new();
                (0..100_i64)
                    .map(|i| {
                        let amount = t * 1000 + i;
                        let verdict = engine
                            .evaluate_document(&rule, &json!({ "amount": amount }))
                            .unwrap();
                        verdict == Verdict::Scalar(amount >= 10000)
                    })
                    .all(|ok| ok)
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
}

#[test]
fn rule_and_engine_are_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Rule>();
    assert_send_sync::<Engine>();
}
