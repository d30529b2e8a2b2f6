use super::coerce::*;
use super::fallback::{dummy_exam_question, placeholder_image_url, ARABIC_APOLOGY};
use super::*;
use crate::flows::stub::ScriptedChat;
use crate::flows::{ExamQuestion, QuizQuestion};
use crate::llm::{ChatMessage, Role};
use serde_json::json;

fn quiz_question(question: &str, options: &[&str], answer: &str) -> QuizQuestion {
    QuizQuestion {
        question: question.to_string(),
        options: options.iter().map(|o| o.to_string()).collect(),
        answer: answer.to_string(),
    }
}

#[test]
fn extract_returns_none_without_braces() {
    assert_eq!(extract_json("sorry, no answer"), None);
    assert_eq!(extract_json("} backwards {"), None);
    assert_eq!(extract_json(""), None);
}

#[test]
fn extract_finds_object_inside_prose() {
    assert_eq!(extract_json("Sure! {\"a\":1} thanks"), Some(json!({"a": 1})));
    assert_eq!(
        extract_json("```json\n{\"questions\": [{\"q\": \"{x}\"}]}\n```"),
        Some(json!({"questions": [{"q": "{x}"}]}))
    );
}

#[test]
fn extract_takes_union_span_of_several_objects() {
    // First `{` to last `}` covers both objects, which is not valid JSON.
    assert_eq!(extract_json("{\"a\":1} and {\"b\":2}"), None);
}

#[test]
fn extract_invalid_span_is_none() {
    assert_eq!(extract_json("{not json}"), None);
}

#[test]
fn regex_and_array_extractors() {
    assert_eq!(extract_json_regex("x {\"a\":\n1} y"), Some(json!({"a": 1})));
    assert_eq!(extract_json_regex("nothing"), None);
    assert_eq!(extract_json_array("list: [1, 2] done"), Some(json!([1, 2])));
    assert_eq!(Extractor::Array.extract("{\"a\":1}"), None);
    assert_eq!(Extractor::default().extract("ok {\"a\":1}"), Some(json!({"a": 1})));
}

#[test]
fn object_or_array_prefers_object_then_list() {
    let both = "{\"questions\": [1]}";
    assert_eq!(Extractor::ObjectOrArray.extract(both), Some(json!({"questions": [1]})));

    let bare = "Here:\n[{\"q\": 1}, {\"q\": 2}]";
    assert_eq!(Extractor::Braces.extract(bare), None);
    assert_eq!(
        Extractor::ObjectOrArray.extract(bare),
        Some(json!([{"q": 1}, {"q": 2}]))
    );
    assert_eq!(Extractor::ObjectOrArray.extract("nothing here"), None);
}

#[test]
fn cycling_pad_keeps_originals_first() {
    let padded = pad_cycling(vec![1, 2, 3], 5);

    assert_eq!(padded.notes(), &[CoercionNote::PaddedCycling { from: 3, to: 5 }]);
    assert_eq!(padded.value(), Some(vec![1, 2, 3, 1, 2]));
}

#[test]
fn cycling_pad_rejects_empty_input() {
    assert_eq!(pad_cycling(Vec::<u8>::new(), 5).outcome(), ValidationOutcome::Failed);
}

#[test]
fn dummy_pad_appends_exact_count() {
    let dummy = dummy_exam_question();
    let real = ExamQuestion {
        question: "What colour is the sky?".to_string(),
        options: vec!["blue".to_string(), "green".to_string()],
        correct_answer: "blue".to_string(),
    };

    let padded = pad_with_dummy(vec![real.clone(); 97], 100, &dummy).value().unwrap();

    assert_eq!(padded.len(), 100);
    assert!(padded[..97].iter().all(|q| *q == real));
    assert_eq!(padded[97..].iter().filter(|q| **q == dummy).count(), 3);
}

#[test]
fn truncate_only_when_longer() {
    assert_eq!(truncate(vec![1, 2, 3], 5), Coerced::Valid(vec![1, 2, 3]));
    assert_eq!(
        truncate(vec![1, 2, 3, 4, 5, 6], 5),
        Coerced::Coerced(vec![1, 2, 3, 4, 5], vec![CoercionNote::Truncated { from: 6, to: 5 }])
    );
}

#[test]
fn unanswerable_question_is_dropped() {
    let items = vec![
        quiz_question("one", &["a", "b"], "a"),
        quiz_question("two", &["a", "b"], "c"),
        quiz_question("three", &["a", "b"], "b"),
    ];

    let kept = retain_answerable(items);

    assert_eq!(kept.notes().len(), 1);
    let names: Vec<_> = kept.value().unwrap().into_iter().map(|q| q.question).collect();
    assert_eq!(names, ["one", "three"]);
}

#[test]
fn long_option_lists_are_cut_before_answer_check() {
    let items = vec![quiz_question("q", &["a", "b", "c", "d", "e"], "e")];

    let result = cap_options(items, 4).and_then(retain_answerable);

    let (questions, notes) = result.into_result().unwrap();
    assert!(questions.is_empty());
    assert_eq!(
        notes[0],
        CoercionNote::OptionsTruncated {
            index: 0,
            from: 5,
            to: 4
        }
    );
    assert!(matches!(notes[1], CoercionNote::Dropped { index: 0, .. }));
}

#[test]
fn require_keys_lists_missing() {
    let payload = json!({"title": "x"});
    assert_eq!(
        require_keys(&payload, &["title", "content"]),
        Err(ValidationFailure::MissingKeys(vec!["content".to_string()]))
    );
    assert_eq!(require_keys(&json!([1]), &["a"]), Err(ValidationFailure::NotAnObject));
}

#[test]
fn builder_orders_system_history_user() {
    let messages = PromptBuilder::new("be kind")
        .history(vec![ChatMessage::user("hi"), ChatMessage::assistant("hello")])
        .user("how are you?")
        .build();

    let roles: Vec<_> = messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, [Role::System, Role::User, Role::Assistant, Role::User]);
    assert_eq!(messages[0].content, "be kind");
    assert_eq!(messages[3].content, "how are you?");
}

#[test]
fn placeholder_url_is_encoded() {
    assert_eq!(placeholder_image_url("https://p.test/?t=", "a red bus"), "https://p.test/?t=a%20red%20bus");
    assert_eq!(placeholder_image_url("https://p.test/?t=", " "), "https://p.test/?t=Image");
}

fn object_with_ok(payload: &serde_json::Value) -> Coerced<bool> {
    match payload.get("ok").and_then(|v| v.as_bool()) {
        Some(ok) => Coerced::Valid(ok),
        None => Coerced::Rejected("no ok flag".to_string()),
    }
}

#[tokio::test]
async fn run_records_valid_exchange() {
    let model = ScriptedChat::replying("Result: {\"ok\": true}");
    let pipeline = Pipeline::new("test", &model, 64);
    let exchange = AiExchange::from_builder(PromptBuilder::new("sys").user("go"));

    let outcome = pipeline
        .run(exchange, Extractor::Braces, object_with_ok, || false, UpstreamPolicy::Propagate)
        .await
        .unwrap();

    assert!(outcome.value);
    assert!(!outcome.is_fallback());
    assert_eq!(outcome.exchange.system_instruction(), "sys");
    assert_eq!(outcome.exchange.parsed_payload(), Some(&json!({"ok": true})));
    assert_eq!(outcome.exchange.validation_outcome(), Some(ValidationOutcome::Valid));
    assert_eq!(model.last_request().unwrap().max_tokens, Some(64));
}

#[tokio::test]
async fn run_falls_back_on_unparsable_reply() {
    let model = ScriptedChat::replying("I'd rather not.");
    let pipeline = Pipeline::new("test", &model, 64);
    let exchange = AiExchange::from_builder(PromptBuilder::new("sys").user("go"));

    let outcome = pipeline
        .run(exchange, Extractor::Braces, object_with_ok, || false, UpstreamPolicy::Propagate)
        .await
        .unwrap();

    assert!(!outcome.value);
    assert!(outcome.is_fallback());
    assert_eq!(outcome.exchange.parsed_payload(), None);
    assert_eq!(outcome.exchange.raw_response_text(), "I'd rather not.");
}

#[tokio::test]
async fn upstream_policy_decides_error_handling() {
    let model = ScriptedChat::new(vec![Err(503), Err(503)]);
    let pipeline = Pipeline::new("test", &model, 64);

    let propagated = pipeline
        .run(
            AiExchange::new(vec![]),
            Extractor::Braces,
            object_with_ok,
            || false,
            UpstreamPolicy::Propagate,
        )
        .await;
    assert_eq!(propagated.unwrap_err().status(), Some(503));

    let folded = pipeline
        .run(
            AiExchange::new(vec![]),
            Extractor::Braces,
            object_with_ok,
            || true,
            UpstreamPolicy::Fallback,
        )
        .await
        .unwrap();
    assert!(folded.value);
    assert!(folded.is_fallback());
}

#[tokio::test]
async fn text_or_fallback_trims_and_falls_back() {
    let model = ScriptedChat::new(vec![Ok("  hello \n"), Ok(""), Err(500)]);
    let pipeline = Pipeline::new("test", &model, 64);

    let first = pipeline.text_or_fallback(AiExchange::new(vec![]), ARABIC_APOLOGY).await;
    assert_eq!(first.value, "hello");

    let empty = pipeline.text_or_fallback(AiExchange::new(vec![]), ARABIC_APOLOGY).await;
    assert_eq!(empty.value, ARABIC_APOLOGY);
    assert!(empty.is_fallback());

    let failed = pipeline.text_or_fallback(AiExchange::new(vec![]), ARABIC_APOLOGY).await;
    assert_eq!(failed.value, ARABIC_APOLOGY);
}
