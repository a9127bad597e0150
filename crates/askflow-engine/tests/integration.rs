//! End-to-end integration tests for the askflow engine.
//!
//! Each test exercises the public API: build manifest -> build script -> ask
//! through a scripted prompter -> verify the result tree and the prompt order.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::json;

use askflow_engine::{
    classify_all, parse_script, validate, AskflowError, Engine, GroupKeyStyle, Prompter,
    ResolverConfig, ScriptEntry, ScriptedPrompter, Severity,
};

const DEMO_MANIFEST: &str = include_str!("../../../demos/favorites/manifest.json");
const DEMO_SCRIPT: &str = include_str!("../../../demos/favorites/script.json");
const DEMO_ANSWERS: &str = include_str!("../../../demos/favorites/answers.json");

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn demo_manifest() -> serde_json::Value {
    serde_json::from_str(DEMO_MANIFEST).expect("demo manifest is JSON")
}

fn demo_script() -> Vec<ScriptEntry> {
    parse_script(serde_json::from_str(DEMO_SCRIPT).expect("demo script is JSON"))
        .expect("demo script is a list")
}

/// Build an engine over `manifest` that answers from `prompter`.
fn engine_with(manifest: serde_json::Value, prompter: Arc<ScriptedPrompter>) -> Engine {
    Engine::from_value(manifest)
        .expect("manifest should be valid")
        .with_prompter(prompter)
}

fn pets() -> serde_json::Value {
    json!({
        "animalChoice": {"type": "list", "message": "Dog or cat?", "choices": ["dog", "cat"]},
        "favoriteDogType": {"type": "input", "message": "Dog type?"},
        "favoriteCatType": {"type": "input", "message": "Cat type?"}
    })
}

fn pet_fork() -> ScriptEntry {
    ScriptEntry::fork("animalChoice", |answer| {
        if answer == "dog" {
            vec!["favoriteDogType".into()]
        } else {
            vec!["favoriteCatType".into()]
        }
    })
}

// ---------------------------------------------------------------------------
// Flat leaves
// ---------------------------------------------------------------------------

#[tokio::test]
async fn flat_leaves_map_each_identifier_to_its_answer() {
    let prompter = Arc::new(ScriptedPrompter::new([("a", json!("X")), ("b", json!("Y"))]));
    let engine = engine_with(
        json!({"a": {"message": "A?"}, "b": {"message": "B?"}}),
        prompter.clone(),
    );

    let tree = engine.ask(&["a".into(), "b".into()]).await.unwrap();

    assert_eq!(tree.to_json(), json!({"a": "X", "b": "Y"}));
    assert_eq!(tree.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    assert_eq!(prompter.asked(), vec!["a", "b"]);
}

// ---------------------------------------------------------------------------
// Forks
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fork_nests_pivot_answer_with_follow_ups() {
    let prompter = Arc::new(ScriptedPrompter::new([
        ("animalChoice", json!("dog")),
        ("favoriteDogType", json!("Shepherd")),
    ]));
    let engine = engine_with(pets(), prompter.clone());

    let tree = engine.ask(&[pet_fork()]).await.unwrap();

    assert_eq!(
        tree.to_json(),
        json!({"animalChoice": {"_answer": "dog", "favoriteDogType": "Shepherd"}})
    );
    assert_eq!(prompter.asked(), vec!["animalChoice", "favoriteDogType"]);
}

#[tokio::test]
async fn fork_takes_other_branch_for_other_answer() {
    let prompter = Arc::new(ScriptedPrompter::new([
        ("animalChoice", json!("cat")),
        ("favoriteCatType", json!("Bengal")),
    ]));
    let engine = engine_with(pets(), prompter.clone());

    let tree = engine.ask(&[pet_fork()]).await.unwrap();

    let fork = tree.subtree("animalChoice").expect("fork subtree");
    assert_eq!(fork.answer("_answer"), Some(&json!("cat")));
    assert_eq!(fork.answer("favoriteCatType"), Some(&json!("Bengal")));
    assert!(!fork.contains_key("favoriteDogType"));
}

#[tokio::test]
async fn branch_is_evaluated_exactly_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let fork = ScriptEntry::fork("animalChoice", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        vec![]
    });
    let prompter = Arc::new(ScriptedPrompter::new([("animalChoice", json!("dog"))]));
    let engine = engine_with(pets(), prompter);

    engine.ask(&[fork]).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn nested_forks_resolve_depth_first() {
    let manifest = json!({
        "outer": {"message": "Outer?"},
        "inner": {"message": "Inner?"},
        "leaf": {"message": "Leaf?"},
        "after": {"message": "After?"}
    });
    let prompter = Arc::new(ScriptedPrompter::new([
        ("outer", json!(1)),
        ("inner", json!(2)),
        ("leaf", json!(3)),
        ("after", json!(4)),
    ]));
    let engine = engine_with(manifest, prompter.clone());
    let script = vec![
        ScriptEntry::fork("outer", |_| {
            vec![ScriptEntry::fork("inner", |_| vec!["leaf".into()])]
        }),
        "after".into(),
    ];

    let tree = engine.ask(&script).await.unwrap();

    assert_eq!(
        tree.to_json(),
        json!({
            "outer": {"_answer": 1, "inner": {"_answer": 2, "leaf": 3}},
            "after": 4
        })
    );
    assert_eq!(prompter.asked(), vec!["outer", "inner", "leaf", "after"]);
}

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

#[tokio::test]
async fn group_answers_live_in_their_own_subtree() {
    let prompter = Arc::new(ScriptedPrompter::new([
        ("a", json!(1)),
        ("b", json!(2)),
        ("c", json!(3)),
    ]));
    let engine = engine_with(json!({"a": {}, "b": {}, "c": {}}), prompter.clone());
    let script = vec![
        "a".into(),
        ScriptEntry::group([ScriptEntry::name("c"), ScriptEntry::name("b")]),
    ];

    let tree = engine.ask(&script).await.unwrap();

    let group = tree.subtree("#1").expect("group subtree");
    assert_eq!(group.keys().collect::<Vec<_>>(), vec!["c", "b"]);
    assert!(!tree.contains_key("b"));
    assert_eq!(prompter.asked(), vec!["a", "c", "b"]);
}

#[tokio::test]
async fn joined_group_keys_are_content_derived() {
    let prompter = Arc::new(ScriptedPrompter::new([("a", json!(1)), ("b", json!(2))]));
    let engine = engine_with(json!({"a": {}, "b": {}}), prompter).with_config(ResolverConfig {
        group_keys: GroupKeyStyle::Joined,
        ..ResolverConfig::default()
    });

    let tree = engine
        .ask(&[ScriptEntry::group([ScriptEntry::name("a"), ScriptEntry::name("b")])])
        .await
        .unwrap();

    assert_eq!(tree.to_json(), json!({"#a,b": {"a": 1, "b": 2}}));
}

#[tokio::test]
async fn scalar_entries_are_skipped() {
    let prompter = Arc::new(ScriptedPrompter::new([("a", json!(1))]));
    let engine = engine_with(json!({"a": {}}), prompter.clone());
    let script = parse_script(json!([42, "a", null])).unwrap();

    let tree = engine.ask(&script).await.unwrap();

    assert_eq!(tree.to_json(), json!({"a": 1}));
    assert_eq!(prompter.asked(), vec!["a"]);
}

#[tokio::test]
async fn script_of_only_scalars_resolves_to_empty_tree() {
    let prompter = Arc::new(ScriptedPrompter::new([("a", json!(1))]));
    let engine = engine_with(json!({"a": {}}), prompter.clone());
    let script = parse_script(json!([42, null])).unwrap();

    let tree = engine.ask(&script).await.unwrap();

    assert!(tree.is_empty());
    assert_eq!(tree.to_json(), json!({}));
    assert!(prompter.asked().is_empty());
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_script_fails_before_prompting() {
    let prompter = Arc::new(ScriptedPrompter::new([("a", json!(1))]));
    let engine = engine_with(json!({"a": {}}), prompter.clone());

    let err = engine.ask(&[]).await.unwrap_err();

    assert!(matches!(err, AskflowError::ValidationError(_)));
    assert!(prompter.asked().is_empty());
}

#[tokio::test]
async fn unknown_question_stops_later_prompts() {
    let prompter = Arc::new(ScriptedPrompter::new([("a", json!(1)), ("b", json!(2))]));
    let engine = engine_with(json!({"a": {}, "b": {}}), prompter.clone());

    let err = engine
        .ask(&["a".into(), "missing".into(), "b".into()])
        .await
        .unwrap_err();

    match err {
        AskflowError::NotFound { question } => assert_eq!(question, "missing"),
        other => panic!("Expected NotFound, got: {other:?}"),
    }
    assert_eq!(prompter.asked(), vec!["a"]);
}

#[tokio::test]
async fn unknown_pivot_is_not_found() {
    let prompter = Arc::new(ScriptedPrompter::new([("animalChoice", json!("dog"))]));
    let engine = engine_with(json!({"other": {}}), prompter.clone());

    let err = engine.ask(&[pet_fork()]).await.unwrap_err();

    assert_eq!(err.question(), Some("animalChoice"));
    assert!(prompter.asked().is_empty());
}

#[tokio::test]
async fn missing_answer_aborts_resolution() {
    let prompter = Arc::new(ScriptedPrompter::new([("a", json!(1))]));
    let engine = engine_with(json!({"a": {}, "b": {}, "c": {}}), prompter.clone());

    let err = engine
        .ask(&["a".into(), "b".into(), "c".into()])
        .await
        .unwrap_err();

    assert!(matches!(err, AskflowError::AnswerMissing { ref question } if question == "b"));
    assert_eq!(prompter.asked(), vec!["a", "b"]);
}

#[tokio::test]
async fn cancellation_inside_group_aborts_everything() {
    let prompter = Arc::new(
        ScriptedPrompter::new([("a", json!(1)), ("b", json!(2)), ("c", json!(3))])
            .cancel_on("b"),
    );
    let engine = engine_with(json!({"a": {}, "b": {}, "c": {}}), prompter.clone());
    let script = vec![
        ScriptEntry::group([ScriptEntry::name("a"), ScriptEntry::name("b")]),
        "c".into(),
    ];

    let err = engine.ask(&script).await.unwrap_err();

    assert!(err.is_collaborator_error());
    assert_eq!(prompter.asked(), vec!["a", "b"]);
}

#[tokio::test]
async fn branch_pointing_at_unknown_question_fails_after_pivot() {
    let prompter = Arc::new(ScriptedPrompter::new([("animalChoice", json!("dog"))]));
    let engine = engine_with(
        json!({"animalChoice": {"type": "list", "choices": ["dog"]}}),
        prompter.clone(),
    );

    let err = engine.ask(&[pet_fork()]).await.unwrap_err();

    assert_eq!(err.question(), Some("favoriteDogType"));
    assert_eq!(prompter.asked(), vec!["animalChoice"]);
}

// ---------------------------------------------------------------------------
// Demo script from JSON
// ---------------------------------------------------------------------------

#[tokio::test]
async fn demo_script_resolves_with_table_branches() {
    let answers: serde_json::Value = serde_json::from_str(DEMO_ANSWERS).unwrap();
    let prompter = Arc::new(ScriptedPrompter::from_value(answers).unwrap());
    let engine = engine_with(demo_manifest(), prompter.clone());

    let tree = engine.ask(&demo_script()).await.unwrap();

    assert_eq!(
        tree.to_json(),
        json!({
            "favoriteColor": "blue",
            "#1": {"favoriteShape": "circle", "favoriteWord": "petrichor"},
            "animalChoice": {
                "_answer": "cat",
                "favoriteCatType": "Maine Coon",
                "favoriteCatName": "Miso"
            },
            "favoriteNumber": 7
        })
    );
    assert_eq!(
        prompter.asked(),
        vec![
            "favoriteColor",
            "favoriteShape",
            "favoriteWord",
            "animalChoice",
            "favoriteCatType",
            "favoriteCatName",
            "favoriteNumber"
        ]
    );
}

#[test]
fn demo_script_passes_lint() {
    let manifest = askflow_engine::Manifest::from_value(demo_manifest()).unwrap();
    let directives = classify_all(&demo_script()).unwrap();
    let diags = validate(&directives, &manifest);
    assert!(
        diags.iter().all(|d| d.severity != Severity::Error),
        "unexpected errors: {diags:?}"
    );
}

#[tokio::test]
async fn custom_prompter_trait_object_is_used() {
    use askflow_engine::{Answers, QuestionSpec};
    use async_trait::async_trait;

    /// Answers every question with its own message, uppercased.
    struct Shouty;

    #[async_trait]
    impl Prompter for Shouty {
        async fn prompt(&self, question: &QuestionSpec) -> askflow_engine::Result<Answers> {
            let name = askflow_engine::question_name(question).to_string();
            let message = question
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or_default()
                .to_uppercase();
            let mut answers = Answers::new();
            answers.insert(name, json!(message));
            Ok(answers)
        }
    }

    let engine = Engine::from_value(json!({"a": {"message": "hello"}}))
        .unwrap()
        .with_prompter(Arc::new(Shouty));

    let tree = engine.ask(&["a".into()]).await.unwrap();

    assert_eq!(tree.answer("a"), Some(&json!("HELLO")));
}
