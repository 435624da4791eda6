//! End-to-end behaviour of the knowledge base through `ModernizerApi`:
//! generation, background annotation, voting and retrieval.

mod common;

use common::{api_over, api_with, entities, file_store, memory_store, outcome_for};
use modernizer::annotation::AnnotationStatus;
use modernizer::inference::MockInference;
use modernizer::{EngineError, GenerateParams};
use std::collections::HashSet;
use std::sync::Arc;

#[tokio::test]
async fn generate_annotate_vote_and_retrieve() {
    let store = memory_store();
    let mock = Arc::new(
        MockInference::new()
            .with_reply("It prints the letter x.")
            .with_semantic_reply("Prints a character to standard output."),
    );
    let api = api_over(store.clone(), mock.clone());
    let mut outcomes = api.subscribe_annotations();

    let generated = api
        .generate(GenerateParams::new("print('x')").instruct_type("default"))
        .await
        .unwrap();
    let members = api.instruct_members("default").await.unwrap();
    assert!(members.contains(&generated.instruct));
    assert_eq!(mock.prompts(), vec![format!("{} print('x')", generated.instruct)]);

    let detail = api.response_by_id(generated.prompt_id.as_str()).await.unwrap();
    assert_eq!(detail.rank, 1);
    assert_eq!(detail.code, "print('x')");
    assert_eq!(detail.response, "It prints the letter x.");

    let outcome = outcome_for(&mut outcomes, &generated.prompt_id).await;
    let sm = match outcome.status {
        AnnotationStatus::Linked { semantic_meaning } => semantic_meaning,
        other => panic!("unexpected status {:?}", other),
    };

    // Linked in both directions
    let entities = entities(&store);
    let prompt = entities.fetch_prompt(&generated.prompt_id).await.unwrap();
    assert_eq!(prompt.semantic_meaning_ids, vec![sm.clone()]);
    let meaning = entities.fetch_semantic_meaning(&sm).await.unwrap();
    assert_eq!(meaning.prompt_ids, vec![generated.prompt_id.clone()]);
    assert_eq!(meaning.semantic_meaning, "Prints a character to standard output.");

    assert_eq!(api.vote(generated.prompt_id.as_str(), true).await.unwrap(), 2);
    let best = api.best_response("print").await.unwrap();
    assert_eq!(best.prompt_id, generated.prompt_id);
    assert_eq!(best.response, "It prints the letter x.");

    api.shutdown().await;
}

#[tokio::test]
async fn identical_code_reuses_the_stored_meaning() {
    let mock = Arc::new(MockInference::new().with_semantic_reply("Assigns one to x."));
    let api = api_with(mock.clone());
    let mut outcomes = api.subscribe_annotations();

    let first = api.generate(GenerateParams::new("x = 1")).await.unwrap();
    outcome_for(&mut outcomes, &first.prompt_id).await;
    assert_eq!(mock.chat_calls(), 1);

    let second = api.generate(GenerateParams::new("x = 1")).await.unwrap();
    let outcome = outcome_for(&mut outcomes, &second.prompt_id).await;
    assert!(matches!(outcome.status, AnnotationStatus::Reused { .. }));
    assert_eq!(mock.chat_calls(), 1);

    assert_eq!(api.prompt_count("x = 1").await.unwrap(), 2);
    assert_eq!(
        api.has_semantic_meaning("x = 1").await.unwrap().as_deref(),
        Some("Assigns one to x.")
    );
    assert_eq!(api.has_semantic_meaning("x = 2").await.unwrap(), None);
    api.shutdown().await;
}

#[tokio::test]
async fn similar_meanings_lead_back_to_their_source() {
    let mock = Arc::new(MockInference::new().with_semantic_reply("Reads a configuration file from disk."));
    let api = api_with(mock);
    let mut outcomes = api.subscribe_annotations();

    let generated = api
        .generate(GenerateParams::new("cfg = load('app.toml')").git_url("https://git.example/app"))
        .await
        .unwrap();
    outcome_for(&mut outcomes, &generated.prompt_id).await;

    let urls = api
        .similar_by_meaning("Reads a configuration file from disk.", None)
        .await
        .unwrap();
    assert_eq!(urls, vec!["https://git.example/app".to_string()]);

    let matches = api
        .similar_matches("Reads a configuration file from disk.", Some(0.9))
        .await
        .unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].prompt_id, generated.prompt_id);

    let err = api.similar_by_meaning("anything", Some(1.5)).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));
    api.shutdown().await;
}

#[tokio::test]
async fn retrieval_follows_rank() {
    let api = api_with(Arc::new(MockInference::new()));
    let mut ids = Vec::new();
    for instruct in ["Explain this:", "Summarize this:", "Describe this:"] {
        let generated = api
            .generate(GenerateParams::new("for i in range(3): print(i)").instruct(instruct))
            .await
            .unwrap();
        ids.push(generated.prompt_id);
    }

    api.vote(ids[1].as_str(), true).await.unwrap();
    api.vote(ids[2].as_str(), false).await.unwrap();

    let list = api.response_list("range").await.unwrap();
    assert_eq!(list, vec![ids[1].clone(), ids[0].clone(), ids[2].clone()]);

    for _ in 0..10 {
        assert_eq!(api.best_response("range").await.unwrap().prompt_id, ids[1]);
    }

    let mut seen = HashSet::new();
    for _ in 0..100 {
        seen.insert(api.random_response("range").await.unwrap().prompt_id);
    }
    assert_eq!(seen.len(), 3);
    api.shutdown().await;
}

#[tokio::test]
async fn best_response_survives_negative_ranks() {
    let api = api_with(Arc::new(MockInference::new()));
    let generated = api.generate(GenerateParams::new("rm -rf /tmp/x")).await.unwrap();

    api.vote(generated.prompt_id.as_str(), false).await.unwrap();
    assert_eq!(api.vote(generated.prompt_id.as_str(), false).await.unwrap(), -1);

    let best = api.best_response("rm -rf").await.unwrap();
    assert_eq!(best.prompt_id, generated.prompt_id);
    api.shutdown().await;
}

#[tokio::test]
async fn unknown_code_and_ids_are_not_found() {
    let api = api_with(Arc::new(MockInference::new()));

    assert!(matches!(
        api.best_response("nothing here").await.unwrap_err(),
        EngineError::NotFound(_)
    ));
    assert!(matches!(
        api.random_response("nothing here").await.unwrap_err(),
        EngineError::NotFound(_)
    ));
    assert!(matches!(
        api.response_by_id("no-such-prompt").await.unwrap_err(),
        EngineError::NotFound(_)
    ));
    assert!(matches!(
        api.vote("no-such-prompt", true).await.unwrap_err(),
        EngineError::NotFound(_)
    ));
    assert_eq!(api.prompt_count("nothing here").await.unwrap(), 0);
    api.shutdown().await;
}

#[tokio::test]
async fn prompts_persist_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("modernizer.db");

    let prompt_id = {
        let api = api_over(file_store(&path), Arc::new(MockInference::new()));
        let mut outcomes = api.subscribe_annotations();
        let generated = api.generate(GenerateParams::new("fn main() {}")).await.unwrap();
        outcome_for(&mut outcomes, &generated.prompt_id).await;
        api.vote(generated.prompt_id.as_str(), true).await.unwrap();
        api.shutdown().await;
        generated.prompt_id
    };

    let api = api_over(file_store(&path), Arc::new(MockInference::new()));
    let detail = api.response_by_id(prompt_id.as_str()).await.unwrap();
    assert_eq!(detail.rank, 2);
    assert_eq!(detail.response, "This code prints a value.");
    assert!(api.has_semantic_meaning("fn main() {}").await.unwrap().is_some());
    api.shutdown().await;
}
