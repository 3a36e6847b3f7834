//! Update-service tests against the real backends.
//!
//! These cover the guarantees callers rely on under concurrent access: no
//! lost updates on one key, independence across keys and learners, and no
//! partial writes when the store fails.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use competence_core::engine::{CompetenceService, CompetenceServiceConfig};
use competence_core::error::{CompetenceError, StoreError};
use competence_core::model::{ConfidenceLevel, Difficulty, ResponseEvent};
use competence_core::scoring::{compute_confidence, compute_score};
use competence_core::traits::CompetenceStore;
use competence_store::mock::SaveLogEntry;
use competence_store::{FaultyStore, InMemoryStore, JsonFileStore};

fn service(store: Arc<dyn CompetenceStore>) -> CompetenceService {
    CompetenceService::new(
        store,
        CompetenceServiceConfig {
            max_conflict_retries: 50,
            retry_delay: Duration::from_millis(1),
        },
    )
}

fn event(id: &str, difficulty: Difficulty, correct: bool) -> ResponseEvent {
    ResponseEvent::new(id, difficulty, correct, 1.0)
}

fn question_ids(events: &[ResponseEvent]) -> HashSet<String> {
    events.iter().map(|e| e.question_id.clone()).collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn two_concurrent_updates_on_new_key_keep_both() {
    let faulty = Arc::new(
        FaultyStore::new(Arc::new(InMemoryStore::new())).with_save_delay(Duration::from_millis(5)),
    );
    let svc = Arc::new(service(faulty.clone()));

    let a = {
        let svc = Arc::clone(&svc);
        tokio::spawn(async move {
            svc.update("alice", "math", "algebra", event("qa", Difficulty::Easy, true))
                .await
        })
    };
    let b = {
        let svc = Arc::clone(&svc);
        tokio::spawn(async move {
            svc.update("alice", "math", "algebra", event("qb", Difficulty::Hard, false))
                .await
        })
    };
    let first = a.await.unwrap().unwrap();
    let second = b.await.unwrap().unwrap();

    let mut lengths = vec![first.total_questions(), second.total_questions()];
    lengths.sort_unstable();
    assert_eq!(lengths, vec![1, 2]);

    let stored = svc.get("alice", "math", "algebra").await.unwrap().unwrap();
    assert_eq!(stored.total_questions(), 2);
    assert_eq!(
        question_ids(stored.responses()),
        HashSet::from(["qa".to_string(), "qb".to_string()])
    );
    assert_eq!(stored.score(), compute_score("math", stored.responses()));

    // Exactly one persisted state per history length: 1 then 2.
    let saved = |version, responses| SaveLogEntry {
        learner_id: "alice".into(),
        topic: "math".into(),
        subtopic: "algebra".into(),
        version,
        responses,
    };
    assert_eq!(faulty.save_log(), vec![saved(1, 1), saved(2, 2)]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn many_concurrent_updates_same_key_lose_nothing() {
    let svc = Arc::new(service(Arc::new(InMemoryStore::new())));

    let tasks = (0..40).map(|i| {
        let svc = Arc::clone(&svc);
        tokio::spawn(async move {
            let e = event(&format!("q{i}"), Difficulty::ALL[i % 5], i % 4 != 0);
            svc.update("bob", "physics", "optics", e).await
        })
    });
    for result in join_all(tasks).await {
        result.unwrap().unwrap();
    }

    let stored = svc.get("bob", "physics", "optics").await.unwrap().unwrap();
    assert_eq!(stored.total_questions(), 40);
    assert_eq!(question_ids(stored.responses()).len(), 40);
    assert_eq!(stored.confidence(), ConfidenceLevel::High);
    assert_eq!(stored.confidence(), compute_confidence(stored.responses()));
    assert_eq!(stored.score(), compute_score("physics", stored.responses()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn different_subtopics_of_one_learner_all_land() {
    let svc = Arc::new(service(Arc::new(InMemoryStore::new())));

    let subtopics = ["algebra", "geometry", "calculus", "statistics"];
    let tasks = (0..32).map(|i| {
        let svc = Arc::clone(&svc);
        let subtopic = subtopics[i % subtopics.len()];
        tokio::spawn(async move {
            let e = event(&format!("q{i}"), Difficulty::Medium, true);
            svc.update("carol", "math", subtopic, e).await
        })
    });
    for result in join_all(tasks).await {
        result.unwrap().unwrap();
    }

    let record = svc.record("carol").await.unwrap().unwrap();
    assert_eq!(record.len(), 4);
    for subtopic in subtopics {
        let c = record.competence("math", subtopic).unwrap();
        assert_eq!(c.total_questions(), 8, "subtopic {subtopic}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn different_subtopics_never_conflict_with_default_config() {
    let dir = tempfile::tempdir().unwrap();
    let faulty = Arc::new(
        FaultyStore::new(Arc::new(JsonFileStore::new(dir.path())))
            .with_save_delay(Duration::from_millis(20)),
    );
    let svc = Arc::new(CompetenceService::new(
        faulty.clone(),
        CompetenceServiceConfig::default(),
    ));

    // Every task loads the same record before any save lands.
    let tasks = (0..24).map(|i| {
        let svc = Arc::clone(&svc);
        tokio::spawn(async move {
            let e = event(&format!("q{i}"), Difficulty::Medium, i % 2 == 0);
            svc.update("carol", "math", &format!("sub{i}"), e).await
        })
    });
    let results = join_all(tasks).await;
    let failed: Vec<_> = results
        .into_iter()
        .map(|r| r.unwrap())
        .filter_map(Result::err)
        .collect();
    assert!(failed.is_empty(), "failed updates: {failed:?}");

    assert_eq!(faulty.save_count(), 24, "no update was retried");
    let record = svc.record("carol").await.unwrap().unwrap();
    assert_eq!(record.len(), 24);
    for (_, _, c) in record.entries() {
        assert_eq!(c.total_questions(), 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn file_store_default_config_mixed_keys_lose_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let svc = Arc::new(CompetenceService::new(
        Arc::new(JsonFileStore::new(dir.path())),
        CompetenceServiceConfig::default(),
    ));

    let tasks = (0..32).map(|i| {
        let svc = Arc::clone(&svc);
        tokio::spawn(async move {
            let e = event(&format!("q{i}"), Difficulty::ALL[i % 5], i % 3 != 0);
            svc.update("dora", "math", &format!("sub{}", i % 16), e).await
        })
    });
    for result in join_all(tasks).await {
        result.unwrap().unwrap();
    }

    let record = svc.record("dora").await.unwrap().unwrap();
    assert_eq!(record.len(), 16);
    for (_, subtopic, c) in record.entries() {
        assert_eq!(c.total_questions(), 2, "{subtopic}");
        assert_eq!(c.score(), compute_score("math", c.responses()));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn learners_and_topics_are_isolated() {
    let svc = Arc::new(service(Arc::new(InMemoryStore::new())));

    let keys = [
        ("alice", "chemistry"),
        ("bob", "chemistry"),
        ("alice", "biology"),
    ];
    let tasks = keys.iter().flat_map(|&(learner, topic)| {
        let svc = Arc::clone(&svc);
        (0..5).map(move |i| {
            let svc = Arc::clone(&svc);
            tokio::spawn(async move {
                let e = event(&format!("{learner}-{topic}-{i}"), Difficulty::Easy, true);
                svc.update(learner, topic, "basics", e).await
            })
        })
    });
    for result in join_all(tasks.collect::<Vec<_>>()).await {
        result.unwrap().unwrap();
    }

    for (learner, topic) in keys {
        let c = svc.get(learner, topic, "basics").await.unwrap().unwrap();
        assert_eq!(c.total_questions(), 5);
        assert!(c
            .responses()
            .iter()
            .all(|r| r.question_id.starts_with(&format!("{learner}-{topic}-"))));
    }
    assert!(svc.get("bob", "biology", "basics").await.unwrap().is_none());
}

#[tokio::test]
async fn get_is_idempotent() {
    let svc = service(Arc::new(InMemoryStore::new()));
    svc.update("dana", "art", "color", event("q1", Difficulty::Medium, true))
        .await
        .unwrap();

    let first = svc.get("dana", "art", "color").await.unwrap();
    for _ in 0..5 {
        assert_eq!(svc.get("dana", "art", "color").await.unwrap(), first);
    }
}

#[tokio::test]
async fn failed_save_leaves_history_untouched() {
    let faulty = Arc::new(FaultyStore::new(Arc::new(InMemoryStore::new())));
    let svc = service(faulty.clone());

    svc.update("erin", "t", "s", event("q1", Difficulty::Easy, true))
        .await
        .unwrap();

    faulty.fail_saves(true);
    let err = svc
        .update("erin", "t", "s", event("q2", Difficulty::Easy, false))
        .await
        .unwrap_err();
    assert!(matches!(err, CompetenceError::StoreUnavailable(StoreError::Io(_))));
    faulty.fail_saves(false);

    let c = svc.get("erin", "t", "s").await.unwrap().unwrap();
    assert_eq!(c.total_questions(), 1);
    assert_eq!(c.responses()[0].question_id, "q1");
}

#[tokio::test]
async fn failed_load_surfaces_without_save() {
    let faulty = Arc::new(FaultyStore::new(Arc::new(InMemoryStore::new())));
    let svc = service(faulty.clone());

    faulty.fail_loads(true);
    let err = svc
        .update("finn", "t", "s", event("q1", Difficulty::Easy, true))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CompetenceError::StoreUnavailable(StoreError::Unavailable(_))
    ));
    assert!(svc.get("finn", "t", "s").await.is_err());
    assert_eq!(faulty.save_count(), 0);
}

#[tokio::test]
async fn forced_conflicts_retry_then_succeed() {
    let faulty = Arc::new(FaultyStore::new(Arc::new(InMemoryStore::new())));
    let svc = service(faulty.clone());

    faulty.force_conflicts(3);
    let c = svc
        .update("gale", "t", "s", event("q1", Difficulty::VeryHard, true))
        .await
        .unwrap();
    assert_eq!(c.total_questions(), 1);
    assert_eq!(faulty.save_count(), 4);
    assert_eq!(faulty.load_count(), 4);
    assert_eq!(faulty.save_log().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancelled_update_writes_nothing_partial() {
    let faulty = Arc::new(
        FaultyStore::new(Arc::new(InMemoryStore::new()))
            .with_save_delay(Duration::from_millis(200)),
    );
    let svc = Arc::new(service(faulty.clone()));

    let attempt = tokio::time::timeout(
        Duration::from_millis(20),
        svc.update("hana", "t", "s", event("q1", Difficulty::Easy, true)),
    )
    .await;
    assert!(attempt.is_err(), "update should still be waiting on save");

    assert!(svc.get("hana", "t", "s").await.unwrap().is_none());
    assert!(faulty.save_log().is_empty());
}

#[tokio::test]
async fn file_store_accepts_very_long_learner_id() {
    let dir = tempfile::tempdir().unwrap();
    let svc = service(Arc::new(JsonFileStore::new(dir.path())));
    let learner = "l".repeat(200);

    let c = svc
        .update(&learner, "t", "s", event("q1", Difficulty::Easy, true))
        .await
        .unwrap();
    assert_eq!(c.total_questions(), 1);
    assert_eq!(svc.get(&learner, "t", "s").await.unwrap(), Some(c));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn file_store_concurrent_updates() {
    let dir = tempfile::tempdir().unwrap();
    let svc = Arc::new(service(Arc::new(JsonFileStore::new(dir.path()))));

    let tasks = (0..12).map(|i| {
        let svc = Arc::clone(&svc);
        let subtopic = if i % 2 == 0 { "even" } else { "odd" };
        tokio::spawn(async move {
            let e = event(&format!("q{i}"), Difficulty::Hard, i % 3 == 0);
            svc.update("ivan", "numbers", subtopic, e).await
        })
    });
    for result in join_all(tasks).await {
        result.unwrap().unwrap();
    }

    // A fresh store over the same directory sees the same state.
    let reopened = service(Arc::new(JsonFileStore::new(dir.path())));
    let record = reopened.record("ivan").await.unwrap().unwrap();
    let even = record.competence("numbers", "even").unwrap();
    let odd = record.competence("numbers", "odd").unwrap();
    assert_eq!(even.total_questions(), 6);
    assert_eq!(odd.total_questions(), 6);
    assert_eq!(even.score(), compute_score("numbers", even.responses()));
}
