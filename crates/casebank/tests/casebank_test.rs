//! End-to-end case bank scenarios
//!
//! Exercises the full ingest / retrieve / evict / stats loop through
//! the public API, the way producer agents and the dashboard use it.

use std::sync::Arc;

use serde_json::json;

use casebank::{
    CaseBank, CaseBankConfig, CaseBankError, CaseDraft, MemoryJournal, SimilarityMetric,
    StateVector,
};
use casebank::infra::case_store::InMemoryStore;
use casebank::infra::journal::JournalRecord;

fn draft(agent: &str, state: Vec<f32>, reward: f64) -> CaseDraft {
    CaseDraft::new(agent, state, json!({"tool": "act"}), reward)
}

#[tokio::test]
async fn three_cases_produce_expected_aggregates() {
    let bank = CaseBank::new(&CaseBankConfig::default());

    for reward in [0.9, 0.4, 0.8] {
        bank.ingest(draft("qa_agent", vec![1.0, 0.0], reward))
            .await
            .unwrap();
    }

    let stats = bank.stats();
    assert_eq!(stats.count, 3);
    assert!((stats.mean_reward - 0.7).abs() < 1e-9);
    assert!((stats.success_rate - 2.0 / 3.0).abs() < 1e-9);
    assert_eq!(stats.window.count, 3);
}

#[tokio::test]
async fn lowest_value_case_is_evicted_first() {
    let mut cfg = CaseBankConfig::default();
    cfg.storage.max_cases = 2;
    let bank = CaseBank::new(&cfg);

    let mut ids = Vec::new();
    for reward in [0.1, 0.9, 0.2] {
        ids.push(
            bank.ingest(draft("qa_agent", vec![1.0], reward))
                .await
                .unwrap(),
        );
    }

    assert_eq!(bank.count().await, 2);
    assert!(matches!(
        bank.get(&ids[0]).await,
        Err(CaseBankError::NotFound(_))
    ));

    let survivors: Vec<f64> = bank
        .recent_page(10, None, None)
        .await
        .iter()
        .map(|c| c.reward)
        .collect();
    assert_eq!(survivors, vec![0.2, 0.9]);
}

#[tokio::test]
async fn query_on_empty_bank_is_empty_not_error() {
    let bank = CaseBank::new(&CaseBankConfig::default());
    let hits = bank.query_top_k(&StateVector::new(vec![1.0, 2.0]), 5).await;
    assert!(hits.is_empty());
}

#[tokio::test]
async fn identical_state_is_top_hit_with_max_score() {
    let bank = CaseBank::new(&CaseBankConfig::default());

    let target = bank
        .ingest(draft("planner", vec![0.2, 0.8, 0.0], 0.9))
        .await
        .unwrap();
    for i in 0..10 {
        bank.ingest(draft("planner", vec![1.0, i as f32 * 0.1, 0.3], 0.5))
            .await
            .unwrap();
    }

    let hits = bank
        .query_top_k(&StateVector::new(vec![0.2, 0.8, 0.0]), 5)
        .await;
    assert_eq!(hits.len(), 5);
    assert_eq!(hits[0].case.case_id, target);
    assert!((hits[0].score - 1.0).abs() < 0.001);
    for pair in hits.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[tokio::test]
async fn recent_page_is_idempotent_and_paginates() {
    let bank = CaseBank::new(&CaseBankConfig::default());
    for i in 0..40 {
        bank.ingest(draft("qa_agent", vec![i as f32], i as f64 / 40.0))
            .await
            .unwrap();
    }

    let first = bank.recent_page(20, None, None).await;
    let again = bank.recent_page(20, None, None).await;
    assert_eq!(first.len(), 20);
    assert_eq!(
        first.iter().map(|c| c.case_id).collect::<Vec<_>>(),
        again.iter().map(|c| c.case_id).collect::<Vec<_>>()
    );

    // Older page via the before cursor; no overlap with the first page.
    let cursor = first.last().unwrap().timestamp;
    let older = bank.recent_page(20, Some(cursor), None).await;
    assert!(older.iter().all(|c| c.timestamp < cursor));
    let first_ids: std::collections::HashSet<_> = first.iter().map(|c| c.case_id).collect();
    assert!(older.iter().all(|c| !first_ids.contains(&c.case_id)));
}

#[tokio::test]
async fn malformed_drafts_never_enter_the_bank() {
    let bank = CaseBank::new(&CaseBankConfig::default());

    let bad = vec![
        draft("", vec![1.0], 0.5),
        draft("qa_agent", vec![], 0.5),
        draft("qa_agent", vec![1.0], f64::NAN),
        CaseDraft::new("qa_agent", vec![1.0], json!(null), 0.5),
    ];
    for d in bad {
        assert!(matches!(
            bank.ingest(d).await,
            Err(CaseBankError::InvalidInput { .. })
        ));
    }

    assert_eq!(bank.count().await, 0);
    let stats = bank.stats();
    assert_eq!(stats.count, 0);
    assert_eq!(stats.mean_reward, 0.0);
    assert_eq!(stats.success_rate, 0.0);
}

#[tokio::test]
async fn aggregates_match_full_scan_under_eviction_churn() {
    let mut cfg = CaseBankConfig::default();
    cfg.storage.max_cases = 25;
    cfg.stats.recompute_interval = 40;
    let bank = CaseBank::new(&cfg);

    for i in 0..200 {
        let reward = ((i * 7) % 100) as f64 / 100.0 * 2.0 - 1.0;
        bank.ingest(draft("qa_agent", vec![i as f32, 1.0], reward))
            .await
            .unwrap();
    }

    assert_eq!(bank.count().await, 25);

    let live = bank.recent_page(100, None, None).await;
    let expected_mean = live.iter().map(|c| c.reward).sum::<f64>() / live.len() as f64;
    let expected_rate =
        live.iter().filter(|c| c.reward >= 0.7).count() as f64 / live.len() as f64;

    let stats = bank.stats();
    assert_eq!(stats.count as usize, live.len());
    assert!((stats.mean_reward - expected_mean).abs() < 1e-9);
    assert!((stats.success_rate - expected_rate).abs() < 1e-9);
}

#[tokio::test]
async fn concurrent_producers_get_unique_ordered_cases() {
    let bank = Arc::new(CaseBank::new(&CaseBankConfig::default()));

    let mut handles = Vec::new();
    for producer in 0..10 {
        let bank = bank.clone();
        handles.push(tokio::spawn(async move {
            let mut ids = Vec::new();
            for i in 0..20 {
                let id = bank
                    .ingest(draft(
                        &format!("agent_{producer}"),
                        vec![producer as f32, i as f32],
                        (i % 10) as f64 / 10.0,
                    ))
                    .await
                    .unwrap();
                ids.push(id);
            }
            ids
        }));
    }

    let mut all = Vec::new();
    for handle in handles {
        all.extend(handle.await.unwrap());
    }

    let distinct: std::collections::HashSet<_> = all.iter().collect();
    assert_eq!(distinct.len(), 200);
    assert_eq!(bank.count().await, 200);
    assert_eq!(bank.stats().count, 200);

    // Pages come back in non-increasing timestamp order.
    let page = bank.recent_page(200, None, None).await;
    for pair in page.windows(2) {
        assert!(pair[0].timestamp >= pair[1].timestamp);
    }

    // Each producer's own cases respect its issue order.
    for producer in 0..10 {
        let agent = format!("agent_{producer}");
        let own: Vec<_> = page.iter().filter(|c| c.agent == agent).collect();
        assert_eq!(own.len(), 20);
        for pair in own.windows(2) {
            assert!(pair[0].seq > pair[1].seq);
        }
    }
}

#[tokio::test]
async fn retrieval_snapshot_survives_eviction() {
    let mut cfg = CaseBankConfig::default();
    cfg.storage.max_cases = 3;
    let bank = CaseBank::new(&cfg);

    for i in 0..3 {
        bank.ingest(draft("qa_agent", vec![i as f32, 1.0], 0.9))
            .await
            .unwrap();
    }

    let hits = bank.query_top_k(&StateVector::new(vec![0.0, 1.0]), 3).await;
    assert_eq!(hits.len(), 3);

    // Push the oldest cases out of the bank.
    for i in 0..3 {
        bank.ingest(draft("qa_agent", vec![10.0 + i as f32, 1.0], 0.95))
            .await
            .unwrap();
    }

    // The returned snapshot still holds complete case data.
    for hit in &hits {
        assert_eq!(hit.case.agent, "qa_agent");
        assert!((hit.case.reward - 0.9).abs() < 1e-12);
    }
}

#[tokio::test]
async fn journal_replays_the_full_lifecycle() {
    let journal = Arc::new(MemoryJournal::new());
    let mut cfg = CaseBankConfig::default();
    cfg.storage.max_cases = 2;
    let bank = CaseBank::with_parts(
        Arc::new(InMemoryStore::new()),
        SimilarityMetric::Cosine.build(),
        journal.clone(),
        &cfg,
    );

    for reward in [0.1, 0.9, 0.2] {
        bank.ingest(draft("qa_agent", vec![1.0], reward))
            .await
            .unwrap();
    }

    let records = journal.records();
    let appended = records
        .iter()
        .filter(|r| matches!(r, JournalRecord::Appended { .. }))
        .count();
    let retracted = records
        .iter()
        .filter(|r| matches!(r, JournalRecord::Retracted { .. }))
        .count();
    assert_eq!(appended, 3);
    assert_eq!(retracted, 1);

    // Replaying the journal yields the live set.
    let mut live: std::collections::HashSet<casebank::CaseId> = Default::default();
    for record in &records {
        match record {
            JournalRecord::Appended { case_id, .. } => {
                live.insert(*case_id);
            }
            JournalRecord::Retracted { case_id } => {
                live.remove(case_id);
            }
        }
    }
    assert_eq!(live.len(), bank.count().await);
    for id in &live {
        assert!(bank.get(id).await.is_ok());
    }
}
