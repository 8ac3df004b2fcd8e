//! Persistence outcomes never change the returned entity

use crate::support::{config, gate, BrokenRepository, CountingInitializer};
use berth::agent::{AgentRepository, AgentSpec, XdgAgentRepository};
use berth::config::EnrichmentMode;
use berth::provision::PersistenceStatus;
use berth::{AgentStatus, Provisioner, Tier};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[tokio::test]
async fn test_failed_save_leaves_result_standing() {
    let init = CountingInitializer::new(Duration::ZERO);
    let repo = Arc::new(BrokenRepository::default());
    let provisioner = Provisioner::builder(config(1_000, EnrichmentMode::Awaited))
        .gate(gate(&init))
        .repository(repo.clone())
        .build();

    let result = provisioner
        .provision(AgentSpec::new("Code Helper").with_tools(["github"]))
        .await
        .unwrap();

    assert_eq!(result.tier, Tier::Optimized);
    assert_eq!(result.entity.status(), AgentStatus::Ready);
    assert_eq!(result.entity.tools().len(), 1);
    assert!(matches!(
        &result.persistence,
        PersistenceStatus::Failed(reason) if reason.contains("disk full")
    ));
    assert_eq!(repo.saves(), 1);
    assert!(provisioner.registry().get(result.entity.id()).is_some());
}

#[tokio::test]
async fn test_detached_save_failure_is_reported_on_settle() {
    let init = CountingInitializer::new(Duration::ZERO);
    let repo = Arc::new(BrokenRepository::default());
    let provisioner = Provisioner::builder(config(1_000, EnrichmentMode::Detached))
        .gate(gate(&init))
        .repository(repo.clone())
        .build();

    let result = provisioner.provision(AgentSpec::new("Night Shift")).await.unwrap();
    let entity = Arc::clone(&result.entity);
    let (_, persistence) = result.settle().await;

    assert!(matches!(persistence, PersistenceStatus::Failed(_)));
    assert_eq!(entity.status(), AgentStatus::Ready);
    assert_eq!(repo.saves(), 1);
}

#[tokio::test]
async fn test_snapshot_written_to_agents_dir() {
    let dir = TempDir::new().unwrap();
    let repo = Arc::new(XdgAgentRepository::new(dir.path().join("agents")));
    let init = CountingInitializer::new(Duration::ZERO);
    let provisioner = Provisioner::builder(config(1_000, EnrichmentMode::Awaited))
        .gate(gate(&init))
        .repository(repo.clone())
        .build();

    let result = provisioner
        .provision(
            AgentSpec::new("Data Analyst")
                .with_id("analyst-1")
                .with_description("statistical analysis of sales")
                .with_rag_sources(["q3-report"]),
        )
        .await
        .unwrap();
    assert_eq!(result.persistence, PersistenceStatus::Saved);
    assert!(dir.path().join("agents").join("analyst-1.json").exists());

    let stored = repo.load("analyst-1").unwrap().unwrap();
    assert_eq!(stored, result.entity.snapshot());
    assert_eq!(stored.knowledge.len(), 1);
    assert_eq!(repo.list().unwrap().len(), 1);
}
