//! Optimized-tier enrichment: isolation, deadlines and detached mode

use crate::support::{config, gate, memory_config, CountingInitializer, DownCatalog, SlowMemoryStore};
use berth::agent::{AgentRepository, AgentSpec, InMemoryAgentRepository};
use berth::config::{BerthConfig, EnrichmentMode, ProvisioningConfig};
use berth::enrichment::{UnitKind, UnitStatus};
use berth::provision::{Enrichment, PersistenceStatus};
use berth::{AgentStatus, Provisioner, Tier};
use std::sync::Arc;
use std::time::Duration;

fn full_spec() -> AgentSpec {
    let mut spec = AgentSpec::new("Release Manager")
        .with_role("Release Captain")
        .with_tools(["github", "slack"])
        .with_rag_sources(["runbook", "changelog", "runbook"]);
    spec.config = memory_config();
    spec
}

#[tokio::test]
async fn test_tool_outage_leaves_other_fields_populated() {
    let init = CountingInitializer::new(Duration::ZERO);
    let provisioner = Provisioner::builder(config(1_000, EnrichmentMode::Awaited))
        .gate(gate(&init))
        .tool_catalog(Arc::new(DownCatalog))
        .build();

    let result = provisioner.provision(full_spec()).await.unwrap();
    assert_eq!(result.tier, Tier::Optimized);

    let entity = &result.entity;
    assert_eq!(entity.status(), AgentStatus::Ready);
    assert!(entity.tools().is_empty());
    assert!(entity.memory().enabled);
    assert_eq!(
        entity.memory().settings.get("memory_provider"),
        Some(&serde_json::Value::from("local"))
    );
    assert_eq!(entity.knowledge().len(), 2);
    assert_eq!(entity.role(), "Release Captain");

    let Enrichment::Completed(outcome) = result.enrichment else {
        panic!("awaited mode joins enrichment before returning");
    };
    let tools = outcome.report(UnitKind::Tools).unwrap();
    assert_eq!(tools.status, UnitStatus::Failed);
    assert!(tools.error.as_deref().unwrap().contains("catalog offline"));
    assert!(outcome.succeeded(UnitKind::Memory));
    assert!(outcome.succeeded(UnitKind::Finalize));
}

#[tokio::test]
async fn test_slow_memory_store_is_cut_at_unit_deadline() {
    let init = CountingInitializer::new(Duration::ZERO);
    let config = BerthConfig {
        provisioning: ProvisioningConfig {
            unit_deadline_ms: 50,
            ..Default::default()
        },
        ..Default::default()
    };
    let provisioner = Provisioner::builder(config)
        .gate(gate(&init))
        .memory_store(Arc::new(SlowMemoryStore {
            delay: Duration::from_secs(2),
        }))
        .build();

    let result = provisioner.provision(full_spec()).await.unwrap();
    assert!(result.latency_ms < 2_000);
    assert_eq!(result.entity.status(), AgentStatus::Ready);
    assert_eq!(result.entity.tools().len(), 2);
    assert!(!result.entity.memory().enabled);

    let (outcome, _) = result.settle().await;
    let outcome = outcome.unwrap();
    let memory = outcome.report(UnitKind::Memory).unwrap();
    assert_eq!(memory.status, UnitStatus::Failed);
    assert!(memory.error.as_deref().unwrap().contains("50ms"));
    assert!(!outcome.is_complete());
}

#[tokio::test]
async fn test_unknown_and_excess_tools_are_skipped() {
    let init = CountingInitializer::new(Duration::ZERO);
    let provisioner = Provisioner::builder(config(1_000, EnrichmentMode::Awaited))
        .gate(gate(&init))
        .build();

    let mut ids = vec!["GitHub".to_string(), " ".to_string(), "teleporter".to_string()];
    ids.extend((0..12).map(|i| format!("custom-{}", i)));
    let result = provisioner
        .provision(AgentSpec::new("Tool Hoarder").with_tools(ids))
        .await
        .unwrap();

    let tools = result.entity.tools();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0].tool_id, "github");

    let (outcome, _) = result.settle().await;
    let outcome = outcome.unwrap();
    assert!(outcome.succeeded(UnitKind::Tools));
    assert!(outcome.skipped_tools.contains(&"teleporter".to_string()));
    assert_eq!(outcome.skipped_tools.len() + tools.len(), 10);
}

#[tokio::test]
async fn test_detached_mode_returns_before_enrichment() {
    let init = CountingInitializer::new(Duration::ZERO);
    let repo = Arc::new(InMemoryAgentRepository::new());
    let provisioner = Provisioner::builder(config(1_000, EnrichmentMode::Detached))
        .gate(gate(&init))
        .repository(repo.clone())
        .build();

    let result = provisioner.provision(full_spec()).await.unwrap();
    assert_eq!(result.tier, Tier::Optimized);
    assert_eq!(result.entity.status(), AgentStatus::Provisioning);
    assert!(result.entity.tools().is_empty());
    assert_eq!(result.persistence, PersistenceStatus::Pending);
    assert!(repo.is_empty());

    let entity = Arc::clone(&result.entity);
    let (outcome, persistence) = result.settle().await;
    assert!(outcome.unwrap().is_complete());
    assert_eq!(persistence, PersistenceStatus::Saved);
    assert_eq!(entity.status(), AgentStatus::Ready);
    assert_eq!(entity.tools().len(), 2);
    assert!(entity.memory().enabled);

    let stored = repo.load(entity.id()).unwrap().unwrap();
    assert_eq!(stored.status, AgentStatus::Ready);
    assert_eq!(stored.tools.len(), 2);
}

#[tokio::test]
async fn test_degraded_tiers_skip_enrichment_in_detached_mode() {
    let init = CountingInitializer::failing();
    let provisioner = Provisioner::builder(config(1_000, EnrichmentMode::Detached))
        .gate(gate(&init))
        .build();

    let result = provisioner.provision(full_spec()).await.unwrap();
    assert_eq!(result.tier, Tier::Fallback);
    assert!(matches!(result.enrichment, Enrichment::Skipped));
    assert_eq!(result.persistence, PersistenceStatus::Disabled);
    assert!(result.entity.tools().is_empty());
}
