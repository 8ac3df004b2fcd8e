//! Tier selection across collaborator availability

use crate::support::{
    blank_default_templates, config, gate, provisioner, BrokenRepository, CountingInitializer,
};
use berth::agent::{AgentSpec, InMemoryAgentRepository, EMERGENCY_ROLE};
use berth::config::{BerthConfig, EnrichmentMode};
use berth::provision::PersistenceStatus;
use berth::readiness::GatePhase;
use berth::template::{Category, TemplateCatalog};
use berth::{AgentStatus, Provisioner, Tier, ValidationError};
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_code_helper_gets_coding_template() {
    let init = CountingInitializer::new(Duration::ZERO);
    let provisioner = provisioner(config(1_000, EnrichmentMode::Awaited), &init);

    let result = provisioner
        .provision(AgentSpec::new("Code Helper").with_description("reviews pull requests"))
        .await
        .unwrap();

    let coding = TemplateCatalog::builtin().get(Category::Coding).clone();
    assert_eq!(result.tier, Tier::Optimized);
    assert_eq!(result.entity.category(), Category::Coding);
    assert_eq!(result.entity.persona(), coding);
    assert_eq!(result.entity.status(), AgentStatus::Ready);
    assert!(result.entity.llm().is_pooled());
    assert_eq!(init.calls(), 1);
}

#[tokio::test]
async fn test_invalid_name_creates_nothing() {
    let init = CountingInitializer::new(Duration::ZERO);
    let repo = Arc::new(BrokenRepository::default());
    let provisioner = Provisioner::builder(config(1_000, EnrichmentMode::Awaited))
        .gate(gate(&init))
        .repository(repo.clone())
        .build();

    let err = provisioner.provision(AgentSpec::new("X")).await.unwrap_err();
    assert!(matches!(
        err,
        ValidationError::NameLength {
            min: 2,
            max: 100,
            actual: 1
        }
    ));

    let err = provisioner
        .provision(AgentSpec::new("Writer").with_description("d".repeat(1001)))
        .await
        .unwrap_err();
    assert!(matches!(err, ValidationError::DescriptionTooLong { actual: 1001, .. }));

    assert!(provisioner.registry().is_empty());
    assert_eq!(repo.saves(), 0);
    assert_eq!(init.calls(), 0);
    assert_eq!(provisioner.health().latency.provisions, 0);
}

#[tokio::test]
async fn test_readiness_timeout_falls_back_without_extras() {
    let init = CountingInitializer::new(Duration::from_millis(150));
    let provisioner = provisioner(config(20, EnrichmentMode::Awaited), &init);

    let spec = AgentSpec::new("Research Analyst")
        .with_tools(["web_search", "notion"])
        .with_config("memory_enabled", true)
        .with_rag_sources(["handbook"]);
    let result = provisioner.provision(spec).await.unwrap();

    assert_eq!(result.tier, Tier::Fallback);
    assert_eq!(result.escalations.len(), 1);
    assert_eq!(result.escalations[0].from, Tier::Optimized);
    assert!(result.escalations[0].reason.contains("20ms"));
    assert_eq!(result.entity.status(), AgentStatus::Degraded);
    assert!(result.entity.persona().is_complete());
    assert!(result.entity.tools().is_empty());
    assert!(result.entity.memory().is_empty());
    assert!(result.entity.knowledge().is_empty());
    assert!(!result.entity.llm().is_pooled());
    assert_eq!(result.entity.llm().model(), BerthConfig::default().provider.default_model);
}

#[tokio::test]
async fn test_timed_out_setup_keeps_running() {
    let init = CountingInitializer::new(Duration::from_millis(100));
    let provisioner = provisioner(config(10, EnrichmentMode::Awaited), &init);

    let first = provisioner.provision(AgentSpec::new("Early Bird")).await.unwrap();
    assert_eq!(first.tier, Tier::Fallback);

    assert!(provisioner
        .gate()
        .await_ready(Duration::from_secs(5))
        .await
        .is_ready());

    let second = provisioner.provision(AgentSpec::new("Late Bird")).await.unwrap();
    assert_eq!(second.tier, Tier::Optimized);
    assert_eq!(init.calls(), 1);
}

#[tokio::test]
async fn test_failed_setup_is_not_retried() {
    let init = CountingInitializer::failing();
    let provisioner = provisioner(config(5_000, EnrichmentMode::Awaited), &init);

    for name in ["First Agent", "Second Agent"] {
        let result = provisioner.provision(AgentSpec::new(name)).await.unwrap();
        assert_eq!(result.tier, Tier::Fallback);
        assert!(result.escalations[0].reason.contains("endpoint refused"));
        assert!(result.latency_ms < 5_000);
    }
    assert_eq!(init.calls(), 1);

    let health = provisioner.health();
    assert_eq!(health.gate, GatePhase::Failed);
    assert!(health.gate_failure.unwrap().contains("endpoint refused"));
    assert_eq!(health.agents, 2);
}

#[tokio::test]
async fn test_fallback_binds_open_pool() {
    // Pool cache is unusable for Default, configuration is fine
    let pool_templates = TemplateCatalog::with_overrides(&blank_default_templates());
    let init = CountingInitializer::with_templates(Duration::ZERO, pool_templates);
    let provisioner = provisioner(config(1_000, EnrichmentMode::Awaited), &init);

    let result = provisioner.provision(AgentSpec::new("Plain Agent")).await.unwrap();
    assert_eq!(result.tier, Tier::Fallback);
    assert!(result.escalations[0].reason.contains("construction"));
    assert!(result.entity.llm().is_pooled());
    assert_eq!(result.entity.status(), AgentStatus::Degraded);
    assert_eq!(
        &result.entity.persona(),
        TemplateCatalog::builtin().get(Category::Default)
    );
}

#[tokio::test]
async fn test_requested_token_budget_reaches_handle() {
    let init = CountingInitializer::new(Duration::ZERO);
    let provisioner = provisioner(config(1_000, EnrichmentMode::Awaited), &init);

    let result = provisioner
        .provision(AgentSpec::new("Helper").with_max_tokens(123))
        .await
        .unwrap();
    assert_eq!(result.tier, Tier::Optimized);
    assert_eq!(result.entity.llm().profile().unwrap().max_tokens, 123);

    let default = provisioner.provision(AgentSpec::new("Helper")).await.unwrap();
    assert_eq!(default.entity.llm().profile().unwrap().max_tokens, 2000);
    assert!(!default.entity.llm().shares_profile(result.entity.llm()));
}

#[tokio::test]
async fn test_emergency_tier_is_persisted() {
    let init = CountingInitializer::with_templates(
        Duration::ZERO,
        TemplateCatalog::with_overrides(&blank_default_templates()),
    );
    let repo = Arc::new(InMemoryAgentRepository::new());
    let config = BerthConfig {
        templates: blank_default_templates(),
        ..config(1_000, EnrichmentMode::Awaited)
    };
    let provisioner = Provisioner::builder(config)
        .gate(gate(&init))
        .repository(repo.clone())
        .build();

    let result = provisioner.provision(AgentSpec::new("Plain Agent")).await.unwrap();
    assert_eq!(result.tier, Tier::Emergency);
    let from: Vec<Tier> = result.escalations.iter().map(|e| e.from).collect();
    assert_eq!(from, vec![Tier::Optimized, Tier::Fallback]);
    assert_eq!(result.entity.role(), EMERGENCY_ROLE);
    assert_eq!(result.entity.status(), AgentStatus::Degraded);
    assert_eq!(result.persistence, PersistenceStatus::Saved);
    assert_eq!(repo.len(), 1);
    assert_eq!(
        provisioner.health().latency.by_tier.get(&Tier::Emergency),
        Some(&1)
    );
}

#[tokio::test]
async fn test_classification_is_deterministic() {
    let init = CountingInitializer::new(Duration::ZERO);
    let provisioner = provisioner(config(1_000, EnrichmentMode::Awaited), &init);

    let spec = AgentSpec::new("Logic Tutor").with_description("walks through proofs");
    let a = provisioner.provision(spec.clone()).await.unwrap();
    let b = provisioner.provision(spec).await.unwrap();
    assert_eq!(a.entity.category(), Category::Reasoning);
    assert_eq!(a.entity.category(), b.entity.category());
    assert_eq!(a.entity.persona(), b.entity.persona());
    assert_ne!(a.entity.id(), b.entity.id());
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_valid_spec_always_yields_persona(
        name in "[A-Za-z][A-Za-z ]{0,30}[A-Za-z]",
        description in proptest::option::of("[a-z ]{0,80}"),
        availability in 0u8..3,
    ) {
        let (init, templates) = match availability {
            0 => (CountingInitializer::new(Duration::ZERO), Default::default()),
            1 => (CountingInitializer::failing(), Default::default()),
            _ => (
                CountingInitializer::with_templates(
                    Duration::ZERO,
                    TemplateCatalog::with_overrides(&blank_default_templates()),
                ),
                blank_default_templates(),
            ),
        };
        let config = BerthConfig {
            templates,
            ..config(200, EnrichmentMode::Awaited)
        };
        let provisioner = provisioner(config, &init);

        let mut spec = AgentSpec::new(name.clone());
        if let Some(description) = description {
            spec = spec.with_description(description);
        }
        let result = runtime().block_on(provisioner.provision(spec)).unwrap();

        prop_assert!(result.entity.persona().is_complete());
        prop_assert_eq!(result.entity.name(), name.trim());
        prop_assert_ne!(result.entity.status(), AgentStatus::Provisioning);
        if availability == 1 {
            prop_assert_ne!(result.tier, Tier::Optimized);
        }
    }
}
