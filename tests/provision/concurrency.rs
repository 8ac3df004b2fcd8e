//! Concurrent provisioning against one readiness gate

use crate::support::{config, memory_config, provisioner, CountingInitializer};
use berth::agent::AgentSpec;
use berth::config::{BerthConfig, EnrichmentMode, ProvisioningConfig};
use berth::readiness::GatePhase;
use berth::{AgentStatus, Tier};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_calls_initialize_once() {
    let init = CountingInitializer::new(Duration::from_millis(50));
    let provisioner = Arc::new(provisioner(config(2_000, EnrichmentMode::Awaited), &init));

    let calls = (0..32).map(|i| {
        let provisioner = Arc::clone(&provisioner);
        tokio::spawn(async move {
            provisioner
                .provision(AgentSpec::new(format!("Worker {}", i)))
                .await
        })
    });
    let results = join_all(calls).await;

    assert_eq!(init.calls(), 1);
    for result in results {
        let provisioned = result.unwrap().unwrap();
        assert_eq!(provisioned.tier, Tier::Optimized);
        assert!(provisioned.entity.llm().is_pooled());
    }
    assert_eq!(provisioner.registry().len(), 32);
    assert_eq!(provisioner.health().gate, GatePhase::Ready);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_timeouts_share_one_setup() {
    let init = CountingInitializer::new(Duration::from_millis(1_000));
    let provisioner = Arc::new(provisioner(config(20, EnrichmentMode::Awaited), &init));

    let calls = (0..16).map(|i| {
        let provisioner = Arc::clone(&provisioner);
        tokio::spawn(async move {
            provisioner
                .provision(AgentSpec::new(format!("Impatient {}", i)))
                .await
        })
    });
    for result in join_all(calls).await {
        let provisioned = result.unwrap().unwrap();
        assert_eq!(provisioned.tier, Tier::Fallback);
        assert_eq!(provisioned.entity.status(), AgentStatus::Degraded);
    }

    assert_eq!(init.calls(), 1);
    assert_eq!(provisioner.health().gate, GatePhase::Initializing);
    assert_eq!(
        provisioner.health().latency.by_tier.get(&Tier::Fallback),
        Some(&16)
    );
}

#[tokio::test]
async fn test_warm_starts_setup_once() {
    let init = CountingInitializer::new(Duration::from_millis(10));
    let provisioner = provisioner(config(1_000, EnrichmentMode::Awaited), &init);

    assert_eq!(provisioner.health().gate, GatePhase::Uninitialized);
    assert!(provisioner.warm());
    assert!(!provisioner.warm());

    let result = provisioner.provision(AgentSpec::new("After Warmup")).await.unwrap();
    assert_eq!(result.tier, Tier::Optimized);
    assert_eq!(init.calls(), 1);
    assert!(provisioner.health().gate_init_ms.is_some());
}

#[tokio::test]
async fn test_agents_share_pooled_profiles() {
    let init = CountingInitializer::new(Duration::ZERO);
    let provisioner = provisioner(config(1_000, EnrichmentMode::Awaited), &init);

    let a = provisioner.provision(AgentSpec::new("Alpha Agent")).await.unwrap();
    let b = provisioner.provision(AgentSpec::new("Beta Agent")).await.unwrap();
    let c = provisioner
        .provision(AgentSpec::new("Gamma Agent").with_temperature(1.5))
        .await
        .unwrap();

    assert!(a.entity.llm().shares_profile(b.entity.llm()));
    assert!(!a.entity.llm().shares_profile(c.entity.llm()));
}

#[tokio::test]
async fn test_caller_input_does_not_grow_shared_state() {
    let init = CountingInitializer::new(Duration::ZERO);
    let config = BerthConfig {
        provisioning: ProvisioningConfig {
            registry_capacity: 50,
            ..Default::default()
        },
        ..Default::default()
    };
    let provisioner = provisioner(config, &init);

    for i in 0..500 {
        let result = provisioner
            .provision(AgentSpec::new("Helper").with_model(format!("m-{}", i)))
            .await
            .unwrap();
        assert_eq!(result.tier, Tier::Optimized);
        assert_eq!(result.entity.llm().model(), format!("m-{}", i));
    }

    let pool = provisioner.gate().try_ready().unwrap();
    assert_eq!(pool.cached_profiles(), pool.config().max_cached_profiles);
    assert_eq!(provisioner.registry().len(), 50);
    assert_eq!(provisioner.health().latency.provisions, 500);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reads_during_detached_enrichment_see_whole_groups() {
    let init = CountingInitializer::new(Duration::ZERO);
    let provisioner = provisioner(config(1_000, EnrichmentMode::Detached), &init);

    let mut spec = AgentSpec::new("Release Manager")
        .with_role("Release Captain")
        .with_tools(["github", "slack", "notion"]);
    spec.config = memory_config();
    let result = provisioner.provision(spec).await.unwrap();
    let entity = Arc::clone(&result.entity);

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let entity = Arc::clone(&entity);
            tokio::spawn(async move {
                for _ in 0..200 {
                    let snapshot = entity.snapshot();
                    assert!(!snapshot.role.trim().is_empty());
                    assert!(!snapshot.goal.trim().is_empty());
                    assert!(snapshot.tools.len() <= 3);
                    if snapshot.memory.enabled {
                        assert!(snapshot.memory.settings.contains_key("memory_provider"));
                    }
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    let (outcome, _) = result.settle().await;
    for reader in join_all(readers).await {
        reader.unwrap();
    }

    assert!(outcome.unwrap().is_complete());
    assert_eq!(entity.status(), AgentStatus::Ready);
    assert_eq!(entity.role(), "Release Captain");
    assert_eq!(entity.tools().len(), 3);
}
