//! Integration tests for the agent provisioning pipeline

mod concurrency;
mod enrichment;
mod persistence;
mod support;
mod tiers;
