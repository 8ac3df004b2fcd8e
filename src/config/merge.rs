//! Merge policy and service for config composition.

pub mod policy;
pub mod service;
