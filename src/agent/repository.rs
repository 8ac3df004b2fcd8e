//! Agent repository port and adapters.

pub mod contract;
pub mod memory;
pub mod xdg;

pub use contract::AgentRepository;
pub use memory::InMemoryAgentRepository;
pub use xdg::XdgAgentRepository;
