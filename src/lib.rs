pub mod abi;
pub mod chain;
pub mod config;
pub mod marketplace;
pub mod orchestrator;
pub mod rate_limit;
pub mod registry;
pub mod report;
pub mod utils;
