pub mod config;
pub mod error;
pub mod filter;
pub mod mask;
pub mod metrics;
pub mod pose;
pub mod provider;
pub mod session;

#[cfg(test)]
pub(crate) mod testutil;
