pub mod aggregate;
pub mod collector;
pub mod fake;
pub mod provider;
pub mod resolver;
pub mod snapshot;
