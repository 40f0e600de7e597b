pub mod config;
pub mod logging;
pub mod report;
pub mod sampler;
pub mod session;
pub mod signal;
pub mod system;
