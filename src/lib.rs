/*!
 * Steadfast - rate-limited, retrying task execution
 *
 * Application layer around the `steadfast-core-resilience` engine:
 * - TOML configuration for the limiter, retry policy and logging
 * - Structured logging setup (stdout or JSON file)
 * - A synthetic workload runner used by the `steadfast` CLI
 */

pub mod config;
pub mod error;
pub mod logging;
pub mod simulate;

// Re-export commonly used types
pub use config::{HandlerKind, LimiterConfig, LogLevel, LoggingConfig, RetryConfig, SteadfastConfig};
pub use error::{Result, SteadfastError};
pub use simulate::{run_simulation, SimulationReport, Workload};
pub use steadfast_core_resilience as resilience;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
    }
}
