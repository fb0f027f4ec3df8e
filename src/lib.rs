pub mod driver;
pub mod error;
pub mod flows;
pub mod harness;
pub mod report;
pub mod runner;
pub mod utils;

// Re-export common items
pub use error::HarnessError;
pub use report::generate_report;
pub use runner::run_suite;
