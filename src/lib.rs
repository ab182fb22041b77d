// Periods - Core Library
// Calendar-aligned periods with canonical boundaries, find-or-create storage
// and decomposition. Exposes all modules for the CLI and tests.

pub mod clock;
pub mod config;
pub mod db;
pub mod decompose;
pub mod error;
pub mod kind;
pub mod memory;
pub mod naming;
pub mod period;
pub mod store;
pub mod timestamp;

// Re-export commonly used types
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{Config, ConfigError};
pub use db::{setup_database, InsertOutcome, PeriodRepository, SqlitePeriodRepository};
pub use decompose::Subdivisions;
pub use error::{PeriodError, Result};
pub use kind::{epsilon, Behavior, PeriodType};
pub use memory::MemoryPeriodRepository;
pub use period::{DateProbe, Period, PeriodView};
pub use store::{week_number_bounds, DateSpec, PeriodStore};
pub use timestamp::{normalize, Timestamp};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
