pub mod events;
pub mod setup;

pub use events::PageEvent;
pub use setup::{TelemetryConfig, TelemetryError, init_telemetry};
