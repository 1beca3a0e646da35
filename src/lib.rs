//*** START FILE: src/lib.rs ***//

// Declare all modules that are part of this library
pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod parsing;
pub mod practice;
pub mod reading;
pub mod services;
pub mod session;
pub mod store;
pub mod types {
    pub mod lookup;
    pub mod story;
}

// Re-exports for main.rs and the integration tests
pub use app::{AuthMode, CoachApp};
pub use config::Config;
pub use error::{CoachError, CoachResult};

//*** END FILE: src/lib.rs ***//
