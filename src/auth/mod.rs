// Core architecture components
mod config;
mod error;
mod record;
mod server;
mod server_builder;
mod time_utils;

// Flow components
mod code;
mod session;
mod visits;

// Client-side capabilities
pub mod client;

// Storage, cleanup, and delivery systems
pub mod cleanup;
pub mod notify;
pub mod password;
pub mod storage;

// Core components exports
pub use config::{AuthConfig, ConfigPreset};
pub use error::AuthError;
pub use record::{
    Identity, OtpRecord, Profile, Purpose, Session, VerificationStatus, Verified, VisitOutcome,
};
pub use server::AuthServer;
pub use server_builder::AuthServerBuilder;

// Flow component exports
pub use code::{CODE_DIGITS, CodeStore};
pub use session::SessionManager;
pub use visits::VisitCounter;

// Storage, cleanup, and delivery exports
pub use cleanup::{
    BoxedCleanupStrategy, CleanupStrategy, CustomCleanupStrategy, HybridCleanupStrategy,
};
pub use notify::{CustomNotifier, Notifier, NullNotifier};
pub use storage::{AuthStorage, MemoryStorage, StorageStats};

#[cfg(feature = "sqlite-storage")]
pub use storage::SqliteStorage;
