pub mod build;
pub mod maintain;
pub mod play;

// Re-export command functions for convenience
pub use build::build;
pub use maintain::{adjust, init_db, purge};
pub use play::play;
