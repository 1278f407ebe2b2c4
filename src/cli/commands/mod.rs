//! CLI command implementations

pub mod sync;
pub mod version;

pub use sync::execute as sync;
pub use version::execute as version;
