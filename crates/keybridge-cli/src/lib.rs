/*
[INPUT]:  Public API exports for keybridge-cli crate
[OUTPUT]: Module declarations and public re-exports
[POS]:    Crate root - library entry point
[UPDATE]: When adding new modules or public exports
*/

pub mod commands;
pub mod settings;

// Re-export main types for convenience
pub use commands::LinkArgs;
pub use settings::Settings;
