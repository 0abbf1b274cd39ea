// Shared components
pub mod config;
pub mod error;
pub mod telemetry;

// Domain layer (drafting and rendering)
pub mod history;
pub mod template;
pub mod variable;

// Capabilities (persistence, files, remote publisher)
pub mod platform;
pub mod publish;
pub mod storage;

// Application layer
pub mod cli;
pub mod state;
