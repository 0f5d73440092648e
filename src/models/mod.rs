//! Data models for the weather assistant
//!
//! - Location: a resolved place with coordinates
//! - Conditions: current weather observed at a location

pub mod conditions;
pub mod location;

// Re-export all public types for convenient access
pub use conditions::CurrentConditions;
pub use location::Location;
