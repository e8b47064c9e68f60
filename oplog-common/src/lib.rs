//! # OP Log Common Library
//!
//! Shared code for the OP Log intake tools including:
//! - Error type
//! - Configuration loading (TOML + environment)
//! - Event types (IntakeEvent enum) and the EventBus
//! - Record field catalog and value conversion
//! - Record date parsing

pub mod config;
pub mod error;
pub mod events;
pub mod fields;
pub mod time;

pub use error::{Error, Result};
pub use fields::RecordFields;
