//! Test Helper Utilities
//!
//! Shared utilities for testing oplog-intake
#![allow(dead_code)]

pub mod scripted_backend;
pub mod stub_service;

pub use scripted_backend::ScriptedBackend;
pub use stub_service::{spawn_stub_service, StubService, StubState};

use oplog_intake::ImagePayload;

/// JPEG start-of-image marker, enough for MIME sniffing
pub const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46];

/// In-memory JPEG payload with the given file name
pub fn test_image(name: &str) -> ImagePayload {
    ImagePayload::from_bytes(name, JPEG_MAGIC.to_vec())
}
