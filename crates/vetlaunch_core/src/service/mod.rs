//! Core use-case services.
//!
//! # Responsibility
//! - Own in-memory state (notification stream, handle caches) and mutate it
//!   only through service operations.
//! - Keep UI layers decoupled from collaborator details.

pub mod fallback;
pub mod notification_store;
pub mod playback_tracker;
pub mod resource_cache;
pub mod tutor_service;
