//! Domain model for notifications, roster entries and signed resources.
//!
//! # Responsibility
//! - Define plain data records shared by services and adapters.
//! - Keep derivations (severity, expiry, completion ratio) next to the data.
//!
//! # Invariants
//! - Records carry no I/O handles; they are safe to clone into observers.

pub mod directory;
pub mod notification;
pub mod resource;
