//! Mention detection for notification and post text.

pub mod parser;
