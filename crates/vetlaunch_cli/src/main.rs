//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `vetlaunch_core` linkage.
//! - Show mention resolution for the given arguments against a demo roster.

use vetlaunch_core::{parse_mentions, DirectoryEntry};

fn demo_roster() -> Vec<DirectoryEntry> {
    vec![
        DirectoryEntry::new("u-1", "John Smith"),
        DirectoryEntry::new("u-2", "Capt. Lee"),
        DirectoryEntry::new("u-3", "Maria Garcia"),
    ]
}

fn main() {
    println!("vetlaunch_core ping={}", vetlaunch_core::ping());
    println!("vetlaunch_core version={}", vetlaunch_core::core_version());

    let text = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        return;
    }

    let parsed = parse_mentions(&text, &demo_roster());
    println!("rendered={}", parsed.rendered_text);
    let ids = parsed
        .mentioned_ids
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(",");
    println!("mentioned_ids=[{ids}]");
}
