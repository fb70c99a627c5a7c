//! `@mention` extraction and rendering.
//!
//! # Responsibility
//! - Find `@"quoted name"` and `@token` candidates in free text.
//! - Resolve candidates against a roster snapshot.
//! - Replace resolved candidates with presentation-safe inline markup.
//!
//! # Invariants
//! - Pure: no I/O, no logging, never fails.
//! - Unresolved candidates are copied to the output byte-for-byte.
//! - Rendered markup never contains a raw `@`, so parsing rendered output
//!   again resolves nothing new.
//! - Full display-name matches beat first-name matches; within one rule the
//!   first-listed roster entry wins.

use crate::model::directory::DirectoryEntry;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static MENTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"@"([^"\r\n]+)"|@([^\s"]+)"#).expect("valid mention regex"));

const TRAILING_PUNCTUATION: &[char] = &['.', ',', '!', '?', ';', ':', ')', ']', '}'];

/// Result of one parse pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MentionParse {
    /// Input text with resolved mentions replaced by markup.
    pub rendered_text: String,
    /// Roster ids of every resolved mention, deduplicated.
    pub mentioned_ids: BTreeSet<String>,
}

impl MentionParse {
    pub fn has_mentions(&self) -> bool {
        !self.mentioned_ids.is_empty()
    }
}

/// Parses `text` against `directory` and renders resolved mentions.
pub fn parse_mentions(text: &str, directory: &[DirectoryEntry]) -> MentionParse {
    let mut rendered = String::with_capacity(text.len());
    let mut mentioned_ids = BTreeSet::new();
    let mut cursor = 0;

    for caps in MENTION_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        if is_embedded_at(text, whole.start()) {
            continue;
        }

        let resolved = if let Some(quoted) = caps.get(1) {
            resolve(quoted.as_str(), directory).map(|entry| (entry, ""))
        } else if let Some(bare) = caps.get(2) {
            resolve_bare(bare.as_str(), directory)
        } else {
            None
        };

        let Some((entry, suffix)) = resolved else {
            continue;
        };

        rendered.push_str(&text[cursor..whole.start()]);
        rendered.push_str(&render_mention(entry));
        rendered.push_str(suffix);
        cursor = whole.end();
        mentioned_ids.insert(entry.id.clone());
    }

    rendered.push_str(&text[cursor..]);
    MentionParse {
        rendered_text: rendered,
        mentioned_ids,
    }
}

/// Renders the inline markup for one resolved entry.
pub fn render_mention(entry: &DirectoryEntry) -> String {
    format!(
        r#"<span class="mention" data-user-id="{}">{}</span>"#,
        escape_markup(&entry.id),
        escape_markup(&entry.display_name)
    )
}

// `name@host` is an address, not a mention.
fn is_embedded_at(text: &str, at: usize) -> bool {
    text[..at]
        .chars()
        .next_back()
        .is_some_and(char::is_alphanumeric)
}

// Tries the token as written first, then without trailing punctuation. The
// stripped punctuation is returned so it survives as literal text.
fn resolve_bare<'d, 't>(
    token: &'t str,
    directory: &'d [DirectoryEntry],
) -> Option<(&'d DirectoryEntry, &'t str)> {
    if let Some(entry) = resolve(token, directory) {
        return Some((entry, ""));
    }
    let trimmed = token.trim_end_matches(TRAILING_PUNCTUATION);
    if trimmed.is_empty() || trimmed.len() == token.len() {
        return None;
    }
    resolve(trimmed, directory).map(|entry| (entry, &token[trimmed.len()..]))
}

fn resolve<'d>(candidate: &str, directory: &'d [DirectoryEntry]) -> Option<&'d DirectoryEntry> {
    let needle = candidate.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }

    directory
        .iter()
        .find(|entry| entry.display_name.trim().to_lowercase() == needle)
        .or_else(|| {
            directory.iter().find(|entry| {
                entry
                    .first_name()
                    .is_some_and(|first| first.to_lowercase() == needle)
            })
        })
}

pub(crate) fn escape_markup(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            '@' => escaped.push_str("&#64;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::{escape_markup, parse_mentions};
    use crate::model::directory::DirectoryEntry;

    fn roster() -> Vec<DirectoryEntry> {
        vec![
            DirectoryEntry::new("u-john", "John Carter"),
            DirectoryEntry::new("u-jane", "Jane Q"),
            DirectoryEntry::new("u-john2", "John"),
            DirectoryEntry::new("u-maria", "Maria Lopez"),
        ]
    }

    #[test]
    fn resolves_quoted_full_name() {
        let parsed = parse_mentions(r#"Ping @"Jane Q" about the pitch"#, &roster());
        assert!(parsed.mentioned_ids.contains("u-jane"));
        assert!(!parsed.rendered_text.contains(r#"@"Jane Q""#));
        assert!(parsed.rendered_text.starts_with("Ping <span"));
        assert!(parsed.rendered_text.ends_with(" about the pitch"));
    }

    #[test]
    fn full_name_match_beats_earlier_first_name_match() {
        // "John Carter" is listed first, but "John" is an exact full-name hit.
        let parsed = parse_mentions("@John", &roster());
        assert_eq!(
            parsed.mentioned_ids.iter().collect::<Vec<_>>(),
            vec!["u-john2"]
        );
    }

    #[test]
    fn first_name_match_uses_first_listed_entry() {
        let directory = vec![
            DirectoryEntry::new("a", "Maria Lopez"),
            DirectoryEntry::new("b", "Maria Chen"),
        ];
        let parsed = parse_mentions("thanks @maria", &directory);
        assert_eq!(parsed.mentioned_ids.iter().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn trailing_punctuation_stays_literal() {
        let parsed = parse_mentions("Great job @Maria!", &roster());
        assert!(parsed.mentioned_ids.contains("u-maria"));
        assert!(parsed.rendered_text.ends_with("</span>!"));
    }

    #[test]
    fn unresolved_token_is_left_untouched() {
        let text = "hello @ZZZUnknown, and @\"Nobody Here\" too";
        let parsed = parse_mentions(text, &roster());
        assert_eq!(parsed.rendered_text, text);
        assert!(parsed.mentioned_ids.is_empty());
    }

    #[test]
    fn email_addresses_are_not_mentions() {
        let text = "mail maria@example.com";
        let parsed = parse_mentions(text, &roster());
        assert_eq!(parsed.rendered_text, text);
        assert!(!parsed.has_mentions());
    }

    #[test]
    fn rendering_is_idempotent() {
        let directory = vec![
            DirectoryEntry::new("odd@id", "Ann @Home"),
            DirectoryEntry::new("u-bob", "Bob"),
        ];
        let text = r#"@"Ann @Home" meet @Bob and @Ghost; also @John@Bob"#;
        let first = parse_mentions(text, &directory);
        assert_eq!(first.mentioned_ids.len(), 2);

        let second = parse_mentions(&first.rendered_text, &directory);
        assert!(second.mentioned_ids.is_empty());
        assert_eq!(second.rendered_text, first.rendered_text);
    }

    #[test]
    fn markup_escapes_at_sign_and_html() {
        assert_eq!(escape_markup("<a@b>"), "&lt;a&#64;b&gt;");
    }

    #[test]
    fn duplicate_mentions_collect_one_id() {
        let parsed = parse_mentions("@Bob and @bob", &[DirectoryEntry::new("u-bob", "Bob")]);
        assert_eq!(parsed.mentioned_ids.len(), 1);
        assert_eq!(parsed.rendered_text.matches("<span").count(), 2);
    }
}
