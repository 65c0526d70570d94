//! Shared utilities for the store implementations.

use regex::Regex;
use std::time::Duration;

use crate::error::CacheError;

/// TTLs longer than this are stored without an expiry.
pub const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Compile a glob pattern into an anchored regex.
///
/// Supports the subset of Redis `MATCH` syntax shared by every store: `*`
/// matches any run of characters, `?` exactly one, `[abc]`, `[^abc]` and
/// `[a-z]` match one character from a class, and `\` escapes the next
/// character. An unterminated `[` matches itself.
pub fn glob_to_regex(pattern: &str) -> Result<Regex, CacheError> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut source = String::with_capacity(pattern.len() + 8);
    source.push('^');

    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' => source.push_str(".*"),
            '?' => source.push('.'),
            '\\' if i + 1 < chars.len() => {
                i += 1;
                push_literal(&mut source, chars[i]);
            }
            '[' => match class_end(&chars, i + 1) {
                Some(end) => {
                    push_class(&mut source, &chars[i + 1..end]);
                    i = end;
                }
                None => push_literal(&mut source, '['),
            },
            other => push_literal(&mut source, other),
        }
        i += 1;
    }
    source.push('$');

    Regex::new(&source)
        .map_err(|e| CacheError::InvalidKey(format!("invalid pattern '{}': {}", pattern, e)))
}

fn push_literal(source: &mut String, ch: char) {
    source.push_str(&regex::escape(ch.encode_utf8(&mut [0; 4])));
}

/// Index of the `]` closing a class whose body starts at `start`.
fn class_end(chars: &[char], start: usize) -> Option<usize> {
    let mut j = start;
    while j < chars.len() {
        match chars[j] {
            '\\' => j += 2,
            ']' if j > start => return Some(j),
            _ => j += 1,
        }
    }
    None
}

fn push_class(source: &mut String, body: &[char]) {
    source.push('[');
    let first = usize::from(body.first() == Some(&'^'));
    if first == 1 {
        source.push('^');
    }

    let mut k = first;
    while k < body.len() {
        match body[k] {
            '\\' if k + 1 < body.len() => {
                k += 1;
                push_class_literal(source, body[k]);
            }
            '-' if k > first && k + 1 < body.len() => source.push('-'),
            other => push_class_literal(source, other),
        }
        k += 1;
    }
    source.push(']');
}

fn push_class_literal(source: &mut String, ch: char) {
    if matches!(ch, '\\' | '[' | ']' | '^' | '-' | '&' | '~') {
        source.push('\\');
    }
    source.push(ch);
}

/// Escape glob metacharacters so `value` matches only itself.
pub fn escape_glob(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// The TTL to hand to a backend, or `None` for "never expire".
pub fn bounded_ttl(ttl: Duration) -> Option<Duration> {
    (ttl <= MAX_TTL).then_some(ttl)
}

/// Whole milliseconds for a TTL, never less than one.
///
/// Stores reject a zero expiry, so sub-millisecond TTLs are rounded up.
pub fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}
