//! Message splitting for size-limited chat transports.

/// Bytes reserved at the start of each part for the `(n/m) ` tag.
const TAG_RESERVE: usize = 12;

/// Split `text` into parts no longer than `max_len` bytes.
///
/// Breaks prefer line boundaries, then word boundaries, and only cut inside
/// a word when a single word is longer than a part. When more than one part
/// is produced each is prefixed with `(n/m) `.
///
/// ```
/// use sentinel_core::message::split_message;
///
/// assert_eq!(split_message("short", 100), vec!["short".to_string()]);
/// ```
pub fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_owned()];
    }

    let body_limit = max_len.saturating_sub(TAG_RESERVE).max(1);
    let mut bodies = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= body_limit {
            bodies.push(remaining);
            break;
        }

        let safe = floor_char_boundary(remaining, body_limit);
        let head = &remaining[..safe];
        let split_at = head
            .rfind('\n')
            .filter(|&pos| pos > 0)
            .or_else(|| head.rfind(' ').filter(|&pos| pos > 0))
            .unwrap_or(safe);
        let split_at = if split_at == 0 {
            ceil_char_boundary(remaining, 1)
        } else {
            split_at
        };

        let (chunk, rest) = remaining.split_at(split_at);
        let chunk = chunk.trim_end();
        if !chunk.trim_start().is_empty() {
            bodies.push(chunk);
        }
        remaining = rest
            .strip_prefix('\n')
            .or_else(|| rest.strip_prefix(' '))
            .unwrap_or(rest);
    }

    let total = bodies.len();
    if total == 0 {
        return vec![String::new()];
    }
    if total == 1 {
        return vec![bodies[0].to_owned()];
    }
    bodies
        .into_iter()
        .enumerate()
        .map(|(i, body)| format!("({}/{}) {}", i + 1, total, body))
        .collect()
}

/// Cut `s` to at most `max` bytes on a char boundary, appending `…` when cut.
pub fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_owned();
    }
    let end = floor_char_boundary(s, max.saturating_sub('…'.len_utf8()));
    format!("{}…", &s[..end])
}

/// Largest byte index `<= max` that is a char boundary.
fn floor_char_boundary(s: &str, max: usize) -> usize {
    if max >= s.len() {
        return s.len();
    }
    let mut i = max;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn ceil_char_boundary(s: &str, min: usize) -> usize {
    let mut i = min.min(s.len());
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i
}
