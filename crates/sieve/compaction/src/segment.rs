//! Chunking along line and sentence boundaries.

use crate::patterns;

/// A contiguous piece of an artifact's processed text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    /// Char offset of the first character in the processed text.
    pub offset: usize,
    pub text: String,
}

/// Split one line into sentence units, keeping char offsets.
fn sentence_units(line: &str, line_offset: usize) -> Vec<Segment> {
    let mut units = Vec::new();
    let mut start_byte = 0;
    let mut push = |start: usize, end: usize| {
        let raw = &line[start..end];
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return;
        }
        let lead = raw.len() - raw.trim_start().len();
        let offset = line_offset + line[..start + lead].chars().count();
        units.push(Segment {
            offset,
            text: trimmed.to_string(),
        });
    };
    for m in patterns::sentence_end().find_iter(line) {
        push(start_byte, m.end());
        start_byte = m.end();
    }
    push(start_byte, line.len());
    units
}

/// Hard-split an over-long unit into windows of at most `max_chars`,
/// preferring to break at whitespace.
fn split_long(unit: Segment, max_chars: usize) -> Vec<Segment> {
    let chars: Vec<char> = unit.text.chars().collect();
    if chars.len() <= max_chars {
        return vec![unit];
    }
    let mut out = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let hard_end = (start + max_chars).min(chars.len());
        let mut end = hard_end;
        if hard_end < chars.len() {
            if let Some(space) = chars[start..hard_end].iter().rposition(|c| c.is_whitespace()) {
                if space > 0 {
                    end = start + space;
                }
            }
        }
        let piece: String = chars[start..end].iter().collect();
        let lead = piece.chars().take_while(|c| c.is_whitespace()).count();
        let trimmed = piece.trim();
        if !trimmed.is_empty() {
            out.push(Segment {
                offset: unit.offset + start + lead,
                text: trimmed.to_string(),
            });
        }
        start = end;
        while start < chars.len() && chars[start].is_whitespace() {
            start += 1;
        }
    }
    out
}

/// Segment processed text into chunks of at most `max_chars` characters.
///
/// Sentences on the same line are merged while they fit. A chunk never
/// spans two lines. Offsets are char offsets into `text`.
pub fn segment(text: &str, max_chars: usize) -> Vec<Segment> {
    if max_chars == 0 {
        return Vec::new();
    }
    let mut chunks = Vec::new();
    let mut line_offset = 0;
    for line in text.split('\n') {
        let mut current: Option<Segment> = None;
        for unit in sentence_units(line, line_offset)
            .into_iter()
            .flat_map(|u| split_long(u, max_chars))
        {
            current = match current.take() {
                Some(mut open) => {
                    let open_len = open.text.chars().count();
                    let sep = unit.offset.saturating_sub(open.offset + open_len).max(1);
                    if open_len + sep + unit.text.chars().count() <= max_chars {
                        open.text.push_str(&" ".repeat(sep));
                        open.text.push_str(&unit.text);
                        Some(open)
                    } else {
                        chunks.push(open);
                        Some(unit)
                    }
                }
                None => Some(unit),
            };
        }
        if let Some(open) = current {
            chunks.push(open);
        }
        line_offset += line.chars().count() + 1;
    }
    chunks
}
