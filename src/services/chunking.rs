use crate::core::config::Settings;

#[derive(Debug, Clone, Copy)]
pub(crate) struct ChunkingConfig {
    pub(crate) max_chars: usize,
    pub(crate) overlap_chars: usize,
}

impl ChunkingConfig {
    pub(crate) fn from_settings(settings: &Settings) -> Self {
        Self {
            max_chars: settings.pipeline().chunk_size_chars,
            overlap_chars: settings.pipeline().chunk_overlap_chars,
        }
    }
}

/// Splits a document into overlapping segments of at most `max_chars`
/// characters, preferring paragraph breaks, then sentence ends, then word
/// boundaries before falling back to a hard cut. Consecutive chunks share
/// `overlap_chars` characters so context survives the boundary.
///
/// Empty input yields an empty sequence.
pub(crate) fn split_text(text: &str, config: ChunkingConfig) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }

    let max = config.max_chars.max(1);
    if chars.len() <= max {
        return vec![text.to_string()];
    }

    let overlap = config.overlap_chars.min(max - 1);
    let mut chunks = Vec::new();
    let mut start = 0usize;

    loop {
        let hard_end = (start + max).min(chars.len());
        let end = if hard_end == chars.len() {
            hard_end
        } else {
            split_point(&chars, start, hard_end)
        };

        chunks.push(chars[start..end].iter().collect());

        if end == chars.len() {
            break;
        }
        // Clamp keeps the cursor moving forward even for degenerate configs.
        start = end - overlap.min(end - start - 1);
    }

    chunks
}

/// Best boundary at or before `hard_end`, never earlier than the window
/// midpoint so boundary-seeking cannot collapse chunk sizes.
fn split_point(chars: &[char], start: usize, hard_end: usize) -> usize {
    let floor = start + (hard_end - start) / 2;

    let mut position = hard_end.saturating_sub(2);
    while position > floor {
        if chars[position] == '\n' && chars[position + 1] == '\n' {
            return position + 2;
        }
        position -= 1;
    }

    let mut position = hard_end.saturating_sub(2);
    while position > floor {
        if matches!(chars[position], '.' | '!' | '?') && chars[position + 1].is_whitespace() {
            return position + 2;
        }
        position -= 1;
    }

    let mut position = hard_end - 1;
    while position > floor {
        if chars[position].is_whitespace() {
            return position + 1;
        }
        position -= 1;
    }

    hard_end
}
