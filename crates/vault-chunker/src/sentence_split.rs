use vault_core::Sentence;

/// Left-to-right scan for delimiter matches, in the priority order given by
/// `delimiters`. Empty/whitespace-only spans are discarded but still
/// advance the scan cursor.
pub fn split_sentences(text: &str, delimiters: &[String]) -> Vec<Sentence> {
    let mut sentences = Vec::new();
    let mut current_start = 0usize;
    let bytes_len = text.len();
    let mut i = 0usize;

    while i < bytes_len {
        let remainder = &text[i..];
        let matched_delim = delimiters.iter().find(|d| remainder.starts_with(d.as_str()));
        if let Some(delim) = matched_delim {
            let end = i + delim.len();
            push_trimmed(&mut sentences, text, current_start, end);
            current_start = end;
            i = end;
        } else {
            i += next_char_len(remainder);
        }
    }

    if current_start < bytes_len {
        push_trimmed(&mut sentences, text, current_start, bytes_len);
    }

    sentences
}

fn next_char_len(s: &str) -> usize {
    s.chars().next().map(|c| c.len_utf8()).unwrap_or(1)
}

fn push_trimmed(sentences: &mut Vec<Sentence>, text: &str, start: usize, end: usize) {
    let raw = &text[start..end];
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return;
    }
    let leading_ws = raw.len() - raw.trim_start().len();
    let trailing_ws = raw.trim_start().len() - trimmed.len();
    let trimmed_start = start + leading_ws;
    let trimmed_end = end - trailing_ws;
    sentences.push(Sentence::new(trimmed.to_string(), trimmed_start, trimmed_end));
}
