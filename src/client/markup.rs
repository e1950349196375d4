//! Line-oriented micro-markup used by model replies.
//!
//! Grammar: a line wrapped in a triple-backtick pair is a fenced code line,
//! a line starting with `* ` is a list item, and `**text**` inside a line
//! is bold. The relay core only ever hands consumers a plain string; this
//! is the consumer-side interpretation.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span {
    Text(String),
    Bold(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Code(String),
    Item(Vec<Span>),
    Line(Vec<Span>),
}

/// Split a message into renderable blocks, one per line.
pub fn render(message: &str) -> Vec<Block> {
    message
        .split('\n')
        .map(|line| {
            if line.len() >= 6 && line.starts_with("```") && line.ends_with("```") {
                Block::Code(line[3..line.len() - 3].to_string())
            } else if let Some(rest) = line.strip_prefix("* ") {
                Block::Item(spans(rest))
            } else {
                Block::Line(spans(line))
            }
        })
        .collect()
}

/// Split a line into text and `**bold**` spans. An unmatched `**` is
/// treated as literal text.
fn spans(line: &str) -> Vec<Span> {
    let mut out = Vec::new();
    let mut rest = line;
    while let Some(start) = rest.find("**") {
        match rest[start + 2..].find("**") {
            Some(len) => {
                if start > 0 {
                    out.push(Span::Text(rest[..start].to_string()));
                }
                out.push(Span::Bold(rest[start + 2..start + 2 + len].to_string()));
                rest = &rest[start + 2 + len + 2..];
            }
            None => break,
        }
    }
    if !rest.is_empty() {
        out.push(Span::Text(rest.to_string()));
    }
    out
}
