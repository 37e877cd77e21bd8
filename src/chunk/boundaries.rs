//! Break point detection for chunking

/// Priority levels for break points
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BreakPriority {
    /// Word boundary (lowest)
    Word = 1,
    /// Sentence boundary
    Sentence = 2,
    /// Line break
    Line = 3,
    /// Paragraph boundary (highest)
    Paragraph = 4,
}

/// A potential break point in text
#[derive(Debug, Clone)]
pub struct BreakPoint {
    /// Byte position; the chunk ends right before it
    pub position: usize,
    /// Priority of this break point
    pub priority: BreakPriority,
}

impl BreakPoint {
    pub fn new(position: usize, priority: BreakPriority) -> Self {
        Self { position, priority }
    }
}

/// Collect every candidate break point, sorted by position.
///
/// When several kinds land on the same position the strongest one wins.
pub fn find_break_points(text: &str) -> Vec<BreakPoint> {
    let mut points = Vec::new();

    for (i, _) in text.match_indices("\n\n") {
        points.push(BreakPoint::new(i + 2, BreakPriority::Paragraph));
    }

    for (i, _) in text.match_indices('\n') {
        points.push(BreakPoint::new(i + 1, BreakPriority::Line));
    }

    for pattern in [". ", "? ", "! ", ".\n"] {
        for (i, _) in text.match_indices(pattern) {
            points.push(BreakPoint::new(i + 2, BreakPriority::Sentence));
        }
    }

    for (i, _) in text.match_indices(' ') {
        points.push(BreakPoint::new(i + 1, BreakPriority::Word));
    }

    points.retain(|p| p.position <= text.len() && text.is_char_boundary(p.position));
    points.sort_by(|a, b| {
        a.position
            .cmp(&b.position)
            .then_with(|| b.priority.cmp(&a.priority))
    });
    points.dedup_by_key(|p| p.position);

    points
}

/// Ensure a position is on a valid UTF-8 character boundary, moving
/// backwards if needed
pub fn ensure_char_boundary(text: &str, pos: usize) -> usize {
    if pos >= text.len() {
        return text.len();
    }
    let mut adjusted = pos;
    while adjusted > 0 && !text.is_char_boundary(adjusted) {
        adjusted -= 1;
    }
    adjusted
}

/// The first character boundary strictly after `pos`
pub fn next_char_boundary(text: &str, pos: usize) -> usize {
    let mut adjusted = pos + 1;
    while adjusted < text.len() && !text.is_char_boundary(adjusted) {
        adjusted += 1;
    }
    adjusted.min(text.len())
}
