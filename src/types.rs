use serde::Serialize;

pub type DocId = u32;

/// One emitted token occurrence: the unit that flows through a token stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub term: String,
    /// Distance from the previous token's position; 0 stacks this token on the same slot.
    pub position_increment: u32,
    pub payload: Option<Vec<u8>>,
}

impl Token {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            position_increment: 1,
            payload: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LatticeFormat {
    /// `word|position|rank|score`
    #[default]
    Lattice,
    /// `word|position|rank|score|start_secs|stop_secs`
    Audio,
}

impl LatticeFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lattice => "lattice",
            Self::Audio => "audio",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        [Self::Lattice, Self::Audio]
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

/// A single term occurrence inside a matched span.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafOccurrence {
    pub term: String,
    pub position: u32,
    pub payload: Option<Vec<u8>>,
}

/// One span reported by a span matcher for a document.
///
/// Positions are half-open: `[start, end)`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanMatch {
    pub start: u32,
    pub end: u32,
    /// Number of positions skipped inside the span (the sloppy gap).
    pub slop_width: u32,
    pub leaves: Vec<LeafOccurrence>,
}

impl SpanMatch {
    pub fn width(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredDoc {
    pub doc: DocId,
    pub score: f32,
}
