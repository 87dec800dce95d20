//! Level-change detection for digital sensor lines.

/// Transition observed between two consecutive samples of a line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edge {
    Rose,
    Fell,
    Unchanged,
}

/// Remembers the previous level of one line.
///
/// The first observation only establishes the baseline, so a sensor that
/// already reads active at startup does not produce a spurious `Rose`.
#[derive(Clone, Debug, Default)]
pub struct EdgeDetector {
    last_level: Option<bool>,
}

impl EdgeDetector {
    pub fn new() -> Self {
        Self { last_level: None }
    }

    pub fn with_baseline(level: bool) -> Self {
        Self {
            last_level: Some(level),
        }
    }

    pub fn observe(&mut self, level: bool) -> Edge {
        let edge = match self.last_level {
            Some(false) if level => Edge::Rose,
            Some(true) if !level => Edge::Fell,
            _ => Edge::Unchanged,
        };
        self.last_level = Some(level);
        edge
    }

    pub fn level(&self) -> Option<bool> {
        self.last_level
    }

    pub fn reset(&mut self) {
        self.last_level = None;
    }
}
