//! Command tag generator.

/// Generates sequential command tags: `A0001`, `A0002`, ...
#[derive(Debug, Clone)]
pub struct TagGenerator {
    prefix: char,
    counter: u32,
}

impl TagGenerator {
    /// Creates a new tag generator with the given prefix.
    #[must_use]
    pub const fn new(prefix: char) -> Self {
        Self { prefix, counter: 0 }
    }

    /// Returns the next tag.
    pub fn next_tag(&mut self) -> String {
        self.counter = self.counter.wrapping_add(1);
        format!("{}{:04}", self.prefix, self.counter)
    }
}

impl Default for TagGenerator {
    fn default() -> Self {
        Self::new('A')
    }
}
