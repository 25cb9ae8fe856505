use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum JumpError {
    #[error("Invalid number. Must be between 1 and {total}")]
    OutOfRange { target: usize, total: usize },
    #[error("No numbers loaded")]
    Empty,
}

/// Wrapping index over a list of `total` entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NavigationCursor {
    index: usize,
    total: usize,
}

impl NavigationCursor {
    pub fn new(total: usize) -> Self {
        Self { index: 0, total }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Advance by one, wrapping to the first entry. `None` on an empty list.
    pub fn next(&mut self) -> Option<usize> {
        if self.total == 0 {
            return None;
        }
        self.index = (self.index + 1) % self.total;
        Some(self.index)
    }

    /// Step back by one, wrapping to the last entry. `None` on an empty list.
    pub fn previous(&mut self) -> Option<usize> {
        if self.total == 0 {
            return None;
        }
        self.index = (self.index + self.total - 1) % self.total;
        Some(self.index)
    }

    /// Jump to a 1-indexed position. The index is untouched on failure.
    pub fn jump(&mut self, target: usize) -> Result<usize, JumpError> {
        if self.total == 0 {
            return Err(JumpError::Empty);
        }
        if target == 0 || target > self.total {
            return Err(JumpError::OutOfRange {
                target,
                total: self.total,
            });
        }
        self.index = target - 1;
        Ok(self.index)
    }
}
