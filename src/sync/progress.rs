//! Run progress as a percentage of work units.

/// Fixed units spent before reconciling: task-source connect, ALM server
/// connect, ALM project connect, and the task fetch.
pub const CONNECTION_UNITS: u32 = 4;

/// Tracks completed work units for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    completed: u32,
    total: u32,
}

impl Default for Progress {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress {
    /// Starts a run with only the connection units known.
    #[must_use]
    pub fn new() -> Self {
        Self {
            completed: 0,
            total: CONNECTION_UNITS,
        }
    }

    /// Sets the total once the in-scope task count is known.
    ///
    /// Every task costs one unit per pass; a delete pass doubles the task
    /// share.
    pub fn set_task_units(&mut self, task_count: usize, passes: u32) {
        let task_units = u32::try_from(task_count)
            .unwrap_or(u32::MAX)
            .saturating_mul(passes);
        self.total = CONNECTION_UNITS.saturating_add(task_units);
    }

    /// Marks one unit done and returns the new percentage.
    pub fn advance(&mut self) -> u8 {
        self.completed = self.completed.saturating_add(1).min(self.total);
        self.percent()
    }

    /// Completes the remaining units (used when a run stops early).
    pub fn complete(&mut self) -> u8 {
        self.completed = self.total;
        self.percent()
    }

    /// `100 * completed / total`, rounded down.
    #[must_use]
    pub fn percent(&self) -> u8 {
        let pct = u64::from(self.completed) * 100 / u64::from(self.total.max(1));
        u8::try_from(pct.min(100)).unwrap_or(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_units_alone() {
        let mut progress = Progress::new();
        assert_eq!(progress.advance(), 25);
        assert_eq!(progress.advance(), 50);
    }

    #[test]
    fn tasks_extend_the_total() {
        let mut progress = Progress::new();
        for _ in 0..CONNECTION_UNITS {
            progress.advance();
        }
        progress.set_task_units(4, 1);
        assert_eq!(progress.percent(), 50);
        for _ in 0..4 {
            progress.advance();
        }
        assert_eq!(progress.percent(), 100);
    }

    #[test]
    fn delete_pass_doubles_task_units() {
        let mut progress = Progress::new();
        progress.set_task_units(2, 2);
        for _ in 0..4 {
            progress.advance();
        }
        assert_eq!(progress.percent(), 50);
    }

    #[test]
    fn never_exceeds_one_hundred() {
        let mut progress = Progress::new();
        for _ in 0..10 {
            progress.advance();
        }
        assert_eq!(progress.percent(), 100);
        assert_eq!(Progress::new().complete(), 100);
    }
}
