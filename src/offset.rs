/// Watermark of consumed updates: always `max(update_id seen) + 1`, or 0.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OffsetTracker {
    current: i64,
}

impl OffsetTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> i64 {
        self.current
    }

    /// Move the watermark past `update_id`. Never moves backwards.
    pub fn advance(&mut self, update_id: i64) {
        self.current = self.current.max(update_id.saturating_add(1));
    }
}
