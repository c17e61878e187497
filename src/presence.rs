/// Presence counter: latest server-reported online count, nothing more
#[derive(Debug, Clone, Default)]
pub struct PresenceCounter {
    latest: Option<u32>,
}

impl PresenceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the most recent count; no history, no smoothing
    pub fn update(&mut self, count: u32) {
        self.latest = Some(count);
    }

    pub fn current(&self) -> Option<u32> {
        self.latest
    }
}
