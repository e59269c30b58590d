//! Repeated-tap counting.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TapCounter {
    pub count: u32,
    pub last_tap_ms: Option<u64>,
}

impl TapCounter {
    /// Registers a contact-down. Returns true when the count reaches
    /// `target`; the counter is then reset to zero.
    pub fn register(&mut self, now_ms: u64, interval_ms: u64, target: u32) -> bool {
        let within = self
            .last_tap_ms
            .is_some_and(|last| now_ms.saturating_sub(last) < interval_ms);
        self.count = if within { self.count + 1 } else { 1 };
        self.last_tap_ms = Some(now_ms);

        if self.count >= target {
            self.count = 0;
            return true;
        }
        false
    }

    pub fn clear(&mut self) {
        self.count = 0;
    }
}
