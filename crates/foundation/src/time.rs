/// Engine time in whole milliseconds since the owning view was mounted.
///
/// Integer milliseconds keep timer ordering total and replayable.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Time(pub u64);

impl Time {
    pub const ZERO: Time = Time(0);

    pub fn from_millis(ms: u64) -> Self {
        Time(ms)
    }

    pub fn as_millis(self) -> u64 {
        self.0
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1000.0
    }

    /// Saturating offset by `ms` milliseconds.
    pub fn after(self, ms: u64) -> Self {
        Time(self.0.saturating_add(ms))
    }

    pub fn since(self, earlier: Time) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

#[cfg(test)]
mod tests {
    use super::Time;

    #[test]
    fn offsets_saturate() {
        assert_eq!(Time(5).after(10), Time(15));
        assert_eq!(Time(u64::MAX).after(1), Time(u64::MAX));
        assert_eq!(Time(3).since(Time(10)), 0);
        assert_eq!(Time(10).since(Time(3)), 7);
    }

    #[test]
    fn seconds_conversion() {
        assert_eq!(Time(1500).as_secs_f64(), 1.5);
    }
}
