//
// Copyright 2022 Axolotl Protocol Contributors
// SPDX-License-Identifier: AGPL-3.0-only
//

/// Timestamp recorded as milliseconds since the Unix epoch.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const fn from_epoch_millis(milliseconds: u64) -> Self {
        Self(milliseconds)
    }

    pub const fn epoch_millis(&self) -> u64 {
        self.0
    }

    pub const fn add_millis(&self, milliseconds: u64) -> Self {
        Self(self.0 + milliseconds)
    }

    /// Milliseconds elapsed between `earlier` and `self`, zero if `earlier`
    /// is in the future relative to `self`.
    pub const fn millis_since(&self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl From<std::time::SystemTime> for Timestamp {
    fn from(value: std::time::SystemTime) -> Self {
        let millis = value
            .duration_since(std::time::SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        Self(millis as u64)
    }
}

impl From<Timestamp> for std::time::SystemTime {
    fn from(value: Timestamp) -> Self {
        Self::UNIX_EPOCH + std::time::Duration::from_millis(value.epoch_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_since_saturates() {
        let early = Timestamp::from_epoch_millis(1000);
        let late = early.add_millis(250);
        assert_eq!(250, late.millis_since(early));
        assert_eq!(0, early.millis_since(late));
    }
}
