//! Outbound notification queue entries

use spv_primitives::{Height, Uint256};
use std::time::{SystemTime, UNIX_EPOCH};

/// A pending notification: consumer `notify_id` must still be told about
/// transaction `tx_id`.
///
/// Entries are keyed by the `(notify_id, tx_id)` pair, so re-queuing the
/// same pair refreshes the existing entry instead of adding a second one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueItem {
    /// Consumer to notify
    pub notify_id: Uint256,
    /// Transaction the notification is about
    pub tx_id: Uint256,
    /// Height of the block that triggered the notification
    pub height: Height,
    /// Unix time (seconds) of the most recent delivery attempt, 0 if never
    pub last_notify: u64,
}

impl QueItem {
    /// Encoded key size: notify id followed by tx id
    pub const KEY_LEN: usize = Uint256::LEN * 2;

    /// Create an entry that has not been delivered yet
    pub fn new(notify_id: Uint256, tx_id: Uint256, height: Height) -> Self {
        Self {
            notify_id,
            tx_id,
            height,
            last_notify: 0,
        }
    }

    /// Composite `(notify_id, tx_id)` key
    pub fn key(&self) -> [u8; Self::KEY_LEN] {
        Self::key_of(&self.notify_id, &self.tx_id)
    }

    /// Composite key for an arbitrary pair
    pub fn key_of(notify_id: &Uint256, tx_id: &Uint256) -> [u8; Self::KEY_LEN] {
        let mut key = [0u8; Self::KEY_LEN];
        key[..32].copy_from_slice(notify_id.as_bytes());
        key[32..].copy_from_slice(tx_id.as_bytes());
        key
    }

    /// Record a delivery attempt at the current wall-clock time
    pub fn touch(&mut self) {
        self.last_notify = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
    }

    /// Whether at least `retry_after_secs` have passed since the last attempt
    pub fn is_due(&self, now: u64, retry_after_secs: u64) -> bool {
        now.saturating_sub(self.last_notify) >= retry_after_secs
    }
}
