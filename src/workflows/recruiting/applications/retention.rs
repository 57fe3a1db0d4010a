use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};

use crate::config::RetentionSettings;

use super::domain::AuditEntry;

/// Bounds the audit history kept for a single application. The age rule
/// drops entries past the retention window; the count rule keeps only the
/// newest entries by timestamp. A non-positive setting disables the
/// respective rule, and both rules always operate per application, never
/// across the whole directory.
#[derive(Debug, Clone, Copy)]
pub struct AuditRetentionPolicy {
    retention_days: i64,
    max_entries: usize,
}

impl AuditRetentionPolicy {
    pub fn new(retention_days: i64, max_entries: usize) -> Self {
        Self {
            retention_days,
            max_entries,
        }
    }

    pub fn disabled() -> Self {
        Self::new(0, 0)
    }

    pub fn from_settings(settings: &RetentionSettings) -> Self {
        Self::new(settings.audit_retention_days, settings.audit_max_entries)
    }

    pub fn is_active(&self) -> bool {
        self.retention_days > 0 || self.max_entries > 0
    }

    /// Prune one application's trail in place, returning how many entries
    /// were dropped. Kept entries stay in their original order.
    pub fn prune(&self, trail: &mut Vec<AuditEntry>, now: DateTime<Utc>) -> usize {
        let before = trail.len();

        if self.retention_days > 0 {
            let cutoff = now - Duration::days(self.retention_days);
            trail.retain(|entry| entry.recorded_at >= cutoff);
        }

        if self.max_entries > 0 && trail.len() > self.max_entries {
            let mut newest_first: Vec<usize> = (0..trail.len()).collect();
            newest_first.sort_by(|&a, &b| {
                trail[b]
                    .recorded_at
                    .cmp(&trail[a].recorded_at)
                    .then(b.cmp(&a))
            });
            let keep: HashSet<usize> = newest_first.into_iter().take(self.max_entries).collect();

            let mut index = 0;
            trail.retain(|_| {
                let kept = keep.contains(&index);
                index += 1;
                kept
            });
        }

        before - trail.len()
    }
}
