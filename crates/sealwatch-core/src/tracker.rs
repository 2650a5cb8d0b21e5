//! Rolling per-validator downtime statistics

use {
    sealwatch_common::config::ProducerOverride,
    sealwatch_common::types::{EpochNumber, ValidatorId, ValidatorStat},
    std::{cmp::Ordering, collections::HashMap},
    tracing::trace,
};

/// Accumulates per-validator counters over a scanned block range.
///
/// Stats are created lazily on first sight of a validator and never
/// deleted during a run. One `observe` call covers exactly one block;
/// blocks must arrive in increasing order for the streaks to mean
/// anything.
pub struct DowntimeTracker {
    stats: HashMap<ValidatorId, ValidatorStat>,
    order: Vec<ValidatorId>,
    producer_override: ProducerOverride,
}

impl DowntimeTracker {
    pub fn new(producer_override: ProducerOverride) -> Self {
        Self {
            stats: HashMap::new(),
            order: Vec::new(),
            producer_override,
        }
    }

    fn get_or_create(&mut self, id: &ValidatorId) -> &mut ValidatorStat {
        if !self.stats.contains_key(id) {
            self.order.push(id.clone());
        }
        self.stats
            .entry(id.clone())
            .or_insert_with(|| ValidatorStat::new(id.clone()))
    }

    /// Record one decoded block for `set`. Returns the display vector:
    /// the raw bits with the block producer forced to signed.
    pub fn observe(
        &mut self,
        epoch: EpochNumber,
        set: &[ValidatorId],
        decoded: &[bool],
        block_producer: Option<&ValidatorId>,
    ) -> Vec<bool> {
        let mut display = Vec::with_capacity(set.len());
        for (k, validator) in set.iter().enumerate() {
            let raw_signed = decoded.get(k).copied().unwrap_or(false);
            let produced = block_producer == Some(validator);
            let effective = raw_signed || produced;
            let counted = match self.producer_override {
                ProducerOverride::DisplayOnly => raw_signed,
                ProducerOverride::Counters => effective,
            };

            let stat = self.get_or_create(validator);
            stat.total_blocks += 1;
            if counted {
                stat.current_miss_streak = 0;
            } else {
                stat.missed_blocks += 1;
                stat.current_miss_streak += 1;
            }
            display.push(effective);
        }
        trace!("observed epoch {} block for {} validators", epoch, set.len());
        display
    }

    pub fn stat(&self, id: &ValidatorId) -> Option<&ValidatorStat> {
        self.stats.get(id)
    }

    /// Snapshot sorted by ascending miss ratio; ties keep first-seen order.
    pub fn snapshot(&self) -> Vec<ValidatorStat> {
        let mut out: Vec<ValidatorStat> = self
            .order
            .iter()
            .filter_map(|id| self.stats.get(id))
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            a.miss_ratio()
                .partial_cmp(&b.miss_ratio())
                .unwrap_or(Ordering::Equal)
        });
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<ValidatorId> {
        names.iter().map(|n| ValidatorId::from(*n)).collect()
    }

    #[test]
    fn test_streak_trajectory() {
        let mut tracker = DowntimeTracker::new(ProducerOverride::DisplayOnly);
        let set = ids(&["account_a"]);
        let id = &set[0];

        let mut streaks = Vec::new();
        for signed in [false, false, true, false] {
            tracker.observe(0, &set, &[signed], None);
            streaks.push(tracker.stat(id).unwrap().current_miss_streak);
        }

        assert_eq!(streaks, vec![1, 2, 0, 1]);
        let stat = tracker.stat(id).unwrap();
        assert_eq!(stat.missed_blocks, 3);
        assert_eq!(stat.total_blocks, 4);
    }

    #[test]
    fn test_snapshot_sorted_by_miss_ratio() {
        let mut tracker = DowntimeTracker::new(ProducerOverride::DisplayOnly);
        let set = ids(&["account_a", "account_b", "account_c"]);

        tracker.observe(0, &set, &[false, true, false], None);
        tracker.observe(0, &set, &[true, true, false], None);

        let snapshot = tracker.snapshot();
        let order: Vec<&str> = snapshot.iter().map(|s| s.address.0.as_str()).collect();
        assert_eq!(order, vec!["account_b", "account_a", "account_c"]);
        assert_eq!(snapshot[2].missed_blocks, 2);
    }

    #[test]
    fn test_snapshot_ties_keep_insertion_order() {
        let mut tracker = DowntimeTracker::new(ProducerOverride::DisplayOnly);
        let set = ids(&["account_c", "account_a", "account_b"]);

        tracker.observe(0, &set, &[true, true, true], None);

        let snapshot = tracker.snapshot();
        let order: Vec<&str> = snapshot.iter().map(|s| s.address.0.as_str()).collect();
        assert_eq!(order, vec!["account_c", "account_a", "account_b"]);
    }

    #[test]
    fn test_producer_override_display_only() {
        let mut tracker = DowntimeTracker::new(ProducerOverride::DisplayOnly);
        let set = ids(&["account_a"]);

        let display = tracker.observe(0, &set, &[false], Some(&set[0]));

        assert_eq!(display, vec![true]);
        let stat = tracker.stat(&set[0]).unwrap();
        assert_eq!(stat.missed_blocks, 1);
        assert_eq!(stat.current_miss_streak, 1);
    }

    #[test]
    fn test_producer_override_counters() {
        let mut tracker = DowntimeTracker::new(ProducerOverride::Counters);
        let set = ids(&["account_a"]);

        let display = tracker.observe(0, &set, &[false], Some(&set[0]));

        assert_eq!(display, vec![true]);
        let stat = tracker.stat(&set[0]).unwrap();
        assert_eq!(stat.missed_blocks, 0);
        assert_eq!(stat.current_miss_streak, 0);
    }

    #[test]
    fn test_short_decoded_vector_reads_as_missed() {
        let mut tracker = DowntimeTracker::new(ProducerOverride::DisplayOnly);
        let set = ids(&["account_a", "account_b"]);

        tracker.observe(0, &set, &[true], None);

        assert_eq!(tracker.stat(&set[1]).unwrap().missed_blocks, 1);
        assert_eq!(tracker.stat(&set[0]).unwrap().missed_blocks, 0);
    }

    #[test]
    fn test_snapshot_does_not_mutate() {
        let mut tracker = DowntimeTracker::new(ProducerOverride::DisplayOnly);
        let set = ids(&["account_a"]);
        tracker.observe(0, &set, &[false], None);

        let first = tracker.snapshot();
        let second = tracker.snapshot();
        assert_eq!(first, second);
    }
}
