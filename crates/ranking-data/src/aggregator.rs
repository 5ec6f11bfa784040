//! Per-manufacturer incident aggregation.

use std::collections::HashMap;

use ranking_core::models::{EventRecord, ManufacturerStat};
use tracing::debug;

use crate::reader::DeviceManufacturerSet;

// ── ManufacturerAggregator ────────────────────────────────────────────────────

/// Accumulates [`ManufacturerStat`]s over a single pass of events.
///
/// Stats are created on the first qualifying event for an id and kept in
/// first-seen order, which is the order [`finish`](Self::finish) returns.
#[derive(Debug)]
pub struct ManufacturerAggregator<'a> {
    known: &'a DeviceManufacturerSet,
    index: HashMap<u64, usize>,
    stats: Vec<ManufacturerStat>,
    discarded: u64,
}

impl<'a> ManufacturerAggregator<'a> {
    /// Start an aggregation restricted to manufacturers in `known`.
    pub fn new(known: &'a DeviceManufacturerSet) -> Self {
        Self {
            known,
            index: HashMap::new(),
            stats: Vec::new(),
            discarded: 0,
        }
    }

    /// Count one event. Returns `false` when the event was discarded because
    /// its manufacturer is unknown to the devices extract.
    pub fn add_event(&mut self, event: &EventRecord) -> bool {
        if !self.known.contains(event.manufacturer_id) {
            self.discarded += 1;
            return false;
        }

        let stats = &mut self.stats;
        let slot = *self.index.entry(event.manufacturer_id).or_insert_with(|| {
            stats.push(ManufacturerStat::new(event.manufacturer_id));
            stats.len() - 1
        });
        self.stats[slot].record(&event.flags);
        true
    }

    /// Number of events discarded so far.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    /// Materialise the collected stats in first-seen order.
    pub fn finish(self) -> Vec<ManufacturerStat> {
        debug!(
            manufacturers = self.stats.len(),
            discarded = self.discarded,
            "aggregation finished"
        );
        self.stats
    }

    /// Aggregate `events` in one call, returning the stats in first-seen
    /// order and the number of discarded events.
    pub fn aggregate(
        events: &[EventRecord],
        known: &'a DeviceManufacturerSet,
    ) -> (Vec<ManufacturerStat>, u64) {
        let mut aggregator = Self::new(known);
        for event in events {
            aggregator.add_event(event);
        }
        let discarded = aggregator.discarded();
        (aggregator.finish(), discarded)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use ranking_core::models::ClassFlags;

    fn event(id: u64, i: bool, ii: bool, iii: bool) -> EventRecord {
        EventRecord::new(
            id,
            ClassFlags {
                class_i: i,
                class_ii: ii,
                class_iii: iii,
            },
        )
    }

    fn known(ids: &[u64]) -> DeviceManufacturerSet {
        ids.iter().copied().collect()
    }

    #[test]
    fn test_aggregate_counts_per_manufacturer() {
        let devices = known(&[1, 2]);
        let events = vec![
            event(1, true, false, false),
            event(1, false, true, false),
            event(2, false, false, true),
        ];

        let (stats, discarded) = ManufacturerAggregator::aggregate(&events, &devices);

        assert_eq!(discarded, 0);
        assert_eq!(stats.len(), 2);
        assert_eq!(
            stats[0],
            ManufacturerStat {
                class_i_count: 1,
                class_ii_count: 1,
                class_iii_count: 0,
                total_events: 2,
                manufacturer_id: 1,
            }
        );
        assert_eq!(
            stats[1],
            ManufacturerStat {
                class_i_count: 0,
                class_ii_count: 0,
                class_iii_count: 1,
                total_events: 1,
                manufacturer_id: 2,
            }
        );
    }

    #[test]
    fn test_unknown_manufacturer_is_discarded() {
        let devices = known(&[1]);
        let mut aggregator = ManufacturerAggregator::new(&devices);

        assert!(aggregator.add_event(&event(1, true, false, false)));
        assert!(!aggregator.add_event(&event(99, true, true, true)));
        assert_eq!(aggregator.discarded(), 1);

        let stats = aggregator.finish();
        assert_eq!(stats.len(), 1);
        assert!(stats.iter().all(|s| devices.contains(s.manufacturer_id)));
    }

    #[test]
    fn test_multiple_flags_increment_independently() {
        let devices = known(&[4]);
        let events = vec![event(4, true, true, true), event(4, false, false, false)];

        let (stats, _) = ManufacturerAggregator::aggregate(&events, &devices);

        assert_eq!(stats[0].total_events, 2);
        assert_eq!(stats[0].class_i_count, 1);
        assert_eq!(stats[0].class_ii_count, 1);
        assert_eq!(stats[0].class_iii_count, 1);
    }

    #[test]
    fn test_first_seen_order_preserved() {
        let devices = known(&[1, 2, 3]);
        let events = vec![
            event(3, false, false, false),
            event(1, false, false, false),
            event(3, false, false, false),
            event(2, false, false, false),
        ];

        let ids: Vec<u64> = ManufacturerAggregator::aggregate(&events, &devices)
            .0
            .iter()
            .map(|s| s.manufacturer_id)
            .collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn test_empty_inputs() {
        let devices = known(&[]);
        let (stats, discarded) =
            ManufacturerAggregator::aggregate(&[event(1, true, false, false)], &devices);
        assert!(stats.is_empty());
        assert_eq!(discarded, 1);
    }
}
