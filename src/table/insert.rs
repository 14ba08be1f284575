use super::{fnv_mix, GcRequested, UniqueTable, FILL_THRESHOLD, PROBE_BOUND, STATUS_CLAIMED, STATUS_EMPTY, STATUS_LIVE, STATUS_MASK};
use crate::node::Node;
use likely_stable::unlikely;
use std::sync::atomic::Ordering;

pub(crate) struct InsertOutcome {
    pub index: u64,
    pub created: bool,
}

impl UniqueTable {
    /// Hash-cons `node`: returns the existing slot if an equal `(var, low, high)` triple
    /// is already live, or claims and publishes a fresh slot otherwise (§4.2).
    ///
    /// Slot 0 is reserved for the terminal placeholder and is never returned here; callers
    /// only ever reach this function with a non-terminal node (terminals are handled
    /// entirely by [`crate::edge::Edge::FALSE`]/[`crate::edge::Edge::TRUE`] upstream in
    /// `makenode`).
    pub(crate) fn lookup_or_create(&self, node: Node) -> Result<InsertOutcome, GcRequested> {
        debug_assert!(!node.is_terminal());

        let hash = fnv_mix(node.key_bits(), self.salt);
        let tag = Self::hash_tag(hash);
        let mut index = hash & self.mask;
        // Never probe into slot 0: it is permanently reserved for the terminal
        // placeholder and would otherwise look like a hash collision forever.
        if index == 0 {
            index = 1;
        }

        let mut probed: u64 = 0;
        let probe_bound = ((self.capacity() as f64) * PROBE_BOUND) as u64 + 64;

        loop {
            let slot = &self.slots[index as usize];
            let header = slot.header.load(Ordering::Acquire);
            let status = header & STATUS_MASK;
            let slot_tag = header >> super::STATUS_BITS;

            if status == STATUS_EMPTY {
                let claim_header = (tag << super::STATUS_BITS) | STATUS_CLAIMED;
                match slot.header.compare_exchange(0, claim_header, Ordering::AcqRel, Ordering::Acquire) {
                    Ok(_) => {
                        let (w0, w1) = node.to_words();
                        slot.word0.store(w0, Ordering::Relaxed);
                        slot.word1.store(w1, Ordering::Release);
                        slot.header.store((tag << super::STATUS_BITS) | STATUS_LIVE, Ordering::Release);
                        self.live_count.fetch_add(1, Ordering::Relaxed);
                        return Ok(InsertOutcome { index, created: true });
                    }
                    Err(_) => continue, // lost the race; re-examine this slot's new state
                }
            } else if status == STATUS_CLAIMED && slot_tag == tag {
                // A concurrent insert of (possibly) the same key is in flight. Spin until
                // it publishes LIVE, bounded by roughly one cache-miss's worth of spins,
                // then re-check this same slot.
                let mut spins = 0;
                loop {
                    let h = slot.header.load(Ordering::Acquire);
                    if h & STATUS_MASK != super::STATUS_CLAIMED {
                        break;
                    }
                    std::hint::spin_loop();
                    spins += 1;
                    if spins > 10_000 {
                        break;
                    }
                }
                continue;
            } else if status == STATUS_LIVE && slot_tag == tag {
                let existing = Node::from_words(slot.word0.load(Ordering::Acquire), slot.word1.load(Ordering::Acquire));
                // Compare on `key_bits`, not the raw words: `existing` may have survived a
                // GC cycle and still carry last sweep's `MARK_BIT` (only the *next*
                // cycle's `clear_marks` resets it, see `table::gc::sweep`), which would
                // otherwise make an identical `(var, low, high)` triple compare unequal
                // to the freshly packed `node` and spuriously duplicate the slot (I1).
                if existing.key_bits() == node.key_bits() {
                    return Ok(InsertOutcome { index, created: false });
                }
                // Same tag, different payload: a genuine hash collision, keep probing.
            }
            // Otherwise (LIVE/TOMBSTONE with a different tag): keep probing.

            index = (index + 1) & self.mask;
            if index == 0 {
                index = 1;
            }
            probed += 1;

            if unlikely(probed > probe_bound || self.fill_fraction() > FILL_THRESHOLD) {
                return Err(GcRequested);
            }
        }
    }
}
