//! EVT — extent tree.
//!
//! An epoch-versioned 1-D interval index over record ranges `[lo, hi]`
//! (inclusive). Answers "for probe range R at reader epoch E, enumerate all
//! covering entries with visibility flags" by sweeping the breakpoints of
//! every entry that overlaps R and was written at or before E, and picking
//! the highest-epoch entry at each resulting sub-range as the visible
//! writer; everything else overlapping that sub-range is covered, and
//! positions touched by nothing at all are holes.

use bitflags::bitflags;
use vos_types::epoch::Epoch;
use vos_types::error::VosError;
use vos_types::Result;

use crate::pm::PmAddr;

/// Where the bytes for one extent entry actually live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecAddr {
    /// A direct offset into the PM pool (inline/SCM-resident payload).
    Scm(PmAddr),
    /// An offset into the NVMe blob (staged, DMA-resident payload).
    Nvme(u64),
    /// No backing storage; reads synthesize zero-filled buffers.
    Hole,
}

impl RecAddr {
    pub fn is_hole(self) -> bool {
        matches!(self, RecAddr::Hole)
    }
}

/// One inserted extent entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvtEntry {
    pub epoch: Epoch,
    pub lo: u64,
    pub hi: u64,
    pub rec_size: u32,
    pub version: u64,
    pub addr: RecAddr,
}

impl EvtEntry {
    fn overlaps(&self, lo: u64, hi: u64) -> bool {
        self.lo <= hi && lo <= self.hi
    }
}

bitflags! {
    /// Iterator mode flags (§4.3). `VISIBLE` and `COVERED` are mutually
    /// exclusive when `SKIP_HOLES` is set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IterFlags: u32 {
        const VISIBLE     = 0b0000_0001;
        const COVERED      = 0b0000_0010;
        const SKIP_HOLES   = 0b0000_0100;
        const REVERSE      = 0b0000_1000;
        const FOR_PURGE    = 0b0001_0000;
        const FOR_REBUILD  = 0b0010_0000;
    }
}

/// A probe filter: the `[lo_range, hi_range]` positional window and the
/// `[epr_lo, epr_hi]` epoch range; only entries at or below `epr_hi` (the
/// reader epoch) are considered.
#[derive(Debug, Clone, Copy)]
pub struct Filter {
    pub lo_range: u64,
    pub hi_range: u64,
    pub reader_epoch: Epoch,
}

/// Classification produced for one yielded slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Covered,
}

/// One contiguous run of positions sharing the same classification and
/// (for non-hole slices) the same backing entry.
#[derive(Debug, Clone, Copy)]
pub struct Slice {
    pub lo: u64,
    pub hi: u64,
    pub visibility: Option<Visibility>,
    pub entry: Option<EvtEntry>,
}

impl Slice {
    pub fn is_hole(&self) -> bool {
        self.entry.is_none()
    }
}

/// An epoch-versioned extent tree. Entries are kept in an append-only
/// vector; a real PM-resident tree would page this through `vos_storage::pm`
/// instead, but the visibility/coverage algorithm is identical either way.
#[derive(Debug, Default)]
pub struct Evt {
    entries: Vec<EvtEntry>,
}

/// An embedded cursor. Slices are computed eagerly at `probe` time (the
/// moral equivalent of walking the tree's internal node stack), then
/// consumed one at a time by `fetch`/`next`.
#[derive(Debug, Default)]
pub struct Iter {
    slices: Vec<Slice>,
    pos: usize,
}

impl Evt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `entry`, failing `EXIST` on a duplicate `(epoch, [lo,hi])`.
    pub fn insert(&mut self, entry: EvtEntry) -> Result<()> {
        if self
            .entries
            .iter()
            .any(|e| e.epoch == entry.epoch && e.lo == entry.lo && e.hi == entry.hi)
        {
            return Err(VosError::AlreadyExists);
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Positions `iter` over the visible/covered slices of `filter` per
    /// `flags`.
    pub fn probe(&self, iter: &mut Iter, flags: IterFlags, filter: Filter) -> Result<()> {
        if filter.lo_range > filter.hi_range {
            return Err(VosError::Invalid("lo_range > hi_range".into()));
        }
        let mut slices = self.compute_slices(filter);
        slices.retain(|s| Self::slice_passes(s, flags));
        if flags.contains(IterFlags::REVERSE) {
            slices.reverse();
        }
        iter.slices = slices;
        iter.pos = 0;
        if iter.slices.is_empty() {
            return Err(VosError::NonExistent);
        }
        Ok(())
    }

    fn slice_passes(slice: &Slice, flags: IterFlags) -> bool {
        match slice.visibility {
            None => !flags.contains(IterFlags::SKIP_HOLES),
            Some(Visibility::Visible) => flags.contains(IterFlags::VISIBLE) || flags.is_empty(),
            Some(Visibility::Covered) => {
                flags.contains(IterFlags::COVERED)
                    || flags.contains(IterFlags::FOR_PURGE)
                    || flags.contains(IterFlags::FOR_REBUILD)
            }
        }
    }

    /// The core sweep: breaks `[lo_range, hi_range]` at every entry
    /// boundary, then classifies each resulting sub-range by the
    /// highest-epoch entry (at or below `reader_epoch`) that overlaps it.
    fn compute_slices(&self, filter: Filter) -> Vec<Slice> {
        let Filter {
            lo_range,
            hi_range,
            reader_epoch,
        } = filter;

        let candidates: Vec<&EvtEntry> = self
            .entries
            .iter()
            .filter(|e| e.epoch <= reader_epoch && e.overlaps(lo_range, hi_range))
            .collect();

        let mut breakpoints = vec![lo_range, hi_range + 1];
        for e in &candidates {
            if e.lo > lo_range && e.lo <= hi_range + 1 {
                breakpoints.push(e.lo);
            }
            if e.hi + 1 > lo_range && e.hi + 1 <= hi_range + 1 {
                breakpoints.push(e.hi + 1);
            }
        }
        breakpoints.sort_unstable();
        breakpoints.dedup();

        let mut slices = Vec::new();
        for window in breakpoints.windows(2) {
            let (seg_lo, seg_hi_excl) = (window[0], window[1]);
            if seg_lo >= seg_hi_excl {
                continue;
            }
            let seg_hi = seg_hi_excl - 1;

            let mut overlapping: Vec<&EvtEntry> = candidates
                .iter()
                .copied()
                .filter(|e| e.overlaps(seg_lo, seg_hi))
                .collect();
            overlapping.sort_by_key(|e| e.epoch);

            match overlapping.last() {
                None => slices.push(Slice {
                    lo: seg_lo,
                    hi: seg_hi,
                    visibility: None,
                    entry: None,
                }),
                Some(winner) => {
                    slices.push(Slice {
                        lo: seg_lo,
                        hi: seg_hi,
                        visibility: Some(Visibility::Visible),
                        entry: Some(**winner),
                    });
                    for covered in &overlapping[..overlapping.len() - 1] {
                        slices.push(Slice {
                            lo: seg_lo,
                            hi: seg_hi,
                            visibility: Some(Visibility::Covered),
                            entry: Some(**covered),
                        });
                    }
                }
            }
        }
        slices
    }

    /// Returns the entry, visibility flag, and record size the iterator is
    /// positioned over. The spec requires record size to be constant within
    /// one visible run; a mismatch is reported as `INVAL` by the operation
    /// engine when it reassembles a run, not here (this layer only surfaces
    /// individual slices).
    pub fn fetch(&self, iter: &Iter) -> Result<Slice> {
        iter.slices.get(iter.pos).copied().ok_or(VosError::NonExistent)
    }

    pub fn next(&self, iter: &mut Iter) -> Result<()> {
        if iter.pos + 1 >= iter.slices.len() {
            iter.pos = iter.slices.len();
            return Err(VosError::NonExistent);
        }
        iter.pos += 1;
        Ok(())
    }

    pub fn finish(&self, iter: &mut Iter) {
        iter.slices.clear();
        iter.pos = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(epoch: Epoch, lo: u64, hi: u64) -> EvtEntry {
        EvtEntry {
            epoch,
            lo,
            hi,
            rec_size: 1,
            version: 0,
            addr: RecAddr::Scm(PmAddr::from_raw(lo + 1)),
        }
    }

    fn collect(tree: &Evt, iter: &mut Iter, flags: IterFlags, filter: Filter) -> Vec<Slice> {
        let mut out = Vec::new();
        if tree.probe(iter, flags, filter).is_err() {
            return out;
        }
        loop {
            out.push(tree.fetch(iter).expect("fetch"));
            if tree.next(iter).is_err() {
                break;
            }
        }
        out
    }

    #[test]
    fn duplicate_epoch_and_range_is_rejected() {
        let mut tree = Evt::new();
        tree.insert(entry(1, 0, 10)).expect("first insert");
        let err = tree.insert(entry(1, 0, 10)).unwrap_err();
        assert!(matches!(err, VosError::AlreadyExists));
    }

    #[test]
    fn hole_read_scenario() {
        // write [0,1023]='A' at e=1 and [2048,3071]='C' at e=1; fetch
        // [0,3071] at e=1 should show A, a hole gap, then C.
        let mut tree = Evt::new();
        tree.insert(entry(1, 0, 1023)).expect("A");
        tree.insert(entry(1, 2048, 3071)).expect("C");

        let mut iter = Iter::default();
        let slices = collect(
            &tree,
            &mut iter,
            IterFlags::VISIBLE,
            Filter {
                lo_range: 0,
                hi_range: 3071,
                reader_epoch: 1,
            },
        );
        assert_eq!(slices.len(), 3);
        assert_eq!((slices[0].lo, slices[0].hi), (0, 1023));
        assert!(!slices[0].is_hole());
        assert_eq!((slices[1].lo, slices[1].hi), (1024, 2047));
        assert!(slices[1].is_hole());
        assert_eq!((slices[2].lo, slices[2].hi), (2048, 3071));
        assert!(!slices[2].is_hole());
    }

    #[test]
    fn epoch_shadowing_scenario() {
        // [0,1023]='A' at e=1, [512,1023]='B' at e=2.
        let mut tree = Evt::new();
        tree.insert(entry(1, 0, 1023)).expect("A");
        tree.insert(entry(2, 512, 1023)).expect("B");

        let mut iter = Iter::default();
        let at_e2 = collect(
            &tree,
            &mut iter,
            IterFlags::VISIBLE,
            Filter {
                lo_range: 0,
                hi_range: 1023,
                reader_epoch: 2,
            },
        );
        assert_eq!(at_e2.len(), 2);
        assert_eq!((at_e2[0].lo, at_e2[0].hi), (0, 511));
        assert_eq!(at_e2[0].entry.expect("entry").epoch, 1);
        assert_eq!((at_e2[1].lo, at_e2[1].hi), (512, 1023));
        assert_eq!(at_e2[1].entry.expect("entry").epoch, 2);

        let mut iter2 = Iter::default();
        let at_e1 = collect(
            &tree,
            &mut iter2,
            IterFlags::VISIBLE,
            Filter {
                lo_range: 0,
                hi_range: 1023,
                reader_epoch: 1,
            },
        );
        assert_eq!(at_e1.len(), 1);
        assert_eq!(at_e1[0].entry.expect("entry").epoch, 1);
    }

    #[test]
    fn covered_slices_surfaced_only_when_requested() {
        let mut tree = Evt::new();
        tree.insert(entry(1, 0, 1023)).expect("A");
        tree.insert(entry(2, 512, 1023)).expect("B");

        let mut iter = Iter::default();
        let covered = collect(
            &tree,
            &mut iter,
            IterFlags::COVERED,
            Filter {
                lo_range: 0,
                hi_range: 1023,
                reader_epoch: 2,
            },
        );
        assert_eq!(covered.len(), 1);
        assert_eq!(covered[0].entry.expect("entry").epoch, 1);
        assert_eq!((covered[0].lo, covered[0].hi), (512, 1023));
    }

    #[test]
    fn reverse_flag_yields_descending_lo_order() {
        let mut tree = Evt::new();
        tree.insert(entry(1, 0, 9)).expect("a");
        tree.insert(entry(1, 20, 29)).expect("b");

        let mut iter = Iter::default();
        let slices = collect(
            &tree,
            &mut iter,
            IterFlags::VISIBLE | IterFlags::SKIP_HOLES | IterFlags::REVERSE,
            Filter {
                lo_range: 0,
                hi_range: 29,
                reader_epoch: 1,
            },
        );
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].lo, 20);
        assert_eq!(slices[1].lo, 0);
    }
}
