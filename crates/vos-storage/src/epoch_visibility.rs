//! The uniform epoch/visibility rule shared by KBTR and EVT (applies to all
//! PM-resident entries carrying an `(earliest, latest)` pair and an optional
//! punch bit).

use vos_types::epoch::Epoch;

/// The outcome of applying the visibility rule to a single entry for a
/// reader positioned at a given epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Not yet created at the reader's epoch.
    NotYetCreated,
    /// Tombstoned (punched) at or before the reader's epoch.
    Tombstoned,
    /// Visible; the representative epoch the reader should observe is
    /// `min(latest, reader_epoch)`.
    Visible { representative_epoch: Epoch },
}

/// Applies §4.8's rule: a reader at `reader_epoch` against an entry with
/// `(earliest, latest)` and `punched`.
pub fn classify(earliest: Epoch, latest: Epoch, punched: bool, reader_epoch: Epoch) -> Visibility {
    if earliest > reader_epoch {
        return Visibility::NotYetCreated;
    }
    if latest <= reader_epoch && punched {
        return Visibility::Tombstoned;
    }
    Visibility::Visible {
        representative_epoch: latest.min(reader_epoch),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_yet_created_when_earliest_after_reader() {
        assert_eq!(classify(5, 10, false, 3), Visibility::NotYetCreated);
    }

    #[test]
    fn tombstoned_when_punched_and_latest_reached() {
        assert_eq!(classify(1, 4, true, 4), Visibility::Tombstoned);
        assert_eq!(classify(1, 4, true, 9), Visibility::Tombstoned);
    }

    #[test]
    fn visible_with_clamped_representative_epoch() {
        assert_eq!(
            classify(1, 4, false, 9),
            Visibility::Visible {
                representative_epoch: 4
            }
        );
        assert_eq!(
            classify(1, 9, false, 4),
            Visibility::Visible {
                representative_epoch: 4
            }
        );
    }

    #[test]
    fn punched_but_not_yet_at_latest_is_still_visible() {
        // latest has not been reached yet by the reader, so the punch has
        // not taken effect for this reader.
        assert_eq!(
            classify(1, 10, true, 4),
            Visibility::Visible {
                representative_epoch: 4
            }
        );
    }
}
