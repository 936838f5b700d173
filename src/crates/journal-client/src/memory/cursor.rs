use super::StoredEntry;
use crate::session::Direction;
use sd_common::Id128;

/// Total order of the store: realtime, then sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct EntryKey {
    pub realtime: u64,
    pub seqnum: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Location {
    #[default]
    Head,
    Tail,
    Realtime(u64),
    Monotonic(Id128, u64),
    Entry(EntryKey),
}

impl Location {
    /// The current entry, once a step has resolved one.
    pub(crate) fn entry(&self) -> Option<EntryKey> {
        match self {
            Location::Entry(key) => Some(*key),
            _ => None,
        }
    }

    /// Finds the entry a step in `direction` lands on, considering only the
    /// entries `accept` keeps. `entries` must be sorted by key.
    pub(crate) fn step<'a, F>(
        &self,
        entries: &'a [StoredEntry],
        direction: Direction,
        accept: F,
    ) -> Option<&'a StoredEntry>
    where
        F: Fn(&StoredEntry) -> bool,
    {
        match (*self, direction) {
            (Location::Head, Direction::Forward) => forward(entries, 0, accept),
            (Location::Head, Direction::Backward) => None,
            (Location::Tail, Direction::Forward) => None,
            (Location::Tail, Direction::Backward) => backward(entries, entries.len(), accept),
            (Location::Realtime(usec), Direction::Forward) => {
                let start = entries.partition_point(|e| e.realtime < usec);
                forward(entries, start, accept)
            }
            (Location::Realtime(usec), Direction::Backward) => {
                let end = entries.partition_point(|e| e.realtime <= usec);
                backward(entries, end, accept)
            }
            (Location::Monotonic(boot_id, usec), Direction::Forward) => entries
                .iter()
                .filter(|e| e.boot_id == boot_id && e.monotonic >= usec && accept(*e))
                .min_by_key(|e| (e.monotonic, e.key())),
            (Location::Monotonic(boot_id, usec), Direction::Backward) => entries
                .iter()
                .filter(|e| e.boot_id == boot_id && e.monotonic <= usec && accept(*e))
                .max_by_key(|e| (e.monotonic, e.key())),
            (Location::Entry(key), Direction::Forward) => {
                let start = entries.partition_point(|e| e.key() <= key);
                forward(entries, start, accept)
            }
            (Location::Entry(key), Direction::Backward) => {
                let end = entries.partition_point(|e| e.key() < key);
                backward(entries, end, accept)
            }
        }
    }
}

fn forward<F>(entries: &[StoredEntry], start: usize, accept: F) -> Option<&StoredEntry>
where
    F: Fn(&StoredEntry) -> bool,
{
    entries[start..].iter().find(|e| accept(*e))
}

fn backward<F>(entries: &[StoredEntry], end: usize, accept: F) -> Option<&StoredEntry>
where
    F: Fn(&StoredEntry) -> bool,
{
    entries[..end].iter().rev().find(|e| accept(*e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::EntryOrigin;

    const BOOT_A: Id128 = Id128::from_u128(0xa);
    const BOOT_B: Id128 = Id128::from_u128(0xb);

    fn stored(seqnum: u64, realtime: u64, boot_id: Id128, monotonic: u64) -> StoredEntry {
        StoredEntry {
            seqnum,
            realtime,
            monotonic,
            boot_id,
            origin: EntryOrigin::default(),
            records: vec![format!("N={seqnum}").into_bytes()],
        }
    }

    fn entries() -> Vec<StoredEntry> {
        vec![
            stored(1, 100, BOOT_A, 10),
            stored(2, 200, BOOT_A, 20),
            stored(3, 200, BOOT_A, 20),
            stored(4, 300, BOOT_B, 5),
            stored(5, 400, BOOT_B, 15),
        ]
    }

    fn seqnum(location: Location, direction: Direction) -> Option<u64> {
        location
            .step(&entries(), direction, |_| true)
            .map(|e| e.seqnum)
    }

    #[test]
    fn head_and_tail() {
        assert_eq!(seqnum(Location::Head, Direction::Forward), Some(1));
        assert_eq!(seqnum(Location::Head, Direction::Backward), None);
        assert_eq!(seqnum(Location::Tail, Direction::Forward), None);
        assert_eq!(seqnum(Location::Tail, Direction::Backward), Some(5));
    }

    #[test]
    fn realtime_bounds() {
        assert_eq!(seqnum(Location::Realtime(200), Direction::Forward), Some(2));
        assert_eq!(seqnum(Location::Realtime(200), Direction::Backward), Some(3));
        assert_eq!(seqnum(Location::Realtime(250), Direction::Forward), Some(4));
        assert_eq!(seqnum(Location::Realtime(250), Direction::Backward), Some(3));
        assert_eq!(seqnum(Location::Realtime(500), Direction::Forward), None);
        assert_eq!(seqnum(Location::Realtime(50), Direction::Backward), None);
    }

    #[test]
    fn monotonic_stays_within_the_boot() {
        assert_eq!(seqnum(Location::Monotonic(BOOT_B, 0), Direction::Forward), Some(4));
        assert_eq!(seqnum(Location::Monotonic(BOOT_B, 6), Direction::Forward), Some(5));
        assert_eq!(seqnum(Location::Monotonic(BOOT_A, 15), Direction::Backward), Some(1));
        assert_eq!(seqnum(Location::Monotonic(BOOT_A, 25), Direction::Forward), None);
        assert_eq!(
            seqnum(Location::Monotonic(Id128::from_u128(0xc), 0), Direction::Forward),
            None
        );
    }

    #[test]
    fn entry_steps_to_neighbours() {
        let key = EntryKey {
            realtime: 200,
            seqnum: 2,
        };
        assert_eq!(seqnum(Location::Entry(key), Direction::Forward), Some(3));
        assert_eq!(seqnum(Location::Entry(key), Direction::Backward), Some(1));
    }

    #[test]
    fn rejected_entries_are_skipped() {
        let entries = entries();
        let odd = |e: &StoredEntry| e.seqnum % 2 == 1;

        let first = Location::Head.step(&entries, Direction::Forward, odd).unwrap();
        assert_eq!(first.seqnum, 1);

        let next = Location::Entry(first.key())
            .step(&entries, Direction::Forward, odd)
            .unwrap();
        assert_eq!(next.seqnum, 3);
    }
}
