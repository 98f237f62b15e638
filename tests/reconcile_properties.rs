use proptest::prelude::*;
use std::collections::BTreeMap;
use tenure_etl::{reconcile, Reconciler, RosterEntry, Snapshot, SnapshotDate, TenureRecord};

const PEOPLE: [&str; 5] = ["Alice", "Bob", "Carol", "Dan", "Eve"];
const TITLES: [&str; 3] = ["Analyst", "Director", "Advisor"];

fn month(index: usize) -> SnapshotDate {
    let year = 2015 + (index / 12) as i32;
    let month = (index % 12) as u32 + 1;
    SnapshotDate::from_ymd(year, month, 1).unwrap()
}

fn build_snapshots(rosters: &[(BTreeMap<usize, usize>, bool)]) -> Vec<Snapshot> {
    rosters
        .iter()
        .enumerate()
        .map(|(i, (roster, reversed))| {
            let mut entries: Vec<RosterEntry> = roster
                .iter()
                .map(|(p, t)| RosterEntry::new(PEOPLE[*p], TITLES[*t]))
                .collect();
            if *reversed {
                entries.reverse();
            }
            Snapshot::new(month(i), entries)
        })
        .collect()
}

fn roster_strategy() -> impl Strategy<Value = Vec<(BTreeMap<usize, usize>, bool)>> {
    prop::collection::vec(
        (
            prop::collection::btree_map(0..PEOPLE.len(), 0..TITLES.len(), 0..=PEOPLE.len()),
            any::<bool>(),
        ),
        1..10,
    )
}

fn holders_at<'a>(records: &'a [TenureRecord], person: &str, date: SnapshotDate) -> Vec<&'a str> {
    records
        .iter()
        .filter(|r| r.person == person && r.covers(date))
        .map(|r| r.title.as_str())
        .collect()
}

proptest! {
    #[test]
    fn closed_records_end_after_they_start(rosters in roster_strategy()) {
        let snapshots = build_snapshots(&rosters);
        let records = reconcile(&snapshots).unwrap();
        for record in &records {
            if let Some(end) = record.end_date {
                prop_assert!(record.start_date < end);
            }
        }
    }

    #[test]
    fn records_tile_every_observation(rosters in roster_strategy()) {
        let snapshots = build_snapshots(&rosters);
        let records = reconcile(&snapshots).unwrap();

        for snapshot in &snapshots {
            for person in PEOPLE {
                let observed = snapshot
                    .roster
                    .iter()
                    .find(|e| e.person == person)
                    .map(|e| e.title.as_str());
                let held = holders_at(&records, person, snapshot.date);
                match observed {
                    Some(title) => prop_assert_eq!(held, vec![title]),
                    None => prop_assert!(held.is_empty()),
                }
            }
        }
    }

    #[test]
    fn closed_records_precede_open_records(rosters in roster_strategy()) {
        let snapshots = build_snapshots(&rosters);
        let records = reconcile(&snapshots).unwrap();

        let first_open = records.iter().position(|r| r.is_open()).unwrap_or(records.len());
        prop_assert!(records[first_open..].iter().all(|r| r.is_open()));

        let closed = &records[..first_open];
        for pair in closed.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            prop_assert!((a.end_date, &a.person) < (b.end_date, &b.person));
        }
    }

    #[test]
    fn reconcile_is_deterministic(rosters in roster_strategy()) {
        let snapshots = build_snapshots(&rosters);
        let first = serde_json::to_string(&reconcile(&snapshots).unwrap()).unwrap();
        let second = serde_json::to_string(&reconcile(&snapshots).unwrap()).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn streaming_matches_batch(rosters in roster_strategy()) {
        let snapshots = build_snapshots(&rosters);
        let batch = reconcile(&snapshots).unwrap();

        let mut reconciler = Reconciler::new();
        let mut streamed = Vec::new();
        for snapshot in &snapshots {
            streamed.extend(reconciler.observe(snapshot).unwrap());
        }
        streamed.extend(reconciler.finish());

        prop_assert_eq!(batch, streamed);
    }
}

#[test]
fn single_snapshot_boundary() {
    let snapshots = vec![Snapshot::new(
        month(0),
        vec![
            RosterEntry::new("Alice", "Analyst"),
            RosterEntry::new("Bob", "Advisor"),
        ],
    )];

    let records = reconcile(&snapshots).unwrap();
    assert_eq!(records.len(), 2);
    for record in &records {
        assert_eq!(record.start_date, month(0));
        assert_eq!(record.end_date, None);
    }
}
