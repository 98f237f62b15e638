//! Snapshot reconciliation.
//!
//! Walks roster snapshots in date order and turns the differences between
//! consecutive rosters into tenure intervals. Output order:
//!
//! 1. closed records, grouped by the snapshot that closed them, ascending by
//!    person name within a snapshot;
//! 2. records still open after the last snapshot, ordered by
//!    `(start_date, person)`.

use crate::domain::model::{RosterEntry, Snapshot, SnapshotDate, TenureRecord};
use crate::utils::error::{EtlError, Result};
use std::collections::{HashMap, HashSet};

/// Reconciles a whole snapshot sequence in one call.
///
/// The sequence is checked for strictly ascending, unique dates before any
/// state is built, so a contract violation never yields partial output.
pub fn reconcile(snapshots: &[Snapshot]) -> Result<Vec<TenureRecord>> {
    validate_sequence(snapshots)?;

    let mut reconciler = Reconciler::new();
    let mut records = Vec::new();
    for snapshot in snapshots {
        records.extend(reconciler.observe(snapshot)?);
    }
    records.extend(reconciler.finish());

    tracing::debug!(
        "Reconciled {} snapshots into {} tenure records",
        snapshots.len(),
        records.len()
    );
    Ok(records)
}

/// Checks that snapshot dates are strictly increasing.
pub fn validate_sequence(snapshots: &[Snapshot]) -> Result<()> {
    for pair in snapshots.windows(2) {
        check_order(pair[0].date, pair[1].date)?;
    }
    Ok(())
}

fn check_order(previous: SnapshotDate, current: SnapshotDate) -> Result<()> {
    if current == previous {
        return Err(EtlError::DuplicateSnapshotDate {
            date: current.to_string(),
        });
    }
    if current < previous {
        return Err(EtlError::UnsortedSnapshotSequence {
            previous: previous.to_string(),
            current: current.to_string(),
        });
    }
    Ok(())
}

/// Incremental reconciler holding the active roster state.
#[derive(Debug, Default)]
pub struct Reconciler {
    active: HashMap<String, TenureRecord>,
    last_date: Option<SnapshotDate>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of currently open tenures.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// The open tenure for `person`, if any.
    pub fn active_record(&self, person: &str) -> Option<&TenureRecord> {
        self.active.get(person)
    }

    /// Applies one snapshot and returns the records it closed.
    pub fn observe(&mut self, snapshot: &Snapshot) -> Result<Vec<TenureRecord>> {
        let date = snapshot.date;
        if let Some(previous) = self.last_date {
            check_order(previous, date)?;
        }

        let roster = index_roster(snapshot)?;

        // 先以名字排序，確保同一快照內的關閉順序固定
        let mut known: Vec<String> = self.active.keys().cloned().collect();
        known.sort();

        let mut closed = Vec::new();
        for person in known {
            let current_title = match self.active.get(&person) {
                Some(record) => record.title.as_str(),
                None => {
                    return Err(invariant(date, &person, "active person vanished mid-pass"));
                }
            };

            match roster.get(person.as_str()) {
                None => {
                    closed.push(self.close(&person, date)?);
                    tracing::trace!("{} left at {}", person, date);
                }
                Some(title) if *title != current_title => {
                    let title = title.to_string();
                    closed.push(self.close(&person, date)?);
                    tracing::trace!("{} changed title to '{}' at {}", person, title, date);
                    self.active
                        .insert(person.clone(), TenureRecord::open(person, title, date));
                }
                Some(_) => {}
            }
        }

        let mut hired = 0usize;
        for entry in &snapshot.roster {
            if !self.active.contains_key(&entry.person) {
                self.active.insert(
                    entry.person.clone(),
                    TenureRecord::open(entry.person.clone(), entry.title.clone(), date),
                );
                hired += 1;
            }
        }

        tracing::debug!(
            "Snapshot {}: {} closed, {} opened, {} active",
            date,
            closed.len(),
            hired,
            self.active.len()
        );

        self.last_date = Some(date);
        Ok(closed)
    }

    /// Drains the active state as open-ended records.
    pub fn finish(self) -> Vec<TenureRecord> {
        let mut open: Vec<TenureRecord> = self.active.into_values().collect();
        open.sort_by(|a, b| {
            a.start_date
                .cmp(&b.start_date)
                .then_with(|| a.person.cmp(&b.person))
        });
        open
    }

    fn close(&mut self, person: &str, date: SnapshotDate) -> Result<TenureRecord> {
        let mut record = self
            .active
            .remove(person)
            .ok_or_else(|| invariant(date, person, "no active record to close"))?;

        if record.start_date >= date {
            return Err(invariant(
                date,
                person,
                &format!("tenure started at {} cannot end at {}", record.start_date, date),
            ));
        }

        record.end_date = Some(date);
        Ok(record)
    }
}

/// Builds the person → title lookup for one snapshot.
/// A person listed twice makes the snapshot ambiguous and is rejected.
fn index_roster(snapshot: &Snapshot) -> Result<HashMap<&str, &str>> {
    let mut index = HashMap::with_capacity(snapshot.roster.len());
    for RosterEntry { person, title } in &snapshot.roster {
        if index.insert(person.as_str(), title.as_str()).is_some() {
            return Err(EtlError::DuplicatePerson {
                date: snapshot.date.to_string(),
                person: person.clone(),
            });
        }
    }
    Ok(index)
}

fn invariant(date: SnapshotDate, person: &str, detail: &str) -> EtlError {
    EtlError::InvariantViolation {
        date: date.to_string(),
        person: person.to_string(),
        detail: detail.to_string(),
    }
}

/// Drops later occurrences of a person within one roster, keeping the first.
/// Returns the names that were dropped.
pub fn dedupe_keep_first(roster: &mut Vec<RosterEntry>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut dropped = Vec::new();
    roster.retain(|entry| {
        if seen.insert(entry.person.clone()) {
            true
        } else {
            dropped.push(entry.person.clone());
            false
        }
    });
    dropped
}
