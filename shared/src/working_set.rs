//! Local copy of the reference collection kept current from change events
//!
//! Events are delivered at least once and may arrive out of order relative
//! to a concurrent full refresh. Folding is idempotent: an entry is only ever
//! replaced by a copy with the same or a newer `updated_at`, and deleted ids
//! stay tombstoned so a late upsert cannot bring them back. A refresh that
//! confirms a delete releases its tombstone.

use std::collections::hash_map::Entry as MapEntry;
use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::models::{ChangeEvent, ChangeOp, Reference};

#[derive(Debug, Clone)]
struct Entry {
    reference: Reference,
    /// Sequence number of the last event that touched this entry
    last_seq: u64,
}

/// Handle for a full reload started with [`WorkingSet::begin_refresh`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTicket {
    generation: u64,
    seq: u64,
}

/// Outcome of folding one change event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Changed,
    /// Duplicate or stale delivery
    Ignored,
}

#[derive(Debug, Clone, Default)]
pub struct WorkingSet {
    entries: HashMap<Uuid, Entry>,
    /// Deleted id -> sequence number of the delete
    tombstones: HashMap<Uuid, u64>,
    seq: u64,
    generation: u64,
}

impl WorkingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from a full snapshot, discarding all prior state
    pub fn from_snapshot(references: Vec<Reference>) -> Self {
        let mut set = Self::new();
        for reference in references {
            set.entries.insert(
                reference.id,
                Entry {
                    reference,
                    last_seq: 0,
                },
            );
        }
        set
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &Uuid) -> Option<&Reference> {
        self.entries.get(id).map(|e| &e.reference)
    }

    /// Fold one change event
    pub fn apply(&mut self, event: ChangeEvent) -> Applied {
        self.seq += 1;
        let seq = self.seq;

        match (event.op, event.record) {
            (ChangeOp::Delete, _) => {
                let removed = self.entries.remove(&event.id);
                let fresh_tombstone = match self.tombstones.entry(event.id) {
                    MapEntry::Vacant(slot) => {
                        slot.insert(seq);
                        true
                    }
                    MapEntry::Occupied(_) => false,
                };
                if removed.is_some() || fresh_tombstone {
                    Applied::Changed
                } else {
                    Applied::Ignored
                }
            }
            (_, Some(record)) => self.upsert(record, seq),
            (_, None) => Applied::Ignored,
        }
    }

    fn upsert(&mut self, record: Reference, seq: u64) -> Applied {
        if self.tombstones.contains_key(&record.id) {
            return Applied::Ignored;
        }

        match self.entries.get_mut(&record.id) {
            Some(entry) if entry.reference.updated_at > record.updated_at => Applied::Ignored,
            Some(entry) if entry.reference == record => {
                entry.last_seq = seq;
                Applied::Ignored
            }
            Some(entry) => {
                entry.reference = record;
                entry.last_seq = seq;
                Applied::Changed
            }
            None => {
                self.entries.insert(
                    record.id,
                    Entry {
                        reference: record,
                        last_seq: seq,
                    },
                );
                Applied::Changed
            }
        }
    }

    /// Start a full reload. Any ticket issued earlier becomes stale.
    pub fn begin_refresh(&mut self) -> RefreshTicket {
        self.generation += 1;
        RefreshTicket {
            generation: self.generation,
            seq: self.seq,
        }
    }

    /// Merge a snapshot fetched under `ticket`.
    ///
    /// Returns `false` and leaves the set untouched when a newer refresh was
    /// started in the meantime. Entries touched by events after the ticket
    /// was issued win over the snapshot. Tombstones for deletes seen before
    /// the ticket are dropped once the snapshot no longer has the id.
    pub fn finish_refresh(&mut self, ticket: RefreshTicket, snapshot: Vec<Reference>) -> bool {
        if ticket.generation != self.generation {
            return false;
        }

        let listed: HashSet<Uuid> = snapshot.iter().map(|r| r.id).collect();
        self.tombstones
            .retain(|id, deleted_at| *deleted_at > ticket.seq || listed.contains(id));

        let mut fresh: HashMap<Uuid, Entry> = HashMap::with_capacity(snapshot.len());
        for reference in snapshot {
            if self.tombstones.contains_key(&reference.id) {
                continue;
            }
            let entry = match self.entries.remove(&reference.id) {
                Some(existing)
                    if existing.last_seq > ticket.seq
                        || existing.reference.updated_at > reference.updated_at =>
                {
                    existing
                }
                _ => Entry {
                    reference,
                    last_seq: 0,
                },
            };
            fresh.insert(entry.reference.id, entry);
        }

        // Inserted by an event the snapshot could not have seen yet
        for (id, entry) in self.entries.drain() {
            if entry.last_seq > ticket.seq {
                fresh.insert(id, entry);
            }
        }

        self.entries = fresh;
        true
    }

    /// All references, newest first
    pub fn snapshot(&self) -> Vec<Reference> {
        let mut references: Vec<Reference> =
            self.entries.values().map(|e| e.reference.clone()).collect();
        references.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.referencia.cmp(&b.referencia))
        });
        references
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Curva, NewReference};
    use chrono::{Duration, TimeZone, Utc};

    fn reference(code: &str, minute: u32) -> Reference {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, minute, 0).unwrap();
        Reference::from_new(
            NewReference {
                referencia: code.to_string(),
                curva: Curva::SToL,
                cantidad: 18,
                cantidad_colores: None,
                distribucion: None,
                color: None,
                ubicacion: None,
                ingreso_a_bodega: None,
                lanzamiento_capsula: None,
                imagen_url: None,
            },
            Uuid::new_v4(),
            at,
        )
    }

    fn touched(mut r: Reference, cantidad: i32) -> Reference {
        r.cantidad = cantidad;
        r.updated_at += Duration::minutes(5);
        r
    }

    #[test]
    fn test_duplicate_delivery_is_noop() {
        let mut set = WorkingSet::new();
        let a = reference("A", 0);
        assert_eq!(set.apply(ChangeEvent::insert(a.clone())), Applied::Changed);
        assert_eq!(set.apply(ChangeEvent::insert(a.clone())), Applied::Ignored);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_stale_update_is_ignored() {
        let mut set = WorkingSet::new();
        let a = reference("A", 0);
        let newer = touched(a.clone(), 30);
        set.apply(ChangeEvent::update(newer.clone()));
        assert_eq!(set.apply(ChangeEvent::update(a.clone())), Applied::Ignored);
        assert_eq!(set.get(&a.id).unwrap().cantidad, 30);
    }

    #[test]
    fn test_delete_is_not_resurrected_by_late_upsert() {
        let mut set = WorkingSet::new();
        let a = reference("A", 0);
        set.apply(ChangeEvent::insert(a.clone()));
        set.apply(ChangeEvent::delete(a.id));
        assert_eq!(set.apply(ChangeEvent::update(a.clone())), Applied::Ignored);
        assert!(set.get(&a.id).is_none());
        assert_eq!(set.apply(ChangeEvent::delete(a.id)), Applied::Ignored);
    }

    #[test]
    fn test_snapshot_orders_newest_first() {
        let set = WorkingSet::from_snapshot(vec![reference("A", 0), reference("B", 10)]);
        let codes: Vec<_> = set.snapshot().into_iter().map(|r| r.referencia).collect();
        assert_eq!(codes, vec!["B", "A"]);
    }

    #[test]
    fn test_superseded_refresh_is_discarded() {
        let mut set = WorkingSet::new();
        let first = set.begin_refresh();
        let second = set.begin_refresh();
        assert!(!set.finish_refresh(first, vec![reference("OLD", 0)]));
        assert!(set.is_empty());
        assert!(set.finish_refresh(second, vec![reference("NEW", 0)]));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_refresh_keeps_events_seen_after_ticket() {
        let a = reference("A", 0);
        let b = reference("B", 1);
        let mut set = WorkingSet::from_snapshot(vec![a.clone(), b.clone()]);

        let ticket = set.begin_refresh();
        let c = reference("C", 2);
        set.apply(ChangeEvent::insert(c.clone()));
        set.apply(ChangeEvent::delete(b.id));
        let a2 = touched(a.clone(), 99);
        set.apply(ChangeEvent::update(a2));

        // Snapshot was read before those events landed
        assert!(set.finish_refresh(ticket, vec![a.clone(), b.clone()]));
        assert_eq!(set.get(&a.id).unwrap().cantidad, 99);
        assert!(set.get(&b.id).is_none());
        assert!(set.get(&c.id).is_some());
    }

    #[test]
    fn test_refresh_drops_rows_missing_from_snapshot() {
        let a = reference("A", 0);
        let b = reference("B", 1);
        let mut set = WorkingSet::from_snapshot(vec![a.clone(), b.clone()]);
        let ticket = set.begin_refresh();
        assert!(set.finish_refresh(ticket, vec![a.clone()]));
        assert_eq!(set.len(), 1);
        assert!(set.get(&b.id).is_none());
    }

    #[test]
    fn test_refresh_releases_confirmed_tombstones() {
        let a = reference("A", 0);
        let b = reference("B", 1);
        let mut set = WorkingSet::from_snapshot(vec![a.clone(), b.clone()]);
        set.apply(ChangeEvent::delete(a.id));

        let ticket = set.begin_refresh();
        set.apply(ChangeEvent::delete(b.id));
        // Snapshot read before B's delete committed
        assert!(set.finish_refresh(ticket, vec![b.clone()]));
        assert!(set.is_empty());
        assert!(!set.tombstones.contains_key(&a.id));
        assert!(set.tombstones.contains_key(&b.id));
        assert_eq!(set.apply(ChangeEvent::update(b.clone())), Applied::Ignored);

        let ticket = set.begin_refresh();
        assert!(set.finish_refresh(ticket, Vec::new()));
        assert!(set.tombstones.is_empty());
    }
}
