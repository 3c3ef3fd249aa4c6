//! This module provides the in-memory cache of calendar reservations
//!
//! Every mutation is applied in two steps:
//! 1. it is applied to the cache right away (optimistically), and a [`PendingCall`] describes the remote call that must follow
//! 2. once the remote call completes, its outcome is reconciled into the cache (`confirm_*` or `fail_*` functions).
//!
//! Deletions are the exception: the entry is only marked as being deleted, and is removed once the remote store confirms it.
//!
//! This module never talks to the remote store itself, see the [`scheduler`](crate::scheduler) for that.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::id::ReservationId;
use crate::intent::Intent;
use crate::reservation::{EntryKey, RenderedEvent, Reservation, ReservationDraft, ReservationPatch, SyncStatus};


/// A reservation, as held in a [`ReservationCache`]
#[derive(Clone, Debug, PartialEq)]
pub struct CachedEntry {
    key: EntryKey,
    reservation: Reservation,
    status: SyncStatus,
    /// Sequence number of the latest mutation that changed the visible state of this entry
    last_mutation: u64,
    /// Value of the cache mutation counter when this entry was built.
    /// Completions of older mutations do not concern this entry
    built_at: u64,
    /// The newest update older than `built_at` that has been acknowledged since this entry was built
    restored_seq: u64,
}

impl CachedEntry {
    pub fn key(&self) -> &EntryKey              { &self.key }
    pub fn reservation(&self) -> &Reservation   { &self.reservation }
    pub fn status(&self) -> &SyncStatus         { &self.status }
    pub fn id(&self) -> Option<&ReservationId>  { self.reservation.id.as_ref() }

    /// Applies an update #`seq` that was acknowledged after a load rebuilt this entry.
    /// Local mutations that happened since the load stay visible, the acknowledged state becomes the one they revert to.
    fn restore_update(&mut self, seq: u64, fields: ReservationDraft) -> Reconciliation {
        if seq <= self.restored_seq {
            return Reconciliation::Stale;
        }
        let acknowledged = Reservation::new(self.reservation.id.clone(), fields);
        let built_at = self.built_at;

        match &mut self.status {
            SyncStatus::Synced => {
                self.reservation = acknowledged;
            },
            SyncStatus::LocallyModified{ committed, committed_seq, reverted, .. } if *committed_seq == built_at => {
                if *reverted {
                    self.reservation = acknowledged.clone();
                }
                **committed = acknowledged;
            },
            _ => {
                log::debug!("Ignoring the completion of mutation #{}, {} has changed since it was reloaded", seq, self.key);
                return Reconciliation::Stale;
            },
        }
        log::debug!("Mutation #{} was acknowledged after {} was reloaded, restoring it", seq, self.key);
        self.restored_seq = seq;
        Reconciliation::Restored
    }

    pub fn render(&self) -> RenderedEvent {
        RenderedEvent {
            key: self.key.clone(),
            id: self.reservation.id.clone(),
            title: self.reservation.display_title(),
            comment: self.reservation.comment.clone(),
            start: self.reservation.start,
            end: self.reservation.end,
            pending: self.status.is_pending(),
        }
    }
}


/// A remote call that must be issued so that the remote store agrees with a mutation that has already been applied to the cache
#[derive(Clone, Debug, PartialEq)]
pub enum PendingCall {
    Create { key: EntryKey, draft: ReservationDraft },
    /// `fields` is the full resulting field set, not only the patched fields
    Update { key: EntryKey, seq: u64, id: ReservationId, fields: ReservationDraft },
    Delete { key: EntryKey, seq: u64, id: ReservationId },
}

impl PendingCall {
    pub fn key(&self) -> &EntryKey {
        match self {
            PendingCall::Create{ key, .. } => key,
            PendingCall::Update{ key, .. } => key,
            PendingCall::Delete{ key, .. } => key,
        }
    }

    /// The intent that would issue this call again, e.g. to retry it after a failure
    pub fn to_intent(&self) -> Intent {
        match self {
            PendingCall::Create{ draft, .. } => Intent::Create(draft.clone()),
            PendingCall::Update{ id, fields, .. } => Intent::Update{ id: id.clone(), patch: ReservationPatch::full(fields.clone()) },
            PendingCall::Delete{ id, .. } => Intent::Delete{ id: id.clone() },
        }
    }
}


/// What reconciling a remote completion did to the cache
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reconciliation {
    /// The outcome has been applied
    Applied,
    /// The remote call failed and the optimistic mutation has been undone
    RolledBack,
    /// The remote call failed, but a newer local mutation of this entry stays visible
    Superseded,
    /// The created reservation was already cached (e.g. a load brought it in), the optimistic copy has been dropped
    Merged,
    /// A load that did not know about this mutation yet has replaced the entry. The acknowledged state has been put back
    Restored,
    /// The entry is not cached anymore, or the completion is older than what is cached. Nothing has been done
    Stale,
}


/// The list of reservations of a session, in display order
#[derive(Clone, Debug, Default)]
pub struct ReservationCache {
    entries: Vec<CachedEntry>,
    mutation_counter: u64,
    last_load: Option<DateTime<Utc>>,
}

impl ReservationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[CachedEntry] {
        &self.entries
    }

    pub fn get(&self, key: &EntryKey) -> Option<&CachedEntry> {
        self.entries.iter().find(|entry| &entry.key == key)
    }

    pub fn get_by_id(&self, id: &ReservationId) -> Option<&CachedEntry> {
        self.entries.iter().find(|entry| entry.id() == Some(id))
    }

    /// The number of entries that still wait for a remote call to complete
    pub fn pending_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.status.is_pending()).count()
    }

    /// The last time the cache has been replaced by a successful load (or None in case it has never been loaded)
    pub fn last_load(&self) -> Option<DateTime<Utc>> {
        self.last_load
    }

    pub fn rendered_events(&self) -> Vec<RenderedEvent> {
        self.entries.iter().map(CachedEntry::render).collect()
    }

    /// Replaces the whole content of the cache with a list fetched from the remote store.
    ///
    /// Entries with mutations in flight are replaced as well: the remote store is the source of truth.
    /// A listing may predate a create or an update that is in flight though. Those are put back once the remote store acknowledges them,
    /// see [`Self::confirm_create`] and [`Self::confirm_update`].
    /// Entries keep their [`EntryKey`] when the list contains their id, so that a calendar widget does not see them disappear.
    pub fn replace_all(&mut self, reservations: Vec<Reservation>) {
        let built_at = self.mutation_counter;
        let mut entries: Vec<CachedEntry> = Vec::with_capacity(reservations.len());

        for reservation in reservations {
            let id = match &reservation.id {
                None => {
                    log::warn!("Ignoring loaded reservation \"{}\" that has no identifier", reservation.title);
                    continue;
                },
                Some(id) => id.clone(),
            };
            if entries.iter().any(|entry| entry.id() == Some(&id)) {
                log::warn!("Reservation {} is listed twice, keeping its first occurrence", id);
                continue;
            }

            let key = self.get_by_id(&id)
                .map(|entry| entry.key.clone())
                .unwrap_or_else(EntryKey::random);
            entries.push(CachedEntry {
                key,
                reservation,
                status: SyncStatus::Synced,
                last_mutation: built_at,
                built_at,
                restored_seq: 0,
            });
        }

        log::info!("Loaded {} reservations (the cache had {} entries)", entries.len(), self.entries.len());
        self.entries = entries;
        self.last_load = Some(Utc::now());
    }

    /// Applies an intent optimistically, and returns the remote call that must follow
    pub fn apply(&mut self, intent: Intent) -> Result<PendingCall> {
        match intent {
            Intent::Create(draft) => Ok(self.apply_create(draft)),
            Intent::Update{ id, patch } => self.apply_update(&id, patch),
            Intent::Delete{ id } => self.apply_delete(&id),
        }
    }

    /// Appends a new, not yet saved, entry
    pub fn apply_create(&mut self, draft: ReservationDraft) -> PendingCall {
        let seq = self.next_seq();
        let key = EntryKey::random();
        log::debug!("Creating \"{}\" as {}", draft.title, key);

        self.entries.push(CachedEntry {
            key: key.clone(),
            reservation: Reservation::new(None, draft.clone()),
            status: SyncStatus::NotSynced,
            last_mutation: seq,
            built_at: seq - 1,
            restored_seq: 0,
        });
        PendingCall::Create{ key, draft }
    }

    /// Patches an entry right away. The returned call carries the full resulting field set
    pub fn apply_update(&mut self, id: &ReservationId, patch: ReservationPatch) -> Result<PendingCall> {
        let seq = self.next_seq();
        let entry = self.entry_by_id_mut(id)
            .ok_or_else(|| Error::UnknownReservation(id.clone()))?;

        let before = entry.reservation.clone();
        patch.apply_to(&mut entry.reservation);
        entry.last_mutation = seq;

        let built_at = entry.built_at;
        let status = entry.status.modification_status_mut();
        if let SyncStatus::LocallyModified{ in_flight, reverted, .. } = status {
            *in_flight += 1;
            *reverted = false;
        } else {
            *status = SyncStatus::LocallyModified{
                committed: Box::new(before),
                committed_seq: built_at,
                in_flight: 1,
                reverted: false,
            };
        }
        log::debug!("Updated {} locally (mutation #{})", id, seq);

        Ok(PendingCall::Update{
            key: entry.key.clone(),
            seq,
            id: id.clone(),
            fields: entry.reservation.to_draft(),
        })
    }

    /// Marks an entry as being deleted. It is only removed once [`Self::confirm_delete`] is called
    pub fn apply_delete(&mut self, id: &ReservationId) -> Result<PendingCall> {
        let seq = self.next_seq();
        let entry = self.entry_by_id_mut(id)
            .ok_or_else(|| Error::UnknownReservation(id.clone()))?;

        if entry.status.is_deleting() {
            return Err(Error::DeletionPending(id.clone()));
        }
        let previous = std::mem::replace(&mut entry.status, SyncStatus::Synced);
        entry.status = SyncStatus::LocallyDeleted{ previous: Box::new(previous) };
        log::debug!("Deleting {} (mutation #{})", id, seq);

        Ok(PendingCall::Delete{ key: entry.key.clone(), seq, id: id.clone() })
    }

    /// The remote store has created the reservation from `draft`, and assigned it `id`.
    ///
    /// In case a load has dropped the optimistic entry meanwhile, the created reservation is appended again, unless the load already brought it in.
    pub fn confirm_create(&mut self, key: &EntryKey, id: ReservationId, draft: &ReservationDraft) -> Reconciliation {
        let pos = match self.position(key) {
            Some(pos) if self.entries[pos].status == SyncStatus::NotSynced => pos,
            Some(_) => return Reconciliation::Stale,
            None => return self.restore_created(key, id, draft),
        };

        if let Some(other) = self.entries.iter().position(|entry| entry.id() == Some(&id)) {
            if other != pos {
                log::info!("Reservation {} is already cached, dropping its optimistic copy {}", id, key);
                self.entries.remove(pos);
                return Reconciliation::Merged;
            }
        }

        let entry = &mut self.entries[pos];
        log::debug!("{} has been saved as reservation {}", key, id);
        entry.reservation.id = Some(id);
        entry.status = SyncStatus::Synced;
        Reconciliation::Applied
    }

    /// The remote store has not created the reservation: the optimistic entry is removed
    pub fn fail_create(&mut self, key: &EntryKey) -> Reconciliation {
        match self.position(key) {
            Some(pos) if self.entries[pos].status == SyncStatus::NotSynced => {
                let removed = self.entries.remove(pos);
                log::debug!("Rolled back the creation of \"{}\"", removed.reservation.title);
                Reconciliation::RolledBack
            },
            _ => Reconciliation::Stale,
        }
    }

    /// The remote store has accepted the update #`seq`, that sent `fields`.
    ///
    /// When a load has rebuilt the entry after this update was applied, the listing may not know about it yet: `fields` replace what the load brought in.
    pub fn confirm_update(&mut self, key: &EntryKey, seq: u64, fields: ReservationDraft) -> Reconciliation {
        let entry = match self.entries.iter_mut().find(|entry| &entry.key == key) {
            None => return Reconciliation::Stale,
            Some(entry) if seq <= entry.built_at => return entry.restore_update(seq, fields),
            Some(entry) => entry,
        };

        let id = entry.reservation.id.clone();
        let visible = &mut entry.reservation;
        let status = entry.status.modification_status_mut();
        let settled = match status {
            SyncStatus::LocallyModified{ committed, committed_seq, in_flight, reverted } => {
                *in_flight = in_flight.saturating_sub(1);
                // Completions may arrive out of order: the committed snapshot only moves forward
                if seq > *committed_seq {
                    **committed = Reservation::new(id, fields);
                    *committed_seq = seq;
                    if *reverted {
                        *visible = (**committed).clone();
                    }
                }
                *in_flight == 0
            },
            _ => {
                log::warn!("Got an update completion for {}, that has no update in flight", key);
                return Reconciliation::Stale;
            },
        };

        if settled {
            *status = SyncStatus::Synced;
        }
        Reconciliation::Applied
    }

    /// The remote store has refused the update #`seq`.
    ///
    /// In case this was the latest mutation of the entry, the entry reverts to the last state the remote store acknowledged.
    /// Otherwise, the newer local mutation stays visible.
    pub fn fail_update(&mut self, key: &EntryKey, seq: u64) -> Reconciliation {
        let entry = match self.live_entry_mut(key, seq) {
            None => return Reconciliation::Stale,
            Some(entry) => entry,
        };

        let is_latest = entry.last_mutation == seq;
        let visible = &mut entry.reservation;
        let status = entry.status.modification_status_mut();
        let (outcome, settled) = match status {
            SyncStatus::LocallyModified{ committed, in_flight, reverted, .. } => {
                *in_flight = in_flight.saturating_sub(1);
                let outcome = if is_latest {
                    *visible = (**committed).clone();
                    *reverted = true;
                    Reconciliation::RolledBack
                } else {
                    Reconciliation::Superseded
                };
                (outcome, *in_flight == 0)
            },
            _ => return Reconciliation::Stale,
        };

        if settled {
            *status = SyncStatus::Synced;
        }
        outcome
    }

    /// The remote store has deleted the reservation
    pub fn confirm_delete(&mut self, key: &EntryKey) -> Reconciliation {
        match self.position(key) {
            None => Reconciliation::Stale,
            Some(pos) => {
                let removed = self.entries.remove(pos);
                log::debug!("Removed {} ({:?})", key, removed.reservation.id);
                Reconciliation::Applied
            },
        }
    }

    /// The remote store has not deleted the reservation: it is kept, with the status it had before
    pub fn fail_delete(&mut self, key: &EntryKey, seq: u64) -> Reconciliation {
        let entry = match self.live_entry_mut(key, seq) {
            None => return Reconciliation::Stale,
            Some(entry) => entry,
        };

        let status = std::mem::replace(&mut entry.status, SyncStatus::Synced);
        match status {
            SyncStatus::LocallyDeleted{ previous } => {
                entry.status = *previous;
                Reconciliation::RolledBack
            },
            other => {
                entry.status = other;
                Reconciliation::Stale
            },
        }
    }

    /// Compares the cache to a list fetched from a remote store, regardless of order.
    ///
    /// Unsaved entries are never part of a remote listing, so a cache that has some never has the same contents.
    pub fn has_same_contents_as(&self, listing: &[Reservation]) -> bool {
        let mut cached = HashMap::new();
        for entry in &self.entries {
            match entry.id() {
                None => return false,
                Some(id) => { cached.insert(id.clone(), &entry.reservation); },
            }
        }
        let remote: HashMap<ReservationId, &Reservation> = listing.iter()
            .filter_map(|r| r.id.clone().map(|id| (id, r)))
            .collect();

        if crate::utils::keys_are_the_same(&cached, &remote) == false {
            return false;
        }
        remote.iter().all(|(id, r)| cached.get(id) == Some(r))
    }


    fn next_seq(&mut self) -> u64 {
        self.mutation_counter += 1;
        self.mutation_counter
    }

    fn restore_created(&mut self, key: &EntryKey, id: ReservationId, draft: &ReservationDraft) -> Reconciliation {
        if self.get_by_id(&id).is_some() {
            log::debug!("Created reservation {} has been brought in by a load already", id);
            return Reconciliation::Merged;
        }

        log::info!("Reservation {} has been created after the last load was listed, caching it again as {}", id, key);
        let built_at = self.mutation_counter;
        self.entries.push(CachedEntry {
            key: key.clone(),
            reservation: Reservation::new(Some(id), draft.clone()),
            status: SyncStatus::Synced,
            last_mutation: built_at,
            built_at,
            restored_seq: 0,
        });
        Reconciliation::Restored
    }

    fn position(&self, key: &EntryKey) -> Option<usize> {
        self.entries.iter().position(|entry| &entry.key == key)
    }

    fn entry_by_id_mut(&mut self, id: &ReservationId) -> Option<&mut CachedEntry> {
        self.entries.iter_mut().find(|entry| entry.id() == Some(id))
    }

    /// The entry with this key, unless it has been rebuilt after mutation #`seq` was applied
    fn live_entry_mut(&mut self, key: &EntryKey, seq: u64) -> Option<&mut CachedEntry> {
        let entry = self.entries.iter_mut().find(|entry| &entry.key == key)?;
        if seq <= entry.built_at {
            log::debug!("Ignoring the completion of mutation #{}, that happened before {} was reloaded", seq, key);
            return None;
        }
        Some(entry)
    }
}



#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 18, hour, minute, 0).unwrap()
    }

    fn draft(title: &str) -> ReservationDraft {
        ReservationDraft {
            title: title.to_string(),
            start: at(10, 0),
            end: at(11, 0),
            comment: String::new(),
        }
    }

    fn stored(id: u64, title: &str) -> Reservation {
        Reservation::new(Some(ReservationId::from(id)), draft(title))
    }

    fn loaded_cache() -> ReservationCache {
        let mut cache = ReservationCache::new();
        cache.replace_all(vec![stored(1, "Standup"), stored(2, "Retro")]);
        cache
    }

    fn update_parts(call: PendingCall) -> (EntryKey, u64, ReservationDraft) {
        match call {
            PendingCall::Update{ key, seq, fields, .. } => (key, seq, fields),
            other => panic!("Unexpected call {:?}", other),
        }
    }

    #[test]
    fn create_adopts_the_server_id() {
        let mut cache = ReservationCache::new();
        let call = cache.apply_create(draft("Standup"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.entries()[0].id(), None);
        assert_eq!(cache.entries()[0].status(), &SyncStatus::NotSynced);

        let id = ReservationId::from(7);
        assert_eq!(cache.confirm_create(call.key(), id.clone(), &draft("Standup")), Reconciliation::Applied);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.entries().iter().filter(|e| e.id() == Some(&id)).count(), 1);
        assert!(cache.entries().iter().all(|e| e.id().is_some()));
        assert_eq!(cache.pending_count(), 0);
    }

    #[test]
    fn failed_create_is_rolled_back() {
        let mut cache = loaded_cache();
        let call = cache.apply_create(draft("Doomed"));
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.fail_create(call.key()), Reconciliation::RolledBack);
        assert_eq!(cache.len(), 2);
        assert!(cache.entries().iter().all(|e| e.reservation().title != "Doomed"));
    }

    #[test]
    fn created_duplicate_is_merged() {
        let mut cache = ReservationCache::new();
        let call = cache.apply_create(draft("Standup"));
        // A load that already knows about the new reservation completes first
        cache.replace_all(vec![stored(1, "Standup")]);
        assert_eq!(cache.confirm_create(call.key(), ReservationId::from(1), &draft("Standup")), Reconciliation::Merged);
        assert_eq!(cache.len(), 1);

        let mut cache = ReservationCache::new();
        cache.replace_all(vec![stored(1, "Standup")]);
        let call = cache.apply_create(draft("Standup"));
        assert_eq!(cache.confirm_create(call.key(), ReservationId::from(1), &draft("Standup")), Reconciliation::Merged);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn create_dropped_by_an_older_load_is_restored() {
        let mut cache = loaded_cache();
        let call = cache.apply_create(draft("Planning"));

        // The listing was taken before the remote store created the reservation
        cache.replace_all(vec![stored(1, "Standup"), stored(2, "Retro")]);
        assert!(cache.get(call.key()).is_none());

        let id = ReservationId::from(3);
        assert_eq!(cache.confirm_create(call.key(), id.clone(), &draft("Planning")), Reconciliation::Restored);
        let entry = cache.get(call.key()).unwrap();
        assert_eq!(entry.reservation(), &stored(3, "Planning"));
        assert_eq!(entry.status(), &SyncStatus::Synced);
        assert_eq!(cache.entries().iter().filter(|e| e.id() == Some(&id)).count(), 1);
        assert!(cache.has_same_contents_as(&[stored(1, "Standup"), stored(2, "Retro"), stored(3, "Planning")]));

        // A failed creation has nothing to restore
        let call = cache.apply_create(draft("Doomed"));
        cache.replace_all(vec![stored(1, "Standup")]);
        assert_eq!(cache.fail_create(call.key()), Reconciliation::Stale);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn update_is_optimistic_then_committed() {
        let mut cache = loaded_cache();
        let id = ReservationId::from(1);
        let call = cache.apply_update(&id, ReservationPatch::times(at(10, 30), at(11, 30))).unwrap();

        let entry = cache.get_by_id(&id).unwrap();
        assert_eq!(entry.reservation().start, at(10, 30));
        assert!(entry.status().is_pending());

        let (key, seq, fields) = update_parts(call);
        assert_eq!(fields.title, "Standup");
        assert_eq!(fields.end, at(11, 30));
        assert_eq!(cache.confirm_update(&key, seq, fields), Reconciliation::Applied);
        let entry = cache.get_by_id(&id).unwrap();
        assert_eq!(entry.status(), &SyncStatus::Synced);
        assert_eq!(entry.reservation().start, at(10, 30));
    }

    #[test]
    fn failed_update_reverts_to_the_committed_state() {
        let mut cache = loaded_cache();
        let id = ReservationId::from(1);
        let call = cache.apply_update(&id, ReservationPatch::times(at(14, 0), at(15, 0))).unwrap();
        let (key, seq, _) = update_parts(call);

        assert_eq!(cache.fail_update(&key, seq), Reconciliation::RolledBack);
        let entry = cache.get_by_id(&id).unwrap();
        assert_eq!(entry.reservation(), &stored(1, "Standup"));
        assert_eq!(entry.status(), &SyncStatus::Synced);
    }

    #[test]
    fn concurrent_updates_last_local_write_stands() {
        let mut cache = loaded_cache();
        let id = ReservationId::from(1);
        let first = update_parts(cache.apply_update(&id, ReservationPatch::times(at(12, 0), at(13, 0))).unwrap());
        let second = update_parts(cache.apply_update(&id, ReservationPatch::times(at(16, 0), at(17, 0))).unwrap());

        // Completions arrive in reverse order
        assert_eq!(cache.confirm_update(&second.0, second.1, second.2.clone()), Reconciliation::Applied);
        assert_eq!(cache.confirm_update(&first.0, first.1, first.2.clone()), Reconciliation::Applied);

        let entry = cache.get_by_id(&id).unwrap();
        assert_eq!(entry.reservation().start, at(16, 0));
        assert_eq!(entry.status(), &SyncStatus::Synced);
    }

    #[test]
    fn older_failure_does_not_hide_a_newer_write() {
        let mut cache = loaded_cache();
        let id = ReservationId::from(1);
        let first = update_parts(cache.apply_update(&id, ReservationPatch::times(at(12, 0), at(13, 0))).unwrap());
        let second = update_parts(cache.apply_update(&id, ReservationPatch::times(at(16, 0), at(17, 0))).unwrap());

        assert_eq!(cache.fail_update(&first.0, first.1), Reconciliation::Superseded);
        assert_eq!(cache.get_by_id(&id).unwrap().reservation().start, at(16, 0));
        assert_eq!(cache.confirm_update(&second.0, second.1, second.2), Reconciliation::Applied);
        assert_eq!(cache.get_by_id(&id).unwrap().reservation().start, at(16, 0));
        assert_eq!(cache.pending_count(), 0);
    }

    #[test]
    fn newer_failure_falls_back_to_the_older_success() {
        let mut cache = loaded_cache();
        let id = ReservationId::from(1);
        let first = update_parts(cache.apply_update(&id, ReservationPatch::times(at(12, 0), at(13, 0))).unwrap());
        let second = update_parts(cache.apply_update(&id, ReservationPatch::times(at(16, 0), at(17, 0))).unwrap());

        assert_eq!(cache.fail_update(&second.0, second.1), Reconciliation::RolledBack);
        assert_eq!(cache.get_by_id(&id).unwrap().reservation().start, at(10, 0));
        assert_eq!(cache.confirm_update(&first.0, first.1, first.2), Reconciliation::Applied);

        let entry = cache.get_by_id(&id).unwrap();
        assert_eq!(entry.reservation().start, at(12, 0));
        assert_eq!(entry.status(), &SyncStatus::Synced);
    }

    #[test]
    fn delete_is_not_optimistic() {
        let mut cache = loaded_cache();
        let id = ReservationId::from(2);
        let call = cache.apply_delete(&id).unwrap();
        assert!(cache.get_by_id(&id).is_some());
        assert!(cache.get_by_id(&id).unwrap().status().is_deleting());
        assert!(matches!(cache.apply_delete(&id), Err(Error::DeletionPending(_))));

        let seq = match &call { PendingCall::Delete{ seq, .. } => *seq, _ => unreachable!() };
        assert_eq!(cache.fail_delete(call.key(), seq), Reconciliation::RolledBack);
        assert_eq!(cache.get_by_id(&id).unwrap().status(), &SyncStatus::Synced);

        let call = cache.apply_delete(&id).unwrap();
        assert_eq!(cache.confirm_delete(call.key()), Reconciliation::Applied);
        assert!(cache.get_by_id(&id).is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn failed_delete_restores_pending_modifications() {
        let mut cache = loaded_cache();
        let id = ReservationId::from(1);
        let update = update_parts(cache.apply_update(&id, ReservationPatch::times(at(8, 0), at(9, 0))).unwrap());
        let delete = cache.apply_delete(&id).unwrap();

        let seq = match &delete { PendingCall::Delete{ seq, .. } => *seq, _ => unreachable!() };
        assert_eq!(cache.fail_delete(delete.key(), seq), Reconciliation::RolledBack);
        assert!(matches!(cache.get_by_id(&id).unwrap().status(), SyncStatus::LocallyModified{..}));

        assert_eq!(cache.confirm_update(&update.0, update.1, update.2), Reconciliation::Applied);
        assert_eq!(cache.get_by_id(&id).unwrap().status(), &SyncStatus::Synced);
    }

    #[test]
    fn unknown_ids_are_refused() {
        let mut cache = loaded_cache();
        let unknown = ReservationId::from(99);
        assert!(matches!(cache.apply_update(&unknown, ReservationPatch::default()), Err(Error::UnknownReservation(_))));
        assert!(matches!(cache.apply(Intent::Delete{ id: unknown }), Err(Error::UnknownReservation(_))));
    }

    #[test]
    fn load_replaces_wholesale() {
        let mut cache = loaded_cache();
        let key_of_retro = cache.get_by_id(&ReservationId::from(2)).unwrap().key().clone();
        cache.apply_create(draft("Unsaved"));

        let second = vec![stored(2, "Retro, moved"), stored(3, "Planning"), stored(3, "Planning again")];
        cache.replace_all(second);

        assert_eq!(cache.len(), 2);
        assert!(cache.has_same_contents_as(&[stored(3, "Planning"), stored(2, "Retro, moved")]));
        assert_eq!(cache.get_by_id(&ReservationId::from(2)).unwrap().key(), &key_of_retro);
        assert!(cache.last_load().is_some());
    }

    #[test]
    fn failures_older_than_a_load_are_ignored() {
        let mut cache = loaded_cache();
        let id = ReservationId::from(1);
        let (key, seq, _) = update_parts(cache.apply_update(&id, ReservationPatch::times(at(8, 0), at(9, 0))).unwrap());

        cache.replace_all(vec![stored(1, "Standup")]);
        assert_eq!(cache.get_by_id(&id).unwrap().key(), &key);
        assert_eq!(cache.fail_update(&key, seq), Reconciliation::Stale);
        assert_eq!(cache.get_by_id(&id).unwrap().reservation(), &stored(1, "Standup"));
    }

    #[test]
    fn updates_acknowledged_after_an_older_load_are_restored() {
        let mut cache = loaded_cache();
        let id = ReservationId::from(1);
        let first = update_parts(cache.apply_update(&id, ReservationPatch::times(at(8, 0), at(9, 0))).unwrap());
        let second = update_parts(cache.apply_update(&id, ReservationPatch::times(at(16, 0), at(17, 0))).unwrap());

        // The listing predates both updates
        cache.replace_all(vec![stored(1, "Standup"), stored(2, "Retro")]);
        assert_eq!(cache.get_by_id(&id).unwrap().reservation().start, at(10, 0));

        // Completions arrive in reverse order: the newest acknowledged state stays
        assert_eq!(cache.confirm_update(&second.0, second.1, second.2), Reconciliation::Restored);
        assert_eq!(cache.confirm_update(&first.0, first.1, first.2), Reconciliation::Stale);
        let entry = cache.get_by_id(&id).unwrap();
        assert_eq!((entry.reservation().start, entry.reservation().end), (at(16, 0), at(17, 0)));
        assert_eq!(entry.status(), &SyncStatus::Synced);
    }

    #[test]
    fn restored_updates_do_not_hide_newer_local_writes() {
        let mut cache = loaded_cache();
        let id = ReservationId::from(1);
        let before_load = update_parts(cache.apply_update(&id, ReservationPatch::times(at(8, 0), at(9, 0))).unwrap());
        cache.replace_all(vec![stored(1, "Standup")]);
        let after_load = update_parts(cache.apply_update(&id, ReservationPatch::times(at(16, 0), at(17, 0))).unwrap());

        assert_eq!(cache.confirm_update(&before_load.0, before_load.1, before_load.2), Reconciliation::Restored);
        assert_eq!(cache.get_by_id(&id).unwrap().reservation().start, at(16, 0));

        // The newer write fails: the entry falls back to the acknowledged update, not to the listing
        assert_eq!(cache.fail_update(&after_load.0, after_load.1), Reconciliation::RolledBack);
        let entry = cache.get_by_id(&id).unwrap();
        assert_eq!(entry.reservation().start, at(8, 0));
        assert_eq!(entry.status(), &SyncStatus::Synced);
    }

    #[test]
    fn rendered_titles_are_decorated() {
        let mut cache = ReservationCache::new();
        let mut commented = stored(1, "Standup");
        commented.comment = "urgent".to_string();
        cache.replace_all(vec![commented, stored(2, "Retro")]);

        let events = cache.rendered_events();
        assert_eq!(events[0].title, "Standup *");
        assert_eq!(events[1].title, "Retro");
        assert_eq!(cache.entries()[0].reservation().title, "Standup");
    }
}
