//! Fixed-capacity Server Registry (spec §4.3).
//!
//! Grounded on `Naming Sever/Server_Handle.c`. One coarse
//! `std::sync::Mutex` guards the whole table, including read-only
//! queries, matching the spec's stated policy in §5 ("one coarse mutex
//! guards the whole table for structural changes; read-only queries
//! take the same mutex"). Per §9's stable-id note, slots are addressed
//! by index with a generation counter rather than raw references, so a
//! stale handle can never alias a reused slot.

use std::sync::{Arc, Mutex};

use crate::handle::ServerHandle;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RegistryError {
    Full,
    NotFound,
    NotEnoughBackups,
}

struct Slot {
    handle: Option<Arc<ServerHandle>>,
    active: bool,
    running: bool,
    backup_refcount: usize,
    /// Backups already assigned to the server in this slot, in
    /// priority order. Non-empty ⇒ `assign_backups` is a no-op.
    backups: Vec<u64>,
    generation: u64,
}

impl Slot {
    fn empty() -> Self {
        Self {
            handle: None,
            active: false,
            running: false,
            backup_refcount: 0,
            backups: Vec::new(),
            generation: 0,
        }
    }
}

/// Fixed-size table of [`ServerHandle`]s with liveness state and
/// backup-assignment bookkeeping.
pub struct ServerRegistry {
    slots: Mutex<Vec<Slot>>,
}

impl ServerRegistry {
    pub fn new(capacity: usize) -> Self {
        Self { slots: Mutex::new((0..capacity).map(|_| Slot::empty()).collect()) }
    }

    /// If a slot already holds `handle.server_id`, reactivates it
    /// (Active=Running=true). Otherwise occupies the first free slot.
    /// Fails with [`RegistryError::Full`] when there is none.
    pub fn add_server(&self, handle: Arc<ServerHandle>) -> Result<(), RegistryError> {
        let mut slots = self.slots.lock().unwrap();
        if let Some(slot) =
            slots.iter_mut().find(|s| s.handle.as_ref().map(|h| h.server_id) == Some(handle.server_id))
        {
            slot.active = true;
            slot.running = true;
            return Ok(());
        }
        let slot = slots.iter_mut().find(|s| s.handle.is_none()).ok_or(RegistryError::Full)?;
        slot.generation += 1;
        slot.handle = Some(handle);
        slot.active = true;
        slot.running = true;
        Ok(())
    }

    /// Clears Active and Running on the matching Running slot.
    pub fn remove_server(&self, id: u64) -> Result<(), RegistryError> {
        let mut slots = self.slots.lock().unwrap();
        let slot = find_by_id(&mut slots, id).ok_or(RegistryError::NotFound)?;
        slot.active = false;
        slot.running = false;
        slot.handle = None;
        slot.backup_refcount = 0;
        slot.backups.clear();
        Ok(())
    }

    pub fn set_inactive(&self, id: u64) -> Result<(), RegistryError> {
        let mut slots = self.slots.lock().unwrap();
        let slot = find_by_id(&mut slots, id).ok_or(RegistryError::NotFound)?;
        slot.running = false;
        Ok(())
    }

    pub fn set_active(&self, id: u64) -> Result<(), RegistryError> {
        let mut slots = self.slots.lock().unwrap();
        let slot = find_by_id(&mut slots, id).ok_or(RegistryError::NotFound)?;
        slot.running = true;
        Ok(())
    }

    /// Returns the Running flag, or `NotFound` if `id` is unknown.
    pub fn is_active(&self, id: u64) -> Result<bool, RegistryError> {
        let mut slots = self.slots.lock().unwrap();
        find_by_id(&mut slots, id).map(|s| s.running).ok_or(RegistryError::NotFound)
    }

    pub fn get_handle(&self, id: u64) -> Option<Arc<ServerHandle>> {
        let mut slots = self.slots.lock().unwrap();
        find_by_id(&mut slots, id).and_then(|s| s.handle.clone())
    }

    /// Selects `count` distinct Running-and-Active servers other than
    /// `id`, preferring the smallest current `backup_refcount`, in
    /// registry-slot order on ties. Idempotent: if `id`'s backup list
    /// is already non-empty, returns `Ok` without reassigning.
    /// Fails with [`RegistryError::NotEnoughBackups`] if it cannot fill
    /// the quota (trivially satisfied when `count == 0`).
    pub fn assign_backups(&self, id: u64, count: usize) -> Result<Vec<u64>, RegistryError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let mut slots = self.slots.lock().unwrap();

        if let Some(existing) = find_by_id(&mut slots, id).filter(|s| !s.backups.is_empty()) {
            return Ok(existing.backups.clone());
        }

        let mut candidates: Vec<(usize, usize, u64)> = slots
            .iter()
            .enumerate()
            .filter_map(|(idx, s)| {
                let h = s.handle.as_ref()?;
                if s.active && s.running && h.server_id != id {
                    Some((idx, s.backup_refcount, h.server_id))
                } else {
                    None
                }
            })
            .collect();
        candidates.sort_by_key(|&(idx, refcount, _)| (refcount, idx));

        if candidates.len() < count {
            return Err(RegistryError::NotEnoughBackups);
        }

        let chosen: Vec<u64> = candidates.into_iter().take(count).map(|(_, _, id)| id).collect();
        for &backup_id in &chosen {
            if let Some(slot) = find_by_id(&mut slots, backup_id) {
                slot.backup_refcount += 1;
            }
        }
        if let Some(slot) = find_by_id(&mut slots, id) {
            slot.backups = chosen.clone();
        }
        Ok(chosen)
    }

    /// Scans `backup_list` in order, returning the first element whose
    /// id `is_active`.
    pub fn get_active_backup(&self, backup_list: &[u64]) -> Option<u64> {
        backup_list.iter().copied().find(|&id| self.is_active(id).unwrap_or(false))
    }
}

fn find_by_id(slots: &mut [Slot], id: u64) -> Option<&mut Slot> {
    slots.iter_mut().find(|s| s.handle.as_ref().map(|h| h.server_id) == Some(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn handle(id: u64) -> Arc<ServerHandle> {
        ServerHandle::new(id, Ipv4Addr::new(127, 0, 0, 1), 9000 + id as u16, 0, 0)
    }

    #[test]
    fn add_then_remove_round_trips() {
        let reg = ServerRegistry::new(4);
        reg.add_server(handle(1)).unwrap();
        assert!(reg.is_active(1).unwrap());
        reg.remove_server(1).unwrap();
        assert_eq!(reg.is_active(1), Err(RegistryError::NotFound));
    }

    #[test]
    fn registry_full_rejects_new_server() {
        let reg = ServerRegistry::new(1);
        reg.add_server(handle(1)).unwrap();
        assert_eq!(reg.add_server(handle(2)), Err(RegistryError::Full));
    }

    #[test]
    fn readd_same_id_reactivates_slot() {
        let reg = ServerRegistry::new(1);
        reg.add_server(handle(1)).unwrap();
        reg.set_inactive(1).unwrap();
        reg.add_server(handle(1)).unwrap();
        assert!(reg.is_active(1).unwrap());
    }

    #[test]
    fn assign_backups_picks_least_loaded_others() {
        let reg = ServerRegistry::new(4);
        reg.add_server(handle(1)).unwrap();
        reg.add_server(handle(2)).unwrap();
        reg.add_server(handle(3)).unwrap();
        let backups = reg.assign_backups(1, 1).unwrap();
        assert_eq!(backups.len(), 1);
        assert_ne!(backups[0], 1);
    }

    #[test]
    fn assign_backups_is_idempotent_on_already_chosen() {
        let reg = ServerRegistry::new(4);
        reg.add_server(handle(1)).unwrap();
        reg.add_server(handle(2)).unwrap();
        let first = reg.assign_backups(1, 1).unwrap();
        let second = reg.assign_backups(1, 1).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn assign_backups_zero_never_fails() {
        let reg = ServerRegistry::new(1);
        reg.add_server(handle(1)).unwrap();
        assert_eq!(reg.assign_backups(1, 0).unwrap(), Vec::<u64>::new());
    }

    #[test]
    fn get_active_backup_skips_down_ones() {
        let reg = ServerRegistry::new(4);
        reg.add_server(handle(1)).unwrap();
        reg.add_server(handle(2)).unwrap();
        reg.set_inactive(1).unwrap();
        assert_eq!(reg.get_active_backup(&[1, 2]), Some(2));
    }
}
