//! Fixed-capacity Client Registry (spec §4.3, §3).
//!
//! Grounded on `Naming Sever/Client_Handle.c`; the same coarse-mutex
//! policy as [`crate::registry::ServerRegistry`] applies.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::handle::ClientHandle;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ClientRegistryError {
    Full,
}

pub struct ClientRegistry {
    capacity: usize,
    clients: Mutex<HashMap<u64, ClientHandle>>,
}

impl ClientRegistry {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, clients: Mutex::new(HashMap::new()) }
    }

    pub fn add(&self, handle: ClientHandle) -> Result<(), ClientRegistryError> {
        let mut clients = self.clients.lock().unwrap();
        if clients.len() >= self.capacity && !clients.contains_key(&handle.client_id) {
            return Err(ClientRegistryError::Full);
        }
        clients.insert(handle.client_id, handle);
        Ok(())
    }

    pub fn remove(&self, client_id: u64) {
        self.clients.lock().unwrap().remove(&client_id);
    }

    pub fn contains(&self, client_id: u64) -> bool {
        self.clients.lock().unwrap().contains_key(&client_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn add_remove_round_trips() {
        let reg = ClientRegistry::new(2);
        reg.add(ClientHandle { client_id: 1, ip: Ipv4Addr::new(127, 0, 0, 1), port: 9000 })
            .unwrap();
        assert!(reg.contains(1));
        reg.remove(1);
        assert!(!reg.contains(1));
    }

    #[test]
    fn full_registry_rejects_new_client() {
        let reg = ClientRegistry::new(1);
        reg.add(ClientHandle { client_id: 1, ip: Ipv4Addr::new(127, 0, 0, 1), port: 9000 })
            .unwrap();
        let err = reg.add(ClientHandle { client_id: 2, ip: Ipv4Addr::new(127, 0, 0, 1), port: 9001 });
        assert_eq!(err, Err(ClientRegistryError::Full));
    }
}
