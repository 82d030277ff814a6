//! In-process registry.
//!
//! Reservations are loaded at startup. Unknown machines are given the
//! lowest free address of the dynamic pool when one is configured. Pool
//! addresses held by a machine, the server or an instance are never handed out.

use std::collections::{HashMap, HashSet};
use std::net::Ipv4Addr;
use std::sync::{Mutex, MutexGuard, RwLock, RwLockWriteGuard};

use chrono::Utc;
use macaddr::MacAddr6;
use tracing::{debug, info};

use super::{Registry, Reservation};
use crate::domain::{Machine, MachineType};
use crate::error::RegistryError;

/// Inclusive address range for dynamic assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AddressPool {
    start: Ipv4Addr,
    end: Ipv4Addr,
}

#[derive(Default)]
struct Variables {
    cluster: HashMap<String, String>,
    machine: HashMap<(MacAddr6, String), String>,
}

pub struct MemoryRegistry {
    cluster_name: String,
    instances: Vec<Ipv4Addr>,
    pool: Option<AddressPool>,
    excluded: HashSet<Ipv4Addr>,
    machines: Mutex<HashMap<MacAddr6, Machine>>,
    variables: RwLock<Variables>,
}

impl MemoryRegistry {
    pub fn new(cluster_name: impl Into<String>) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            instances: Vec::new(),
            pool: None,
            excluded: HashSet::new(),
            machines: Mutex::new(HashMap::new()),
            variables: RwLock::new(Variables::default()),
        }
    }

    pub fn with_instances(mut self, instances: Vec<Ipv4Addr>) -> Self {
        self.instances = instances;
        self
    }

    pub fn with_pool(mut self, start: Ipv4Addr, end: Ipv4Addr) -> Self {
        self.pool = Some(AddressPool { start, end });
        self
    }

    /// Addresses the pool must skip, such as the server's own.
    pub fn with_excluded(mut self, addresses: impl IntoIterator<Item = Ipv4Addr>) -> Self {
        self.excluded.extend(addresses);
        self
    }

    pub fn with_reservations(self, reservations: &[Reservation]) -> Self {
        {
            let mut machines = self.lock_machines();
            for r in reservations {
                machines.insert(r.mac, Machine::new(r.mac, r.ip, r.machine_type));
            }
        }
        self
    }

    /// Reserve `ip` for `mac`, replacing any earlier binding of that MAC.
    /// Fails when another machine already holds `ip`.
    pub fn reserve(&self, mac: MacAddr6, ip: Ipv4Addr) -> Result<(), RegistryError> {
        let mut machines = self.lock_machines();
        if let Some(holder) = machines.values().find(|m| m.ip == ip && m.mac != mac) {
            return Err(RegistryError::AddressInUse {
                ip,
                holder: holder.mac,
            });
        }
        machines.insert(mac, Machine::new(mac, ip, MachineType::Reserved));
        Ok(())
    }

    pub fn set_cluster_variable(&self, key: impl Into<String>, value: impl Into<String>) {
        self.write_variables().cluster.insert(key.into(), value.into());
    }

    pub fn set_machine_variable(
        &self,
        mac: MacAddr6,
        key: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.write_variables()
            .machine
            .insert((mac, key.into()), value.into());
    }

    /// Snapshot of a known machine, without provisioning.
    pub fn get(&self, mac: MacAddr6) -> Option<Machine> {
        self.lock_machines().get(&mac).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock_machines().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock_machines(&self) -> MutexGuard<'_, HashMap<MacAddr6, Machine>> {
        self.machines.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn write_variables(&self) -> RwLockWriteGuard<'_, Variables> {
        self.variables.write().unwrap_or_else(|e| e.into_inner())
    }

    fn free_address(
        &self,
        pool: AddressPool,
        machines: &HashMap<MacAddr6, Machine>,
    ) -> Option<Ipv4Addr> {
        let (start, end) = (u32::from(pool.start), u32::from(pool.end));
        (start..=end)
            .map(Ipv4Addr::from)
            .filter(|ip| !self.excluded.contains(ip) && !self.instances.contains(ip))
            .find(|ip| !machines.values().any(|m| m.ip == *ip))
    }
}

impl Registry for MemoryRegistry {
    fn machine(&self, mac: MacAddr6) -> Result<Machine, RegistryError> {
        let mut machines = self.lock_machines();
        if let Some(machine) = machines.get(&mac) {
            return Ok(machine.clone());
        }

        let pool = self.pool.ok_or(RegistryError::UnknownMachine(mac))?;
        let ip = self.free_address(pool, &machines).ok_or(RegistryError::PoolExhausted(mac))?;

        let machine = Machine::new(mac, ip, MachineType::Dynamic);
        info!(mac = %mac, ip = %ip, "Assigned address from pool");
        machines.insert(mac, machine.clone());
        Ok(machine)
    }

    fn variable(&self, mac: MacAddr6, key: &str) -> Result<String, RegistryError> {
        let variables = self.variables.read().unwrap_or_else(|e| e.into_inner());
        variables
            .machine
            .get(&(mac, key.to_string()))
            .or_else(|| variables.cluster.get(key))
            .cloned()
            .ok_or_else(|| RegistryError::VariableNotFound(key.to_string()))
    }

    fn check_in(&self, mac: MacAddr6) {
        if let Some(machine) = self.lock_machines().get_mut(&mac) {
            machine.last_seen = Some(Utc::now());
            debug!(mac = %mac, ip = %machine.ip, "Machine checked in");
        }
    }

    fn instances(&self) -> Result<Vec<Ipv4Addr>, RegistryError> {
        Ok(self.instances.clone())
    }

    fn cluster_name(&self) -> String {
        self.cluster_name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mac(last: u8) -> MacAddr6 {
        MacAddr6::new(0xaa, 0xbb, 0xcc, 0xdd, 0xee, last)
    }

    mod machine_tests {
        use super::*;

        #[test]
        fn reserved_machine_is_returned() {
            let registry = MemoryRegistry::new("c").with_reservations(&[Reservation {
                mac: mac(1),
                ip: Ipv4Addr::new(10, 0, 0, 11),
                machine_type: MachineType::Reserved,
            }]);

            let machine = registry.machine(mac(1)).unwrap();
            assert_eq!(machine.ip, Ipv4Addr::new(10, 0, 0, 11));
            assert_eq!(machine.machine_type, MachineType::Reserved);
        }

        #[test]
        fn unknown_machine_without_pool() {
            let registry = MemoryRegistry::new("c");
            assert_eq!(
                registry.machine(mac(1)),
                Err(RegistryError::UnknownMachine(mac(1)))
            );
            assert!(registry.is_empty());
        }

        #[test]
        fn pool_skips_reserved_addresses() {
            let registry = MemoryRegistry::new("c")
                .with_pool(Ipv4Addr::new(10, 0, 0, 10), Ipv4Addr::new(10, 0, 0, 12));
            registry.reserve(mac(9), Ipv4Addr::new(10, 0, 0, 10)).unwrap();

            let machine = registry.machine(mac(1)).unwrap();
            assert_eq!(machine.ip, Ipv4Addr::new(10, 0, 0, 11));
            assert_eq!(machine.machine_type, MachineType::Dynamic);
        }

        #[test]
        fn pool_assignment_is_stable() {
            let registry = MemoryRegistry::new("c")
                .with_pool(Ipv4Addr::new(10, 0, 0, 10), Ipv4Addr::new(10, 0, 0, 20));

            let first = registry.machine(mac(1)).unwrap();
            let second = registry.machine(mac(2)).unwrap();
            assert_ne!(first.ip, second.ip);
            assert_eq!(registry.machine(mac(1)).unwrap().ip, first.ip);
            assert_eq!(registry.len(), 2);
        }

        #[test]
        fn pool_skips_server_and_instance_addresses() {
            let registry = MemoryRegistry::new("c")
                .with_instances(vec![Ipv4Addr::new(10, 0, 0, 2)])
                .with_excluded([Ipv4Addr::new(10, 0, 0, 1)])
                .with_pool(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 5));

            assert_eq!(registry.machine(mac(1)).unwrap().ip, Ipv4Addr::new(10, 0, 0, 3));
            assert_eq!(registry.machine(mac(2)).unwrap().ip, Ipv4Addr::new(10, 0, 0, 4));
        }

        #[test]
        fn pool_of_only_excluded_addresses_is_exhausted() {
            let registry = MemoryRegistry::new("c")
                .with_excluded([Ipv4Addr::new(10, 0, 0, 1)])
                .with_pool(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 1));
            assert_eq!(
                registry.machine(mac(1)),
                Err(RegistryError::PoolExhausted(mac(1)))
            );
        }

        #[test]
        fn reserve_rejects_address_held_by_another_machine() {
            let registry = MemoryRegistry::new("c")
                .with_pool(Ipv4Addr::new(10, 0, 0, 10), Ipv4Addr::new(10, 0, 0, 20));
            let dynamic = registry.machine(mac(1)).unwrap();

            assert_eq!(
                registry.reserve(mac(2), dynamic.ip),
                Err(RegistryError::AddressInUse {
                    ip: dynamic.ip,
                    holder: mac(1),
                })
            );
            assert!(registry.get(mac(2)).is_none());
        }

        #[test]
        fn reserve_rebinds_same_machine() {
            let registry = MemoryRegistry::new("c");
            registry.reserve(mac(1), Ipv4Addr::new(10, 0, 0, 11)).unwrap();
            registry.reserve(mac(1), Ipv4Addr::new(10, 0, 0, 11)).unwrap();
            registry.reserve(mac(1), Ipv4Addr::new(10, 0, 0, 12)).unwrap();
            assert_eq!(registry.get(mac(1)).unwrap().ip, Ipv4Addr::new(10, 0, 0, 12));
            assert_eq!(registry.len(), 1);
        }

        #[test]
        fn pool_exhausted() {
            let registry = MemoryRegistry::new("c")
                .with_pool(Ipv4Addr::new(10, 0, 0, 10), Ipv4Addr::new(10, 0, 0, 10));

            registry.machine(mac(1)).unwrap();
            assert_eq!(
                registry.machine(mac(2)),
                Err(RegistryError::PoolExhausted(mac(2)))
            );
        }
    }

    mod variable_tests {
        use super::*;

        #[test]
        fn machine_value_overrides_cluster_value() {
            let registry = MemoryRegistry::new("c");
            registry.set_cluster_variable("net-conf", "cluster");
            registry.set_machine_variable(mac(1), "net-conf", "own");

            assert_eq!(registry.variable(mac(1), "net-conf").unwrap(), "own");
            assert_eq!(registry.variable(mac(2), "net-conf").unwrap(), "cluster");
        }

        #[test]
        fn missing_variable() {
            let registry = MemoryRegistry::new("c");
            assert_eq!(
                registry.variable(mac(1), "net-conf"),
                Err(RegistryError::VariableNotFound("net-conf".to_string()))
            );
        }
    }

    mod check_in_tests {
        use super::*;

        #[test]
        fn check_in_sets_last_seen() {
            let registry = MemoryRegistry::new("c");
            registry.reserve(mac(1), Ipv4Addr::new(10, 0, 0, 11)).unwrap();
            assert!(registry.get(mac(1)).unwrap().last_seen.is_none());

            registry.check_in(mac(1));
            assert!(registry.get(mac(1)).unwrap().last_seen.is_some());
        }

        #[test]
        fn check_in_unknown_machine_is_ignored() {
            let registry = MemoryRegistry::new("c");
            registry.check_in(mac(1));
            assert!(registry.get(mac(1)).is_none());
        }
    }

    #[test]
    fn instances_and_cluster_name() {
        let registry = MemoryRegistry::new("mycluster")
            .with_instances(vec![Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2)]);
        assert_eq!(registry.instances().unwrap().len(), 2);
        assert_eq!(registry.cluster_name(), "mycluster");
    }
}
