//! Network interface discovery.

use std::fmt::Debug;

use sysinfo::Networks;

use crate::error::{Error, Result};

/// Summary of one network interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceInfo {
    pub name: String,
    /// Bytes received since boot.
    pub total_received: u64,
    /// Bytes transmitted since boot.
    pub total_transmitted: u64,
}

impl InterfaceInfo {
    /// Whether this is a loopback interface (`lo`, `lo0`, ...).
    pub fn is_loopback(&self) -> bool {
        self.name == "lo"
            || self
                .name
                .strip_prefix("lo")
                .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
    }
}

/// Enumerates the host's network interfaces.
pub trait InterfaceProvider: Debug {
    fn interfaces(&self) -> Vec<InterfaceInfo>;
}

/// [`InterfaceProvider`] backed by the `sysinfo` crate.
#[derive(Debug, Default)]
pub struct SystemInterfaces;

impl InterfaceProvider for SystemInterfaces {
    fn interfaces(&self) -> Vec<InterfaceInfo> {
        let networks = Networks::new_with_refreshed_list();
        let mut interfaces: Vec<InterfaceInfo> = networks
            .iter()
            .map(|(name, data)| InterfaceInfo {
                name: name.clone(),
                total_received: data.total_received(),
                total_transmitted: data.total_transmitted(),
            })
            .collect();
        interfaces.sort_by(|a, b| a.name.cmp(&b.name));
        interfaces
    }
}

/// Pick the interface carrying most of the traffic.
///
/// Loopback interfaces are ignored. The interface that has received the most
/// bytes wins; ties go to the alphabetically first name.
///
/// # Errors
///
/// Returns [`Error::NoInterfaceFound`] if there is no candidate.
pub fn default_interface_name(provider: &dyn InterfaceProvider) -> Result<String> {
    pick_default(provider.interfaces()).ok_or(Error::NoInterfaceFound)
}

fn pick_default(interfaces: Vec<InterfaceInfo>) -> Option<String> {
    interfaces
        .into_iter()
        .filter(|iface| !iface.is_loopback())
        .max_by(|a, b| {
            a.total_received
                .cmp(&b.total_received)
                .then_with(|| b.name.cmp(&a.name))
        })
        .map(|iface| iface.name)
}
