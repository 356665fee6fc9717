//! Bounded storage of published entries.

use netdata_types::{EntryKey, Ip6Prefix};

use crate::entry::Entry;
use crate::PublisherError;

/// Fixed-capacity arena of prefix entries plus the DNS/SRP singleton slot.
///
/// On-mesh prefixes and external routes share the prefix slots, so the
/// capacity limit is enforced in one place. A prefix occupies at most one
/// slot whatever its kind.
#[derive(Debug)]
pub(crate) struct EntryPool {
    prefix_slots: Vec<Option<Entry>>,
    dns_srp: Option<Entry>,
}

impl EntryPool {
    pub(crate) fn new(max_prefix_entries: usize) -> Self {
        Self {
            prefix_slots: (0..max_prefix_entries).map(|_| None).collect(),
            dns_srp: None,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.prefix_slots.len()
    }

    pub(crate) fn prefix_count(&self) -> usize {
        self.prefix_slots.iter().filter(|slot| slot.is_some()).count()
    }

    fn prefix_index(&self, prefix: &Ip6Prefix) -> Option<usize> {
        self.prefix_slots.iter().position(|slot| {
            slot.as_ref()
                .is_some_and(|entry| entry.key() == EntryKey::Prefix(*prefix))
        })
    }

    /// Admit a prefix entry.
    ///
    /// Fails with `Already` if the prefix is tracked (either kind) and
    /// `NoBufs` if every slot is taken. The existing entry is untouched.
    pub(crate) fn insert_prefix(&mut self, entry: Entry) -> Result<(), PublisherError> {
        debug_assert!(matches!(entry.key(), EntryKey::Prefix(_)));
        if self.get(&entry.key()).is_some() {
            return Err(PublisherError::Already);
        }
        let slot = self
            .prefix_slots
            .iter_mut()
            .find(|slot| slot.is_none())
            .ok_or(PublisherError::NoBufs)?;
        *slot = Some(entry);
        Ok(())
    }

    pub(crate) fn remove_prefix(&mut self, prefix: &Ip6Prefix) -> Option<Entry> {
        let index = self.prefix_index(prefix)?;
        self.prefix_slots[index].take()
    }

    /// Install a new DNS/SRP entry, returning the one it replaces.
    pub(crate) fn replace_dns_srp(&mut self, entry: Entry) -> Option<Entry> {
        self.dns_srp.replace(entry)
    }

    pub(crate) fn take_dns_srp(&mut self) -> Option<Entry> {
        self.dns_srp.take()
    }

    pub(crate) fn get(&self, key: &EntryKey) -> Option<&Entry> {
        match key {
            EntryKey::Prefix(prefix) => self
                .prefix_index(prefix)
                .and_then(|i| self.prefix_slots[i].as_ref()),
            EntryKey::DnsSrpService => self.dns_srp.as_ref(),
        }
    }

    pub(crate) fn get_mut(&mut self, key: &EntryKey) -> Option<&mut Entry> {
        match key {
            EntryKey::Prefix(prefix) => {
                let index = self.prefix_index(prefix)?;
                self.prefix_slots[index].as_mut()
            }
            EntryKey::DnsSrpService => self.dns_srp.as_mut(),
        }
    }

    /// Keys of every tracked entry, prefixes first in slot order.
    pub(crate) fn keys(&self) -> Vec<EntryKey> {
        self.iter().map(Entry::key).collect()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.prefix_slots
            .iter()
            .flatten()
            .chain(self.dns_srp.iter())
    }

    pub(crate) fn prefix_entries(&self) -> impl Iterator<Item = &Entry> {
        self.prefix_slots.iter().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netdata_types::{
        DnsSrpServiceEntry, ExternalRouteConfig, NetworkDataRecord, OnMeshPrefixConfig,
    };

    fn route(s: &str) -> Entry {
        Entry::new(NetworkDataRecord::ExternalRoute(ExternalRouteConfig::new(
            s.parse().unwrap(),
        )))
    }

    fn on_mesh(s: &str) -> Entry {
        Entry::new(NetworkDataRecord::OnMeshPrefix(
            OnMeshPrefixConfig::new(s.parse().unwrap())
                .with_flags("paos")
                .unwrap(),
        ))
    }

    #[test]
    fn test_capacity_shared_between_kinds() {
        let mut pool = EntryPool::new(2);
        pool.insert_prefix(on_mesh("fd00:1::/64")).unwrap();
        pool.insert_prefix(route("fd00:2::/48")).unwrap();
        assert_eq!(
            pool.insert_prefix(route("fd00:3::/48")),
            Err(PublisherError::NoBufs)
        );

        pool.remove_prefix(&"fd00:1::/64".parse().unwrap()).unwrap();
        pool.insert_prefix(route("fd00:3::/48")).unwrap();
        assert_eq!(pool.prefix_count(), 2);
    }

    #[test]
    fn test_prefix_unique_across_kinds() {
        let mut pool = EntryPool::new(4);
        pool.insert_prefix(on_mesh("fd00:1::/64")).unwrap();
        assert_eq!(
            pool.insert_prefix(route("fd00:1::/64")),
            Err(PublisherError::Already)
        );
        assert_eq!(pool.prefix_count(), 1);
    }

    #[test]
    fn test_dns_srp_slot_not_counted() {
        let mut pool = EntryPool::new(1);
        pool.insert_prefix(route("fd00:2::/48")).unwrap();

        let first = Entry::new(NetworkDataRecord::DnsSrpService(
            DnsSrpServiceEntry::Anycast { sequence_number: 1 },
        ));
        let second = Entry::new(NetworkDataRecord::DnsSrpService(
            DnsSrpServiceEntry::UnicastMeshLocalEid { port: 53 },
        ));
        assert!(pool.replace_dns_srp(first).is_none());
        let replaced = pool.replace_dns_srp(second).unwrap();
        assert_eq!(
            replaced.record,
            NetworkDataRecord::DnsSrpService(DnsSrpServiceEntry::Anycast { sequence_number: 1 })
        );

        assert_eq!(pool.prefix_count(), 1);
        assert_eq!(pool.keys().len(), 2);
        assert!(pool.get(&EntryKey::DnsSrpService).is_some());
    }
}
