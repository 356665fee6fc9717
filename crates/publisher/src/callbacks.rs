//! Observer notifications for published entries.

use netdata_types::{Ip6Prefix, NetworkDataRecord, PublisherEvent};

/// Notified when a published prefix (on-mesh or external route) is added
/// to or removed from the Network Data. Any context is captured by the closure.
pub type PrefixCallback = Box<dyn FnMut(PublisherEvent, &Ip6Prefix) + Send>;

/// Notified when the published DNS/SRP service entry is added to or
/// removed from the Network Data.
pub type DnsSrpServiceCallback = Box<dyn FnMut(PublisherEvent) + Send>;

/// Holds at most one observer per entry kind.
#[derive(Default)]
pub(crate) struct CallbackDispatcher {
    prefix: Option<PrefixCallback>,
    dns_srp: Option<DnsSrpServiceCallback>,
}

impl CallbackDispatcher {
    /// Replace the prefix observer. `None` disables notification.
    pub(crate) fn set_prefix(&mut self, callback: Option<PrefixCallback>) {
        self.prefix = callback;
    }

    /// Replace the DNS/SRP observer. `None` disables notification.
    pub(crate) fn set_dns_srp(&mut self, callback: Option<DnsSrpServiceCallback>) {
        self.dns_srp = callback;
    }

    /// Invoke the observer for `record`'s kind, in-line.
    pub(crate) fn notify(&mut self, event: PublisherEvent, record: &NetworkDataRecord) {
        match record {
            NetworkDataRecord::OnMeshPrefix(config) => {
                if let Some(callback) = self.prefix.as_mut() {
                    callback(event, &config.prefix);
                }
            }
            NetworkDataRecord::ExternalRoute(config) => {
                if let Some(callback) = self.prefix.as_mut() {
                    callback(event, &config.prefix);
                }
            }
            NetworkDataRecord::DnsSrpService(_) => {
                if let Some(callback) = self.dns_srp.as_mut() {
                    callback(event);
                }
            }
        }
    }
}

impl std::fmt::Debug for CallbackDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackDispatcher")
            .field("prefix", &self.prefix.is_some())
            .field("dns_srp", &self.dns_srp.is_some())
            .finish()
    }
}
