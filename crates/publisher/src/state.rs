//! Publisher state machine.

use netdata_core::{Action, Event, NetworkDataView, StateMachine, TimerId};
use netdata_types::{
    ConfigError, DnsSrpServiceEntry, EntryKey, ExternalRouteConfig, Ip6Prefix, NetworkDataRecord,
    OnMeshPrefixConfig, PublisherEvent, Rloc16,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::net::Ipv6Addr;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::callbacks::{CallbackDispatcher, DnsSrpServiceCallback, PrefixCallback};
use crate::entry::{Entry, EntryState};
use crate::evaluator;
use crate::pool::EntryPool;
use crate::{PublisherConfig, PublisherError};

/// Decides, independently on each node, whether the node's own candidate
/// entries should currently be present in the Network Data.
///
/// Each entry is re-evaluated when it is published, when the Network Data
/// changes, and when its evaluation timer fires:
///
/// - `Idle` with fewer than `desired` equivalent entries from other nodes:
///   add the local copy.
/// - `Added` with at least `desired` others and the local node outside the
///   best-ranked `desired` contributors: remove the local copy.
///
/// Every evaluation re-arms the entry's timer with a jittered delay, or a
/// shorter backoff when the Network Data request failed.
pub struct Publisher<V> {
    config: PublisherConfig,

    /// The node's window onto the Network Data.
    view: V,

    /// Entries the node wants published.
    pool: EntryPool,

    /// Observers for ADDED/REMOVED transitions.
    callbacks: CallbackDispatcher,

    /// Jitter source.
    rng: ChaCha8Rng,

    /// Current time.
    now: Duration,
}

impl<V: NetworkDataView> Publisher<V> {
    /// Create a publisher over the given Network Data view.
    pub fn new(config: PublisherConfig, view: V) -> Self {
        Self {
            pool: EntryPool::new(config.max_prefix_entries),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            callbacks: CallbackDispatcher::default(),
            config,
            view,
            now: Duration::ZERO,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn local_rloc16(&self) -> Rloc16 {
        self.view.local_rloc16()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Callbacks
    // ═══════════════════════════════════════════════════════════════════════════

    /// Set the prefix observer, replacing any previous one.
    ///
    /// `None` disables prefix notifications.
    pub fn set_prefix_callback(&mut self, callback: Option<PrefixCallback>) {
        self.callbacks.set_prefix(callback);
    }

    /// Set the DNS/SRP service observer, replacing any previous one.
    ///
    /// `None` disables DNS/SRP notifications.
    pub fn set_dns_srp_service_callback(&mut self, callback: Option<DnsSrpServiceCallback>) {
        self.callbacks.set_dns_srp(callback);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Prefix entries
    // ═══════════════════════════════════════════════════════════════════════════

    /// Request an on-mesh prefix to be published.
    ///
    /// The entry is evaluated before this returns, so it is already added
    /// if too few other nodes publish it.
    pub fn publish_on_mesh_prefix(
        &mut self,
        config: OnMeshPrefixConfig,
    ) -> Result<Vec<Action>, PublisherError> {
        config.validate()?;
        self.check_outside_mesh_local(&config.prefix)?;
        self.publish_prefix(NetworkDataRecord::OnMeshPrefix(config))
    }

    /// Request an external route to be published.
    pub fn publish_external_route(
        &mut self,
        config: ExternalRouteConfig,
    ) -> Result<Vec<Action>, PublisherError> {
        config.validate()?;
        self.check_outside_mesh_local(&config.prefix)?;
        self.publish_prefix(NetworkDataRecord::ExternalRoute(config))
    }

    fn check_outside_mesh_local(&self, prefix: &Ip6Prefix) -> Result<(), PublisherError> {
        match self.view.mesh_local_prefix() {
            Some(mesh_local)
                if prefix.length() >= mesh_local.length()
                    && mesh_local.contains(&prefix.address()) =>
            {
                Err(ConfigError::MeshLocal.into())
            }
            _ => Ok(()),
        }
    }

    fn publish_prefix(&mut self, record: NetworkDataRecord) -> Result<Vec<Action>, PublisherError> {
        let key = record.key();
        if let Err(error) = self.pool.insert_prefix(Entry::new(record)) {
            debug!(entry = %record, %error, "Rejected prefix publish request");
            return Err(error);
        }

        info!(entry = %record, "Publishing prefix entry");
        Ok(self.evaluate(key))
    }

    /// Stop publishing a prefix (either kind).
    ///
    /// If the entry is currently added it is removed from the Network Data
    /// and the observer is told, even if the removal request itself fails.
    pub fn unpublish_prefix(&mut self, prefix: &Ip6Prefix) -> Result<Vec<Action>, PublisherError> {
        let entry = self
            .pool
            .remove_prefix(prefix)
            .ok_or(PublisherError::NotFound)?;

        info!(%prefix, state = %entry.state, "Unpublishing prefix entry");
        self.retire(entry);

        Ok(vec![Action::CancelTimer {
            id: TimerId::Evaluation(EntryKey::Prefix(*prefix)),
        }])
    }

    /// Whether the published prefix is currently in the Network Data.
    pub fn is_prefix_added(&self, prefix: &Ip6Prefix) -> bool {
        self.prefix_entry_state(prefix)
            .is_some_and(EntryState::is_added)
    }

    /// State of a published prefix, `None` if not published.
    pub fn prefix_entry_state(&self, prefix: &Ip6Prefix) -> Option<EntryState> {
        self.pool
            .get(&EntryKey::Prefix(*prefix))
            .map(|entry| entry.state)
    }

    /// Every published prefix entry with its state, in slot order.
    pub fn published_prefixes(&self) -> impl Iterator<Item = (&NetworkDataRecord, EntryState)> {
        self.pool
            .prefix_entries()
            .map(|entry| (&entry.record, entry.state))
    }

    pub fn prefix_entry_count(&self) -> usize {
        self.pool.prefix_count()
    }

    pub fn max_prefix_entries(&self) -> usize {
        self.pool.capacity()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // DNS/SRP service entry
    // ═══════════════════════════════════════════════════════════════════════════

    /// Publish an anycast DNS/SRP service, replacing any current DNS/SRP entry.
    pub fn publish_dns_srp_service_anycast(&mut self, sequence_number: u8) -> Vec<Action> {
        self.publish_dns_srp_service(DnsSrpServiceEntry::Anycast { sequence_number })
    }

    /// Publish a unicast DNS/SRP service at `address`, replacing any current
    /// DNS/SRP entry.
    pub fn publish_dns_srp_service_unicast(&mut self, address: Ipv6Addr, port: u16) -> Vec<Action> {
        self.publish_dns_srp_service(DnsSrpServiceEntry::Unicast { address, port })
    }

    /// Publish a unicast DNS/SRP service at this node's mesh-local EID,
    /// replacing any current DNS/SRP entry.
    pub fn publish_dns_srp_service_unicast_mesh_local_eid(&mut self, port: u16) -> Vec<Action> {
        self.publish_dns_srp_service(DnsSrpServiceEntry::UnicastMeshLocalEid { port })
    }

    /// Replace the DNS/SRP entry and evaluate the new one from scratch.
    ///
    /// The previous entry, if added, is removed and reported REMOVED first.
    pub fn publish_dns_srp_service(&mut self, service: DnsSrpServiceEntry) -> Vec<Action> {
        if let Some(previous) = self.pool.take_dns_srp() {
            debug!(previous = %previous.record, "Replacing DNS/SRP service entry");
            self.retire(previous);
        }

        let record = NetworkDataRecord::DnsSrpService(service);
        self.pool.replace_dns_srp(Entry::new(record));

        info!(entry = %record, "Publishing DNS/SRP service entry");
        self.evaluate(EntryKey::DnsSrpService)
    }

    /// Stop publishing the DNS/SRP entry. No-op if there is none.
    pub fn unpublish_dns_srp_service(&mut self) -> Vec<Action> {
        let Some(entry) = self.pool.take_dns_srp() else {
            return vec![];
        };

        info!(entry = %entry.record, state = %entry.state, "Unpublishing DNS/SRP service entry");
        self.retire(entry);

        vec![Action::CancelTimer {
            id: TimerId::Evaluation(EntryKey::DnsSrpService),
        }]
    }

    /// Whether the DNS/SRP entry is currently in the Network Data.
    pub fn is_dns_srp_service_added(&self) -> bool {
        self.dns_srp_service_state()
            .is_some_and(EntryState::is_added)
    }

    pub fn dns_srp_service_state(&self) -> Option<EntryState> {
        self.pool
            .get(&EntryKey::DnsSrpService)
            .map(|entry| entry.state)
    }

    /// The DNS/SRP entry being published, if any.
    pub fn dns_srp_service(&self) -> Option<DnsSrpServiceEntry> {
        match self.pool.get(&EntryKey::DnsSrpService)?.record {
            NetworkDataRecord::DnsSrpService(service) => Some(service),
            _ => None,
        }
    }

    /// Deadline of an entry's armed evaluation timer.
    pub fn next_evaluation(&self, key: &EntryKey) -> Option<Duration> {
        self.pool.get(key).and_then(|entry| entry.next_evaluation)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Event handlers
    // ═══════════════════════════════════════════════════════════════════════════

    /// React to a Network Data change.
    ///
    /// With a zero reaction delay every entry is evaluated in-line.
    /// Otherwise each entry's evaluation is pulled forward to a random point
    /// within the reaction window, keeping any earlier deadline.
    pub fn on_network_data_changed(&mut self) -> Vec<Action> {
        let max_delay = self.config.max_change_reaction_delay;
        let mut actions = vec![];

        for key in self.pool.keys() {
            if max_delay.is_zero() {
                actions.extend(self.evaluate(key));
                continue;
            }

            let delay = jitter(&mut self.rng, Duration::ZERO, max_delay);
            let deadline = self.now + delay;
            let Some(entry) = self.pool.get_mut(&key) else {
                continue;
            };
            if entry.next_evaluation.is_some_and(|t| t <= deadline) {
                continue;
            }
            entry.next_evaluation = Some(deadline);
            actions.push(Action::SetTimer {
                id: TimerId::Evaluation(key),
                duration: delay,
            });
        }

        actions
    }

    /// Evaluate the entry whose timer fired.
    pub fn on_evaluation_timer(&mut self, key: EntryKey) -> Vec<Action> {
        let Some(entry) = self.pool.get_mut(&key) else {
            debug!(%key, "Evaluation timer for unpublished entry");
            return vec![];
        };
        entry.next_evaluation = None;
        self.evaluate(key)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Decision engine
    // ═══════════════════════════════════════════════════════════════════════════

    /// Run the transition rule for one entry and re-arm its timer.
    fn evaluate(&mut self, key: EntryKey) -> Vec<Action> {
        let Some(entry) = self.pool.get(&key) else {
            return vec![];
        };
        if entry.state.is_pending() {
            debug!(%key, state = %entry.state, "Evaluation coalesced with in-flight request");
            return vec![];
        }
        let record = entry.record;
        let mut state = entry.state;

        let snapshot = self.view.snapshot();
        let local_rloc16 = self.view.local_rloc16();
        if state.is_added()
            && !snapshot
                .owned_by(local_rloc16)
                .any(|entry| entry.record.key() == key)
        {
            self.mark_lost(&key);
            state = EntryState::Idle;
        }
        let desired = self.config.desired_count(&record);
        let evaluation = evaluator::evaluate(&snapshot, local_rloc16, &record, desired);

        debug!(
            %key,
            %state,
            rloc16 = %local_rloc16,
            observed = evaluation.observed_count,
            desired,
            in_keep_set = evaluation.in_keep_set,
            "Evaluating entry"
        );

        let succeeded = match state {
            EntryState::Idle if evaluation.observed_count < desired => self.add_entry(&key),
            EntryState::Added
                if evaluation.observed_count >= desired && !evaluation.in_keep_set =>
            {
                self.remove_entry(&key)
            }
            _ => true,
        };

        let delay = if succeeded {
            jitter(
                &mut self.rng,
                self.config.min_reevaluation_delay,
                self.config.max_reevaluation_delay,
            )
        } else {
            jitter(
                &mut self.rng,
                self.config.min_retry_delay,
                self.config.max_retry_delay,
            )
        };
        self.schedule_evaluation(key, delay)
    }

    /// Ask the view to add the entry. Returns false if the request failed.
    fn add_entry(&mut self, key: &EntryKey) -> bool {
        let Some(entry) = self.pool.get_mut(key) else {
            return true;
        };
        entry.state = EntryState::AddPending;

        match self.view.add_local_entry(&entry.record) {
            Ok(()) => {
                entry.state = EntryState::Added;
                info!(entry = %entry.record, "Entry added to network data");
                self.callbacks.notify(PublisherEvent::EntryAdded, &entry.record);
                true
            }
            Err(error) => {
                entry.state = EntryState::Idle;
                warn!(entry = %entry.record, %error, "Failed to add entry, retrying");
                false
            }
        }
    }

    /// Ask the view to remove the entry. Returns false if the request failed.
    fn remove_entry(&mut self, key: &EntryKey) -> bool {
        let Some(entry) = self.pool.get_mut(key) else {
            return true;
        };
        entry.state = EntryState::RemovePending;

        match self.view.remove_local_entry(key) {
            Ok(()) => {
                entry.state = EntryState::Idle;
                info!(entry = %entry.record, "Entry removed from network data (too many duplicates)");
                self.callbacks.notify(PublisherEvent::EntryRemoved, &entry.record);
                true
            }
            Err(error) => {
                entry.state = EntryState::Added;
                warn!(entry = %entry.record, %error, "Failed to remove entry, retrying");
                false
            }
        }
    }

    /// Return an added entry the Network Data no longer holds to `Idle`.
    fn mark_lost(&mut self, key: &EntryKey) {
        let Some(entry) = self.pool.get_mut(key) else {
            return;
        };
        entry.state = EntryState::Idle;
        warn!(entry = %entry.record, "Entry dropped from network data");
        self.callbacks.notify(PublisherEvent::EntryRemoved, &entry.record);
    }

    /// Drop an entry that is leaving the pool.
    ///
    /// An added entry is removed from the view and reported REMOVED; a
    /// failed removal is logged and otherwise ignored.
    fn retire(&mut self, entry: Entry) {
        if !entry.state.is_added() {
            return;
        }
        if let Err(error) = self.view.remove_local_entry(&entry.key()) {
            warn!(entry = %entry.record, %error, "Failed to remove unpublished entry");
        }
        info!(entry = %entry.record, "Entry removed from network data (unpublished)");
        self.callbacks
            .notify(PublisherEvent::EntryRemoved, &entry.record);
    }

    fn schedule_evaluation(&mut self, key: EntryKey, delay: Duration) -> Vec<Action> {
        let now = self.now;
        let Some(entry) = self.pool.get_mut(&key) else {
            return vec![];
        };
        entry.next_evaluation = Some(now + delay);
        vec![Action::SetTimer {
            id: TimerId::Evaluation(key),
            duration: delay,
        }]
    }
}

/// Uniformly random delay in `[min, max]` at millisecond granularity.
fn jitter(rng: &mut ChaCha8Rng, min: Duration, max: Duration) -> Duration {
    let low = min.min(max).as_millis() as u64;
    let high = min.max(max).as_millis() as u64;
    Duration::from_millis(rng.gen_range(low..=high))
}

impl<V: NetworkDataView> StateMachine for Publisher<V> {
    fn handle(&mut self, event: Event) -> Vec<Action> {
        match event {
            Event::NetworkDataChanged => self.on_network_data_changed(),
            Event::EvaluationTimer { key } => self.on_evaluation_timer(key),
        }
    }

    fn set_time(&mut self, now: Duration) {
        self.now = now;
    }

    fn now(&self) -> Duration {
        self.now
    }
}

impl<V> std::fmt::Debug for Publisher<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("pool", &self.pool)
            .field("callbacks", &self.callbacks)
            .field("now", &self.now)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netdata_test_helpers::{
        external_route, on_mesh_prefix, on_mesh_record, prefix, EventLog, MockNetworkData,
    };
    use tracing_test::traced_test;

    const SELF: Rloc16 = Rloc16(0x2000);

    fn make_publisher(config: PublisherConfig) -> Publisher<MockNetworkData> {
        Publisher::new(config, MockNetworkData::new(SELF))
    }

    /// Config that evaluates every entry in-line on a Network Data change.
    fn in_line(config: PublisherConfig) -> PublisherConfig {
        config.with_change_reaction_delay(Duration::ZERO)
    }

    fn with_prefix_log(publisher: &mut Publisher<MockNetworkData>) -> EventLog<(PublisherEvent, Ip6Prefix)> {
        let log = EventLog::new();
        publisher.set_prefix_callback(Some(log.prefix_callback()));
        log
    }

    fn timer_delay(actions: &[Action], key: EntryKey) -> Option<Duration> {
        actions.iter().find_map(|action| match action {
            Action::SetTimer { id, duration } if *id == TimerId::Evaluation(key) => {
                Some(*duration)
            }
            _ => None,
        })
    }

    #[traced_test]
    #[test]
    fn test_publish_adds_immediately_when_alone() {
        let mut publisher = make_publisher(PublisherConfig::default());
        let log = with_prefix_log(&mut publisher);
        let p = prefix("2001:db8:1::/64");

        let actions = publisher.publish_on_mesh_prefix(on_mesh_prefix("2001:db8:1::/64")).unwrap();

        assert!(publisher.is_prefix_added(&p));
        assert_eq!(log.events(), vec![(PublisherEvent::EntryAdded, p)]);
        assert_eq!(publisher.view().local_records(), &[on_mesh_record("2001:db8:1::/64")]);

        let delay = timer_delay(&actions, EntryKey::Prefix(p)).unwrap();
        let config = publisher.config();
        assert!(delay >= config.min_reevaluation_delay && delay <= config.max_reevaluation_delay);
        assert_eq!(publisher.next_evaluation(&EntryKey::Prefix(p)), Some(delay));
    }

    #[traced_test]
    #[test]
    fn test_publish_stays_idle_when_enough_others() {
        let mut publisher = make_publisher(PublisherConfig::default());
        let log = with_prefix_log(&mut publisher);
        let record = on_mesh_record("2001:db8:1::/64");
        publisher.view_mut().add_remote(Rloc16(0x0400), record);
        publisher.view_mut().add_remote(Rloc16(0x0800), record);

        publisher.publish_on_mesh_prefix(on_mesh_prefix("2001:db8:1::/64")).unwrap();

        let p = prefix("2001:db8:1::/64");
        assert_eq!(publisher.prefix_entry_state(&p), Some(EntryState::Idle));
        assert!(log.is_empty());
        assert_eq!(publisher.view().add_requests(), 0);
    }

    #[traced_test]
    #[test]
    fn test_duplicate_publish_returns_already() {
        let mut publisher = make_publisher(PublisherConfig::default());
        let p = prefix("2001:db8:1::/64");
        publisher.publish_on_mesh_prefix(on_mesh_prefix("2001:db8:1::/64")).unwrap();

        // Same prefix as an external route is still a duplicate.
        assert_eq!(
            publisher.publish_external_route(external_route("2001:db8:1::/64")),
            Err(PublisherError::Already)
        );
        assert_eq!(
            publisher.publish_on_mesh_prefix(on_mesh_prefix("2001:db8:1::/64")),
            Err(PublisherError::Already)
        );
        assert!(publisher.is_prefix_added(&p));
        assert_eq!(publisher.view().add_requests(), 1);
    }

    #[traced_test]
    #[test]
    fn test_capacity_exhaustion_and_reuse() {
        let mut publisher =
            make_publisher(PublisherConfig::default().with_max_prefix_entries(2));

        publisher.publish_on_mesh_prefix(on_mesh_prefix("fd00:1::/64")).unwrap();
        publisher.publish_external_route(external_route("fd00:2::/48")).unwrap();
        assert_eq!(
            publisher.publish_external_route(external_route("fd00:3::/48")),
            Err(PublisherError::NoBufs)
        );

        // The DNS/SRP slot is independent of prefix capacity.
        publisher.publish_dns_srp_service_anycast(1);
        assert!(publisher.is_dns_srp_service_added());

        publisher.unpublish_prefix(&prefix("fd00:1::/64")).unwrap();
        publisher.publish_external_route(external_route("fd00:3::/48")).unwrap();
        assert_eq!(publisher.prefix_entry_count(), 2);
    }

    #[traced_test]
    #[test]
    fn test_invalid_entries_rejected() {
        let mut publisher = Publisher::new(
            PublisherConfig::default(),
            MockNetworkData::new(SELF).with_mesh_local_prefix(prefix("fdde:ad00:beef::/64")),
        );

        let not_stable = OnMeshPrefixConfig::new(prefix("fd00:1::/64")).with_flags("pao").unwrap();
        assert_eq!(
            publisher.publish_on_mesh_prefix(not_stable),
            Err(PublisherError::InvalidArgs(ConfigError::NotStable))
        );
        assert_eq!(
            publisher.publish_on_mesh_prefix(on_mesh_prefix("fdde:ad00:beef::/64")),
            Err(PublisherError::InvalidArgs(ConfigError::MeshLocal))
        );
        assert_eq!(
            publisher.publish_external_route(external_route("fe80::/64")),
            Err(PublisherError::InvalidArgs(ConfigError::LinkLocal))
        );
        // A default route covers the mesh-local prefix but is not inside it.
        assert!(publisher.publish_external_route(external_route("::/0")).is_ok());
        assert_eq!(publisher.prefix_entry_count(), 1);
    }

    #[traced_test]
    #[test]
    fn test_removed_when_outranked_and_stays_removed() {
        let mut publisher =
            make_publisher(in_line(PublisherConfig::default().with_desired_prefixes(2)));
        let log = with_prefix_log(&mut publisher);
        let p = prefix("2001:db8:1::/64");
        let key = EntryKey::Prefix(p);

        publisher.publish_on_mesh_prefix(on_mesh_prefix("2001:db8:1::/64")).unwrap();
        assert!(publisher.is_prefix_added(&p));

        let record = on_mesh_record("2001:db8:1::/64");
        publisher.view_mut().add_remote(Rloc16(0x0400), record);
        publisher.view_mut().add_remote(Rloc16(0x0800), record);
        publisher.handle(Event::NetworkDataChanged);

        assert!(!publisher.is_prefix_added(&p));
        assert_eq!(
            log.events(),
            vec![(PublisherEvent::EntryAdded, p), (PublisherEvent::EntryRemoved, p)]
        );
        assert!(publisher.view().local_records().is_empty());

        // Unchanged snapshot: no oscillation.
        for _ in 0..5 {
            let actions = publisher.handle(Event::EvaluationTimer { key });
            assert!(timer_delay(&actions, key).is_some());
        }
        assert_eq!(publisher.prefix_entry_state(&p), Some(EntryState::Idle));
        assert_eq!(log.len(), 2);
    }

    #[traced_test]
    #[test]
    fn test_kept_when_in_keep_set() {
        let mut publisher = Publisher::new(
            in_line(PublisherConfig::default().with_desired_prefixes(2)),
            MockNetworkData::new(Rloc16(0x0400)),
        );
        let p = prefix("2001:db8:1::/64");
        publisher.publish_on_mesh_prefix(on_mesh_prefix("2001:db8:1::/64")).unwrap();

        let record = on_mesh_record("2001:db8:1::/64");
        publisher.view_mut().add_remote(Rloc16(0x0800), record);
        publisher.view_mut().add_remote(Rloc16(0x0c00), record);
        publisher.handle(Event::NetworkDataChanged);

        assert!(publisher.is_prefix_added(&p));
        assert_eq!(publisher.view().remove_requests(), 0);
    }

    #[traced_test]
    #[test]
    fn test_added_again_when_others_leave() {
        let mut publisher = make_publisher(in_line(PublisherConfig::default()));
        let record = on_mesh_record("2001:db8:1::/64");
        publisher.view_mut().add_remote(Rloc16(0x0400), record);
        publisher.view_mut().add_remote(Rloc16(0x0800), record);
        let p = prefix("2001:db8:1::/64");

        publisher.publish_on_mesh_prefix(on_mesh_prefix("2001:db8:1::/64")).unwrap();
        assert!(!publisher.is_prefix_added(&p));

        publisher.view_mut().remove_remote(Rloc16(0x0800));
        publisher.handle(Event::NetworkDataChanged);
        assert!(publisher.is_prefix_added(&p));
    }

    #[traced_test]
    #[test]
    fn test_unpublish_added_entry() {
        let mut publisher = make_publisher(PublisherConfig::default());
        let log = with_prefix_log(&mut publisher);
        let p = prefix("2001:db8:1::/64");
        publisher.publish_on_mesh_prefix(on_mesh_prefix("2001:db8:1::/64")).unwrap();

        let actions = publisher.unpublish_prefix(&p).unwrap();

        assert_eq!(
            actions,
            vec![Action::CancelTimer { id: TimerId::Evaluation(EntryKey::Prefix(p)) }]
        );
        assert!(!publisher.is_prefix_added(&p));
        assert_eq!(publisher.prefix_entry_state(&p), None);
        assert_eq!(log.events().last(), Some(&(PublisherEvent::EntryRemoved, p)));
        assert_eq!(log.len(), 2);

        // Late timer for the removed entry is ignored.
        assert!(publisher.handle(Event::EvaluationTimer { key: EntryKey::Prefix(p) }).is_empty());
    }

    #[traced_test]
    #[test]
    fn test_unpublish_unknown_prefix() {
        let mut publisher = make_publisher(PublisherConfig::default());
        let log = with_prefix_log(&mut publisher);

        assert_eq!(
            publisher.unpublish_prefix(&prefix("fd00:9::/64")),
            Err(PublisherError::NotFound)
        );
        assert!(log.is_empty());
    }

    #[traced_test]
    #[test]
    fn test_unpublish_idle_entry_fires_nothing() {
        let mut publisher = make_publisher(PublisherConfig::default());
        let log = with_prefix_log(&mut publisher);
        let record = on_mesh_record("2001:db8:1::/64");
        publisher.view_mut().add_remote(Rloc16(0x0400), record);
        publisher.view_mut().add_remote(Rloc16(0x0800), record);

        publisher.publish_on_mesh_prefix(on_mesh_prefix("2001:db8:1::/64")).unwrap();
        publisher.unpublish_prefix(&prefix("2001:db8:1::/64")).unwrap();

        assert!(log.is_empty());
        assert_eq!(publisher.view().remove_requests(), 0);
    }

    #[traced_test]
    #[test]
    fn test_unpublish_survives_remove_failure() {
        let mut publisher = make_publisher(PublisherConfig::default());
        let log = with_prefix_log(&mut publisher);
        let p = prefix("2001:db8:1::/64");
        publisher.publish_on_mesh_prefix(on_mesh_prefix("2001:db8:1::/64")).unwrap();

        publisher.view_mut().fail_next_removes(1);
        assert!(publisher.unpublish_prefix(&p).is_ok());

        assert_eq!(publisher.prefix_entry_state(&p), None);
        assert_eq!(log.events().last(), Some(&(PublisherEvent::EntryRemoved, p)));
    }

    #[traced_test]
    #[test]
    fn test_add_failure_retries_sooner() {
        let mut publisher = make_publisher(PublisherConfig::default());
        let log = with_prefix_log(&mut publisher);
        let p = prefix("2001:db8:1::/64");
        let key = EntryKey::Prefix(p);

        publisher.view_mut().fail_next_adds(1);
        let actions = publisher.publish_on_mesh_prefix(on_mesh_prefix("2001:db8:1::/64")).unwrap();

        assert_eq!(publisher.prefix_entry_state(&p), Some(EntryState::Idle));
        assert!(log.is_empty());
        let delay = timer_delay(&actions, key).unwrap();
        assert!(delay <= publisher.config().max_retry_delay);

        publisher.set_time(delay);
        publisher.handle(Event::EvaluationTimer { key });
        assert!(publisher.is_prefix_added(&p));
        assert_eq!(log.events(), vec![(PublisherEvent::EntryAdded, p)]);
    }

    #[traced_test]
    #[test]
    fn test_remove_failure_keeps_added_and_retries() {
        let mut publisher = make_publisher(in_line(PublisherConfig::default()));
        let p = prefix("2001:db8:1::/64");
        let key = EntryKey::Prefix(p);
        publisher.publish_on_mesh_prefix(on_mesh_prefix("2001:db8:1::/64")).unwrap();

        let record = on_mesh_record("2001:db8:1::/64");
        publisher.view_mut().add_remote(Rloc16(0x0400), record);
        publisher.view_mut().add_remote(Rloc16(0x0800), record);
        publisher.view_mut().fail_next_removes(1);

        let actions = publisher.handle(Event::NetworkDataChanged);
        assert!(publisher.is_prefix_added(&p));
        assert!(timer_delay(&actions, key).unwrap() <= publisher.config().max_retry_delay);

        publisher.handle(Event::EvaluationTimer { key });
        assert!(!publisher.is_prefix_added(&p));
    }

    #[traced_test]
    #[test]
    fn test_lost_entry_reported_and_added_again() {
        let mut publisher = make_publisher(PublisherConfig::default());
        let log = with_prefix_log(&mut publisher);
        let p = prefix("2001:db8:1::/64");
        let key = EntryKey::Prefix(p);
        publisher.publish_on_mesh_prefix(on_mesh_prefix("2001:db8:1::/64")).unwrap();

        // The view loses the entry behind the publisher's back and has no
        // room to take it again yet.
        publisher.view_mut().drop_local(&key);
        publisher.view_mut().fail_next_adds(1);
        let actions = publisher.handle(Event::EvaluationTimer { key });

        assert_eq!(publisher.prefix_entry_state(&p), Some(EntryState::Idle));
        assert_eq!(
            log.events(),
            vec![(PublisherEvent::EntryAdded, p), (PublisherEvent::EntryRemoved, p)]
        );
        assert!(timer_delay(&actions, key).unwrap() <= publisher.config().max_retry_delay);

        publisher.handle(Event::EvaluationTimer { key });
        assert!(publisher.is_prefix_added(&p));
        assert_eq!(log.len(), 3);
    }

    #[traced_test]
    #[test]
    fn test_dns_srp_replacement() {
        let mut publisher = make_publisher(PublisherConfig::default());
        let log = EventLog::new();
        publisher.set_dns_srp_service_callback(Some(log.dns_srp_callback()));

        publisher.publish_dns_srp_service_unicast("fd00::1234".parse().unwrap(), 1);
        assert!(publisher.is_dns_srp_service_added());

        publisher.publish_dns_srp_service_anycast(2);
        assert_eq!(
            log.events(),
            vec![
                PublisherEvent::EntryAdded,
                PublisherEvent::EntryRemoved,
                PublisherEvent::EntryAdded,
            ]
        );
        assert_eq!(
            publisher.dns_srp_service(),
            Some(DnsSrpServiceEntry::Anycast { sequence_number: 2 })
        );
        assert_eq!(publisher.view().local_records().len(), 1);
    }

    #[traced_test]
    #[test]
    fn test_dns_srp_replacement_of_idle_entry() {
        let mut publisher = make_publisher(PublisherConfig::default());
        let log = EventLog::new();
        publisher.set_dns_srp_service_callback(Some(log.dns_srp_callback()));
        publisher.view_mut().add_remote(
            Rloc16(0x0400),
            NetworkDataRecord::DnsSrpService(DnsSrpServiceEntry::UnicastMeshLocalEid { port: 53 }),
        );

        publisher.publish_dns_srp_service_unicast("fd00::1234".parse().unwrap(), 1);
        assert_eq!(publisher.dns_srp_service_state(), Some(EntryState::Idle));

        // Different category: nobody else publishes anycast seq 7.
        publisher.publish_dns_srp_service_anycast(7);
        assert_eq!(log.events(), vec![PublisherEvent::EntryAdded]);

        let actions = publisher.unpublish_dns_srp_service();
        assert_eq!(actions.len(), 1);
        assert_eq!(
            log.events(),
            vec![PublisherEvent::EntryAdded, PublisherEvent::EntryRemoved]
        );
        assert!(publisher.unpublish_dns_srp_service().is_empty());
    }

    #[traced_test]
    #[test]
    fn test_callback_replacement() {
        let mut publisher = make_publisher(PublisherConfig::default());
        let first = with_prefix_log(&mut publisher);
        let second = with_prefix_log(&mut publisher);

        publisher.publish_on_mesh_prefix(on_mesh_prefix("fd00:1::/64")).unwrap();
        assert!(first.is_empty());
        assert_eq!(second.len(), 1);

        publisher.set_prefix_callback(None);
        publisher.unpublish_prefix(&prefix("fd00:1::/64")).unwrap();
        assert_eq!(second.len(), 1);
    }

    #[traced_test]
    #[test]
    fn test_change_reaction_is_deferred_with_jitter() {
        let max = Duration::from_millis(500);
        let mut publisher =
            make_publisher(PublisherConfig::default().with_change_reaction_delay(max));
        let p = prefix("2001:db8:1::/64");
        let key = EntryKey::Prefix(p);
        publisher.publish_on_mesh_prefix(on_mesh_prefix("2001:db8:1::/64")).unwrap();

        let record = on_mesh_record("2001:db8:1::/64");
        publisher.view_mut().add_remote(Rloc16(0x0400), record);
        publisher.view_mut().add_remote(Rloc16(0x0800), record);

        let actions = publisher.handle(Event::NetworkDataChanged);
        let delay = timer_delay(&actions, key).unwrap();
        assert!(delay <= max);
        assert!(publisher.is_prefix_added(&p));

        publisher.set_time(delay);
        publisher.handle(Event::EvaluationTimer { key });
        assert!(!publisher.is_prefix_added(&p));
    }

    #[traced_test]
    #[test]
    fn test_default_config_defers_change_reaction() {
        let mut publisher = make_publisher(PublisherConfig::default());
        let p = prefix("2001:db8:1::/64");
        let key = EntryKey::Prefix(p);
        let record = on_mesh_record("2001:db8:1::/64");
        publisher.view_mut().add_remote(Rloc16(0x0400), record);
        publisher.view_mut().add_remote(Rloc16(0x0800), record);
        publisher.publish_on_mesh_prefix(on_mesh_prefix("2001:db8:1::/64")).unwrap();
        assert_eq!(publisher.prefix_entry_state(&p), Some(EntryState::Idle));

        // A contributor leaves: the add waits for the reaction timer.
        publisher.view_mut().remove_remote(Rloc16(0x0800));
        publisher.set_time(Duration::from_millis(10));
        publisher.handle(Event::NetworkDataChanged);
        assert_eq!(publisher.prefix_entry_state(&p), Some(EntryState::Idle));
        assert_eq!(publisher.view().add_requests(), 0);

        let deadline = publisher.next_evaluation(&key).unwrap();
        assert!(
            deadline
                <= Duration::from_millis(10) + publisher.config().max_change_reaction_delay
        );
        publisher.set_time(deadline);
        publisher.handle(Event::EvaluationTimer { key });
        assert!(publisher.is_prefix_added(&p));
    }

    #[traced_test]
    #[test]
    fn test_same_seed_same_schedule() {
        let run = || {
            let mut publisher = make_publisher(PublisherConfig::default().with_seed(7));
            publisher.publish_on_mesh_prefix(on_mesh_prefix("fd00:1::/64")).unwrap()
        };
        assert_eq!(run(), run());
    }

    #[traced_test]
    #[test]
    fn test_rloc16_change_is_picked_up() {
        let mut publisher = Publisher::new(
            in_line(PublisherConfig::default().with_desired_prefixes(1)),
            MockNetworkData::new(Rloc16(0x0400)),
        );
        let p = prefix("2001:db8:1::/64");
        publisher.publish_on_mesh_prefix(on_mesh_prefix("2001:db8:1::/64")).unwrap();
        publisher
            .view_mut()
            .add_remote(Rloc16(0x0800), on_mesh_record("2001:db8:1::/64"));
        publisher.handle(Event::NetworkDataChanged);
        assert!(publisher.is_prefix_added(&p));

        // Re-attached with a worse address: now outranked.
        publisher.view_mut().set_rloc16(Rloc16(0x0c00));
        publisher.handle(Event::NetworkDataChanged);
        assert!(!publisher.is_prefix_added(&p));
    }
}
