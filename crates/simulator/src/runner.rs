//! Scenario driver.

use netdata_simulation::{NodeIndex, SimulationRunner};
use netdata_types::{EntryKey, NetworkDataRecord};
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::info;

use crate::report::{EntryReport, Sample, SimulationReport};
use crate::{ScenarioConfig, SimulatorError};

/// A scheduled scenario step.
#[derive(Debug, Clone)]
enum Step {
    Publish {
        nodes: Vec<NodeIndex>,
        record: NetworkDataRecord,
    },
    Fail {
        node: NodeIndex,
    },
}

/// An entry whose contributors are sampled. Records a publisher would count
/// as duplicates of each other share one tracked entry.
#[derive(Debug, Clone)]
struct TrackedEntry {
    key: EntryKey,
    record: NetworkDataRecord,
    desired: usize,
    publishers: BTreeSet<NodeIndex>,
}

/// Runs one scenario to completion.
pub struct Simulator {
    scenario: ScenarioConfig,
    runner: SimulationRunner,
    steps: Vec<(Duration, Step)>,
    entries: Vec<TrackedEntry>,
}

impl Simulator {
    pub fn new(scenario: ScenarioConfig) -> Result<Self, SimulatorError> {
        scenario.validate()?;

        let config = scenario.to_simulation_config();
        let all_nodes: Vec<NodeIndex> = (0..scenario.nodes).collect();
        let mut steps = Vec::new();
        let mut entries: Vec<TrackedEntry> = Vec::new();

        for publish in &scenario.publish {
            let record = publish.entry.to_record()?;
            let nodes = publish.nodes.clone().unwrap_or_else(|| all_nodes.clone());

            match entries
                .iter_mut()
                .find(|entry| entry.record.is_equivalent(&record))
            {
                Some(entry) => entry.publishers.extend(nodes.iter().copied()),
                None => entries.push(TrackedEntry {
                    key: record.key(),
                    record,
                    desired: config.publisher.desired_count(&record),
                    publishers: nodes.iter().copied().collect(),
                }),
            }
            steps.push((publish.at, Step::Publish { nodes, record }));
        }
        for fail in &scenario.fail {
            steps.push((fail.at, Step::Fail { node: fail.node }));
        }
        steps.sort_by_key(|(at, _)| *at);

        Ok(Self {
            runner: SimulationRunner::new(config)?,
            scenario,
            steps,
            entries,
        })
    }

    /// Run the scenario, sampling contributor counts every
    /// `sample_interval`.
    pub fn run(mut self) -> Result<SimulationReport, SimulatorError> {
        let end = self.scenario.duration;
        let interval = self.scenario.sample_interval;
        let mut samples = Vec::new();
        let mut next_sample = Duration::ZERO;

        info!(
            nodes = self.scenario.nodes,
            seed = self.scenario.seed,
            duration = ?end,
            entries = self.entries.len(),
            "Starting scenario"
        );

        let steps = std::mem::take(&mut self.steps);
        for (at, step) in steps {
            if at > end {
                break;
            }
            while next_sample < at {
                samples.push(self.sample_at(next_sample));
                next_sample += interval;
            }
            self.runner.run_until(at);
            self.apply(step)?;
        }
        while next_sample <= end {
            samples.push(self.sample_at(next_sample));
            next_sample += interval;
        }
        self.runner.run_until(end);

        Ok(self.report(samples))
    }

    fn apply(&mut self, step: Step) -> Result<(), SimulatorError> {
        match step {
            Step::Publish { nodes, record } => {
                for node in nodes {
                    if self.runner.is_failed(node) {
                        continue;
                    }
                    match record {
                        NetworkDataRecord::OnMeshPrefix(config) => {
                            self.runner.publish_on_mesh_prefix(node, config)?
                        }
                        NetworkDataRecord::ExternalRoute(config) => {
                            self.runner.publish_external_route(node, config)?
                        }
                        NetworkDataRecord::DnsSrpService(service) => {
                            self.runner.publish_dns_srp_service(node, service)?
                        }
                    }
                }
                info!(entry = %record, time = ?self.runner.now(), "Published");
            }
            Step::Fail { node } => {
                self.runner.fail_node(node)?;
                for entry in &mut self.entries {
                    entry.publishers.remove(&node);
                }
            }
        }
        Ok(())
    }

    fn sample_at(&mut self, time: Duration) -> Sample {
        self.runner.run_until(time);
        Sample {
            time,
            contributors: self
                .entries
                .iter()
                .map(|entry| self.runner.equivalent_contributors(&entry.record).len())
                .collect(),
        }
    }

    fn report(&self, samples: Vec<Sample>) -> SimulationReport {
        let entries = self
            .entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let expected = entry.desired.min(entry.publishers.len());
                EntryReport {
                    key: entry.key,
                    record: entry.record,
                    expected,
                    final_contributors: self.runner.equivalent_contributors(&entry.record),
                    converged_at: SimulationReport::convergence_time(&samples, index, expected),
                }
            })
            .collect();

        SimulationReport {
            duration: self.scenario.duration,
            entries,
            samples,
            stats: self.runner.stats(),
        }
    }
}
