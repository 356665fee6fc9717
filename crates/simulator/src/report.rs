//! Convergence report.

use netdata_simulation::SimulationStats;
use netdata_types::{EntryKey, NetworkDataRecord, Rloc16};
use std::time::Duration;

/// Contributor counts at one instant, indexed like
/// [`SimulationReport::entries`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub time: Duration,
    pub contributors: Vec<usize>,
}

/// Outcome for one published entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryReport {
    pub key: EntryKey,
    pub record: NetworkDataRecord,

    /// Copies the network should end up holding: the desired count, capped
    /// by the number of live nodes publishing the entry.
    pub expected: usize,

    /// Nodes holding the entry in the leader's Network Data at the end.
    pub final_contributors: Vec<Rloc16>,

    /// Start of the final run of samples at the expected count, `None` if
    /// the last sample is off target.
    pub converged_at: Option<Duration>,
}

impl EntryReport {
    pub fn is_converged(&self) -> bool {
        self.converged_at.is_some()
    }
}

/// Result of a simulator run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationReport {
    pub duration: Duration,
    pub entries: Vec<EntryReport>,
    pub samples: Vec<Sample>,
    pub stats: SimulationStats,
}

impl SimulationReport {
    pub fn all_converged(&self) -> bool {
        self.entries.iter().all(EntryReport::is_converged)
    }

    /// Earliest sample time after which entry `index` stayed at `expected`.
    pub(crate) fn convergence_time(samples: &[Sample], index: usize, expected: usize) -> Option<Duration> {
        let last_off = samples
            .iter()
            .rposition(|sample| sample.contributors.get(index) != Some(&expected));
        match last_off {
            None => samples.first().map(|sample| sample.time),
            Some(i) => samples.get(i + 1).map(|sample| sample.time),
        }
    }

    /// Print the per-second summary and the final outcome to stdout.
    pub fn print(&self) {
        println!("\n=== Network Data Convergence ===");
        println!("Simulated: {:?}", self.duration);
        println!();

        print!("{:>8}", "time");
        for index in 0..self.entries.len() {
            print!(" {:>6}", format!("#{index}"));
        }
        println!();
        for sample in &self.samples {
            print!("{:>7.1}s", sample.time.as_secs_f64());
            for count in &sample.contributors {
                print!(" {:>6}", count);
            }
            println!();
        }

        println!();
        for (index, entry) in self.entries.iter().enumerate() {
            let holders: Vec<String> = entry
                .final_contributors
                .iter()
                .map(ToString::to_string)
                .collect();
            let status = match entry.converged_at {
                Some(at) => format!("converged at {:.1}s", at.as_secs_f64()),
                None => "NOT converged".to_string(),
            };
            println!(
                "#{index} {}: {}/{} copies [{}], {status}",
                entry.record,
                entry.final_contributors.len(),
                entry.expected,
                holders.join(", "),
            );
        }

        println!();
        println!("Events processed:   {}", self.stats.events_processed);
        println!("Timers fired:       {}", self.stats.timers_fired);
        println!("Registrations:      {}", self.stats.registrations);
        println!("Propagations:       {}", self.stats.propagations);
        println!("Leader rejections:  {}", self.stats.leader_rejections);
        println!("Refused adds:       {}", self.stats.refused_adds);
    }
}
