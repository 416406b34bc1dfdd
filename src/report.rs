use std::fmt;

use crate::directory::Directory;
use crate::hasher::KeyHasher;

/// Lookup cost of every key of a run
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ProbeReport {
    /// Each key with its probe count, `None` if the key was not found
    pub probes: Vec<(String, Option<u32>)>,
}

impl ProbeReport {
    pub fn collect<H: KeyHasher, S: AsRef<str>>(directory: &Directory<H>, keys: &[S]) -> Self {
        let probes = keys
            .iter()
            .map(|key| {
                let key = key.as_ref();
                (key.to_string(), directory.count_probes(key))
            })
            .collect();
        Self { probes }
    }

    pub fn key_count(&self) -> usize {
        self.probes.len()
    }

    pub fn total(&self) -> u64 {
        self.probes
            .iter()
            .filter_map(|(_, probes)| *probes)
            .map(u64::from)
            .sum()
    }

    pub fn average(&self) -> f64 {
        if self.probes.is_empty() {
            return 0.0;
        }
        self.total() as f64 / self.key_count() as f64
    }

    pub fn missing(&self) -> impl Iterator<Item = &str> {
        self.probes
            .iter()
            .filter(|(_, probes)| probes.is_none())
            .map(|(key, _)| key.as_str())
    }

    /// One line per key
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.probes.iter().map(|(key, probes)| match probes {
            Some(probes) => format!("{} probes to find {}", probes, key),
            None => format!("{} not found", key),
        })
    }
}

impl fmt::Display for ProbeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Total number of probes to search for all {} keys:\t{}",
            self.key_count(),
            self.total()
        )?;
        write!(f, "Average number of probes per key:\t{}", self.average())
    }
}
