//! Workload generation: the local-in-time key generator and request mixer.
//!
//! A purely uniform key distribution would rarely re-read a recently written
//! key and so would never catch the replication window. Keys are therefore
//! drawn from a working set of "hot" clusters that decays over time, so reads
//! and writes to the same key co-occur within the window.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Probability of staying inside the current working set.
const ACTIVE_CLUSTER_PROBABILITY: f64 = 0.8;

/// A cluster untouched for this long falls out of the working set.
const CLUSTER_IDLE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Write,
    Read,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Write => "write",
            RequestKind::Read => "read",
        }
    }
}

/// A single generated request. `value` is empty for reads.
#[derive(Debug, Clone)]
pub struct Request {
    pub kind: RequestKind,
    pub key: String,
    pub value: String,
}

/// Key generator with local-in-time clustering.
pub struct LocalInTimeKeyGenerator {
    num_keys: usize,
    key_cluster_size: usize,
    rng: StdRng,
    /// Clusters currently considered hot.
    active_clusters: Vec<usize>,
    /// Last touch time per cluster, for eviction.
    cluster_last_touch: HashMap<usize, Instant>,
}

impl LocalInTimeKeyGenerator {
    pub fn new(num_keys: usize, key_cluster_size: usize) -> Self {
        Self::with_rng(num_keys, key_cluster_size, StdRng::from_entropy())
    }

    fn with_rng(num_keys: usize, key_cluster_size: usize, rng: StdRng) -> Self {
        Self {
            num_keys,
            key_cluster_size,
            rng,
            active_clusters: Vec::new(),
            cluster_last_touch: HashMap::new(),
        }
    }

    /// Emits the next key.
    ///
    /// With probability 0.8 the key comes from a hot cluster; otherwise a
    /// uniformly chosen cluster joins the working set. Clusters idle for more
    /// than 5 s are evicted afterwards.
    pub fn generate_key(&mut self) -> String {
        let num_clusters = (self.num_keys / self.key_cluster_size).max(1);

        let use_active = self.rng.gen_range(0.0..1.0) < ACTIVE_CLUSTER_PROBABILITY
            && !self.active_clusters.is_empty();

        let cluster_id = if use_active {
            let idx = self.rng.gen_range(0..self.active_clusters.len());
            self.active_clusters[idx]
        } else {
            let id = self.rng.gen_range(0..num_clusters);
            if !self.active_clusters.contains(&id) {
                self.active_clusters.push(id);
            }
            id
        };

        let offset = self.rng.gen_range(0..self.key_cluster_size);
        let key_id = cluster_id * self.key_cluster_size + offset;

        self.cluster_last_touch.insert(cluster_id, Instant::now());

        let now = Instant::now();
        let touches = &self.cluster_last_touch;
        self.active_clusters.retain(|cid| {
            touches
                .get(cid)
                .is_some_and(|touched| now.duration_since(*touched) < CLUSTER_IDLE_TIMEOUT)
        });

        format!("key_{}", key_id)
    }
}

/// Mixes writes and reads over the generated keys at the configured ratio.
pub struct RequestGenerator {
    key_gen: LocalInTimeKeyGenerator,
    write_ratio: f64,
    rng: StdRng,
    /// Makes every written value unique within the run.
    counter: i64,
}

impl RequestGenerator {
    pub fn new(key_gen: LocalInTimeKeyGenerator, write_ratio: f64) -> Self {
        Self {
            key_gen,
            write_ratio,
            rng: StdRng::from_entropy(),
            counter: 0,
        }
    }

    pub fn generate(&mut self) -> Request {
        let key = self.key_gen.generate_key();

        if self.rng.gen_range(0.0..1.0) < self.write_ratio {
            self.counter += 1;
            Request {
                kind: RequestKind::Write,
                key,
                value: format!("value_{}_{}", now_nanos(), self.counter),
            }
        } else {
            Request {
                kind: RequestKind::Read,
                key,
                value: String::new(),
            }
        }
    }
}

fn now_nanos() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_key_gen(num_keys: usize, cluster_size: usize, seed: u64) -> LocalInTimeKeyGenerator {
        LocalInTimeKeyGenerator::with_rng(num_keys, cluster_size, StdRng::seed_from_u64(seed))
    }

    #[test]
    fn test_keys_stay_in_range() {
        let mut key_gen = seeded_key_gen(1000, 10, 7);

        // Kazdy klucz musi miescic sie w [0, num_keys)
        for _ in 0..5000 {
            let key = key_gen.generate_key();
            let id: usize = key.strip_prefix("key_").unwrap().parse().unwrap();
            assert!(id < 1000, "key id {} out of range", id);
        }
    }

    #[test]
    fn test_working_set_stays_bounded() {
        let mut key_gen = seeded_key_gen(1000, 10, 42);

        for _ in 0..5000 {
            key_gen.generate_key();
        }

        // 100 klastrow razem; working set nie moze przekroczyc tej liczby
        assert!(key_gen.active_clusters.len() <= 100);
        assert!(!key_gen.active_clusters.is_empty());
    }

    #[test]
    fn test_hot_clusters_are_reused() {
        let mut key_gen = seeded_key_gen(10_000, 10, 1);

        let mut distinct_clusters = std::collections::HashSet::new();
        for _ in 0..1000 {
            let key = key_gen.generate_key();
            let id: usize = key.strip_prefix("key_").unwrap().parse().unwrap();
            distinct_clusters.insert(id / 10);
        }

        // Z 1000 klastrow do wyboru, lokalnosc czasowa powinna odwiedzic
        // tylko ulamek (ok. 20% prob startuje nowy klaster).
        assert!(
            distinct_clusters.len() < 500,
            "expected clustering, saw {} distinct clusters",
            distinct_clusters.len()
        );
    }

    #[test]
    fn test_mixer_respects_write_ratio() {
        let key_gen = seeded_key_gen(100, 10, 3);
        let mut req_gen = RequestGenerator {
            key_gen,
            write_ratio: 0.5,
            rng: StdRng::seed_from_u64(9),
            counter: 0,
        };

        let mut writes = 0;
        let total = 2000;
        for _ in 0..total {
            let req = req_gen.generate();
            if req.kind == RequestKind::Write {
                writes += 1;
                assert!(req.value.starts_with("value_"));
            } else {
                assert!(req.value.is_empty());
            }
        }

        // Przy 2000 probach 50% +- kilka punktow procentowych
        assert!((800..=1200).contains(&writes), "writes = {}", writes);
    }

    #[test]
    fn test_write_values_are_unique() {
        let key_gen = seeded_key_gen(100, 10, 5);
        let mut req_gen = RequestGenerator::new(key_gen, 1.0);

        let mut values = std::collections::HashSet::new();
        for _ in 0..500 {
            let req = req_gen.generate();
            assert!(values.insert(req.value), "duplicate value generated");
        }
    }
}
