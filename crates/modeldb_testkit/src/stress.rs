//! Stress helpers for the entity identity cache.
//!
//! These drive many threads through one transaction's cache at once and
//! report how often construction actually ran.

use crate::fixtures::{create_person, ModelFactory, ModelHandle};
use modeldb_core::{CoreResult, Database, EntityId, LiveHandle};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total lookups performed.
    pub total_ops: usize,
    /// Lookups that returned a handle.
    pub successful_ops: usize,
    /// Lookups that failed.
    pub failed_ops: usize,
    /// Handles the factory built.
    pub instantiations: usize,
    /// Lookups whose handle differed from the first one seen for its entity.
    pub identity_violations: usize,
    /// Total duration.
    pub duration: Duration,
    /// Lookups per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    fn new(
        successful: usize,
        failed: usize,
        instantiations: usize,
        identity_violations: usize,
        duration: Duration,
    ) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            instantiations,
            identity_violations,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total lookups: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Instantiations: {}", self.instantiations);
        println!("Identity violations: {}", self.identity_violations);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} lookups/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Lookups performed by each thread.
    pub operations: usize,
    /// Number of concurrent threads.
    pub threads: usize,
    /// Number of distinct entities looked up.
    pub entity_count: usize,
    /// Time the factory spends building each handle.
    pub build_delay: Duration,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 1_000,
            threads: 4,
            entity_count: 16,
            build_delay: Duration::ZERO,
        }
    }
}

/// Creates `count` people in one committed transaction.
pub fn populate(db: &Database, count: usize) -> CoreResult<Vec<EntityId>> {
    let txn = db.begin();
    let ids = (0..count)
        .map(|i| create_person(&txn, &format!("person-{i}"), i as i64))
        .collect::<CoreResult<Vec<_>>>()?;
    txn.commit()?;
    Ok(ids)
}

/// Looks up entities from many threads through one transaction's cache.
///
/// All threads start together and walk the entities in different orders.
pub fn stress_concurrent_lookups(db: &Database, config: &StressConfig) -> StressTestResult {
    let ids = match populate(db, config.entity_count.max(1)) {
        Ok(ids) => ids,
        Err(_) => return StressTestResult::new(0, 1, 0, 0, Duration::ZERO),
    };
    let factory = Arc::new(ModelFactory::new().with_delay(config.build_delay));
    let txn = db.begin();
    let cache = match txn.entity_cache(Arc::clone(&factory)) {
        Ok(cache) => cache,
        Err(_) => return StressTestResult::new(0, 1, 0, 0, Duration::ZERO),
    };

    let successful = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let violations = AtomicUsize::new(0);
    let barrier = Barrier::new(config.threads);

    let start = Instant::now();
    // Each thread keeps the first handle it sees per entity alive, so the
    // cache never has to rebuild one mid-run.
    let held: Vec<HashMap<EntityId, Arc<ModelHandle>>> = thread::scope(|scope| {
        let workers: Vec<_> = (0..config.threads)
            .map(|t| {
                let (ids, cache, barrier) = (&ids, &cache, &barrier);
                let (successful, failed, violations) = (&successful, &failed, &violations);
                scope.spawn(move || {
                    let mut held: HashMap<EntityId, Arc<ModelHandle>> = HashMap::new();
                    barrier.wait();
                    for i in 0..config.operations {
                        let id = ids[(t * 7 + i) % ids.len()];
                        match cache.get(id) {
                            Ok(handle) => {
                                debug_assert_eq!(handle.entity_id(), id);
                                let first = held.entry(id).or_insert_with(|| Arc::clone(&handle));
                                if !Arc::ptr_eq(first, &handle) {
                                    violations.fetch_add(1, Ordering::Relaxed);
                                }
                                successful.fetch_add(1, Ordering::Relaxed);
                            }
                            Err(_) => {
                                failed.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    }
                    held
                })
            })
            .collect();
        workers
            .into_iter()
            .map(|worker| worker.join().expect("Thread panicked"))
            .collect()
    });
    let duration = start.elapsed();

    let mut first: HashMap<EntityId, &Arc<ModelHandle>> = HashMap::new();
    for (id, handle) in held.iter().flatten() {
        if !Arc::ptr_eq(first.entry(*id).or_insert(handle), handle) {
            violations.fetch_add(1, Ordering::Relaxed);
        }
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        factory.instantiated(),
        violations.load(Ordering::Relaxed),
        duration,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::TestDatabase;

    #[test]
    fn concurrent_lookups_build_each_entity_once() {
        let db = TestDatabase::memory();
        let config = StressConfig {
            operations: 200,
            threads: 4,
            entity_count: 8,
            build_delay: Duration::from_millis(1),
        };

        let result = stress_concurrent_lookups(&db, &config);
        assert_eq!(result.failed_ops, 0);
        assert_eq!(result.successful_ops, 800);
        assert_eq!(result.instantiations, 8);
        assert_eq!(result.identity_violations, 0);
    }

    #[test]
    fn single_thread_lookups_hit_the_cache() {
        let db = TestDatabase::memory();
        let config = StressConfig {
            operations: 100,
            threads: 1,
            entity_count: 4,
            ..Default::default()
        };

        let result = stress_concurrent_lookups(&db, &config);
        assert_eq!(result.instantiations, 4);
        assert_eq!(result.total_ops, 100);
    }
}
