// Fork-join evaluation pool
//
// Runs one task per candidate against a shared read-only base and hands the
// results back in candidate order once every task has finished. Tasks never
// see each other's state; whatever a task builds (typically a private copy of
// the base) is owned by its result.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::ov_error::{Result, SimError};

pub struct CandidatePool {
    pool: ThreadPool,
}

impl CandidatePool {
    /// Dedicated pool with `threads` workers, 0 for the rayon default
    pub fn new(threads: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|idx| format!("candidate-{}", idx))
            .build()
            .map_err(|e| SimError::Config(format!("cannot start candidate pool: {}", e)))?;
        Ok(Self { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Evaluate `task(base, i)` for every `i in 0..tasks` and wait for all of them
    pub fn fork_join<T, R, F>(&self, base: &T, tasks: usize, task: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T, usize) -> R + Send + Sync,
    {
        self.pool.install(|| {
            (0..tasks)
                .into_par_iter()
                .map(|idx| task(base, idx))
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_results_come_back_in_task_order() {
        let pool = CandidatePool::new(4).unwrap();
        let base = vec![1u64, 2, 3];
        let results = pool.fork_join(&base, 21, |base, idx| {
            base.iter().sum::<u64>() * idx as u64
        });
        assert_eq!(results.len(), 21);
        for (idx, value) in results.iter().enumerate() {
            assert_eq!(*value, 6 * idx as u64);
        }
    }

    #[test]
    fn test_every_task_runs_exactly_once() {
        let pool = CandidatePool::new(3).unwrap();
        let runs = AtomicUsize::new(0);
        let results = pool.fork_join(&(), 50, |_, idx| {
            runs.fetch_add(1, Ordering::SeqCst);
            idx
        });
        assert_eq!(runs.load(Ordering::SeqCst), 50);
        assert_eq!(results, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_tasks_own_their_copies() {
        let pool = CandidatePool::new(2).unwrap();
        let base = vec![0u32; 4];
        let copies = pool.fork_join(&base, 4, |base, idx| {
            let mut copy = base.clone();
            copy[idx] = idx as u32 + 1;
            copy
        });
        assert_eq!(base, vec![0; 4]);
        assert_eq!(copies[2], vec![0, 0, 3, 0]);
    }

    #[test]
    fn test_zero_tasks() {
        let pool = CandidatePool::new(0).unwrap();
        assert!(pool.threads() >= 1);
        let results: Vec<usize> = pool.fork_join(&(), 0, |_, idx| idx);
        assert!(results.is_empty());
    }
}
