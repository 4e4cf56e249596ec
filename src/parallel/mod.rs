//! Shared-memory execution of the independent per-unknown solves.
//!
//! `WorkerPool` dispatches a fallible closure over a slice of per-unknown states. With the
//! `rayon` feature the slice is processed by a dedicated Rayon pool, otherwise sequentially.
//! Each closure invocation owns exactly one element, so the outcome does not depend on the
//! schedule.

use crate::error::TransportError;

#[cfg(feature = "rayon")]
pub mod rayon_pool;
#[cfg(feature = "rayon")]
pub use rayon_pool::RayonPool;

pub enum WorkerPool {
    #[cfg(feature = "rayon")]
    Rayon(RayonPool),
    Serial,
}

impl WorkerPool {
    /// Build a pool with `threads` workers, or one per core when `None`.
    ///
    /// A single worker always gives the serial pool.
    pub fn new(threads: Option<usize>) -> Result<Self, TransportError> {
        #[cfg(feature = "rayon")]
        {
            let n = threads.unwrap_or_else(num_cpus::get);
            if n > 1 {
                return Ok(WorkerPool::Rayon(RayonPool::new(n)?));
            }
        }
        #[cfg(not(feature = "rayon"))]
        let _ = threads;
        Ok(WorkerPool::Serial)
    }

    pub fn size(&self) -> usize {
        match self {
            #[cfg(feature = "rayon")]
            WorkerPool::Rayon(pool) => pool.size(),
            WorkerPool::Serial => 1,
        }
    }

    /// Run `f(i, &mut items[i])` for every element, stopping at the first error.
    pub fn try_for_each<T, E, F>(&self, items: &mut [T], f: F) -> Result<(), E>
    where
        T: Send,
        E: Send,
        F: Fn(usize, &mut T) -> Result<(), E> + Send + Sync,
    {
        match self {
            #[cfg(feature = "rayon")]
            WorkerPool::Rayon(pool) => pool.try_for_each(items, f),
            WorkerPool::Serial => items.iter_mut().enumerate().try_for_each(|(i, item)| f(i, item)),
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(feature = "rayon")]
            WorkerPool::Rayon(pool) => write!(f, "WorkerPool::Rayon({})", pool.size()),
            WorkerPool::Serial => write!(f, "WorkerPool::Serial"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pools_visit_every_item_once() {
        for threads in [Some(1), Some(3), None] {
            let pool = WorkerPool::new(threads).unwrap();
            let mut items = vec![0usize; 17];
            pool.try_for_each(&mut items, |i, x| {
                *x += i + 1;
                Ok::<(), ()>(())
            })
            .unwrap();
            assert_eq!(items, (1..=17).collect::<Vec<_>>(), "{pool:?}");
        }
    }

    #[test]
    fn first_error_is_returned() {
        let pool = WorkerPool::new(Some(2)).unwrap();
        let mut items = vec![(); 8];
        let res = pool.try_for_each(&mut items, |i, _| if i == 5 { Err(i) } else { Ok(()) });
        assert_eq!(res, Err(5));
    }
}
