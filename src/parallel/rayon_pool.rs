// rayon-based worker pool

use rayon::prelude::*;

use crate::error::TransportError;

pub struct RayonPool {
    pool: rayon::ThreadPool,
}

impl RayonPool {
    pub fn new(threads: usize) -> Result<Self, TransportError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("saafsn-worker-{i}"))
            .build()
            .map_err(|e| TransportError::InvalidInput(format!("cannot start worker pool: {e}")))?;
        Ok(RayonPool { pool })
    }

    pub fn size(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn try_for_each<T, E, F>(&self, items: &mut [T], f: F) -> Result<(), E>
    where
        T: Send,
        E: Send,
        F: Fn(usize, &mut T) -> Result<(), E> + Send + Sync,
    {
        self.pool
            .install(|| items.par_iter_mut().enumerate().try_for_each(|(i, item)| f(i, item)))
    }
}
