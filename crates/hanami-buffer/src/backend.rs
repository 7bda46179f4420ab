//! Kernel launch backends.
//!
//! A launch runs one lane per output element. Each lane gets its own
//! element index and exclusive mutable access to its own output slot;
//! everything else it reads is shared, immutable data captured by the
//! kernel closure. Lanes never communicate within a launch, so the
//! sequential and parallel backends produce bit-identical results.

use std::ops::Range;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::structured::{ElementMut, StructuredArray};

/// Where kernel launches execute.
///
/// - `Sequential`: one lane after another on the calling thread.
///   The reference for correctness checks.
/// - `Parallel`: lanes distributed over the `rayon` thread pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputeBackend {
    Sequential,
    #[default]
    Parallel,
}

impl ComputeBackend {
    /// Returns the backend name (e.g., "sequential", "rayon").
    pub fn name(&self) -> &'static str {
        match self {
            ComputeBackend::Sequential => "sequential",
            ComputeBackend::Parallel => "rayon",
        }
    }

    /// Returns true if lanes may run concurrently.
    pub fn is_parallel(&self) -> bool {
        matches!(self, ComputeBackend::Parallel)
    }

    /// Launches `kernel` once per element of `lanes`.
    pub fn launch<T, F>(&self, lanes: &mut [T], kernel: F)
    where
        T: Send,
        F: Fn(usize, &mut T) + Sync + Send,
    {
        match self {
            ComputeBackend::Sequential => {
                for (i, lane) in lanes.iter_mut().enumerate() {
                    kernel(i, lane);
                }
            }
            ComputeBackend::Parallel => {
                lanes
                    .par_iter_mut()
                    .enumerate()
                    .for_each(|(i, lane)| kernel(i, lane));
            }
        }
    }

    /// Launches `kernel` once per record of `array` in `range`.
    ///
    /// The index handed to the kernel is the absolute record index.
    pub fn launch_records<F>(&self, array: &mut StructuredArray, range: Range<usize>, kernel: F)
    where
        F: Fn(usize, ElementMut<'_>) + Sync + Send,
    {
        let start = range.start;
        let stride = array.stride();
        let words = array.record_words_mut(range);

        match self {
            ComputeBackend::Sequential => {
                for (i, record) in words.chunks_exact_mut(stride).enumerate() {
                    kernel(start + i, ElementMut::new(record));
                }
            }
            ComputeBackend::Parallel => {
                words
                    .par_chunks_exact_mut(stride)
                    .enumerate()
                    .for_each(|(i, record)| kernel(start + i, ElementMut::new(record)));
            }
        }
    }

    /// Runs a read-only query kernel once per input and collects the results
    /// in input order.
    pub fn map<T, R, F>(&self, inputs: &[T], kernel: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        match self {
            ComputeBackend::Sequential => inputs.iter().map(kernel).collect(),
            ComputeBackend::Parallel => inputs.par_iter().map(kernel).collect(),
        }
    }
}
