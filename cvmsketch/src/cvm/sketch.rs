// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! CVM sketch implementation.

use std::collections::HashSet;
use std::hash::BuildHasherDefault;
use std::hash::DefaultHasher;
use std::hash::Hash;

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::error::Error;

const MIN_THRESHOLD: usize = 2;
const ERROR_FACTOR: f64 = 12.0;
const STREAM_FACTOR: f64 = 8.0;

/// Hasher with fixed initial state. Buffer iteration order then depends only
/// on the history of insertions, which keeps thinning reproducible for a
/// given seed.
type FixedState = BuildHasherDefault<DefaultHasher>;

/// CVM sketch for streaming distinct-count estimation over generic item
/// types.
///
/// The sketch retains a bounded set of stream items and a retention
/// probability `p`; the distinct count is estimated as `retained / p`. The
/// buffer occupancy is strictly below the configured threshold whenever
/// [`CvmSketch::update`] returns.
///
/// All random decisions, admission coin flips and thinning coin flips alike,
/// are drawn sequentially from one private source owned by the sketch, so
/// two sketches with equal threshold and seed fed the same stream hold
/// identical state at every step.
///
/// See [`crate::cvm`] for an overview and the accuracy discussion.
#[derive(Debug, Clone)]
pub struct CvmSketch<T> {
    threshold: usize,
    seed: u64,
    probability: f64,
    buffer: HashSet<T, FixedState>,
    rng: StdRng,
    items_seen: u64,
    thinning_rounds: u64,
}

impl<T: Eq + Hash> CvmSketch<T> {
    /// Creates a new sketch with the given buffer threshold and seed.
    ///
    /// `threshold` is the buffer occupancy that triggers thinning and is
    /// fixed for the lifetime of the sketch. The seed initializes the
    /// private random source.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `threshold` is less than 2; smaller
    /// buffers cannot support the admission protocol.
    pub fn new(threshold: usize, seed: u64) -> Result<Self, Error> {
        if threshold < MIN_THRESHOLD {
            return Err(Error::invalid_argument(format!(
                "threshold must be at least {MIN_THRESHOLD}, got {threshold}"
            )));
        }
        Ok(Self {
            threshold,
            seed,
            probability: 1.0,
            buffer: HashSet::with_capacity_and_hasher(threshold, FixedState::default()),
            rng: StdRng::seed_from_u64(seed),
            items_seen: 0,
            thinning_rounds: 0,
        })
    }

    /// Creates a sketch whose threshold is derived from accuracy targets.
    ///
    /// Equivalent to [`CvmSketch::new`] with the threshold returned by
    /// [`CvmSketch::suggest_threshold`].
    ///
    /// # Errors
    ///
    /// Returns a configuration error if any accuracy parameter is outside
    /// its valid range.
    pub fn with_error_bounds(
        stream_size: u64,
        relative_error: f64,
        failure_probability: f64,
        seed: u64,
    ) -> Result<Self, Error> {
        let threshold = Self::suggest_threshold(stream_size, relative_error, failure_probability)?;
        Self::new(threshold, seed)
    }

    /// Returns the buffer threshold that keeps the estimate within
    /// `(1 ± relative_error)` of the true distinct count with probability at
    /// least `1 - failure_probability`, for a stream of `stream_size` items.
    ///
    /// This is `ceil((12 / ε²) · ln(8·m / δ))` from the reference paper.
    /// `stream_size` may be a loose upper bound; overestimating it only
    /// grows the threshold logarithmically.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `relative_error` or
    /// `failure_probability` is not in the open interval `(0, 1)`, or if
    /// `stream_size` is zero.
    pub fn suggest_threshold(
        stream_size: u64,
        relative_error: f64,
        failure_probability: f64,
    ) -> Result<usize, Error> {
        if !(relative_error > 0.0 && relative_error < 1.0) {
            return Err(Error::invalid_argument(format!(
                "relative_error must be in (0, 1), got {relative_error}"
            )));
        }
        if !(failure_probability > 0.0 && failure_probability < 1.0) {
            return Err(Error::invalid_argument(format!(
                "failure_probability must be in (0, 1), got {failure_probability}"
            )));
        }
        if stream_size == 0 {
            return Err(Error::invalid_argument(format!(
                "stream_size must be at least 1, got {stream_size}"
            )));
        }
        let threshold = (ERROR_FACTOR / relative_error.powi(2))
            * (STREAM_FACTOR * stream_size as f64 / failure_probability).ln();
        Ok(threshold.ceil() as usize)
    }

    /// Processes one stream item.
    ///
    /// A repeated occurrence of a retained item is first discarded and then
    /// re-admitted under the current retention probability, so duplicates
    /// never bias retention. When the buffer reaches the threshold, thinning
    /// rounds run until occupancy is strictly below it again.
    pub fn update(&mut self, item: T) {
        self.items_seen += 1;
        self.buffer.remove(&item);
        if self.rng.random::<f64>() < self.probability {
            self.buffer.insert(item);
        }
        while self.buffer.len() >= self.threshold {
            self.thin();
        }
    }

    /// Processes all items from an iterator, in order.
    pub fn extend<I>(&mut self, items: I)
    where
        I: IntoIterator<Item = T>,
    {
        for item in items {
            self.update(item);
        }
    }

    /// Returns the current distinct-count estimate.
    ///
    /// The estimate is `retained / p`, unbiased in expectation over the
    /// sketch's random choices. Calling this repeatedly without intervening
    /// updates always returns the same value.
    pub fn estimate(&self) -> f64 {
        self.buffer.len() as f64 / self.probability
    }

    /// Returns the estimate rounded to the nearest integer for reporting.
    pub fn estimate_rounded(&self) -> u64 {
        self.estimate().round() as u64
    }

    /// Returns the configured buffer threshold.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Returns the seed the random source was initialized with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Returns the current retention probability.
    ///
    /// Starts at exactly 1 and only ever decreases, by exact halving.
    pub fn retention_probability(&self) -> f64 {
        self.probability
    }

    /// Returns the number of items currently retained in the buffer.
    pub fn num_retained(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if no items are currently retained.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Returns the number of stream items processed so far.
    pub fn items_seen(&self) -> u64 {
        self.items_seen
    }

    /// Returns the number of thinning rounds performed so far.
    ///
    /// The retention probability equals `0.5` raised to this count.
    pub fn thinning_rounds(&self) -> u64 {
        self.thinning_rounds
    }

    /// Returns true once at least one thinning round has run.
    ///
    /// Until then the sketch has retained every distinct item seen and the
    /// estimate is exact.
    pub fn is_estimation_mode(&self) -> bool {
        self.probability < 1.0
    }

    /// Returns an iterator over the retained items.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.buffer.iter()
    }

    /// Keeps each retained item with probability one half, then halves the
    /// retention probability.
    ///
    /// A round removes half of the buffer in expectation, so the saturation
    /// loop in [`CvmSketch::update`] terminates with probability 1. There is
    /// no hard cap on rounds.
    fn thin(&mut self) {
        let rng = &mut self.rng;
        self.buffer.retain(|_| rng.random_bool(0.5));
        self.probability /= 2.0;
        self.thinning_rounds += 1;
        debug_assert!(self.probability > 0.0, "retention probability underflow");
    }
}
