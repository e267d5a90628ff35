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

//! CVM sketch for estimating the number of distinct elements in a stream.
//!
//! # Overview
//!
//! This sketch is based on the paper ["Distinct Elements in Streams: An
//! Algorithm for the (Text) Book"](https://arxiv.org/abs/2301.10191) by
//! Sourav Chakraborty, N. V. Vinodchandran, and Kuldeep S. Meel, using the
//! repeated-halving variant analyzed in Donald Knuth's note "The CVM
//! Algorithm for Estimating Distinct Elements in Streams" (2023).
//!
//! The sketch keeps a bounded buffer of retained stream items together with
//! a retention probability `p` that starts at 1. Every incoming item is
//! first discarded from the buffer if already retained, then re-admitted
//! with probability `p`. Whenever the buffer reaches the configured
//! threshold, a thinning round keeps each retained item with probability one
//! half and then halves `p`; rounds repeat until occupancy drops below the
//! threshold again. At any point the number of distinct items seen so far is
//! estimated as `retained / p`.
//!
//! This implementation provides the following capabilities:
//! * Process a stream of any `Eq + Hash` item type, one element at a time.
//! * Return the distinct-count estimate at any point without mutating the
//!   sketch.
//! * Derive a buffer threshold from a target relative error and failure
//!   probability.
//! * Reproducible runs: every probabilistic decision is drawn from a private
//!   random source initialized from the configured seed.
//!
//! # Accuracy
//!
//! With `threshold = ceil((12 / ε²) · ln(8·m / δ))` for a stream of `m`
//! items, the final estimate is within a factor `(1 ± ε)` of the true
//! distinct count with probability at least `1 - δ`. The sketch does not
//! enforce this relationship; [`CvmSketch::suggest_threshold`] computes it
//! for callers that need the guarantee. A stream whose distinct count never
//! reaches the threshold is counted exactly.
//!
//! The buffer holds at most `threshold` items at any instant, so memory
//! stays bounded regardless of the stream's length or distinct count.
//!
//! # Examples
//!
//! ```
//! # use cvmsketch::cvm::CvmSketch;
//! let mut sketch = CvmSketch::new(100, 42).unwrap();
//! for word in ["to", "be", "or", "not", "to", "be"] {
//!     sketch.update(word);
//! }
//! assert_eq!(sketch.estimate(), 4.0);
//! ```
//!
//! Sizing the buffer from accuracy targets:
//!
//! ```
//! # use cvmsketch::cvm::CvmSketch;
//! let threshold = CvmSketch::<u64>::suggest_threshold(1_000_000, 0.1, 0.01).unwrap();
//! let mut sketch = CvmSketch::new(threshold, 7).unwrap();
//! sketch.extend(0..10_000u64);
//! assert!(sketch.estimate() > 0.0);
//! ```

mod sketch;

pub use self::sketch::CvmSketch;
