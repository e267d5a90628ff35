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

//! Bounded-memory streaming estimation of distinct-element counts.
//!
//! The crate implements the CVM sketch, a stochastic streaming algorithm
//! that processes a stream of hashable items one at a time, keeps at most a
//! configured number of them, and reports an estimate of how many distinct
//! items have appeared. See [`cvm`] for the algorithm, accuracy guarantees,
//! and usage examples.

pub mod cvm;
pub mod error;
