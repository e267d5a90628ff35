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

/// Builds a stream of `num_distinct` string tokens, each occurring `repeats`
/// times, interleaved round-robin so repeats are spread across the stream.
pub fn token_stream(num_distinct: usize, repeats: usize) -> Vec<String> {
    let mut stream = Vec::with_capacity(num_distinct * repeats);
    for _ in 0..repeats {
        for token in 0..num_distinct {
            stream.push(format!("token{token}"));
        }
    }
    stream
}
