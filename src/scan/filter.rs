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

use crate::scan::batch::TupleView;
use crate::scan::expr::RuntimeFilterPtr;
use crate::scan::options::ScanOptions;

/// Per-filter effectiveness accounting, local to one scanner. Mutated only
/// by the assembler, one row group at a time.
#[derive(Clone, Debug)]
pub struct LocalFilterStats {
  /// Disabling is monotone: once false, stays false for the scanner's
  /// lifetime.
  pub enabled: bool,
  /// Rows actually evaluated against the filter.
  pub considered: u64,
  /// Rows the filter rejected.
  pub rejected: u64,
  /// Rows that arrived while the filter existed, enabled or not.
  pub total_possible: u64
}

impl Default for LocalFilterStats {
  fn default() -> Self {
    Self { enabled: true, considered: 0, rejected: 0, total_possible: 0 }
  }
}

/// Applies the scan's runtime filters to tuples, tracking per-filter
/// effectiveness and disabling filters that do not pull their weight.
pub struct FilterEvaluator {
  filters: Vec<RuntimeFilterPtr>,
  stats: Vec<LocalFilterStats>,
  min_reject_ratio: f64,
  /// `rows_per_filter_check - 1`; the cadence is a power of two so the
  /// boundary test is a single mask.
  check_mask: u64
}

impl FilterEvaluator {
  pub fn new(filters: Vec<RuntimeFilterPtr>, options: &ScanOptions) -> Self {
    assert!(options.rows_per_filter_check.is_power_of_two());
    // Filters that are already unrestricted never get registered.
    let filters: Vec<RuntimeFilterPtr> =
      filters.into_iter().filter(|f| !f.always_true()).collect();
    let stats = vec![LocalFilterStats::default(); filters.len()];
    Self {
      filters,
      stats,
      min_reject_ratio: options.filter_min_reject_ratio,
      check_mask: options.rows_per_filter_check - 1
    }
  }

  pub fn has_filters(&self) -> bool {
    !self.filters.is_empty()
  }

  pub fn stats(&self) -> &[LocalFilterStats] {
    &self.stats
  }

  /// Evaluates the filters without touching per-row statistics. Used for
  /// the row-group level check against the static partition-key tuple.
  pub fn eval_untracked(&self, tuple: &TupleView) -> bool {
    for (filter, stats) in self.filters.iter().zip(self.stats.iter()) {
      if stats.enabled && !filter.eval(tuple) {
        return false;
      }
    }
    true
  }

  /// Returns false when any enabled filter rejects the tuple. Every
  /// `rows_per_filter_check` rows each filter's reject ratio is examined;
  /// an ineffective or trivially-true filter is disabled for the remainder
  /// of this scanner's lifetime.
  pub fn eval(&mut self, tuple: &TupleView) -> bool {
    for (filter, stats) in self.filters.iter().zip(self.stats.iter_mut()) {
      if !stats.enabled {
        continue;
      }
      stats.total_possible += 1;
      if stats.total_possible & self.check_mask == 0 {
        let reject_ratio = stats.rejected as f64 / stats.considered as f64;
        if filter.always_true() || reject_ratio < self.min_reject_ratio {
          stats.enabled = false;
          continue;
        }
      }
      stats.considered += 1;
      if !filter.eval(tuple) {
        stats.rejected += 1;
        return false;
      }
    }
    true
  }
}
