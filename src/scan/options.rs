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

use crate::schema::resolver::SchemaResolutionMode;

/// Scanner configuration. Builder-style setters; defaults match the
/// documented option defaults.
#[derive(Clone, Debug)]
pub struct ScanOptions {
  /// Upper bound for the speculative footer read.
  pub footer_size_bytes: u64,

  /// Ceiling for growing the page-header peek window.
  pub max_page_header_bytes: usize,

  /// A runtime filter rejecting less than this fraction of the rows it
  /// sees is disabled for the rest of the scanner's lifetime.
  pub filter_min_reject_ratio: f64,

  /// Cadence of the filter effectiveness check. Must be a power of two so
  /// the boundary test is a bit mask.
  pub rows_per_filter_check: u64,

  /// Convert TIMESTAMP values written as UTC by the legacy Hive writer to
  /// local time.
  pub convert_legacy_utc_timestamps: bool,

  /// Offset added when converting legacy UTC timestamps, in seconds.
  /// Supplied by the host; this crate carries no timezone database.
  pub local_utc_offset_seconds: i64,

  /// How top-level columns are matched against the file schema.
  pub schema_resolution_mode: SchemaResolutionMode,

  /// When false, tolerable data errors are logged and the affected row
  /// group is skipped instead of failing the scan.
  pub abort_on_error: bool,

  /// Number of tuples per scratch batch, and the level cache size.
  pub batch_size: usize
}

impl Default for ScanOptions {
  fn default() -> Self {
    Self {
      footer_size_bytes: 100 * 1024,
      max_page_header_bytes: 8 * 1024 * 1024,
      filter_min_reject_ratio: 0.1,
      rows_per_filter_check: 16384,
      convert_legacy_utc_timestamps: false,
      local_utc_offset_seconds: 0,
      schema_resolution_mode: SchemaResolutionMode::ByPosition,
      abort_on_error: true,
      batch_size: 1024
    }
  }
}

impl ScanOptions {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_footer_size_bytes(mut self, v: u64) -> Self {
    self.footer_size_bytes = v;
    self
  }

  pub fn with_max_page_header_bytes(mut self, v: usize) -> Self {
    self.max_page_header_bytes = v;
    self
  }

  pub fn with_filter_min_reject_ratio(mut self, v: f64) -> Self {
    self.filter_min_reject_ratio = v;
    self
  }

  pub fn with_rows_per_filter_check(mut self, v: u64) -> Self {
    assert!(v.is_power_of_two(), "rows_per_filter_check must be a power of two");
    self.rows_per_filter_check = v;
    self
  }

  pub fn with_convert_legacy_utc_timestamps(mut self, v: bool, utc_offset_seconds: i64) -> Self {
    self.convert_legacy_utc_timestamps = v;
    self.local_utc_offset_seconds = utc_offset_seconds;
    self
  }

  pub fn with_schema_resolution_mode(mut self, v: SchemaResolutionMode) -> Self {
    self.schema_resolution_mode = v;
    self
  }

  pub fn with_abort_on_error(mut self, v: bool) -> Self {
    self.abort_on_error = v;
    self
  }

  pub fn with_batch_size(mut self, v: usize) -> Self {
    assert!(v > 0);
    self.batch_size = v;
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let options = ScanOptions::default();
    assert_eq!(options.footer_size_bytes, 100 * 1024);
    assert_eq!(options.max_page_header_bytes, 8 * 1024 * 1024);
    assert!((options.filter_min_reject_ratio - 0.1).abs() < 1e-9);
    assert_eq!(options.rows_per_filter_check, 16384);
    assert!(!options.convert_legacy_utc_timestamps);
    assert!(options.abort_on_error);
  }

  #[test]
  #[should_panic]
  fn test_filter_check_cadence_must_be_power_of_two() {
    let _ = ScanOptions::default().with_rows_per_filter_check(1000);
  }
}
