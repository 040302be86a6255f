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

//! Drives a set of column readers over one row group:
//!
//! 1. Reset the scratch batch and initialize its tuples from the template.
//! 2. Populate the scratch tuples one column reader at a time using the
//!    batched read paths.
//! 3. Walk the scratch tuples through the runtime filters and conjuncts,
//!    committing survivors to the output sink. Scratch memory moves to the
//!    output batch when the scratch batch drains.
//! 4. Repeat until the row group ends, an error occurs, the scan is
//!    cancelled, or the row limit is reached.

use std::cell::Cell;
use std::cmp;
use std::rc::Rc;

use crate::column::reader::{acquire_decompressed_pools, ColumnReader};
use crate::errors::{ParquetError, Result};
use crate::scan::batch::{RowBatch, ScratchBatch, TupleDescPtr, TupleView};
use crate::scan::expr::ConjunctEvaluatorPtr;
use crate::scan::filter::FilterEvaluator;
use crate::util::memory::MemTrackerPtr;

/// Accumulates committed rows into fixed-capacity output batches.
pub struct OutputSink {
  desc: TupleDescPtr,
  capacity: usize,
  tracker: MemTrackerPtr,
  current: RowBatch,
  completed: Vec<RowBatch>,
  rows_committed: u64,
  limit: Option<u64>
}

impl OutputSink {
  pub fn new(
    desc: TupleDescPtr, capacity: usize, tracker: MemTrackerPtr, limit: Option<u64>
  ) -> Self {
    let current = RowBatch::new(desc.clone(), capacity, tracker.clone());
    Self {
      desc,
      capacity,
      tracker,
      current,
      completed: vec![],
      rows_committed: 0,
      limit
    }
  }

  pub fn rows_committed(&self) -> u64 {
    self.rows_committed
  }

  pub fn reached_limit(&self) -> bool {
    matches!(self.limit, Some(limit) if self.rows_committed >= limit)
  }

  fn remaining_until_limit(&self) -> u64 {
    match self.limit {
      Some(limit) => limit.saturating_sub(self.rows_committed),
      None => u64::MAX
    }
  }

  fn roll_batch_if_full(&mut self) {
    if self.current.is_full() {
      let full = std::mem::replace(
        &mut self.current,
        RowBatch::new(self.desc.clone(), self.capacity, self.tracker.clone()));
      self.completed.push(full);
    }
  }

  fn add_surviving(&mut self, scratch: &mut ScratchBatch, tuple_idx: usize) {
    self.roll_batch_if_full();
    self.current.add_row_from(scratch, tuple_idx);
    self.rows_committed += 1;
  }

  /// Commits `n` empty tuples; used for zero-byte (count-only) tuple
  /// layouts where there is nothing to filter.
  pub fn commit_empty_rows(&mut self, n: u64) {
    let n = cmp::min(n, self.remaining_until_limit());
    for _ in 0..n {
      self.roll_batch_if_full();
      self.current.num_rows += 1;
      self.rows_committed += 1;
    }
  }

  /// Finishes the sink, returning all produced batches in order.
  pub fn finish(mut self) -> Vec<RowBatch> {
    if self.current.num_rows > 0 {
      self.completed.push(self.current);
    }
    self.completed
  }
}

/// Assembles one row group. Returns the number of top-level tuples read
/// (before filtering); surviving tuples land in `output`.
pub fn assemble_row_group(
  readers: &mut [ColumnReader],
  scratch: &mut ScratchBatch,
  template: Option<&[u8]>,
  filters: &mut FilterEvaluator,
  conjuncts: Option<&ConjunctEvaluatorPtr>,
  output: &mut OutputSink,
  cancelled: &Rc<Cell<bool>>
) -> Result<u64> {
  debug_assert!(!readers.is_empty());

  let mut rows_read: u64 = 0;
  while !readers[0].row_group_at_end() {
    if cancelled.get() {
      return Err(ParquetError::Cancelled);
    }
    if output.reached_limit() {
      break;
    }

    // Start a new scratch batch
    scratch.reset(template);
    let capacity = scratch.capacity();

    // Materialize the top-level slots column by column
    let mut last_num_tuples: Option<usize> = None;
    for reader in readers.iter_mut() {
      let num_tuples = if reader.max_rep_level() > 0 {
        reader.read_value_batch(scratch, capacity)?
      } else {
        reader.read_non_repeated_value_batch(scratch, capacity)?
      };
      // All column readers must advance in lockstep
      if let Some(previous) = last_num_tuples {
        if previous != num_tuples {
          return Err(general_err!(
            "columns returned different tuple counts: {} vs {}", previous, num_tuples));
        }
      }
      last_num_tuples = Some(num_tuples);
    }
    scratch.num_tuples = last_num_tuples.unwrap_or(0);

    // The pages backing this batch are complete; pass their memory along.
    acquire_decompressed_pools(readers, scratch.mem_pool())?;

    transfer_scratch_tuples(scratch, filters, conjuncts, output);
    rows_read += scratch.num_tuples as u64;
  }
  Ok(rows_read)
}

/// Drains the scratch batch through the filters and conjuncts into the
/// output sink.
fn transfer_scratch_tuples(
  scratch: &mut ScratchBatch,
  filters: &mut FilterEvaluator,
  conjuncts: Option<&ConjunctEvaluatorPtr>,
  output: &mut OutputSink
) {
  if scratch.tuple_byte_size() == 0 {
    // Count-only tuples carry no slots: no filters or conjuncts can apply
    // and there is no memory to transfer.
    output.commit_empty_rows((scratch.num_tuples - scratch.tuple_idx) as u64);
    scratch.tuple_idx = scratch.num_tuples;
    return;
  }

  while !scratch.at_end() {
    if output.reached_limit() {
      scratch.tuple_idx = scratch.num_tuples;
      break;
    }
    let tuple_idx = scratch.tuple_idx;
    scratch.tuple_idx += 1;

    let survives = {
      let view = TupleView::of_scratch(scratch, tuple_idx);
      filters.eval(&view) && conjuncts.map_or(true, |c| c.eval(&view))
    };
    if survives {
      output.add_surviving(scratch, tuple_idx);
    }
  }

  if scratch.at_end() {
    // Hand the batch's backing memory to the output side.
    let tracker = scratch.mem_pool().mem_tracker().clone();
    let mut pool =
      std::mem::replace(scratch.mem_pool(), crate::util::memory::MemPool::new(tracker));
    output.current.mem_pool().acquire_data(&mut pool);
  }
}
