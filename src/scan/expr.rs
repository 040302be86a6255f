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

//! Collaborator traits for the expression evaluator. The scanner never
//! interprets predicates itself; it hands tuples to these interfaces.

use std::rc::Rc;

use crate::scan::batch::TupleView;

/// Evaluates the scan's SQL conjuncts against one tuple.
pub trait ConjunctEvaluator {
  /// Returns true when the tuple survives all conjuncts.
  fn eval(&self, tuple: &TupleView) -> bool;

  /// Statistics-based row group pruning hint. `min`/`max` are synthetic
  /// tuples holding the row group's column statistics; slots without
  /// usable statistics are NULL. Returns false only when the conjuncts
  /// prove the row group empty. This is a hint and must never fail.
  fn eval_stats(&self, min: &TupleView, max: &TupleView) -> bool {
    let _ = (min, max);
    true
  }
}

pub type ConjunctEvaluatorPtr = Rc<dyn ConjunctEvaluator>;

/// One runtime filter (bloom, min/max, in-list) pushed into the scan.
pub trait RuntimeFilter {
  /// A filter that can no longer reject anything. Checked at the periodic
  /// effectiveness boundary to disable the filter cheaply.
  fn always_true(&self) -> bool;

  /// Returns false when the tuple is rejected by this filter.
  fn eval(&self, tuple: &TupleView) -> bool;
}

pub type RuntimeFilterPtr = Rc<dyn RuntimeFilter>;

// ----------------------------------------------------------------------
// Simple implementations

/// Accepts every tuple. Stands in for a filter whose remote build side
/// produced no restriction.
pub struct AlwaysTrueFilter;

impl RuntimeFilter for AlwaysTrueFilter {
  fn always_true(&self) -> bool {
    true
  }

  fn eval(&self, _tuple: &TupleView) -> bool {
    true
  }
}

/// Range filter over a BIGINT/INT slot. NULL values pass (a filter can
/// only reject values it has proven absent).
pub struct SlotRangeFilter {
  pub slot_idx: usize,
  pub min: i64,
  pub max: i64
}

impl RuntimeFilter for SlotRangeFilter {
  fn always_true(&self) -> bool {
    false
  }

  fn eval(&self, tuple: &TupleView) -> bool {
    if tuple.is_null(self.slot_idx) {
      return true;
    }
    let v = match tuple.desc.slot(self.slot_idx).slot_type {
      crate::scan::batch::SlotType::Int32 => tuple.get_i32(self.slot_idx) as i64,
      _ => tuple.get_i64(self.slot_idx)
    };
    v >= self.min && v <= self.max
  }
}

/// Conjunct evaluator that accepts everything. Used when the host pushes
/// no predicates.
pub struct NoConjuncts;

impl ConjunctEvaluator for NoConjuncts {
  fn eval(&self, _tuple: &TupleView) -> bool {
    true
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::scan::batch::{
    write_i64, ScratchBatch, SlotType, TupleDescriptor, TupleView
  };
  use crate::util::memory::MemTracker;

  #[test]
  fn test_slot_range_filter() {
    let desc = TupleDescriptor::new(vec![(SlotType::BigInt, vec![0])]);
    let mut scratch = ScratchBatch::new(desc.clone(), 2, MemTracker::new()).unwrap();
    scratch.reset(None);
    write_i64(scratch.tuple_mut(0), desc.slot(0).tuple_offset, 15);
    scratch.num_tuples = 1;

    let filter = SlotRangeFilter { slot_idx: 0, min: 10, max: 20 };
    assert!(filter.eval(&TupleView::of_scratch(&scratch, 0)));

    write_i64(scratch.tuple_mut(0), desc.slot(0).tuple_offset, 25);
    assert!(!filter.eval(&TupleView::of_scratch(&scratch, 0)));
  }

  #[test]
  fn test_null_passes_filter() {
    let desc = TupleDescriptor::new(vec![(SlotType::BigInt, vec![0])]);
    let mut scratch = ScratchBatch::new(desc.clone(), 1, MemTracker::new()).unwrap();
    scratch.reset(None);
    crate::scan::batch::set_null(scratch.tuple_mut(0), desc.slot(0).null_index);
    scratch.num_tuples = 1;

    let filter = SlotRangeFilter { slot_idx: 0, min: 0, max: 1 };
    assert!(filter.eval(&TupleView::of_scratch(&scratch, 0)));
  }
}
