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

//! Tuple layout and the scratch batch.
//!
//! A tuple is a fixed-size byte region: a leading null-indicator bit
//! region (one bit per slot) followed by the slots in declaration order.
//! Variable-length slots store an index into the owning batch's value heap
//! instead of raw bytes; collection slots store an index into the owning
//! batch's collection table. On drain, surviving tuples are copied into
//! the output batch and their heap references are rebased.

use std::rc::Rc;

use byteorder::{ByteOrder, LittleEndian};

use crate::data_type::Int96;
use crate::errors::Result;
use crate::util::bit_util::{ceil, get_array_bit, set_array_bit};
use crate::util::memory::{BytePtr, MemPool, MemTrackerPtr};

// ----------------------------------------------------------------------
// Tuple layout

/// Projected output type of one tuple slot.
#[derive(Clone, Debug)]
pub enum SlotType {
  Boolean,
  Int32,
  BigInt,
  Float,
  Double,
  /// INT96 timestamp: nanoseconds-of-day and julian day.
  Timestamp,
  /// Variable-length byte/character data.
  String,
  /// Bounded character data, truncated to the bound.
  Varchar(usize),
  /// Fixed-width character data, space-padded to the width. Stored inline.
  Char(usize),
  /// Fixed-length decimal, stored inline as written.
  Decimal { precision: i32, scale: i32, byte_width: usize },
  /// A nested collection value (array or map), with the layout of its
  /// item tuples.
  Collection(TupleDescPtr),
  /// The synthetic position of an item within its parent collection.
  Position
}

impl SlotType {
  /// Bytes this slot occupies inside the tuple.
  pub fn byte_size(&self) -> usize {
    match self {
      SlotType::Boolean => 1,
      SlotType::Int32 | SlotType::Float => 4,
      SlotType::BigInt | SlotType::Double | SlotType::Position => 8,
      SlotType::Timestamp => 12,
      // Heap index + length
      SlotType::String | SlotType::Varchar(_) => 8,
      SlotType::Char(len) => *len,
      SlotType::Decimal { byte_width, .. } => *byte_width,
      // Collection table index + item count
      SlotType::Collection(_) => 8
    }
  }

  pub fn is_var_len(&self) -> bool {
    matches!(self, SlotType::String | SlotType::Varchar(_))
  }

  pub fn is_collection(&self) -> bool {
    matches!(self, SlotType::Collection(_))
  }
}

/// One slot of the output tuple.
#[derive(Clone, Debug)]
pub struct SlotDescriptor {
  pub slot_type: SlotType,
  /// Logical column path this slot projects, empty for partition keys.
  pub path: Vec<usize>,
  /// Byte offset of the slot value inside the tuple.
  pub tuple_offset: usize,
  /// Bit index of the slot's null indicator.
  pub null_index: usize
}

/// Layout of one output tuple.
#[derive(Debug)]
pub struct TupleDescriptor {
  slots: Vec<SlotDescriptor>,
  null_bytes: usize,
  tuple_byte_size: usize
}

pub type TupleDescPtr = Rc<TupleDescriptor>;

impl TupleDescriptor {
  /// Lays out `slots` (type and path pairs): null bytes first, then the
  /// slots in declaration order.
  pub fn new(slots: Vec<(SlotType, Vec<usize>)>) -> TupleDescPtr {
    let null_bytes = ceil(slots.len() as i64, 8) as usize;
    let mut offset = null_bytes;
    let mut descriptors = Vec::with_capacity(slots.len());
    for (null_index, (slot_type, path)) in slots.into_iter().enumerate() {
      let size = slot_type.byte_size();
      descriptors.push(SlotDescriptor { slot_type, path, tuple_offset: offset, null_index });
      offset += size;
    }
    Rc::new(TupleDescriptor { slots: descriptors, null_bytes, tuple_byte_size: offset })
  }

  pub fn slots(&self) -> &[SlotDescriptor] {
    &self.slots
  }

  pub fn slot(&self, i: usize) -> &SlotDescriptor {
    &self.slots[i]
  }

  pub fn num_slots(&self) -> usize {
    self.slots.len()
  }

  pub fn tuple_byte_size(&self) -> usize {
    self.tuple_byte_size
  }

  pub fn null_bytes(&self) -> usize {
    self.null_bytes
  }
}

// ----------------------------------------------------------------------
// Raw tuple writes

pub fn set_null(tuple: &mut [u8], null_index: usize) {
  set_array_bit(tuple, null_index);
}

pub fn is_null(tuple: &[u8], null_index: usize) -> bool {
  get_array_bit(tuple, null_index)
}

pub fn write_bool(tuple: &mut [u8], offset: usize, v: bool) {
  tuple[offset] = v as u8;
}

pub fn write_i32(tuple: &mut [u8], offset: usize, v: i32) {
  LittleEndian::write_i32(&mut tuple[offset..offset + 4], v);
}

pub fn write_i64(tuple: &mut [u8], offset: usize, v: i64) {
  LittleEndian::write_i64(&mut tuple[offset..offset + 8], v);
}

pub fn write_f32(tuple: &mut [u8], offset: usize, v: f32) {
  LittleEndian::write_f32(&mut tuple[offset..offset + 4], v);
}

pub fn write_f64(tuple: &mut [u8], offset: usize, v: f64) {
  LittleEndian::write_f64(&mut tuple[offset..offset + 8], v);
}

pub fn write_int96(tuple: &mut [u8], offset: usize, v: Int96) {
  LittleEndian::write_u64(&mut tuple[offset..offset + 8], v.nanos_of_day());
  LittleEndian::write_u32(&mut tuple[offset + 8..offset + 12], v.julian_day());
}

pub fn write_heap_ref(tuple: &mut [u8], offset: usize, index: u32, len: u32) {
  LittleEndian::write_u32(&mut tuple[offset..offset + 4], index);
  LittleEndian::write_u32(&mut tuple[offset + 4..offset + 8], len);
}

pub fn read_bool(tuple: &[u8], offset: usize) -> bool {
  tuple[offset] != 0
}

pub fn read_i32(tuple: &[u8], offset: usize) -> i32 {
  LittleEndian::read_i32(&tuple[offset..offset + 4])
}

pub fn read_i64(tuple: &[u8], offset: usize) -> i64 {
  LittleEndian::read_i64(&tuple[offset..offset + 8])
}

pub fn read_f32(tuple: &[u8], offset: usize) -> f32 {
  LittleEndian::read_f32(&tuple[offset..offset + 4])
}

pub fn read_f64(tuple: &[u8], offset: usize) -> f64 {
  LittleEndian::read_f64(&tuple[offset..offset + 8])
}

pub fn read_int96(tuple: &[u8], offset: usize) -> Int96 {
  let nanos = LittleEndian::read_u64(&tuple[offset..offset + 8]);
  let day = LittleEndian::read_u32(&tuple[offset + 8..offset + 12]);
  Int96::from_nanos_and_day(nanos, day)
}

pub fn read_heap_ref(tuple: &[u8], offset: usize) -> (u32, u32) {
  (
    LittleEndian::read_u32(&tuple[offset..offset + 4]),
    LittleEndian::read_u32(&tuple[offset + 4..offset + 8])
  )
}

// ----------------------------------------------------------------------
// Materialization targets

/// One tuple's mutable memory plus the heaps its variable-length and
/// collection slots reference. Column readers materialize through this so
/// the same code fills top-level scratch tuples and nested item tuples.
pub struct TupleTarget<'a> {
  pub tuple: &'a mut [u8],
  pub var_values: &'a mut Vec<BytePtr>,
  pub collections: &'a mut Vec<CollectionValue>
}

// ----------------------------------------------------------------------
// Collection values

/// A materialized collection: a miniature tuple batch of item tuples plus
/// the heaps its var-len and nested collection slots reference.
#[derive(Debug, Default)]
pub struct CollectionValue {
  pub tuple_mem: Vec<u8>,
  pub num_tuples: usize,
  pub var_values: Vec<BytePtr>,
  pub collections: Vec<CollectionValue>
}

impl CollectionValue {
  pub fn tuple<'a>(&'a self, desc: &TupleDescriptor, i: usize) -> &'a [u8] {
    let size = desc.tuple_byte_size();
    &self.tuple_mem[i * size..(i + 1) * size]
  }
}

/// Incrementally assembles one `CollectionValue`. Item tuples are staged
/// one at a time; a staged tuple that fails its conjuncts is abandoned.
pub struct CollectionValueBuilder {
  desc: TupleDescPtr,
  /// Initial bytes for each staged item tuple (missing-field NULLs).
  template: Option<Rc<Vec<u8>>>,
  value: CollectionValue,
  /// Tuples staged but not yet committed (0 or 1).
  staged: usize
}

impl CollectionValueBuilder {
  pub fn new(desc: TupleDescPtr, template: Option<Rc<Vec<u8>>>) -> Self {
    Self { desc, template, value: CollectionValue::default(), staged: 0 }
  }

  pub fn desc(&self) -> &TupleDescPtr {
    &self.desc
  }

  pub fn num_tuples(&self) -> usize {
    self.value.num_tuples
  }

  /// Appends a template-initialized item tuple and returns a target for
  /// it.
  pub fn stage_tuple(&mut self) -> TupleTarget {
    debug_assert_eq!(self.staged, 0);
    let size = self.desc.tuple_byte_size();
    let start = self.value.num_tuples * size;
    match self.template {
      Some(ref t) => self.value.tuple_mem.extend_from_slice(t),
      None => self.value.tuple_mem.resize(start + size, 0)
    }
    self.staged = 1;
    TupleTarget {
      tuple: &mut self.value.tuple_mem[start..start + size],
      var_values: &mut self.value.var_values,
      collections: &mut self.value.collections
    }
  }

  /// Keeps the staged tuple.
  pub fn commit_tuple(&mut self) {
    debug_assert_eq!(self.staged, 1);
    self.value.num_tuples += 1;
    self.staged = 0;
  }

  /// Drops the staged tuple (e.g. conjuncts rejected it).
  pub fn abandon_tuple(&mut self) {
    debug_assert_eq!(self.staged, 1);
    let size = self.desc.tuple_byte_size();
    self.value.tuple_mem.truncate(self.value.num_tuples * size);
    self.staged = 0;
  }

  pub fn finish(self) -> CollectionValue {
    debug_assert_eq!(self.staged, 0);
    self.value
  }

  /// Read access to the staged or committed tuples, for conjunct
  /// evaluation before commit.
  pub fn staged_view(&self) -> TupleView {
    debug_assert_eq!(self.staged, 1);
    let size = self.desc.tuple_byte_size();
    let start = self.value.num_tuples * size;
    TupleView {
      desc: &self.desc,
      data: &self.value.tuple_mem[start..start + size],
      var_values: &self.value.var_values
    }
  }
}

// ----------------------------------------------------------------------
// Scratch batch

/// A fixed-capacity staging buffer between the column readers and the
/// output batch. Filled column-wise, then drained tuple-wise through the
/// filters and conjuncts.
pub struct ScratchBatch {
  desc: TupleDescPtr,
  capacity: usize,

  pub tuple_mem: Vec<u8>,
  /// Filling cursor: number of materialized tuples.
  pub num_tuples: usize,
  /// Draining cursor: next tuple to transfer.
  pub tuple_idx: usize,

  pub var_values: Vec<BytePtr>,
  pub collections: Vec<CollectionValue>,

  /// Holds page memory backing this batch's values until the batch drains.
  pool: MemPool,

  /// Bytes of `tuple_mem` accounted against the tracker.
  tracked_bytes: usize
}

impl ScratchBatch {
  pub fn new(desc: TupleDescPtr, capacity: usize, tracker: MemTrackerPtr) -> Result<Self> {
    let bytes = capacity * desc.tuple_byte_size();
    if !tracker.try_consume(bytes) {
      return Err(resource_err!("scratch batch of {} bytes", bytes));
    }
    Ok(ScratchBatch {
      desc,
      capacity,
      tuple_mem: vec![0; bytes],
      num_tuples: 0,
      tuple_idx: 0,
      var_values: vec![],
      collections: vec![],
      pool: MemPool::new(tracker),
      tracked_bytes: bytes
    })
  }

  pub fn desc(&self) -> &TupleDescPtr {
    &self.desc
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  pub fn tuple_byte_size(&self) -> usize {
    self.desc.tuple_byte_size()
  }

  pub fn at_end(&self) -> bool {
    self.tuple_idx >= self.num_tuples
  }

  pub fn mem_pool(&mut self) -> &mut MemPool {
    &mut self.pool
  }

  /// Starts a new fill cycle. Tuple memory is reinitialized from
  /// `template` (or zeroed) for all `capacity` tuples.
  pub fn reset(&mut self, template: Option<&[u8]>) {
    self.num_tuples = 0;
    self.tuple_idx = 0;
    self.var_values.clear();
    self.collections.clear();
    let size = self.desc.tuple_byte_size();
    match template {
      Some(t) => {
        debug_assert_eq!(t.len(), size);
        for i in 0..self.capacity {
          self.tuple_mem[i * size..(i + 1) * size].copy_from_slice(t);
        }
      }
      None => {
        for b in self.tuple_mem.iter_mut() {
          *b = 0;
        }
      }
    }
  }

  pub fn tuple(&self, i: usize) -> &[u8] {
    let size = self.desc.tuple_byte_size();
    &self.tuple_mem[i * size..(i + 1) * size]
  }

  pub fn tuple_mut(&mut self, i: usize) -> &mut [u8] {
    let size = self.desc.tuple_byte_size();
    &mut self.tuple_mem[i * size..(i + 1) * size]
  }

  pub fn add_var_value(&mut self, value: BytePtr) -> u32 {
    self.var_values.push(value);
    (self.var_values.len() - 1) as u32
  }

  pub fn add_collection(&mut self, value: CollectionValue) -> u32 {
    self.collections.push(value);
    (self.collections.len() - 1) as u32
  }

  /// A materialization target for tuple `i`.
  pub fn target_for(&mut self, i: usize) -> TupleTarget {
    let size = self.desc.tuple_byte_size();
    TupleTarget {
      tuple: &mut self.tuple_mem[i * size..(i + 1) * size],
      var_values: &mut self.var_values,
      collections: &mut self.collections
    }
  }
}

impl Drop for ScratchBatch {
  fn drop(&mut self) {
    self.pool.mem_tracker().release(self.tracked_bytes);
  }
}

// ----------------------------------------------------------------------
// Output batch

/// The downstream row batch the assembler commits surviving tuples into.
pub struct RowBatch {
  desc: TupleDescPtr,
  capacity: usize,
  pub tuple_mem: Vec<u8>,
  pub num_rows: usize,
  pub var_values: Vec<BytePtr>,
  pub collections: Vec<CollectionValue>,
  pool: MemPool,
  tracked_bytes: usize
}

impl RowBatch {
  pub fn new(desc: TupleDescPtr, capacity: usize, tracker: MemTrackerPtr) -> Self {
    let bytes = capacity * desc.tuple_byte_size();
    tracker.consume(bytes);
    RowBatch {
      desc: desc.clone(),
      capacity,
      tuple_mem: vec![0; bytes],
      num_rows: 0,
      var_values: vec![],
      collections: vec![],
      pool: MemPool::new(tracker),
      tracked_bytes: bytes
    }
  }

  pub fn desc(&self) -> &TupleDescPtr {
    &self.desc
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  pub fn is_full(&self) -> bool {
    self.num_rows >= self.capacity
  }

  pub fn mem_pool(&mut self) -> &mut MemPool {
    &mut self.pool
  }

  /// Copies scratch tuple `tuple_idx` into this batch, rebasing its heap
  /// references onto this batch's heaps.
  pub fn add_row_from(&mut self, scratch: &mut ScratchBatch, tuple_idx: usize) {
    debug_assert!(!self.is_full());
    let size = self.desc.tuple_byte_size();
    let row = self.num_rows;
    self.num_rows += 1;

    {
      let src = scratch.tuple(tuple_idx);
      let dst = &mut self.tuple_mem[row * size..(row + 1) * size];
      dst.copy_from_slice(src);
    }

    // Rebase heap references of surviving slots
    for slot in self.desc.slots() {
      let dst = &mut self.tuple_mem[row * size..(row + 1) * size];
      if is_null(dst, slot.null_index) {
        continue;
      }
      if slot.slot_type.is_var_len() {
        let (idx, len) = read_heap_ref(dst, slot.tuple_offset);
        let value = scratch.var_values[idx as usize].clone();
        self.var_values.push(value);
        let new_idx = (self.var_values.len() - 1) as u32;
        write_heap_ref(dst, slot.tuple_offset, new_idx, len);
      } else if slot.slot_type.is_collection() {
        let (idx, len) = read_heap_ref(dst, slot.tuple_offset);
        let value = std::mem::take(&mut scratch.collections[idx as usize]);
        self.collections.push(value);
        let new_idx = (self.collections.len() - 1) as u32;
        write_heap_ref(dst, slot.tuple_offset, new_idx, len);
      }
    }
  }

  pub fn row(&self, i: usize) -> &[u8] {
    let size = self.desc.tuple_byte_size();
    &self.tuple_mem[i * size..(i + 1) * size]
  }
}

impl Drop for RowBatch {
  fn drop(&mut self) {
    self.pool.mem_tracker().release(self.tracked_bytes);
  }
}

// ----------------------------------------------------------------------
// Typed tuple views

/// Read-only typed access to one tuple and the heaps it references. Used
/// by conjunct evaluation and tests.
pub struct TupleView<'a> {
  pub desc: &'a TupleDescriptor,
  pub data: &'a [u8],
  pub var_values: &'a [BytePtr]
}

impl<'a> TupleView<'a> {
  pub fn of_scratch(scratch: &'a ScratchBatch, tuple_idx: usize) -> Self {
    TupleView {
      desc: scratch.desc(),
      data: scratch.tuple(tuple_idx),
      var_values: &scratch.var_values
    }
  }

  pub fn of_row(batch: &'a RowBatch, row: usize) -> Self {
    TupleView { desc: batch.desc(), data: batch.row(row), var_values: &batch.var_values }
  }

  pub fn is_null(&self, slot_idx: usize) -> bool {
    is_null(self.data, self.desc.slot(slot_idx).null_index)
  }

  pub fn get_bool(&self, slot_idx: usize) -> bool {
    read_bool(self.data, self.desc.slot(slot_idx).tuple_offset)
  }

  pub fn get_i32(&self, slot_idx: usize) -> i32 {
    read_i32(self.data, self.desc.slot(slot_idx).tuple_offset)
  }

  pub fn get_i64(&self, slot_idx: usize) -> i64 {
    read_i64(self.data, self.desc.slot(slot_idx).tuple_offset)
  }

  pub fn get_f32(&self, slot_idx: usize) -> f32 {
    read_f32(self.data, self.desc.slot(slot_idx).tuple_offset)
  }

  pub fn get_f64(&self, slot_idx: usize) -> f64 {
    read_f64(self.data, self.desc.slot(slot_idx).tuple_offset)
  }

  pub fn get_int96(&self, slot_idx: usize) -> Int96 {
    read_int96(self.data, self.desc.slot(slot_idx).tuple_offset)
  }

  /// Bytes of a string, varchar, char or decimal slot.
  pub fn get_bytes(&self, slot_idx: usize) -> &'a [u8] {
    let slot = self.desc.slot(slot_idx);
    match slot.slot_type {
      SlotType::String | SlotType::Varchar(_) => {
        let (idx, len) = read_heap_ref(self.data, slot.tuple_offset);
        &self.var_values[idx as usize].as_ref()[..len as usize]
      }
      SlotType::Char(len) => &self.data[slot.tuple_offset..slot.tuple_offset + len],
      SlotType::Decimal { byte_width, .. } => {
        &self.data[slot.tuple_offset..slot.tuple_offset + byte_width]
      }
      ref other => panic!("get_bytes() on non-bytes slot {:?}", other)
    }
  }

  /// Collection-table index and item count of a collection slot.
  pub fn get_collection_ref(&self, slot_idx: usize) -> (u32, u32) {
    debug_assert!(self.desc.slot(slot_idx).slot_type.is_collection());
    read_heap_ref(self.data, self.desc.slot(slot_idx).tuple_offset)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::util::memory::MemTracker;

  fn flat_desc() -> TupleDescPtr {
    TupleDescriptor::new(vec![
      (SlotType::Int32, vec![0]),
      (SlotType::BigInt, vec![1]),
      (SlotType::String, vec![2]),
    ])
  }

  #[test]
  fn test_layout() {
    let desc = flat_desc();
    assert_eq!(desc.null_bytes(), 1);
    assert_eq!(desc.slot(0).tuple_offset, 1);
    assert_eq!(desc.slot(1).tuple_offset, 5);
    assert_eq!(desc.slot(2).tuple_offset, 13);
    assert_eq!(desc.tuple_byte_size(), 21);
  }

  #[test]
  fn test_scratch_fill_and_read() {
    let desc = flat_desc();
    let mut scratch = ScratchBatch::new(desc.clone(), 4, MemTracker::new()).unwrap();
    scratch.reset(None);

    {
      let heap_idx = scratch.add_var_value(BytePtr::new(b"abcdef".to_vec()));
      let tuple = scratch.tuple_mut(0);
      write_i32(tuple, desc.slot(0).tuple_offset, 42);
      write_i64(tuple, desc.slot(1).tuple_offset, -7);
      write_heap_ref(tuple, desc.slot(2).tuple_offset, heap_idx, 6);
    }
    {
      let tuple = scratch.tuple_mut(1);
      set_null(tuple, desc.slot(2).null_index);
    }
    scratch.num_tuples = 2;

    let view = TupleView::of_scratch(&scratch, 0);
    assert_eq!(view.get_i32(0), 42);
    assert_eq!(view.get_i64(1), -7);
    assert_eq!(view.get_bytes(2), b"abcdef");
    assert!(!view.is_null(2));

    let view = TupleView::of_scratch(&scratch, 1);
    assert!(view.is_null(2));
  }

  #[test]
  fn test_template_initialization() {
    let desc = flat_desc();
    let mut template = vec![0u8; desc.tuple_byte_size()];
    set_null(&mut template, desc.slot(1).null_index);
    write_i32(&mut template, desc.slot(0).tuple_offset, 99);

    let mut scratch = ScratchBatch::new(desc.clone(), 2, MemTracker::new()).unwrap();
    scratch.reset(Some(&template));
    let view = TupleView::of_scratch(&scratch, 1);
    assert_eq!(view.get_i32(0), 99);
    assert!(view.is_null(1));
  }

  #[test]
  fn test_row_batch_rebases_heap_refs() {
    let desc = flat_desc();
    let tracker = MemTracker::new();
    let mut scratch = ScratchBatch::new(desc.clone(), 2, tracker.clone()).unwrap();
    scratch.reset(None);

    // Fill the heap with a decoy first so indices shift on rebase
    let _ = scratch.add_var_value(BytePtr::new(b"decoy".to_vec()));
    let heap_idx = scratch.add_var_value(BytePtr::new(b"payload".to_vec()));
    {
      let tuple = scratch.tuple_mut(0);
      write_i32(tuple, desc.slot(0).tuple_offset, 1);
      write_heap_ref(tuple, desc.slot(2).tuple_offset, heap_idx, 7);
    }
    scratch.num_tuples = 1;

    let mut out = RowBatch::new(desc.clone(), 8, tracker);
    out.add_row_from(&mut scratch, 0);
    assert_eq!(out.num_rows, 1);
    let view = TupleView::of_row(&out, 0);
    assert_eq!(view.get_i32(0), 1);
    assert_eq!(view.get_bytes(2), b"payload");
  }

  #[test]
  fn test_collection_slot_roundtrip() {
    let item_desc = TupleDescriptor::new(vec![(SlotType::Int32, vec![])]);
    let desc =
      TupleDescriptor::new(vec![(SlotType::Collection(item_desc.clone()), vec![0])]);
    let mut scratch = ScratchBatch::new(desc.clone(), 1, MemTracker::new()).unwrap();
    scratch.reset(None);

    let mut coll = CollectionValue::default();
    coll.tuple_mem = vec![0; 2 * item_desc.tuple_byte_size()];
    coll.num_tuples = 2;
    write_i32(&mut coll.tuple_mem, item_desc.slot(0).tuple_offset, 5);
    let idx = scratch.add_collection(coll);
    write_heap_ref(scratch.tuple_mut(0), desc.slot(0).tuple_offset, idx, 2);
    scratch.num_tuples = 1;

    let view = TupleView::of_scratch(&scratch, 0);
    let (coll_idx, count) = view.get_collection_ref(0);
    assert_eq!(count, 2);
    let coll = &scratch.collections[coll_idx as usize];
    assert_eq!(coll.num_tuples, 2);
  }
}
