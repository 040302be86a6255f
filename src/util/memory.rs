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

use std::cell::Cell;
use std::cmp;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::mem;
use std::rc::Rc;

use crate::errors::Result;

// ----------------------------------------------------------------------
// Buffer classes

/// A resize-able byte buffer class.
#[derive(Debug, PartialEq)]
pub struct ByteBuffer {
  data: Vec<u8>
}

impl ByteBuffer {
  pub fn new() -> Self {
    ByteBuffer { data: vec![] }
  }

  pub fn new_with_cap(init_cap: usize) -> Self {
    ByteBuffer { data: Vec::with_capacity(init_cap) }
  }

  pub fn data(&self) -> &[u8] {
    self.data.as_slice()
  }

  pub fn set_data(&mut self, new_data: Vec<u8>) {
    self.data = new_data;
  }

  pub fn extend_from_slice(&mut self, bytes: &[u8]) {
    self.data.extend_from_slice(bytes);
  }

  /// Hands the accumulated bytes off as an immutable, shareable pointer and
  /// leaves this buffer empty.
  pub fn consume(&mut self) -> BytePtr {
    let old_data = mem::replace(&mut self.data, vec![]);
    BytePtr::new(old_data)
  }

  pub fn size(&self) -> usize {
    self.data.len()
  }
}

impl Default for ByteBuffer {
  fn default() -> Self {
    Self::new()
  }
}

// ----------------------------------------------------------------------
// Immutable buffer (BytePtr) classes

/// A slice on a reference-counted, read-only byte array. Sub-slices can be
/// further created from this. The byte array is released when all slices
/// are dropped.
#[derive(Clone, Debug, PartialEq)]
pub struct BytePtr {
  data: Rc<Vec<u8>>,
  start: usize,
  len: usize
}

impl BytePtr {
  pub fn new(v: Vec<u8>) -> Self {
    let len = v.len();
    Self { data: Rc::new(v), start: 0, len }
  }

  pub fn start(&self) -> usize {
    self.start
  }

  pub fn len(&self) -> usize {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  pub fn all(&self) -> BytePtr {
    BytePtr { data: self.data.clone(), start: self.start, len: self.len }
  }

  pub fn start_from(&self, start: usize) -> BytePtr {
    assert!(start <= self.len);
    BytePtr { data: self.data.clone(), start: self.start + start, len: self.len - start }
  }

  pub fn range(&self, start: usize, len: usize) -> BytePtr {
    assert!(start + len <= self.len);
    BytePtr { data: self.data.clone(), start: self.start + start, len }
  }

  pub fn slice(&self) -> &[u8] {
    &self.data[self.start..self.start + self.len]
  }
}

impl AsRef<[u8]> for BytePtr {
  fn as_ref(&self) -> &[u8] {
    self.slice()
  }
}

impl Display for BytePtr {
  fn fmt(&self, f: &mut Formatter) -> FmtResult {
    write!(f, "{:?}", self.slice())
  }
}

// ----------------------------------------------------------------------
// Memory tracking classes

pub type MemTrackerPtr = Rc<MemTracker>;

/// Tracks bytes consumed by the scanner against an optional limit. All
/// pools of one scanner share a tracker; an allocation that would exceed
/// the limit is refused, which surfaces as a non-retryable error.
pub struct MemTracker {
  limit: Option<usize>,
  consumed: Cell<usize>,
  peak: Cell<usize>
}

impl MemTracker {
  pub fn new() -> MemTrackerPtr {
    Rc::new(MemTracker { limit: None, consumed: Cell::new(0), peak: Cell::new(0) })
  }

  pub fn with_limit(limit: usize) -> MemTrackerPtr {
    Rc::new(MemTracker { limit: Some(limit), consumed: Cell::new(0), peak: Cell::new(0) })
  }

  /// Tries to account for `bytes` more. Returns false when that would
  /// exceed the limit; the caller must not allocate in that case.
  pub fn try_consume(&self, bytes: usize) -> bool {
    if let Some(limit) = self.limit {
      if self.consumed.get() + bytes > limit {
        return false;
      }
    }
    self.consumed.set(self.consumed.get() + bytes);
    self.peak.set(cmp::max(self.peak.get(), self.consumed.get()));
    true
  }

  /// Accounts for `bytes` that already exist (e.g. adopted buffers),
  /// without consulting the limit.
  pub fn consume(&self, bytes: usize) {
    self.consumed.set(self.consumed.get() + bytes);
    self.peak.set(cmp::max(self.peak.get(), self.consumed.get()));
  }

  pub fn release(&self, bytes: usize) {
    assert!(bytes <= self.consumed.get());
    self.consumed.set(self.consumed.get() - bytes);
  }

  pub fn consumed(&self) -> usize {
    self.consumed.get()
  }

  pub fn peak(&self) -> usize {
    self.peak.get()
  }
}

// ----------------------------------------------------------------------
// Memory pool classes

/// A set of tracked byte buffers with transferable ownership. Buffers
/// allocated (or consumed) by one pool can be moved wholesale into another
/// pool; the accounting moves with them. This is how decompressed page
/// memory migrates into the scratch batch and on to the output batch.
pub struct MemPool {
  tracker: MemTrackerPtr,
  buffers: Vec<BytePtr>,
  total_bytes: usize
}

impl MemPool {
  pub fn new(tracker: MemTrackerPtr) -> Self {
    Self { tracker, buffers: vec![], total_bytes: 0 }
  }

  pub fn mem_tracker(&self) -> &MemTrackerPtr {
    &self.tracker
  }

  /// Allocates a zeroed buffer of `size` bytes under the tracker. Fails
  /// with a resource error when the tracker refuses.
  pub fn try_allocate(&mut self, size: usize) -> Result<BytePtr> {
    if !self.tracker.try_consume(size) {
      return Err(resource_err!(
        "failed to allocate {} bytes, {} already consumed", size, self.tracker.consumed()));
    }
    let ptr = BytePtr::new(vec![0; size]);
    self.total_bytes += size;
    self.buffers.push(ptr.clone());
    Ok(ptr)
  }

  /// Takes ownership of `data` and tracks its footprint. Unlike
  /// `try_allocate` this never fails: the bytes already exist.
  pub fn consume(&mut self, data: Vec<u8>) -> BytePtr {
    let size = data.len();
    self.tracker.consume(size);
    let ptr = BytePtr::new(data);
    self.total_bytes += size;
    self.buffers.push(ptr.clone());
    ptr
  }

  /// Moves all of `other`'s buffers (and their accounting) into this pool.
  pub fn acquire_data(&mut self, other: &mut MemPool) {
    self.total_bytes += other.total_bytes;
    if !Rc::ptr_eq(&self.tracker, &other.tracker) {
      self.tracker.consume(other.total_bytes);
      other.tracker.release(other.total_bytes);
    }
    other.total_bytes = 0;
    self.buffers.append(&mut other.buffers);
  }

  pub fn total_allocated(&self) -> usize {
    self.total_bytes
  }

  /// Drops all buffers and releases their accounting.
  pub fn free_all(&mut self) {
    self.buffers.clear();
    self.tracker.release(self.total_bytes);
    self.total_bytes = 0;
  }
}

impl Drop for MemPool {
  fn drop(&mut self) {
    self.free_all();
  }
}
