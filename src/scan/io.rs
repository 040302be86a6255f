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

use std::cell::RefCell;
use std::cmp;

use crate::errors::Result;
use crate::util::memory::BytePtr;

/// One byte range of the scanned file.
#[derive(Clone, Debug, PartialEq)]
pub struct ScanRange {
  pub offset: u64,
  pub len: u64,
  /// Locality hint: the range is fully contained in a split expected to be
  /// local to this host.
  pub expected_local: bool
}

impl ScanRange {
  pub fn new(offset: u64, len: u64) -> Self {
    Self { offset, len, expected_local: false }
  }

  pub fn with_locality(offset: u64, len: u64, expected_local: bool) -> Self {
    Self { offset, len, expected_local }
  }

  pub fn end(&self) -> u64 {
    self.offset + self.len
  }

  pub fn contains(&self, pos: u64) -> bool {
    pos >= self.offset && pos < self.end()
  }
}

/// The block I/O collaborator. Serves byte ranges of one file and accepts
/// batches of ranges for scheduling. Assumed thread-safe and asynchronous
/// by the host; the scanner only blocks in `read`.
pub trait IoManager {
  fn file_length(&self) -> u64;

  /// Schedules `ranges` for reading. With `immediate` set the ranges are
  /// queued for eager readahead rather than on-demand fetching.
  fn add_ranges(&self, ranges: &[ScanRange], immediate: bool) -> Result<()>;

  /// Reads one range, blocking until its bytes are available.
  fn read(&self, range: &ScanRange) -> Result<BytePtr>;
}

/// An I/O manager over an in-memory file image. Used by tests and by hosts
/// that already hold the file in a buffer.
pub struct InMemoryIoManager {
  data: BytePtr,
  /// Ranges issued through `add_ranges`, in issue order.
  issued: RefCell<Vec<ScanRange>>
}

impl InMemoryIoManager {
  pub fn new(data: Vec<u8>) -> Self {
    Self { data: BytePtr::new(data), issued: RefCell::new(vec![]) }
  }

  pub fn num_issued_ranges(&self) -> usize {
    self.issued.borrow().len()
  }

  pub fn issued_ranges(&self) -> Vec<ScanRange> {
    self.issued.borrow().clone()
  }
}

impl IoManager for InMemoryIoManager {
  fn file_length(&self) -> u64 {
    self.data.len() as u64
  }

  fn add_ranges(&self, ranges: &[ScanRange], _immediate: bool) -> Result<()> {
    for range in ranges {
      if range.end() > self.file_length() {
        return Err(general_err!(
          "scan range [{}, {}) exceeds file length {}",
          range.offset, range.end(), self.file_length()));
      }
      self.issued.borrow_mut().push(range.clone());
    }
    Ok(())
  }

  fn read(&self, range: &ScanRange) -> Result<BytePtr> {
    let end = cmp::min(range.end(), self.file_length());
    if range.offset > end {
      return Err(general_err!(
        "scan range offset {} exceeds file length {}", range.offset, self.file_length()));
    }
    Ok(self.data.range(range.offset as usize, (end - range.offset) as usize))
  }
}
