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

use crate::basic::Type;
use crate::util::memory::BytePtr;

// ----------------------------------------------------------------------
// Types connect Parquet physical types with Rust-specific types

/// An INT96 value: two words of nanoseconds-within-day followed by one word
/// of julian day, as written by legacy timestamp writers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Int96 {
  value: [u32; 3]
}

impl Int96 {
  pub fn new(v: [u32; 3]) -> Self {
    Int96 { value: v }
  }

  pub fn data(&self) -> &[u32; 3] {
    &self.value
  }

  pub fn set_data(&mut self, v: [u32; 3]) {
    self.value = v;
  }

  pub fn nanos_of_day(&self) -> u64 {
    (self.value[0] as u64) | ((self.value[1] as u64) << 32)
  }

  pub fn julian_day(&self) -> u32 {
    self.value[2]
  }

  pub fn from_nanos_and_day(nanos: u64, day: u32) -> Self {
    Int96 { value: [nanos as u32, (nanos >> 32) as u32, day] }
  }
}

impl Default for Int96 {
  fn default() -> Self {
    Int96 { value: [0; 3] }
  }
}

/// A variable- or fixed-length byte sequence value, referencing a slice of
/// page or dictionary memory.
#[derive(Clone, Debug, Default)]
pub struct ByteArray {
  data: Option<BytePtr>
}

impl ByteArray {
  pub fn new() -> Self {
    ByteArray { data: None }
  }

  pub fn len(&self) -> usize {
    self.data.as_ref().map_or(0, |d| d.len())
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn data(&self) -> &[u8] {
    self.data.as_ref().map_or(&[], |d| d.as_ref())
  }

  pub fn set_data(&mut self, data: BytePtr) {
    self.data = Some(data);
  }

  /// The backing slice pointer, when set. Lets consumers share the
  /// underlying page memory instead of copying the bytes.
  pub fn ptr(&self) -> Option<&BytePtr> {
    self.data.as_ref()
  }
}

impl PartialEq for ByteArray {
  fn eq(&self, other: &ByteArray) -> bool {
    self.data() == other.data()
  }
}

impl From<Vec<u8>> for ByteArray {
  fn from(v: Vec<u8>) -> Self {
    ByteArray { data: Some(BytePtr::new(v)) }
  }
}

impl From<&str> for ByteArray {
  fn from(s: &str) -> Self {
    ByteArray { data: Some(BytePtr::new(s.as_bytes().to_vec())) }
  }
}

/// Connects a Parquet physical type to the Rust value type decoded from it.
pub trait DataType {
  type T: PartialEq + std::fmt::Debug + Default + Clone;

  fn get_physical_type() -> Type;

  /// The plain-encoded width in bytes; 0 for types whose width is not fixed
  /// at the type level (booleans, byte arrays, decimals).
  fn get_type_size() -> usize;
}

macro_rules! make_type {
  ($name:ident, $physical_ty:path, $native_ty:ty, $size:expr) => {
    pub struct $name {}

    impl DataType for $name {
      type T = $native_ty;

      fn get_physical_type() -> Type {
        $physical_ty
      }

      fn get_type_size() -> usize {
        $size
      }
    }
  };
}

make_type!(BoolType, Type::BOOLEAN, bool, 0);
make_type!(Int32Type, Type::INT32, i32, 4);
make_type!(Int64Type, Type::INT64, i64, 8);
make_type!(Int96Type, Type::INT96, Int96, 12);
make_type!(FloatType, Type::FLOAT, f32, 4);
make_type!(DoubleType, Type::DOUBLE, f64, 8);
make_type!(ByteArrayType, Type::BYTE_ARRAY, ByteArray, 0);
make_type!(FixedLenByteArrayType, Type::FIXED_LEN_BYTE_ARRAY, ByteArray, 0);
