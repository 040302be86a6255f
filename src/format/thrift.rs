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

//! Thrift compact protocol primitives, sufficient for the Parquet footer
//! and page headers. The input side reads from a byte slice; truncated
//! input surfaces as an `Eof` error so callers can grow their peek window
//! and retry.

use crate::errors::{ParquetError, Result};

/// Compact protocol field types.
pub const TYPE_STOP: u8 = 0;
pub const TYPE_BOOL_TRUE: u8 = 1;
pub const TYPE_BOOL_FALSE: u8 = 2;
pub const TYPE_BYTE: u8 = 3;
pub const TYPE_I16: u8 = 4;
pub const TYPE_I32: u8 = 5;
pub const TYPE_I64: u8 = 6;
pub const TYPE_DOUBLE: u8 = 7;
pub const TYPE_BINARY: u8 = 8;
pub const TYPE_LIST: u8 = 9;
pub const TYPE_SET: u8 = 10;
pub const TYPE_MAP: u8 = 11;
pub const TYPE_STRUCT: u8 = 12;

/// Recursive structures in valid metadata are shallow; anything deeper is
/// treated as corrupt rather than risking unbounded recursion.
const MAX_SKIP_DEPTH: i32 = 64;

/// Identifies one field of a struct during decoding.
pub struct FieldIdent {
  pub field_type: u8,
  pub id: i16,
  /// Booleans carry their value in the field type.
  pub bool_val: Option<bool>
}

/// Identifies a list header during decoding.
pub struct ListIdent {
  pub element_type: u8,
  pub size: i32
}

/// A compact-protocol reader over a byte slice.
pub struct CompactSliceReader<'a> {
  buf: &'a [u8],
  pos: usize
}

impl<'a> CompactSliceReader<'a> {
  pub fn new(buf: &'a [u8]) -> Self {
    Self { buf, pos: 0 }
  }

  /// Bytes consumed so far.
  pub fn bytes_read(&self) -> usize {
    self.pos
  }

  #[inline]
  pub fn read_byte(&mut self) -> Result<u8> {
    if self.pos >= self.buf.len() {
      return Err(eof_err!("thrift input exhausted at byte {}", self.pos));
    }
    let b = self.buf[self.pos];
    self.pos += 1;
    Ok(b)
  }

  #[inline]
  pub fn read_vlq(&mut self) -> Result<u64> {
    let mut result: u64 = 0;
    let mut shift = 0;
    loop {
      let byte = self.read_byte()?;
      result |= ((byte & 0x7F) as u64).wrapping_shl(shift);
      if byte & 0x80 == 0 {
        return Ok(result);
      }
      shift += 7;
      if shift > 63 {
        return Err(general_err!("thrift varint too long"));
      }
    }
  }

  #[inline]
  pub fn read_zig_zag(&mut self) -> Result<i64> {
    let val = self.read_vlq()?;
    Ok((val >> 1) as i64 ^ -((val & 1) as i64))
  }

  pub fn read_i16(&mut self) -> Result<i16> {
    Ok(self.read_zig_zag()? as i16)
  }

  pub fn read_i32(&mut self) -> Result<i32> {
    Ok(self.read_zig_zag()? as i32)
  }

  pub fn read_i64(&mut self) -> Result<i64> {
    self.read_zig_zag()
  }

  pub fn read_bytes(&mut self) -> Result<&'a [u8]> {
    let len = self.read_vlq()? as usize;
    if self.pos + len > self.buf.len() {
      return Err(eof_err!("thrift binary of {} bytes exceeds input", len));
    }
    let result = &self.buf[self.pos..self.pos + len];
    self.pos += len;
    Ok(result)
  }

  pub fn read_string(&mut self) -> Result<String> {
    let bytes = self.read_bytes()?;
    String::from_utf8(bytes.to_vec())
      .map_err(|_| general_err!("thrift string is not valid UTF-8"))
  }

  /// Reads the header of the next struct field. `last_field_id` is the id
  /// of the previous field in the same struct (0 at struct start).
  pub fn read_field_begin(&mut self, last_field_id: i16) -> Result<FieldIdent> {
    let header = self.read_byte()?;
    let field_delta = (header & 0xF0) >> 4;
    let field_type = header & 0x0F;
    if field_type == TYPE_STOP {
      return Ok(FieldIdent { field_type: TYPE_STOP, id: 0, bool_val: None });
    }
    let bool_val = match field_type {
      TYPE_BOOL_TRUE => Some(true),
      TYPE_BOOL_FALSE => Some(false),
      _ => None
    };
    let id = if field_delta != 0 {
      last_field_id
        .checked_add(field_delta as i16)
        .ok_or_else(|| general_err!("thrift field id overflow"))?
    } else {
      self.read_i16()?
    };
    Ok(FieldIdent { field_type, id, bool_val })
  }

  pub fn read_list_begin(&mut self) -> Result<ListIdent> {
    let header = self.read_byte()?;
    // Some writers emit a bare zero byte for an empty list.
    if header == 0 {
      return Ok(ListIdent { element_type: TYPE_BYTE, size: 0 });
    }
    let element_type = header & 0x0F;
    let short_size = (header & 0xF0) >> 4;
    let size = if short_size != 15 { short_size as i32 } else { self.read_vlq()? as i32 };
    if size < 0 {
      return Err(general_err!("negative thrift list size {}", size));
    }
    Ok(ListIdent { element_type, size })
  }

  /// Skips over a field of the given type.
  pub fn skip(&mut self, field_type: u8) -> Result<()> {
    self.skip_till_depth(field_type, MAX_SKIP_DEPTH)
  }

  fn skip_till_depth(&mut self, field_type: u8, depth: i32) -> Result<()> {
    if depth == 0 {
      return Err(general_err!("thrift skip depth exceeded"));
    }
    match field_type {
      TYPE_BOOL_TRUE | TYPE_BOOL_FALSE => Ok(()),
      TYPE_BYTE => self.read_byte().map(|_| ()),
      TYPE_I16 | TYPE_I32 | TYPE_I64 => self.read_zig_zag().map(|_| ()),
      TYPE_DOUBLE => {
        if self.pos + 8 > self.buf.len() {
          return Err(eof_err!("thrift double exceeds input"));
        }
        self.pos += 8;
        Ok(())
      }
      TYPE_BINARY => self.read_bytes().map(|_| ()),
      TYPE_STRUCT => {
        let mut last_field_id = 0i16;
        loop {
          let field = self.read_field_begin(last_field_id)?;
          if field.field_type == TYPE_STOP {
            return Ok(());
          }
          self.skip_till_depth(field.field_type, depth - 1)?;
          last_field_id = field.id;
        }
      }
      TYPE_LIST | TYPE_SET => {
        let list = self.read_list_begin()?;
        for _ in 0..list.size {
          self.skip_till_depth(list.element_type, depth - 1)?;
        }
        Ok(())
      }
      other => Err(general_err!("cannot skip thrift field type {}", other))
    }
  }
}

// ----------------------------------------------------------------------
// Output protocol

/// A compact-protocol writer, used by the in-crate test tooling to build
/// footers and page headers byte-exactly.
pub struct CompactWriter {
  buf: Vec<u8>,
  last_field_id: i16,
  field_id_stack: Vec<i16>
}

impl CompactWriter {
  pub fn new() -> Self {
    Self { buf: vec![], last_field_id: 0, field_id_stack: vec![] }
  }

  pub fn into_bytes(self) -> Vec<u8> {
    assert!(self.field_id_stack.is_empty(), "unbalanced struct begin/end");
    self.buf
  }

  fn write_vlq(&mut self, mut v: u64) {
    loop {
      let byte = (v & 0x7F) as u8;
      v >>= 7;
      if v == 0 {
        self.buf.push(byte);
        return;
      }
      self.buf.push(byte | 0x80);
    }
  }

  fn write_zig_zag(&mut self, v: i64) {
    self.write_vlq(((v << 1) ^ (v >> 63)) as u64);
  }

  /// Starts a nested struct field context.
  pub fn struct_begin(&mut self) {
    self.field_id_stack.push(self.last_field_id);
    self.last_field_id = 0;
  }

  pub fn struct_end(&mut self) {
    self.buf.push(TYPE_STOP);
    self.last_field_id = self.field_id_stack.pop().expect("unbalanced struct begin/end");
  }

  pub fn field_begin(&mut self, field_type: u8, id: i16) {
    let delta = id - self.last_field_id;
    if delta > 0 && delta <= 15 {
      self.buf.push(((delta as u8) << 4) | field_type);
    } else {
      self.buf.push(field_type);
      self.write_zig_zag(id as i64);
    }
    self.last_field_id = id;
  }

  pub fn write_bool_field(&mut self, id: i16, value: bool) {
    let field_type = if value { TYPE_BOOL_TRUE } else { TYPE_BOOL_FALSE };
    self.field_begin(field_type, id);
  }

  pub fn write_i32_field(&mut self, id: i16, value: i32) {
    self.field_begin(TYPE_I32, id);
    self.write_zig_zag(value as i64);
  }

  pub fn write_i64_field(&mut self, id: i16, value: i64) {
    self.field_begin(TYPE_I64, id);
    self.write_zig_zag(value);
  }

  pub fn write_binary_field(&mut self, id: i16, value: &[u8]) {
    self.field_begin(TYPE_BINARY, id);
    self.write_vlq(value.len() as u64);
    self.buf.extend_from_slice(value);
  }

  pub fn write_string_field(&mut self, id: i16, value: &str) {
    self.write_binary_field(id, value.as_bytes());
  }

  pub fn list_field_begin(&mut self, id: i16, element_type: u8, size: usize) {
    self.field_begin(TYPE_LIST, id);
    self.list_begin(element_type, size);
  }

  pub fn list_begin(&mut self, element_type: u8, size: usize) {
    if size < 15 {
      self.buf.push(((size as u8) << 4) | element_type);
    } else {
      self.buf.push(0xF0 | element_type);
      self.write_vlq(size as u64);
    }
  }

  pub fn write_list_i32(&mut self, value: i32) {
    self.write_zig_zag(value as i64);
  }

  pub fn write_list_binary(&mut self, value: &[u8]) {
    self.write_vlq(value.len() as u64);
    self.buf.extend_from_slice(value);
  }
}

impl Default for CompactWriter {
  fn default() -> Self {
    Self::new()
  }
}

pub fn type_name(field_type: u8) -> &'static str {
  match field_type {
    TYPE_STOP => "stop",
    TYPE_BOOL_TRUE | TYPE_BOOL_FALSE => "bool",
    TYPE_BYTE => "byte",
    TYPE_I16 => "i16",
    TYPE_I32 => "i32",
    TYPE_I64 => "i64",
    TYPE_DOUBLE => "double",
    TYPE_BINARY => "binary",
    TYPE_LIST => "list",
    TYPE_SET => "set",
    TYPE_MAP => "map",
    TYPE_STRUCT => "struct",
    _ => "unknown"
  }
}

pub fn unexpected_type(context: &str, field_type: u8) -> ParquetError {
  general_err!("unexpected thrift type {} for {}", type_name(field_type), context)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_varint_roundtrip() {
    let mut w = CompactWriter::new();
    w.write_vlq(0);
    w.write_vlq(127);
    w.write_vlq(128);
    w.write_vlq(300);
    let bytes = w.into_bytes();
    assert_eq!(bytes, vec![0, 127, 0x80, 0x01, 0xAC, 0x02]);

    let mut r = CompactSliceReader::new(&bytes);
    assert_eq!(r.read_vlq().unwrap(), 0);
    assert_eq!(r.read_vlq().unwrap(), 127);
    assert_eq!(r.read_vlq().unwrap(), 128);
    assert_eq!(r.read_vlq().unwrap(), 300);
  }

  #[test]
  fn test_zig_zag_roundtrip() {
    let values = vec![0i64, -1, 1, -64, 64, i32::MAX as i64, i32::MIN as i64];
    let mut w = CompactWriter::new();
    for v in &values {
      w.write_zig_zag(*v);
    }
    let bytes = w.into_bytes();
    let mut r = CompactSliceReader::new(&bytes);
    for v in &values {
      assert_eq!(r.read_zig_zag().unwrap(), *v);
    }
  }

  #[test]
  fn test_struct_fields_roundtrip() {
    let mut w = CompactWriter::new();
    w.struct_begin();
    w.write_i32_field(1, 42);
    w.write_i64_field(3, -7);
    w.write_string_field(4, "name");
    w.write_bool_field(6, true);
    w.struct_end();
    let bytes = w.into_bytes();

    let mut r = CompactSliceReader::new(&bytes);
    let mut last_id = 0i16;
    let f = r.read_field_begin(last_id).unwrap();
    assert_eq!((f.field_type, f.id), (TYPE_I32, 1));
    assert_eq!(r.read_i32().unwrap(), 42);
    last_id = f.id;
    let f = r.read_field_begin(last_id).unwrap();
    assert_eq!((f.field_type, f.id), (TYPE_I64, 3));
    assert_eq!(r.read_i64().unwrap(), -7);
    last_id = f.id;
    let f = r.read_field_begin(last_id).unwrap();
    assert_eq!((f.field_type, f.id), (TYPE_BINARY, 4));
    assert_eq!(r.read_string().unwrap(), "name");
    last_id = f.id;
    let f = r.read_field_begin(last_id).unwrap();
    assert_eq!((f.field_type, f.id), (TYPE_BOOL_TRUE, 6));
    assert_eq!(f.bool_val, Some(true));
    last_id = f.id;
    let f = r.read_field_begin(last_id).unwrap();
    assert_eq!(f.field_type, TYPE_STOP);
  }

  #[test]
  fn test_truncated_input_is_eof() {
    let mut w = CompactWriter::new();
    w.struct_begin();
    w.write_binary_field(1, &[0u8; 64]);
    w.struct_end();
    let bytes = w.into_bytes();

    let mut r = CompactSliceReader::new(&bytes[..10]);
    let f = r.read_field_begin(0).unwrap();
    match r.skip(f.field_type) {
      Err(ParquetError::Eof(_)) => {},
      other => panic!("expected Eof, got {:?}", other)
    }
  }

  #[test]
  fn test_skip_nested_struct() {
    let mut w = CompactWriter::new();
    w.struct_begin();
    w.field_begin(TYPE_STRUCT, 2);
    w.struct_begin();
    w.write_i32_field(1, 5);
    w.list_field_begin(2, TYPE_I32, 3);
    for i in 0..3 {
      w.write_list_i32(i);
    }
    w.struct_end();
    w.write_i32_field(3, 9);
    w.struct_end();
    let bytes = w.into_bytes();

    let mut r = CompactSliceReader::new(&bytes);
    let f = r.read_field_begin(0).unwrap();
    assert_eq!((f.field_type, f.id), (TYPE_STRUCT, 2));
    r.skip(f.field_type).unwrap();
    let f = r.read_field_begin(2).unwrap();
    assert_eq!((f.field_type, f.id), (TYPE_I32, 3));
    assert_eq!(r.read_i32().unwrap(), 9);
  }
}
