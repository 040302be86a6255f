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

use std::cmp;
use std::mem::{size_of, transmute_copy};

use crate::errors::Result;
use crate::util::bit_util::{self, BitReader};
use crate::util::memory::BytePtr;

// ----------------------------------------------------------------------
// RLE/Bit-Packing hybrid decoding

/// Decoder for the RLE/bit-packing hybrid encoding used by levels and
/// dictionary indices. A stream is a sequence of runs, each prefixed with a
/// ULEB128 indicator: low bit set means a bit-packed run of
/// `(indicator >> 1) * 8` values, low bit clear means an RLE run repeating
/// one value `indicator >> 1` times.
pub struct RleDecoder {
  /// Number of bits used to encode the value
  bit_width: usize,

  /// Bit reader loaded with input buffer
  bit_reader: Option<BitReader>,

  /// The remaining number of values in RLE for this run
  rle_left: u32,

  /// The remaining number of values in bit-packing for this run
  bit_packing_left: u32,

  /// The current value for the case of RLE mode
  current_value: Option<u64>
}

impl RleDecoder {
  pub fn new(bit_width: usize) -> Self {
    RleDecoder {
      bit_width, rle_left: 0, bit_packing_left: 0,
      bit_reader: None, current_value: None
    }
  }

  pub fn set_data(&mut self, data: BytePtr) {
    if let Some(ref mut bit_reader) = self.bit_reader {
      bit_reader.reset(data);
    } else {
      self.bit_reader = Some(BitReader::new(data));
    }
    self.rle_left = 0;
    self.bit_packing_left = 0;
    self.current_value = None;
  }

  /// Decodes a single value. Returns `None` when the stream is exhausted.
  #[inline]
  pub fn get<T: Copy + Default>(&mut self) -> Result<Option<T>> {
    assert!(size_of::<T>() <= 8);
    while self.rle_left == 0 && self.bit_packing_left == 0 {
      if !self.reload() {
        return Ok(None);
      }
    }
    let value = if self.rle_left > 0 {
      let rle_value = self.current_value
        .ok_or_else(|| decode_err!("RLE run has no current value"))?;
      self.rle_left -= 1;
      unsafe { transmute_copy::<u64, T>(&rle_value) }
    } else {
      let bit_reader = self.bit_reader.as_mut().expect("set_data() must be called first");
      let packed_value = bit_reader.get_value::<u64>(self.bit_width)
        .ok_or_else(|| decode_err!("bit-packed run ended prematurely"))?;
      self.bit_packing_left -= 1;
      unsafe { transmute_copy::<u64, T>(&packed_value) }
    };
    Ok(Some(value))
  }

  /// Decodes up to `buffer.len()` values. Returns the number decoded, which
  /// is smaller only when the stream ends.
  pub fn get_batch<T: Copy + Default>(&mut self, buffer: &mut [T]) -> Result<usize> {
    assert!(self.bit_reader.is_some());
    assert!(size_of::<T>() <= 8);

    let max_values = buffer.len();
    let mut values_read = 0;
    while values_read < max_values {
      if self.rle_left > 0 {
        let num_values = cmp::min(max_values - values_read, self.rle_left as usize);
        let repeated_value = self.current_value
          .ok_or_else(|| decode_err!("RLE run has no current value"))?;
        let repeated: T = unsafe { transmute_copy::<u64, T>(&repeated_value) };
        for item in buffer.iter_mut().skip(values_read).take(num_values) {
          *item = repeated;
        }
        self.rle_left -= num_values as u32;
        values_read += num_values;
      } else if self.bit_packing_left > 0 {
        let num_values = cmp::min(max_values - values_read, self.bit_packing_left as usize);
        let bit_reader = self.bit_reader.as_mut().expect("checked above");
        for item in buffer.iter_mut().skip(values_read).take(num_values) {
          let v = bit_reader.get_value::<u64>(self.bit_width)
            .ok_or_else(|| decode_err!("bit-packed run ended prematurely"))?;
          *item = unsafe { transmute_copy::<u64, T>(&v) };
        }
        self.bit_packing_left -= num_values as u32;
        values_read += num_values;
      } else if !self.reload() {
        break;
      }
    }

    Ok(values_read)
  }

  /// Decodes up to `max_values` dictionary indices and maps them through
  /// `dict` into `buffer`.
  pub fn get_batch_with_dict<T: Clone + Default>(
    &mut self, dict: &[T], buffer: &mut [T], max_values: usize
  ) -> Result<usize> {
    assert!(buffer.len() >= max_values);

    let mut values_read = 0;
    while values_read < max_values {
      if self.rle_left > 0 {
        let num_values = cmp::min(max_values - values_read, self.rle_left as usize);
        let dict_idx = self.current_value
          .ok_or_else(|| decode_err!("RLE run has no current value"))? as usize;
        if dict_idx >= dict.len() {
          return Err(decode_err!(
            "dictionary index {} out of bounds, dictionary has {} entries",
            dict_idx, dict.len()));
        }
        for item in buffer.iter_mut().skip(values_read).take(num_values) {
          *item = dict[dict_idx].clone();
        }
        self.rle_left -= num_values as u32;
        values_read += num_values;
      } else if self.bit_packing_left > 0 {
        let num_values = cmp::min(max_values - values_read, self.bit_packing_left as usize);
        let bit_reader = self.bit_reader.as_mut().expect("set_data() must be called first");
        for item in buffer.iter_mut().skip(values_read).take(num_values) {
          let dict_idx = bit_reader.get_value::<u32>(self.bit_width)
            .ok_or_else(|| decode_err!("bit-packed run ended prematurely"))? as usize;
          if dict_idx >= dict.len() {
            return Err(decode_err!(
              "dictionary index {} out of bounds, dictionary has {} entries",
              dict_idx, dict.len()));
          }
          *item = dict[dict_idx].clone();
        }
        self.bit_packing_left -= num_values as u32;
        values_read += num_values;
      } else if !self.reload() {
        break;
      }
    }

    Ok(values_read)
  }

  fn reload(&mut self) -> bool {
    let bit_reader = match self.bit_reader {
      Some(ref mut r) => r,
      None => return false
    };
    match bit_reader.get_vlq_int() {
      Some(indicator_value) => {
        if indicator_value & 1 == 1 {
          self.bit_packing_left = ((indicator_value >> 1) * 8) as u32;
        } else {
          self.rle_left = (indicator_value >> 1) as u32;
          let value_width = bit_util::ceil(self.bit_width as i64, 8);
          self.current_value = bit_reader.get_aligned::<u64>(value_width as usize);
          if self.current_value.is_none() {
            return false;
          }
        }
        true
      }
      None => false
    }
  }
}

// ----------------------------------------------------------------------
// RLE/Bit-Packing hybrid encoding

/// Encoder emitting pure RLE runs (each run of equal values becomes one
/// indicator + value). Used by level encoding and the test tooling; the
/// decoder accepts runs of any length.
pub struct RleEncoder {
  bit_width: usize,
  buffer: Vec<u8>,
  current_value: u64,
  repeat_count: u64
}

impl RleEncoder {
  pub fn new(bit_width: usize) -> Self {
    RleEncoder { bit_width, buffer: vec![], current_value: 0, repeat_count: 0 }
  }

  #[inline]
  pub fn put(&mut self, value: u64) {
    if self.repeat_count > 0 && value == self.current_value {
      self.repeat_count += 1;
      return;
    }
    self.flush_run();
    self.current_value = value;
    self.repeat_count = 1;
  }

  pub fn len(&self) -> usize {
    self.buffer.len()
  }

  pub fn is_empty(&self) -> bool {
    self.buffer.is_empty() && self.repeat_count == 0
  }

  /// Flushes the pending run and returns the encoded bytes.
  pub fn consume(mut self) -> Vec<u8> {
    self.flush_run();
    self.buffer
  }

  fn flush_run(&mut self) {
    if self.repeat_count == 0 {
      return;
    }
    let indicator = self.repeat_count << 1;
    self.write_vlq(indicator);
    let value_width = bit_util::ceil(self.bit_width as i64, 8) as usize;
    let value_bytes = self.current_value.to_le_bytes();
    self.buffer.extend_from_slice(&value_bytes[..value_width]);
    self.repeat_count = 0;
  }

  fn write_vlq(&mut self, mut v: u64) {
    loop {
      let byte = (v & 0x7F) as u8;
      v >>= 7;
      if v == 0 {
        self.buffer.push(byte);
        return;
      }
      self.buffer.push(byte | 0x80);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_rle_decode_int32() {
    // Test data: 0-7 with bit width 3
    // 00000011 10001000 11000110 11111010
    let data = BytePtr::new(vec![0x03, 0x88, 0xC6, 0xFA]);
    let mut decoder = RleDecoder::new(3);
    decoder.set_data(data);
    let mut buffer = vec![0i32; 8];
    let expected = vec![0, 1, 2, 3, 4, 5, 6, 7];
    let num = decoder.get_batch(&mut buffer).expect("get_batch() should be OK");
    assert_eq!(num, 8);
    assert_eq!(buffer, expected);
  }

  #[test]
  fn test_rle_decode_bool() {
    // RLE test data: 50 1s followed by 50 0s
    // 01100100 00000001 01100100 00000000
    let data1 = BytePtr::new(vec![0x64, 0x01, 0x64, 0x00]);

    // Bit-packing test data: alternating 1s and 0s, 100 total,
    // 100 / 8 = 13 groups
    // 00011011 10101010 ... 00001010
    let data2 = BytePtr::new(vec![
      0x1B, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA,
      0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0x0A
    ]);

    let mut decoder = RleDecoder::new(1);
    decoder.set_data(data1);
    let mut buffer = vec![false; 100];
    let expected: Vec<bool> = (0..100).map(|i| i < 50).collect();
    let num = decoder.get_batch(&mut buffer).expect("get_batch() should be OK");
    assert_eq!(num, 100);
    assert_eq!(buffer, expected);

    decoder.set_data(data2);
    let mut buffer = vec![false; 100];
    let expected: Vec<bool> = (0..100).map(|i| i % 2 == 1).collect();
    let num = decoder.get_batch(&mut buffer).expect("get_batch() should be OK");
    assert_eq!(num, 100);
    assert_eq!(buffer, expected);
  }

  #[test]
  fn test_rle_decode_with_dict() {
    // RLE encoding: 3 0s followed by 4 1s followed by 5 2s
    // 00000110 00000000 00001000 00000001 00001010 00000010
    let dict = vec![10, 20, 30];
    let data = BytePtr::new(vec![0x06, 0x00, 0x08, 0x01, 0x0A, 0x02]);
    let mut decoder = RleDecoder::new(3);
    decoder.set_data(data);
    let mut buffer = vec![0i32; 12];
    let expected = vec![10, 10, 10, 20, 20, 20, 20, 30, 30, 30, 30, 30];
    let num = decoder
      .get_batch_with_dict(&dict, &mut buffer, 12)
      .expect("get_batch_with_dict() should be OK");
    assert_eq!(num, 12);
    assert_eq!(buffer, expected);
  }

  #[test]
  fn test_rle_decode_dict_index_out_of_bounds() {
    // One RLE run of value 5 with a 3-entry dictionary
    let dict = vec![1i32, 2, 3];
    let data = BytePtr::new(vec![0x08, 0x05]);
    let mut decoder = RleDecoder::new(3);
    decoder.set_data(data);
    let mut buffer = vec![0i32; 4];
    assert!(decoder.get_batch_with_dict(&dict, &mut buffer, 4).is_err());
  }

  #[test]
  fn test_rle_single_values() {
    let data = BytePtr::new(vec![0x06, 0x01, 0x04, 0x00]);
    let mut decoder = RleDecoder::new(1);
    decoder.set_data(data);
    assert_eq!(decoder.get::<u8>().unwrap(), Some(1));
    assert_eq!(decoder.get::<u8>().unwrap(), Some(1));
    assert_eq!(decoder.get::<u8>().unwrap(), Some(1));
    assert_eq!(decoder.get::<u8>().unwrap(), Some(0));
    assert_eq!(decoder.get::<u8>().unwrap(), Some(0));
    assert_eq!(decoder.get::<u8>().unwrap(), None);
  }

  #[test]
  fn test_rle_encoder_roundtrip() {
    let values: Vec<u64> = vec![0, 0, 0, 1, 1, 2, 2, 2, 2, 0, 1, 1];
    let mut encoder = RleEncoder::new(2);
    for v in &values {
      encoder.put(*v);
    }
    let encoded = encoder.consume();

    let mut decoder = RleDecoder::new(2);
    decoder.set_data(BytePtr::new(encoded));
    let mut buffer = vec![0u8; values.len()];
    let num = decoder.get_batch(&mut buffer).expect("get_batch() should be OK");
    assert_eq!(num, values.len());
    let expected: Vec<u8> = values.iter().map(|v| *v as u8).collect();
    assert_eq!(buffer, expected);
  }
}
