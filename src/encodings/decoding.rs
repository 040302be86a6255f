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
use std::marker::PhantomData;

use byteorder::{ByteOrder, LittleEndian};

use crate::basic::{Encoding, Type};
use crate::data_type::*;
use crate::encodings::rle::RleDecoder;
use crate::errors::Result;
use crate::util::bit_util::BitReader;
use crate::util::memory::BytePtr;

// ----------------------------------------------------------------------
// Decoders

pub trait Decoder<T: DataType> {
  /// Sets the data to decode to be `data`, which should contain
  /// `num_values` of values to decode.
  fn set_data(&mut self, data: BytePtr, num_values: usize) -> Result<()>;

  /// Consumes values from this decoder and writes the results to `buffer`.
  /// This will try to fill up `buffer`. Returns the actual number of values
  /// written, which is smaller than `buffer.len()` only when the remaining
  /// number of values is.
  fn get(&mut self, buffer: &mut [T::T]) -> Result<usize>;

  /// Number of values left in this decoder stream.
  fn values_left(&self) -> usize;

  /// The encoding for this decoder.
  fn encoding(&self) -> Encoding;
}

// ----------------------------------------------------------------------
// PLAIN decoding

/// Per-type plain decode step. The physical type selects the
/// implementation once at reader construction; the hot loop then calls a
/// statically dispatched `decode_one`.
pub trait PlainDecoding: DataType + Sized {
  fn decode_one(decoder: &mut PlainDecoder<Self>) -> Result<Self::T>;
}

pub struct PlainDecoder<T: DataType> {
  /// The remaining number of values in the byte array
  num_values: usize,

  /// The current starting index in the byte array
  start: usize,

  /// The length for the type `T`. Only used for FIXED_LEN_BYTE_ARRAY
  /// columns (including decimals, where it is the decimal byte width).
  type_length: i32,

  /// The byte array to decode from. Not set if `T` is bool.
  data: Option<BytePtr>,

  /// Read `data` bit by bit. Only set if `T` is bool.
  bit_reader: Option<BitReader>,

  _phantom: PhantomData<T>
}

impl<T: DataType> PlainDecoder<T> {
  pub fn new(type_length: i32) -> Self {
    PlainDecoder {
      data: None, bit_reader: None, type_length,
      num_values: 0, start: 0, _phantom: PhantomData
    }
  }

  /// Decodes the next single value, advancing the cursor by its encoded
  /// width.
  #[inline]
  pub fn get_one(&mut self) -> Result<T::T>
  where T: PlainDecoding {
    if self.num_values == 0 {
      return Err(decode_err!("no more plain-encoded values in page"));
    }
    let value = T::decode_one(self)?;
    self.num_values -= 1;
    Ok(value)
  }

  fn take_bytes(&mut self, num_bytes: usize) -> Result<BytePtr> {
    let data = self.data.as_ref().expect("set_data() must be called first");
    if data.len() < self.start + num_bytes {
      return Err(decode_err!(
        "not enough bytes to decode: need {} at offset {}, page has {}",
        num_bytes, self.start, data.len()));
    }
    let result = data.range(self.start, num_bytes);
    self.start += num_bytes;
    Ok(result)
  }
}

impl<T: PlainDecoding> Decoder<T> for PlainDecoder<T> {
  fn set_data(&mut self, data: BytePtr, num_values: usize) -> Result<()> {
    self.num_values = num_values;
    self.start = 0;
    if T::get_physical_type() == Type::BOOLEAN {
      self.bit_reader = Some(BitReader::new(data));
    } else {
      self.data = Some(data);
    }
    Ok(())
  }

  fn get(&mut self, buffer: &mut [T::T]) -> Result<usize> {
    let num_values = cmp::min(buffer.len(), self.num_values);
    for item in buffer.iter_mut().take(num_values) {
      *item = T::decode_one(self)?;
    }
    self.num_values -= num_values;
    Ok(num_values)
  }

  fn values_left(&self) -> usize {
    self.num_values
  }

  fn encoding(&self) -> Encoding {
    Encoding::PLAIN
  }
}

macro_rules! plain_decode_numeric {
  ($ty:ident, $native:ty, $size:expr) => {
    impl PlainDecoding for $ty {
      #[inline]
      fn decode_one(decoder: &mut PlainDecoder<Self>) -> Result<$native> {
        let bytes = decoder.take_bytes($size)?;
        let mut raw = [0u8; $size];
        raw.copy_from_slice(bytes.as_ref());
        Ok(<$native>::from_le_bytes(raw))
      }
    }
  };
}

plain_decode_numeric!(Int32Type, i32, 4);
plain_decode_numeric!(Int64Type, i64, 8);
plain_decode_numeric!(FloatType, f32, 4);
plain_decode_numeric!(DoubleType, f64, 8);

impl PlainDecoding for BoolType {
  #[inline]
  fn decode_one(decoder: &mut PlainDecoder<Self>) -> Result<bool> {
    let reader = decoder.bit_reader.as_mut().expect("set_data() must be called first");
    reader.get_value::<bool>(1)
      .ok_or_else(|| decode_err!("not enough bits to decode boolean"))
  }
}

impl PlainDecoding for Int96Type {
  #[inline]
  fn decode_one(decoder: &mut PlainDecoder<Self>) -> Result<Int96> {
    let bytes = decoder.take_bytes(12)?;
    let raw = bytes.as_ref();
    Ok(Int96::new([
      LittleEndian::read_u32(&raw[0..4]),
      LittleEndian::read_u32(&raw[4..8]),
      LittleEndian::read_u32(&raw[8..12])
    ]))
  }
}

impl PlainDecoding for ByteArrayType {
  #[inline]
  fn decode_one(decoder: &mut PlainDecoder<Self>) -> Result<ByteArray> {
    let len_bytes = decoder.take_bytes(4)?;
    let len = LittleEndian::read_u32(len_bytes.as_ref()) as usize;
    let mut result = ByteArray::new();
    result.set_data(decoder.take_bytes(len)?);
    Ok(result)
  }
}

impl PlainDecoding for FixedLenByteArrayType {
  #[inline]
  fn decode_one(decoder: &mut PlainDecoder<Self>) -> Result<ByteArray> {
    if decoder.type_length <= 0 {
      return Err(decode_err!(
        "invalid fixed length {} for FIXED_LEN_BYTE_ARRAY", decoder.type_length));
    }
    let type_length = decoder.type_length as usize;
    let mut result = ByteArray::new();
    result.set_data(decoder.take_bytes(type_length)?);
    Ok(result)
  }
}

// ----------------------------------------------------------------------
// PLAIN_DICTIONARY decoding

pub struct DictDecoder<T: DataType> {
  /// The dictionary, mapping ids to values
  dictionary: Vec<T::T>,

  /// Whether `dictionary` has been initialized
  has_dictionary: bool,

  /// The decoder for the value ids
  rle_decoder: Option<RleDecoder>,

  /// Number of values left in the data stream
  num_values: usize
}

impl<T: DataType> DictDecoder<T> {
  pub fn new() -> Self {
    Self { dictionary: vec![], has_dictionary: false, rle_decoder: None, num_values: 0 }
  }

  /// Builds the dictionary by draining `decoder`, which must be a plain
  /// decoder positioned on the decoded dictionary page bytes.
  pub fn set_dict(&mut self, decoder: &mut PlainDecoder<T>) -> Result<()>
  where T: PlainDecoding {
    let num_values = decoder.values_left();
    self.dictionary.clear();
    self.dictionary.resize(num_values, T::T::default());
    let decoded = decoder.get(&mut self.dictionary)?;
    if decoded != num_values {
      return Err(decode_err!(
        "expected {} dictionary entries but decoded {}", num_values, decoded));
    }
    self.has_dictionary = true;
    Ok(())
  }

  pub fn has_dict(&self) -> bool {
    self.has_dictionary
  }

  pub fn clear_dict(&mut self) {
    self.has_dictionary = false;
    self.dictionary.clear();
  }

  pub fn num_entries(&self) -> usize {
    self.dictionary.len()
  }

  /// Random access to one dictionary entry.
  pub fn value(&self, index: usize) -> Result<&T::T> {
    self.dictionary.get(index).ok_or_else(|| decode_err!(
      "dictionary index {} out of bounds, dictionary has {} entries",
      index, self.dictionary.len()))
  }

  /// Decodes the next index from the data stream and returns its value.
  #[inline]
  pub fn get_one(&mut self) -> Result<T::T> {
    debug_assert!(self.has_dictionary, "set_dict() must be called first");
    let rle = self.rle_decoder.as_mut().expect("set_data() must be called first");
    let index = rle.get::<u32>()?
      .ok_or_else(|| decode_err!("dictionary index stream ended prematurely"))?;
    let value = self.value(index as usize)?.clone();
    self.num_values = self.num_values.saturating_sub(1);
    Ok(value)
  }
}

impl<T: DataType> Default for DictDecoder<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T: DataType> Decoder<T> for DictDecoder<T> {
  fn set_data(&mut self, data: BytePtr, num_values: usize) -> Result<()> {
    // First byte in `data` is the bit width
    if data.is_empty() {
      return Err(eof_err!("dictionary-encoded page has no bit width byte"));
    }
    let bit_width = data.as_ref()[0] as usize;
    if bit_width > 32 {
      return Err(decode_err!("dictionary index bit width {} out of range", bit_width));
    }
    let mut rle_decoder = RleDecoder::new(bit_width);
    rle_decoder.set_data(data.start_from(1));
    self.num_values = num_values;
    self.rle_decoder = Some(rle_decoder);
    Ok(())
  }

  fn get(&mut self, buffer: &mut [T::T]) -> Result<usize> {
    assert!(self.has_dictionary, "set_dict() must be called first");
    let rle = self.rle_decoder.as_mut().expect("set_data() must be called first");
    let num_values = cmp::min(buffer.len(), self.num_values);
    let decoded = rle.get_batch_with_dict(&self.dictionary[..], buffer, num_values)?;
    self.num_values -= decoded;
    Ok(decoded)
  }

  fn values_left(&self) -> usize {
    self.num_values
  }

  fn encoding(&self) -> Encoding {
    Encoding::PLAIN_DICTIONARY
  }
}
