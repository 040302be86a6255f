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

use byteorder::{ByteOrder, LittleEndian};

use crate::basic::Encoding;
use crate::encodings::rle::{RleDecoder, RleEncoder};
use crate::errors::Result;
use crate::util::bit_util::{self, BitReader};
use crate::util::memory::{BytePtr, MemTrackerPtr};

/// Decoder for definition and repetition levels. Levels are decoded and
/// cached in batches; a cached level is a `u8` because the nesting depth is
/// bounded by 255, which keeps the cache small and lets RLE runs fill it
/// with plain byte stores.
pub struct LevelDecoder {
  /// True when this instance decodes definition levels; only used to
  /// attribute decoding errors to the right stream.
  is_def_decoder: bool,

  encoding: Encoding,
  max_level: i16,
  bit_width: usize,

  /// Decoder state for RLE level data.
  rle_decoder: Option<RleDecoder>,

  /// Reader for BIT_PACKED level data (1-bit levels).
  bit_reader: Option<BitReader>,

  /// Batch cache. Allocated once, at first `init`, against the scanner's
  /// tracker; sized to the engine batch size.
  cached_levels: Vec<u8>,
  num_cached_levels: usize,
  cached_level_idx: usize,
  cache_size: usize,
  tracker: MemTrackerPtr,

  /// Number of remaining data values in the current data page.
  num_buffered_values: usize
}

impl LevelDecoder {
  pub fn new(is_def_decoder: bool, cache_size: usize, tracker: MemTrackerPtr) -> Self {
    Self {
      is_def_decoder,
      encoding: Encoding::RLE,
      max_level: 0,
      bit_width: 0,
      rle_decoder: None,
      bit_reader: None,
      cached_levels: vec![],
      num_cached_levels: 0,
      cached_level_idx: 0,
      cache_size,
      tracker,
      num_buffered_values: 0
    }
  }

  /// Initializes this decoder for one data page. Consumes the
  /// length-prefixed RLE header (or the bit-packed run) from the head of
  /// `data` and returns the number of bytes consumed. When
  /// `max_level == 0` there is no level data and no bytes are consumed.
  pub fn init(
    &mut self,
    encoding: Encoding,
    max_level: i16,
    num_buffered_values: usize,
    data: &BytePtr
  ) -> Result<usize> {
    self.encoding = encoding;
    self.max_level = max_level;
    self.bit_width = bit_util::log2(max_level as u64 + 1);
    self.num_buffered_values = num_buffered_values;
    self.num_cached_levels = 0;
    self.cached_level_idx = 0;
    self.init_cache()?;

    if max_level == 0 {
      return Ok(0);
    }

    match encoding {
      Encoding::RLE => {
        if data.len() < 4 {
          return Err(eof_err!("not enough bytes for RLE level length prefix"));
        }
        let num_bytes = LittleEndian::read_i32(data.as_ref());
        if num_bytes < 0 {
          return Err(decode_err!("invalid RLE level byte length {}", num_bytes));
        }
        let num_bytes = num_bytes as usize;
        if 4 + num_bytes > data.len() {
          return Err(eof_err!(
            "RLE level data of {} bytes exceeds page of {} bytes", num_bytes, data.len()));
        }
        let mut rle = RleDecoder::new(self.bit_width);
        rle.set_data(data.range(4, num_bytes));
        self.rle_decoder = Some(rle);
        Ok(4 + num_bytes)
      }
      Encoding::BIT_PACKED => {
        // One bit per level, as produced by the deprecated bit-packed
        // level encoding.
        let num_bytes = bit_util::ceil(num_buffered_values as i64, 8) as usize;
        if num_bytes > data.len() {
          return Err(eof_err!(
            "BIT_PACKED level data of {} bytes exceeds page of {} bytes",
            num_bytes, data.len()));
        }
        let slice = data.range(0, num_bytes);
        match self.bit_reader {
          Some(ref mut r) => r.reset(slice),
          None => self.bit_reader = Some(BitReader::new(slice))
        }
        Ok(num_bytes)
      }
      other => Err(nyi_err!("unsupported level encoding {}", other))
    }
  }

  /// Decodes and caches up to `batch_size` levels. Any level above
  /// `max_level`, and any stream that ends before producing `batch_size`
  /// levels, is a decoding error.
  pub fn cache_next_batch(&mut self, batch_size: usize) -> Result<()> {
    assert!(batch_size <= self.cache_size);
    self.cached_level_idx = 0;
    if self.max_level == 0 {
      // No levels to read, e.g. a required field. The cache was zeroed at
      // allocation and is never written, so just hand out those values.
      self.num_cached_levels = batch_size;
      return Ok(());
    }
    let num_filled = self.fill_cache(batch_size)?;
    if num_filled < batch_size {
      return Err(self.level_error(format_args!(
        "stream ended after {} of {} levels", num_filled, batch_size)));
    }
    self.num_cached_levels = num_filled;
    Ok(())
  }

  /// Reads a single level, bypassing the cache. Used by the non-batched
  /// reader path that drives collection children. A reader uses either
  /// this or the cache, never both on one page.
  pub fn read_level(&mut self) -> Result<i16> {
    if self.max_level == 0 {
      return Ok(0);
    }
    let level = match self.encoding {
      Encoding::RLE => {
        let rle = self.rle_decoder.as_mut().expect("init() must be called first");
        rle.get::<u8>()?
      }
      _ => {
        let reader = self.bit_reader.as_mut().expect("init() must be called first");
        reader.get_value::<u8>(1)
      }
    };
    match level {
      Some(l) if (l as i16) <= self.max_level => Ok(l as i16),
      Some(l) => Err(self.level_error(format_args!("level {} > max level {}", l, self.max_level))),
      None => Err(self.level_error(format_args!("stream ended prematurely")))
    }
  }

  #[inline]
  pub fn cache_has_next(&self) -> bool {
    self.cached_level_idx < self.num_cached_levels
  }

  #[inline]
  pub fn cache_get_next(&mut self) -> i16 {
    debug_assert!(self.cache_has_next());
    let level = self.cached_levels[self.cached_level_idx];
    self.cached_level_idx += 1;
    level as i16
  }

  #[inline]
  pub fn cache_skip_levels(&mut self, num_levels: usize) {
    debug_assert!(self.cached_level_idx + num_levels <= self.num_cached_levels);
    self.cached_level_idx += num_levels;
  }

  #[inline]
  pub fn cache_size(&self) -> usize {
    self.num_cached_levels
  }

  #[inline]
  pub fn cache_remaining(&self) -> usize {
    self.num_cached_levels - self.cached_level_idx
  }

  #[inline]
  pub fn cache_curr_idx(&self) -> usize {
    self.cached_level_idx
  }

  fn init_cache(&mut self) -> Result<()> {
    if !self.cached_levels.is_empty() {
      return Ok(());
    }
    if !self.tracker.try_consume(self.cache_size) {
      return Err(resource_err!("level cache of {} bytes", self.cache_size));
    }
    self.cached_levels = vec![0; self.cache_size];
    Ok(())
  }

  fn fill_cache(&mut self, batch_size: usize) -> Result<usize> {
    let num_filled = match self.encoding {
      Encoding::RLE => {
        let rle = self.rle_decoder.as_mut().expect("init() must be called first");
        rle.get_batch(&mut self.cached_levels[..batch_size])?
      }
      _ => {
        let reader = self.bit_reader.as_mut().expect("init() must be called first");
        let mut n = 0;
        while n < batch_size {
          match reader.get_value::<u8>(1) {
            Some(v) => self.cached_levels[n] = v,
            None => break
          }
          n += 1;
        }
        n
      }
    };
    for &level in &self.cached_levels[..num_filled] {
      if level as i16 > self.max_level {
        return Err(self.level_error(format_args!(
          "level {} > max level {}", level, self.max_level)));
      }
    }
    Ok(num_filled)
  }

  fn level_error(&self, detail: std::fmt::Arguments) -> crate::errors::ParquetError {
    let which = if self.is_def_decoder { "definition" } else { "repetition" };
    decode_err!("could not decode {} level: {}", which, detail)
  }
}

impl Drop for LevelDecoder {
  fn drop(&mut self) {
    if !self.cached_levels.is_empty() {
      self.tracker.release(self.cache_size);
    }
  }
}

/// An encoder for definition/repetition levels. This is a thin wrapper on
/// `RleEncoder`; only RLE encoding is produced.
pub struct LevelEncoder {
  rle_encoder: RleEncoder
}

impl LevelEncoder {
  pub fn new(encoding: Encoding, max_level: i16) -> Self {
    assert!(encoding == Encoding::RLE, "only RLE level encoding is supported");
    let bit_width = bit_util::log2(max_level as u64 + 1);
    Self { rle_encoder: RleEncoder::new(bit_width) }
  }

  pub fn put(&mut self, levels: &[i16]) {
    for level in levels {
      self.rle_encoder.put(*level as u64);
    }
  }

  /// Returns the encoded stream with its 4-byte little-endian length
  /// prefix, as stored at the head of a data page.
  pub fn consume(self) -> Vec<u8> {
    let encoded = self.rle_encoder.consume();
    let mut result = vec![0u8; 4];
    LittleEndian::write_i32(&mut result, encoded.len() as i32);
    result.extend_from_slice(&encoded);
    result
  }
}
