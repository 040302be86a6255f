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

use std::fmt;

use crate::errors::{ParquetError, Result};

// ----------------------------------------------------------------------
// Types from the Thrift definition

/// Mirrors `parquet::Type`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
  BOOLEAN,
  INT32,
  INT64,
  INT96,
  FLOAT,
  DOUBLE,
  BYTE_ARRAY,
  FIXED_LEN_BYTE_ARRAY
}

/// Mirrors `parquet::ConvertedType`. `NONE` stands for an absent
/// converted type on the schema element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalType {
  NONE,
  UTF8,
  MAP,
  MAP_KEY_VALUE,
  LIST,
  ENUM,
  DECIMAL,
  DATE,
  TIME_MILLIS,
  TIME_MICROS,
  TIMESTAMP_MILLIS,
  TIMESTAMP_MICROS,
  UINT_8,
  UINT_16,
  UINT_32,
  UINT_64,
  INT_8,
  INT_16,
  INT_32,
  INT_64,
  JSON,
  BSON,
  INTERVAL
}

/// Mirrors `parquet::FieldRepetitionType`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repetition {
  REQUIRED,
  OPTIONAL,
  REPEATED
}

/// Mirrors `parquet::Encoding`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
  PLAIN,
  PLAIN_DICTIONARY,
  RLE,
  BIT_PACKED,
  DELTA_BINARY_PACKED,
  DELTA_LENGTH_BYTE_ARRAY,
  DELTA_BYTE_ARRAY,
  RLE_DICTIONARY
}

impl Encoding {
  /// The encodings this scanner can decode. Everything else fails column
  /// validation up front.
  pub fn is_supported(&self) -> bool {
    matches!(
      *self,
      Encoding::PLAIN | Encoding::PLAIN_DICTIONARY | Encoding::RLE | Encoding::BIT_PACKED)
  }
}

/// Mirrors `parquet::CompressionCodec`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
  UNCOMPRESSED,
  SNAPPY,
  GZIP,
  LZO,
  BROTLI,
  LZ4,
  ZSTD
}

/// Mirrors `parquet::PageType`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
  DATA_PAGE,
  INDEX_PAGE,
  DICTIONARY_PAGE,
  DATA_PAGE_V2
}

// ----------------------------------------------------------------------
// Conversions from raw Thrift enum values

impl Type {
  pub fn from_thrift(value: i32) -> Result<Self> {
    match value {
      0 => Ok(Type::BOOLEAN),
      1 => Ok(Type::INT32),
      2 => Ok(Type::INT64),
      3 => Ok(Type::INT96),
      4 => Ok(Type::FLOAT),
      5 => Ok(Type::DOUBLE),
      6 => Ok(Type::BYTE_ARRAY),
      7 => Ok(Type::FIXED_LEN_BYTE_ARRAY),
      _ => Err(general_err!("Unknown physical type {}", value))
    }
  }
}

impl LogicalType {
  pub fn from_thrift(value: Option<i32>) -> Result<Self> {
    let value = match value {
      None => return Ok(LogicalType::NONE),
      Some(v) => v
    };
    match value {
      0 => Ok(LogicalType::UTF8),
      1 => Ok(LogicalType::MAP),
      2 => Ok(LogicalType::MAP_KEY_VALUE),
      3 => Ok(LogicalType::LIST),
      4 => Ok(LogicalType::ENUM),
      5 => Ok(LogicalType::DECIMAL),
      6 => Ok(LogicalType::DATE),
      7 => Ok(LogicalType::TIME_MILLIS),
      8 => Ok(LogicalType::TIME_MICROS),
      9 => Ok(LogicalType::TIMESTAMP_MILLIS),
      10 => Ok(LogicalType::TIMESTAMP_MICROS),
      11 => Ok(LogicalType::UINT_8),
      12 => Ok(LogicalType::UINT_16),
      13 => Ok(LogicalType::UINT_32),
      14 => Ok(LogicalType::UINT_64),
      15 => Ok(LogicalType::INT_8),
      16 => Ok(LogicalType::INT_16),
      17 => Ok(LogicalType::INT_32),
      18 => Ok(LogicalType::INT_64),
      19 => Ok(LogicalType::JSON),
      20 => Ok(LogicalType::BSON),
      21 => Ok(LogicalType::INTERVAL),
      _ => Err(general_err!("Unknown converted type {}", value))
    }
  }
}

impl Repetition {
  pub fn from_thrift(value: i32) -> Result<Self> {
    match value {
      0 => Ok(Repetition::REQUIRED),
      1 => Ok(Repetition::OPTIONAL),
      2 => Ok(Repetition::REPEATED),
      _ => Err(general_err!("Unknown repetition type {}", value))
    }
  }
}

impl Encoding {
  pub fn from_thrift(value: i32) -> Result<Self> {
    match value {
      0 => Ok(Encoding::PLAIN),
      2 => Ok(Encoding::PLAIN_DICTIONARY),
      3 => Ok(Encoding::RLE),
      4 => Ok(Encoding::BIT_PACKED),
      5 => Ok(Encoding::DELTA_BINARY_PACKED),
      6 => Ok(Encoding::DELTA_LENGTH_BYTE_ARRAY),
      7 => Ok(Encoding::DELTA_BYTE_ARRAY),
      8 => Ok(Encoding::RLE_DICTIONARY),
      _ => Err(general_err!("Unknown encoding {}", value))
    }
  }

  pub fn to_thrift(&self) -> i32 {
    match *self {
      Encoding::PLAIN => 0,
      Encoding::PLAIN_DICTIONARY => 2,
      Encoding::RLE => 3,
      Encoding::BIT_PACKED => 4,
      Encoding::DELTA_BINARY_PACKED => 5,
      Encoding::DELTA_LENGTH_BYTE_ARRAY => 6,
      Encoding::DELTA_BYTE_ARRAY => 7,
      Encoding::RLE_DICTIONARY => 8
    }
  }
}

impl Compression {
  pub fn from_thrift(value: i32) -> Result<Self> {
    match value {
      0 => Ok(Compression::UNCOMPRESSED),
      1 => Ok(Compression::SNAPPY),
      2 => Ok(Compression::GZIP),
      3 => Ok(Compression::LZO),
      4 => Ok(Compression::BROTLI),
      5 => Ok(Compression::LZ4),
      6 => Ok(Compression::ZSTD),
      _ => Err(general_err!("Unknown compression codec {}", value))
    }
  }

  pub fn to_thrift(&self) -> i32 {
    match *self {
      Compression::UNCOMPRESSED => 0,
      Compression::SNAPPY => 1,
      Compression::GZIP => 2,
      Compression::LZO => 3,
      Compression::BROTLI => 4,
      Compression::LZ4 => 5,
      Compression::ZSTD => 6
    }
  }
}

impl PageType {
  pub fn from_thrift(value: i32) -> Result<Self> {
    match value {
      0 => Ok(PageType::DATA_PAGE),
      1 => Ok(PageType::INDEX_PAGE),
      2 => Ok(PageType::DICTIONARY_PAGE),
      3 => Ok(PageType::DATA_PAGE_V2),
      _ => Err(general_err!("Unknown page type {}", value))
    }
  }

  pub fn to_thrift(&self) -> i32 {
    match *self {
      PageType::DATA_PAGE => 0,
      PageType::INDEX_PAGE => 1,
      PageType::DICTIONARY_PAGE => 2,
      PageType::DATA_PAGE_V2 => 3
    }
  }
}

impl fmt::Display for Type {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{:?}", self)
  }
}

impl fmt::Display for LogicalType {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{:?}", self)
  }
}

impl fmt::Display for Repetition {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{:?}", self)
  }
}

impl fmt::Display for Encoding {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{:?}", self)
  }
}

impl fmt::Display for Compression {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{:?}", self)
  }
}

impl fmt::Display for PageType {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{:?}", self)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_type_roundtrip() {
    for v in 0..8 {
      assert!(Type::from_thrift(v).is_ok());
    }
    assert!(Type::from_thrift(8).is_err());
  }

  #[test]
  fn test_logical_type_none() {
    assert_eq!(LogicalType::from_thrift(None).unwrap(), LogicalType::NONE);
    assert_eq!(LogicalType::from_thrift(Some(0)).unwrap(), LogicalType::UTF8);
    assert!(LogicalType::from_thrift(Some(99)).is_err());
  }

  #[test]
  fn test_supported_encodings() {
    assert!(Encoding::PLAIN.is_supported());
    assert!(Encoding::PLAIN_DICTIONARY.is_supported());
    assert!(Encoding::RLE.is_supported());
    assert!(Encoding::BIT_PACKED.is_supported());
    assert!(!Encoding::DELTA_BINARY_PACKED.is_supported());
    assert!(!Encoding::RLE_DICTIONARY.is_supported());
  }

  #[test]
  fn test_encoding_thrift_values() {
    // PLAIN_DICTIONARY skips the deprecated GROUP_VAR_INT slot.
    assert_eq!(Encoding::PLAIN_DICTIONARY.to_thrift(), 2);
    assert!(Encoding::from_thrift(1).is_err());
  }
}
