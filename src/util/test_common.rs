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

//! Helpers shared by the unit tests: random data generation, byte-exact
//! builders for plain-encoded value streams, and page builders.

use rand::{thread_rng, Rng};

use crate::basic::{Compression, Encoding, PageType};
use crate::encodings::levels::LevelEncoder;
use crate::encodings::rle::RleEncoder;
use crate::format::metadata::{
  ColumnChunk, ColumnMetaData, DataPageHeader, DictionaryPageHeader, FileMetaData,
  PageHeader, RowGroup, SchemaElement, Statistics
};
use crate::format::thrift::CompactWriter;
use crate::util::bit_util::set_array_bit;

pub fn random_bytes(n: usize) -> Vec<u8> {
  let mut result = vec![];
  let mut rng = thread_rng();
  for _ in 0..n {
    result.push(rng.gen::<u8>());
  }
  result
}

pub fn random_numbers_range(n: usize, low: i32, high: i32) -> Vec<i32> {
  let mut result = vec![];
  let mut rng = thread_rng();
  for _ in 0..n {
    result.push(rng.gen_range(low..high));
  }
  result
}

// ----------------------------------------------------------------------
// Plain-encoded byte stream builders

pub fn plain_bytes_i32(values: &[i32]) -> Vec<u8> {
  let mut v = vec![];
  for value in values {
    v.extend_from_slice(&value.to_le_bytes());
  }
  v
}

pub fn plain_bytes_i64(values: &[i64]) -> Vec<u8> {
  let mut v = vec![];
  for value in values {
    v.extend_from_slice(&value.to_le_bytes());
  }
  v
}

pub fn plain_bytes_f64(values: &[f64]) -> Vec<u8> {
  let mut v = vec![];
  for value in values {
    v.extend_from_slice(&value.to_le_bytes());
  }
  v
}

pub fn plain_bytes_bool(values: &[bool]) -> Vec<u8> {
  let mut v = vec![];
  for (i, value) in values.iter().enumerate() {
    if i % 8 == 0 {
      v.push(0);
    }
    if *value {
      set_array_bit(&mut v[..], i);
    }
  }
  v
}

pub fn plain_bytes_byte_array(values: &[&str]) -> Vec<u8> {
  let mut v = vec![];
  for value in values {
    v.extend_from_slice(&(value.len() as u32).to_le_bytes());
    v.extend_from_slice(value.as_bytes());
  }
  v
}

// ----------------------------------------------------------------------
// Page builders

pub fn serialize_page_header(header: &PageHeader) -> Vec<u8> {
  let mut w = CompactWriter::new();
  header.write_to(&mut w);
  w.into_bytes()
}

/// Builds one data page: repetition levels (when `max_rep > 0`),
/// definition levels (when `max_def > 0`), then the value stream.
pub fn build_data_page(
  num_values: usize,
  max_def: i16,
  def_levels: &[i16],
  max_rep: i16,
  rep_levels: &[i16],
  value_bytes: &[u8],
  encoding: Encoding
) -> Vec<u8> {
  let mut body = vec![];
  if max_rep > 0 {
    let mut encoder = LevelEncoder::new(Encoding::RLE, max_rep);
    encoder.put(rep_levels);
    body.extend_from_slice(&encoder.consume());
  }
  if max_def > 0 {
    let mut encoder = LevelEncoder::new(Encoding::RLE, max_def);
    encoder.put(def_levels);
    body.extend_from_slice(&encoder.consume());
  }
  body.extend_from_slice(value_bytes);

  let header = PageHeader {
    type_: PageType::DATA_PAGE.to_thrift(),
    uncompressed_page_size: body.len() as i32,
    compressed_page_size: body.len() as i32,
    data_page_header: Some(DataPageHeader {
      num_values: num_values as i32,
      encoding: encoding.to_thrift(),
      definition_level_encoding: Encoding::RLE.to_thrift(),
      repetition_level_encoding: Encoding::RLE.to_thrift(),
      statistics: None
    }),
    dictionary_page_header: None
  };
  let mut bytes = serialize_page_header(&header);
  bytes.extend_from_slice(&body);
  bytes
}

pub fn build_dict_page(dict_bytes: &[u8], num_values: usize) -> Vec<u8> {
  let header = PageHeader {
    type_: PageType::DICTIONARY_PAGE.to_thrift(),
    uncompressed_page_size: dict_bytes.len() as i32,
    compressed_page_size: dict_bytes.len() as i32,
    data_page_header: None,
    dictionary_page_header: Some(DictionaryPageHeader {
      num_values: num_values as i32,
      encoding: Encoding::PLAIN_DICTIONARY.to_thrift(),
      is_sorted: None
    })
  };
  let mut bytes = serialize_page_header(&header);
  bytes.extend_from_slice(dict_bytes);
  bytes
}

/// RLE-encoded dictionary index stream, prefixed with its bit-width byte.
pub fn dict_index_stream(bit_width: u8, indices: &[u64]) -> Vec<u8> {
  let mut encoder = RleEncoder::new(bit_width as usize);
  for idx in indices {
    encoder.put(*idx);
  }
  let mut out = vec![bit_width];
  out.extend_from_slice(&encoder.consume());
  out
}

// ----------------------------------------------------------------------
// Whole-file builders

pub fn schema_group(name: &str, repetition: Option<i32>, num_children: i32) -> SchemaElement {
  SchemaElement {
    name: name.to_owned(),
    repetition_type: repetition,
    num_children: Some(num_children),
    ..Default::default()
  }
}

pub fn schema_leaf(name: &str, repetition: i32, physical: i32) -> SchemaElement {
  SchemaElement {
    name: name.to_owned(),
    repetition_type: Some(repetition),
    type_: Some(physical),
    ..Default::default()
  }
}

/// One column chunk of a synthetic file. `dict_page` and `data_pages` are
/// fully serialized page bytes (headers included).
pub struct TestColumn {
  pub dict_page: Option<Vec<u8>>,
  pub data_pages: Vec<u8>,
  pub num_values: i64,
  pub physical_type: i32,
  pub min: Option<Vec<u8>>,
  pub max: Option<Vec<u8>>,
  pub codec: Compression
}

impl TestColumn {
  pub fn plain(data_pages: Vec<u8>, num_values: i64) -> Self {
    TestColumn {
      dict_page: None,
      data_pages,
      num_values,
      physical_type: 1,
      min: None,
      max: None,
      codec: Compression::UNCOMPRESSED
    }
  }
}

pub struct TestRowGroup {
  pub columns: Vec<TestColumn>,
  pub num_rows: i64
}

/// Assembles a byte-exact Parquet file: leading magic, page data, then the
/// footer with its length suffix and trailing magic.
pub fn build_test_file(
  schema: Vec<SchemaElement>, row_groups: Vec<TestRowGroup>, created_by: &str
) -> Vec<u8> {
  let mut bytes = b"PAR1".to_vec();
  let mut t_row_groups = vec![];
  let mut total_rows = 0i64;

  for rg in &row_groups {
    total_rows += rg.num_rows;
    let mut columns = vec![];
    let mut total_byte_size = 0i64;
    for (i, col) in rg.columns.iter().enumerate() {
      let col_start = bytes.len() as i64;
      let dictionary_page_offset = col.dict_page.as_ref().map(|p| {
        let offset = bytes.len() as i64;
        bytes.extend_from_slice(p);
        offset
      });
      let data_page_offset = bytes.len() as i64;
      bytes.extend_from_slice(&col.data_pages);
      let total_compressed_size = bytes.len() as i64 - col_start;
      total_byte_size += total_compressed_size;

      let mut encodings =
        vec![Encoding::PLAIN.to_thrift(), Encoding::RLE.to_thrift()];
      if col.dict_page.is_some() {
        encodings.push(Encoding::PLAIN_DICTIONARY.to_thrift());
      }
      let statistics = match (&col.min, &col.max) {
        (Some(min), Some(max)) => Some(Statistics {
          min: Some(min.clone()),
          max: Some(max.clone()),
          null_count: None,
          distinct_count: None
        }),
        _ => None
      };
      columns.push(ColumnChunk {
        file_path: None,
        file_offset: col_start,
        meta_data: Some(ColumnMetaData {
          type_: col.physical_type,
          encodings,
          path_in_schema: vec![format!("c{}", i)],
          codec: col.codec.to_thrift(),
          num_values: col.num_values,
          total_uncompressed_size: total_compressed_size,
          total_compressed_size,
          data_page_offset,
          index_page_offset: None,
          dictionary_page_offset,
          statistics
        })
      });
    }
    t_row_groups.push(RowGroup { columns, total_byte_size, num_rows: rg.num_rows });
  }

  let metadata = FileMetaData {
    version: 1,
    schema,
    num_rows: total_rows,
    row_groups: t_row_groups,
    created_by: Some(created_by.to_owned())
  };
  let mut w = CompactWriter::new();
  metadata.write_to(&mut w);
  let serialized = w.into_bytes();
  bytes.extend_from_slice(&serialized);
  bytes.extend_from_slice(&(serialized.len() as u32).to_le_bytes());
  bytes.extend_from_slice(b"PAR1");
  bytes
}
