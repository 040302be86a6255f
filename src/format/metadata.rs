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

//! Thrift-shaped metadata structs with hand-written compact-protocol
//! readers and writers. Field ids follow the Parquet format definition.
//! Unknown fields are skipped so newer writers stay readable.

use crate::errors::Result;
use crate::format::thrift::*;

// ----------------------------------------------------------------------
// Schema

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SchemaElement {
  pub type_: Option<i32>,
  pub type_length: Option<i32>,
  pub repetition_type: Option<i32>,
  pub name: String,
  pub num_children: Option<i32>,
  pub converted_type: Option<i32>,
  pub scale: Option<i32>,
  pub precision: Option<i32>,
  pub field_id: Option<i32>
}

impl SchemaElement {
  pub fn read_from(prot: &mut CompactSliceReader) -> Result<Self> {
    let mut result = SchemaElement::default();
    let mut last_field_id = 0i16;
    loop {
      let field = prot.read_field_begin(last_field_id)?;
      if field.field_type == TYPE_STOP {
        break;
      }
      match field.id {
        1 => result.type_ = Some(prot.read_i32()?),
        2 => result.type_length = Some(prot.read_i32()?),
        3 => result.repetition_type = Some(prot.read_i32()?),
        4 => result.name = prot.read_string()?,
        5 => result.num_children = Some(prot.read_i32()?),
        6 => result.converted_type = Some(prot.read_i32()?),
        7 => result.scale = Some(prot.read_i32()?),
        8 => result.precision = Some(prot.read_i32()?),
        9 => result.field_id = Some(prot.read_i32()?),
        _ => prot.skip(field.field_type)?
      }
      last_field_id = field.id;
    }
    Ok(result)
  }

  pub fn write_to(&self, w: &mut CompactWriter) {
    w.struct_begin();
    if let Some(v) = self.type_ {
      w.write_i32_field(1, v);
    }
    if let Some(v) = self.type_length {
      w.write_i32_field(2, v);
    }
    if let Some(v) = self.repetition_type {
      w.write_i32_field(3, v);
    }
    w.write_string_field(4, &self.name);
    if let Some(v) = self.num_children {
      w.write_i32_field(5, v);
    }
    if let Some(v) = self.converted_type {
      w.write_i32_field(6, v);
    }
    if let Some(v) = self.scale {
      w.write_i32_field(7, v);
    }
    if let Some(v) = self.precision {
      w.write_i32_field(8, v);
    }
    if let Some(v) = self.field_id {
      w.write_i32_field(9, v);
    }
    w.struct_end();
  }
}

// ----------------------------------------------------------------------
// Statistics

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Statistics {
  pub max: Option<Vec<u8>>,
  pub min: Option<Vec<u8>>,
  pub null_count: Option<i64>,
  pub distinct_count: Option<i64>
}

impl Statistics {
  pub fn read_from(prot: &mut CompactSliceReader) -> Result<Self> {
    let mut result = Statistics::default();
    let mut last_field_id = 0i16;
    loop {
      let field = prot.read_field_begin(last_field_id)?;
      if field.field_type == TYPE_STOP {
        break;
      }
      match field.id {
        1 => result.max = Some(prot.read_bytes()?.to_vec()),
        2 => result.min = Some(prot.read_bytes()?.to_vec()),
        3 => result.null_count = Some(prot.read_i64()?),
        4 => result.distinct_count = Some(prot.read_i64()?),
        _ => prot.skip(field.field_type)?
      }
      last_field_id = field.id;
    }
    Ok(result)
  }

  pub fn write_to(&self, w: &mut CompactWriter) {
    w.struct_begin();
    if let Some(ref v) = self.max {
      w.write_binary_field(1, v);
    }
    if let Some(ref v) = self.min {
      w.write_binary_field(2, v);
    }
    if let Some(v) = self.null_count {
      w.write_i64_field(3, v);
    }
    if let Some(v) = self.distinct_count {
      w.write_i64_field(4, v);
    }
    w.struct_end();
  }
}

// ----------------------------------------------------------------------
// Column chunks and row groups

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColumnMetaData {
  pub type_: i32,
  pub encodings: Vec<i32>,
  pub path_in_schema: Vec<String>,
  pub codec: i32,
  pub num_values: i64,
  pub total_uncompressed_size: i64,
  pub total_compressed_size: i64,
  pub data_page_offset: i64,
  pub index_page_offset: Option<i64>,
  pub dictionary_page_offset: Option<i64>,
  pub statistics: Option<Statistics>
}

impl ColumnMetaData {
  pub fn read_from(prot: &mut CompactSliceReader) -> Result<Self> {
    let mut result = ColumnMetaData::default();
    let mut last_field_id = 0i16;
    loop {
      let field = prot.read_field_begin(last_field_id)?;
      if field.field_type == TYPE_STOP {
        break;
      }
      match field.id {
        1 => result.type_ = prot.read_i32()?,
        2 => {
          let list = prot.read_list_begin()?;
          for _ in 0..list.size {
            result.encodings.push(prot.read_i32()?);
          }
        }
        3 => {
          let list = prot.read_list_begin()?;
          for _ in 0..list.size {
            result.path_in_schema.push(prot.read_string()?);
          }
        }
        4 => result.codec = prot.read_i32()?,
        5 => result.num_values = prot.read_i64()?,
        6 => result.total_uncompressed_size = prot.read_i64()?,
        7 => result.total_compressed_size = prot.read_i64()?,
        9 => result.data_page_offset = prot.read_i64()?,
        10 => result.index_page_offset = Some(prot.read_i64()?),
        11 => result.dictionary_page_offset = Some(prot.read_i64()?),
        12 => result.statistics = Some(Statistics::read_from(prot)?),
        _ => prot.skip(field.field_type)?
      }
      last_field_id = field.id;
    }
    Ok(result)
  }

  pub fn write_to(&self, w: &mut CompactWriter) {
    w.struct_begin();
    w.write_i32_field(1, self.type_);
    w.list_field_begin(2, TYPE_I32, self.encodings.len());
    for e in &self.encodings {
      w.write_list_i32(*e);
    }
    w.list_field_begin(3, TYPE_BINARY, self.path_in_schema.len());
    for p in &self.path_in_schema {
      w.write_list_binary(p.as_bytes());
    }
    w.write_i32_field(4, self.codec);
    w.write_i64_field(5, self.num_values);
    w.write_i64_field(6, self.total_uncompressed_size);
    w.write_i64_field(7, self.total_compressed_size);
    w.write_i64_field(9, self.data_page_offset);
    if let Some(v) = self.index_page_offset {
      w.write_i64_field(10, v);
    }
    if let Some(v) = self.dictionary_page_offset {
      w.write_i64_field(11, v);
    }
    if let Some(ref v) = self.statistics {
      w.field_begin(TYPE_STRUCT, 12);
      v.write_to(w);
    }
    w.struct_end();
  }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColumnChunk {
  pub file_path: Option<String>,
  pub file_offset: i64,
  pub meta_data: Option<ColumnMetaData>
}

impl ColumnChunk {
  pub fn read_from(prot: &mut CompactSliceReader) -> Result<Self> {
    let mut result = ColumnChunk::default();
    let mut last_field_id = 0i16;
    loop {
      let field = prot.read_field_begin(last_field_id)?;
      if field.field_type == TYPE_STOP {
        break;
      }
      match field.id {
        1 => result.file_path = Some(prot.read_string()?),
        2 => result.file_offset = prot.read_i64()?,
        3 => result.meta_data = Some(ColumnMetaData::read_from(prot)?),
        _ => prot.skip(field.field_type)?
      }
      last_field_id = field.id;
    }
    Ok(result)
  }

  pub fn write_to(&self, w: &mut CompactWriter) {
    w.struct_begin();
    if let Some(ref v) = self.file_path {
      w.write_string_field(1, v);
    }
    w.write_i64_field(2, self.file_offset);
    if let Some(ref v) = self.meta_data {
      w.field_begin(TYPE_STRUCT, 3);
      v.write_to(w);
    }
    w.struct_end();
  }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RowGroup {
  pub columns: Vec<ColumnChunk>,
  pub total_byte_size: i64,
  pub num_rows: i64
}

impl RowGroup {
  pub fn read_from(prot: &mut CompactSliceReader) -> Result<Self> {
    let mut result = RowGroup::default();
    let mut last_field_id = 0i16;
    loop {
      let field = prot.read_field_begin(last_field_id)?;
      if field.field_type == TYPE_STOP {
        break;
      }
      match field.id {
        1 => {
          let list = prot.read_list_begin()?;
          for _ in 0..list.size {
            result.columns.push(ColumnChunk::read_from(prot)?);
          }
        }
        2 => result.total_byte_size = prot.read_i64()?,
        3 => result.num_rows = prot.read_i64()?,
        _ => prot.skip(field.field_type)?
      }
      last_field_id = field.id;
    }
    Ok(result)
  }

  pub fn write_to(&self, w: &mut CompactWriter) {
    w.struct_begin();
    w.list_field_begin(1, TYPE_STRUCT, self.columns.len());
    for c in &self.columns {
      c.write_to(w);
    }
    w.write_i64_field(2, self.total_byte_size);
    w.write_i64_field(3, self.num_rows);
    w.struct_end();
  }
}

// ----------------------------------------------------------------------
// File metadata

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FileMetaData {
  pub version: i32,
  pub schema: Vec<SchemaElement>,
  pub num_rows: i64,
  pub row_groups: Vec<RowGroup>,
  pub created_by: Option<String>
}

impl FileMetaData {
  pub fn read_from(prot: &mut CompactSliceReader) -> Result<Self> {
    let mut result = FileMetaData::default();
    let mut last_field_id = 0i16;
    loop {
      let field = prot.read_field_begin(last_field_id)?;
      if field.field_type == TYPE_STOP {
        break;
      }
      match field.id {
        1 => result.version = prot.read_i32()?,
        2 => {
          let list = prot.read_list_begin()?;
          for _ in 0..list.size {
            result.schema.push(SchemaElement::read_from(prot)?);
          }
        }
        3 => result.num_rows = prot.read_i64()?,
        4 => {
          let list = prot.read_list_begin()?;
          for _ in 0..list.size {
            result.row_groups.push(RowGroup::read_from(prot)?);
          }
        }
        6 => result.created_by = Some(prot.read_string()?),
        _ => prot.skip(field.field_type)?
      }
      last_field_id = field.id;
    }
    Ok(result)
  }

  pub fn write_to(&self, w: &mut CompactWriter) {
    w.struct_begin();
    w.write_i32_field(1, self.version);
    w.list_field_begin(2, TYPE_STRUCT, self.schema.len());
    for s in &self.schema {
      s.write_to(w);
    }
    w.write_i64_field(3, self.num_rows);
    w.list_field_begin(4, TYPE_STRUCT, self.row_groups.len());
    for rg in &self.row_groups {
      rg.write_to(w);
    }
    if let Some(ref v) = self.created_by {
      w.write_string_field(6, v);
    }
    w.struct_end();
  }
}

// ----------------------------------------------------------------------
// Page headers

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataPageHeader {
  pub num_values: i32,
  pub encoding: i32,
  pub definition_level_encoding: i32,
  pub repetition_level_encoding: i32,
  pub statistics: Option<Statistics>
}

impl DataPageHeader {
  pub fn read_from(prot: &mut CompactSliceReader) -> Result<Self> {
    let mut result = DataPageHeader::default();
    let mut last_field_id = 0i16;
    loop {
      let field = prot.read_field_begin(last_field_id)?;
      if field.field_type == TYPE_STOP {
        break;
      }
      match field.id {
        1 => result.num_values = prot.read_i32()?,
        2 => result.encoding = prot.read_i32()?,
        3 => result.definition_level_encoding = prot.read_i32()?,
        4 => result.repetition_level_encoding = prot.read_i32()?,
        5 => result.statistics = Some(Statistics::read_from(prot)?),
        _ => prot.skip(field.field_type)?
      }
      last_field_id = field.id;
    }
    Ok(result)
  }

  pub fn write_to(&self, w: &mut CompactWriter) {
    w.struct_begin();
    w.write_i32_field(1, self.num_values);
    w.write_i32_field(2, self.encoding);
    w.write_i32_field(3, self.definition_level_encoding);
    w.write_i32_field(4, self.repetition_level_encoding);
    if let Some(ref v) = self.statistics {
      w.field_begin(TYPE_STRUCT, 5);
      v.write_to(w);
    }
    w.struct_end();
  }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DictionaryPageHeader {
  pub num_values: i32,
  pub encoding: i32,
  pub is_sorted: Option<bool>
}

impl DictionaryPageHeader {
  pub fn read_from(prot: &mut CompactSliceReader) -> Result<Self> {
    let mut result = DictionaryPageHeader::default();
    let mut last_field_id = 0i16;
    loop {
      let field = prot.read_field_begin(last_field_id)?;
      if field.field_type == TYPE_STOP {
        break;
      }
      match field.id {
        1 => result.num_values = prot.read_i32()?,
        2 => result.encoding = prot.read_i32()?,
        3 => result.is_sorted = field.bool_val,
        _ => prot.skip(field.field_type)?
      }
      last_field_id = field.id;
    }
    Ok(result)
  }

  pub fn write_to(&self, w: &mut CompactWriter) {
    w.struct_begin();
    w.write_i32_field(1, self.num_values);
    w.write_i32_field(2, self.encoding);
    if let Some(v) = self.is_sorted {
      w.write_bool_field(3, v);
    }
    w.struct_end();
  }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PageHeader {
  pub type_: i32,
  pub uncompressed_page_size: i32,
  pub compressed_page_size: i32,
  pub data_page_header: Option<DataPageHeader>,
  pub dictionary_page_header: Option<DictionaryPageHeader>
}

impl PageHeader {
  pub fn read_from(prot: &mut CompactSliceReader) -> Result<Self> {
    let mut result = PageHeader::default();
    let mut last_field_id = 0i16;
    loop {
      let field = prot.read_field_begin(last_field_id)?;
      if field.field_type == TYPE_STOP {
        break;
      }
      match field.id {
        1 => result.type_ = prot.read_i32()?,
        2 => result.uncompressed_page_size = prot.read_i32()?,
        3 => result.compressed_page_size = prot.read_i32()?,
        5 => result.data_page_header = Some(DataPageHeader::read_from(prot)?),
        7 => result.dictionary_page_header = Some(DictionaryPageHeader::read_from(prot)?),
        _ => prot.skip(field.field_type)?
      }
      last_field_id = field.id;
    }
    Ok(result)
  }

  pub fn write_to(&self, w: &mut CompactWriter) {
    w.struct_begin();
    w.write_i32_field(1, self.type_);
    w.write_i32_field(2, self.uncompressed_page_size);
    w.write_i32_field(3, self.compressed_page_size);
    if let Some(ref v) = self.data_page_header {
      w.field_begin(TYPE_STRUCT, 5);
      v.write_to(w);
    }
    if let Some(ref v) = self.dictionary_page_header {
      w.field_begin(TYPE_STRUCT, 7);
      v.write_to(w);
    }
    w.struct_end();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn roundtrip<T, R, W>(value: &T, read: R, write: W) -> T
  where
    R: Fn(&mut CompactSliceReader) -> Result<T>,
    W: Fn(&T, &mut CompactWriter)
  {
    let mut w = CompactWriter::new();
    write(value, &mut w);
    let bytes = w.into_bytes();
    let mut r = CompactSliceReader::new(&bytes);
    read(&mut r).expect("read_from should be OK")
  }

  #[test]
  fn test_schema_element_roundtrip() {
    let elem = SchemaElement {
      type_: Some(1),
      type_length: None,
      repetition_type: Some(1),
      name: "x".to_owned(),
      num_children: None,
      converted_type: Some(17),
      scale: None,
      precision: None,
      field_id: Some(3)
    };
    let back = roundtrip(&elem, SchemaElement::read_from, SchemaElement::write_to);
    assert_eq!(back, elem);
  }

  #[test]
  fn test_page_header_roundtrip() {
    let header = PageHeader {
      type_: 0,
      uncompressed_page_size: 1234,
      compressed_page_size: 1000,
      data_page_header: Some(DataPageHeader {
        num_values: 100,
        encoding: 0,
        definition_level_encoding: 3,
        repetition_level_encoding: 3,
        statistics: None
      }),
      dictionary_page_header: None
    };
    let back = roundtrip(&header, PageHeader::read_from, PageHeader::write_to);
    assert_eq!(back, header);
  }

  #[test]
  fn test_dictionary_header_bool_field() {
    let header = DictionaryPageHeader { num_values: 64, encoding: 2, is_sorted: Some(false) };
    let back =
      roundtrip(&header, DictionaryPageHeader::read_from, DictionaryPageHeader::write_to);
    assert_eq!(back, header);
  }

  #[test]
  fn test_file_metadata_roundtrip() {
    let metadata = FileMetaData {
      version: 1,
      schema: vec![
        SchemaElement { name: "schema".to_owned(), num_children: Some(1), ..Default::default() },
        SchemaElement {
          type_: Some(1),
          repetition_type: Some(0),
          name: "a".to_owned(),
          ..Default::default()
        },
      ],
      num_rows: 1000,
      row_groups: vec![RowGroup {
        columns: vec![ColumnChunk {
          file_path: None,
          file_offset: 4,
          meta_data: Some(ColumnMetaData {
            type_: 1,
            encodings: vec![0, 3],
            path_in_schema: vec!["a".to_owned()],
            codec: 0,
            num_values: 1000,
            total_uncompressed_size: 4000,
            total_compressed_size: 4000,
            data_page_offset: 4,
            index_page_offset: None,
            dictionary_page_offset: None,
            statistics: Some(Statistics {
              min: Some(vec![1, 0, 0, 0]),
              max: Some(vec![10, 0, 0, 0]),
              null_count: Some(0),
              distinct_count: None
            })
          })
        }],
        total_byte_size: 4000,
        num_rows: 1000
      }],
      created_by: Some("impala version 1.3.0".to_owned())
    };
    let back = roundtrip(&metadata, FileMetaData::read_from, FileMetaData::write_to);
    assert_eq!(back, metadata);
  }

  #[test]
  fn test_unknown_fields_skipped() {
    // A writer from the future adds field 200 (i64): readers must skip it.
    let mut w = CompactWriter::new();
    w.struct_begin();
    w.write_i32_field(1, 2);
    w.write_i32_field(2, 100);
    w.write_i32_field(3, 100);
    w.write_i64_field(200, 42);
    w.struct_end();
    let bytes = w.into_bytes();
    let mut r = CompactSliceReader::new(&bytes);
    let header = PageHeader::read_from(&mut r).unwrap();
    assert_eq!(header.type_, 2);
    assert_eq!(header.uncompressed_page_size, 100);
  }
}
