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

use crate::basic::{Compression, Encoding, Type};
use crate::errors::Result;
use crate::format;
use crate::schema::types::{build_schema_tree, SchemaNode};

// ----------------------------------------------------------------------
// Crate-facing metadata wrappers

pub struct ParquetMetaData {
  file_metadata: FileMetaData,
  row_groups: Vec<RowGroupMetaData>
}

impl ParquetMetaData {
  pub fn new(file_metadata: FileMetaData, row_groups: Vec<RowGroupMetaData>) -> Self {
    ParquetMetaData { file_metadata, row_groups }
  }

  pub fn file_metadata(&self) -> &FileMetaData {
    &self.file_metadata
  }

  pub fn num_row_groups(&self) -> usize {
    self.row_groups.len()
  }

  pub fn row_group(&self, i: usize) -> &RowGroupMetaData {
    &self.row_groups[i]
  }

  pub fn row_groups(&self) -> &[RowGroupMetaData] {
    self.row_groups.as_slice()
  }

  /// Converts the deserialized footer into the crate-facing form,
  /// reconstructing the schema tree along the way.
  pub fn from_thrift(t: format::metadata::FileMetaData) -> Result<Self> {
    let schema = build_schema_tree(&t.schema)?;
    let file_version = FileVersion::parse(t.created_by.as_deref().unwrap_or(""));
    let mut row_groups = Vec::with_capacity(t.row_groups.len());
    for rg in t.row_groups {
      row_groups.push(RowGroupMetaData::from_thrift(rg)?);
    }
    let file_metadata = FileMetaData {
      version: t.version,
      num_rows: t.num_rows,
      created_by: t.created_by,
      file_version,
      schema
    };
    Ok(ParquetMetaData::new(file_metadata, row_groups))
  }
}

/// Metadata for a Parquet file.
pub struct FileMetaData {
  version: i32,
  num_rows: i64,
  created_by: Option<String>,
  file_version: FileVersion,
  schema: SchemaNode
}

impl FileMetaData {
  pub fn version(&self) -> i32 {
    self.version
  }

  pub fn num_rows(&self) -> i64 {
    self.num_rows
  }

  pub fn created_by(&self) -> Option<&str> {
    self.created_by.as_deref()
  }

  pub fn file_version(&self) -> &FileVersion {
    &self.file_version
  }

  pub fn schema(&self) -> &SchemaNode {
    &self.schema
  }
}

/// Metadata for a row group.
pub struct RowGroupMetaData {
  columns: Vec<ColumnChunkMetaData>,
  num_rows: i64,
  total_byte_size: i64
}

impl RowGroupMetaData {
  pub fn num_columns(&self) -> usize {
    self.columns.len()
  }

  pub fn column(&self, i: usize) -> &ColumnChunkMetaData {
    &self.columns[i]
  }

  pub fn columns(&self) -> &[ColumnChunkMetaData] {
    &self.columns
  }

  pub fn num_rows(&self) -> i64 {
    self.num_rows
  }

  pub fn total_byte_size(&self) -> i64 {
    self.total_byte_size
  }

  pub fn from_thrift(rg: format::metadata::RowGroup) -> Result<RowGroupMetaData> {
    let total_byte_size = rg.total_byte_size;
    let num_rows = rg.num_rows;
    let mut columns = Vec::with_capacity(rg.columns.len());
    for c in rg.columns {
      columns.push(ColumnChunkMetaData::from_thrift(c)?);
    }
    Ok(RowGroupMetaData { columns, num_rows, total_byte_size })
  }
}

/// Metadata for a column chunk.
pub struct ColumnChunkMetaData {
  column_type: Type,
  path_in_schema: Vec<String>,
  encodings: Vec<Encoding>,
  file_path: Option<String>,
  num_values: i64,
  compression: Compression,
  total_compressed_size: i64,
  total_uncompressed_size: i64,
  data_page_offset: i64,
  index_page_offset: Option<i64>,
  dictionary_page_offset: Option<i64>,
  statistics: Option<format::metadata::Statistics>
}

impl ColumnChunkMetaData {
  /// Type of this column. Must be primitive.
  pub fn column_type(&self) -> Type {
    self.column_type
  }

  pub fn path_in_schema(&self) -> &[String] {
    &self.path_in_schema
  }

  /// All encodings used for this column.
  pub fn encodings(&self) -> &[Encoding] {
    &self.encodings
  }

  /// File where the column chunk is stored. If not set, it is stored in
  /// the same file as the metadata.
  pub fn file_path(&self) -> Option<&str> {
    self.file_path.as_deref()
  }

  /// Total number of values in this column chunk.
  pub fn num_values(&self) -> i64 {
    self.num_values
  }

  pub fn compression(&self) -> Compression {
    self.compression
  }

  pub fn compressed_size(&self) -> i64 {
    self.total_compressed_size
  }

  pub fn uncompressed_size(&self) -> i64 {
    self.total_uncompressed_size
  }

  pub fn data_page_offset(&self) -> i64 {
    self.data_page_offset
  }

  pub fn index_page_offset(&self) -> Option<i64> {
    self.index_page_offset
  }

  pub fn has_dictionary_page(&self) -> bool {
    self.dictionary_page_offset.is_some()
  }

  pub fn dictionary_page_offset(&self) -> Option<i64> {
    self.dictionary_page_offset
  }

  pub fn statistics(&self) -> Option<&format::metadata::Statistics> {
    self.statistics.as_ref()
  }

  pub fn from_thrift(cc: format::metadata::ColumnChunk) -> Result<Self> {
    let col_metadata = match cc.meta_data {
      Some(m) => m,
      None => return Err(schema_err!("expected to have column metadata"))
    };
    let column_type = Type::from_thrift(col_metadata.type_)?;
    let encodings = col_metadata
      .encodings
      .iter()
      .map(|e| Encoding::from_thrift(*e))
      .collect::<Result<Vec<_>>>()?;
    let compression = Compression::from_thrift(col_metadata.codec)?;
    Ok(ColumnChunkMetaData {
      column_type,
      path_in_schema: col_metadata.path_in_schema,
      encodings,
      file_path: cc.file_path,
      num_values: col_metadata.num_values,
      compression,
      total_compressed_size: col_metadata.total_compressed_size,
      total_uncompressed_size: col_metadata.total_uncompressed_size,
      data_page_offset: col_metadata.data_page_offset,
      index_page_offset: col_metadata.index_page_offset,
      dictionary_page_offset: col_metadata.dictionary_page_offset,
      statistics: col_metadata.statistics
    })
  }
}

// ----------------------------------------------------------------------
// Writer identification

/// The application and version parsed from the footer's `created_by`
/// string, e.g. `"impala version 1.2.1 (build ...)"`. Several writer bugs
/// are keyed off this.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FileVersion {
  pub application: String,
  pub major: i32,
  pub minor: i32,
  pub patch: i32,
  /// True for internal Impala builds, which carry the 1.1 dictionary
  /// header bug under a 1.2.0 version number.
  pub is_impala_internal: bool
}

impl FileVersion {
  pub fn parse(created_by: &str) -> Self {
    let lower = created_by.to_lowercase();
    let mut tokens = lower.split_whitespace();
    let application = tokens.next().unwrap_or("").to_owned();
    let mut result = FileVersion { application, ..Default::default() };

    let second = tokens.next();
    let third = tokens.next();
    if let (Some("version"), Some(version_string)) = (second, third) {
      // Ignore any trailing non-version characters, e.g. "(build ...)".
      let end = version_string
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(version_string.len());
      let trimmed = &version_string[..end];
      let mut parts = trimmed.split('.');
      result.major = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
      result.minor = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
      result.patch = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
      if result.application == "impala" && version_string.contains("-internal") {
        result.is_impala_internal = true;
      }
    }
    result
  }

  pub fn version_lt(&self, major: i32, minor: i32, patch: i32) -> bool {
    (self.major, self.minor, self.patch) < (major, minor, patch)
  }

  pub fn version_eq(&self, major: i32, minor: i32, patch: i32) -> bool {
    (self.major, self.minor, self.patch) == (major, minor, patch)
  }
}
