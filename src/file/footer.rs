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

use byteorder::{ByteOrder, LittleEndian};
use log::debug;

use crate::errors::Result;
use crate::file::metadata::ParquetMetaData;
use crate::format::metadata::FileMetaData as TFileMetaData;
use crate::format::thrift::CompactSliceReader;
use crate::scan::io::{IoManager, ScanRange};

pub const PARQUET_MAGIC: [u8; 4] = [b'P', b'A', b'R', b'1'];

/// Highest file-format version this scanner accepts.
pub const PARQUET_CURRENT_VERSION: i32 = 2;

/// `<uint32 metadata length> <magic>` at the very end of the file.
const FOOTER_FIXED_SIZE: u64 = 8;

/// Upper bound for one stitching read when the metadata exceeds the
/// buffered footer window.
const MAX_METADATA_READ_SIZE: u64 = 8 * 1024 * 1024;

/// Reads and deserializes the file footer. `footer_size_bytes` bounds the
/// initial speculative read from the end of the file; when the metadata
/// turns out to be larger, the remainder is fetched through the I/O
/// manager and stitched.
pub fn parse_footer(io: &dyn IoManager, footer_size_bytes: u64) -> Result<ParquetMetaData> {
  let file_length = io.file_length();
  if file_length < FOOTER_FIXED_SIZE {
    return Err(general_err!(
      "invalid file: {} bytes is smaller than the footer", file_length));
  }

  let footer_len = cmp::min(cmp::max(footer_size_bytes, FOOTER_FIXED_SIZE), file_length);
  let footer_start = file_length - footer_len;
  let buffer = io.read(&ScanRange::new(footer_start, footer_len))?;
  let bytes = buffer.as_ref();

  let magic = &bytes[bytes.len() - 4..];
  if magic != PARQUET_MAGIC {
    return Err(general_err!("invalid file: corrupt footer magic {:?}", magic));
  }

  let metadata_len =
    LittleEndian::read_u32(&bytes[bytes.len() - FOOTER_FIXED_SIZE as usize..bytes.len() - 4]);
  let metadata_len = metadata_len as u64;
  if metadata_len + FOOTER_FIXED_SIZE > file_length {
    return Err(general_err!(
      "invalid file: metadata length {} exceeds file length {}", metadata_len, file_length));
  }

  let remaining_buffered = footer_len - FOOTER_FIXED_SIZE;
  let t_metadata = if metadata_len <= remaining_buffered {
    let start = (remaining_buffered - metadata_len) as usize;
    let slice = &bytes[start..start + metadata_len as usize];
    deserialize_metadata(slice)?
  } else {
    // The metadata is bigger than the footer window; issue more reads and
    // stitch them here.
    let metadata_start = file_length - FOOTER_FIXED_SIZE - metadata_len;
    debug!(
      "footer window of {} bytes too small for {} bytes of metadata, stitching",
      footer_len, metadata_len);
    let mut stitched: Vec<u8> = Vec::with_capacity(metadata_len as usize);
    let mut to_read = metadata_len;
    let mut offset = metadata_start;
    while to_read > 0 {
      let chunk = cmp::min(MAX_METADATA_READ_SIZE, to_read);
      let data = io.read(&ScanRange::new(offset, chunk))?;
      if (data.len() as u64) < chunk {
        return Err(eof_err!(
          "could not read {} metadata bytes at offset {}", chunk, offset));
      }
      stitched.extend_from_slice(data.as_ref());
      to_read -= chunk;
      offset += chunk;
    }
    deserialize_metadata(&stitched)?
  };

  if t_metadata.version > PARQUET_CURRENT_VERSION {
    return Err(general_err!(
      "unsupported file version {}, latest supported is {}",
      t_metadata.version, PARQUET_CURRENT_VERSION));
  }

  ParquetMetaData::from_thrift(t_metadata)
}

fn deserialize_metadata(bytes: &[u8]) -> Result<TFileMetaData> {
  let mut prot = CompactSliceReader::new(bytes);
  TFileMetaData::read_from(&mut prot)
    .map_err(|e| general_err!("invalid file metadata: {}", e))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::format::metadata::FileMetaData;
  use crate::format::thrift::CompactWriter;
  use crate::scan::io::InMemoryIoManager;

  fn minimal_metadata() -> FileMetaData {
    use crate::format::metadata::SchemaElement;
    FileMetaData {
      version: 1,
      schema: vec![
        SchemaElement { name: "schema".to_owned(), num_children: Some(1), ..Default::default() },
        SchemaElement {
          name: "a".to_owned(),
          type_: Some(1),
          repetition_type: Some(0),
          ..Default::default()
        },
      ],
      num_rows: 5,
      row_groups: vec![],
      created_by: Some("impala version 2.0.0".to_owned())
    }
  }

  fn file_bytes(metadata: &FileMetaData, leading_garbage: usize) -> Vec<u8> {
    let mut w = CompactWriter::new();
    metadata.write_to(&mut w);
    let serialized = w.into_bytes();
    let mut out = vec![0xAB; leading_garbage];
    out.extend_from_slice(&serialized);
    let mut tail = [0u8; 4];
    LittleEndian::write_u32(&mut tail, serialized.len() as u32);
    out.extend_from_slice(&tail);
    out.extend_from_slice(&PARQUET_MAGIC);
    out
  }

  #[test]
  fn test_parse_footer() {
    let io = InMemoryIoManager::new(file_bytes(&minimal_metadata(), 16));
    let metadata = parse_footer(&io, 1024).expect("footer should parse");
    assert_eq!(metadata.file_metadata().num_rows(), 5);
    assert_eq!(metadata.file_metadata().version(), 1);
    assert_eq!(metadata.file_metadata().file_version().application, "impala");
    assert_eq!(metadata.num_row_groups(), 0);
    assert_eq!(metadata.file_metadata().schema().children.len(), 1);
  }

  #[test]
  fn test_parse_footer_stitched() {
    // Footer window smaller than the metadata forces a stitching read.
    let io = InMemoryIoManager::new(file_bytes(&minimal_metadata(), 64));
    let metadata = parse_footer(&io, 16).expect("footer should parse via stitching");
    assert_eq!(metadata.file_metadata().num_rows(), 5);
  }

  #[test]
  fn test_bad_magic() {
    let mut bytes = file_bytes(&minimal_metadata(), 0);
    let len = bytes.len();
    bytes[len - 1] = b'X';
    let io = InMemoryIoManager::new(bytes);
    assert!(parse_footer(&io, 1024).is_err());
  }

  #[test]
  fn test_metadata_length_exceeding_file() {
    let mut bytes = vec![0u8; 32];
    let len = bytes.len();
    LittleEndian::write_u32(&mut bytes[len - 8..len - 4], 1000);
    bytes[len - 4..].copy_from_slice(&PARQUET_MAGIC);
    let io = InMemoryIoManager::new(bytes);
    assert!(parse_footer(&io, 1024).is_err());
  }

  #[test]
  fn test_file_smaller_than_footer() {
    let io = InMemoryIoManager::new(vec![b'P', b'A', b'R', b'1']);
    assert!(parse_footer(&io, 1024).is_err());
  }

  #[test]
  fn test_unsupported_version() {
    let mut metadata = minimal_metadata();
    metadata.version = 99;
    let io = InMemoryIoManager::new(file_bytes(&metadata, 0));
    assert!(parse_footer(&io, 1024).is_err());
  }
}
