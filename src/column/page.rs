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

use log::debug;

use crate::basic::{Compression, Encoding, PageType};
use crate::compression::{create_codec, Codec};
use crate::errors::{ParquetError, Result};
use crate::format::metadata::PageHeader;
use crate::format::thrift::CompactSliceReader;
use crate::util::memory::{BytePtr, MemPool, MemTrackerPtr};

/// A page read and decompressed from a column chunk.
#[derive(Debug)]
pub enum Page {
  Data {
    buf: BytePtr,
    num_values: u32,
    encoding: Encoding,
    def_level_encoding: Encoding,
    rep_level_encoding: Encoding
  },
  Dictionary {
    buf: BytePtr,
    /// Entry count from the dictionary page header; absent when the
    /// header block itself is missing (known writer bug).
    num_values: Option<u32>,
    encoding: Option<Encoding>
  }
}

/// API for reading pages from a column chunk, iterator style.
pub trait PageReader {
  /// Get the next page in the column chunk associated with this reader.
  /// Returns `None` when the chunk's stated value count has been served or
  /// the byte stream ends.
  fn get_next_page(&mut self) -> Result<Option<Page>>;
}

/// Reads pages out of one column chunk's byte range:
/// at most one dictionary page, then data pages, then a terminal state.
/// Pages of other types are skipped. Page bodies are decompressed here;
/// the decompression buffers live in a pool the owner periodically merges
/// into the scratch batch.
pub struct SerializedPageReader {
  /// The column chunk's bytes, dictionary page first if present.
  buffer: BytePtr,
  pos: usize,

  /// Total values the chunk metadata promises.
  total_num_values: i64,
  /// Values served through data pages so far.
  num_values_read: i64,

  decompressor: Option<Box<dyn Codec>>,
  max_page_header_bytes: usize,

  /// True once a dictionary page has been produced.
  seen_dictionary: bool,
  /// Tolerate a dictionary page without the dictionary-header block
  /// (written by Impala 1.1 and 1.2.0-internal).
  permit_missing_dict_header: bool,

  /// Decompressed page buffers. Merged into the scratch batch pool by the
  /// owning reader.
  decompressed_pool: MemPool
}

impl SerializedPageReader {
  pub fn new(
    buffer: BytePtr,
    total_num_values: i64,
    codec: Compression,
    max_page_header_bytes: usize,
    permit_missing_dict_header: bool,
    tracker: MemTrackerPtr
  ) -> Result<Self> {
    let decompressor = create_codec(codec)?;
    Ok(Self {
      buffer,
      pos: 0,
      total_num_values,
      num_values_read: 0,
      decompressor,
      max_page_header_bytes,
      seen_dictionary: false,
      permit_missing_dict_header,
      decompressed_pool: MemPool::new(tracker)
    })
  }

  pub fn decompressed_pool_mut(&mut self) -> &mut MemPool {
    &mut self.decompressed_pool
  }

  /// Deserializes the next page header, growing the peek window until the
  /// header parses, the window hits the configured ceiling, or the stream
  /// ends. Returns the header and its serialized size.
  fn read_page_header(&mut self) -> Result<(PageHeader, usize)> {
    let remaining = self.buffer.len() - self.pos;
    let mut window = cmp::min(1024, remaining);
    loop {
      let slice = &self.buffer.as_ref()[self.pos..self.pos + cmp::min(window, remaining)];
      let mut prot = CompactSliceReader::new(slice);
      match PageHeader::read_from(&mut prot) {
        Ok(header) => return Ok((header, prot.bytes_read())),
        Err(ParquetError::Eof(_)) => {
          if window >= self.max_page_header_bytes {
            return Err(general_err!(
              "could not read page header: exceeded maximum header size of {} bytes",
              self.max_page_header_bytes));
          }
          if window >= remaining {
            return Err(eof_err!("page header extends past end of column chunk"));
          }
          window = cmp::max(window * 2, 1024);
        }
        Err(e) => return Err(e)
      }
    }
  }

  /// Takes the next `len` raw page bytes.
  fn take_page_bytes(&mut self, len: usize) -> Result<BytePtr> {
    if self.pos + len > self.buffer.len() {
      return Err(eof_err!(
        "page body of {} bytes extends past end of column chunk", len));
    }
    let result = self.buffer.range(self.pos, len);
    self.pos += len;
    Ok(result)
  }

  /// Decompresses a page body if the chunk has a codec, validating the
  /// decompressed length against the header in either case.
  fn decompress_page(
    &mut self, body: BytePtr, uncompressed_size: usize, what: &str
  ) -> Result<BytePtr> {
    match self.decompressor {
      Some(ref mut decompressor) => {
        let tracker = self.decompressed_pool.mem_tracker().clone();
        if !tracker.try_consume(uncompressed_size) {
          return Err(resource_err!(
            "{} bytes for decompressed {} page", uncompressed_size, what));
        }
        tracker.release(uncompressed_size);
        let mut output = Vec::new();
        let written = decompressor.decompress(body.as_ref(), &mut output)?;
        output.truncate(written);
        debug!("decompressed {} to {} bytes", body.len(), written);
        if written != uncompressed_size {
          return Err(general_err!(
            "error decompressing {} page: expected {} uncompressed bytes but got {}",
            what, uncompressed_size, written));
        }
        Ok(self.decompressed_pool.consume(output))
      }
      None => {
        if body.len() != uncompressed_size {
          return Err(general_err!(
            "error reading {} page: expected {} bytes but got {}",
            what, uncompressed_size, body.len()));
        }
        Ok(body)
      }
    }
  }
}

impl PageReader for SerializedPageReader {
  fn get_next_page(&mut self) -> Result<Option<Page>> {
    loop {
      if self.num_values_read == self.total_num_values {
        return Ok(None);
      }
      if self.num_values_read > self.total_num_values {
        return Err(general_err!(
          "column metadata states {} values but pages delivered {}",
          self.total_num_values, self.num_values_read));
      }
      if self.pos >= self.buffer.len() {
        // The data pages contain fewer values than stated in the column
        // metadata. Terminal; end-of-row-group validation reports it.
        return Ok(None);
      }

      let (header, header_size) = self.read_page_header()?;
      self.pos += header_size;

      let data_size = header.compressed_page_size;
      if data_size < 0 {
        return Err(general_err!("negative compressed page size {}", data_size));
      }
      let data_size = data_size as usize;
      let uncompressed_size = header.uncompressed_page_size;
      if uncompressed_size < 0 {
        return Err(general_err!("negative uncompressed page size {}", uncompressed_size));
      }
      let uncompressed_size = uncompressed_size as usize;

      match PageType::from_thrift(header.type_) {
        Ok(PageType::DICTIONARY_PAGE) => {
          if self.seen_dictionary {
            return Err(general_err!(
              "column chunk should not contain two dictionary pages"));
          }
          if self.num_values_read > 0 {
            return Err(general_err!(
              "dictionary page must precede all data pages in the column chunk"));
          }
          let dict_header = match header.dictionary_page_header {
            Some(ref h) => Some(h),
            None => {
              if !self.permit_missing_dict_header {
                return Err(general_err!(
                  "dictionary page does not have dictionary header set"));
              }
              None
            }
          };
          let encoding = dict_header
            .map(|h| Encoding::from_thrift(h.encoding))
            .transpose()?;
          if let Some(e) = encoding {
            if e != Encoding::PLAIN && e != Encoding::PLAIN_DICTIONARY {
              return Err(general_err!(
                "only PLAIN and PLAIN_DICTIONARY encodings are supported \
                 for dictionary pages, got {}", e));
            }
          }
          let num_values = dict_header.map(|h| h.num_values as u32);
          let body = self.take_page_bytes(data_size)?;
          let buf = self.decompress_page(body, uncompressed_size, "dictionary")?;
          self.seen_dictionary = true;
          return Ok(Some(Page::Dictionary { buf, num_values, encoding }));
        }
        Ok(PageType::DATA_PAGE) => {
          let data_header = match header.data_page_header {
            Some(ref h) => h.clone(),
            None => {
              return Err(general_err!("data page does not have data page header set"))
            }
          };
          if data_header.num_values < 0 {
            return Err(general_err!(
              "negative data page value count {}", data_header.num_values));
          }
          let body = self.take_page_bytes(data_size)?;
          let buf = self.decompress_page(body, uncompressed_size, "data")?;
          self.num_values_read += data_header.num_values as i64;
          return Ok(Some(Page::Data {
            buf,
            num_values: data_header.num_values as u32,
            encoding: Encoding::from_thrift(data_header.encoding)?,
            def_level_encoding: Encoding::from_thrift(data_header.definition_level_encoding)?,
            rep_level_encoding: Encoding::from_thrift(data_header.repetition_level_encoding)?
          }));
        }
        _ => {
          // Other page types can safely be skipped
          let _ = self.take_page_bytes(data_size)?;
        }
      }
    }
  }
}
