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

//! The top-level driver for one split: footer processing, schema
//! resolution, column reader creation, row-group selection, statistics
//! pruning, column chunk I/O, and the assembly loop.
//!
//! One scanner is single-threaded over a single split. Row groups whose
//! column-offset midpoint falls inside the split are processed here;
//! everything else belongs to some other split, so every row group is
//! materialized by exactly one scanner.

use std::cell::Cell;
use std::cmp;
use std::collections::VecDeque;
use std::rc::Rc;

use byteorder::{ByteOrder, LittleEndian};
use log::{debug, warn};

use crate::basic::{Compression, Type as PhysicalType};
use crate::column::reader::{
  create_collection_reader, create_scalar_reader, reset_scalar_reader,
  scalar_reader_state, ColumnInfo, ColumnReader, ReaderContext, ScalarReaderState, SlotInfo
};
use crate::errors::{ParquetError, Result};
use crate::file::footer::parse_footer;
use crate::file::metadata::{ColumnChunkMetaData, FileVersion, RowGroupMetaData};
use crate::scan::assembler::{assemble_row_group, OutputSink};
use crate::scan::batch::{self, RowBatch, ScratchBatch, SlotType, TupleDescPtr, TupleView};
use crate::scan::expr::{ConjunctEvaluatorPtr, RuntimeFilterPtr};
use crate::scan::filter::{FilterEvaluator, LocalFilterStats};
use crate::scan::io::{IoManager, ScanRange};
use crate::scan::options::ScanOptions;
use crate::schema::resolver::{PathResolver, TableColumn};
use crate::schema::types::SchemaNode;
use crate::util::bit_util::unset_array_bit;
use crate::util::memory::{MemTracker, MemTrackerPtr};

/// Writers with the dictionary-header size bug get their column ranges
/// padded by up to this many bytes.
const MAX_DICT_HEADER_SIZE: i64 = 100;

/// Everything the host supplies for one scan.
pub struct ScanParams {
  pub options: ScanOptions,
  /// Projected top-level columns, for schema resolution.
  pub table_columns: Vec<TableColumn>,
  /// Layout of the output tuples. Slot paths are logical column paths;
  /// slots with empty paths (partition keys) are served from the template.
  pub tuple_desc: TupleDescPtr,
  /// Initial bytes of every output tuple: partition key values and
  /// default NULLs. Missing-column NULLs are folded in by the scanner.
  pub template: Option<Vec<u8>>,
  pub conjuncts: Option<ConjunctEvaluatorPtr>,
  /// Conjuncts applied to materialized collection items.
  pub collection_conjuncts: Option<ConjunctEvaluatorPtr>,
  pub filters: Vec<RuntimeFilterPtr>,
  pub num_partition_keys: usize,
  pub limit: Option<u64>,
  pub mem_limit: Option<usize>
}

pub struct RowGroupScanner<'a> {
  io: &'a dyn IoManager,
  split: ScanRange,
  params: ScanParams,
  tracker: MemTrackerPtr,
  filter_eval: FilterEvaluator,
  cancelled: Rc<Cell<bool>>,
  /// Row groups processed by this scanner, for observability.
  num_row_groups_read: u64
}

impl<'a> RowGroupScanner<'a> {
  pub fn new(io: &'a dyn IoManager, split: ScanRange, params: ScanParams) -> Self {
    let tracker = match params.mem_limit {
      Some(limit) => MemTracker::with_limit(limit),
      None => MemTracker::new()
    };
    let filter_eval = FilterEvaluator::new(params.filters.clone(), &params.options);
    Self {
      io,
      split,
      params,
      tracker,
      filter_eval,
      cancelled: Rc::new(Cell::new(false)),
      num_row_groups_read: 0
    }
  }

  /// Handle the host can set to stop the scan at the next batch boundary.
  pub fn cancellation_handle(&self) -> Rc<Cell<bool>> {
    self.cancelled.clone()
  }

  pub fn filter_stats(&self) -> &[LocalFilterStats] {
    self.filter_eval.stats()
  }

  pub fn num_row_groups_read(&self) -> u64 {
    self.num_row_groups_read
  }

  pub fn mem_tracker(&self) -> &MemTrackerPtr {
    &self.tracker
  }

  /// Runs the scan over this split and returns the produced batches, in
  /// on-disk row order. Cancellation produces a clean, partial result.
  pub fn scan(&mut self) -> Result<Vec<RowBatch>> {
    let metadata = parse_footer(self.io, self.params.options.footer_size_bytes)?;
    let file_metadata = metadata.file_metadata();

    let mut output = OutputSink::new(
      self.params.tuple_desc.clone(),
      self.params.options.batch_size,
      self.tracker.clone(),
      self.params.limit
    );

    // A scan with no materialized slots (count(*) over the table) is
    // served from the footer row count alone; no column data is read.
    if self.params.tuple_desc.num_slots() == 0 {
      output.commit_empty_rows(file_metadata.num_rows() as u64);
      return Ok(output.finish());
    }

    if file_metadata.num_rows() == 0 {
      return Ok(output.finish());
    }
    if metadata.num_row_groups() == 0 {
      return Err(general_err!(
        "invalid file: no row groups but {} rows", file_metadata.num_rows()));
    }
    if file_metadata.schema().children.is_empty() {
      return Err(general_err!("invalid file: schema has no columns"));
    }

    let ctx = self.reader_context(file_metadata.file_version());
    let (mut readers, template) =
      self.create_column_readers(file_metadata.schema(), &ctx)?;
    debug_assert!(!readers.is_empty());

    let mut scratch = ScratchBatch::new(
      self.params.tuple_desc.clone(),
      self.params.options.batch_size,
      self.tracker.clone()
    )?;

    for row_group_idx in 0..metadata.num_row_groups() {
      let row_group = metadata.row_group(row_group_idx);
      if row_group.num_rows() == 0 {
        continue;
      }
      self.validate_column_offsets(row_group)?;

      // A row group belongs to this split iff its midpoint does.
      let mid_offset = row_group_mid_offset(row_group);
      if !self.split.contains(mid_offset as u64) {
        continue;
      }

      // Statistics-based pruning comes before any column I/O is issued.
      if !self.stats_permit_row_group(row_group, &readers) {
        debug!("row group {} pruned by column statistics", row_group_idx);
        continue;
      }

      // The static partition-key tuple must pass the runtime filters, or
      // nothing in this split can.
      if let Some(ref template) = template {
        if self.filter_eval.has_filters() {
          let view = TupleView {
            desc: self.params.tuple_desc.as_ref(),
            data: template,
            var_values: &[]
          };
          if !self.filter_eval.eval_untracked(&view) {
            return Ok(output.finish());
          }
        }
      }

      self.init_columns(row_group, &mut readers, file_metadata.file_version())?;
      self.num_row_groups_read += 1;

      // Seed the readers that advance through the non-batched path.
      let mut seed_result = Ok(());
      for reader in readers.iter_mut() {
        if reader.needs_seeding_for_batched_reading() {
          seed_result = reader.next_levels();
          if seed_result.is_err() {
            break;
          }
        }
      }

      let assembled = seed_result.and_then(|_| {
        assemble_row_group(
          &mut readers,
          &mut scratch,
          template.as_deref(),
          &mut self.filter_eval,
          self.params.conjuncts.as_ref(),
          &mut output,
          &self.cancelled
        )
      });

      match assembled {
        Ok(rows_read) => {
          // A limit stop leaves the row group legitimately unfinished.
          if output.reached_limit() {
            break;
          }
          self.validate_end_of_row_group(row_group, &readers, rows_read)?;
        }
        Err(ParquetError::Cancelled) => return Ok(output.finish()),
        Err(e @ ParquetError::Resource(_)) => return Err(e),
        Err(e) => {
          if self.params.options.abort_on_error {
            return Err(e);
          }
          // Tolerable data error: give up on this row group only.
          warn!("skipping row group {}: {}", row_group_idx, e);
          continue;
        }
      }
    }
    Ok(output.finish())
  }

  fn reader_context(&self, file_version: &FileVersion) -> ReaderContext {
    ReaderContext {
      batch_size: self.params.options.batch_size,
      tracker: self.tracker.clone(),
      max_page_header_bytes: self.params.options.max_page_header_bytes,
      convert_legacy_utc_timestamps: self.params.options.convert_legacy_utc_timestamps
        && file_version.application == "parquet-mr",
      local_utc_offset_seconds: self.params.options.local_utc_offset_seconds,
      permit_missing_dict_header: requires_skipped_dict_header_check(file_version)
    }
  }

  // --------------------------------------------------------------------
  // Reader creation

  /// Creates readers for the projection. Missing fields become NULLs in
  /// the template tuple; a position slot is bound to an existing reader
  /// of the same tuple.
  fn create_column_readers(
    &self, schema: &SchemaNode, ctx: &ReaderContext
  ) -> Result<(Vec<ColumnReader>, Option<Vec<u8>>)> {
    let resolver = PathResolver::new(
      schema,
      &self.params.table_columns,
      self.params.options.schema_resolution_mode,
      self.params.num_partition_keys
    );
    let mut template = self.params.template.clone();
    let readers = create_readers_for_tuple(
      &resolver,
      schema,
      &self.params.tuple_desc,
      ctx,
      self.params.collection_conjuncts.as_ref(),
      &mut template
    )?;
    Ok((readers, template))
  }

  // --------------------------------------------------------------------
  // Row group handling

  /// The file format requires a dictionary page, when present, to precede
  /// all data pages, and every column chunk to lie within the file.
  fn validate_column_offsets(&self, row_group: &RowGroupMetaData) -> Result<()> {
    let file_length = self.io.file_length() as i64;
    for i in 0..row_group.num_columns() {
      let chunk = row_group.column(i);
      let mut col_start = chunk.data_page_offset();
      if let Some(dict_offset) = chunk.dictionary_page_offset() {
        if dict_offset >= col_start {
          return Err(general_err!(
            "metadata is corrupt: dictionary page (offset={}) must come before \
             any data pages (offset={})", dict_offset, col_start));
        }
        col_start = dict_offset;
      }
      let col_len = chunk.compressed_size();
      let col_end = col_start + col_len;
      if col_end <= 0 || col_end > file_length {
        return Err(general_err!(
          "metadata is corrupt: column {} has invalid offsets \
           (offset={}, size={}, file_size={})", i, col_start, col_len, file_length));
      }
    }
    Ok(())
  }

  /// Builds synthetic min/max tuples from the row group's column
  /// statistics and lets the conjuncts prove the row group empty. A pure
  /// hint: statistics that cannot be used leave the slot NULL.
  fn stats_permit_row_group(
    &self, row_group: &RowGroupMetaData, readers: &[ColumnReader]
  ) -> bool {
    let conjuncts = match self.params.conjuncts {
      Some(ref c) => c,
      None => return true
    };
    let desc = self.params.tuple_desc.as_ref();
    let size = desc.tuple_byte_size();
    if size == 0 {
      return true;
    }
    let mut min_tuple = vec![0u8; size];
    let mut max_tuple = vec![0u8; size];
    for slot in desc.slots() {
      batch::set_null(&mut min_tuple, slot.null_index);
      batch::set_null(&mut max_tuple, slot.null_index);
    }

    for reader in readers {
      if reader.is_collection_reader() {
        continue;
      }
      let slot = match reader.slot_info() {
        Some(s) => s.clone(),
        None => continue
      };
      let col_idx = reader.info().col_idx;
      if col_idx >= row_group.num_columns() {
        continue;
      }
      let stats = match row_group.column(col_idx).statistics() {
        Some(s) => s,
        None => continue
      };
      let (min_bytes, max_bytes) = match (&stats.min, &stats.max) {
        (Some(min), Some(max)) => (min, max),
        _ => continue
      };
      if write_stat_value(&slot, min_bytes, &mut min_tuple)
        && write_stat_value(&slot, max_bytes, &mut max_tuple)
      {
        unset_array_bit(&mut min_tuple, slot.null_index);
        unset_array_bit(&mut max_tuple, slot.null_index);
      }
    }

    let min_view = TupleView { desc, data: &min_tuple, var_values: &[] };
    let max_view = TupleView { desc, data: &max_tuple, var_values: &[] };
    conjuncts.eval_stats(&min_view, &max_view)
  }

  /// Computes and issues the column ranges for this row group, then hands
  /// each scalar reader its chunk.
  fn init_columns(
    &self,
    row_group: &RowGroupMetaData,
    readers: &mut [ColumnReader],
    file_version: &FileVersion
  ) -> Result<()> {
    let mut ranges = vec![];
    let mut plan: VecDeque<(ScanRange, i64, Compression)> = VecDeque::new();
    self.plan_columns(row_group, readers, file_version, &mut ranges, &mut plan)?;

    // Issue all the column chunks to the I/O manager and have them
    // scheduled immediately.
    self.io.add_ranges(&ranges, true)?;

    self.reset_readers(readers, &mut plan)?;
    debug_assert!(plan.is_empty());
    Ok(())
  }

  fn plan_columns(
    &self,
    row_group: &RowGroupMetaData,
    readers: &mut [ColumnReader],
    file_version: &FileVersion,
    ranges: &mut Vec<ScanRange>,
    plan: &mut VecDeque<(ScanRange, i64, Compression)>
  ) -> Result<()> {
    let file_length = self.io.file_length() as i64;
    // Chunks materializing one tuple level must agree on their value
    // count; nested levels are checked within their own recursion.
    let mut num_values: Option<i64> = None;

    for reader in readers.iter_mut() {
      if let ColumnReader::Collection(collection) = reader {
        self.plan_columns(row_group, collection.children_mut(), file_version, ranges, plan)?;
        continue;
      }

      let info = reader.info().clone();
      if info.col_idx >= row_group.num_columns() {
        return Err(general_err!(
          "column index {} out of range: row group has {} columns",
          info.col_idx, row_group.num_columns()));
      }
      let chunk = row_group.column(info.col_idx);

      match num_values {
        None => num_values = Some(chunk.num_values()),
        Some(expected) => {
          if chunk.num_values() != expected {
            return Err(general_err!(
              "column {} has {} values but other columns have {}",
              info.col_idx, chunk.num_values(), expected));
          }
        }
      }

      self.validate_column(&info, reader.slot_info(), chunk)?;

      let mut col_start = chunk.data_page_offset();
      if let Some(dict_offset) = chunk.dictionary_page_offset() {
        // Already validated against the data page offset
        col_start = dict_offset;
      }
      let mut col_len = chunk.compressed_size();
      if col_len <= 0 {
        return Err(general_err!(
          "invalid column chunk size {} for column {}", col_len, info.col_idx));
      }
      let col_end = col_start + col_len;
      if file_version.application == "parquet-mr" && file_version.version_lt(1, 2, 9) {
        // This writer did not include the dictionary page header in the
        // total sizes; pad with whatever tail bytes exist, bounded by the
        // largest possible dictionary header.
        let bytes_remaining = file_length - col_end;
        col_len += cmp::min(MAX_DICT_HEADER_SIZE, bytes_remaining);
      }

      let column_range_local = self.split.expected_local
        && col_start as u64 >= self.split.offset
        && (col_start + col_len) as u64 <= self.split.end();
      let range =
        ScanRange::with_locality(col_start as u64, col_len as u64, column_range_local);
      ranges.push(range.clone());
      plan.push_back((range, chunk.num_values(), chunk.compression()));
    }
    Ok(())
  }

  fn reset_readers(
    &self,
    readers: &mut [ColumnReader],
    plan: &mut VecDeque<(ScanRange, i64, Compression)>
  ) -> Result<()> {
    for reader in readers.iter_mut() {
      if let ColumnReader::Collection(collection) = reader {
        collection.reset();
        self.reset_readers(collection.children_mut(), plan)?;
        continue;
      }
      let (range, chunk_num_values, codec) =
        plan.pop_front().expect("plan and reader walk must agree");
      let buffer = self.io.read(&range)?;
      if (buffer.len() as u64) < range.len {
        return Err(eof_err!(
          "column range [{}, {}) returned only {} bytes",
          range.offset, range.end(), buffer.len()));
      }
      reset_scalar_reader(reader, buffer, chunk_num_values, codec)?;
    }
    Ok(())
  }

  /// Per-column validation: encodings, codec, and decimal metadata.
  fn validate_column(
    &self, info: &ColumnInfo, slot: Option<&SlotInfo>, chunk: &ColumnChunkMetaData
  ) -> Result<()> {
    for encoding in chunk.encodings() {
      if !encoding.is_supported() {
        return Err(nyi_err!(
          "unsupported encoding {} for column '{}'", encoding, info.name));
      }
    }
    match chunk.compression() {
      Compression::UNCOMPRESSED | Compression::SNAPPY | Compression::GZIP => {}
      other => {
        return Err(nyi_err!(
          "unsupported compression {} for column '{}'", other, info.name))
      }
    }

    let slot = match slot {
      Some(s) => s,
      None => return Ok(())
    };
    if let SlotType::Decimal { precision, scale, byte_width } = slot.slot_type {
      if info.physical_type != Some(PhysicalType::FIXED_LEN_BYTE_ARRAY) {
        return Err(schema_err!(
          "column '{}' should be a decimal column encoded using FIXED_LEN_BYTE_ARRAY",
          info.name));
      }
      if info.type_length <= 0 {
        return Err(schema_err!(
          "decimal column '{}' does not have type_length set", info.name));
      }
      if info.type_length as usize != byte_width {
        return Err(schema_err!(
          "decimal column '{}' has invalid type length: expecting {}, file has {}",
          info.name, byte_width, info.type_length));
      }
      match info.scale {
        None => {
          return Err(schema_err!(
            "decimal column '{}' does not have the scale set", info.name))
        }
        Some(file_scale) if file_scale != scale => {
          return Err(schema_err!(
            "decimal column '{}' scale mismatch: file {}, table {}",
            info.name, file_scale, scale));
        }
        _ => {}
      }
      match info.precision {
        None => {
          self.log_or_return(schema_err!(
            "decimal column '{}' is missing the precision", info.name))?;
        }
        Some(file_precision) if file_precision != precision => {
          self.log_or_return(schema_err!(
            "decimal column '{}' precision mismatch: file {}, table {}",
            info.name, file_precision, precision))?;
        }
        _ => {}
      }
      if !info.is_converted_decimal {
        self.log_or_return(schema_err!(
          "decimal column '{}' is missing the DECIMAL converted type", info.name))?;
      }
    } else if info.scale.is_some() || info.precision.is_some() || info.is_converted_decimal
    {
      self.log_or_return(schema_err!(
        "column '{}' carries decimal metadata but is not projected as a decimal",
        info.name))?;
    }
    Ok(())
  }

  fn log_or_return(&self, err: ParquetError) -> Result<()> {
    if self.params.options.abort_on_error {
      return Err(err);
    }
    warn!("{}", err);
    Ok(())
  }

  /// After a complete row group every scalar reader must have drained its
  /// final page and seen exactly the stated value count; flat scans must
  /// also have produced exactly the stated row count.
  fn validate_end_of_row_group(
    &self,
    row_group: &RowGroupMetaData,
    readers: &[ColumnReader],
    rows_read: u64
  ) -> Result<()> {
    let all_flat = readers.iter().all(|r| r.max_rep_level() == 0);
    if all_flat && rows_read != row_group.num_rows() as u64 {
      self.log_or_return(general_err!(
        "expected {} rows in row group but read {}", row_group.num_rows(), rows_read))?;
    }

    let mut states = vec![];
    collect_scalar_states(readers, &mut states);
    for state in states {
      if state.num_buffered_values != 0 {
        return Err(general_err!(
          "corrupt metadata: column '{}' reports {} more values in data page \
           than actually present", state.name, state.num_buffered_values));
      }
      if state.num_values_read != state.chunk_num_values {
        self.log_or_return(general_err!(
          "column '{}' stated {} values but pages delivered {}",
          state.name, state.chunk_num_values, state.num_values_read))?;
      }
    }
    Ok(())
  }
}

fn collect_scalar_states(readers: &[ColumnReader], out: &mut Vec<ScalarReaderState>) {
  for reader in readers {
    if let ColumnReader::Collection(collection) = reader {
      collect_scalar_states(collection.children(), out);
    } else if let Some(state) = scalar_reader_state(reader) {
      out.push(state);
    }
  }
}

/// Writes a statistics value into a numeric slot. Returns false when the
/// slot type or the encoded width cannot be used.
fn write_stat_value(slot: &SlotInfo, bytes: &[u8], tuple: &mut [u8]) -> bool {
  match slot.slot_type {
    SlotType::Int32 if bytes.len() >= 4 => {
      batch::write_i32(tuple, slot.tuple_offset, LittleEndian::read_i32(bytes));
      true
    }
    SlotType::BigInt if bytes.len() >= 8 => {
      batch::write_i64(tuple, slot.tuple_offset, LittleEndian::read_i64(bytes));
      true
    }
    SlotType::Float if bytes.len() >= 4 => {
      batch::write_f32(tuple, slot.tuple_offset, LittleEndian::read_f32(bytes));
      true
    }
    SlotType::Double if bytes.len() >= 8 => {
      batch::write_f64(tuple, slot.tuple_offset, LittleEndian::read_f64(bytes));
      true
    }
    _ => false
  }
}

/// The byte offset of the middle of the row group: between the first
/// column's start and the last column's end.
fn row_group_mid_offset(row_group: &RowGroupMetaData) -> i64 {
  let first = row_group.column(0);
  let start_offset = column_start_offset(first);
  let last = row_group.column(row_group.num_columns() - 1);
  let end_offset = column_start_offset(last) + last.compressed_size();
  start_offset + (end_offset - start_offset) / 2
}

fn column_start_offset(chunk: &ColumnChunkMetaData) -> i64 {
  match chunk.dictionary_page_offset() {
    Some(offset) => offset,
    None => chunk.data_page_offset()
  }
}

/// Impala 1.1 (and 1.2.0-internal) wrote dictionary pages without the
/// dictionary header block; those writers get the tolerant path.
fn requires_skipped_dict_header_check(v: &FileVersion) -> bool {
  if v.application != "impala" {
    return false;
  }
  v.version_eq(1, 1, 0) || (v.version_eq(1, 2, 0) && v.is_impala_internal)
}

/// Column facts for a scalar reader over `node`. A repeated node is its
/// own immediate repeated ancestor when read as a scalar (one- and
/// two-level list items): below its max_def_level the list is empty or
/// absent and no item tuple exists.
fn scalar_column_info(node: &SchemaNode) -> ColumnInfo {
  let mut info = ColumnInfo::from_node(node);
  if node.is_repeated() {
    info.ira_def_level = info.max_def_level;
  }
  info
}

// ----------------------------------------------------------------------
// Reader construction helpers

/// Creates the readers materializing one tuple level. Returns at least
/// one reader: projections with no resolvable columns get a counting
/// reader.
fn create_readers_for_tuple(
  resolver: &PathResolver,
  schema: &SchemaNode,
  tuple_desc: &TupleDescPtr,
  ctx: &ReaderContext,
  collection_conjuncts: Option<&ConjunctEvaluatorPtr>,
  template: &mut Option<Vec<u8>>
) -> Result<Vec<ColumnReader>> {
  let mut readers: Vec<ColumnReader> = vec![];
  let mut pos_slot: Option<SlotInfo> = None;

  for slot_desc in tuple_desc.slots() {
    let slot_info = SlotInfo {
      slot_type: slot_desc.slot_type.clone(),
      tuple_offset: slot_desc.tuple_offset,
      null_index: slot_desc.null_index
    };

    if matches!(slot_desc.slot_type, SlotType::Position) {
      debug_assert!(pos_slot.is_none(), "only one position slot per tuple");
      pos_slot = Some(slot_info);
      continue;
    }
    // Partition-key slots are served entirely from the template.
    if slot_desc.path.is_empty() {
      continue;
    }

    let resolved = resolver.resolve(&slot_desc.path)?;
    if resolved.missing_field {
      // Selecting a column that does not exist in this file: put a NULL
      // into this slot of the template tuple.
      let t = template.get_or_insert_with(|| vec![0; tuple_desc.tuple_byte_size()]);
      batch::set_null(t, slot_desc.null_index);
      continue;
    }
    if resolved.pos_field {
      debug_assert!(pos_slot.is_none(), "only one position slot per tuple");
      pos_slot = Some(slot_info);
      continue;
    }

    let node = resolved.node.expect("resolution produced a node");
    if let SlotType::Collection(ref item_desc) = slot_desc.slot_type {
      let mut item_template = None;
      let children = create_readers_for_tuple(
        resolver, schema, item_desc, ctx, collection_conjuncts, &mut item_template)?;
      let mut collection = create_collection_reader(
        ColumnInfo::from_node(node),
        Some(slot_info),
        Some(item_desc.clone()),
        item_template.map(Rc::new),
        collection_conjuncts.cloned()
      );
      if let ColumnReader::Collection(ref mut c) = collection {
        *c.children_mut() = children;
      }
      readers.push(collection);
    } else {
      readers.push(create_scalar_reader(
        scalar_column_info(node), Some(slot_info), ctx.clone())?);
    }
  }

  if readers.is_empty() {
    // Either a count over a collection, no projected column exists in
    // this file, or only a position slot was projected. One counting
    // reader drives the tuple count; no values are read from it.
    readers.push(create_counting_reader(schema, resolver, tuple_desc, ctx)?);
  }

  if let Some(pos_slot) = pos_slot {
    // Use an existing reader of this tuple to drive the position slot.
    readers[0].set_pos_slot(pos_slot);
  }

  Ok(readers)
}

/// Builds a reader that counts tuples without materializing values. The
/// least-nested scalar descendant of the target node drives it, as the
/// column with the fewest values to scan.
fn create_counting_reader(
  schema: &SchemaNode,
  resolver: &PathResolver,
  tuple_desc: &TupleDescPtr,
  ctx: &ReaderContext
) -> Result<ColumnReader> {
  // The tuple's containing node: the parent path of any projected slot,
  // or the schema root for top-level tuples.
  let parent_node: &SchemaNode =
    match tuple_desc.slots().iter().find(|s| !s.path.is_empty()) {
      Some(slot) => {
        let parent_path = &slot.path[..slot.path.len() - 1];
        if parent_path.is_empty() {
          schema
        } else {
          let resolved = resolver.resolve(parent_path)?;
          match resolved.node {
            Some(node) => node,
            None => {
              return Err(general_err!(
                "could not find a column to drive the tuple count"))
            }
          }
        }
      }
      None => schema
    };

  if parent_node.children.is_empty() {
    // A repeated scalar node represents both the collection and its item.
    return create_scalar_reader(scalar_column_info(parent_node), None, ctx.clone());
  }

  // Find a non-struct child of the parent to drive the count
  let mut target_node = &parent_node.children[0];
  while !target_node.children.is_empty() && !target_node.is_repeated() {
    target_node = &target_node.children[0];
  }

  if !target_node.is_repeated() || target_node.children.is_empty() {
    return create_scalar_reader(scalar_column_info(target_node), None, ctx.clone());
  }

  // Breadth-first search for the closest scalar descendant
  let mut queue: VecDeque<&SchemaNode> = VecDeque::new();
  queue.push_back(target_node);
  let mut leaf = target_node;
  while let Some(n) = queue.pop_front() {
    if n.children.is_empty() {
      leaf = n;
      break;
    }
    for child in &n.children {
      queue.push_back(child);
    }
  }
  debug_assert!(leaf.children.is_empty());

  let child = create_scalar_reader(scalar_column_info(leaf), None, ctx.clone())?;
  let mut collection = create_collection_reader(
    ColumnInfo::from_node(target_node), None, None, None, None);
  if let ColumnReader::Collection(ref mut c) = collection {
    c.children_mut().push(child);
  }
  Ok(collection)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::basic::Encoding;
  use crate::scan::batch::TupleDescriptor;
  use crate::scan::expr::{ConjunctEvaluator, SlotRangeFilter};
  use crate::scan::io::InMemoryIoManager;
  use crate::schema::resolver::{path_constants, ColumnType, SchemaResolutionMode};
  use crate::util::test_common::*;

  fn int_column(name: &str) -> TableColumn {
    TableColumn { name: name.to_owned(), col_type: ColumnType::Scalar(PhysicalType::INT32) }
  }

  fn string_column(name: &str) -> TableColumn {
    TableColumn {
      name: name.to_owned(),
      col_type: ColumnType::Scalar(PhysicalType::BYTE_ARRAY)
    }
  }

  fn whole_file_split(io: &InMemoryIoManager) -> ScanRange {
    ScanRange::new(0, io.file_length())
  }

  fn scan_params(
    table_columns: Vec<TableColumn>, tuple_desc: TupleDescPtr
  ) -> ScanParams {
    ScanParams {
      options: ScanOptions::default(),
      table_columns,
      tuple_desc,
      template: None,
      conjuncts: None,
      collection_conjuncts: None,
      filters: vec![],
      num_partition_keys: 0,
      limit: None,
      mem_limit: None
    }
  }

  fn collect_i32(batches: &[RowBatch], slot: usize) -> Vec<Option<i32>> {
    let mut out = vec![];
    for batch in batches {
      for row in 0..batch.num_rows {
        let view = TupleView::of_row(batch, row);
        if view.is_null(slot) {
          out.push(None);
        } else {
          out.push(Some(view.get_i32(slot)));
        }
      }
    }
    out
  }

  /// A dictionary-encoded INT32 column: 1000 rows over a 64-entry
  /// dictionary, RLE definition levels with max_def = 0.
  fn dictionary_int_file() -> Vec<u8> {
    let dict_values: Vec<i32> = (0..64).map(|i| i * 10).collect();
    let indices: Vec<u64> = (0..1000).map(|i| (i % 64) as u64).collect();
    let dict_page = build_dict_page(&plain_bytes_i32(&dict_values), 64);
    let data_page = build_data_page(
      1000, 0, &[], 0, &[],
      &dict_index_stream(6, &indices), Encoding::PLAIN_DICTIONARY);

    build_test_file(
      vec![
        schema_group("schema", None, 1),
        schema_leaf("x", 0, 1),
      ],
      vec![TestRowGroup {
        columns: vec![TestColumn {
          dict_page: Some(dict_page),
          data_pages: data_page,
          num_values: 1000,
          physical_type: 1,
          min: None,
          max: None,
          codec: Compression::UNCOMPRESSED
        }],
        num_rows: 1000
      }],
      "impala version 2.0.0"
    )
  }

  #[test]
  fn test_scan_flat_ints_dictionary() {
    // 1000 rows, one INT column, 64-entry dictionary page then one
    // PLAIN_DICTIONARY data page.
    let io = InMemoryIoManager::new(dictionary_int_file());
    let tuple_desc = TupleDescriptor::new(vec![(SlotType::Int32, vec![0])]);
    let split = whole_file_split(&io);
    let mut scanner =
      RowGroupScanner::new(&io, split, scan_params(vec![int_column("x")], tuple_desc));

    let batches = scanner.scan().expect("scan should succeed");
    let values = collect_i32(&batches, 0);
    assert_eq!(values.len(), 1000);
    for (i, v) in values.iter().enumerate() {
      assert_eq!(*v, Some(((i % 64) as i32) * 10));
    }
    assert_eq!(scanner.num_row_groups_read(), 1);
  }

  #[test]
  fn test_scan_is_deterministic() {
    // Decoding the same file twice from fresh state yields identical rows.
    let file = dictionary_int_file();
    let tuple_desc = TupleDescriptor::new(vec![(SlotType::Int32, vec![0])]);

    let io1 = InMemoryIoManager::new(file.clone());
    let split = whole_file_split(&io1);
    let mut first = RowGroupScanner::new(
      &io1, split.clone(), scan_params(vec![int_column("x")], tuple_desc.clone()));
    let io2 = InMemoryIoManager::new(file);
    let mut second =
      RowGroupScanner::new(&io2, split, scan_params(vec![int_column("x")], tuple_desc));

    let a = collect_i32(&first.scan().unwrap(), 0);
    let b = collect_i32(&second.scan().unwrap(), 0);
    assert_eq!(a, b);
  }

  #[test]
  fn test_scan_nullable_strings() {
    // 1000 rows: 700 present, 300 NULL, PLAIN variable-length values.
    let mut def_levels = vec![1i16; 700];
    def_levels.extend_from_slice(&vec![0i16; 300]);
    let present: Vec<String> = (0..700).map(|i| format!("v{}", i)).collect();
    let present_refs: Vec<&str> = present.iter().map(|s| s.as_str()).collect();
    let data_page = build_data_page(
      1000, 1, &def_levels, 0, &[],
      &plain_bytes_byte_array(&present_refs), Encoding::PLAIN);

    let file = build_test_file(
      vec![
        schema_group("schema", None, 1),
        schema_leaf("s", 1, 6),
      ],
      vec![TestRowGroup {
        columns: vec![TestColumn {
          physical_type: 6,
          ..TestColumn::plain(data_page, 1000)
        }],
        num_rows: 1000
      }],
      "impala version 2.0.0"
    );

    let io = InMemoryIoManager::new(file);
    let tuple_desc = TupleDescriptor::new(vec![(SlotType::String, vec![0])]);
    let split = whole_file_split(&io);
    let mut scanner =
      RowGroupScanner::new(&io, split, scan_params(vec![string_column("s")], tuple_desc));

    let batches = scanner.scan().expect("scan should succeed");
    let mut num_rows = 0;
    let mut num_nulls = 0;
    let mut next_present = 0;
    for batch in &batches {
      for row in 0..batch.num_rows {
        let view = TupleView::of_row(batch, row);
        if view.is_null(0) {
          num_nulls += 1;
        } else {
          assert_eq!(view.get_bytes(0), present[next_present].as_bytes());
          next_present += 1;
        }
        num_rows += 1;
      }
    }
    assert_eq!(num_rows, 1000);
    assert_eq!(num_nulls, 300);
    assert_eq!(next_present, 700);
  }

  #[test]
  fn test_scan_two_level_array_items_with_positions() {
    // optional group a { repeated int32 item } -- 100 rows with sizes
    // 0, 1, 2, ... cycling 0..=9. Positions within each array must come
    // out as 0..len-1.
    let sizes: Vec<usize> = (0..100).map(|i| i % 10).collect();
    let mut def_levels = vec![];
    let mut rep_levels = vec![];
    let mut values = vec![];
    let mut expected: Vec<(i64, i32)> = vec![];
    let mut next_value = 0i32;
    for size in &sizes {
      if *size == 0 {
        def_levels.push(1);
        rep_levels.push(0);
        continue;
      }
      for pos in 0..*size {
        def_levels.push(2);
        rep_levels.push(if pos == 0 { 0 } else { 1 });
        values.push(next_value);
        expected.push((pos as i64, next_value));
        next_value += 1;
      }
    }
    let num_levels = def_levels.len();
    let data_page = build_data_page(
      num_levels, 2, &def_levels, 1, &rep_levels,
      &plain_bytes_i32(&values), Encoding::PLAIN);

    let file = build_test_file(
      vec![
        schema_group("schema", None, 1),
        schema_group("a", Some(1), 1),
        schema_leaf("item", 2, 1),
      ],
      vec![TestRowGroup {
        columns: vec![TestColumn::plain(data_page, num_levels as i64)],
        num_rows: 100
      }],
      "impala version 2.0.0"
    );

    let io = InMemoryIoManager::new(file);
    let tuple_desc = TupleDescriptor::new(vec![
      (SlotType::Position, vec![0, path_constants::ARRAY_POS]),
      (SlotType::Int32, vec![0, path_constants::ARRAY_ITEM]),
    ]);
    let columns = vec![TableColumn {
      name: "a".to_owned(),
      col_type: ColumnType::Array(Box::new(ColumnType::Scalar(PhysicalType::INT32)))
    }];
    let split = whole_file_split(&io);
    let mut scanner = RowGroupScanner::new(&io, split, scan_params(columns, tuple_desc));

    let batches = scanner.scan().expect("scan should succeed");
    let mut got: Vec<(i64, i32)> = vec![];
    for batch in &batches {
      for row in 0..batch.num_rows {
        let view = TupleView::of_row(batch, row);
        got.push((view.get_i64(0), view.get_i32(1)));
      }
    }
    assert_eq!(got, expected);
  }

  /// Conjunct for `x < bound`, with a statistics implementation that can
  /// prove a row group empty from the column minimum.
  struct LessThanConjunct {
    slot_idx: usize,
    bound: i32
  }

  impl ConjunctEvaluator for LessThanConjunct {
    fn eval(&self, tuple: &TupleView) -> bool {
      !tuple.is_null(self.slot_idx) && tuple.get_i32(self.slot_idx) < self.bound
    }

    fn eval_stats(&self, min: &TupleView, _max: &TupleView) -> bool {
      if min.is_null(self.slot_idx) {
        return true;
      }
      min.get_i32(self.slot_idx) < self.bound
    }
  }

  #[test]
  fn test_scan_stats_skip_issues_no_column_io() {
    // Row group statistics [10, 20] with predicate x < 5: the row group
    // must be skipped without issuing any column ranges.
    let values: Vec<i32> = (10..=20).collect();
    let data_page = build_data_page(
      values.len(), 0, &[], 0, &[], &plain_bytes_i32(&values), Encoding::PLAIN);
    let file = build_test_file(
      vec![
        schema_group("schema", None, 1),
        schema_leaf("x", 0, 1),
      ],
      vec![TestRowGroup {
        columns: vec![TestColumn {
          min: Some(10i32.to_le_bytes().to_vec()),
          max: Some(20i32.to_le_bytes().to_vec()),
          ..TestColumn::plain(data_page, values.len() as i64)
        }],
        num_rows: values.len() as i64
      }],
      "impala version 2.0.0"
    );

    let io = InMemoryIoManager::new(file);
    let tuple_desc = TupleDescriptor::new(vec![(SlotType::Int32, vec![0])]);
    let split = whole_file_split(&io);
    let mut params = scan_params(vec![int_column("x")], tuple_desc);
    params.conjuncts = Some(Rc::new(LessThanConjunct { slot_idx: 0, bound: 5 }));
    let mut scanner = RowGroupScanner::new(&io, split, params);

    let batches = scanner.scan().expect("scan should succeed");
    let total: usize = batches.iter().map(|b| b.num_rows).sum();
    assert_eq!(total, 0);
    assert_eq!(io.num_issued_ranges(), 0);
    assert_eq!(scanner.num_row_groups_read(), 0);
  }

  #[test]
  fn test_scan_stats_do_not_skip_matching_row_group() {
    let values: Vec<i32> = (10..=20).collect();
    let data_page = build_data_page(
      values.len(), 0, &[], 0, &[], &plain_bytes_i32(&values), Encoding::PLAIN);
    let file = build_test_file(
      vec![
        schema_group("schema", None, 1),
        schema_leaf("x", 0, 1),
      ],
      vec![TestRowGroup {
        columns: vec![TestColumn {
          min: Some(10i32.to_le_bytes().to_vec()),
          max: Some(20i32.to_le_bytes().to_vec()),
          ..TestColumn::plain(data_page, values.len() as i64)
        }],
        num_rows: values.len() as i64
      }],
      "impala version 2.0.0"
    );

    let io = InMemoryIoManager::new(file);
    let tuple_desc = TupleDescriptor::new(vec![(SlotType::Int32, vec![0])]);
    let split = whole_file_split(&io);
    let mut params = scan_params(vec![int_column("x")], tuple_desc);
    params.conjuncts = Some(Rc::new(LessThanConjunct { slot_idx: 0, bound: 15 }));
    let mut scanner = RowGroupScanner::new(&io, split, params);

    let batches = scanner.scan().expect("scan should succeed");
    let survivors = collect_i32(&batches, 0);
    assert_eq!(survivors, (10..15).map(Some).collect::<Vec<_>>());
    assert!(io.num_issued_ranges() > 0);
  }

  fn file_with_headerless_dictionary(created_by: &str) -> Vec<u8> {
    let dict_values: Vec<i32> = vec![7, 8, 9];
    let dict_body = plain_bytes_i32(&dict_values);
    let dict_header = crate::format::metadata::PageHeader {
      type_: crate::basic::PageType::DICTIONARY_PAGE.to_thrift(),
      uncompressed_page_size: dict_body.len() as i32,
      compressed_page_size: dict_body.len() as i32,
      data_page_header: None,
      dictionary_page_header: None
    };
    let mut dict_page = serialize_page_header(&dict_header);
    dict_page.extend_from_slice(&dict_body);

    let indices: Vec<u64> = vec![0, 1, 2, 2, 1, 0];
    let data_page = build_data_page(
      6, 0, &[], 0, &[], &dict_index_stream(2, &indices), Encoding::PLAIN_DICTIONARY);

    build_test_file(
      vec![
        schema_group("schema", None, 1),
        schema_leaf("x", 0, 1),
      ],
      vec![TestRowGroup {
        columns: vec![TestColumn {
          dict_page: Some(dict_page),
          data_pages: data_page,
          num_values: 6,
          physical_type: 1,
          min: None,
          max: None,
          codec: Compression::UNCOMPRESSED
        }],
        num_rows: 6
      }],
      created_by
    )
  }

  #[test]
  fn test_scan_tolerates_impala_1_1_headerless_dictionary() {
    // The known-buggy writer omitted the dictionary header block; its
    // files must still decode.
    let io =
      InMemoryIoManager::new(file_with_headerless_dictionary("impala version 1.1.0"));
    let tuple_desc = TupleDescriptor::new(vec![(SlotType::Int32, vec![0])]);
    let split = whole_file_split(&io);
    let mut scanner =
      RowGroupScanner::new(&io, split, scan_params(vec![int_column("x")], tuple_desc));

    let batches = scanner.scan().expect("scan should succeed");
    let values = collect_i32(&batches, 0);
    assert_eq!(
      values,
      vec![Some(7), Some(8), Some(9), Some(9), Some(8), Some(7)]);
  }

  #[test]
  fn test_scan_rejects_headerless_dictionary_from_other_writers() {
    let io = InMemoryIoManager::new(
      file_with_headerless_dictionary("parquet-mr version 1.6.0"));
    let tuple_desc = TupleDescriptor::new(vec![(SlotType::Int32, vec![0])]);
    let split = whole_file_split(&io);
    let mut scanner =
      RowGroupScanner::new(&io, split, scan_params(vec![int_column("x")], tuple_desc));
    assert!(scanner.scan().is_err());
  }

  #[test]
  fn test_scan_filter_disablement_over_default_cadence() {
    // Runtime filter with a true reject rate of 2% over the first 16384
    // rows and a 10% minimum: disabled at the boundary, and subsequent
    // rows are neither considered nor rejected.
    let num_rows = 20000usize;
    let values: Vec<i32> = (0..num_rows).map(|i| (i % 50) as i32).collect();
    let mut data_pages = vec![];
    for chunk in values.chunks(4096) {
      data_pages.extend_from_slice(&build_data_page(
        chunk.len(), 0, &[], 0, &[], &plain_bytes_i32(chunk), Encoding::PLAIN));
    }
    let file = build_test_file(
      vec![
        schema_group("schema", None, 1),
        schema_leaf("x", 0, 1),
      ],
      vec![TestRowGroup {
        columns: vec![TestColumn::plain(data_pages, num_rows as i64)],
        num_rows: num_rows as i64
      }],
      "impala version 2.0.0"
    );

    let io = InMemoryIoManager::new(file);
    let tuple_desc = TupleDescriptor::new(vec![(SlotType::Int32, vec![0])]);
    let split = whole_file_split(&io);
    let mut params = scan_params(vec![int_column("x")], tuple_desc);
    // Rejects only the value 49: 2% of rows
    params.filters = vec![Rc::new(SlotRangeFilter { slot_idx: 0, min: 0, max: 48 })];
    let mut scanner = RowGroupScanner::new(&io, split, params);

    let batches = scanner.scan().expect("scan should succeed");
    let stats = scanner.filter_stats()[0].clone();
    assert!(!stats.enabled);
    assert_eq!(stats.total_possible, 16384);
    // Once disabled, every remaining row survives the filter
    let total: usize = batches.iter().map(|b| b.num_rows).sum();
    let rejected_before_disable = stats.rejected as usize;
    assert_eq!(total, num_rows - rejected_before_disable);
  }

  #[test]
  fn test_scan_zero_slot_projection_served_from_footer() {
    let io = InMemoryIoManager::new(dictionary_int_file());
    let tuple_desc = TupleDescriptor::new(vec![]);
    let split = whole_file_split(&io);
    let mut scanner =
      RowGroupScanner::new(&io, split, scan_params(vec![int_column("x")], tuple_desc));

    let batches = scanner.scan().expect("scan should succeed");
    let total: usize = batches.iter().map(|b| b.num_rows).sum();
    assert_eq!(total, 1000);
    // Served from the footer row count alone
    assert_eq!(io.num_issued_ranges(), 0);
  }

  #[test]
  fn test_scan_missing_column_becomes_null() {
    let io = InMemoryIoManager::new(dictionary_int_file());
    let tuple_desc = TupleDescriptor::new(vec![
      (SlotType::Int32, vec![0]),
      (SlotType::BigInt, vec![1]),
    ]);
    let columns = vec![int_column("x"), TableColumn {
      name: "not_in_file".to_owned(),
      col_type: ColumnType::Scalar(PhysicalType::INT64)
    }];
    let split = whole_file_split(&io);
    let mut params = scan_params(columns, tuple_desc);
    params.options = params.options.with_schema_resolution_mode(SchemaResolutionMode::ByName);
    let mut scanner = RowGroupScanner::new(&io, split, params);

    let batches = scanner.scan().expect("scan should succeed");
    let mut total = 0;
    for batch in &batches {
      for row in 0..batch.num_rows {
        let view = TupleView::of_row(batch, row);
        assert!(!view.is_null(0));
        assert!(view.is_null(1));
        total += 1;
      }
    }
    assert_eq!(total, 1000);
  }

  #[test]
  fn test_scan_row_group_split_ownership() {
    // Two row groups; a split covering only the first row group's
    // midpoint materializes exactly that row group.
    let first: Vec<i32> = (0..100).collect();
    let second: Vec<i32> = (100..200).collect();
    let page1 = build_data_page(
      100, 0, &[], 0, &[], &plain_bytes_i32(&first), Encoding::PLAIN);
    let page2 = build_data_page(
      100, 0, &[], 0, &[], &plain_bytes_i32(&second), Encoding::PLAIN);
    let file = build_test_file(
      vec![
        schema_group("schema", None, 1),
        schema_leaf("x", 0, 1),
      ],
      vec![
        TestRowGroup {
          columns: vec![TestColumn::plain(page1, 100)],
          num_rows: 100
        },
        TestRowGroup {
          columns: vec![TestColumn::plain(page2, 100)],
          num_rows: 100
        },
      ],
      "impala version 2.0.0"
    );

    let io = InMemoryIoManager::new(file);
    let file_len = io.file_length();
    let tuple_desc = TupleDescriptor::new(vec![(SlotType::Int32, vec![0])]);

    // The row groups are laid out contiguously from offset 4; splitting
    // the file in half puts one midpoint in each split.
    let half = file_len / 2;
    let mut low_scanner = RowGroupScanner::new(
      &io, ScanRange::new(0, half),
      scan_params(vec![int_column("x")], tuple_desc.clone()));
    let low = collect_i32(&low_scanner.scan().unwrap(), 0);

    let mut high_scanner = RowGroupScanner::new(
      &io, ScanRange::new(half, file_len - half),
      scan_params(vec![int_column("x")], tuple_desc));
    let high = collect_i32(&high_scanner.scan().unwrap(), 0);

    // Disjoint and covering: every row in exactly one split
    assert_eq!(low.len() + high.len(), 200);
    let mut all: Vec<i32> = low.into_iter().chain(high).map(|v| v.unwrap()).collect();
    all.sort_unstable();
    assert_eq!(all, (0..200).collect::<Vec<_>>());
  }

  #[test]
  fn test_scan_limit_stops_early() {
    let io = InMemoryIoManager::new(dictionary_int_file());
    let tuple_desc = TupleDescriptor::new(vec![(SlotType::Int32, vec![0])]);
    let split = whole_file_split(&io);
    let mut params = scan_params(vec![int_column("x")], tuple_desc);
    params.limit = Some(10);
    let mut scanner = RowGroupScanner::new(&io, split, params);

    let batches = scanner.scan().expect("scan should succeed");
    let total: usize = batches.iter().map(|b| b.num_rows).sum();
    assert_eq!(total, 10);
  }

  #[test]
  fn test_scan_cancellation_is_clean() {
    let io = InMemoryIoManager::new(dictionary_int_file());
    let tuple_desc = TupleDescriptor::new(vec![(SlotType::Int32, vec![0])]);
    let split = whole_file_split(&io);
    let mut scanner =
      RowGroupScanner::new(&io, split, scan_params(vec![int_column("x")], tuple_desc));
    scanner.cancellation_handle().set(true);

    let batches = scanner.scan().expect("cancellation is not an error");
    let total: usize = batches.iter().map(|b| b.num_rows).sum();
    assert_eq!(total, 0);
  }

  #[test]
  fn test_scan_unsupported_codec_fails() {
    let values: Vec<i32> = (0..10).collect();
    let data_page = build_data_page(
      10, 0, &[], 0, &[], &plain_bytes_i32(&values), Encoding::PLAIN);
    let file = build_test_file(
      vec![
        schema_group("schema", None, 1),
        schema_leaf("x", 0, 1),
      ],
      vec![TestRowGroup {
        columns: vec![TestColumn {
          codec: Compression::LZO,
          ..TestColumn::plain(data_page, 10)
        }],
        num_rows: 10
      }],
      "impala version 2.0.0"
    );

    let io = InMemoryIoManager::new(file);
    let tuple_desc = TupleDescriptor::new(vec![(SlotType::Int32, vec![0])]);
    let split = whole_file_split(&io);
    let mut scanner =
      RowGroupScanner::new(&io, split, scan_params(vec![int_column("x")], tuple_desc));
    assert!(scanner.scan().is_err());
  }

  #[test]
  fn test_scan_snappy_compressed_pages() {
    let values: Vec<i32> = (0..500).collect();
    let mut body = vec![];
    // Build the page body by hand so it can be compressed
    body.extend_from_slice(&plain_bytes_i32(&values));
    let mut codec =
      crate::compression::create_codec(Compression::SNAPPY).unwrap().unwrap();
    let compressed = codec.compress(&body).unwrap();

    let header = crate::format::metadata::PageHeader {
      type_: crate::basic::PageType::DATA_PAGE.to_thrift(),
      uncompressed_page_size: body.len() as i32,
      compressed_page_size: compressed.len() as i32,
      data_page_header: Some(crate::format::metadata::DataPageHeader {
        num_values: 500,
        encoding: Encoding::PLAIN.to_thrift(),
        definition_level_encoding: Encoding::RLE.to_thrift(),
        repetition_level_encoding: Encoding::RLE.to_thrift(),
        statistics: None
      }),
      dictionary_page_header: None
    };
    let mut page = serialize_page_header(&header);
    page.extend_from_slice(&compressed);

    let file = build_test_file(
      vec![
        schema_group("schema", None, 1),
        schema_leaf("x", 0, 1),
      ],
      vec![TestRowGroup {
        columns: vec![TestColumn {
          codec: Compression::SNAPPY,
          ..TestColumn::plain(page, 500)
        }],
        num_rows: 500
      }],
      "impala version 2.0.0"
    );

    let io = InMemoryIoManager::new(file);
    let tuple_desc = TupleDescriptor::new(vec![(SlotType::Int32, vec![0])]);
    let split = whole_file_split(&io);
    let mut scanner =
      RowGroupScanner::new(&io, split, scan_params(vec![int_column("x")], tuple_desc));
    let batches = scanner.scan().expect("scan should succeed");
    let values_out = collect_i32(&batches, 0);
    assert_eq!(values_out.len(), 500);
    assert_eq!(values_out[499], Some(499));
  }

  #[test]
  fn test_scan_row_count_mismatch_detected() {
    // Metadata claims 20 rows but the page only holds 10.
    let values: Vec<i32> = (0..10).collect();
    let data_page = build_data_page(
      10, 0, &[], 0, &[], &plain_bytes_i32(&values), Encoding::PLAIN);
    let file = build_test_file(
      vec![
        schema_group("schema", None, 1),
        schema_leaf("x", 0, 1),
      ],
      vec![TestRowGroup {
        columns: vec![TestColumn::plain(data_page, 20)],
        num_rows: 20
      }],
      "impala version 2.0.0"
    );

    let io = InMemoryIoManager::new(file);
    let tuple_desc = TupleDescriptor::new(vec![(SlotType::Int32, vec![0])]);
    let split = whole_file_split(&io);
    let mut scanner =
      RowGroupScanner::new(&io, split, scan_params(vec![int_column("x")], tuple_desc));
    assert!(scanner.scan().is_err());
  }
}
