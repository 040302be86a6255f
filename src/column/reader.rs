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

//! Column readers. A reader reads a logical column, not necessarily a
//! column materialized in the file: `ScalarColumnReader` decodes a
//! physical leaf; `CollectionColumnReader` reflects the level state of its
//! children to reconstruct arrays and maps.
//!
//! Readers advance one (definition, repetition) level pair at a time. The
//! current pair is exposed, and the corresponding value (if defined) can
//! be copied into a tuple slot. The batched entry points drive whole level
//! cache refills per data page and avoid per-tuple dispatch.

use std::cmp;

use crate::basic::{Compression, Encoding, Type as PhysicalType};
use crate::data_type::*;
use crate::encodings::decoding::{Decoder, DictDecoder, PlainDecoder, PlainDecoding};
use crate::encodings::levels::LevelDecoder;
use crate::errors::Result;
use crate::scan::batch::{
  self, CollectionValueBuilder, ScratchBatch, SlotType, TupleDescPtr, TupleTarget
};
use crate::scan::expr::ConjunctEvaluatorPtr;
use crate::schema::types::SchemaNode;
use crate::column::page::{Page, PageReader, SerializedPageReader};
use crate::util::memory::{BytePtr, MemPool, MemTrackerPtr};

/// Repetition level latched when the final page of the row group has been
/// exhausted.
pub const ROW_GROUP_END: i16 = i16::MIN;
pub const INVALID_LEVEL: i16 = -1;
pub const INVALID_POS: i64 = -1;

// ----------------------------------------------------------------------
// Construction-time descriptors

/// Schema facts a reader needs, copied out of the `SchemaNode` so readers
/// do not borrow the metadata.
#[derive(Clone, Debug)]
pub struct ColumnInfo {
  pub name: String,
  pub col_idx: usize,
  pub max_def_level: i16,
  pub max_rep_level: i16,
  pub ira_def_level: i16,
  pub physical_type: Option<PhysicalType>,
  pub type_length: i32,
  pub scale: Option<i32>,
  pub precision: Option<i32>,
  /// The schema element carries a DECIMAL converted type.
  pub is_converted_decimal: bool
}

impl ColumnInfo {
  pub fn from_node(node: &SchemaNode) -> Self {
    let is_converted_decimal = matches!(
      node.logical_type(), Ok(crate::basic::LogicalType::DECIMAL));
    ColumnInfo {
      name: node.name().to_owned(),
      col_idx: node.col_idx,
      max_def_level: node.max_def_level,
      max_rep_level: node.max_rep_level,
      ira_def_level: node.ira_def_level,
      physical_type: node.physical_type().ok(),
      type_length: node.element.type_length.unwrap_or(-1),
      scale: node.element.scale,
      precision: node.element.precision,
      is_converted_decimal
    }
  }
}

/// The output slot a reader materializes into.
#[derive(Clone, Debug)]
pub struct SlotInfo {
  pub slot_type: SlotType,
  pub tuple_offset: usize,
  pub null_index: usize
}

/// Shared construction context.
#[derive(Clone)]
pub struct ReaderContext {
  pub batch_size: usize,
  pub tracker: MemTrackerPtr,
  pub max_page_header_bytes: usize,
  /// Convert legacy UTC timestamps written by parquet-mr to local time.
  pub convert_legacy_utc_timestamps: bool,
  pub local_utc_offset_seconds: i64,
  /// Tolerate dictionary pages without a dictionary header block.
  pub permit_missing_dict_header: bool
}

// ----------------------------------------------------------------------
// Slot writing

/// Per-physical-type slot store. Selected once at reader construction;
/// the batched loop calls it without further dispatch.
pub trait SlotWriting: DataType {
  fn write_slot(
    value: Self::T, slot: &SlotInfo, target: &mut TupleTarget, ctx: &WriteContext
  ) -> Result<()>;
}

/// Conversion knobs consulted while writing a slot.
pub struct WriteContext {
  pub convert_timestamps: bool,
  pub utc_offset_seconds: i64
}

impl SlotWriting for BoolType {
  fn write_slot(
    value: bool, slot: &SlotInfo, target: &mut TupleTarget, _ctx: &WriteContext
  ) -> Result<()> {
    batch::write_bool(target.tuple, slot.tuple_offset, value);
    Ok(())
  }
}

impl SlotWriting for Int32Type {
  fn write_slot(
    value: i32, slot: &SlotInfo, target: &mut TupleTarget, _ctx: &WriteContext
  ) -> Result<()> {
    batch::write_i32(target.tuple, slot.tuple_offset, value);
    Ok(())
  }
}

impl SlotWriting for Int64Type {
  fn write_slot(
    value: i64, slot: &SlotInfo, target: &mut TupleTarget, _ctx: &WriteContext
  ) -> Result<()> {
    batch::write_i64(target.tuple, slot.tuple_offset, value);
    Ok(())
  }
}

impl SlotWriting for FloatType {
  fn write_slot(
    value: f32, slot: &SlotInfo, target: &mut TupleTarget, _ctx: &WriteContext
  ) -> Result<()> {
    batch::write_f32(target.tuple, slot.tuple_offset, value);
    Ok(())
  }
}

impl SlotWriting for DoubleType {
  fn write_slot(
    value: f64, slot: &SlotInfo, target: &mut TupleTarget, _ctx: &WriteContext
  ) -> Result<()> {
    batch::write_f64(target.tuple, slot.tuple_offset, value);
    Ok(())
  }
}

const NANOS_PER_DAY: i64 = 86_400_000_000_000;

impl SlotWriting for Int96Type {
  fn write_slot(
    value: Int96, slot: &SlotInfo, target: &mut TupleTarget, ctx: &WriteContext
  ) -> Result<()> {
    let converted = if ctx.convert_timestamps {
      // Shift from UTC into the host-supplied local offset, carrying
      // overflow into the julian day.
      let mut nanos = value.nanos_of_day() as i64 + ctx.utc_offset_seconds * 1_000_000_000;
      let mut day = value.julian_day() as i64;
      while nanos < 0 {
        nanos += NANOS_PER_DAY;
        day -= 1;
      }
      while nanos >= NANOS_PER_DAY {
        nanos -= NANOS_PER_DAY;
        day += 1;
      }
      Int96::from_nanos_and_day(nanos as u64, day as u32)
    } else {
      value
    };
    batch::write_int96(target.tuple, slot.tuple_offset, converted);
    Ok(())
  }
}

fn write_bytes_slot(
  value: ByteArray, slot: &SlotInfo, target: &mut TupleTarget
) -> Result<()> {
  match slot.slot_type {
    SlotType::String => {
      let len = value.len() as u32;
      let idx = push_byte_array(target, value);
      batch::write_heap_ref(target.tuple, slot.tuple_offset, idx, len);
    }
    SlotType::Varchar(max_len) => {
      let len = cmp::min(value.len(), max_len) as u32;
      let idx = push_byte_array(target, value);
      batch::write_heap_ref(target.tuple, slot.tuple_offset, idx, len);
    }
    SlotType::Char(width) => {
      // Pad or truncate to the declared width with spaces.
      let src = value.data();
      let n = cmp::min(src.len(), width);
      let dst = &mut target.tuple[slot.tuple_offset..slot.tuple_offset + width];
      dst[..n].copy_from_slice(&src[..n]);
      for b in dst[n..].iter_mut() {
        *b = b' ';
      }
    }
    SlotType::Decimal { byte_width, .. } => {
      if value.len() != byte_width {
        return Err(decode_err!(
          "decimal value of {} bytes does not match declared width {}",
          value.len(), byte_width));
      }
      let dst = &mut target.tuple[slot.tuple_offset..slot.tuple_offset + byte_width];
      dst.copy_from_slice(value.data());
    }
    ref other => {
      return Err(schema_err!("byte array value cannot fill slot {:?}", other))
    }
  }
  Ok(())
}

fn push_byte_array(target: &mut TupleTarget, value: ByteArray) -> u32 {
  // The value references page or dictionary memory; keep the reference
  // alive instead of copying the bytes.
  let ptr = match value.ptr() {
    Some(p) => p.clone(),
    None => BytePtr::new(vec![])
  };
  target.var_values.push(ptr);
  (target.var_values.len() - 1) as u32
}

impl SlotWriting for ByteArrayType {
  fn write_slot(
    value: ByteArray, slot: &SlotInfo, target: &mut TupleTarget, _ctx: &WriteContext
  ) -> Result<()> {
    write_bytes_slot(value, slot, target)
  }
}

impl SlotWriting for FixedLenByteArrayType {
  fn write_slot(
    value: ByteArray, slot: &SlotInfo, target: &mut TupleTarget, _ctx: &WriteContext
  ) -> Result<()> {
    write_bytes_slot(value, slot, target)
  }
}

// ----------------------------------------------------------------------
// Scalar column reader

/// Reads one physical column chunk: drives the page machine, the level
/// decoders and the value decoders, and materializes values (or skips
/// them, for counting readers) into tuple slots.
pub struct ScalarColumnReader<T: DataType + PlainDecoding + SlotWriting> {
  info: ColumnInfo,
  slot: Option<SlotInfo>,
  pos_slot: Option<SlotInfo>,

  page_reader: Option<SerializedPageReader>,
  def_levels: LevelDecoder,
  rep_levels: LevelDecoder,

  /// Value encoding of the current data page.
  page_encoding: Encoding,
  /// Values remaining in the current data page.
  num_buffered_values: u32,
  /// Values seen so far in this column chunk, counted per data page.
  num_values_read: i64,
  /// Value count the chunk metadata promises, for validation.
  chunk_num_values: i64,

  dict_decoder: DictDecoder<T>,
  plain_decoder: PlainDecoder<T>,

  /// Current level pair; `INVALID_LEVEL` before the first advance.
  def_level: i16,
  rep_level: i16,
  /// Next value for the position slot; reset at parent collection starts.
  pos_current_value: i64,

  write_ctx: WriteContext,
  ctx: ReaderContext
}

impl<T: DataType + PlainDecoding + SlotWriting> ScalarColumnReader<T> {
  pub fn new(info: ColumnInfo, slot: Option<SlotInfo>, ctx: ReaderContext) -> Self {
    let convert_timestamps =
      ctx.convert_legacy_utc_timestamps && T::get_physical_type() == PhysicalType::INT96;
    let type_length = match &slot {
      Some(SlotInfo { slot_type: SlotType::Decimal { byte_width, .. }, .. }) => {
        *byte_width as i32
      }
      _ => info.type_length
    };
    ScalarColumnReader {
      def_levels: LevelDecoder::new(true, ctx.batch_size, ctx.tracker.clone()),
      rep_levels: LevelDecoder::new(false, ctx.batch_size, ctx.tracker.clone()),
      page_reader: None,
      page_encoding: Encoding::PLAIN,
      num_buffered_values: 0,
      num_values_read: 0,
      chunk_num_values: 0,
      dict_decoder: DictDecoder::new(),
      plain_decoder: PlainDecoder::new(type_length),
      def_level: INVALID_LEVEL,
      rep_level: if info.max_rep_level == 0 { 0 } else { INVALID_LEVEL },
      pos_current_value: INVALID_POS,
      write_ctx: WriteContext {
        convert_timestamps,
        utc_offset_seconds: ctx.local_utc_offset_seconds
      },
      info,
      slot,
      pos_slot: None,
      ctx
    }
  }

  pub fn info(&self) -> &ColumnInfo {
    &self.info
  }

  pub fn slot(&self) -> Option<&SlotInfo> {
    self.slot.as_ref()
  }

  pub fn set_pos_slot(&mut self, slot: SlotInfo) {
    debug_assert!(self.pos_slot.is_none());
    self.pos_slot = Some(slot);
  }

  pub fn has_pos_slot(&self) -> bool {
    self.pos_slot.is_some()
  }

  fn is_materialized(&self) -> bool {
    self.slot.is_some()
  }

  fn in_collection(&self) -> bool {
    self.info.max_rep_level > 0
  }

  /// Called once per row group: hands this reader its column chunk bytes.
  pub fn reset(
    &mut self, buffer: BytePtr, chunk_num_values: i64, codec: Compression
  ) -> Result<()> {
    self.page_reader = Some(SerializedPageReader::new(
      buffer,
      chunk_num_values,
      codec,
      self.ctx.max_page_header_bytes,
      self.ctx.permit_missing_dict_header,
      self.ctx.tracker.clone()
    )?);
    self.num_buffered_values = 0;
    self.num_values_read = 0;
    self.chunk_num_values = chunk_num_values;
    self.def_level = INVALID_LEVEL;
    self.rep_level = if self.info.max_rep_level == 0 { 0 } else { INVALID_LEVEL };
    self.pos_current_value = INVALID_POS;
    self.dict_decoder.clear_dict();
    Ok(())
  }

  pub fn row_group_at_end(&self) -> bool {
    self.rep_level == ROW_GROUP_END
  }

  pub fn def_level(&self) -> i16 {
    self.def_level
  }

  pub fn rep_level(&self) -> i16 {
    self.rep_level
  }

  /// Remaining values buffered on the current page; zero after a complete
  /// row group.
  pub fn num_buffered_values(&self) -> u32 {
    self.num_buffered_values
  }

  pub fn num_values_read(&self) -> i64 {
    self.num_values_read
  }

  pub fn chunk_num_values(&self) -> i64 {
    self.chunk_num_values
  }

  pub fn decompressed_pool_mut(&mut self) -> Option<&mut MemPool> {
    self.page_reader.as_mut().map(|p| p.decompressed_pool_mut())
  }

  /// Reads the next data page, processing (or skipping) any dictionary
  /// page on the way.
  fn read_data_page(&mut self) -> Result<()> {
    debug_assert_eq!(self.num_buffered_values, 0);
    loop {
      let page = self
        .page_reader
        .as_mut()
        .expect("reset() must be called first")
        .get_next_page()?;
      match page {
        None => return Ok(()),
        Some(Page::Dictionary { buf, num_values, encoding: _ }) => {
          if !self.is_materialized() {
            // Nothing will decode values, so the dictionary is useless;
            // in addition the value type of a counting reader need not
            // match the column.
            continue;
          }
          if T::get_physical_type() == PhysicalType::BOOLEAN {
            return Err(general_err!(
              "unexpected dictionary page: dictionary is not supported for booleans"));
          }
          let dict_size = self.estimate_dict_values(&buf)?;
          self.plain_decoder.set_data(buf, dict_size)?;
          self.dict_decoder.set_dict(&mut self.plain_decoder)?;
          if let Some(expected) = num_values {
            if expected as usize != self.dict_decoder.num_entries() {
              return Err(general_err!(
                "corrupt dictionary: expected {} entries but data contained {} entries",
                expected, self.dict_decoder.num_entries()));
            }
          }
        }
        Some(Page::Data { buf, num_values, encoding, def_level_encoding, rep_level_encoding }) => {
          self.num_buffered_values = num_values;
          self.num_values_read += num_values as i64;

          let mut data = buf;
          if self.info.max_rep_level > 0 {
            let consumed = self.rep_levels.init(
              rep_level_encoding,
              self.info.max_rep_level,
              num_values as usize,
              &data
            )?;
            data = data.start_from(consumed);
          } else {
            self.rep_levels.init(
              rep_level_encoding, 0, num_values as usize, &data)?;
          }
          let consumed = self.def_levels.init(
            def_level_encoding,
            self.info.max_def_level,
            num_values as usize,
            &data
          )?;
          data = data.start_from(consumed);

          self.page_encoding = encoding;
          match encoding {
            Encoding::PLAIN => {
              self.plain_decoder.set_data(data, num_values as usize)?;
            }
            Encoding::PLAIN_DICTIONARY => {
              if self.is_materialized() {
                if !self.dict_decoder.has_dict() {
                  return Err(general_err!(
                    "corrupt file: missing dictionary page for column '{}'", self.info.name));
                }
                self.dict_decoder.set_data(data, num_values as usize)?;
              }
            }
            other => {
              return Err(general_err!(
                "unexpected encoding {} for data page of column '{}'",
                other, self.info.name))
            }
          }
          return Ok(());
        }
      }
    }
  }

  /// Number of values in a dictionary page body. For fixed-width types
  /// this is size/width; for byte arrays the page is walked.
  fn estimate_dict_values(&self, buf: &BytePtr) -> Result<usize> {
    match T::get_physical_type() {
      PhysicalType::BYTE_ARRAY => {
        let bytes = buf.as_ref();
        let mut count = 0;
        let mut pos = 0;
        while pos < bytes.len() {
          if pos + 4 > bytes.len() {
            return Err(decode_err!("corrupt dictionary page: truncated length prefix"));
          }
          let len = u32::from_le_bytes([
            bytes[pos], bytes[pos + 1], bytes[pos + 2], bytes[pos + 3]
          ]) as usize;
          pos += 4 + len;
          count += 1;
        }
        if pos != bytes.len() {
          return Err(decode_err!("corrupt dictionary page: overlapping entries"));
        }
        Ok(count)
      }
      PhysicalType::FIXED_LEN_BYTE_ARRAY => {
        let width = self.plain_decoder_type_length()?;
        Ok(buf.len() / width)
      }
      _ => {
        let width = T::get_type_size();
        debug_assert!(width > 0);
        Ok(buf.len() / width)
      }
    }
  }

  fn plain_decoder_type_length(&self) -> Result<usize> {
    let width = match &self.slot {
      Some(SlotInfo { slot_type: SlotType::Decimal { byte_width, .. }, .. }) => {
        *byte_width as i32
      }
      _ => self.info.type_length
    };
    if width <= 0 {
      return Err(decode_err!(
        "invalid fixed length {} for column '{}'", width, self.info.name));
    }
    Ok(width as usize)
  }

  /// Moves to the next page. Returns false (and latches the terminal
  /// sentinel) when the row group is exhausted.
  fn next_page(&mut self) -> Result<bool> {
    self.read_data_page()?;
    if self.num_buffered_values == 0 {
      self.rep_level = ROW_GROUP_END;
      self.def_level = INVALID_LEVEL;
      self.pos_current_value = INVALID_POS;
      return Ok(false);
    }
    Ok(true)
  }

  /// Advances the current level pair without materializing a value. Used
  /// to skip container-level NULLs and empties, and to seed readers driven
  /// through the non-batched path.
  pub fn next_levels(&mut self) -> Result<()> {
    if self.num_buffered_values == 0 && !self.next_page()? {
      return Ok(());
    }
    self.num_buffered_values -= 1;

    // Definition level is not present when the column and all enclosing
    // groups are required.
    self.def_level =
      if self.info.max_def_level == 0 { 0 } else { self.def_levels.read_level()? };

    if self.info.max_rep_level > 0 {
      self.rep_level = self.rep_levels.read_level()?;
      // Start of a new parent collection resets the position counter.
      if self.rep_level <= self.info.max_rep_level - 1 {
        self.pos_current_value = 0;
      }
    }
    Ok(())
  }

  /// Writes the synthetic position and advances it.
  fn read_position(&mut self, target: &mut TupleTarget) {
    if let Some(ref pos_slot) = self.pos_slot {
      debug_assert!(self.pos_current_value >= 0);
      batch::write_i64(target.tuple, pos_slot.tuple_offset, self.pos_current_value);
      self.pos_current_value += 1;
    }
  }

  /// Decodes the current value into the slot via the page's encoding.
  fn read_slot(&mut self, target: &mut TupleTarget) -> Result<()> {
    let slot = self.slot.as_ref().expect("read_slot() requires a materialized slot");
    let value = if self.page_encoding == Encoding::PLAIN_DICTIONARY {
      self.dict_decoder.get_one()?
    } else {
      self.plain_decoder.get_one()?
    };
    T::write_slot(value, slot, target, &self.write_ctx)
  }

  /// Non-batched read of the current value (or NULL) into `target`, then
  /// advance. The caller must have advanced to a readable position, i.e.
  /// `def_level >= ira_def_level`.
  pub fn read_value(&mut self, target: &mut TupleTarget) -> Result<()> {
    debug_assert!(self.def_level >= 0, "next_levels() must be called first");
    debug_assert!(self.def_level >= self.info.ira_def_level);
    if self.is_materialized() {
      if self.def_level >= self.info.max_def_level {
        self.read_slot(target)?;
      } else {
        let slot = self.slot.as_ref().expect("checked above");
        batch::set_null(target.tuple, slot.null_index);
      }
    }
    self.next_levels()
  }

  /// Batched materialization for columns nested in a collection: advances
  /// both level streams and fills the position slot when bound.
  pub fn read_value_batch(
    &mut self, scratch: &mut ScratchBatch, max_values: usize
  ) -> Result<usize> {
    debug_assert!(self.in_collection());
    self.read_value_batch_internal::<true>(scratch, max_values)
  }

  /// Batched materialization for top-level columns; the repetition level
  /// is implicitly zero.
  pub fn read_non_repeated_value_batch(
    &mut self, scratch: &mut ScratchBatch, max_values: usize
  ) -> Result<usize> {
    debug_assert!(!self.in_collection());
    self.read_value_batch_internal::<false>(scratch, max_values)
  }

  fn read_value_batch_internal<const IN_COLLECTION: bool>(
    &mut self, scratch: &mut ScratchBatch, max_values: usize
  ) -> Result<usize> {
    let mut val_count = 0;
    while val_count < max_values && !self.row_group_at_end() {
      // Move to the next page if the current one is drained.
      if self.num_buffered_values == 0 {
        if !self.next_page()? {
          continue;
        }
      }

      // Refill level caches when they run dry.
      let level_batch =
        cmp::min(self.ctx.batch_size, self.num_buffered_values as usize);
      if !self.def_levels.cache_has_next() {
        self.def_levels.cache_next_batch(level_batch)?;
      }
      // Repetition levels are only needed to populate the position slot;
      // top-level tuples consume one level pair per value regardless.
      if IN_COLLECTION && self.pos_slot.is_some() && !self.rep_levels.cache_has_next() {
        self.rep_levels.cache_next_batch(level_batch)?;
      }

      // Count-only readers at the top level just consume levels.
      if !self.is_materialized() && !IN_COLLECTION {
        let vals_to_add =
          cmp::min(self.def_levels.cache_remaining(), max_values - val_count);
        val_count += vals_to_add;
        self.def_levels.cache_skip_levels(vals_to_add);
        self.num_buffered_values -= vals_to_add as u32;
        continue;
      }

      let cache_start_idx = self.def_levels.cache_curr_idx();
      let produced = self.materialize_value_batch::<IN_COLLECTION>(
        scratch, val_count, max_values - val_count)?;
      val_count += produced;
      self.num_buffered_values -=
        (self.def_levels.cache_curr_idx() - cache_start_idx) as u32;
    }
    Ok(val_count)
  }

  /// Materializes values against the cached levels. Assumes a data page
  /// with remaining values and populated caches.
  fn materialize_value_batch<const IN_COLLECTION: bool>(
    &mut self, scratch: &mut ScratchBatch, tuple_start: usize, max_values: usize
  ) -> Result<usize> {
    debug_assert!(self.is_materialized() || IN_COLLECTION);
    let mut val_count = 0;
    while self.def_levels.cache_has_next() && val_count < max_values {
      let def_level = self.def_levels.cache_get_next();

      if IN_COLLECTION {
        if def_level < self.info.ira_def_level {
          // A containing repeated field is empty or NULL: no tuple, but
          // the repetition level is still consumed to keep sibling
          // readers in lockstep.
          if self.pos_slot.is_some() {
            self.rep_levels.cache_get_next();
          }
          continue;
        }
        if self.pos_slot.is_some() {
          let rep_level = self.rep_levels.cache_get_next();
          if rep_level <= self.info.max_rep_level - 1 {
            self.pos_current_value = 0;
          }
          let mut target = scratch.target_for(tuple_start + val_count);
          self.read_position(&mut target);
        }
      }

      if self.is_materialized() {
        if def_level >= self.info.max_def_level {
          let mut target = scratch.target_for(tuple_start + val_count);
          self.read_slot(&mut target)?;
        } else {
          let slot = self.slot.as_ref().expect("materialized readers have a slot");
          batch::set_null(scratch.tuple_mut(tuple_start + val_count), slot.null_index);
        }
      }

      val_count += 1;
    }
    Ok(val_count)
  }
}

// ----------------------------------------------------------------------
// Collection column reader

/// Reads a logical collection column. Collections are not materialized
/// directly in the file; this reader uses the definition and repetition
/// levels of its child readers to find the boundaries of each collection.
pub struct CollectionColumnReader {
  info: ColumnInfo,
  slot: Option<SlotInfo>,
  pos_slot: Option<SlotInfo>,

  /// Tuple layout of the collection's item tuples. Present when the
  /// collection is materialized.
  item_desc: Option<TupleDescPtr>,
  /// Initial item tuple bytes carrying missing-field NULLs.
  item_template: Option<std::rc::Rc<Vec<u8>>>,
  /// Conjuncts evaluated against each materialized item tuple.
  item_conjuncts: Option<ConjunctEvaluatorPtr>,

  /// At least one child per collection reader. Children either
  /// materialize slots of the item tuples, or a single child serves only
  /// to drive this reader's levels.
  children: Vec<ColumnReader>,

  def_level: i16,
  rep_level: i16,
  pos_current_value: i64
}

impl CollectionColumnReader {
  pub fn new(
    info: ColumnInfo,
    slot: Option<SlotInfo>,
    item_desc: Option<TupleDescPtr>,
    item_template: Option<std::rc::Rc<Vec<u8>>>,
    item_conjuncts: Option<ConjunctEvaluatorPtr>
  ) -> Self {
    debug_assert!(info.max_rep_level > 0);
    CollectionColumnReader {
      info,
      slot,
      pos_slot: None,
      item_desc,
      item_template,
      item_conjuncts,
      children: vec![],
      def_level: INVALID_LEVEL,
      rep_level: INVALID_LEVEL,
      pos_current_value: INVALID_POS
    }
  }

  pub fn info(&self) -> &ColumnInfo {
    &self.info
  }

  pub fn slot(&self) -> Option<&SlotInfo> {
    self.slot.as_ref()
  }

  pub fn children(&self) -> &[ColumnReader] {
    &self.children
  }

  pub fn children_mut(&mut self) -> &mut Vec<ColumnReader> {
    &mut self.children
  }

  pub fn set_pos_slot(&mut self, slot: SlotInfo) {
    debug_assert!(self.pos_slot.is_none());
    self.pos_slot = Some(slot);
  }

  /// The repetition level indicating that the current value begins a new
  /// collection (the previous value was the final item of the previous
  /// collection).
  pub fn new_collection_rep_level(&self) -> i16 {
    self.info.max_rep_level - 1
  }

  /// Called once per row group.
  pub fn reset(&mut self) {
    self.def_level = INVALID_LEVEL;
    self.rep_level = INVALID_LEVEL;
    self.pos_current_value = INVALID_POS;
  }

  pub fn row_group_at_end(&self) -> bool {
    self.rep_level == ROW_GROUP_END
  }

  pub fn def_level(&self) -> i16 {
    self.def_level
  }

  pub fn rep_level(&self) -> i16 {
    self.rep_level
  }

  /// Advances all children to the beginning of the next collection and
  /// mirrors their state.
  pub fn next_levels(&mut self) -> Result<()> {
    debug_assert!(!self.children.is_empty());
    let new_collection_rep_level = self.new_collection_rep_level();
    for child in self.children.iter_mut() {
      loop {
        child.next_levels()?;
        if child.row_group_at_end() || child.rep_level() <= new_collection_rep_level {
          break;
        }
      }
    }
    self.update_derived_state();
    Ok(())
  }

  /// Materializes the current collection (or NULL) into `target` and
  /// advances past it.
  pub fn read_value(&mut self, target: &mut TupleTarget) -> Result<()> {
    debug_assert!(self.def_level >= 0, "next_levels() must be called first");
    debug_assert!(self.def_level >= self.info.ira_def_level);

    if self.slot.is_none() {
      return self.next_levels();
    }
    if self.def_level >= self.info.max_def_level {
      self.read_slot(target)
    } else {
      let slot = self.slot.as_ref().expect("checked above");
      batch::set_null(target.tuple, slot.null_index);
      self.next_levels()
    }
  }

  /// Batched read driving this collection at the top level of the scan.
  /// Collections use the non-batched value path per tuple.
  pub fn read_value_batch(
    &mut self, scratch: &mut ScratchBatch, max_values: usize
  ) -> Result<usize> {
    let mut val_count = 0;
    while val_count < max_values && !self.row_group_at_end() {
      if self.def_level < self.info.ira_def_level {
        // A containing repeated field is empty or NULL
        self.next_levels()?;
        continue;
      }
      if self.pos_slot.is_some() {
        let mut target = scratch.target_for(val_count);
        self.read_position(&mut target);
      }
      let mut target = scratch.target_for(val_count);
      self.read_value(&mut target)?;
      val_count += 1;
    }
    Ok(val_count)
  }

  fn read_position(&mut self, target: &mut TupleTarget) {
    if let Some(ref pos_slot) = self.pos_slot {
      debug_assert!(self.pos_current_value >= 0);
      batch::write_i64(target.tuple, pos_slot.tuple_offset, self.pos_current_value);
      self.pos_current_value += 1;
    }
  }

  /// Recursively assembles a single collection value by reading child
  /// tuples until the children signal the end of the current collection.
  fn read_slot(&mut self, target: &mut TupleTarget) -> Result<()> {
    debug_assert!(!self.children.is_empty());
    let slot = self.slot.clone().expect("read_slot() requires a materialized slot");
    let item_desc = self
      .item_desc
      .clone()
      .expect("materialized collections have an item layout");

    let mut builder =
      CollectionValueBuilder::new(item_desc, self.item_template.clone());
    let new_collection_rep_level = self.new_collection_rep_level();
    assemble_collection(
      &mut self.children,
      new_collection_rep_level,
      self.item_conjuncts.as_ref(),
      &mut builder
    )?;

    let value = builder.finish();
    let count = value.num_tuples as u32;
    target.collections.push(value);
    let idx = (target.collections.len() - 1) as u32;
    batch::write_heap_ref(target.tuple, slot.tuple_offset, idx, count);

    // Assembling advanced the children, so only derived state needs
    // refreshing.
    self.update_derived_state();
    Ok(())
  }

  /// Mirrors the leftmost child's levels and maintains the position
  /// counter across collection boundaries.
  fn update_derived_state(&mut self) {
    let first = &self.children[0];
    self.def_level = first.def_level();
    self.rep_level = first.rep_level();

    if self.row_group_at_end() {
      self.pos_current_value = INVALID_POS;
    } else if self.rep_level <= self.info.max_rep_level - 2 {
      // The current collection is the first item in a new parent
      // collection.
      self.pos_current_value = 0;
    }
  }
}

/// Assembles item tuples from `children` into `builder` until the first
/// child's repetition level leaves the current collection.
fn assemble_collection(
  children: &mut [ColumnReader],
  new_collection_rep_level: i16,
  conjuncts: Option<&ConjunctEvaluatorPtr>,
  builder: &mut CollectionValueBuilder
) -> Result<()> {
  debug_assert!(!children.is_empty());
  debug_assert!(new_collection_rep_level >= 0);

  let mut end_of_collection =
    children[0].row_group_at_end() || children[0].rep_level() == INVALID_LEVEL;
  while !end_of_collection {
    // A tuple is produced iff the collection containing its values is
    // non-empty and non-NULL. Empty and NULL collections produce no
    // output values, whereas NULL is output for the fields of NULL
    // structs.
    let materialize_tuple =
      children[0].def_level() >= children[0].ira_def_level();

    if materialize_tuple {
      let mut target = builder.stage_tuple();
      for child in children.iter_mut() {
        debug_assert!(child.def_level() >= child.ira_def_level());
        child.read_position_into(&mut target);
        child.read_value(&mut target)?;
      }
      let keep = match conjuncts {
        Some(c) => c.eval(&builder.staged_view()),
        None => true
      };
      if keep {
        builder.commit_tuple();
      } else {
        builder.abandon_tuple();
      }
    } else {
      for child in children.iter_mut() {
        debug_assert!(child.def_level() < child.ira_def_level());
        child.next_levels()?;
      }
    }

    end_of_collection = children[0].row_group_at_end()
      || children[0].rep_level() <= new_collection_rep_level;
  }

  // All children must agree on where the collection ends
  for child in children.iter().skip(1) {
    debug_assert_eq!(child.rep_level(), children[0].rep_level());
  }
  Ok(())
}

// ----------------------------------------------------------------------
// Reader dispatch

/// Per-column dispatch over the typed readers, chosen once at reader
/// construction.
pub enum ColumnReader {
  Bool(ScalarColumnReader<BoolType>),
  Int32(ScalarColumnReader<Int32Type>),
  Int64(ScalarColumnReader<Int64Type>),
  Int96(ScalarColumnReader<Int96Type>),
  Float(ScalarColumnReader<FloatType>),
  Double(ScalarColumnReader<DoubleType>),
  ByteArray(ScalarColumnReader<ByteArrayType>),
  FixedLenByteArray(ScalarColumnReader<FixedLenByteArrayType>),
  Collection(CollectionColumnReader)
}

macro_rules! dispatch_scalar {
  ($self:ident, $reader:ident => $body:expr, $coll:ident => $coll_body:expr) => {
    match $self {
      ColumnReader::Bool($reader) => $body,
      ColumnReader::Int32($reader) => $body,
      ColumnReader::Int64($reader) => $body,
      ColumnReader::Int96($reader) => $body,
      ColumnReader::Float($reader) => $body,
      ColumnReader::Double($reader) => $body,
      ColumnReader::ByteArray($reader) => $body,
      ColumnReader::FixedLenByteArray($reader) => $body,
      ColumnReader::Collection($coll) => $coll_body
    }
  };
}

impl ColumnReader {
  pub fn is_collection_reader(&self) -> bool {
    matches!(self, ColumnReader::Collection(_))
  }

  pub fn info(&self) -> &ColumnInfo {
    dispatch_scalar!(self, r => r.info(), c => c.info())
  }

  pub fn def_level(&self) -> i16 {
    dispatch_scalar!(self, r => r.def_level(), c => c.def_level())
  }

  pub fn rep_level(&self) -> i16 {
    dispatch_scalar!(self, r => r.rep_level(), c => c.rep_level())
  }

  pub fn max_def_level(&self) -> i16 {
    self.info().max_def_level
  }

  pub fn max_rep_level(&self) -> i16 {
    self.info().max_rep_level
  }

  pub fn ira_def_level(&self) -> i16 {
    self.info().ira_def_level
  }

  pub fn row_group_at_end(&self) -> bool {
    dispatch_scalar!(self, r => r.row_group_at_end(), c => c.row_group_at_end())
  }

  /// True when this reader must be advanced once with `next_levels()`
  /// before reading values. The scalar batched paths seed themselves.
  pub fn needs_seeding_for_batched_reading(&self) -> bool {
    self.is_collection_reader()
  }

  pub fn set_pos_slot(&mut self, slot: SlotInfo) {
    dispatch_scalar!(self, r => r.set_pos_slot(slot), c => c.set_pos_slot(slot))
  }

  pub fn slot_info(&self) -> Option<&SlotInfo> {
    dispatch_scalar!(self, r => r.slot(), c => c.slot())
  }

  pub fn next_levels(&mut self) -> Result<()> {
    dispatch_scalar!(self, r => r.next_levels(), c => c.next_levels())
  }

  pub fn read_value(&mut self, target: &mut TupleTarget) -> Result<()> {
    dispatch_scalar!(self, r => r.read_value(target), c => c.read_value(target))
  }

  /// Writes the position slot for this reader if one is bound. Only
  /// meaningful on the non-batched path.
  pub fn read_position_into(&mut self, target: &mut TupleTarget) {
    dispatch_scalar!(self, r => r.read_position(target), c => c.read_position(target))
  }

  pub fn read_value_batch(
    &mut self, scratch: &mut ScratchBatch, max_values: usize
  ) -> Result<usize> {
    dispatch_scalar!(
      self,
      r => r.read_value_batch(scratch, max_values),
      c => c.read_value_batch(scratch, max_values))
  }

  pub fn read_non_repeated_value_batch(
    &mut self, scratch: &mut ScratchBatch, max_values: usize
  ) -> Result<usize> {
    dispatch_scalar!(
      self,
      r => r.read_non_repeated_value_batch(scratch, max_values),
      c => c.read_value_batch(scratch, max_values))
  }
}

/// Builds the scalar reader matching the column's physical type.
pub fn create_scalar_reader(
  info: ColumnInfo, slot: Option<SlotInfo>, ctx: ReaderContext
) -> Result<ColumnReader> {
  let physical = match info.physical_type {
    Some(t) => t,
    None => {
      return Err(schema_err!(
        "cannot create a scalar reader for group node '{}'", info.name))
    }
  };
  let reader = match physical {
    PhysicalType::BOOLEAN => {
      ColumnReader::Bool(ScalarColumnReader::new(info, slot, ctx))
    }
    PhysicalType::INT32 => {
      ColumnReader::Int32(ScalarColumnReader::new(info, slot, ctx))
    }
    PhysicalType::INT64 => {
      ColumnReader::Int64(ScalarColumnReader::new(info, slot, ctx))
    }
    PhysicalType::INT96 => {
      ColumnReader::Int96(ScalarColumnReader::new(info, slot, ctx))
    }
    PhysicalType::FLOAT => {
      ColumnReader::Float(ScalarColumnReader::new(info, slot, ctx))
    }
    PhysicalType::DOUBLE => {
      ColumnReader::Double(ScalarColumnReader::new(info, slot, ctx))
    }
    PhysicalType::BYTE_ARRAY => {
      ColumnReader::ByteArray(ScalarColumnReader::new(info, slot, ctx))
    }
    PhysicalType::FIXED_LEN_BYTE_ARRAY => {
      ColumnReader::FixedLenByteArray(ScalarColumnReader::new(info, slot, ctx))
    }
  };
  Ok(reader)
}

/// Builds a collection reader; children are attached by the caller.
pub fn create_collection_reader(
  info: ColumnInfo,
  slot: Option<SlotInfo>,
  item_desc: Option<TupleDescPtr>,
  item_template: Option<std::rc::Rc<Vec<u8>>>,
  item_conjuncts: Option<ConjunctEvaluatorPtr>
) -> ColumnReader {
  ColumnReader::Collection(CollectionColumnReader::new(
    info, slot, item_desc, item_template, item_conjuncts))
}

/// Applies `f` to every scalar reader in the tree rooted at `readers`.
pub fn for_each_scalar_reader<F>(readers: &mut [ColumnReader], f: &mut F) -> Result<()>
where F: FnMut(&mut ColumnReader) -> Result<()> {
  for reader in readers.iter_mut() {
    if let ColumnReader::Collection(collection) = reader {
      for_each_scalar_reader(collection.children_mut(), f)?;
    } else {
      f(reader)?;
    }
  }
  Ok(())
}

/// Resets one scalar reader for a row group; forwarded by the scanner.
pub fn reset_scalar_reader(
  reader: &mut ColumnReader, buffer: BytePtr, chunk_num_values: i64, codec: Compression
) -> Result<()> {
  dispatch_scalar!(
    reader,
    r => r.reset(buffer, chunk_num_values, codec),
    _c => Err(general_err!("cannot reset a collection reader with chunk data")))
}

/// Scalar-reader state used by end-of-row-group validation.
pub struct ScalarReaderState {
  pub name: String,
  pub col_idx: usize,
  pub max_rep_level: i16,
  pub num_buffered_values: u32,
  pub num_values_read: i64,
  pub chunk_num_values: i64
}

pub fn scalar_reader_state(reader: &ColumnReader) -> Option<ScalarReaderState> {
  dispatch_scalar!(
    reader,
    r => Some(ScalarReaderState {
      name: r.info().name.clone(),
      col_idx: r.info().col_idx,
      max_rep_level: r.info().max_rep_level,
      num_buffered_values: r.num_buffered_values(),
      num_values_read: r.num_values_read(),
      chunk_num_values: r.chunk_num_values()
    }),
    _c => None)
}

/// Merges each scalar reader's decompression pool into `pool`.
pub fn acquire_decompressed_pools(
  readers: &mut [ColumnReader], pool: &mut MemPool
) -> Result<()> {
  for_each_scalar_reader(readers, &mut |reader| {
    let taken = dispatch_scalar!(
      reader,
      r => r.decompressed_pool_mut().map(|p| {
        let mut moved = MemPool::new(p.mem_tracker().clone());
        moved.acquire_data(p);
        moved
      }),
      _c => None);
    if let Some(mut moved) = taken {
      pool.acquire_data(&mut moved);
    }
    Ok(())
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::scan::batch::{SlotType, TupleDescriptor, TupleView};
  use crate::util::memory::MemTracker;
  use crate::util::test_common::*;

  fn reader_ctx(batch_size: usize) -> ReaderContext {
    ReaderContext {
      batch_size,
      tracker: MemTracker::new(),
      max_page_header_bytes: 8 * 1024 * 1024,
      convert_legacy_utc_timestamps: false,
      local_utc_offset_seconds: 0,
      permit_missing_dict_header: false
    }
  }

  fn flat_info(max_def: i16, physical: PhysicalType) -> ColumnInfo {
    ColumnInfo {
      name: "c".to_owned(),
      col_idx: 0,
      max_def_level: max_def,
      max_rep_level: 0,
      ira_def_level: 0,
      physical_type: Some(physical),
      type_length: -1,
      scale: None,
      precision: None,
      is_converted_decimal: false
    }
  }

  fn int_slot(desc: &TupleDescriptor, idx: usize) -> SlotInfo {
    SlotInfo {
      slot_type: desc.slot(idx).slot_type.clone(),
      tuple_offset: desc.slot(idx).tuple_offset,
      null_index: desc.slot(idx).null_index
    }
  }

  #[test]
  fn test_flat_required_ints_plain() {
    let values: Vec<i32> = (0..100).collect();
    let page = build_data_page(
      100, 0, &[], 0, &[], &plain_bytes_i32(&values), Encoding::PLAIN);

    let desc = TupleDescriptor::new(vec![(SlotType::Int32, vec![0])]);
    let ctx = reader_ctx(32);
    let mut reader = ScalarColumnReader::<Int32Type>::new(
      flat_info(0, PhysicalType::INT32), Some(int_slot(&desc, 0)), ctx.clone());
    reader.reset(BytePtr::new(page), 100, Compression::UNCOMPRESSED).unwrap();

    let mut scratch = ScratchBatch::new(desc.clone(), 128, ctx.tracker.clone()).unwrap();
    scratch.reset(None);
    let n = reader.read_non_repeated_value_batch(&mut scratch, 128).unwrap();
    assert_eq!(n, 100);
    scratch.num_tuples = n;
    assert!(reader.row_group_at_end());
    assert_eq!(reader.num_values_read(), 100);
    assert_eq!(reader.num_buffered_values(), 0);

    for i in 0..100 {
      let view = TupleView::of_scratch(&scratch, i);
      assert!(!view.is_null(0));
      assert_eq!(view.get_i32(0), i as i32);
    }
  }

  #[test]
  fn test_nullable_strings_plain() {
    // 7 present, 3 null, interleaved
    let def_levels: Vec<i16> = vec![1, 1, 0, 1, 1, 0, 1, 1, 0, 1];
    let present: Vec<&str> = vec!["a", "bb", "ccc", "dddd", "e", "ff", "ggg"];
    let page = build_data_page(
      10, 1, &def_levels, 0, &[],
      &plain_bytes_byte_array(&present), Encoding::PLAIN);

    let desc = TupleDescriptor::new(vec![(SlotType::String, vec![0])]);
    let ctx = reader_ctx(4);
    let mut reader = ScalarColumnReader::<ByteArrayType>::new(
      flat_info(1, PhysicalType::BYTE_ARRAY), Some(int_slot(&desc, 0)), ctx.clone());
    reader.reset(BytePtr::new(page), 10, Compression::UNCOMPRESSED).unwrap();

    let mut scratch = ScratchBatch::new(desc.clone(), 16, ctx.tracker.clone()).unwrap();
    scratch.reset(None);
    let n = reader.read_non_repeated_value_batch(&mut scratch, 16).unwrap();
    assert_eq!(n, 10);
    scratch.num_tuples = n;

    let mut present_iter = present.iter();
    for (i, def) in def_levels.iter().enumerate() {
      let view = TupleView::of_scratch(&scratch, i);
      if *def == 1 {
        assert_eq!(view.get_bytes(0), present_iter.next().unwrap().as_bytes());
      } else {
        assert!(view.is_null(0));
      }
    }
  }

  #[test]
  fn test_dictionary_encoded_ints() {
    let dict_values: Vec<i32> = vec![100, 200, 300, 400];
    let indices: Vec<u64> = (0..50).map(|i| (i % 4) as u64).collect();
    let mut chunk = build_dict_page(&plain_bytes_i32(&dict_values), 4);
    chunk.extend_from_slice(&build_data_page(
      50, 0, &[], 0, &[],
      &dict_index_stream(2, &indices), Encoding::PLAIN_DICTIONARY));

    let desc = TupleDescriptor::new(vec![(SlotType::Int32, vec![0])]);
    let ctx = reader_ctx(16);
    let mut reader = ScalarColumnReader::<Int32Type>::new(
      flat_info(0, PhysicalType::INT32), Some(int_slot(&desc, 0)), ctx.clone());
    reader.reset(BytePtr::new(chunk), 50, Compression::UNCOMPRESSED).unwrap();

    let mut scratch = ScratchBatch::new(desc.clone(), 64, ctx.tracker.clone()).unwrap();
    scratch.reset(None);
    let n = reader.read_non_repeated_value_batch(&mut scratch, 64).unwrap();
    assert_eq!(n, 50);
    for i in 0..50 {
      let view = TupleView::of_scratch(&scratch, i);
      assert_eq!(view.get_i32(0), dict_values[i % 4]);
    }
  }

  #[test]
  fn test_dict_entry_count_mismatch_fails() {
    let dict_values: Vec<i32> = vec![1, 2, 3];
    // Header claims 5 entries, page holds 3
    let mut chunk = build_dict_page(&plain_bytes_i32(&dict_values), 5);
    chunk.extend_from_slice(&build_data_page(
      1, 0, &[], 0, &[], &dict_index_stream(2, &[0]), Encoding::PLAIN_DICTIONARY));

    let desc = TupleDescriptor::new(vec![(SlotType::Int32, vec![0])]);
    let ctx = reader_ctx(16);
    let mut reader = ScalarColumnReader::<Int32Type>::new(
      flat_info(0, PhysicalType::INT32), Some(int_slot(&desc, 0)), ctx.clone());
    reader.reset(BytePtr::new(chunk), 1, Compression::UNCOMPRESSED).unwrap();

    let mut scratch = ScratchBatch::new(desc.clone(), 4, ctx.tracker.clone()).unwrap();
    scratch.reset(None);
    assert!(reader.read_non_repeated_value_batch(&mut scratch, 4).is_err());
  }

  #[test]
  fn test_data_page_without_dictionary_fails() {
    let chunk = build_data_page(
      1, 0, &[], 0, &[], &dict_index_stream(1, &[0]), Encoding::PLAIN_DICTIONARY);

    let desc = TupleDescriptor::new(vec![(SlotType::Int32, vec![0])]);
    let ctx = reader_ctx(16);
    let mut reader = ScalarColumnReader::<Int32Type>::new(
      flat_info(0, PhysicalType::INT32), Some(int_slot(&desc, 0)), ctx.clone());
    reader.reset(BytePtr::new(chunk), 1, Compression::UNCOMPRESSED).unwrap();

    let mut scratch = ScratchBatch::new(desc.clone(), 4, ctx.tracker.clone()).unwrap();
    scratch.reset(None);
    let err = reader.read_non_repeated_value_batch(&mut scratch, 4).unwrap_err();
    assert!(err.to_string().contains("missing dictionary page"), "{}", err);
  }

  #[test]
  fn test_counting_reader_consumes_levels_only() {
    let values: Vec<i32> = (0..40).collect();
    let page = build_data_page(
      40, 0, &[], 0, &[], &plain_bytes_i32(&values), Encoding::PLAIN);

    let desc = TupleDescriptor::new(vec![]);
    let ctx = reader_ctx(16);
    let mut reader = ScalarColumnReader::<Int32Type>::new(
      flat_info(0, PhysicalType::INT32), None, ctx.clone());
    reader.reset(BytePtr::new(page), 40, Compression::UNCOMPRESSED).unwrap();

    let mut scratch = ScratchBatch::new(desc, 64, ctx.tracker.clone()).unwrap();
    scratch.reset(None);
    let n = reader.read_non_repeated_value_batch(&mut scratch, 64).unwrap();
    assert_eq!(n, 40);
    assert!(reader.row_group_at_end());
  }

  #[test]
  fn test_char_padding() {
    let page = build_data_page(
      2, 0, &[], 0, &[],
      &plain_bytes_byte_array(&["hi", "too long"]), Encoding::PLAIN);

    let desc = TupleDescriptor::new(vec![(SlotType::Char(5), vec![0])]);
    let ctx = reader_ctx(16);
    let mut reader = ScalarColumnReader::<ByteArrayType>::new(
      flat_info(0, PhysicalType::BYTE_ARRAY), Some(int_slot(&desc, 0)), ctx.clone());
    reader.reset(BytePtr::new(page), 2, Compression::UNCOMPRESSED).unwrap();

    let mut scratch = ScratchBatch::new(desc.clone(), 4, ctx.tracker.clone()).unwrap();
    scratch.reset(None);
    let n = reader.read_non_repeated_value_batch(&mut scratch, 4).unwrap();
    assert_eq!(n, 2);
    assert_eq!(TupleView::of_scratch(&scratch, 0).get_bytes(0), b"hi   ");
    assert_eq!(TupleView::of_scratch(&scratch, 1).get_bytes(0), b"too l");
  }

  #[test]
  fn test_legacy_timestamp_conversion() {
    // One timestamp at 01:00:00 on julian day 2451545, written as UTC;
    // converting with a -2h offset must roll back to the previous day.
    let ts = Int96::from_nanos_and_day(3_600_000_000_000, 2451545);
    let mut value_bytes = vec![];
    for w in ts.data() {
      value_bytes.extend_from_slice(&w.to_le_bytes());
    }
    let page = build_data_page(1, 0, &[], 0, &[], &value_bytes, Encoding::PLAIN);

    let desc = TupleDescriptor::new(vec![(SlotType::Timestamp, vec![0])]);
    let mut ctx = reader_ctx(16);
    ctx.convert_legacy_utc_timestamps = true;
    ctx.local_utc_offset_seconds = -2 * 3600;
    let mut reader = ScalarColumnReader::<Int96Type>::new(
      flat_info(0, PhysicalType::INT96), Some(int_slot(&desc, 0)), ctx.clone());
    reader.reset(BytePtr::new(page), 1, Compression::UNCOMPRESSED).unwrap();

    let mut scratch = ScratchBatch::new(desc.clone(), 4, ctx.tracker.clone()).unwrap();
    scratch.reset(None);
    let n = reader.read_non_repeated_value_batch(&mut scratch, 4).unwrap();
    assert_eq!(n, 1);
    let got = TupleView::of_scratch(&scratch, 0).get_int96(0);
    assert_eq!(got.julian_day(), 2451544);
    assert_eq!(got.nanos_of_day(), 23 * 3600 * 1_000_000_000);
  }

  #[test]
  fn test_multiple_pages_in_chunk() {
    let mut chunk = vec![];
    for page_idx in 0..3 {
      let values: Vec<i32> = (page_idx * 10..(page_idx + 1) * 10).collect();
      chunk.extend_from_slice(&build_data_page(
        10, 0, &[], 0, &[], &plain_bytes_i32(&values), Encoding::PLAIN));
    }

    let desc = TupleDescriptor::new(vec![(SlotType::Int32, vec![0])]);
    let ctx = reader_ctx(8);
    let mut reader = ScalarColumnReader::<Int32Type>::new(
      flat_info(0, PhysicalType::INT32), Some(int_slot(&desc, 0)), ctx.clone());
    reader.reset(BytePtr::new(chunk), 30, Compression::UNCOMPRESSED).unwrap();

    let mut scratch = ScratchBatch::new(desc.clone(), 64, ctx.tracker.clone()).unwrap();
    scratch.reset(None);
    let n = reader.read_non_repeated_value_batch(&mut scratch, 64).unwrap();
    assert_eq!(n, 30);
    for i in 0..30 {
      assert_eq!(TupleView::of_scratch(&scratch, i).get_i32(0), i as i32);
    }
  }

  #[test]
  fn test_array_items_with_position_slot() {
    // Two-level array of int: optional group a { repeated int32 item }
    // max_def = 2, max_rep = 1, ira = 2 for the item column.
    // Rows: [10, 20], [], [30]
    // item levels: (d2,r0) (d2,r1) (d1,r0) (d2,r0)
    let def_levels = vec![2, 2, 1, 2];
    let rep_levels = vec![0, 1, 0, 0];
    let values = vec![10, 20, 30];
    let page = build_data_page(
      4, 2, &def_levels, 1, &rep_levels,
      &plain_bytes_i32(&values), Encoding::PLAIN);

    // Item tuple: position slot and value slot
    let desc = TupleDescriptor::new(vec![
      (SlotType::Position, vec![]),
      (SlotType::Int32, vec![0, 0]),
    ]);
    let ctx = reader_ctx(8);
    let info = ColumnInfo {
      name: "item".to_owned(),
      col_idx: 0,
      max_def_level: 2,
      max_rep_level: 1,
      ira_def_level: 2,
      physical_type: Some(PhysicalType::INT32),
      type_length: -1,
      scale: None,
      precision: None,
      is_converted_decimal: false
    };
    let mut reader = ScalarColumnReader::<Int32Type>::new(
      info, Some(int_slot(&desc, 1)), ctx.clone());
    reader.set_pos_slot(int_slot(&desc, 0));
    reader.reset(BytePtr::new(page), 4, Compression::UNCOMPRESSED).unwrap();

    let mut scratch = ScratchBatch::new(desc.clone(), 16, ctx.tracker.clone()).unwrap();
    scratch.reset(None);
    let n = reader.read_value_batch(&mut scratch, 16).unwrap();
    // The empty array produces no item tuple
    assert_eq!(n, 3);

    let expected: Vec<(i64, i32)> = vec![(0, 10), (1, 20), (0, 30)];
    for (i, (pos, value)) in expected.iter().enumerate() {
      let view = TupleView::of_scratch(&scratch, i);
      assert_eq!(view.get_i64(0), *pos, "position of item {}", i);
      assert_eq!(view.get_i32(1), *value, "value of item {}", i);
    }
    assert!(reader.row_group_at_end());
  }

  #[test]
  fn test_collection_reader_assembles_arrays() {
    // Same file shape as above; now materialize the array column itself.
    // Rows: [10, 20], [], NULL, [30]
    // item levels: (d2,r0) (d2,r1) (d1,r0) (d0,r0) (d2,r0)
    let def_levels = vec![2, 2, 1, 0, 2];
    let rep_levels = vec![0, 1, 0, 0, 0];
    let values = vec![10, 20, 30];
    let page = build_data_page(
      5, 2, &def_levels, 1, &rep_levels,
      &plain_bytes_i32(&values), Encoding::PLAIN);

    // Top-level tuple: one collection slot. Item tuple: one int slot.
    let item_desc = TupleDescriptor::new(vec![(SlotType::Int32, vec![0, 0])]);
    let top_desc =
      TupleDescriptor::new(vec![(SlotType::Collection(item_desc.clone()), vec![0])]);

    let ctx = reader_ctx(8);
    let item_info = ColumnInfo {
      name: "item".to_owned(),
      col_idx: 0,
      max_def_level: 2,
      max_rep_level: 1,
      ira_def_level: 2,
      physical_type: Some(PhysicalType::INT32),
      type_length: -1,
      scale: None,
      precision: None,
      is_converted_decimal: false
    };
    let coll_info = ColumnInfo {
      name: "a".to_owned(),
      col_idx: 0,
      max_def_level: 2,
      max_rep_level: 1,
      // The array's own immediate repeated ancestor is the record root
      ira_def_level: 0,
      physical_type: None,
      type_length: -1,
      scale: None,
      precision: None,
      is_converted_decimal: false
    };

    let mut item_reader = ScalarColumnReader::<Int32Type>::new(
      item_info, Some(int_slot(&item_desc, 0)), ctx.clone());
    item_reader.reset(BytePtr::new(page), 5, Compression::UNCOMPRESSED).unwrap();

    let mut collection = CollectionColumnReader::new(
      coll_info,
      Some(int_slot(&top_desc, 0)),
      Some(item_desc.clone()),
      None,
      None
    );
    collection.children_mut().push(ColumnReader::Int32(item_reader));
    collection.reset();

    // Seed, then read one collection per tuple
    collection.next_levels().unwrap();
    let mut scratch = ScratchBatch::new(top_desc.clone(), 16, ctx.tracker.clone()).unwrap();
    scratch.reset(None);
    let n = collection.read_value_batch(&mut scratch, 16).unwrap();
    assert_eq!(n, 4);
    scratch.num_tuples = n;

    // The present-but-empty array surfaces as NULL: the collection slot is
    // defined only when at least one item level reaches max_def_level.
    let expected: Vec<Option<Vec<i32>>> =
      vec![Some(vec![10, 20]), None, None, Some(vec![30])];
    for (i, want) in expected.iter().enumerate() {
      let view = TupleView::of_scratch(&scratch, i);
      match want {
        None => assert!(view.is_null(0), "row {} should be NULL", i),
        Some(items) => {
          assert!(!view.is_null(0), "row {} should be non-NULL", i);
          let (coll_idx, count) = view.get_collection_ref(0);
          assert_eq!(count as usize, items.len(), "row {}", i);
          let coll = &scratch.collections[coll_idx as usize];
          for (j, item) in items.iter().enumerate() {
            let tuple = coll.tuple(&item_desc, j);
            assert_eq!(batch::read_i32(tuple, item_desc.slot(0).tuple_offset), *item);
          }
        }
      }
    }
    assert!(collection.row_group_at_end());
  }
}
