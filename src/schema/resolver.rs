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

//! Resolution of a logical column path onto a physical leaf of the file's
//! schema tree.
//!
//! There are three list encodings in the wild:
//!
//! 1. One-level: a bare repeated field, interpreted as a required array of
//!    required items:
//!    `repeated <item-type> item;`
//! 2. Two-level: a group containing a single repeated field which is the
//!    item:
//!    `<list-rep> group <name> { repeated <item-type> item; }`
//! 3. Three-level: the form the format specification documents. A group
//!    containing a single repeated group containing the item field:
//!    `<list-rep> group <name> { repeated group list { <item-rep> <item-type> item; } }`
//!
//! Field annotations and names are ignored, which is more permissive than
//! the specification. Maps are a three-level shape whose repeated group has
//! exactly two children.

use log::debug;

use crate::basic::Type as PhysicalType;
use crate::errors::Result;
use crate::schema::types::SchemaNode;

/// Synthetic indices used inside logical paths.
pub mod path_constants {
  /// The item of an array, below the array's own index.
  pub const ARRAY_ITEM: usize = 0;
  /// The synthetic position field of an array, below the array's index.
  pub const ARRAY_POS: usize = 1;
  pub const MAP_KEY: usize = 0;
  pub const MAP_VALUE: usize = 1;
}

/// The projected type a path step resolves through.
#[derive(Clone, Debug, PartialEq)]
pub enum ColumnType {
  Scalar(PhysicalType),
  Array(Box<ColumnType>),
  Map(Box<ColumnType>, Box<ColumnType>),
  Struct(Vec<(String, ColumnType)>)
}

impl ColumnType {
  fn child(&self, idx: usize) -> Result<&ColumnType> {
    match self {
      ColumnType::Array(item) => {
        if idx != path_constants::ARRAY_ITEM {
          return Err(schema_err!("invalid array child index {}", idx));
        }
        Ok(item)
      }
      ColumnType::Map(key, value) => match idx {
        path_constants::MAP_KEY => Ok(key),
        path_constants::MAP_VALUE => Ok(value),
        _ => Err(schema_err!("invalid map child index {}", idx))
      },
      ColumnType::Struct(fields) => fields
        .get(idx)
        .map(|(_, t)| t)
        .ok_or_else(|| schema_err!("struct has no field at index {}", idx)),
      ColumnType::Scalar(_) => Err(schema_err!("scalar type has no children"))
    }
  }
}

/// A projected top-level column of the scan.
#[derive(Clone, Debug)]
pub struct TableColumn {
  pub name: String,
  pub col_type: ColumnType
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchemaResolutionMode {
  ByName,
  ByPosition
}

#[derive(Clone, Copy, PartialEq)]
enum ArrayEncoding {
  OneLevel,
  TwoLevel,
  ThreeLevel
}

/// Result of resolving one logical path.
pub struct ResolvedPath<'a> {
  pub node: Option<&'a SchemaNode>,
  /// The path names the synthetic position field of an array.
  pub pos_field: bool,
  /// The path does not exist in this file's schema.
  pub missing_field: bool
}

impl<'a> ResolvedPath<'a> {
  fn found(node: &'a SchemaNode) -> Self {
    Self { node: Some(node), pos_field: false, missing_field: false }
  }

  fn missing() -> Self {
    Self { node: None, pos_field: false, missing_field: true }
  }

  fn position() -> Self {
    Self { node: None, pos_field: true, missing_field: false }
  }
}

pub struct PathResolver<'a> {
  root: &'a SchemaNode,
  table_columns: &'a [TableColumn],
  mode: SchemaResolutionMode,
  /// In by-position mode the first path index counts the table's partition
  /// keys, which are not materialized in the file.
  num_partition_keys: usize
}

impl<'a> PathResolver<'a> {
  pub fn new(
    root: &'a SchemaNode,
    table_columns: &'a [TableColumn],
    mode: SchemaResolutionMode,
    num_partition_keys: usize
  ) -> Self {
    Self { root, table_columns, mode, num_partition_keys }
  }

  /// Resolves `path` against the file schema. All three list encodings are
  /// attempted because many writers predate the specified three-level
  /// form: first two-level, then three-level, then one-level; the first
  /// resolution that finds a node wins.
  pub fn resolve(&self, path: &[usize]) -> Result<ResolvedPath<'a>> {
    let two_level = self.resolve_with_encoding(ArrayEncoding::TwoLevel, path);
    if let Ok(ref r) = two_level {
      if !r.missing_field {
        return two_level;
      }
    }
    let three_level = self.resolve_with_encoding(ArrayEncoding::ThreeLevel, path);
    if let Ok(ref r) = three_level {
      if !r.missing_field {
        return three_level;
      }
    }
    let one_level = self.resolve_with_encoding(ArrayEncoding::OneLevel, path);
    if let Ok(ref r) = one_level {
      if !r.missing_field {
        return one_level;
      }
    }
    // No resolution yielded a node. Report a missing field if any
    // resolution did; otherwise surface the three-level error, since that
    // is the encoding the specification documents.
    if one_level.is_ok() || two_level.is_ok() || three_level.is_ok() {
      return Ok(ResolvedPath::missing());
    }
    three_level
  }

  fn resolve_with_encoding(
    &self, encoding: ArrayEncoding, path: &[usize]
  ) -> Result<ResolvedPath<'a>> {
    assert!(!path.is_empty(), "cannot resolve an empty path");
    let mut node = self.root;
    let mut col_type: Option<&ColumnType> = None;

    for i in 0..path.len() {
      // Advance `node`, except when the previous step resolved an array in
      // one- or two-level form: there the repeated field represents both
      // the array and its item, so the item step stays put.
      let prev_is_array = matches!(col_type, Some(ColumnType::Array(_)));
      if i == 0 || !prev_is_array || encoding == ArrayEncoding::ThreeLevel {
        node = match self.next_schema_node(col_type, path, i, node)? {
          Some(n) => n,
          None => return Ok(ResolvedPath::missing())
        };
      }

      // Advance the projected type
      let table_idx = path[i];
      let current: &ColumnType = match col_type {
        None => {
          let column = self.table_columns.get(table_idx).ok_or_else(
            || schema_err!("path references table column {} of {}",
                           table_idx, self.table_columns.len()))?;
          &column.col_type
        }
        Some(ct) => ct.child(table_idx)?
      };
      col_type = Some(current);

      match current {
        ColumnType::Array(_) => {
          match self.resolve_array(encoding, path, i, node)? {
            ArrayStep::Into(n) => node = n,
            ArrayStep::Position => return Ok(ResolvedPath::position())
          }
        }
        ColumnType::Map(..) => {
          node = self.resolve_map(path, i, node)?;
        }
        ColumnType::Struct(_) => {}
        ColumnType::Scalar(expected) => {
          debug_assert_eq!(i, path.len() - 1);
          self.validate_scalar_node(node, *expected, path, i)?;
        }
      }
    }
    Ok(ResolvedPath::found(node))
  }

  fn next_schema_node(
    &self,
    col_type: Option<&ColumnType>,
    path: &[usize],
    next_idx: usize,
    node: &'a SchemaNode
  ) -> Result<Option<&'a SchemaNode>> {
    let table_idx = path[next_idx];
    let file_idx = match self.mode {
      SchemaResolutionMode::ByName => {
        match (next_idx, col_type) {
          (0, _) => {
            let column = self.table_columns.get(table_idx).ok_or_else(
              || schema_err!("path references table column {} of {}",
                             table_idx, self.table_columns.len()))?;
            find_child_with_name(node, &column.name)
          }
          (_, Some(ColumnType::Struct(fields))) => {
            let (name, _) = fields.get(table_idx).ok_or_else(
              || schema_err!("struct has no field at index {}", table_idx))?;
            find_child_with_name(node, name)
          }
          (_, Some(ColumnType::Array(_))) => {
            // Arrays have only one child in the file
            debug_assert_eq!(table_idx, path_constants::ARRAY_ITEM);
            table_idx
          }
          (_, Some(ColumnType::Map(..))) => {
            // Map children are supposed to be named "key" and "value" and
            // to be ordered, but writers disagree. Try by name, then fall
            // back to position.
            let name =
              if table_idx == path_constants::MAP_KEY { "key" } else { "value" };
            let by_name = find_child_with_name(node, name);
            if by_name >= node.children.len() { table_idx } else { by_name }
          }
          _ => table_idx
        }
      }
      SchemaResolutionMode::ByPosition => {
        if next_idx == 0 {
          // The first index in a path counts the table's partition keys.
          match table_idx.checked_sub(self.num_partition_keys) {
            Some(idx) => idx,
            None => {
              return Err(schema_err!(
                "path starts at partition key {} ({} partition keys)",
                table_idx, self.num_partition_keys))
            }
          }
        } else {
          table_idx
        }
      }
    };

    if file_idx >= node.children.len() {
      debug!(
        "file does not contain path step {} under '{}' (resolving by {})",
        table_idx, node.name(),
        if self.mode == SchemaResolutionMode::ByName { "name" } else { "position" });
      return Ok(None);
    }
    Ok(Some(&node.children[file_idx]))
  }

  fn resolve_array(
    &self,
    encoding: ArrayEncoding,
    path: &[usize],
    idx: usize,
    node: &'a SchemaNode
  ) -> Result<ArrayStep<'a>> {
    let node = match encoding {
      ArrayEncoding::OneLevel => {
        if !node.is_repeated() {
          return Err(schema_err!(
            "unrecognized one-level array schema at '{}':\n{}",
            node.name(), node.debug_string()));
        }
        node
      }
      _ => {
        // In the multi-level cases the outer group must contain a single
        // repeated field.
        if node.children.len() != 1 || !node.children[0].is_repeated() {
          return Err(schema_err!(
            "unrecognized array schema at '{}':\n{}", node.name(), node.debug_string()));
        }
        &node.children[0]
      }
    };

    if idx + 1 < path.len() && path[idx + 1] == path_constants::ARRAY_POS {
      debug_assert_eq!(path.len(), idx + 2, "position field cannot have children");
      return Ok(ArrayStep::Position);
    }
    Ok(ArrayStep::Into(node))
  }

  fn resolve_map(
    &self, _path: &[usize], _idx: usize, node: &'a SchemaNode
  ) -> Result<&'a SchemaNode> {
    if node.children.len() != 1
      || !node.children[0].is_repeated()
      || node.children[0].children.len() != 2
    {
      return Err(schema_err!(
        "unrecognized map schema at '{}':\n{}", node.name(), node.debug_string()));
    }
    Ok(&node.children[0])
  }

  fn validate_scalar_node(
    &self, node: &SchemaNode, expected: PhysicalType, path: &[usize], idx: usize
  ) -> Result<()> {
    if !node.children.is_empty() {
      return Err(schema_err!(
        "path step {} expects a scalar but '{}' is a group", idx, node.name()));
    }
    let physical = node.physical_type()?;
    if physical != expected {
      return Err(schema_err!(
        "path {:?} expects {} but '{}' has physical type {}",
        path, expected, node.name(), physical));
    }
    Ok(())
  }
}

enum ArrayStep<'a> {
  Into(&'a SchemaNode),
  Position
}

fn find_child_with_name(node: &SchemaNode, name: &str) -> usize {
  node.children.iter().position(|c| c.element.name == name).unwrap_or(node.children.len())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::format::metadata::SchemaElement;
  use crate::schema::types::build_schema_tree;

  fn group(name: &str, repetition: Option<i32>, num_children: i32) -> SchemaElement {
    SchemaElement {
      name: name.to_owned(),
      repetition_type: repetition,
      num_children: Some(num_children),
      ..Default::default()
    }
  }

  fn leaf(name: &str, repetition: i32, physical: i32) -> SchemaElement {
    SchemaElement {
      name: name.to_owned(),
      repetition_type: Some(repetition),
      type_: Some(physical),
      ..Default::default()
    }
  }

  fn int_array_column(name: &str) -> TableColumn {
    TableColumn {
      name: name.to_owned(),
      col_type: ColumnType::Array(Box::new(ColumnType::Scalar(PhysicalType::INT32)))
    }
  }

  #[test]
  fn test_resolve_top_level_by_name_and_position() {
    // message schema { required int32 a; optional int64 b; }
    let root = build_schema_tree(&[
      group("schema", None, 2),
      leaf("a", 0, 1),
      leaf("b", 1, 2),
    ]).unwrap();
    let columns = vec![
      TableColumn { name: "b".to_owned(), col_type: ColumnType::Scalar(PhysicalType::INT64) },
      TableColumn { name: "a".to_owned(), col_type: ColumnType::Scalar(PhysicalType::INT32) },
    ];

    let resolver =
      PathResolver::new(&root, &columns, SchemaResolutionMode::ByName, 0);
    let result = resolver.resolve(&[0]).unwrap();
    assert_eq!(result.node.unwrap().name(), "b");
    let result = resolver.resolve(&[1]).unwrap();
    assert_eq!(result.node.unwrap().name(), "a");

    // By position, projected order maps onto file order
    let columns_by_pos = vec![
      TableColumn { name: "x".to_owned(), col_type: ColumnType::Scalar(PhysicalType::INT32) },
      TableColumn { name: "y".to_owned(), col_type: ColumnType::Scalar(PhysicalType::INT64) },
    ];
    let resolver =
      PathResolver::new(&root, &columns_by_pos, SchemaResolutionMode::ByPosition, 0);
    let result = resolver.resolve(&[0]).unwrap();
    assert_eq!(result.node.unwrap().name(), "a");
  }

  #[test]
  fn test_resolve_missing_field() {
    let root = build_schema_tree(&[
      group("schema", None, 1),
      leaf("a", 0, 1),
    ]).unwrap();
    let columns = vec![
      TableColumn { name: "nope".to_owned(), col_type: ColumnType::Scalar(PhysicalType::INT32) },
    ];
    let resolver = PathResolver::new(&root, &columns, SchemaResolutionMode::ByName, 0);
    let result = resolver.resolve(&[0]).unwrap();
    assert!(result.missing_field);
    assert!(result.node.is_none());
  }

  #[test]
  fn test_resolve_type_mismatch_is_error() {
    let root = build_schema_tree(&[
      group("schema", None, 1),
      leaf("a", 0, 1),
    ]).unwrap();
    let columns = vec![
      TableColumn { name: "a".to_owned(), col_type: ColumnType::Scalar(PhysicalType::INT64) },
    ];
    let resolver = PathResolver::new(&root, &columns, SchemaResolutionMode::ByName, 0);
    assert!(resolver.resolve(&[0]).is_err());
  }

  #[test]
  fn test_resolve_one_level_array() {
    // message schema { repeated int32 vals; }
    let root = build_schema_tree(&[
      group("schema", None, 1),
      leaf("vals", 2, 1),
    ]).unwrap();
    let columns = vec![int_array_column("vals")];
    let resolver = PathResolver::new(&root, &columns, SchemaResolutionMode::ByName, 0);

    // The array itself resolves to the repeated leaf
    let result = resolver.resolve(&[0]).unwrap();
    let node = result.node.unwrap();
    assert_eq!(node.name(), "vals");
    assert!(node.is_repeated());

    // ... and so does its item
    let result = resolver.resolve(&[0, path_constants::ARRAY_ITEM]).unwrap();
    assert_eq!(result.node.unwrap().name(), "vals");
  }

  #[test]
  fn test_resolve_two_level_array() {
    // message schema { optional group a { repeated int32 item; } }
    let root = build_schema_tree(&[
      group("schema", None, 1),
      group("a", Some(1), 1),
      leaf("item", 2, 1),
    ]).unwrap();
    let columns = vec![int_array_column("a")];
    let resolver = PathResolver::new(&root, &columns, SchemaResolutionMode::ByName, 0);

    let result = resolver.resolve(&[0, path_constants::ARRAY_ITEM]).unwrap();
    let node = result.node.unwrap();
    assert_eq!(node.name(), "item");
    assert_eq!(node.max_rep_level, 1);
    assert_eq!(node.max_def_level, 2);
  }

  #[test]
  fn test_resolve_three_level_array() {
    // message schema { optional group a (LIST) { repeated group list { optional int32 item; } } }
    let root = build_schema_tree(&[
      group("schema", None, 1),
      group("a", Some(1), 1),
      group("list", Some(2), 1),
      leaf("item", 1, 1),
    ]).unwrap();
    let columns = vec![int_array_column("a")];
    let resolver = PathResolver::new(&root, &columns, SchemaResolutionMode::ByName, 0);

    let result = resolver.resolve(&[0, path_constants::ARRAY_ITEM]).unwrap();
    let node = result.node.unwrap();
    assert_eq!(node.name(), "item");
    assert_eq!(node.max_def_level, 3);
  }

  #[test]
  fn test_resolve_array_position_field() {
    let root = build_schema_tree(&[
      group("schema", None, 1),
      group("a", Some(1), 1),
      leaf("item", 2, 1),
    ]).unwrap();
    let columns = vec![int_array_column("a")];
    let resolver = PathResolver::new(&root, &columns, SchemaResolutionMode::ByName, 0);

    let result = resolver.resolve(&[0, path_constants::ARRAY_POS]).unwrap();
    assert!(result.pos_field);
    assert!(result.node.is_none());
  }

  #[test]
  fn test_resolve_map_key_value() {
    // message schema { optional group m (MAP) { repeated group key_value {
    //   required byte_array key; optional int32 value; } } }
    let root = build_schema_tree(&[
      group("schema", None, 1),
      group("m", Some(1), 1),
      group("key_value", Some(2), 2),
      leaf("key", 0, 6),
      leaf("value", 1, 1),
    ]).unwrap();
    let columns = vec![TableColumn {
      name: "m".to_owned(),
      col_type: ColumnType::Map(
        Box::new(ColumnType::Scalar(PhysicalType::BYTE_ARRAY)),
        Box::new(ColumnType::Scalar(PhysicalType::INT32)))
    }];
    let resolver = PathResolver::new(&root, &columns, SchemaResolutionMode::ByName, 0);

    let result = resolver.resolve(&[0, path_constants::MAP_KEY]).unwrap();
    assert_eq!(result.node.unwrap().name(), "key");
    let result = resolver.resolve(&[0, path_constants::MAP_VALUE]).unwrap();
    assert_eq!(result.node.unwrap().name(), "value");

    // The map node itself resolves to the repeated key_value group
    let result = resolver.resolve(&[0]).unwrap();
    assert_eq!(result.node.unwrap().name(), "key_value");
  }

  #[test]
  fn test_resolve_map_with_swapped_names_falls_back_to_position() {
    let root = build_schema_tree(&[
      group("schema", None, 1),
      group("m", Some(1), 1),
      group("key_value", Some(2), 2),
      leaf("k", 0, 6),
      leaf("v", 1, 1),
    ]).unwrap();
    let columns = vec![TableColumn {
      name: "m".to_owned(),
      col_type: ColumnType::Map(
        Box::new(ColumnType::Scalar(PhysicalType::BYTE_ARRAY)),
        Box::new(ColumnType::Scalar(PhysicalType::INT32)))
    }];
    let resolver = PathResolver::new(&root, &columns, SchemaResolutionMode::ByName, 0);

    let result = resolver.resolve(&[0, path_constants::MAP_KEY]).unwrap();
    assert_eq!(result.node.unwrap().name(), "k");
  }

  #[test]
  fn test_resolve_struct_field() {
    // message schema { optional group s { optional int32 inner; optional int64 other; } }
    let root = build_schema_tree(&[
      group("schema", None, 1),
      group("s", Some(1), 2),
      leaf("inner", 1, 1),
      leaf("other", 1, 2),
    ]).unwrap();
    let columns = vec![TableColumn {
      name: "s".to_owned(),
      col_type: ColumnType::Struct(vec![
        ("other".to_owned(), ColumnType::Scalar(PhysicalType::INT64)),
        ("inner".to_owned(), ColumnType::Scalar(PhysicalType::INT32)),
      ])
    }];
    let resolver = PathResolver::new(&root, &columns, SchemaResolutionMode::ByName, 0);

    let result = resolver.resolve(&[0, 1]).unwrap();
    assert_eq!(result.node.unwrap().name(), "inner");
    let result = resolver.resolve(&[0, 0]).unwrap();
    assert_eq!(result.node.unwrap().name(), "other");
  }

  #[test]
  fn test_by_position_skips_partition_keys() {
    let root = build_schema_tree(&[
      group("schema", None, 2),
      leaf("a", 0, 1),
      leaf("b", 1, 2),
    ]).unwrap();
    let columns = vec![
      TableColumn { name: "pk".to_owned(), col_type: ColumnType::Scalar(PhysicalType::INT32) },
      TableColumn { name: "x".to_owned(), col_type: ColumnType::Scalar(PhysicalType::INT32) },
    ];
    let resolver =
      PathResolver::new(&root, &columns, SchemaResolutionMode::ByPosition, 1);
    let result = resolver.resolve(&[1]).unwrap();
    assert_eq!(result.node.unwrap().name(), "a");
  }
}
