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

use std::fmt::Write as _;

use crate::basic::{LogicalType, Repetition, Type as PhysicalType};
use crate::errors::Result;
use crate::format::metadata::SchemaElement;

// ----------------------------------------------------------------------
// Schema tree

/// One node of the file's schema tree, reconstructed from the flat
/// `SchemaElement` array in the footer.
#[derive(Debug)]
pub struct SchemaNode {
  /// The underlying schema element.
  pub element: SchemaElement,

  /// Index into the row group's column list. Valid only on leaves.
  pub col_idx: usize,

  /// The definition level a value at this node has when it is present.
  pub max_def_level: i16,

  /// The repetition level of the innermost repeated field at or above
  /// this node.
  pub max_rep_level: i16,

  /// The definition level of the most immediate repeated ancestor of this
  /// node, exclusive of the node itself. A value's definition level below
  /// this means the surrounding collection is empty or NULL and no tuple
  /// is produced for it.
  pub ira_def_level: i16,

  pub children: Vec<SchemaNode>
}

impl SchemaNode {
  pub fn is_leaf(&self) -> bool {
    self.children.is_empty()
  }

  pub fn is_repeated(&self) -> bool {
    self.repetition() == Some(Repetition::REPEATED)
  }

  pub fn repetition(&self) -> Option<Repetition> {
    self.element.repetition_type.and_then(|r| Repetition::from_thrift(r).ok())
  }

  pub fn physical_type(&self) -> Result<PhysicalType> {
    match self.element.type_ {
      Some(t) => PhysicalType::from_thrift(t),
      None => Err(schema_err!("schema element '{}' has no physical type", self.element.name))
    }
  }

  pub fn logical_type(&self) -> Result<LogicalType> {
    LogicalType::from_thrift(self.element.converted_type)
  }

  pub fn name(&self) -> &str {
    &self.element.name
  }

  pub fn debug_string(&self) -> String {
    let mut out = String::new();
    self.write_debug(&mut out, 0);
    out
  }

  fn write_debug(&self, out: &mut String, indent: usize) {
    for _ in 0..indent {
      out.push(' ');
    }
    let repetition = match self.repetition() {
      Some(Repetition::REQUIRED) => "required",
      Some(Repetition::OPTIONAL) => "optional",
      Some(Repetition::REPEATED) => "repeated",
      None => "root"
    };
    let type_name = if self.is_leaf() {
      self.physical_type().map(|t| t.to_string()).unwrap_or_else(|_| "<invalid>".to_owned())
    } else {
      "group".to_owned()
    };
    let _ = write!(
      out, "{} {} {} [i:{} d:{} r:{}]",
      repetition, type_name, self.element.name,
      self.col_idx, self.max_def_level, self.max_rep_level);
    if !self.children.is_empty() {
      out.push_str(" {\n");
      for child in &self.children {
        child.write_debug(out, indent + 2);
        out.push('\n');
      }
      for _ in 0..indent {
        out.push(' ');
      }
      out.push('}');
    }
  }
}

/// Reconstructs the schema tree from the footer's flattened element list.
/// Definition/repetition levels and the immediate-repeated-ancestor level
/// are computed along the way by DFS.
pub fn build_schema_tree(elements: &[SchemaElement]) -> Result<SchemaNode> {
  if elements.is_empty() {
    return Err(schema_err!("schema element list is empty"));
  }
  let mut idx = 0;
  let mut col_idx = 0;
  let root = build_node(elements, 0, 0, 0, &mut idx, &mut col_idx)?;
  if idx != elements.len() {
    return Err(schema_err!(
      "could not reconstruct schema tree: consumed {} of {} elements", idx, elements.len()));
  }
  Ok(root)
}

fn build_node(
  elements: &[SchemaElement],
  mut max_def_level: i16,
  mut max_rep_level: i16,
  mut ira_def_level: i16,
  idx: &mut usize,
  col_idx: &mut usize
) -> Result<SchemaNode> {
  if *idx >= elements.len() {
    return Err(schema_err!(
      "could not reconstruct schema tree from flattened schema in file metadata"));
  }
  let element = elements[*idx].clone();
  *idx += 1;

  let num_children = element.num_children.unwrap_or(0);
  let leaf_col_idx = if num_children == 0 {
    let current = *col_idx;
    *col_idx += 1;
    current
  } else {
    0
  };

  // The immediate repeated ancestor level does not include this node, so
  // record it before folding in this node's repetition.
  let node_ira = ira_def_level;

  match element.repetition_type.map(Repetition::from_thrift).transpose()? {
    Some(Repetition::OPTIONAL) => {
      max_def_level += 1;
    }
    Some(Repetition::REPEATED) => {
      max_rep_level += 1;
      // A repeated field also adds a definition level, used to tell an
      // empty list from a list with an item in it.
      max_def_level += 1;
      ira_def_level = max_def_level;
    }
    _ => {}
  }

  let mut children = Vec::with_capacity(num_children as usize);
  for _ in 0..num_children {
    children.push(build_node(
      elements, max_def_level, max_rep_level, ira_def_level, idx, col_idx)?);
  }

  Ok(SchemaNode {
    element,
    col_idx: leaf_col_idx,
    max_def_level,
    max_rep_level,
    ira_def_level: node_ira,
    children
  })
}

/// Number of leaves (physical columns) under `node`.
pub fn count_leaves(node: &SchemaNode) -> usize {
  if node.is_leaf() {
    return 1;
  }
  node.children.iter().map(count_leaves).sum()
}
