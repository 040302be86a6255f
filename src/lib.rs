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

//! A column-oriented Parquet row-group reader.
//!
//! Given a file footer and a query-driven projection, the scanner decodes
//! the selected columns of each row group assigned to its split into dense
//! batches of output tuples, reconstructing nested collections from
//! definition/repetition levels and applying runtime filters and
//! predicates along the way.
//!
//! The entry point is [`scan::scanner::RowGroupScanner`].

#![allow(non_camel_case_types)]

#[macro_use]
pub mod errors;

pub mod basic;
pub mod compression;
pub mod data_type;
pub mod format;
pub mod util;

pub mod encodings;
pub mod schema;

pub mod column;
pub mod file;
pub mod scan;
