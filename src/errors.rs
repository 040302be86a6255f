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

use std::io;
use std::result;

use quick_error::quick_error;

quick_error! {
  #[derive(Debug)]
  pub enum ParquetError {
    /// File-format level problems: bad magic, invalid metadata, page layout
    /// violations, unsupported encodings or codecs.
    General(message: String) {
      display("Parquet error: {}", message)
    }
    /// Schema shape problems: unrecognized list/map layout, type mismatches
    /// between the projection and the file.
    Schema(message: String) {
      display("Schema error: {}", message)
    }
    /// A value or level stream could not be decoded.
    Decode(message: String) {
      display("Decode error: {}", message)
    }
    /// Byte stream ended before the format said it would.
    Eof(message: String) {
      display("Unexpected end of stream: {}", message)
    }
    /// Functionality the scanner deliberately does not implement.
    Unsupported(message: String) {
      display("Unsupported: {}", message)
    }
    /// An allocation was refused by the memory tracker. Non-retryable.
    Resource(message: String) {
      display("Memory limit exceeded: {}", message)
    }
    /// Cooperative exit: the query was cancelled. Not a data error.
    Cancelled {
      display("Scan cancelled")
    }
    Io(message: String, err: io::Error) {
      display("IO error: {}, {}", message, err)
    }
  }
}

impl From<io::Error> for ParquetError {
  fn from(err: io::Error) -> Self {
    ParquetError::Io("underlying IO error".to_owned(), err)
  }
}

impl From<snap::Error> for ParquetError {
  fn from(err: snap::Error) -> Self {
    ParquetError::Io(
      "underlying snap error".to_owned(), io::Error::new(io::ErrorKind::Other, err))
  }
}

pub type Result<T> = result::Result<T, ParquetError>;

// Convenient macros for different errors. Each expands to the bare error
// value; wrap with `Err(..)` at the return site.

macro_rules! general_err {
  ($fmt:expr) => ($crate::errors::ParquetError::General($fmt.to_owned()));
  ($fmt:expr, $($args:expr),*) =>
    ($crate::errors::ParquetError::General(format!($fmt, $($args),*)));
}

macro_rules! schema_err {
  ($fmt:expr) => ($crate::errors::ParquetError::Schema($fmt.to_owned()));
  ($fmt:expr, $($args:expr),*) =>
    ($crate::errors::ParquetError::Schema(format!($fmt, $($args),*)));
}

macro_rules! decode_err {
  ($fmt:expr) => ($crate::errors::ParquetError::Decode($fmt.to_owned()));
  ($fmt:expr, $($args:expr),*) =>
    ($crate::errors::ParquetError::Decode(format!($fmt, $($args),*)));
}

macro_rules! eof_err {
  ($fmt:expr) => ($crate::errors::ParquetError::Eof($fmt.to_owned()));
  ($fmt:expr, $($args:expr),*) =>
    ($crate::errors::ParquetError::Eof(format!($fmt, $($args),*)));
}

macro_rules! nyi_err {
  ($fmt:expr) => ($crate::errors::ParquetError::Unsupported($fmt.to_owned()));
  ($fmt:expr, $($args:expr),*) =>
    ($crate::errors::ParquetError::Unsupported(format!($fmt, $($args),*)));
}

macro_rules! resource_err {
  ($fmt:expr) => ($crate::errors::ParquetError::Resource($fmt.to_owned()));
  ($fmt:expr, $($args:expr),*) =>
    ($crate::errors::ParquetError::Resource(format!($fmt, $($args),*)));
}
