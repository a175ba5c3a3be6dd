//! Vector Store Connectors
//!
//! This crate adapts managed vector databases and analytical stores to
//! the Synaptik [`MemoryStore`] abstraction:
//! - Qdrant (points & collections REST API)
//! - Pinecone (vector REST API, with metadata size splitting)
//! - Kusto (KQL/CSL generation over the Kusto REST API)
// Copyright 2025 Synaptik Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


pub mod error;
pub mod traits;

pub mod kusto;
pub mod pinecone;
pub mod pinecone_utils;
pub mod qdrant;

pub use error::{MemoryError, MemoryResult};
pub use traits::MemoryStore;
