// Copyright 2025 Johann Kempter
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
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # hookscope
//!
//! A framework for instrumenting a managed host process from the outside: locate
//! structural anchors in compiled method bodies, splice in event construction and
//! dispatch sequences, and hand extension code stable typed wrappers over the host's
//! own objects.
//!
//! The host compiles its gameplay methods to an instruction stream; `hookscope`
//! rewrites selected streams at load time so that, at a chosen point, the method
//! constructs an event object, dispatches it to registered subscribers, and either
//! continues or returns early depending on the allow/deny flag subscribers left behind.
//! Subscribers never touch host internals directly - they see event payloads and
//! wrapper façades.
//!
//! ## Architecture
//!
//! - [`il`] - instruction model and the label-safe stream editor
//! - [`patch`] - anchor patterns, patch plans, the call-site script builder and the
//!   load-time engine with per-point failure isolation
//! - [`host`] - the host boundary: object handles, the method table, scratch pools
//! - [`wrappers`] - the wrapper identity cache (one wrapper per live host object)
//! - [`events`] - cancellable events and ordered subscriber dispatch
//! - [`runtime`] - the owned dispatcher context and a stream evaluator for end-to-end
//!   testing of patched methods
//! - [`points`] - the shipped instrumentation point catalog
//!
//! ## Quick Start
//!
//! ```rust
//! use hookscope::host::MethodTable;
//! use hookscope::il::{Instruction, InstructionStream, Opcode, Operand};
//! use hookscope::patch::PatchEngine;
//! use hookscope::points::standard_points;
//!
//! let methods = MethodTable::new();
//! methods.register(
//!     "RadioItem::Update",
//!     InstructionStream::from_instructions(vec![
//!         Instruction::with_operand(Opcode::LdcI4, Operand::Int(4)),
//!         Instruction::with_operand(Opcode::StLoc, Operand::Slot(1)),
//!         Instruction::new(Opcode::Ret),
//!     ]),
//! );
//!
//! let engine = PatchEngine::with_points(standard_points());
//! let summary = engine.apply_all(&methods);
//! // Only the radio method exists here; the other points skip with a logged outcome.
//! assert_eq!(summary.applied().collect::<Vec<_>>(), vec!["radio-drain"]);
//! assert!(methods.is_patched("RadioItem::Update"));
//! ```

#[macro_use]
mod error;

pub use error::Error;

/// Result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

pub mod events;
pub mod host;
pub mod il;
pub mod patch;
pub mod points;
pub mod prelude;
pub mod runtime;
pub mod wrappers;
