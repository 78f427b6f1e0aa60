// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Typed value system.
//!
//! [`TypedValue`] is what flows between rule stages. [`ValueKind`] describes what a value is
//! allowed to be and converts between native JSON and typed values. [`Shape`] groups kinds by
//! field name to describe a node's inputs or outputs.

mod kind;
mod shape;
mod typed;

pub use kind::{
    default_compatibility, CompatibilityFn, ComplexCheck, ComplexKind, KindDescriptor,
    PrimitiveKind, ValueKind,
};
pub use shape::Shape;
pub use typed::{insert_path, read_path, TypedValue, ValueMap};
