//! # nnhal-graph
//!
//! Typed dataflow graph handed over to the tensor-compute engine.
//!
//! A `TypedModel` is built incrementally with `add_source`, `add_const` and
//! `wire_node`. Every wired op runs its `output_facts` shape and type
//! inference, so a malformed graph is rejected at construction time rather
//! than at execution. Once the interface is set, the model is sealed into a
//! `Graph`, which is the immutable value consumed downstream.
//!
//! This crate does not evaluate anything.

#[macro_use]
extern crate derive_new;
#[macro_use]
extern crate log;

#[macro_use]
pub mod macros;

pub mod broadcast;
pub mod datum;
pub mod fact;
pub mod model;
pub mod ops;
pub mod tensor;

/// A Smallvec instantiation with 4 embeddable values.
///
/// Used for node inputs and outputs, and tensor shapes.
pub type TVec<T> = smallvec::SmallVec<[T; 4]>;

pub type NnResult<T> = anyhow::Result<T>;
pub type NnError = anyhow::Error;

pub use anyhow;

pub mod prelude {
    pub use crate::datum::{Datum, DatumType};
    pub use crate::fact::TypedFact;
    pub use crate::model::{Graph, InletId, Node, OutletId, TypedModel};
    pub use crate::tensor::{Tensor, tensor0, tensor1};
    pub use crate::{NnError, NnResult, TVec, tvec};
}

pub mod internal {
    pub use crate::broadcast::multi_broadcast;
    pub use crate::ops::TypedOp;
    pub use crate::prelude::*;
    pub use anyhow::{Context as NnResultExt, bail, ensure, format_err};
    pub use itertools::Itertools;
    pub use ndarray as nnhal_ndarray;
    pub use std::borrow::Cow;
    pub use std::collections::HashMap;
    pub use std::fmt;
    pub use std::sync::Arc;
}
