//! # nnhal-nnapi
//!
//! Translates NNAPI model descriptions into `nnhal-graph` typed graphs.
//!
//! A `Model` is an operand table plus an ordered list of operations. The
//! translation walks the operations in order, asks the factory for the
//! matching `OperationNode`, validates it and wires its computation into a
//! `TypedModel`. Operands live in the NNAPI channel-last convention while
//! convolutions, pooling and friends run channel-first in the graph.
//!
//! ```no_run
//! use nnhal_nnapi::prelude::*;
//! # fn model() -> Model { Model::default() }
//! let translated = nnapi().translate(&model())?;
//! println!("{}", translated.graph);
//! # Ok::<(), nnhal_nnapi::NnError>(())
//! ```

#[macro_use]
extern crate derive_new;
#[macro_use]
extern crate log;

pub mod activation;
pub mod builder;
pub mod context;
pub mod factory;
pub mod framework;
pub mod layout;
pub mod model;
pub mod model_info;
pub mod operation_type;
pub mod ops;
pub mod padding;
pub mod quant;
pub mod registry;

pub use framework::{Nnapi, TranslatedModel};
pub use nnhal_graph::{NnError, NnResult};

/// Translator with the default configuration.
pub fn nnapi() -> Nnapi {
    Nnapi::default()
}

pub mod prelude {
    pub use crate::framework::{Nnapi, TranslatedModel};
    pub use crate::model::{Model, Operand, OperandLifeTime, OperandType, SymmPerChannelQuantParams};
    pub use crate::nnapi;
    pub use crate::operation_type::OperationType;
    pub use nnhal_graph::prelude::*;
}

pub mod internal {
    pub use crate::context::{BuildContext, OperationView, Produced};
    pub use crate::model_info::ModelInfo;
    pub use crate::prelude::*;
    pub use crate::quant::QuantParams;
    pub use nnhal_graph::internal::*;
    pub use nnhal_graph::{args_1, args_2, args_3};
}
