//! Graph structures.
mod graph;
mod node;
mod order;
mod typed;

pub use self::graph::Graph;
pub use self::node::{InletId, Node, Outlet, OutletId};
pub use self::order::eval_order_for_nodes;
pub use self::typed::TypedModel;
