//! Data movement ops.
mod concat;
mod depth_space;
mod gather;
mod pad;
mod slice;
mod space_batch;
mod split;

pub use concat::Concat;
pub use depth_space::{DepthToSpace, SpaceToDepth};
pub use gather::Gather;
pub use pad::Pad;
pub use slice::{Slice, SliceAxis};
pub use space_batch::{BatchToSpace, SpaceToBatch};
pub use split::Split;
