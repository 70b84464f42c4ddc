//! Ops
use crate::internal::*;
use downcast_rs::Downcast;
use dyn_clone::DynClone;

pub mod array;
pub mod binary;
pub mod cast;
pub mod change_axes;
pub mod cnn;
pub mod element_wise;
pub mod identity;
pub mod konst;
pub mod logic;
pub mod matmul;
pub mod nn;
pub mod resize;
pub mod roi;
pub mod source;

/// An operation with fully typed inputs and outputs.
///
/// Ops only describe computations: `output_facts` performs the shape and
/// type inference and rejects inconsistent inputs.
pub trait TypedOp: fmt::Debug + DynClone + Send + Sync + 'static + Downcast {
    /// Vaguely human readable short name.
    fn name(&self) -> Cow<'_, str>;

    /// Short (one-line) strings giving hints on internal implementation or
    /// important configuration details to be displayed in dumps.
    fn info(&self) -> Vec<String> {
        vec![]
    }

    /// Deduce output facts from input facts.
    fn output_facts(&self, inputs: &[&TypedFact]) -> NnResult<TVec<TypedFact>>;
}

dyn_clone::clone_trait_object!(TypedOp);
downcast_rs::impl_downcast!(TypedOp);

impl<O: TypedOp> From<O> for Box<dyn TypedOp> {
    fn from(it: O) -> Box<dyn TypedOp> {
        Box::new(it)
    }
}

/// Normalize a possibly negative axis against a rank.
pub fn resolve_axis(axis: i64, rank: usize) -> NnResult<usize> {
    let resolved = if axis < 0 { axis + rank as i64 } else { axis };
    if resolved < 0 || resolved >= rank as i64 {
        bail!("Axis {} is out of range for rank {}", axis, rank);
    }
    Ok(resolved as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axes() {
        assert_eq!(resolve_axis(-1, 4).unwrap(), 3);
        assert_eq!(resolve_axis(2, 4).unwrap(), 2);
        assert!(resolve_axis(4, 4).is_err());
        assert!(resolve_axis(-5, 4).is_err());
    }
}
