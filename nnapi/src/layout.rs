//! Named axis permutations.
use crate::internal::*;
use nnhal_graph::ops::change_axes::AxisOp;

/// Layout conversions used when moving between NNAPI conventions and the
/// channel-first internal layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Conversion {
    NhwcToNchw,
    NchwToNhwc,
    /// Convolution filters.
    OhwiToOihw,
    /// Depthwise filters `[1, H, W, C*M]` to `[C*M, 1, H, W]`.
    IhwoToOihw,
    /// Transposed convolution filters `[O, H, W, I]` to `[I, O, H, W]`.
    OhwiToIohw,
    /// `[T, B, ...]` to `[B, T, ...]` and back on rank 3 tensors.
    BatchTimeSwap,
    /// Plain 2D transposition.
    Transpose2d,
}

impl Conversion {
    pub fn permutation(&self) -> TVec<usize> {
        match self {
            Conversion::NhwcToNchw | Conversion::OhwiToOihw => tvec!(0, 3, 1, 2),
            Conversion::NchwToNhwc => tvec!(0, 2, 3, 1),
            Conversion::IhwoToOihw | Conversion::OhwiToIohw => tvec!(3, 0, 1, 2),
            Conversion::BatchTimeSwap => tvec!(1, 0, 2),
            Conversion::Transpose2d => tvec!(1, 0),
        }
    }

    pub fn permute_shape(&self, shape: &[usize]) -> NnResult<TVec<usize>> {
        AxisOp::Permute(self.permutation()).output_shape(shape)
    }
}

pub fn transpose(
    target: &mut TypedModel,
    name: impl Into<String>,
    conversion: Conversion,
    input: OutletId,
) -> NnResult<OutletId> {
    Ok(target.wire_node(name, AxisOp::Permute(conversion.permutation()), &[input])?[0])
}
