//! Pieces shared by the RNN and LSTM families: activation codes, dense
//! products and unrolling over the time axis.
use crate::internal::*;
use crate::layout::Conversion;
use nnhal_graph::ops::array::{Concat, Split};
use nnhal_graph::ops::change_axes::AxisOp;
use nnhal_graph::ops::element_wise::{Clip, UnaryOp};
use nnhal_graph::ops::matmul::MatMul;

/// Activation codes of recurrent operations. Unlike fused activations they
/// include tanh and sigmoid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecurrentActivation {
    None,
    Relu,
    Relu1,
    Relu6,
    Tanh,
    Sigmoid,
}

impl RecurrentActivation {
    pub fn from_code(code: i32) -> Option<RecurrentActivation> {
        match code {
            0 => Some(RecurrentActivation::None),
            1 => Some(RecurrentActivation::Relu),
            2 => Some(RecurrentActivation::Relu1),
            3 => Some(RecurrentActivation::Relu6),
            4 => Some(RecurrentActivation::Tanh),
            6 => Some(RecurrentActivation::Sigmoid),
            _ => None,
        }
    }

    pub fn parse(op: &OperationView, i: usize) -> NnResult<RecurrentActivation> {
        let code = op.scalar_i32(i)?;
        RecurrentActivation::from_code(code)
            .ok_or_else(|| format_err!("Unknown recurrent activation {} for {}", code, op.kind()))
    }

    pub fn wire(&self, ctx: &mut BuildContext, suffix: &str, input: OutletId) -> NnResult<OutletId> {
        match self {
            RecurrentActivation::None => Ok(input),
            RecurrentActivation::Relu => ctx.wire1(suffix, UnaryOp::Relu, &[input]),
            RecurrentActivation::Relu1 => ctx.wire1(suffix, Clip::new(-1.0, 1.0), &[input]),
            RecurrentActivation::Relu6 => ctx.wire1(suffix, Clip::new(0.0, 6.0), &[input]),
            RecurrentActivation::Tanh => ctx.wire1(suffix, UnaryOp::Tanh, &[input]),
            RecurrentActivation::Sigmoid => ctx.wire1(suffix, UnaryOp::Sigmoid, &[input]),
        }
    }
}

/// `x · wᵀ` for a `[batch, in]` input and `[units, in]` weights.
pub fn linear(ctx: &mut BuildContext, suffix: &str, x: OutletId, w: OutletId) -> NnResult<OutletId> {
    ctx.wire1(suffix, MatMul::new(false, true), &[x, w])
}

/// Symmetric clipping, skipped for a zero threshold.
pub fn clip(ctx: &mut BuildContext, suffix: &str, x: OutletId, threshold: f32) -> NnResult<OutletId> {
    if threshold > 0.0 { ctx.wire1(suffix, Clip::new(-threshold, threshold), &[x]) } else { Ok(x) }
}

pub fn clip_threshold(op: &OperationView, i: usize) -> NnResult<f32> {
    let threshold = op.scalar_f32(i)?;
    ensure!(threshold >= 0.0, "{} clipping threshold {} is negative", op.kind(), threshold);
    Ok(threshold)
}

/// Sequence dimensions `(time, batch)` of a rank 3 input.
pub fn sequence_dims(op: &OperationView, i: usize, time_major: bool) -> NnResult<(usize, usize)> {
    op.expect_rank(i, 3..=3)?;
    let dims = op.input_dims(i)?;
    let (time, batch) = if time_major { (dims[0], dims[1]) } else { (dims[1], dims[0]) };
    ensure!(time > 0, "{} over an empty sequence", op.kind());
    Ok((time, batch))
}

/// One `[batch, features]` wire per time step of a sequence input.
pub fn time_steps(ctx: &mut BuildContext, suffix: &str, x: OutletId, time_major: bool) -> NnResult<TVec<OutletId>> {
    let x = if time_major { x } else { ctx.transpose(&format!("{suffix}.time_major"), Conversion::BatchTimeSwap, x)? };
    let time = ctx.shape(x)?[0];
    let steps = ctx.wire(&format!("{suffix}.split"), Split::new(0, tvec![1; time]), &[x])?;
    steps
        .iter()
        .enumerate()
        .map(|(t, step)| ctx.wire1(&format!("{suffix}.t{t}"), AxisOp::Rm(0), &[*step]))
        .collect()
}

/// Stacks per step `[batch, features]` wires back into a sequence.
pub fn stack(ctx: &mut BuildContext, suffix: &str, steps: &[OutletId], time_major: bool) -> NnResult<OutletId> {
    let steps = steps
        .iter()
        .enumerate()
        .map(|(t, step)| ctx.wire1(&format!("{suffix}.t{t}"), AxisOp::Add(0), &[*step]))
        .collect::<NnResult<TVec<_>>>()?;
    let stacked = ctx.wire1(suffix, Concat::new(0), &steps)?;
    if time_major { Ok(stacked) } else { ctx.transpose(&format!("{suffix}.batch_major"), Conversion::BatchTimeSwap, stacked) }
}

/// Optional auxiliary input of a bidirectional operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuxInput {
    None,
    /// Auxiliary input with its own weights in both directions.
    Weighted,
    /// No auxiliary weights: the backward direction reads the auxiliary
    /// input instead of the main one.
    Parallel,
}

impl AuxInput {
    pub fn detect(op: &OperationView, input: usize, fw_weights: usize, bw_weights: usize) -> AuxInput {
        match (op.has_input(input), op.has_input(fw_weights), op.has_input(bw_weights)) {
            (true, true, true) => AuxInput::Weighted,
            (true, false, false) => AuxInput::Parallel,
            _ => AuxInput::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activation_codes() {
        assert_eq!(RecurrentActivation::from_code(4), Some(RecurrentActivation::Tanh));
        assert_eq!(RecurrentActivation::from_code(6), Some(RecurrentActivation::Sigmoid));
        assert_eq!(RecurrentActivation::from_code(2), Some(RecurrentActivation::Relu1));
        assert_eq!(RecurrentActivation::from_code(5), None);
        assert_eq!(RecurrentActivation::from_code(7), None);
    }
}
