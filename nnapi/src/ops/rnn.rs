use super::Translator;
use super::recurrent::{AuxInput, RecurrentActivation, linear, sequence_dims, stack, time_steps};
use crate::context::FLOAT;
use crate::internal::*;
use crate::model::OperandType::*;
use nnhal_graph::ops::array::Concat;
use nnhal_graph::ops::binary::BinOp;

/// Weights of one direction of a fully connected recurrent cell.
#[derive(Clone, Copy, Debug)]
struct RnnCell {
    weights: OutletId,
    recurrent: OutletId,
    bias: OutletId,
    /// Auxiliary input weights, when the cell has a second input.
    aux: Option<OutletId>,
    activation: RecurrentActivation,
}

impl RnnCell {
    /// `h' = act(x·Wᵀ + [aux·Aᵀ] + h·Rᵀ + b)`
    fn step(
        &self,
        ctx: &mut BuildContext,
        name: &str,
        x: OutletId,
        aux: Option<OutletId>,
        h: OutletId,
    ) -> NnResult<OutletId> {
        let mut wire = linear(ctx, &format!("{name}.input"), x, self.weights)?;
        if let (Some(aux), Some(weights)) = (aux, self.aux) {
            let aux = linear(ctx, &format!("{name}.aux"), aux, weights)?;
            wire = ctx.wire1(&format!("{name}.with_aux"), BinOp::Add, &[wire, aux])?;
        }
        let recurrent = linear(ctx, &format!("{name}.recurrent"), h, self.recurrent)?;
        let recurrent = ctx.wire1(&format!("{name}.bias"), BinOp::Add, &[recurrent, self.bias])?;
        let wire = ctx.wire1(&format!("{name}.sum"), BinOp::Add, &[wire, recurrent])?;
        self.activation.wire(ctx, &format!("{name}.activation"), wire)
    }

    /// Runs the cell over `steps`, backward if `reverse`. Returns the per
    /// step states in time order and the final state.
    fn unroll(
        &self,
        ctx: &mut BuildContext,
        name: &str,
        steps: &[OutletId],
        aux: Option<&[OutletId]>,
        mut h: OutletId,
        reverse: bool,
    ) -> NnResult<(TVec<OutletId>, OutletId)> {
        let mut outputs = tvec![h; steps.len()];
        let order: Box<dyn Iterator<Item = usize>> =
            if reverse { Box::new((0..steps.len()).rev()) } else { Box::new(0..steps.len()) };
        for t in order {
            h = self.step(ctx, &format!("{name}.t{t}"), steps[t], aux.map(|a| a[t]), h)?;
            outputs[t] = h;
        }
        Ok((outputs, h))
    }
}

fn check_float(op: &OperationView, inputs: &[usize]) -> NnResult<()> {
    for &i in inputs {
        op.expect_type(i, FLOAT)?;
    }
    for o in 0..op.output_count() {
        op.expect_output_type(o, FLOAT)?;
    }
    Ok(())
}

/// Checks `[units, in]` weights, `[units, units]` recurrent weights and a
/// `[units]` bias against the input feature count. Returns `units`.
fn check_cell(op: &OperationView, input_size: usize, weights: usize) -> NnResult<usize> {
    op.expect_rank(weights, 2..=2)?;
    let w = op.input_dims(weights)?;
    let units = w[0];
    ensure!(w[1] == input_size, "{} weights {:?} do not match input size {}", op.kind(), w, input_size);
    ensure!(op.input_dims(weights + 1)? == [units, units], "Recurrent weights must be [{units}, {units}]");
    ensure!(op.input_dims(weights + 2)? == [units], "Bias must be [{units}]");
    Ok(units)
}

fn cell(ctx: &mut BuildContext, first: usize, aux: Option<usize>, activation: usize) -> NnResult<RnnCell> {
    Ok(RnnCell {
        weights: ctx.input(first)?,
        recurrent: ctx.input(first + 1)?,
        bias: ctx.input(first + 2)?,
        aux: aux.map(|i| ctx.input(i)).transpose()?,
        activation: RecurrentActivation::parse(ctx, activation)?,
    })
}

/// RNN: one step. Both outputs hold the new hidden state.
#[derive(Clone, Debug, Default)]
pub struct Rnn;

impl Translator for Rnn {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        op.expect_inputs(6..=6)?;
        op.expect_outputs(2..=2)?;
        check_float(op, &[0, 1, 2, 3, 4])?;
        op.expect_rank(0, 2..=2)?;
        let units = check_cell(op, op.input_dims(0)?[1], 1)?;
        ensure!(op.input_dims(4)? == [op.input_dims(0)?[0], units], "Hidden state must be [batch, {units}]");
        RecurrentActivation::parse(op, 5)?;
        Ok(())
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let cell = cell(ctx, 1, None, 5)?;
        let (x, h) = (ctx.input(0)?, ctx.input(4)?);
        let h = cell.step(ctx, "cell", x, None, h)?;
        Ok(tvec!(ctx.output(0, h)?, ctx.output(1, h)?))
    }
}

/// UNIDIRECTIONAL_SEQUENCE_RNN: the RNN step unrolled over time. An
/// optional second output holds the final state.
#[derive(Clone, Debug, Default)]
pub struct UnidirectionalSequenceRnn;

impl Translator for UnidirectionalSequenceRnn {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        op.expect_inputs(7..=7)?;
        op.expect_outputs(1..=2)?;
        check_float(op, &[0, 1, 2, 3, 4])?;
        op.expect_type(6, &[Int32])?;
        let time_major = op.scalar_i32(6)? != 0;
        let (_, batch) = sequence_dims(op, 0, time_major)?;
        let units = check_cell(op, op.input_dims(0)?[2], 1)?;
        ensure!(op.input_dims(4)? == [batch, units], "Hidden state must be [{batch}, {units}]");
        RecurrentActivation::parse(op, 5)?;
        Ok(())
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let time_major = ctx.scalar_i32(6)? != 0;
        let cell = cell(ctx, 1, None, 5)?;
        let (x, h) = (ctx.input(0)?, ctx.input(4)?);
        let steps = time_steps(ctx, "input", x, time_major)?;
        let (outputs, last) = cell.unroll(ctx, "cell", &steps, None, h, false)?;
        let output = stack(ctx, "output", &outputs, time_major)?;
        let mut produced = tvec!(ctx.output(0, output)?);
        if ctx.output_count() == 2 {
            produced.push(ctx.output(1, last)?);
        }
        Ok(produced)
    }
}

/// BIDIRECTIONAL_SEQUENCE_RNN. Forward cell at 1..=4, backward cell at
/// 5..=8, optional auxiliary input and weights at 9..=11, then activation,
/// time_major and merge_outputs.
#[derive(Clone, Debug, Default)]
pub struct BidirectionalSequenceRnn;

impl BidirectionalSequenceRnn {
    fn output_count(&self, op: &OperationView) -> NnResult<(bool, usize)> {
        let merge = op.scalar_bool(14)?;
        let sequences = if merge { 1 } else { 2 };
        ensure!(
            op.output_count() == sequences || op.output_count() == sequences + 2,
            "{} with merge_outputs={} has {} or {} outputs",
            op.kind(),
            merge,
            sequences,
            sequences + 2
        );
        Ok((merge, sequences))
    }
}

impl Translator for BidirectionalSequenceRnn {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        op.expect_inputs(15..=15)?;
        check_float(op, &[0, 1, 2, 3, 4, 5, 6, 7, 8])?;
        op.expect_type(13, &[Bool])?;
        op.expect_type(14, &[Bool])?;
        self.output_count(op)?;
        let time_major = op.scalar_bool(13)?;
        let (_, batch) = sequence_dims(op, 0, time_major)?;
        let input_size = op.input_dims(0)?[2];
        let aux = AuxInput::detect(op, 9, 10, 11);
        if aux != AuxInput::None {
            op.expect_rank(9, 3..=3)?;
        }
        let bw_input_size = match aux {
            AuxInput::Parallel => op.input_dims(9)?[2],
            _ => input_size,
        };
        let fw = check_cell(op, input_size, 1)?;
        let bw = check_cell(op, bw_input_size, 5)?;
        ensure!(op.input_dims(4)? == [batch, fw], "Forward state must be [{batch}, {fw}]");
        ensure!(op.input_dims(8)? == [batch, bw], "Backward state must be [{batch}, {bw}]");
        if aux != AuxInput::None {
            check_float(op, &[9])?;
            ensure!(op.input_dims(9)?[..2] == op.input_dims(0)?[..2], "Auxiliary input must match input sequence");
        }
        if aux == AuxInput::Weighted {
            check_float(op, &[10, 11])?;
            let aux_size = op.input_dims(9)?[2];
            ensure!(op.input_dims(10)? == [fw, aux_size], "Forward auxiliary weights must be [{fw}, {aux_size}]");
            ensure!(op.input_dims(11)? == [bw, aux_size], "Backward auxiliary weights must be [{bw}, {aux_size}]");
        }
        RecurrentActivation::parse(op, 12)?;
        Ok(())
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let time_major = ctx.scalar_bool(13)?;
        let (merge, sequences) = self.output_count(ctx)?;
        let aux = AuxInput::detect(ctx, 9, 10, 11);
        let weighted = aux == AuxInput::Weighted;
        let fw = cell(ctx, 1, weighted.then_some(10), 12)?;
        let bw = cell(ctx, 5, weighted.then_some(11), 12)?;

        let x = ctx.input(0)?;
        let steps = time_steps(ctx, "input", x, time_major)?;
        let aux_steps = if aux == AuxInput::None {
            None
        } else {
            let aux = ctx.input(9)?;
            Some(time_steps(ctx, "aux_input", aux, time_major)?)
        };

        let (fw_h, bw_h) = (ctx.input(4)?, ctx.input(8)?);
        let (fw_outputs, fw_last) =
            fw.unroll(ctx, "fw", &steps, aux_steps.as_deref().filter(|_| weighted), fw_h, false)?;
        let (bw_outputs, bw_last) = match (aux, &aux_steps) {
            (AuxInput::Parallel, Some(aux_steps)) => bw.unroll(ctx, "bw", aux_steps, None, bw_h, true)?,
            _ => bw.unroll(ctx, "bw", &steps, aux_steps.as_deref().filter(|_| weighted), bw_h, true)?,
        };
        let fw_output = stack(ctx, "fw_output", &fw_outputs, time_major)?;
        let bw_output = stack(ctx, "bw_output", &bw_outputs, time_major)?;

        let mut produced = if merge {
            let merged = ctx.wire1("merge", Concat::new(2), &[fw_output, bw_output])?;
            tvec!(ctx.output(0, merged)?)
        } else {
            tvec!(ctx.output(0, fw_output)?, ctx.output(1, bw_output)?)
        };
        if ctx.output_count() > sequences {
            produced.push(ctx.output(sequences, fw_last)?);
            produced.push(ctx.output(sequences + 1, bw_last)?);
        }
        Ok(produced)
    }
}
