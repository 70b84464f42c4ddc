//! Long short-term memory cells.
//!
//! Gates are ordered input, forget, cell, output in every operand group.
//! Optional features are switched on by the presence of their operands:
//! without input gate weights the input gate is coupled to the forget gate
//! (CIFG), peephole weights add the cell state to the gates, projection
//! weights map the hidden state to a smaller output, and layer norm weights
//! normalize each gate before its bias.
use super::Translator;
use super::recurrent::{
    AuxInput, RecurrentActivation, clip, clip_threshold, linear, sequence_dims, stack, time_steps,
};
use crate::context::FLOAT;
use crate::internal::*;
use crate::model::OperandType::*;
use nnhal_graph::ops::array::Concat;
use nnhal_graph::ops::binary::BinOp;
use nnhal_graph::ops::element_wise::UnaryOp;
use nnhal_graph::ops::nn::{Reduce, Reducer};

const GATES: [&str; 4] = ["input_gate", "forget_gate", "cell_gate", "output_gate"];
const INPUT: usize = 0;
const FORGET: usize = 1;
const CELL: usize = 2;
const OUTPUT: usize = 3;

/// Wired parameters of one LSTM cell.
#[derive(Clone, Debug)]
struct LstmCell {
    input: [Option<OutletId>; 4],
    recurrent: [Option<OutletId>; 4],
    aux: [Option<OutletId>; 4],
    /// No cell gate slot.
    peephole: [Option<OutletId>; 4],
    layer_norm: [Option<OutletId>; 4],
    bias: [Option<OutletId>; 4],
    projection: Option<(OutletId, Option<OutletId>)>,
    activation: RecurrentActivation,
    cell_clip: f32,
    projection_clip: f32,
}

impl LstmCell {
    fn plain(activation: RecurrentActivation) -> LstmCell {
        LstmCell {
            input: [None; 4],
            recurrent: [None; 4],
            aux: [None; 4],
            peephole: [None; 4],
            layer_norm: [None; 4],
            bias: [None; 4],
            projection: None,
            activation,
            cell_clip: 0.0,
            projection_clip: 0.0,
        }
    }

    fn weight(slots: &[Option<OutletId>; 4], gate: usize) -> NnResult<OutletId> {
        slots[gate].ok_or_else(|| format_err!("Missing {} weights", GATES[gate]))
    }

    /// Gate pre-activation. `cell` is the cell state the peephole reads.
    #[allow(clippy::too_many_arguments)]
    fn gate(
        &self,
        ctx: &mut BuildContext,
        name: &str,
        gate: usize,
        x: OutletId,
        aux: Option<OutletId>,
        h: OutletId,
        cell: OutletId,
    ) -> NnResult<OutletId> {
        let name = format!("{name}.{}", GATES[gate]);
        let mut wire = linear(ctx, &format!("{name}.input"), x, Self::weight(&self.input, gate)?)?;
        if let (Some(aux), Some(weights)) = (aux, self.aux[gate]) {
            let aux = linear(ctx, &format!("{name}.aux"), aux, weights)?;
            wire = ctx.wire1(&format!("{name}.with_aux"), BinOp::Add, &[wire, aux])?;
        }
        let recurrent = linear(ctx, &format!("{name}.recurrent"), h, Self::weight(&self.recurrent, gate)?)?;
        wire = ctx.wire1(&format!("{name}.sum"), BinOp::Add, &[wire, recurrent])?;
        if let Some(peephole) = self.peephole[gate] {
            let peep = ctx.wire1(&format!("{name}.peephole"), BinOp::Mul, &[cell, peephole])?;
            wire = ctx.wire1(&format!("{name}.with_peephole"), BinOp::Add, &[wire, peep])?;
        }
        if let Some(weights) = self.layer_norm[gate] {
            wire = layer_norm(ctx, &format!("{name}.norm"), wire)?;
            wire = ctx.wire1(&format!("{name}.norm.scaled"), BinOp::Mul, &[wire, weights])?;
        }
        match self.bias[gate] {
            Some(bias) => ctx.wire1(&format!("{name}.bias"), BinOp::Add, &[wire, bias]),
            None => Ok(wire),
        }
    }

    /// One time step. Returns the new output state and cell state.
    fn step(
        &self,
        ctx: &mut BuildContext,
        name: &str,
        x: OutletId,
        aux: Option<OutletId>,
        h: OutletId,
        c: OutletId,
    ) -> NnResult<(OutletId, OutletId)> {
        let forget = self.gate(ctx, name, FORGET, x, aux, h, c)?;
        let forget = ctx.wire1(&format!("{name}.forget"), UnaryOp::Sigmoid, &[forget])?;
        let input = if self.input[INPUT].is_some() {
            let input = self.gate(ctx, name, INPUT, x, aux, h, c)?;
            ctx.wire1(&format!("{name}.input"), UnaryOp::Sigmoid, &[input])?
        } else {
            let one = ctx.konst(&format!("{name}.one"), tensor0(1f32))?;
            ctx.wire1(&format!("{name}.input"), BinOp::Sub, &[one, forget])?
        };
        let candidate = self.gate(ctx, name, CELL, x, aux, h, c)?;
        let candidate = self.activation.wire(ctx, &format!("{name}.candidate"), candidate)?;

        let kept = ctx.wire1(&format!("{name}.kept"), BinOp::Mul, &[forget, c])?;
        let added = ctx.wire1(&format!("{name}.added"), BinOp::Mul, &[input, candidate])?;
        let cell = ctx.wire1(&format!("{name}.cell"), BinOp::Add, &[kept, added])?;
        let cell = clip(ctx, &format!("{name}.cell.clip"), cell, self.cell_clip)?;

        let output = self.gate(ctx, name, OUTPUT, x, aux, h, cell)?;
        let output = ctx.wire1(&format!("{name}.output"), UnaryOp::Sigmoid, &[output])?;
        let squashed = self.activation.wire(ctx, &format!("{name}.cell.activation"), cell)?;
        let mut hidden = ctx.wire1(&format!("{name}.hidden"), BinOp::Mul, &[output, squashed])?;
        if let Some((weights, bias)) = self.projection {
            hidden = linear(ctx, &format!("{name}.projection"), hidden, weights)?;
            if let Some(bias) = bias {
                hidden = ctx.wire1(&format!("{name}.projection.bias"), BinOp::Add, &[hidden, bias])?;
            }
            hidden = clip(ctx, &format!("{name}.projection.clip"), hidden, self.projection_clip)?;
        }
        Ok((hidden, cell))
    }

    /// Runs the cell over `steps`, backward if `reverse`. Returns the
    /// per step outputs in time order and the final states.
    #[allow(clippy::too_many_arguments)]
    fn unroll(
        &self,
        ctx: &mut BuildContext,
        name: &str,
        steps: &[OutletId],
        aux: Option<&[OutletId]>,
        mut h: OutletId,
        mut c: OutletId,
        reverse: bool,
    ) -> NnResult<(TVec<OutletId>, OutletId, OutletId)> {
        let mut outputs = tvec![h; steps.len()];
        let order: Box<dyn Iterator<Item = usize>> =
            if reverse { Box::new((0..steps.len()).rev()) } else { Box::new(0..steps.len()) };
        for t in order {
            (h, c) = self.step(ctx, &format!("{name}.t{t}"), steps[t], aux.map(|a| a[t]), h, c)?;
            outputs[t] = h;
        }
        Ok((outputs, h, c))
    }
}

/// Normalizes each row of a `[batch, units]` wire to zero mean and unit
/// variance.
fn layer_norm(ctx: &mut BuildContext, name: &str, x: OutletId) -> NnResult<OutletId> {
    let mean = ctx.wire1(&format!("{name}.mean"), Reduce::new(tvec!(1), Reducer::Mean, true), &[x])?;
    let centered = ctx.wire1(&format!("{name}.centered"), BinOp::Sub, &[x, mean])?;
    let square = ctx.wire1(&format!("{name}.square"), BinOp::Mul, &[centered, centered])?;
    let var = ctx.wire1(&format!("{name}.var"), Reduce::new(tvec!(1), Reducer::Mean, true), &[square])?;
    let epsilon = ctx.konst(&format!("{name}.epsilon"), tensor0(1e-8f32))?;
    let var = ctx.wire1(&format!("{name}.var_eps"), BinOp::Add, &[var, epsilon])?;
    let rsqrt = ctx.wire1(&format!("{name}.rsqrt"), UnaryOp::Rsqrt, &[var])?;
    ctx.wire1(&format!("{name}.normalized"), BinOp::Mul, &[centered, rsqrt])
}

/// Where the parameters of one float LSTM cell sit in the operand list.
/// Gate groups are four consecutive operands, peepholes three.
#[derive(Clone, Copy, Debug)]
struct LstmOperands {
    input_weights: usize,
    recurrent_weights: usize,
    peephole: usize,
    bias: usize,
    projection: usize,
    layer_norm: Option<usize>,
    aux_weights: Option<usize>,
    activation: usize,
    cell_clip: usize,
    projection_clip: usize,
}

/// Enabled features of a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Features {
    cifg: bool,
    peephole: bool,
    projection: bool,
    layer_norm: bool,
}

impl LstmOperands {
    fn features(&self, op: &OperationView) -> NnResult<Features> {
        let input_gate = [self.input_weights, self.recurrent_weights, self.bias].map(|i| op.has_input(i));
        let cifg = match input_gate {
            [false, false, false] => true,
            [true, true, true] => false,
            _ => bail!("{} input gate operands must be all present or all omitted", op.kind()),
        };
        // the input gate slot is the first of each group
        let group = |first: usize, len: usize| {
            (first + 1..first + len).all(|i| op.has_input(i)) && (cifg || op.has_input(first))
        };
        let peephole = group(self.peephole, 3);
        let layer_norm = self.layer_norm.is_some_and(|ln| group(ln, 4));
        Ok(Features { cifg, peephole, projection: op.has_input(self.projection), layer_norm })
    }

    /// Operand checks. `input_size` is the feature count of the main input
    /// and `aux_size` the one of the auxiliary input, if weighted. Returns
    /// `(units, output_size)`.
    fn check(&self, op: &OperationView, input_size: usize, aux_size: Option<usize>) -> NnResult<(usize, usize)> {
        let features = self.features(op)?;
        let gates = if features.cifg { FORGET..=OUTPUT } else { INPUT..=OUTPUT };
        op.expect_rank(self.recurrent_weights + FORGET, 2..=2)?;
        let recurrent = op.input_dims(self.recurrent_weights + FORGET)?;
        let (units, output_size) = (recurrent[0], recurrent[1]);
        let expect = |i: usize, dims: &[usize]| -> NnResult<()> {
            op.expect_type(i, FLOAT)?;
            ensure!(op.input_dims(i)? == dims, "Input {} of {} must be {:?}", i, op.kind(), dims);
            Ok(())
        };
        for gate in gates {
            expect(self.input_weights + gate, &[units, input_size])?;
            expect(self.recurrent_weights + gate, &[units, output_size])?;
            expect(self.bias + gate, &[units])?;
            if let (Some(aux), Some(aux_size)) = (self.aux_weights, aux_size) {
                expect(aux + gate, &[units, aux_size])?;
            }
            if let (Some(ln), true) = (self.layer_norm, features.layer_norm) {
                expect(ln + gate, &[units])?;
            }
        }
        if features.peephole {
            for gate in [INPUT, FORGET, OUTPUT] {
                if gate != INPUT || !features.cifg {
                    expect(self.peephole + peephole_slot(gate), &[units])?;
                }
            }
        }
        if features.projection {
            expect(self.projection, &[output_size, units])?;
            if op.has_input(self.projection + 1) {
                expect(self.projection + 1, &[output_size])?;
            }
        } else {
            ensure!(units == output_size, "Output size {} differs from {} units without projection", output_size, units);
        }
        RecurrentActivation::parse(op, self.activation)?;
        clip_threshold(op, self.cell_clip)?;
        clip_threshold(op, self.projection_clip)?;
        Ok((units, output_size))
    }

    fn load(&self, ctx: &mut BuildContext, aux: bool) -> NnResult<LstmCell> {
        let features = self.features(ctx)?;
        let mut cell = LstmCell::plain(RecurrentActivation::parse(ctx, self.activation)?);
        cell.cell_clip = clip_threshold(ctx, self.cell_clip)?;
        cell.projection_clip = clip_threshold(ctx, self.projection_clip)?;
        let gates = if features.cifg { FORGET..=OUTPUT } else { INPUT..=OUTPUT };
        for gate in gates {
            cell.input[gate] = Some(ctx.input(self.input_weights + gate)?);
            cell.recurrent[gate] = Some(ctx.input(self.recurrent_weights + gate)?);
            cell.bias[gate] = Some(ctx.input(self.bias + gate)?);
            if let (Some(weights), true) = (self.aux_weights, aux) {
                cell.aux[gate] = Some(ctx.input(weights + gate)?);
            }
            if let (Some(ln), true) = (self.layer_norm, features.layer_norm) {
                cell.layer_norm[gate] = Some(ctx.input(ln + gate)?);
            }
            if features.peephole && gate != CELL {
                cell.peephole[gate] = Some(ctx.input(self.peephole + peephole_slot(gate))?);
            }
        }
        if features.projection {
            let bias = if ctx.has_input(self.projection + 1) { Some(ctx.input(self.projection + 1)?) } else { None };
            cell.projection = Some((ctx.input(self.projection)?, bias));
        }
        Ok(cell)
    }
}

fn peephole_slot(gate: usize) -> usize {
    if gate == OUTPUT { 2 } else { gate }
}

/// Cell operands of LSTM and UNIDIRECTIONAL_SEQUENCE_LSTM.
fn single_cell(layer_norm: Option<usize>) -> LstmOperands {
    LstmOperands {
        input_weights: 1,
        recurrent_weights: 5,
        peephole: 9,
        bias: 12,
        projection: 16,
        layer_norm,
        aux_weights: None,
        activation: 20,
        cell_clip: 21,
        projection_clip: 22,
    }
}

fn check_states(op: &OperationView, h: usize, batch: usize, units: usize, output_size: usize) -> NnResult<()> {
    op.expect_type(h, FLOAT)?;
    op.expect_type(h + 1, FLOAT)?;
    ensure!(op.input_dims(h)? == [batch, output_size], "Output state must be [{batch}, {output_size}]");
    ensure!(op.input_dims(h + 1)? == [batch, units], "Cell state must be [{batch}, {units}]");
    Ok(())
}

fn check_float_outputs(op: &OperationView) -> NnResult<()> {
    (0..op.output_count()).try_for_each(|o| op.expect_output_type(o, FLOAT))
}

/// LSTM: one step. Outputs are the scratch buffer (left unset), the output
/// state, the cell state and the output.
#[derive(Clone, Debug, Default)]
pub struct Lstm;

impl Lstm {
    fn operands(&self, op: &OperationView) -> LstmOperands {
        single_cell((op.input_count() == 27).then_some(23))
    }
}

impl Translator for Lstm {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        ensure!(matches!(op.input_count(), 23 | 27), "{} has 23 or 27 inputs", op.kind());
        op.expect_outputs(4..=4)?;
        op.expect_type(0, FLOAT)?;
        op.expect_rank(0, 2..=2)?;
        check_float_outputs(op)?;
        let input = op.input_dims(0)?;
        let (units, output_size) = self.operands(op).check(op, input[1], None)?;
        check_states(op, 18, input[0], units, output_size)
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let cell = self.operands(ctx).load(ctx, false)?;
        let (x, h, c) = (ctx.input(0)?, ctx.input(18)?, ctx.input(19)?);
        let (h, c) = cell.step(ctx, "cell", x, None, h, c)?;
        let scratch = ctx.output_index(0)?;
        ctx.registry.set_invalid(scratch);
        Ok(tvec!(ctx.output(1, h)?, ctx.output(2, c)?, ctx.output(3, h)?))
    }
}

/// UNIDIRECTIONAL_SEQUENCE_LSTM: the LSTM cell over a sequence, with
/// time_major at 23 and layer norm weights at 24..=27. Optional outputs 1
/// and 2 hold the final states.
#[derive(Clone, Debug, Default)]
pub struct UnidirectionalSequenceLstm;

impl UnidirectionalSequenceLstm {
    fn operands(&self, op: &OperationView) -> LstmOperands {
        single_cell((op.input_count() == 28).then_some(24))
    }
}

impl Translator for UnidirectionalSequenceLstm {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        ensure!(matches!(op.input_count(), 24 | 28), "{} has 24 or 28 inputs", op.kind());
        ensure!(matches!(op.output_count(), 1 | 3), "{} has 1 or 3 outputs", op.kind());
        op.expect_type(0, FLOAT)?;
        op.expect_type(23, &[Bool])?;
        check_float_outputs(op)?;
        let (_, batch) = sequence_dims(op, 0, op.scalar_bool(23)?)?;
        let (units, output_size) = self.operands(op).check(op, op.input_dims(0)?[2], None)?;
        check_states(op, 18, batch, units, output_size)
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let time_major = ctx.scalar_bool(23)?;
        let cell = self.operands(ctx).load(ctx, false)?;
        let (x, h, c) = (ctx.input(0)?, ctx.input(18)?, ctx.input(19)?);
        let steps = time_steps(ctx, "input", x, time_major)?;
        let (outputs, h, c) = cell.unroll(ctx, "cell", &steps, None, h, c, false)?;
        let output = stack(ctx, "output", &outputs, time_major)?;
        let mut produced = tvec!(ctx.output(0, output)?);
        if ctx.output_count() == 3 {
            produced.push(ctx.output(1, h)?);
            produced.push(ctx.output(2, c)?);
        }
        Ok(produced)
    }
}

/// BIDIRECTIONAL_SEQUENCE_LSTM. Forward cell at 1..=17, backward cell at
/// 18..=34, states at 35..=38, auxiliary input and weights at 39..=47,
/// attributes at 48..=52 and layer norm weights at 53..=60.
#[derive(Clone, Debug, Default)]
pub struct BidirectionalSequenceLstm;

impl BidirectionalSequenceLstm {
    fn operands(&self) -> [LstmOperands; 2] {
        let direction = |offset: usize, aux: usize, layer_norm: usize| LstmOperands {
            input_weights: 1 + offset,
            recurrent_weights: 5 + offset,
            peephole: 9 + offset,
            bias: 12 + offset,
            projection: 16 + offset,
            layer_norm: Some(layer_norm),
            aux_weights: Some(aux),
            activation: 48,
            cell_clip: 49,
            projection_clip: 50,
        };
        [direction(0, 40, 53), direction(17, 44, 57)]
    }

    fn output_count(&self, op: &OperationView) -> NnResult<(bool, usize)> {
        let merge = op.scalar_bool(51)?;
        let sequences = if merge { 1 } else { 2 };
        ensure!(
            op.output_count() == sequences || op.output_count() == sequences + 4,
            "{} with merge_outputs={} has {} or {} outputs",
            op.kind(),
            merge,
            sequences,
            sequences + 4
        );
        Ok((merge, sequences))
    }
}

impl Translator for BidirectionalSequenceLstm {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        op.expect_inputs(61..=61)?;
        op.expect_type(0, FLOAT)?;
        op.expect_type(51, &[Bool])?;
        op.expect_type(52, &[Bool])?;
        check_float_outputs(op)?;
        self.output_count(op)?;
        let time_major = op.scalar_bool(52)?;
        let (_, batch) = sequence_dims(op, 0, time_major)?;
        let input_size = op.input_dims(0)?[2];
        let aux = AuxInput::detect(op, 39, 40, 44);
        let aux_size = if aux == AuxInput::None {
            None
        } else {
            op.expect_type(39, FLOAT)?;
            op.expect_rank(39, 3..=3)?;
            ensure!(op.input_dims(39)?[..2] == op.input_dims(0)?[..2], "Auxiliary input must match input sequence");
            Some(op.input_dims(39)?[2])
        };
        let [fw, bw] = self.operands();
        let weighted = if aux == AuxInput::Weighted { aux_size } else { None };
        let bw_input_size = if aux == AuxInput::Parallel { aux_size.unwrap_or(input_size) } else { input_size };
        let (fw_units, fw_output) = fw.check(op, input_size, weighted)?;
        let (bw_units, bw_output) = bw.check(op, bw_input_size, weighted)?;
        check_states(op, 35, batch, fw_units, fw_output)?;
        check_states(op, 37, batch, bw_units, bw_output)
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let time_major = ctx.scalar_bool(52)?;
        let (merge, sequences) = self.output_count(ctx)?;
        let aux = AuxInput::detect(ctx, 39, 40, 44);
        let weighted = aux == AuxInput::Weighted;
        let [fw_operands, bw_operands] = self.operands();
        let fw = fw_operands.load(ctx, weighted)?;
        let bw = bw_operands.load(ctx, weighted)?;

        let x = ctx.input(0)?;
        let steps = time_steps(ctx, "input", x, time_major)?;
        let aux_steps = if aux == AuxInput::None {
            None
        } else {
            let aux = ctx.input(39)?;
            Some(time_steps(ctx, "aux_input", aux, time_major)?)
        };
        let weighted_steps = aux_steps.as_deref().filter(|_| weighted);

        let (fw_h, fw_c) = (ctx.input(35)?, ctx.input(36)?);
        let (fw_outputs, fw_h, fw_c) = fw.unroll(ctx, "fw", &steps, weighted_steps, fw_h, fw_c, false)?;
        let (bw_h, bw_c) = (ctx.input(37)?, ctx.input(38)?);
        let bw_steps = match (aux, &aux_steps) {
            (AuxInput::Parallel, Some(aux_steps)) => aux_steps,
            _ => &steps,
        };
        let (bw_outputs, bw_h, bw_c) = bw.unroll(ctx, "bw", bw_steps, weighted_steps, bw_h, bw_c, true)?;
        let fw_output = stack(ctx, "fw_output", &fw_outputs, time_major)?;
        let bw_output = stack(ctx, "bw_output", &bw_outputs, time_major)?;

        let mut produced = if merge {
            let merged = ctx.wire1("merge", Concat::new(2), &[fw_output, bw_output])?;
            tvec!(ctx.output(0, merged)?)
        } else {
            tvec!(ctx.output(0, fw_output)?, ctx.output(1, bw_output)?)
        };
        if ctx.output_count() > sequences {
            for (o, state) in [fw_h, fw_c, bw_h, bw_c].into_iter().enumerate() {
                produced.push(ctx.output(sequences + o, state)?);
            }
        }
        Ok(produced)
    }
}

/// QUANTIZED_16BIT_LSTM: one step of a quantized LSTM without optional
/// features. Inputs are the data, input and recurrent weights, INT32
/// biases, then the previous cell state (16 bit) and output (8 bit).
/// Outputs are the new cell state and output.
#[derive(Clone, Debug, Default)]
pub struct Quantized16BitLstm;

impl Translator for Quantized16BitLstm {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        op.expect_inputs(15..=15)?;
        op.expect_outputs(2..=2)?;
        op.expect_type(0, &[TensorQuant8Asymm])?;
        op.expect_rank(0, 2..=2)?;
        let [batch, input_size] = [op.input_dims(0)?[0], op.input_dims(0)?[1]];
        op.expect_rank(1, 2..=2)?;
        let units = op.input_dims(1)?[0];
        for gate in 0..4 {
            op.expect_type(1 + gate, &[TensorQuant8Asymm])?;
            op.expect_type(5 + gate, &[TensorQuant8Asymm])?;
            op.expect_type(9 + gate, &[TensorInt32])?;
            ensure!(op.input_dims(1 + gate)? == [units, input_size], "Input weights must be [{units}, {input_size}]");
            ensure!(op.input_dims(5 + gate)? == [units, units], "Recurrent weights must be [{units}, {units}]");
            ensure!(op.input_dims(9 + gate)? == [units], "Bias must be [{units}]");
        }
        op.expect_type(13, &[TensorQuant16Symm])?;
        op.expect_type(14, &[TensorQuant8Asymm])?;
        ensure!(op.input_dims(13)? == [batch, units], "Cell state must be [{batch}, {units}]");
        ensure!(op.input_dims(14)? == [batch, units], "Output state must be [{batch}, {units}]");
        op.expect_output_type(0, &[TensorQuant16Symm])?;
        op.expect_output_type(1, &[TensorQuant8Asymm])?;
        Ok(())
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let mut cell = LstmCell::plain(RecurrentActivation::Tanh);
        for gate in INPUT..=OUTPUT {
            cell.input[gate] = Some(ctx.input_f32(1 + gate)?);
            cell.recurrent[gate] = Some(ctx.input_f32(5 + gate)?);
            cell.bias[gate] = Some(ctx.input_bias_f32(9 + gate, 0, 1 + gate)?);
        }
        let x = ctx.input_f32(0)?;
        let c = ctx.input_f32(13)?;
        let h = ctx.input_f32(14)?;
        let (h, c) = cell.step(ctx, "cell", x, None, h, c)?;
        Ok(tvec!(ctx.output(0, c)?, ctx.output(1, h)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::test_utils::*;

    /// Operands of a float cell from `first`: 4 input weights, 4 recurrent
    /// weights, 3 peepholes, 4 biases, projection weights and bias.
    fn cell_operands(model: &mut Model, units: usize, input: usize, output: usize, features: Features) -> Vec<usize> {
        let mut ops = vec![];
        let tensor = |model: &mut Model, dims: &[usize]| {
            let len = dims.iter().product::<usize>();
            model.add_tensor_f32(dims, &vec![0.1; len]).unwrap()
        };
        for gate in 0..4 {
            ops.push(if gate == INPUT && features.cifg {
                model.add_omitted(TensorFloat32)
            } else {
                tensor(model, &[units, input])
            });
        }
        for gate in 0..4 {
            ops.push(if gate == INPUT && features.cifg {
                model.add_omitted(TensorFloat32)
            } else {
                tensor(model, &[units, output])
            });
        }
        for gate in 0..3 {
            ops.push(if !features.peephole || (gate == 0 && features.cifg) {
                model.add_omitted(TensorFloat32)
            } else {
                tensor(model, &[units])
            });
        }
        for gate in 0..4 {
            ops.push(if gate == INPUT && features.cifg {
                model.add_omitted(TensorFloat32)
            } else {
                tensor(model, &[units])
            });
        }
        if features.projection {
            ops.push(tensor(model, &[output, units]));
            ops.push(tensor(model, &[output]));
        } else {
            ops.push(model.add_omitted(TensorFloat32));
            ops.push(model.add_omitted(TensorFloat32));
        }
        ops
    }

    const PLAIN: Features = Features { cifg: false, peephole: false, projection: false, layer_norm: false };

    fn lstm(features: Features, units: usize, output: usize) -> Model {
        let mut model = Model::default();
        let x = model.add_operand(TensorFloat32, &[2, 3]);
        let mut inputs = vec![x];
        inputs.extend(cell_operands(&mut model, units, 3, output, features));
        inputs.push(model.add_operand(TensorFloat32, &[2, output]));
        inputs.push(model.add_operand(TensorFloat32, &[2, units]));
        inputs.extend([model.add_scalar_i32(4), model.add_scalar_f32(0.0), model.add_scalar_f32(0.0)]);
        if features.layer_norm {
            for gate in 0..4 {
                inputs.push(if gate == INPUT && features.cifg {
                    model.add_omitted(TensorFloat32)
                } else {
                    model.add_tensor_f32(&[units], &vec![1.0; units]).unwrap()
                });
            }
        }
        let outputs = [
            model.add_operand(TensorFloat32, &[2, units * 4]),
            model.add_operand(TensorFloat32, &[2, output]),
            model.add_operand(TensorFloat32, &[2, units]),
            model.add_operand(TensorFloat32, &[2, output]),
        ];
        single_op(&mut model, OperationType::Lstm, &inputs, &outputs);
        model
    }

    #[test]
    fn plain_lstm() {
        let model = lstm(PLAIN, 4, 4);
        let graph = translate(&model).unwrap();
        assert_eq!(graph.outputs().len(), 3);
        assert_eq!(output_shape(&graph, 0).as_slice(), &[2, 4]);
        assert!(graph.model().node_by_name("0-LSTM.cell.input_gate.bias").is_ok());
    }

    #[test]
    fn cifg_with_peephole() {
        let model = lstm(Features { cifg: true, peephole: true, ..PLAIN }, 4, 4);
        let graph = translate(&model).unwrap();
        assert!(graph.model().node_by_name("0-LSTM.cell.input_gate.bias").is_err());
        assert!(graph.model().node_by_name("0-LSTM.cell.output_gate.peephole").is_ok());
        assert!(graph.model().node_by_name("0-LSTM.cell.input").unwrap().op_is::<BinOp>());
    }

    #[test]
    fn projection_and_layer_norm() {
        let features = Features { projection: true, layer_norm: true, ..PLAIN };
        let graph = translate(&lstm(features, 5, 3)).unwrap();
        assert_eq!(output_shape(&graph, 0).as_slice(), &[2, 3]);
        assert_eq!(output_shape(&graph, 1).as_slice(), &[2, 5]);
        assert!(graph.model().node_by_name("0-LSTM.cell.forget_gate.norm.rsqrt").is_ok());
    }

    #[test]
    fn size_mismatch_without_projection() {
        assert!(!supported(&lstm(PLAIN, 4, 3)));
    }

    #[test]
    fn unidirectional_sequence() {
        let mut model = Model::default();
        let x = model.add_operand(TensorFloat32, &[2, 6, 3]);
        let mut inputs = vec![x];
        inputs.extend(cell_operands(&mut model, 4, 3, 4, PLAIN));
        inputs.push(model.add_operand(TensorFloat32, &[2, 4]));
        inputs.push(model.add_operand(TensorFloat32, &[2, 4]));
        inputs.extend([model.add_scalar_i32(4), model.add_scalar_f32(10.0), model.add_scalar_f32(0.0)]);
        inputs.push(model.add_scalar_bool(false));
        let y = model.add_operand(TensorFloat32, &[2, 6, 4]);
        single_op(&mut model, OperationType::UnidirectionalSequenceLstm, &inputs, &[y]);
        let graph = translate(&model).unwrap();
        assert_eq!(output_shape(&graph, 0).as_slice(), &[2, 6, 4]);
        assert!(graph.model().node_by_name("0-UNIDIRECTIONAL_SEQUENCE_LSTM.cell.t5.cell.clip").is_ok());
    }

    #[test]
    fn bidirectional_merged_with_states() {
        let mut model = Model::default();
        let x = model.add_operand(TensorFloat32, &[3, 2, 5]);
        let mut inputs = vec![x];
        inputs.extend(cell_operands(&mut model, 4, 5, 4, PLAIN));
        inputs.extend(cell_operands(&mut model, 6, 5, 6, PLAIN));
        for dims in [[2, 4], [2, 4], [2, 6], [2, 6]] {
            inputs.push(model.add_operand(TensorFloat32, &dims));
        }
        for _ in 39..48 {
            inputs.push(model.add_omitted(TensorFloat32));
        }
        inputs.extend([model.add_scalar_i32(4), model.add_scalar_f32(0.0), model.add_scalar_f32(0.0)]);
        inputs.extend([model.add_scalar_bool(true), model.add_scalar_bool(true)]);
        for _ in 53..61 {
            inputs.push(model.add_omitted(TensorFloat32));
        }
        assert_eq!(inputs.len(), 61);
        let outputs = [
            model.add_operand(TensorFloat32, &[3, 2, 10]),
            model.add_operand(TensorFloat32, &[2, 4]),
            model.add_operand(TensorFloat32, &[2, 4]),
            model.add_operand(TensorFloat32, &[2, 6]),
            model.add_operand(TensorFloat32, &[2, 6]),
        ];
        single_op(&mut model, OperationType::BidirectionalSequenceLstm, &inputs, &outputs);
        let graph = translate(&model).unwrap();
        assert_eq!(graph.outputs().len(), 5);
        assert_eq!(output_shape(&graph, 0).as_slice(), &[3, 2, 10]);
        assert_eq!(output_shape(&graph, 4).as_slice(), &[2, 6]);
    }

    #[test]
    fn quantized_16bit() {
        let mut model = Model::default();
        let x = model.add_quantized_operand(TensorQuant8Asymm, &[2, 3], 1.0 / 128.0, 128);
        let mut inputs = vec![x];
        for dims in [[4, 3], [4, 3], [4, 3], [4, 3], [4, 4], [4, 4], [4, 4], [4, 4]] {
            let len = dims.iter().product::<usize>();
            inputs.push(model.add_tensor_quant8(TensorQuant8Asymm, &dims, 0.01, 128, &vec![130; len]).unwrap());
        }
        for _ in 0..4 {
            inputs.push(model.add_tensor_i32(&[4], &[10, 20, 30, 40]).unwrap());
        }
        inputs.push(model.add_quantized_operand(TensorQuant16Symm, &[2, 4], 1.0 / 2048.0, 0));
        inputs.push(model.add_quantized_operand(TensorQuant8Asymm, &[2, 4], 1.0 / 128.0, 128));
        let c = model.add_quantized_operand(TensorQuant16Symm, &[2, 4], 1.0 / 2048.0, 0);
        let h = model.add_quantized_operand(TensorQuant8Asymm, &[2, 4], 1.0 / 128.0, 128);
        single_op(&mut model, OperationType::Quantized16BitLstm, &inputs, &[c, h]);
        let graph = translate(&model).unwrap();
        assert_eq!(graph.output_fact(0).unwrap().datum_type, DatumType::I16);
        assert_eq!(graph.output_fact(1).unwrap().datum_type, DatumType::U8);
    }
}
