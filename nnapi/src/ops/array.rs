//! Shape and data movement. These work on raw values whenever the input
//! and output quantization grids agree.
use super::Translator;
use crate::context::{ANY_TENSOR, NUMERIC};
use crate::internal::*;
use crate::model::OperandType::*;
use nnhal_graph::ops::array::{Concat, Gather as GatherOp, Pad as PadOp, Slice as SliceOp, SliceAxis, Split as SplitOp};
use nnhal_graph::ops::change_axes::{AxisOp, is_permutation};
use nnhal_graph::ops::logic::Select as SelectOp;
use nnhal_graph::ops::nn::TopK;
use nnhal_graph::ops::resolve_axis;

fn expect_same_kind(op: &OperationView, i: usize, o: usize) -> NnResult<()> {
    let ty = op.input_type(i)?;
    op.expect_output_type(o, &[ty])
}

fn axis(op: &OperationView, i: usize, rank: usize) -> NnResult<usize> {
    resolve_axis(op.scalar_i32(i)? as i64, rank)
}

/// A constant INT32 vector input with one entry per data axis.
fn per_axis(op: &OperationView, i: usize, rank: usize) -> NnResult<Vec<i32>> {
    op.expect_type(i, &[TensorInt32])?;
    op.expect_const(i)?;
    let values = op.vec_i32(i)?;
    ensure!(values.len() == rank, "{} input {} has {} values for rank {}", op.kind(), i, values.len(), rank);
    Ok(values)
}

/// Raw values unless one of `inputs` needs requantizing for output 0.
fn data_inputs(ctx: &mut BuildContext, inputs: &[usize]) -> NnResult<TVec<OutletId>> {
    let mut raw = true;
    for &i in inputs {
        raw &= ctx.is_passthrough(i, 0)?;
    }
    inputs.iter().map(|&i| if raw { ctx.input(i) } else { ctx.input_f32(i) }).collect()
}

fn wire_reshape(ctx: &mut BuildContext, input: OutletId, shape: TVec<usize>) -> NnResult<OutletId> {
    ctx.wire1("reshape", AxisOp::Reshape(shape), &[input])
}

#[derive(Clone, Debug, Default)]
pub struct Concatenation;

impl Translator for Concatenation {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        op.expect_inputs(2..=usize::MAX)?;
        op.expect_outputs(1..=1)?;
        let n = op.input_count() - 1;
        let first = op.input_dims(0)?;
        op.expect_rank(0, 1..=4)?;
        let axis = axis(op, n, first.len())?;
        for i in 0..n {
            op.expect_type(i, ANY_TENSOR)?;
            op.expect_same_type(0, i)?;
            let dims = op.input_dims(i)?;
            ensure!(
                dims.len() == first.len()
                    && dims.iter().zip(first).enumerate().all(|(ax, (a, b))| ax == axis || a == b),
                "Can not concatenate {:?} and {:?} on axis {}",
                first,
                dims,
                axis
            );
        }
        expect_same_kind(op, 0, 0)
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let n = ctx.input_count() - 1;
        let axis = axis(ctx, n, ctx.input_rank(0)?)?;
        let inputs = data_inputs(ctx, &(0..n).collect::<Vec<_>>())?;
        let wire = ctx.wire1("concat", Concat::new(axis), &inputs)?;
        Ok(tvec!(ctx.output(0, wire)?))
    }
}

/// SPLIT into `num_splits` equal parts, one output each.
#[derive(Clone, Debug, Default)]
pub struct Split;

impl Translator for Split {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        op.expect_inputs(3..=3)?;
        op.expect_type(0, ANY_TENSOR)?;
        op.expect_rank(0, 1..=4)?;
        let dims = op.input_dims(0)?;
        let axis = axis(op, 1, dims.len())?;
        let splits = op.scalar_usize(2)?;
        ensure!(splits > 0 && dims[axis] % splits == 0, "Can not split {:?} in {} on axis {}", dims, splits, axis);
        op.expect_outputs(splits..=splits)?;
        for o in 0..splits {
            expect_same_kind(op, 0, o)?;
        }
        Ok(())
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let axis = axis(ctx, 1, ctx.input_rank(0)?)?;
        let splits = ctx.scalar_usize(2)?;
        let mut raw = true;
        for o in 0..splits {
            raw &= ctx.is_passthrough(0, o)?;
        }
        let input = if raw { ctx.input(0)? } else { ctx.input_f32(0)? };
        let len = ctx.shape(input)?[axis] / splits;
        let parts = ctx.wire("split", SplitOp::new(axis, tvec![len; splits]), &[input])?;
        parts.iter().enumerate().map(|(o, part)| ctx.output(o, *part)).collect()
    }
}

/// RESHAPE to a constant shape. One dimension may be -1.
#[derive(Clone, Debug, Default)]
pub struct Reshape;

impl Reshape {
    fn shape(&self, op: &OperationView) -> NnResult<TVec<usize>> {
        let target = op.vec_i32(1)?;
        let volume: usize = op.input_dims(0)?.iter().product();
        ensure!(target.iter().filter(|d| **d == -1).count() <= 1, "Reshape to {:?} has more than one -1", target);
        let known = target.iter().filter(|d| **d != -1).map(|d| usize::try_from(*d)).collect::<Result<Vec<_>, _>>()?;
        let product: usize = known.iter().product();
        ensure!(product > 0 && volume % product == 0, "Can not reshape {} values to {:?}", volume, target);
        Ok(target.iter().map(|d| if *d == -1 { volume / product } else { *d as usize }).collect())
    }
}

impl Translator for Reshape {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        op.expect_inputs(2..=2)?;
        op.expect_outputs(1..=1)?;
        op.expect_type(0, ANY_TENSOR)?;
        op.expect_type(1, &[TensorInt32])?;
        op.expect_const(1)?;
        let shape = self.shape(op)?;
        ensure!(
            shape.iter().product::<usize>() == op.input_dims(0)?.iter().product::<usize>(),
            "Can not reshape {:?} to {:?}",
            op.input_dims(0)?,
            shape
        );
        expect_same_kind(op, 0, 0)
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let shape = self.shape(ctx)?;
        let input = ctx.input_for_output(0, 0)?;
        let wire = wire_reshape(ctx, input, shape)?;
        Ok(tvec!(ctx.output(0, wire)?))
    }
}

/// SQUEEZE the listed 1-sized axes, or all of them when omitted.
#[derive(Clone, Debug, Default)]
pub struct Squeeze;

impl Squeeze {
    fn shape(&self, op: &OperationView) -> NnResult<TVec<usize>> {
        let dims = op.input_dims(0)?;
        let axes = if op.has_input(1) {
            op.expect_const(1)?;
            op.vec_i32(1)?.into_iter().map(|a| resolve_axis(a as i64, dims.len())).collect::<NnResult<Vec<_>>>()?
        } else {
            (0..dims.len()).filter(|&ax| dims[ax] == 1).collect()
        };
        for &ax in &axes {
            ensure!(dims[ax] == 1, "Can not squeeze axis {} of {:?}", ax, dims);
        }
        Ok(dims.iter().enumerate().filter(|(ax, _)| !axes.contains(ax)).map(|(_, d)| *d).collect())
    }
}

impl Translator for Squeeze {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        op.expect_inputs(1..=2)?;
        op.expect_outputs(1..=1)?;
        op.expect_type(0, ANY_TENSOR)?;
        op.expect_rank(0, 1..=4)?;
        if op.has_input(1) {
            op.expect_type(1, &[TensorInt32])?;
        }
        self.shape(op)?;
        expect_same_kind(op, 0, 0)
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let shape = self.shape(ctx)?;
        let input = ctx.input_for_output(0, 0)?;
        let wire = wire_reshape(ctx, input, shape)?;
        Ok(tvec!(ctx.output(0, wire)?))
    }
}

#[derive(Clone, Debug, Default)]
pub struct ExpandDims;

impl ExpandDims {
    fn axis(&self, op: &OperationView) -> NnResult<usize> {
        axis(op, 1, op.input_rank(0)? + 1)
    }
}

impl Translator for ExpandDims {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        op.expect_inputs(2..=2)?;
        op.expect_outputs(1..=1)?;
        op.expect_type(0, ANY_TENSOR)?;
        self.axis(op)?;
        expect_same_kind(op, 0, 0)
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let axis = self.axis(ctx)?;
        let input = ctx.input_for_output(0, 0)?;
        let wire = ctx.wire1("expand", AxisOp::Add(axis), &[input])?;
        Ok(tvec!(ctx.output(0, wire)?))
    }
}

/// TRANSPOSE. Axes are reversed when the permutation is omitted.
#[derive(Clone, Debug, Default)]
pub struct Transpose;

impl Transpose {
    fn permutation(&self, op: &OperationView) -> NnResult<TVec<usize>> {
        let rank = op.input_rank(0)?;
        if !op.has_input(1) {
            return Ok((0..rank).rev().collect());
        }
        let perm = per_axis(op, 1, rank)?
            .into_iter()
            .map(usize::try_from)
            .collect::<Result<TVec<_>, _>>()?;
        ensure!(is_permutation(&perm, rank), "Invalid permutation {:?}", perm);
        Ok(perm)
    }
}

impl Translator for Transpose {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        op.expect_inputs(1..=2)?;
        op.expect_outputs(1..=1)?;
        op.expect_type(0, ANY_TENSOR)?;
        op.expect_rank(0, 1..=4)?;
        self.permutation(op)?;
        expect_same_kind(op, 0, 0)
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let perm = self.permutation(ctx)?;
        let input = ctx.input_for_output(0, 0)?;
        let wire = ctx.wire1("transpose", AxisOp::Permute(perm), &[input])?;
        Ok(tvec!(ctx.output(0, wire)?))
    }
}

fn bit(mask: i32, ax: usize) -> bool {
    mask >> ax & 1 == 1
}

/// STRIDED_SLICE with begin, end and shrink-axis masks. A fully shrunk
/// result is a one-element vector.
#[derive(Clone, Debug, Default)]
pub struct StridedSlice;

impl StridedSlice {
    fn axes(&self, op: &OperationView) -> NnResult<(TVec<SliceAxis>, TVec<usize>)> {
        let dims = op.input_dims(0)?;
        let rank = dims.len();
        let (begins, ends, strides) = (per_axis(op, 1, rank)?, per_axis(op, 2, rank)?, per_axis(op, 3, rank)?);
        let (begin_mask, end_mask, shrink_mask) = (op.scalar_i32(4)?, op.scalar_i32(5)?, op.scalar_i32(6)?);
        let mut axes = tvec!();
        let mut shrunk = tvec!();
        for ax in 0..rank {
            let dim = dims[ax] as i64;
            let stride = strides[ax] as i64;
            ensure!(stride != 0, "Strided slice with a zero stride");
            let resolve = |v: i32| if v < 0 { v as i64 + dim } else { v as i64 };
            if bit(shrink_mask, ax) {
                ensure!(stride > 0, "Shrunk axis {} with a negative stride", ax);
                let begin = resolve(begins[ax]);
                ensure!((0..dim).contains(&begin), "Shrunk axis {} out of range", ax);
                axes.push(SliceAxis::new(begin, begin + 1, 1));
                shrunk.push(ax);
                continue;
            }
            let axis = if stride > 0 {
                let begin = if bit(begin_mask, ax) { 0 } else { resolve(begins[ax]).clamp(0, dim) };
                let end = if bit(end_mask, ax) { dim } else { resolve(ends[ax]).clamp(0, dim) };
                SliceAxis::new(begin, end, stride)
            } else {
                let begin = if bit(begin_mask, ax) { dim - 1 } else { resolve(begins[ax]).clamp(-1, dim - 1) };
                let end = if bit(end_mask, ax) { -1 } else { resolve(ends[ax]).clamp(-1, dim - 1) };
                SliceAxis::new(begin, end, stride)
            };
            axes.push(if axis.is_empty() { SliceAxis::new(0, 0, stride) } else { axis });
        }
        Ok((axes, shrunk))
    }
}

impl Translator for StridedSlice {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        op.expect_inputs(7..=7)?;
        op.expect_outputs(1..=1)?;
        op.expect_type(0, ANY_TENSOR)?;
        op.expect_rank(0, 1..=4)?;
        for i in 4..=6 {
            op.expect_type(i, &[Int32])?;
        }
        self.axes(op)?;
        expect_same_kind(op, 0, 0)
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let (axes, shrunk) = self.axes(ctx)?;
        let input = ctx.input_for_output(0, 0)?;
        let mut wire = ctx.wire1("slice", SliceOp::new(axes), &[input])?;
        if !shrunk.is_empty() {
            let shape = ctx.shape(wire)?;
            let mut kept: TVec<usize> =
                shape.iter().enumerate().filter(|(ax, _)| !shrunk.contains(ax)).map(|(_, d)| *d).collect();
            if kept.is_empty() {
                kept.push(1);
            }
            wire = ctx.wire1("shrink", AxisOp::Reshape(kept), &[wire])?;
        }
        Ok(tvec!(ctx.output(0, wire)?))
    }
}

/// SLICE by begin and size, a size of -1 meaning to the end of the axis.
#[derive(Clone, Debug, Default)]
pub struct Slice;

impl Slice {
    fn axes(&self, op: &OperationView) -> NnResult<TVec<SliceAxis>> {
        let dims = op.input_dims(0)?;
        let (begins, sizes) = (per_axis(op, 1, dims.len())?, per_axis(op, 2, dims.len())?);
        dims.iter()
            .zip(begins.iter().zip(sizes.iter()))
            .map(|(&dim, (&begin, &size))| {
                let (dim, begin, size) = (dim as i64, begin as i64, size as i64);
                let end = if size == -1 { dim } else { begin + size };
                ensure!(begin >= 0 && size >= -1 && end <= dim, "Slice {}+{} out of range {}", begin, size, dim);
                Ok(SliceAxis::new(begin, end, 1))
            })
            .collect()
    }
}

impl Translator for Slice {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        op.expect_inputs(3..=3)?;
        op.expect_outputs(1..=1)?;
        op.expect_type(0, ANY_TENSOR)?;
        op.expect_rank(0, 1..=4)?;
        self.axes(op)?;
        expect_same_kind(op, 0, 0)
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let axes = self.axes(ctx)?;
        let input = ctx.input_for_output(0, 0)?;
        let wire = ctx.wire1("slice", SliceOp::new(axes), &[input])?;
        Ok(tvec!(ctx.output(0, wire)?))
    }
}

/// GATHER: data, axis, INT32 indices.
#[derive(Clone, Debug, Default)]
pub struct Gather;

impl Translator for Gather {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        op.expect_inputs(3..=3)?;
        op.expect_outputs(1..=1)?;
        op.expect_type(0, ANY_TENSOR)?;
        op.expect_rank(0, 1..=4)?;
        axis(op, 1, op.input_rank(0)?)?;
        op.expect_type(2, &[TensorInt32])?;
        expect_same_kind(op, 0, 0)
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let axis = axis(ctx, 1, ctx.input_rank(0)?)?;
        let data = ctx.input_for_output(0, 0)?;
        let indices = ctx.input(2)?;
        let wire = ctx.wire1("gather", GatherOp::new(axis), &[data, indices])?;
        Ok(tvec!(ctx.output(0, wire)?))
    }
}

/// PAD and PAD_V2. Padding is zero in the real domain, unless PAD_V2 gives
/// a value, which is in the quantized domain for quantized data.
#[derive(Clone, Debug, new)]
pub struct Pad {
    pub with_value: bool,
}

impl Pad {
    fn pads(&self, op: &OperationView) -> NnResult<TVec<(usize, usize)>> {
        op.expect_type(1, &[TensorInt32])?;
        op.expect_const(1)?;
        let rank = op.input_rank(0)?;
        let values = op.vec_i32(1)?;
        ensure!(values.len() == rank * 2, "Paddings {:?} do not match rank {}", values, rank);
        values
            .chunks(2)
            .map(|pair| -> NnResult<(usize, usize)> { Ok((usize::try_from(pair[0])?, usize::try_from(pair[1])?)) })
            .collect()
    }

    /// Pad value in the real domain.
    fn real_value(&self, op: &OperationView) -> NnResult<f32> {
        if !self.with_value {
            return Ok(0.0);
        }
        match op.input_operand(0)?.quant_params() {
            Some(QuantParams::PerTensor { scale, zero_point }) => {
                Ok((op.scalar_i32(2)? as i64 - zero_point as i64) as f32 * scale)
            }
            Some(_) => bail!("Per-channel padded data"),
            None => op.scalar_f32(2),
        }
    }

    /// Pad value on the raw grid of the input.
    fn raw_value(&self, op: &OperationView) -> NnResult<f32> {
        match op.input_operand(0)?.quant_params() {
            Some(QuantParams::PerTensor { zero_point, .. }) => {
                Ok(if self.with_value { op.scalar_i32(2)? as f32 } else { zero_point as f32 })
            }
            Some(_) => bail!("Per-channel padded data"),
            None => self.real_value(op),
        }
    }
}

impl Translator for Pad {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        op.expect_inputs(if self.with_value { 3..=3 } else { 2..=2 })?;
        op.expect_outputs(1..=1)?;
        op.expect_type(0, NUMERIC)?;
        op.expect_rank(0, 1..=4)?;
        self.pads(op)?;
        if self.with_value {
            let float = op.input_type(0)? == TensorFloat32;
            op.expect_type(2, if float { &[Float32] } else { &[Int32] })?;
            let datum_type = op.input_operand(0)?.datum_type();
            if let Some((min, max)) = datum_type.integer_range().filter(|_| !float) {
                let value = op.scalar_i32(2)? as i64;
                ensure!((min..=max).contains(&value), "Pad value {} out of {:?} range", value, datum_type);
            }
        }
        self.raw_value(op)?;
        expect_same_kind(op, 0, 0)
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let pads = self.pads(ctx)?;
        let (input, value) = if ctx.is_passthrough(0, 0)? {
            (ctx.input(0)?, self.raw_value(ctx)?)
        } else {
            (ctx.input_f32(0)?, self.real_value(ctx)?)
        };
        let wire = ctx.wire1("pad", PadOp::new(pads, value), &[input])?;
        Ok(tvec!(ctx.output(0, wire)?))
    }
}

/// SELECT: boolean condition, then the two branches. Shapes broadcast.
#[derive(Clone, Debug, Default)]
pub struct Select;

impl Translator for Select {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        op.expect_inputs(3..=3)?;
        op.expect_outputs(1..=1)?;
        op.expect_type(0, &[TensorBool8])?;
        op.expect_type(1, ANY_TENSOR)?;
        op.expect_same_type(1, 2)?;
        multi_broadcast(&[op.input_dims(0)?, op.input_dims(1)?, op.input_dims(2)?])?;
        expect_same_kind(op, 1, 0)
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let cond = ctx.input(0)?;
        let branches = data_inputs(ctx, &[1, 2])?;
        let wire = ctx.wire1("select", SelectOp, &[cond, branches[0], branches[1]])?;
        Ok(tvec!(ctx.output(0, wire)?))
    }
}

/// CHANNEL_SHUFFLE: split an axis in `groups` and transpose the split.
#[derive(Clone, Debug, Default)]
pub struct ChannelShuffle;

impl ChannelShuffle {
    fn attributes(&self, op: &OperationView) -> NnResult<(usize, usize)> {
        let dims = op.input_dims(0)?;
        let groups = op.scalar_usize(1)?;
        let axis = axis(op, 2, dims.len())?;
        ensure!(groups > 0 && dims[axis] % groups == 0, "Can not shuffle {} channels in {} groups", dims[axis], groups);
        Ok((groups, axis))
    }
}

impl Translator for ChannelShuffle {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        op.expect_inputs(3..=3)?;
        op.expect_outputs(1..=1)?;
        op.expect_type(0, NUMERIC)?;
        op.expect_rank(0, 1..=4)?;
        self.attributes(op)?;
        expect_same_kind(op, 0, 0)
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let (groups, axis) = self.attributes(ctx)?;
        let input = ctx.input_for_output(0, 0)?;
        let shape = ctx.shape(input)?;
        let mut split: TVec<usize> = shape[..axis].into();
        split.push(groups);
        split.push(shape[axis] / groups);
        split.extend(shape[axis + 1..].iter().copied());
        let wire = ctx.wire1("split_channels", AxisOp::Reshape(split), &[input])?;
        let mut perm: TVec<usize> = (0..shape.len() + 1).collect();
        perm.swap(axis, axis + 1);
        let wire = ctx.wire1("shuffle", AxisOp::Permute(perm), &[wire])?;
        let wire = ctx.wire1("merge_channels", AxisOp::Reshape(shape), &[wire])?;
        Ok(tvec!(ctx.output(0, wire)?))
    }
}

/// TOPK_V2 on the last axis: values, then INT32 indices.
#[derive(Clone, Debug, Default)]
pub struct TopkV2;

impl Translator for TopkV2 {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        op.expect_inputs(2..=2)?;
        op.expect_outputs(2..=2)?;
        op.expect_type(0, NUMERIC)?;
        op.expect_rank(0, 1..=4)?;
        let last = op.input_dims(0)?.last().copied().unwrap_or(0);
        let k = op.scalar_usize(1)?;
        ensure!(k > 0 && k <= last, "k={} out of range for {}", k, last);
        expect_same_kind(op, 0, 0)?;
        op.expect_output_type(1, &[TensorInt32])
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let k = ctx.scalar_usize(1)?;
        let input = ctx.input_for_output(0, 0)?;
        let axis = ctx.shape(input)?.len() - 1;
        let outputs = ctx.wire("topk", TopK::new(axis, k), &[input])?;
        Ok(tvec!(ctx.output(0, outputs[0])?, ctx.output(1, outputs[1])?))
    }
}
