use super::Translator;
use super::element_wise::activation;
use crate::activation::{FusedActivation, wire_fused_activation};
use crate::context::{FILTER, FLOAT, FLOAT_OR_QUANT8, QUANT8};
use crate::internal::*;
use crate::layout::Conversion;
use crate::model::OperandType::*;
use crate::padding::{Padding, effective_filter, same_padding_transposed};
use nnhal_graph::ops::binary::BinOp;
use nnhal_graph::ops::change_axes::AxisOp;
use nnhal_graph::ops::cnn::{Conv, Deconv};

/// Spatial attributes of a windowed operation, (height, width) ordered.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Window {
    pub padding: [Padding; 2],
    pub strides: [usize; 2],
    pub dilations: [usize; 2],
    pub activation: FusedActivation,
    pub nchw: bool,
}

impl Window {
    pub fn pads(&self, input: &[usize], filter: &[usize]) -> (TVec<usize>, TVec<usize>) {
        (0..2)
            .map(|ax| {
                let filter = effective_filter(filter[ax], self.dilations[ax]);
                self.padding[ax].resolve(input[ax], self.strides[ax], filter)
            })
            .unzip()
    }

    /// The dilated filter must fit in the padded input on both axes.
    pub fn check_fits(&self, input: &[usize], filter: &[usize]) -> NnResult<()> {
        let (before, after) = self.pads(input, filter);
        for ax in 0..2 {
            let padded = input[ax] + before[ax] + after[ax];
            let field = effective_filter(filter[ax], self.dilations[ax]);
            ensure!(field <= padded, "Filter field {} larger than padded input {}", field, padded);
        }
        Ok(())
    }

    pub fn strides(&self) -> TVec<usize> {
        self.strides.iter().copied().collect()
    }
}

/// NNAPI orders explicit paddings left, right, top, bottom.
pub(crate) fn explicit_padding(op: &OperationView, first: usize) -> NnResult<[Padding; 2]> {
    let left = op.scalar_usize(first)?;
    let right = op.scalar_usize(first + 1)?;
    let top = op.scalar_usize(first + 2)?;
    let bottom = op.scalar_usize(first + 3)?;
    Ok([Padding::Explicit { before: top, after: bottom }, Padding::Explicit { before: left, after: right }])
}

pub(crate) fn implicit_padding(op: &OperationView, i: usize) -> NnResult<[Padding; 2]> {
    let padding = Padding::from_scheme(op.scalar_i32(i)?);
    Ok([padding, padding])
}

/// (w, h) pair of positive integers starting at input `first`, returned
/// as (h, w).
pub(crate) fn spatial_pair(op: &OperationView, first: usize) -> NnResult<[usize; 2]> {
    let pair = [op.scalar_usize(first + 1)?, op.scalar_usize(first)?];
    ensure!(pair.iter().all(|v| *v > 0), "{} expects positive values, got {:?}", op.kind(), pair);
    Ok(pair)
}

pub(crate) fn window(
    op: &OperationView,
    padding: [Padding; 2],
    strides: usize,
    act: usize,
    layout: usize,
    dilations: Option<usize>,
) -> NnResult<Window> {
    let strides = spatial_pair(op, strides)?;
    let activation = activation(op, act)?;
    let nchw = op.nchw(layout)?;
    let dilations = match dilations {
        Some(d) if op.has_input(d) => spatial_pair(op, d)?,
        _ => [1, 1],
    };
    Ok(Window { padding, strides, dilations, activation, nchw })
}

/// Declared (h, w) of a 4D operand.
pub(crate) fn spatial_dims(dims: &[usize], nchw: bool) -> NnResult<[usize; 2]> {
    ensure!(dims.len() == 4, "Expected a 4D shape, got {:?}", dims);
    Ok(if nchw { [dims[2], dims[3]] } else { [dims[1], dims[2]] })
}

pub(crate) fn channels(dims: &[usize], nchw: bool) -> NnResult<usize> {
    ensure!(dims.len() == 4, "Expected a 4D shape, got {:?}", dims);
    Ok(if nchw { dims[1] } else { dims[3] })
}

fn check_operands(op: &OperationView, filter_axis: usize) -> NnResult<()> {
    op.expect_outputs(1..=1)?;
    op.expect_type(0, FLOAT_OR_QUANT8)?;
    op.expect_type(1, FILTER)?;
    op.expect_rank(1, 4..=4)?;
    op.expect_channel_axis(1, filter_axis)?;
    let float = op.input_type(0)? == TensorFloat32;
    ensure!(float == (op.input_type(1)? == TensorFloat32), "Mixed float and quantized operands");
    if op.has_input(2) {
        op.expect_type(2, if float { FLOAT } else { &[TensorInt32] })?;
        op.expect_rank(2, 1..=1)?;
    }
    op.expect_output_type(0, if float { FLOAT } else { QUANT8 })
}

fn add_bias(ctx: &mut BuildContext, wire: OutletId) -> NnResult<OutletId> {
    if !ctx.has_input(2) {
        return Ok(wire);
    }
    let bias = ctx.input_bias_f32(2, 0, 1)?;
    let channels = ctx.shape(bias)?[0];
    let bias = ctx.wire1("bias.reshape", AxisOp::Reshape(tvec!(1, channels, 1, 1)), &[bias])?;
    ctx.wire1("bias", BinOp::Add, &[wire, bias])
}

fn finish(ctx: &mut BuildContext, window: &Window, wire: OutletId) -> NnResult<TVec<Produced>> {
    let wire = add_bias(ctx, wire)?;
    let name = ctx.name("conv");
    let wire = wire_fused_activation(ctx.target(), &name, wire, window.activation)?;
    Ok(tvec!(ctx.output_nchw(0, wire, window.nchw)?))
}

fn wire_conv(
    ctx: &mut BuildContext,
    window: &Window,
    conversion: Conversion,
    group: Option<usize>,
) -> NnResult<TVec<Produced>> {
    let input = ctx.input_channel_first(0, window.nchw)?;
    let kernel = ctx.input_permuted_f32(1, conversion)?;
    let (input_shape, kernel_shape) = (ctx.shape(input)?, ctx.shape(kernel)?);
    let (before, after) = window.pads(&input_shape[2..], &kernel_shape[2..]);
    let group = group.unwrap_or(input_shape[1]);
    let dilations = window.dilations.iter().copied().collect();
    let conv = Conv::new(window.strides(), dilations, before, after, group);
    let wire = ctx.wire1("conv", conv, &[input, kernel])?;
    finish(ctx, window, wire)
}

/// CONV_2D. Filter is `[O, H, W, I]`.
#[derive(Clone, Debug, Default)]
pub struct Conv2d;

impl Conv2d {
    fn window(&self, op: &OperationView) -> NnResult<Window> {
        if op.input_count() >= 10 && op.input_type(7)? != Bool {
            window(op, explicit_padding(op, 3)?, 7, 9, 10, Some(11))
        } else {
            window(op, implicit_padding(op, 3)?, 4, 6, 7, Some(8))
        }
    }
}

impl Translator for Conv2d {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        op.expect_inputs(7..=13)?;
        check_operands(op, 0)?;
        let window = self.window(op)?;
        op.expect_rank(0, 4..=4)?;
        let (input, filter) = (op.input_dims(0)?, op.input_dims(1)?);
        ensure!(
            channels(input, window.nchw)? == filter[3],
            "Filter {:?} does not match input {:?}",
            filter,
            input
        );
        window.check_fits(&spatial_dims(input, window.nchw)?, &filter[1..3])
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let window = self.window(ctx)?;
        wire_conv(ctx, &window, Conversion::OhwiToOihw, Some(1))
    }
}

/// DEPTHWISE_CONV_2D. Filter is `[1, H, W, C * multiplier]`.
#[derive(Clone, Debug, Default)]
pub struct DepthwiseConv2d;

impl DepthwiseConv2d {
    fn window(&self, op: &OperationView) -> NnResult<(Window, usize)> {
        if op.input_count() >= 11 && op.input_type(8)? != Bool {
            Ok((window(op, explicit_padding(op, 3)?, 7, 10, 11, Some(12))?, op.scalar_usize(9)?))
        } else {
            Ok((window(op, implicit_padding(op, 3)?, 4, 7, 8, Some(9))?, op.scalar_usize(6)?))
        }
    }
}

impl Translator for DepthwiseConv2d {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        op.expect_inputs(8..=14)?;
        check_operands(op, 3)?;
        let (window, multiplier) = self.window(op)?;
        op.expect_rank(0, 4..=4)?;
        let (input, filter) = (op.input_dims(0)?, op.input_dims(1)?);
        ensure!(filter[0] == 1, "Depthwise filter must be [1, H, W, C*M], got {:?}", filter);
        ensure!(
            multiplier > 0 && channels(input, window.nchw)? * multiplier == filter[3],
            "Filter {:?} does not match input {:?} with multiplier {}",
            filter,
            input,
            multiplier
        );
        window.check_fits(&spatial_dims(input, window.nchw)?, &filter[1..3])
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let (window, _) = self.window(ctx)?;
        wire_conv(ctx, &window, Conversion::IhwoToOihw, None)
    }
}

/// GROUPED_CONV_2D. Filter is `[O, H, W, I / groups]`.
#[derive(Clone, Debug, Default)]
pub struct GroupedConv2d;

impl GroupedConv2d {
    fn window(&self, op: &OperationView) -> NnResult<(Window, usize)> {
        if op.input_count() == 12 {
            Ok((window(op, explicit_padding(op, 3)?, 7, 10, 11, None)?, op.scalar_usize(9)?))
        } else {
            Ok((window(op, implicit_padding(op, 3)?, 4, 7, 8, None)?, op.scalar_usize(6)?))
        }
    }
}

impl Translator for GroupedConv2d {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        ensure!(op.input_count() == 9 || op.input_count() == 12, "GROUPED_CONV_2D has 9 or 12 inputs");
        check_operands(op, 0)?;
        let (window, groups) = self.window(op)?;
        op.expect_rank(0, 4..=4)?;
        let (input, filter) = (op.input_dims(0)?, op.input_dims(1)?);
        ensure!(
            groups > 0 && channels(input, window.nchw)? == filter[3] * groups && filter[0] % groups == 0,
            "Filter {:?} does not match input {:?} with {} groups",
            filter,
            input,
            groups
        );
        window.check_fits(&spatial_dims(input, window.nchw)?, &filter[1..3])
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let (window, groups) = self.window(ctx)?;
        wire_conv(ctx, &window, Conversion::OhwiToOihw, Some(groups))
    }
}

/// TRANSPOSE_CONV_2D. Filter is `[O, H, W, I]`. The implicit form gives the
/// output shape, from which SAME padding is derived.
#[derive(Clone, Debug, Default)]
pub struct TransposeConv2d;

impl TransposeConv2d {
    fn window(&self, op: &OperationView) -> NnResult<Window> {
        if op.input_count() == 11 {
            window(op, explicit_padding(op, 3)?, 7, 9, 10, None)
        } else {
            window(op, implicit_padding(op, 4)?, 5, 7, 8, None)
        }
    }

    fn output_size(&self, op: &OperationView, nchw: bool) -> NnResult<Option<[usize; 2]>> {
        if op.input_count() == 11 {
            return Ok(None);
        }
        let shape = op.vec_i32(3)?;
        let shape = shape.iter().map(|d| usize::try_from(*d)).collect::<Result<Vec<_>, _>>()?;
        Ok(Some(spatial_dims(&shape, nchw)?))
    }
}

impl Translator for TransposeConv2d {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        ensure!(op.input_count() == 9 || op.input_count() == 11, "TRANSPOSE_CONV_2D has 9 or 11 inputs");
        check_operands(op, 0)?;
        let window = self.window(op)?;
        op.expect_rank(0, 4..=4)?;
        if op.input_count() == 9 {
            op.expect_type(3, &[TensorInt32])?;
            op.expect_const(3)?;
            self.output_size(op, window.nchw)?;
        }
        let (input, filter) = (op.input_dims(0)?, op.input_dims(1)?);
        ensure!(
            channels(input, window.nchw)? == filter[3],
            "Filter {:?} does not match input {:?}",
            filter,
            input
        );
        Ok(())
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let window = self.window(ctx)?;
        let input = ctx.input_channel_first(0, window.nchw)?;
        let kernel = ctx.input_permuted_f32(1, Conversion::OhwiToIohw)?;
        let (input_shape, kernel_shape) = (ctx.shape(input)?, ctx.shape(kernel)?);
        let (mut before, mut after, mut adjustments) = (tvec!(), tvec!(), tvec!());
        let output = self.output_size(ctx, window.nchw)?;
        for ax in 0..2 {
            let (input, stride, filter) = (input_shape[2 + ax], window.strides[ax], kernel_shape[2 + ax]);
            let full = (input.max(1) - 1) * stride + filter;
            let (b, a, adj) = match (window.padding[ax], output) {
                (Padding::Explicit { before: b, after: a }, _) => (b, a, 0),
                (Padding::Same, Some(output)) => {
                    let (b, a) = same_padding_transposed(input, stride, filter, output[ax]);
                    (b, a, (output[ax] + b + a).saturating_sub(full))
                }
                (_, Some(output)) => (0, 0, output[ax].saturating_sub(full)),
                (_, None) => (0, 0, 0),
            };
            before.push(b);
            after.push(a);
            adjustments.push(adj);
        }
        let deconv = Deconv::new(window.strides(), before, after, adjustments);
        let wire = ctx.wire1("deconv", deconv, &[input, kernel])?;
        finish(ctx, &window, wire)
    }
}
