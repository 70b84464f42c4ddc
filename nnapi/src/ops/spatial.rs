use super::Translator;
use super::cnn::{channels, spatial_dims};
use crate::context::{ANY_TENSOR, FLOAT_OR_QUANT8};
use crate::internal::*;
use crate::model::OperandType::*;
use nnhal_graph::ops::array::{BatchToSpace, DepthToSpace as DepthToSpaceOp, SpaceToBatch, SpaceToDepth as SpaceToDepthOp};
use nnhal_graph::ops::resize::{Interpolation, Resize as ResizeOp};

fn expect_same_kind(op: &OperationView) -> NnResult<()> {
    let ty = op.input_type(0)?;
    op.expect_output_type(0, &[ty])
}

fn block_size(op: &OperationView) -> NnResult<usize> {
    let block = op.scalar_usize(1)?;
    ensure!(block > 0, "{} with a zero block size", op.kind());
    Ok(block)
}

/// (h, w) pair from a constant INT32 vector `[h, w]`.
fn block_shape(op: &OperationView, i: usize) -> NnResult<[usize; 2]> {
    op.expect_type(i, &[TensorInt32])?;
    op.expect_const(i)?;
    let values = op.vec_i32(i)?;
    ensure!(values.len() == 2, "{} block shape {:?} is not 2D", op.kind(), values);
    let (h, w) = (usize::try_from(values[0])?, usize::try_from(values[1])?);
    ensure!(h > 0 && w > 0, "{} block shape {:?} must be positive", op.kind(), values);
    Ok([h, w])
}

#[derive(Clone, Debug, Default)]
pub struct DepthToSpace;

impl Translator for DepthToSpace {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        op.expect_inputs(2..=3)?;
        op.expect_outputs(1..=1)?;
        op.expect_type(0, ANY_TENSOR)?;
        op.expect_layout(2, 0)?;
        let block = block_size(op)?;
        let channels = channels(op.input_dims(0)?, op.nchw(2)?)?;
        ensure!(channels % (block * block) == 0, "Depth {} not divisible by {}²", channels, block);
        expect_same_kind(op)
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let (block, nchw) = (block_size(ctx)?, ctx.nchw(2)?);
        let input = ctx.input_nchw_for_output(0, 0, nchw)?;
        let wire = ctx.wire1("depth_to_space", DepthToSpaceOp::new(block), &[input])?;
        Ok(tvec!(ctx.output_nchw(0, wire, nchw)?))
    }
}

#[derive(Clone, Debug, Default)]
pub struct SpaceToDepth;

impl Translator for SpaceToDepth {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        op.expect_inputs(2..=3)?;
        op.expect_outputs(1..=1)?;
        op.expect_type(0, ANY_TENSOR)?;
        op.expect_layout(2, 0)?;
        let block = block_size(op)?;
        let [h, w] = spatial_dims(op.input_dims(0)?, op.nchw(2)?)?;
        ensure!(h % block == 0 && w % block == 0, "Spatial {}x{} not divisible by {}", h, w, block);
        expect_same_kind(op)
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let (block, nchw) = (block_size(ctx)?, ctx.nchw(2)?);
        let input = ctx.input_nchw_for_output(0, 0, nchw)?;
        let wire = ctx.wire1("space_to_depth", SpaceToDepthOp::new(block), &[input])?;
        Ok(tvec!(ctx.output_nchw(0, wire, nchw)?))
    }
}

/// SPACE_TO_BATCH_ND: block shape, `[2, 2]` paddings, optional layout.
#[derive(Clone, Debug, Default)]
pub struct SpaceToBatchNd;

impl SpaceToBatchNd {
    fn pads(&self, op: &OperationView) -> NnResult<[(usize, usize); 2]> {
        op.expect_type(2, &[TensorInt32])?;
        op.expect_const(2)?;
        let values = op.vec_i32(2)?;
        ensure!(values.len() == 4, "Paddings {:?} must be [2, 2]", values);
        let pad = |i: usize| usize::try_from(values[i]);
        Ok([(pad(0)?, pad(1)?), (pad(2)?, pad(3)?)])
    }
}

impl Translator for SpaceToBatchNd {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        op.expect_inputs(3..=4)?;
        op.expect_outputs(1..=1)?;
        op.expect_type(0, ANY_TENSOR)?;
        op.expect_layout(3, 0)?;
        let block = block_shape(op, 1)?;
        let pads = self.pads(op)?;
        let spatial = spatial_dims(op.input_dims(0)?, op.nchw(3)?)?;
        for ax in 0..2 {
            let padded = spatial[ax] + pads[ax].0 + pads[ax].1;
            ensure!(padded % block[ax] == 0, "Padded dim {} not divisible by {}", padded, block[ax]);
        }
        expect_same_kind(op)
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let (block, pads, nchw) = (block_shape(ctx, 1)?, self.pads(ctx)?, ctx.nchw(3)?);
        let input = ctx.input_nchw_for_output(0, 0, nchw)?;
        let wire = ctx.wire1("space_to_batch", SpaceToBatch::new(block, pads), &[input])?;
        Ok(tvec!(ctx.output_nchw(0, wire, nchw)?))
    }
}

/// BATCH_TO_SPACE_ND: block shape, optional layout. No cropping.
#[derive(Clone, Debug, Default)]
pub struct BatchToSpaceNd;

impl Translator for BatchToSpaceNd {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        op.expect_inputs(2..=3)?;
        op.expect_outputs(1..=1)?;
        op.expect_type(0, ANY_TENSOR)?;
        op.expect_layout(2, 0)?;
        let [h, w] = block_shape(op, 1)?;
        let batch = op.input_dims(0)?[0];
        ensure!(batch % (h * w) == 0, "Batch {} not divisible by {}x{}", batch, h, w);
        expect_same_kind(op)
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let (block, nchw) = (block_shape(ctx, 1)?, ctx.nchw(2)?);
        let input = ctx.input_nchw_for_output(0, 0, nchw)?;
        let wire = ctx.wire1("batch_to_space", BatchToSpace::new(block, [(0, 0); 2]), &[input])?;
        Ok(tvec!(ctx.output_nchw(0, wire, nchw)?))
    }
}

/// RESIZE_BILINEAR and RESIZE_NEAREST_NEIGHBOR. The target is given as
/// INT32 width and height, or as FLOAT32 width and height scales.
#[derive(Clone, Debug, new)]
pub struct Resize {
    pub interpolation: Interpolation,
}

impl Resize {
    fn size(&self, op: &OperationView, nchw: bool) -> NnResult<[usize; 2]> {
        let [h, w] = spatial_dims(op.input_dims(0)?, nchw)?;
        let size = if op.input_type(1)? == Int32 {
            [op.scalar_usize(2)?, op.scalar_usize(1)?]
        } else {
            let (sw, sh) = (op.scalar_f32(1)?, op.scalar_f32(2)?);
            ensure!(sw > 0.0 && sh > 0.0, "Resize scales must be positive, got {}x{}", sw, sh);
            [(h as f32 * sh).floor() as usize, (w as f32 * sw).floor() as usize]
        };
        ensure!(size.iter().all(|s| *s > 0), "Resize to an empty size {:?}", size);
        Ok(size)
    }
}

impl Translator for Resize {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        op.expect_inputs(3..=6)?;
        op.expect_outputs(1..=1)?;
        op.expect_type(0, FLOAT_OR_QUANT8)?;
        op.expect_layout(3, 0)?;
        op.expect_type(1, &[Int32, Float32])?;
        op.expect_same_type(1, 2)?;
        for i in 4..op.input_count() {
            op.expect_type(i, &[Bool])?;
        }
        let align_corners = op.optional_bool(4, false)?;
        let half_pixel = op.optional_bool(5, false)?;
        ensure!(!(align_corners && half_pixel), "align_corners and half_pixel_centers are exclusive");
        self.size(op, op.nchw(3)?)?;
        expect_same_kind(op)
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let nchw = ctx.nchw(3)?;
        let size = self.size(ctx, nchw)?;
        let align_corners = ctx.optional_bool(4, false)?;
        let half_pixel = ctx.optional_bool(5, false)?;
        let input = ctx.input_channel_first(0, nchw)?;
        let resize = ResizeOp::new(self.interpolation, size, align_corners, half_pixel);
        let wire = ctx.wire1("resize", resize, &[input])?;
        Ok(tvec!(ctx.output_nchw(0, wire, nchw)?))
    }
}
