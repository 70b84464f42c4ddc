use super::Translator;
use crate::context::FLOAT_OR_QUANT8;
use crate::internal::*;
use crate::model::OperandType::*;
use nnhal_graph::ops::roi::{RoiAlign as RoiAlignOp, RoiPool};

/// Common operand checks: features, boxes `[R, 4]`, batch indices `[R]`,
/// output height and width.
fn check_regions(op: &OperationView, layout: usize) -> NnResult<()> {
    op.expect_outputs(1..=1)?;
    op.expect_type(0, FLOAT_OR_QUANT8)?;
    op.expect_layout(layout, 0)?;
    let float = op.input_type(0)? == TensorFloat32;
    op.expect_type(1, if float { &[TensorFloat32] } else { &[TensorQuant16Asymm] })?;
    op.expect_rank(1, 2..=2)?;
    let rois = op.input_dims(1)?;
    ensure!(rois[1] == 4, "Regions must be [R, 4], got {:?}", rois);
    op.expect_type(2, &[TensorInt32])?;
    ensure!(op.input_dims(2)? == &rois[..1], "One batch index per region expected");
    output_size(op)?;
    let ty = op.input_type(0)?;
    op.expect_output_type(0, &[ty])
}

fn output_size(op: &OperationView) -> NnResult<[usize; 2]> {
    let size = [op.scalar_usize(3)?, op.scalar_usize(4)?];
    ensure!(size.iter().all(|s| *s > 0), "Empty {} output {:?}", op.kind(), size);
    Ok(size)
}

/// Ratios from the feature map to the original image, as (h, w) scales.
fn spatial_scale(op: &OperationView, first: usize) -> NnResult<[f32; 2]> {
    let ratios = [op.scalar_f32(first)?, op.scalar_f32(first + 1)?];
    ensure!(ratios.iter().all(|r| *r > 0.0), "{} ratios must be positive, got {:?}", op.kind(), ratios);
    Ok([1.0 / ratios[0], 1.0 / ratios[1]])
}

fn wire_regions(ctx: &mut BuildContext, op: Box<dyn TypedOp>, nchw: bool) -> NnResult<TVec<Produced>> {
    let features = ctx.input_channel_first(0, nchw)?;
    let rois = ctx.input_f32(1)?;
    let batches = ctx.input(2)?;
    let wire = ctx.wire1("roi", op, &[features, rois, batches])?;
    Ok(tvec!(ctx.output_nchw(0, wire, nchw)?))
}

/// ROI_ALIGN: features, boxes, batch indices, output h and w, h and w
/// ratios, h and w sampling points, layout.
#[derive(Clone, Debug, Default)]
pub struct RoiAlign;

impl RoiAlign {
    fn op(&self, op: &OperationView) -> NnResult<RoiAlignOp> {
        let sampling = [op.scalar_usize(7)?, op.scalar_usize(8)?];
        Ok(RoiAlignOp::new(output_size(op)?, spatial_scale(op, 5)?, sampling))
    }
}

impl Translator for RoiAlign {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        op.expect_inputs(10..=10)?;
        check_regions(op, 9)?;
        self.op(op)?;
        Ok(())
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let roi = self.op(ctx)?;
        let nchw = ctx.nchw(9)?;
        wire_regions(ctx, Box::new(roi), nchw)
    }
}

/// ROI_POOLING: features, boxes, batch indices, output h and w, h and w
/// ratios, layout.
#[derive(Clone, Debug, Default)]
pub struct RoiPooling;

impl Translator for RoiPooling {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        op.expect_inputs(8..=8)?;
        check_regions(op, 7)?;
        spatial_scale(op, 5)?;
        Ok(())
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let pool = RoiPool::new(output_size(ctx)?, spatial_scale(ctx, 5)?);
        let nchw = ctx.nchw(7)?;
        wire_regions(ctx, Box::new(pool), nchw)
    }
}
