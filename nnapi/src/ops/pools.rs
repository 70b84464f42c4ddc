use super::Translator;
use super::cnn::{Window, explicit_padding, implicit_padding, spatial_dims, spatial_pair, window};
use crate::activation::wire_fused_activation;
use crate::context::{FLOAT, FLOAT_OR_QUANT8};
use crate::internal::*;
use nnhal_graph::ops::binary::BinOp;
use nnhal_graph::ops::cnn::{Pool, PoolKind};
use nnhal_graph::ops::element_wise::UnaryOp;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Pooling {
    Average,
    Max,
    /// Square root of the average of squares.
    L2,
}

#[derive(Clone, Debug, new)]
pub struct Pool2d {
    pub pooling: Pooling,
}

impl Pool2d {
    fn window(&self, op: &OperationView) -> NnResult<(Window, [usize; 2])> {
        if op.input_count() >= 10 {
            Ok((window(op, explicit_padding(op, 1)?, 5, 9, 10, None)?, spatial_pair(op, 7)?))
        } else {
            Ok((window(op, implicit_padding(op, 1)?, 2, 6, 7, None)?, spatial_pair(op, 4)?))
        }
    }
}

impl Translator for Pool2d {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        op.expect_outputs(1..=1)?;
        ensure!(matches!(op.input_count(), 7 | 8 | 10 | 11), "{} has 7, 8, 10 or 11 inputs", op.kind());
        let types = if self.pooling == Pooling::L2 { FLOAT } else { FLOAT_OR_QUANT8 };
        op.expect_type(0, types)?;
        op.expect_rank(0, 4..=4)?;
        let ty = op.input_type(0)?;
        ensure!(op.output_type(0)? == ty, "{} can not change the type of its input", op.kind());
        let (window, filter) = self.window(op)?;
        window.check_fits(&spatial_dims(op.input_dims(0)?, window.nchw)?, &filter)
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let (window, filter) = self.window(ctx)?;
        let mut wire = ctx.input_channel_first(0, window.nchw)?;
        let shape = ctx.shape(wire)?;
        let (before, after) = window.pads(&shape[2..], &filter);
        let kind = if self.pooling == Pooling::Max { PoolKind::Max } else { PoolKind::Avg };
        let pool = Pool::new(kind, filter.iter().copied().collect(), window.strides(), before, after);
        if self.pooling == Pooling::L2 {
            wire = ctx.wire1("square", BinOp::Mul, &[wire, wire])?;
        }
        wire = ctx.wire1("pool", pool, &[wire])?;
        if self.pooling == Pooling::L2 {
            wire = ctx.wire1("sqrt", UnaryOp::Sqrt, &[wire])?;
        }
        let name = ctx.name("pool");
        let wire = wire_fused_activation(ctx.target(), &name, wire, window.activation)?;
        Ok(tvec!(ctx.output_nchw(0, wire, window.nchw)?))
    }
}
