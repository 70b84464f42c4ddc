use super::Translator;
use crate::context::{FLOAT, QUANT8};
use crate::internal::*;
use crate::model::OperandType::*;
use nnhal_graph::ops::cast::Cast as CastOp;
use nnhal_graph::ops::element_wise::Clip;

const CASTABLE: &[OperandType] = &[TensorFloat32, TensorInt32, TensorQuant8Asymm, TensorQuant8AsymmSigned];

/// Value conversion between types. Quantized values are converted as raw
/// integers.
#[derive(Clone, Debug, Default)]
pub struct Cast;

impl Translator for Cast {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        op.expect_inputs(1..=1)?;
        op.expect_outputs(1..=1)?;
        op.expect_type(0, CASTABLE)?;
        op.expect_output_type(0, CASTABLE)
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let mut wire = ctx.input(0)?;
        let from = ctx.fact(wire)?.datum_type;
        let to = ctx.output_operand(0)?.datum_type();
        if from != to {
            if let Some((min, max)) = to.integer_range() {
                if from.is_float() || from.integer_range().is_some_and(|(a, b)| a < min || b > max) {
                    wire = ctx.wire1("clip", Clip::new(min as f32, max as f32), &[wire])?;
                }
            }
            wire = ctx.wire1("cast", CastOp::new(to), &[wire])?;
        }
        Ok(tvec!(ctx.output(0, wire)?))
    }
}

/// Float to asymmetric quant8. The quantization itself happens when the
/// output is registered.
#[derive(Clone, Debug, Default)]
pub struct Quantize;

impl Translator for Quantize {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        op.expect_inputs(1..=1)?;
        op.expect_outputs(1..=1)?;
        op.expect_type(0, FLOAT)?;
        op.expect_output_type(0, QUANT8)?;
        let scale = op.output_operand(0)?.scale;
        ensure!(scale > 0.0, "Invalid quantization scale {}", scale);
        Ok(())
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let input = ctx.input(0)?;
        Ok(tvec!(ctx.output(0, input)?))
    }
}

#[derive(Clone, Debug, Default)]
pub struct Dequantize;

impl Translator for Dequantize {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        op.expect_inputs(1..=1)?;
        op.expect_outputs(1..=1)?;
        op.expect_type(
            0,
            &[TensorQuant8Asymm, TensorQuant8AsymmSigned, TensorQuant8Symm, TensorQuant8SymmPerChannel, TensorQuant16Asymm, TensorQuant16Symm],
        )?;
        op.expect_output_type(0, FLOAT)
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let input = ctx.input_f32(0)?;
        Ok(tvec!(ctx.output(0, input)?))
    }
}
