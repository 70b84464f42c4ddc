use super::Translator;
use crate::activation::{FusedActivation, wire_fused_activation};
use crate::context::{FLOAT, FLOAT_OR_QUANT8, NUMERIC};
use crate::internal::*;
use nnhal_graph::ops::binary::BinOp;
use nnhal_graph::ops::element_wise::{Clip, UnaryOp};

use crate::model::OperandType::*;

fn check_activation(op: &OperationView, i: usize) -> NnResult<()> {
    op.expect_type(i, &[Int32])?;
    op.expect_const(i)?;
    let code = op.scalar_i32(i)?;
    ensure!(FusedActivation::from_code(code).is_some(), "Unknown fused activation {}", code);
    Ok(())
}

pub(crate) fn activation(op: &OperationView, i: usize) -> NnResult<FusedActivation> {
    let code = op.scalar_i32(i)?;
    FusedActivation::from_code(code).ok_or_else(|| format_err!("Unknown fused activation {}", code))
}

/// Arithmetic, with numpy broadcasting. ADD, SUB, MUL and DIV carry a fused
/// activation as third input.
#[derive(Clone, Debug, new)]
pub struct Binary {
    pub op: BinOp,
    pub fused_activation: bool,
}

impl Binary {
    fn types(&self) -> &'static [OperandType] {
        if self.op == BinOp::Pow { FLOAT } else { NUMERIC }
    }
}

impl Translator for Binary {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        op.expect_inputs(if self.fused_activation { 3..=3 } else { 2..=2 })?;
        op.expect_outputs(1..=1)?;
        op.expect_type(0, self.types())?;
        op.expect_same_type(0, 1)?;
        op.expect_output_type(0, self.types())?;
        op.expect_output_like(0, 0)?;
        multi_broadcast(&[op.input_dims(0)?, op.input_dims(1)?])?;
        if self.fused_activation {
            check_activation(op, 2)?;
        }
        Ok(())
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let raw = matches!(self.op, BinOp::Max | BinOp::Min)
            && ctx.is_passthrough(0, 0)?
            && ctx.is_passthrough(1, 0)?;
        let (a, b) = if raw {
            (ctx.input(0)?, ctx.input(1)?)
        } else {
            (ctx.input_f32(0)?, ctx.input_f32(1)?)
        };
        let mut wire = ctx.wire1("op", self.op, &[a, b])?;
        if self.fused_activation {
            let activation = activation(&ctx.op, 2)?;
            let name = ctx.name("op");
            wire = wire_fused_activation(ctx.target(), &name, wire, activation)?;
        }
        Ok(tvec!(ctx.output(0, wire)?))
    }
}

/// Comparisons, producing booleans.
#[derive(Clone, Debug, new)]
pub struct Comparison(pub BinOp);

impl Translator for Comparison {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        op.expect_inputs(2..=2)?;
        op.expect_outputs(1..=1)?;
        op.expect_type(0, &[TensorFloat32, TensorInt32, TensorBool8, TensorQuant8Asymm, TensorQuant8AsymmSigned])?;
        op.expect_same_type(0, 1)?;
        op.expect_output_type(0, &[TensorBool8])?;
        multi_broadcast(&[op.input_dims(0)?, op.input_dims(1)?])?;
        Ok(())
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let a = ctx.input_f32(0)?;
        let b = ctx.input_f32(1)?;
        let wire = ctx.wire1("op", self.0, &[a, b])?;
        Ok(tvec!(ctx.output(0, wire)?))
    }
}

/// LOGICAL_AND and LOGICAL_OR.
#[derive(Clone, Debug, new)]
pub struct Logical(pub BinOp);

impl Translator for Logical {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        op.expect_inputs(2..=2)?;
        op.expect_outputs(1..=1)?;
        op.expect_type(0, &[TensorBool8])?;
        op.expect_type(1, &[TensorBool8])?;
        multi_broadcast(&[op.input_dims(0)?, op.input_dims(1)?])?;
        Ok(())
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let a = ctx.input(0)?;
        let b = ctx.input(1)?;
        let wire = ctx.wire1("op", self.0, &[a, b])?;
        Ok(tvec!(ctx.output(0, wire)?))
    }
}

#[derive(Clone, Debug, new)]
pub struct Unary(pub UnaryOp);

impl Unary {
    fn types(&self) -> &'static [OperandType] {
        match self.0 {
            UnaryOp::Not => &[TensorBool8],
            UnaryOp::Abs | UnaryOp::Neg => &[TensorFloat32, TensorInt32],
            UnaryOp::Sigmoid | UnaryOp::Tanh | UnaryOp::Relu => FLOAT_OR_QUANT8,
            _ => FLOAT,
        }
    }
}

impl Translator for Unary {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        op.expect_inputs(1..=1)?;
        op.expect_outputs(1..=1)?;
        op.expect_type(0, self.types())?;
        op.expect_output_type(0, self.types())?;
        op.expect_output_like(0, 0)
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let input = ctx.input_f32(0)?;
        let wire = ctx.wire1("op", self.0, &[input])?;
        Ok(tvec!(ctx.output(0, wire)?))
    }
}

/// RELU1 and RELU6.
#[derive(Clone, Debug, new)]
pub struct Clamp {
    pub min: f32,
    pub max: f32,
}

impl Translator for Clamp {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        op.expect_inputs(1..=1)?;
        op.expect_outputs(1..=1)?;
        op.expect_type(0, FLOAT_OR_QUANT8)?;
        op.expect_output_type(0, FLOAT_OR_QUANT8)
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let input = ctx.input_f32(0)?;
        let wire = ctx.wire1("op", Clip::new(self.min, self.max), &[input])?;
        Ok(tvec!(ctx.output(0, wire)?))
    }
}

/// `x * relu6(x + 3) / 6`
#[derive(Clone, Debug, Default)]
pub struct HardSwish;

impl Translator for HardSwish {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        op.expect_inputs(1..=1)?;
        op.expect_outputs(1..=1)?;
        op.expect_type(0, FLOAT_OR_QUANT8)?;
        op.expect_output_type(0, FLOAT_OR_QUANT8)
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let x = ctx.input_f32(0)?;
        let three = ctx.konst("three", tensor0(3f32))?;
        let sixth = ctx.konst("sixth", tensor0(1f32 / 6.0))?;
        let shifted = ctx.wire1("shift", BinOp::Add, &[x, three])?;
        let gate = ctx.wire1("relu6", Clip::new(0.0, 6.0), &[shifted])?;
        let wire = ctx.wire1("mul", BinOp::Mul, &[x, gate])?;
        let wire = ctx.wire1("scale", BinOp::Mul, &[wire, sixth])?;
        Ok(tvec!(ctx.output(0, wire)?))
    }
}

/// `relu(x) + alpha * (exp(min(x, 0)) - 1)`
#[derive(Clone, Debug, Default)]
pub struct Elu;

impl Translator for Elu {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        op.expect_inputs(2..=2)?;
        op.expect_outputs(1..=1)?;
        op.expect_type(0, FLOAT)?;
        op.expect_type(1, &[Float32])?;
        op.expect_const(1)?;
        op.expect_output_type(0, FLOAT)
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let x = ctx.input_f32(0)?;
        let alpha = ctx.scalar_f32(1)?;
        let alpha = ctx.konst("alpha", tensor0(alpha))?;
        let zero = ctx.konst("zero", tensor0(0f32))?;
        let one = ctx.konst("one", tensor0(1f32))?;
        let positive = ctx.wire1("relu", UnaryOp::Relu, &[x])?;
        let negative = ctx.wire1("min", BinOp::Min, &[x, zero])?;
        let negative = ctx.wire1("exp", UnaryOp::Exp, &[negative])?;
        let negative = ctx.wire1("sub", BinOp::Sub, &[negative, one])?;
        let negative = ctx.wire1("alpha", BinOp::Mul, &[negative, alpha])?;
        let wire = ctx.wire1("add", BinOp::Add, &[positive, negative])?;
        Ok(tvec!(ctx.output(0, wire)?))
    }
}

/// `max(x, 0) + alpha * min(x, 0)`, alpha broadcast against x.
#[derive(Clone, Debug, Default)]
pub struct Prelu;

impl Translator for Prelu {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        op.expect_inputs(2..=2)?;
        op.expect_outputs(1..=1)?;
        op.expect_type(0, FLOAT_OR_QUANT8)?;
        op.expect_same_type(0, 1)?;
        op.expect_output_type(0, FLOAT_OR_QUANT8)?;
        multi_broadcast(&[op.input_dims(0)?, op.input_dims(1)?])?;
        Ok(())
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let x = ctx.input_f32(0)?;
        let alpha = ctx.input_f32(1)?;
        let zero = ctx.konst("zero", tensor0(0f32))?;
        let positive = ctx.wire1("max", BinOp::Max, &[x, zero])?;
        let negative = ctx.wire1("min", BinOp::Min, &[x, zero])?;
        let negative = ctx.wire1("alpha", BinOp::Mul, &[negative, alpha])?;
        let wire = ctx.wire1("add", BinOp::Add, &[positive, negative])?;
        Ok(tvec!(ctx.output(0, wire)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::test_utils::*;

    fn binary(kind: OperationType, act: i32, out: OperandType) -> Model {
        let mut model = Model::default();
        let a = model.add_operand(TensorFloat32, &[2, 3]);
        let b = model.add_operand(TensorFloat32, &[3]);
        let act = model.add_scalar_i32(act);
        let y = model.add_operand(out, &[2, 3]);
        single_op(&mut model, kind, &[a, b, act], &[y]);
        model
    }

    #[test]
    fn add_broadcasts() {
        let graph = translate(&binary(OperationType::Add, 3, TensorFloat32)).unwrap();
        assert_eq!(graph.inputs().len(), 2);
        assert_eq!(output_shape(&graph, 0).as_slice(), &[2, 3]);
        assert!(graph.nodes().iter().any(|n| n.name == "0-ADD.op.activation"));
    }

    #[test]
    fn unknown_activation() {
        assert!(supported(&binary(OperationType::Mul, 1, TensorFloat32)));
        assert!(!supported(&binary(OperationType::Mul, 7, TensorFloat32)));
    }

    #[test]
    fn activation_must_be_constant() {
        let mut model = Model::default();
        let a = model.add_operand(TensorFloat32, &[2]);
        let act = model.add_operand(Int32, &[]);
        let y = model.add_operand(TensorFloat32, &[2]);
        single_op(&mut model, OperationType::Add, &[a, a, act], &[y]);
        assert!(!supported(&model));
    }

    #[test]
    fn comparison_is_boolean() {
        let mut model = Model::default();
        let a = model.add_operand(TensorFloat32, &[4]);
        let b = model.add_tensor_f32(&[1], &[0.5]).unwrap();
        let y = model.add_operand(TensorBool8, &[4]);
        single_op(&mut model, OperationType::Less, &[a, b], &[y]);
        let graph = translate(&model).unwrap();
        assert_eq!(graph.output_fact(0).unwrap().datum_type, DatumType::Bool);
        assert_eq!(graph.inputs().len(), 1);
    }

    #[test]
    fn comparison_wants_boolean_output() {
        let mut model = Model::default();
        let a = model.add_operand(TensorFloat32, &[4]);
        let y = model.add_operand(TensorFloat32, &[4]);
        single_op(&mut model, OperationType::Equal, &[a, a], &[y]);
        assert!(!supported(&model));
    }

    #[test]
    fn quantized_add() {
        let mut model = Model::default();
        let x = model.add_operand(TensorFloat32, &[1, 4]);
        let q = model.add_quantized_operand(TensorQuant8Asymm, &[1, 4], 0.1, 128);
        let c = model.add_tensor_quant8(TensorQuant8Asymm, &[4], 0.1, 128, &[130, 128, 126, 255]).unwrap();
        let act = model.add_scalar_i32(0);
        let y = model.add_quantized_operand(TensorQuant8Asymm, &[1, 4], 0.2, 100);
        model.add_operation(OperationType::Quantize, &[x], &[q]).unwrap();
        model.add_operation(OperationType::Add, &[q, c, act], &[y]).unwrap();
        model.identify_inputs_and_outputs(&[x], &[y]).unwrap();
        let graph = translate(&model).unwrap();
        assert_eq!(graph.output_fact(0).unwrap().datum_type, DatumType::U8);
    }

    #[test]
    fn output_type_follows_input() {
        assert!(!supported(&binary(OperationType::Add, 0, TensorInt32)));
        assert!(!supported(&binary(OperationType::Sub, 0, TensorBool8)));
        for (input, output, ok) in [
            (TensorFloat32, TensorInt32, false),
            (TensorInt32, TensorFloat32, false),
            (TensorInt32, TensorInt32, true),
        ] {
            let mut model = Model::default();
            let x = model.add_operand(input, &[3]);
            let y = model.add_operand(output, &[3]);
            single_op(&mut model, OperationType::Abs, &[x], &[y]);
            assert_eq!(supported(&model), ok, "ABS {input:?} -> {output:?}");
        }
    }

    fn unary(kind: OperationType, input: OperandType, output: OperandType) -> Model {
        let mut model = Model::default();
        let x = model.add_quantized_operand(input, &[2, 3], 0.1, 0);
        let y = model.add_quantized_operand(output, &[2, 3], 0.1, 0);
        single_op(&mut model, kind, &[x], &[y]);
        model
    }

    #[test]
    fn relu1_and_relu6() {
        for (kind, max) in [(OperationType::Relu1, 1.0), (OperationType::Relu6, 6.0)] {
            let graph = translate(&unary(kind, TensorFloat32, TensorFloat32)).unwrap();
            let clip = graph.nodes().iter().find_map(|n| n.op_as::<Clip>()).unwrap();
            assert_eq!(clip.max, max);
            assert!(supported(&unary(kind, TensorQuant8Asymm, TensorQuant8Asymm)));
            assert!(!supported(&unary(kind, TensorInt32, TensorInt32)));
            assert!(!supported(&unary(kind, TensorFloat32, TensorBool8)));
        }
    }

    fn extremum(kind: OperationType, a: OperandType, b: OperandType) -> Model {
        let mut model = Model::default();
        let x = model.add_operand(a, &[2, 3]);
        let c = model.add_operand(b, &[3]);
        let y = model.add_operand(a, &[2, 3]);
        single_op(&mut model, kind, &[x, c], &[y]);
        model
    }

    #[test]
    fn maximum_and_minimum() {
        for kind in [OperationType::Maximum, OperationType::Minimum] {
            let graph = translate(&extremum(kind, TensorInt32, TensorInt32)).unwrap();
            assert_eq!(graph.output_fact(0).unwrap().datum_type, DatumType::I32);
            assert!(!supported(&extremum(kind, TensorFloat32, TensorInt32)));
            assert!(!supported(&extremum(kind, TensorBool8, TensorBool8)));
        }
    }

    #[test]
    fn comparisons() {
        for kind in [
            OperationType::Equal,
            OperationType::NotEqual,
            OperationType::Less,
            OperationType::LessEqual,
            OperationType::Greater,
            OperationType::GreaterEqual,
        ] {
            let mut model = Model::default();
            let a = model.add_operand(TensorInt32, &[2, 3]);
            let b = model.add_operand(TensorInt32, &[3]);
            let y = model.add_operand(TensorBool8, &[2, 3]);
            single_op(&mut model, kind, &[a, b], &[y]);
            assert!(supported(&model), "{kind}");
            let mut model = Model::default();
            let a = model.add_operand(TensorInt32, &[2, 3]);
            let b = model.add_operand(TensorFloat32, &[2, 3]);
            let y = model.add_operand(TensorBool8, &[2, 3]);
            single_op(&mut model, kind, &[a, b], &[y]);
            assert!(!supported(&model), "{kind} on mixed types");
        }
    }

    #[test]
    fn unary_types() {
        for (kind, input, ok) in [
            (OperationType::Exp, TensorFloat32, true),
            (OperationType::Exp, TensorInt32, false),
            (OperationType::Abs, TensorInt32, true),
            (OperationType::LogicalNot, TensorBool8, true),
            (OperationType::LogicalNot, TensorFloat32, false),
        ] {
            let mut model = Model::default();
            let x = model.add_operand(input, &[3]);
            let y = model.add_operand(input, &[3]);
            single_op(&mut model, kind, &[x], &[y]);
            assert_eq!(supported(&model), ok, "{kind} on {input:?}");
        }
    }

    #[test]
    fn hard_swish_and_elu() {
        let mut model = Model::default();
        let x = model.add_operand(TensorFloat32, &[2, 2]);
        let h = model.add_operand(TensorFloat32, &[2, 2]);
        let alpha = model.add_scalar_f32(1.0);
        let y = model.add_operand(TensorFloat32, &[2, 2]);
        model.add_operation(OperationType::HardSwish, &[x], &[h]).unwrap();
        model.add_operation(OperationType::Elu, &[h, alpha], &[y]).unwrap();
        model.identify_inputs_and_outputs(&[x], &[y]).unwrap();
        let graph = translate(&model).unwrap();
        assert_eq!(output_shape(&graph, 0).as_slice(), &[2, 2]);
    }

    #[test]
    fn prelu_alpha_type() {
        let mut model = Model::default();
        let x = model.add_operand(TensorFloat32, &[1, 2, 2, 3]);
        let alpha = model.add_tensor_i32(&[3], &[1, 1, 1]).unwrap();
        let y = model.add_operand(TensorFloat32, &[1, 2, 2, 3]);
        single_op(&mut model, OperationType::Prelu, &[x, alpha], &[y]);
        assert!(!supported(&model));
    }
}
