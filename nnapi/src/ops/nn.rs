use super::Translator;
use super::element_wise::activation;
use crate::activation::wire_fused_activation;
use crate::context::{FLOAT, FLOAT_OR_QUANT8, QUANT8};
use crate::internal::*;
use crate::model::OperandType::*;
use nnhal_graph::ops::binary::BinOp;
use nnhal_graph::ops::change_axes::AxisOp;
use nnhal_graph::ops::element_wise::UnaryOp;
use nnhal_graph::ops::matmul::MatMul;
use nnhal_graph::ops::nn::{Reduce, Reducer};
use nnhal_graph::ops::resolve_axis;

/// `x · Wᵀ + b` over the input flattened to `[batch, input_size]`.
#[derive(Clone, Debug, Default)]
pub struct FullyConnected;

impl Translator for FullyConnected {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        op.expect_inputs(4..=4)?;
        op.expect_outputs(1..=1)?;
        op.expect_type(0, FLOAT_OR_QUANT8)?;
        op.expect_rank(0, 2..=4)?;
        op.expect_type(1, FLOAT_OR_QUANT8)?;
        op.expect_rank(1, 2..=2)?;
        let float = op.input_type(0)? == TensorFloat32;
        ensure!(float == (op.input_type(1)? == TensorFloat32), "Mixed float and quantized operands");
        let (input, weights) = (op.input_dims(0)?, op.input_dims(1)?);
        ensure!(input[0] > 0, "Batch size of 0 is not supported");
        let volume: usize = input.iter().product();
        ensure!(
            weights[1] > 0 && volume % weights[1] == 0,
            "Input {:?} can not be flattened for weights {:?}",
            input,
            weights
        );
        if op.has_input(2) {
            op.expect_type(2, if float { FLOAT } else { &[TensorInt32] })?;
            op.expect_rank(2, 1..=1)?;
            ensure!(op.input_dims(2)?[0] == weights[0], "Bias does not match {} units", weights[0]);
        }
        activation(op, 3)?;
        op.expect_output_type(0, if float { FLOAT } else { QUANT8 })
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let act = activation(ctx, 3)?;
        let mut input = ctx.input_f32(0)?;
        let weights = ctx.input_f32(1)?;
        let shape = ctx.shape(input)?;
        let input_size = ctx.shape(weights)?[1];
        if shape.len() != 2 || shape[1] != input_size {
            let batch = shape.iter().product::<usize>() / input_size;
            input = ctx.wire1("flatten", AxisOp::Reshape(tvec!(batch, input_size)), &[input])?;
        }
        let mut wire = ctx.wire1("matmul", MatMul::new(false, true), &[input, weights])?;
        if ctx.has_input(2) {
            let bias = ctx.input_bias_f32(2, 0, 1)?;
            wire = ctx.wire1("bias", BinOp::Add, &[wire, bias])?;
        }
        let name = ctx.name("fc");
        let wire = wire_fused_activation(ctx.target(), &name, wire, act)?;
        Ok(tvec!(ctx.output(0, wire)?))
    }
}

/// SOFTMAX and LOG_SOFTMAX: `exp((x - max) * beta) / sum` along one axis,
/// or its logarithm.
#[derive(Clone, Debug, new)]
pub struct Softmax {
    pub log: bool,
}

impl Softmax {
    fn axis(&self, op: &OperationView) -> NnResult<usize> {
        let axis = op.optional_i32(2, -1)?;
        resolve_axis(axis as i64, op.input_rank(0)?)
    }
}

impl Translator for Softmax {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        op.expect_inputs(if self.log { 3..=3 } else { 2..=3 })?;
        op.expect_outputs(1..=1)?;
        op.expect_type(0, if self.log { FLOAT } else { FLOAT_OR_QUANT8 })?;
        op.expect_rank(0, 1..=4)?;
        op.expect_type(1, &[Float32])?;
        op.scalar_f32(1)?;
        op.expect_output_like(0, 0)?;
        self.axis(op)?;
        Ok(())
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let axis = self.axis(ctx)?;
        let beta = ctx.scalar_f32(1)?;
        let input = ctx.input_f32(0)?;
        let max = ctx.wire1("max", Reduce::new(tvec!(axis), Reducer::Max, true), &[input])?;
        let shifted = ctx.wire1("sub", BinOp::Sub, &[input, max])?;
        let beta = ctx.konst("beta", tensor0(beta))?;
        let scaled = ctx.wire1("scaled", BinOp::Mul, &[shifted, beta])?;
        let exp = ctx.wire1("exp", UnaryOp::Exp, &[scaled])?;
        let sum = ctx.wire1("sum", Reduce::new(tvec!(axis), Reducer::Sum, true), &[exp])?;
        let wire = if self.log {
            let ln = ctx.wire1("ln", UnaryOp::Ln, &[sum])?;
            ctx.wire1("log_softmax", BinOp::Sub, &[scaled, ln])?
        } else {
            ctx.wire1("softmax", BinOp::Div, &[exp, sum])?
        };
        Ok(tvec!(ctx.output(0, wire)?))
    }
}

/// `x / sqrt(sum(x²))` along one axis. An all-zero vector stays zero.
#[derive(Clone, Debug, Default)]
pub struct L2Normalization;

impl L2Normalization {
    fn axis(&self, op: &OperationView) -> NnResult<usize> {
        let axis = op.optional_i32(1, -1)?;
        resolve_axis(axis as i64, op.input_rank(0)?)
    }
}

impl Translator for L2Normalization {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        op.expect_inputs(1..=2)?;
        op.expect_outputs(1..=1)?;
        op.expect_type(0, FLOAT_OR_QUANT8)?;
        op.expect_rank(0, 1..=4)?;
        op.expect_output_like(0, 0)?;
        self.axis(op)?;
        Ok(())
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let axis = self.axis(ctx)?;
        let input = ctx.input_f32(0)?;
        let square = ctx.wire1("square", BinOp::Mul, &[input, input])?;
        let sum = ctx.wire1("sum", Reduce::new(tvec!(axis), Reducer::Sum, true), &[square])?;
        let tiny = ctx.konst("epsilon", tensor0(f32::MIN_POSITIVE))?;
        let sum = ctx.wire1("guard", BinOp::Max, &[sum, tiny])?;
        let norm = ctx.wire1("sqrt", UnaryOp::Sqrt, &[sum])?;
        let wire = ctx.wire1("div", BinOp::Div, &[input, norm])?;
        Ok(tvec!(ctx.output(0, wire)?))
    }
}

/// `(x - mean) * gamma / sqrt(var + epsilon) + beta`, statistics over the
/// spatial axes of each channel.
#[derive(Clone, Debug, Default)]
pub struct InstanceNormalization;

impl Translator for InstanceNormalization {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        op.expect_inputs(5..=5)?;
        op.expect_outputs(1..=1)?;
        op.expect_type(0, FLOAT)?;
        op.expect_output_type(0, FLOAT)?;
        for i in 1..=3 {
            op.expect_type(i, &[Float32])?;
            op.scalar_f32(i)?;
        }
        op.expect_layout(4, 0)
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let (gamma, beta, epsilon) = (ctx.scalar_f32(1)?, ctx.scalar_f32(2)?, ctx.scalar_f32(3)?);
        let nchw = ctx.nchw(4)?;
        let input = ctx.input_channel_first(0, nchw)?;
        let spatial = || Reduce::new(tvec!(2, 3), Reducer::Mean, true);
        let mean = ctx.wire1("mean", spatial(), &[input])?;
        let centered = ctx.wire1("centered", BinOp::Sub, &[input, mean])?;
        let square = ctx.wire1("square", BinOp::Mul, &[centered, centered])?;
        let var = ctx.wire1("var", spatial(), &[square])?;
        let epsilon = ctx.konst("epsilon", tensor0(epsilon))?;
        let var = ctx.wire1("var_eps", BinOp::Add, &[var, epsilon])?;
        let inv = ctx.wire1("rsqrt", UnaryOp::Rsqrt, &[var])?;
        let normalized = ctx.wire1("normalized", BinOp::Mul, &[centered, inv])?;
        let gamma = ctx.konst("gamma", tensor0(gamma))?;
        let scaled = ctx.wire1("scaled", BinOp::Mul, &[normalized, gamma])?;
        let beta = ctx.konst("beta", tensor0(beta))?;
        let wire = ctx.wire1("shifted", BinOp::Add, &[scaled, beta])?;
        Ok(tvec!(ctx.output_nchw(0, wire, nchw)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::test_utils::*;

    fn fully_connected(input: &[usize], output: &[usize]) -> Model {
        let mut model = Model::default();
        let x = model.add_operand(TensorFloat32, input);
        let w = model.add_tensor_f32(&[4, 3], &[0.5; 12]).unwrap();
        let b = model.add_tensor_f32(&[4], &[1.0; 4]).unwrap();
        let act = model.add_scalar_i32(1);
        let y = model.add_operand(TensorFloat32, output);
        single_op(&mut model, OperationType::FullyConnected, &[x, w, b, act], &[y]);
        model
    }

    #[test]
    fn fully_connected_flattens() {
        let graph = translate(&fully_connected(&[2, 1, 1, 3], &[2, 4])).unwrap();
        assert_eq!(output_shape(&graph, 0).as_slice(), &[2, 4]);
        assert!(graph.nodes().iter().any(|n| n.name == "0-FULLY_CONNECTED.flatten"));
        let graph = translate(&fully_connected(&[5, 3], &[5, 4])).unwrap();
        assert!(!graph.nodes().iter().any(|n| n.name == "0-FULLY_CONNECTED.flatten"));
    }

    #[test]
    fn fully_connected_input_size() {
        assert!(!supported(&fully_connected(&[2, 5], &[2, 4])));
        assert!(!supported(&fully_connected(&[0, 3], &[0, 4])));
    }

    #[test]
    fn quantized_fully_connected() {
        let mut model = Model::default();
        let x = model.add_operand(TensorFloat32, &[1, 2]);
        let q = model.add_quantized_operand(TensorQuant8Asymm, &[1, 2], 0.5, 10);
        let w = model.add_tensor_quant8(TensorQuant8Asymm, &[3, 2], 0.25, 128, &[130, 126, 128, 129, 140, 100]).unwrap();
        let b = model.add_tensor_i32(&[3], &[4, -4, 0]).unwrap();
        let act = model.add_scalar_i32(0);
        let y = model.add_quantized_operand(TensorQuant8Asymm, &[1, 3], 1.0, 128);
        model.add_operation(OperationType::Quantize, &[x], &[q]).unwrap();
        model.add_operation(OperationType::FullyConnected, &[q, w, b, act], &[y]).unwrap();
        model.identify_inputs_and_outputs(&[x], &[y]).unwrap();
        let graph = translate(&model).unwrap();
        assert_eq!(graph.output_fact(0).unwrap().datum_type, DatumType::U8);
    }

    fn softmax(kind: OperationType, ty: OperandType, axis: Option<i32>) -> Model {
        let mut model = Model::default();
        let x = model.add_quantized_operand(ty, &[2, 5], 0.1, 0);
        let beta = model.add_scalar_f32(1.0);
        let y = model.add_quantized_operand(ty, &[2, 5], 1.0 / 256.0, 0);
        let mut inputs = vec![x, beta];
        if let Some(axis) = axis {
            inputs.push(model.add_scalar_i32(axis));
        }
        single_op(&mut model, kind, &inputs, &[y]);
        model
    }

    #[test]
    fn softmax_default_axis() {
        let graph = translate(&softmax(OperationType::Softmax, TensorFloat32, None)).unwrap();
        let max = graph.model().node_by_name("0-SOFTMAX.max").unwrap();
        assert_eq!(max.op_as::<Reduce>().unwrap().axes.as_slice(), &[1]);
        let graph = translate(&softmax(OperationType::Softmax, TensorFloat32, Some(0))).unwrap();
        let sum = graph.model().node_by_name("0-SOFTMAX.sum").unwrap();
        assert_eq!(sum.op_as::<Reduce>().unwrap().axes.as_slice(), &[0]);
    }

    #[test]
    fn softmax_quantized() {
        let graph = translate(&softmax(OperationType::Softmax, TensorQuant8Asymm, None)).unwrap();
        assert_eq!(graph.output_fact(0).unwrap().datum_type, DatumType::U8);
    }

    #[test]
    fn log_softmax() {
        assert!(!supported(&softmax(OperationType::LogSoftmax, TensorFloat32, None)));
        assert!(!supported(&softmax(OperationType::LogSoftmax, TensorQuant8Asymm, Some(-1))));
        assert!(!supported(&softmax(OperationType::Softmax, TensorFloat32, Some(2))));
        let graph = translate(&softmax(OperationType::LogSoftmax, TensorFloat32, Some(-1))).unwrap();
        assert!(graph.nodes().iter().any(|n| n.name == "0-LOG_SOFTMAX.log_softmax"));
    }

    #[test]
    fn softmax_output_type() {
        for (kind, output, ok) in [
            (OperationType::Softmax, TensorInt32, false),
            (OperationType::Softmax, TensorQuant8Asymm, true),
            (OperationType::L2Normalization, TensorInt32, false),
            (OperationType::L2Normalization, TensorFloat32, true),
        ] {
            let mut model = Model::default();
            let x = model.add_operand(TensorFloat32, &[2, 5]);
            let y = model.add_quantized_operand(output, &[2, 5], 1.0 / 128.0, 128);
            let inputs = if kind == OperationType::Softmax { vec![x, model.add_scalar_f32(1.0)] } else { vec![x] };
            single_op(&mut model, kind, &inputs, &[y]);
            assert_eq!(supported(&model), ok, "{kind} to {output:?}");
        }
    }

    #[test]
    fn l2_normalization() {
        let mut model = Model::default();
        let x = model.add_operand(TensorFloat32, &[1, 2, 2, 6]);
        let y = model.add_operand(TensorFloat32, &[1, 2, 2, 6]);
        single_op(&mut model, OperationType::L2Normalization, &[x], &[y]);
        let graph = translate(&model).unwrap();
        let sum = graph.model().node_by_name("0-L2_NORMALIZATION.sum").unwrap();
        assert_eq!(sum.op_as::<Reduce>().unwrap().axes.as_slice(), &[3]);

        let mut model = Model::default();
        let x = model.add_operand(TensorFloat32, &[1, 1, 2, 2, 6]);
        let y = model.add_operand(TensorFloat32, &[1, 1, 2, 2, 6]);
        single_op(&mut model, OperationType::L2Normalization, &[x], &[y]);
        assert!(!supported(&model));
    }

    #[test]
    fn instance_normalization() {
        let mut model = Model::default();
        let x = model.add_operand(TensorFloat32, &[1, 3, 4, 2]);
        let gamma = model.add_scalar_f32(1.5);
        let beta = model.add_scalar_f32(0.5);
        let epsilon = model.add_scalar_f32(1e-5);
        let nhwc = model.add_scalar_bool(false);
        let y = model.add_operand(TensorFloat32, &[1, 3, 4, 2]);
        single_op(&mut model, OperationType::InstanceNormalization, &[x, gamma, beta, epsilon, nhwc], &[y]);
        let graph = translate(&model).unwrap();
        assert_eq!(output_shape(&graph, 0).as_slice(), &[1, 3, 4, 2]);
        let mean = graph.model().node_by_name("0-INSTANCE_NORMALIZATION.mean").unwrap();
        assert_eq!(mean.op_as::<Reduce>().unwrap().axes.as_slice(), &[2, 3]);
    }
}
