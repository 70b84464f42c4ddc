use super::Translator;
use crate::context::{FLOAT, FLOAT_OR_QUANT8};
use crate::internal::*;
use crate::model::OperandType::*;
use nnhal_graph::ops::change_axes::AxisOp;
use nnhal_graph::ops::nn::{ArgMaxMin, Reduce as ReduceOp, Reducer};
use nnhal_graph::ops::resolve_axis;

/// MEAN and the REDUCE_* family. Inputs are the data, a constant axes
/// tensor, and keep_dims (an INT32 for MEAN, a BOOL otherwise).
#[derive(Clone, Debug, new)]
pub struct Reduce {
    pub reducer: Reducer,
}

impl Reduce {
    fn types(&self) -> &'static [OperandType] {
        match self.reducer {
            Reducer::All | Reducer::Any => &[TensorBool8],
            Reducer::Sum | Reducer::Prod => FLOAT,
            Reducer::Mean | Reducer::Max | Reducer::Min => FLOAT_OR_QUANT8,
        }
    }

    fn axes(&self, op: &OperationView) -> NnResult<TVec<usize>> {
        let rank = op.input_rank(0)?;
        let axes = op
            .vec_i32(1)?
            .into_iter()
            .map(|axis| resolve_axis(axis as i64, rank))
            .collect::<NnResult<Vec<_>>>()?;
        Ok(axes.into_iter().sorted().dedup().collect())
    }

    fn keep_dims(&self, op: &OperationView) -> NnResult<bool> {
        if self.reducer == Reducer::Mean { Ok(op.scalar_i32(2)? != 0) } else { op.scalar_bool(2) }
    }

    /// Max and min commute with the quantization mapping.
    fn is_monotonic(&self) -> bool {
        matches!(self.reducer, Reducer::Max | Reducer::Min | Reducer::All | Reducer::Any)
    }
}

impl Translator for Reduce {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        op.expect_inputs(3..=3)?;
        op.expect_outputs(1..=1)?;
        op.expect_type(0, self.types())?;
        op.expect_rank(0, 1..=4)?;
        op.expect_type(1, &[TensorInt32])?;
        op.expect_const(1)?;
        op.expect_type(2, if self.reducer == Reducer::Mean { &[Int32] } else { &[Bool] })?;
        ensure!(!self.axes(op)?.is_empty(), "{} without axes", op.kind());
        self.keep_dims(op)?;
        let ty = op.input_type(0)?;
        op.expect_output_type(0, &[ty])
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let axes = self.axes(ctx)?;
        let keep_dims = self.keep_dims(ctx)?;
        let input = if self.is_monotonic() { ctx.input_for_output(0, 0)? } else { ctx.input_f32(0)? };
        let mut wire = ctx.wire1("reduce", ReduceOp::new(axes, self.reducer, keep_dims), &[input])?;
        if ctx.shape(wire)?.is_empty() {
            wire = ctx.wire1("as_vector", AxisOp::Add(0), &[wire])?;
        }
        Ok(tvec!(ctx.output(0, wire)?))
    }
}

/// ARGMAX and ARGMIN. The axis is removed and indices are INT32.
#[derive(Clone, Debug, new)]
pub struct ArgMinMax {
    pub max: bool,
}

impl ArgMinMax {
    fn axis(&self, op: &OperationView) -> NnResult<usize> {
        resolve_axis(op.scalar_i32(1)? as i64, op.input_rank(0)?)
    }
}

impl Translator for ArgMinMax {
    fn check(&self, op: &OperationView) -> NnResult<()> {
        op.expect_inputs(2..=2)?;
        op.expect_outputs(1..=1)?;
        op.expect_type(0, &[TensorFloat32, TensorInt32, TensorQuant8Asymm, TensorQuant8AsymmSigned])?;
        op.expect_rank(0, 1..=4)?;
        op.expect_output_type(0, &[TensorInt32])?;
        self.axis(op)?;
        Ok(())
    }

    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>> {
        let axis = self.axis(ctx)?;
        // positive scales keep the order of raw quantized values
        let input = ctx.input(0)?;
        let mut wire = ctx.wire1("arg", ArgMaxMin::new(self.max, axis), &[input])?;
        if ctx.shape(wire)?.is_empty() {
            wire = ctx.wire1("as_vector", AxisOp::Add(0), &[wire])?;
        }
        Ok(tvec!(ctx.output(0, wire)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::test_utils::*;

    fn reduce(kind: OperationType, ty: OperandType, axes: &[i32], keep: Option<bool>, output: &[usize]) -> Model {
        let mut model = Model::default();
        let x = model.add_quantized_operand(ty, &[2, 3, 4], 0.5, 1);
        let axes = model.add_tensor_i32(&[axes.len()], axes).unwrap();
        let keep = match keep {
            Some(keep) => model.add_scalar_bool(keep),
            None => model.add_scalar_i32(1),
        };
        let y = model.add_quantized_operand(ty, output, 0.5, 1);
        single_op(&mut model, kind, &[x, axes, keep], &[y]);
        model
    }

    #[test]
    fn mean_keep_dims_is_an_int() {
        let graph = translate(&reduce(OperationType::Mean, TensorFloat32, &[1], None, &[2, 1, 4])).unwrap();
        assert_eq!(output_shape(&graph, 0).as_slice(), &[2, 1, 4]);
        assert!(!supported(&reduce(OperationType::Mean, TensorFloat32, &[1], Some(true), &[2, 1, 4])));
        assert!(!supported(&reduce(OperationType::ReduceSum, TensorFloat32, &[1], None, &[2, 1, 4])));
    }

    #[test]
    fn negative_and_repeated_axes() {
        let model = reduce(OperationType::ReduceSum, TensorFloat32, &[-1, 2, 0], Some(false), &[3]);
        let graph = translate(&model).unwrap();
        let reduce = graph.model().node_by_name("0-REDUCE_SUM.reduce").unwrap();
        assert_eq!(reduce.op_as::<ReduceOp>().unwrap().axes.as_slice(), &[0, 2]);
        assert_eq!(output_shape(&graph, 0).as_slice(), &[3]);
    }

    #[test]
    fn quantized_max_stays_raw() {
        let model = reduce(OperationType::ReduceMax, TensorQuant8Asymm, &[0], Some(false), &[3, 4]);
        let graph = translate(&model).unwrap();
        assert!(!graph.nodes().iter().any(|n| n.name.contains("dequant")));
        assert_eq!(graph.output_fact(0).unwrap().datum_type, DatumType::U8);
    }

    #[test]
    fn full_reduction_is_a_vector() {
        let model = reduce(OperationType::ReduceProd, TensorFloat32, &[0, 1, 2], Some(false), &[1]);
        let graph = translate(&model).unwrap();
        assert_eq!(output_shape(&graph, 0).as_slice(), &[1]);
    }

    #[test]
    fn bool_reductions() {
        assert!(supported(&reduce(OperationType::ReduceAny, TensorBool8, &[2], Some(true), &[2, 3, 1])));
        assert!(!supported(&reduce(OperationType::ReduceAll, TensorFloat32, &[2], Some(true), &[2, 3, 1])));
    }

    #[test]
    fn reduce_min() {
        let model = reduce(OperationType::ReduceMin, TensorQuant8Asymm, &[1, 2], Some(true), &[2, 1, 1]);
        let graph = translate(&model).unwrap();
        let node = graph.model().node_by_name("0-REDUCE_MIN.reduce").unwrap();
        assert_eq!(node.op_as::<ReduceOp>().unwrap().reducer, Reducer::Min);
        assert!(!supported(&reduce(OperationType::ReduceMin, TensorInt32, &[1], Some(true), &[2, 1, 4])));
        assert!(!supported(&reduce(OperationType::ReduceMin, TensorFloat32, &[3], Some(true), &[2, 3, 4])));
    }

    fn arg_min(input: OperandType, axis: i32, output: OperandType) -> Model {
        let mut model = Model::default();
        let x = model.add_quantized_operand(input, &[2, 5], 0.1, 3);
        let axis = model.add_scalar_i32(axis);
        let y = model.add_operand(output, &[5]);
        single_op(&mut model, OperationType::Argmin, &[x, axis], &[y]);
        model
    }

    #[test]
    fn arg_min_validation() {
        assert!(supported(&arg_min(TensorFloat32, 0, TensorInt32)));
        assert!(!supported(&arg_min(TensorFloat32, 2, TensorInt32)));
        assert!(!supported(&arg_min(TensorFloat32, 0, TensorFloat32)));
        assert!(!supported(&arg_min(TensorBool8, 0, TensorInt32)));
        let graph = translate(&arg_min(TensorInt32, 0, TensorInt32)).unwrap();
        let arg = graph.nodes().iter().find_map(|n| n.op_as::<ArgMaxMin>()).unwrap();
        assert!(!arg.max);
    }

    #[test]
    fn arg_max() {
        let mut model = Model::default();
        let x = model.add_quantized_operand(TensorQuant8Asymm, &[2, 5], 0.1, 3);
        let axis = model.add_scalar_i32(-1);
        let y = model.add_operand(TensorInt32, &[2]);
        single_op(&mut model, OperationType::Argmax, &[x, axis], &[y]);
        let graph = translate(&model).unwrap();
        assert_eq!(graph.output_fact(0).unwrap().datum_type, DatumType::I32);
        assert_eq!(output_shape(&graph, 0).as_slice(), &[2]);
        let arg = graph.nodes().iter().find_map(|n| n.op_as::<ArgMaxMin>()).unwrap();
        assert!(arg.max);
    }
}
