//! Operation kind to translator mapping.
use crate::internal::*;
use crate::ops::pools::Pooling;
use crate::ops::{
    OperationNode, array, cast, cnn, element_wise, lstm, nn, pools, reduce, rnn, roi, spatial,
};
use nnhal_graph::ops::binary::BinOp;
use nnhal_graph::ops::element_wise::UnaryOp;
use nnhal_graph::ops::nn::Reducer;
use nnhal_graph::ops::resize::Interpolation;
use OperationType as Op;

#[derive(Clone, Copy, Debug, new)]
pub struct OperationFactory<'m> {
    model: ModelInfo<'m>,
}

impl<'m> OperationFactory<'m> {
    /// Translator for the operation at `index`, `None` when its kind has no
    /// translation.
    pub fn get(&self, index: usize) -> NnResult<Option<OperationNode>> {
        let kind = self.model.operation(index)?.kind;
        Ok(node_for(kind))
    }
}

pub fn node_for(kind: OperationType) -> Option<OperationNode> {
    let node: OperationNode = match kind {
        Op::Add => element_wise::Binary::new(BinOp::Add, true).into(),
        Op::Sub => element_wise::Binary::new(BinOp::Sub, true).into(),
        Op::Mul => element_wise::Binary::new(BinOp::Mul, true).into(),
        Op::Div => element_wise::Binary::new(BinOp::Div, true).into(),
        Op::Maximum => element_wise::Binary::new(BinOp::Max, false).into(),
        Op::Minimum => element_wise::Binary::new(BinOp::Min, false).into(),
        Op::Pow => element_wise::Binary::new(BinOp::Pow, false).into(),

        Op::Equal => element_wise::Comparison::new(BinOp::Equals).into(),
        Op::NotEqual => element_wise::Comparison::new(BinOp::NotEquals).into(),
        Op::Less => element_wise::Comparison::new(BinOp::Less).into(),
        Op::LessEqual => element_wise::Comparison::new(BinOp::LessEqual).into(),
        Op::Greater => element_wise::Comparison::new(BinOp::Greater).into(),
        Op::GreaterEqual => element_wise::Comparison::new(BinOp::GreaterEqual).into(),
        Op::LogicalAnd => element_wise::Logical::new(BinOp::And).into(),
        Op::LogicalOr => element_wise::Logical::new(BinOp::Or).into(),

        Op::Abs => element_wise::Unary::new(UnaryOp::Abs).into(),
        Op::Exp => element_wise::Unary::new(UnaryOp::Exp).into(),
        Op::Floor => element_wise::Unary::new(UnaryOp::Floor).into(),
        Op::Log => element_wise::Unary::new(UnaryOp::Ln).into(),
        Op::LogicalNot => element_wise::Unary::new(UnaryOp::Not).into(),
        Op::Logistic => element_wise::Unary::new(UnaryOp::Sigmoid).into(),
        Op::Neg => element_wise::Unary::new(UnaryOp::Neg).into(),
        Op::Relu => element_wise::Unary::new(UnaryOp::Relu).into(),
        Op::Rsqrt => element_wise::Unary::new(UnaryOp::Rsqrt).into(),
        Op::Sin => element_wise::Unary::new(UnaryOp::Sin).into(),
        Op::Sqrt => element_wise::Unary::new(UnaryOp::Sqrt).into(),
        Op::Tanh => element_wise::Unary::new(UnaryOp::Tanh).into(),
        Op::Relu1 => element_wise::Clamp::new(-1.0, 1.0).into(),
        Op::Relu6 => element_wise::Clamp::new(0.0, 6.0).into(),
        Op::HardSwish => element_wise::HardSwish.into(),
        Op::Elu => element_wise::Elu.into(),
        Op::Prelu => element_wise::Prelu.into(),

        Op::Cast => cast::Cast.into(),
        Op::Quantize => cast::Quantize.into(),
        Op::Dequantize => cast::Dequantize.into(),

        Op::Conv2d => cnn::Conv2d.into(),
        Op::DepthwiseConv2d => cnn::DepthwiseConv2d.into(),
        Op::GroupedConv2d => cnn::GroupedConv2d.into(),
        Op::TransposeConv2d => cnn::TransposeConv2d.into(),
        Op::AveragePool2d => pools::Pool2d::new(Pooling::Average).into(),
        Op::MaxPool2d => pools::Pool2d::new(Pooling::Max).into(),
        Op::L2Pool2d => pools::Pool2d::new(Pooling::L2).into(),

        Op::FullyConnected => nn::FullyConnected.into(),
        Op::Softmax => nn::Softmax::new(false).into(),
        Op::LogSoftmax => nn::Softmax::new(true).into(),
        Op::L2Normalization => nn::L2Normalization.into(),
        Op::InstanceNormalization => nn::InstanceNormalization.into(),

        Op::Mean => reduce::Reduce::new(Reducer::Mean).into(),
        Op::ReduceAll => reduce::Reduce::new(Reducer::All).into(),
        Op::ReduceAny => reduce::Reduce::new(Reducer::Any).into(),
        Op::ReduceMax => reduce::Reduce::new(Reducer::Max).into(),
        Op::ReduceMin => reduce::Reduce::new(Reducer::Min).into(),
        Op::ReduceProd => reduce::Reduce::new(Reducer::Prod).into(),
        Op::ReduceSum => reduce::Reduce::new(Reducer::Sum).into(),
        Op::Argmax => reduce::ArgMinMax::new(true).into(),
        Op::Argmin => reduce::ArgMinMax::new(false).into(),

        Op::Concatenation => array::Concatenation.into(),
        Op::Split => array::Split.into(),
        Op::Reshape => array::Reshape.into(),
        Op::Squeeze => array::Squeeze.into(),
        Op::ExpandDims => array::ExpandDims.into(),
        Op::Transpose => array::Transpose.into(),
        Op::StridedSlice => array::StridedSlice.into(),
        Op::Slice => array::Slice.into(),
        Op::Gather => array::Gather.into(),
        Op::Pad => array::Pad::new(false).into(),
        Op::PadV2 => array::Pad::new(true).into(),
        Op::Select => array::Select.into(),
        Op::ChannelShuffle => array::ChannelShuffle.into(),
        Op::TopkV2 => array::TopkV2.into(),

        Op::DepthToSpace => spatial::DepthToSpace.into(),
        Op::SpaceToDepth => spatial::SpaceToDepth.into(),
        Op::SpaceToBatchNd => spatial::SpaceToBatchNd.into(),
        Op::BatchToSpaceNd => spatial::BatchToSpaceNd.into(),
        Op::ResizeBilinear => spatial::Resize::new(Interpolation::Bilinear).into(),
        Op::ResizeNearestNeighbor => spatial::Resize::new(Interpolation::Nearest).into(),
        Op::RoiAlign => roi::RoiAlign.into(),
        Op::RoiPooling => roi::RoiPooling.into(),

        Op::Rnn => rnn::Rnn.into(),
        Op::UnidirectionalSequenceRnn => rnn::UnidirectionalSequenceRnn.into(),
        Op::BidirectionalSequenceRnn => rnn::BidirectionalSequenceRnn.into(),
        Op::Lstm => lstm::Lstm.into(),
        Op::UnidirectionalSequenceLstm => lstm::UnidirectionalSequenceLstm.into(),
        Op::BidirectionalSequenceLstm => lstm::BidirectionalSequenceLstm.into(),
        Op::Quantized16BitLstm => lstm::Quantized16BitLstm.into(),

        Op::EmbeddingLookup
        | Op::HashtableLookup
        | Op::LshProjection
        | Op::Svdf
        | Op::LocalResponseNormalization
        | Op::AxisAlignedBboxTransform
        | Op::BoxWithNmsLimit
        | Op::DetectionPostprocessing
        | Op::GenerateProposals
        | Op::HeatmapMaxKeypoint
        | Op::RandomMultinomial
        | Op::Tile
        | Op::QuantizedLstm
        | Op::If
        | Op::While
        | Op::Fill
        | Op::Rank => return None,
    };
    Some(node)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_is_mapped() {
        let supported = OperationType::all().iter().filter(|k| node_for(**k).is_some()).count();
        assert_eq!(OperationType::all().len(), 102);
        assert_eq!(supported, 102 - 17);
    }

    #[test]
    fn families() {
        assert!(matches!(
            node_for(Op::Relu6),
            Some(OperationNode::Clamp(element_wise::Clamp { min, max })) if min == 0.0 && max == 6.0
        ));
        assert!(matches!(
            node_for(Op::LogicalNot),
            Some(OperationNode::Unary(element_wise::Unary(UnaryOp::Not)))
        ));
        assert!(matches!(node_for(Op::PadV2), Some(OperationNode::Pad(array::Pad { with_value: true }))));
        assert!(matches!(
            node_for(Op::Maximum),
            Some(OperationNode::Binary(element_wise::Binary { op: BinOp::Max, fused_activation: false }))
        ));
        assert!(node_for(Op::Tile).is_none());
    }

    #[test]
    fn lookup_by_operation_index() {
        let mut model = Model::default();
        let x = model.add_operand(OperandType::TensorFloat32, &[4]);
        let y = model.add_operand(OperandType::TensorFloat32, &[4]);
        let z = model.add_operand(OperandType::TensorFloat32, &[4]);
        model.add_operation(Op::Floor, &[x], &[y]).unwrap();
        model.add_operation(Op::Fill, &[y], &[z]).unwrap();
        let factory = OperationFactory::new(ModelInfo::new(&model));
        assert!(matches!(factory.get(0).unwrap(), Some(OperationNode::Unary(_))));
        assert!(factory.get(1).unwrap().is_none());
        assert!(factory.get(2).is_err());
    }
}
