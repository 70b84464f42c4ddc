//! Operation translators.
//!
//! Each translator checks an operation against what it can express
//! (`check`), then wires its computation and returns the produced nodes
//! (`build`). Registration of the produced nodes is common to all of them.
use crate::internal::*;

pub mod array;
pub mod cast;
pub mod cnn;
pub mod element_wise;
pub mod lstm;
pub mod nn;
pub mod pools;
pub mod recurrent;
pub mod reduce;
pub mod rnn;
pub mod roi;
pub mod spatial;

pub trait Translator: fmt::Debug {
    /// Preconditions on operand types, ranks, lifetimes and attribute
    /// values. Never touches the graph.
    fn check(&self, op: &OperationView) -> NnResult<()>;

    /// Wires the computation. One `Produced` per output operand.
    fn build(&self, ctx: &mut BuildContext) -> NnResult<TVec<Produced>>;
}

macro_rules! operation_nodes {
    ($($variant:ident($ty:ty),)*) => {
        /// A translator for one operation kind.
        #[derive(Clone, Debug)]
        pub enum OperationNode {
            $($variant($ty),)*
        }

        impl OperationNode {
            fn translator(&self) -> &dyn Translator {
                match self {
                    $(OperationNode::$variant(t) => t,)*
                }
            }
        }

        $(
            impl From<$ty> for OperationNode {
                fn from(t: $ty) -> OperationNode {
                    OperationNode::$variant(t)
                }
            }
        )*
    };
}

operation_nodes! {
    Binary(element_wise::Binary),
    Comparison(element_wise::Comparison),
    Logical(element_wise::Logical),
    Unary(element_wise::Unary),
    Clamp(element_wise::Clamp),
    HardSwish(element_wise::HardSwish),
    Elu(element_wise::Elu),
    Prelu(element_wise::Prelu),
    Cast(cast::Cast),
    Quantize(cast::Quantize),
    Dequantize(cast::Dequantize),
    Conv2d(cnn::Conv2d),
    DepthwiseConv2d(cnn::DepthwiseConv2d),
    GroupedConv2d(cnn::GroupedConv2d),
    TransposeConv2d(cnn::TransposeConv2d),
    Pool2d(pools::Pool2d),
    FullyConnected(nn::FullyConnected),
    Softmax(nn::Softmax),
    L2Normalization(nn::L2Normalization),
    InstanceNormalization(nn::InstanceNormalization),
    Reduce(reduce::Reduce),
    ArgMinMax(reduce::ArgMinMax),
    Concatenation(array::Concatenation),
    Split(array::Split),
    Reshape(array::Reshape),
    Squeeze(array::Squeeze),
    ExpandDims(array::ExpandDims),
    Transpose(array::Transpose),
    StridedSlice(array::StridedSlice),
    Slice(array::Slice),
    Gather(array::Gather),
    Pad(array::Pad),
    Select(array::Select),
    ChannelShuffle(array::ChannelShuffle),
    TopkV2(array::TopkV2),
    DepthToSpace(spatial::DepthToSpace),
    SpaceToDepth(spatial::SpaceToDepth),
    SpaceToBatchNd(spatial::SpaceToBatchNd),
    BatchToSpaceNd(spatial::BatchToSpaceNd),
    Resize(spatial::Resize),
    RoiAlign(roi::RoiAlign),
    RoiPooling(roi::RoiPooling),
    Rnn(rnn::Rnn),
    UnidirectionalSequenceRnn(rnn::UnidirectionalSequenceRnn),
    BidirectionalSequenceRnn(rnn::BidirectionalSequenceRnn),
    Lstm(lstm::Lstm),
    UnidirectionalSequenceLstm(lstm::UnidirectionalSequenceLstm),
    BidirectionalSequenceLstm(lstm::BidirectionalSequenceLstm),
    Quantized16BitLstm(lstm::Quantized16BitLstm),
}

impl OperationNode {
    /// Whether the operation can be translated. Failures are logged, not
    /// reported.
    pub fn validate(&self, op: &OperationView) -> bool {
        match self.translator().check(op) {
            Ok(()) => true,
            Err(e) => {
                debug!("{} #{} not supported: {:#}", op.kind(), op.index, e);
                false
            }
        }
    }

    pub fn build(&self, ctx: &mut BuildContext) -> NnResult<()> {
        let produced = self.translator().build(ctx)?;
        ctx.register_outputs(&produced)
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    use crate::builder::GraphBuilder;
    use crate::internal::*;

    pub fn setup_test_logger() {
        let _ = env_logger::Builder::from_env("NNHAL_LOG").try_init();
    }

    /// Translates a single-operation model, returning the graph.
    pub fn translate(model: &Model) -> NnResult<Graph> {
        setup_test_logger();
        let config = nnapi().with_quantized_inputs(true);
        let mut builder = GraphBuilder::new(ModelInfo::new(model), &config);
        builder.create_input_parameters()?;
        builder.build_all()?;
        builder.generate_graph()
    }

    /// Validates operation 0 of a model.
    pub fn supported(model: &Model) -> bool {
        setup_test_logger();
        let config = nnapi();
        GraphBuilder::new(ModelInfo::new(model), &config)
            .supported_operations()
            .map(|flags| flags.first().copied().unwrap_or(false))
            .unwrap_or(false)
    }

    /// Declares `inputs` and `outputs` as the model interface and adds the
    /// operation.
    pub fn single_op(model: &mut Model, kind: OperationType, inputs: &[usize], outputs: &[usize]) {
        model.add_operation(kind, inputs, outputs).unwrap();
        let interface = inputs
            .iter()
            .copied()
            .filter(|&ix| model.operands[ix].lifetime == OperandLifeTime::TemporaryVariable)
            .unique()
            .collect::<Vec<_>>();
        model.identify_inputs_and_outputs(&interface, outputs).unwrap();
    }

    pub fn output_shape(graph: &Graph, ix: usize) -> TVec<usize> {
        graph.output_fact(ix).unwrap().shape.clone()
    }
}
