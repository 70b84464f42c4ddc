//! The closed set of NNAPI operation codes.

macro_rules! operation_types {
    ($($name:ident = $code:expr => $s:expr,)*) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum OperationType {
            $($name,)*
        }

        impl OperationType {
            pub fn from_code(code: i32) -> Option<OperationType> {
                match code {
                    $($code => Some(OperationType::$name),)*
                    _ => None,
                }
            }

            pub fn code(&self) -> i32 {
                match self {
                    $(OperationType::$name => $code,)*
                }
            }

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(OperationType::$name => $s,)*
                }
            }

            pub fn all() -> &'static [OperationType] {
                &[$(OperationType::$name,)*]
            }
        }
    };
}

operation_types! {
    Add = 0 => "ADD",
    AveragePool2d = 1 => "AVERAGE_POOL_2D",
    Concatenation = 2 => "CONCATENATION",
    Conv2d = 3 => "CONV_2D",
    DepthwiseConv2d = 4 => "DEPTHWISE_CONV_2D",
    DepthToSpace = 5 => "DEPTH_TO_SPACE",
    Dequantize = 6 => "DEQUANTIZE",
    EmbeddingLookup = 7 => "EMBEDDING_LOOKUP",
    Floor = 8 => "FLOOR",
    FullyConnected = 9 => "FULLY_CONNECTED",
    HashtableLookup = 10 => "HASHTABLE_LOOKUP",
    L2Normalization = 11 => "L2_NORMALIZATION",
    L2Pool2d = 12 => "L2_POOL_2D",
    LocalResponseNormalization = 13 => "LOCAL_RESPONSE_NORMALIZATION",
    Logistic = 14 => "LOGISTIC",
    LshProjection = 15 => "LSH_PROJECTION",
    Lstm = 16 => "LSTM",
    MaxPool2d = 17 => "MAX_POOL_2D",
    Mul = 18 => "MUL",
    Relu = 19 => "RELU",
    Relu1 = 20 => "RELU1",
    Relu6 = 21 => "RELU6",
    Reshape = 22 => "RESHAPE",
    ResizeBilinear = 23 => "RESIZE_BILINEAR",
    Rnn = 24 => "RNN",
    Softmax = 25 => "SOFTMAX",
    SpaceToDepth = 26 => "SPACE_TO_DEPTH",
    Svdf = 27 => "SVDF",
    Tanh = 28 => "TANH",
    BatchToSpaceNd = 29 => "BATCH_TO_SPACE_ND",
    Div = 30 => "DIV",
    Mean = 31 => "MEAN",
    Pad = 32 => "PAD",
    SpaceToBatchNd = 33 => "SPACE_TO_BATCH_ND",
    Squeeze = 34 => "SQUEEZE",
    StridedSlice = 35 => "STRIDED_SLICE",
    Sub = 36 => "SUB",
    Transpose = 37 => "TRANSPOSE",
    Abs = 38 => "ABS",
    Argmax = 39 => "ARGMAX",
    Argmin = 40 => "ARGMIN",
    AxisAlignedBboxTransform = 41 => "AXIS_ALIGNED_BBOX_TRANSFORM",
    BidirectionalSequenceLstm = 42 => "BIDIRECTIONAL_SEQUENCE_LSTM",
    BidirectionalSequenceRnn = 43 => "BIDIRECTIONAL_SEQUENCE_RNN",
    BoxWithNmsLimit = 44 => "BOX_WITH_NMS_LIMIT",
    Cast = 45 => "CAST",
    ChannelShuffle = 46 => "CHANNEL_SHUFFLE",
    DetectionPostprocessing = 47 => "DETECTION_POSTPROCESSING",
    Equal = 48 => "EQUAL",
    Exp = 49 => "EXP",
    ExpandDims = 50 => "EXPAND_DIMS",
    Gather = 51 => "GATHER",
    GenerateProposals = 52 => "GENERATE_PROPOSALS",
    Greater = 53 => "GREATER",
    GreaterEqual = 54 => "GREATER_EQUAL",
    GroupedConv2d = 55 => "GROUPED_CONV_2D",
    HeatmapMaxKeypoint = 56 => "HEATMAP_MAX_KEYPOINT",
    InstanceNormalization = 57 => "INSTANCE_NORMALIZATION",
    Less = 58 => "LESS",
    LessEqual = 59 => "LESS_EQUAL",
    Log = 60 => "LOG",
    LogicalAnd = 61 => "LOGICAL_AND",
    LogicalNot = 62 => "LOGICAL_NOT",
    LogicalOr = 63 => "LOGICAL_OR",
    LogSoftmax = 64 => "LOG_SOFTMAX",
    Maximum = 65 => "MAXIMUM",
    Minimum = 66 => "MINIMUM",
    Neg = 67 => "NEG",
    NotEqual = 68 => "NOT_EQUAL",
    PadV2 = 69 => "PAD_V2",
    Pow = 70 => "POW",
    Prelu = 71 => "PRELU",
    Quantize = 72 => "QUANTIZE",
    Quantized16BitLstm = 73 => "QUANTIZED_16BIT_LSTM",
    RandomMultinomial = 74 => "RANDOM_MULTINOMIAL",
    ReduceAll = 75 => "REDUCE_ALL",
    ReduceAny = 76 => "REDUCE_ANY",
    ReduceMax = 77 => "REDUCE_MAX",
    ReduceMin = 78 => "REDUCE_MIN",
    ReduceProd = 79 => "REDUCE_PROD",
    ReduceSum = 80 => "REDUCE_SUM",
    RoiAlign = 81 => "ROI_ALIGN",
    RoiPooling = 82 => "ROI_POOLING",
    Rsqrt = 83 => "RSQRT",
    Select = 84 => "SELECT",
    Sin = 85 => "SIN",
    Slice = 86 => "SLICE",
    Split = 87 => "SPLIT",
    Sqrt = 88 => "SQRT",
    Tile = 89 => "TILE",
    TopkV2 = 90 => "TOPK_V2",
    TransposeConv2d = 91 => "TRANSPOSE_CONV_2D",
    UnidirectionalSequenceLstm = 92 => "UNIDIRECTIONAL_SEQUENCE_LSTM",
    UnidirectionalSequenceRnn = 93 => "UNIDIRECTIONAL_SEQUENCE_RNN",
    ResizeNearestNeighbor = 94 => "RESIZE_NEAREST_NEIGHBOR",
    QuantizedLstm = 95 => "QUANTIZED_LSTM",
    If = 96 => "IF",
    While = 97 => "WHILE",
    Elu = 98 => "ELU",
    HardSwish = 99 => "HARD_SWISH",
    Fill = 100 => "FILL",
    Rank = 101 => "RANK",
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
