use crate::builder::GraphBuilder;
use crate::internal::*;

/// Translator configuration.
#[derive(Clone, Debug)]
pub struct Nnapi {
    /// Keep channel-first values channel-first between layout sensitive
    /// operations instead of transposing after each of them.
    pub forced_layout: bool,
    /// Check every produced node against the declared shape of its operand.
    pub check_output_shapes: bool,
    /// Accept quantized model inputs. Only FLOAT32, INT32 and BOOL inputs
    /// are bound otherwise.
    pub quantized_inputs: bool,
}

impl Default for Nnapi {
    fn default() -> Nnapi {
        Nnapi { forced_layout: true, check_output_shapes: true, quantized_inputs: false }
    }
}

impl Nnapi {
    pub fn with_forced_layout(self, forced_layout: bool) -> Nnapi {
        Nnapi { forced_layout, ..self }
    }

    pub fn with_check_output_shapes(self, check_output_shapes: bool) -> Nnapi {
        Nnapi { check_output_shapes, ..self }
    }

    pub fn with_quantized_inputs(self, quantized_inputs: bool) -> Nnapi {
        Nnapi { quantized_inputs, ..self }
    }

    /// One flag per operation, in model order.
    pub fn supported_operations(&self, model: &Model) -> NnResult<Vec<bool>> {
        GraphBuilder::new(ModelInfo::new(model), self).supported_operations()
    }

    pub fn translate(&self, model: &Model) -> NnResult<TranslatedModel> {
        let mut builder = GraphBuilder::new(ModelInfo::new(model), self);
        builder.create_input_parameters()?;
        builder.build_all()?;
        let graph = builder.generate_graph()?;
        let names = model
            .input_indexes
            .iter()
            .chain(model.output_indexes.iter())
            .filter_map(|&ix| builder.node_name(ix).map(|name| (ix, name.to_string())))
            .collect();
        Ok(TranslatedModel { graph, names })
    }
}

/// A finalized graph and the names of its interface nodes.
#[derive(Clone, Debug)]
pub struct TranslatedModel {
    pub graph: Graph,
    names: HashMap<usize, String>,
}

impl TranslatedModel {
    /// Name bound to a model input or output operand.
    pub fn node_name(&self, operand: usize) -> Option<&str> {
        self.names.get(&operand).map(|s| &**s)
    }
}
