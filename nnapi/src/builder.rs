//! Drives the translation of a whole model.
use crate::context::{BuildContext, OperationView};
use crate::factory::OperationFactory;
use crate::framework::Nnapi;
use crate::internal::*;
use crate::model::OperandType::*;
use crate::registry::OutputRegistry;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuilderState {
    Constructed,
    InputsBound,
    OperationsBuilt,
    Finalized,
}

/// Owns the registry of one translation. Each successful step moves the
/// builder to the next state. Calling a step out of order is an error, so a
/// failed build can not be finalized.
#[derive(Debug)]
pub struct GraphBuilder<'m, 'c> {
    model: ModelInfo<'m>,
    config: &'c Nnapi,
    registry: OutputRegistry,
    state: BuilderState,
}

impl<'m, 'c> GraphBuilder<'m, 'c> {
    pub fn new(model: ModelInfo<'m>, config: &'c Nnapi) -> GraphBuilder<'m, 'c> {
        GraphBuilder { model, config, registry: OutputRegistry::default(), state: BuilderState::Constructed }
    }

    pub fn state(&self) -> BuilderState {
        self.state
    }

    pub fn registry(&self) -> &OutputRegistry {
        &self.registry
    }

    fn expect_state(&self, state: BuilderState) -> NnResult<()> {
        ensure!(self.state == state, "Builder is {:?}, expected {:?}", self.state, state);
        Ok(())
    }

    /// One source node per model input, in declared order. Omitted optional
    /// inputs (rank 0 or leading dimension 0) are marked invalid instead.
    pub fn create_input_parameters(&mut self) -> NnResult<()> {
        self.expect_state(BuilderState::Constructed)?;
        for &ix in self.model.input_indexes() {
            let operand = self.model.operand(ix)?;
            let ty = operand.operand_type;
            let bindable = matches!(ty, Float32 | Int32 | Bool | TensorFloat32 | TensorInt32 | TensorBool8)
                || (self.config.quantized_inputs && ty.is_quantized());
            ensure!(bindable, "Model input #{} has unsupported type {:?}", ix, ty);
            if operand.rank() == 0 || operand.dimensions[0] == 0 {
                debug!("Model input #{} is omitted", ix);
                self.registry.set_invalid(ix);
                continue;
            }
            let fact = TypedFact::dt_shape(operand.datum_type(), &operand.dimensions);
            trace!("Model input #{} as {:?}", ix, fact);
            self.registry.add_input_parameter(ix, fact)?;
        }
        self.state = BuilderState::InputsBound;
        Ok(())
    }

    /// Runs the factory and validation for every operation, without
    /// building anything.
    pub fn supported_operations(&self) -> NnResult<Vec<bool>> {
        let factory = OperationFactory::new(self.model);
        (0..self.model.operations().len())
            .map(|ix| {
                let view = OperationView::new(self.model, ix)?;
                Ok(match factory.get(ix)? {
                    Some(node) => node.validate(&view),
                    None => {
                        info!("{} #{} has no translation", view.kind(), ix);
                        false
                    }
                })
            })
            .collect()
    }

    /// Builds every operation in model order. The first unsupported or
    /// failing operation aborts the translation.
    pub fn build_all(&mut self) -> NnResult<()> {
        self.expect_state(BuilderState::InputsBound)?;
        let factory = OperationFactory::new(self.model);
        for ix in 0..self.model.operations().len() {
            let view = OperationView::new(self.model, ix)?;
            let kind = view.kind();
            let node = factory.get(ix)?.filter(|node| node.validate(&view));
            let Some(node) = node else {
                info!("{} #{} is not supported", kind, ix);
                bail!("Unsupported operation {} #{}", kind, ix);
            };
            debug!("Building {} #{}", kind, ix);
            let mut ctx = BuildContext::new(view, &mut self.registry, self.config);
            node.build(&mut ctx).with_context(|| format!("Translating {} #{}", kind, ix))?;
        }
        self.state = BuilderState::OperationsBuilt;
        Ok(())
    }

    /// Marks the model outputs as results and seals the graph.
    pub fn generate_graph(&mut self) -> NnResult<Graph> {
        self.expect_state(BuilderState::OperationsBuilt)?;
        self.state = BuilderState::Finalized;
        for &ix in self.model.output_indexes() {
            if self.registry.is_invalid(ix) {
                debug!("Model output #{} is invalid, skipped", ix);
                continue;
            }
            let outlet =
                self.registry.get_output(ix).with_context(|| format!("Model output #{} was not computed", ix))?;
            self.registry.add_result(ix, outlet);
        }
        self.registry.finalize()
    }

    /// Graph node name for a model input or output operand.
    pub fn node_name(&self, operand: usize) -> Option<&str> {
        self.registry.node_name(operand)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::test_utils::setup_test_logger;

    fn relu_model(ty: OperandType) -> Model {
        let mut model = Model::default();
        let x = model.add_quantized_operand(ty, &[1, 4], 0.5, 0);
        let y = model.add_quantized_operand(ty, &[1, 4], 0.5, 0);
        model.add_operation(OperationType::Relu, &[x], &[y]).unwrap();
        model.identify_inputs_and_outputs(&[x], &[y]).unwrap();
        model
    }

    #[test]
    fn states_in_order() {
        setup_test_logger();
        let model = relu_model(TensorFloat32);
        let config = nnapi();
        let mut builder = GraphBuilder::new(ModelInfo::new(&model), &config);
        assert!(builder.build_all().is_err());
        builder.create_input_parameters().unwrap();
        assert_eq!(builder.state(), BuilderState::InputsBound);
        assert!(builder.create_input_parameters().is_err());
        assert!(builder.generate_graph().is_err());
        builder.build_all().unwrap();
        let graph = builder.generate_graph().unwrap();
        assert_eq!(builder.state(), BuilderState::Finalized);
        assert_eq!(graph.inputs().len(), 1);
        assert!(builder.generate_graph().is_err());
    }

    #[test]
    fn quantized_inputs_are_opt_in() {
        setup_test_logger();
        let model = relu_model(TensorQuant8Asymm);
        let config = nnapi();
        let mut builder = GraphBuilder::new(ModelInfo::new(&model), &config);
        assert!(builder.create_input_parameters().is_err());
        let config = nnapi().with_quantized_inputs(true);
        let mut builder = GraphBuilder::new(ModelInfo::new(&model), &config);
        builder.create_input_parameters().unwrap();
        let ix = model.input_indexes[0];
        let (outlet, _) = builder.registry().get_registered_output(ix).unwrap();
        assert_eq!(builder.registry().target().outlet_fact(outlet).unwrap().datum_type, DatumType::U8);
    }

    #[test]
    fn omitted_inputs_are_invalid() {
        setup_test_logger();
        let mut model = Model::default();
        let x = model.add_operand(TensorFloat32, &[1, 4]);
        let omitted = model.add_operand(TensorFloat32, &[0, 4]);
        let flag = model.add_operand(Bool, &[]);
        let y = model.add_operand(TensorFloat32, &[1, 4]);
        model.add_operation(OperationType::Relu, &[x], &[y]).unwrap();
        model.identify_inputs_and_outputs(&[x, omitted, flag], &[y]).unwrap();
        let config = nnapi();
        let mut builder = GraphBuilder::new(ModelInfo::new(&model), &config);
        builder.create_input_parameters().unwrap();
        assert!(builder.registry().is_invalid(omitted));
        assert!(builder.registry().is_invalid(flag));
        assert_eq!(builder.registry().input_parameters().len(), 1);
        assert_eq!(builder.node_name(x), Some("input.0"));
    }

    #[test]
    fn unsupported_operation_aborts() {
        setup_test_logger();
        let mut model = Model::default();
        let x = model.add_operand(TensorFloat32, &[2, 3]);
        let multiples = model.add_tensor_i32(&[2], &[2, 1]).unwrap();
        let y = model.add_operand(TensorFloat32, &[4, 3]);
        model.add_operation(OperationType::Tile, &[x, multiples], &[y]).unwrap();
        model.identify_inputs_and_outputs(&[x], &[y]).unwrap();
        let config = nnapi();
        let builder = GraphBuilder::new(ModelInfo::new(&model), &config);
        assert_eq!(builder.supported_operations().unwrap(), vec![false]);
        let mut builder = GraphBuilder::new(ModelInfo::new(&model), &config);
        builder.create_input_parameters().unwrap();
        assert!(builder.build_all().is_err());
    }

    #[test]
    fn invalid_operation_aborts() {
        setup_test_logger();
        let mut model = Model::default();
        let x = model.add_operand(TensorFloat32, &[2, 3]);
        let beta = model.add_scalar_f32(1.0);
        let axis = model.add_scalar_i32(5);
        let y = model.add_operand(TensorFloat32, &[2, 3]);
        model.add_operation(OperationType::Softmax, &[x, beta, axis], &[y]).unwrap();
        model.identify_inputs_and_outputs(&[x], &[y]).unwrap();
        let config = nnapi();
        let builder = GraphBuilder::new(ModelInfo::new(&model), &config);
        assert_eq!(builder.supported_operations().unwrap(), vec![false]);
        let mut builder = GraphBuilder::new(ModelInfo::new(&model), &config);
        builder.create_input_parameters().unwrap();
        assert!(builder.build_all().is_err());
        assert!(builder.generate_graph().is_err());
    }

    #[test]
    fn missing_output_is_an_error() {
        setup_test_logger();
        let mut model = Model::default();
        let x = model.add_operand(TensorFloat32, &[1, 4]);
        let y = model.add_operand(TensorFloat32, &[1, 4]);
        model.identify_inputs_and_outputs(&[x], &[y]).unwrap();
        let config = nnapi();
        let mut builder = GraphBuilder::new(ModelInfo::new(&model), &config);
        builder.create_input_parameters().unwrap();
        builder.build_all().unwrap();
        assert!(builder.generate_graph().is_err());
    }
}
