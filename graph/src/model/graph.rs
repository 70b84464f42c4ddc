use crate::internal::*;
use crate::model::{Node, OutletId, TypedModel};

/// A finalized, immutable graph.
///
/// Only nodes the outputs depend on are kept. Inputs and outputs keep the
/// order they were declared in.
#[derive(Clone, Debug)]
pub struct Graph {
    model: TypedModel,
}

impl Graph {
    pub fn new(model: TypedModel) -> NnResult<Graph> {
        if model.output_outlets().is_empty() {
            bail!("Can not seal a graph without outputs");
        }
        let model = model.compact()?;
        debug!(
            "Sealed graph with {} nodes, {} inputs, {} outputs",
            model.nodes().len(),
            model.inputs.len(),
            model.outputs.len()
        );
        Ok(Graph { model })
    }

    pub fn model(&self) -> &TypedModel {
        &self.model
    }

    pub fn nodes(&self) -> &[Node] {
        self.model.nodes()
    }

    pub fn node_count(&self) -> usize {
        self.model.nodes().len()
    }

    pub fn inputs(&self) -> &[OutletId] {
        self.model.input_outlets()
    }

    pub fn outputs(&self) -> &[OutletId] {
        self.model.output_outlets()
    }

    pub fn input_fact(&self, ix: usize) -> NnResult<&TypedFact> {
        let outlet = self.inputs().get(ix).ok_or_else(|| format_err!("No input #{}", ix))?;
        self.model.outlet_fact(*outlet)
    }

    pub fn output_fact(&self, ix: usize) -> NnResult<&TypedFact> {
        let outlet = self.outputs().get(ix).ok_or_else(|| format_err!("No output #{}", ix))?;
        self.model.outlet_fact(*outlet)
    }

    pub fn input_name(&self, ix: usize) -> NnResult<&str> {
        let outlet = self.inputs().get(ix).ok_or_else(|| format_err!("No input #{}", ix))?;
        Ok(&self.model.node(outlet.node).name)
    }

    /// Output label if any, node name otherwise.
    pub fn output_name(&self, ix: usize) -> NnResult<&str> {
        let outlet = self.outputs().get(ix).ok_or_else(|| format_err!("No output #{}", ix))?;
        Ok(self.model.outlet_label(*outlet).unwrap_or(&self.model.node(outlet.node).name))
    }

    pub fn into_model(self) -> TypedModel {
        self.model
    }
}

impl fmt::Display for Graph {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.model, fmt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::element_wise::UnaryOp;

    #[test]
    fn needs_outputs() {
        let mut model = TypedModel::default();
        model.add_source("a", TypedFact::shape::<f32>([3])).unwrap();
        assert!(Graph::new(model).is_err());
    }

    #[test]
    fn io_names() {
        let mut model = TypedModel::default();
        let a = model.add_source("input.0", TypedFact::shape::<f32>([3])).unwrap();
        let relu = model.wire_node("relu", UnaryOp::Relu, &[a]).unwrap();
        model.set_output_outlets(&relu).unwrap();
        model.set_outlet_label(relu[0], "output.1".to_string()).unwrap();
        let graph = Graph::new(model).unwrap();
        assert_eq!(graph.input_name(0).unwrap(), "input.0");
        assert_eq!(graph.output_name(0).unwrap(), "output.1");
        assert_eq!(graph.output_fact(0).unwrap().shape.as_slice(), &[3]);
        assert!(graph.input_fact(1).is_err());
    }
}
