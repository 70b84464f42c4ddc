use crate::internal::*;
use crate::model::order::eval_order_for_nodes;
use crate::model::{InletId, Node, Outlet, OutletId};
use crate::ops::konst::Const;
use crate::ops::source::Source;
use std::collections::HashSet;

/// A model with completely determined types and shapes, under construction.
#[derive(Clone, Debug, Default)]
pub struct TypedModel {
    /// all nodes in the model
    pub nodes: Vec<Node>,
    /// model inputs
    pub inputs: Vec<OutletId>,
    /// model outputs
    pub outputs: Vec<OutletId>,
    /// outlet labels
    pub outlet_labels: HashMap<OutletId, String>,
    names: HashSet<String>,
}

impl TypedModel {
    /// Add a node to the model, returning its id. The name is made unique if
    /// needed.
    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        op: impl Into<Box<dyn TypedOp>>,
        output_facts: TVec<TypedFact>,
    ) -> NnResult<usize> {
        let name = self.unique_name(name.into());
        let op = op.into();
        let id = self.nodes.len();
        let outputs =
            output_facts.into_iter().map(|fact| Outlet { fact, successors: tvec!() }).collect();
        trace!("Adding node #{id} \"{name}\" {}", op.name());
        self.names.insert(name.clone());
        self.nodes.push(Node { id, name, inputs: vec![], op, outputs });
        Ok(id)
    }

    /// Connect a node outlet to a node inlet.
    pub fn add_edge(&mut self, outlet: OutletId, inlet: InletId) -> NnResult<()> {
        if outlet.node >= inlet.node {
            bail!("Edge {:?} -> {:?} does not go forward", outlet, inlet);
        }
        {
            let prec = self.node_mut(outlet.node);
            ensure!(outlet.slot < prec.outputs.len(), "Invalid outlet for new edge {:?}", outlet);
            prec.outputs[outlet.slot].successors.push(inlet);
        }
        let succ = self.node_mut(inlet.node);
        if inlet.slot == succ.inputs.len() {
            succ.inputs.push(outlet);
        } else if inlet.slot < succ.inputs.len() {
            succ.inputs[inlet.slot] = outlet;
        } else {
            bail!("Edges must be added in order and consecutive. Trying to connect input {:?}", inlet)
        }
        Ok(())
    }

    /// Adds a source op to the network.
    ///
    /// The source is automatically added to the list of model inputs.
    pub fn add_source(&mut self, name: impl Into<String>, fact: TypedFact) -> NnResult<OutletId> {
        let id = self.add_node(name, Source::new(fact.clone()), tvec!(fact))?;
        let id = OutletId::new(id, 0);
        self.inputs.push(id);
        Ok(id)
    }

    /// Adds a constant to the network. Identical constants are shared.
    pub fn add_const(&mut self, name: impl Into<String>, v: impl Into<Arc<Tensor>>) -> NnResult<OutletId> {
        let v = v.into();
        for node in &self.nodes {
            if node.op_is::<Const>() && node.outputs[0].fact.konst.as_ref() == Some(&v) {
                return Ok(node.id.into());
            }
        }
        let fact = TypedFact::from(v.clone());
        self.add_node(name, Const::new(v), tvec!(fact)).map(|id| id.into())
    }

    /// Wire an op to existing outlets, inferring its output facts.
    pub fn wire_node(
        &mut self,
        name: impl Into<String>,
        op: impl Into<Box<dyn TypedOp>>,
        inputs: &[OutletId],
    ) -> NnResult<TVec<OutletId>> {
        let op = op.into();
        let name = name.into();
        {
            let input_facts = inputs
                .iter()
                .map(|o| self.outlet_fact(*o).cloned())
                .collect::<NnResult<TVec<_>>>()?;
            let input_facts: TVec<&TypedFact> = input_facts.iter().collect();
            let output_facts = op
                .output_facts(&input_facts)
                .with_context(|| format!("in output_facts invocation for {name}: {}", op.name()))?;
            let id = self.add_node(&name, op.clone(), output_facts)?;
            inputs
                .iter()
                .enumerate()
                .try_for_each(|(ix, i)| self.add_edge(*i, InletId::new(id, ix)))?;
            NnResult::Ok(
                self.node(id)
                    .outputs
                    .iter()
                    .enumerate()
                    .map(|(ix, _)| OutletId::new(id, ix))
                    .collect(),
            )
        }
        .with_context(|| format!("Wiring node \"{name}\", {op:?}"))
    }

    pub fn unique_name(&self, prefix: String) -> String {
        if !self.names.contains(&prefix) {
            return prefix;
        }
        (1..)
            .map(|i| format!("{prefix}#{i}"))
            .find(|n| !self.names.contains(n))
            .unwrap_or(prefix)
    }

    pub fn node(&self, id: usize) -> &Node {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: usize) -> &mut Node {
        &mut self.nodes[id]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node_by_name(&self, name: impl AsRef<str>) -> NnResult<&Node> {
        let name = name.as_ref();
        self.nodes
            .iter()
            .find(|n| n.name == name)
            .ok_or_else(|| format_err!("No node found for name: \"{}\"", name))
    }

    pub fn outlet_fact(&self, outlet: OutletId) -> NnResult<&TypedFact> {
        ensure!(outlet.node < self.nodes.len(), "Invalid outlet reference: {:?}", outlet);
        let outlets = &self.nodes[outlet.node].outputs;
        outlets
            .get(outlet.slot)
            .map(|o| &o.fact)
            .ok_or_else(|| format_err!("Invalid outlet reference: {:?}", outlet))
    }

    pub fn node_input_facts(&self, node_id: usize) -> NnResult<TVec<&TypedFact>> {
        self.nodes[node_id].inputs.iter().map(|o| self.outlet_fact(*o)).collect()
    }

    pub fn input_outlets(&self) -> &[OutletId] {
        &self.inputs
    }

    pub fn set_input_outlets(&mut self, inputs: &[OutletId]) -> NnResult<()> {
        for i in inputs {
            ensure!(self.node(i.node).op_is::<Source>(), "Input {:?} is not a source", i);
        }
        self.inputs = inputs.to_vec();
        Ok(())
    }

    pub fn output_outlets(&self) -> &[OutletId] {
        &self.outputs
    }

    pub fn set_output_outlets(&mut self, outputs: &[OutletId]) -> NnResult<()> {
        for o in outputs {
            self.outlet_fact(*o)?;
        }
        self.outputs = outputs.to_vec();
        Ok(())
    }

    pub fn outlet_label(&self, outlet: OutletId) -> Option<&str> {
        self.outlet_labels.get(&outlet).map(|s| &**s)
    }

    pub fn set_outlet_label(&mut self, outlet: OutletId, label: String) -> NnResult<()> {
        self.outlet_fact(outlet)?;
        self.outlet_labels.insert(outlet, label);
        Ok(())
    }

    /// Computes an evalutation order for the graph inputs and outputs
    pub fn eval_order(&self) -> NnResult<Vec<usize>> {
        eval_order_for_nodes(
            &self.nodes,
            &self.inputs.iter().map(|n| n.node).collect::<Vec<usize>>(),
            &self.outputs.iter().map(|n| n.node).collect::<Vec<usize>>(),
        )
    }

    /// Rebuild the model keeping only the nodes the outputs depend on.
    ///
    /// Model inputs are always kept, in order, even when unused.
    pub fn compact(&self) -> NnResult<TypedModel> {
        let mut new = TypedModel::default();
        let mut map: HashMap<OutletId, OutletId> = HashMap::new();
        let mut order = self.eval_order()?;
        for i in &self.inputs {
            if !order.contains(&i.node) {
                debug!("Keeping unused input {}", self.node(i.node));
                order.insert(0, i.node);
            }
        }
        for old_id in order {
            let old = self.node(old_id);
            let facts = old.outputs.iter().map(|o| o.fact.clone()).collect();
            let new_id = new.add_node(old.name.clone(), old.op.clone(), facts)?;
            for ix in 0..old.outputs.len() {
                let (from, to) = (OutletId::new(old_id, ix), OutletId::new(new_id, ix));
                map.insert(from, to);
                if let Some(label) = self.outlet_label(from) {
                    new.set_outlet_label(to, label.to_string())?;
                }
            }
            for (ix, input) in old.inputs.iter().enumerate() {
                new.add_edge(map[input], InletId::new(new_id, ix))?;
            }
        }
        new.inputs = self.inputs.iter().map(|i| map[i]).collect();
        new.outputs = self.outputs.iter().map(|o| map[o]).collect();
        Ok(new)
    }
}

impl fmt::Display for TypedModel {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        for node in &self.nodes {
            writeln!(
                fmt,
                "{} <- {} -> {}",
                node,
                node.inputs.iter().map(|i| format!("{i:?}")).join(", "),
                node.outputs.iter().map(|o| o.fact.to_string()).join(" ")
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::binary::BinOp;
    use crate::ops::change_axes::AxisOp;

    #[test]
    fn wire_infers_facts() {
        let mut model = TypedModel::default();
        let a = model.add_source("a", TypedFact::shape::<f32>([1, 3, 1])).unwrap();
        let b = model.add_const("b", tensor1(&[1.0f32, 2.0])).unwrap();
        let add = model.wire_node("add", BinOp::Add, &[a, b]).unwrap();
        assert_eq!(model.outlet_fact(add[0]).unwrap().shape.as_slice(), &[1, 3, 2]);
    }

    #[test]
    fn wire_rejects_bad_shapes() {
        let mut model = TypedModel::default();
        let a = model.add_source("a", TypedFact::shape::<f32>([3])).unwrap();
        let b = model.add_const("b", tensor1(&[1.0f32, 2.0])).unwrap();
        assert!(model.wire_node("add", BinOp::Add, &[a, b]).is_err());
        assert_eq!(model.nodes().len(), 2);
    }

    #[test]
    fn wire_chain_reads_own_outlets() {
        let mut model = TypedModel::default();
        let a = model.add_source("a", TypedFact::shape::<f32>([2])).unwrap();
        let b = model.wire_node("b", BinOp::Mul, &[a, a]).unwrap();
        let c = model.wire_node("c", BinOp::Add, &[b[0], a]).unwrap();
        assert_eq!(model.node(c[0].node).inputs, vec![b[0], a]);
        assert_eq!(model.node(a.node).outputs[0].successors.len(), 3);
        assert_eq!(model.outlet_fact(c[0]).unwrap().shape.as_slice(), &[2]);
    }

    #[test]
    fn names_are_unique() {
        let mut model = TypedModel::default();
        let a = model.add_source("a", TypedFact::shape::<f32>([3])).unwrap();
        let b = model.wire_node("a", AxisOp::Add(0), &[a]).unwrap();
        let c = model.wire_node("a", AxisOp::Add(0), &[b[0]]).unwrap();
        assert_eq!(model.node(b[0].node).name, "a#1");
        assert_eq!(model.node(c[0].node).name, "a#2");
    }

    #[test]
    fn consts_are_shared() {
        let mut model = TypedModel::default();
        let a = model.add_const("a", tensor0(1i32)).unwrap();
        let b = model.add_const("b", tensor0(1i32)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn compact_drops_dead_nodes() {
        let _ = env_logger::Builder::from_env("NNHAL_LOG").try_init();
        let mut model = TypedModel::default();
        let a = model.add_source("a", TypedFact::shape::<f32>([3])).unwrap();
        let unused = model.add_source("unused", TypedFact::shape::<f32>([3])).unwrap();
        model.wire_node("dead", BinOp::Mul, &[a, unused]).unwrap();
        let add = model.wire_node("add", BinOp::Add, &[a, a]).unwrap();
        model.set_output_outlets(&add).unwrap();
        model.set_outlet_label(add[0], "out".to_string()).unwrap();
        let compact = model.compact().unwrap();
        assert_eq!(compact.nodes().len(), 3);
        assert_eq!(compact.inputs.len(), 2);
        assert_eq!(compact.node(compact.inputs[1].node).name, "unused");
        assert_eq!(compact.outlet_label(compact.outputs[0]), Some("out"));
    }
}
