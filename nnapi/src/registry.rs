//! Operand-to-node bookkeeping for one translation.
use crate::internal::*;
use crate::layout::{Conversion, transpose};
use nnhal_graph::ops::identity::Identity;
use std::collections::HashSet;

/// Tracks which graph node produces each operand while a model is being
/// translated, along with the graph interface.
///
/// Slots flagged with forced layout hold a channel-first node for a
/// channel-last operand. `get_output` always answers in the declared layout,
/// inserting (once) the transposition back when needed.
#[derive(Debug, Default)]
pub struct OutputRegistry {
    target: TypedModel,
    nodes: HashMap<usize, OutletId>,
    forced_layout: HashSet<usize>,
    declared_views: HashMap<usize, OutletId>,
    invalid: HashSet<usize>,
    input_parameters: Vec<(usize, OutletId)>,
    results: Vec<(usize, OutletId)>,
    names: HashMap<usize, String>,
    finalized: bool,
}

impl OutputRegistry {
    pub fn target(&self) -> &TypedModel {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut TypedModel {
        &mut self.target
    }

    /// Creates the source node for a model input. Call order is the graph
    /// input order.
    pub fn add_input_parameter(&mut self, operand: usize, fact: TypedFact) -> NnResult<OutletId> {
        let name = format!("input.{operand}");
        let outlet = self.target.add_source(&name, fact)?;
        self.names.insert(operand, self.target.node(outlet.node).name.clone());
        self.input_parameters.push((operand, outlet));
        self.set_output(operand, outlet);
        Ok(outlet)
    }

    pub fn input_parameters(&self) -> &[(usize, OutletId)] {
        &self.input_parameters
    }

    /// Registers the node for an operand, replacing any previous one.
    pub fn set_output(&mut self, operand: usize, outlet: OutletId) {
        self.nodes.insert(operand, outlet);
        self.forced_layout.remove(&operand);
        self.declared_views.remove(&operand);
        self.invalid.remove(&operand);
    }

    pub fn has_output(&self, operand: usize) -> bool {
        self.nodes.contains_key(&operand)
    }

    /// The node for an operand, in its declared layout.
    pub fn get_output(&mut self, operand: usize) -> NnResult<OutletId> {
        let (outlet, forced) = self.get_registered_output(operand)?;
        if !forced {
            return Ok(outlet);
        }
        if let Some(view) = self.declared_views.get(&operand) {
            return Ok(*view);
        }
        let name = format!("operand.{operand}.to_nhwc");
        let view = transpose(&mut self.target, name, Conversion::NchwToNhwc, outlet)?;
        self.declared_views.insert(operand, view);
        Ok(view)
    }

    /// The node as registered, and whether it is in forced (channel-first)
    /// layout.
    pub fn get_registered_output(&self, operand: usize) -> NnResult<(OutletId, bool)> {
        if self.invalid.contains(&operand) {
            bail!("Operand #{} was marked invalid", operand);
        }
        let outlet = self
            .nodes
            .get(&operand)
            .ok_or_else(|| format_err!("No node registered for operand #{}", operand))?;
        Ok((*outlet, self.forced_layout.contains(&operand)))
    }

    pub fn is_forced_layout(&self, operand: usize) -> bool {
        self.forced_layout.contains(&operand)
    }

    pub fn set_forced_layout(&mut self, operand: usize, forced: bool) {
        self.declared_views.remove(&operand);
        if forced {
            self.forced_layout.insert(operand);
        } else {
            self.forced_layout.remove(&operand);
        }
    }

    /// Marks an operand as a graph result. A second call for the same
    /// operand moves it to the end of the result list.
    pub fn add_result(&mut self, operand: usize, outlet: OutletId) {
        self.results.retain(|(o, _)| *o != operand);
        self.results.push((operand, outlet));
    }

    pub fn results(&self) -> &[(usize, OutletId)] {
        &self.results
    }

    pub fn set_invalid(&mut self, operand: usize) {
        self.nodes.remove(&operand);
        self.forced_layout.remove(&operand);
        self.declared_views.remove(&operand);
        self.invalid.insert(operand);
    }

    pub fn is_invalid(&self, operand: usize) -> bool {
        self.invalid.contains(&operand)
    }

    /// Graph name of an input parameter or result, for I/O binding.
    pub fn node_name(&self, operand: usize) -> Option<&str> {
        self.names.get(&operand).map(|s| &**s)
    }

    /// Seals the graph. Can only happen once.
    pub fn finalize(&mut self) -> NnResult<Graph> {
        ensure!(!self.finalized, "Graph already finalized");
        if self.results.is_empty() {
            bail!("Can not finalize a graph without results");
        }
        self.finalized = true;
        let mut target = std::mem::take(&mut self.target);
        let inputs = self.input_parameters.iter().map(|(_, o)| *o).collect::<Vec<_>>();
        target.set_input_outlets(&inputs)?;
        let mut outputs: Vec<OutletId> = vec![];
        for (operand, outlet) in &self.results {
            let label = format!("output.{operand}");
            let outlet = if outputs.contains(outlet) {
                target.wire_node(&label, Identity, &[*outlet])?[0]
            } else {
                *outlet
            };
            target.set_outlet_label(outlet, label.clone())?;
            self.names.insert(*operand, label);
            outputs.push(outlet);
        }
        target.set_output_outlets(&outputs)?;
        Graph::new(target)
    }
}
