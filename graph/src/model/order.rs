//! Evaluation order for nodes.
use crate::internal::*;
use crate::model::Node;

/// Find an evaluation order for a list of nodes, reaching the targets.
///
/// Nodes that the targets do not depend on are left out.
pub fn eval_order_for_nodes(
    nodes: &[Node],
    inputs: &[usize],
    targets: &[usize],
) -> NnResult<Vec<usize>> {
    let mut done = vec![false; nodes.len()];
    let mut pending = vec![false; nodes.len()];
    let mut needed: Vec<usize> = vec![];
    let mut order: Vec<usize> = vec![];
    for &t in targets.iter().rev() {
        needed.push(t);
    }
    while let Some(&node) = needed.last() {
        if done[node] {
            needed.pop();
            continue;
        }
        if inputs.contains(&node) || nodes[node].inputs.iter().all(|i| done[i.node]) {
            order.push(node);
            needed.pop();
            done[node] = true;
        } else {
            if pending[node] {
                bail!("Loop detected around node {}", nodes[node]);
            }
            pending[node] = true;
            for input in nodes[node].inputs.iter().rev() {
                if !done[input.node] {
                    needed.push(input.node);
                }
            }
        }
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use crate::internal::*;
    use crate::ops::binary::BinOp;

    #[test]
    fn simple() {
        let mut model = TypedModel::default();
        let a = model.add_source("a", TypedFact::shape::<f32>([2])).unwrap();
        let b = model.add_const("b", tensor1(&[12.0f32, 1.0])).unwrap();
        let add = model.wire_node("add", BinOp::Add, &[a, b]).unwrap();
        model.set_output_outlets(&add).unwrap();
        assert_eq!(model.eval_order().unwrap(), vec!(0, 1, 2));
    }

    #[test]
    fn diamond() {
        let mut model = TypedModel::default();
        let a = model.add_source("a", TypedFact::shape::<f32>([2])).unwrap();
        let add = model.wire_node("add", BinOp::Add, &[a, a]).unwrap();
        model.set_output_outlets(&add).unwrap();
        assert_eq!(model.eval_order().unwrap(), vec!(0, 1));
    }

    #[test]
    fn unreachable_left_out() {
        let mut model = TypedModel::default();
        let a = model.add_source("a", TypedFact::shape::<f32>([2])).unwrap();
        model.wire_node("dead", BinOp::Mul, &[a, a]).unwrap();
        let add = model.wire_node("add", BinOp::Add, &[a, a]).unwrap();
        model.set_output_outlets(&add).unwrap();
        assert_eq!(model.eval_order().unwrap(), vec!(0, 2));
    }
}
