use crate::internal::*;
use nnhal_graph::ops::element_wise::{Clip, UnaryOp};

/// Fused activation codes carried by arithmetic, convolution and pooling
/// operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FusedActivation {
    None,
    Relu,
    Relu1,
    Relu6,
}

impl FusedActivation {
    pub fn from_code(code: i32) -> Option<FusedActivation> {
        match code {
            0 => Some(FusedActivation::None),
            1 => Some(FusedActivation::Relu),
            2 => Some(FusedActivation::Relu1),
            3 => Some(FusedActivation::Relu6),
            _ => None,
        }
    }
}

pub fn wire_fused_activation(
    target: &mut TypedModel,
    name: &str,
    input: OutletId,
    activation: FusedActivation,
) -> NnResult<OutletId> {
    let name = format!("{name}.activation");
    Ok(match activation {
        FusedActivation::None => input,
        FusedActivation::Relu => target.wire_node(name, UnaryOp::Relu, &[input])?[0],
        FusedActivation::Relu1 => target.wire_node(name, Clip::new(-1.0, 1.0), &[input])?[0],
        FusedActivation::Relu6 => target.wire_node(name, Clip::new(0.0, 6.0), &[input])?[0],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes() {
        assert_eq!(FusedActivation::from_code(3), Some(FusedActivation::Relu6));
        assert_eq!(FusedActivation::from_code(4), None);
    }

    #[test]
    fn none_is_passthrough() {
        let mut model = TypedModel::default();
        let x = model.add_source("x", TypedFact::shape::<f32>([2])).unwrap();
        assert_eq!(wire_fused_activation(&mut model, "a", x, FusedActivation::None).unwrap(), x);
        let relu1 = wire_fused_activation(&mut model, "a", x, FusedActivation::Relu1).unwrap();
        assert!(model.node(relu1.node).op_is::<Clip>());
    }
}
