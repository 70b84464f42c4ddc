use crate::internal::*;

/// Axis manipulations that do not touch data.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AxisOp {
    /// Insert a 1-sized axis at position.
    Add(usize),
    /// Remove a 1-sized axis at position.
    Rm(usize),
    /// Permute axes: output axis `i` is input axis `perm[i]`.
    Permute(TVec<usize>),
    /// Reshape to a fully known shape with the same volume.
    Reshape(TVec<usize>),
}

impl AxisOp {
    pub fn output_shape(&self, shape: &[usize]) -> NnResult<TVec<usize>> {
        let mut shape: TVec<usize> = shape.into();
        match self {
            AxisOp::Add(ix) => {
                ensure!(*ix <= shape.len(), "Can not add axis {} to shape {:?}", ix, shape);
                shape.insert(*ix, 1);
            }
            AxisOp::Rm(ix) => {
                ensure!(
                    *ix < shape.len() && shape[*ix] == 1,
                    "Can not remove axis {} from shape {:?}",
                    ix,
                    shape
                );
                shape.remove(*ix);
            }
            AxisOp::Permute(perm) => {
                ensure!(is_permutation(perm, shape.len()), "Invalid permutation {:?} for {:?}", perm, shape);
                shape = perm.iter().map(|&p| shape[p]).collect();
            }
            AxisOp::Reshape(to) => {
                ensure!(
                    to.iter().product::<usize>() == shape.iter().product::<usize>(),
                    "Can not reshape {:?} to {:?}",
                    shape,
                    to
                );
                shape = to.clone();
            }
        }
        Ok(shape)
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, AxisOp::Permute(p) if p.iter().enumerate().all(|(ix, &a)| ix == a))
    }
}

pub fn is_permutation(perm: &[usize], rank: usize) -> bool {
    perm.len() == rank && (0..rank).all(|ax| perm.contains(&ax))
}

/// Inverse of a permutation: applying `perm` then `invert(perm)` is the identity.
pub fn invert_permutation(perm: &[usize]) -> TVec<usize> {
    let mut inv: TVec<usize> = tvec![0; perm.len()];
    for (ix, &p) in perm.iter().enumerate() {
        inv[p] = ix;
    }
    inv
}

impl TypedOp for AxisOp {
    fn name(&self) -> Cow<'_, str> {
        match self {
            AxisOp::Add(_) => "AddAxis".into(),
            AxisOp::Rm(_) => "RmAxis".into(),
            AxisOp::Permute(_) => "Permute".into(),
            AxisOp::Reshape(_) => "Reshape".into(),
        }
    }

    fn info(&self) -> Vec<String> {
        match self {
            AxisOp::Add(ix) | AxisOp::Rm(ix) => vec![format!("axis: {ix}")],
            AxisOp::Permute(perm) => vec![format!("perm: {perm:?}")],
            AxisOp::Reshape(shape) => vec![format!("to: {shape:?}")],
        }
    }

    fn output_facts(&self, inputs: &[&TypedFact]) -> NnResult<TVec<TypedFact>> {
        let input = args_1!(inputs);
        Ok(tvec!(TypedFact::dt_shape(input.datum_type, self.output_shape(&input.shape)?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn permute_nhwc_to_nchw() {
        let op = AxisOp::Permute(tvec!(0, 3, 1, 2));
        assert_eq!(op.output_shape(&[1, 4, 5, 3]).unwrap(), tvec!(1, 3, 4, 5));
    }

    #[test]
    fn rm_needs_unit_axis() {
        assert!(AxisOp::Rm(1).output_shape(&[2, 3]).is_err());
        assert_eq!(AxisOp::Rm(1).output_shape(&[2, 1, 3]).unwrap(), tvec!(2, 3));
    }

    #[test]
    fn reshape_keeps_volume() {
        assert!(AxisOp::Reshape(tvec!(5)).output_shape(&[2, 3]).is_err());
        assert_eq!(AxisOp::Reshape(tvec!(3, 2)).output_shape(&[2, 3]).unwrap(), tvec!(3, 2));
    }

    #[test]
    fn noop() {
        assert!(AxisOp::Permute(tvec!(0, 1, 2)).is_noop());
        assert!(!AxisOp::Permute(tvec!(0, 2, 1)).is_noop());
    }

    fn shape_and_perm() -> impl Strategy<Value = (Vec<usize>, Vec<usize>)> {
        proptest::collection::vec(1usize..5, 1..5).prop_flat_map(|shape| {
            let rank = shape.len();
            (Just(shape), Just((0..rank).collect::<Vec<_>>()).prop_shuffle())
        })
    }

    proptest! {
        #[test]
        fn permute_then_inverse((shape, perm) in shape_and_perm()) {
            let there = AxisOp::Permute(perm.iter().copied().collect()).output_shape(&shape).unwrap();
            let back = AxisOp::Permute(invert_permutation(&perm)).output_shape(&there).unwrap();
            prop_assert_eq!(back.as_slice(), shape.as_slice());
        }
    }
}
