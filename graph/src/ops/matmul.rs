use crate::internal::*;

/// Matrix product over the two innermost axes. Leading axes broadcast.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, new)]
pub struct MatMul {
    pub transpose_a: bool,
    pub transpose_b: bool,
}

impl TypedOp for MatMul {
    fn name(&self) -> Cow<'_, str> {
        "MatMul".into()
    }

    fn info(&self) -> Vec<String> {
        vec![format!("transpose_a: {} transpose_b: {}", self.transpose_a, self.transpose_b)]
    }

    fn output_facts(&self, inputs: &[&TypedFact]) -> NnResult<TVec<TypedFact>> {
        let (a, b) = args_2!(inputs);
        ensure!(a.rank() >= 2 && b.rank() >= 2, "MatMul expects at least 2D operands");
        ensure!(a.datum_type == b.datum_type && a.datum_type.is_number());
        let (ar, br) = (a.rank(), b.rank());
        let (m, ka) =
            if self.transpose_a { (a.shape[ar - 1], a.shape[ar - 2]) } else { (a.shape[ar - 2], a.shape[ar - 1]) };
        let (kb, n) =
            if self.transpose_b { (b.shape[br - 1], b.shape[br - 2]) } else { (b.shape[br - 2], b.shape[br - 1]) };
        ensure!(ka == kb, "MatMul inner dimension mismatch: {:?} x {:?}", a.shape, b.shape);
        let mut shape = multi_broadcast(&[&a.shape[..ar - 2], &b.shape[..br - 2]])?;
        shape.push(m);
        shape.push(n);
        Ok(tvec!(TypedFact::dt_shape(a.datum_type, shape)))
    }
}
