use crate::internal::*;

/// Largest `k` values along an axis, sorted, and their indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, new)]
pub struct TopK {
    pub axis: usize,
    pub k: usize,
}

impl TypedOp for TopK {
    fn name(&self) -> Cow<'_, str> {
        "TopK".into()
    }

    fn info(&self) -> Vec<String> {
        vec![format!("axis: {} k: {}", self.axis, self.k)]
    }

    fn output_facts(&self, inputs: &[&TypedFact]) -> NnResult<TVec<TypedFact>> {
        let input = args_1!(inputs);
        ensure!(self.axis < input.rank());
        ensure!(
            self.k > 0 && self.k <= input.shape[self.axis],
            "k={} out of range for axis of size {}",
            self.k,
            input.shape[self.axis]
        );
        let mut shape = input.shape.clone();
        shape[self.axis] = self.k;
        Ok(tvec!(
            TypedFact::dt_shape(input.datum_type, &shape),
            TypedFact::dt_shape(DatumType::I32, &shape)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_outputs() {
        let input = TypedFact::shape::<f32>([2, 10]);
        let facts = TopK::new(1, 3).output_facts(&[&input]).unwrap();
        assert_eq!(facts.len(), 2);
        assert_eq!(facts[0], TypedFact::shape::<f32>([2, 3]));
        assert_eq!(facts[1], TypedFact::shape::<i32>([2, 3]));
        assert!(TopK::new(1, 11).output_facts(&[&input]).is_err());
    }
}
