use crate::internal::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, new)]
pub struct Concat {
    pub axis: usize,
}

impl TypedOp for Concat {
    fn name(&self) -> Cow<'_, str> {
        "Concat".into()
    }

    fn info(&self) -> Vec<String> {
        vec![format!("axis: {}", self.axis)]
    }

    fn output_facts(&self, inputs: &[&TypedFact]) -> NnResult<TVec<TypedFact>> {
        ensure!(!inputs.is_empty(), "Concat needs at least one input");
        let first = inputs[0];
        ensure!(self.axis < first.rank(), "Axis {} out of range for {:?}", self.axis, first.shape);
        let mut shape = first.shape.clone();
        shape[self.axis] = 0;
        for input in inputs {
            ensure!(input.datum_type == first.datum_type, "Concat of mixed types");
            ensure!(input.rank() == first.rank(), "Concat of mixed ranks");
            for ax in 0..first.rank() {
                if ax == self.axis {
                    shape[ax] += input.shape[ax];
                } else {
                    ensure!(
                        input.shape[ax] == first.shape[ax],
                        "Concat on axis {}: incompatible shapes {:?} and {:?}",
                        self.axis,
                        first.shape,
                        input.shape
                    );
                }
            }
        }
        Ok(tvec!(TypedFact::dt_shape(first.datum_type, shape)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_way() {
        let a = TypedFact::shape::<f32>([1, 2, 3]);
        let b = TypedFact::shape::<f32>([1, 4, 3]);
        let facts = Concat::new(1).output_facts(&[&a, &b, &a]).unwrap();
        assert_eq!(facts[0].shape.as_slice(), &[1, 8, 3]);
        assert!(Concat::new(2).output_facts(&[&a, &b]).is_err());
    }
}
