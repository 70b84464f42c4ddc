use crate::internal::*;

/// Gather slices of `data` along `axis` with i32 `indices`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, new)]
pub struct Gather {
    pub axis: usize,
}

impl TypedOp for Gather {
    fn name(&self) -> Cow<'_, str> {
        "Gather".into()
    }

    fn output_facts(&self, inputs: &[&TypedFact]) -> NnResult<TVec<TypedFact>> {
        let (data, indices) = args_2!(inputs);
        ensure!(self.axis < data.rank());
        ensure!(indices.datum_type == DatumType::I32, "Gather indices must be i32");
        let mut shape: TVec<usize> = data.shape[..self.axis].into();
        shape.extend(indices.shape.iter().copied());
        shape.extend(data.shape[self.axis + 1..].iter().copied());
        Ok(tvec!(TypedFact::dt_shape(data.datum_type, shape)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape() {
        let data = TypedFact::shape::<f32>([5, 6, 7]);
        let indices = TypedFact::shape::<i32>([2, 3]);
        let facts = Gather::new(1).output_facts(&[&data, &indices]).unwrap();
        assert_eq!(facts[0].shape.as_slice(), &[5, 2, 3, 7]);
    }
}
