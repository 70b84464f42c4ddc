use crate::internal::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Reducer {
    Sum,
    Prod,
    Min,
    Max,
    Mean,
    All,
    Any,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, new)]
pub struct Reduce {
    pub axes: TVec<usize>,
    pub reducer: Reducer,
    pub keep_dims: bool,
}

impl TypedOp for Reduce {
    fn name(&self) -> Cow<'_, str> {
        format!("Reduce<{:?}>", self.reducer).into()
    }

    fn info(&self) -> Vec<String> {
        vec![format!("axes: {:?} keep_dims: {}", self.axes, self.keep_dims)]
    }

    fn output_facts(&self, inputs: &[&TypedFact]) -> NnResult<TVec<TypedFact>> {
        let input = args_1!(inputs);
        match self.reducer {
            Reducer::All | Reducer::Any => ensure!(input.datum_type == DatumType::Bool),
            Reducer::Mean => ensure!(input.datum_type.is_float()),
            _ => ensure!(input.datum_type.is_number()),
        }
        ensure!(
            self.axes.iter().all(|&ax| ax < input.rank()) && self.axes.iter().all_unique(),
            "Invalid reduction axes {:?} for rank {}",
            self.axes,
            input.rank()
        );
        let shape = input
            .shape
            .iter()
            .enumerate()
            .filter_map(|(ax, &d)| {
                if !self.axes.contains(&ax) {
                    Some(d)
                } else if self.keep_dims {
                    Some(1)
                } else {
                    None
                }
            })
            .collect::<TVec<_>>();
        Ok(tvec!(TypedFact::dt_shape(input.datum_type, shape)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keep_dims() {
        let input = TypedFact::shape::<f32>([2, 3, 4]);
        let op = Reduce::new(tvec!(1), Reducer::Sum, true);
        assert_eq!(op.output_facts(&[&input]).unwrap()[0].shape.as_slice(), &[2, 1, 4]);
        let op = Reduce::new(tvec!(0, 2), Reducer::Max, false);
        assert_eq!(op.output_facts(&[&input]).unwrap()[0].shape.as_slice(), &[3]);
    }

    #[test]
    fn bad_axes() {
        let input = TypedFact::shape::<f32>([2, 3]);
        assert!(Reduce::new(tvec!(2), Reducer::Sum, true).output_facts(&[&input]).is_err());
        assert!(Reduce::new(tvec!(1, 1), Reducer::Sum, true).output_facts(&[&input]).is_err());
        assert!(Reduce::new(tvec!(1), Reducer::Any, true).output_facts(&[&input]).is_err());
    }
}
