use crate::internal::*;

/// Split an axis into consecutive chunks of the given sizes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, new)]
pub struct Split {
    pub axis: usize,
    pub splits: TVec<usize>,
}

impl TypedOp for Split {
    fn name(&self) -> Cow<'_, str> {
        "Split".into()
    }

    fn info(&self) -> Vec<String> {
        vec![format!("axis: {} splits: {:?}", self.axis, self.splits)]
    }

    fn output_facts(&self, inputs: &[&TypedFact]) -> NnResult<TVec<TypedFact>> {
        let input = args_1!(inputs);
        ensure!(self.axis < input.rank());
        ensure!(
            self.splits.iter().sum::<usize>() == input.shape[self.axis],
            "Splits {:?} do not cover axis {} of {:?}",
            self.splits,
            self.axis,
            input.shape
        );
        Ok(self
            .splits
            .iter()
            .map(|&len| {
                let mut shape = input.shape.clone();
                shape[self.axis] = len;
                TypedFact::dt_shape(input.datum_type, shape)
            })
            .collect())
    }
}
