use crate::internal::*;

/// Index of the extreme value along an axis, which is removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, new)]
pub struct ArgMaxMin {
    pub max: bool,
    pub axis: usize,
}

impl TypedOp for ArgMaxMin {
    fn name(&self) -> Cow<'_, str> {
        if self.max { "ArgMax".into() } else { "ArgMin".into() }
    }

    fn output_facts(&self, inputs: &[&TypedFact]) -> NnResult<TVec<TypedFact>> {
        let input = args_1!(inputs);
        ensure!(self.axis < input.rank(), "Axis {} out of range for {:?}", self.axis, input.shape);
        ensure!(input.datum_type.is_number());
        let mut shape = input.shape.clone();
        shape.remove(self.axis);
        Ok(tvec!(TypedFact::dt_shape(DatumType::I32, shape)))
    }
}
