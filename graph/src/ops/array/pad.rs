use crate::internal::*;

/// Constant padding.
#[derive(Clone, Debug, PartialEq, new)]
pub struct Pad {
    pub pads: TVec<(usize, usize)>,
    pub value: f32,
}

impl TypedOp for Pad {
    fn name(&self) -> Cow<'_, str> {
        "Pad".into()
    }

    fn info(&self) -> Vec<String> {
        vec![format!("pads: {:?} value: {}", self.pads, self.value)]
    }

    fn output_facts(&self, inputs: &[&TypedFact]) -> NnResult<TVec<TypedFact>> {
        let input = args_1!(inputs);
        ensure!(self.pads.len() == input.rank(), "Pad rank mismatch with {:?}", input.shape);
        let shape = input.shape.iter().zip(self.pads.iter()).map(|(d, (b, a))| d + b + a).collect::<TVec<_>>();
        Ok(tvec!(TypedFact::dt_shape(input.datum_type, shape)))
    }
}
