use crate::internal::*;

/// Converts to another datum type. Float to integer conversion truncates
/// toward zero and saturates at the type bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, new)]
pub struct Cast {
    pub to: DatumType,
}

impl TypedOp for Cast {
    fn name(&self) -> Cow<'_, str> {
        "Cast".into()
    }

    fn info(&self) -> Vec<String> {
        vec![format!("to: {}", self.to)]
    }

    fn output_facts(&self, inputs: &[&TypedFact]) -> NnResult<TVec<TypedFact>> {
        let input = args_1!(inputs);
        Ok(tvec!(TypedFact::dt_shape(self.to, &input.shape)))
    }
}
