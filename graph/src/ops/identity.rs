use crate::internal::*;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Identity;

impl TypedOp for Identity {
    fn name(&self) -> Cow<'_, str> {
        "Identity".into()
    }

    fn output_facts(&self, inputs: &[&TypedFact]) -> NnResult<TVec<TypedFact>> {
        let input = args_1!(inputs);
        Ok(tvec!(input.without_value()))
    }
}
