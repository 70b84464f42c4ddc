use crate::internal::*;

#[derive(Debug, Clone, new)]
pub struct Source {
    pub fact: TypedFact,
}

impl TypedOp for Source {
    fn name(&self) -> Cow<'_, str> {
        "Source".into()
    }

    fn output_facts(&self, inputs: &[&TypedFact]) -> NnResult<TVec<TypedFact>> {
        ensure!(inputs.is_empty());
        Ok(tvec!(self.fact.clone()))
    }
}
