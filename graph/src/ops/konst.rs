use crate::internal::*;

#[derive(Debug, Clone, new)]
pub struct Const(pub Arc<Tensor>);

impl TypedOp for Const {
    fn name(&self) -> Cow<'_, str> {
        "Const".into()
    }

    fn info(&self) -> Vec<String> {
        vec![format!("{}", self.0)]
    }

    fn output_facts(&self, inputs: &[&TypedFact]) -> NnResult<TVec<TypedFact>> {
        ensure!(inputs.is_empty());
        Ok(tvec!(TypedFact::from(self.0.clone())))
    }
}
