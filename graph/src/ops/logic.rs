use crate::internal::*;

/// `cond ? a : b`, element-wise with broadcasting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Select;

impl TypedOp for Select {
    fn name(&self) -> Cow<'_, str> {
        "Select".into()
    }

    fn output_facts(&self, inputs: &[&TypedFact]) -> NnResult<TVec<TypedFact>> {
        let (cond, a, b) = args_3!(inputs);
        ensure!(cond.datum_type == DatumType::Bool, "Select condition must be boolean");
        ensure!(a.datum_type == b.datum_type, "Select branches of mixed types");
        let shape = multi_broadcast(&[&cond.shape, &a.shape, &b.shape])?;
        Ok(tvec!(TypedFact::dt_shape(a.datum_type, shape)))
    }
}
