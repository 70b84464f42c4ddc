use crate::internal::*;

/// Element-wise unary operations. Output type is input type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Abs,
    Neg,
    Exp,
    Ln,
    Sqrt,
    Rsqrt,
    Sin,
    Floor,
    /// Round half to even.
    Round,
    Tanh,
    Sigmoid,
    Relu,
    Not,
}

impl TypedOp for UnaryOp {
    fn name(&self) -> Cow<'_, str> {
        format!("{self:?}").into()
    }

    fn output_facts(&self, inputs: &[&TypedFact]) -> NnResult<TVec<TypedFact>> {
        let input = args_1!(inputs);
        match self {
            UnaryOp::Not => ensure!(input.datum_type == DatumType::Bool, "Not expects booleans"),
            UnaryOp::Abs | UnaryOp::Neg | UnaryOp::Relu => {
                ensure!(input.datum_type.is_signed(), "{:?} on {:?}", self, input.datum_type)
            }
            _ => ensure!(input.datum_type.is_float(), "{:?} on {:?}", self, input.datum_type),
        }
        Ok(tvec!(input.without_value()))
    }
}

/// Clamp values to [min, max].
#[derive(Clone, Copy, Debug, PartialEq, new)]
pub struct Clip {
    pub min: f32,
    pub max: f32,
}

impl TypedOp for Clip {
    fn name(&self) -> Cow<'_, str> {
        "Clip".into()
    }

    fn info(&self) -> Vec<String> {
        vec![format!("[{}, {}]", self.min, self.max)]
    }

    fn output_facts(&self, inputs: &[&TypedFact]) -> NnResult<TVec<TypedFact>> {
        let input = args_1!(inputs);
        ensure!(input.datum_type.is_number(), "Clip on {:?}", input.datum_type);
        ensure!(self.min <= self.max, "Clip with min {} > max {}", self.min, self.max);
        Ok(tvec!(input.without_value()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_only() {
        let i = TypedFact::shape::<i32>([2]);
        assert!(UnaryOp::Exp.output_facts(&[&i]).is_err());
        assert!(UnaryOp::Abs.output_facts(&[&i]).is_ok());
    }

    #[test]
    fn not_on_bool() {
        let b = TypedFact::shape::<bool>([2, 2]);
        assert_eq!(UnaryOp::Not.output_facts(&[&b]).unwrap()[0], b);
    }

    #[test]
    fn clip_bounds() {
        let f = TypedFact::shape::<f32>([2]);
        assert!(Clip::new(6.0, 0.0).output_facts(&[&f]).is_err());
        assert!(Clip::new(0.0, 6.0).output_facts(&[&f]).is_ok());
    }
}
