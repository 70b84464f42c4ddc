use crate::internal::*;

/// Element-wise binary operations, with numpy-style broadcasting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Max,
    Min,
    Pow,
    Equals,
    NotEquals,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
}

impl BinOp {
    pub fn is_comparison(&self) -> bool {
        use BinOp::*;
        matches!(self, Equals | NotEquals | Less | LessEqual | Greater | GreaterEqual)
    }

    pub fn is_logic(&self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }

    pub fn result_datum_type(&self, a: DatumType, b: DatumType) -> NnResult<DatumType> {
        ensure!(a == b, "{:?} operands must have the same type, got {:?} and {:?}", self, a, b);
        if self.is_logic() {
            ensure!(a == DatumType::Bool, "{:?} expects booleans, got {:?}", self, a);
            Ok(DatumType::Bool)
        } else if self.is_comparison() {
            Ok(DatumType::Bool)
        } else {
            ensure!(a.is_number(), "{:?} expects numbers, got {:?}", self, a);
            Ok(a)
        }
    }
}

impl TypedOp for BinOp {
    fn name(&self) -> Cow<'_, str> {
        format!("{self:?}").into()
    }

    fn output_facts(&self, inputs: &[&TypedFact]) -> NnResult<TVec<TypedFact>> {
        let (a, b) = args_2!(inputs);
        let dt = self.result_datum_type(a.datum_type, b.datum_type)?;
        let shape = multi_broadcast(&[&a.shape, &b.shape])?;
        Ok(tvec!(TypedFact::dt_shape(dt, shape)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparison_is_bool() {
        let a = TypedFact::shape::<f32>([2, 3]);
        let b = TypedFact::shape::<f32>([3]);
        let facts = BinOp::Less.output_facts(&[&a, &b]).unwrap();
        assert_eq!(facts[0], TypedFact::shape::<bool>([2, 3]));
    }

    #[test]
    fn mixed_types_rejected() {
        let a = TypedFact::shape::<f32>([2]);
        let b = TypedFact::shape::<i32>([2]);
        assert!(BinOp::Add.output_facts(&[&a, &b]).is_err());
    }

    #[test]
    fn logic_needs_bool() {
        let a = TypedFact::shape::<i32>([2]);
        assert!(BinOp::And.output_facts(&[&a, &a]).is_err());
        let b = TypedFact::shape::<bool>([2]);
        assert!(BinOp::Or.output_facts(&[&b, &b]).is_ok());
    }
}
