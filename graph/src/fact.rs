use crate::internal::*;

/// Fully determined type and shape of a wire.
///
/// `konst` is set when the value is known at graph-construction time, which
/// is the case for `Const` outputs.
#[derive(Clone, PartialEq, Debug)]
pub struct TypedFact {
    pub datum_type: DatumType,
    pub shape: TVec<usize>,
    pub konst: Option<Arc<Tensor>>,
}

impl TypedFact {
    pub fn dt_shape(datum_type: DatumType, shape: impl AsRef<[usize]>) -> TypedFact {
        TypedFact { datum_type, shape: shape.as_ref().into(), konst: None }
    }

    pub fn shape<T: Datum>(shape: impl AsRef<[usize]>) -> TypedFact {
        TypedFact::dt_shape(T::datum_type(), shape)
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn volume(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn without_value(&self) -> TypedFact {
        TypedFact::dt_shape(self.datum_type, &self.shape)
    }
}

impl From<Arc<Tensor>> for TypedFact {
    fn from(t: Arc<Tensor>) -> TypedFact {
        TypedFact { datum_type: t.datum_type(), shape: t.shape().into(), konst: Some(t) }
    }
}

impl From<Tensor> for TypedFact {
    fn from(t: Tensor) -> TypedFact {
        TypedFact::from(Arc::new(t))
    }
}

impl fmt::Display for TypedFact {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(k) = &self.konst {
            write!(f, "{k}")
        } else {
            write!(f, "{},{}", self.shape.iter().join(","), self.datum_type)
        }
    }
}
