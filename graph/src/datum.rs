//! Element types carried by tensors and facts.
use crate::tensor::Tensor;
use ndarray::ArrayD;
use num_traits::{AsPrimitive, Bounded};
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub enum DatumType {
    Bool,
    U8,
    U16,
    I8,
    I16,
    I32,
    F32,
}

impl DatumType {
    pub fn is_float(&self) -> bool {
        *self == DatumType::F32
    }

    pub fn is_integer(&self) -> bool {
        !matches!(self, DatumType::Bool | DatumType::F32)
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, DatumType::I8 | DatumType::I16 | DatumType::I32 | DatumType::F32)
    }

    pub fn is_number(&self) -> bool {
        *self != DatumType::Bool
    }

    pub fn size_of(&self) -> usize {
        match self {
            DatumType::Bool | DatumType::U8 | DatumType::I8 => 1,
            DatumType::U16 | DatumType::I16 => 2,
            DatumType::I32 | DatumType::F32 => 4,
        }
    }

    /// Inclusive value range of integer types.
    pub fn integer_range(&self) -> Option<(i64, i64)> {
        match self {
            DatumType::U8 => Some(range_of::<u8>()),
            DatumType::I8 => Some(range_of::<i8>()),
            DatumType::U16 => Some(range_of::<u16>()),
            DatumType::I16 => Some(range_of::<i16>()),
            DatumType::I32 => Some(range_of::<i32>()),
            DatumType::Bool | DatumType::F32 => None,
        }
    }
}

fn range_of<T: Bounded + AsPrimitive<i64>>() -> (i64, i64) {
    (T::min_value().as_(), T::max_value().as_())
}

impl fmt::Display for DatumType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            DatumType::Bool => "bool",
            DatumType::U8 => "u8",
            DatumType::U16 => "u16",
            DatumType::I8 => "i8",
            DatumType::I16 => "i16",
            DatumType::I32 => "i32",
            DatumType::F32 => "f32",
        };
        write!(f, "{s}")
    }
}

pub trait Datum: Clone + Copy + fmt::Debug + PartialEq + Send + Sync + Default + 'static {
    fn datum_type() -> DatumType;
    fn wrap(array: ArrayD<Self>) -> Tensor;
    fn array(tensor: &Tensor) -> Option<&ArrayD<Self>>;
}

macro_rules! datum {
    ($t:ty, $v:ident) => {
        impl Datum for $t {
            fn datum_type() -> DatumType {
                DatumType::$v
            }

            fn wrap(array: ArrayD<Self>) -> Tensor {
                Tensor::$v(array)
            }

            fn array(tensor: &Tensor) -> Option<&ArrayD<Self>> {
                if let Tensor::$v(a) = tensor { Some(a) } else { None }
            }
        }
    };
}

datum!(bool, Bool);
datum!(u8, U8);
datum!(u16, U16);
datum!(i8, I8);
datum!(i16, I16);
datum!(i32, I32);
datum!(f32, F32);
