//! Constant tensors, as carried by `Const` nodes and facts.
use crate::NnResult;
use crate::datum::{Datum, DatumType};
use anyhow::{bail, format_err};
use itertools::Itertools;
use ndarray::{ArrayD, ArrayViewD, IxDyn};
use std::fmt;
use std::sync::Arc;

#[derive(Clone, PartialEq, Debug)]
pub enum Tensor {
    Bool(ArrayD<bool>),
    U8(ArrayD<u8>),
    U16(ArrayD<u16>),
    I8(ArrayD<i8>),
    I16(ArrayD<i16>),
    I32(ArrayD<i32>),
    F32(ArrayD<f32>),
}

macro_rules! each {
    ($t:expr, $a:ident => $e:expr) => {
        match $t {
            Tensor::Bool($a) => $e,
            Tensor::U8($a) => $e,
            Tensor::U16($a) => $e,
            Tensor::I8($a) => $e,
            Tensor::I16($a) => $e,
            Tensor::I32($a) => $e,
            Tensor::F32($a) => $e,
        }
    };
}

impl Tensor {
    pub fn from_shape<T: Datum>(shape: &[usize], data: &[T]) -> NnResult<Tensor> {
        let array = ArrayD::from_shape_vec(IxDyn(shape), data.to_vec())
            .map_err(|e| format_err!("Building tensor of shape {:?}: {}", shape, e))?;
        Ok(T::wrap(array))
    }

    pub fn zero(dt: DatumType, shape: &[usize]) -> Tensor {
        let shape = IxDyn(shape);
        match dt {
            DatumType::Bool => Tensor::Bool(ArrayD::default(shape)),
            DatumType::U8 => Tensor::U8(ArrayD::default(shape)),
            DatumType::U16 => Tensor::U16(ArrayD::default(shape)),
            DatumType::I8 => Tensor::I8(ArrayD::default(shape)),
            DatumType::I16 => Tensor::I16(ArrayD::default(shape)),
            DatumType::I32 => Tensor::I32(ArrayD::default(shape)),
            DatumType::F32 => Tensor::F32(ArrayD::default(shape)),
        }
    }

    pub fn datum_type(&self) -> DatumType {
        match self {
            Tensor::Bool(_) => DatumType::Bool,
            Tensor::U8(_) => DatumType::U8,
            Tensor::U16(_) => DatumType::U16,
            Tensor::I8(_) => DatumType::I8,
            Tensor::I16(_) => DatumType::I16,
            Tensor::I32(_) => DatumType::I32,
            Tensor::F32(_) => DatumType::F32,
        }
    }

    pub fn shape(&self) -> &[usize] {
        each!(self, a => a.shape())
    }

    pub fn rank(&self) -> usize {
        self.shape().len()
    }

    pub fn len(&self) -> usize {
        self.shape().iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_array_view<T: Datum>(&self) -> NnResult<ArrayViewD<'_, T>> {
        T::array(self).map(|a| a.view()).ok_or_else(|| {
            format_err!("Tensor of type {:?} accessed as {:?}", self.datum_type(), T::datum_type())
        })
    }

    pub fn as_slice<T: Datum>(&self) -> NnResult<&[T]> {
        let array = T::array(self).ok_or_else(|| {
            format_err!("Tensor of type {:?} accessed as {:?}", self.datum_type(), T::datum_type())
        })?;
        array.as_slice().ok_or_else(|| format_err!("Tensor is not contiguous"))
    }

    pub fn to_scalar<T: Datum>(&self) -> NnResult<T> {
        if self.len() != 1 {
            bail!("to_scalar called on a tensor of shape {:?}", self.shape());
        }
        Ok(self.as_slice::<T>()?[0])
    }

    pub fn into_shape(self, shape: &[usize]) -> NnResult<Tensor> {
        if shape.iter().product::<usize>() != self.len() {
            bail!("Can not reshape {:?} to {:?}", self.shape(), shape);
        }
        let shape = IxDyn(shape);
        Ok(match self {
            Tensor::Bool(a) => Tensor::Bool(a.into_shape_with_order(shape)?),
            Tensor::U8(a) => Tensor::U8(a.into_shape_with_order(shape)?),
            Tensor::U16(a) => Tensor::U16(a.into_shape_with_order(shape)?),
            Tensor::I8(a) => Tensor::I8(a.into_shape_with_order(shape)?),
            Tensor::I16(a) => Tensor::I16(a.into_shape_with_order(shape)?),
            Tensor::I32(a) => Tensor::I32(a.into_shape_with_order(shape)?),
            Tensor::F32(a) => Tensor::F32(a.into_shape_with_order(shape)?),
        })
    }

    pub fn into_arc_tensor(self) -> Arc<Tensor> {
        Arc::new(self)
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{},{}", self.shape().iter().join(","), self.datum_type())?;
        if self.len() <= 8 {
            each!(self, a => write!(f, " {}", a.iter().map(|x| format!("{x:?}")).join(", ")))?;
        }
        Ok(())
    }
}

pub fn tensor0<T: Datum>(x: T) -> Tensor {
    T::wrap(ArrayD::from_elem(IxDyn(&[]), x))
}

pub fn tensor1<T: Datum>(xs: &[T]) -> Tensor {
    T::wrap(ArrayD::from_shape_vec(IxDyn(&[xs.len()]), xs.to_vec()).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn scalar() {
        let t = tensor0(3.5f32);
        assert_eq!(t.rank(), 0);
        assert_abs_diff_eq!(t.to_scalar::<f32>().unwrap(), 3.5);
        assert!(t.to_scalar::<i32>().is_err());
    }

    #[test]
    fn from_shape_checks_len() {
        assert!(Tensor::from_shape(&[2, 2], &[1i32, 2, 3]).is_err());
        let t = Tensor::from_shape(&[2, 2], &[1i32, 2, 3, 4]).unwrap();
        assert_eq!(t.shape(), &[2, 2]);
        assert_eq!(t.as_slice::<i32>().unwrap(), &[1, 2, 3, 4]);
    }

    #[test]
    fn reshape() {
        let t = tensor1(&[1u8, 2, 3, 4, 5, 6]).into_shape(&[2, 3]).unwrap();
        assert_eq!(t.shape(), &[2, 3]);
        assert!(t.into_shape(&[4]).is_err());
    }

    #[test]
    fn zero() {
        let t = Tensor::zero(DatumType::I16, &[3, 1]);
        assert_eq!(t.datum_type(), DatumType::I16);
        assert_eq!(t.as_slice::<i16>().unwrap(), &[0, 0, 0]);
    }
}
