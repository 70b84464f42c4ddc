use crate::internal::*;

/// Strided range over one axis. `end` is exclusive and may be -1 with a
/// negative stride, meaning "down to and including 0".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, new)]
pub struct SliceAxis {
    pub begin: i64,
    pub end: i64,
    pub stride: i64,
}

impl SliceAxis {
    pub fn full(dim: usize) -> SliceAxis {
        SliceAxis::new(0, dim as i64, 1)
    }

    pub fn len(&self) -> usize {
        let len = if self.stride > 0 {
            (self.end - self.begin + self.stride - 1) / self.stride
        } else {
            (self.begin - self.end - self.stride - 1) / -self.stride
        };
        len.max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Strided slice with one fully resolved range per axis.
#[derive(Clone, Debug, PartialEq, Eq, Hash, new)]
pub struct Slice {
    pub axes: TVec<SliceAxis>,
}

impl TypedOp for Slice {
    fn name(&self) -> Cow<'_, str> {
        "Slice".into()
    }

    fn info(&self) -> Vec<String> {
        self.axes.iter().map(|a| format!("{}..{} by {}", a.begin, a.end, a.stride)).collect()
    }

    fn output_facts(&self, inputs: &[&TypedFact]) -> NnResult<TVec<TypedFact>> {
        let input = args_1!(inputs);
        ensure!(self.axes.len() == input.rank(), "Slice rank mismatch with {:?}", input.shape);
        let mut shape = tvec!();
        for (axis, &dim) in self.axes.iter().zip(input.shape.iter()) {
            ensure!(axis.stride != 0, "Slice stride can not be 0");
            ensure!(
                (0..=dim as i64).contains(&axis.begin) && (-1..=dim as i64).contains(&axis.end),
                "Slice {:?} out of bounds for dim {}",
                axis,
                dim
            );
            shape.push(axis.len());
        }
        Ok(tvec!(TypedFact::dt_shape(input.datum_type, shape)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lengths() {
        assert_eq!(SliceAxis::new(0, 5, 2).len(), 3);
        assert_eq!(SliceAxis::new(1, 5, 2).len(), 2);
        assert_eq!(SliceAxis::new(4, -1, -1).len(), 5);
        assert_eq!(SliceAxis::new(4, 0, -2).len(), 2);
        assert_eq!(SliceAxis::new(3, 1, 1).len(), 0);
    }

    #[test]
    fn facts() {
        let input = TypedFact::shape::<f32>([4, 6]);
        let op = Slice::new(tvec!(SliceAxis::full(4), SliceAxis::new(1, 6, 2)));
        assert_eq!(op.output_facts(&[&input]).unwrap()[0].shape.as_slice(), &[4, 3]);
    }
}
