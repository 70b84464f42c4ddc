use super::{check_2d, output_dim};
use crate::internal::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PoolKind {
    Max,
    /// Padding is excluded from the averaging count.
    Avg,
}

/// 2D pooling over NCHW data.
#[derive(Clone, Debug, PartialEq, Eq, Hash, new)]
pub struct Pool {
    pub kind: PoolKind,
    pub kernel: TVec<usize>,
    pub strides: TVec<usize>,
    pub pads_before: TVec<usize>,
    pub pads_after: TVec<usize>,
}

impl TypedOp for Pool {
    fn name(&self) -> Cow<'_, str> {
        match self.kind {
            PoolKind::Max => "MaxPool".into(),
            PoolKind::Avg => "AvgPool".into(),
        }
    }

    fn info(&self) -> Vec<String> {
        vec![format!(
            "kernel: {:?} strides: {:?} pads: {:?} {:?}",
            self.kernel, self.strides, self.pads_before, self.pads_after
        )]
    }

    fn output_facts(&self, inputs: &[&TypedFact]) -> NnResult<TVec<TypedFact>> {
        let input = args_1!(inputs);
        ensure!(input.rank() == 4, "Pooling expects 4D input, got {:?}", input.shape);
        ensure!(input.datum_type.is_float());
        check_2d("kernel", &self.kernel)?;
        check_2d("strides", &self.strides)?;
        check_2d("pads_before", &self.pads_before)?;
        check_2d("pads_after", &self.pads_after)?;
        let mut shape = tvec!(input.shape[0], input.shape[1]);
        for ax in 0..2 {
            shape.push(output_dim(
                input.shape[2 + ax],
                self.kernel[ax],
                1,
                self.strides[ax],
                self.pads_before[ax],
                self.pads_after[ax],
            )?);
        }
        Ok(tvec!(TypedFact::dt_shape(input.datum_type, shape)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_pool_2x2() {
        let op = Pool::new(PoolKind::Max, tvec!(2, 2), tvec!(2, 2), tvec!(0, 0), tvec!(0, 0));
        let input = TypedFact::shape::<f32>([1, 3, 6, 5]);
        assert_eq!(op.output_facts(&[&input]).unwrap()[0].shape.as_slice(), &[1, 3, 3, 2]);
    }
}
