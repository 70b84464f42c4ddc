use super::check_2d;
use crate::internal::*;

/// 2D transposed convolution. Input is NCHW, kernel is IOHW.
#[derive(Clone, Debug, PartialEq, Eq, Hash, new)]
pub struct Deconv {
    pub strides: TVec<usize>,
    pub pads_before: TVec<usize>,
    pub pads_after: TVec<usize>,
    pub adjustments: TVec<usize>,
}

impl Deconv {
    fn output_dim(&self, ax: usize, input: usize, kernel: usize) -> NnResult<usize> {
        let full = (input.max(1) - 1) * self.strides[ax] + kernel + self.adjustments[ax];
        let pads = self.pads_before[ax] + self.pads_after[ax];
        ensure!(full > pads, "Deconv padding {} consumes the whole output {}", pads, full);
        Ok(full - pads)
    }
}

impl TypedOp for Deconv {
    fn name(&self) -> Cow<'_, str> {
        "Deconv".into()
    }

    fn info(&self) -> Vec<String> {
        vec![format!(
            "strides: {:?} pads: {:?} {:?} adj: {:?}",
            self.strides, self.pads_before, self.pads_after, self.adjustments
        )]
    }

    fn output_facts(&self, inputs: &[&TypedFact]) -> NnResult<TVec<TypedFact>> {
        let (input, kernel) = args_2!(inputs);
        ensure!(input.rank() == 4 && kernel.rank() == 4, "Deconv expects 4D input and kernel");
        ensure!(input.datum_type == kernel.datum_type && input.datum_type.is_float());
        check_2d("strides", &self.strides)?;
        check_2d("pads_before", &self.pads_before)?;
        check_2d("pads_after", &self.pads_after)?;
        check_2d("adjustments", &self.adjustments)?;
        ensure!(self.strides.iter().all(|s| *s > 0));
        ensure!(
            kernel.shape[0] == input.shape[1],
            "Kernel {:?} incompatible with input {:?}",
            kernel.shape,
            input.shape
        );
        let shape = tvec!(
            input.shape[0],
            kernel.shape[1],
            self.output_dim(0, input.shape[2], kernel.shape[2])?,
            self.output_dim(1, input.shape[3], kernel.shape[3])?
        );
        Ok(tvec!(TypedFact::dt_shape(input.datum_type, shape)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsample() {
        let op = Deconv::new(tvec!(2, 2), tvec!(0, 0), tvec!(1, 1), tvec!(0, 0));
        let input = TypedFact::shape::<f32>([1, 3, 4, 4]);
        let kernel = TypedFact::shape::<f32>([3, 5, 3, 3]);
        let facts = op.output_facts(&[&input, &kernel]).unwrap();
        assert_eq!(facts[0].shape.as_slice(), &[1, 5, 8, 8]);
    }
}
