use super::{check_2d, output_dim};
use crate::internal::*;

/// 2D convolution. Input is NCHW, kernel is OIHW with I = C / group.
#[derive(Clone, Debug, PartialEq, Eq, Hash, new)]
pub struct Conv {
    pub strides: TVec<usize>,
    pub dilations: TVec<usize>,
    pub pads_before: TVec<usize>,
    pub pads_after: TVec<usize>,
    pub group: usize,
}

impl TypedOp for Conv {
    fn name(&self) -> Cow<'_, str> {
        "Conv".into()
    }

    fn info(&self) -> Vec<String> {
        vec![
            format!("strides: {:?} dilations: {:?}", self.strides, self.dilations),
            format!("pads: {:?} {:?} group: {}", self.pads_before, self.pads_after, self.group),
        ]
    }

    fn output_facts(&self, inputs: &[&TypedFact]) -> NnResult<TVec<TypedFact>> {
        let (input, kernel) = args_2!(inputs);
        ensure!(input.rank() == 4 && kernel.rank() == 4, "Conv expects 4D input and kernel");
        ensure!(input.datum_type == kernel.datum_type && input.datum_type.is_float());
        for (name, v) in [
            ("strides", &self.strides),
            ("dilations", &self.dilations),
            ("pads_before", &self.pads_before),
            ("pads_after", &self.pads_after),
        ] {
            check_2d(name, v)?;
        }
        ensure!(self.group > 0);
        let (o, i) = (kernel.shape[0], kernel.shape[1]);
        ensure!(
            i * self.group == input.shape[1] && o % self.group == 0,
            "Kernel {:?} incompatible with input {:?} for group {}",
            kernel.shape,
            input.shape,
            self.group
        );
        let mut shape = tvec!(input.shape[0], o);
        for ax in 0..2 {
            shape.push(output_dim(
                input.shape[2 + ax],
                kernel.shape[2 + ax],
                self.dilations[ax],
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

    fn conv(group: usize) -> Conv {
        Conv::new(tvec!(2, 2), tvec!(1, 1), tvec!(1, 1), tvec!(1, 1), group)
    }

    #[test]
    fn same_strided() {
        let input = TypedFact::shape::<f32>([1, 3, 4, 4]);
        let kernel = TypedFact::shape::<f32>([8, 3, 3, 3]);
        let facts = conv(1).output_facts(&[&input, &kernel]).unwrap();
        assert_eq!(facts[0].shape.as_slice(), &[1, 8, 2, 2]);
    }

    #[test]
    fn depthwise() {
        let input = TypedFact::shape::<f32>([1, 4, 4, 4]);
        let kernel = TypedFact::shape::<f32>([8, 1, 3, 3]);
        let facts = conv(4).output_facts(&[&input, &kernel]).unwrap();
        assert_eq!(facts[0].shape.as_slice(), &[1, 8, 2, 2]);
    }

    #[test]
    fn channel_mismatch() {
        let input = TypedFact::shape::<f32>([1, 2, 4, 4]);
        let kernel = TypedFact::shape::<f32>([8, 3, 3, 3]);
        assert!(conv(1).output_facts(&[&input, &kernel]).is_err());
    }
}
