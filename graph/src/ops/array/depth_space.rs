use crate::internal::*;

/// Moves depth blocks into spatial blocks. NCHW, DCR ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, new)]
pub struct DepthToSpace {
    pub block: usize,
}

impl TypedOp for DepthToSpace {
    fn name(&self) -> Cow<'_, str> {
        "DepthToSpace".into()
    }

    fn output_facts(&self, inputs: &[&TypedFact]) -> NnResult<TVec<TypedFact>> {
        let input = args_1!(inputs);
        ensure!(input.rank() == 4 && self.block > 0);
        let b2 = self.block * self.block;
        ensure!(input.shape[1] % b2 == 0, "Depth {} not divisible by {}", input.shape[1], b2);
        let s = &input.shape;
        let shape = tvec!(s[0], s[1] / b2, s[2] * self.block, s[3] * self.block);
        Ok(tvec!(TypedFact::dt_shape(input.datum_type, shape)))
    }
}

/// Moves spatial blocks into depth. NCHW.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, new)]
pub struct SpaceToDepth {
    pub block: usize,
}

impl TypedOp for SpaceToDepth {
    fn name(&self) -> Cow<'_, str> {
        "SpaceToDepth".into()
    }

    fn output_facts(&self, inputs: &[&TypedFact]) -> NnResult<TVec<TypedFact>> {
        let input = args_1!(inputs);
        ensure!(input.rank() == 4 && self.block > 0);
        let s = &input.shape;
        ensure!(
            s[2] % self.block == 0 && s[3] % self.block == 0,
            "Spatial dims {:?} not divisible by {}",
            &s[2..],
            self.block
        );
        let shape = tvec!(s[0], s[1] * self.block * self.block, s[2] / self.block, s[3] / self.block);
        Ok(tvec!(TypedFact::dt_shape(input.datum_type, shape)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_shapes() {
        let input = TypedFact::shape::<f32>([1, 8, 3, 3]);
        let d2s = DepthToSpace::new(2).output_facts(&[&input]).unwrap();
        assert_eq!(d2s[0].shape.as_slice(), &[1, 2, 6, 6]);
        let s2d = SpaceToDepth::new(2).output_facts(&[&d2s[0]]).unwrap();
        assert_eq!(s2d[0].shape, input.shape);
    }
}
