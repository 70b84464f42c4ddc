use crate::internal::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Interpolation {
    Bilinear,
    Nearest,
}

/// Spatial resize of NCHW data to a fixed output size.
#[derive(Clone, Debug, PartialEq, Eq, Hash, new)]
pub struct Resize {
    pub interpolation: Interpolation,
    pub size: [usize; 2],
    pub align_corners: bool,
    pub half_pixel_centers: bool,
}

impl TypedOp for Resize {
    fn name(&self) -> Cow<'_, str> {
        "Resize".into()
    }

    fn info(&self) -> Vec<String> {
        vec![format!(
            "{:?} to {:?} align_corners: {} half_pixel: {}",
            self.interpolation, self.size, self.align_corners, self.half_pixel_centers
        )]
    }

    fn output_facts(&self, inputs: &[&TypedFact]) -> NnResult<TVec<TypedFact>> {
        let input = args_1!(inputs);
        ensure!(input.rank() == 4, "Resize expects 4D input, got {:?}", input.shape);
        ensure!(input.datum_type.is_float());
        ensure!(self.size.iter().all(|s| *s > 0), "Resize to empty size {:?}", self.size);
        ensure!(!(self.align_corners && self.half_pixel_centers));
        let shape = tvec!(input.shape[0], input.shape[1], self.size[0], self.size[1]);
        Ok(tvec!(TypedFact::dt_shape(input.datum_type, shape)))
    }
}
