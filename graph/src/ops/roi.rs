use crate::internal::*;

fn roi_facts(inputs: &[&TypedFact], output: [usize; 2]) -> NnResult<TVec<TypedFact>> {
    let (features, rois, batches) = args_3!(inputs);
    ensure!(features.rank() == 4 && features.datum_type.is_float());
    ensure!(rois.rank() == 2 && rois.shape[1] == 4, "Rois must be [R, 4], got {:?}", rois.shape);
    ensure!(batches.datum_type == DatumType::I32 && batches.shape.as_slice() == [rois.shape[0]]);
    ensure!(output.iter().all(|o| *o > 0));
    let shape = tvec!(rois.shape[0], features.shape[1], output[0], output[1]);
    Ok(tvec!(TypedFact::dt_shape(features.datum_type, shape)))
}

/// Bilinear region-of-interest pooling over NCHW features.
///
/// Inputs: features, boxes `[R, 4]` as (x1, y1, x2, y2), batch indices `[R]`.
#[derive(Clone, Debug, PartialEq, new)]
pub struct RoiAlign {
    pub output: [usize; 2],
    pub spatial_scale: [f32; 2],
    pub sampling_ratio: [usize; 2],
}

impl TypedOp for RoiAlign {
    fn name(&self) -> Cow<'_, str> {
        "RoiAlign".into()
    }

    fn info(&self) -> Vec<String> {
        vec![format!(
            "output: {:?} scale: {:?} sampling: {:?}",
            self.output, self.spatial_scale, self.sampling_ratio
        )]
    }

    fn output_facts(&self, inputs: &[&TypedFact]) -> NnResult<TVec<TypedFact>> {
        ensure!(self.spatial_scale.iter().all(|s| *s > 0.0));
        roi_facts(inputs, self.output)
    }
}

/// Max region-of-interest pooling over NCHW features.
#[derive(Clone, Debug, PartialEq, new)]
pub struct RoiPool {
    pub output: [usize; 2],
    pub spatial_scale: [f32; 2],
}

impl TypedOp for RoiPool {
    fn name(&self) -> Cow<'_, str> {
        "RoiPool".into()
    }

    fn info(&self) -> Vec<String> {
        vec![format!("output: {:?} scale: {:?}", self.output, self.spatial_scale)]
    }

    fn output_facts(&self, inputs: &[&TypedFact]) -> NnResult<TVec<TypedFact>> {
        ensure!(self.spatial_scale.iter().all(|s| *s > 0.0));
        roi_facts(inputs, self.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pooled_shape() {
        let features = TypedFact::shape::<f32>([2, 16, 10, 10]);
        let rois = TypedFact::shape::<f32>([5, 4]);
        let batches = TypedFact::shape::<i32>([5]);
        let op = RoiAlign::new([2, 3], [1.0, 1.0], [0, 0]);
        let facts = op.output_facts(&[&features, &rois, &batches]).unwrap();
        assert_eq!(facts[0].shape.as_slice(), &[5, 16, 2, 3]);
        let bad = TypedFact::shape::<i32>([4]);
        assert!(op.output_facts(&[&features, &rois, &bad]).is_err());
    }
}
