//! Affine quantization.
//!
//! Every quantized operand enters the float domain through `wire_dequantize`
//! and leaves it through `wire_quantize`.
use crate::internal::*;
use nnhal_graph::ops::binary::BinOp;
use nnhal_graph::ops::cast::Cast;
use nnhal_graph::ops::element_wise::{Clip, UnaryOp};

#[derive(Clone, Debug, PartialEq)]
pub enum QuantParams {
    PerTensor { scale: f32, zero_point: i32 },
    /// Symmetric, one scale per slice along `axis`.
    PerChannel { scales: Vec<f32>, axis: usize },
}

impl QuantParams {
    /// Same parameters with the channel axis moved by an axis permutation.
    pub fn permuted(&self, perm: &[usize]) -> NnResult<QuantParams> {
        match self {
            QuantParams::PerTensor { .. } => Ok(self.clone()),
            QuantParams::PerChannel { scales, axis } => {
                let axis = perm
                    .iter()
                    .position(|a| a == axis)
                    .ok_or_else(|| format_err!("Axis {} not in permutation {:?}", axis, perm))?;
                Ok(QuantParams::PerChannel { scales: scales.clone(), axis })
            }
        }
    }

    /// Whether two operands hold values on the same grid.
    pub fn same_grid(&self, other: &QuantParams) -> bool {
        self == other
    }
}

pub fn quantize_value(x: f32, scale: f32, zero_point: i32, dt: DatumType) -> NnResult<i32> {
    let (min, max) = dt.integer_range().ok_or_else(|| format_err!("Can not quantize to {:?}", dt))?;
    let q = (x / scale).round_ties_even() as i64 + zero_point as i64;
    Ok(q.clamp(min, max) as i32)
}

pub fn dequantize_value(q: i32, scale: f32, zero_point: i32) -> f32 {
    (q - zero_point) as f32 * scale
}

fn scales_along(scales: &[f32], axis: usize, rank: usize) -> NnResult<Tensor> {
    ensure!(axis < rank, "Channel axis {} out of range for rank {}", axis, rank);
    let mut shape: TVec<usize> = tvec![1; rank];
    shape[axis] = scales.len();
    Tensor::from_shape(&shape, scales)
}

/// `clamp(round_half_even(x / scale) + zero_point, min, max)` cast to `dt`.
pub fn wire_quantize(
    target: &mut TypedModel,
    name: &str,
    input: OutletId,
    params: &QuantParams,
    dt: DatumType,
) -> NnResult<OutletId> {
    let fact = target.outlet_fact(input)?.clone();
    ensure!(fact.datum_type == DatumType::F32, "Quantizing non float wire {:?}", fact);
    let (min, max) = dt.integer_range().ok_or_else(|| format_err!("Can not quantize to {:?}", dt))?;
    let mut wire = match params {
        QuantParams::PerTensor { scale, zero_point } => {
            ensure!(*scale > 0.0, "Invalid quantization scale {}", scale);
            let scale = target.add_const(format!("{name}.scale"), tensor0(*scale))?;
            let wire = target.wire_node(format!("{name}.div"), BinOp::Div, &[input, scale])?[0];
            let wire = target.wire_node(format!("{name}.round"), UnaryOp::Round, &[wire])?[0];
            if *zero_point != 0 {
                let zp = target.add_const(format!("{name}.zero_point"), tensor0(*zero_point as f32))?;
                target.wire_node(format!("{name}.add_zp"), BinOp::Add, &[wire, zp])?[0]
            } else {
                wire
            }
        }
        QuantParams::PerChannel { scales, axis } => {
            ensure!(scales.iter().all(|s| *s > 0.0), "Invalid channel scales {:?}", scales);
            let scales = scales_along(scales, *axis, fact.rank())?;
            let scales = target.add_const(format!("{name}.scales"), scales)?;
            let wire = target.wire_node(format!("{name}.div"), BinOp::Div, &[input, scales])?[0];
            target.wire_node(format!("{name}.round"), UnaryOp::Round, &[wire])?[0]
        }
    };
    wire = target.wire_node(format!("{name}.clip"), Clip::new(min as f32, max as f32), &[wire])?[0];
    Ok(target.wire_node(format!("{name}.cast"), Cast::new(dt), &[wire])?[0])
}

/// `(q - zero_point) * scale` as f32.
pub fn wire_dequantize(
    target: &mut TypedModel,
    name: &str,
    input: OutletId,
    params: &QuantParams,
) -> NnResult<OutletId> {
    let fact = target.outlet_fact(input)?.clone();
    ensure!(fact.datum_type.is_integer(), "Dequantizing non integer wire {:?}", fact);
    let wire = target.wire_node(format!("{name}.cast"), Cast::new(DatumType::F32), &[input])?[0];
    match params {
        QuantParams::PerTensor { scale, zero_point } => {
            let wire = if *zero_point != 0 {
                let zp = target.add_const(format!("{name}.zero_point"), tensor0(*zero_point as f32))?;
                target.wire_node(format!("{name}.sub_zp"), BinOp::Sub, &[wire, zp])?[0]
            } else {
                wire
            };
            let scale = target.add_const(format!("{name}.scale"), tensor0(*scale))?;
            Ok(target.wire_node(format!("{name}.mul"), BinOp::Mul, &[wire, scale])?[0])
        }
        QuantParams::PerChannel { scales, axis } => {
            let scales = scales_along(scales, *axis, fact.rank())?;
            let scales = target.add_const(format!("{name}.scales"), scales)?;
            Ok(target.wire_node(format!("{name}.mul"), BinOp::Mul, &[wire, scales])?[0])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    #[test]
    fn rounds_half_to_even() {
        assert_eq!(quantize_value(0.5, 1.0, 0, DatumType::U8).unwrap(), 0);
        assert_eq!(quantize_value(1.5, 1.0, 0, DatumType::U8).unwrap(), 2);
        assert_eq!(quantize_value(2.5, 1.0, 0, DatumType::U8).unwrap(), 2);
        assert_eq!(quantize_value(-0.5, 1.0, 0, DatumType::I8).unwrap(), 0);
    }

    #[test]
    fn clamps() {
        assert_eq!(quantize_value(1000.0, 0.5, 10, DatumType::U8).unwrap(), 255);
        assert_eq!(quantize_value(-1000.0, 0.5, 10, DatumType::U8).unwrap(), 0);
        assert_eq!(quantize_value(-1000.0, 0.5, 0, DatumType::I16).unwrap(), -2000);
        assert!(quantize_value(1.0, 1.0, 0, DatumType::F32).is_err());
    }

    #[test]
    fn dequantize_subtracts_zero_point() {
        assert_abs_diff_eq!(dequantize_value(138, 0.5, 128), 5.0);
        assert_abs_diff_eq!(dequantize_value(0, 0.25, 0), 0.0);
        assert_abs_diff_eq!(dequantize_value(3, 0.1, 1), 0.2, epsilon = 1e-6);
    }

    #[test]
    fn wired_quantize_shape_and_type() {
        let mut model = TypedModel::default();
        let x = model.add_source("x", TypedFact::shape::<f32>([1, 4])).unwrap();
        let params = QuantParams::PerTensor { scale: 0.1, zero_point: 3 };
        let q = wire_quantize(&mut model, "q", x, &params, DatumType::U8).unwrap();
        assert_eq!(*model.outlet_fact(q).unwrap(), TypedFact::shape::<u8>([1, 4]));
        let d = wire_dequantize(&mut model, "d", q, &params).unwrap();
        assert_eq!(*model.outlet_fact(d).unwrap(), TypedFact::shape::<f32>([1, 4]));
    }

    #[test]
    fn wired_per_channel() {
        let mut model = TypedModel::default();
        let k = model.add_source("k", TypedFact::shape::<i8>([3, 2, 2, 1])).unwrap();
        let params = QuantParams::PerChannel { scales: vec![0.5, 0.25, 1.0], axis: 0 };
        let d = wire_dequantize(&mut model, "d", k, &params).unwrap();
        assert_eq!(model.outlet_fact(d).unwrap().shape.as_slice(), &[3, 2, 2, 1]);
        let wrong = QuantParams::PerChannel { scales: vec![0.5, 0.25, 1.0], axis: 1 };
        assert!(wire_dequantize(&mut model, "w", k, &wrong).is_err());
    }

    #[test]
    fn permuted_axis() {
        let params = QuantParams::PerChannel { scales: vec![1.0; 4], axis: 3 };
        let nchw = params.permuted(&[0, 3, 1, 2]).unwrap();
        assert_eq!(nchw, QuantParams::PerChannel { scales: vec![1.0; 4], axis: 1 });
    }

    #[derive(Debug, Clone)]
    struct Problem {
        x: f32,
        scale: f32,
        zero_point: i32,
        dt: DatumType,
    }

    impl Arbitrary for Problem {
        type Parameters = ();
        type Strategy = BoxedStrategy<Problem>;
        fn arbitrary_with(_: ()) -> Self::Strategy {
            (prop_oneof![Just(DatumType::U8), Just(DatumType::I8), Just(DatumType::U16), Just(DatumType::I16)], 1e-3f32..10f32)
                .prop_flat_map(|(dt, scale)| {
                    let (min, max) = dt.integer_range().unwrap();
                    (Just(dt), Just(scale), min as i32..=max as i32)
                })
                .prop_flat_map(|(dt, scale, zero_point)| {
                    let (min, max) = dt.integer_range().unwrap();
                    let lo = dequantize_value(min as i32, scale, zero_point);
                    let hi = dequantize_value(max as i32, scale, zero_point);
                    (lo..=hi).prop_map(move |x| Problem { x, scale, zero_point, dt })
                })
                .boxed()
        }
    }

    impl Problem {
        fn check(&self) -> NnResult<()> {
            let q = quantize_value(self.x, self.scale, self.zero_point, self.dt)?;
            let back = dequantize_value(q, self.scale, self.zero_point);
            let tolerance = self.scale / 2.0 + self.scale * 1e-3 + self.x.abs() * 1e-6;
            ensure!((back - self.x).abs() <= tolerance, "{:?} -> {} -> {}", self, q, back);
            let again = quantize_value(back, self.scale, self.zero_point, self.dt)?;
            ensure!(again == q, "quantize not idempotent on grid: {} vs {}", q, again);
            Ok(())
        }
    }

    proptest! {
        #[test]
        fn prop(pb in any::<Problem>()) {
            pb.check().unwrap()
        }
    }
}
