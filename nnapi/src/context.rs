//! What a translator sees of its operation, and the context it wires into.
use crate::framework::Nnapi;
use crate::internal::*;
use crate::layout::{Conversion, transpose};
use crate::model::Operation;
use crate::model::OperandType::*;
use crate::quant::{wire_dequantize, wire_quantize};
use crate::registry::OutputRegistry;
use nnhal_graph::ops::binary::BinOp;
use nnhal_graph::ops::cast::Cast;
use std::ops::{Deref, RangeInclusive};

pub const FLOAT: &[OperandType] = &[TensorFloat32];
pub const QUANT8: &[OperandType] = &[TensorQuant8Asymm, TensorQuant8AsymmSigned];
pub const FLOAT_OR_QUANT8: &[OperandType] =
    &[TensorFloat32, TensorQuant8Asymm, TensorQuant8AsymmSigned];
pub const NUMERIC: &[OperandType] =
    &[TensorFloat32, TensorInt32, TensorQuant8Asymm, TensorQuant8AsymmSigned];
pub const ANY_TENSOR: &[OperandType] = &[
    TensorFloat32,
    TensorInt32,
    TensorBool8,
    TensorQuant8Asymm,
    TensorQuant8AsymmSigned,
    TensorQuant8Symm,
    TensorQuant16Asymm,
    TensorQuant16Symm,
];
/// Convolution filters.
pub const FILTER: &[OperandType] =
    &[TensorFloat32, TensorQuant8Asymm, TensorQuant8AsymmSigned, TensorQuant8SymmPerChannel];

/// Read-only view on one operation of a model.
#[derive(Clone, Copy, Debug)]
pub struct OperationView<'m> {
    pub model: ModelInfo<'m>,
    pub index: usize,
    pub operation: &'m Operation,
}

impl<'m> OperationView<'m> {
    pub fn new(model: ModelInfo<'m>, index: usize) -> NnResult<OperationView<'m>> {
        let operation = model.operation(index)?;
        Ok(OperationView { model, index, operation })
    }

    pub fn kind(&self) -> OperationType {
        self.operation.kind
    }

    pub fn input_count(&self) -> usize {
        self.operation.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.operation.outputs.len()
    }

    pub fn input_index(&self, i: usize) -> NnResult<usize> {
        self.operation
            .inputs
            .get(i)
            .copied()
            .ok_or_else(|| format_err!("{} #{} has no input {}", self.kind(), self.index, i))
    }

    pub fn output_index(&self, o: usize) -> NnResult<usize> {
        self.operation
            .outputs
            .get(o)
            .copied()
            .ok_or_else(|| format_err!("{} #{} has no output {}", self.kind(), self.index, o))
    }

    pub fn input_operand(&self, i: usize) -> NnResult<&'m Operand> {
        self.model.operand(self.input_index(i)?)
    }

    pub fn output_operand(&self, o: usize) -> NnResult<&'m Operand> {
        self.model.operand(self.output_index(o)?)
    }

    pub fn input_type(&self, i: usize) -> NnResult<OperandType> {
        Ok(self.input_operand(i)?.operand_type)
    }

    pub fn output_type(&self, o: usize) -> NnResult<OperandType> {
        Ok(self.output_operand(o)?.operand_type)
    }

    pub fn input_rank(&self, i: usize) -> NnResult<usize> {
        Ok(self.input_operand(i)?.rank())
    }

    pub fn input_dims(&self, i: usize) -> NnResult<&'m [usize]> {
        Ok(&self.input_operand(i)?.dimensions)
    }

    pub fn output_dims(&self, o: usize) -> NnResult<&'m [usize]> {
        Ok(&self.output_operand(o)?.dimensions)
    }

    /// Input `i` exists and is not omitted.
    pub fn has_input(&self, i: usize) -> bool {
        self.input_index(i).map(|ix| !self.model.is_omitted(ix)).unwrap_or(false)
    }

    pub fn has_output(&self, o: usize) -> bool {
        self.output_index(o).is_ok()
    }

    pub fn is_const_input(&self, i: usize) -> bool {
        self.input_index(i).map(|ix| self.model.is_const(ix)).unwrap_or(false)
    }

    pub fn scalar_i32(&self, i: usize) -> NnResult<i32> {
        self.model.scalar_i32(self.input_index(i)?)
    }

    pub fn scalar_f32(&self, i: usize) -> NnResult<f32> {
        self.model.scalar_f32(self.input_index(i)?)
    }

    pub fn scalar_bool(&self, i: usize) -> NnResult<bool> {
        self.model.scalar_bool(self.input_index(i)?)
    }

    pub fn vec_i32(&self, i: usize) -> NnResult<Vec<i32>> {
        self.model.vec_i32(self.input_index(i)?)
    }

    pub fn vec_f32(&self, i: usize) -> NnResult<Vec<f32>> {
        self.model.vec_f32(self.input_index(i)?)
    }

    /// A non negative i32 scalar.
    pub fn scalar_usize(&self, i: usize) -> NnResult<usize> {
        let v = self.scalar_i32(i)?;
        usize::try_from(v).map_err(|_| format_err!("Input {} must be non negative, got {}", i, v))
    }

    pub fn optional_bool(&self, i: usize, default: bool) -> NnResult<bool> {
        if self.has_input(i) { self.scalar_bool(i) } else { Ok(default) }
    }

    pub fn optional_i32(&self, i: usize, default: i32) -> NnResult<i32> {
        if self.has_input(i) { self.scalar_i32(i) } else { Ok(default) }
    }

    /// Trailing layout flag: true for channel-first data.
    pub fn nchw(&self, i: usize) -> NnResult<bool> {
        self.optional_bool(i, false)
    }

    pub fn expect_inputs(&self, counts: RangeInclusive<usize>) -> NnResult<()> {
        ensure!(
            counts.contains(&self.input_count()),
            "{} expects {:?} inputs, got {}",
            self.kind(),
            counts,
            self.input_count()
        );
        Ok(())
    }

    pub fn expect_outputs(&self, counts: RangeInclusive<usize>) -> NnResult<()> {
        ensure!(
            counts.contains(&self.output_count()),
            "{} expects {:?} outputs, got {}",
            self.kind(),
            counts,
            self.output_count()
        );
        Ok(())
    }

    pub fn expect_type(&self, i: usize, allowed: &[OperandType]) -> NnResult<()> {
        let ty = self.input_type(i)?;
        ensure!(allowed.contains(&ty), "{} input {} can not be {:?}", self.kind(), i, ty);
        Ok(())
    }

    pub fn expect_output_type(&self, o: usize, allowed: &[OperandType]) -> NnResult<()> {
        let ty = self.output_type(o)?;
        ensure!(allowed.contains(&ty), "{} output {} can not be {:?}", self.kind(), o, ty);
        Ok(())
    }

    pub fn expect_same_type(&self, a: usize, b: usize) -> NnResult<()> {
        let (ta, tb) = (self.input_type(a)?, self.input_type(b)?);
        ensure!(ta == tb, "{} inputs {} and {} differ: {:?} vs {:?}", self.kind(), a, b, ta, tb);
        Ok(())
    }

    /// Output `o` has the type of input `i`, or both are float or 8 bit
    /// quantized and convert through f32.
    pub fn expect_output_like(&self, o: usize, i: usize) -> NnResult<()> {
        let (ti, to) = (self.input_type(i)?, self.output_type(o)?);
        let requantized = FLOAT_OR_QUANT8.contains(&ti) && FLOAT_OR_QUANT8.contains(&to);
        ensure!(ti == to || requantized, "{} output {} can not be {:?} for a {:?} input", self.kind(), o, to, ti);
        Ok(())
    }

    pub fn expect_rank(&self, i: usize, ranks: RangeInclusive<usize>) -> NnResult<()> {
        let rank = self.input_rank(i)?;
        ensure!(ranks.contains(&rank), "{} input {} has rank {}, expected {:?}", self.kind(), i, rank, ranks);
        Ok(())
    }

    pub fn expect_const(&self, i: usize) -> NnResult<()> {
        ensure!(self.is_const_input(i), "{} input {} must be a constant", self.kind(), i);
        Ok(())
    }

    /// Checks an optional trailing layout flag, and the rank of the data
    /// input it applies to.
    pub fn expect_layout(&self, flag: usize, data: usize) -> NnResult<()> {
        if self.has_input(flag) {
            self.expect_type(flag, &[Bool])?;
            self.expect_const(flag)?;
        }
        self.expect_rank(data, 4..=4)
    }

    /// Per-channel quantized input must declare its channel on `axis`.
    pub fn expect_channel_axis(&self, i: usize, axis: usize) -> NnResult<()> {
        if let Some(QuantParams::PerChannel { scales, axis: declared }) = self.input_operand(i)?.quant_params()
        {
            ensure!(declared == axis, "{} input {} quantized on axis {}, expected {}", self.kind(), i, declared, axis);
            let dim = self.input_dims(i)?.get(axis).copied().unwrap_or(0);
            ensure!(scales.len() == dim, "{} input {} has {} scales for {} channels", self.kind(), i, scales.len(), dim);
        }
        Ok(())
    }
}

/// A node computed for an output operand. Channel-first nodes are
/// transposed back to the declared layout when registered, unless the
/// forced layout optimization keeps them as is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Produced {
    pub operand: usize,
    pub outlet: OutletId,
    pub channel_first: bool,
}

impl Produced {
    pub fn new(operand: usize, outlet: OutletId) -> Produced {
        Produced { operand, outlet, channel_first: false }
    }

    pub fn channel_first(operand: usize, outlet: OutletId) -> Produced {
        Produced { operand, outlet, channel_first: true }
    }
}

/// Everything a translator needs to wire one operation.
pub struct BuildContext<'a, 'm> {
    pub op: OperationView<'m>,
    pub registry: &'a mut OutputRegistry,
    pub config: &'a Nnapi,
    pub prefix: String,
}

impl<'m> Deref for BuildContext<'_, 'm> {
    type Target = OperationView<'m>;
    fn deref(&self) -> &OperationView<'m> {
        &self.op
    }
}

impl<'a, 'm> BuildContext<'a, 'm> {
    pub fn new(op: OperationView<'m>, registry: &'a mut OutputRegistry, config: &'a Nnapi) -> BuildContext<'a, 'm> {
        let prefix = format!("{}-{}", op.index, op.kind());
        BuildContext { op, registry, config, prefix }
    }

    pub fn name(&self, suffix: &str) -> String {
        format!("{}.{}", self.prefix, suffix)
    }

    pub fn target(&mut self) -> &mut TypedModel {
        self.registry.target_mut()
    }

    pub fn wire(
        &mut self,
        suffix: &str,
        op: impl Into<Box<dyn TypedOp>>,
        inputs: &[OutletId],
    ) -> NnResult<TVec<OutletId>> {
        let name = self.name(suffix);
        self.registry.target_mut().wire_node(name, op, inputs)
    }

    pub fn wire1(&mut self, suffix: &str, op: impl Into<Box<dyn TypedOp>>, inputs: &[OutletId]) -> NnResult<OutletId> {
        Ok(self.wire(suffix, op, inputs)?[0])
    }

    pub fn konst(&mut self, suffix: &str, v: impl Into<Arc<Tensor>>) -> NnResult<OutletId> {
        let name = self.name(suffix);
        self.registry.target_mut().add_const(name, v)
    }

    pub fn fact(&self, outlet: OutletId) -> NnResult<TypedFact> {
        Ok(self.registry.target().outlet_fact(outlet)?.clone())
    }

    pub fn shape(&self, outlet: OutletId) -> NnResult<TVec<usize>> {
        Ok(self.registry.target().outlet_fact(outlet)?.shape.clone())
    }

    pub fn transpose(&mut self, suffix: &str, conversion: Conversion, input: OutletId) -> NnResult<OutletId> {
        let name = self.name(suffix);
        transpose(self.registry.target_mut(), name, conversion, input)
    }

    fn materialize(&mut self, operand: usize) -> NnResult<()> {
        if !self.registry.has_output(operand) && self.model.is_const(operand) {
            let tensor = self.model.const_tensor(operand)?;
            let outlet = self.registry.target_mut().add_const(format!("operand.{operand}"), tensor)?;
            self.registry.set_output(operand, outlet);
        }
        Ok(())
    }

    /// Node for input `i` as declared: raw values, declared layout.
    pub fn input(&mut self, i: usize) -> NnResult<OutletId> {
        let operand = self.input_index(i)?;
        self.materialize(operand)?;
        self.registry.get_output(operand)
    }

    /// Maps a quantized wire of input `i` to f32. `perm` is the axis
    /// permutation applied to the wire since it left the operand.
    pub fn dequantize(&mut self, i: usize, outlet: OutletId, perm: Option<&[usize]>) -> NnResult<OutletId> {
        let Some(params) = self.input_operand(i)?.quant_params() else { return Ok(outlet) };
        let params = match perm {
            Some(perm) => params.permuted(perm)?,
            None => params,
        };
        let name = self.name(&format!("in{i}.dequant"));
        wire_dequantize(self.registry.target_mut(), &name, outlet, &params)
    }

    pub fn input_f32(&mut self, i: usize) -> NnResult<OutletId> {
        let raw = self.input(i)?;
        self.dequantize(i, raw, None)
    }

    /// Raw values of input `i`, channel-first. A value already held
    /// channel-first by the registry is reused.
    pub fn input_nchw(&mut self, i: usize, nchw: bool) -> NnResult<OutletId> {
        if nchw {
            return self.input(i);
        }
        let operand = self.input_index(i)?;
        self.materialize(operand)?;
        if self.config.forced_layout {
            let (outlet, forced) = self.registry.get_registered_output(operand)?;
            if forced {
                return Ok(outlet);
            }
        }
        let raw = self.registry.get_output(operand)?;
        self.transpose(&format!("in{i}.to_nchw"), Conversion::NhwcToNchw, raw)
    }

    pub fn input_channel_first(&mut self, i: usize, nchw: bool) -> NnResult<OutletId> {
        let raw = self.input_nchw(i, nchw)?;
        if nchw {
            self.dequantize(i, raw, None)
        } else {
            self.dequantize(i, raw, Some(Conversion::NhwcToNchw.permutation().as_slice()))
        }
    }

    /// Input `i` converted to another layout, then mapped to f32.
    pub fn input_permuted_f32(&mut self, i: usize, conversion: Conversion) -> NnResult<OutletId> {
        let raw = self.input(i)?;
        let permuted = self.transpose(&format!("in{i}.{conversion:?}"), conversion, raw)?;
        self.dequantize(i, permuted, Some(conversion.permutation().as_slice()))
    }

    /// Whether raw values of input `i` are valid values for output `o`.
    pub fn is_passthrough(&self, i: usize, o: usize) -> NnResult<bool> {
        let (input, output) = (self.input_operand(i)?, self.output_operand(o)?);
        Ok(match (input.quant_params(), output.quant_params()) {
            (Some(a), Some(b)) => input.operand_type == output.operand_type && a.same_grid(&b),
            (None, None) => true,
            _ => false,
        })
    }

    /// Raw input when it can flow to output `o` untouched, f32 otherwise.
    pub fn input_for_output(&mut self, i: usize, o: usize) -> NnResult<OutletId> {
        if self.is_passthrough(i, o)? { self.input(i) } else { self.input_f32(i) }
    }

    pub fn input_nchw_for_output(&mut self, i: usize, o: usize, nchw: bool) -> NnResult<OutletId> {
        if self.is_passthrough(i, o)? { self.input_nchw(i, nchw) } else { self.input_channel_first(i, nchw) }
    }

    /// Bias in f32. An i32 bias of a quantized operation is scaled by
    /// `input_scale * filter_scale`, per channel if need be.
    pub fn input_bias_f32(&mut self, bias: usize, input: usize, filter: usize) -> NnResult<OutletId> {
        let raw = self.input(bias)?;
        let quantized_input = self.input_operand(input)?.quant_params();
        if self.input_type(bias)? != TensorInt32 || quantized_input.is_none() {
            return self.dequantize(bias, raw, None);
        }
        let input_scale = match quantized_input {
            Some(QuantParams::PerTensor { scale, .. }) => scale,
            _ => bail!("Input {} of {} must be quantized per tensor", input, self.kind()),
        };
        let scales: Tensor = match self.input_operand(filter)?.quant_params() {
            Some(QuantParams::PerTensor { scale, .. }) => tensor0(input_scale * scale),
            Some(QuantParams::PerChannel { scales, .. }) => {
                tensor1(&scales.iter().map(|s| s * input_scale).collect::<Vec<_>>())
            }
            None => bail!("Quantized {} with float filter", self.kind()),
        };
        let wire = self.wire1(&format!("in{bias}.cast"), Cast::new(DatumType::F32), &[raw])?;
        let scales = self.konst(&format!("in{bias}.scales"), scales)?;
        self.wire1(&format!("in{bias}.dequant"), BinOp::Mul, &[wire, scales])
    }

    pub fn output(&self, o: usize, outlet: OutletId) -> NnResult<Produced> {
        Ok(Produced::new(self.output_index(o)?, outlet))
    }

    /// Output computed channel-first. `nchw` is the declared layout.
    pub fn output_nchw(&self, o: usize, outlet: OutletId, nchw: bool) -> NnResult<Produced> {
        let operand = self.output_index(o)?;
        Ok(if nchw { Produced::new(operand, outlet) } else { Produced::channel_first(operand, outlet) })
    }

    /// Registers produced nodes: layout restoration, quantization to the
    /// declared type, shape check, result marking.
    pub fn register_outputs(&mut self, produced: &[Produced]) -> NnResult<()> {
        for p in produced {
            let operand = self.model.operand(p.operand)?;
            let terminal = self.model.is_terminal(p.operand);
            let forced = p.channel_first && self.config.forced_layout && !terminal;
            let mut outlet = p.outlet;
            if p.channel_first && !forced {
                outlet = self.transpose(&format!("out{}.to_nhwc", p.operand), Conversion::NchwToNhwc, outlet)?;
            }
            if let Some(params) = operand.quant_params() {
                if self.fact(outlet)?.datum_type == DatumType::F32 {
                    let params =
                        if forced { params.permuted(&Conversion::NhwcToNchw.permutation())? } else { params };
                    let name = self.name(&format!("out{}.quant", p.operand));
                    outlet = wire_quantize(self.registry.target_mut(), &name, outlet, &params, operand.datum_type())?;
                }
            }
            let fact = self.fact(outlet)?;
            ensure!(
                fact.datum_type == operand.datum_type(),
                "Operand #{} is declared {:?}, computed {:?}",
                p.operand,
                operand.operand_type,
                fact.datum_type
            );
            if self.config.check_output_shapes && operand.has_known_shape() {
                let expected: TVec<usize> = if forced {
                    Conversion::NhwcToNchw.permute_shape(&operand.dimensions)?
                } else {
                    operand.dimensions.iter().copied().collect()
                };
                ensure!(
                    fact.shape == expected,
                    "Operand #{} is declared with shape {:?}, computed {:?}",
                    p.operand,
                    operand.dimensions,
                    fact.shape
                );
            }
            trace!("Operand #{} <- {:?}{}", p.operand, outlet, if forced { " (channel first)" } else { "" });
            self.registry.set_output(p.operand, outlet);
            self.registry.set_forced_layout(p.operand, forced);
            if terminal {
                self.registry.add_result(p.operand, outlet);
            }
        }
        Ok(())
    }
}
