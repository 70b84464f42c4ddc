//! Model description: operand table, operation list and constant storage.
//!
//! This mirrors the NNAPI model-building interface. Operands are created
//! first, optionally given constant values, then referenced by operations.
use crate::internal::*;
use byteorder::{ByteOrder, LittleEndian};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperandType {
    Float32,
    Int32,
    UInt32,
    TensorFloat32,
    TensorInt32,
    TensorQuant8Asymm,
    Bool,
    TensorQuant16Symm,
    TensorBool8,
    TensorQuant8SymmPerChannel,
    TensorQuant16Asymm,
    TensorQuant8Symm,
    TensorQuant8AsymmSigned,
}

impl OperandType {
    pub fn from_code(code: i32) -> Option<OperandType> {
        use OperandType::*;
        Some(match code {
            0 => Float32,
            1 => Int32,
            2 => UInt32,
            3 => TensorFloat32,
            4 => TensorInt32,
            5 => TensorQuant8Asymm,
            6 => Bool,
            7 => TensorQuant16Symm,
            9 => TensorBool8,
            11 => TensorQuant8SymmPerChannel,
            12 => TensorQuant16Asymm,
            13 => TensorQuant8Symm,
            14 => TensorQuant8AsymmSigned,
            _ => return None,
        })
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, OperandType::Float32 | OperandType::Int32 | OperandType::UInt32 | OperandType::Bool)
    }

    pub fn is_quantized(&self) -> bool {
        use OperandType::*;
        matches!(
            self,
            TensorQuant8Asymm
                | TensorQuant16Symm
                | TensorQuant8SymmPerChannel
                | TensorQuant16Asymm
                | TensorQuant8Symm
                | TensorQuant8AsymmSigned
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(self, OperandType::Float32 | OperandType::TensorFloat32)
    }

    /// Datum type of the values as they flow in the graph.
    pub fn datum_type(&self) -> DatumType {
        use OperandType::*;
        match self {
            Float32 | TensorFloat32 => DatumType::F32,
            Int32 | UInt32 | TensorInt32 => DatumType::I32,
            Bool | TensorBool8 => DatumType::Bool,
            TensorQuant8Asymm => DatumType::U8,
            TensorQuant8Symm | TensorQuant8SymmPerChannel | TensorQuant8AsymmSigned => DatumType::I8,
            TensorQuant16Asymm => DatumType::U16,
            TensorQuant16Symm => DatumType::I16,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperandLifeTime {
    TemporaryVariable,
    ModelInput,
    ModelOutput,
    /// Value embedded in the model `operand_values` blob.
    ConstantCopy,
    /// Value living in one of the model memory pools.
    ConstantReference,
    /// Omitted optional input.
    NoValue,
    SubgraphOutput,
}

impl OperandLifeTime {
    pub fn is_constant(&self) -> bool {
        matches!(self, OperandLifeTime::ConstantCopy | OperandLifeTime::ConstantReference)
    }

    /// Values that end up as graph results.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OperandLifeTime::ModelOutput | OperandLifeTime::SubgraphOutput)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DataLocation {
    #[default]
    None,
    Embedded {
        offset: usize,
        length: usize,
    },
    Pool {
        pool: usize,
        offset: usize,
        length: usize,
    },
}

#[derive(Clone, Debug, PartialEq, new)]
pub struct SymmPerChannelQuantParams {
    pub scales: Vec<f32>,
    pub channel_dim: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Operand {
    pub operand_type: OperandType,
    pub dimensions: Vec<usize>,
    pub scale: f32,
    pub zero_point: i32,
    pub lifetime: OperandLifeTime,
    pub location: DataLocation,
    pub channel_quant: Option<SymmPerChannelQuantParams>,
}

impl Operand {
    pub fn new(operand_type: OperandType, dimensions: &[usize]) -> Operand {
        Operand {
            operand_type,
            dimensions: dimensions.to_vec(),
            scale: 0.0,
            zero_point: 0,
            lifetime: OperandLifeTime::TemporaryVariable,
            location: DataLocation::None,
            channel_quant: None,
        }
    }

    pub fn rank(&self) -> usize {
        self.dimensions.len()
    }

    pub fn datum_type(&self) -> DatumType {
        self.operand_type.datum_type()
    }

    /// Shape is declared and has no unknown (zero) dimension.
    pub fn has_known_shape(&self) -> bool {
        !self.dimensions.is_empty() && self.dimensions.iter().all(|d| *d > 0)
    }

    pub fn quant_params(&self) -> Option<QuantParams> {
        if !self.operand_type.is_quantized() {
            return None;
        }
        if let Some(q) = &self.channel_quant {
            Some(QuantParams::PerChannel { scales: q.scales.clone(), axis: q.channel_dim })
        } else {
            Some(QuantParams::PerTensor { scale: self.scale, zero_point: self.zero_point })
        }
    }
}

#[derive(Clone, Debug, PartialEq, new)]
pub struct Operation {
    pub kind: OperationType,
    pub inputs: Vec<usize>,
    pub outputs: Vec<usize>,
}

#[derive(Clone, Debug, Default)]
pub struct Model {
    pub operands: Vec<Operand>,
    pub operations: Vec<Operation>,
    pub input_indexes: Vec<usize>,
    pub output_indexes: Vec<usize>,
    pub operand_values: Vec<u8>,
    pub pools: Vec<Vec<u8>>,
}

impl Model {
    pub fn add_operand(&mut self, operand_type: OperandType, dimensions: &[usize]) -> usize {
        self.operands.push(Operand::new(operand_type, dimensions));
        self.operands.len() - 1
    }

    pub fn add_quantized_operand(
        &mut self,
        operand_type: OperandType,
        dimensions: &[usize],
        scale: f32,
        zero_point: i32,
    ) -> usize {
        let ix = self.add_operand(operand_type, dimensions);
        self.operands[ix].scale = scale;
        self.operands[ix].zero_point = zero_point;
        ix
    }

    fn operand_mut(&mut self, ix: usize) -> NnResult<&mut Operand> {
        self.operands.get_mut(ix).ok_or_else(|| format_err!("No operand #{}", ix))
    }

    pub fn set_operand_symm_per_channel_quant_params(
        &mut self,
        ix: usize,
        params: SymmPerChannelQuantParams,
    ) -> NnResult<()> {
        let operand = self.operand_mut(ix)?;
        ensure!(operand.operand_type == OperandType::TensorQuant8SymmPerChannel);
        operand.channel_quant = Some(params);
        Ok(())
    }

    /// Copies `bytes` into the model. An empty value marks the operand as
    /// omitted.
    pub fn set_operand_value(&mut self, ix: usize, bytes: &[u8]) -> NnResult<()> {
        let offset = self.operand_values.len();
        let operand = self.operand_mut(ix)?;
        if bytes.is_empty() {
            operand.lifetime = OperandLifeTime::NoValue;
            operand.location = DataLocation::None;
            return Ok(());
        }
        operand.lifetime = OperandLifeTime::ConstantCopy;
        operand.location = DataLocation::Embedded { offset, length: bytes.len() };
        self.operand_values.extend_from_slice(bytes);
        Ok(())
    }

    pub fn add_pool(&mut self, bytes: Vec<u8>) -> usize {
        self.pools.push(bytes);
        self.pools.len() - 1
    }

    pub fn set_operand_value_from_pool(
        &mut self,
        ix: usize,
        pool: usize,
        offset: usize,
        length: usize,
    ) -> NnResult<()> {
        let size = self.pools.get(pool).map(|p| p.len()).ok_or_else(|| format_err!("No pool #{}", pool))?;
        ensure!(offset + length <= size, "Pool #{} is too small for {}+{}", pool, offset, length);
        let operand = self.operand_mut(ix)?;
        operand.lifetime = OperandLifeTime::ConstantReference;
        operand.location = DataLocation::Pool { pool, offset, length };
        Ok(())
    }

    pub fn add_operation(
        &mut self,
        kind: OperationType,
        inputs: &[usize],
        outputs: &[usize],
    ) -> NnResult<usize> {
        for ix in inputs.iter().chain(outputs.iter()) {
            ensure!(*ix < self.operands.len(), "{} references unknown operand #{}", kind, ix);
        }
        self.operations.push(Operation::new(kind, inputs.to_vec(), outputs.to_vec()));
        Ok(self.operations.len() - 1)
    }

    pub fn identify_inputs_and_outputs(&mut self, inputs: &[usize], outputs: &[usize]) -> NnResult<()> {
        for &ix in inputs {
            self.operand_mut(ix)?.lifetime = OperandLifeTime::ModelInput;
        }
        for &ix in outputs {
            self.operand_mut(ix)?.lifetime = OperandLifeTime::ModelOutput;
        }
        self.input_indexes = inputs.to_vec();
        self.output_indexes = outputs.to_vec();
        Ok(())
    }

    pub fn add_scalar_i32(&mut self, value: i32) -> usize {
        let ix = self.add_operand(OperandType::Int32, &[]);
        self.embed(ix, &value.to_le_bytes());
        ix
    }

    pub fn add_scalar_f32(&mut self, value: f32) -> usize {
        let ix = self.add_operand(OperandType::Float32, &[]);
        self.embed(ix, &value.to_le_bytes());
        ix
    }

    pub fn add_scalar_bool(&mut self, value: bool) -> usize {
        let ix = self.add_operand(OperandType::Bool, &[]);
        self.embed(ix, &[value as u8]);
        ix
    }

    pub fn add_tensor_f32(&mut self, dimensions: &[usize], values: &[f32]) -> NnResult<usize> {
        ensure!(dimensions.iter().product::<usize>() == values.len());
        let ix = self.add_operand(OperandType::TensorFloat32, dimensions);
        let mut bytes = vec![0u8; values.len() * 4];
        LittleEndian::write_f32_into(values, &mut bytes);
        self.embed(ix, &bytes);
        Ok(ix)
    }

    pub fn add_tensor_i32(&mut self, dimensions: &[usize], values: &[i32]) -> NnResult<usize> {
        ensure!(dimensions.iter().product::<usize>() == values.len());
        let ix = self.add_operand(OperandType::TensorInt32, dimensions);
        let mut bytes = vec![0u8; values.len() * 4];
        LittleEndian::write_i32_into(values, &mut bytes);
        self.embed(ix, &bytes);
        Ok(ix)
    }

    /// Constant quantized tensor, values given already quantized.
    pub fn add_tensor_quant8(
        &mut self,
        operand_type: OperandType,
        dimensions: &[usize],
        scale: f32,
        zero_point: i32,
        values: &[u8],
    ) -> NnResult<usize> {
        ensure!(dimensions.iter().product::<usize>() == values.len());
        ensure!(operand_type.is_quantized() && operand_type.datum_type().size_of() == 1);
        let ix = self.add_quantized_operand(operand_type, dimensions, scale, zero_point);
        self.embed(ix, values);
        Ok(ix)
    }

    /// An omitted optional operand.
    pub fn add_omitted(&mut self, operand_type: OperandType) -> usize {
        let ix = self.add_operand(operand_type, &[]);
        self.operands[ix].lifetime = OperandLifeTime::NoValue;
        ix
    }

    fn embed(&mut self, ix: usize, bytes: &[u8]) {
        let offset = self.operand_values.len();
        self.operand_values.extend_from_slice(bytes);
        self.operands[ix].lifetime = OperandLifeTime::ConstantCopy;
        self.operands[ix].location = DataLocation::Embedded { offset, length: bytes.len() };
    }
}
