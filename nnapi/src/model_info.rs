//! Read accessors over a `Model`.
use crate::internal::*;
use crate::model::{DataLocation, Model, Operand, OperandLifeTime, OperandType, Operation};
use byteorder::{ByteOrder, LittleEndian};

#[derive(Clone, Copy, Debug)]
pub struct ModelInfo<'m> {
    model: &'m Model,
}

impl<'m> ModelInfo<'m> {
    pub fn new(model: &'m Model) -> ModelInfo<'m> {
        ModelInfo { model }
    }

    pub fn model(&self) -> &'m Model {
        self.model
    }

    pub fn operand(&self, ix: usize) -> NnResult<&'m Operand> {
        self.model.operands.get(ix).ok_or_else(|| format_err!("No operand #{}", ix))
    }

    pub fn operation(&self, ix: usize) -> NnResult<&'m Operation> {
        self.model.operations.get(ix).ok_or_else(|| format_err!("No operation #{}", ix))
    }

    pub fn operations(&self) -> &'m [Operation] {
        &self.model.operations
    }

    pub fn input_indexes(&self) -> &'m [usize] {
        &self.model.input_indexes
    }

    pub fn output_indexes(&self) -> &'m [usize] {
        &self.model.output_indexes
    }

    pub fn is_const(&self, ix: usize) -> bool {
        self.operand(ix).map(|o| o.lifetime.is_constant()).unwrap_or(false)
    }

    pub fn is_terminal(&self, ix: usize) -> bool {
        self.operand(ix).map(|o| o.lifetime.is_terminal()).unwrap_or(false)
    }

    /// An optional operand left out: no value, no shape for a tensor, or a
    /// zero leading dimension.
    pub fn is_omitted(&self, ix: usize) -> bool {
        let Ok(operand) = self.operand(ix) else { return true };
        operand.lifetime == OperandLifeTime::NoValue
            || (!operand.operand_type.is_scalar()
                && (operand.dimensions.is_empty() || operand.dimensions[0] == 0))
    }

    pub fn operand_bytes(&self, ix: usize) -> NnResult<&'m [u8]> {
        let operand = self.operand(ix)?;
        let (buffer, offset, length) = match operand.location {
            DataLocation::Embedded { offset, length } => (&self.model.operand_values, offset, length),
            DataLocation::Pool { pool, offset, length } => (
                self.model.pools.get(pool).ok_or_else(|| format_err!("No pool #{}", pool))?,
                offset,
                length,
            ),
            DataLocation::None => bail!("Operand #{} has no constant value", ix),
        };
        ensure!(offset + length <= buffer.len(), "Operand #{} value out of bounds", ix);
        Ok(&buffer[offset..][..length])
    }

    /// Decode a constant operand into a tensor of its graph datum type.
    pub fn const_tensor(&self, ix: usize) -> NnResult<Tensor> {
        let operand = self.operand(ix)?;
        ensure!(operand.lifetime.is_constant(), "Operand #{} is not a constant", ix);
        let bytes = self.operand_bytes(ix)?;
        let dt = operand.datum_type();
        let shape: TVec<usize> = operand.dimensions.iter().copied().collect();
        let len = shape.iter().product::<usize>();
        ensure!(
            bytes.len() == len * dt.size_of(),
            "Operand #{} holds {} bytes, expected {} for {:?} {:?}",
            ix,
            bytes.len(),
            len * dt.size_of(),
            operand.operand_type,
            shape
        );
        match operand.operand_type {
            OperandType::Float32 | OperandType::TensorFloat32 => {
                let mut v = vec![0f32; len];
                LittleEndian::read_f32_into(bytes, &mut v);
                Tensor::from_shape(&shape, &v)
            }
            OperandType::Int32 | OperandType::TensorInt32 => {
                let mut v = vec![0i32; len];
                LittleEndian::read_i32_into(bytes, &mut v);
                Tensor::from_shape(&shape, &v)
            }
            OperandType::UInt32 => {
                let mut v = vec![0u32; len];
                LittleEndian::read_u32_into(bytes, &mut v);
                let v = v.into_iter().map(|x| i32::try_from(x)).collect::<Result<Vec<_>, _>>()?;
                Tensor::from_shape(&shape, &v)
            }
            OperandType::Bool | OperandType::TensorBool8 => {
                Tensor::from_shape(&shape, &bytes.iter().map(|b| *b != 0).collect::<Vec<_>>())
            }
            OperandType::TensorQuant8Asymm => Tensor::from_shape(&shape, bytes),
            OperandType::TensorQuant8Symm
            | OperandType::TensorQuant8SymmPerChannel
            | OperandType::TensorQuant8AsymmSigned => {
                Tensor::from_shape(&shape, &bytes.iter().map(|b| *b as i8).collect::<Vec<_>>())
            }
            OperandType::TensorQuant16Asymm => {
                let mut v = vec![0u16; len];
                LittleEndian::read_u16_into(bytes, &mut v);
                Tensor::from_shape(&shape, &v)
            }
            OperandType::TensorQuant16Symm => {
                let mut v = vec![0i16; len];
                LittleEndian::read_i16_into(bytes, &mut v);
                Tensor::from_shape(&shape, &v)
            }
        }
    }

    pub fn scalar_i32(&self, ix: usize) -> NnResult<i32> {
        self.const_tensor(ix)?.to_scalar::<i32>()
    }

    pub fn scalar_f32(&self, ix: usize) -> NnResult<f32> {
        self.const_tensor(ix)?.to_scalar::<f32>()
    }

    pub fn scalar_bool(&self, ix: usize) -> NnResult<bool> {
        self.const_tensor(ix)?.to_scalar::<bool>()
    }

    pub fn vec_i32(&self, ix: usize) -> NnResult<Vec<i32>> {
        Ok(self.const_tensor(ix)?.as_slice::<i32>()?.to_vec())
    }

    pub fn vec_f32(&self, ix: usize) -> NnResult<Vec<f32>> {
        Ok(self.const_tensor(ix)?.as_slice::<f32>()?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SymmPerChannelQuantParams;

    #[test]
    fn typed_constants() {
        let mut model = Model::default();
        let a = model.add_scalar_i32(-3);
        let b = model.add_scalar_f32(0.5);
        let c = model.add_scalar_bool(true);
        let d = model.add_tensor_i32(&[3], &[1, 2, 3]).unwrap();
        let info = ModelInfo::new(&model);
        assert_eq!(info.scalar_i32(a).unwrap(), -3);
        assert_eq!(info.scalar_f32(b).unwrap(), 0.5);
        assert!(info.scalar_bool(c).unwrap());
        assert_eq!(info.vec_i32(d).unwrap(), vec![1, 2, 3]);
        assert!(info.scalar_i32(b).is_err());
    }

    #[test]
    fn pool_constants() {
        let mut model = Model::default();
        let pool = model.add_pool(vec![0, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0]);
        let ix = model.add_operand(OperandType::TensorInt32, &[2]);
        model.set_operand_value_from_pool(ix, pool, 4, 8).unwrap();
        assert_eq!(ModelInfo::new(&model).vec_i32(ix).unwrap(), vec![1, 2]);
    }

    #[test]
    fn per_channel_constant() {
        let mut model = Model::default();
        let ix = model
            .add_tensor_quant8(OperandType::TensorQuant8SymmPerChannel, &[2, 1], 0.0, 0, &[0xff, 2])
            .unwrap();
        model
            .set_operand_symm_per_channel_quant_params(ix, SymmPerChannelQuantParams::new(vec![0.5, 0.25], 0))
            .unwrap();
        let t = ModelInfo::new(&model).const_tensor(ix).unwrap();
        assert_eq!(t.as_slice::<i8>().unwrap(), &[-1, 2]);
    }

    #[test]
    fn omitted() {
        let mut model = Model::default();
        let a = model.add_omitted(OperandType::TensorFloat32);
        let b = model.add_operand(OperandType::TensorFloat32, &[0, 3]);
        let c = model.add_operand(OperandType::TensorFloat32, &[2, 3]);
        let s = model.add_scalar_f32(1.0);
        let info = ModelInfo::new(&model);
        assert!(info.is_omitted(a));
        assert!(info.is_omitted(b));
        assert!(!info.is_omitted(c));
        assert!(!info.is_omitted(s));
    }

    #[test]
    fn size_mismatch() {
        let mut model = Model::default();
        let ix = model.add_operand(OperandType::TensorFloat32, &[3]);
        model.set_operand_value(ix, &[0; 8]).unwrap();
        assert!(ModelInfo::new(&model).const_tensor(ix).is_err());
    }
}
