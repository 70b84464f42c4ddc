use crate::internal::*;

/// Pads then moves spatial blocks into the batch axis. NCHW.
#[derive(Clone, Debug, PartialEq, Eq, Hash, new)]
pub struct SpaceToBatch {
    pub block: [usize; 2],
    pub pads: [(usize, usize); 2],
}

impl TypedOp for SpaceToBatch {
    fn name(&self) -> Cow<'_, str> {
        "SpaceToBatch".into()
    }

    fn info(&self) -> Vec<String> {
        vec![format!("block: {:?} pads: {:?}", self.block, self.pads)]
    }

    fn output_facts(&self, inputs: &[&TypedFact]) -> NnResult<TVec<TypedFact>> {
        let input = args_1!(inputs);
        ensure!(input.rank() == 4 && self.block.iter().all(|b| *b > 0));
        let mut shape = tvec!(input.shape[0] * self.block[0] * self.block[1], input.shape[1]);
        for ax in 0..2 {
            let padded = input.shape[2 + ax] + self.pads[ax].0 + self.pads[ax].1;
            ensure!(padded % self.block[ax] == 0, "Padded dim {} not divisible by {}", padded, self.block[ax]);
            shape.push(padded / self.block[ax]);
        }
        Ok(tvec!(TypedFact::dt_shape(input.datum_type, shape)))
    }
}

/// Moves batch blocks back into spatial axes, then crops. NCHW.
#[derive(Clone, Debug, PartialEq, Eq, Hash, new)]
pub struct BatchToSpace {
    pub block: [usize; 2],
    pub crops: [(usize, usize); 2],
}

impl TypedOp for BatchToSpace {
    fn name(&self) -> Cow<'_, str> {
        "BatchToSpace".into()
    }

    fn info(&self) -> Vec<String> {
        vec![format!("block: {:?} crops: {:?}", self.block, self.crops)]
    }

    fn output_facts(&self, inputs: &[&TypedFact]) -> NnResult<TVec<TypedFact>> {
        let input = args_1!(inputs);
        ensure!(input.rank() == 4 && self.block.iter().all(|b| *b > 0));
        let blocks = self.block[0] * self.block[1];
        ensure!(input.shape[0] % blocks == 0, "Batch {} not divisible by {}", input.shape[0], blocks);
        let mut shape = tvec!(input.shape[0] / blocks, input.shape[1]);
        for ax in 0..2 {
            let full = input.shape[2 + ax] * self.block[ax];
            let crop = self.crops[ax].0 + self.crops[ax].1;
            ensure!(crop < full, "Crops {:?} consume dim {}", self.crops[ax], full);
            shape.push(full - crop);
        }
        Ok(tvec!(TypedFact::dt_shape(input.datum_type, shape)))
    }
}
