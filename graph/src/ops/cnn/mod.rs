//! Convolution and pooling over NCHW data.
use crate::internal::*;

mod conv;
mod deconv;
mod pools;

pub use conv::Conv;
pub use deconv::Deconv;
pub use pools::{Pool, PoolKind};

/// Output size of a strided window over a padded axis.
pub fn output_dim(
    input: usize,
    kernel: usize,
    dilation: usize,
    stride: usize,
    before: usize,
    after: usize,
) -> NnResult<usize> {
    ensure!(stride > 0 && dilation > 0, "Stride and dilation must be positive");
    let field = (kernel.max(1) - 1) * dilation + 1;
    let padded = input + before + after;
    ensure!(padded >= field, "Kernel field {} larger than padded input {}", field, padded);
    Ok((padded - field) / stride + 1)
}

pub(crate) fn check_2d(name: &str, values: &[usize]) -> NnResult<()> {
    ensure!(values.len() == 2, "{} expects 2 values, got {:?}", name, values);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_window() {
        assert_eq!(output_dim(7, 3, 1, 2, 0, 0).unwrap(), 3);
        assert_eq!(output_dim(4, 4, 1, 1, 0, 0).unwrap(), 1);
    }

    #[test]
    fn padded_window() {
        assert_eq!(output_dim(7, 3, 1, 2, 1, 1).unwrap(), 4);
        assert_eq!(output_dim(8, 3, 1, 2, 0, 1).unwrap(), 4);
    }

    #[test]
    fn dilated_window() {
        assert_eq!(output_dim(7, 3, 2, 1, 0, 0).unwrap(), 3);
        assert!(output_dim(4, 3, 2, 1, 0, 0).is_err());
    }
}
