//! Padding resolution for windowed operators.
use crate::internal::*;

pub const PADDING_SAME: i32 = 1;
pub const PADDING_VALID: i32 = 2;

/// How the padding of one spatial axis is obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Padding {
    Explicit { before: usize, after: usize },
    Same,
    Valid,
}

impl Padding {
    /// Implicit padding scheme from its NNAPI code. Unknown codes resolve to
    /// an explicit zero padding.
    pub fn from_scheme(code: i32) -> Padding {
        match code {
            PADDING_SAME => Padding::Same,
            PADDING_VALID => Padding::Valid,
            other => {
                warn!("Unknown padding scheme {other}, using no padding");
                Padding::Explicit { before: 0, after: 0 }
            }
        }
    }

    pub fn is_known_scheme(code: i32) -> bool {
        code == PADDING_SAME || code == PADDING_VALID
    }

    /// (before, after) for one axis. `filter` is the effective (dilated)
    /// filter size.
    pub fn resolve(&self, input: usize, stride: usize, filter: usize) -> (usize, usize) {
        match *self {
            Padding::Explicit { before, after } => (before, after),
            Padding::Valid => (0, 0),
            Padding::Same => same_padding(input, stride, filter),
        }
    }
}

/// Same padding, with the odd pixel going after.
pub fn same_padding(input: usize, stride: usize, filter: usize) -> (usize, usize) {
    let stride = stride.max(1);
    let output = input.div_ceil(stride);
    let needed = (output.max(1) - 1) * stride + filter;
    let total = needed.saturating_sub(input);
    let before = total / 2;
    (before, total - before)
}

/// Same padding for a transposed convolution producing `output` from `input`.
pub fn same_padding_transposed(input: usize, stride: usize, filter: usize, output: usize) -> (usize, usize) {
    let full = (input.max(1) - 1) * stride + filter;
    let total = full.saturating_sub(output);
    let before = total / 2;
    (before, total - before)
}

/// Dilated filter size.
pub fn effective_filter(filter: usize, dilation: usize) -> usize {
    (filter.max(1) - 1) * dilation.max(1) + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use nnhal_graph::ops::cnn::output_dim;
    use proptest::prelude::*;

    #[test]
    fn same_odd_total() {
        assert_eq!(Padding::Same.resolve(7, 2, 3), (1, 1));
    }

    #[test]
    fn same_even_input() {
        assert_eq!(Padding::Same.resolve(8, 2, 3), (0, 1));
    }

    #[test]
    fn same_never_negative() {
        assert_eq!(same_padding(8, 4, 1), (0, 0));
    }

    #[test]
    fn valid_and_explicit() {
        assert_eq!(Padding::Valid.resolve(7, 2, 3), (0, 0));
        assert_eq!(Padding::Explicit { before: 2, after: 3 }.resolve(7, 2, 3), (2, 3));
    }

    #[test]
    fn unknown_scheme_is_not_same() {
        assert_eq!(Padding::from_scheme(0), Padding::Explicit { before: 0, after: 0 });
        assert_eq!(Padding::from_scheme(1), Padding::Same);
        assert_eq!(Padding::from_scheme(2), Padding::Valid);
        assert!(!Padding::is_known_scheme(3));
    }

    #[test]
    fn transposed() {
        assert_eq!(same_padding_transposed(4, 2, 3, 8), (0, 1));
        assert_eq!(same_padding_transposed(4, 2, 4, 8), (1, 1));
    }

    #[test]
    fn dilation() {
        assert_eq!(effective_filter(3, 2), 5);
        assert_eq!(effective_filter(1, 4), 1);
    }

    #[derive(Debug, Clone)]
    struct Problem {
        input: usize,
        stride: usize,
        filter: usize,
    }

    impl Arbitrary for Problem {
        type Parameters = ();
        type Strategy = BoxedStrategy<Problem>;
        fn arbitrary_with(_: ()) -> Self::Strategy {
            (1usize..64, 1usize..5, 1usize..8)
                .prop_map(|(input, stride, filter)| Problem { input, stride, filter })
                .boxed()
        }
    }

    impl Problem {
        fn check(&self) -> NnResult<()> {
            let (before, after) = same_padding(self.input, self.stride, self.filter);
            ensure!(before <= after && after <= before + 1);
            let out = output_dim(self.input, self.filter, 1, self.stride, before, after)?;
            ensure!(out == self.input.div_ceil(self.stride), "{:?} gives {}", self, out);
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
