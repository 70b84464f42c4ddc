//! N-way tensor broadcast
use crate::internal::*;

/// Computes a shape, if any, to which all shapes can be broadcasted.
pub fn multi_broadcast(shapes: &[impl AsRef<[usize]>]) -> NnResult<TVec<usize>> {
    let Some(len) = shapes.iter().map(|shape| shape.as_ref().len()).max() else {
        return Ok(tvec!());
    };
    let mut shape: TVec<usize> = tvec!();
    for i in 0..len {
        let mut wanted_size = 1;
        for s in shapes {
            let s = s.as_ref();
            let dim = if i < s.len() { s[s.len() - i - 1] } else { 1 };
            if dim != 1 {
                if wanted_size != 1 && wanted_size != dim {
                    bail!(
                        "Can not broadcast shapes {:?}",
                        shapes.iter().map(|s| s.as_ref()).collect::<Vec<_>>()
                    );
                }
                wanted_size = dim;
            }
        }
        shape.push(wanted_size)
    }
    shape.reverse();
    Ok(shape)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar() {
        assert_eq!(multi_broadcast(&[tvec![2, 3, 4, 5], tvec![]]).unwrap(), tvec![2, 3, 4, 5])
    }

    #[test]
    fn trailing() {
        assert_eq!(multi_broadcast(&[tvec![2, 3, 4, 5], tvec![5]]).unwrap(), tvec![2, 3, 4, 5])
    }

    #[test]
    fn both_sides() {
        assert_eq!(
            multi_broadcast(&[tvec![1, 4, 5], tvec![2, 3, 4, 1]]).unwrap(),
            tvec![2, 3, 4, 5]
        )
    }

    #[test]
    fn three_way() {
        assert_eq!(
            multi_broadcast(&[tvec![1, 1, 8], tvec![4, 1], tvec![3, 1, 1]]).unwrap(),
            tvec![3, 4, 8]
        )
    }

    #[test]
    fn incompatible() {
        assert!(multi_broadcast(&[tvec![2, 3], tvec![4, 3]]).is_err())
    }
}
