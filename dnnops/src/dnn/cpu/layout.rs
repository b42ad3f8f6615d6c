use crate::dnn::{DnnError, DnnResult};
use crate::tensor::{Dim4, Dims};

/// Physical arrangement of a buffer in the reference library.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum CpuLayout {
    /// Row-major in the framework's own axis order.
    Plain(Dims),
    /// `(N, C, H, W)` with channels split into groups of `block`, stored as
    /// `N, ceil(C / block), H, W, block`. Lanes past `C` are padding.
    ChannelBlocked { dims: Dim4, block: usize },
}

impl CpuLayout {
    pub fn dims(&self) -> Dims {
        match self {
            CpuLayout::Plain(dims) => dims.clone(),
            CpuLayout::ChannelBlocked { dims, .. } => Dims::from(*dims),
        }
    }

    /// Number of elements a buffer in this layout holds.
    pub fn size(&self) -> usize {
        match self {
            CpuLayout::Plain(dims) => dims.tensor_len(),
            &CpuLayout::ChannelBlocked { dims: Dim4(n, c, h, w), block } => {
                n * c.div_ceil(block) * block * h * w
            }
        }
    }

    /// Offset of element `(n, c, h, w)` for rank 4 layouts.
    #[inline]
    pub fn offset4(&self, n: usize, c: usize, h: usize, w: usize) -> usize {
        match self {
            CpuLayout::Plain(dims) => {
                let s = dims.as_slice();
                ((n * s[1] + c) * s[2] + h) * s[3] + w
            }
            &CpuLayout::ChannelBlocked { dims: Dim4(_, cs, hs, ws), block } => {
                let blocks = cs.div_ceil(block);
                (((n * blocks + c / block) * hs + h) * ws + w) * block + c % block
            }
        }
    }

    fn as_dim4(&self) -> Option<Dim4> {
        match self {
            CpuLayout::Plain(dims) => dims.as_dim4(),
            CpuLayout::ChannelBlocked { dims, .. } => Some(*dims),
        }
    }
}

/// Copies `src` in layout `from` into `dst` in layout `to`. Both layouts must describe the same
/// logical dims. Padding lanes of `dst` are left as they are.
pub(crate) fn convert<T: Copy>(from: &CpuLayout, src: &[T], to: &CpuLayout, dst: &mut [T]) -> DnnResult<()> {
    if from.dims() != to.dims() || src.len() != from.size() || dst.len() != to.size() {
        return Err(DnnError::IncorrectInputParameter);
    }
    if let (CpuLayout::Plain(_), CpuLayout::Plain(_)) = (from, to) {
        dst.copy_from_slice(src);
        return Ok(());
    }
    let Some(Dim4(n, c, h, w)) = from.as_dim4() else {
        return Err(DnnError::UnsupportedDimension);
    };
    for ni in 0..n {
        for ci in 0..c {
            for hi in 0..h {
                for wi in 0..w {
                    dst[to.offset4(ni, ci, hi, wi)] = src[from.offset4(ni, ci, hi, wi)];
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_blocked_size_pads_channels() {
        let layout = CpuLayout::ChannelBlocked {
            dims: Dim4(2, 3, 2, 2),
            block: 4,
        };
        assert_eq!(2 * 4 * 2 * 2, layout.size());
        assert_eq!(Dims::from([2, 3, 2, 2]), layout.dims());
    }

    #[test]
    fn test_blocked_offsets() {
        let layout = CpuLayout::ChannelBlocked {
            dims: Dim4(1, 5, 1, 2),
            block: 4,
        };
        assert_eq!(0, layout.offset4(0, 0, 0, 0));
        assert_eq!(3, layout.offset4(0, 3, 0, 0));
        assert_eq!(4, layout.offset4(0, 0, 0, 1));
        assert_eq!(8, layout.offset4(0, 4, 0, 0));
        assert_eq!(12, layout.offset4(0, 4, 0, 1));
    }

    #[test]
    fn test_convert_plain_to_blocked_and_back() {
        let dims = Dim4(1, 3, 2, 2);
        let plain = CpuLayout::Plain(Dims::from(dims));
        let blocked = CpuLayout::ChannelBlocked { dims, block: 2 };
        let src: Vec<f32> = (0..12).map(|v| v as f32).collect();
        let mut tmp = vec![-1.0f32; blocked.size()];
        convert(&plain, &src, &blocked, &mut tmp).unwrap();
        // channel 0 and 1 interleave, channel 2 shares its block with a padding lane
        assert_eq!(&tmp[..8], &[0., 4., 1., 5., 2., 6., 3., 7.]);
        assert_eq!(&tmp[8..], &[8., -1., 9., -1., 10., -1., 11., -1.]);
        let mut back = vec![0.0f32; 12];
        convert(&blocked, &tmp, &plain, &mut back).unwrap();
        assert_eq!(src, back);
    }

    #[test]
    fn test_convert_rejects_mismatched_dims() {
        let a = CpuLayout::Plain(Dims::from([1, 2, 2, 2]));
        let b = CpuLayout::Plain(Dims::from([1, 2, 2, 1]));
        let mut dst = vec![0.0f32; 4];
        assert_eq!(
            Err(DnnError::IncorrectInputParameter),
            convert(&a, &[0.0; 8], &b, &mut dst)
        );
    }
}
