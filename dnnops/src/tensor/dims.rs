use std::fmt::{Display, Formatter, Write};

/// Shape of a tensor of any rank, major axis first.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Dims(Vec<usize>);

/// Rank 4 shape, `(N, C, H, W)` for channel-first images and `(M, C, KH, KW)` for filters.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Dim4(pub usize, pub usize, pub usize, pub usize);

impl Dim4 {
    #[inline]
    pub fn batch(&self) -> usize {
        self.0
    }
    #[inline]
    pub fn channels(&self) -> usize {
        self.1
    }
    #[inline]
    pub fn height(&self) -> usize {
        self.2
    }
    #[inline]
    pub fn width(&self) -> usize {
        self.3
    }
    #[inline]
    pub fn tensor_len(&self) -> usize {
        self.0 * self.1 * self.2 * self.3
    }
}

impl Dims {
    pub fn new(sizes: &[usize]) -> Self {
        Dims(sizes.to_vec())
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// Size of the given axis. Panics if the axis is out of range.
    #[inline]
    pub fn dim(&self, axis: usize) -> usize {
        self.0[axis]
    }

    /// Size of the major axis, `None` for a scalar.
    #[inline]
    pub fn first(&self) -> Option<usize> {
        self.0.first().copied()
    }

    #[inline]
    pub fn tensor_len(&self) -> usize {
        self.0.iter().product()
    }

    /// Number of elements spanned by the axes from `axis` onwards.
    pub fn size_from_dim(&self, axis: usize) -> usize {
        self.0[axis.min(self.0.len())..].iter().product()
    }

    pub fn as_dim4(&self) -> Option<Dim4> {
        match self.0.as_slice() {
            &[a, b, c, d] => Some(Dim4(a, b, c, d)),
            _ => None,
        }
    }
}

impl Display for Dims {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_char('(')?;
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            Display::fmt(d, f)?;
        }
        f.write_char(')')
    }
}

impl Display for Dim4 {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {}, {})", self.0, self.1, self.2, self.3)
    }
}

impl From<Dim4> for Dims {
    fn from(value: Dim4) -> Self {
        let Dim4(a, b, c, d) = value;
        Dims(vec![a, b, c, d])
    }
}

impl From<usize> for Dims {
    fn from(value: usize) -> Self {
        Dims(vec![value])
    }
}

impl From<(usize, usize)> for Dims {
    fn from(value: (usize, usize)) -> Self {
        Dims(vec![value.0, value.1])
    }
}

impl<const N: usize> From<[usize; N]> for Dims {
    fn from(value: [usize; N]) -> Self {
        Dims(value.to_vec())
    }
}

impl From<&[usize]> for Dims {
    fn from(value: &[usize]) -> Self {
        Dims::new(value)
    }
}

impl From<Vec<usize>> for Dims {
    fn from(value: Vec<usize>) -> Self {
        Dims(value)
    }
}

impl From<&Dims> for Dims {
    fn from(value: &Dims) -> Self {
        value.clone()
    }
}
