use crate::tensor::{Dims, ITensor};
use num_traits::Zero;
use rand::Rng;
use rand::distributions::Distribution;
use std::fmt::{Debug, Formatter};
use std::slice::{ChunksExact, ChunksExactMut, Iter, IterMut};
use std::vec::IntoIter;

/// Dense row-major tensor in the framework's externally visible layout.
pub struct Tensor<T> {
    data: Vec<T>,
    dims: Dims,
}

impl<T> Tensor<T> {
    pub fn empty() -> Self {
        Tensor {
            data: Vec::new(),
            dims: Dims::from(0),
        }
    }

    pub fn from_vec<D: Into<Dims>>(data: Vec<T>, dims: D) -> Self {
        let dims = dims.into();
        assert_eq!(
            data.len(),
            dims.tensor_len(),
            "Mismatched data length {} and dimension {}",
            data.len(),
            dims
        );
        Tensor { data, dims }
    }

    pub fn from_distribution<R, S, D>(rng: &mut R, dist: S, dims: D) -> Self
    where
        R: Rng,
        S: Distribution<T>,
        D: Into<Dims>,
    {
        let dims = dims.into();
        let data: Vec<T> = dist.sample_iter(rng).take(dims.tensor_len()).collect();
        Tensor { data, dims }
    }

    pub fn from_vec_1d(data: Vec<T>) -> Self {
        let len = data.len();
        Tensor { data, dims: Dims::from(len) }
    }

    pub fn from_vec_2d<const N: usize>(vec: Vec<[T; N]>) -> Self {
        let rows = vec.len();
        let data: Vec<T> = vec.into_iter().flatten().collect();
        Tensor {
            data,
            dims: Dims::from((rows, N)),
        }
    }

    /// Iterates over the rows of the major axis, each flattened over the remaining axes.
    #[inline]
    pub fn iter_major_axis(&self) -> ChunksExact<'_, T> {
        self.data.chunks_exact(self.dims.size_from_dim(1).max(1))
    }

    #[inline]
    pub fn iter_major_axis_mut(&mut self) -> ChunksExactMut<'_, T> {
        let stride = self.dims.size_from_dim(1).max(1);
        self.data.chunks_exact_mut(stride)
    }

    #[inline]
    pub fn iter(&self) -> Iter<'_, T> {
        self.data.iter()
    }

    #[inline]
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }
}

impl<T: Clone> Tensor<T> {
    pub fn filled<D: Into<Dims>>(value: T, dims: D) -> Self {
        let dims = dims.into();
        Tensor {
            data: vec![value; dims.tensor_len()],
            dims,
        }
    }

    pub fn resize<D: Into<Dims>>(&mut self, fill: T, dims: D) {
        let dims = dims.into();
        if self.dims != dims {
            let new_len = dims.tensor_len();
            if self.data.len() != new_len {
                self.data.resize(new_len, fill);
            }
            self.dims = dims;
        }
    }
}

impl<T: Zero + Clone> Tensor<T> {
    #[inline]
    pub fn zeroed<D: Into<Dims>>(dims: D) -> Self {
        Self::filled(T::zero(), dims)
    }
}

impl<T> ITensor for Tensor<T> {
    #[inline]
    fn len(&self) -> usize {
        self.data.len()
    }
    #[inline]
    fn dims(&self) -> &Dims {
        &self.dims
    }
}

impl<T> AsRef<[T]> for Tensor<T> {
    #[inline]
    fn as_ref(&self) -> &[T] {
        &self.data
    }
}

impl<T> AsMut<[T]> for Tensor<T> {
    #[inline]
    fn as_mut(&mut self) -> &mut [T] {
        &mut self.data
    }
}

impl<'a, T> IntoIterator for &'a Tensor<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;
    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

impl<'a, T> IntoIterator for &'a mut Tensor<T> {
    type Item = &'a mut T;
    type IntoIter = IterMut<'a, T>;
    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.data.iter_mut()
    }
}

impl<T> IntoIterator for Tensor<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;
    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.data.into_iter()
    }
}

impl<T: Clone> Clone for Tensor<T> {
    fn clone(&self) -> Self {
        Tensor {
            data: self.data.clone(),
            dims: self.dims.clone(),
        }
    }
}

impl<T: PartialEq> PartialEq for Tensor<T> {
    fn eq(&self, other: &Self) -> bool {
        self.dims == other.dims && self.data == other.data
    }
}

const DEBUG_LIMIT: usize = 16;

impl<T: Debug> Debug for Tensor<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Tensor{} ", self.dims)?;
        if self.data.len() > DEBUG_LIMIT {
            let hidden = self.data.len() - DEBUG_LIMIT;
            f.debug_list()
                .entries(&self.data[..DEBUG_LIMIT])
                .entry(&format_args!("...({hidden} hidden)"))
                .finish()
        } else {
            f.debug_list().entries(&self.data).finish()
        }
    }
}

#[macro_export]
macro_rules! tensor {
    ($([$($x:expr),* $(,)*]),+ $(,)*) => {
        $crate::tensor::Tensor::from_vec_2d(vec![$([$($x,)*],)*])
    };
    ($($x:expr),* $(,)*) => {
        $crate::tensor::Tensor::from_vec_1d(vec![$($x,)*])
    };
}

#[cfg(test)]
mod test {
    use crate::tensor::{Dims, ITensor, Tensor};

    #[test]
    fn test_tensor_macro() {
        let t = tensor![[1., 2., 3.], [4., 5., 6.]];
        assert_eq!(t.dims(), &Dims::from((2, 3)));
        assert_eq!(t.as_ref(), &[1., 2., 3., 4., 5., 6.]);

        let t = tensor![1, 2, 3];
        assert_eq!(t.dims(), &Dims::from(3));
    }

    #[test]
    fn test_iter_major_axis() {
        let t = Tensor::from_vec((0..12).collect(), [2, 3, 2]);
        let rows: Vec<&[i32]> = t.iter_major_axis().collect();
        assert_eq!(rows, vec![&[0, 1, 2, 3, 4, 5][..], &[6, 7, 8, 9, 10, 11][..]]);
    }

    #[test]
    fn test_resize() {
        let mut t = Tensor::filled(1.0f32, (2, 2));
        t.resize(0.0, [2, 3]);
        assert_eq!(t.dims(), &Dims::from((2, 3)));
        assert_eq!(t.len(), 6);
        assert_eq!(&t.as_ref()[4..], &[0.0, 0.0]);
    }

    #[test]
    #[should_panic]
    fn test_from_vec_mismatched_len() {
        Tensor::from_vec(vec![1.0f32; 5], (2, 3));
    }
}
