mod dims;
mod native;

pub use dims::*;
pub use native::float::*;
pub use native::owned::*;

/// Common read access shared by the framework's tensor types.
pub trait ITensor {
    fn len(&self) -> usize;
    fn dims(&self) -> &Dims;

    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    #[inline]
    fn ndim(&self) -> usize {
        self.dims().ndim()
    }
}
