//! Narrow interface to an accelerated math library.
//!
//! The convolution operator only talks to the library through [`DnnLibrary`]: it asks for a
//! primitive, derives the layout the primitive expects for each of its operands, converts
//! buffers between layouts and finally executes the primitive on a set of bound resources.
//! Primitives are released when the last handle to them is dropped.

pub mod cpu;
mod memory;
mod resources;

use crate::dtype::DTypeFloat;
use crate::tensor::{Dim4, Dims};
use std::fmt::{Debug, Display, Formatter};

pub use memory::*;
pub use resources::*;

/// Number of resource slots a convolution primitive binds.
pub const RESOURCE_COUNT: usize = 4;

#[repr(usize)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ResourceType {
    Src = 0,
    Filter = 1,
    Bias = 2,
    Dst = 3,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ConvAlgorithm {
    Direct,
}

/// Treatment of input elements that fall outside the image.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum BorderType {
    Zeros,
}

/// Non-success status codes reported by the library.
#[repr(i32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum DnnError {
    IncorrectInputParameter = -1,
    UnexpectedNullPointer = -2,
    MemoryError = -3,
    UnsupportedDimension = -4,
    Unimplemented = -127,
}

impl Display for DnnError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            DnnError::IncorrectInputParameter => "E_INCORRECT_INPUT_PARAMETER",
            DnnError::UnexpectedNullPointer => "E_UNEXPECTED_NULL_POINTER",
            DnnError::MemoryError => "E_MEMORY_ERROR",
            DnnError::UnsupportedDimension => "E_UNSUPPORTED_DIMENSION",
            DnnError::Unimplemented => "E_UNIMPLEMENTED",
        })
    }
}

pub type DnnResult<T> = std::result::Result<T, DnnError>;

/// Reorders a framework shape into the library's native axis order, minor axis first.
///
/// `(N, C, H, W)` becomes `[W, H, C, N]` and a filter `(M, C, KH, KW)` becomes `[KW, KH, C, M]`.
#[inline]
pub fn dnn_sizes(dims: Dim4) -> [usize; 4] {
    let Dim4(a, b, c, d) = dims;
    [d, c, b, a]
}

/// Inverse of [`dnn_sizes`].
#[inline]
pub fn from_dnn_sizes(sizes: [usize; 4]) -> Dim4 {
    let [d, c, b, a] = sizes;
    Dim4(a, b, c, d)
}

/// Everything needed to create a forward convolution-with-bias primitive.
///
/// Sizes are in the library's native order (see [`dnn_sizes`]); `strides` and `offsets` are
/// `[width, height]`. Padding is expressed as a non-positive offset of the first window.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ConvPrimitiveDesc {
    pub algorithm: ConvAlgorithm,
    pub dimension: usize,
    pub src_sizes: [usize; 4],
    pub dst_sizes: [usize; 4],
    pub filter_sizes: [usize; 4],
    pub strides: [usize; 2],
    pub offsets: [isize; 2],
    pub border: BorderType,
}

pub trait DnnLibrary: Debug {
    type DType: DTypeFloat;
    type Primitive: Debug;
    /// Layout descriptors compare structurally.
    type Layout: Clone + Debug + PartialEq;

    fn create_conv_forward_bias(&self, desc: &ConvPrimitiveDesc) -> DnnResult<Self::Primitive>;

    fn layout_from_primitive(&self, primitive: &Self::Primitive, resource: ResourceType) -> DnnResult<Self::Layout>;

    /// The framework's row-major layout for `dims`.
    fn plain_layout(&self, dims: &Dims) -> Self::Layout;

    /// Number of elements a buffer in `layout` holds, padding included.
    fn layout_size(&self, layout: &Self::Layout) -> usize;

    fn convert(
        &self,
        from: &Self::Layout,
        src: &[Self::DType],
        to: &Self::Layout,
        dst: &mut [Self::DType],
    ) -> DnnResult<()>;

    fn execute(&self, primitive: &Self::Primitive, resources: &mut ResourceBindings<'_, Self::DType>) -> DnnResult<()>;
}

#[macro_export]
macro_rules! wrap_dnn_error {
    ($res: expr, $($arg:tt)*) => {
        ($res).map_err(|err| $crate::error::Error::from_dnn_err(err, format!($($arg)*)))
    }
}
pub(crate) use wrap_dnn_error;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_dnn_sizes_reverses_axes() {
        assert_eq!([4, 3, 2, 1], dnn_sizes(Dim4(1, 2, 3, 4)));
        assert_eq!(Dim4(1, 2, 3, 4), from_dnn_sizes([4, 3, 2, 1]));
    }

    #[test]
    fn test_dnn_error_codes() {
        assert_eq!(-1, DnnError::IncorrectInputParameter as i32);
        assert_eq!(-127, DnnError::Unimplemented as i32);
        assert_eq!("E_UNEXPECTED_NULL_POINTER", DnnError::UnexpectedNullPointer.to_string());
    }
}
