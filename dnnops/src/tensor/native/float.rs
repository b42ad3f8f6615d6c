use crate::tensor::{Dims, ITensor, Tensor};

/// Tensor whose element type is one of the supported floating point types.
#[derive(Clone, Debug, PartialEq)]
pub enum FloatTensor {
    F32(Tensor<f32>),
    F64(Tensor<f64>),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FloatType {
    F32,
    F64,
}

impl FloatTensor {
    #[inline]
    pub fn float_type(&self) -> FloatType {
        match self {
            FloatTensor::F32(_) => FloatType::F32,
            FloatTensor::F64(_) => FloatType::F64,
        }
    }

    pub fn zeroed<D: Into<Dims>>(float_type: FloatType, dims: D) -> Self {
        match float_type {
            FloatType::F32 => FloatTensor::F32(Tensor::zeroed(dims)),
            FloatType::F64 => FloatTensor::F64(Tensor::zeroed(dims)),
        }
    }

    pub fn as_f32(&self) -> Option<&Tensor<f32>> {
        match self {
            FloatTensor::F32(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<&Tensor<f64>> {
        match self {
            FloatTensor::F64(t) => Some(t),
            _ => None,
        }
    }
}

impl ITensor for FloatTensor {
    fn len(&self) -> usize {
        match self {
            FloatTensor::F32(t) => t.len(),
            FloatTensor::F64(t) => t.len(),
        }
    }

    fn dims(&self) -> &Dims {
        match self {
            FloatTensor::F32(t) => t.dims(),
            FloatTensor::F64(t) => t.dims(),
        }
    }
}

impl From<Tensor<f32>> for FloatTensor {
    fn from(value: Tensor<f32>) -> Self {
        FloatTensor::F32(value)
    }
}

impl From<Tensor<f64>> for FloatTensor {
    fn from(value: Tensor<f64>) -> Self {
        FloatTensor::F64(value)
    }
}
