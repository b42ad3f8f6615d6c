use crate::dtype::DTypeFloat;
use crate::error::{Error, Result};
use crate::op::Operator;
use crate::tensor::{FloatTensor, ITensor, Tensor};
use std::fmt::{Debug, Formatter};
use std::iter::zip;
use std::marker::PhantomData;
use tracing::trace;

/// Divides every row of `data` by the square root of the matching entry of `scale`.
///
/// Row `i` spans all trailing axes of `data` and is multiplied by `1 / sqrt(scale[i])`. A zero
/// scale leaves the row unchanged. Every scale is checked before `y` is written, so `y` is
/// untouched when an error is returned.
pub fn square_root_divide<T: DTypeFloat, S: DTypeFloat>(data: &Tensor<T>, scale: &Tensor<S>, y: &mut Tensor<T>) -> Result<()> {
    let dims = data.dims();
    let Some(batch) = dims.first() else {
        return Err(Error::InvalidRank {
            tensor: "data",
            expected: 1,
            actual: 0,
            dims: dims.clone(),
        });
    };
    if scale.dims().ndim() != 1 {
        return Err(Error::InvalidRank {
            tensor: "scale",
            expected: 1,
            actual: scale.dims().ndim(),
            dims: scale.dims().clone(),
        });
    }
    Error::shape_mismatch("scale length", batch, scale.len())?;

    let multipliers = scale
        .iter()
        .enumerate()
        .map(|(index, &s)| {
            if s < S::ZERO {
                Err(Error::NegativeScale {
                    index,
                    value: s.to_f64(),
                })
            } else if s == S::ZERO {
                Ok(T::ONE)
            } else {
                Ok(T::from_f64((S::ONE / s.sqrt()).to_f64()))
            }
        })
        .collect::<Result<Vec<T>>>()?;

    y.resize(T::ZERO, dims.clone());
    for ((src, dst), m) in zip(zip(data.iter_major_axis(), y.iter_major_axis_mut()), multipliers) {
        for (d, &s) in zip(dst, src) {
            *d = s * m;
        }
    }
    Ok(())
}

/// Operands of [`SquareRootDivideOp`]: `data` with leading axis `B` and a rank 1 `scale` of
/// length `B`.
#[derive(Debug)]
pub struct SqrtDivInputs<'a, S> {
    pub data: &'a FloatTensor,
    pub scale: &'a Tensor<S>,
}

/// Scale normalization over `f32` or `f64` data. The scale element type `S` is fixed per
/// operator and independent of the data type.
pub struct SquareRootDivideOp<S: DTypeFloat = f32> {
    _scale: PhantomData<S>,
}

impl<S: DTypeFloat> SquareRootDivideOp<S> {
    pub fn new() -> Self {
        SquareRootDivideOp { _scale: PhantomData }
    }
}

impl<S: DTypeFloat> Default for SquareRootDivideOp<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: DTypeFloat> Debug for SquareRootDivideOp<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SquareRootDivideOp<{}>", std::any::type_name::<S>())
    }
}

impl<S: DTypeFloat> Operator for SquareRootDivideOp<S> {
    const NAME: &'static str = "SquareRootDivide";

    type Context = ();
    type Inputs<'a>
        = SqrtDivInputs<'a, S>
    where
        Self: 'a;
    type Output = FloatTensor;

    fn run(&mut self, _ctx: &(), inputs: SqrtDivInputs<'_, S>, output: &mut FloatTensor) -> Result<()> {
        let SqrtDivInputs { data, scale } = inputs;
        match (data, output) {
            (FloatTensor::F32(data), FloatTensor::F32(y)) => square_root_divide(data, scale, y),
            (FloatTensor::F64(data), FloatTensor::F64(y)) => square_root_divide(data, scale, y),
            (FloatTensor::F32(data), output) => {
                trace!("replacing output with an f32 tensor");
                let mut y = Tensor::empty();
                square_root_divide(data, scale, &mut y)?;
                *output = y.into();
                Ok(())
            }
            (FloatTensor::F64(data), output) => {
                trace!("replacing output with an f64 tensor");
                let mut y = Tensor::empty();
                square_root_divide(data, scale, &mut y)?;
                *output = y.into();
                Ok(())
            }
        }
    }
}
