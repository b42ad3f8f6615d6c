use crate::dnn::DnnError;
use crate::op::ConvParamsBuilderError;
use crate::tensor::Dims;
use std::cell::{BorrowError, BorrowMutError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Feature not supported: {0}")]
    Unsupported(&'static str),

    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("Invalid rank for {tensor}: expected {expected}, got {actual} (dims {dims})")]
    InvalidRank {
        tensor: &'static str,
        expected: usize,
        actual: usize,
        dims: Dims,
    },

    #[error("Shape mismatch for {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid output size: input {input} is smaller than the kernel extent {kernel} along {axis}")]
    InvalidOutputSize {
        axis: &'static str,
        input: usize,
        kernel: usize,
    },

    #[error("Scale at row {index} is negative: {value} < 0")]
    NegativeScale { index: usize, value: f64 },

    #[error("Accelerated library call failed with {code_str} ({code}){}", fmt_msg(.msg))]
    Dnn {
        code: i32,
        code_str: String,
        msg: Option<String>,
    },

    #[error("Buffer is already borrowed")]
    BufferBorrowed,

    #[error("Invalid convolution parameters: {0}")]
    InvalidParams(#[from] ConvParamsBuilderError),

    #[cfg(feature = "serde")]
    #[error("Failed to parse parameters: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn from_dnn_err<M>(err: DnnError, msg: M) -> Self
    where
        M: Into<String>,
    {
        Error::Dnn {
            code: err as i32,
            code_str: err.to_string(),
            msg: Some(msg.into()),
        }
    }

    pub(crate) fn shape_mismatch(what: &'static str, expected: usize, actual: usize) -> Result<()> {
        if expected == actual {
            Ok(())
        } else {
            Err(Error::ShapeMismatch { what, expected, actual })
        }
    }
}

impl From<DnnError> for Error {
    fn from(value: DnnError) -> Self {
        Error::Dnn {
            code: value as i32,
            code_str: value.to_string(),
            msg: None,
        }
    }
}

impl From<BorrowError> for Error {
    fn from(_: BorrowError) -> Self {
        Error::BufferBorrowed
    }
}

impl From<BorrowMutError> for Error {
    fn from(_: BorrowMutError) -> Self {
        Error::BufferBorrowed
    }
}

fn fmt_msg(msg: &Option<String>) -> String {
    match msg {
        Some(msg) => format!(": {msg}"),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, Error>;
