mod conv;
mod conv_pool;
mod sqrt_div;

use crate::error::Result;
use std::fmt::Debug;

pub use conv::{ConvInputs, ConvOp};
pub use conv_pool::{ConvParams, ConvParamsBuilder, ConvParamsBuilderError, StorageOrder};
pub use sqrt_div::{SqrtDivInputs, SquareRootDivideOp, square_root_divide};

/// A stateful computation unit invoked once per forward pass.
///
/// `Context` is whatever the operator executes against, e.g. the accelerated library for
/// [`ConvOp`]. The output is owned by the caller and reused across calls.
pub trait Operator: Debug {
    /// Name the operator is registered under.
    const NAME: &'static str;

    type Context;
    type Inputs<'a>
    where
        Self: 'a;
    type Output;

    fn run(&mut self, ctx: &Self::Context, inputs: Self::Inputs<'_>, output: &mut Self::Output) -> Result<()>;
}
