pub mod dnn;
pub mod dtype;
pub mod error;
pub mod op;
pub mod tensor;
pub mod util;

pub use error::{Error, Result};
