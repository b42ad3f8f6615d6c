pub mod float;
pub mod owned;
#[cfg(any(test, feature = "approx"))]
mod approx;
