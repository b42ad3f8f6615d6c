use crate::tensor::{ITensor, Tensor};
use approx::{AbsDiffEq, RelativeEq};
use std::iter::zip;

impl<T: AbsDiffEq> AbsDiffEq for Tensor<T>
where
    T::Epsilon: Copy,
{
    type Epsilon = T::Epsilon;
    fn default_epsilon() -> Self::Epsilon {
        T::default_epsilon()
    }
    fn abs_diff_eq(&self, other: &Tensor<T>, epsilon: Self::Epsilon) -> bool {
        self.dims() == other.dims() && zip(self.as_ref(), other.as_ref()).all(|(a, b)| T::abs_diff_eq(a, b, epsilon))
    }
}

impl<T: RelativeEq> RelativeEq for Tensor<T>
where
    T::Epsilon: Copy,
{
    fn default_max_relative() -> Self::Epsilon {
        T::default_max_relative()
    }
    fn relative_eq(&self, other: &Tensor<T>, epsilon: Self::Epsilon, max_relative: Self::Epsilon) -> bool {
        self.dims() == other.dims()
            && zip(self.as_ref(), other.as_ref()).all(|(a, b)| T::relative_eq(a, b, epsilon, max_relative))
    }
}
