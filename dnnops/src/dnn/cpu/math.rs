use crate::dtype::DTypeFloat;

pub trait DTypeOps: DTypeFloat {
    /// `c = alpha * a * b + beta * c` for row-major `a: (m, k)`, `b: (k, n)` and `c: (m, n)`.
    fn matrix_multiply(m: usize, k: usize, n: usize, alpha: Self, a: &[Self], b: &[Self], beta: Self, c: &mut [Self]);
}

macro_rules! implement_dtype_ops {
    ($t: ident, $g: ident) => {
        impl DTypeOps for $t {
            fn matrix_multiply(m: usize, k: usize, n: usize, alpha: Self, a: &[Self], b: &[Self], beta: Self, c: &mut [Self]) {
                assert_eq!(a.len(), m * k);
                assert_eq!(b.len(), k * n);
                assert_eq!(c.len(), m * n);
                unsafe {
                    matrixmultiply::$g(
                        m,
                        k,
                        n,
                        alpha,
                        a.as_ptr(),
                        k as isize,
                        1,
                        b.as_ptr(),
                        n as isize,
                        1,
                        beta,
                        c.as_mut_ptr(),
                        n as isize,
                        1,
                    );
                }
            }
        }
    };
}

implement_dtype_ops!(f32, sgemm);
implement_dtype_ops!(f64, dgemm);

#[cfg(test)]
mod test {
    use super::DTypeOps;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_mat_mul() {
        let a = [1.0f32, 2., 3., 4., 5., 6.];
        let b = [7.0f32, 8., 9., 10., 11., 12.];

        let mut r2x2 = [100.0f32; 4]; // existing values should be ignored
        f32::matrix_multiply(2, 3, 2, 1.0, &a, &b, 0.0, &mut r2x2);
        assert_abs_diff_eq!(&r2x2[..], &[58., 64., 139., 154.][..]);

        let mut r2x2 = [1.0f32; 4];
        f32::matrix_multiply(2, 3, 2, 0.5, &a, &b, 5.0, &mut r2x2);
        assert_abs_diff_eq!(&r2x2[..], &[34., 37., 74.5, 82.][..]);

        let a = a.map(f64::from);
        let b = b.map(f64::from);
        let mut r3x3 = [100.0f64; 9];
        f64::matrix_multiply(3, 2, 3, 1.0, &b, &a, 0.0, &mut r3x3);
        assert_abs_diff_eq!(&r3x3[..], &[39., 54., 69., 49., 68., 87., 59., 82., 105.][..]);
    }
}
