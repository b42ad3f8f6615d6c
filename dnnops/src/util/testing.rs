use crate::dtype::DTypeFloat;
use crate::tensor::{Dim4, ITensor, Tensor};

/// Straightforward NCHW convolution used as ground truth in tests.
pub(crate) fn naive_conv2d<T: DTypeFloat>(
    x: &Tensor<T>,
    filter: &Tensor<T>,
    bias: &Tensor<T>,
    stride: (usize, usize),
    pad: (usize, usize),
) -> Tensor<T> {
    let Dim4(n, c, h, w) = x.dims().as_dim4().unwrap();
    let Dim4(m, _, kh, kw) = filter.dims().as_dim4().unwrap();
    let (stride_h, stride_w) = stride;
    let (pad_h, pad_w) = pad;
    let oh = (h + 2 * pad_h - kh) / stride_h + 1;
    let ow = (w + 2 * pad_w - kw) / stride_w + 1;
    let xs = x.as_ref();
    let fs = filter.as_ref();
    let mut out = Vec::with_capacity(n * m * oh * ow);
    for ni in 0..n {
        for mi in 0..m {
            for oy in 0..oh {
                for ox in 0..ow {
                    let mut acc = bias.as_ref()[mi];
                    for ci in 0..c {
                        for ki in 0..kh {
                            for kj in 0..kw {
                                let iy = (oy * stride_h + ki) as isize - pad_h as isize;
                                let ix = (ox * stride_w + kj) as isize - pad_w as isize;
                                if iy < 0 || ix < 0 || iy as usize >= h || ix as usize >= w {
                                    continue;
                                }
                                let xv = xs[((ni * c + ci) * h + iy as usize) * w + ix as usize];
                                let fv = fs[((mi * c + ci) * kh + ki) * kw + kj];
                                acc += xv * fv;
                            }
                        }
                    }
                    out.push(acc);
                }
            }
        }
    }
    Tensor::from_vec(out, Dim4(n, m, oh, ow))
}
