//! Reference implementation of [`DnnLibrary`] on the host CPU.
//!
//! Source and destination operands use a channel-blocked layout so that the layout
//! bookkeeping of callers is exercised the same way a real accelerated library would
//! exercise it. Filters and biases stay in the plain layout.

mod layout;
mod math;

pub use layout::CpuLayout;
pub use math::DTypeOps;

use crate::dnn::{
    BorderType, ConvAlgorithm, ConvPrimitiveDesc, DnnError, DnnLibrary, DnnResult, ResourceBindings, ResourceType,
    from_dnn_sizes,
};
use crate::tensor::{Dim4, Dims};
use std::borrow::Cow;
use std::cell::Cell;
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;

pub const DEFAULT_BLOCK_SIZE: usize = 8;

/// Call counters, used to observe caching and copy avoidance.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct CpuDnnStats {
    pub primitives_created: usize,
    pub conversions: usize,
    pub executions: usize,
}

pub struct CpuDnn<T: DTypeOps> {
    block: Option<usize>,
    stats: Cell<CpuDnnStats>,
    _marker: PhantomData<T>,
}

#[derive(Debug)]
pub struct CpuConvPrimitive {
    desc: ConvPrimitiveDesc,
    src: Dim4,
    filter: Dim4,
    dst: Dim4,
    src_layout: CpuLayout,
    filter_layout: CpuLayout,
    bias_layout: CpuLayout,
    dst_layout: CpuLayout,
}

impl<T: DTypeOps> CpuDnn<T> {
    pub fn new() -> Self {
        Self::with_block_size(DEFAULT_BLOCK_SIZE)
    }

    pub fn with_block_size(block: usize) -> Self {
        assert!(block > 0, "Block size must be positive");
        CpuDnn {
            block: Some(block),
            stats: Cell::new(CpuDnnStats::default()),
            _marker: PhantomData,
        }
    }

    /// A library whose primitives use the plain layout for every operand.
    pub fn plain() -> Self {
        CpuDnn {
            block: None,
            stats: Cell::new(CpuDnnStats::default()),
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn stats(&self) -> CpuDnnStats {
        self.stats.get()
    }

    fn record<F: FnOnce(&mut CpuDnnStats)>(&self, f: F) {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }

    fn image_layout(&self, dims: Dim4) -> CpuLayout {
        match self.block {
            Some(block) => CpuLayout::ChannelBlocked { dims, block },
            None => CpuLayout::Plain(Dims::from(dims)),
        }
    }
}

fn output_extent(input: usize, kernel: usize, stride: usize, offset: isize) -> Option<usize> {
    let padded = input + 2 * offset.unsigned_abs();
    if stride == 0 || padded < kernel {
        None
    } else {
        Some((padded - kernel) / stride + 1)
    }
}

fn validate_desc(desc: &ConvPrimitiveDesc) -> DnnResult<(Dim4, Dim4, Dim4)> {
    match (desc.algorithm, desc.border) {
        (ConvAlgorithm::Direct, BorderType::Zeros) => {}
    }
    if desc.dimension != 4 {
        return Err(DnnError::UnsupportedDimension);
    }
    if desc.offsets.iter().any(|&o| o > 0) {
        return Err(DnnError::IncorrectInputParameter);
    }
    let src = from_dnn_sizes(desc.src_sizes);
    let filter = from_dnn_sizes(desc.filter_sizes);
    let dst = from_dnn_sizes(desc.dst_sizes);
    let [stride_w, stride_h] = desc.strides;
    let [offset_w, offset_h] = desc.offsets;
    let expected_h = output_extent(src.height(), filter.height(), stride_h, offset_h);
    let expected_w = output_extent(src.width(), filter.width(), stride_w, offset_w);
    if src.channels() != filter.channels()
        || dst.batch() != src.batch()
        || dst.channels() != filter.batch()
        || expected_h != Some(dst.height())
        || expected_w != Some(dst.width())
    {
        return Err(DnnError::IncorrectInputParameter);
    }
    Ok((src, filter, dst))
}

impl<T: DTypeOps> DnnLibrary for CpuDnn<T> {
    type DType = T;
    type Primitive = CpuConvPrimitive;
    type Layout = CpuLayout;

    fn create_conv_forward_bias(&self, desc: &ConvPrimitiveDesc) -> DnnResult<CpuConvPrimitive> {
        let (src, filter, dst) = validate_desc(desc)?;
        self.record(|s| s.primitives_created += 1);
        Ok(CpuConvPrimitive {
            desc: desc.clone(),
            src,
            filter,
            dst,
            src_layout: self.image_layout(src),
            filter_layout: CpuLayout::Plain(Dims::from(filter)),
            bias_layout: CpuLayout::Plain(Dims::from(filter.batch())),
            dst_layout: self.image_layout(dst),
        })
    }

    fn layout_from_primitive(&self, primitive: &CpuConvPrimitive, resource: ResourceType) -> DnnResult<CpuLayout> {
        Ok(match resource {
            ResourceType::Src => primitive.src_layout.clone(),
            ResourceType::Filter => primitive.filter_layout.clone(),
            ResourceType::Bias => primitive.bias_layout.clone(),
            ResourceType::Dst => primitive.dst_layout.clone(),
        })
    }

    #[inline]
    fn plain_layout(&self, dims: &Dims) -> CpuLayout {
        CpuLayout::Plain(dims.clone())
    }

    #[inline]
    fn layout_size(&self, layout: &CpuLayout) -> usize {
        layout.size()
    }

    fn convert(&self, from: &CpuLayout, src: &[T], to: &CpuLayout, dst: &mut [T]) -> DnnResult<()> {
        self.record(|s| s.conversions += 1);
        layout::convert(from, src, to, dst)
    }

    fn execute(&self, primitive: &CpuConvPrimitive, resources: &mut ResourceBindings<'_, T>) -> DnnResult<()> {
        let src = resources.input(ResourceType::Src)?;
        let filter = resources.input(ResourceType::Filter)?;
        let bias = resources.input(ResourceType::Bias)?;
        let dst = resources.dst()?;
        if src.len() != primitive.src_layout.size()
            || filter.len() != primitive.filter_layout.size()
            || bias.len() != primitive.bias_layout.size()
            || dst.len() != primitive.dst_layout.size()
        {
            return Err(DnnError::IncorrectInputParameter);
        }
        conv_forward(primitive, src, filter, bias, dst);
        self.record(|s| s.executions += 1);
        Ok(())
    }
}

/// Direct convolution lowered to one GEMM per image: `dst = filter * im2col(src) + bias`.
fn conv_forward<T: DTypeOps>(p: &CpuConvPrimitive, src: &[T], filter: &[T], bias: &[T], dst: &mut [T]) {
    let Dim4(n, c, h, w) = p.src;
    let Dim4(m, _, kh, kw) = p.filter;
    let Dim4(_, _, oh, ow) = p.dst;
    let [stride_w, stride_h] = p.desc.strides;
    let [offset_w, offset_h] = p.desc.offsets;
    let k = c * kh * kw;
    let pixels = oh * ow;

    let weights: Cow<[T]> = match &p.filter_layout {
        CpuLayout::Plain(_) => Cow::Borrowed(filter),
        layout => {
            let mut weights = Vec::with_capacity(m * k);
            for mi in 0..m {
                for ci in 0..c {
                    for ki in 0..kh {
                        for kj in 0..kw {
                            weights.push(filter[layout.offset4(mi, ci, ki, kj)]);
                        }
                    }
                }
            }
            Cow::Owned(weights)
        }
    };

    let mut cols = vec![T::ZERO; k * pixels];
    let mut out = vec![T::ZERO; m * pixels];
    for ni in 0..n {
        for ci in 0..c {
            for ki in 0..kh {
                for kj in 0..kw {
                    let row = &mut cols[((ci * kh + ki) * kw + kj) * pixels..][..pixels];
                    for oy in 0..oh {
                        let iy = (oy * stride_h + ki) as isize + offset_h;
                        for ox in 0..ow {
                            let ix = (ox * stride_w + kj) as isize + offset_w;
                            row[oy * ow + ox] = if iy < 0 || ix < 0 || iy as usize >= h || ix as usize >= w {
                                T::ZERO
                            } else {
                                src[p.src_layout.offset4(ni, ci, iy as usize, ix as usize)]
                            };
                        }
                    }
                }
            }
        }
        T::matrix_multiply(m, k, pixels, T::ONE, &weights, &cols, T::ZERO, &mut out);
        for mi in 0..m {
            for oy in 0..oh {
                for ox in 0..ow {
                    dst[p.dst_layout.offset4(ni, mi, oy, ox)] = out[mi * pixels + oy * ow + ox] + bias[mi];
                }
            }
        }
    }
}

impl<T: DTypeOps> Default for CpuDnn<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DTypeOps> Debug for CpuDnn<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuDnn")
            .field("block", &self.block)
            .field("stats", &self.stats.get())
            .finish()
    }
}
