//! 2D convolution with bias on top of an accelerated library primitive.
//!
//! The primitive and the layouts it expects are built lazily on the first call and reused for
//! as long as the input and filter shapes stay the same.

use crate::dnn::{
    BorderType, ConvAlgorithm, ConvPrimitiveDesc, DnnLibrary, DnnMemory, ResourceBindings, ResourceType, dnn_sizes,
    wrap_dnn_error,
};
use crate::error::{Error, Result};
use crate::op::{ConvParams, Operator, StorageOrder};
use crate::tensor::{Dim4, Dims};
use std::rc::Rc;
use tracing::{debug, trace};

/// Operands of a convolution: input `(N, C, H, W)`, filter `(M, C, KH, KW)` and bias `(M)`.
#[derive(Debug)]
pub struct ConvInputs<'a, L: DnnLibrary> {
    pub x: &'a DnnMemory<L>,
    pub filter: &'a DnnMemory<L>,
    pub bias: &'a DnnMemory<L>,
}

impl<'a, L: DnnLibrary> Clone for ConvInputs<'a, L> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, L: DnnLibrary> Copy for ConvInputs<'a, L> {}

/// Forward convolution with bias for channel-first inputs.
///
/// The cached primitive and its layouts are rebuilt by [`ConvOp::run_nchw`] whenever the input or
/// filter shape changes. The operator holds `Rc` handles and is therefore `!Send`: one thread owns
/// it and is the only writer of its cache.
#[derive(Debug)]
pub struct ConvOp<L: DnnLibrary> {
    params: ConvParams,
    cache: Option<ConvCache<L>>,
}

/// Everything derived from one `(input dims, filter dims)` pair.
#[derive(Debug)]
struct ConvCache<L: DnnLibrary> {
    input_dims: Dims,
    filter_dims: Dims,
    output_dims: Dims,
    primitive: Rc<L::Primitive>,
    src_layout: L::Layout,
    filter_layout: L::Layout,
    bias_layout: L::Layout,
    /// Scratch destination in the primitive's dst layout.
    buffer: DnnMemory<L>,
}

impl<L: DnnLibrary> ConvCache<L> {
    #[inline]
    fn is_valid_for(&self, input: &Dims, filter: &Dims) -> bool {
        self.input_dims == *input && self.filter_dims == *filter
    }
}

impl<L: DnnLibrary> ConvOp<L> {
    pub fn new(params: ConvParams) -> Result<Self> {
        params.validate()?;
        let unsupported = if params.dilation_h != 1 || params.dilation_w != 1 {
            Some("dilated convolution")
        } else if params.pad_l != params.pad_r || params.pad_t != params.pad_b {
            Some("asymmetric padding")
        } else if params.order != StorageOrder::NCHW {
            Some("channel-last storage order")
        } else if params.group != 1 {
            Some("grouped convolution")
        } else {
            None
        };
        if let Some(feature) = unsupported {
            debug!(?params, feature, "rejecting convolution parameters");
            return Err(Error::Unsupported(feature));
        }
        Ok(ConvOp { params, cache: None })
    }

    #[inline]
    pub fn params(&self) -> &ConvParams {
        &self.params
    }

    /// Output dims of the current cached primitive, if any.
    pub fn cached_output_dims(&self) -> Option<&Dims> {
        self.cache.as_ref().map(|cache| &cache.output_dims)
    }

    pub fn run_nchw(&mut self, lib: &L, inputs: ConvInputs<'_, L>, y: &mut DnnMemory<L>) -> Result<()> {
        let ConvInputs { x, filter, bias } = inputs;
        let x_dims = rank4("input", x.dims())?;
        let filter_dims = rank4("filter", filter.dims())?;
        check_bias(bias.dims(), filter_dims.batch())?;

        let cache = match self.cache.take() {
            Some(cache) if cache.is_valid_for(x.dims(), filter.dims()) => cache,
            _ => Self::build_cache(&self.params, lib, x_dims, filter_dims, y)?,
        };
        let cache = self.cache.insert(cache);
        if *y.dims() != cache.output_dims {
            trace!(from = %y.dims(), to = %cache.output_dims, "resetting output to cached output dims");
            y.reset(lib, cache.output_dims.clone(), cache.buffer.layout().clone());
        }

        cache.buffer.share_from(lib, y);
        let src = x.view(lib, &cache.src_layout)?;
        let weights = filter.view(lib, &cache.filter_layout)?;
        let bias = bias.view(lib, &cache.bias_layout)?;
        {
            let mut dst = cache.buffer.buffer_mut()?;
            let mut resources = ResourceBindings::new();
            resources.bind(ResourceType::Src, &src[..])?;
            resources.bind(ResourceType::Filter, &weights[..])?;
            resources.bind(ResourceType::Bias, &bias[..])?;
            resources.bind_dst(&mut dst[..]);
            wrap_dnn_error!(
                lib.execute(&cache.primitive, &mut resources),
                "Failed to execute convolution primitive"
            )?;
        }
        cache.buffer.copy_to(lib, y)
    }

    pub fn run_nhwc(&mut self, _lib: &L, _inputs: ConvInputs<'_, L>, _y: &mut DnnMemory<L>) -> Result<()> {
        Err(Error::NotImplemented("channel-last convolution"))
    }

    fn build_cache(
        params: &ConvParams,
        lib: &L,
        x: Dim4,
        filter: Dim4,
        y: &mut DnnMemory<L>,
    ) -> Result<ConvCache<L>> {
        let Dim4(n, c, _, _) = x;
        let Dim4(m, filter_c, kh, kw) = filter;
        Error::shape_mismatch("filter input channels", c, filter_c)?;
        Error::shape_mismatch("filter kernel height", params.kernel_h, kh)?;
        Error::shape_mismatch("filter kernel width", params.kernel_w, kw)?;

        let output_dims = params.output_dims(&Dims::from(x), m)?;
        let dst = Dim4(n, m, output_dims.dim(2), output_dims.dim(3));
        let desc = ConvPrimitiveDesc {
            algorithm: ConvAlgorithm::Direct,
            dimension: 4,
            src_sizes: dnn_sizes(x),
            dst_sizes: dnn_sizes(dst),
            filter_sizes: dnn_sizes(filter),
            strides: [params.stride_w, params.stride_h],
            offsets: [-(params.pad_l as isize), -(params.pad_t as isize)],
            border: BorderType::Zeros,
        };
        debug!(input = %Dims::from(x), filter = %Dims::from(filter), output = %output_dims, "building convolution primitive");
        let primitive = wrap_dnn_error!(
            lib.create_conv_forward_bias(&desc),
            "Failed to create convolution primitive"
        )?;
        let layout = |resource: ResourceType| {
            wrap_dnn_error!(
                lib.layout_from_primitive(&primitive, resource),
                "Failed to get {:?} layout from primitive",
                resource
            )
        };
        let src_layout = layout(ResourceType::Src)?;
        let filter_layout = layout(ResourceType::Filter)?;
        let bias_layout = layout(ResourceType::Bias)?;
        let dst_layout = layout(ResourceType::Dst)?;

        y.reset(lib, output_dims.clone(), dst_layout.clone());
        let buffer = DnnMemory::with_layout(lib, output_dims.clone(), dst_layout);
        Ok(ConvCache {
            input_dims: Dims::from(x),
            filter_dims: Dims::from(filter),
            output_dims,
            primitive: Rc::new(primitive),
            src_layout,
            filter_layout,
            bias_layout,
            buffer,
        })
    }
}

fn check_bias(bias: &Dims, output_channels: usize) -> Result<()> {
    if bias.ndim() != 1 {
        return Err(Error::InvalidRank {
            tensor: "bias",
            expected: 1,
            actual: bias.ndim(),
            dims: bias.clone(),
        });
    }
    Error::shape_mismatch("bias length", output_channels, bias.dim(0))
}

fn rank4(tensor: &'static str, dims: &Dims) -> Result<Dim4> {
    dims.as_dim4().ok_or_else(|| Error::InvalidRank {
        tensor,
        expected: 4,
        actual: dims.ndim(),
        dims: dims.clone(),
    })
}

impl<L: DnnLibrary> Operator for ConvOp<L> {
    const NAME: &'static str = "Conv";

    type Context = L;
    type Inputs<'a>
        = ConvInputs<'a, L>
    where
        Self: 'a;
    type Output = DnnMemory<L>;

    fn run(&mut self, ctx: &L, inputs: ConvInputs<'_, L>, output: &mut DnnMemory<L>) -> Result<()> {
        match self.params.order {
            StorageOrder::NCHW => self.run_nchw(ctx, inputs, output),
            StorageOrder::NHWC => self.run_nhwc(ctx, inputs, output),
        }
    }
}
