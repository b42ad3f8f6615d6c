use crate::error::{Error, Result};
use crate::tensor::{Dim4, Dims};
use derive_builder::Builder;
use std::fmt::{Display, Formatter};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StorageOrder {
    /// Batch, channel, height, width.
    #[default]
    NCHW,
    /// Batch, height, width, channel.
    NHWC,
}

impl Display for StorageOrder {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            StorageOrder::NCHW => "NCHW",
            StorageOrder::NHWC => "NHWC",
        })
    }
}

/// Geometry shared by convolution and pooling style operators.
///
/// ```
/// use dnnops::op::ConvParamsBuilder;
///
/// let params = ConvParamsBuilder::default().kernel(3).pad(1).build().unwrap();
/// assert_eq!((3, 3), (params.kernel_h, params.kernel_w));
/// assert_eq!(1, params.stride_h);
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Hash, Builder)]
#[builder(build_fn(validate = "Self::validate"))]
#[cfg_attr(feature = "serde", builder(derive(serde::Deserialize)))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConvParams {
    pub kernel_h: usize,
    pub kernel_w: usize,
    #[builder(default = "1")]
    pub stride_h: usize,
    #[builder(default = "1")]
    pub stride_w: usize,
    #[builder(default)]
    pub pad_t: usize,
    #[builder(default)]
    pub pad_l: usize,
    #[builder(default)]
    pub pad_b: usize,
    #[builder(default)]
    pub pad_r: usize,
    #[builder(default = "1")]
    pub dilation_h: usize,
    #[builder(default = "1")]
    pub dilation_w: usize,
    #[builder(default = "1")]
    pub group: usize,
    #[builder(default)]
    pub order: StorageOrder,
}

impl ConvParamsBuilder {
    pub fn kernel(&mut self, size: usize) -> &mut Self {
        self.kernel_h = Some(size);
        self.kernel_w = Some(size);
        self
    }

    pub fn stride(&mut self, stride: usize) -> &mut Self {
        self.stride_h = Some(stride);
        self.stride_w = Some(stride);
        self
    }

    pub fn pad(&mut self, pad: usize) -> &mut Self {
        self.pad_t = Some(pad);
        self.pad_l = Some(pad);
        self.pad_b = Some(pad);
        self.pad_r = Some(pad);
        self
    }

    fn validate(&self) -> std::result::Result<(), String> {
        check_positive([
            ("kernel_h", self.kernel_h),
            ("kernel_w", self.kernel_w),
            ("stride_h", self.stride_h),
            ("stride_w", self.stride_w),
            ("dilation_h", self.dilation_h),
            ("dilation_w", self.dilation_w),
            ("group", self.group),
        ])
    }
}

/// Unset fields are skipped, the builder reports them separately.
fn check_positive<const N: usize>(fields: [(&str, Option<usize>); N]) -> std::result::Result<(), String> {
    match fields.iter().find(|(_, value)| *value == Some(0)) {
        Some((name, _)) => Err(format!("{name} must be positive")),
        None => Ok(()),
    }
}

impl ConvParams {
    /// Loads parameters from JSON. Missing optional fields take their builder defaults.
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self> {
        let builder: ConvParamsBuilder = serde_json::from_str(json)?;
        Ok(builder.build()?)
    }

    /// Applies the builder's checks to parameters assembled by hand.
    pub fn validate(&self) -> Result<()> {
        check_positive([
            ("kernel_h", Some(self.kernel_h)),
            ("kernel_w", Some(self.kernel_w)),
            ("stride_h", Some(self.stride_h)),
            ("stride_w", Some(self.stride_w)),
            ("dilation_h", Some(self.dilation_h)),
            ("dilation_w", Some(self.dilation_w)),
            ("group", Some(self.group)),
        ])
        .map_err(|msg| Error::InvalidParams(msg.into()))
    }

    #[inline]
    pub fn kernel_extent_h(&self) -> usize {
        self.dilation_h * self.kernel_h.saturating_sub(1) + 1
    }

    #[inline]
    pub fn kernel_extent_w(&self) -> usize {
        self.dilation_w * self.kernel_w.saturating_sub(1) + 1
    }

    /// Output shape for a rank 4 `input` producing `output_channels` channels, laid out in
    /// the configured storage order.
    pub fn output_dims(&self, input: &Dims, output_channels: usize) -> Result<Dims> {
        let Some(Dim4(n, a, b, c)) = input.as_dim4() else {
            return Err(Error::InvalidRank {
                tensor: "input",
                expected: 4,
                actual: input.ndim(),
                dims: input.clone(),
            });
        };
        let (h, w) = match self.order {
            StorageOrder::NCHW => (b, c),
            StorageOrder::NHWC => (a, b),
        };
        let out_h = output_extent("height", h, self.pad_t + self.pad_b, self.kernel_extent_h(), self.stride_h)?;
        let out_w = output_extent("width", w, self.pad_l + self.pad_r, self.kernel_extent_w(), self.stride_w)?;
        Ok(match self.order {
            StorageOrder::NCHW => Dims::from(Dim4(n, output_channels, out_h, out_w)),
            StorageOrder::NHWC => Dims::from(Dim4(n, out_h, out_w, output_channels)),
        })
    }
}

fn output_extent(axis: &'static str, input: usize, pad: usize, kernel: usize, stride: usize) -> Result<usize> {
    if stride == 0 {
        return Err(Error::InvalidParams(format!("stride along {axis} must be positive").into()));
    }
    let padded = input + pad;
    if padded < kernel {
        return Err(Error::InvalidOutputSize {
            axis,
            input: padded,
            kernel,
        });
    }
    Ok((padded - kernel) / stride + 1)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let params = ConvParamsBuilder::default().kernel_h(3).kernel_w(2).build().unwrap();
        assert_eq!(
            ConvParams {
                kernel_h: 3,
                kernel_w: 2,
                stride_h: 1,
                stride_w: 1,
                pad_t: 0,
                pad_l: 0,
                pad_b: 0,
                pad_r: 0,
                dilation_h: 1,
                dilation_w: 1,
                group: 1,
                order: StorageOrder::NCHW,
            },
            params
        );
    }

    #[test]
    fn test_builder_validation() {
        assert!(ConvParamsBuilder::default().build().is_err());
        assert!(ConvParamsBuilder::default().kernel(3).stride(0).build().is_err());
        let err = ConvParamsBuilder::default().kernel(0).build().unwrap_err();
        assert!(err.to_string().contains("kernel_h must be positive"), "{err}");
    }

    #[test]
    fn test_output_dims() {
        let params = ConvParamsBuilder::default().kernel(3).pad(1).build().unwrap();
        assert_eq!(Dims::from([2, 8, 5, 7]), params.output_dims(&Dims::from([2, 3, 5, 7]), 8).unwrap());

        let params = ConvParamsBuilder::default().kernel(3).stride(2).build().unwrap();
        assert_eq!(Dims::from([1, 4, 4, 3]), params.output_dims(&Dims::from([1, 2, 9, 8]), 4).unwrap());

        let params = ConvParamsBuilder::default()
            .kernel(3)
            .dilation_h(2)
            .order(StorageOrder::NHWC)
            .build()
            .unwrap();
        assert_eq!(Dims::from([1, 6, 8, 5]), params.output_dims(&Dims::from([1, 10, 10, 3]), 5).unwrap());
    }

    #[test]
    fn test_output_dims_errors() {
        let params = ConvParamsBuilder::default().kernel(5).build().unwrap();
        assert!(matches!(
            params.output_dims(&Dims::from([1, 3, 4]), 1),
            Err(Error::InvalidRank { expected: 4, actual: 3, .. })
        ));
        assert!(matches!(
            params.output_dims(&Dims::from([1, 1, 4, 8]), 1),
            Err(Error::InvalidOutputSize {
                axis: "height",
                input: 4,
                kernel: 5
            })
        ));
    }

    #[test]
    fn test_zero_stride_is_rejected() {
        let mut params = ConvParamsBuilder::default().kernel(3).build().unwrap();
        params.stride_w = 0;
        let err = params.validate().unwrap_err();
        assert!(err.to_string().contains("stride_w must be positive"), "{err}");
        assert!(matches!(
            params.output_dims(&Dims::from([1, 1, 5, 5]), 1),
            Err(Error::InvalidParams(_))
        ));

        params.stride_w = 1;
        params.kernel_h = 0;
        assert!(matches!(params.validate(), Err(Error::InvalidParams(_))));
        params.kernel_h = 3;
        assert!(params.validate().is_ok());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_from_json() {
        let params = ConvParams::from_json(r#"{"kernel_h": 3, "kernel_w": 3, "pad_t": 1, "pad_b": 1}"#).unwrap();
        assert_eq!(1, params.pad_t);
        assert_eq!(0, params.pad_l);
        assert_eq!(StorageOrder::NCHW, params.order);
        assert!(matches!(
            ConvParams::from_json(r#"{"kernel_h": 3, "kernel_w": 3, "group": 0}"#),
            Err(Error::InvalidParams(_))
        ));
        assert!(matches!(ConvParams::from_json("{"), Err(Error::Json(_))));
    }
}
