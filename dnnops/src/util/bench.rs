use crate::tensor::{Dim4, Dims, Tensor};
use rand::SeedableRng;
use rand::prelude::Distribution;
use rand::rngs::StdRng;
use rand_distr::StandardNormal;

pub const SIZE_LG: usize = 64;
pub const SIZE_MD: usize = 32;
pub const SIZE_SM: usize = 8;
const SEED: u64 = 0x8371943;

/// Random `(input, filter, bias)` for a square `size x size` image with `channels` input and
/// output channels and a 3x3 kernel.
pub fn get_conv_tensors<T>(batch: usize, channels: usize, size: usize) -> [Tensor<T>; 3]
where
    StandardNormal: Distribution<T>,
{
    let mut rng = StdRng::seed_from_u64(SEED);
    [
        Tensor::from_distribution(&mut rng, StandardNormal, Dim4(batch, channels, size, size)),
        Tensor::from_distribution(&mut rng, StandardNormal, Dim4(channels, channels, 3, 3)),
        Tensor::from_distribution(&mut rng, StandardNormal, Dims::from(channels)),
    ]
}
