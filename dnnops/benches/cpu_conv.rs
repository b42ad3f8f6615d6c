#[macro_use]
extern crate bencher;

use bencher::Bencher;
use dnnops::dnn::DnnMemory;
use dnnops::dnn::cpu::CpuDnn;
use dnnops::op::{ConvInputs, ConvOp, ConvParamsBuilder, Operator};
use dnnops::util::bench::*;

macro_rules! impl_bench {
    ($name:ident, $ty:ty, $lib:expr, $batch:literal, $size:expr) => {
        fn $name(bench: &mut Bencher) {
            let lib: CpuDnn<$ty> = $lib;
            let params = ConvParamsBuilder::default().kernel(3).pad(1).build().unwrap();
            let mut op = ConvOp::new(params).unwrap();
            let [x, filter, bias] = get_conv_tensors::<$ty>($batch, 8, $size);
            let x = DnnMemory::from_tensor(&lib, &x);
            let filter = DnnMemory::from_tensor(&lib, &filter);
            let bias = DnnMemory::from_tensor(&lib, &bias);
            let mut y = DnnMemory::new(&lib, 0);
            let inputs = ConvInputs { x: &x, filter: &filter, bias: &bias };
            // first run builds the primitive, the loop measures the cached path
            op.run(&lib, inputs, &mut y).unwrap();
            bench.iter(|| op.run(&lib, inputs, &mut y).unwrap())
        }
    };
}

impl_bench!(conv_f32_lg, f32, CpuDnn::new(), 4, SIZE_LG);
impl_bench!(conv_f32_md, f32, CpuDnn::new(), 4, SIZE_MD);
impl_bench!(conv_f32_sm, f32, CpuDnn::new(), 4, SIZE_SM);
impl_bench!(conv_f32_plain_md, f32, CpuDnn::plain(), 4, SIZE_MD);
benchmark_group!(conv_f32, conv_f32_lg, conv_f32_md, conv_f32_sm, conv_f32_plain_md);

impl_bench!(conv_f64_md, f64, CpuDnn::new(), 4, SIZE_MD);
impl_bench!(conv_f64_sm, f64, CpuDnn::new(), 4, SIZE_SM);
benchmark_group!(conv_f64, conv_f64_md, conv_f64_sm);

benchmark_main!(conv_f32, conv_f64);
