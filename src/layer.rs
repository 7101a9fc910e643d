//! # Layer trait - 外部执行引擎的统一层接口
//!
//! 本 crate 不包含网络图执行引擎。引擎作为外部协作方，通过这个
//! 窄接口驱动层的前向/反向传播，并在训练和评估阶段之间切换模式。
//!
//! 约定：`backward` 必须与同一输入上的 `forward` 成对调用，
//! 两次 `forward` 之间不能插入未消费的 `backward`（层内部缓存的
//! 掩码等状态会被下一次 `forward` 覆盖）。

use ndarray::Array2;

pub trait Layer {
    fn layer_type(&self) -> &str;

    fn forward(&mut self, input: &Array2<f32>) -> Array2<f32>;

    fn backward(&mut self, grads: &Array2<f32>, lr: f32) -> Array2<f32>;

    fn parameters(&self) -> usize;

    fn set_training_mode(&mut self, _training: bool) {}
}
