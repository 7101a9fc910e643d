//! # Alpha-Dropout 正则化层
//!
//! Alpha-Dropout 是为 SELU 自归一化网络设计的 dropout 变体。
//!
//! ## 核心思想
//!
//! **训练时**：以概率 `ratio` 把神经元替换为固定常数 `alpha_dash`，
//! 再做仿射校正 `a * x + b`，保持输出的均值和方差不变
//! **推理时**：恒等变换，输入原样通过
//!
//! ## 为什么不能直接置零？
//!
//! SELU 网络依赖"激活值均值 0、方差 1"的自归一化性质。普通 Dropout
//! 把神经元置零会拉偏这个分布，逐层累积后自归一化就失效了。
//! Alpha-Dropout 的做法：
//!
//! 1. **替换而非置零**：被丢弃的单元设为 SELU 的负饱和值
//!    `alpha_dash = -alpha * lambda`（对应输入趋于负无穷的极限）
//! 2. **仿射校正**：对替换后的结果做 `a * x + b`，系数由 `ratio`
//!    和 `alpha_dash` 推出，恰好抵消替换造成的均值/方差漂移：
//!
//! ```text
//! a = ((1 - ratio) * (1 + ratio * alpha_dash²))^(-1/2)
//! b = -a * alpha_dash * ratio
//! ```
//!
//! ## 前向/反向的掩码配对
//!
//! 前向传播采样的 0/1 掩码会被缓存，反向传播必须复用同一个掩码：
//! 被丢弃的单元输出是与输入无关的常数，梯度为 0；保留的单元梯度
//! 只经过缩放系数 `a`（偏置 `b` 不产生梯度）：
//!
//! ```text
//! grad_input = grad_output * a * mask
//! ```
//!
//! 这是一个严格串行的生产者/消费者契约：一次 `forward` 配一次
//! `backward`，中间再插入 `forward` 会覆盖掩码，梯度随之失配。
//! 并发场景下每个执行流需要持有自己的层实例。
//!
//! ## 示例
//!
//! ```text
//! ratio = 0.5, alpha_dash = -1.758
//! 输入:  [[1.0, 2.0],        掩码: [[1, 0],
//!         [3.0, 4.0]]               [0, 1]]
//!
//! 替换:  [[1.0,   -1.758],
//!         [-1.758, 4.0  ]]
//!
//! 输出:  a * 替换结果 + b
//! 反向 (gy 全 1): [[a, 0],
//!                  [0, a]]
//! ```

use ndarray::Array2;
use rand::Rng;
use rand_distr::{Bernoulli, Distribution};

use crate::layer::Layer;
use crate::{DEFAULT_ALPHA_DASH, DEFAULT_RATIO};

/// **Alpha-Dropout 正则化层**
///
/// `ratio`、`alpha_dash`、`a`、`b` 之间存在不变量：`a`、`b` 永远
/// 由当前的 `ratio` 和 `alpha_dash` 推出。所以字段不直接暴露，
/// 只能通过构造函数和 [`AlphaDropout::set_ratio`] 修改，两个系数
/// 在同一次调用里原子地重算。
pub struct AlphaDropout {
    /// **丢弃率**: [0, 1)，神经元被替换为 alpha_dash 的概率
    ratio: f32,

    /// **替换常数**: 被丢弃单元的固定取值，默认为 SELU 负饱和值
    /// 构造后不可变（没有 setter，避免绕过 a/b 的重算路径）
    alpha_dash: f32,

    /// **仿射缩放系数 a**: 由 ratio/alpha_dash 推出，外部只读
    a: f32,

    /// **仿射偏置系数 b**: 由 ratio/alpha_dash 推出，外部只读
    b: f32,

    /// **推理模式标志**
    /// - true: 推理模式，层退化为恒等变换
    /// - false: 训练模式，执行掩码替换和仿射校正
    deterministic: bool,

    // ========== 单次调用的瞬态缓存（每次 forward 覆盖） ==========

    /// **掩码矩阵**: 0/1 矩阵，1表示保留，0表示丢弃
    /// 在前向传播时生成，反向传播时复用
    mask: Option<Array2<f32>>,

    /// **缓存输入**: 最近一次 forward 的输入
    cached_input: Option<Array2<f32>>,

    /// **缓存输出**: 最近一次 forward 的输出
    cached_output: Option<Array2<f32>>,

    /// **梯度缓冲**: 最近一次 backward 算出的输入梯度，
    /// 供拉取式引擎通过 delta() 读取
    delta: Option<Array2<f32>>,
}

impl AlphaDropout {
    /// **创建 Alpha-Dropout 层（使用默认 alpha_dash）**
    ///
    /// # 参数
    /// - `ratio`: 丢弃率，必须落在 [0, 1) 区间
    ///
    /// # 错误
    /// `ratio` 越界时返回 `Err`。ratio = 1 会让系数 a 的公式除零，
    /// 所以区间右端是开的；越界值被拒绝而不是截断，避免悄悄带着
    /// 数值非法的 a/b 继续训练。
    pub fn new(ratio: f32) -> Result<Self, String> {
        Self::with_alpha_dash(ratio, DEFAULT_ALPHA_DASH)
    }

    /// **创建 Alpha-Dropout 层（自定义 alpha_dash）**
    ///
    /// # 参数
    /// - `ratio`: 丢弃率，必须落在 [0, 1) 区间
    /// - `alpha_dash`: 替换常数，构造后不可变
    pub fn with_alpha_dash(ratio: f32, alpha_dash: f32) -> Result<Self, String> {
        if !(0.0..1.0).contains(&ratio) {
            return Err(format!(
                "AlphaDropout: ratio 必须在 [0, 1) 区间内，当前值为 {}",
                ratio
            ));
        }

        let mut layer = AlphaDropout {
            ratio,
            alpha_dash,
            a: 0.0,
            b: 0.0,
            deterministic: false, // 默认训练模式
            mask: None,
            cached_input: None,
            cached_output: None,
            delta: None,
        };
        layer.recompute_affine();
        Ok(layer)
    }

    /// **重算仿射系数**
    ///
    /// a/b 的唯一写入点。构造和 set_ratio 都走这里，保证两个系数
    /// 始终与当前的 ratio/alpha_dash 一致。
    fn recompute_affine(&mut self) {
        self.a = ((1.0 - self.ratio) * (1.0 + self.ratio * self.alpha_dash.powi(2))).powf(-0.5);
        self.b = -self.a * self.alpha_dash * self.ratio;
    }

    /// **修改丢弃率**
    ///
    /// a 和 b 依赖 ratio，所以在同一次调用里一并重算。
    /// 这是构造之后 a/b 变化的唯一路径。
    ///
    /// # 错误
    /// 新值越界时返回 `Err`，层状态（包括旧的 a/b）保持不变。
    pub fn set_ratio(&mut self, r: f32) -> Result<(), String> {
        if !(0.0..1.0).contains(&r) {
            return Err(format!(
                "AlphaDropout: ratio 必须在 [0, 1) 区间内，当前值为 {}",
                r
            ));
        }
        self.ratio = r;
        self.recompute_affine();
        Ok(())
    }

    /// **生成随机掩码**
    ///
    /// 对输入的每个元素做一次独立的 Bernoulli(1 - ratio) 采样：
    /// - 1: 保留该神经元（概率 = 1 - ratio）
    /// - 0: 丢弃该神经元（概率 = ratio）
    fn create_mask(&self, shape: (usize, usize)) -> Array2<f32> {
        let mut rng = rand::rng();

        match Bernoulli::new(f64::from(1.0 - self.ratio)) {
            Ok(keep) => Array2::from_shape_fn(shape, |_| {
                if keep.sample(&mut rng) { 1.0 } else { 0.0 }
            }),
            Err(_) => {
                // ratio 在构造时已校验，正常情况下到不了这里
                log::warn!("AlphaDropout: Bernoulli 分布构造失败，改用均匀采样");
                Array2::from_shape_fn(shape, |_| {
                    if rng.random::<f32>() > self.ratio {
                        1.0
                    } else {
                        0.0
                    }
                })
            }
        }
    }

    /// **使用指定掩码执行前向传播**
    ///
    /// 训练前向的确定性内核：调用方提供掩码，本方法只做替换和
    /// 仿射校正。随机性被隔离在 `create_mask` 里，测试可以直接
    /// 注入固定掩码来验证数值，掩码的生产者/消费者关系也因此
    /// 显式化（传入的掩码就是之后 backward 要消费的那一个）。
    ///
    /// # 错误
    /// 掩码形状与输入不一致时返回 `Err`，层状态不变。
    pub fn forward_with_mask(
        &mut self,
        input: &Array2<f32>,
        mask: Array2<f32>,
    ) -> Result<Array2<f32>, String> {
        if mask.dim() != input.dim() {
            return Err(format!(
                "AlphaDropout: 掩码形状 {:?} 与输入形状 {:?} 不匹配",
                mask.dim(),
                input.dim()
            ));
        }
        Ok(self.apply_mask(input, mask))
    }

    /// **替换 + 仿射校正**
    ///
    /// ```text
    /// substituted = input * mask + alpha_dash * (1 - mask)
    /// output      = a * substituted + b
    /// ```
    ///
    /// 副作用：覆盖 mask、cached_input、cached_output。
    fn apply_mask(&mut self, input: &Array2<f32>, mask: Array2<f32>) -> Array2<f32> {
        let inverted = mask.mapv(|m| 1.0 - m);
        let substituted = input * &mask + &inverted * self.alpha_dash;
        let output = substituted.mapv(|x| self.a * x + self.b);

        self.mask = Some(mask);
        self.cached_input = Some(input.clone());
        self.cached_output = Some(output.clone());

        output
    }

    /// **带前置条件检查的反向传播**
    ///
    /// ```text
    /// grad_input = grad_output * a * mask
    /// ```
    ///
    /// 被丢弃的单元输出是常数，梯度为 0；保留的单元只乘缩放系数 a
    /// （偏置 b 对输入没有梯度）。
    ///
    /// # 前置条件
    /// 必须先在训练模式下对同形状的输入执行过 forward。缺少掩码或
    /// 形状失配都会返回 `Err` 并指明缺失/失配的状态，而不是静默
    /// 产出错误的梯度。
    ///
    /// 副作用：成功时把输入梯度写入 delta 缓冲。
    pub fn try_backward(&mut self, grads: &Array2<f32>) -> Result<Array2<f32>, String> {
        let mask = self.mask.as_ref().ok_or_else(|| {
            "AlphaDropout: backward 缺少掩码，必须先在训练模式下执行 forward".to_string()
        })?;

        if mask.dim() != grads.dim() {
            return Err(format!(
                "AlphaDropout: 上游梯度形状 {:?} 与缓存掩码形状 {:?} 不匹配",
                grads.dim(),
                mask.dim()
            ));
        }

        let grad_input = grads * mask * self.a;
        self.delta = Some(grad_input.clone());
        Ok(grad_input)
    }

    // ========== 只读访问器 ==========

    /// 丢弃率
    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    /// 替换常数 alpha_dash
    pub fn alpha_dash(&self) -> f32 {
        self.alpha_dash
    }

    /// 仿射缩放系数 a
    pub fn a(&self) -> f32 {
        self.a
    }

    /// 仿射偏置系数 b
    pub fn b(&self) -> f32 {
        self.b
    }

    /// 是否处于推理模式
    pub fn deterministic(&self) -> bool {
        self.deterministic
    }

    /// 切换训练/推理模式（true = 推理，层退化为恒等变换）
    pub fn set_deterministic(&mut self, deterministic: bool) {
        self.deterministic = deterministic;
    }

    /// 最近一次训练前向采样的掩码（推理前向不更新）
    pub fn mask(&self) -> Option<&Array2<f32>> {
        self.mask.as_ref()
    }

    /// 最近一次 backward 写入的输入梯度，供拉取式引擎读取
    pub fn delta(&self) -> Option<&Array2<f32>> {
        self.delta.as_ref()
    }

    /// 最近一次 forward 的输入
    pub fn cached_input(&self) -> Option<&Array2<f32>> {
        self.cached_input.as_ref()
    }

    /// 最近一次 forward 的输出
    pub fn cached_output(&self) -> Option<&Array2<f32>> {
        self.cached_output.as_ref()
    }

    /// **序列化专用的内部构造函数**
    ///
    /// 反序列化时 a/b 从归档原样恢复而非重算，所以不能走公开
    /// 构造函数；ratio 的区间校验仍由调用方（model_serialization）
    /// 负责。瞬态缓存不属于层的身份，恢复为空。
    pub(crate) fn from_parts(
        ratio: f32,
        alpha_dash: f32,
        a: f32,
        b: f32,
        deterministic: bool,
    ) -> Self {
        AlphaDropout {
            ratio,
            alpha_dash,
            a,
            b,
            deterministic,
            mask: None,
            cached_input: None,
            cached_output: None,
            delta: None,
        }
    }
}

impl Default for AlphaDropout {
    fn default() -> Self {
        // DEFAULT_RATIO 恒在合法区间内
        Self::new(DEFAULT_RATIO).expect("默认 ratio 必须合法")
    }
}

impl Layer for AlphaDropout {
    fn layer_type(&self) -> &str {
        "AlphaDropout"
    }

    fn forward(&mut self, input: &Array2<f32>) -> Array2<f32> {
        if self.deterministic {
            // 推理模式：恒等变换，不采样掩码、不做仿射校正
            self.cached_input = Some(input.clone());
            self.cached_output = Some(input.clone());
            input.clone()
        } else {
            let mask = self.create_mask(input.dim());
            self.apply_mask(input, mask)
        }
    }

    fn backward(&mut self, grads: &Array2<f32>, _lr: f32) -> Array2<f32> {
        // 引擎接口没有错误通道：前置条件被破坏时带着诊断信息中止，
        // 而不是返回错误的梯度
        match self.try_backward(grads) {
            Ok(grad_input) => grad_input,
            Err(e) => panic!("{}", e),
        }
    }

    fn parameters(&self) -> usize {
        0
    }

    fn set_training_mode(&mut self, training: bool) {
        self.deterministic = !training;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affine_coefficients_match_formula() {
        let layer = AlphaDropout::with_alpha_dash(0.3, -1.758).unwrap();

        let expected_a = ((1.0_f32 - 0.3) * (1.0 + 0.3 * 1.758_f32.powi(2))).powf(-0.5);
        let expected_b = -expected_a * (-1.758) * 0.3;

        assert!(
            (layer.a() - expected_a).abs() < 1e-6,
            "a should be {}, got {}",
            expected_a,
            layer.a()
        );
        assert!(
            (layer.b() - expected_b).abs() < 1e-6,
            "b should be {}, got {}",
            expected_b,
            layer.b()
        );
    }

    #[test]
    fn test_invalid_ratio_rejected() {
        assert!(AlphaDropout::new(1.0).is_err());
        assert!(AlphaDropout::new(-0.1).is_err());
        assert!(AlphaDropout::new(1.5).is_err());
        assert!(AlphaDropout::new(0.0).is_ok());
        assert!(AlphaDropout::new(0.999).is_ok());
    }

    #[test]
    fn test_set_ratio_failure_keeps_state() {
        let mut layer = AlphaDropout::new(0.4).unwrap();
        let (a, b) = (layer.a(), layer.b());

        assert!(layer.set_ratio(1.0).is_err());

        // 失败的修改不能动 ratio，也不能动由它推出的 a/b
        assert_eq!(layer.ratio(), 0.4);
        assert_eq!(layer.a(), a);
        assert_eq!(layer.b(), b);
    }
}
