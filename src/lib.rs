//! # Alpha-Dropout - 面向自归一化网络的正则化层
//!
//! 这是一个纯 Rust 实现的 Alpha-Dropout 层，配合 SELU 激活函数使用。
//! 普通 Dropout 把被丢弃的神经元置零，会破坏 SELU 网络精心维持的
//! 均值/方差；Alpha-Dropout 改为把被丢弃的神经元设为固定常数
//! `alpha_dash`，再做一次仿射校正，使输出的均值和方差与输入保持一致。
//!
//! ## 核心设计理念
//!
//! 1. **纯 Rust 实现**：不依赖 PyTorch/TensorFlow，只使用 `ndarray` 进行矩阵运算
//! 2. **单层聚焦**：本 crate 只提供 Alpha-Dropout 层本身和它接入
//!    外部执行引擎所需的窄接口（`Layer` trait），不包含网络图引擎
//! 3. **前向/反向一致**：反向传播必须复用前向传播采样的同一个掩码，
//!    否则梯度与随机选择的子网络不一致
//! 4. **显式模式切换**：训练/推理行为由 `deterministic` 标志显式控制，
//!    由调用方（训练循环 vs 评估循环）负责设置
//!
//! ## 模块组织
//!
//! ### 核心组件
//! - `alpha_dropout`: Alpha-Dropout 层实现（掩码采样 + 仿射校正 + 梯度传播）
//! - `layer`: `Layer` trait，外部网络执行引擎消费的统一层接口
//!
//! ### 工具模块
//! - `model_serialization`: 层配置的序列化和反序列化（二进制 + JSON）
//!
//! ## 参考文献
//!
//! Klambauer, Unterthiner, Mayr, Hochreiter (2017).
//! Self-Normalizing Neural Networks. NeurIPS.

// ============================================================================
// 模块声明
// ============================================================================

pub mod alpha_dropout; // Alpha-Dropout层：alpha替换 + 仿射校正的正则化
pub mod layer; // Layer trait：外部执行引擎接入的窄接口
pub mod model_serialization; // 模型序列化：保存和加载层配置

// ============================================================================
// 重导出核心类型（简化外部使用）
// ============================================================================

pub use alpha_dropout::AlphaDropout;
pub use layer::Layer;
pub use model_serialization::{
    SerializableAlphaDropout, load_layer_auto, load_layer_binary, load_layer_json,
    save_layer_binary, save_layer_json,
};

// ============================================================================
// SELU 自归一化常量 (Self-Normalizing Constants)
// ============================================================================

/// **SELU 的 alpha 常量**
///
/// SELU 激活函数的负半轴饱和系数，由自归一化不动点方程解出。
/// 取值来自 Klambauer et al. (2017)。
pub const SELU_ALPHA: f32 = 1.6732632423543772848170429916717;

/// **SELU 的 lambda 常量**
///
/// SELU 激活函数的整体缩放系数，与 `SELU_ALPHA` 配套，
/// 共同保证激活输出收敛到均值 0、方差 1。
pub const SELU_LAMBDA: f32 = 1.0507009873554804934193349852946;

/// **默认替换常数 alpha_dash**
///
/// 被丢弃的神经元不置零，而是设为 SELU 的负饱和值 `-alpha * lambda`。
/// 这是 SELU 激活在负无穷处的极限，用它替换才能在仿射校正后
/// 恢复原有的均值和方差。
pub const DEFAULT_ALPHA_DASH: f32 = -SELU_ALPHA * SELU_LAMBDA;

/// **默认丢弃率**
///
/// 与原论文和主流框架的默认值保持一致。
///
/// **常见配置**：
/// - **0.05-0.1**: SELU 网络的推荐区间（自归一化网络对丢弃更敏感）
/// - **0.5**: 通用默认值，适合做对照实验
pub const DEFAULT_RATIO: f32 = 0.5;
