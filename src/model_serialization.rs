// ============================================================================
// 层序列化模块 - 支持二进制和 JSON 两种格式
// ============================================================================
//
// 本模块实现 Alpha-Dropout 层配置的持久化，支持两种序列化格式:
//
// 1. **二进制格式** (推荐用于生产):
//    - 使用 bincode 序列化，文件小、速度快
//    - 文件扩展名: .bin
//
// 2. **JSON 格式** (推荐用于调试):
//    - 人类可读，方便检查配置
//    - 跨语言兼容，可用 Python 读取
//    - 文件扩展名: .json
//
// 持久化的内容是层的"身份"：ratio、alpha_dash、a、b、deterministic。
// 瞬态缓冲（掩码、输入/输出缓存、梯度缓冲）是调用级工作状态，
// 不参与序列化，恢复后为空。
//
// ============================================================================

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::alpha_dropout::AlphaDropout;

/// 归档格式版本号
pub const LAYER_FORMAT_VERSION: u32 = 1;

// ============================================================================
// 层的可序列化表示
// ============================================================================

#[derive(Clone, Debug, Encode, Decode, Serialize, Deserialize)]
pub struct SerializableAlphaDropout {
    pub version: u32,
    pub ratio: f32,
    pub alpha_dash: f32,
    pub a: f32,
    pub b: f32,
    pub deterministic: bool,
}

impl SerializableAlphaDropout {
    pub fn from_layer(layer: &AlphaDropout) -> Self {
        Self {
            version: LAYER_FORMAT_VERSION,
            ratio: layer.ratio(),
            alpha_dash: layer.alpha_dash(),
            a: layer.a(),
            b: layer.b(),
            deterministic: layer.deterministic(),
        }
    }

    /// 从归档重建层
    ///
    /// a/b 按归档原样恢复（不重算）；ratio 仍要过区间校验，
    /// 损坏的归档不能借反序列化绕过构造时的检查。
    pub fn to_layer(&self) -> Result<AlphaDropout, String> {
        if !(0.0..1.0).contains(&self.ratio) {
            return Err(format!(
                "归档中的 ratio 非法: {} (必须在 [0, 1) 区间内)",
                self.ratio
            ));
        }
        if !self.a.is_finite() || !self.b.is_finite() {
            return Err(format!(
                "归档中的仿射系数非法: a = {}, b = {}",
                self.a, self.b
            ));
        }

        Ok(AlphaDropout::from_parts(
            self.ratio,
            self.alpha_dash,
            self.a,
            self.b,
            self.deterministic,
        ))
    }
}

// ============================================================================
// 主要 API
// ============================================================================

/// 保存层配置到二进制文件
pub fn save_layer_binary<P: AsRef<Path>>(
    layer: &AlphaDropout,
    path: P,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("💾 保存层配置到二进制文件...");
    println!("   路径: {:?}", path.as_ref());

    let serializable = SerializableAlphaDropout::from_layer(layer);

    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);

    let config = bincode::config::standard();
    bincode::encode_into_std_write(&serializable, &mut writer, config)?;

    println!("✅ 层保存成功!");
    Ok(())
}

/// 从二进制文件加载层配置
pub fn load_layer_binary<P: AsRef<Path>>(
    path: P,
) -> Result<AlphaDropout, Box<dyn std::error::Error>> {
    println!("📂 从二进制文件加载层配置...");
    println!("   路径: {:?}", path.as_ref());

    let file = File::open(path.as_ref())?;
    let mut reader = BufReader::new(file);

    let config = bincode::config::standard();
    let serializable: SerializableAlphaDropout =
        bincode::decode_from_std_read(&mut reader, config)?;

    if serializable.version != LAYER_FORMAT_VERSION {
        log::warn!(
            "归档格式版本 {} 与当前版本 {} 不一致，尝试继续加载",
            serializable.version,
            LAYER_FORMAT_VERSION
        );
    }

    let layer = serializable.to_layer()?;

    println!("✅ 层加载成功! (ratio = {})", layer.ratio());
    Ok(layer)
}

/// 保存层配置到 JSON 文件
pub fn save_layer_json<P: AsRef<Path>>(
    layer: &AlphaDropout,
    path: P,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("💾 保存层配置到 JSON 文件...");
    println!("   路径: {:?}", path.as_ref());

    let serializable = SerializableAlphaDropout::from_layer(layer);

    let file = File::create(path.as_ref())?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, &serializable)?;

    println!("✅ 层保存成功!");
    Ok(())
}

/// 从 JSON 文件加载层配置
pub fn load_layer_json<P: AsRef<Path>>(
    path: P,
) -> Result<AlphaDropout, Box<dyn std::error::Error>> {
    println!("📂 从 JSON 文件加载层配置...");
    println!("   路径: {:?}", path.as_ref());

    let file = File::open(path.as_ref())?;
    let reader = BufReader::new(file);
    let serializable: SerializableAlphaDropout = serde_json::from_reader(reader)?;

    if serializable.version != LAYER_FORMAT_VERSION {
        log::warn!(
            "归档格式版本 {} 与当前版本 {} 不一致，尝试继续加载",
            serializable.version,
            LAYER_FORMAT_VERSION
        );
    }

    let layer = serializable.to_layer()?;

    println!("✅ 层加载成功! (ratio = {})", layer.ratio());
    Ok(layer)
}

/// 自动选择加载方法（按扩展名分发）
pub fn load_layer_auto<P: AsRef<Path>>(
    path: P,
) -> Result<AlphaDropout, Box<dyn std::error::Error>> {
    let path_str = path.as_ref().to_str().unwrap_or("");

    if path_str.ends_with(".json") {
        load_layer_json(path)
    } else {
        load_layer_binary(path)
    }
}
