// 层序列化测试

use std::fs;

use alpha_dropout::{
    AlphaDropout, SerializableAlphaDropout, load_layer_auto, load_layer_binary, load_layer_json,
    save_layer_binary, save_layer_json,
};

#[test]
fn test_binary_save_and_load() {
    // 创建测试目录
    assert!(fs::create_dir_all("test_checkpoints").is_ok());

    // 创建层: 非默认配置 + 推理模式
    let mut layer = AlphaDropout::with_alpha_dash(0.35, -1.2).unwrap();
    layer.set_deterministic(true);

    // 保存
    let path = "test_checkpoints/alpha_dropout.bin";
    assert!(
        save_layer_binary(&layer, path).is_ok(),
        "Failed to save layer"
    );
    assert!(std::path::Path::new(path).exists());

    // 加载
    let loaded = match load_layer_binary(path) {
        Ok(l) => l,
        Err(e) => panic!("Failed to load layer: {}", e),
    };

    // 验证: 五个持久化标量逐一还原
    assert_eq!(loaded.ratio(), layer.ratio());
    assert_eq!(loaded.alpha_dash(), layer.alpha_dash());
    assert_eq!(loaded.a(), layer.a());
    assert_eq!(loaded.b(), layer.b());
    assert_eq!(loaded.deterministic(), layer.deterministic());

    // 清理
    let _ = fs::remove_file(path);
    let _ = fs::remove_dir("test_checkpoints");

    println!("✓ 二进制格式保存/加载测试通过!");
}

#[test]
fn test_json_save_and_load() {
    // 创建测试目录
    assert!(fs::create_dir_all("test_exports").is_ok());

    let mut layer = AlphaDropout::new(0.1).unwrap();
    layer.set_ratio(0.25).unwrap();

    // 保存
    let path = "test_exports/alpha_dropout.json";
    assert!(save_layer_json(&layer, path).is_ok(), "Failed to save layer");
    assert!(std::path::Path::new(path).exists());

    // 加载
    let loaded = match load_layer_json(path) {
        Ok(l) => l,
        Err(e) => panic!("Failed to load layer: {}", e),
    };

    assert_eq!(loaded.ratio(), layer.ratio());
    assert_eq!(loaded.alpha_dash(), layer.alpha_dash());
    assert_eq!(loaded.a(), layer.a());
    assert_eq!(loaded.b(), layer.b());
    assert_eq!(loaded.deterministic(), layer.deterministic());

    // 清理
    let _ = fs::remove_file(path);
    let _ = fs::remove_dir("test_exports");

    println!("✓ JSON格式保存/加载测试通过!");
}

#[test]
fn test_auto_dispatch_by_extension() {
    assert!(fs::create_dir_all("test_auto").is_ok());

    let layer = AlphaDropout::new(0.6).unwrap();

    let bin_path = "test_auto/layer.bin";
    let json_path = "test_auto/layer.json";
    assert!(save_layer_binary(&layer, bin_path).is_ok());
    assert!(save_layer_json(&layer, json_path).is_ok());

    let from_bin = load_layer_auto(bin_path).expect("auto-load .bin failed");
    let from_json = load_layer_auto(json_path).expect("auto-load .json failed");

    assert_eq!(from_bin.ratio(), layer.ratio());
    assert_eq!(from_json.ratio(), layer.ratio());

    let _ = fs::remove_file(bin_path);
    let _ = fs::remove_file(json_path);
    let _ = fs::remove_dir("test_auto");

    println!("✓ 扩展名自动分发测试通过!");
}

#[test]
fn test_transient_buffers_not_persisted() {
    use alpha_dropout::Layer;
    use ndarray::Array2;

    assert!(fs::create_dir_all("test_transients").is_ok());

    // 先跑一轮前向/反向，填满瞬态缓冲
    let mut layer = AlphaDropout::new(0.5).unwrap();
    let input = Array2::<f32>::ones((4, 4));
    let _ = layer.forward(&input);
    let _ = layer.try_backward(&Array2::<f32>::ones((4, 4))).unwrap();
    assert!(layer.mask().is_some());
    assert!(layer.delta().is_some());

    let path = "test_transients/layer.bin";
    assert!(save_layer_binary(&layer, path).is_ok());
    let loaded = load_layer_binary(path).unwrap();

    // 瞬态缓冲是调用级状态，不属于层的身份
    assert!(loaded.mask().is_none());
    assert!(loaded.delta().is_none());
    assert!(loaded.cached_input().is_none());
    assert!(loaded.cached_output().is_none());

    let _ = fs::remove_file(path);
    let _ = fs::remove_dir("test_transients");

    println!("✓ 瞬态缓冲不持久化测试通过!");
}

#[test]
fn test_corrupt_archive_rejected() {
    // ratio 越界的归档必须被拒绝，不能绕过构造时的校验
    let corrupt_ratio = SerializableAlphaDropout {
        version: 1,
        ratio: 1.5,
        alpha_dash: -1.758,
        a: 1.0,
        b: 0.5,
        deterministic: false,
    };
    assert!(corrupt_ratio.to_layer().is_err());

    // 非有限的仿射系数同样拒绝
    let corrupt_affine = SerializableAlphaDropout {
        version: 1,
        ratio: 0.5,
        alpha_dash: -1.758,
        a: f32::NAN,
        b: 0.5,
        deterministic: false,
    };
    assert!(corrupt_affine.to_layer().is_err());

    println!("✓ 损坏归档拒绝测试通过!");
}

#[test]
fn test_serializable_mirror_captures_identity() {
    let mut layer = AlphaDropout::with_alpha_dash(0.45, -2.0).unwrap();
    layer.set_deterministic(true);

    let mirror = SerializableAlphaDropout::from_layer(&layer);
    assert_eq!(mirror.ratio, layer.ratio());
    assert_eq!(mirror.alpha_dash, layer.alpha_dash());
    assert_eq!(mirror.a, layer.a());
    assert_eq!(mirror.b, layer.b());
    assert_eq!(mirror.deterministic, layer.deterministic());

    // 镜像 -> 层 -> 镜像应当闭合
    let rebuilt = mirror.to_layer().unwrap();
    let mirror2 = SerializableAlphaDropout::from_layer(&rebuilt);
    assert_eq!(mirror2.ratio, mirror.ratio);
    assert_eq!(mirror2.a, mirror.a);
    assert_eq!(mirror2.b, mirror.b);

    println!("✓ 序列化镜像一致性测试通过!");
}
