// 层保存和加载示例程序
//
// 使用方法:
// 1. 保存: cargo run --example layer_persistence save
// 2. 加载: cargo run --example layer_persistence load

use alpha_dropout::{AlphaDropout, Layer, load_layer_auto, save_layer_binary, save_layer_json};
use ndarray::array;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志
    if let Err(e) = simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()
    {
        eprintln!("日志初始化失败: {}", e);
    }

    // 检查命令行参数
    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 {
        match args[1].as_str() {
            "save" => build_and_save()?,
            "load" => load_and_use()?,
            _ => print_usage(),
        }
    } else {
        print_usage();
    }

    Ok(())
}

fn print_usage() {
    println!(
        "
╔═══════════════════════════════════════════════════════════╗
║         Alpha-Dropout 层保存/加载工具                     ║
╚═══════════════════════════════════════════════════════════╝

使用方法:
  cargo run --example layer_persistence save   # 配置并保存层
  cargo run --example layer_persistence load   # 加载层并演示前向传播

示例:
  # 保存 ratio = 0.1 的层（二进制 + JSON 两种格式）
  cargo run --example layer_persistence save

  # 加载并分别在训练/推理模式下执行前向传播
  cargo run --example layer_persistence load
"
    );
}

fn build_and_save() -> Result<(), Box<dyn std::error::Error>> {
    // SELU 网络推荐的小丢弃率
    let mut layer = AlphaDropout::new(0.1)?;
    layer.set_deterministic(false);

    println!("层配置:");
    println!("   ratio       = {}", layer.ratio());
    println!("   alpha_dash  = {}", layer.alpha_dash());
    println!("   a           = {}", layer.a());
    println!("   b           = {}", layer.b());

    save_layer_binary(&layer, "alpha_dropout.bin")?;
    save_layer_json(&layer, "alpha_dropout.json")?;

    Ok(())
}

fn load_and_use() -> Result<(), Box<dyn std::error::Error>> {
    let mut layer = load_layer_auto("alpha_dropout.bin")?;

    let input = array![[1.0_f32, 2.0, 3.0], [4.0, 5.0, 6.0]];
    println!("输入:\n{:?}\n", input);

    // 训练模式: 随机替换 + 仿射校正
    layer.set_deterministic(false);
    let train_output = layer.forward(&input);
    println!("训练模式输出:\n{:?}\n", train_output);
    println!("采样掩码:\n{:?}\n", layer.mask().expect("训练前向之后必有掩码"));

    // 推理模式: 恒等变换
    layer.set_deterministic(true);
    let eval_output = layer.forward(&input);
    println!("推理模式输出 (与输入相同):\n{:?}", eval_output);

    Ok(())
}
