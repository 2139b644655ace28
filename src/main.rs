use clap::Parser;
use image_toolkit::config::Command;
use image_toolkit::core::SourceImage;
use image_toolkit::domain::model::{format_file_size, GenerationRequest};
use image_toolkit::domain::templates::{self, PRESET_QUESTIONS, PROMPT_TEMPLATES};
use image_toolkit::utils::error::ErrorSeverity;
use image_toolkit::utils::{logger, validation::Validate};
use image_toolkit::{
    ArkImageGenerator, ArkImageRecognizer, CliConfig, LocalStorage, RemoveBgClient,
    ToolkitConfig, ToolkitEngine, ToolkitError,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    // 初始化日誌
    #[cfg(feature = "server")]
    let serving = matches!(cli.command, Command::Serve { .. });
    #[cfg(not(feature = "server"))]
    let serving = false;

    if serving {
        logger::init_server_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting image-toolkit");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 驗證配置
    let config = match cli.validate().and_then(|_| cli.load_toolkit_config()) {
        Ok(config) => config,
        Err(e) => exit_with(e),
    };
    if let Err(e) = config.validate() {
        exit_with(e);
    }

    if cli.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    if let Err(e) = run(&cli, &config).await {
        exit_with(e);
    }

    Ok(())
}

async fn run(cli: &CliConfig, config: &ToolkitConfig) -> image_toolkit::Result<()> {
    let storage = LocalStorage::new(config.output_path().to_string());
    let engine = ToolkitEngine::new_with_monitoring(storage, cli.monitor);

    match &cli.command {
        Command::Generate {
            prompt,
            size,
            template,
            no_download,
        } => {
            let prompt = match (prompt, template) {
                (Some(prompt), _) => prompt.clone(),
                (None, Some(index)) => templates::template_by_index(*index)
                    .ok_or_else(|| {
                        ToolkitError::validation(format!("模板编号 {} 不存在", index))
                    })?
                    .to_string(),
                (None, None) => String::new(),
            };

            let generator = ArkImageGenerator::new(config.clone())?;
            let saved = engine
                .generate(&generator, &GenerationRequest::new(prompt, *size), !no_download)
                .await?;

            println!("✅ 图片生成成功 ({})", saved.result.size);
            println!("🔗 {}", saved.result.url);
            if let Some(path) = saved.saved_to {
                println!("📁 已保存到: {}", path);
            }
            if let Some(reason) = saved.download_error {
                eprintln!("⚠️ {}，可直接打开上面的链接下载", reason);
            }
        }
        Command::Recognize { image, question } => {
            let source = SourceImage::from_path(image)?;
            let recognizer = ArkImageRecognizer::new(config.clone())?;
            let recognition = engine
                .recognize(&recognizer, &source, question.clone())
                .await?;

            println!("❓ {}", recognition.question);
            println!();
            println!("{}", recognition.answer);
        }
        Command::RemoveBg { image } => {
            let source = SourceImage::from_path(image)?;
            let remover = RemoveBgClient::new(config.clone())?;
            let saved = engine.remove_background(&remover, &source).await?;

            println!(
                "✅ 背景已移除: {} → {}",
                format_file_size(saved.result.original_size),
                format_file_size(saved.result.processed_size)
            );
            if let Some(path) = saved.saved_to {
                println!("📁 已保存到: {}", path);
            }
        }
        Command::Compress { image, quality } => {
            let source = SourceImage::from_path(image)?;
            let quality = quality.unwrap_or(config.compress.default_quality);
            let saved = engine.compress(&source, quality).await?;

            println!(
                "✅ 压缩完成 (质量 {}%): {} → {}，压缩率 {:.1}%",
                saved.result.quality,
                format_file_size(saved.result.original_size),
                format_file_size(saved.result.compressed_size),
                saved.result.compression_ratio()
            );
            if let Some(path) = saved.saved_to {
                println!("📁 已保存到: {}", path);
            }
        }
        Command::Templates => {
            let mut index = 1;
            for category in PROMPT_TEMPLATES {
                println!("{}", category.category);
                for template in category.templates {
                    println!("  {:>2}. {}", index, template);
                    index += 1;
                }
            }
            println!();
            println!("预设问题");
            for question in PRESET_QUESTIONS {
                println!("  - {}", question);
            }
        }
        #[cfg(feature = "server")]
        Command::Serve { .. } => {
            image_toolkit::server::serve(config).await?;
        }
    }

    Ok(())
}

fn exit_with(e: ToolkitError) -> ! {
    // 記錄詳細錯誤信息
    tracing::error!(
        "❌ Action failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    // 輸出用戶友好的錯誤信息
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}
