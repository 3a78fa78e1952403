use clap::Parser;
use colored::Colorize;

use mediremind::cli::{Cli, Commands};
use mediremind::config::{get_config, init_config};
use mediremind::runtime::modes;
use mediremind::system::init_logging;

#[actix_web::main]
async fn main() {
    // .env 先于配置加载，环境变量才能覆盖配置文件
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_config(cli.config.as_deref());

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => exit_on_failure(run_long_lived(modes::run_server()).await),
        Commands::Worker { interval } => {
            exit_on_failure(run_long_lived(modes::run_worker(interval)).await)
        }
        cmd => {
            if let Err(e) = modes::run_cli(cmd).await {
                eprintln!("{}", e.format_colored());
                std::process::exit(1);
            }
        }
    }
}

fn exit_on_failure(ok: bool) {
    if !ok {
        std::process::exit(1);
    }
}

/// 初始化日志后运行 server / worker
///
/// 返回前释放日志 guard，确保缓冲日志写出
async fn run_long_lived<F>(mode: F) -> bool
where
    F: std::future::Future<Output = anyhow::Result<()>>,
{
    let _guard = match init_logging(&get_config().logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{} {:#}", "Failed to initialize logging:".red().bold(), e);
            return false;
        }
    };

    match mode.await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("{} {:#}", "[ERROR]".red().bold(), e);
            false
        }
    }
}
