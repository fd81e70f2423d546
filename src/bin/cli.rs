//! cmis-query CLI 工具
//!
//! 交互式 CMIS-QL 命令行界面

use anyhow::Context as _;
use clap::Parser;
use cmis_query::catalog::{InMemoryTypeCatalog, TypeCatalog};
use cmis_query::cli::{check_vertical_display, PrintMode, Printer};
use cmis_query::config::EngineConfig;
use cmis_query::query::QueryExecutor;
use cmis_query::repository::{load_fixture, InMemoryRepository};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cmis-query", version)]
#[command(about = "CMIS-QL 查询命令行工具")]
struct Args {
    /// 仓库数据文件（类型与对象，JSON）
    #[arg(short, long)]
    fixture: Option<PathBuf>,

    /// 类型目录文件（JSON），未指定 fixture 时使用
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// 引擎配置文件（JSON）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 单页最大返回行数，0 表示不限
    #[arg(long)]
    max_items: Option<usize>,

    /// 跳过的行数
    #[arg(long)]
    skip: Option<usize>,

    /// 垂直显示结果
    #[arg(long)]
    vertical: bool,

    /// 以 JSON 输出结果
    #[arg(long, conflicts_with = "vertical")]
    json: bool,

    /// 执行单个查询后退出
    #[arg(short = 'e', long)]
    execute: Option<String>,

    /// 输出调试日志
    #[arg(short, long)]
    verbose: bool,
}

struct Session {
    catalog: Arc<InMemoryTypeCatalog>,
    executor: QueryExecutor,
    printer: Printer,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    let (catalog, repository) = match &args.fixture {
        Some(path) => load_fixture(path)
            .with_context(|| format!("failed to load fixture {}", path.display()))?,
        None => {
            let catalog = match &args.catalog {
                Some(path) => InMemoryTypeCatalog::load(path)
                    .with_context(|| format!("failed to load catalog {}", path.display()))?,
                None => InMemoryTypeCatalog::new(),
            };
            (catalog, InMemoryRepository::new())
        }
    };

    let mut config = match &args.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(max_items) = args.max_items {
        config = config.with_max_items(max_items);
    }
    if let Some(skip) = args.skip {
        config = config.with_skip_count(skip);
    }

    let catalog = Arc::new(catalog);
    let repository = Arc::new(repository.with_case_sensitive_text(config.case_sensitive_text));
    let object_count = repository.len();
    let mut session = Session {
        executor: QueryExecutor::new(catalog.clone(), repository).with_config(config),
        catalog,
        printer: Printer::new(print_mode(&args)),
    };

    // 单个查询模式
    if let Some(query) = args.execute {
        execute_query(&session, &query)?;
        return Ok(());
    }

    println!("cmis-query {} - CMIS-QL 查询工具", cmis_query::VERSION);
    println!("  类型数: {}", session.catalog.type_ids().len());
    println!("  对象数: {}", object_count);

    // 交互模式
    println!("\n输入 'help' 查看命令列表，'quit' 退出\n");

    let stdin = io::stdin();
    loop {
        print!("cmis> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match handle_command(&mut session, line) {
            Ok(true) => break,
            Ok(false) => {}
            Err(e) => println!("错误: {}", e),
        }
    }

    println!("再见！");
    Ok(())
}

fn print_mode(args: &Args) -> PrintMode {
    if args.json {
        PrintMode::Json
    } else if args.vertical {
        PrintMode::Vertical
    } else {
        PrintMode::Table
    }
}

fn handle_command(session: &mut Session, input: &str) -> anyhow::Result<bool> {
    let parts: Vec<&str> = input.splitn(2, ' ').collect();
    let cmd = parts[0].to_lowercase();
    let args = parts.get(1).map(|s| s.trim()).unwrap_or("");

    match cmd.as_str() {
        "quit" | "exit" | "q" => return Ok(true),

        "help" | "h" | "?" => {
            println!("{}", Printer::print_help());
        }

        "types" => {
            for type_id in session.catalog.type_ids() {
                println!("  {}", type_id);
            }
        }

        "describe" | "desc" => {
            if args.is_empty() {
                println!("用法: describe <类型>");
            } else if let Some(definition) = session.catalog.lookup(args) {
                println!("{}", session.printer.print_type(&definition));
            } else {
                println!("类型不存在: {}", args);
            }
        }

        "mode" => match args {
            "table" => session.printer.set_mode(PrintMode::Table),
            "vertical" => session.printer.set_mode(PrintMode::Vertical),
            "json" => session.printer.set_mode(PrintMode::Json),
            _ => println!("用法: mode <table|vertical|json>"),
        },

        _ => execute_query(session, input)?,
    }

    Ok(false)
}

fn execute_query(session: &Session, input: &str) -> anyhow::Result<()> {
    let (query, vertical) = check_vertical_display(input);
    let result = session.executor.query(&query)?;

    let output = if vertical && session.printer.mode() != PrintMode::Json {
        Printer::new(PrintMode::Vertical).print_result(&result)
    } else {
        session.printer.print_result(&result)
    };
    print!("{}", output);
    if result.stats.evaluation_errors > 0 {
        println!("{} row(s) skipped on evaluation errors", result.stats.evaluation_errors);
    }

    Ok(())
}
