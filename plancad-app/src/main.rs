use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use plancad_config::{AppConfig, ConfigError};
use plancad_core::csg::ManifoldEngine;
use plancad_core::ObjectId;
use plancad_engine::scene::{DemoObjects, Scene, build_options};
use plancad_engine::session::{Reply, Session};
use plancad_engine::tool::input::Key;
use plancad_engine::tool::prompt::PromptLevel;
use plancad_io::{DocumentLoader, DocumentSaver, IoError, JsonFacade};
use thiserror::Error;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Io(#[from] IoError),
    #[error("读取脚本 {path:?} 失败: {source}")]
    Script {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Default)]
struct Options {
    config: Option<PathBuf>,
    load: Option<PathBuf>,
    save: Option<PathBuf>,
    script: Option<PathBuf>,
}

fn main() {
    let options = parse_args();
    let config = load_configuration(options.config.clone());
    init_logging(&config);
    info!("启动 PlanCAD 命令行会话");

    if let Err(err) = run(&config, &options) {
        error!(error = %err, "会话失败");
        std::process::exit(1);
    }
}

fn parse_args() -> Options {
    let mut args = std::env::args().skip(1);
    let mut options = Options::default();
    while let Some(arg) = args.next() {
        let slot = match arg.as_str() {
            "--config" => &mut options.config,
            "--load" => &mut options.load,
            "--save" => &mut options.save,
            "--script" => &mut options.script,
            other => {
                eprintln!("未知参数：{other}");
                std::process::exit(1);
            }
        };
        let Some(path) = args.next() else {
            eprintln!("`{arg}` 需要提供文件路径");
            std::process::exit(1);
        };
        *slot = Some(PathBuf::from(path));
    }
    options
}

fn run(config: &AppConfig, options: &Options) -> Result<(), AppError> {
    let facade = JsonFacade::new()
        .with_options(build_options(&config.editor))
        .pretty(true);
    let mut scene = Scene::with_config(config.editor.clone(), Arc::new(ManifoldEngine));

    let script = match (&options.load, &options.script) {
        (Some(path), _) => {
            scene.load_document(facade.load(path)?);
            read_script(options.script.as_ref())?
        }
        (None, Some(path)) => read_script(Some(path))?,
        (None, None) => {
            let ids = scene.populate_demo();
            demo_script(&ids)
        }
    };

    let mut session = Session::new(scene);
    for line in &script {
        execute(&mut session, line);
    }
    report(&mut session);

    if let Some(path) = &options.save {
        facade.save(session.scene().document(), path)?;
    }
    Ok(())
}

fn read_script(path: Option<&PathBuf>) -> Result<Vec<String>, AppError> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let content = fs::read_to_string(path).map_err(|source| AppError::Script {
        path: path.clone(),
        source,
    })?;
    Ok(content
        .lines()
        .filter(|line| !line.trim_start().starts_with("//"))
        .map(str::to_string)
        .collect())
}

/// 在演示平面图上拉伸房间轮廓、以柱子切除，再定义并插入一个块。
fn demo_script(ids: &DemoObjects) -> Vec<String> {
    let id = |id: ObjectId| format!("#{}", id.get());
    vec![
        "ext".to_string(),
        id(ids.room),
        "300".to_string(),
        "cut".to_string(),
        id(ids.column),
        "undo".to_string(),
        "redo".to_string(),
        "clear_selection".to_string(),
        "dist".to_string(),
        "0,0".to_string(),
        "600,400".to_string(),
        "block".to_string(),
        "sign".to_string(),
        "280,30".to_string(),
        id(ids.exit_sign),
        String::new(),
        "insert".to_string(),
        "sign".to_string(),
        "100,300".to_string(),
    ]
}

fn execute(session: &mut Session, line: &str) {
    println!("> {line}");
    let result = match line.trim() {
        "esc" => session.key(Key::Escape).map(|_| Reply::Tool),
        _ => session.submit(line),
    };
    if let Err(err) = result {
        warn!(input = line, error = %err, "输入被拒绝");
    }
    for message in session.tools_mut().prompt_mut().drain() {
        let marker = match message.level {
            PromptLevel::Prompt => "",
            PromptLevel::Info => "",
            PromptLevel::Warning => "! ",
            PromptLevel::Alert => "!! ",
        };
        println!("  {marker}{}", message.text);
    }
}

fn report(session: &mut Session) {
    let ids: Vec<_> = session
        .scene()
        .document()
        .objects()
        .iter()
        .filter(|object| object.entity.is_derived())
        .map(|object| object.id)
        .collect();
    for id in ids {
        if let Some(mesh) = session.scene_mut().mesh(id) {
            println!(
                "#{}: {} 个三角面{}",
                id.get(),
                mesh.triangle_count(),
                if mesh.is_placeholder() { "（占位）" } else { "" }
            );
        }
    }
    let labels: Vec<_> = session.scene().history().labels().collect();
    info!(
        objects = session.scene().document().len(),
        history = ?labels,
        "会话结束"
    );
}

fn load_configuration(override_path: Option<PathBuf>) -> AppConfig {
    match override_path {
        Some(path) => AppConfig::from_file(&path).unwrap_or_else(|err| {
            warn!(path = %path.display(), error = %err, "加载指定配置失败，使用默认配置");
            AppConfig::default()
        }),
        None => match AppConfig::discover() {
            Ok(cfg) => cfg,
            Err(err) => {
                match &err {
                    ConfigError::Io { path, .. } | ConfigError::Parse { path, .. } => {
                        warn!(path = %path.display(), error = %err, "加载默认配置失败，使用内建默认值");
                    }
                    ConfigError::Invalid { .. } | ConfigError::Context { .. } => {
                        warn!(error = %err, "加载默认配置失败，使用内建默认值");
                    }
                }
                AppConfig::default()
            }
        },
    }
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(config.logging.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}
