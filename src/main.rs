mod cli;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands};
use mediabeam::server;
use mediabeam_av::{FfmpegLauncher, FfprobeProber, ToolRegistry};
use mediabeam_core::config::Config;
use mediabeam_db::pool::init_pool;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG if set, otherwise use defaults based on verbose flag.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "mediabeam=trace,mediabeam_av=trace,mediabeam_db=debug,tower_http=debug".to_string()
        } else {
            "mediabeam=debug,mediabeam_av=debug,mediabeam_db=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .init();

    match cli.command {
        Commands::Start { host, port, root } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, root, cli.config.as_deref()))
        }
        Commands::Probe { file, json } => probe_file(&file, json),
        Commands::CheckTools => check_tools(),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("mediabeam {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn start_server(
    host: String,
    port: u16,
    root: Option<std::path::PathBuf>,
    config_path: Option<&std::path::Path>,
) -> Result<()> {
    let mut config = Config::load_or_default(config_path);

    // CLI overrides.
    config.server.host = host;
    config.server.port = port;
    if let Some(root) = root {
        config.library.root = root;
    }

    for warning in config.validate() {
        tracing::warn!("{warning}");
    }

    tracing::info!("Starting mediabeam server");
    tracing::info!(
        "Serving {} on {}:{}",
        config.library.root.display(),
        config.server.host,
        config.server.port
    );

    // Database lives next to the config file unless configured otherwise.
    let data_dir = config_path
        .and_then(|p| p.parent())
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());
    let db_path = config
        .database
        .path
        .clone()
        .unwrap_or_else(|| data_dir.join("mediabeam.db"));
    let db_path_str = db_path.to_string_lossy();
    tracing::info!("Initializing database at {}", db_path_str);
    let db_pool = init_pool(&db_path_str)?;

    let tools = ToolRegistry::discover(&config.tools);
    for tool in tools.check_all() {
        if tool.available {
            tracing::info!("Found {}: {:?}", tool.name, tool.path);
        } else {
            tracing::warn!("{} not found; related endpoints will fail", tool.name);
        }
    }

    let prober = Arc::new(FfprobeProber::new(
        tools.require("ffprobe").map(|p| p.clone()).unwrap_or_else(|_| "ffprobe".into()),
    ));
    let encoder = Arc::new(FfmpegLauncher::new(
        tools.require("ffmpeg").map(|p| p.clone()).unwrap_or_else(|_| "ffmpeg".into()),
    ));

    let ctx = server::AppContext {
        db: db_pool,
        config: Arc::new(config.clone()),
        prober,
        encoder,
        tools: Arc::new(tools),
    };

    server::start_server(config, ctx).await
}

fn probe_file(file: &std::path::Path, json: bool) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let config = Config::default();
    let tools = ToolRegistry::discover(&config.tools);
    let prober = FfprobeProber::new(tools.require("ffprobe")?.clone());

    let rt = tokio::runtime::Runtime::new()?;
    let profile = rt.block_on(async {
        use mediabeam_av::Prober;
        prober.probe_video(file).await
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
    } else {
        println!("File: {}", file.display());
        let secs = profile.duration_seconds as u64;
        println!(
            "Duration: {:02}:{:02}:{:02}",
            secs / 3600,
            (secs / 60) % 60,
            secs % 60
        );
        println!("Video: {}", profile.video_codec);
        println!(
            "Copy-eligible: {}",
            mediabeam_av::is_copy_eligible(&profile.video_codec)
        );

        println!("\nAudio Tracks: {}", profile.audio_tracks.len());
        for track in &profile.audio_tracks {
            println!("  [{}] {} - {}", track.index, track.codec, track.label);
        }

        println!("\nSubtitle Tracks: {}", profile.subtitle_tracks.len());
        for track in &profile.subtitle_tracks {
            println!("  [{}] {} - {}", track.index, track.codec, track.label);
        }
    }

    Ok(())
}

fn check_tools() -> Result<()> {
    println!("Checking external tools...\n");

    let config = Config::default();
    let tools = ToolRegistry::discover(&config.tools);
    let mut all_ok = true;

    for tool in tools.check_all() {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install them to enable all features.");
    }

    Ok(())
}

fn validate_config(path: Option<&std::path::Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let contents = std::fs::read_to_string(p)?;
            let config = Config::from_toml(&contents)?;
            println!("✓ Configuration is valid");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Library root: {}", config.library.root.display());
            for warning in config.validate() {
                println!("  warning: {warning}");
            }
        }
        None => {
            println!("No config file specified, using defaults");
            let config = Config::default();
            println!("Default config:");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Library root: {}", config.library.root.display());
        }
    }

    Ok(())
}
