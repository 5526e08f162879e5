use std::env;

use anyhow::{anyhow, Result};
use blockedit::script::{parse_script, run};
use blockedit::{BlockAdapter, BlockAttributes, BlockKind, Config, Recorder};
use log::LevelFilter;

const USAGE: &str = "usage: blockedit <markup-file|-> <script-file> [block-kind]";

#[tokio::main]
async fn main() -> Result<()> {
    let mut logger = env_logger::Builder::from_default_env();
    if std::env::var_os("RUST_LOG").is_none() {
        logger.filter_level(LevelFilter::Info);
        logger.filter_module("blockedit", LevelFilter::Debug);
    }
    logger.init();

    if let Err(err) = replay().await {
        eprintln!("blockedit: {}", err);
        if let Some(source) = err.source() {
            eprintln!("caused by: {}", source);
        }
        log::error!("Replay failed: {}", err);
        std::process::exit(1);
    }
    Ok(())
}

/// Mounts one block, replays a script against it and prints every
/// collaborator callback as a JSON line.
async fn replay() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        return Err(anyhow!(USAGE));
    }

    let markup = match args[1].as_str() {
        "-" => String::new(),
        path => tokio::fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("cannot read {}: {}", path, e))?,
    };
    let script = tokio::fs::read_to_string(&args[2])
        .await
        .map_err(|e| anyhow!("cannot read {}: {}", args[2], e))?;
    let kind: BlockKind = match args.get(3) {
        Some(kind) => kind.parse()?,
        None => BlockKind::RichText,
    };

    let config = match Config::load().await {
        Ok(config) => config,
        Err(e) => {
            log::warn!("Falling back to default configuration: {}", e);
            Config::default()
        }
    };
    let commands = parse_script(&script)?;

    let recorder = Recorder::new();
    let mut adapter = BlockAdapter::mount(
        kind,
        Some(&markup),
        BlockAttributes::default(),
        &config,
        Box::new(recorder.clone()),
    )?;
    log::info!("Replaying {} commands against a {:?} block", commands.len(), kind);

    let failures = run(&mut adapter, &commands);
    let final_markup = adapter.unmount();
    for event in recorder.drain() {
        println!("{}", serde_json::to_string(&event)?);
    }
    println!("{}", serde_json::json!({ "event": "unmount", "markup": final_markup }));

    if failures > 0 {
        log::warn!("{} commands failed", failures);
    }
    Ok(())
}
