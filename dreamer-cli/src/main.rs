use anyhow::{bail, Context, Result};
use clap::Parser;
use dreamer_candle_agent::{Dreamer, DreamerConfig};
use dreamer_core::{
    dummy::{SyntheticEnv, SyntheticEnvConfig},
    Agent, Collector, Env, Trainer, TrainerConfig,
};
use dreamer_tensorboard::TensorboardRecorder;
use log::info;
use std::path::{Path, PathBuf};

/// Train and evaluate a Dreamer agent on the synthetic environment.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Train the agent
    #[arg(long, default_value_t = false)]
    train: bool,

    /// Evaluate the agent with the latest checkpoint
    #[arg(long, default_value_t = false)]
    eval: bool,

    /// Trainer configuration in YAML
    #[arg(long)]
    config: Option<String>,

    /// Agent configuration in YAML
    #[arg(long)]
    agent_config: Option<String>,

    /// Overrides the number of epochs
    #[arg(long)]
    epochs: Option<usize>,

    /// Number of episodes for evaluation
    #[arg(long, default_value_t = 5)]
    eval_episodes: usize,
}

struct Configs {
    trainer: TrainerConfig,
    agent: DreamerConfig,
    env: SyntheticEnvConfig,
}

fn configs(args: &Args) -> Result<Configs> {
    let mut trainer = match &args.config {
        Some(path) => TrainerConfig::load(path)?,
        None => TrainerConfig::default(),
    };
    if let Some(epochs) = args.epochs {
        trainer = trainer.epochs(epochs);
    }

    let [height, width] = trainer.obs_image_size;
    let env = SyntheticEnvConfig::default()
        .image_size(height, width)
        .action_repeat(trainer.action_repeat);

    let agent = match &args.agent_config {
        Some(path) => DreamerConfig::load(path)?,
        None => {
            let action_dim = SyntheticEnv::build(&env, 0)?.action_space().dim();
            DreamerConfig::default().action_dim(action_dim)
        }
    };

    Ok(Configs {
        trainer,
        agent,
        env,
    })
}

/// Directory holding the configs and the logs, the parent of `model_dir`.
fn base_dir(trainer: &TrainerConfig) -> PathBuf {
    match Path::new(&trainer.model_dir).parent() {
        Some(p) => p.to_path_buf(),
        None => PathBuf::from("."),
    }
}

fn collector(
    env_config: &SyntheticEnvConfig,
    agent: &Dreamer,
    seed: u64,
    explore: bool,
) -> Result<Collector<SyntheticEnv, <Dreamer as Agent>::Snapshot>> {
    let env = SyntheticEnv::build(env_config, seed as i64)?;
    Ok(Collector::new(env, agent.snapshot()?, explore).seed(seed))
}

fn train(configs: &Configs) -> Result<()> {
    let base_dir = base_dir(&configs.trainer);
    std::fs::create_dir_all(&base_dir)
        .with_context(|| format!("Failed to create {:?}", base_dir))?;
    configs.trainer.save(base_dir.join("trainer.yaml"))?;
    configs.agent.save(base_dir.join("agent.yaml"))?;

    let seed = configs.trainer.seed;
    let mut trainer = Trainer::build(configs.trainer.clone())?;
    let mut agent = Dreamer::build(configs.agent.clone())?;
    let mut train_collector = collector(&configs.env, &agent, seed, true)?;
    let mut test_collector = collector(&configs.env, &agent, seed + 1, false)?;
    let mut recorder = TensorboardRecorder::new(base_dir.join("logs"));

    trainer.train(
        &mut agent,
        &mut train_collector,
        &mut test_collector,
        &mut recorder,
    )
}

/// Checkpoint with the largest number of environment steps.
fn latest_checkpoint(model_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let mut latest: Option<(usize, PathBuf)> = None;
    for entry in std::fs::read_dir(model_dir.as_ref())? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("safetensors") {
            continue;
        }
        let steps = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.parse::<usize>().ok());
        if let Some(steps) = steps {
            if latest.as_ref().map_or(true, |(s, _)| steps > *s) {
                latest = Some((steps, path));
            }
        }
    }

    match latest {
        Some((_, path)) => Ok(path),
        None => bail!("No checkpoint in {:?}", model_dir.as_ref()),
    }
}

fn eval(configs: &Configs, n_episodes: usize) -> Result<f32> {
    let path = latest_checkpoint(&configs.trainer.model_dir)?;
    let mut agent = Dreamer::build(configs.agent.clone())?;
    agent.load_params(&path)?;
    agent.eval();

    let mut collector = collector(&configs.env, &agent, configs.trainer.seed + 2, false)?;
    let out = collector.collect(n_episodes, false)?;
    info!(
        "Mean return of {} episodes with {:?}: {}",
        out.n_episodes,
        path,
        out.mean_return()
    );
    Ok(out.mean_return())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let configs = configs(&args)?;

    if args.train {
        train(&configs)?;
    }
    if args.eval {
        eval(&configs, args.eval_episodes)?;
    }
    if !args.train && !args.eval {
        info!("Nothing to do, pass --train and/or --eval");
    }

    Ok(())
}
