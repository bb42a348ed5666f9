use anyhow::Result;
use dreamer_candle_agent::{
    actor::ActorConfig, opt::OptimizerConfig, world_model::WorldModelConfig, Device, Dreamer,
    DreamerConfig,
};
use dreamer_core::{
    dummy::{ConstantPolicy, SyntheticEnv, SyntheticEnvConfig},
    Agent, Collector, Env, Policy, SequenceBatch,
};
use ndarray::{arr1, s, stack, Axis};
use tempdir::TempDir;

fn config() -> DreamerConfig {
    let world_model = WorldModelConfig::default()
        .action_dim(2)
        .cnn_depth(4)
        .latent_dims(4, 8, 8)
        .reward_units(vec![16]);
    let opt = OptimizerConfig::Adam { lr: 1e-3 };

    DreamerConfig::default()
        .world_model(world_model)
        .actor(ActorConfig::default().units(vec![16]))
        .critic_units(vec![16])
        .optimizers(opt.clone(), opt.clone(), opt)
        .horizon(3)
        .target_update(1.0, 2)
        .devices(Device::Cpu, Device::Cpu)
}

fn env() -> Result<SyntheticEnv> {
    SyntheticEnv::build(&SyntheticEnvConfig::default().episode_length(6), 0)
}

/// Two sequences of length 4 from random episodes.
fn batch() -> Result<SequenceBatch> {
    let policy = ConstantPolicy::new(arr1(&[0.0, 0.0]));
    let mut collector = Collector::new(env()?, policy, true).seed(0);
    let episodes = collector.collect(2, true)?.episodes;

    let obs: Vec<_> = episodes.iter().map(|e| e.obs().slice(s![1..5, .., .., ..])).collect();
    let act: Vec<_> = episodes.iter().map(|e| e.act().slice(s![1..5, ..])).collect();
    let reward: Vec<_> = episodes.iter().map(|e| e.reward().slice(s![1..5])).collect();

    Ok(SequenceBatch {
        obs: stack(Axis(0), &obs)?,
        act: stack(Axis(0), &act)?,
        reward: stack(Axis(0), &reward)?,
    })
}

#[test]
fn test_act_threads_latent_state() -> Result<()> {
    let agent = Dreamer::build(config())?;
    let mut env = env()?;
    let obs = env.reset()?;

    let (act1, state) = agent.act(&obs, None, false)?;
    let (act2, _) = agent.act(&obs, None, false)?;
    assert_eq!(act1.len(), 2);
    assert_eq!(act1, act2);
    assert!(act1.iter().all(|a| a.abs() <= 1.0));
    assert_eq!(state.latent.deter.dims(), &[1, 8]);
    assert_eq!(state.action.dims(), &[1, 2]);

    // The previous latent state changes the result
    let obs = env.step(&act1)?.obs;
    let (act3, _) = agent.act(&obs, Some(state.clone()), false)?;
    let (act4, _) = agent.act(&obs, None, false)?;
    assert_ne!(act3, act4);

    let (act5, _) = agent.act(&obs, Some(state), true)?;
    assert!(act5.iter().all(|a| a.abs() <= 1.0));
    Ok(())
}

#[test]
fn test_update_reports_finite_metrics() -> Result<()> {
    let mut agent = Dreamer::build(config())?;
    let batch = batch()?;

    let record = agent.update(&batch)?;
    for key in [
        "loss_model",
        "loss_recon",
        "loss_reward",
        "kl",
        "grad_norm_model",
        "loss_actor",
        "loss_critic",
        "entropy",
        "imagined_return",
        "grad_norm_actor",
        "grad_norm_critic",
    ]
    .iter()
    {
        let v = record.get_scalar(key)?;
        assert!(v.is_finite(), "{} = {}", key, v);
    }
    assert!(record.get_scalar("kl")? >= 0.0);
    assert_eq!(agent.n_updates(), 1);
    Ok(())
}

#[test]
fn test_reconstruction_loss_decreases() -> Result<()> {
    let mut agent = Dreamer::build(config())?;
    let batch = batch()?;

    let mut losses = vec![];
    for _ in 0..40 {
        losses.push(agent.update(&batch)?.get_scalar("loss_recon")?);
    }
    let first = losses[..5].iter().sum::<f32>() / 5.0;
    let last = losses[35..].iter().sum::<f32>() / 5.0;
    assert!(last < first, "{:?}", losses);
    Ok(())
}

#[test]
fn test_save_and_load_params() -> Result<()> {
    let dir = TempDir::new("dreamer")?;
    let path = dir.path().join("10.safetensors");
    let obs = env()?.reset()?;

    let mut agent1 = Dreamer::build(config())?;
    agent1.update(&batch()?)?;
    agent1.save_params(&path)?;
    let (act1, _) = agent1.act(&obs, None, false)?;

    let mut agent2 = Dreamer::build(config())?;
    let (act2, _) = agent2.act(&obs, None, false)?;
    assert_ne!(act1, act2);

    agent2.load_params(&path)?;
    let (act2, _) = agent2.act(&obs, None, false)?;
    assert_eq!(act1, act2);
    Ok(())
}

#[test]
fn test_snapshot_acts_like_agent() -> Result<()> {
    let mut agent = Dreamer::build(config())?;
    let obs = env()?.reset()?;
    let snapshot = agent.snapshot()?;
    assert_eq!(
        agent.act(&obs, None, false)?.0,
        snapshot.act(&obs, None, false)?.0
    );

    // Later updates do not affect the snapshot
    agent.update(&batch()?)?;
    let (act, _) = snapshot.act(&obs, None, false)?;
    assert_ne!(agent.act(&obs, None, false)?.0, act);

    let mut collector = Collector::new(env()?, snapshot, true).seed(1);
    let out = collector.collect(1, false)?;
    assert_eq!(out.n_episodes, 1);
    assert_eq!(out.episodes[0].len(), 6);
    assert_eq!(out.episodes[0].act().shape(), &[6, 2]);
    Ok(())
}
