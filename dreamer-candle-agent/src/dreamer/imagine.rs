use crate::{actor::Actor, rssm::RssmState, world_model::WorldModel};
use anyhow::Result;
use candle_core::Tensor;

/// Trajectory imagined by the world model under the actor.
pub struct ImaginedTrajectory {
    /// Features of the start state and the imagined states, `[H + 1, N, F]`.
    pub features: Tensor,

    /// Log density of the actions taken, `[H, N]`.
    pub log_probs: Tensor,
}

/// Rolls out the actor in the latent space for `horizon` steps.
///
/// `start` should be detached from the computation graph of the world model
/// loss. The actor sees detached features, so gradients reach its parameters
/// only through the actions fed to the transition model.
pub fn imagine_rollout(
    world_model: &WorldModel,
    actor: &Actor,
    start: &RssmState,
    horizon: usize,
) -> Result<ImaginedTrajectory> {
    let mut state = start.clone();
    let mut features = Vec::with_capacity(horizon + 1);
    let mut log_probs = Vec::with_capacity(horizon);
    features.push(state.features()?);

    for _ in 0..horizon {
        let dist = actor.forward(&state.features()?.detach())?;
        let (act, logp) = dist.sample()?;
        state = world_model.imagine(&state, &act)?;
        features.push(state.features()?);
        log_probs.push(logp);
    }

    Ok(ImaginedTrajectory {
        features: Tensor::stack(&features, 0)?,
        log_probs: Tensor::stack(&log_probs, 0)?,
    })
}
