use super::DreamerConfig;
use crate::{
    actor::Actor, rssm::RssmState, util::array_to_tensor, util::NamedTensors,
    world_model::WorldModel,
};
use anyhow::Result;
use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use dreamer_core::{Action, Observation, Policy};
use ndarray::Array1;

/// Latent state threaded through consecutive calls of
/// [`Policy::act`] within an episode.
#[derive(Clone, Debug)]
pub struct DreamerState {
    /// Posterior state after the last observation, `[1, _]`.
    pub latent: RssmState,

    /// Last action, `[1, A]`.
    pub action: Tensor,
}

/// Filters the observation into the latent state and queries the actor.
pub(super) fn act_with(
    world_model: &WorldModel,
    actor: &Actor,
    device: &Device,
    obs: &Observation,
    state: Option<DreamerState>,
    explore: bool,
) -> Result<(Action, DreamerState)> {
    let state = match state {
        Some(state) => state,
        None => DreamerState {
            latent: world_model.initial_state(1)?,
            action: Tensor::zeros((1, actor.action_dim()), DType::F32, device)?,
        },
    };
    let obs = array_to_tensor(obs, device)?.unsqueeze(0)?;
    let embed = world_model.encode(&obs)?;
    let (post, _) = world_model.observe(&state.latent, &state.action, &embed, explore)?;

    let dist = actor.forward(&post.features()?)?;
    let act = match explore {
        true => dist.sample()?.0,
        false => dist.mode()?,
    }
    .detach();
    let action = Array1::from(act.squeeze(0)?.to_vec1::<f32>()?);

    Ok((
        action,
        DreamerState {
            latent: post.detach(),
            action: act,
        },
    ))
}

/// Snapshot of the world model and the actor of a [`Dreamer`](super::Dreamer)
/// agent used for collecting episodes.
pub struct DreamerPolicy {
    varmap: VarMap,
    world_model: WorldModel,
    actor: Actor,
    device: Device,
}

impl DreamerPolicy {
    /// Builds a policy with freshly initialized parameters on `device`.
    pub fn build(config: &DreamerConfig, device: crate::Device) -> Result<Self> {
        let device = device.build()?;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let world_model = WorldModel::build(vb.pp("world_model"), config.world_model.clone())?;
        let actor = Actor::build(
            vb.pp("actor"),
            &config.actor,
            world_model.feature_dim(),
            config.world_model.action_dim,
        )?;

        Ok(Self {
            varmap,
            world_model,
            actor,
            device,
        })
    }

    /// Overwrites the parameters with those of the same names.
    pub fn load(&self, named_tensors: &NamedTensors) -> Result<()> {
        named_tensors.copy_to(&self.varmap)
    }

    /// Device of the parameters.
    pub fn device(&self) -> &Device {
        &self.device
    }
}

impl Policy for DreamerPolicy {
    type State = DreamerState;

    fn act(
        &self,
        obs: &Observation,
        state: Option<DreamerState>,
        explore: bool,
    ) -> Result<(Action, DreamerState)> {
        act_with(
            &self.world_model,
            &self.actor,
            &self.device,
            obs,
            state,
            explore,
        )
    }
}
