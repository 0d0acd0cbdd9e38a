use rand::Rng;
use shared::DefenderPolicy;
use sim::{ActionError, Model, ACTION_WIDTH};

/// Action vector for one learned defender under `policy`
pub fn action<R: Rng + ?Sized>(policy: DefenderPolicy, rng: &mut R) -> [f64; ACTION_WIDTH] {
    match policy {
        // No movement, honest fitness (scale 1, offset 0)
        DefenderPolicy::Passive => [0.0, 0.0, 0.0, 0.0, 1.0],
        DefenderPolicy::Random => std::array::from_fn(|_| rng.gen_range(-1.0..=1.0)),
    }
}

/// Hand every learned defender of `model` its next action
pub fn drive<R: Rng + ?Sized>(
    model: &mut Model,
    policy: DefenderPolicy,
    rng: &mut R,
) -> Result<(), ActionError> {
    let ids: Vec<u32> = model.learned_ids().collect();
    for id in ids {
        model.apply_action(id, &action(policy, rng))?;
    }
    Ok(())
}
