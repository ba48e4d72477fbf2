// Train a small BC policy on generated demonstrations, no benchmark data needed
use bc_core::actions::{flags_to_action, RobotAction};
use bc_core::trainers::learn::run_training;
use bc_core::{BcSettings, Demonstration, FeatureExtractorConfig, ObsShape, Observation, Trajectory};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let root = std::env::temp_dir().join("magical-bc-synthetic");
    let demo_dir = root.join("demos");
    let shape = ObsShape::new(32, 32, 3);

    // bright frames: move up with the gripper closed, dark frames: do nothing
    let up_close = flags_to_action(&[RobotAction::Up, RobotAction::None, RobotAction::Close])?;
    for d in 0..6 {
        let steps = 20 + d;
        let mut obs = Vec::with_capacity(steps + 1);
        let mut acts = Vec::with_capacity(steps);
        for t in 0..=steps {
            let bright = (t / 3 + d) % 2 == 0;
            obs.push(Observation::new(shape, vec![if bright { 220 } else { 30 }; shape.numel()])?);
            if t < steps {
                acts.push(if bright { up_close } else { 0 });
            }
        }
        let demo = Demonstration {
            env_name: "MoveToCorner-Demo-v0".to_string(),
            trajectory: Trajectory::new(obs, acts),
            score: 1.0,
        };
        demo.save(&demo_dir.join(format!("demo-{d}.bin")))?;
    }

    let mut settings = BcSettings::default();
    settings.network_settings = FeatureExtractorConfig::new(64, 1);
    settings.hyperparameters.n_epochs = 10;
    settings.hyperparameters.nholdout = 1;
    settings.checkpoint_settings.scratch = root.join("scratch");
    settings.checkpoint_settings.force = true;
    settings.env_settings.seed = 0;

    let summary = run_training(&settings, &[demo_dir])?;
    for m in &summary.history {
        println!(
            "epoch {:>2}: train loss {:.4} acc {:.3}, validation acc {:.3}",
            m.epoch,
            m.train.loss,
            m.train.accuracy,
            m.validation.as_ref().map_or(f32::NAN, |v| v.accuracy)
        );
    }
    println!("Policy written to {:?}", summary.final_policy);
    Ok(())
}
