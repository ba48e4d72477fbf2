// Flattened (observation, action, info) transitions built from trajectories
use crate::actions::NUM_ACTIONS;
use crate::error::{BcError, Result};
use crate::trajectory::{ObsShape, Observation, Trajectory};
use burn::tensor::{backend::Backend, Int, Tensor, TensorData};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashMap;

/// Auxiliary per-transition record. Always empty for demonstrations.
pub type TransitionInfo = HashMap<String, f32>;

#[derive(Debug, Clone, PartialEq)]
pub struct Transition<'a> {
    pub obs: &'a Observation,
    pub act: u32,
    pub info: &'a TransitionInfo,
}

/// Index-addressable transitions assembled from one or more trajectories,
/// in trajectory order and temporal order within each trajectory.
#[derive(Debug, Clone)]
pub struct TransitionsDataset {
    obs: Vec<Observation>,
    acts: Vec<u32>,
    infos: Vec<TransitionInfo>,
    obs_shape: ObsShape,
}

impl TransitionsDataset {
    /// Concatenate every trajectory's observations (minus the terminal one)
    /// and actions.
    pub fn from_trajectories<'a, I>(trajectories: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Trajectory>,
    {
        let mut obs = Vec::new();
        let mut acts = Vec::new();
        let mut obs_shape = None;
        let mut count = 0;

        for (index, traj) in trajectories.into_iter().enumerate() {
            count += 1;
            if traj.obs.len() != traj.acts.len() + 1 {
                return Err(BcError::TrajectoryLength {
                    index,
                    observations: traj.obs.len(),
                    actions: traj.acts.len(),
                });
            }
            if let Some((step, &action)) = traj
                .acts
                .iter()
                .enumerate()
                .find(|&(_, &a)| a as usize >= NUM_ACTIONS)
            {
                return Err(BcError::TrajectoryAction { index, step, action });
            }
            for o in &traj.obs[..traj.acts.len()] {
                if o.pixels.len() != o.shape.numel() {
                    return Err(BcError::ObservationShape {
                        expected: format!("{} ({} values)", o.shape, o.shape.numel()),
                        found: format!("{} values", o.pixels.len()),
                    });
                }
                match obs_shape {
                    None => obs_shape = Some(o.shape),
                    Some(expected) if expected != o.shape => {
                        return Err(BcError::ObservationShape {
                            expected: expected.to_string(),
                            found: o.shape.to_string(),
                        });
                    }
                    Some(_) => {}
                }
                obs.push(o.clone());
            }
            acts.extend_from_slice(&traj.acts);
        }

        if count == 0 {
            return Err(BcError::EmptyTrajectories);
        }
        // only zero-action trajectories: nothing to pair
        let obs_shape = obs_shape.ok_or(BcError::EmptyTrajectories)?;

        let infos = vec![TransitionInfo::new(); acts.len()];
        log::debug!("Flattened {} trajectories into {} transitions", count, acts.len());
        Ok(Self { obs, acts, infos, obs_shape })
    }

    pub fn len(&self) -> usize {
        self.acts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.acts.is_empty()
    }

    pub fn obs_shape(&self) -> ObsShape {
        self.obs_shape
    }

    pub fn get(&self, index: usize) -> Option<Transition<'_>> {
        Some(Transition {
            obs: self.obs.get(index)?,
            act: *self.acts.get(index)?,
            info: self.infos.get(index)?,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = Transition<'_>> {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    pub fn actions(&self) -> &[u32] {
        &self.acts
    }

    /// Shuffled minibatch index lists covering the dataset once. The final
    /// batch may be smaller than `batch_size`.
    pub fn shuffled_batches<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Vec<Vec<usize>> {
        let mut indices: Vec<usize> = (0..self.len()).collect();
        indices.shuffle(rng);
        indices.chunks(batch_size.max(1)).map(|c| c.to_vec()).collect()
    }

    /// In-order minibatch index lists, for evaluation.
    pub fn sequential_batches(&self, batch_size: usize) -> Vec<Vec<usize>> {
        let indices: Vec<usize> = (0..self.len()).collect();
        indices.chunks(batch_size.max(1)).map(|c| c.to_vec()).collect()
    }

    /// Stack the selected transitions into network-ready tensors.
    pub fn batch<B: Backend>(&self, indices: &[usize], device: &B::Device) -> BcBatch<B> {
        let [c, h, w] = self.obs_shape.chw();
        let mut pixels = Vec::with_capacity(indices.len() * self.obs_shape.numel());
        let mut targets = Vec::with_capacity(indices.len());
        for &i in indices {
            self.obs[i].extend_chw(&mut pixels);
            targets.push(self.acts[i] as i64);
        }
        let n = indices.len();
        let obs = Tensor::<B, 4>::from_data(TensorData::new(pixels, [n, c, h, w]), device);
        let acts = Tensor::<B, 1, Int>::from_data(TensorData::new(targets, [n]), device);
        BcBatch { obs, acts }
    }
}

/// A minibatch of observations `[batch, channels, height, width]` and their
/// expert actions `[batch]`.
#[derive(Debug, Clone)]
pub struct BcBatch<B: Backend> {
    pub obs: Tensor<B, 4>,
    pub acts: Tensor<B, 1, Int>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::NdArray;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn shape() -> ObsShape {
        ObsShape::new(2, 2, 1)
    }

    fn traj(first: u8, n_acts: usize) -> Trajectory {
        let obs = (0..=n_acts)
            .map(|i| Observation::new(shape(), vec![first + i as u8; 4]).unwrap())
            .collect();
        let acts = (0..n_acts).map(|i| (first as u32 + i as u32) % 18).collect();
        Trajectory::new(obs, acts)
    }

    #[test]
    fn test_terminal_observation_dropped() {
        let t = traj(0, 4);
        let ds = TransitionsDataset::from_trajectories([&t]).unwrap();
        assert_eq!(ds.len(), 4);
        for (i, tr) in ds.iter().enumerate() {
            assert_eq!(tr.obs, &t.obs[i]);
            assert_eq!(tr.act, t.acts[i]);
            assert!(tr.info.is_empty());
        }
        assert!(ds.get(4).is_none());
    }

    #[test]
    fn test_lengths_sum_and_order_preserved() {
        let trajs = vec![traj(0, 3), traj(10, 1), traj(20, 5)];
        let ds = TransitionsDataset::from_trajectories(&trajs).unwrap();
        assert_eq!(ds.len(), 3 + 1 + 5);
        let firsts: Vec<u8> = ds.iter().map(|t| t.obs.pixels[0]).collect();
        assert_eq!(firsts, vec![0, 1, 2, 10, 20, 21, 22, 23, 24]);
    }

    #[test]
    fn test_empty_collection_rejected() {
        let err = TransitionsDataset::from_trajectories(&Vec::<Trajectory>::new()).unwrap_err();
        assert!(matches!(err, BcError::EmptyTrajectories));
        assert!(err.to_string().contains("empty trajectory collection"));
    }

    #[test]
    fn test_length_invariant_violation_reported() {
        let mut bad = traj(0, 3);
        bad.obs.pop();
        let trajs = vec![traj(0, 2), bad];
        match TransitionsDataset::from_trajectories(&trajs).unwrap_err() {
            BcError::TrajectoryLength { index, observations, actions } => {
                assert_eq!((index, observations, actions), (1, 3, 3));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_mixed_shapes_rejected() {
        let mut other = traj(0, 1);
        other.obs = vec![Observation::zeros(ObsShape::new(1, 1, 1)); 2];
        let trajs = vec![traj(0, 1), other];
        assert!(matches!(
            TransitionsDataset::from_trajectories(&trajs),
            Err(BcError::ObservationShape { .. })
        ));
    }

    #[test]
    fn test_out_of_range_action_rejected() {
        let mut bad = traj(0, 2);
        bad.acts[1] = 40;
        let trajs = vec![traj(0, 1), bad];
        match TransitionsDataset::from_trajectories(&trajs).unwrap_err() {
            BcError::TrajectoryAction { index, step, action } => {
                assert_eq!((index, step, action), (1, 1, 40));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_pixel_count_checked() {
        let mut bad = traj(0, 2);
        bad.obs[1].pixels.truncate(1);
        assert!(matches!(
            TransitionsDataset::from_trajectories([&bad]),
            Err(BcError::ObservationShape { .. })
        ));
    }

    #[test]
    fn test_shuffled_batches_cover_every_index_once() {
        let ds = TransitionsDataset::from_trajectories(&[traj(0, 7), traj(50, 3)]).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let batches = ds.shuffled_batches(4, &mut rng);
        assert_eq!(batches.iter().map(Vec::len).collect::<Vec<_>>(), vec![4, 4, 2]);
        let mut all: Vec<usize> = batches.into_iter().flatten().collect();
        all.sort();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_batch_tensor_shapes() {
        let ds = TransitionsDataset::from_trajectories(&[traj(0, 3)]).unwrap();
        let device = Default::default();
        let batch = ds.batch::<NdArray>(&[2, 0], &device);
        assert_eq!(batch.obs.dims(), [2, 1, 2, 2]);
        assert_eq!(batch.acts.dims(), [2]);
        let acts: Vec<i64> = batch.acts.into_data().iter::<i64>().collect();
        assert_eq!(acts, vec![2, 0]);
    }
}
