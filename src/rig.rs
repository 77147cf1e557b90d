//! IK rig: the set of chains built for one skeleton, and the per-tick
//! sync that either keeps idle goals on their effectors or solves the
//! chain being dragged.

use crate::config::ChainConfig;
use crate::ik::{solve_ccd, ChainId, IkChain, Joint};
use crate::skeleton::Skeleton;
use glam::Vec3;

#[derive(Debug, Clone)]
pub struct IkRig {
    chains: Vec<IkChain>,
    /// CCD passes per tick for the dragged chain
    pub iterations: usize,
}

impl IkRig {
    /// Build chains from configuration. A chain whose effector or any joint
    /// bone is missing from the skeleton is left out.
    pub fn build(skeleton: &Skeleton, configs: &[ChainConfig], iterations: usize) -> Self {
        let mut chains = Vec::with_capacity(configs.len());

        for config in configs {
            let Some(effector) = skeleton.find(&config.effector) else {
                log::warn!(
                    "IK chain {} skipped: effector {} not in skeleton",
                    config.name,
                    config.effector
                );
                continue;
            };

            let joints: Option<Vec<Joint>> = config
                .joints
                .iter()
                .map(|j| {
                    skeleton.find(&j.bone).map(|bone| {
                        Joint::with_limits(bone, j.order, Vec3::from_array(j.min), Vec3::from_array(j.max))
                    })
                })
                .collect();

            match joints {
                Some(joints) if !joints.is_empty() => {
                    chains.push(IkChain::new(config.name.clone(), joints, effector, skeleton));
                }
                _ => log::warn!("IK chain {} skipped: joint bone missing", config.name),
            }
        }

        Self { chains, iterations }
    }

    pub fn empty() -> Self {
        Self {
            chains: Vec::new(),
            iterations: crate::config::DEFAULT_SOLVER_ITERATIONS,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn chain(&self, id: ChainId) -> Option<&IkChain> {
        self.chains.get(id.index())
    }

    pub fn chain_mut(&mut self, id: ChainId) -> Option<&mut IkChain> {
        self.chains.get_mut(id.index())
    }

    pub fn find(&self, name: &str) -> Option<ChainId> {
        self.chains
            .iter()
            .position(|c| c.name == name)
            .map(|i| ChainId(i as u32))
    }

    pub fn ids(&self) -> impl Iterator<Item = ChainId> + '_ {
        (0..self.chains.len()).map(|i| ChainId(i as u32))
    }

    /// Per-tick update. The dragged chain (if any) is solved first, then
    /// every other chain's goal snaps onto its effector, so goals of chains
    /// sharing bones with the dragged one see the solved pose.
    pub fn sync(&mut self, skeleton: &mut Skeleton, dragging: Option<ChainId>) {
        if let Some(id) = dragging {
            self.solve_chain(skeleton, id);
        }
        self.snap_except(skeleton, dragging);
    }

    /// Run the solver on one chain with the rig's iteration count
    pub fn solve_chain(&self, skeleton: &mut Skeleton, id: ChainId) -> usize {
        match self.chains.get(id.index()) {
            Some(chain) => solve_ccd(skeleton, chain, self.iterations),
            None => 0,
        }
    }

    /// Snap every goal onto its effector (after undo/redo or a pose load)
    pub fn snap_all(&mut self, skeleton: &Skeleton) {
        self.snap_except(skeleton, None);
    }

    /// Snap every goal but `skip`'s onto its effector
    pub fn snap_except(&mut self, skeleton: &Skeleton, skip: Option<ChainId>) {
        for (i, chain) in self.chains.iter_mut().enumerate() {
            if skip != Some(ChainId(i as u32)) {
                chain.snap_goal(skeleton);
            }
        }
    }
}
