/*
 * @Description  : 动量法（CM）与 Nesterov 加速梯度（NAG）
 *
 * 两者的速度更新相同：v ← μ·v - lr·∇p
 * - CM：p ← p + v
 * - NAG（单次求梯度的改写形式）：p ← p + μ·v - lr·∇p，其中v为更新后的速度
 */

use super::base::{OptimizerCore, OptimizerOptions, StreamingOptimizer};
use crate::nn::layer::Layer;
use crate::nn::{Cost, Function, FunctionInput, Graph, NnError, NodeId, Var};
use crate::tensor::{Float, Tensor};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MomentumConfig {
    /// 默认动量，可在每次`fit_epoch`中覆盖
    pub momentum: Float,
    pub nesterov: bool,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            momentum: 0.9,
            nesterov: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MomentumArgs {
    pub lr: Option<Float>,
    pub momentum: Option<Float>,
}

pub struct Momentum<'a> {
    core: OptimizerCore<'a>,
    config: MomentumConfig,
    default_lr: Float,
    /// 每个参数的速度，以参数节点为键
    velocities: HashMap<NodeId, Var>,
    train_fn: Function,
}

impl<'a> Momentum<'a> {
    pub fn new(
        graph: &Graph,
        model: &'a dyn Layer,
        cost: &'a dyn Cost,
        options: OptimizerOptions,
        default_lr: Float,
        config: MomentumConfig,
    ) -> Result<Self, NnError> {
        let core = OptimizerCore::new(graph, model, cost, options)?;
        let lrate = graph.input(0, "lrate");
        let momentum = graph.input(0, "momentum");

        let mut velocities = HashMap::new();
        let mut updates = core.layer_updates().clone();
        for (p, g) in core.gradients()? {
            let shape = p.param_value()?.shape().to_vec();
            let v = graph.zeros_parameter(&shape, &format!("v_{}", p.name()));

            let lr_g = lrate.try_mul(&g)?;
            let new_v = momentum.try_mul(&v)?.try_sub(&lr_g)?;
            let new_p = if config.nesterov {
                p.try_add(&momentum.try_mul(&new_v)?)?.try_sub(&lr_g)?
            } else {
                p.try_add(&new_v)?
            };
            updates.push((v.clone(), new_v));
            updates.push((p.clone(), new_p));
            velocities.insert(p.node_id(), v);
        }
        let name = if config.nesterov {
            "StreamingNesterov train"
        } else {
            "StreamingMomentum train"
        };
        let train_fn = graph.function(
            name,
            vec![
                FunctionInput::new(core.x()),
                FunctionInput::new(core.t()),
                FunctionInput::new(&lrate),
                FunctionInput::with_default(&momentum, Tensor::scalar(config.momentum)),
            ],
            core.outs(),
            &updates,
        )?;

        Ok(Self {
            core,
            config,
            default_lr,
            velocities,
            train_fn,
        })
    }

    pub const fn config(&self) -> &MomentumConfig {
        &self.config
    }

    /// 参数`param`对应的速度
    pub fn velocity(&self, param: &Var) -> Option<&Var> {
        self.velocities.get(&param.node_id())
    }
}

impl<'a> StreamingOptimizer<'a> for Momentum<'a> {
    type Args = MomentumArgs;

    fn core(&self) -> &OptimizerCore<'a> {
        &self.core
    }

    fn step(&mut self, x: &Tensor, t: &Tensor, args: &MomentumArgs) -> Result<Vec<Tensor>, NnError> {
        let lr = args.lr.unwrap_or(self.default_lr);
        let mut inputs = vec![x.clone(), t.clone(), Tensor::scalar(lr)];
        // 不覆盖时由函数的默认值提供动量
        if let Some(momentum) = args.momentum {
            inputs.push(Tensor::scalar(momentum));
        }
        Ok(self.train_fn.call(&inputs)?)
    }
}
