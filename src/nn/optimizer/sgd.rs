/*
 * @Description  : 小批量随机梯度下降：p ← p - lr·∇p
 */

use super::base::{OptimizerCore, OptimizerOptions, StreamingOptimizer};
use crate::nn::layer::Layer;
use crate::nn::{Cost, Function, FunctionInput, Graph, NnError};
use crate::tensor::{Float, Tensor};

/// 每次`fit_epoch`的参数
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SgdArgs {
    /// 学习率；`None`则使用构造时给出的默认值
    pub lr: Option<Float>,
}

impl SgdArgs {
    pub const fn lr(lr: Float) -> Self {
        Self { lr: Some(lr) }
    }
}

pub struct Sgd<'a> {
    core: OptimizerCore<'a>,
    train_fn: Function,
    default_lr: Float,
}

impl<'a> Sgd<'a> {
    pub fn new(
        graph: &Graph,
        model: &'a dyn Layer,
        cost: &'a dyn Cost,
        options: OptimizerOptions,
        default_lr: Float,
    ) -> Result<Self, NnError> {
        let core = OptimizerCore::new(graph, model, cost, options)?;
        let lrate = graph.input(0, "lrate");

        let mut updates = core.layer_updates().clone();
        for (p, g) in core.gradients()? {
            let step = lrate.try_mul(&g)?;
            let new_p = p.try_sub(&step)?;
            updates.push((p, new_p));
        }
        let train_fn = graph.function(
            "StreamingSgd train",
            vec![
                FunctionInput::new(core.x()),
                FunctionInput::new(core.t()),
                FunctionInput::new(&lrate),
            ],
            core.outs(),
            &updates,
        )?;

        Ok(Self {
            core,
            train_fn,
            default_lr,
        })
    }

    pub const fn default_lr(&self) -> Float {
        self.default_lr
    }
}

impl<'a> StreamingOptimizer<'a> for Sgd<'a> {
    type Args = SgdArgs;

    fn core(&self) -> &OptimizerCore<'a> {
        &self.core
    }

    fn step(&mut self, x: &Tensor, t: &Tensor, args: &SgdArgs) -> Result<Vec<Tensor>, NnError> {
        let lr = args.lr.unwrap_or(self.default_lr);
        Ok(self
            .train_fn
            .call(&[x.clone(), t.clone(), Tensor::scalar(lr)])?)
    }
}
