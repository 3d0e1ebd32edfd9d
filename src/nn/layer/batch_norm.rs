/*
 * @Description  : 批归一化（Batch Normalization）层
 *
 * 训练时用当前小批量的均值与方差归一化，同时把这两个统计量累积到运行量中；
 * 累积完成后由“推导”钩子算出推理期的仿射参数`pgamma`/`pbeta`，推理时只做`X·pgamma + pbeta`。
 *
 * 两种模式决定统计量在何时累积：
 * - `Post`（默认）：训练全部结束后，单独跑一遍仅前向的定型遍；
 * - `Pre`：每个 epoch 的训练小批量之前，先跑一遍仅前向的统计遍。
 */

use super::{Hook, Layer, ParamRegistry, ParamSource, StatsPass, TrainContext};
use crate::nn::{Graph, NnError, ParamValue, Var, VarActivationOps, VarReduceOps, VarShapeOps};
use crate::tensor::{Float, Tensor};
use crate::utils::{RngSource, Shape};
use serde::{Deserialize, Serialize};
use std::cell::Cell;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BnMode {
    /// 在训练结束后的定型遍中累积
    #[default]
    Post,
    /// 在每个 epoch 之前的前向统计遍中累积
    Pre,
}

impl BnMode {
    /// 累积统计量所在的遍
    pub fn pass(self) -> StatsPass {
        match self {
            Self::Post => StatsPass::Finalize,
            Self::Pre => StatsPass::Forward,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum BnMomentum {
    /// 累加各小批量的统计量，推导时再取平均
    #[default]
    Disabled,
    /// 指数滑动：`running = (1-m)·running + m·batch`，m ∈ (0, 1]
    Blend(Float),
}

impl From<bool> for BnMomentum {
    /// `true`即默认的动量0.1
    fn from(enabled: bool) -> Self {
        if enabled { Self::Blend(0.1) } else { Self::Disabled }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatchNormConfig {
    pub eps: Float,
    pub mode: BnMode,
    pub momentum: BnMomentum,
}

impl Default for BatchNormConfig {
    fn default() -> Self {
        Self {
            eps: 1e-6,
            mode: BnMode::Post,
            momentum: BnMomentum::Disabled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BnRoutine {
    /// 计数清零；未启用动量时同时清零运行量
    Reset,
    /// 小批量计数加一
    Count,
    /// 由运行量推导推理期的仿射参数
    Derive,
}

/// 模式 × 钩子 → 例程 的分派表，未列出的组合什么也不做
const fn routine(mode: BnMode, hook: Hook) -> Option<BnRoutine> {
    match (mode, hook) {
        (BnMode::Pre, Hook::PreEpoch) | (BnMode::Post, Hook::PreFinalize) => Some(BnRoutine::Reset),
        (BnMode::Pre, Hook::PreMinibatch) | (BnMode::Post, Hook::FinalizePreMinibatch) => {
            Some(BnRoutine::Count)
        }
        (BnMode::Pre, Hook::PostEpoch) | (BnMode::Post, Hook::PostFinalize) => {
            Some(BnRoutine::Derive)
        }
        _ => None,
    }
}

#[derive(Debug)]
pub struct BatchNorm {
    config: BatchNormConfig,
    shape: Vec<usize>,
    gamma: Var,
    beta: Var,
    sum_mean: Var,
    sum_var: Var,
    pgamma: Var,
    pbeta: Var,
    nmini: Cell<usize>,
    registry: ParamRegistry,
}

impl BatchNorm {
    /// `nfeat`为特征的形状；4阶（卷积）输入时即通道数
    pub fn new(
        graph: &Graph,
        nfeat: impl Into<Shape>,
        config: BatchNormConfig,
    ) -> Result<Self, NnError> {
        if !(config.eps > 0.0) {
            return Err(NnError::Configuration(format!(
                "批归一化的eps须为正数，实际为{}",
                config.eps
            )));
        }
        if let BnMomentum::Blend(m) = config.momentum {
            if !(m > 0.0 && m <= 1.0) {
                return Err(NnError::Configuration(format!(
                    "批归一化的动量须在(0, 1]内，实际为{}",
                    m
                )));
            }
        }
        let shape = nfeat.into().0;

        let mut registry = ParamRegistry::new(graph);
        let gamma = registry.new_param("bn_gamma", &shape, ParamSource::Scalar(1.0))?;
        let beta = registry.new_param("bn_beta", &shape, ParamSource::Scalar(0.0))?;

        let sum_mean = graph.zeros_parameter(&shape, "bn_sum_means");
        let sum_var = graph.zeros_parameter(&shape, "bn_sum_vars");
        let pending = || ParamValue::Uninitialized {
            shape: shape.clone(),
        };
        let pgamma = graph.parameter(pending(), "bn_pgamma");
        let pbeta = graph.parameter(pending(), "bn_pbeta");

        Ok(Self {
            config,
            shape,
            gamma,
            beta,
            sum_mean,
            sum_var,
            pgamma,
            pbeta,
            nmini: Cell::new(0),
            registry,
        })
    }

    pub const fn config(&self) -> &BatchNormConfig {
        &self.config
    }

    pub const fn gamma(&self) -> &Var {
        &self.gamma
    }

    pub const fn beta(&self) -> &Var {
        &self.beta
    }

    /// 运行均值（未启用动量时为求和）
    pub const fn running_mean(&self) -> &Var {
        &self.sum_mean
    }

    pub const fn running_var(&self) -> &Var {
        &self.sum_var
    }

    pub const fn pgamma(&self) -> &Var {
        &self.pgamma
    }

    pub const fn pbeta(&self) -> &Var {
        &self.pbeta
    }

    pub fn minibatch_count(&self) -> usize {
        self.nmini.get()
    }

    /// 当前累积所得的均值与方差：未启用动量时把各小批量之和换算为平均（方差除以n-1），
    /// 启用动量时即运行量本身。累积量本身不被改写
    pub fn running_stats(&self) -> Result<(Tensor, Tensor), NnError> {
        let mut mean = self.sum_mean.value()?;
        let mut var = self.sum_var.value()?;
        let n = self.nmini.get();
        if self.config.momentum == BnMomentum::Disabled && n > 1 {
            mean = mean / n as Float;
            var = var / (n - 1) as Float;
        }
        Ok((mean, var))
    }

    fn stat_shape(&self) -> Vec<isize> {
        self.shape.iter().map(|&d| d as isize).collect()
    }

    /// 4阶输入时把逐通道的参数变形为 [1, C, 1, 1] 以便广播
    fn per_channel(&self, param: &Var, conv: bool) -> Result<Var, NnError> {
        Ok(if conv {
            param.reshape(&[1, -1, 1, 1])?
        } else {
            param.clone()
        })
    }

    fn reset_accumulators(&self) -> Result<(), NnError> {
        let zeros = Tensor::zeros(&self.shape);
        self.sum_mean.set_value(&zeros)?;
        self.sum_var.set_value(&zeros)?;
        Ok(())
    }

    fn run(&self, routine: BnRoutine) -> Result<(), NnError> {
        log::debug!("批归一化（{:?}模式）执行{:?}", self.config.mode, routine);
        match routine {
            BnRoutine::Reset => {
                self.nmini.set(0);
                if self.config.momentum == BnMomentum::Disabled {
                    self.reset_accumulators()?;
                }
            }
            BnRoutine::Count => self.nmini.set(self.nmini.get() + 1),
            BnRoutine::Derive => {
                let (mean, var) = self.running_stats()?;
                let std = (var + self.config.eps).sqrt();
                let pgamma = self.gamma.value()?.try_div(&std)?;
                let pbeta = self.beta.value()?.try_sub(&pgamma.try_mul(&mean)?)?;
                self.pgamma.set_value(&pgamma)?;
                self.pbeta.set_value(&pbeta)?;
            }
        }
        Ok(())
    }
}

impl Layer for BatchNorm {
    fn layer_name(&self) -> &str {
        "BatchNorm"
    }

    fn make_inputs(&self, graph: &Graph, name: &str) -> Var {
        graph.input(1 + self.shape.len(), name)
    }

    fn train_expr(&self, x: &Var, ctx: &mut TrainContext) -> Result<Var, NnError> {
        let collector = ctx.pass_updates(self.config.mode.pass())?;

        // 卷积输入还需在两个空间轴上求平均，各通道独立
        let conv = x.ndim() == 4;
        let axes: &[usize] = if conv { &[0, 2, 3] } else { &[0] };
        let mean = x.mean(Some(axes), true)?;
        let centered = x.try_sub(&mean)?;
        let var = centered.try_mul(&centered)?.mean(Some(axes), true)?;

        let batch_mean = mean.reshape(&self.stat_shape())?;
        let batch_var = var.reshape(&self.stat_shape())?;
        let (new_mean, new_var) = match self.config.momentum {
            BnMomentum::Disabled => (
                self.sum_mean.try_add(&batch_mean)?,
                self.sum_var.try_add(&batch_var)?,
            ),
            BnMomentum::Blend(m) => (
                (&self.sum_mean * (1.0 - m)).try_add(&(&batch_mean * m))?,
                (&self.sum_var * (1.0 - m)).try_add(&(&batch_var * m))?,
            ),
        };
        collector.push((self.sum_mean.clone(), new_mean));
        collector.push((self.sum_var.clone(), new_var));

        let xn = centered.try_div(&(&var + self.config.eps).sqrt()?)?;
        let gamma = self.per_channel(&self.gamma, conv)?;
        let beta = self.per_channel(&self.beta, conv)?;
        Ok(xn.try_mul(&gamma)?.try_add(&beta)?)
    }

    fn pred_expr(&self, x: &Var) -> Result<Var, NnError> {
        let conv = x.ndim() == 4;
        let pgamma = self.per_channel(&self.pgamma, conv)?;
        let pbeta = self.per_channel(&self.pbeta, conv)?;
        Ok(x.try_mul(&pgamma)?.try_add(&pbeta)?)
    }

    fn registry(&self) -> Option<&ParamRegistry> {
        Some(&self.registry)
    }

    /// 除了gamma/beta的常规重新初始化，运行量也一并清零
    fn reinit(&self, rng: RngSource<'_>) -> Result<(), NnError> {
        self.registry.reinit(rng)?;
        self.reset_accumulators()
    }

    fn on_hook(&self, hook: Hook) -> Result<(), NnError> {
        match routine(self.config.mode, hook) {
            Some(routine) => self.run(routine),
            None => Ok(()),
        }
    }
}
