/*
 * @Description  : Layer 模块 - 可组合的可微层及其生命周期钩子
 *
 * 每个层声明自己的输入占位符、训练期与推理期的表达式，并持有一个参数登记表。
 * 训练编排者按以下嵌套顺序调用钩子：
 * - 训练遍：pre_epoch → {pre_minibatch → 一步训练 → post_minibatch}* → post_epoch
 * - 定型遍：pre_finalize → {finalize_pre_minibatch → 仅前向 → finalize_post_minibatch}* → post_finalize
 */

mod activation;
mod batch_norm;
mod conv2d;
mod dropout;
mod linear;
mod max_pool2d;
mod params;
mod sequential;

pub use activation::{ReLU, ReluConfig, Sigmoid, Softmax, Tanh};
pub use batch_norm::{BatchNorm, BatchNormConfig, BnMode, BnMomentum};
pub use conv2d::{Conv2D, Conv2DConfig};
pub use dropout::Dropout;
pub use linear::FullyConnected;
pub use max_pool2d::{PoolConfig, SpatialMaxPool};
pub use params::{ParamKind, ParamRegistry, ParamSource};
pub use sequential::Sequential;

use crate::nn::init::Initializer;
use crate::nn::{Graph, NnError, Updates, Var};
use crate::tensor::{Float, Tensor};
use crate::utils::RngSource;
use serde::{Deserialize, Serialize};

/// 生命周期钩子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Hook {
    PreEpoch,
    PreMinibatch,
    PostMinibatch,
    PostEpoch,
    PreFinalize,
    FinalizePreMinibatch,
    FinalizePostMinibatch,
    PostFinalize,
}

impl Hook {
    /// 在`layer`上触发本钩子（经由对应的具名方法，覆盖了具名方法的层也能收到）
    pub fn fire<L: Layer + ?Sized>(self, layer: &L) -> Result<(), NnError> {
        match self {
            Self::PreEpoch => layer.pre_epoch(),
            Self::PreMinibatch => layer.pre_minibatch(),
            Self::PostMinibatch => layer.post_minibatch(),
            Self::PostEpoch => layer.post_epoch(),
            Self::PreFinalize => layer.pre_finalize(),
            Self::FinalizePreMinibatch => layer.finalize_pre_minibatch(),
            Self::FinalizePostMinibatch => layer.finalize_post_minibatch(),
            Self::PostFinalize => layer.post_finalize(),
        }
    }
}

/// 把若干个小批量（或若干次增强）的输出合成一个结果
pub type Aggregator = fn(&[Tensor]) -> Result<Tensor, NnError>;

/// 只在仅前向的遍中执行的统计更新所属的遍
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsPass {
    /// 每个 epoch 之前的前向统计遍，对应`fwd_updates`
    Forward,
    /// 训练结束后的定型遍，对应`fin_updates`
    Finalize,
}

impl StatsPass {
    pub fn key(self) -> &'static str {
        match self {
            Self::Forward => "fwd_updates",
            Self::Finalize => "fin_updates",
        }
    }
}

#[derive(Debug, Default)]
enum PassUpdates {
    #[default]
    Off,
    Single(StatsPass, Updates),
    /// 两个遍各有一个收集器，每个层只拿到自己那一遍的
    Routed { fwd: Updates, fin: Updates },
}

/// `train_expr`期间层可追加的更新收集器
///
/// - `updates`：随每一步训练一同执行的更新
/// - `fwd_updates`：仅在每个 epoch 之前的前向统计遍中执行
/// - `fin_updates`：仅在训练结束后的定型遍中执行
///
/// 后两者经由`pass_updates`按层所需的遍交出：对单个层而言，
/// 上下文要么只收集它那一遍，要么按遍分发；收集的是另一遍或都不收集时报错
#[derive(Debug, Default)]
pub struct TrainContext {
    pub updates: Updates,
    pass: PassUpdates,
}

impl TrainContext {
    /// 只收集普通训练更新
    pub fn new() -> Self {
        Self::default()
    }

    /// 两个遍的更新都收集，并按各层所需的遍分发，
    /// 同一模型中两种模式的层可以共存
    pub fn routed() -> Self {
        Self {
            updates: Vec::new(),
            pass: PassUpdates::Routed {
                fwd: Vec::new(),
                fin: Vec::new(),
            },
        }
    }

    pub fn with_fwd_updates() -> Self {
        Self {
            updates: Vec::new(),
            pass: PassUpdates::Single(StatsPass::Forward, Vec::new()),
        }
    }

    pub fn with_fin_updates() -> Self {
        Self {
            updates: Vec::new(),
            pass: PassUpdates::Single(StatsPass::Finalize, Vec::new()),
        }
    }

    /// 交出`pass`的收集器
    pub fn pass_updates(&mut self, pass: StatsPass) -> Result<&mut Updates, NnError> {
        match (&mut self.pass, pass) {
            (PassUpdates::Single(own, updates), _) if *own == pass => Ok(updates),
            (PassUpdates::Routed { fwd, .. }, StatsPass::Forward) => Ok(fwd),
            (PassUpdates::Routed { fin, .. }, StatsPass::Finalize) => Ok(fin),
            (PassUpdates::Single(own, _), _) => Err(NnError::ProgrammingInvariant(format!(
                "训练上下文收集的是`{}`，而该层需要`{}`",
                own.key(),
                pass.key()
            ))),
            (PassUpdates::Off, _) => Err(NnError::ProgrammingInvariant(format!(
                "训练上下文没有收集`{}`",
                pass.key()
            ))),
        }
    }

    /// 取走`pass`已收集的更新；上下文不收集该遍时为`None`
    pub fn take_pass_updates(&mut self, pass: StatsPass) -> Option<Updates> {
        self.pass_updates(pass).ok().map(std::mem::take)
    }
}

/// 层
///
/// 除`layer_name`与`train_expr`外都有默认实现：
/// - 带参数的层通过`registry`交出参数登记表，参数列表与`reinit`随之获得；
/// - 激活层通过`weight_initializer`/`bias_initializer`告知前一层应如何初始化；
/// - 八个钩子默认都经由`on_hook`分派，默认什么也不做。
pub trait Layer {
    fn layer_name(&self) -> &str;

    /// 带样本维的输入占位符，默认为 [batch, features] 的2阶张量
    fn make_inputs(&self, graph: &Graph, name: &str) -> Var {
        graph.input(2, name)
    }

    /// 训练期的输出表达式
    fn train_expr(&self, x: &Var, ctx: &mut TrainContext) -> Result<Var, NnError>;

    /// 推理期的输出表达式，默认与训练期相同（更新全部丢弃）
    fn pred_expr(&self, x: &Var) -> Result<Var, NnError> {
        self.train_expr(x, &mut TrainContext::routed())
    }

    /// 把一个 epoch 中各小批量的输出合并，默认沿样本维拼接
    fn batch_agg(&self) -> Aggregator {
        concat_outputs
    }

    /// 把同一输入的多个输出（例如测试期增强）合并，默认取算术平均
    fn ensembler(&self) -> Aggregator {
        mean_outputs
    }

    fn registry(&self) -> Option<&ParamRegistry> {
        None
    }

    /// 全部可训练参数，顺序在构造后即固定
    fn params(&self) -> Vec<Var> {
        self.registry().map(|r| r.params().to_vec()).unwrap_or_default()
    }

    fn weights(&self) -> Vec<Var> {
        self.registry().map(|r| r.weights().to_vec()).unwrap_or_default()
    }

    fn biases(&self) -> Vec<Var> {
        self.registry().map(|r| r.biases().to_vec()).unwrap_or_default()
    }

    /// 以各参数绑定的初始化器写入真实的值
    fn reinit(&self, rng: RngSource<'_>) -> Result<(), NnError> {
        match self.registry() {
            Some(registry) => registry.reinit(rng),
            None => Ok(()),
        }
    }

    /// 紧接在本层之前的带参数层，其权重应使用的初始化策略
    fn weight_initializer(&self) -> Option<Initializer> {
        None
    }

    fn bias_initializer(&self) -> Option<Initializer> {
        None
    }

    fn on_hook(&self, _hook: Hook) -> Result<(), NnError> {
        Ok(())
    }

    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓钩子↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
    fn pre_epoch(&self) -> Result<(), NnError> {
        self.on_hook(Hook::PreEpoch)
    }

    fn pre_minibatch(&self) -> Result<(), NnError> {
        self.on_hook(Hook::PreMinibatch)
    }

    fn post_minibatch(&self) -> Result<(), NnError> {
        self.on_hook(Hook::PostMinibatch)
    }

    fn post_epoch(&self) -> Result<(), NnError> {
        self.on_hook(Hook::PostEpoch)
    }

    fn pre_finalize(&self) -> Result<(), NnError> {
        self.on_hook(Hook::PreFinalize)
    }

    fn finalize_pre_minibatch(&self) -> Result<(), NnError> {
        self.on_hook(Hook::FinalizePreMinibatch)
    }

    fn finalize_post_minibatch(&self) -> Result<(), NnError> {
        self.on_hook(Hook::FinalizePostMinibatch)
    }

    fn post_finalize(&self) -> Result<(), NnError> {
        self.on_hook(Hook::PostFinalize)
    }
    /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑钩子↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/
}

fn concat_outputs(outputs: &[Tensor]) -> Result<Tensor, NnError> {
    Ok(Tensor::concat_rows(outputs)?)
}

fn mean_outputs(outputs: &[Tensor]) -> Result<Tensor, NnError> {
    let (first, rest) = outputs
        .split_first()
        .ok_or(crate::errors::TensorError::EmptyList)?;
    let mut sum = first.clone();
    for output in rest {
        sum = sum.try_add(output)?;
    }
    Ok(sum / outputs.len() as Float)
}
