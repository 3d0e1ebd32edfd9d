/*
 * @Description  : 流式小批量优化器的公共部分
 *
 * 构造时绑定模型与代价，只建一次代价表达式；各具体优化器据此求导并编译出唯一的训练步
 * `(X, t, 标量参数…) → (代价, 额外输出…)`。
 */

use crate::nn::layer::{Hook, Layer, TrainContext};
use crate::nn::{Cost, Graph, NnError, Updates, Var};
use crate::tensor::{Float, Tensor};
use crate::utils::batched;

/// 数据增强：每个小批量送入训练步之前对其变换（可参考目标）
pub trait Augmentation {
    fn augment(&mut self, data: &Tensor, targets: &Tensor) -> Result<Tensor, NnError>;
}

/// 输入/目标占位符的来源
#[derive(Debug, Clone, Default)]
pub enum Placeholder {
    /// 以默认名称新建
    #[default]
    Fresh,
    /// 以给定名称新建
    Named(String),
    /// 使用调用方已建好的占位符
    Given(Var),
}

#[derive(Debug, Clone)]
pub struct OptimizerOptions {
    /// 默认批大小，可在`fit_epoch`中覆盖
    pub batchsize: usize,
    /// 每一步随代价一同返回的额外输出
    pub extra_outs: Vec<Var>,
    pub x: Placeholder,
    pub t: Placeholder,
}

impl OptimizerOptions {
    pub fn new(batchsize: usize) -> Self {
        Self {
            batchsize,
            extra_outs: Vec::new(),
            x: Placeholder::Fresh,
            t: Placeholder::Fresh,
        }
    }
}

/// 各优化器共享的状态：借用的模型与代价，以及建好的输入、目标与输出表达式
pub struct OptimizerCore<'a> {
    model: &'a dyn Layer,
    cost: &'a dyn Cost,
    graph: Graph,
    batchsize: usize,
    x: Var,
    t: Var,
    cost_expr: Var,
    outs: Vec<Var>,
    /// 模型在训练表达式中声明的、须随每一步执行的更新
    layer_updates: Updates,
}

impl<'a> OptimizerCore<'a> {
    pub fn new(
        graph: &Graph,
        model: &'a dyn Layer,
        cost: &'a dyn Cost,
        options: OptimizerOptions,
    ) -> Result<Self, NnError> {
        if options.batchsize == 0 {
            return Err(NnError::Configuration("批大小必须大于0".to_string()));
        }
        let x = match options.x {
            Placeholder::Fresh => model.make_inputs(graph, "Xin"),
            Placeholder::Named(name) => model.make_inputs(graph, &name),
            Placeholder::Given(x) => x,
        };
        let t = match options.t {
            Placeholder::Fresh => cost.make_target(graph, "targets"),
            Placeholder::Named(name) => cost.make_target(graph, &name),
            Placeholder::Given(t) => t,
        };
        if !graph.same_graph(&x) || !graph.same_graph(&t) {
            return Err(NnError::Configuration(
                "输入与目标占位符必须属于优化器所用的图".to_string(),
            ));
        }

        // 统计遍/定型遍的更新在训练步中不执行，这里只为让层能正常建图
        let mut ctx = TrainContext::routed();
        let output = model.train_expr(&x, &mut ctx)?;
        let cost_expr = cost.cost_expr(&output, &t)?;
        let outs = std::iter::once(cost_expr.clone())
            .chain(options.extra_outs)
            .collect();

        Ok(Self {
            model,
            cost,
            graph: graph.clone(),
            batchsize: options.batchsize,
            x,
            t,
            cost_expr,
            outs,
            layer_updates: ctx.updates,
        })
    }

    pub fn model(&self) -> &'a dyn Layer {
        self.model
    }

    pub fn cost(&self) -> &'a dyn Cost {
        self.cost
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub const fn batchsize(&self) -> usize {
        self.batchsize
    }

    pub fn x(&self) -> &Var {
        &self.x
    }

    pub fn t(&self) -> &Var {
        &self.t
    }

    pub fn cost_expr(&self) -> &Var {
        &self.cost_expr
    }

    /// 代价在前，额外输出在后
    pub fn outs(&self) -> &[Var] {
        &self.outs
    }

    pub fn layer_updates(&self) -> &Updates {
        &self.layer_updates
    }

    /// 代价对模型全部参数的梯度，按参数顺序排列
    pub(crate) fn gradients(&self) -> Result<Vec<(Var, Var)>, NnError> {
        let params = self.model.params();
        let mut grads = self.graph.grad(&self.cost_expr, &params)?;
        params
            .into_iter()
            .map(|p| {
                let g = grads.remove(&p.node_id()).ok_or_else(|| {
                    NnError::ProgrammingInvariant(format!("参数`{}`缺少梯度", p.name()))
                })?;
                Ok((p, g))
            })
            .collect()
    }
}

/// 流式小批量优化器
pub trait StreamingOptimizer<'a> {
    /// 每次`fit_epoch`可覆盖的标量参数（学习率等）
    type Args;

    fn core(&self) -> &OptimizerCore<'a>;

    /// 在一个小批量上执行一次训练步，返回代价及额外输出
    fn step(&mut self, x: &Tensor, t: &Tensor, args: &Self::Args) -> Result<Vec<Tensor>, NnError>;

    /// 按输入顺序逐个小批量训练一个 epoch，返回汇总后的代价
    fn fit_epoch(
        &mut self,
        data: &Tensor,
        targets: &Tensor,
        aug: Option<&mut dyn Augmentation>,
        batchsize: Option<usize>,
        args: &Self::Args,
    ) -> Result<Float, NnError> {
        self.fit_epoch_with_hooks(data, targets, aug, batchsize, args, None)
    }

    /// 与`fit_epoch`相同，但在每一步前后调用`hooks`的小批量钩子
    fn fit_epoch_with_hooks(
        &mut self,
        data: &Tensor,
        targets: &Tensor,
        mut aug: Option<&mut dyn Augmentation>,
        batchsize: Option<usize>,
        args: &Self::Args,
        hooks: Option<&dyn Layer>,
    ) -> Result<Float, NnError> {
        let batchsize = batchsize.unwrap_or(self.core().batchsize());
        check_batches(data, targets, batchsize)?;

        let mut costs = Vec::new();
        for batch in batched(batchsize, &[data, targets]) {
            let (bx, bt) = (&batch[0], &batch[1]);
            let bx = match aug.as_deref_mut() {
                Some(aug) => aug.augment(bx, bt)?,
                None => bx.clone(),
            };
            if let Some(layer) = hooks {
                Hook::PreMinibatch.fire(layer)?;
            }
            let outs = self.step(&bx, bt, args)?;
            if let Some(layer) = hooks {
                Hook::PostMinibatch.fire(layer)?;
            }
            let cost = outs.first().and_then(Tensor::number).ok_or_else(|| {
                NnError::ProgrammingInvariant("训练步的代价不是标量".to_string())
            })?;
            log::debug!("小批量（{}个样本）的代价为{}", bx.shape()[0], cost);
            costs.push(cost);
        }
        Ok(self.core().cost().aggregate_batches(&costs))
    }
}

/// 校验数据与目标的样本数一致且批大小为正
pub(crate) fn check_batches(
    data: &Tensor,
    targets: &Tensor,
    batchsize: usize,
) -> Result<(), NnError> {
    if batchsize == 0 {
        return Err(NnError::Configuration("批大小必须大于0".to_string()));
    }
    let n = data.shape().first().copied().unwrap_or(0);
    let m = targets.shape().first().copied().unwrap_or(0);
    if data.dimension() == 0 || targets.dimension() == 0 || n != m {
        return Err(NnError::Configuration(format!(
            "数据与目标的样本数不一致：{:?}与{:?}",
            data.shape(),
            targets.shape()
        )));
    }
    Ok(())
}
