/*
 * @Description  : 训练编排：围绕优化器按约定的嵌套顺序调用模型的生命周期钩子
 *
 * - `fit_epoch`：pre_epoch →（若有）前向统计遍 → {pre_minibatch → 训练步 → post_minibatch}* → post_epoch
 * - `finalize`：pre_finalize → {finalize_pre_minibatch → 仅前向 → finalize_post_minibatch}* → post_finalize
 * - `predict`：推理表达式逐批求值，再由模型的`batch_agg`合并
 */

use super::layer::{Hook, Layer, StatsPass, TrainContext};
use super::optimizer::{Augmentation, StreamingOptimizer, check_batches};
use super::{Function, FunctionInput, NnError};
use crate::tensor::{Float, Tensor};
use crate::utils::batched;
use std::marker::PhantomData;

pub struct Trainer<'a, O: StreamingOptimizer<'a>> {
    optimizer: O,
    /// 每个 epoch 之前的前向统计遍；模型没有声明此类更新时为`None`
    fwd_fn: Option<Function>,
    /// 训练结束后的定型遍；模型没有声明此类更新时为`None`
    fin_fn: Option<Function>,
    pred_fn: Function,
    _model: PhantomData<&'a dyn Layer>,
}

impl<'a, O: StreamingOptimizer<'a>> Trainer<'a, O> {
    pub fn new(optimizer: O) -> Result<Self, NnError> {
        let core = optimizer.core();
        let (model, graph, x) = (core.model(), core.graph(), core.x());

        let mut ctx = TrainContext::routed();
        let train_out = model.train_expr(x, &mut ctx)?;
        let forward_pass = |name: &str, updates: Option<super::Updates>| {
            match updates.filter(|u| !u.is_empty()) {
                Some(updates) => graph
                    .function(name, vec![FunctionInput::new(x)], &[train_out.clone()], &updates)
                    .map(Some),
                None => Ok(None),
            }
        };
        let fwd_fn = forward_pass("forward statistics", ctx.take_pass_updates(StatsPass::Forward))?;
        let fin_fn = forward_pass("finalize", ctx.take_pass_updates(StatsPass::Finalize))?;

        let pred_out = model.pred_expr(x)?;
        let pred_fn = graph.function("predict", vec![FunctionInput::new(x)], &[pred_out], &[])?;

        Ok(Self {
            optimizer,
            fwd_fn,
            fin_fn,
            pred_fn,
            _model: PhantomData,
        })
    }

    pub fn optimizer(&self) -> &O {
        &self.optimizer
    }

    pub fn optimizer_mut(&mut self) -> &mut O {
        &mut self.optimizer
    }

    pub fn model(&self) -> &'a dyn Layer {
        self.optimizer.core().model()
    }

    fn batchsize(&self, batchsize: Option<usize>) -> Result<usize, NnError> {
        match batchsize.unwrap_or(self.optimizer.core().batchsize()) {
            0 => Err(NnError::Configuration("批大小必须大于0".to_string())),
            n => Ok(n),
        }
    }

    /// 带完整钩子协议地训练一个 epoch，返回汇总后的代价
    pub fn fit_epoch(
        &mut self,
        data: &Tensor,
        targets: &Tensor,
        aug: Option<&mut dyn Augmentation>,
        batchsize: Option<usize>,
        args: &O::Args,
    ) -> Result<Float, NnError> {
        let model = self.model();
        let bs = self.batchsize(batchsize)?;
        check_batches(data, targets, bs)?;
        Hook::PreEpoch.fire(model)?;
        if let Some(fwd_fn) = &self.fwd_fn {
            for batch in batched(bs, &[data]) {
                fwd_fn.call(&batch)?;
            }
        }
        let cost = self.optimizer.fit_epoch_with_hooks(
            data,
            targets,
            aug,
            Some(bs),
            args,
            Some(model),
        )?;
        Hook::PostEpoch.fire(model)?;
        log::info!("epoch 结束，平均代价为{}", cost);
        Ok(cost)
    }

    /// 训练结束后的定型遍，仅做前向
    pub fn finalize(&mut self, data: &Tensor, batchsize: Option<usize>) -> Result<(), NnError> {
        let model = self.model();
        let bs = self.batchsize(batchsize)?;
        Hook::PreFinalize.fire(model)?;
        for batch in batched(bs, &[data]) {
            Hook::FinalizePreMinibatch.fire(model)?;
            if let Some(fin_fn) = &self.fin_fn {
                fin_fn.call(&batch)?;
            }
            Hook::FinalizePostMinibatch.fire(model)?;
        }
        Hook::PostFinalize.fire(model)?;
        log::info!("定型遍结束");
        Ok(())
    }

    /// 逐批推理，并以模型的`batch_agg`合并
    pub fn predict(&self, data: &Tensor, batchsize: Option<usize>) -> Result<Tensor, NnError> {
        let bs = self.batchsize(batchsize)?;
        let mut outputs = Vec::new();
        for batch in batched(bs, &[data]) {
            let mut outs = self.pred_fn.call(&batch)?;
            outputs.extend(outs.pop());
        }
        (self.model().batch_agg())(&outputs)
    }

    /// 对同一批样本的多个版本（如测试期增强）分别推理，再以模型的`ensembler`合并
    pub fn predict_ensemble(
        &self,
        variants: &[Tensor],
        batchsize: Option<usize>,
    ) -> Result<Tensor, NnError> {
        let predictions = variants
            .iter()
            .map(|data| self.predict(data, batchsize))
            .collect::<Result<Vec<_>, _>>()?;
        (self.model().ensembler())(&predictions)
    }
}
