/*
 * @Description  : 训练编排测试：钩子的嵌套顺序、逐批推理与合并、批归一化两种模式的完整流程
 */

use crate::assert_err;
use crate::nn::layer::{
    Aggregator, BatchNorm, BatchNormConfig, BnMode, FullyConnected, Hook, Layer, ParamSource,
    Sequential, TrainContext,
};
use crate::nn::optimizer::{Augmentation, OptimizerOptions, Sgd, SgdArgs};
use crate::nn::{Graph, GraphError, MeanSquaredError, NnError, Trainer, Var};
use crate::tensor::Tensor;
use approx::assert_abs_diff_eq;
use std::cell::RefCell;
use std::rc::Rc;

type Log = Rc<RefCell<Vec<String>>>;

fn fc(graph: &Graph, w: f32) -> FullyConnected {
    FullyConnected::with_sources(graph, 1, 1, ParamSource::Array(Tensor::new(&[w], &[1, 1])), None)
        .unwrap()
}

/// 把收到的每个钩子记入日志
struct HookLog {
    log: Log,
}

impl Layer for HookLog {
    fn layer_name(&self) -> &str {
        "HookLog"
    }

    fn train_expr(&self, x: &Var, _ctx: &mut TrainContext) -> Result<Var, NnError> {
        Ok(x.clone())
    }

    fn on_hook(&self, hook: Hook) -> Result<(), NnError> {
        self.log.borrow_mut().push(format!("{:?}", hook));
        Ok(())
    }
}

struct LoggingAugmentation {
    log: Log,
}

impl Augmentation for LoggingAugmentation {
    fn augment(&mut self, data: &Tensor, _targets: &Tensor) -> Result<Tensor, NnError> {
        self.log.borrow_mut().push("augment".to_string());
        Ok(data.clone())
    }
}

/// 只覆盖`post_epoch`
struct EpochCounter {
    epochs: Rc<RefCell<usize>>,
}

impl Layer for EpochCounter {
    fn layer_name(&self) -> &str {
        "EpochCounter"
    }

    fn train_expr(&self, x: &Var, _ctx: &mut TrainContext) -> Result<Var, NnError> {
        Ok(x.clone())
    }

    fn post_epoch(&self) -> Result<(), NnError> {
        *self.epochs.borrow_mut() += 1;
        Ok(())
    }
}

/// 以小批量的个数作为合并结果
fn count_batches(outputs: &[Tensor]) -> Result<Tensor, NnError> {
    Ok(Tensor::scalar(outputs.len() as f32))
}

struct BatchCounting;

impl Layer for BatchCounting {
    fn layer_name(&self) -> &str {
        "BatchCounting"
    }

    fn train_expr(&self, x: &Var, _ctx: &mut TrainContext) -> Result<Var, NnError> {
        Ok(x.clone())
    }

    fn batch_agg(&self) -> Aggregator {
        count_batches
    }
}

// ==================== 钩子顺序 ====================

#[test]
fn test_fit_epoch_hook_order() {
    let graph = Graph::new();
    let log = Log::default();
    let model = Sequential::new(vec![
        Box::new(fc(&graph, 1.0)),
        Box::new(HookLog { log: log.clone() }),
    ]);
    let cost = MeanSquaredError::new();
    let sgd = Sgd::new(&graph, &model, &cost, OptimizerOptions::new(2), 0.0).unwrap();
    let mut trainer = Trainer::new(sgd).unwrap();

    let mut aug = LoggingAugmentation { log: log.clone() };
    let data = Tensor::ones(&[3, 1]);
    trainer
        .fit_epoch(&data, &data, Some(&mut aug), None, &SgdArgs::default())
        .unwrap();
    assert_eq!(
        *log.borrow(),
        [
            "PreEpoch",
            "augment",
            "PreMinibatch",
            "PostMinibatch",
            "augment",
            "PreMinibatch",
            "PostMinibatch",
            "PostEpoch",
        ]
    );

    log.borrow_mut().clear();
    trainer.finalize(&data, None).unwrap();
    assert_eq!(
        *log.borrow(),
        [
            "PreFinalize",
            "FinalizePreMinibatch",
            "FinalizePostMinibatch",
            "FinalizePreMinibatch",
            "FinalizePostMinibatch",
            "PostFinalize",
        ]
    );
}

#[test]
fn test_overridden_named_hook_is_reached() {
    let graph = Graph::new();
    let epochs = Rc::new(RefCell::new(0));
    let model = Sequential::new(vec![
        Box::new(fc(&graph, 1.0)),
        Box::new(EpochCounter {
            epochs: epochs.clone(),
        }),
    ]);
    let cost = MeanSquaredError::new();
    let sgd = Sgd::new(&graph, &model, &cost, OptimizerOptions::new(4), 0.0).unwrap();
    let mut trainer = Trainer::new(sgd).unwrap();

    let data = Tensor::ones(&[4, 1]);
    for _ in 0..3 {
        trainer.fit_epoch(&data, &data, None, None, &SgdArgs::default()).unwrap();
    }
    assert_eq!(*epochs.borrow(), 3);
}

#[test]
fn test_fit_epoch_trains_the_model() {
    let graph = Graph::new();
    let model = fc(&graph, 1.0);
    let cost = MeanSquaredError::new();
    let sgd = Sgd::new(&graph, &model, &cost, OptimizerOptions::new(1), 0.1).unwrap();
    let mut trainer = Trainer::new(sgd).unwrap();

    let c = trainer
        .fit_epoch(&Tensor::ones(&[1, 1]), &Tensor::zeros(&[1, 1]), None, None, &SgdArgs::default())
        .unwrap();
    assert_abs_diff_eq!(c, 1.0, epsilon = 1e-6);
    assert_abs_diff_eq!(model.w().value().unwrap()[[0, 0]], 0.8, epsilon = 1e-6);
    assert_abs_diff_eq!(trainer.optimizer().default_lr(), 0.1);
    assert_eq!(trainer.model().layer_name(), "FullyConnected");
}

// ==================== 推理 ====================

#[test]
fn test_predict_concatenates_minibatches() {
    let graph = Graph::new();
    let model = fc(&graph, 2.0);
    let cost = MeanSquaredError::new();
    let sgd = Sgd::new(&graph, &model, &cost, OptimizerOptions::new(2), 0.1).unwrap();
    let trainer = Trainer::new(sgd).unwrap();

    let data = Tensor::arange(&[5, 1]);
    let out = trainer.predict(&data, None).unwrap();
    assert_eq!(out, Tensor::new(&[0., 2., 4., 6., 8.], &[5, 1]));
    assert_eq!(trainer.predict(&data, Some(5)).unwrap(), out);
    assert_err!(trainer.predict(&data, Some(0)), NnError::Configuration(_));
}

#[test]
fn test_predict_uses_model_batch_agg() {
    let graph = Graph::new();
    let model = BatchCounting;
    let cost = MeanSquaredError::new();
    let sgd = Sgd::new(&graph, &model, &cost, OptimizerOptions::new(3), 0.1).unwrap();
    let trainer = Trainer::new(sgd).unwrap();

    let out = trainer.predict(&Tensor::ones(&[7, 2]), None).unwrap();
    assert_eq!(out, Tensor::scalar(3.0));
}

#[test]
fn test_predict_ensemble_averages_variants() {
    let graph = Graph::new();
    let model = fc(&graph, 2.0);
    let cost = MeanSquaredError::new();
    let sgd = Sgd::new(&graph, &model, &cost, OptimizerOptions::new(2), 0.1).unwrap();
    let trainer = Trainer::new(sgd).unwrap();

    let x = Tensor::new(&[1., 2., 3.], &[3, 1]);
    let x3 = Tensor::new(&[3., 6., 9.], &[3, 1]);
    let out = trainer.predict_ensemble(&[x, x3], None).unwrap();
    assert_eq!(out, Tensor::new(&[4., 8., 12.], &[3, 1]));
    assert_err!(trainer.predict_ensemble(&[], None), NnError::Tensor(_));
}

// ==================== 批归一化 ====================

#[test]
fn test_post_mode_batch_norm_through_finalize() {
    let graph = Graph::new();
    let bn = BatchNorm::new(&graph, 1, BatchNormConfig::default()).unwrap();
    let (pgamma, sum_mean) = (bn.pgamma().clone(), bn.running_mean().clone());
    let model = Sequential::new(vec![Box::new(fc(&graph, 1.0)), Box::new(bn)]);
    let cost = MeanSquaredError::new();
    let sgd = Sgd::new(&graph, &model, &cost, OptimizerOptions::new(2), 0.0).unwrap();
    let mut trainer = Trainer::new(sgd).unwrap();

    let data = Tensor::new(&[1., 1., 3., 3.], &[4, 1]);
    // 定型之前推理期参数尚未就绪
    assert_err!(
        trainer.predict(&data, None),
        NnError::Graph(GraphError::UninitializedValue { .. })
    );

    // 训练步不累积统计量
    trainer.fit_epoch(&data, &data, None, None, &SgdArgs::default()).unwrap();
    assert_eq!(sum_mean.value().unwrap(), Tensor::zeros(&[1]));

    trainer.finalize(&data, None).unwrap();
    assert_eq!(sum_mean.value().unwrap(), Tensor::new(&[4.], &[1]));
    assert_abs_diff_eq!(pgamma.value().unwrap()[[0]], 1000.0, epsilon = 0.1);

    let out = trainer.predict(&Tensor::new(&[2.], &[1, 1]), None).unwrap();
    assert_abs_diff_eq!(out[[0, 0]], 0.0, epsilon = 0.1);

    // 新的定型遍先清零累积量
    trainer.finalize(&data, Some(1)).unwrap();
    assert_eq!(sum_mean.value().unwrap(), Tensor::new(&[8.], &[1]));
    let bn = model.children()[1].as_ref();
    assert_eq!(bn.params().len(), 2);
}

#[test]
fn test_pre_mode_batch_norm_derives_every_epoch() {
    let graph = Graph::new();
    let config = BatchNormConfig {
        mode: BnMode::Pre,
        ..BatchNormConfig::default()
    };
    let bn = BatchNorm::new(&graph, 1, config).unwrap();
    let (pbeta, sum_mean) = (bn.pbeta().clone(), bn.running_mean().clone());
    let model = Sequential::new(vec![Box::new(fc(&graph, 1.0)), Box::new(bn)]);
    let cost = MeanSquaredError::new();
    let sgd = Sgd::new(&graph, &model, &cost, OptimizerOptions::new(2), 0.0).unwrap();
    let mut trainer = Trainer::new(sgd).unwrap();

    let data = Tensor::new(&[1., 1., 3., 3.], &[4, 1]);
    for _ in 0..2 {
        trainer.fit_epoch(&data, &data, None, None, &SgdArgs::default()).unwrap();
        // 每个 epoch 开始时清零，统计量不会跨 epoch 叠加
        assert_eq!(sum_mean.value().unwrap(), Tensor::new(&[4.], &[1]));
    }
    assert_abs_diff_eq!(pbeta.value().unwrap()[[0]], -2000.0, epsilon = 0.5);

    // 无需定型即可推理；定型遍对 Pre 模式不做任何事
    trainer.finalize(&data, None).unwrap();
    assert_eq!(sum_mean.value().unwrap(), Tensor::new(&[4.], &[1]));
    let out = trainer.predict(&Tensor::new(&[2.], &[1, 1]), None).unwrap();
    assert_abs_diff_eq!(out[[0, 0]], 0.0, epsilon = 0.1);
}
