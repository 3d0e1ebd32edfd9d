/*
 * @Description  : 流式小批量优化器测试
 *
 * 以单个标量权重 p（初值1，输入恒为1，目标为0，代价即 p²）手算出几步的轨迹来核对各更新规则
 */

use crate::assert_err;
use crate::nn::layer::{FullyConnected, Layer, ParamSource, Sequential, TrainContext};
use crate::nn::optimizer::{
    Augmentation, Momentum, MomentumArgs, MomentumConfig, OptimizerOptions, Placeholder, Sgd,
    SgdArgs, StreamingOptimizer,
};
use crate::nn::{Graph, MeanSquaredError, NnError, Var};
use crate::tensor::Tensor;
use approx::assert_abs_diff_eq;

/// 1 → 1、无偏置、权重为`p0`的全连接层
fn scalar_model(graph: &Graph, p0: f32) -> FullyConnected {
    FullyConnected::with_sources(
        graph,
        1,
        1,
        ParamSource::Array(Tensor::new(&[p0], &[1, 1])),
        None,
    )
    .unwrap()
}

fn one() -> Tensor {
    Tensor::ones(&[1, 1])
}

fn zero() -> Tensor {
    Tensor::zeros(&[1, 1])
}

fn weight(model: &FullyConnected) -> f32 {
    model.w().value().unwrap()[[0, 0]]
}

/// 记录每个小批量的样本数，可选地把数据清零
struct RecordingAugmentation {
    sizes: Vec<usize>,
    zero_out: bool,
}

impl RecordingAugmentation {
    fn new(zero_out: bool) -> Self {
        Self {
            sizes: Vec::new(),
            zero_out,
        }
    }
}

impl Augmentation for RecordingAugmentation {
    fn augment(&mut self, data: &Tensor, targets: &Tensor) -> Result<Tensor, NnError> {
        assert_eq!(data.shape()[0], targets.shape()[0]);
        self.sizes.push(data.shape()[0]);
        Ok(if self.zero_out {
            Tensor::zeros(data.shape())
        } else {
            data.clone()
        })
    }
}

/// 每一步都让计数器加一的无参数层
struct StepCounter {
    count: Var,
}

impl Layer for StepCounter {
    fn layer_name(&self) -> &str {
        "StepCounter"
    }

    fn train_expr(&self, x: &Var, ctx: &mut TrainContext) -> Result<Var, NnError> {
        ctx.updates.push((self.count.clone(), &self.count + 1.0));
        Ok(x.clone())
    }
}

// ==================== SGD ====================

#[test]
fn test_sgd_single_step() {
    let graph = Graph::new();
    let model = scalar_model(&graph, 1.0);
    let cost = MeanSquaredError::new();
    let mut sgd = Sgd::new(&graph, &model, &cost, OptimizerOptions::new(1), 0.1).unwrap();

    let outs = sgd.step(&one(), &zero(), &SgdArgs::default()).unwrap();
    // 返回的是更新前的代价
    assert_abs_diff_eq!(outs[0].number().unwrap(), 1.0, epsilon = 1e-6);
    assert_abs_diff_eq!(weight(&model), 0.8, epsilon = 1e-6);

    // 覆盖学习率
    sgd.step(&one(), &zero(), &SgdArgs::lr(0.5)).unwrap();
    assert_abs_diff_eq!(weight(&model), 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(sgd.default_lr(), 0.1);
}

#[test]
fn test_fit_epoch_walks_minibatches_in_order() {
    let graph = Graph::new();
    let model = scalar_model(&graph, 1.0);
    let cost = MeanSquaredError::new();
    let mut sgd = Sgd::new(&graph, &model, &cost, OptimizerOptions::new(3), 0.0).unwrap();

    let data = Tensor::arange(&[10, 1]);
    let targets = Tensor::zeros(&[10, 1]);
    let mut aug = RecordingAugmentation::new(false);
    sgd.fit_epoch(&data, &targets, Some(&mut aug), None, &SgdArgs::default())
        .unwrap();
    assert_eq!(aug.sizes, vec![3, 3, 3, 1]);

    // 覆盖批大小
    let mut aug = RecordingAugmentation::new(false);
    sgd.fit_epoch(&data, &targets, Some(&mut aug), Some(4), &SgdArgs::default())
        .unwrap();
    assert_eq!(aug.sizes, vec![4, 4, 2]);
}

#[test]
fn test_fit_epoch_returns_mean_of_minibatch_costs() {
    let graph = Graph::new();
    let model = scalar_model(&graph, 1.0);
    let cost = MeanSquaredError::new();
    let mut sgd = Sgd::new(&graph, &model, &cost, OptimizerOptions::new(2), 0.0).unwrap();

    // 输入为0，输出恒为0，各批代价分别为 (1+4)/2 与 (9+16)/2
    let data = Tensor::zeros(&[4, 1]);
    let targets = Tensor::new(&[1., 2., 3., 4.], &[4, 1]);
    let c = sgd.fit_epoch(&data, &targets, None, None, &SgdArgs::default()).unwrap();
    assert_abs_diff_eq!(c, 7.5, epsilon = 1e-5);
    assert_abs_diff_eq!(weight(&model), 1.0);
}

#[test]
fn test_augmentation_output_is_what_gets_trained() {
    let graph = Graph::new();
    let model = scalar_model(&graph, 1.0);
    let cost = MeanSquaredError::new();
    let mut sgd = Sgd::new(&graph, &model, &cost, OptimizerOptions::new(2), 0.1).unwrap();

    // 增强后的输入全为0，权重的梯度也为0
    let mut aug = RecordingAugmentation::new(true);
    let data = Tensor::ones(&[4, 1]);
    let targets = Tensor::ones(&[4, 1]);
    let c = sgd
        .fit_epoch(&data, &targets, Some(&mut aug), None, &SgdArgs::default())
        .unwrap();
    assert_abs_diff_eq!(c, 1.0, epsilon = 1e-6);
    assert_abs_diff_eq!(weight(&model), 1.0);
}

#[test]
fn test_extra_outputs_come_after_cost() {
    let graph = Graph::new();
    let model = scalar_model(&graph, 2.0);
    let cost = MeanSquaredError::new();
    let x = graph.input(2, "x");
    let y = model.pred_expr(&x).unwrap();
    let options = OptimizerOptions {
        extra_outs: vec![y],
        x: Placeholder::Given(x.clone()),
        ..OptimizerOptions::new(1)
    };
    let mut sgd = Sgd::new(&graph, &model, &cost, options, 0.1).unwrap();
    assert_eq!(sgd.core().x(), &x);
    assert_eq!(sgd.core().outs().len(), 2);

    let outs = sgd
        .step(&Tensor::new(&[3.], &[1, 1]), &zero(), &SgdArgs::default())
        .unwrap();
    // 输出在更新之前求值
    assert_abs_diff_eq!(outs[0].number().unwrap(), 36.0, epsilon = 1e-4);
    assert_eq!(outs[1], Tensor::new(&[6.], &[1, 1]));
}

#[test]
fn test_layer_updates_run_every_step() {
    let graph = Graph::new();
    let count = graph.zeros_parameter(&[], "count");
    let model = Sequential::new(vec![
        Box::new(scalar_model(&graph, 1.0)),
        Box::new(StepCounter {
            count: count.clone(),
        }),
    ]);
    let cost = MeanSquaredError::new();
    let mut sgd = Sgd::new(&graph, &model, &cost, OptimizerOptions::new(1), 0.1).unwrap();

    let data = Tensor::ones(&[3, 1]);
    sgd.fit_epoch(&data, &Tensor::zeros(&[3, 1]), None, None, &SgdArgs::default())
        .unwrap();
    assert_eq!(count.value().unwrap(), Tensor::scalar(3.0));
}

#[test]
fn test_invalid_batches() {
    let graph = Graph::new();
    let model = scalar_model(&graph, 1.0);
    let cost = MeanSquaredError::new();

    let zero_bs = Sgd::new(&graph, &model, &cost, OptimizerOptions::new(0), 0.1);
    assert!(matches!(zero_bs.err(), Some(NnError::Configuration(_))));

    let mut sgd = Sgd::new(&graph, &model, &cost, OptimizerOptions::new(2), 0.1).unwrap();
    let args = SgdArgs::default();
    assert_err!(
        sgd.fit_epoch(&Tensor::ones(&[4, 1]), &Tensor::ones(&[3, 1]), None, None, &args),
        NnError::Configuration(_)
    );
    assert_err!(
        sgd.fit_epoch(&Tensor::ones(&[4, 1]), &Tensor::ones(&[4, 1]), None, Some(0), &args),
        NnError::Configuration(_)
    );
    // 出错时参数保持不变
    assert_abs_diff_eq!(weight(&model), 1.0);
}

#[test]
fn test_placeholder_from_another_graph_is_rejected() {
    let graph = Graph::new();
    let model = scalar_model(&graph, 1.0);
    let cost = MeanSquaredError::new();
    let stray = Graph::new().input(2, "x");
    let options = OptimizerOptions {
        x: Placeholder::Given(stray),
        ..OptimizerOptions::new(1)
    };
    let sgd = Sgd::new(&graph, &model, &cost, options, 0.1);
    assert!(matches!(sgd.err(), Some(NnError::Configuration(_))));

    let options = OptimizerOptions {
        t: Placeholder::Named("labels".to_string()),
        ..OptimizerOptions::new(1)
    };
    let sgd = Sgd::new(&graph, &model, &cost, options, 0.1).unwrap();
    assert_eq!(sgd.core().t().name(), "labels");
}

// ==================== 动量 / Nesterov ====================

#[test]
fn test_momentum_two_steps() {
    let graph = Graph::new();
    let model = scalar_model(&graph, 1.0);
    let cost = MeanSquaredError::new();
    let mut opt = Momentum::new(
        &graph,
        &model,
        &cost,
        OptimizerOptions::new(1),
        0.1,
        MomentumConfig::default(),
    )
    .unwrap();
    let v = opt.velocity(model.w()).unwrap().clone();
    assert_eq!(v.value().unwrap(), Tensor::zeros(&[1, 1]));

    // v1 = 0.9·0 - 0.1·2 = -0.2, p1 = 0.8
    opt.step(&one(), &zero(), &MomentumArgs::default()).unwrap();
    assert_abs_diff_eq!(v.value().unwrap()[[0, 0]], -0.2, epsilon = 1e-6);
    assert_abs_diff_eq!(weight(&model), 0.8, epsilon = 1e-6);

    // v2 = 0.9·(-0.2) - 0.1·1.6 = -0.34, p2 = 0.46
    opt.step(&one(), &zero(), &MomentumArgs::default()).unwrap();
    assert_abs_diff_eq!(v.value().unwrap()[[0, 0]], -0.34, epsilon = 1e-6);
    assert_abs_diff_eq!(weight(&model), 0.46, epsilon = 1e-6);
}

#[test]
fn test_nesterov_single_step() {
    let graph = Graph::new();
    let model = scalar_model(&graph, 1.0);
    let cost = MeanSquaredError::new();
    let config = MomentumConfig {
        momentum: 0.9,
        nesterov: true,
    };
    let mut opt =
        Momentum::new(&graph, &model, &cost, OptimizerOptions::new(1), 0.1, config).unwrap();

    // p1 = 1 + 0.9·(-0.2) - 0.1·2 = 0.62
    opt.step(&one(), &zero(), &MomentumArgs::default()).unwrap();
    assert_abs_diff_eq!(weight(&model), 0.62, epsilon = 1e-6);
    assert_abs_diff_eq!(
        opt.velocity(model.w()).unwrap().value().unwrap()[[0, 0]],
        -0.2,
        epsilon = 1e-6
    );
    assert!(opt.config().nesterov);
}

#[test]
fn test_momentum_override_per_call() {
    let graph = Graph::new();
    let model = scalar_model(&graph, 1.0);
    let cost = MeanSquaredError::new();
    let mut opt = Momentum::new(
        &graph,
        &model,
        &cost,
        OptimizerOptions::new(1),
        0.1,
        MomentumConfig::default(),
    )
    .unwrap();

    // 动量为0时退化为SGD
    let args = MomentumArgs {
        lr: None,
        momentum: Some(0.0),
    };
    opt.step(&one(), &zero(), &args).unwrap();
    opt.step(&one(), &zero(), &args).unwrap();
    assert_abs_diff_eq!(weight(&model), 0.64, epsilon = 1e-6);

    // 学习率为0时参数只随残余速度移动：v = 0.9·(-0.16)
    let args = MomentumArgs {
        lr: Some(0.0),
        momentum: None,
    };
    opt.step(&one(), &zero(), &args).unwrap();
    assert_abs_diff_eq!(weight(&model), 0.64 - 0.144, epsilon = 1e-6);
}

#[test]
fn test_momentum_velocity_only_for_own_params() {
    let graph = Graph::new();
    let model = scalar_model(&graph, 1.0);
    let other = scalar_model(&graph, 1.0);
    let cost = MeanSquaredError::new();
    let opt = Momentum::new(
        &graph,
        &model,
        &cost,
        OptimizerOptions::new(1),
        0.1,
        MomentumConfig::default(),
    )
    .unwrap();
    assert!(opt.velocity(model.w()).is_some());
    assert!(opt.velocity(other.w()).is_none());
}
