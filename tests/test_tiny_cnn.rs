/*
 * @Description  : 小型卷积网络分类测试：区分4×4图像中的竖线与横线
 *                 网络结构：Input(16) -> Conv2D(6, 3×3) -> Tanh -> SpatialMaxPool(2) -> FullyConnected(2) -> Softmax -> 交叉熵
 */

use minibatch_torch::nn::init::InitPolicy;
use minibatch_torch::nn::layer::{
    Conv2D, Conv2DConfig, FullyConnected, PoolConfig, Sequential, Softmax, SpatialMaxPool, Tanh,
};
use minibatch_torch::nn::optimizer::{Momentum, MomentumArgs, MomentumConfig, OptimizerOptions};
use minibatch_torch::nn::{CategoricalCrossEntropy, Graph, Layer, NnError, Trainer};
use minibatch_torch::tensor::Tensor;
use minibatch_torch::utils::RngSource;

/// 每条竖线、横线各一张图，扁平为16维；标签0为竖线，1为横线
fn bars() -> Result<(Tensor, Tensor, Vec<usize>), NnError> {
    let mut pixels = Vec::new();
    let mut labels = Vec::new();
    for (label, vertical) in [(0, true), (1, false)] {
        for line in 0..4 {
            for r in 0..4 {
                for c in 0..4 {
                    let on = if vertical { c == line } else { r == line };
                    pixels.push(if on { 1.0 } else { -1.0 });
                }
            }
            labels.push(label);
        }
    }
    let targets = CategoricalCrossEntropy::one_hot(&labels, 2)?;
    Ok((Tensor::new(&pixels, &[8, 16]), targets, labels))
}

fn argmax_rows(probs: &Tensor) -> Vec<usize> {
    (0..probs.shape()[0])
        .map(|i| usize::from(probs[[i, 1]] > probs[[i, 0]]))
        .collect()
}

#[test]
fn test_tiny_cnn_bars() -> Result<(), NnError> {
    let graph = Graph::new();
    let conv_config = Conv2DConfig {
        imshape: Some((4, 4)),
        ..Conv2DConfig::default()
    };
    let model = Sequential::new(vec![
        Box::new(Conv2D::new(&graph, 6, 3, 1, conv_config)?),
        Box::new(Tanh::new(InitPolicy::Xavier)?),
        Box::new(SpatialMaxPool::new(PoolConfig::square(2))?),
        Box::new(FullyConnected::new(&graph, (6, 1, 1), 2, true)?),
        Box::new(Softmax::new()),
    ]);
    model.reinit(RngSource::Seed(3))?;

    let cost = CategoricalCrossEntropy::new();
    let opt = Momentum::new(
        &graph,
        &model,
        &cost,
        OptimizerOptions::new(4),
        0.1,
        MomentumConfig::default(),
    )?;
    let mut trainer = Trainer::new(opt)?;

    let (x, t, labels) = bars()?;
    let first = trainer.fit_epoch(&x, &t, None, None, &MomentumArgs::default())?;
    let mut learned = false;
    let mut last = first;
    for epoch in 0..500 {
        last = trainer.fit_epoch(&x, &t, None, None, &MomentumArgs::default())?;
        let pred = trainer.predict(&x, None)?;
        assert_eq!(pred.shape(), &[8, 2]);
        if argmax_rows(&pred) == labels {
            println!("第{}个epoch全部分类正确，代价 {:.4}", epoch, last);
            learned = true;
            break;
        }
    }
    assert!(learned, "500个epoch内没有学会区分竖线与横线");
    assert!(last < first);
    Ok(())
}
