/*
 * @Description  : 代价函数：给出目标占位符、由模型输出与目标构建标量代价，并汇总各小批量的代价
 */

use super::{Graph, NnError, Var, VarActivationOps, VarReduceOps};
use crate::tensor::{Float, Tensor};

/// 代价
///
/// # 使用示例
/// ```ignore
/// let cost = MeanSquaredError::new();
/// let t = cost.make_target(&graph, "targets");
/// let c = cost.cost_expr(&y, &t)?;
/// ```
pub trait Cost {
    /// 目标占位符，默认为 [batch, outputs] 的2阶张量
    fn make_target(&self, graph: &Graph, name: &str) -> Var {
        graph.input(2, name)
    }

    /// 输出`output`相对于目标`target`的标量代价
    fn cost_expr(&self, output: &Var, target: &Var) -> Result<Var, NnError>;

    /// 汇总一个 epoch 中各小批量的代价，默认取平均
    fn aggregate_batches(&self, costs: &[Float]) -> Float {
        if costs.is_empty() {
            return Float::NAN;
        }
        costs.iter().sum::<Float>() / costs.len() as Float
    }
}

/// 均方误差：`mean((output - target)^2)`
#[derive(Debug, Default)]
pub struct MeanSquaredError;

impl MeanSquaredError {
    pub const fn new() -> Self {
        Self
    }
}

impl Cost for MeanSquaredError {
    fn cost_expr(&self, output: &Var, target: &Var) -> Result<Var, NnError> {
        let diff = output.try_sub(target)?;
        Ok(diff.try_mul(&diff)?.mean(None, false)?)
    }
}

/// 分类交叉熵：输入为各类别的概率 [batch, classes]，目标为同形状的 one-hot 矩阵
///
/// 整数编码的标签可先用[`CategoricalCrossEntropy::one_hot`]转换
#[derive(Debug)]
pub struct CategoricalCrossEntropy {
    /// 取对数前概率的下限，避免`log(0)`
    clip: Float,
}

impl Default for CategoricalCrossEntropy {
    fn default() -> Self {
        Self { clip: 1e-7 }
    }
}

impl CategoricalCrossEntropy {
    pub fn new() -> Self {
        Self::default()
    }

    /// 把整数标签转换为 [len, nclasses] 的 one-hot 矩阵
    pub fn one_hot(labels: &[usize], nclasses: usize) -> Result<Tensor, NnError> {
        if let Some(&bad) = labels.iter().find(|&&l| l >= nclasses) {
            return Err(NnError::Configuration(format!(
                "标签{}超出了类别数{}",
                bad, nclasses
            )));
        }
        let mut data = vec![0.0; labels.len() * nclasses];
        for (row, &label) in labels.iter().enumerate() {
            data[row * nclasses + label] = 1.0;
        }
        Ok(Tensor::new(&data, &[labels.len(), nclasses]))
    }
}

impl Cost for CategoricalCrossEntropy {
    /// `-mean_b Σ_k t[b,k]·log(p[b,k])`
    fn cost_expr(&self, output: &Var, target: &Var) -> Result<Var, NnError> {
        let clipped = output.maximum(&output.constant(Tensor::scalar(self.clip)))?;
        let per_sample = target.try_mul(&clipped.log()?)?.sum(Some(&[1]), false)?;
        Ok(per_sample.mean(None, false)?.try_neg()?)
    }
}
