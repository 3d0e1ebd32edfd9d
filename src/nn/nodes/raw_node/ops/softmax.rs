use crate::nn::GraphError;
use crate::nn::nodes::raw_node::{TraitNode, check_parents_count};
use crate::tensor::{Float, Tensor};

/// 按行（最后一维）计算的Softmax节点，输入须为2阶(batch × classes)
///
/// forward: y_i = e^(x_i - max) / Σ_j e^(x_j - max)
/// backward: dx = y ⊙ (g - Σ_j g_j·y_j)
#[derive(Default)]
pub(crate) struct Softmax;

impl TraitNode for Softmax {
    fn type_name(&self) -> &'static str {
        "Softmax"
    }

    fn infer_ndim(&self, parent_ndims: &[usize]) -> Result<usize, GraphError> {
        check_parents_count(self.type_name(), parent_ndims, 1)?;
        if parent_ndims[0] != 2 {
            return Err(GraphError::DimensionMismatch {
                expected: 2,
                got: parent_ndims[0],
                message: "Softmax节点的输入必须是2阶张量".to_string(),
            });
        }
        Ok(2)
    }

    fn calc_value_by_parents(&self, parents: &[&Tensor]) -> Result<Tensor, GraphError> {
        let x = parents[0];
        let cols = x.shape()[1];
        let mut values = x.to_vec();
        for row in values.chunks_mut(cols.max(1)) {
            // 减去行最大值，保证数值稳定
            let max = row.iter().copied().fold(Float::NEG_INFINITY, Float::max);
            let mut sum = 0.;
            for v in row.iter_mut() {
                *v = (*v - max).exp();
                sum += *v;
            }
            for v in row.iter_mut() {
                *v /= sum;
            }
        }
        Ok(Tensor::new(&values, x.shape()))
    }

    fn calc_grad_to_parent(
        &self,
        _index: usize,
        _parents: &[&Tensor],
        value: &Tensor,
        upstream: &Tensor,
    ) -> Result<Option<Tensor>, GraphError> {
        let dot = upstream.try_mul(value)?.sum_axes(&[1], true)?;
        let grad = value.try_mul(&upstream.try_sub(&dot)?)?;
        Ok(Some(grad))
    }
}
