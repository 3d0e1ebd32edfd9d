use crate::nn::GraphError;
use crate::nn::nodes::raw_node::{TraitNode, check_parents_count};
use crate::tensor::Tensor;

/// 矩阵乘法节点：仅支持两个2阶父节点
///
/// backward: dA = G·Bᵀ，dB = Aᵀ·G
#[derive(Default)]
pub(crate) struct MatMul;

impl TraitNode for MatMul {
    fn type_name(&self) -> &'static str {
        "MatMul"
    }

    fn infer_ndim(&self, parent_ndims: &[usize]) -> Result<usize, GraphError> {
        check_parents_count(self.type_name(), parent_ndims, 2)?;
        for &ndim in parent_ndims {
            if ndim != 2 {
                return Err(GraphError::DimensionMismatch {
                    expected: 2,
                    got: ndim,
                    message: "MatMul节点的父节点必须是2阶张量".to_string(),
                });
            }
        }
        Ok(2)
    }

    fn calc_value_by_parents(&self, parents: &[&Tensor]) -> Result<Tensor, GraphError> {
        Ok(parents[0].mat_mul(parents[1])?)
    }

    fn calc_grad_to_parent(
        &self,
        index: usize,
        parents: &[&Tensor],
        _value: &Tensor,
        upstream: &Tensor,
    ) -> Result<Option<Tensor>, GraphError> {
        let grad = if index == 0 {
            upstream.mat_mul(&parents[1].transpose()?)?
        } else {
            parents[0].transpose()?.mat_mul(upstream)?
        };
        Ok(Some(grad))
    }
}
