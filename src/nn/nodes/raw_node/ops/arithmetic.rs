/*
 * @Description  : 支持广播的四则运算节点。
 *                 反向传播时，梯度需经`sum_to_shape`归约回对应父节点的形状。
 */

use crate::nn::GraphError;
use crate::nn::nodes::raw_node::{TraitNode, check_parents_count};
use crate::tensor::Tensor;

fn broadcast_ndim(type_name: &str, parent_ndims: &[usize]) -> Result<usize, GraphError> {
    check_parents_count(type_name, parent_ndims, 2)?;
    Ok(parent_ndims[0].max(parent_ndims[1]))
}

#[derive(Default)]
pub(crate) struct Add;

impl TraitNode for Add {
    fn type_name(&self) -> &'static str {
        "Add"
    }

    fn infer_ndim(&self, parent_ndims: &[usize]) -> Result<usize, GraphError> {
        broadcast_ndim(self.type_name(), parent_ndims)
    }

    fn calc_value_by_parents(&self, parents: &[&Tensor]) -> Result<Tensor, GraphError> {
        Ok(parents[0].try_add(parents[1])?)
    }

    fn calc_grad_to_parent(
        &self,
        index: usize,
        parents: &[&Tensor],
        _value: &Tensor,
        upstream: &Tensor,
    ) -> Result<Option<Tensor>, GraphError> {
        Ok(Some(upstream.sum_to_shape(parents[index].shape())?))
    }
}

#[derive(Default)]
pub(crate) struct Subtract;

impl TraitNode for Subtract {
    fn type_name(&self) -> &'static str {
        "Subtract"
    }

    fn infer_ndim(&self, parent_ndims: &[usize]) -> Result<usize, GraphError> {
        broadcast_ndim(self.type_name(), parent_ndims)
    }

    fn calc_value_by_parents(&self, parents: &[&Tensor]) -> Result<Tensor, GraphError> {
        Ok(parents[0].try_sub(parents[1])?)
    }

    fn calc_grad_to_parent(
        &self,
        index: usize,
        parents: &[&Tensor],
        _value: &Tensor,
        upstream: &Tensor,
    ) -> Result<Option<Tensor>, GraphError> {
        let grad = upstream.sum_to_shape(parents[index].shape())?;
        Ok(Some(if index == 0 { grad } else { -grad }))
    }
}

#[derive(Default)]
pub(crate) struct Multiply;

impl TraitNode for Multiply {
    fn type_name(&self) -> &'static str {
        "Multiply"
    }

    fn infer_ndim(&self, parent_ndims: &[usize]) -> Result<usize, GraphError> {
        broadcast_ndim(self.type_name(), parent_ndims)
    }

    fn calc_value_by_parents(&self, parents: &[&Tensor]) -> Result<Tensor, GraphError> {
        Ok(parents[0].try_mul(parents[1])?)
    }

    fn calc_grad_to_parent(
        &self,
        index: usize,
        parents: &[&Tensor],
        _value: &Tensor,
        upstream: &Tensor,
    ) -> Result<Option<Tensor>, GraphError> {
        // d(a*b)/da = b, d(a*b)/db = a
        let other = parents[1 - index];
        let grad = upstream.try_mul(other)?;
        Ok(Some(grad.sum_to_shape(parents[index].shape())?))
    }
}

#[derive(Default)]
pub(crate) struct Divide;

impl TraitNode for Divide {
    fn type_name(&self) -> &'static str {
        "Divide"
    }

    fn infer_ndim(&self, parent_ndims: &[usize]) -> Result<usize, GraphError> {
        broadcast_ndim(self.type_name(), parent_ndims)
    }

    fn calc_value_by_parents(&self, parents: &[&Tensor]) -> Result<Tensor, GraphError> {
        Ok(parents[0].try_div(parents[1])?)
    }

    fn calc_grad_to_parent(
        &self,
        index: usize,
        parents: &[&Tensor],
        value: &Tensor,
        upstream: &Tensor,
    ) -> Result<Option<Tensor>, GraphError> {
        let b = parents[1];
        let grad = if index == 0 {
            // d(a/b)/da = 1/b
            upstream.try_div(b)?
        } else {
            // d(a/b)/db = -a/b² = -(a/b)/b
            -upstream.try_mul(&value.try_div(b)?)?
        };
        Ok(Some(grad.sum_to_shape(parents[index].shape())?))
    }
}
