/*
 * @Description  : 逐元素取最大值/最小值节点（支持广播）。
 *                 梯度只回传给被选中的一方；两者相等时归第一个父节点。
 */

use crate::errors::Operator;
use crate::nn::GraphError;
use crate::nn::nodes::raw_node::{TraitNode, check_parents_count};
use crate::tensor::{Float, Tensor};

fn select_grad(
    index: usize,
    parents: &[&Tensor],
    upstream: &Tensor,
    operator: Operator,
    first_wins: fn(Float, Float) -> bool,
) -> Result<Option<Tensor>, GraphError> {
    let mask = parents[0].zip_broadcast(parents[1], operator, |x, y| {
        if first_wins(x, y) == (index == 0) { 1. } else { 0. }
    })?;
    let grad = upstream.try_mul(&mask)?;
    Ok(Some(grad.sum_to_shape(parents[index].shape())?))
}

#[derive(Default)]
pub(crate) struct Maximum;

impl TraitNode for Maximum {
    fn type_name(&self) -> &'static str {
        "Maximum"
    }

    fn infer_ndim(&self, parent_ndims: &[usize]) -> Result<usize, GraphError> {
        check_parents_count(self.type_name(), parent_ndims, 2)?;
        Ok(parent_ndims[0].max(parent_ndims[1]))
    }

    fn calc_value_by_parents(&self, parents: &[&Tensor]) -> Result<Tensor, GraphError> {
        Ok(parents[0].try_maximum(parents[1])?)
    }

    fn calc_grad_to_parent(
        &self,
        index: usize,
        parents: &[&Tensor],
        _value: &Tensor,
        upstream: &Tensor,
    ) -> Result<Option<Tensor>, GraphError> {
        select_grad(index, parents, upstream, Operator::Maximum, |x, y| x >= y)
    }
}

#[derive(Default)]
pub(crate) struct Minimum;

impl TraitNode for Minimum {
    fn type_name(&self) -> &'static str {
        "Minimum"
    }

    fn infer_ndim(&self, parent_ndims: &[usize]) -> Result<usize, GraphError> {
        check_parents_count(self.type_name(), parent_ndims, 2)?;
        Ok(parent_ndims[0].max(parent_ndims[1]))
    }

    fn calc_value_by_parents(&self, parents: &[&Tensor]) -> Result<Tensor, GraphError> {
        Ok(parents[0].try_minimum(parents[1])?)
    }

    fn calc_grad_to_parent(
        &self,
        index: usize,
        parents: &[&Tensor],
        _value: &Tensor,
        upstream: &Tensor,
    ) -> Result<Option<Tensor>, GraphError> {
        select_grad(index, parents, upstream, Operator::Minimum, |x, y| x <= y)
    }
}
