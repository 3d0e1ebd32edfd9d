/*
 * @Description  : 形状变换节点：Reshape（可含一个-1）、Flatten、ExpandDims。
 *                 三者的梯度都只需把上游梯度变形回父节点的形状。
 */

use crate::nn::GraphError;
use crate::nn::nodes::raw_node::{TraitNode, check_parents_count};
use crate::tensor::Tensor;

fn grad_back(parents: &[&Tensor], upstream: &Tensor) -> Result<Option<Tensor>, GraphError> {
    Ok(Some(upstream.reshape(parents[0].shape())?))
}

pub(crate) struct Reshape {
    /// 目标形状，至多一个维度为-1（由元素总数推断）
    shape: Vec<isize>,
}

impl Reshape {
    pub(crate) fn new(shape: &[isize]) -> Result<Self, GraphError> {
        if shape.iter().filter(|&&d| d == -1).count() > 1 {
            return Err(GraphError::InvalidOperation(format!(
                "Reshape的目标形状{:?}中至多只能有一个-1",
                shape
            )));
        }
        if shape.iter().any(|&d| d < -1) {
            return Err(GraphError::InvalidOperation(format!(
                "Reshape的目标形状{:?}中含有非法的维度",
                shape
            )));
        }
        Ok(Self {
            shape: shape.to_vec(),
        })
    }

    fn resolve(&self, x: &Tensor) -> Result<Vec<usize>, GraphError> {
        let known: usize = self
            .shape
            .iter()
            .filter(|&&d| d >= 0)
            .map(|&d| d as usize)
            .product();
        let mismatch = || GraphError::ShapeMismatch {
            expected: self.shape.iter().map(|&d| d.max(0) as usize).collect(),
            got: x.shape().to_vec(),
            message: "Reshape前后元素总数不一致".to_string(),
        };
        let resolved = self
            .shape
            .iter()
            .map(|&d| {
                if d >= 0 {
                    Ok(d as usize)
                } else if known == 0 || x.size() % known != 0 {
                    Err(mismatch())
                } else {
                    Ok(x.size() / known)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        if resolved.iter().product::<usize>() != x.size() {
            return Err(mismatch());
        }
        Ok(resolved)
    }
}

impl TraitNode for Reshape {
    fn type_name(&self) -> &'static str {
        "Reshape"
    }

    fn infer_ndim(&self, parent_ndims: &[usize]) -> Result<usize, GraphError> {
        check_parents_count(self.type_name(), parent_ndims, 1)?;
        Ok(self.shape.len())
    }

    fn calc_value_by_parents(&self, parents: &[&Tensor]) -> Result<Tensor, GraphError> {
        let shape = self.resolve(parents[0])?;
        Ok(parents[0].reshape(&shape)?)
    }

    fn calc_grad_to_parent(
        &self,
        _index: usize,
        parents: &[&Tensor],
        _value: &Tensor,
        upstream: &Tensor,
    ) -> Result<Option<Tensor>, GraphError> {
        grad_back(parents, upstream)
    }
}

/// 保留前`outdim-1`个维度，把其余维度展平为一维
pub(crate) struct Flatten {
    outdim: usize,
}

impl Flatten {
    pub(crate) fn new(outdim: usize) -> Self {
        Self { outdim }
    }
}

impl TraitNode for Flatten {
    fn type_name(&self) -> &'static str {
        "Flatten"
    }

    fn infer_ndim(&self, parent_ndims: &[usize]) -> Result<usize, GraphError> {
        check_parents_count(self.type_name(), parent_ndims, 1)?;
        if self.outdim == 0 || self.outdim > parent_ndims[0] {
            return Err(GraphError::InvalidOperation(format!(
                "无法把{}阶张量展平为{}阶",
                parent_ndims[0], self.outdim
            )));
        }
        Ok(self.outdim)
    }

    fn calc_value_by_parents(&self, parents: &[&Tensor]) -> Result<Tensor, GraphError> {
        let x = parents[0];
        let keep = self.outdim - 1;
        let mut shape = x.shape()[..keep].to_vec();
        shape.push(x.shape()[keep..].iter().product());
        Ok(x.reshape(&shape)?)
    }

    fn calc_grad_to_parent(
        &self,
        _index: usize,
        parents: &[&Tensor],
        _value: &Tensor,
        upstream: &Tensor,
    ) -> Result<Option<Tensor>, GraphError> {
        grad_back(parents, upstream)
    }
}

/// 在`axis`处插入长度为1的新维度
pub(crate) struct ExpandDims {
    axis: usize,
}

impl ExpandDims {
    pub(crate) fn new(axis: usize) -> Self {
        Self { axis }
    }
}

impl TraitNode for ExpandDims {
    fn type_name(&self) -> &'static str {
        "ExpandDims"
    }

    fn infer_ndim(&self, parent_ndims: &[usize]) -> Result<usize, GraphError> {
        check_parents_count(self.type_name(), parent_ndims, 1)?;
        if self.axis > parent_ndims[0] {
            return Err(GraphError::InvalidOperation(format!(
                "ExpandDims的轴{}超出了输入的阶数{}",
                self.axis, parent_ndims[0]
            )));
        }
        Ok(parent_ndims[0] + 1)
    }

    fn calc_value_by_parents(&self, parents: &[&Tensor]) -> Result<Tensor, GraphError> {
        Ok(parents[0].insert_axis(self.axis)?)
    }

    fn calc_grad_to_parent(
        &self,
        _index: usize,
        parents: &[&Tensor],
        _value: &Tensor,
        upstream: &Tensor,
    ) -> Result<Option<Tensor>, GraphError> {
        grad_back(parents, upstream)
    }
}
