/*
 * @Description  : 归约节点：沿指定轴（或全部轴）求和/求均值，可选择保持维度
 */

use crate::nn::GraphError;
use crate::nn::nodes::raw_node::{TraitNode, check_parents_count};
use crate::tensor::{Float, Tensor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    Sum,
    Mean,
}

pub(crate) struct Reduce {
    reduction: Reduction,
    /// `None`表示对所有轴归约
    axes: Option<Vec<usize>>,
    keepdims: bool,
}

impl Reduce {
    pub(crate) fn new(reduction: Reduction, axes: Option<Vec<usize>>, keepdims: bool) -> Self {
        let axes = axes.map(|mut axes| {
            axes.sort_unstable();
            axes.dedup();
            axes
        });
        Self {
            reduction,
            axes,
            keepdims,
        }
    }

    fn axes_for(&self, ndim: usize) -> Vec<usize> {
        match &self.axes {
            Some(axes) => axes.clone(),
            None => (0..ndim).collect(),
        }
    }
}

impl TraitNode for Reduce {
    fn type_name(&self) -> &'static str {
        match self.reduction {
            Reduction::Sum => "Sum",
            Reduction::Mean => "Mean",
        }
    }

    fn infer_ndim(&self, parent_ndims: &[usize]) -> Result<usize, GraphError> {
        check_parents_count(self.type_name(), parent_ndims, 1)?;
        let ndim = parent_ndims[0];
        let axes = self.axes_for(ndim);
        if let Some(&axis) = axes.iter().find(|&&a| a >= ndim) {
            return Err(GraphError::InvalidOperation(format!(
                "{}节点的归约轴{}超出了输入的阶数{}",
                self.type_name(),
                axis,
                ndim
            )));
        }
        Ok(if self.keepdims { ndim } else { ndim - axes.len() })
    }

    fn calc_value_by_parents(&self, parents: &[&Tensor]) -> Result<Tensor, GraphError> {
        let x = parents[0];
        let axes = self.axes_for(x.dimension());
        Ok(match self.reduction {
            Reduction::Sum => x.sum_axes(&axes, self.keepdims)?,
            Reduction::Mean => x.mean_axes(&axes, self.keepdims)?,
        })
    }

    fn calc_grad_to_parent(
        &self,
        _index: usize,
        parents: &[&Tensor],
        _value: &Tensor,
        upstream: &Tensor,
    ) -> Result<Option<Tensor>, GraphError> {
        let x = parents[0];
        let axes = self.axes_for(x.dimension());
        // 先把上游梯度恢复成保持维度的形状，再广播回输入的形状
        let mut kept_shape = x.shape().to_vec();
        for &axis in &axes {
            kept_shape[axis] = 1;
        }
        let grad = upstream.reshape(&kept_shape)?.broadcast_to(x.shape())?;
        Ok(Some(match self.reduction {
            Reduction::Sum => grad,
            Reduction::Mean => grad / x.reduced_count(&axes) as Float,
        }))
    }
}
