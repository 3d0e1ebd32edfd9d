use crate::nn::nodes::raw_node::{Reduce, Reduction};
use crate::nn::{GraphError, Var};

/// 归约扩展 trait：`axes`为`None`时对全部轴归约
pub trait VarReduceOps {
    fn sum(&self, axes: Option<&[usize]>, keepdims: bool) -> Result<Var, GraphError>;

    fn mean(&self, axes: Option<&[usize]>, keepdims: bool) -> Result<Var, GraphError>;
}

impl VarReduceOps for Var {
    fn sum(&self, axes: Option<&[usize]>, keepdims: bool) -> Result<Var, GraphError> {
        let axes = axes.map(<[usize]>::to_vec);
        self.op(Reduce::new(Reduction::Sum, axes, keepdims), &[self])
    }

    fn mean(&self, axes: Option<&[usize]>, keepdims: bool) -> Result<Var, GraphError> {
        let axes = axes.map(<[usize]>::to_vec);
        self.op(Reduce::new(Reduction::Mean, axes, keepdims), &[self])
    }
}
