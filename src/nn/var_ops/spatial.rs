use crate::nn::nodes::BorderMode;
use crate::nn::nodes::raw_node::{Conv2d, MaxPool2d};
use crate::nn::{GraphError, Var};

/// 空间运算扩展 trait，输入均为(N, C, H, W)
pub trait VarSpatialOps {
    /// 以`filters`(K, C, kh, kw)做二维卷积
    fn conv2d(
        &self,
        filters: &Var,
        border_mode: BorderMode,
        stride: (usize, usize),
    ) -> Result<Var, GraphError>;

    /// 不重叠的二维最大池化
    fn max_pool2d(&self, size: (usize, usize), ignore_border: bool) -> Result<Var, GraphError>;
}

impl VarSpatialOps for Var {
    fn conv2d(
        &self,
        filters: &Var,
        border_mode: BorderMode,
        stride: (usize, usize),
    ) -> Result<Var, GraphError> {
        self.op(Conv2d::new(border_mode, stride)?, &[self, filters])
    }

    fn max_pool2d(&self, size: (usize, usize), ignore_border: bool) -> Result<Var, GraphError> {
        self.op(MaxPool2d::new(size, ignore_border)?, &[self])
    }
}
