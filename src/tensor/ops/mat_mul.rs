use crate::errors::{Operator, TensorError};
use crate::tensor::Tensor;
use ndarray::{Ix2, IxDyn};

impl Tensor {
    /// 矩阵乘法：仅支持两个2阶张量，且前者的列数须等于后者的行数
    pub fn mat_mul(&self, other: &Self) -> Result<Self, TensorError> {
        let mismatch = || TensorError::OperatorError {
            operator: Operator::MatMul,
            tensor1_shape: self.shape().to_vec(),
            tensor2_shape: other.shape().to_vec(),
        };
        if self.dimension() != 2 || other.dimension() != 2 || self.shape()[1] != other.shape()[0] {
            return Err(mismatch());
        }
        let a = self.data.view().into_dimensionality::<Ix2>().map_err(|_| mismatch())?;
        let b = other.data.view().into_dimensionality::<Ix2>().map_err(|_| mismatch())?;
        let data = a.dot(&b).into_dimensionality::<IxDyn>().map_err(|_| mismatch())?;
        Ok(Self { data })
    }
}
