/*
 * @Description  : NumPy 风格的广播（broadcasting）支持：
 *                 1. 求两个形状广播后的形状；
 *                 2. 在广播后的形状上逐元素组合两个张量；
 *                 3. 把广播后的张量（通常是梯度）归约回原始形状。
 */

use crate::errors::{Operator, TensorError};
use crate::tensor::{Float, Tensor};
use ndarray::{Axis, IxDyn, Zip};

/// 求两个形状按 NumPy 规则广播后的形状；不兼容时返回`None`
pub fn broadcast_shape(a: &[usize], b: &[usize]) -> Option<Vec<usize>> {
    let ndim = a.len().max(b.len());
    let mut shape = vec![0; ndim];
    for i in 0..ndim {
        // 从尾部对齐
        let da = if i < ndim - a.len() { 1 } else { a[i - (ndim - a.len())] };
        let db = if i < ndim - b.len() { 1 } else { b[i - (ndim - b.len())] };
        shape[i] = match (da, db) {
            (x, y) if x == y => x,
            (1, y) => y,
            (x, 1) => x,
            _ => return None,
        };
    }
    Some(shape)
}

impl Tensor {
    /// 在两者广播后的形状上逐元素地应用`f`
    pub(crate) fn zip_broadcast<F>(
        &self,
        other: &Self,
        operator: Operator,
        f: F,
    ) -> Result<Self, TensorError>
    where
        F: Fn(Float, Float) -> Float,
    {
        let mismatch = || TensorError::OperatorError {
            operator,
            tensor1_shape: self.shape().to_vec(),
            tensor2_shape: other.shape().to_vec(),
        };
        let shape = broadcast_shape(self.shape(), other.shape()).ok_or_else(mismatch)?;
        let a = self.data.broadcast(IxDyn(&shape)).ok_or_else(mismatch)?;
        let b = other.data.broadcast(IxDyn(&shape)).ok_or_else(mismatch)?;
        let data = Zip::from(&a).and(&b).map_collect(|&x, &y| f(x, y));
        Ok(Self { data })
    }

    /// 把自身广播到`shape`（拷贝）
    pub fn broadcast_to(&self, shape: &[usize]) -> Result<Self, TensorError> {
        let data = self
            .data
            .broadcast(IxDyn(shape))
            .ok_or_else(|| TensorError::IncompatibleShape {
                from: self.shape().to_vec(),
                to: shape.to_vec(),
            })?
            .to_owned();
        Ok(Self { data })
    }

    /// 广播的逆运算：对被广播出来的轴求和，使结果的形状恢复为`shape`。
    /// 反向传播时，逐元素算子的梯度需要经由此方法回到父节点的形状。
    pub fn sum_to_shape(&self, shape: &[usize]) -> Result<Self, TensorError> {
        if self.shape() == shape {
            return Ok(self.clone());
        }
        let incompatible = || TensorError::IncompatibleShape {
            from: self.shape().to_vec(),
            to: shape.to_vec(),
        };
        if shape.len() > self.dimension() {
            return Err(incompatible());
        }
        let mut data = self.data.clone();
        // 1. 先把多出来的前导轴全部求和掉
        while data.ndim() > shape.len() {
            data = data.sum_axis(Axis(0));
        }
        // 2. 再对目标形状中为1、而当前不为1的轴求和（保持维度）
        for (axis, &target) in shape.iter().enumerate() {
            let current = data.shape()[axis];
            if current == target {
                continue;
            }
            if target != 1 {
                return Err(incompatible());
            }
            data = data.sum_axis(Axis(axis)).insert_axis(Axis(axis));
        }
        Ok(Self { data })
    }
}
