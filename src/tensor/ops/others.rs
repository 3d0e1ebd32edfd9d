/*
 * @Description  : 张量的归约（求和、求均值）以及逐元素的一元函数
 */

use crate::errors::TensorError;
use crate::tensor::{Float, Tensor};
use ndarray::Axis;

impl Tensor {
    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓归约↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
    pub fn sum_all(&self) -> Float {
        self.data.sum()
    }

    /// 所有元素的均值；空张量返回NaN
    pub fn mean_all(&self) -> Float {
        self.data.mean().unwrap_or(Float::NAN)
    }

    /// 沿`axes`求和。`keepdims`为真时被归约的轴保留为长度1
    pub fn sum_axes(&self, axes: &[usize], keepdims: bool) -> Result<Self, TensorError> {
        let ndim = self.dimension();
        if let Some(&axis) = axes.iter().find(|&&a| a >= ndim) {
            return Err(TensorError::AxisOutOfRange { axis, ndim });
        }
        let mut sorted = axes.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        let mut data = self.data.clone();
        // 从大到小归约，避免轴号错位
        for &axis in sorted.iter().rev() {
            data = data.sum_axis(Axis(axis));
            if keepdims {
                data = data.insert_axis(Axis(axis));
            }
        }
        Ok(Self { data })
    }

    pub fn mean_axes(&self, axes: &[usize], keepdims: bool) -> Result<Self, TensorError> {
        let count = self.reduced_count(axes);
        Ok(self.sum_axes(axes, keepdims)? / count as Float)
    }

    /// 沿`axes`归约时每个输出元素所覆盖的元素个数
    pub fn reduced_count(&self, axes: &[usize]) -> usize {
        let mut sorted = axes.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        sorted
            .iter()
            .filter_map(|&a| self.shape().get(a))
            .product()
    }
    /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑归约↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓逐元素函数↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
    pub fn map<F: Fn(Float) -> Float>(&self, f: F) -> Self {
        Self {
            data: self.data.mapv(f),
        }
    }

    pub fn exp(&self) -> Self {
        self.map(Float::exp)
    }

    pub fn ln(&self) -> Self {
        self.map(Float::ln)
    }

    pub fn sqrt(&self) -> Self {
        self.map(Float::sqrt)
    }

    pub fn tanh(&self) -> Self {
        self.map(Float::tanh)
    }

    pub fn powi(&self, n: i32) -> Self {
        self.map(|x| x.powi(n))
    }
    /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑逐元素函数↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/
}
