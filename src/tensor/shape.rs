use super::Tensor;
use crate::errors::TensorError;
use ndarray::{Axis, IxDyn, Slice, concatenate};

impl Tensor {
    /// 变形为`shape`，元素总数必须一致
    pub fn reshape(&self, shape: &[usize]) -> Result<Self, TensorError> {
        if self.size() != shape.iter().product::<usize>() {
            return Err(TensorError::IncompatibleShape {
                from: self.shape().to_vec(),
                to: shape.to_vec(),
            });
        }
        // 非连续（如转置后）的数据先整理为行优先
        let data = self
            .data
            .as_standard_layout()
            .into_owned()
            .into_shape(IxDyn(shape))
            .map_err(|_| TensorError::IncompatibleShape {
                from: self.shape().to_vec(),
                to: shape.to_vec(),
            })?;
        Ok(Self { data })
    }

    /// 在`axis`处插入一个长度为1的新维度
    pub fn insert_axis(&self, axis: usize) -> Result<Self, TensorError> {
        if axis > self.dimension() {
            return Err(TensorError::AxisOutOfRange {
                axis,
                ndim: self.dimension(),
            });
        }
        Ok(Self {
            data: self.data.clone().insert_axis(Axis(axis)),
        })
    }

    /// 2阶张量的转置
    pub fn transpose(&self) -> Result<Self, TensorError> {
        if self.dimension() != 2 {
            return Err(TensorError::DimensionMismatch {
                expected: 2,
                got: self.dimension(),
            });
        }
        Ok(Self {
            data: self.data.t().as_standard_layout().into_owned(),
        })
    }

    /// 沿首个维度（样本维）拼接多个张量，除首维外其余维度必须一致
    pub fn concat_rows(tensors: &[Self]) -> Result<Self, TensorError> {
        if tensors.is_empty() {
            return Err(TensorError::EmptyList);
        }
        let views = tensors.iter().map(|t| t.data.view()).collect::<Vec<_>>();
        let data = concatenate(Axis(0), &views).map_err(|_| TensorError::InconsitentShape)?;
        Ok(Self { data })
    }

    /// 取首个维度上`[start, end)`区间的切片（拷贝）
    pub fn slice_rows(&self, start: usize, end: usize) -> Self {
        assert!(
            self.dimension() >= 1 && start <= end && end <= self.shape()[0],
            "切片区间[{start}, {end})超出了张量首维的范围{:?}",
            self.shape()
        );
        Self {
            data: self
                .data
                .slice_axis(Axis(0), Slice::from(start..end))
                .to_owned(),
        }
    }
}
