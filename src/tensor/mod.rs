use ndarray::{Array, ArrayD, IxDyn};
use num_traits::AsPrimitive;
use serde::{Deserialize, Serialize};

mod ops {
    pub mod arithmetic;
    pub mod broadcast;
    pub mod mat_mul;
    pub mod others;
}

mod property;
mod shape;

pub use ops::broadcast::broadcast_shape;

#[cfg(test)]
mod tests;

/// 全局统一的浮点精度。所有参数、累加器写入时都会被转换为该类型。
pub type Float = f32;

/// 定义张量的结构体。其可以是标量、向量、矩阵或更高维度的数组。
/// 注：只要通Tensor初始化的都是张量（即使标量也是张量）；
/// 而通常意义上的数字（类型为usize、i32、f64等）就只是纯数（number），在这里不被认为是张量。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tensor {
    data: ArrayD<Float>,
}

impl Tensor {
    /// 创建一个张量，若为标量，`shape`可以是[]、[1]、[1,1]...；
    /// 若为向量，`shape`可以是[n]、[1,n]、[n,1]；
    /// 若为矩阵，`shape`可以是[n,m]；
    /// 若为更高维度的数组，`shape`可以是[c,n,m,...]；
    /// 注：`data`的长度必须和`shape`中所有元素的乘积相等，否则会panic。
    pub fn new(data: &[Float], shape: &[usize]) -> Self {
        assert_eq!(
            data.len(),
            shape.iter().product::<usize>(),
            "数据长度{}与形状{:?}不匹配",
            data.len(),
            shape
        );
        let data = Array::from_shape_vec(IxDyn(shape), data.to_vec()).unwrap();
        Self { data }
    }

    /// 形状为`[]`的标量张量
    pub fn scalar(value: Float) -> Self {
        Self {
            data: ArrayD::from_elem(IxDyn(&[]), value),
        }
    }

    pub fn zeros(shape: &[usize]) -> Self {
        Self {
            data: ArrayD::zeros(IxDyn(shape)),
        }
    }

    pub fn ones(shape: &[usize]) -> Self {
        Self {
            data: ArrayD::ones(IxDyn(shape)),
        }
    }

    pub fn full(shape: &[usize], value: Float) -> Self {
        Self {
            data: ArrayD::from_elem(IxDyn(shape), value),
        }
    }

    /// 从`ndarray`的动态维数组直接构造
    pub fn from_array(data: ArrayD<Float>) -> Self {
        Self { data }
    }

    /// 将任意精度（通常是初始化器产出的f64）的数组转换为全局精度[`Float`]
    pub fn from_array_cast<T: AsPrimitive<Float>>(data: &ArrayD<T>) -> Self {
        Self {
            data: data.mapv(|x| x.as_()),
        }
    }

    /// 按`shape`生成`[0, 1, 2, ...]`的序列张量，主要用于测试和调试
    pub fn arange(shape: &[usize]) -> Self {
        let len = shape.iter().product::<usize>();
        let data = (0..len).map(|i| i as Float).collect::<Vec<_>>();
        Self::new(&data, shape)
    }
}
