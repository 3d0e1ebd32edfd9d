/*
 * @Description  : 张量的四则运算，支持：
 *                 1. 张量与纯数之间：对每个元素施加运算，返回的张量形状与该张量相同；
 *                 2. 两个张量之间：支持 NumPy 风格的广播（broadcasting）。
 *                 运算符重载版本在形状不兼容时会panic；计算图中使用对应的`try_*`版本以便返回错误。
 */

use crate::errors::{Operator, TensorError};
use crate::tensor::{Float, Tensor};
use std::ops::{Add, Div, Mul, Neg, Sub};

impl Tensor {
    pub fn try_add(&self, other: &Self) -> Result<Self, TensorError> {
        self.zip_broadcast(other, Operator::Add, |a, b| a + b)
    }

    pub fn try_sub(&self, other: &Self) -> Result<Self, TensorError> {
        self.zip_broadcast(other, Operator::Sub, |a, b| a - b)
    }

    pub fn try_mul(&self, other: &Self) -> Result<Self, TensorError> {
        self.zip_broadcast(other, Operator::Mul, |a, b| a * b)
    }

    pub fn try_div(&self, other: &Self) -> Result<Self, TensorError> {
        self.zip_broadcast(other, Operator::Div, |a, b| a / b)
    }

    pub fn try_maximum(&self, other: &Self) -> Result<Self, TensorError> {
        self.zip_broadcast(other, Operator::Maximum, Float::max)
    }

    pub fn try_minimum(&self, other: &Self) -> Result<Self, TensorError> {
        self.zip_broadcast(other, Operator::Minimum, Float::min)
    }
}

macro_rules! impl_tensor_binary_op {
    ($trait:ident, $method:ident, $try_method:ident, $op:tt) => {
        /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓（不）带引用的张量 与（不）带引用的张量↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
        impl $trait<&Tensor> for &Tensor {
            type Output = Tensor;

            fn $method(self, other: &Tensor) -> Tensor {
                self.$try_method(other).unwrap_or_else(|e| panic!("{}", e))
            }
        }
        impl $trait<Tensor> for &Tensor {
            type Output = Tensor;

            fn $method(self, other: Tensor) -> Tensor {
                self $op &other
            }
        }
        impl $trait<&Tensor> for Tensor {
            type Output = Tensor;

            fn $method(self, other: &Tensor) -> Tensor {
                &self $op other
            }
        }
        impl $trait<Tensor> for Tensor {
            type Output = Tensor;

            fn $method(self, other: Tensor) -> Tensor {
                &self $op &other
            }
        }
        /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑（不）带引用的张量 与（不）带引用的张量↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

        /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓（不）带引用的张量 与 纯数↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
        impl $trait<Float> for &Tensor {
            type Output = Tensor;

            fn $method(self, scalar: Float) -> Tensor {
                Tensor {
                    data: self.data.mapv(|x| x $op scalar),
                }
            }
        }
        impl $trait<Float> for Tensor {
            type Output = Tensor;

            fn $method(self, scalar: Float) -> Tensor {
                &self $op scalar
            }
        }
        impl $trait<&Tensor> for Float {
            type Output = Tensor;

            fn $method(self, tensor: &Tensor) -> Tensor {
                Tensor {
                    data: tensor.data.mapv(|x| self $op x),
                }
            }
        }
        impl $trait<Tensor> for Float {
            type Output = Tensor;

            fn $method(self, tensor: Tensor) -> Tensor {
                self $op &tensor
            }
        }
        /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑（不）带引用的张量 与 纯数↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/
    };
}

impl_tensor_binary_op!(Add, add, try_add, +);
impl_tensor_binary_op!(Sub, sub, try_sub, -);
impl_tensor_binary_op!(Mul, mul, try_mul, *);
impl_tensor_binary_op!(Div, div, try_div, /);

impl Neg for &Tensor {
    type Output = Tensor;

    fn neg(self) -> Tensor {
        Tensor {
            data: self.data.mapv(|x| -x),
        }
    }
}

impl Neg for Tensor {
    type Output = Tensor;

    fn neg(self) -> Tensor {
        -&self
    }
}
