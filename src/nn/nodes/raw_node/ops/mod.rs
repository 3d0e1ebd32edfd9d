mod arithmetic;
mod compare;
mod conv2d;
mod dropout_mask;
mod mat_mul;
mod max_pool2d;
mod reduce;
mod reshape;
mod sigmoid;
mod softmax;
mod tanh;
mod unary;

pub(crate) use arithmetic::{Add, Divide, Multiply, Subtract};
pub(crate) use compare::{Maximum, Minimum};
pub use conv2d::BorderMode;
pub(crate) use conv2d::Conv2d;
pub(crate) use dropout_mask::DropoutMask;
pub(crate) use mat_mul::MatMul;
pub(crate) use max_pool2d::MaxPool2d;
pub(crate) use reduce::{Reduce, Reduction};
pub(crate) use reshape::{ExpandDims, Flatten, Reshape};
pub(crate) use sigmoid::Sigmoid;
pub use sigmoid::SigmoidKind;
pub(crate) use softmax::Softmax;
pub(crate) use tanh::Tanh;
pub(crate) use unary::{Exp, Log, Negate, Sqrt};
