//! # Minibatch Torch
//!
//! `minibatch_torch`用纯rust实现一个小型的神经网络框架：
//! 由可微的层组合出模型，再用流式小批量优化器（SGD、动量/Nesterov）训练。
//! 框架自带一个精简的符号计算图，负责建表达式、求梯度，并在一步之内原子地应用参数更新。
//!

pub mod errors;
pub mod nn;
pub mod tensor;
pub mod utils;
