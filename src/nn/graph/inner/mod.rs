/*
 * @Description  : GraphInner 计算图的底层实现
 *
 * 各 impl 块分散在子模块中：
 * - core.rs: 节点的创建与参数值的读写
 * - eval.rs: 前向求值 + 反向累积梯度
 */

mod core;
mod eval;

use crate::nn::NodeId;
use crate::nn::nodes::NodeHandle;
use std::collections::HashMap;

/// 图的完整定义（核心实现）
///
/// 图本身只保存节点及其连接关系与参数的当前值；每次求值产生的中间结果都是临时的，
/// 不会写回节点，因而同一张图可以被多个编译后的函数共享。
pub struct GraphInner {
    pub(in crate::nn::graph) nodes: HashMap<NodeId, NodeHandle>,
    pub(in crate::nn::graph) next_id: u64,
}

impl Default for GraphInner {
    fn default() -> Self {
        Self::new()
    }
}
