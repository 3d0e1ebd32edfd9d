/*
 * @Description  : 计算图中的节点：节点句柄、节点种类以及参数节点的两态取值
 */

mod node_handle;
pub(crate) mod raw_node;

pub use node_handle::{NodeId, ParamValue};
pub use raw_node::{BorderMode, SigmoidKind};
pub(crate) use node_handle::{NodeHandle, NodeKind};
