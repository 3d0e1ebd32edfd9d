/*
 * @Description  : 流式小批量优化器：逐个小批量地把数据送入一个编译好的训练步
 */

mod base;
mod momentum;
mod sgd;

pub(crate) use base::check_batches;
pub use base::{Augmentation, OptimizerCore, OptimizerOptions, Placeholder, StreamingOptimizer};
pub use momentum::{Momentum, MomentumArgs, MomentumConfig};
pub use sgd::{Sgd, SgdArgs};
