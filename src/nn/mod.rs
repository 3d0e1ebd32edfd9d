/*
 * @Description  : 负责神经网络（neural network）的构建与训练
 *
 * - `graph`/`nodes`/`var`：符号计算图，建表达式、求导、编译可执行函数
 * - `init`/`layer`：参数初始化与层的生命周期
 * - `criterion`/`optimizer`/`trainer`：代价、流式小批量优化器与训练编排
 */

mod criterion;
mod error;
mod graph;
pub mod init;
pub mod layer;
mod nodes;
pub mod optimizer;
mod trainer;
mod var;
mod var_ops;

pub use criterion::{CategoricalCrossEntropy, Cost, MeanSquaredError};
pub use error::NnError;
pub use graph::{Function, FunctionInput, Graph, GraphError, GraphInner, Updates};
pub use init::{Fans, InitPolicy, Initializer};
pub use layer::{Hook, Layer, StatsPass, TrainContext};
pub use nodes::{BorderMode, NodeId, ParamValue, SigmoidKind};
pub use trainer::Trainer;
pub use var::Var;
pub use var_ops::{VarActivationOps, VarMatrixOps, VarReduceOps, VarShapeOps, VarSpatialOps};

#[cfg(test)]
mod tests;
