/*
 * @Description  : Graph 模块：计算图的核心实现
 *
 * 公开 API：
 * - `Graph`: 用户级句柄
 * - `GraphInner`: 底层实现
 * - `Function`: 编译后的可执行函数（带原子更新）
 * - `GraphError`: 错误类型
 */

mod error;
mod function;
mod handle;
mod inner;

pub use error::GraphError;
pub use function::{Function, FunctionInput, Updates};
pub use handle::Graph;
pub use inner::GraphInner;
