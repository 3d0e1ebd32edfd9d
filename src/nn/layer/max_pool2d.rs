/*
 * @Description  : 二维空间最大池化层，对4阶输入的最后两维池化
 */

use super::{Layer, TrainContext};
use crate::nn::{Graph, NnError, Var, VarSpatialOps};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// 池化窗口的(h, w)
    pub size: (usize, usize),
    /// 步长；只支持与窗口大小相同（即不重叠的池化）
    pub stride: Option<(usize, usize)>,
    /// 为真时丢弃不足一个窗口的边缘
    pub ignore_border: bool,
}

impl PoolConfig {
    pub const fn new(size: (usize, usize)) -> Self {
        Self {
            size,
            stride: None,
            ignore_border: false,
        }
    }

    pub const fn square(size: usize) -> Self {
        Self::new((size, size))
    }
}

#[derive(Debug)]
pub struct SpatialMaxPool {
    config: PoolConfig,
}

impl SpatialMaxPool {
    pub fn new(config: PoolConfig) -> Result<Self, NnError> {
        if config.size.0 == 0 || config.size.1 == 0 {
            return Err(NnError::Configuration(format!(
                "池化窗口必须大于0，实际为{:?}",
                config.size
            )));
        }
        if let Some(stride) = config.stride {
            if stride != config.size {
                return Err(NnError::Configuration(format!(
                    "不支持与池化窗口{:?}不同的步长{:?}",
                    config.size, stride
                )));
            }
        }
        Ok(Self { config })
    }
}

impl Layer for SpatialMaxPool {
    fn layer_name(&self) -> &str {
        "SpatialMaxPool"
    }

    fn make_inputs(&self, graph: &Graph, name: &str) -> Var {
        graph.input(4, name)
    }

    fn train_expr(&self, x: &Var, _ctx: &mut TrainContext) -> Result<Var, NnError> {
        Ok(x.max_pool2d(self.config.size, self.config.ignore_border)?)
    }
}
