/*
 * @Description  : 激活层：Softmax、ReLU、Tanh、Sigmoid。
 *                 各激活层本身无参数，但会告知前一个带参数的层其权重该如何初始化。
 */

use super::{Layer, TrainContext};
use crate::nn::init::{InitPolicy, Initializer};
use crate::nn::{NnError, SigmoidKind, Var, VarActivationOps};
use crate::tensor::{Float, Tensor};
use serde::{Deserialize, Serialize};

/// 多分类输出层，沿最后一维做 softmax
#[derive(Debug, Default)]
pub struct Softmax;

impl Softmax {
    pub const fn new() -> Self {
        Self
    }
}

impl Layer for Softmax {
    fn layer_name(&self) -> &str {
        "Softmax"
    }

    fn train_expr(&self, x: &Var, _ctx: &mut TrainContext) -> Result<Var, NnError> {
        Ok(x.softmax()?)
    }

    fn weight_initializer(&self) -> Option<Initializer> {
        Some(Initializer::Zeros)
    }

    fn bias_initializer(&self) -> Option<Initializer> {
        Some(Initializer::Zeros)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReluConfig {
    /// 负半轴的斜率，0即标准 ReLU
    pub leak: Float,
    /// 线性部分的上限
    pub cap: Option<Float>,
    pub init: InitPolicy,
}

impl Default for ReluConfig {
    fn default() -> Self {
        Self {
            leak: 0.0,
            cap: None,
            init: InitPolicy::Xavier,
        }
    }
}

/// `out = min(max(leak·X, X), cap)`
#[derive(Debug, Default)]
pub struct ReLU {
    config: ReluConfig,
}

impl ReLU {
    pub const fn new(config: ReluConfig) -> Self {
        Self { config }
    }
}

impl Layer for ReLU {
    fn layer_name(&self) -> &str {
        "ReLU"
    }

    fn train_expr(&self, x: &Var, _ctx: &mut TrainContext) -> Result<Var, NnError> {
        let leaky = x.maximum(&(x * self.config.leak))?;
        Ok(match self.config.cap {
            Some(cap) => leaky.minimum(&x.constant(Tensor::scalar(cap)))?,
            None => leaky,
        })
    }

    fn weight_initializer(&self) -> Option<Initializer> {
        Some(match self.config.init {
            InitPolicy::Xavier => Initializer::XavierUniform,
            InitPolicy::XavierN => Initializer::XavierNormal,
            InitPolicy::PReLU => Initializer::PReluNormal,
            InitPolicy::Sigma(sigma) => Initializer::Normal { sigma },
        })
    }

    fn bias_initializer(&self) -> Option<Initializer> {
        Some(Initializer::Zeros)
    }
}

#[derive(Debug, Default)]
pub struct Tanh {
    init: InitPolicy,
}

impl Tanh {
    /// `PReLU`初始化不适用于 tanh
    pub fn new(init: InitPolicy) -> Result<Self, NnError> {
        if init == InitPolicy::PReLU {
            return Err(NnError::Configuration(
                "Tanh 层不支持`PReLU`初始化".to_string(),
            ));
        }
        Ok(Self { init })
    }
}

impl Layer for Tanh {
    fn layer_name(&self) -> &str {
        "Tanh"
    }

    fn train_expr(&self, x: &Var, _ctx: &mut TrainContext) -> Result<Var, NnError> {
        Ok(x.tanh()?)
    }

    fn weight_initializer(&self) -> Option<Initializer> {
        Some(match self.init {
            InitPolicy::XavierN => Initializer::XavierNormal,
            InitPolicy::Sigma(sigma) => Initializer::Normal { sigma },
            InitPolicy::Xavier | InitPolicy::PReLU => Initializer::XavierUniform,
        })
    }

    fn bias_initializer(&self) -> Option<Initializer> {
        Some(Initializer::Zeros)
    }
}

/// `out = 1/(1+exp(-X))`，可选分段线性的近似形式
#[derive(Debug, Default)]
pub struct Sigmoid {
    init: InitPolicy,
    kind: SigmoidKind,
}

impl Sigmoid {
    /// `alt`：`None`为精确形式，`"ultrafast"`与`"hard"`为两种近似
    pub fn new(init: InitPolicy, alt: Option<&str>) -> Result<Self, NnError> {
        let kind = match alt {
            None => SigmoidKind::Exact,
            Some("ultrafast") => SigmoidKind::UltraFast,
            Some("hard") => SigmoidKind::Hard,
            Some(other) => {
                return Err(NnError::Configuration(format!(
                    "未知的sigmoid近似`{}`",
                    other
                )));
            }
        };
        Self::with_kind(init, kind)
    }

    pub fn with_kind(init: InitPolicy, kind: SigmoidKind) -> Result<Self, NnError> {
        if matches!(init, InitPolicy::XavierN | InitPolicy::PReLU) {
            return Err(NnError::Configuration(format!(
                "Sigmoid 层不支持`{:?}`初始化",
                init
            )));
        }
        Ok(Self { init, kind })
    }

    pub const fn kind(&self) -> SigmoidKind {
        self.kind
    }
}

impl Layer for Sigmoid {
    fn layer_name(&self) -> &str {
        "Sigmoid"
    }

    fn train_expr(&self, x: &Var, _ctx: &mut TrainContext) -> Result<Var, NnError> {
        Ok(x.sigmoid(self.kind)?)
    }

    fn weight_initializer(&self) -> Option<Initializer> {
        Some(match self.init {
            InitPolicy::Sigma(sigma) => Initializer::Normal { sigma },
            _ => Initializer::SigmoidXavierUniform,
        })
    }

    fn bias_initializer(&self) -> Option<Initializer> {
        Some(Initializer::Zeros)
    }
}
