/*
 * @Description  : 二维卷积层
 *
 * out[b, k, :, :] = Σ_d filt[k, d, :, :] * in[b, d, :, :] + bias[k]
 */

use super::{Layer, ParamRegistry, ParamSource, TrainContext};
use crate::nn::init::Fans;
use crate::nn::{BorderMode, Graph, NnError, Var, VarShapeOps, VarSpatialOps};
use crate::utils::Shape;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conv2DConfig {
    /// 输入图像的(h, w)；给出时输入为扁平的 [batch, imdepth·h·w] 矩阵，会先被变形
    pub imshape: Option<(usize, usize)>,
    /// 对完整卷积结果的下采样因子
    pub stride: (usize, usize),
    pub border_mode: BorderMode,
    pub bias: bool,
}

impl Default for Conv2DConfig {
    fn default() -> Self {
        Self {
            imshape: None,
            stride: (1, 1),
            border_mode: BorderMode::Valid,
            bias: true,
        }
    }
}

#[derive(Debug)]
pub struct Conv2D {
    config: Conv2DConfig,
    imdepth: usize,
    /// 卷积核 [nconv, imdepth, kh, kw]
    w: Var,
    /// 偏置 [nconv]（可选）
    b: Option<Var>,
    registry: ParamRegistry,
}

impl Conv2D {
    /// - `nconv`：卷积核个数，即输出的通道数
    /// - `convshape`：卷积核的(h, w)，单个数字表示正方形
    /// - `imdepth`：输入的通道数
    pub fn new(
        graph: &Graph,
        nconv: usize,
        convshape: impl Into<Shape>,
        imdepth: usize,
        config: Conv2DConfig,
    ) -> Result<Self, NnError> {
        let b = config.bias.then_some(ParamSource::Default);
        Self::with_sources(graph, nconv, convshape, imdepth, config, ParamSource::Default, b)
    }

    pub fn with_sources(
        graph: &Graph,
        nconv: usize,
        convshape: impl Into<Shape>,
        imdepth: usize,
        mut config: Conv2DConfig,
        w: ParamSource,
        b: Option<ParamSource>,
    ) -> Result<Self, NnError> {
        let (kh, kw) = match convshape.into().dims() {
            &[k] => (k, k),
            &[kh, kw] => (kh, kw),
            other => {
                return Err(NnError::Configuration(format!(
                    "卷积核形状须为1个或2个数字，实际为{:?}",
                    other
                )));
            }
        };
        if nconv == 0 || imdepth == 0 || kh == 0 || kw == 0 {
            return Err(NnError::Configuration(
                "卷积核个数、输入通道数与卷积核尺寸都必须大于0".to_string(),
            ));
        }
        if config.stride.0 == 0 || config.stride.1 == 0 {
            return Err(NnError::Configuration(format!(
                "卷积步长必须大于0，实际为{:?}",
                config.stride
            )));
        }
        config.bias = b.is_some();

        let fans = Fans::new(imdepth * kh * kw, nconv * kh * kw);
        let mut registry = ParamRegistry::new(graph);
        let w = registry.new_weight("W_conv", &[nconv, imdepth, kh, kw], w, Some(fans))?;
        let b = b
            .map(|source| registry.new_bias("b_conv", &[nconv], source))
            .transpose()?;

        Ok(Self {
            config,
            imdepth,
            w,
            b,
            registry,
        })
    }

    pub fn w(&self) -> &Var {
        &self.w
    }

    pub fn b(&self) -> Option<&Var> {
        self.b.as_ref()
    }
}

impl Layer for Conv2D {
    fn layer_name(&self) -> &str {
        "Conv2D"
    }

    fn make_inputs(&self, graph: &Graph, name: &str) -> Var {
        let ndim = match (self.config.imshape, self.imdepth) {
            (Some(_), _) => 2,
            (None, 1) => 3,
            (None, _) => 4,
        };
        graph.input(ndim, name)
    }

    fn train_expr(&self, x: &Var, _ctx: &mut TrainContext) -> Result<Var, NnError> {
        let x = match self.config.imshape {
            Some((h, w)) => x.reshape(&[-1, self.imdepth as isize, h as isize, w as isize])?,
            None if x.ndim() == 3 => x.expand_dims(1)?,
            None => x.clone(),
        };
        let mut out = x.conv2d(&self.w, self.config.border_mode, self.config.stride)?;
        if let Some(b) = &self.b {
            out = out.try_add(&b.reshape(&[1, -1, 1, 1])?)?;
        }
        Ok(out)
    }

    fn registry(&self) -> Option<&ParamRegistry> {
        Some(&self.registry)
    }
}
