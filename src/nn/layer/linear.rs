/*
 * @Description  : FullyConnected (全连接) 层
 */

use super::{Layer, ParamRegistry, ParamSource, TrainContext};
use crate::nn::init::Fans;
use crate::nn::{Graph, NnError, Var, VarMatrixOps, VarShapeOps};
use crate::utils::Shape;

/// FullyConnected (全连接) 层：`output = X @ W + b`
///
/// # 输入/输出形状
/// - 输入：[batch, *inshape]，多维时先展平为 [batch, prod(inshape)]
/// - 输出：[batch, *outshape]，多维时由 [batch, prod(outshape)] 变形而来
///
/// # 使用示例
/// ```ignore
/// let fc = FullyConnected::new(&graph, 784, 128, true)?;
/// let relu = ReLU::default();
/// let model = Sequential::new(vec![Box::new(fc), Box::new(relu)]);
/// ```
#[derive(Debug)]
pub struct FullyConnected {
    inshape: Vec<usize>,
    outshape: Vec<usize>,
    /// 权重 [prod(inshape), prod(outshape)]
    w: Var,
    /// 偏置 [prod(outshape)]（可选）
    b: Option<Var>,
    registry: ParamRegistry,
}

impl FullyConnected {
    /// 权重与偏置的初始化器待后续绑定（通常由`Sequential`依据后继的激活层绑定）
    pub fn new(
        graph: &Graph,
        inshape: impl Into<Shape>,
        outshape: impl Into<Shape>,
        bias: bool,
    ) -> Result<Self, NnError> {
        let b = bias.then_some(ParamSource::Default);
        Self::with_sources(graph, inshape, outshape, ParamSource::Default, b)
    }

    /// 显式给出权重与偏置的来源；`b`为`None`则不使用偏置
    pub fn with_sources(
        graph: &Graph,
        inshape: impl Into<Shape>,
        outshape: impl Into<Shape>,
        w: ParamSource,
        b: Option<ParamSource>,
    ) -> Result<Self, NnError> {
        let inshape = inshape.into();
        let outshape = outshape.into();
        if inshape.ndim() == 0 || outshape.ndim() == 0 {
            return Err(NnError::Configuration(
                "全连接层的输入与输出形状都不能为空".to_string(),
            ));
        }
        let fan_in = inshape.size();
        let fan_out = outshape.size();

        let mut registry = ParamRegistry::new(graph);
        let w = registry.new_weight(
            "W_fc",
            &[fan_in, fan_out],
            w,
            Some(Fans::new(fan_in, fan_out)),
        )?;
        let b = b
            .map(|source| registry.new_bias("b_fc", &[fan_out], source))
            .transpose()?;

        Ok(Self {
            inshape: inshape.0,
            outshape: outshape.0,
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

impl Layer for FullyConnected {
    fn layer_name(&self) -> &str {
        "FullyConnected"
    }

    fn make_inputs(&self, graph: &Graph, name: &str) -> Var {
        graph.input(1 + self.inshape.len(), name)
    }

    fn train_expr(&self, x: &Var, _ctx: &mut TrainContext) -> Result<Var, NnError> {
        // 多维输入先展平（首维是样本维）
        let x = if self.inshape.len() > 1 {
            x.flatten(2)?
        } else {
            x.clone()
        };
        let mut out = x.matmul(&self.w)?;
        if let Some(b) = &self.b {
            out = out.try_add(b)?;
        }
        if self.outshape.len() > 1 {
            let shape = std::iter::once(-1)
                .chain(self.outshape.iter().map(|&d| d as isize))
                .collect::<Vec<_>>();
            out = out.reshape(&shape)?;
        }
        Ok(out)
    }

    fn registry(&self) -> Option<&ParamRegistry> {
        Some(&self.registry)
    }
}
