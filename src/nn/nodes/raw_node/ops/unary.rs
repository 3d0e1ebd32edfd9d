/*
 * @Description  : 简单的逐元素一元算子节点：取负、指数、自然对数、平方根
 */

use crate::nn::GraphError;
use crate::nn::nodes::raw_node::{TraitNode, check_parents_count};
use crate::tensor::Tensor;

macro_rules! unary_node {
    ($name:ident, $forward:expr, $backward:expr) => {
        #[derive(Default)]
        pub(crate) struct $name;

        impl TraitNode for $name {
            fn type_name(&self) -> &'static str {
                stringify!($name)
            }

            fn infer_ndim(&self, parent_ndims: &[usize]) -> Result<usize, GraphError> {
                check_parents_count(self.type_name(), parent_ndims, 1)?;
                Ok(parent_ndims[0])
            }

            fn calc_value_by_parents(&self, parents: &[&Tensor]) -> Result<Tensor, GraphError> {
                let forward: fn(&Tensor) -> Tensor = $forward;
                Ok(forward(parents[0]))
            }

            fn calc_grad_to_parent(
                &self,
                _index: usize,
                parents: &[&Tensor],
                value: &Tensor,
                upstream: &Tensor,
            ) -> Result<Option<Tensor>, GraphError> {
                let backward: fn(&Tensor, &Tensor, &Tensor) -> Result<Tensor, GraphError> =
                    $backward;
                Ok(Some(backward(parents[0], value, upstream)?))
            }
        }
    };
}

unary_node!(Negate, |x| -x, |_x, _y, up| Ok(-up));
// d(e^x)/dx = e^x
unary_node!(Exp, |x| x.exp(), |_x, y, up| Ok(up.try_mul(y)?));
// d(ln x)/dx = 1/x
unary_node!(Log, |x| x.ln(), |x, _y, up| Ok(up.try_div(x)?));
// d(√x)/dx = 1/(2√x)
unary_node!(Sqrt, |x| x.sqrt(), |_x, y, up| Ok(up.try_div(&(y * 2.))?));
