use approx::assert_abs_diff_eq;

use crate::errors::TensorError;
use crate::tensor::Tensor;

#[test]
fn test_sum_and_mean_all() {
    let tensor = Tensor::arange(&[2, 2]);
    assert_eq!(tensor.sum_all(), 6.);
    assert_eq!(tensor.mean_all(), 1.5);
}

#[test]
fn test_reduce_axes() {
    // 形状[2,2,1,2]，模拟(N,C,H,W)的图像批次
    let tensor = Tensor::arange(&[2, 2, 1, 2]);
    let mean = tensor.mean_axes(&[0, 2, 3], true).unwrap();
    assert_eq!(mean.shape(), &[1, 2, 1, 1]);
    // 通道0：0,1,4,5；通道1：2,3,6,7
    assert_eq!(mean.to_vec(), vec![2.5, 4.5]);

    let sum = tensor.sum_axes(&[0], false).unwrap();
    assert_eq!(sum.shape(), &[2, 1, 2]);
    assert_eq!(tensor.reduced_count(&[0, 2, 3]), 4);

    assert_eq!(
        tensor.sum_axes(&[4], true),
        Err(TensorError::AxisOutOfRange { axis: 4, ndim: 4 })
    );
}

#[test]
fn test_unary_functions() {
    let tensor = Tensor::new(&[0., 1., 4.], &[3]);
    assert_eq!(tensor.sqrt(), Tensor::new(&[0., 1., 2.], &[3]));
    assert_abs_diff_eq!(tensor.exp()[[1]], std::f32::consts::E, epsilon = 1e-6);
    assert_abs_diff_eq!(tensor.exp().ln()[[2]], 4., epsilon = 1e-5);
    assert_eq!(tensor.tanh()[[0]], 0.);
    assert_eq!(tensor.powi(2), Tensor::new(&[0., 1., 16.], &[3]));
}
