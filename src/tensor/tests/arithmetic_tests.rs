use crate::assert_panic;
use crate::errors::{Operator, TensorError};
use crate::tensor::Tensor;

#[test]
fn test_add_with_or_without_ownership() {
    let tensor1 = Tensor::new(&[1., 2., 3.], &[3]);
    let tensor2 = Tensor::new(&[4., 5., 6.], &[3]);
    let expected = Tensor::new(&[5., 7., 9.], &[3]);

    // 不带引用的张量 + 不带引用的张量
    assert_eq!(tensor1.clone() + tensor2.clone(), expected);
    // 不带引用的张量 + 带引用的张量
    assert_eq!(tensor1.clone() + &tensor2, expected);
    // 带引用的张量 + 不带引用的张量
    assert_eq!(&tensor1 + tensor2.clone(), expected);
    // 带引用的张量 + 带引用的张量
    assert_eq!(&tensor1 + &tensor2, expected);

    // 纯数
    assert_eq!(5. + &tensor1, Tensor::new(&[6., 7., 8.], &[3]));
    assert_eq!(&tensor1 + 5., Tensor::new(&[6., 7., 8.], &[3]));
}

#[test]
fn test_sub_mul_div_with_number() {
    let tensor = Tensor::new(&[2., 4., 8.], &[3]);
    assert_eq!(&tensor - 1., Tensor::new(&[1., 3., 7.], &[3]));
    assert_eq!(1. - &tensor, Tensor::new(&[-1., -3., -7.], &[3]));
    assert_eq!(&tensor * 0.5, Tensor::new(&[1., 2., 4.], &[3]));
    assert_eq!(8. / &tensor, Tensor::new(&[4., 2., 1.], &[3]));
    assert_eq!(-&tensor, Tensor::new(&[-2., -4., -8.], &[3]));
}

#[test]
fn test_broadcasting_arithmetic() {
    // [2,3] 与 [3]
    let matrix = Tensor::arange(&[2, 3]);
    let row = Tensor::new(&[10., 20., 30.], &[3]);
    let expected = Tensor::new(&[10., 21., 32., 13., 24., 35.], &[2, 3]);
    assert_eq!(&matrix + &row, expected);

    // [2,1] 与 [1,3]
    let col = Tensor::new(&[1., 2.], &[2, 1]);
    let row = Tensor::new(&[1., 2., 3.], &[1, 3]);
    let expected = Tensor::new(&[1., 2., 3., 2., 4., 6.], &[2, 3]);
    assert_eq!(&col * &row, expected);

    // 形状为[]的标量张量
    let scalar = Tensor::scalar(2.);
    assert_eq!(&matrix / &scalar, &matrix * 0.5);
}

#[test]
fn test_incompatible_shapes() {
    let a = Tensor::zeros(&[2, 3]);
    let b = Tensor::zeros(&[2]);
    assert_eq!(
        a.try_sub(&b),
        Err(TensorError::OperatorError {
            operator: Operator::Sub,
            tensor1_shape: vec![2, 3],
            tensor2_shape: vec![2],
        })
    );
    assert_panic!(
        &a + &b,
        "形状不一致，故无法相加：第一个张量的形状为[2, 3]，第二个张量的形状为[2]"
    );
}

#[test]
fn test_maximum_minimum() {
    let a = Tensor::new(&[-1., 0.5, 3.], &[3]);
    let zero = Tensor::scalar(0.);
    assert_eq!(a.try_maximum(&zero).unwrap(), Tensor::new(&[0., 0.5, 3.], &[3]));
    assert_eq!(
        a.try_minimum(&Tensor::scalar(1.)).unwrap(),
        Tensor::new(&[-1., 0.5, 1.], &[3])
    );
}

#[test]
fn test_mat_mul() {
    let a = Tensor::new(&[1., 2., 3., 4., 5., 6.], &[2, 3]);
    let b = Tensor::new(&[1., 0., 0., 1., 1., 1.], &[3, 2]);
    let expected = Tensor::new(&[4., 5., 10., 11.], &[2, 2]);
    assert_eq!(a.mat_mul(&b).unwrap(), expected);

    assert_eq!(
        a.mat_mul(&a),
        Err(TensorError::OperatorError {
            operator: Operator::MatMul,
            tensor1_shape: vec![2, 3],
            tensor2_shape: vec![2, 3],
        })
    );
}
