/*
 * @Description  : 初始化策略测试：取值范围、经验标准差、扇入扇出校验及解析
 */

use crate::assert_err;
use crate::nn::init::{Fans, InitPolicy, Initializer};
use crate::nn::NnError;
use crate::tensor::Tensor;
use approx::assert_abs_diff_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn std_dev(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
}

#[test]
fn test_xavier_uniform_within_bound() {
    let mut rng = StdRng::seed_from_u64(0);
    for &(fan_in, fan_out) in &[(1, 1), (3, 7), (64, 10), (500, 2)] {
        let fans = Fans::new(fan_in, fan_out);
        let bound = (6.0 / fans.mean()).sqrt();
        let values = Initializer::XavierUniform
            .init(&[fan_in, fan_out], &mut rng, Some(fans))
            .unwrap();
        assert_eq!(values.shape(), &[fan_in, fan_out]);
        assert!(values.iter().all(|v| v.abs() <= bound));
    }
}

#[test]
fn test_sigmoid_xavier_is_four_times_wider() {
    let mut rng = StdRng::seed_from_u64(1);
    let fans = Fans::new(20, 20);
    let bound = 4.0 * (6.0 / fans.mean()).sqrt();
    let values = Initializer::SigmoidXavierUniform
        .init(&[20, 20], &mut rng, Some(fans))
        .unwrap();
    assert!(values.iter().all(|v| v.abs() <= bound));
    // 足够多的样本中应有超出标准 Xavier 界的值
    let plain = (6.0 / fans.mean()).sqrt();
    assert!(values.iter().any(|v| v.abs() > plain));
}

#[test]
fn test_normal_initializers_std() {
    let mut rng = StdRng::seed_from_u64(2);
    let fans = Fans::new(30, 20);
    let shape = [200, 100];

    let xavier_n = Initializer::XavierNormal.init(&shape, &mut rng, Some(fans)).unwrap();
    let values = xavier_n.iter().copied().collect::<Vec<_>>();
    assert_abs_diff_eq!(std_dev(&values), (1.0 / fans.mean()).sqrt(), epsilon = 0.01);

    let prelu = Initializer::PReluNormal.init(&shape, &mut rng, Some(fans)).unwrap();
    let values = prelu.iter().copied().collect::<Vec<_>>();
    assert_abs_diff_eq!(std_dev(&values), (2.0 / fans.mean()).sqrt(), epsilon = 0.01);

    let sigma = Initializer::Normal { sigma: 0.5 }.init(&shape, &mut rng, None).unwrap();
    let values = sigma.iter().copied().collect::<Vec<_>>();
    assert_abs_diff_eq!(std_dev(&values), 0.5, epsilon = 0.01);
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    assert_abs_diff_eq!(mean, 0.0, epsilon = 0.01);
}

#[test]
fn test_constant_like_initializers() {
    let mut rng = StdRng::seed_from_u64(3);
    let zeros = Initializer::Zeros.init(&[2, 3], &mut rng, None).unwrap();
    assert!(zeros.iter().all(|&v| v == 0.0));

    let constant = Initializer::Constant(1.5).init(&[4], &mut rng, None).unwrap();
    assert!(constant.iter().all(|&v| v == 1.5));

    let given = Tensor::new(&[1., 2.], &[2]);
    let array = Initializer::Array(given).init(&[2], &mut rng, None).unwrap();
    assert_eq!(array.iter().copied().collect::<Vec<_>>(), vec![1.0, 2.0]);
    assert_err!(
        Initializer::Array(Tensor::zeros(&[3])).init(&[2], &mut rng, None),
        NnError::Configuration(_)
    );
}

#[test]
fn test_fan_based_initializers_need_fans() {
    let mut rng = StdRng::seed_from_u64(4);
    for init in [
        Initializer::XavierUniform,
        Initializer::XavierNormal,
        Initializer::PReluNormal,
        Initializer::SigmoidXavierUniform,
    ] {
        assert!(init.needs_fans());
        assert_err!(init.init(&[2, 2], &mut rng, None), NnError::Configuration(_));
        assert_err!(
            init.init(&[2, 2], &mut rng, Some(Fans::new(0, 0))),
            NnError::Configuration(_)
        );
    }
    assert!(!Initializer::Zeros.needs_fans());
    assert!(!Initializer::Normal { sigma: 1.0 }.needs_fans());
}

#[test]
fn test_same_seed_same_values() {
    let fans = Fans::new(5, 5);
    let a = Initializer::XavierNormal
        .init(&[5, 5], &mut StdRng::seed_from_u64(9), Some(fans))
        .unwrap();
    let b = Initializer::XavierNormal
        .init(&[5, 5], &mut StdRng::seed_from_u64(9), Some(fans))
        .unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_normal_fills_odd_and_empty_shapes() {
    // 正态样本成对生成，奇数个元素与空形状都须恰好填满
    let mut rng = StdRng::seed_from_u64(3);
    let odd = Initializer::Normal { sigma: 1.0 }.init(&[3, 1, 3], &mut rng, None).unwrap();
    assert_eq!(odd.shape(), &[3, 1, 3]);
    assert!(odd.iter().all(|v| v.is_finite()));

    let empty = Initializer::Normal { sigma: 1.0 }.init(&[0, 4], &mut rng, None).unwrap();
    assert_eq!(empty.shape(), &[0, 4]);
}

#[test]
fn test_init_policy_parsing() {
    assert_eq!("Xavier".parse::<InitPolicy>().unwrap(), InitPolicy::Xavier);
    assert_eq!("XavierN".parse::<InitPolicy>().unwrap(), InitPolicy::XavierN);
    assert_eq!("PReLU".parse::<InitPolicy>().unwrap(), InitPolicy::PReLU);
    assert_eq!("0.01".parse::<InitPolicy>().unwrap(), InitPolicy::Sigma(0.01));
    assert_err!(
        "He".parse::<InitPolicy>(),
        NnError::Configuration("未知的初始化方式`He`")
    );
    assert_eq!(InitPolicy::default(), InitPolicy::Xavier);
}
