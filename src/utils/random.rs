/*
 * @Description  : 随机数源：调用方可使用线程内默认生成器、给出整数种子，或直接借出自己的生成器
 */

use crate::nn::NnError;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::cell::RefCell;

thread_local! {
    static DEFAULT_RNG: RefCell<StdRng> = RefCell::new(StdRng::from_entropy());
}

/// 随机数源
#[derive(Debug, Default)]
pub enum RngSource<'a> {
    /// 线程内共享的默认生成器
    #[default]
    Default,
    /// 以该整数为种子新建一个确定性的生成器；负数非法
    Seed(i64),
    /// 直接使用调用方的生成器
    Generator(&'a mut StdRng),
}

impl From<i64> for RngSource<'_> {
    fn from(seed: i64) -> Self {
        Self::Seed(seed)
    }
}

impl<'a> From<&'a mut StdRng> for RngSource<'a> {
    fn from(rng: &'a mut StdRng) -> Self {
        Self::Generator(rng)
    }
}

/// 重新设定线程内默认生成器的种子
pub fn seed_default_rng(seed: u64) {
    DEFAULT_RNG.with(|rng| *rng.borrow_mut() = StdRng::seed_from_u64(seed));
}

/// 把`source`解析成一个具体的生成器，并在其上执行`f`
///
/// 注意：解析为`Default`时，`f`执行期间默认生成器处于借出状态，
/// `f`内部若需继续派发随机数，应向下传递`RngSource::Generator`
pub fn check_random_state<R, F>(source: RngSource<'_>, f: F) -> Result<R, NnError>
where
    F: FnOnce(&mut StdRng) -> Result<R, NnError>,
{
    match source {
        RngSource::Default => DEFAULT_RNG.with(|rng| f(&mut rng.borrow_mut())),
        RngSource::Seed(seed) => {
            let seed = u64::try_from(seed).map_err(|_| {
                NnError::Configuration(format!("随机数种子须为非负整数，实际为{}", seed))
            })?;
            f(&mut StdRng::seed_from_u64(seed))
        }
        RngSource::Generator(rng) => f(rng),
    }
}
