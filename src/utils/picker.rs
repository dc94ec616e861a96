use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

/// 在 [0, len) 上均匀选取一个下标
///
/// 抽奖引擎只依赖这个接口，生产使用线程随机数，测试可替换为固定种子。
pub trait WinnerPicker: Send + Sync {
    fn pick(&self, len: usize) -> usize;
}

/// 默认实现：`rand::thread_rng`
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngPicker;

impl WinnerPicker for ThreadRngPicker {
    fn pick(&self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }
}

/// 固定种子，结果可复现
#[derive(Debug)]
pub struct SeededPicker {
    rng: Mutex<StdRng>,
}

impl SeededPicker {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl WinnerPicker for SeededPicker {
    fn pick(&self, len: usize) -> usize {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        rng.gen_range(0..len)
    }
}
