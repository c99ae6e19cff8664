//! IdGenerator port - TaskId の生成
//!
//! TaskId はプロセス起動時に 1 度だけ生成される。同じキュー・ストアを共有する
//! 複数のワーカー間で衝突しないこと、起動順にソートできることが要件。

use crate::domain::TaskId;
use crate::ports::Clock;
use ulid::Ulid;

pub trait IdGenerator: Send + Sync {
    fn generate_task_id(&self) -> TaskId;
}

/// ULID: 上位 48bit が Clock の時刻、下位 80bit が乱数
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_task_id(&self) -> TaskId {
        let millis = self.clock.now().timestamp_millis().max(0) as u64;
        TaskId::from(Ulid::from_parts(millis, rand::random()))
    }
}
