//! 粒子注册表
//!
//! 以连续数组（arena）按槽位存储存活粒子，死亡槽位通过空闲列表复用，
//! 避免每帧整体重新分配。超出容量时按环形缓冲区语义淘汰最旧的粒子。

use super::particle::{EmitterGroup, Particle, ParticleId};
use std::collections::VecDeque;

/// 一次插入的结果
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SpawnOutcome {
    /// 实际插入的粒子数
    pub inserted: usize,
    /// 为腾出空间被淘汰的粒子数（包括本批中被立即丢弃的）
    pub evicted: usize,
}

impl SpawnOutcome {
    pub fn merge(self, other: SpawnOutcome) -> Self {
        Self {
            inserted: self.inserted + other.inserted,
            evicted: self.evicted + other.evicted,
        }
    }
}

/// 粒子注册表
///
/// 只负责存储，不做动画、格式化或调度。
#[derive(Debug, Clone)]
pub struct ParticleRegistry {
    /// 槽位
    slots: Vec<Option<Particle>>,
    /// 空闲槽位
    free: Vec<usize>,
    /// 插入顺序（槽位, 标识），可能含已失效的条目
    order: VecDeque<(usize, ParticleId)>,
    /// 各分组存活数
    group_counts: [usize; EmitterGroup::COUNT],
    len: usize,
    cap: usize,
    next_id: u64,
}

impl ParticleRegistry {
    pub fn new(cap: usize) -> Self {
        Self {
            slots: Vec::with_capacity(cap.min(4096)),
            free: Vec::new(),
            order: VecDeque::with_capacity(cap.min(4096)),
            group_counts: [0; EmitterGroup::COUNT],
            len: 0,
            cap,
            next_id: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    /// 修改容量，收缩时淘汰最旧的粒子，返回淘汰数
    pub fn set_cap(&mut self, cap: usize) -> usize {
        self.cap = cap;
        let excess = self.len.saturating_sub(cap);
        self.evict_oldest(excess, |_| true)
    }

    /// 某分组当前存活数
    pub fn group_len(&self, group: EmitterGroup) -> usize {
        self.group_counts[group.index()]
    }

    /// 追加粒子，超出容量时先淘汰最旧的
    pub fn spawn<I>(&mut self, records: I) -> SpawnOutcome
    where
        I: IntoIterator<Item = Particle>,
    {
        let mut records: Vec<Particle> = records.into_iter().collect();
        let mut outcome = SpawnOutcome::default();

        // 单批超过容量时只保留最后 cap 个
        if records.len() > self.cap {
            let dropped = records.len() - self.cap;
            records.drain(..dropped);
            outcome.evicted += dropped;
        }

        let needed = (self.len + records.len()).saturating_sub(self.cap);
        outcome.evicted += self.evict_oldest(needed, |_| true);

        for record in records {
            self.insert(record);
            outcome.inserted += 1;
        }
        outcome
    }

    /// 追加粒子，同时把 `group` 的存活数限制在 `group_cap` 以内
    ///
    /// 淘汰只发生在同一分组内，其它分组的粒子只受全局容量影响。
    pub fn spawn_capped<I>(&mut self, records: I, group: EmitterGroup, group_cap: usize) -> SpawnOutcome
    where
        I: IntoIterator<Item = Particle>,
    {
        let group_cap = group_cap.min(self.cap);
        let mut records: Vec<Particle> = records
            .into_iter()
            .map(|p| p.with_group(group))
            .collect();
        let mut outcome = SpawnOutcome::default();

        if records.len() > group_cap {
            let dropped = records.len() - group_cap;
            records.drain(..dropped);
            outcome.evicted += dropped;
        }

        let needed = (self.group_len(group) + records.len()).saturating_sub(group_cap);
        outcome.evicted += self.evict_oldest(needed, |p| p.group == group);

        outcome.merge(self.spawn(records))
    }

    /// 单次遍历移除所有满足条件的粒子，返回移除数
    pub fn cull<F>(&mut self, mut should_remove: F) -> usize
    where
        F: FnMut(&Particle) -> bool,
    {
        let mut removed = 0;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let remove = matches!(slot.as_ref(), Some(p) if should_remove(p));
            if remove {
                if let Some(p) = slot.take() {
                    self.group_counts[p.group.index()] -= 1;
                    self.free.push(index);
                    removed += 1;
                }
            }
        }
        self.len -= removed;
        self.compact_order();
        removed
    }

    /// 遍历存活粒子
    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    /// 可变遍历存活粒子
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Particle> {
        self.slots.iter_mut().filter_map(Option::as_mut)
    }

    /// 存活粒子快照
    pub fn snapshot(&self) -> Vec<Particle> {
        self.iter().cloned().collect()
    }

    pub fn contains(&self, id: ParticleId) -> bool {
        self.iter().any(|p| p.id == id)
    }

    /// 清空所有粒子，标识不会重置
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.order.clear();
        self.group_counts = [0; EmitterGroup::COUNT];
        self.len = 0;
    }

    fn insert(&mut self, mut particle: Particle) -> ParticleId {
        let id = ParticleId(self.next_id);
        self.next_id += 1;
        particle.id = id;
        self.group_counts[particle.group.index()] += 1;

        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(particle);
                slot
            }
            None => {
                self.slots.push(Some(particle));
                self.slots.len() - 1
            }
        };
        self.order.push_back((slot, id));
        self.len += 1;
        id
    }

    /// 按插入顺序淘汰最多 `count` 个满足条件的粒子
    fn evict_oldest<F>(&mut self, count: usize, predicate: F) -> usize
    where
        F: Fn(&Particle) -> bool,
    {
        if count == 0 {
            return 0;
        }
        let Self {
            slots,
            free,
            order,
            group_counts,
            ..
        } = self;
        let mut evicted = 0;
        order.retain(|&(slot, id)| {
            let group = match &slots[slot] {
                Some(p) if p.id == id => {
                    if evicted >= count || !predicate(p) {
                        return true;
                    }
                    p.group
                }
                _ => return false,
            };
            group_counts[group.index()] -= 1;
            slots[slot] = None;
            free.push(slot);
            evicted += 1;
            false
        });
        self.len -= evicted;
        evicted
    }

    /// 失效条目过多时清理插入顺序队列
    fn compact_order(&mut self) {
        if self.order.len() <= self.len * 2 + 64 {
            return;
        }
        let slots = &self.slots;
        self.order
            .retain(|&(slot, id)| matches!(&slots[slot], Some(p) if p.id == id));
    }
}

impl Default for ParticleRegistry {
    fn default() -> Self {
        Self::new(500)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::particles::particle::ParticleShape;
    use proptest::prelude::*;

    fn disc(x: f32) -> Particle {
        Particle::new(ParticleShape::Disc, x, 0.0)
    }

    #[test]
    fn test_spawn_assigns_unique_ids() {
        let mut registry = ParticleRegistry::new(10);
        registry.spawn((0..3).map(|i| disc(i as f32)));
        let ids: Vec<_> = registry.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![ParticleId(1), ParticleId(2), ParticleId(3)]);
    }

    #[test]
    fn test_spawn_evicts_oldest_first() {
        let mut registry = ParticleRegistry::new(3);
        registry.spawn((0..3).map(|i| disc(i as f32)));
        let outcome = registry.spawn(vec![disc(10.0), disc(11.0)]);

        assert_eq!(outcome, SpawnOutcome { inserted: 2, evicted: 2 });
        assert_eq!(registry.len(), 3);
        let mut xs: Vec<f32> = registry.iter().map(|p| p.position.x).collect();
        xs.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(xs, vec![2.0, 10.0, 11.0]);
    }

    #[test]
    fn test_oversized_batch_keeps_tail() {
        let mut registry = ParticleRegistry::new(2);
        let outcome = registry.spawn((0..5).map(|i| disc(i as f32)));
        assert_eq!(outcome.inserted, 2);
        assert_eq!(outcome.evicted, 3);
        let xs: Vec<f32> = registry.iter().map(|p| p.position.x).collect();
        assert_eq!(xs, vec![3.0, 4.0]);
    }

    #[test]
    fn test_cull_recycles_slots() {
        let mut registry = ParticleRegistry::new(10);
        registry.spawn((0..4).map(|i| disc(i as f32)));
        let removed = registry.cull(|p| p.position.x < 2.0);
        assert_eq!(removed, 2);
        assert_eq!(registry.len(), 2);

        registry.spawn(vec![disc(7.0), disc(8.0)]);
        assert_eq!(registry.len(), 4);
        // 复用槽位，不增长
        assert_eq!(registry.slots.len(), 4);
    }

    #[test]
    fn test_group_cap_only_evicts_same_group() {
        let mut registry = ParticleRegistry::new(100);
        registry.spawn((0..5).map(|i| disc(i as f32)));
        registry.spawn_capped((0..4).map(|i| disc(100.0 + i as f32)), EmitterGroup::Ambient, 4);
        let outcome =
            registry.spawn_capped((0..2).map(|i| disc(200.0 + i as f32)), EmitterGroup::Ambient, 4);

        assert_eq!(outcome.evicted, 2);
        assert_eq!(registry.group_len(EmitterGroup::Burst), 5);
        assert_eq!(registry.group_len(EmitterGroup::Ambient), 4);
        assert_eq!(registry.len(), 9);
    }

    #[test]
    fn test_shrinking_cap_drops_existing() {
        let mut registry = ParticleRegistry::new(10);
        registry.spawn((0..10).map(|i| disc(i as f32)));
        assert_eq!(registry.set_cap(4), 6);
        let xs: Vec<f32> = registry.iter().map(|p| p.position.x).collect();
        assert_eq!(xs, vec![6.0, 7.0, 8.0, 9.0]);
    }

    #[test]
    fn test_ids_not_reused_after_clear() {
        let mut registry = ParticleRegistry::new(4);
        registry.spawn(vec![disc(0.0)]);
        registry.clear();
        registry.spawn(vec![disc(0.0)]);
        assert!(registry.contains(ParticleId(2)));
        assert!(!registry.contains(ParticleId(1)));
    }

    proptest! {
        #[test]
        fn registry_never_exceeds_cap(
            cap in 1usize..64,
            batches in proptest::collection::vec(0usize..40, 1..30),
            cull_every in 1usize..5,
        ) {
            let mut registry = ParticleRegistry::new(cap);
            for (i, batch) in batches.iter().enumerate() {
                if i % 2 == 0 {
                    registry.spawn((0..*batch).map(|j| disc(j as f32)));
                } else {
                    registry.spawn_capped(
                        (0..*batch).map(|j| disc(j as f32)),
                        EmitterGroup::Ambient,
                        cap / 2 + 1,
                    );
                }
                if i % cull_every == 0 {
                    registry.cull(|p| p.position.x > 20.0);
                }
                prop_assert!(registry.len() <= cap);
                prop_assert_eq!(registry.len(), registry.iter().count());
            }
        }
    }
}
