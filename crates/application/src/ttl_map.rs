//! 带时间淘汰的并发映射
//!
//! 限流桶、在线状态与工作量证明挑战都是“按键存放、定期清扫”的内存表，
//! 这里把锁的获取与清扫逻辑集中在一处。每个实例自带一把读写锁，
//! 不同实例之间没有任何共享状态。

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// 以读写锁保护的键值表，过期判定由调用方以闭包给出
#[derive(Debug)]
pub struct TtlMap<K, V> {
    entries: RwLock<HashMap<K, V>>,
}

impl<K, V> Default for TtlMap<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> TtlMap<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    // 持锁期间不会 panic，中毒时直接取回内部数据
    fn read(&self) -> RwLockReadGuard<'_, HashMap<K, V>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<K, V>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// 写入或覆盖，返回旧值
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.write().insert(key, value)
    }

    /// 在同一次加锁内完成“不存在则创建、存在则更新”
    ///
    /// `create` 返回新值以及要交给调用方的结果；`update` 就地修改已有值。
    pub fn upsert<Q, R>(
        &self,
        key: &Q,
        create: impl FnOnce() -> (V, R),
        update: impl FnOnce(&mut V) -> R,
    ) -> R
    where
        K: Borrow<Q>,
        Q: ToOwned<Owned = K> + Hash + Eq + ?Sized,
    {
        let mut entries = self.write();
        if let Some(existing) = entries.get_mut(key) {
            return update(existing);
        }
        let (value, result) = create();
        entries.insert(key.to_owned(), value);
        result
    }

    /// 取出并删除，查找与删除是同一个原子步骤
    pub fn take<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.write().remove(key)
    }

    pub fn get_with<Q, R>(&self, key: &Q, read: impl FnOnce(&V) -> R) -> Option<R>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.read().get(key).map(read)
    }

    /// 在共享锁下复制出满足条件的值
    pub fn filter_cloned(&self, mut keep: impl FnMut(&V) -> bool) -> Vec<V>
    where
        V: Clone,
    {
        self.read()
            .values()
            .filter(|value| keep(value))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// 删除所有被判定为过期的条目，返回删除数量
    pub fn sweep(&self, mut is_stale: impl FnMut(&K, &V) -> bool) -> usize {
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|key, value| !is_stale(key, value));
        before - entries.len()
    }
}
