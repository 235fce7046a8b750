//! 多选条件
//!
//! 选择以固定长度的位集保存，持久化为一个整数。条件内的选项之间是"或"的关系：
//! 只要记录属于任一勾选的选项即通过。

use super::{ConditionState, StoredCondition, render};
use crate::models::Scope;
use crate::options::FlagOption;
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// 按选项位置索引的位集
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FlagSet<P> {
    bits: u32,
    _option: PhantomData<P>,
}

impl<P: FlagOption> FlagSet<P> {
    pub fn empty() -> Self {
        Self::from_bits(0)
    }

    /// 从整数构造，超出选项数目的位被丢弃
    pub fn from_bits(bits: u32) -> Self {
        Self {
            bits: bits & Self::mask(),
            _option: PhantomData,
        }
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    fn mask() -> u32 {
        let len = P::ALL.len() as u32;
        if len >= u32::BITS {
            u32::MAX
        } else {
            (1 << len) - 1
        }
    }

    pub fn set(&mut self, option: P, on: bool) {
        let bit = 1 << option.position();
        if on {
            self.bits |= bit;
        } else {
            self.bits &= !bit;
        }
    }

    pub fn contains(&self, option: P) -> bool {
        self.bits & (1 << option.position()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    /// 按位置顺序遍历已勾选的选项
    pub fn iter(&self) -> impl Iterator<Item = P> + '_ {
        P::ALL.iter().copied().filter(|option| self.contains(*option))
    }
}

impl<P: FlagOption> Default for FlagSet<P> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<P: FlagOption> FromIterator<P> for FlagSet<P> {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        let mut set = Self::empty();
        for option in iter {
            set.set(option, true);
        }
        set
    }
}

impl<P: FlagOption> fmt::Debug for FlagSet<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<P: FlagOption> Serialize for FlagSet<P> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.bits)
    }
}

impl<'de, P: FlagOption> Deserialize<'de> for FlagSet<P> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bits = u32::deserialize(deserializer)?;
        Ok(Self::from_bits(bits))
    }
}

/// 多选条件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "", from = "StoredCondition<FlagSet<P>>")]
pub struct FlagCondition<P: FlagOption> {
    selection: FlagSet<P>,
    count: usize,
    description: String,
}

impl<P: FlagOption> FlagCondition<P> {
    pub fn new() -> Self {
        Self {
            selection: FlagSet::empty(),
            count: 0,
            description: String::new(),
        }
    }

    /// 以给定选项构造
    pub fn with(options: &[P]) -> Self {
        let mut condition = Self::new();
        condition.set_selection(options.iter().copied().collect());
        condition
    }

    pub fn selection(&self) -> FlagSet<P> {
        self.selection
    }

    /// 勾选或取消一个选项
    pub fn toggle(&mut self, option: P, on: bool) {
        self.selection.set(option, on);
        self.refresh();
    }

    /// 按位置勾选或取消，位置越界时不做任何修改并返回 false
    pub fn toggle_position(&mut self, position: usize, on: bool) -> bool {
        match P::from_position(position) {
            Some(option) => {
                self.toggle(option, on);
                true
            }
            None => false,
        }
    }

    pub fn set_selection(&mut self, selection: FlagSet<P>) {
        self.selection = selection;
        self.refresh();
    }

    /// 某个选项在当前上下文中是否通过（未勾选的选项不通过）
    pub fn passes(&self, option: P, scope: &Scope<'_>) -> bool {
        self.selection.contains(option) && option.holds(scope)
    }

    /// 记录是否满足条件：未勾选任何选项时恒通过，否则任一勾选的选项成立即通过
    pub fn is_pass(&self, scope: &Scope<'_>) -> bool {
        if self.selection.is_empty() {
            return true;
        }

        self.selection.iter().any(|option| option.holds(scope))
    }

    fn refresh(&mut self) {
        self.count = self.selection.len();
        self.description = if self.count == 0 {
            String::new()
        } else {
            let labels: Vec<&str> = self.selection.iter().map(|option| option.label()).collect();
            render(P::TITLE, &labels.join("/"))
        };
    }
}

impl<P: FlagOption> From<StoredCondition<FlagSet<P>>> for FlagCondition<P> {
    fn from(stored: StoredCondition<FlagSet<P>>) -> Self {
        let mut condition = Self::new();
        condition.set_selection(stored.selection);
        condition
    }
}

impl<P: FlagOption> Default for FlagCondition<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: FlagOption> ConditionState for FlagCondition<P> {
    fn count(&self) -> usize {
        self.count
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn reset(&mut self) {
        *self = Self::new();
    }
}
