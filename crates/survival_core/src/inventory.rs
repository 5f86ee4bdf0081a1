//! Inventory collaborator.
//!
//! The core never manages slots itself; it only counts, consumes, adds and
//! wears down the held tool through [`Inventory`]. [`Backpack`] is a plain
//! counted-stack implementation used by the headless runner and tests.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::ItemId;

/// Result of wearing down the held tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DurabilityResult {
    /// The tool broke and left the hand.
    pub broken: bool,
    /// Durability left, `None` when nothing durable is held.
    pub remaining: Option<u32>,
}

/// Item storage consumed by the resolvers.
pub trait Inventory {
    /// Whether at least `count` of `item` are held.
    fn has_item(&self, item: &ItemId, count: u32) -> bool;

    /// Remove `count` of `item`; `false` and no change if not enough.
    fn consume(&mut self, item: &ItemId, count: u32) -> bool;

    /// Add `count` of `item`; `false` if it does not fit.
    fn add(&mut self, item: &ItemId, count: u32) -> bool;

    /// Item currently in the hand slot.
    fn current_hand_item(&self) -> Option<ItemId>;

    /// Wear the held tool down by `amount`.
    fn consume_hand_durability(&mut self, amount: u32) -> DurabilityResult;
}

/// Tool in the hand slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeldTool {
    /// Held item.
    pub item: ItemId,
    /// Remaining uses; `None` for items that never wear out.
    pub durability: Option<u32>,
}

/// Counted item stacks plus a hand slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backpack {
    #[serde(default)]
    items: BTreeMap<ItemId, u32>,
    #[serde(default)]
    hand: Option<HeldTool>,
    /// Per-stack cap, `None` for unlimited.
    #[serde(default)]
    stack_limit: Option<u32>,
}

impl Backpack {
    /// Empty backpack with nothing in hand.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: start with `count` of `item`.
    #[must_use]
    pub fn with_item(mut self, item: impl Into<ItemId>, count: u32) -> Self {
        let item = item.into();
        self.add(&item, count);
        self
    }

    /// Builder: hold `item` with the given durability.
    #[must_use]
    pub fn holding(mut self, item: impl Into<ItemId>, durability: Option<u32>) -> Self {
        self.hand = Some(HeldTool {
            item: item.into(),
            durability,
        });
        self
    }

    /// Builder: cap every stack at `limit`.
    #[must_use]
    pub fn with_stack_limit(mut self, limit: u32) -> Self {
        self.stack_limit = Some(limit);
        self
    }

    /// Count of `item` (hand slot excluded).
    #[must_use]
    pub fn count(&self, item: &ItemId) -> u32 {
        self.items.get(item).copied().unwrap_or(0)
    }

    /// All non-empty stacks.
    #[must_use]
    pub fn stacks(&self) -> &BTreeMap<ItemId, u32> {
        &self.items
    }

    /// Current hand slot.
    #[must_use]
    pub fn hand(&self) -> Option<&HeldTool> {
        self.hand.as_ref()
    }
}

impl Inventory for Backpack {
    fn has_item(&self, item: &ItemId, count: u32) -> bool {
        self.count(item) >= count
    }

    fn consume(&mut self, item: &ItemId, count: u32) -> bool {
        let held = self.count(item);
        if held < count {
            return false;
        }
        if held == count {
            self.items.remove(item);
        } else {
            self.items.insert(item.clone(), held - count);
        }
        true
    }

    fn add(&mut self, item: &ItemId, count: u32) -> bool {
        if count == 0 {
            return true;
        }
        let total = self.count(item).saturating_add(count);
        if self.stack_limit.is_some_and(|limit| total > limit) {
            return false;
        }
        self.items.insert(item.clone(), total);
        true
    }

    fn current_hand_item(&self) -> Option<ItemId> {
        self.hand.as_ref().map(|tool| tool.item.clone())
    }

    fn consume_hand_durability(&mut self, amount: u32) -> DurabilityResult {
        let Some(tool) = self.hand.as_mut() else {
            return DurabilityResult::default();
        };
        let Some(durability) = tool.durability else {
            return DurabilityResult::default();
        };

        let remaining = durability.saturating_sub(amount);
        if remaining == 0 {
            self.hand = None;
            DurabilityResult {
                broken: true,
                remaining: Some(0),
            }
        } else {
            tool.durability = Some(remaining);
            DurabilityResult {
                broken: false,
                remaining: Some(remaining),
            }
        }
    }
}
