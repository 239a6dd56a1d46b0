use std::collections::HashMap;

use crate::deck::DeckId;

/// Slide position for the active deck, remembering where every previously
/// visited deck was left.
#[derive(Debug, Clone, Default)]
pub struct Navigator {
    deck: Option<DeckId>,
    current: usize,
    total: usize,
    positions: HashMap<DeckId, usize>,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `deck` active. A deck seen before resumes at its last index,
    /// clamped in case it has fewer slides now.
    pub fn select_deck(&mut self, deck: DeckId, total: usize) {
        if let Some(previous) = self.deck.take() {
            self.positions.insert(previous, self.current);
        }
        let restored = self.positions.get(&deck).copied().unwrap_or(0);
        self.current = restored.min(total.saturating_sub(1));
        self.total = total;
        self.deck = Some(deck);
    }

    pub fn next(&mut self) -> bool {
        if self.can_advance() {
            self.current += 1;
            true
        } else {
            false
        }
    }

    pub fn prev(&mut self) -> bool {
        if self.can_retreat() {
            self.current -= 1;
            true
        } else {
            false
        }
    }

    /// Jump to `index`. Out-of-range indices are ignored.
    pub fn go_to(&mut self, index: i64) -> bool {
        match usize::try_from(index) {
            Ok(i) if i < self.total && i != self.current => {
                self.current = i;
                true
            }
            _ => false,
        }
    }

    pub fn can_advance(&self) -> bool {
        self.total > 0 && self.current + 1 < self.total
    }

    pub fn can_retreat(&self) -> bool {
        self.current > 0
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn deck_id(&self) -> Option<&DeckId> {
        self.deck.as_ref()
    }

    /// The remembered index of `deck`, or the live one if it is active.
    pub fn position_of(&self, deck: &DeckId) -> Option<usize> {
        if self.deck.as_ref() == Some(deck) {
            Some(self.current)
        } else {
            self.positions.get(deck).copied()
        }
    }
}
