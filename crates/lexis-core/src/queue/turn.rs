//! Caller-side new/review alternation

use serde::{Deserialize, Serialize};

use super::{CardFilter, QueueTurn};

/// Round-robin between new and review turns at a new:review ratio
///
/// Lives with the caller (one per study session). After a new turn the next
/// turn is review; after `ratio` review turns the next is new. Filters other
/// than `both` always yield `auto`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueTurnCursor {
    turn: QueueTurn,
    review_count: u32,
    ratio: u32,
}

impl QueueTurnCursor {
    /// Start on a new turn
    pub fn new(new_review_ratio: u32) -> Self {
        Self {
            turn: QueueTurn::New,
            review_count: 0,
            ratio: new_review_ratio.max(1),
        }
    }

    /// Turn to request now
    pub fn current(&self, filter: CardFilter) -> QueueTurn {
        if filter == CardFilter::Both {
            self.turn
        } else {
            QueueTurn::Auto
        }
    }

    /// Turn that would follow the current one, without moving
    pub fn peek_next(&self, filter: CardFilter) -> QueueTurn {
        let mut next = *self;
        next.advance(filter)
    }

    /// Move past the current turn and return the new one
    pub fn advance(&mut self, filter: CardFilter) -> QueueTurn {
        if filter != CardFilter::Both {
            self.turn = QueueTurn::Auto;
            return self.turn;
        }

        if self.turn == QueueTurn::New {
            self.turn = QueueTurn::Review;
            self.review_count = 0;
        } else {
            let count = self.review_count + 1;
            if count >= self.ratio {
                self.turn = QueueTurn::New;
                self.review_count = 0;
            } else {
                self.turn = QueueTurn::Review;
                self.review_count = count;
            }
        }
        self.turn
    }

    /// Change the ratio mid-session; the review count is kept
    pub fn set_ratio(&mut self, new_review_ratio: u32) {
        self.ratio = new_review_ratio.max(1);
    }
}
