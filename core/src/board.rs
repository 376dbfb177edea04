//! The shared game board and its synchronization discipline.
//!
//! All mutable state (grid cells, per-player turns, wait queues, the
//! watcher set) lives behind a single mutex. Operations that must block
//! (a first flip on a held cell, `watch`, the relabel callbacks of `map`)
//! register a one-shot waker under the lock and await it after the lock is
//! released; the mutex is never held across an await point.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::ensure;
use tokio::sync::oneshot;
use tracing::{debug, trace};

use crate::error::{FlipError, ParseError};
use crate::render::render;
use crate::spot::{Coord, Spot, Turn};

/// The shared Memory Scramble board.
///
/// Grid dimensions are fixed at construction. Every operation takes
/// `&self`, so the board is shared behind an `Arc` without further locking
/// by callers.
#[derive(Debug)]
pub struct Board {
    rows: usize,
    columns: usize,
    inner: Mutex<BoardInner>,
}

#[derive(Debug)]
struct BoardInner {
    columns: usize,
    /// Row-major grid of cells.
    spots: Vec<Spot>,
    /// Turn state per player, created on first contact and kept for the
    /// player's session.
    turns: HashMap<String, Turn>,
    /// FIFO queues of suspended first flips, keyed by target cell. An
    /// entry exists only while its flip is suspended.
    waiters: HashMap<Coord, VecDeque<oneshot::Sender<()>>>,
    /// One-shot watchers awaiting the next observable change.
    watchers: Vec<oneshot::Sender<()>>,
}

impl Board {
    /// Create a board from `rows * columns` labels in row-major order.
    ///
    /// Empty labels start out as removed cells. Fails when either
    /// dimension is zero or the label count does not match the grid size.
    pub fn new(rows: usize, columns: usize, labels: Vec<String>) -> Result<Self, ParseError> {
        let expected = rows
            .checked_mul(columns)
            .filter(|&cells| cells > 0)
            .ok_or(ParseError::Dimensions { rows, columns })?;
        if labels.len() != expected {
            return Err(ParseError::LabelCount {
                expected,
                actual: labels.len(),
            });
        }
        Ok(Self {
            rows,
            columns,
            inner: Mutex::new(BoardInner {
                columns,
                spots: labels.into_iter().map(Spot::from_label).collect(),
                turns: HashMap::new(),
                waiters: HashMap::new(),
                watchers: Vec::new(),
            }),
        })
    }

    /// Number of rows in the grid.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns in the grid.
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Render the board as seen by `player`. Never blocks and makes no
    /// state change beyond registering an unknown player.
    pub fn look(&self, player: &str) -> String {
        let mut inner = self.lock();
        inner.register(player);
        render(self.rows, self.columns, &inner.spots, player)
    }

    /// Flip the card at `(row, column)` for `player`.
    ///
    /// Every call first settles the player's previous turn (removing a
    /// matched pair, turning a missed pair face down), then performs the
    /// first or second flip of the current turn. A first flip on a cell
    /// held by another player suspends, queued FIFO behind any earlier
    /// waiters, until the cell is released; the woken call re-checks the
    /// cell and fails with [`FlipError::NoCard`] or [`FlipError::StillHeld`]
    /// if it can no longer be claimed. Second flips never suspend.
    ///
    /// Returns the rendering from this player's viewpoint after all state
    /// changes made by this call.
    pub async fn flip(&self, player: &str, row: usize, column: usize) -> Result<String, FlipError> {
        let coord = Coord::new(row, column);

        let rx = {
            let mut inner = self.lock();
            inner.register(player);
            inner.settle_turn(player);

            if let Turn::FirstHeld(first) = inner.turn(player) {
                // Second flip: decided entirely in this critical section.
                let free = self
                    .check_bounds(coord)
                    .and_then(|()| inner.check_second_target(coord));
                return match free {
                    Ok(()) => {
                        inner.complete_second(player, first, coord);
                        Ok(self.render_for(&inner, player))
                    }
                    Err(err) => {
                        inner.release_first(player, first);
                        Err(err)
                    }
                };
            }

            // First flip.
            self.check_bounds(coord)?;
            if inner.spot(coord).card.is_none() {
                return Err(FlipError::NoCard { coord });
            }
            if inner.spot(coord).holder.is_none() {
                inner.claim_first(player, coord);
                return Ok(self.render_for(&inner, player));
            }
            let (tx, rx) = oneshot::channel();
            inner.waiters.entry(coord).or_default().push_back(tx);
            trace!(player, %coord, "queued behind holder");
            rx
        };

        // Suspended: the holder (or a removal) will wake us, FIFO per cell.
        let _ = rx.await;

        let mut inner = self.lock();
        if inner.spot(coord).card.is_none() {
            // A removed cell sees no further release events; pass the wake
            // down the queue so every stranded waiter can fail.
            inner.wake_next(coord);
            return Err(FlipError::NoCard { coord });
        }
        if inner.spot(coord).holder.is_some() {
            return Err(FlipError::StillHeld { coord });
        }
        inner.claim_first(player, coord);
        Ok(self.render_for(&inner, player))
    }

    /// Suspend until the next observable board change, then render.
    ///
    /// Observable changes are a spot turning face up or face down, a spot
    /// being removed, and a label rewrite by [`Board::map`]. One change
    /// event wakes every watcher registered before it.
    pub async fn watch(&self, player: &str) -> String {
        let rx = {
            let mut inner = self.lock();
            inner.register(player);
            let (tx, rx) = oneshot::channel();
            inner.watchers.push(tx);
            rx
        };
        let _ = rx.await;
        self.look(player)
    }

    /// Rewrite every card label through `relabel`, preserving pair
    /// identity.
    ///
    /// The distinct labels on the board are collected in one critical
    /// section; `relabel` is then invoked exactly once per distinct label
    /// with the board unlocked (it must not call back into this board);
    /// finally all replacements are applied in a single critical section,
    /// so no other operation observes a partially rewritten grid. If any
    /// invocation fails, or produces an empty label, no replacement is
    /// applied at all. A label that first appears between the snapshot and
    /// the apply step is left unchanged.
    pub async fn map<F, Fut>(&self, player: &str, mut relabel: F) -> anyhow::Result<String>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = anyhow::Result<String>>,
    {
        let labels: BTreeSet<String> = {
            let mut inner = self.lock();
            inner.register(player);
            inner
                .spots
                .iter()
                .filter_map(|spot| spot.card.clone())
                .collect()
        };

        let mut replacements = HashMap::with_capacity(labels.len());
        for label in labels {
            let replacement = relabel(label.clone()).await?;
            ensure!(
                !replacement.is_empty(),
                "relabel returned an empty label for {label:?}"
            );
            replacements.insert(label, replacement);
        }

        let mut inner = self.lock();
        let mut changed = false;
        for spot in &mut inner.spots {
            let Some(card) = &spot.card else { continue };
            if let Some(replacement) = replacements.get(card) {
                if replacement != card {
                    spot.card = Some(replacement.clone());
                    changed = true;
                }
            }
        }
        if changed {
            debug!(player, "card labels rewritten");
            inner.notify_watchers();
        }
        Ok(self.render_for(&inner, player))
    }

    fn check_bounds(&self, coord: Coord) -> Result<(), FlipError> {
        if coord.row < self.rows && coord.column < self.columns {
            Ok(())
        } else {
            Err(FlipError::OutOfRange {
                coord,
                rows: self.rows,
                columns: self.columns,
            })
        }
    }

    fn render_for(&self, inner: &BoardInner, viewer: &str) -> String {
        render(self.rows, self.columns, &inner.spots, viewer)
    }

    fn lock(&self) -> MutexGuard<'_, BoardInner> {
        // State is consistent at every unlock point, so a guard recovered
        // from a poisoned mutex is still usable.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BoardInner {
    fn index(&self, coord: Coord) -> usize {
        coord.row * self.columns + coord.column
    }

    fn spot(&self, coord: Coord) -> &Spot {
        &self.spots[self.index(coord)]
    }

    fn spot_mut(&mut self, coord: Coord) -> &mut Spot {
        let index = self.index(coord);
        &mut self.spots[index]
    }

    fn register(&mut self, player: &str) {
        if !self.turns.contains_key(player) {
            self.turns.insert(player.to_string(), Turn::Idle);
            debug!(player, "player joined");
        }
    }

    fn turn(&self, player: &str) -> Turn {
        self.turns.get(player).copied().unwrap_or(Turn::Idle)
    }

    /// Settle the player's previous turn, if one is pending: remove a
    /// matched pair, turn a missed pair (or a released first card) face
    /// down where still unheld. Leaves the player idle.
    fn settle_turn(&mut self, player: &str) {
        let mut changed = false;
        match self.turn(player) {
            Turn::Idle | Turn::FirstHeld(_) => return,
            Turn::Pair {
                first,
                second,
                matched: true,
            } => {
                for coord in [first, second] {
                    let spot = self.spot_mut(coord);
                    spot.card = None;
                    spot.face_up = false;
                    spot.holder = None;
                    // Waiters queued while the pair was held must get a
                    // chance to discover the removal and fail.
                    self.wake_next(coord);
                }
                changed = true;
                debug!(player, %first, %second, "matched pair removed");
            }
            Turn::Pair {
                first,
                second,
                matched: false,
            } => {
                for coord in [first, second] {
                    changed |= self.face_down_if_free(coord);
                }
            }
            Turn::FirstReleased(first) => {
                changed |= self.face_down_if_free(first);
            }
        }
        self.turns.insert(player.to_string(), Turn::Idle);
        if changed {
            self.notify_watchers();
        }
    }

    /// Turn a spot face down unless it has been removed or another player
    /// has since acquired it. Returns whether anything changed.
    fn face_down_if_free(&mut self, coord: Coord) -> bool {
        let spot = self.spot_mut(coord);
        if spot.face_up && spot.holder.is_none() {
            spot.face_up = false;
            true
        } else {
            false
        }
    }

    /// Take an unheld, carded cell as the player's first card.
    fn claim_first(&mut self, player: &str, coord: Coord) {
        let spot = self.spot_mut(coord);
        let changed = !spot.face_up;
        spot.face_up = true;
        spot.holder = Some(player.to_string());
        self.turns.insert(player.to_string(), Turn::FirstHeld(coord));
        // One wake per acquisition event: a queued waiter whose turn has
        // passed learns of the new holder and fails instead of hanging.
        self.wake_next(coord);
        if changed {
            self.notify_watchers();
        }
        debug!(player, %coord, "first card claimed");
    }

    /// A second flip may only target a cell that still has a card and is
    /// held by nobody (the caller's own first card included).
    fn check_second_target(&self, coord: Coord) -> Result<(), FlipError> {
        let spot = self.spot(coord);
        if spot.card.is_none() {
            return Err(FlipError::NoCard { coord });
        }
        if spot.holder.is_some() {
            return Err(FlipError::Held { coord });
        }
        Ok(())
    }

    /// Finish the player's second flip on a free, carded target.
    fn complete_second(&mut self, player: &str, first: Coord, target: Coord) {
        let spot = self.spot_mut(target);
        let changed = !spot.face_up;
        spot.face_up = true;
        let matched = self.spot(target).card == self.spot(first).card;
        if matched {
            self.spot_mut(target).holder = Some(player.to_string());
        } else {
            // On a miss the first card is let go right away; both cards
            // stay face up until the player's next turn settles them.
            self.spot_mut(first).holder = None;
            self.wake_next(first);
        }
        self.turns.insert(
            player.to_string(),
            Turn::Pair {
                first,
                second: target,
                matched,
            },
        );
        if changed {
            self.notify_watchers();
        }
        debug!(player, %first, %target, matched, "second card flipped");
    }

    /// Drop the hold on a first card after a failed second flip. The card
    /// stays face up; the player's next turn will settle it.
    fn release_first(&mut self, player: &str, first: Coord) {
        self.spot_mut(first).holder = None;
        self.turns
            .insert(player.to_string(), Turn::FirstReleased(first));
        self.wake_next(first);
        debug!(player, %first, "first card released");
    }

    /// Wake the oldest live waiter on `coord`, discarding cancelled
    /// waiters (dropped receivers) in passing.
    fn wake_next(&mut self, coord: Coord) {
        if let Some(queue) = self.waiters.get_mut(&coord) {
            while let Some(waiter) = queue.pop_front() {
                if waiter.send(()).is_ok() {
                    trace!(%coord, "woke next waiter");
                    break;
                }
            }
            if queue.is_empty() {
                self.waiters.remove(&coord);
            }
        }
    }

    /// Complete every registered watcher and empty the set.
    fn notify_watchers(&mut self) {
        if self.watchers.is_empty() {
            return;
        }
        trace!(watchers = self.watchers.len(), "board changed");
        for watcher in self.watchers.drain(..) {
            let _ = watcher.send(());
        }
    }
}

#[cfg(test)]
impl Board {
    /// Check the structural invariants that must hold between operations:
    /// removed spots are face down and unheld, held spots are face up with
    /// a card, and every held spot is accounted for by its holder's turn
    /// (at most two per player).
    pub(crate) fn assert_invariants(&self) {
        let inner = self.lock();
        let mut held: HashMap<String, Vec<Coord>> = HashMap::new();
        for (index, spot) in inner.spots.iter().enumerate() {
            let coord = Coord::new(index / self.columns, index % self.columns);
            if spot.card.is_none() {
                assert!(!spot.face_up, "removed spot {coord} is face up");
                assert!(spot.holder.is_none(), "removed spot {coord} is held");
            }
            if let Some(holder) = &spot.holder {
                assert!(spot.face_up, "held spot {coord} is face down");
                held.entry(holder.clone()).or_default().push(coord);
            }
        }
        for (player, coords) in &held {
            assert!(
                coords.len() <= 2,
                "player {player} holds {} spots",
                coords.len()
            );
            let turn = inner.turn(player);
            for coord in coords {
                let accounted = match turn {
                    Turn::FirstHeld(first) => first == *coord,
                    Turn::Pair { first, second, .. } => first == *coord || second == *coord,
                    Turn::Idle | Turn::FirstReleased(_) => false,
                };
                assert!(accounted, "player {player} holds {coord} outside its turn");
            }
        }
    }

    pub(crate) fn waiter_count(&self, coord: Coord) -> usize {
        self.lock().waiters.get(&coord).map_or(0, VecDeque::len)
    }

    pub(crate) fn watcher_count(&self) -> usize {
        self.lock().watchers.len()
    }
}
