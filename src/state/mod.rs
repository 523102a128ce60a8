//! Incremental bay representation.
//!
//! A state is split in two: a [`Head`] carries the scalars and per-stack
//! arrays (heights, the ordered stack list, change tracking), a [`Body`]
//! carries the per-slot matrices (priority, quality, badness, placement
//! time). The search shares one body among all sibling branches of a node
//! while giving every branch its own head, so the split is the unit of reuse.
//!
//! The stack list is kept sorted by `(top quality, top badness)` ascending at
//! all times; every primitive operation changes at most one stack's key and
//! restores the order with a local bubble shift.

use crate::instance::Instance;
use crate::types::Change;

/// Per-slot matrices of a bay, flattened over `n_stacks * (n_tiers + 1)`
/// entries so tier 0 can hold the ground sentinel `max_prio + 1`.
#[derive(Clone, Debug)]
pub struct Body {
    n_stacks: usize,
    n_tiers: usize,
    p: Vec<u32>,
    q: Vec<u32>,
    b: Vec<u32>,
    l: Vec<u32>,
}

impl Body {
    pub fn new(n_stacks: usize, n_tiers: usize) -> Body {
        let slots = n_stacks * (n_tiers + 1);
        Body {
            n_stacks,
            n_tiers,
            p: vec![0; slots],
            q: vec![0; slots],
            b: vec![0; slots],
            l: vec![0; slots],
        }
    }

    pub fn n_stacks(&self) -> usize {
        self.n_stacks
    }

    pub fn n_tiers(&self) -> usize {
        self.n_tiers
    }

    #[inline]
    fn idx(&self, s: usize, t: usize) -> usize {
        s * (self.n_tiers + 1) + t
    }

    /// Priority of the block at tier `t` of stack `s` (tier 0 is the ground
    /// sentinel).
    #[inline]
    pub fn pri(&self, s: usize, t: usize) -> u32 {
        self.p[self.idx(s, t)]
    }

    /// Smallest priority among tiers `1..=t` of stack `s`.
    #[inline]
    pub fn quality(&self, s: usize, t: usize) -> u32 {
        self.q[self.idx(s, t)]
    }

    /// Length of the run of badly-placed blocks ending at tier `t`.
    #[inline]
    pub fn badness(&self, s: usize, t: usize) -> u32 {
        self.b[self.idx(s, t)]
    }

    /// Time of the relocation that put the block into slot `(s, t)`, or 0 if
    /// it was placed by the initial layout.
    #[inline]
    pub fn placed_at(&self, s: usize, t: usize) -> u32 {
        self.l[self.idx(s, t)]
    }

    /// Recompute the slot `(s, t)` from the slot below it and priority `p`.
    pub fn update_slot(&mut self, s: usize, t: usize, p: u32, time: u32) {
        let i = self.idx(s, t);
        self.p[i] = p;
        if t == 0 || p <= self.q[i - 1] {
            self.q[i] = p;
            self.b[i] = 0;
        } else {
            self.q[i] = self.q[i - 1];
            self.b[i] = self.b[i - 1] + 1;
        }
        self.l[i] = time;
    }

    /// Overwrite this body with `other`, reusing the allocation.
    pub fn copy_from(&mut self, other: &Body) {
        self.p.copy_from_slice(&other.p);
        self.q.copy_from_slice(&other.q);
        self.b.copy_from_slice(&other.b);
        self.l.copy_from_slice(&other.l);
    }
}

/// Per-stack arrays and scalars of a bay, including the ordered stack list
/// and the change-tracking fields the dominance rules consult.
#[derive(Clone, Debug)]
pub struct Head {
    pub n_blocks: usize,
    pub n_bad: usize,
    pub h: Vec<usize>,
    pub list: Vec<usize>,
    pub rank: Vec<usize>,
    pub last_change_time: Vec<u32>,
    pub last_change: Vec<Change>,
    pub last_move_out_time: Vec<u32>,
    pub last_move_in_time: Vec<u32>,
}

impl Head {
    pub fn new(n_stacks: usize) -> Head {
        Head {
            n_blocks: 0,
            n_bad: 0,
            h: vec![0; n_stacks],
            list: (0..n_stacks).collect(),
            rank: (0..n_stacks).collect(),
            last_change_time: vec![0; n_stacks],
            last_change: vec![Change::Never; n_stacks],
            last_move_out_time: vec![0; n_stacks],
            last_move_in_time: vec![0; n_stacks],
        }
    }

    /// Overwrite this head with `other`, reusing the allocations.
    pub fn copy_from(&mut self, other: &Head) {
        self.n_blocks = other.n_blocks;
        self.n_bad = other.n_bad;
        self.h.copy_from_slice(&other.h);
        self.list.copy_from_slice(&other.list);
        self.rank.copy_from_slice(&other.rank);
        self.last_change_time.copy_from_slice(&other.last_change_time);
        self.last_change.copy_from_slice(&other.last_change);
        self.last_move_out_time.copy_from_slice(&other.last_move_out_time);
        self.last_move_in_time.copy_from_slice(&other.last_move_in_time);
    }

    #[inline]
    pub fn top_priority(&self, body: &Body, s: usize) -> u32 {
        body.pri(s, self.h[s])
    }

    #[inline]
    pub fn top_quality(&self, body: &Body, s: usize) -> u32 {
        body.quality(s, self.h[s])
    }

    #[inline]
    pub fn top_badness(&self, body: &Body, s: usize) -> u32 {
        body.badness(s, self.h[s])
    }

    #[inline]
    fn stack_key(&self, body: &Body, s: usize) -> (u32, u32) {
        (self.top_quality(body, s), self.top_badness(body, s))
    }

    /// True iff the top of the best stack is the globally smallest remaining
    /// priority.
    #[inline]
    pub fn is_retrievable(&self, body: &Body) -> bool {
        self.n_blocks > 0 && self.top_badness(body, self.list[0]) == 0
    }

    /// True iff some stack is empty. Empty stacks carry the ground sentinel
    /// as quality, so they sort last.
    #[inline]
    pub fn has_empty_stack(&self) -> bool {
        self.h[self.list[self.h.len() - 1]] == 0
    }

    fn adjust_left(&mut self, body: &Body, s: usize) {
        let key = self.stack_key(body, s);
        let mut i = self.rank[s];
        while i > 0 && key < self.stack_key(body, self.list[i - 1]) {
            let n = self.list[i - 1];
            self.list[i] = n;
            self.rank[n] = i;
            i -= 1;
        }
        self.list[i] = s;
        self.rank[s] = i;
    }

    fn adjust_right(&mut self, body: &Body, s: usize) {
        let key = self.stack_key(body, s);
        let last = self.list.len() - 1;
        let mut i = self.rank[s];
        while i < last && key > self.stack_key(body, self.list[i + 1]) {
            let n = self.list[i + 1];
            self.list[i] = n;
            self.rank[n] = i;
            i += 1;
        }
        self.list[i] = s;
        self.rank[s] = i;
    }

    /// Remove the topmost block of stack `s`. The stack's key improves when
    /// the removed tier was badly placed and worsens otherwise.
    pub fn move_out(&mut self, body: &Body, s: usize, time: u32) {
        debug_assert!(self.h[s] > 0);
        let t = self.h[s];
        self.h[s] = t - 1;
        if body.badness(s, t) > 0 {
            self.n_bad -= 1;
            self.adjust_left(body, s);
        } else {
            self.adjust_right(body, s);
        }
        self.last_change_time[s] = time;
        self.last_change[s] = Change::MoveOut;
        self.last_move_out_time[s] = time;
    }

    /// Push a block with priority `p` onto stack `d`.
    pub fn move_in(&mut self, body: &mut Body, d: usize, p: u32, time: u32) {
        debug_assert!(self.h[d] < body.n_tiers());
        let t = self.h[d] + 1;
        self.h[d] = t;
        body.update_slot(d, t, p, time);
        if body.badness(d, t) > 0 {
            self.n_bad += 1;
            self.adjust_right(body, d);
        } else {
            self.adjust_left(body, d);
        }
        self.last_change_time[d] = time;
        self.last_change[d] = Change::MoveIn;
        self.last_move_in_time[d] = time;
    }

    /// Relocate the topmost block of `s` onto `d`.
    pub fn relocate(&mut self, body: &mut Body, s: usize, d: usize, time: u32) {
        debug_assert_ne!(s, d);
        let p = self.top_priority(body, s);
        self.move_out(body, s, time);
        self.move_in(body, d, p, time);
    }

    /// Retrieve the target block from the top of the best stack. The stack's
    /// quality can only rise, so it shifts right in the order.
    pub fn retrieve(&mut self, body: &Body, time: u32) {
        debug_assert!(self.is_retrievable(body));
        let s = self.list[0];
        self.n_blocks -= 1;
        self.h[s] -= 1;
        self.adjust_right(body, s);
        self.last_change_time[s] = time;
        self.last_change[s] = Change::Retrieve;
    }
}

/// A fully-owned state: one head observing one body. The search composes
/// heads and bodies directly; owned states back the root and the probing
/// scratch copies.
#[derive(Clone, Debug)]
pub struct State {
    pub head: Head,
    pub body: Body,
}

impl State {
    pub fn from_instance(inst: &Instance) -> State {
        let mut head = Head::new(inst.n_stacks());
        let mut body = Body::new(inst.n_stacks(), inst.n_tiers());
        head.n_blocks = inst.n_blocks();
        for s in 0..inst.n_stacks() {
            head.h[s] = inst.height(s);
            body.update_slot(s, 0, inst.max_prio() + 1, 0);
            for t in 1..=head.h[s] {
                body.update_slot(s, t, inst.priority(s, t), 0);
                if body.badness(s, t) > 0 {
                    head.n_bad += 1;
                }
            }
            head.list[s] = s;
            head.rank[s] = s;
            head.adjust_left(&body, s);
        }
        State { head, body }
    }

    pub fn copy_from(&mut self, other: &State) {
        self.head.copy_from(&other.head);
        self.body.copy_from(&other.body);
    }

    pub fn n_stacks(&self) -> usize {
        self.body.n_stacks()
    }

    pub fn n_tiers(&self) -> usize {
        self.body.n_tiers()
    }

    pub fn is_retrievable(&self) -> bool {
        self.head.is_retrievable(&self.body)
    }

    pub fn has_empty_stack(&self) -> bool {
        self.head.has_empty_stack()
    }

    pub fn move_out(&mut self, s: usize, time: u32) {
        self.head.move_out(&self.body, s, time);
    }

    pub fn move_in(&mut self, d: usize, p: u32, time: u32) {
        self.head.move_in(&mut self.body, d, p, time);
    }

    pub fn relocate(&mut self, s: usize, d: usize, time: u32) {
        self.head.relocate(&mut self.body, s, d, time);
    }

    pub fn retrieve(&mut self, time: u32) {
        self.head.retrieve(&self.body, time);
    }
}

#[cfg(test)]
mod tests;
