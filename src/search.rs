//! Iterative-deepening depth-first branch-and-bound.
//!
//! The driver deepens on the lower bound: starting from the root bound it
//! repeatedly runs a depth-first search that only keeps branches which could
//! still realize a plan of length `best_lb`, and raises `best_lb` when the
//! search exhausts. Probing runs both constructive heuristics at promising
//! interior nodes to pull `best_ub` down; the solve ends when the bounds
//! meet or the clock runs out.
//!
//! Branch generation shares one body per depth level among all sibling
//! branches: the body is copied once per node, a staged head absorbs the
//! move-out once per source, and each surviving branch owns just a head.
//! The destination's top slot is re-materialized in the shared body when a
//! branch is finally descended into, since later siblings may have clobbered
//! it.

use std::time::Duration;

use crate::instance::Instance;
use crate::lower_bound::lb_ts;
use crate::report::Report;
use crate::state::{Body, Head, State};
use crate::timer::SearchClock;
use crate::types::{Change, Move};
use crate::upper_bound::{jzw, sm2};

/// Nodes between cooperative clock polls.
const TIMER_CYCLE: u64 = 1_000_000;

struct Hist {
    lb: usize,
    head: Head,
}

struct Branch {
    pri: u32,
    src: usize,
    dst: usize,
    q_src: u32,
    q_dst: u32,
    child_lb: usize,
    head: Head,
}

/// The block on top of the source arrived by the relocation at time `k` out
/// of stack `sk`, and `sk` is untouched since: the two relocations can be
/// merged into one performed later.
fn merge_source_later(head: &Head, sk: usize, k: u32) -> bool {
    head.last_change_time[sk] == k && head.last_change[sk] == Change::MoveOut
}

/// The destination's last change moved out a block of the same priority at
/// time `k`: either that relocation could have gone straight to where this
/// one lands (merge, performed earlier), or the pair collapses into one
/// relocation performed later.
fn merge_same_priority(head: &Head, path: &[Move], sn: usize, dn: usize, pn: u32) -> bool {
    if head.last_change[dn] != Change::MoveOut {
        return false;
    }
    let k = head.last_change_time[dn];
    let mk = path[k as usize - 1];
    mk.pri == pn && (head.last_change_time[sn] < k || head.last_change_time[mk.dst] == k)
}

/// The block retrieved now was parked by the relocation at time `k` onto a
/// stack that took nothing since and whose top already carried the same
/// quality beforehand: that relocation was wasted.
fn wasted_parking(child: &Head, prev: &Head, prev_body: &Body, sk: usize, k: u32, p: u32) -> bool {
    child.last_move_out_time[sk] == k
        && child.last_move_in_time[sk] < k
        && prev_body.quality(sk, prev.h[sk]) == p
}

/// Some stack left of the retrieval stack was untouched since time `k` and
/// could have parked the block at least as well: the relocation at `k`
/// should have gone there instead.
fn cheaper_parking(
    child: &Head,
    prev: &Head,
    prev_body: &Body,
    n_tiers: usize,
    s_min: usize,
    k: u32,
    p: u32,
) -> bool {
    (0..s_min).any(|d| {
        prev.h[d] < n_tiers
            && child.last_move_out_time[d] < k
            && child.last_move_in_time[d] < k
            && prev_body.quality(d, prev.h[d]) >= p
    })
}

/// Solve `inst` to optimality within `budget`. Returns `None` when the bay
/// admits no retrieval plan at all, the zero report when retrievals alone
/// empty it, and otherwise the best bounds and plan reached.
pub fn solve(inst: &Instance, budget: Duration) -> Option<Report> {
    Solver::new(inst).solve(budget)
}

/// Exact branch-and-bound solver. Owns every working buffer the search
/// touches; no global state.
pub struct Solver {
    n_stacks: usize,
    n_tiers: usize,
    max_prio: u32,

    root: State,
    probe: State,

    // bodies[level] backs every branch head at that level; hist holds the
    // head chosen on the current path
    bodies: Vec<Body>,
    hist: Vec<Hist>,
    temp_head: Head,
    pool: Vec<Branch>,
    path: Vec<Move>,
    best_sol: Vec<Move>,

    // per-stack dominance aides and lower-bound scratch
    lb_heights: Vec<usize>,
    min_last_change_left: Vec<u32>,
    max_last_move_out_right: Vec<u32>,
    max_group_src_temp: Vec<u32>,
    max_group_src_right: Vec<u32>,
    max_group_dst_right: Vec<u32>,

    best_lb: usize,
    best_ub: usize,
    n_nodes: u64,
    n_probe: u64,
    n_timer: u64,
    clock: SearchClock,
    time_to_best_lb: f64,
    time_to_best_ub: f64,
}

impl Solver {
    pub fn new(inst: &Instance) -> Solver {
        let n_stacks = inst.n_stacks();
        let root = State::from_instance(inst);
        let probe = root.clone();
        Solver {
            n_stacks,
            n_tiers: inst.n_tiers(),
            max_prio: inst.max_prio(),
            root,
            probe,
            bodies: Vec::new(),
            hist: Vec::new(),
            temp_head: Head::new(n_stacks),
            pool: Vec::new(),
            path: Vec::new(),
            best_sol: Vec::new(),
            lb_heights: vec![0; n_stacks],
            min_last_change_left: vec![0; n_stacks],
            max_last_move_out_right: vec![0; n_stacks],
            max_group_src_temp: vec![0; inst.max_prio() as usize + 1],
            max_group_src_right: vec![0; n_stacks],
            max_group_dst_right: vec![0; n_stacks],
            best_lb: 0,
            best_ub: 0,
            n_nodes: 0,
            n_probe: 0,
            n_timer: 0,
            clock: SearchClock::start(Duration::ZERO),
            time_to_best_lb: 0.0,
            time_to_best_ub: 0.0,
        }
    }

    /// Run the deepening loop. Consumes the solver; every buffer dies with
    /// it.
    pub fn solve(mut self, budget: Duration) -> Option<Report> {
        self.clock = SearchClock::start(budget);

        while self.root.is_retrievable() {
            self.root.retrieve(0);
        }
        if self.root.head.n_blocks == 0 {
            return Some(Report::solved());
        }

        // feasibility check and depth cap from both heuristics
        self.probe.copy_from(&self.root);
        let len_jzw = jzw(&mut self.probe, None, 0, usize::MAX);
        self.probe.copy_from(&self.root);
        let len_sm2 = sm2(&mut self.probe, None, 0, usize::MAX);
        let (len_jzw, len_sm2) = match (len_jzw, len_sm2) {
            (None, None) => return None,
            (a, b) => (a.unwrap_or(usize::MAX), b.unwrap_or(usize::MAX)),
        };
        let max_depth = len_jzw.min(len_sm2);

        let n_stacks = self.n_stacks;
        self.path = vec![Move::default(); max_depth];
        self.best_sol = vec![Move::default(); max_depth];
        self.bodies = Vec::with_capacity(max_depth + 1);
        self.bodies.push(self.root.body.clone());
        for _ in 0..max_depth {
            self.bodies.push(Body::new(n_stacks, self.n_tiers));
        }
        self.hist = (0..=max_depth)
            .map(|_| Hist {
                lb: 0,
                head: Head::new(n_stacks),
            })
            .collect();
        self.hist[0].head.copy_from(&self.root.head);
        self.pool = (0..max_depth * n_stacks * (n_stacks - 1))
            .map(|_| Branch {
                pri: 0,
                src: 0,
                dst: 0,
                q_src: 0,
                q_dst: 0,
                child_lb: 0,
                head: Head::new(n_stacks),
            })
            .collect();

        let root_lb = lb_ts(
            &self.hist[0].head,
            &self.bodies[0],
            usize::MAX,
            &mut self.lb_heights,
        );
        self.best_lb = root_lb;
        self.time_to_best_lb = 0.0;
        self.hist[0].lb = root_lb;

        self.probe.copy_from(&self.root);
        let rerun = if len_jzw < len_sm2 {
            jzw(&mut self.probe, Some(&mut self.best_sol), 0, usize::MAX)
        } else {
            sm2(&mut self.probe, Some(&mut self.best_sol), 0, usize::MAX)
        };
        let Some(init_ub) = rerun else {
            unreachable!("deterministic heuristic rerun diverged");
        };
        debug_assert_eq!(init_ub, max_depth);
        self.best_ub = init_ub;
        self.time_to_best_ub = 0.0;

        self.n_nodes = 0;
        self.n_probe = 0;
        self.n_timer = 0;

        self.trace("start");
        while self.best_lb < self.best_ub {
            if self.search(0, 0) {
                break;
            }
            self.best_lb += 1;
            self.time_to_best_lb = self.clock.elapsed();
            self.trace("deepen");
        }
        self.trace("end");

        Some(Report {
            root_lb,
            init_ub: max_depth,
            best_lb: self.best_lb,
            best_ub: self.best_ub,
            solution: self.best_sol[..self.best_ub].to_vec(),
            time_to_best_lb: self.time_to_best_lb,
            time_to_best_ub: self.time_to_best_ub,
            total_time: self.clock.elapsed(),
            n_nodes: self.n_nodes,
            n_probe: self.n_probe,
        })
    }

    fn trace(&self, tag: &str) {
        println!(
            "[{tag}] best_lb = {} @ {:.3} / best_ub = {} @ {:.3} / time = {:.3} / nodes = {} / probe = {}",
            self.best_lb,
            self.time_to_best_lb,
            self.best_ub,
            self.time_to_best_ub,
            self.clock.elapsed(),
            self.n_nodes,
            self.n_probe
        );
        #[cfg(feature = "logging")]
        log::debug!(
            "{tag}: best_lb {} best_ub {} nodes {} probes {}",
            self.best_lb,
            self.best_ub,
            self.n_nodes,
            self.n_probe
        );
    }

    /// One node of the depth-first search. Branches for this node live in
    /// `pool[base..]`; recursion passes `base + size` down so a child never
    /// touches a sibling's or ancestor's slots. Returns true to unwind the
    /// whole search (goal reached or clock expired).
    fn search(&mut self, level: usize, base: usize) -> bool {
        self.n_nodes += 1;

        self.n_timer += 1;
        if self.n_timer == TIMER_CYCLE {
            self.n_timer = 0;
            if self.clock.expired() {
                return true;
            }
            self.trace("running");
        }

        let n_stacks = self.n_stacks;
        let n_tiers = self.n_tiers;
        let curr_lb = self.hist[level].lb;
        let curr_n_bad = self.hist[level].head.n_bad;

        // earliest last-change among stacks with room, scanned from the left
        let mut running_min = u32::MAX;
        for s in 0..n_stacks {
            self.min_last_change_left[s] = running_min;
            if self.hist[level].head.h[s] < n_tiers
                && running_min > self.hist[level].head.last_change_time[s]
            {
                running_min = self.hist[level].head.last_change_time[s];
            }
        }

        // latest move-out strictly to the right, per stack
        let mut running_max = 0;
        for s in (0..n_stacks).rev() {
            self.max_last_move_out_right[s] = running_max;
            if running_max < self.hist[level].head.last_move_out_time[s] {
                running_max = self.hist[level].head.last_move_out_time[s];
            }
        }

        // latest pending same-priority move-out to the right, per stack,
        // bucketed by priority
        let min_prio = {
            let head = &self.hist[level].head;
            self.bodies[level].quality(head.list[0], head.h[head.list[0]])
        };
        for p in (min_prio + 1)..=self.max_prio {
            self.max_group_src_temp[p as usize] = 0;
        }
        for s in (0..n_stacks).rev() {
            let head = &self.hist[level].head;
            self.max_group_src_right[s] = if head.h[s] == 0 {
                0
            } else {
                self.max_group_src_temp[self.bodies[level].pri(s, head.h[s]) as usize]
            };
            if head.last_change[s] == Change::MoveOut {
                let k = head.last_change_time[s];
                let pk = self.path[k as usize - 1].pri;
                if pk > min_prio && self.max_group_src_temp[pk as usize] < k {
                    self.max_group_src_temp[pk as usize] = k;
                }
            }
        }

        // the two rightmost stacks with room, for the quick bound screen
        let mut s_max = None;
        let mut s_sec = None;
        for i in (0..n_stacks).rev() {
            let s = self.hist[level].head.list[i];
            if self.hist[level].head.h[s] < n_tiers {
                if s_max.is_none() {
                    s_max = Some(s);
                } else {
                    s_sec = Some(s);
                    break;
                }
            }
        }
        let Some(s_max) = s_max else {
            return false;
        };

        let mut size = 0usize;
        let mut first_sn = true;

        for sn in 0..n_stacks {
            if self.hist[level].head.h[sn] == 0
                || self.hist[level].head.n_blocks - self.hist[level].head.h[sn]
                    == (n_stacks - 1) * n_tiers
            {
                continue;
            }

            let h_sn = self.hist[level].head.h[sn];
            let pn = self.bodies[level].pri(sn, h_sn);
            let q_sn = self.bodies[level].quality(sn, h_sn);
            let lv = self.bodies[level].placed_at(sn, h_sn);

            // would this block necessarily land badly, wherever it goes?
            let q_s_max = self.bodies[level].quality(s_max, self.hist[level].head.h[s_max]);
            let to_be_bad = pn > q_s_max
                || (sn == s_max
                    && s_sec.map_or(false, |s2| {
                        pn > self.bodies[level].quality(s2, self.hist[level].head.h[s2])
                    }));
            let src_frees = (pn > q_sn) as usize;
            let relief = (curr_lb > curr_n_bad && (pn <= q_sn || to_be_bad)) as usize;
            if level + 1 + curr_lb + to_be_bad as usize > self.best_lb + src_frees + relief {
                continue;
            }

            if lv > 0 {
                let sk = self.path[lv as usize - 1].src;
                if merge_source_later(&self.hist[level].head, sk, lv) {
                    continue;
                }
            }

            if self.min_last_change_left[sn] < lv {
                // an earlier-touched stack with room to the left would have
                // served as the transitive stack instead
                continue;
            }

            if self.hist[level].head.last_change_time[sn] < self.max_group_src_right[sn] {
                // sources of two same-priority relocations are swappable
                continue;
            }

            // latest pending same-priority move-in to the right, per
            // destination
            let mut running = 0;
            for d in (0..n_stacks).rev() {
                self.max_group_dst_right[d] = running;
                let head = &self.hist[level].head;
                if head.last_change[d] == Change::MoveIn {
                    let k = head.last_change_time[d];
                    let pk = self.path[k as usize - 1].pri;
                    if pk == pn && running < k {
                        running = k;
                    }
                }
            }

            let mut first_dn = true;
            let mut first_empty = true;
            for dn in 0..n_stacks {
                if dn == sn || self.hist[level].head.h[dn] == n_tiers {
                    continue;
                }

                self.path[level] = Move {
                    pri: pn,
                    src: sn,
                    dst: dn,
                };

                let q_dn = self.bodies[level].quality(dn, self.hist[level].head.h[dn]);
                let dst_blocks = (pn > q_dn) as usize;

                // one relocation from a clean bay: the rest is free
                // retrievals, so the plan length is level + 1
                if curr_n_bad + dst_blocks == src_frees {
                    self.best_ub = level + 1;
                    self.best_sol[..=level].copy_from_slice(&self.path[..=level]);
                    self.time_to_best_ub = self.clock.elapsed();
                    self.trace("goal");
                    return true;
                }

                if self.hist[level].head.h[dn] == 0 {
                    if first_empty {
                        first_empty = false;
                    } else {
                        // empty destinations are interchangeable
                        continue;
                    }
                }

                if self.hist[level].head.last_change_time[dn] < lv {
                    // merge with the relocation that produced this block and
                    // perform the pair earlier
                    continue;
                }

                if self.hist[level].head.last_change_time[sn] < self.max_last_move_out_right[sn]
                    && self.hist[level].head.last_change_time[dn]
                        < self.max_last_move_out_right[sn]
                {
                    // independent of every later move-out to the right:
                    // reorder this relocation before them
                    continue;
                }

                if merge_same_priority(&self.hist[level].head, &self.path, sn, dn, pn) {
                    continue;
                }

                if self.hist[level].head.last_change_time[dn] < self.max_group_dst_right[dn] {
                    // destinations of two same-priority relocations are
                    // swappable
                    continue;
                }

                let relief_dn = (curr_lb > curr_n_bad && (pn <= q_sn || pn > q_dn)) as usize;
                if level + 1 + curr_lb + dst_blocks > self.best_lb + src_frees + relief_dn {
                    continue;
                }

                // materialize the child: one body copy per node, one staged
                // move-out per source, one owned head per branch
                if first_sn {
                    first_sn = false;
                    let (lo, hi) = self.bodies.split_at_mut(level + 1);
                    hi[0].copy_from(&lo[level]);
                }
                if first_dn {
                    first_dn = false;
                    self.temp_head.copy_from(&self.hist[level].head);
                    self.temp_head
                        .move_out(&self.bodies[level + 1], sn, (level + 1) as u32);
                }
                let slot = base + size;
                self.pool[slot].head.copy_from(&self.temp_head);
                self.pool[slot]
                    .head
                    .move_in(&mut self.bodies[level + 1], dn, pn, (level + 1) as u32);

                // retrieval closure; two parking dominances can void the
                // whole branch
                let mut dominated = false;
                while self.pool[slot].head.is_retrievable(&self.bodies[level + 1]) {
                    let s_min = self.pool[slot].head.list[0];
                    let h_top = self.pool[slot].head.h[s_min];
                    let p = self.bodies[level + 1].pri(s_min, h_top);
                    let placed = self.bodies[level + 1].placed_at(s_min, h_top);
                    if placed > 0 {
                        let sk = self.path[placed as usize - 1].src;
                        let prev = &self.hist[placed as usize - 1].head;
                        let prev_body = &self.bodies[placed as usize - 1];
                        if wasted_parking(&self.pool[slot].head, prev, prev_body, sk, placed, p)
                            || cheaper_parking(
                                &self.pool[slot].head,
                                prev,
                                prev_body,
                                n_tiers,
                                s_min,
                                placed,
                                p,
                            )
                        {
                            dominated = true;
                            break;
                        }
                    }
                    self.pool[slot]
                        .head
                        .retrieve(&self.bodies[level + 1], (level + 1) as u32);
                }
                if dominated {
                    continue;
                }

                let cap = self.best_lb.saturating_sub(level + self.pool[slot].head.n_bad);
                let child_lb = lb_ts(
                    &self.pool[slot].head,
                    &self.bodies[level + 1],
                    cap,
                    &mut self.lb_heights,
                );

                if level + 1 + child_lb > self.best_lb {
                    continue;
                }

                // one level short of the target length: probe both
                // heuristics for a matching plan
                if level + 2 + child_lb == self.best_lb {
                    self.n_probe += 1;

                    self.probe.head.copy_from(&self.pool[slot].head);
                    self.probe.body.copy_from(&self.bodies[level + 1]);
                    if let Some(n) = jzw(
                        &mut self.probe,
                        Some(&mut self.path),
                        level + 1,
                        self.best_ub - 1,
                    ) {
                        self.best_ub = n;
                        self.best_sol[..n].copy_from_slice(&self.path[..n]);
                        self.time_to_best_ub = self.clock.elapsed();
                        self.trace("update");
                        if self.best_lb == self.best_ub {
                            return true;
                        }
                    }

                    self.probe.head.copy_from(&self.pool[slot].head);
                    self.probe.body.copy_from(&self.bodies[level + 1]);
                    if let Some(n) = sm2(
                        &mut self.probe,
                        Some(&mut self.path),
                        level + 1,
                        self.best_ub - 1,
                    ) {
                        self.best_ub = n;
                        self.best_sol[..n].copy_from_slice(&self.path[..n]);
                        self.time_to_best_ub = self.clock.elapsed();
                        self.trace("update");
                        if self.best_lb == self.best_ub {
                            return true;
                        }
                    }
                }

                let branch = &mut self.pool[slot];
                branch.pri = pn;
                branch.src = sn;
                branch.dst = dn;
                branch.q_src = q_sn;
                branch.q_dst = q_dn;
                branch.child_lb = child_lb;
                size += 1;
            }
        }

        if size > 0 {
            self.pool[base..base + size].sort_unstable_by(|a, b| {
                a.child_lb
                    .cmp(&b.child_lb)
                    .then(b.q_dst.cmp(&a.q_dst))
                    .then(a.q_src.cmp(&b.q_src))
            });

            for i in 0..size {
                let (pri, src, dst, child_lb) = {
                    let br = &self.pool[base + i];
                    (br.pri, br.src, br.dst, br.child_lb)
                };
                self.path[level] = Move { pri, src, dst };
                self.hist[level + 1].lb = child_lb;
                self.hist[level + 1].head.copy_from(&self.pool[base + i].head);

                // a later sibling may have overwritten the landing slot in
                // the shared body; rebuild it if the block is still there
                if self.hist[level + 1].head.h[dst] == self.hist[level].head.h[dst] + 1 {
                    let top = self.hist[level + 1].head.h[dst];
                    self.bodies[level + 1].update_slot(dst, top, pri, (level + 1) as u32);
                }

                if self.search(level + 1, base + size) {
                    return true;
                }
            }
        }

        false
    }
}
