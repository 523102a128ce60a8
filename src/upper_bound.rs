//! Constructive upper-bound heuristics.
//!
//! Both heuristics drive a bay to full retrieval and return the plan length,
//! or `None` when they cannot stay within `max_len` moves. Both walk the
//! ordered stack list: `jzw` is rule-based (leftmost fitting destination,
//! pre-substitution of a better-filling source, a roving scan for a clean
//! intermediate stack when every landing goes bad), `sm2` picks the
//! source/destination pair minimizing the quality gap and falls back to a
//! three-move detour. Both are deterministic.

use crate::state::{Body, Head, State};
use crate::types::Move;

/// True iff the badly-placed run on top of `s` fits into the free slots of
/// the other stacks.
fn fits_outside(head: &Head, body: &Body, s: usize) -> bool {
    let free = (body.n_stacks() - 1) * body.n_tiers() + head.h[s];
    head.top_badness(body, s) as usize + head.n_blocks <= free
}

/// Shared per-iteration survey: the retrieval target's quality, the leftmost
/// workable source rank, and the rightmost stack with room.
struct Scan {
    q_min: u32,
    i_next: usize,
    i_max: usize,
    q_max: u32,
    has_multi_q_max: bool,
}

fn scan(head: &Head, body: &Body) -> Option<Scan> {
    let n_stacks = body.n_stacks();
    let n_tiers = body.n_tiers();

    let q_min = head.top_quality(body, head.list[0]);
    let mut i_next = None;
    for i in 0..n_stacks {
        let s = head.list[i];
        if head.top_quality(body, s) > q_min {
            break;
        }
        if fits_outside(head, body, s) {
            i_next = Some(i);
            break;
        }
    }
    let i_next = i_next?;

    let mut i_max = i_next;
    let mut q_max = 0;
    for i in (0..n_stacks).rev() {
        let s = head.list[i];
        if i != i_next && head.h[s] < n_tiers {
            i_max = i;
            q_max = head.top_quality(body, s);
            break;
        }
    }
    debug_assert_ne!(i_max, i_next, "no destination stack has room");

    let mut has_multi_q_max = false;
    if q_min < q_max {
        for i in (0..i_max).rev() {
            let s = head.list[i];
            if head.top_quality(body, s) < q_max {
                break;
            }
            if head.h[s] < n_tiers {
                has_multi_q_max = true;
                break;
            }
        }
    }

    Some(Scan {
        q_min,
        i_next,
        i_max,
        q_max,
        has_multi_q_max,
    })
}

/// Among stacks ranked left of `dst`, the one with the largest badly-placed
/// top in `[p(src), q(dst)]`: relocating it instead fills the landing slot
/// with the tightest block that must move anyway.
fn presubstitute(head: &Head, body: &Body, src: usize, dst: usize) -> Option<usize> {
    let p_src = head.top_priority(body, src);
    let q_dst = head.top_quality(body, dst);
    let mut s_pre: Option<usize> = None;
    for i in 0..head.rank[dst] {
        let s = head.list[i];
        if s != src
            && head.top_badness(body, s) > 0
            && p_src <= head.top_priority(body, s)
            && head.top_priority(body, s) <= q_dst
            && s_pre.map_or(true, |sp| {
                head.top_priority(body, sp) < head.top_priority(body, s)
            })
        {
            s_pre = Some(s);
        }
    }
    s_pre
}

fn record(path: &mut Option<&mut [Move]>, len: usize, mv: Move) {
    if let Some(buf) = path.as_deref_mut() {
        buf[len] = mv;
    }
}

/// Rule-based constructive heuristic.
pub fn jzw(
    state: &mut State,
    mut path: Option<&mut [Move]>,
    mut len: usize,
    max_len: usize,
) -> Option<usize> {
    let State { head, body } = state;
    if len + head.n_bad > max_len {
        return None;
    }
    let n_stacks = body.n_stacks();
    let n_tiers = body.n_tiers();

    while head.n_bad > 0 {
        while head.is_retrievable(body) {
            head.retrieve(body, len as u32);
        }

        let Scan {
            q_min,
            i_next,
            i_max,
            q_max,
            has_multi_q_max,
        } = scan(head, body)?;

        let mut src = head.list[i_next];
        let dst;

        if head.top_priority(body, src) <= q_max {
            // a landing exists that keeps the block well placed
            let p_src = head.top_priority(body, src);
            let mut i = i_next + 1;
            let d = loop {
                debug_assert!(i < n_stacks);
                let s = head.list[i];
                if head.h[s] < n_tiers && p_src <= head.top_quality(body, s) {
                    break s;
                }
                i += 1;
            };
            dst = d;

            if head.h[dst] < n_tiers - 1 {
                if let Some(s_pre) = presubstitute(head, body, src, dst) {
                    src = s_pre;
                }
            }
        } else {
            // every landing creates a new badly-placed block
            if len + head.n_bad == max_len {
                return None;
            }

            let p_src = head.top_priority(body, src);
            let mut i_opt: Option<usize> = None;
            let mut dir: isize = 1;
            let mut i = i_max as isize;
            loop {
                if i == n_stacks as isize
                    || (i > i_max as isize
                        && head.top_quality(body, head.list[i as usize]) > q_max)
                {
                    dir = -1;
                    i = i_max as isize - 1;
                }
                debug_assert!(i >= 0 && (i as usize) < n_stacks);
                let s = head.list[i as usize];
                if head.top_quality(body, s) == q_min {
                    break;
                }
                if head.top_badness(body, s) == 0
                    && p_src <= body.quality(s, head.h[s] - 1)
                    && (i != i_max as isize || has_multi_q_max)
                {
                    i_opt = Some(i as usize);
                    break;
                }
                i += dir;
            }

            if let Some(i_opt) = i_opt {
                // park the clean top of the intermediate stack first
                src = head.list[i_opt];
                let p_src = head.top_priority(body, src);
                let mut dir: isize = -1;
                let mut i = i_opt as isize - 1;
                let d = loop {
                    if i < i_opt as isize
                        && head.top_quality(body, head.list[i as usize]) < p_src
                    {
                        dir = 1;
                        i = i_opt as isize + 1;
                    }
                    debug_assert!(i >= 0 && (i as usize) < n_stacks);
                    let s = head.list[i as usize];
                    if head.h[s] < n_tiers {
                        break s;
                    }
                    i += dir;
                };
                dst = d;

                if head.h[dst] < n_tiers - 1 {
                    if let Some(s_pre) = presubstitute(head, body, src, dst) {
                        src = s_pre;
                    }
                }
            } else {
                // dump on the best-quality stack with room
                let mut d = head.list[i_max];
                if head.h[d] == n_tiers - 1 {
                    let run = head.top_badness(body, src) as usize;
                    let p_top = head.top_priority(body, src);
                    let mut smallest = true;
                    for k in 1..run {
                        if body.pri(src, head.h[src] - k) < p_top {
                            smallest = false;
                            break;
                        }
                    }
                    if !smallest {
                        for i in (0..i_max).rev() {
                            let s = head.list[i];
                            if s != src && head.h[s] < n_tiers {
                                d = s;
                                break;
                            }
                        }
                    }
                }
                dst = d;
            }
        }

        let mv = Move {
            pri: head.top_priority(body, src),
            src,
            dst,
        };
        record(&mut path, len, mv);
        len += 1;
        head.relocate(body, src, dst, len as u32);
    }

    Some(len)
}

/// Gap-minimizing constructive heuristic.
pub fn sm2(
    state: &mut State,
    mut path: Option<&mut [Move]>,
    mut len: usize,
    max_len: usize,
) -> Option<usize> {
    let State { head, body } = state;
    if len + head.n_bad > max_len {
        return None;
    }
    let n_stacks = body.n_stacks();
    let n_tiers = body.n_tiers();

    while head.n_bad > 0 {
        while head.is_retrievable(body) {
            head.retrieve(body, len as u32);
        }

        let Scan {
            q_min,
            i_next,
            i_max,
            q_max,
            has_multi_q_max,
        } = scan(head, body)?;

        let mut pick: Option<(usize, usize)> = None;
        let mut best_diff = i64::MAX;

        if q_min < q_max {
            // tightest landing among badly-placed tops
            for i in 0..i_max {
                let from = head.list[i];
                if head.h[from] == 0 {
                    break;
                }
                if head.top_badness(body, from) > 0 && head.top_priority(body, from) <= q_max {
                    let p_from = head.top_priority(body, from) as i64;
                    let mut j = i + 1;
                    loop {
                        debug_assert!(j < n_stacks);
                        let to = head.list[j];
                        let diff = head.top_quality(body, to) as i64 - p_from;
                        if diff >= best_diff {
                            break;
                        }
                        if head.h[to] < n_tiers && diff >= 0 {
                            pick = Some((from, to));
                            best_diff = diff;
                            break;
                        }
                        j += 1;
                    }
                }
            }
        }

        if best_diff == i64::MAX {
            if len + head.n_bad == max_len {
                return None;
            }

            if q_min < q_max {
                // three-move detour: clear a clean top, slide the largest
                // fitting bad block underneath it
                for i in 0..n_stacks {
                    let from = head.list[i];
                    if head.top_quality(body, from) > q_max {
                        break;
                    }
                    if head.top_badness(body, from) != 0 || (i == i_max && !has_multi_q_max) {
                        continue;
                    }
                    debug_assert!(head.h[from] > 0);
                    let under = body.quality(from, head.h[from] - 1);
                    let p_from = head.top_priority(body, from);

                    let mut s_bad: Option<usize> = None;
                    let mut s_bad_alt: Option<usize> = None;
                    for j in 0..n_stacks {
                        let s = head.list[j];
                        if head.top_quality(body, s) >= under {
                            break;
                        }
                        let diff = under as i64 - head.top_priority(body, s) as i64;
                        if head.top_badness(body, s) > 0 && diff >= 0 && diff < best_diff {
                            if s_bad.map_or(true, |sb| {
                                head.top_priority(body, sb) < head.top_priority(body, s)
                            }) {
                                s_bad_alt = s_bad;
                                s_bad = Some(s);
                            } else if s_bad_alt.map_or(true, |sa| {
                                head.top_priority(body, sa) < head.top_priority(body, s)
                            }) {
                                s_bad_alt = Some(s);
                            }
                        }
                    }
                    let Some(s_bad) = s_bad else {
                        continue;
                    };
                    let p_bad = head.top_priority(body, s_bad) as i64;

                    let mut to: Option<usize> = None;
                    {
                        let mut dir: isize = -1;
                        debug_assert!(i >= 1);
                        let mut j = i as isize - 1;
                        loop {
                            if dir == -1
                                && head.top_quality(body, head.list[j as usize]) < p_from
                            {
                                dir = 1;
                                j = i as isize + 1;
                            }
                            debug_assert!(j >= 0 && (j as usize) < n_stacks);
                            let s = head.list[j as usize];
                            let diff = under as i64 - p_bad + head.top_quality(body, s) as i64
                                - p_from as i64;
                            if diff >= best_diff {
                                break;
                            }
                            if head.h[s] < n_tiers {
                                to = Some(s);
                                break;
                            }
                            j += dir;
                        }
                    }
                    let Some(to) = to else {
                        continue;
                    };

                    if s_bad != to {
                        let diff = under as i64 - p_bad + head.top_quality(body, to) as i64
                            - p_from as i64;
                        if diff < best_diff {
                            pick = Some((from, to));
                            best_diff = diff;
                        }
                    } else {
                        if let Some(sa) = s_bad_alt {
                            let diff = under as i64 - head.top_priority(body, sa) as i64
                                + head.top_quality(body, to) as i64
                                - p_from as i64;
                            if diff < best_diff {
                                pick = Some((from, to));
                                best_diff = diff;
                            }
                        }
                        // otherwise aim past the stack the bad block sits on
                        let mut dir: isize = if head.rank[to] < i { -1 } else { 1 };
                        let mut j = head.rank[to] as isize + dir;
                        while j >= 0 && j <= i_max as isize {
                            if dir == -1
                                && head.top_quality(body, head.list[j as usize]) < p_from
                            {
                                dir = 1;
                                j = i as isize + 1;
                                continue;
                            }
                            let s = head.list[j as usize];
                            let diff = under as i64 - p_bad + head.top_quality(body, s) as i64
                                - p_from as i64;
                            if diff >= best_diff {
                                break;
                            }
                            if head.h[s] < n_tiers {
                                pick = Some((from, s));
                                best_diff = diff;
                                break;
                            }
                            j += dir;
                        }
                    }
                }
            }

        }

        let (src, dst) = match pick {
            Some(pair) => pair,
            None => (head.list[i_next], head.list[i_max]),
        };

        let mv = Move {
            pri: head.top_priority(body, src),
            src,
            dst,
        };
        record(&mut path, len, mv);
        len += 1;
        head.relocate(body, src, dst, len as u32);
    }

    Some(len)
}
