//! Unit tests for the bay representation.


use crate::instance::Instance;
use crate::state::State;

/// Recompute every derived quantity from scratch and compare against the
/// incrementally maintained fields.
pub(crate) fn assert_invariants(state: &State) {
    let head = &state.head;
    let body = &state.body;
    let mut blocks = 0;
    let mut bad = 0;
    for s in 0..state.n_stacks() {
        assert!(head.h[s] <= state.n_tiers());
        blocks += head.h[s];
        for t in 1..=head.h[s] {
            let below = body.quality(s, t - 1);
            assert_eq!(body.quality(s, t), below.min(body.pri(s, t)));
            if body.pri(s, t) <= below {
                assert_eq!(body.badness(s, t), 0);
            } else {
                assert_eq!(body.badness(s, t), body.badness(s, t - 1) + 1);
            }
            if body.badness(s, t) > 0 {
                bad += 1;
            }
        }
    }
    assert_eq!(head.n_blocks, blocks);
    assert_eq!(head.n_bad, bad);
    for i in 0..state.n_stacks() {
        assert_eq!(head.rank[head.list[i]], i);
        if i > 0 {
            let a = head.list[i - 1];
            let b = head.list[i];
            let key_a = (head.top_quality(body, a), head.top_badness(body, a));
            let key_b = (head.top_quality(body, b), head.top_badness(body, b));
            assert!(key_a <= key_b, "list out of order at {i}");
        }
    }
}

fn bay(n_stacks: usize, n_tiers: usize, stacks: &[&[u32]]) -> State {
    let stacks = stacks.iter().map(|s| s.to_vec()).collect();
    State::from_instance(&Instance::new(n_stacks, n_tiers, stacks).unwrap())
}

#[test]
fn init_computes_quality_and_badness() {
    let state = bay(3, 3, &[&[3, 1, 2], &[], &[]]);
    assert_eq!(state.head.n_blocks, 3);
    assert_eq!(state.head.n_bad, 1);
    assert_eq!(state.body.quality(0, 1), 3);
    assert_eq!(state.body.quality(0, 2), 1);
    assert_eq!(state.body.quality(0, 3), 1);
    assert_eq!(state.body.badness(0, 3), 1);
    // ground sentinel
    assert_eq!(state.body.pri(0, 0), 4);
    assert_eq!(state.body.pri(1, 0), 4);
    assert_invariants(&state);
}

#[test]
fn badness_runs_accumulate() {
    let state = bay(2, 4, &[&[1, 4, 3, 2], &[]]);
    assert_eq!(state.body.badness(0, 2), 1);
    assert_eq!(state.body.badness(0, 3), 2);
    assert_eq!(state.body.badness(0, 4), 3);
    assert_eq!(state.head.n_bad, 3);
    assert_invariants(&state);
}

#[test]
fn good_block_can_rest_on_bad_run() {
    // 4 is badly placed over 2, but 1 on top of it starts a fresh run
    let state = bay(2, 3, &[&[2, 4, 1], &[]]);
    assert_eq!(state.body.badness(0, 2), 1);
    assert_eq!(state.body.badness(0, 3), 0);
    assert_eq!(state.head.n_bad, 1);
    assert_invariants(&state);
}

#[test]
fn list_orders_by_quality_then_badness() {
    let state = bay(3, 3, &[&[5, 6], &[2, 7], &[2]]);
    // qualities: 5, 2, 2; stack 2 has a clean top, stack 1 a bad one
    assert_eq!(state.head.list, vec![2, 1, 0]);
    assert_invariants(&state);
}

#[test]
fn empty_stacks_sort_last() {
    let state = bay(3, 3, &[&[], &[3], &[]]);
    assert_eq!(state.head.list[0], 1);
    assert_invariants(&state);
}

#[test]
fn retrievable_only_when_top_is_global_min() {
    let mut state = bay(3, 3, &[&[2, 1], &[3], &[]]);
    assert!(state.is_retrievable());
    state.retrieve(0);
    assert_eq!(state.head.n_blocks, 2);
    // next target is 2, sitting below nothing
    assert!(state.is_retrievable());
    state.retrieve(0);
    assert!(state.is_retrievable());
    state.retrieve(0);
    assert_eq!(state.head.n_blocks, 0);
    assert!(!state.is_retrievable());
}

#[test]
fn buried_target_is_not_retrievable() {
    let state = bay(3, 3, &[&[1, 3], &[2], &[]]);
    assert!(!state.is_retrievable());
}

#[test]
fn relocate_updates_counts_and_order() {
    let mut state = bay(3, 3, &[&[1, 3], &[2], &[]]);
    assert_eq!(state.head.n_bad, 1);
    state.relocate(0, 2, 1);
    assert_eq!(state.head.n_bad, 0);
    assert!(state.is_retrievable());
    assert_eq!(state.head.last_move_out_time[0], 1);
    assert_eq!(state.head.last_move_in_time[2], 1);
    assert_invariants(&state);
}

#[test]
fn move_out_then_back_restores_bay() {
    let mut state = bay(3, 3, &[&[1, 3], &[2, 4], &[]]);
    let reference = state.clone();
    state.relocate(0, 2, 1);
    state.relocate(2, 0, 2);
    assert_eq!(state.head.h, reference.head.h);
    assert_eq!(state.head.n_blocks, reference.head.n_blocks);
    assert_eq!(state.head.n_bad, reference.head.n_bad);
    for s in 0..state.n_stacks() {
        for t in 0..=state.head.h[s] {
            assert_eq!(state.body.pri(s, t), reference.body.pri(s, t));
            assert_eq!(state.body.quality(s, t), reference.body.quality(s, t));
            assert_eq!(state.body.badness(s, t), reference.body.badness(s, t));
        }
    }
    assert_invariants(&state);
}

#[test]
fn head_copy_is_deep() {
    let state = bay(3, 3, &[&[3, 1, 2], &[], &[]]);
    let mut copy = crate::state::Head::new(3);
    copy.copy_from(&state.head);
    assert_eq!(copy.h, state.head.h);
    assert_eq!(copy.list, state.head.list);
    assert_eq!(copy.n_bad, state.head.n_bad);
}
