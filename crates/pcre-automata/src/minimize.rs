//! DFA minimization.
//!
//! Two algorithms — Moore partition refinement and Hopcroft's worklist —
//! that must agree: both trim unreachable and dead states, refine over the
//! DFA's own range boundaries, and renumber the quotient canonically
//! (breadth-first in symbol order), so equal languages produce identical
//! `Dfa` values.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;

use crate::dfa::{Dfa, DfaState};
use crate::error::{ComplexityError, Phase, WorkBudget};

/// Minimization algorithm choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MinimizerKind {
    /// Iterated signature refinement
    #[default]
    Moore,
    /// Worklist splitting
    Hopcroft,
}

/// Minimize a DFA.
pub fn minimize(
    dfa: &Dfa,
    kind: MinimizerKind,
    budget: &mut WorkBudget,
) -> Result<Dfa, ComplexityError> {
    let trimmed = trim(dfa);
    if trimmed.states.is_empty() {
        return Ok(empty_language(dfa.max_code_point));
    }

    // Complete the automaton with an explicit trap so the transition
    // function is total during refinement; the trap class is dropped again
    // when the quotient is rebuilt.
    let (complete, trap) = complete(&trimmed);
    let symbols = boundaries(&complete);

    let block_of = match kind {
        MinimizerKind::Moore => moore(&complete, &symbols, budget)?,
        MinimizerKind::Hopcroft => hopcroft(&complete, &symbols, budget)?,
    };

    Ok(quotient(&complete, trap, &symbols, &block_of))
}

fn empty_language(max_code_point: u32) -> Dfa {
    Dfa {
        states: vec![DfaState { transitions: Vec::new(), accepting: false }],
        start: 0,
        max_code_point,
    }
}

/// Keep only states that are reachable from the start and can reach an
/// accepting state; everything else is the implicit trap.
fn trim(dfa: &Dfa) -> Dfa {
    let n = dfa.states.len();
    let mut reachable = vec![false; n];
    let mut stack = vec![dfa.start];
    while let Some(state) = stack.pop() {
        if reachable[state] {
            continue;
        }
        reachable[state] = true;
        for &(_, _, target) in &dfa.states[state].transitions {
            stack.push(target);
        }
    }

    let mut live = vec![false; n];
    // iterate to a fixed point; automata here are small
    let mut changed = true;
    while changed {
        changed = false;
        for state in 0..n {
            if live[state] || !reachable[state] {
                continue;
            }
            let alive = dfa.states[state].accepting
                || dfa.states[state]
                    .transitions
                    .iter()
                    .any(|&(_, _, t)| live[t]);
            if alive {
                live[state] = true;
                changed = true;
            }
        }
    }

    if !live[dfa.start] {
        return Dfa { states: Vec::new(), start: 0, max_code_point: dfa.max_code_point };
    }

    let mut remap: FxHashMap<usize, usize> = FxHashMap::default();
    let mut order: Vec<usize> = Vec::new();
    for state in 0..n {
        if live[state] {
            remap.insert(state, order.len());
            order.push(state);
        }
    }
    let states = order
        .iter()
        .map(|&old| DfaState {
            accepting: dfa.states[old].accepting,
            transitions: dfa.states[old]
                .transitions
                .iter()
                .filter_map(|&(lo, hi, t)| remap.get(&t).map(|&nt| (lo, hi, nt)))
                .collect(),
        })
        .collect();
    Dfa { states, start: remap[&dfa.start], max_code_point: dfa.max_code_point }
}

/// Add an explicit trap state and make every state total over `[0, max]`.
fn complete(dfa: &Dfa) -> (Dfa, usize) {
    let trap = dfa.states.len();
    let mut states = dfa.states.clone();
    for state in &mut states {
        let mut filled: Vec<(u32, u32, usize)> = Vec::new();
        let mut next = 0u32;
        for &(lo, hi, t) in &state.transitions {
            if lo > next {
                filled.push((next, lo - 1, trap));
            }
            filled.push((lo, hi, t));
            next = hi.saturating_add(1);
        }
        if next <= dfa.max_code_point {
            filled.push((next, dfa.max_code_point, trap));
        }
        state.transitions = filled;
    }
    states.push(DfaState {
        transitions: vec![(0, dfa.max_code_point, trap)],
        accepting: false,
    });
    (Dfa { states, start: dfa.start, max_code_point: dfa.max_code_point }, trap)
}

/// The refinement alphabet: representative code points of the coarsest
/// partition induced by all transition boundaries.
fn boundaries(dfa: &Dfa) -> Vec<u32> {
    let mut cuts = vec![0u32];
    for state in &dfa.states {
        for &(lo, hi, _) in &state.transitions {
            cuts.push(lo);
            if hi < dfa.max_code_point {
                cuts.push(hi + 1);
            }
        }
    }
    cuts.sort_unstable();
    cuts.dedup();
    cuts
}

fn target(dfa: &Dfa, state: usize, cp: u32) -> usize {
    // complete() guarantees totality
    dfa.states[state].target(cp).unwrap_or(state)
}

/// Moore: refine `(accepting, per-symbol target class)` signatures until
/// stable.
fn moore(
    dfa: &Dfa,
    symbols: &[u32],
    budget: &mut WorkBudget,
) -> Result<Vec<usize>, ComplexityError> {
    let n = dfa.states.len();
    let mut block_of: Vec<usize> = dfa.states.iter().map(|s| usize::from(s.accepting)).collect();
    let mut block_count = 2;
    loop {
        let mut ids: FxHashMap<(usize, Vec<usize>), usize> = FxHashMap::default();
        let mut next: Vec<usize> = Vec::with_capacity(n);
        for state in 0..n {
            budget.charge(symbols.len())?;
            let signature: Vec<usize> = symbols
                .iter()
                .map(|&cp| block_of[target(dfa, state, cp)])
                .collect();
            let key = (block_of[state], signature);
            let id = ids.len();
            let id = *ids.entry(key).or_insert(id);
            next.push(id);
        }
        let new_count = ids.len();
        block_of = next;
        if new_count == block_count {
            return Ok(block_of);
        }
        block_count = new_count;
    }
}

/// Hopcroft: split blocks against preimages of (block, symbol) splitters,
/// always queueing the smaller half.
fn hopcroft(
    dfa: &Dfa,
    symbols: &[u32],
    budget: &mut WorkBudget,
) -> Result<Vec<usize>, ComplexityError> {
    let n = dfa.states.len();
    // preimage[symbol][state] = predecessors of `state` on `symbol`
    let mut preimage: Vec<Vec<Vec<usize>>> = vec![vec![Vec::new(); n]; symbols.len()];
    for state in 0..n {
        for (si, &cp) in symbols.iter().enumerate() {
            preimage[si][target(dfa, state, cp)].push(state);
        }
    }

    let accepting: Vec<usize> = (0..n).filter(|&s| dfa.states[s].accepting).collect();
    let rejecting: Vec<usize> = (0..n).filter(|&s| !dfa.states[s].accepting).collect();

    let mut blocks: Vec<Vec<usize>> = Vec::new();
    let mut block_of = vec![0usize; n];
    for block in [rejecting, accepting] {
        if block.is_empty() {
            continue;
        }
        for &s in &block {
            block_of[s] = blocks.len();
        }
        blocks.push(block);
    }

    let mut worklist: VecDeque<(usize, usize)> = VecDeque::new();
    for block in 0..blocks.len() {
        for si in 0..symbols.len() {
            worklist.push_back((block, si));
        }
    }

    while let Some((splitter, symbol)) = worklist.pop_front() {
        budget.charge(blocks[splitter].len().max(1))?;
        // X = states leading into the splitter block on `symbol`
        let mut x: Vec<usize> = Vec::new();
        for &s in &blocks[splitter] {
            x.extend_from_slice(&preimage[symbol][s]);
        }
        if x.is_empty() {
            continue;
        }
        let mut in_x = vec![false; n];
        for &s in &x {
            in_x[s] = true;
        }

        let affected: Vec<usize> = {
            let mut seen = vec![false; blocks.len()];
            let mut out = Vec::new();
            for &s in &x {
                let b = block_of[s];
                if !seen[b] {
                    seen[b] = true;
                    out.push(b);
                }
            }
            out
        };

        for b in affected {
            let inside: Vec<usize> = blocks[b].iter().copied().filter(|&s| in_x[s]).collect();
            if inside.len() == blocks[b].len() {
                continue;
            }
            let outside: Vec<usize> =
                blocks[b].iter().copied().filter(|&s| !in_x[s]).collect();
            let new_id = blocks.len();
            // keep the larger part in place; requeue both halves so no
            // pending splitter is lost
            let (stay, moved) = if inside.len() <= outside.len() {
                (outside, inside)
            } else {
                (inside, outside)
            };
            for &s in &moved {
                block_of[s] = new_id;
            }
            blocks[b] = stay;
            blocks.push(moved);
            for si in 0..symbols.len() {
                worklist.push_back((b, si));
                worklist.push_back((new_id, si));
            }
        }
    }

    Ok(block_of)
}

/// Build the quotient DFA and renumber breadth-first in symbol order.
fn quotient(dfa: &Dfa, trap: usize, symbols: &[u32], block_of: &[usize]) -> Dfa {
    let trap_block = block_of[trap];
    let start_block = block_of[dfa.start];

    // representative state per block
    let mut representative: FxHashMap<usize, usize> = FxHashMap::default();
    for (state, &block) in block_of.iter().enumerate() {
        representative.entry(block).or_insert(state);
    }

    // BFS over blocks for canonical numbering
    let mut numbering: FxHashMap<usize, usize> = FxHashMap::default();
    let mut order: Vec<usize> = Vec::new();
    let mut queue = VecDeque::from([start_block]);
    numbering.insert(start_block, 0);
    order.push(start_block);
    while let Some(block) = queue.pop_front() {
        let rep = representative[&block];
        for &cp in symbols {
            let next_block = block_of[target(dfa, rep, cp)];
            if next_block == trap_block {
                continue;
            }
            if !numbering.contains_key(&next_block) {
                numbering.insert(next_block, order.len());
                order.push(next_block);
                queue.push_back(next_block);
            }
        }
    }

    let mut states = Vec::with_capacity(order.len());
    for &block in &order {
        let rep = representative[&block];
        let mut transitions: Vec<(u32, u32, usize)> = Vec::new();
        for (i, &cp) in symbols.iter().enumerate() {
            let next_block = block_of[target(dfa, rep, cp)];
            if next_block == trap_block {
                continue;
            }
            let lo = cp;
            let hi = if i + 1 < symbols.len() { symbols[i + 1] - 1 } else { dfa.max_code_point };
            let target_id = numbering[&next_block];
            match transitions.last_mut() {
                Some((_, prev_hi, prev_t))
                    if *prev_t == target_id && prev_hi.saturating_add(1) == lo =>
                {
                    *prev_hi = hi;
                }
                _ => transitions.push((lo, hi, target_id)),
            }
        }
        states.push(DfaState {
            transitions,
            accepting: dfa.states[rep].accepting,
        });
    }

    Dfa { states, start: 0, max_code_point: dfa.max_code_point }
}
