//! Choosing the cheapest split of a mapping into bfchar and bfrange lines.
//!
//! Every way of writing the sorted mappings is a path through a DAG. Its vertices are the
//! positions in the list, each in one of three states: between entries, inside an open
//! incrementing bfrange, or inside an open bfrange with an explicit array. From a position
//! between entries the path writes entry `v` as a bfchar, or opens a range over `v` and `v + 1`.
//! An open range is extended one entry at a time or closed. Every edge costs the exact number
//! of bytes it adds to the written lines, so an explicit array pays for each value as it grows.
//!
//! Blocks hold at most 100 entries, so the 101st bfchar (or bfrange) opens a new block whose
//! begin/end lines are paid on top. The cost of an edge therefore depends on how many entries
//! of its kind the current block already holds, and a label at a vertex carries both block
//! counters. Labels dominated by another label at the same vertex are dropped, see
//! [`Label::dominates`]. On long tables with many near-equal splits the remaining frontier
//! can still grow towards one label per pair of counters; it is then cut to the
//! [`FRONTIER_LIMIT`] labels of lowest cost with block overhead spread evenly over the
//! entries. Below that limit the search is exact.

use std::collections::BTreeMap;

use log::debug;

use crate::code_space::{CharCode, CodeLen, CodeSpace};
use crate::encodings::cmap::{BfChar, BfRange, BfRangeTarget, CIDSystemInfo, ToUnicodeCMap};
use crate::unicode::UnicodeValue;
use crate::writer::{
    CHAR_BLOCK_OVERHEAD, MAX_BLOCK_ENTRIES, RANGE_BLOCK_OVERHEAD, array_range_width, bf_char_width,
    incrementing_range_width, value_width,
};
use crate::{Error, Result};

/// Labels kept per vertex.
const FRONTIER_LIMIT: usize = 16;

/// How an entry continues the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Link {
    Break,
    /// Next code, same width, no multiple of 256 in between.
    Run,
    /// A run whose value is the previous value plus one.
    Increment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Start,
    Char,
    OpenIncrementing,
    OpenArray,
    Extend,
    Close,
}

#[derive(Debug, Clone, Copy)]
struct Label {
    cost: u64,
    /// Entries in the open bfchar block, 0 before the first one.
    chars: u16,
    /// Entries in the open bfrange block, 0 before the first one.
    ranges: u16,
    /// Node of the label this one was reached from.
    prev: usize,
    step: Step,
}

impl Label {
    /// Whether every completion of `other` is at least as expensive as the same completion of
    /// `self`.
    ///
    /// Appending `m` entries to a block holding `c` opens `(c + m - 1) / 100` new blocks. That
    /// count never decreases with `c`, and two counters differ in it by at most one, so a higher
    /// counter costs at most one extra block of its kind.
    fn dominates(&self, other: &Label) -> bool {
        let mut cost = self.cost;
        if self.chars > other.chars {
            cost += CHAR_BLOCK_OVERHEAD;
        }
        if self.ranges > other.ranges {
            cost += RANGE_BLOCK_OVERHEAD;
        }
        cost <= other.cost
    }

    fn advance(&self, node: usize, step: Step, edge_cost: u64) -> Label {
        Label {
            cost: self.cost + edge_cost,
            prev: node,
            step,
            ..*self
        }
    }
}

/// A settled label, remembered so the cheapest path can be read back.
#[derive(Debug, Clone, Copy)]
struct Node {
    prev: usize,
    step: Step,
}

/// Candidate labels waiting at one position.
#[derive(Debug, Default)]
struct Layer {
    free: Vec<Label>,
    incrementing: Vec<Label>,
    array: Vec<Label>,
}

/// Finds the cheapest bfchar/bfrange split of sorted mappings.
pub struct Compactor<'a> {
    mappings: &'a [(CharCode, UnicodeValue)],
    widths: Vec<CodeLen>,
    /// `links[i]` tells how entry `i` continues entry `i - 1`.
    links: Vec<Link>,
    block: u16,
}

impl<'a> Compactor<'a> {
    /// Fails with [`Error::InvalidInput`] if the codes are not strictly increasing and with
    /// [`Error::CodeNotInSpace`] if a code is not part of `code_space`.
    pub fn new(code_space: &CodeSpace, mappings: &'a [(CharCode, UnicodeValue)]) -> Result<Compactor<'a>> {
        if let Some(pair) = mappings.windows(2).find(|pair| pair[0].0 >= pair[1].0) {
            return Err(Error::InvalidInput(format!(
                "character codes must be strictly increasing, found {:#X} before {:#X}",
                pair[0].0, pair[1].0
            )));
        }
        let widths = mappings
            .iter()
            .map(|(code, _)| code_space.code_len(*code).ok_or(Error::CodeNotInSpace(*code)))
            .collect::<Result<Vec<_>>>()?;

        let mut links = vec![Link::Break; mappings.len()];
        for (i, pair) in mappings.windows(2).enumerate() {
            let ((code, value), (next_code, next_value)) = (&pair[0], &pair[1]);
            if code.checked_add(1) == Some(*next_code) && next_code % 256 != 0 && widths[i] == widths[i + 1] {
                links[i + 1] = if value.checked_offset(1).as_ref() == Some(next_value) {
                    Link::Increment
                } else {
                    Link::Run
                };
            }
        }

        Ok(Compactor {
            mappings,
            widths,
            links,
            block: MAX_BLOCK_ENTRIES as u16,
        })
    }

    #[cfg(test)]
    fn with_block_size(mut self, block: u16) -> Compactor<'a> {
        self.block = block;
        self
    }

    /// Counts the entry `label` has just written, opening a new block when the current one is full.
    fn add_entry(&self, mut label: Label) -> Label {
        let (counter, overhead) = match label.step {
            Step::Char => (&mut label.chars, CHAR_BLOCK_OVERHEAD),
            _ => (&mut label.ranges, RANGE_BLOCK_OVERHEAD),
        };
        if *counter == self.block {
            *counter = 1;
            label.cost += overhead;
        } else {
            *counter += 1;
        }
        label
    }

    /// Cost with the block overhead spread evenly over the entries of a block, in hundredths
    /// of a byte for full blocks of 100.
    fn rank(&self, label: &Label) -> u64 {
        let block = self.block as u64;
        block * label.cost
            + CHAR_BLOCK_OVERHEAD * (block - label.chars as u64)
            + RANGE_BLOCK_OVERHEAD * (block - label.ranges as u64)
    }

    /// Drops dominated candidates and cuts the rest to [`FRONTIER_LIMIT`]. Among equal labels
    /// the one pushed first stays. Returns whether the frontier had to be cut.
    fn prune(&self, mut candidates: Vec<Label>) -> (Vec<Label>, bool) {
        candidates.sort_by_key(|label| label.cost);
        let mut frontier: Vec<Label> = Vec::new();
        for candidate in candidates {
            // the cheapest label dominates everything this much more expensive
            if frontier
                .first()
                .is_some_and(|cheapest| cheapest.cost + CHAR_BLOCK_OVERHEAD + RANGE_BLOCK_OVERHEAD <= candidate.cost)
            {
                break;
            }
            if !frontier.iter().any(|label| label.dominates(&candidate)) {
                frontier.push(candidate);
            }
        }
        let cut = frontier.len() > FRONTIER_LIMIT;
        if cut {
            frontier.sort_by_key(|label| self.rank(label));
            frontier.truncate(FRONTIER_LIMIT);
        }
        (frontier, cut)
    }

    fn settle(&self, candidates: Vec<Label>, nodes: &mut Vec<Node>, cuts: &mut usize) -> Vec<(Label, usize)> {
        let (frontier, cut) = self.prune(candidates);
        if cut {
            *cuts += 1;
        }
        frontier
            .into_iter()
            .map(|label| {
                nodes.push(Node {
                    prev: label.prev,
                    step: label.step,
                });
                (label, nodes.len() - 1)
            })
            .collect()
    }

    /// Runs the search and returns the entries of the cheapest split, both in code order.
    pub fn compact(&self) -> (Vec<BfChar>, Vec<BfRange>) {
        let n = self.mappings.len();
        let mut nodes = Vec::new();
        let mut cuts = 0;
        // labels reach at most two positions ahead
        let mut layers: [Layer; 3] = Default::default();
        layers[0].free.push(Label {
            cost: 0,
            chars: 0,
            ranges: 0,
            prev: 0,
            step: Step::Start,
        });

        let mut best = None;
        for v in 0..=n {
            let Layer {
                mut free,
                incrementing,
                array,
            } = std::mem::take(&mut layers[v % 3]);
            let incrementing = self.settle(incrementing, &mut nodes, &mut cuts);
            let array = self.settle(array, &mut nodes, &mut cuts);
            for (label, node) in incrementing.iter().chain(&array) {
                free.push(label.advance(*node, Step::Close, 0));
            }
            let free = self.settle(free, &mut nodes, &mut cuts);
            if v == n {
                best = free.iter().min_by_key(|(label, _)| label.cost).copied();
                break;
            }

            let (_, value) = &self.mappings[v];
            let len = self.widths[v];
            let next = self.links.get(v + 1).copied().unwrap_or(Link::Break);
            let char_cost = bf_char_width(len, value);
            let increment_cost = incrementing_range_width(len, value);
            let array_cost = match next {
                Link::Break => 0,
                _ => array_range_width(len, [value, &self.mappings[v + 1].1]),
            };
            for (label, node) in &free {
                layers[(v + 1) % 3]
                    .free
                    .push(self.add_entry(label.advance(*node, Step::Char, char_cost)));
                if next == Link::Increment {
                    layers[(v + 2) % 3]
                        .incrementing
                        .push(self.add_entry(label.advance(*node, Step::OpenIncrementing, increment_cost)));
                }
                if next != Link::Break {
                    layers[(v + 2) % 3]
                        .array
                        .push(self.add_entry(label.advance(*node, Step::OpenArray, array_cost)));
                }
            }

            if self.links[v] == Link::Increment {
                for (label, node) in &incrementing {
                    layers[(v + 1) % 3]
                        .incrementing
                        .push(label.advance(*node, Step::Extend, 0));
                }
            }
            if self.links[v] != Link::Break {
                // one more value and its separating space
                let extend_cost = value_width(value) + 1;
                for (label, node) in &array {
                    layers[(v + 1) % 3]
                        .array
                        .push(label.advance(*node, Step::Extend, extend_cost));
                }
            }
        }

        let Some((best, mut cursor)) = best else {
            return (Vec::new(), Vec::new());
        };
        debug!("cheapest split of {} mappings writes {} bytes of entries", n, best.cost);
        if cuts > 0 {
            debug!("frontier cut to {} labels at {} vertices", FRONTIER_LIMIT, cuts);
        }

        let mut steps = Vec::new();
        while nodes[cursor].step != Step::Start {
            steps.push(nodes[cursor].step);
            cursor = nodes[cursor].prev;
        }
        steps.reverse();

        let mut bf_chars = Vec::new();
        let mut bf_ranges = Vec::new();
        let mut position = 0;
        let mut open = None;
        for step in steps {
            match step {
                Step::Char => {
                    let (code, value) = &self.mappings[position];
                    bf_chars.push(BfChar {
                        code: *code,
                        value: value.clone(),
                    });
                    position += 1;
                }
                Step::OpenIncrementing | Step::OpenArray => {
                    open = Some((position, step));
                    position += 2;
                }
                Step::Extend => position += 1,
                Step::Close => {
                    if let Some((first, kind)) = open.take() {
                        bf_ranges.push(self.range(first, position, kind));
                    }
                }
                Step::Start => {}
            }
        }
        debug!("compacted into {} bfchars and {} bfranges", bf_chars.len(), bf_ranges.len());
        (bf_chars, bf_ranges)
    }

    /// The bfrange over entries `start..end`.
    fn range(&self, start: usize, end: usize, kind: Step) -> BfRange {
        let entries = &self.mappings[start..end];
        let (first, base) = &entries[0];
        let target = if kind == Step::OpenIncrementing {
            BfRangeTarget::Incrementing(base.clone())
        } else {
            BfRangeTarget::Array(entries.iter().map(|(_, value)| value.clone()).collect())
        };
        BfRange {
            first: *first,
            last: entries[entries.len() - 1].0,
            target,
        }
    }
}

impl ToUnicodeCMap {
    /// Build the smallest CMap for `mappings` in the default two byte code space.
    /// Codes must be strictly increasing.
    pub fn from_mappings(mappings: &[(CharCode, UnicodeValue)]) -> Result<ToUnicodeCMap> {
        ToUnicodeCMap::from_mappings_in(CodeSpace::default(), mappings)
    }

    pub fn from_mappings_in(code_space: CodeSpace, mappings: &[(CharCode, UnicodeValue)]) -> Result<ToUnicodeCMap> {
        let (bf_chars, bf_ranges) = Compactor::new(&code_space, mappings)?.compact();
        ToUnicodeCMap::new(
            ToUnicodeCMap::DEFAULT_NAME,
            CIDSystemInfo::default(),
            code_space,
            bf_chars,
            bf_ranges,
        )
    }

    pub fn from_map(map: &BTreeMap<CharCode, UnicodeValue>) -> Result<ToUnicodeCMap> {
        let mappings: Vec<_> = map.iter().map(|(code, value)| (*code, value.clone())).collect();
        ToUnicodeCMap::from_mappings(&mappings)
    }

    /// Replace all entries by the cheapest split of the current mapping.
    /// Name, system info and code space are kept.
    pub fn compact(&mut self) -> Result<()> {
        let mappings: Vec<_> = self
            .to_flat_list()
            .into_iter()
            .map(|bf_char| (bf_char.code, bf_char.value))
            .collect();
        let (bf_chars, bf_ranges) = Compactor::new(self.code_space(), &mappings)?.compact();
        *self = ToUnicodeCMap::new(
            self.name(),
            self.system_info().clone(),
            self.code_space().clone(),
            bf_chars,
            bf_ranges,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{RngExt as _, SeedableRng};

    use super::*;
    use crate::code_space::CodeSpaceRange;

    fn below(rng: &mut StdRng, bound: u32) -> u32 {
        let mut bytes = [0u8; 4];
        rng.fill(&mut bytes[..]);
        u32::from_le_bytes(bytes) % bound
    }

    /// Short tables of mostly consecutive codes, a few of them across a multiple of 256.
    fn random_mappings(rng: &mut StdRng, first: CharCode, count: usize) -> Vec<(CharCode, UnicodeValue)> {
        let mut mappings: Vec<(CharCode, UnicodeValue)> = Vec::with_capacity(count);
        let mut code = first;
        for _ in 0..count {
            let value = match (below(rng, 8), mappings.last()) {
                (0..=3, Some((_, previous))) => previous.offset(1),
                (4, _) => UnicodeValue::from('🔧'),
                (5, _) => UnicodeValue::from("ffi"),
                (6, _) => UnicodeValue::default(),
                _ => UnicodeValue::new(vec![0x41 + below(rng, 3) as u16]),
            };
            mappings.push((code, value));
            code += 1 + below(rng, 4) / 3;
        }
        mappings
    }

    /// Bytes of the entry lines plus the begin/end lines of every block after the first one
    /// of each kind, for blocks of `block` entries.
    fn split_cost(bf_chars: &[BfChar], bf_ranges: &[BfRange], block: usize) -> u64 {
        let code_space = CodeSpace::default();
        let width = |code| code_space.code_len(code).unwrap();
        let char_lines: u64 = bf_chars
            .iter()
            .map(|bf_char| bf_char_width(width(bf_char.code), &bf_char.value))
            .sum();
        let range_lines: u64 = bf_ranges
            .iter()
            .map(|range| match &range.target {
                BfRangeTarget::Incrementing(base) => incrementing_range_width(width(range.first), base),
                BfRangeTarget::Array(values) => array_range_width(width(range.first), values),
            })
            .sum();
        let extra_blocks = |count: usize| (count.saturating_sub(1) / block) as u64;
        char_lines
            + range_lines
            + extra_blocks(bf_chars.len()) * CHAR_BLOCK_OVERHEAD
            + extra_blocks(bf_ranges.len()) * RANGE_BLOCK_OVERHEAD
    }

    /// Cost of the cheapest split, trying every one of them.
    fn exhaustive_cost(mappings: &[(CharCode, UnicodeValue)], block: usize) -> u64 {
        fn walk(
            mappings: &[(CharCode, UnicodeValue)],
            block: usize,
            start: usize,
            bf_chars: &mut Vec<BfChar>,
            bf_ranges: &mut Vec<BfRange>,
            best: &mut u64,
        ) {
            if start == mappings.len() {
                *best = (*best).min(split_cost(bf_chars, bf_ranges, block));
                return;
            }
            let (first, base) = &mappings[start];
            bf_chars.push(BfChar::new(*first, base.clone()));
            walk(mappings, block, start + 1, bf_chars, bf_ranges, best);
            bf_chars.pop();

            for end in start + 1..mappings.len() {
                let last = mappings[end].0;
                if last != mappings[end - 1].0 + 1 || last % 256 == 0 {
                    break;
                }
                let entries = &mappings[start..=end];
                let increments = entries
                    .iter()
                    .zip(0..)
                    .all(|((_, value), i)| base.checked_offset(i).as_ref() == Some(value));
                let mut targets = vec![BfRangeTarget::Array(entries.iter().map(|(_, value)| value.clone()).collect())];
                if increments {
                    targets.push(BfRangeTarget::Incrementing(base.clone()));
                }
                for target in targets {
                    bf_ranges.push(BfRange {
                        first: *first,
                        last,
                        target,
                    });
                    walk(mappings, block, end + 1, bf_chars, bf_ranges, best);
                    bf_ranges.pop();
                }
            }
        }

        let mut best = u64::MAX;
        walk(mappings, block, 0, &mut Vec::new(), &mut Vec::new(), &mut best);
        best
    }

    /// Bytes `to_bytes` spends on bfchar and bfrange blocks, leaving out the begin/end lines
    /// of the last block of each kind.
    fn written_cost(cmap: &ToUnicodeCMap) -> u64 {
        let text = String::from_utf8(cmap.to_bytes().unwrap()).unwrap();
        let mut cost = 0;
        let mut last_wrappers = BTreeMap::new();
        let mut block = None;
        for line in text.lines() {
            let width = line.len() as u64 + 1;
            if let Some(kind) = ["bfchar", "bfrange"]
                .into_iter()
                .find(|kind| line.ends_with(&format!(" begin{}", kind)))
            {
                block = Some((kind, width));
            } else if let Some((kind, header)) = block {
                if line == format!("end{}", kind) {
                    last_wrappers.insert(kind, header + width);
                    cost += header + width;
                    block = None;
                } else {
                    cost += width;
                }
            }
        }
        cost - last_wrappers.values().sum::<u64>()
    }

    fn identity(codes: impl IntoIterator<Item = CharCode>) -> Vec<(CharCode, UnicodeValue)> {
        codes
            .into_iter()
            .map(|code| (code, UnicodeValue::new(vec![code as u16])))
            .collect()
    }

    fn assert_same_mapping(cmap: &ToUnicodeCMap, mappings: &[(CharCode, UnicodeValue)]) {
        assert_eq!(cmap.len(), mappings.len());
        for (code, value) in mappings {
            assert_eq!(cmap.get(*code).as_ref(), Some(value), "code {:#X}", code);
        }
    }

    #[test]
    fn chars_around_incrementing_range() {
        let mappings: Vec<_> = "AXCDEFG"
            .chars()
            .zip(0x41..)
            .map(|(c, code)| (code, UnicodeValue::from(c)))
            .collect();
        let cmap = ToUnicodeCMap::from_mappings(&mappings).unwrap();

        assert_eq!(cmap.bf_chars(), &[BfChar::new(0x41, 'A'), BfChar::new(0x42, 'X')]);
        assert_eq!(
            cmap.bf_ranges(),
            &[BfRange {
                first: 0x43,
                last: 0x47,
                target: BfRangeTarget::Incrementing('C'.into()),
            }]
        );
    }

    #[test]
    fn ranges_do_not_cross_256_boundary() {
        let mappings: Vec<_> = (251..=258).map(|code| (code, UnicodeValue::new(vec![code as u16 - 198]))).collect();
        let cmap = ToUnicodeCMap::from_mappings(&mappings).unwrap();

        assert!(cmap.bf_chars().is_empty());
        let bounds: Vec<_> = cmap.bf_ranges().iter().map(|range| (range.first, range.last)).collect();
        assert_eq!(bounds, vec![(251, 255), (256, 258)]);
        assert_same_mapping(&cmap, &mappings);
    }

    #[test]
    fn single_code_after_256_boundary_becomes_char() {
        // a one-entry range <0100> <0100> <0039> is 21 bytes, the bfchar line only 14
        let mappings: Vec<_> = (251..=256).map(|code| (code, UnicodeValue::new(vec![code as u16 - 198]))).collect();
        let cmap = ToUnicodeCMap::from_mappings(&mappings).unwrap();

        assert_eq!(cmap.bf_chars(), &[BfChar::new(256, ':')]);
        assert_eq!(cmap.bf_ranges().len(), 1);
        assert!(cmap.bf_ranges().iter().all(|range| range.first / 256 == range.last / 256));
    }

    #[test]
    fn unrelated_values_stay_chars() {
        let mappings = vec![
            (1, UnicodeValue::from('q')),
            (3, UnicodeValue::from('a')),
            (5, UnicodeValue::from('z')),
            (7, UnicodeValue::from('b')),
        ];
        let cmap = ToUnicodeCMap::from_mappings(&mappings).unwrap();
        assert_eq!(cmap.bf_chars().len(), 4);
        assert!(cmap.bf_ranges().is_empty());
    }

    #[test]
    fn consecutive_unrelated_values_become_array() {
        let mappings: Vec<_> = "qazb".chars().zip(1..).map(|(c, code)| (code, UnicodeValue::from(c))).collect();
        let cmap = ToUnicodeCMap::from_mappings(&mappings).unwrap();
        assert!(cmap.bf_chars().is_empty());
        assert_eq!(
            cmap.bf_ranges(),
            &[BfRange {
                first: 1,
                last: 4,
                target: BfRangeTarget::Array(mappings.iter().map(|(_, value)| value.clone()).collect()),
            }]
        );
    }

    #[test]
    fn surrogate_pairs_increment() {
        let mappings = vec![(0x10, UnicodeValue::from('😀')), (0x11, UnicodeValue::from('😁'))];
        let cmap = ToUnicodeCMap::from_mappings(&mappings).unwrap();
        assert!(cmap.bf_chars().is_empty());
        assert_eq!(
            cmap.bf_ranges(),
            &[BfRange {
                first: 0x10,
                last: 0x11,
                target: BfRangeTarget::Incrementing('😀'.into()),
            }]
        );
    }

    #[test]
    fn increments_do_not_enter_surrogates() {
        let mappings = vec![
            (0x10, UnicodeValue::new(vec![0xD7FE])),
            (0x11, UnicodeValue::new(vec![0xD7FF])),
            (0x12, UnicodeValue::new(vec![0xD800])),
        ];
        let cmap = ToUnicodeCMap::from_mappings(&mappings).unwrap();
        assert!(
            cmap.bf_ranges()
                .iter()
                .all(|range| !matches!(range.target, BfRangeTarget::Incrementing(_)) || range.last < 0x12)
        );
        assert_same_mapping(&cmap, &mappings);
    }

    #[test]
    fn block_overhead_is_counted() {
        // 100 isolated chars fill the first bfchar block, so the pair after them is cheaper
        // as an explicit range than as two chars in a new block
        let mut mappings: Vec<_> = (0..100).map(|i| (i * 2, UnicodeValue::from('a'))).collect();
        mappings.push((300, UnicodeValue::from('x')));
        mappings.push((301, UnicodeValue::from('a')));
        let cmap = ToUnicodeCMap::from_mappings(&mappings).unwrap();

        assert_eq!(cmap.bf_chars().len(), 100);
        assert_eq!(
            cmap.bf_ranges(),
            &[BfRange {
                first: 300,
                last: 301,
                target: BfRangeTarget::Array(vec!['x'.into(), 'a'.into()]),
            }]
        );

        // without the full block two chars are cheaper
        let cmap = ToUnicodeCMap::from_mappings(&mappings[98..]).unwrap();
        assert_eq!(cmap.bf_chars().len(), 4);
        assert!(cmap.bf_ranges().is_empty());
    }

    #[test]
    fn ranges_keep_one_code_width() {
        let code_space = CodeSpace::new(vec![
            CodeSpaceRange::new(0x00, 0x7F, 1).unwrap(),
            CodeSpaceRange::new(0x80, 0xFF, 2).unwrap(),
        ]);
        let mappings = identity(0x7C..=0x83);
        let cmap = ToUnicodeCMap::from_mappings_in(code_space, &mappings).unwrap();

        let bounds: Vec<_> = cmap.bf_ranges().iter().map(|range| (range.first, range.last)).collect();
        assert_eq!(bounds, vec![(0x7C, 0x7F), (0x80, 0x83)]);
    }

    #[test]
    fn long_identity_run() {
        let mappings = identity(0x20..=0x2FF);
        let cmap = ToUnicodeCMap::from_mappings(&mappings).unwrap();
        let bounds: Vec<_> = cmap.bf_ranges().iter().map(|range| (range.first, range.last)).collect();
        assert_eq!(bounds, vec![(0x20, 0xFF), (0x100, 0x1FF), (0x200, 0x2FF)]);
        assert!(cmap.bf_chars().is_empty());
    }

    #[test]
    fn invalid_input() {
        let unsorted = vec![(2, UnicodeValue::from('b')), (1, UnicodeValue::from('a'))];
        assert!(matches!(ToUnicodeCMap::from_mappings(&unsorted), Err(Error::InvalidInput(_))));

        let duplicate = vec![(1, UnicodeValue::from('a')), (1, UnicodeValue::from('b'))];
        assert!(matches!(ToUnicodeCMap::from_mappings(&duplicate), Err(Error::InvalidInput(_))));

        let outside = vec![(0x1_0000, UnicodeValue::from('a'))];
        assert!(matches!(
            ToUnicodeCMap::from_mappings(&outside),
            Err(Error::CodeNotInSpace(0x1_0000))
        ));
    }

    #[test]
    fn empty_mapping() {
        let cmap = ToUnicodeCMap::from_mappings(&[]).unwrap();
        assert!(cmap.is_empty());
        assert!(cmap.bf_chars().is_empty() && cmap.bf_ranges().is_empty());
    }

    #[test]
    fn compact_keeps_metadata_and_mapping() {
        let bf_chars = (0x41..0x50).map(|code| BfChar::new(code, UnicodeValue::new(vec![code as u16]))).collect();
        let mut cmap = ToUnicodeCMap::new(
            "Spread-UCS",
            CIDSystemInfo::default(),
            CodeSpace::default(),
            bf_chars,
            vec![],
        )
        .unwrap();
        let before = cmap.to_flat_list();

        cmap.compact().unwrap();
        assert_eq!(cmap.name(), "Spread-UCS");
        assert_eq!(cmap.bf_ranges().len(), 1);
        assert!(cmap.bf_chars().is_empty());
        assert_eq!(cmap.to_flat_list(), before);
    }

    #[test]
    fn from_map_matches_from_mappings() {
        let mappings = identity([0x10, 0x11, 0x12, 0x40, 0x42]);
        let map: BTreeMap<_, _> = mappings.iter().cloned().collect();
        assert_eq!(
            ToUnicodeCMap::from_map(&map).unwrap(),
            ToUnicodeCMap::from_mappings(&mappings).unwrap()
        );
    }

    #[test]
    fn search_matches_exhaustive_split_with_small_blocks() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..300 {
            let count = 1 + below(&mut rng, 10) as usize;
            let first = [0x20, 0xFA][below(&mut rng, 2) as usize];
            let mappings = random_mappings(&mut rng, first, count);
            // every pair of block counters fits into one frontier
            let block = 1 + below(&mut rng, 3) as u16;

            let (bf_chars, bf_ranges) = Compactor::new(&CodeSpace::default(), &mappings)
                .unwrap()
                .with_block_size(block)
                .compact();
            assert_eq!(
                split_cost(&bf_chars, &bf_ranges, block as usize),
                exhaustive_cost(&mappings, block as usize),
                "{:?} in blocks of {}",
                mappings,
                block
            );
            let cmap =
                ToUnicodeCMap::new("Split", CIDSystemInfo::default(), CodeSpace::default(), bf_chars, bf_ranges)
                    .unwrap();
            assert_same_mapping(&cmap, &mappings);
        }
    }

    #[test]
    fn written_size_is_minimal_across_block_boundary() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..40 {
            // isolated codes, each can only be a bfchar, nearly fill the first block
            let filler = 92 + below(&mut rng, 8);
            let mut mappings: Vec<_> = (0..filler).map(|i| (i * 2, UnicodeValue::from('a'))).collect();
            mappings.extend(random_mappings(&mut rng, 0x300, 8));

            let cmap = ToUnicodeCMap::from_mappings(&mappings).unwrap();
            assert_eq!(written_cost(&cmap), exhaustive_cost(&mappings, MAX_BLOCK_ENTRIES), "{:?}", mappings);
            assert_same_mapping(&cmap, &mappings);
        }
    }

    #[test]
    fn frontier_stays_bounded() {
        let mut rng = StdRng::seed_from_u64(3);
        let mappings = random_mappings(&mut rng, 0, 5000);
        let compactor = Compactor::new(&CodeSpace::default(), &mappings).unwrap();
        let free: Vec<_> = (0..200)
            .map(|i| Label {
                cost: 1000 + i % 40,
                chars: (i % 100) as u16 + 1,
                ranges: (99 - i % 100) as u16 + 1,
                prev: 0,
                step: Step::Char,
            })
            .collect();
        let (frontier, cut) = compactor.prune(free);
        assert!(cut);
        assert_eq!(frontier.len(), FRONTIER_LIMIT);

        let (bf_chars, bf_ranges) = compactor.compact();
        let cmap = ToUnicodeCMap::new("Mixed", CIDSystemInfo::default(), CodeSpace::default(), bf_chars, bf_ranges)
            .unwrap();
        assert_same_mapping(&cmap, &mappings);
    }
}
