//! The resolver
//!
//! For every combination of parent selections the root frequencies are
//! propagated down the tree. `apply` visits every frequency a clock can
//! actually reach, while `offer` only answers whether a frequency can be
//! accepted by a clock and everything below it. A factor is valid when
//! all children of the clock accept the resulting frequency.
//!
//! As long as a leaf can still be reached in more than one way, the next
//! clock in priority order gets its frequency fixed to the preferred end
//! of its reachable range, and propagation is repeated.

use core::iter;

use heapless::Vec;
use log::{debug, trace};

use super::state::SearchState;
use super::{
    bits, ClockGraph, Direction, Error, FrequencyLimits, Requirements,
    ResolvedClockTree, MAX_CHILDREN, MAX_CLOCKS,
};

/// Find the best clock configuration of `graph` that meets
/// `requirements`.
///
/// Returns an error for malformed requirements. A configuration that
/// cannot be met is reported by [`ResolvedClockTree::is_valid`].
pub fn resolve(
    graph: &ClockGraph,
    requirements: &Requirements,
    direction: Direction,
) -> Result<ResolvedClockTree, Error> {
    let (limits, active) = requirements.normalize(graph)?;
    Ok(Resolver::new(graph, &limits, active, direction).run())
}

/// Outcome of one feasible combination
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Attempt {
    /// Parent index selected for every clock
    pub(crate) selection: Vec<u8, MAX_CLOCKS>,
    /// Bitmap of used clocks
    pub(crate) used: u32,
    /// Factor index selected for every used clock
    pub(crate) factors: Vec<u8, MAX_CLOCKS>,
    /// Frequency of every used clock, zero otherwise
    pub(crate) frequencies: Vec<u32, MAX_CLOCKS>,
}

impl Attempt {
    fn is_used(&self, index: usize) -> bool {
        self.used & (1 << index) != 0
    }
}

pub(crate) struct Resolver<'g> {
    graph: &'g ClockGraph,
    limits: Vec<FrequencyLimits, MAX_CLOCKS>,
    active: u32,
    direction: Direction,
    memoize: bool,
    /// Current combination: selected parent index of every clock
    selection: Vec<u8, MAX_CLOCKS>,
    /// Children of every clock under the current combination
    children: Vec<Vec<u8, MAX_CHILDREN>, MAX_CLOCKS>,
    /// Clocks leading to an active leaf under the current combination
    needed: u32,
    state: Vec<SearchState, MAX_CLOCKS>,
}

impl<'g> Resolver<'g> {
    pub(crate) fn new(
        graph: &'g ClockGraph,
        limits: &[FrequencyLimits],
        active: u32,
        direction: Direction,
    ) -> Self {
        let mut resolver = Resolver {
            graph,
            limits: Vec::new(),
            active,
            direction,
            memoize: true,
            selection: Vec::new(),
            children: Vec::new(),
            needed: 0,
            state: Vec::new(),
        };

        // Cannot overflow: the graph has at most MAX_CLOCKS clocks
        for index in 0..graph.len() {
            let prescaler = &graph.node(index).descriptor.prescaler;
            resolver.limits.push(limits[index]).ok();
            resolver.selection.push(0).ok();
            resolver.children.push(Vec::new()).ok();
            resolver
                .state
                .push(SearchState::new(limits[index], prescaler))
                .ok();
        }
        resolver
    }

    /// Disable the offer and apply memo tables
    #[cfg(test)]
    pub(crate) fn without_memo(mut self) -> Self {
        self.memoize = false;
        self
    }

    pub(crate) fn run(mut self) -> ResolvedClockTree {
        let mut best: Option<Attempt> = None;
        let mut combination = 0u32;

        loop {
            if self.select() {
                trace!("combination {}: {:?}", combination, &self.selection[..]);
                match self.attempt() {
                    Some(attempt) => {
                        let better = best
                            .as_ref()
                            .map_or(true, |best| self.is_better(&attempt, best));
                        if better {
                            debug!("combination {} is the best so far", combination);
                            best = Some(attempt);
                        }
                    }
                    None => trace!("combination {} is infeasible", combination),
                }
            }

            combination += 1;
            if !self.advance() {
                break;
            }
        }

        if best.is_none() {
            debug!("no feasible clock configuration");
        }
        ResolvedClockTree::new(self.graph, best.as_ref())
    }

    /// Step the odometer of parent selections. Returns false once it
    /// wraps back to all zeros.
    fn advance(&mut self) -> bool {
        for index in 0..self.graph.len() {
            let count = self.graph.node(index).parents.len();
            if count > 1 {
                self.selection[index] += 1;
                if usize::from(self.selection[index]) < count {
                    return true;
                }
                self.selection[index] = 0;
            }
        }
        false
    }

    /// Selected parent of the clock at `index`
    fn parent(&self, index: usize) -> Option<usize> {
        self.graph
            .node(index)
            .parents
            .get(usize::from(self.selection[index]))
            .map(|&p| usize::from(p))
    }

    /// The clock at `index` and its selected ancestors
    fn chain(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        iter::successors(Some(index), move |&i| self.parent(i))
    }

    fn is_needed(&self, index: usize) -> bool {
        self.needed & (1 << index) != 0
    }

    /// Work out which clocks the current combination needs, and their
    /// children. Returns false if the combination only differs from an
    /// earlier one in the parents of clocks that are not needed.
    fn select(&mut self) -> bool {
        let mut needed = 0u32;
        for leaf in bits(self.active) {
            for index in self.chain(leaf) {
                if needed & (1 << index) != 0 {
                    break;
                }
                needed |= 1 << index;
            }
        }

        let redundant = (0..self.graph.len())
            .any(|i| needed & (1 << i) == 0 && self.selection[i] != 0);
        if redundant {
            return false;
        }

        self.needed = needed;
        for children in self.children.iter_mut() {
            children.clear();
        }
        for index in bits(needed) {
            if let Some(parent) = self.parent(index) {
                // Cannot overflow: child counts are checked by the builder
                self.children[parent].push(index as u8).ok();
            }
        }
        true
    }

    /// Resolve the current combination
    fn attempt(&mut self) -> Option<Attempt> {
        let graph = self.graph;
        for index in 0..graph.len() {
            let prescaler = &graph.node(index).descriptor.prescaler;
            self.state[index] = SearchState::new(self.limits[index], prescaler);
        }

        // Every round fixes the frequency or the factor of one more
        // clock, so this terminates.
        loop {
            self.propagate();
            if !self.is_feasible() {
                return None;
            }
            if self.is_final() {
                break;
            }
            if !self.fix_next() && !self.pin_next() {
                return None;
            }
        }

        Some(self.finish())
    }

    /// One propagation pass from all roots
    fn propagate(&mut self) {
        for state in self.state.iter_mut() {
            state.begin_pass();
        }

        for index in bits(self.needed) {
            if self.parent(index).is_none() {
                // A root without a frequency is not available
                if let Some(hz) = self.state[index].limits.exact {
                    self.apply(index, hz, None);
                }
            }
        }

        for index in bits(self.needed) {
            self.state[index].compact();
        }
    }

    /// Frequency of the clock at `index` through factor `factor_index`,
    /// if that factor and frequency are admissible.
    fn admit(
        &self,
        index: usize,
        incoming: u32,
        parent_factor: Option<u32>,
        factor_index: usize,
    ) -> Option<u32> {
        let descriptor = &self.graph.node(index).descriptor;
        let factor = descriptor.prescaler.factor(factor_index);
        if !descriptor.is_prescaler_compatible(parent_factor, factor) {
            return None;
        }

        let hz = descriptor.prescaler.child_frequency(incoming, factor_index)?;
        if self.state[index].limits.is_frequency_ok(hz) {
            Some(hz)
        } else {
            None
        }
    }

    /// Feed `incoming` into the clock at `index`, marking every factor
    /// for which the whole subtree can follow, and continue into the
    /// children.
    fn apply(&mut self, index: usize, incoming: u32, parent_factor: Option<u32>) {
        let graph = self.graph;
        let prescaler = &graph.node(index).descriptor.prescaler;
        let memoize = self.memoize && graph.node(index).descriptor.is_context_free();
        if memoize && !self.state[index].first_apply(incoming) {
            return;
        }

        let children = self.children[index].clone();
        for factor_index in bits(self.state[index].allowed) {
            let hz = match self.admit(index, incoming, parent_factor, factor_index) {
                Some(hz) => hz,
                None => continue,
            };
            let factor = prescaler.factor(factor_index);

            if !children
                .iter()
                .all(|&child| self.offer(factor, usize::from(child), hz))
            {
                continue;
            }

            self.state[index].mark(factor_index, hz);
            for &child in &children {
                self.apply(usize::from(child), hz, Some(factor));
            }
        }
    }

    /// Returns true if the clock at `index` and all its descendants can
    /// work with `incoming` while the parent uses `parent_factor`.
    fn offer(&mut self, parent_factor: u32, index: usize, incoming: u32) -> bool {
        let graph = self.graph;
        let prescaler = &graph.node(index).descriptor.prescaler;
        let memoize = self.memoize && graph.node(index).descriptor.is_context_free();
        if memoize {
            if let Some(accepted) = self.state[index].cached_offer(incoming) {
                return accepted;
            }
        }

        let children = self.children[index].clone();
        let mut accepted = false;
        for factor_index in bits(self.state[index].allowed) {
            let hz = match self.admit(index, incoming, Some(parent_factor), factor_index)
            {
                Some(hz) => hz,
                None => continue,
            };
            let factor = prescaler.factor(factor_index);

            if children
                .iter()
                .all(|&child| self.offer(factor, usize::from(child), hz))
            {
                accepted = true;
                break;
            }
        }

        if memoize {
            self.state[index].remember_offer(incoming, accepted);
        }
        accepted
    }

    /// Every needed clock kept at least one factor
    fn is_feasible(&self) -> bool {
        bits(self.needed).all(|index| self.state[index].allowed != 0)
    }

    /// Every active leaf is reached through exactly one factor at each
    /// level
    fn is_final(&self) -> bool {
        bits(self.active).all(|leaf| {
            self.chain(leaf)
                .all(|index| self.state[index].is_determined())
        })
    }

    /// Fix the frequency of the next undetermined clock in priority order
    fn fix_next(&mut self) -> bool {
        let graph = self.graph;
        let direction = self.direction;

        for &index in graph.priority_indices() {
            let index = usize::from(index);
            if !self.is_needed(index) || self.state[index].is_fixed() {
                continue;
            }
            if let Some((lo, hi)) = self.state[index].range {
                let hz = direction.pick(lo, hi);
                trace!("fix {} at {} Hz", graph.node(index).descriptor.name, hz);
                self.state[index].fix(hz);
                return true;
            }
        }
        false
    }

    /// All frequencies are fixed but some clock still has several
    /// factors giving the same result: keep the first one.
    fn pin_next(&mut self) -> bool {
        let graph = self.graph;
        for &index in graph.priority_indices() {
            let index = usize::from(index);
            let state = &mut self.state[index];
            if self.needed & (1 << index) != 0 && state.allowed.count_ones() > 1 {
                state.allowed &= state.allowed.wrapping_neg();
                return true;
            }
        }
        false
    }

    /// Settle the remaining frequencies and record the result
    fn finish(&mut self) -> Attempt {
        let graph = self.graph;
        let direction = self.direction;
        for &index in graph.priority_indices() {
            let index = usize::from(index);
            let state = &mut self.state[index];
            if self.needed & (1 << index) != 0 && !state.is_fixed() {
                if let Some((lo, hi)) = state.range {
                    state.fix(direction.pick(lo, hi));
                }
            }
        }

        let mut used = 0u32;
        for leaf in bits(self.active) {
            for index in self.chain(leaf) {
                used |= 1 << index;
            }
        }

        let mut attempt = Attempt {
            selection: self.selection.clone(),
            used,
            factors: Vec::new(),
            frequencies: Vec::new(),
        };
        for (index, state) in self.state.iter_mut().enumerate() {
            state.used = used & (1 << index) != 0;
            let (factor, hz) = if state.used {
                (state.allowed.trailing_zeros() as u8, state.frequency().unwrap_or(0))
            } else {
                (0, 0)
            };
            attempt.factors.push(factor).ok();
            attempt.frequencies.push(hz).ok();
        }
        attempt
    }

    /// Compare in priority order: the first clock used by both attempts
    /// whose frequency differs decides.
    fn is_better(&self, candidate: &Attempt, best: &Attempt) -> bool {
        for &index in self.graph.priority_indices() {
            let index = usize::from(index);
            if !candidate.is_used(index) || !best.is_used(index) {
                continue;
            }
            let (new, old) = (candidate.frequencies[index], best.frequencies[index]);
            if new != old {
                return self.direction.prefers(new, old);
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use quickcheck::{quickcheck, TestResult};

    use super::*;
    use crate::clock_tree::{
        Activation, ClockConfig, ClockId, ClockSourceDescriptor, Prescaler,
        PrescalerKind,
    };
    use crate::time::{Hertz, U32Ext};

    const OSC: ClockId = ClockId(0);
    const PLL: ClockId = ClockId(1);
    const BUS: ClockId = ClockId(2);
    const OSC_B: ClockId = ClockId(3);
    const NONE: ClockId = ClockId(0xff);

    fn osc(id: ClockId, hz: u32) -> ClockSourceDescriptor {
        ClockSourceDescriptor::new(id, "osc", Prescaler::multiply(&[1]))
            .limits(FrequencyLimits::exact(hz))
    }

    fn pll() -> ClockSourceDescriptor {
        let factors: std::vec::Vec<u32> = (2..=16).collect();
        ClockSourceDescriptor::new(PLL, "pll", Prescaler::multiply(&factors))
            .limits(FrequencyLimits::range(1_000_000, 72_000_000))
    }

    fn bus(limits: FrequencyLimits) -> ClockSourceDescriptor {
        ClockSourceDescriptor::new(BUS, "bus", Prescaler::divide(&[1, 2, 4, 8]))
            .limits(limits)
            .leaf(Activation::Always)
    }

    /// 8 MHz oscillator -> PLL x2..16 -> bus /1, /2, /4, /8
    fn scenario(bus_limits: FrequencyLimits) -> ClockGraph {
        ClockGraph::builder()
            .clock(osc(OSC, 8_000_000), &[])
            .clock(pll(), &[OSC])
            .clock(bus(bus_limits), &[PLL])
            .build()
            .unwrap()
    }

    fn resolve_default(graph: &ClockGraph, direction: Direction) -> ResolvedClockTree {
        resolve(graph, &Requirements::new(), direction).unwrap()
    }

    fn mhz(tree: &ResolvedClockTree, id: ClockId) -> f32 {
        tree.config_for(id).frequency.0 as f32 / 1e6
    }

    #[test]
    fn highest_pll_then_highest_bus() {
        let graph = scenario(FrequencyLimits::range(600_000, 14_000_000));
        let tree = resolve_default(&graph, Direction::PreferHighest);
        println!("PLL {} MHz -> BUS {} MHz", mhz(&tree, PLL), mhz(&tree, BUS));

        assert!(tree.is_valid());

        let pll = tree.config_for(PLL);
        assert_eq!(pll.frequency, Hertz::from(72.mhz()));
        assert_eq!(pll.prescaler_kind, PrescalerKind::Multiply);
        assert_eq!(pll.prescaler_value, 9);
        assert_eq!(pll.prescaler_divisor, 1);
        assert!(pll.used);

        let bus = tree.config_for(BUS);
        assert_eq!(bus.frequency, Hertz(9_000_000));
        assert_eq!(bus.prescaler_kind, PrescalerKind::Divide);
        assert_eq!(bus.prescaler_value, 8);

        assert_eq!(tree.frequency(OSC), Some(Hertz(8_000_000)));
        assert_eq!(tree.parent_of(BUS, NONE), PLL);
        assert_eq!(tree.parent_of(PLL, NONE), OSC);
        assert_eq!(tree.parent_of(OSC, NONE), NONE);
    }

    #[test]
    fn lowest_pll_then_lowest_bus() {
        let graph = scenario(FrequencyLimits::range(600_000, 14_000_000));
        let tree = resolve_default(&graph, Direction::PreferLowest);

        assert!(tree.is_valid());
        assert_eq!(tree.config_for(PLL).prescaler_value, 2);
        assert_eq!(tree.frequency(PLL), Some(Hertz(16_000_000)));
        assert_eq!(tree.config_for(BUS).prescaler_value, 8);
        assert_eq!(tree.frequency(BUS), Some(Hertz(2_000_000)));
    }

    #[test]
    fn band_reached_only_by_lower_pll_settings() {
        let graph = scenario(FrequencyLimits::range(20_000_000, 30_000_000));
        let tree = resolve_default(&graph, Direction::PreferHighest);

        assert!(tree.is_valid());
        assert_eq!(tree.frequency(PLL), Some(Hertz(56_000_000)));
        assert_eq!(tree.frequency(BUS), Some(Hertz(28_000_000)));
        assert_eq!(tree.config_for(BUS).prescaler_value, 2);
    }

    #[test]
    fn unreachable_band_is_infeasible() {
        // Reachable bus frequencies around here are 14 and 16 MHz
        let graph = scenario(FrequencyLimits::range(14_500_000, 15_500_000));
        let tree = resolve_default(&graph, Direction::PreferHighest);

        assert!(!tree.is_valid());
        assert_eq!(tree.config_for(PLL), ClockConfig::UNUSED);
        assert_eq!(tree.config_for(BUS).frequency, Hertz(0));
        assert!(!tree.is_used(BUS));
        assert_eq!(tree.frequency(BUS), None);
        assert_eq!(tree.parent_of(BUS, NONE), NONE);
        assert_eq!(tree.iter().count(), 0);
    }

    #[test]
    fn requirements_narrow_the_result() {
        let graph = scenario(FrequencyLimits::range(600_000, 14_000_000));
        let requirements = Requirements::new().exact(BUS, 12.mhz());
        let tree = resolve(&graph, &requirements, Direction::PreferHighest).unwrap();

        assert!(tree.is_valid());
        // 48 MHz / 4 is the first way to 12 MHz from the top
        assert_eq!(tree.frequency(PLL), Some(Hertz(48_000_000)));
        assert_eq!(tree.config_for(BUS).prescaler_value, 4);

        let requirements = Requirements::new().exact(BUS, 13.mhz());
        let tree = resolve(&graph, &requirements, Direction::PreferHighest).unwrap();
        assert!(!tree.is_valid());
    }

    #[test]
    fn configuration_errors_are_not_resolved() {
        let graph = scenario(FrequencyLimits::range(600_000, 14_000_000));
        let requirements = Requirements::new().exact(BUS, 20.mhz());
        assert_eq!(
            resolve(&graph, &requirements, Direction::PreferHighest),
            Err(Error::OutOfBounds(BUS))
        );
    }

    fn two_oscillators(a_hz: u32, b_hz: u32) -> ClockGraph {
        ClockGraph::builder()
            .clock(osc(OSC, a_hz), &[])
            .clock(osc(OSC_B, b_hz), &[])
            .clock(pll(), &[OSC, OSC_B])
            .clock(bus(FrequencyLimits::range(600_000, 14_000_000)), &[PLL])
            .priority(&[PLL, BUS])
            .build()
            .unwrap()
    }

    #[test]
    fn ties_keep_the_first_combination() {
        let graph = two_oscillators(8_000_000, 8_000_000);
        for &direction in &[Direction::PreferHighest, Direction::PreferLowest] {
            let tree = resolve_default(&graph, direction);
            assert!(tree.is_valid());
            assert_eq!(tree.parent_of(PLL, NONE), OSC);
            assert!(tree.is_used(OSC));
            assert!(!tree.is_used(OSC_B));
        }
    }

    #[test]
    fn direction_selects_the_parent() {
        let graph = two_oscillators(8_000_000, 7_000_000);

        // 8 MHz x 9 = 72 MHz beats 7 MHz x 10 = 70 MHz
        let tree = resolve_default(&graph, Direction::PreferHighest);
        assert_eq!(tree.parent_of(PLL, NONE), OSC);
        assert_eq!(tree.frequency(PLL), Some(Hertz(72_000_000)));
        assert_eq!(tree.frequency(OSC_B), None);

        // 7 MHz x 2 = 14 MHz beats 8 MHz x 2 = 16 MHz
        let tree = resolve_default(&graph, Direction::PreferLowest);
        assert_eq!(tree.parent_of(PLL, NONE), OSC_B);
        assert_eq!(tree.frequency(PLL), Some(Hertz(14_000_000)));
        assert_eq!(tree.frequency(BUS), Some(Hertz(1_750_000)));
        assert_eq!(tree.frequency(OSC), None);
    }

    #[test]
    fn roots_without_frequency_are_unavailable() {
        let xtal = ClockId(4);
        let graph = ClockGraph::builder()
            .clock(
                ClockSourceDescriptor::new(xtal, "xtal", Prescaler::multiply(&[1]))
                    .limits(FrequencyLimits::range(4_000_000, 16_000_000)),
                &[],
            )
            .clock(osc(OSC, 8_000_000), &[])
            .clock(pll(), &[xtal, OSC])
            .clock(bus(FrequencyLimits::range(600_000, 14_000_000)), &[PLL])
            .build()
            .unwrap();

        let tree = resolve_default(&graph, Direction::PreferHighest);
        assert!(tree.is_valid());
        assert_eq!(tree.parent_of(PLL, NONE), OSC);
        assert!(!tree.is_used(xtal));

        // 12 MHz x 6 ties with 8 MHz x 9, and the crystal comes first
        let requirements = Requirements::new().exact(xtal, 12.mhz());
        let tree = resolve(&graph, &requirements, Direction::PreferHighest).unwrap();
        assert_eq!(tree.parent_of(PLL, NONE), xtal);
        assert_eq!(tree.frequency(PLL), Some(Hertz(72_000_000)));
        assert_eq!(tree.config_for(PLL).prescaler_value, 6);
    }

    #[test]
    fn inactive_leaves_are_detached() {
        let usb = ClockId(5);
        let graph = ClockGraph::builder()
            .clock(osc(OSC, 8_000_000), &[])
            .clock(pll(), &[OSC])
            .clock(bus(FrequencyLimits::range(600_000, 14_000_000)), &[PLL])
            .clock(
                ClockSourceDescriptor::new(usb, "usb", Prescaler::divide(&[2, 3]).with_divisor(2))
                    .limits(FrequencyLimits::exact(48_000_000))
                    .leaf(Activation::OnRequest),
                &[PLL],
            )
            .build()
            .unwrap();

        let tree = resolve_default(&graph, Direction::PreferHighest);
        assert_eq!(tree.frequency(PLL), Some(Hertz(72_000_000)));
        assert_eq!(tree.config_for(usb), ClockConfig::UNUSED);
        assert_eq!(tree.parent_of(usb, NONE), NONE);

        let requirements = Requirements::new().enable(usb);
        let tree = resolve(&graph, &requirements, Direction::PreferHighest).unwrap();
        assert_eq!(tree.frequency(PLL), Some(Hertz(72_000_000)));
        assert_eq!(tree.frequency(usb), Some(Hertz(48_000_000)));
        assert_eq!(tree.config_for(usb).prescaler_value, 3);
        assert_eq!(tree.config_for(usb).prescaler_divisor, 2);
    }

    fn timer_rule(apb_factor: u32, factor: u32) -> bool {
        if apb_factor == 1 {
            factor == 1
        } else {
            factor == 2
        }
    }

    fn timer_graph(root_hz: u32) -> ClockGraph {
        const APB: ClockId = ClockId(1);
        const TIM: ClockId = ClockId(2);
        ClockGraph::builder()
            .clock(osc(OSC, root_hz), &[])
            .clock(
                ClockSourceDescriptor::new(APB, "apb", Prescaler::divide(&[1, 2, 4, 8, 16]))
                    .limits(FrequencyLimits::at_most(36_000_000)),
                &[OSC],
            )
            .clock(
                ClockSourceDescriptor::new(TIM, "tim", Prescaler::multiply(&[1, 2]))
                    .compatible_with(timer_rule)
                    .leaf(Activation::Always),
                &[APB],
            )
            .build()
            .unwrap()
    }

    #[test]
    fn compatibility_rule_doubles_divided_timers() {
        let tree = resolve_default(&timer_graph(72_000_000), Direction::PreferHighest);
        assert_eq!(tree.frequency(ClockId(1)), Some(Hertz(36_000_000)));
        assert_eq!(tree.config_for(ClockId(2)).prescaler_value, 2);
        assert_eq!(tree.frequency(ClockId(2)), Some(Hertz(72_000_000)));

        let tree = resolve_default(&timer_graph(16_000_000), Direction::PreferHighest);
        assert_eq!(tree.frequency(ClockId(1)), Some(Hertz(16_000_000)));
        assert_eq!(tree.config_for(ClockId(2)).prescaler_value, 1);
        assert_eq!(tree.frequency(ClockId(2)), Some(Hertz(16_000_000)));
    }

    #[test]
    fn compatibility_rule_is_enforced() {
        // 16 MHz x2 would need the APB prescaler at 1, which forbids x2
        let requirements = Requirements::new().exact(ClockId(2), 32.mhz());
        let tree = resolve(
            &timer_graph(16_000_000),
            &requirements,
            Direction::PreferHighest,
        )
        .unwrap();
        assert!(!tree.is_valid());
    }

    #[test]
    fn truncating_dividers_are_pinned() {
        // 7 Hz / 4 and 7 Hz / 5 both truncate to 1 Hz
        let graph = ClockGraph::builder()
            .clock(osc(OSC, 7), &[])
            .clock(
                ClockSourceDescriptor::new(BUS, "bus", Prescaler::divide(&[4, 5]))
                    .leaf(Activation::Always),
                &[OSC],
            )
            .build()
            .unwrap();
        let tree = resolve_default(&graph, Direction::PreferHighest);
        assert!(tree.is_valid());
        assert_eq!(tree.frequency(BUS), Some(Hertz(1)));
        assert_eq!(tree.config_for(BUS).prescaler_value, 4);
    }

    #[test]
    fn no_active_leaves() {
        let graph = ClockGraph::builder()
            .clock(osc(OSC, 8_000_000), &[])
            .clock(pll(), &[OSC])
            .build()
            .unwrap();
        let tree = resolve_default(&graph, Direction::PreferHighest);
        assert!(tree.is_valid());
        assert!(tree.iter().all(|(_, config)| !config.used));
    }

    #[test]
    fn clocks_used_by_one_side_are_not_compared() {
        // osc / 4 = 2 MHz or osc_b = 4 MHz into the mux. The divider goes
        // first in priority but only takes part through the first parent.
        let div = ClockId(6);
        let mux = ClockId(7);
        let graph = ClockGraph::builder()
            .clock(osc(OSC, 8_000_000), &[])
            .clock(osc(OSC_B, 4_000_000), &[])
            .clock(
                ClockSourceDescriptor::new(div, "div", Prescaler::divide(&[4])),
                &[OSC],
            )
            .clock(
                ClockSourceDescriptor::new(mux, "mux", Prescaler::passthrough())
                    .leaf(Activation::Always),
                &[div, OSC_B],
            )
            .priority(&[div, mux])
            .build()
            .unwrap();

        // Counting the unused divider as 0 Hz would keep the first
        // combination here
        let tree = resolve_default(&graph, Direction::PreferHighest);
        assert!(tree.is_valid());
        assert_eq!(tree.parent_of(mux, NONE), OSC_B);
        assert_eq!(tree.frequency(mux), Some(Hertz(4_000_000)));
        assert!(!tree.is_used(div));
        assert!(!tree.is_used(OSC));

        let tree = resolve_default(&graph, Direction::PreferLowest);
        assert_eq!(tree.parent_of(mux, NONE), div);
        assert_eq!(tree.frequency(div), Some(Hertz(2_000_000)));
        assert_eq!(tree.frequency(mux), Some(Hertz(2_000_000)));
    }

    /// root -> /1, /2 -> x2, x4 -> /1, /3 -> leaf. Several paths reach the
    /// lower clocks with the same frequency.
    fn converging_paths() -> ClockGraph {
        ClockGraph::builder()
            .clock(osc(ClockId(0), 8_000_000), &[])
            .clock(
                ClockSourceDescriptor::new(ClockId(1), "p", Prescaler::divide(&[1, 2])),
                &[ClockId(0)],
            )
            .clock(
                ClockSourceDescriptor::new(ClockId(2), "q", Prescaler::multiply(&[2, 4]))
                    .limits(FrequencyLimits::at_most(24_000_000)),
                &[ClockId(1)],
            )
            .clock(
                ClockSourceDescriptor::new(ClockId(3), "x", Prescaler::divide(&[1, 3]))
                    .limits(FrequencyLimits::range(4_000_000, 12_000_000)),
                &[ClockId(2)],
            )
            .clock(
                ClockSourceDescriptor::new(ClockId(4), "y", Prescaler::multiply(&[1, 2]))
                    .compatible_with(timer_rule)
                    .leaf(Activation::Always),
                &[ClockId(3)],
            )
            .priority(&[ClockId(4), ClockId(3)])
            .build()
            .unwrap()
    }

    #[test]
    fn memo_tables_do_not_change_the_result() {
        let graph = converging_paths();
        for &direction in &[Direction::PreferHighest, Direction::PreferLowest] {
            let (limits, active) = Requirements::new().normalize(&graph).unwrap();
            let memoized = Resolver::new(&graph, &limits, active, direction).run();
            let plain = Resolver::new(&graph, &limits, active, direction)
                .without_memo()
                .run();
            assert!(memoized.is_valid());
            assert_eq!(memoized, plain);
        }

        // x /1 keeps y at x1, so 16 MHz / 3 doubled beats 8 MHz
        let tree = resolve_default(&graph, Direction::PreferHighest);
        assert_eq!(tree.frequency(ClockId(4)), Some(Hertz(10_666_666)));
        assert_eq!(tree.frequency(ClockId(3)), Some(Hertz(5_333_333)));
        assert_eq!(tree.config_for(ClockId(3)).prescaler_value, 3);
        assert_eq!(tree.frequency(ClockId(2)), Some(Hertz(16_000_000)));
        assert_eq!(tree.frequency(ClockId(1)), Some(Hertz(8_000_000)));

        let tree = resolve_default(&graph, Direction::PreferLowest);
        assert_eq!(tree.frequency(ClockId(4)), Some(Hertz(8_000_000)));
        assert_eq!(tree.frequency(ClockId(1)), Some(Hertz(4_000_000)));
    }

    #[test]
    fn resolution_is_deterministic() {
        let graph = two_oscillators(8_000_000, 7_000_000);
        let requirements = Requirements::new().max(BUS, 10.mhz());
        let first = resolve(&graph, &requirements, Direction::PreferHighest);
        let second = resolve(&graph, &requirements, Direction::PreferHighest);
        assert_eq!(first, second);
    }

    /// Best (pll, bus) of the scenario graph by exhaustive search
    fn brute_force(root: u32, lo: u32, hi: u32, direction: Direction) -> Option<(u32, u32)> {
        let mut best: Option<(u32, u32)> = None;
        for m in 2..=16u32 {
            let pll = root * m;
            if !(1_000_000..=72_000_000).contains(&pll) {
                continue;
            }
            for &d in &[1u32, 2, 4, 8] {
                let bus = pll / d;
                if bus == 0 || bus < lo || bus > hi {
                    continue;
                }
                let better = match (best, direction) {
                    (None, _) => true,
                    (Some(b), Direction::PreferHighest) => (pll, bus) > b,
                    (Some(b), Direction::PreferLowest) => (pll, bus) < b,
                };
                if better {
                    best = Some((pll, bus));
                }
            }
        }
        best
    }

    fn check_against_brute_force(root_mhz: u8, lo_khz: u16, width_khz: u16, highest: bool) -> TestResult {
        let root = (u32::from(root_mhz) % 16 + 1) * 1_000_000;
        let lo = u32::from(lo_khz) * 1_000 + 1;
        let hi = lo + u32::from(width_khz) * 1_000;
        let direction = if highest {
            Direction::PreferHighest
        } else {
            Direction::PreferLowest
        };

        let graph = ClockGraph::builder()
            .clock(osc(OSC, root), &[])
            .clock(pll(), &[OSC])
            .clock(bus(FrequencyLimits::range(lo, hi)), &[PLL])
            .build()
            .unwrap();
        let tree = resolve_default(&graph, direction);

        let found = if tree.is_valid() {
            Some((tree.frequency(PLL).unwrap().0, tree.frequency(BUS).unwrap().0))
        } else {
            None
        };
        TestResult::from_bool(found == brute_force(root, lo, hi, direction))
    }

    #[test]
    fn matches_exhaustive_search() {
        quickcheck(check_against_brute_force as fn(u8, u16, u16, bool) -> TestResult);
    }

    fn check_soundness(a_mhz: u8, bus_max_khz: u16, b_mhz: u8, highest: bool) -> bool {
        let direction = if highest {
            Direction::PreferHighest
        } else {
            Direction::PreferLowest
        };
        let graph = two_oscillators(
            (u32::from(a_mhz) % 16 + 1) * 1_000_000,
            (u32::from(b_mhz) % 25 + 1) * 1_000_000,
        );
        let requirements =
            Requirements::new().max(BUS, u32::from(bus_max_khz) * 1_000 + 600_000);
        let (limits, _) = requirements.normalize(&graph).unwrap();
        let tree = resolve(&graph, &requirements, direction).unwrap();

        if tree.is_valid() != tree.iter().any(|(_, c)| c.used) {
            return false;
        }
        if tree != resolve(&graph, &requirements, direction).unwrap() {
            return false;
        }

        for (index, id) in graph.ids().enumerate() {
            let config = tree.config_for(id);
            if !config.used {
                continue;
            }
            let descriptor = graph.descriptor(id).unwrap();
            let prescaler = descriptor.prescaler();
            let factor_index = prescaler
                .factors()
                .iter()
                .position(|&f| f == config.prescaler_value)
                .unwrap();
            let incoming = match graph.parents(id).next() {
                None => config.frequency.0,
                Some(_) => tree.config_for(tree.parent_of(id, NONE)).frequency.0,
            };
            if prescaler.child_frequency(incoming, factor_index) != Some(config.frequency.0) {
                return false;
            }
            if !limits[index].is_frequency_ok(config.frequency.0) {
                return false;
            }
        }
        true
    }

    #[test]
    fn used_clocks_are_consistent() {
        quickcheck(check_soundness as fn(u8, u16, u8, bool) -> bool);
    }
}
