
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::data::{ItemId, Itemset};
use crate::error::Result;

use super::{CandidateGenerator, ChernoffBoundEstimator, Level, RunContext, Strategy};

/// Extends itemsets by items of the level, and by outside items lighter than the whole itemset.
pub struct WeightOrderPruning<'c, 'a> {
    context: &'c RunContext<'a>,
}

/// Weight order pruning that also requires the expected supports to clear a Poisson rate bound.
pub struct StatisticalBoundPruning<'c, 'a> {
    context: &'c RunContext<'a>,
    /// mu*
    bound: f64,
}

/// Accepted itemset about to be extended
struct Base<'l> {
    itemset: &'l Itemset,
    min_weight: f64,
    /// mu_X, sum of the item support rates
    rate: f64,
}

#[derive( Debug, Clone, Copy, PartialEq, Eq )]
enum Branch {
    /// the new item occurs somewhere in the level
    WithinLevel,
    OutsideLevel,
}

impl <'l> Base<'l> {
    fn new( context: &RunContext, itemset: &'l Itemset ) -> Result<Base<'l>> {
	Ok( Base{
	    itemset,
	    min_weight: context.weights().min_weight( itemset )?,
	    rate: itemset.iter().map( |item| context.support_rate( item )).sum(),
	})
    }
}

/// Extends every itemset of the level by one item, keeping the extensions admitted and
/// with weight at least t. Bases are extended in parallel, duplicates collapse.
fn extend_level<F>( context: &RunContext, level: &Level, admit: F ) -> Result<Vec<Itemset>> where
    F: Fn( &Base, ItemId, Branch ) -> bool + Sync,
{
    let within = level.item_union();
    let outside: Vec<ItemId> = context.universe().iter()
	.copied()
	.filter( |item| within.binary_search( item ).is_err() )
	.collect();
    let bases: Vec<&Itemset> = level.itemsets().collect();

    let extensions = bases.par_iter()
	.map( |itemset| -> Result<Vec<Itemset>> {
	    let base = Base::new( context, itemset )?;
	    extend_base( context, &base, &within, &outside, &admit )
	})
	.collect::<Result<Vec<_>>>()?;
    let unique: FxHashSet<Itemset> = extensions.into_par_iter().flatten().collect();

    let mut candidates: Vec<Itemset> = unique.into_iter().collect();
    candidates.sort_unstable();
    Ok( candidates )
}

fn extend_base<F>( context: &RunContext, base: &Base, within: &[ItemId], outside: &[ItemId], admit: &F ) -> Result<Vec<Itemset>> where
    F: Fn( &Base, ItemId, Branch ) -> bool,
{
    let threshold = context.parameters().threshold();
    let items = within.iter().map( |item| (*item, Branch::WithinLevel) )
	.chain( outside.iter().map( |item| (*item, Branch::OutsideLevel) ))
	.filter( |(item, _)| !base.itemset.contains( *item ));

    let mut extensions = Vec::new();
    for (item, branch) in items {
	if !admit( base, item, branch ) {
	    continue;
	}
	let candidate = base.itemset.with_item( item );
	if context.weights().itemset_weight( &candidate )? >= threshold {
	    extensions.push( candidate );
	}
    }
    Ok( extensions )
}

/// Outside items must be strictly lighter than every member of the base
fn weight_order( context: &RunContext, base: &Base, item: ItemId, branch: Branch ) -> bool {
    match branch {
	Branch::WithinLevel => true,
	Branch::OutsideLevel => context.weight( item ) < base.min_weight,
    }
}

impl <'c, 'a> WeightOrderPruning<'c, 'a> {
    pub fn new( context: &'c RunContext<'a> ) -> WeightOrderPruning<'c, 'a> {
	WeightOrderPruning{ context }
    }
}

impl <'c, 'a> CandidateGenerator for WeightOrderPruning<'c, 'a> {
    fn generate( &self, level: &Level ) -> Result<Vec<Itemset>> {
	let context = self.context;
	extend_level( context, level, |base, item, branch| weight_order( context, base, item, branch ))
    }

    fn strategy( &self ) -> Strategy {
	Strategy::WeightOrder
    }
}

impl <'c, 'a> StatisticalBoundPruning<'c, 'a> {
    /// Computes mu* for the run. The bound is reused for every level.
    pub fn new( context: &'c RunContext<'a> ) -> Result<StatisticalBoundPruning<'c, 'a>> {
	let bound = ChernoffBoundEstimator::from_context( context )?.compute_mu()?;
	debug!( "statistical bound pruning with mu* = {bound:.6}" );
	Ok( StatisticalBoundPruning::with_bound( context, bound ))
    }

    /// Uses a known mu*
    pub fn with_bound( context: &'c RunContext<'a>, bound: f64 ) -> StatisticalBoundPruning<'c, 'a> {
	StatisticalBoundPruning{ context, bound }
    }

    fn clears_bound( &self, base: &Base, item: ItemId ) -> bool {
	let item_rate = self.context.support_rate( item );
	let joint_cutoff = self.context.parameters().alpha() * self.context.len() as f64 * self.bound;
	base.rate.min( item_rate ) >= self.bound && base.rate * item_rate >= joint_cutoff
    }
}

impl <'c, 'a> CandidateGenerator for StatisticalBoundPruning<'c, 'a> {
    fn generate( &self, level: &Level ) -> Result<Vec<Itemset>> {
	let context = self.context;
	extend_level( context, level, |base, item, branch| {
	    self.clears_bound( base, item ) && weight_order( context, base, item, branch )
	})
    }

    fn strategy( &self ) -> Strategy {
	Strategy::StatisticalBound
    }

    fn rate_bound( &self ) -> Option<f64> {
	Some( self.bound )
    }
}
