
use std::collections::BTreeMap;

use crate::*;

mod chernoff;
mod context;
mod generate;
mod oracle;
mod probability;
mod weight;

/// Generates the raw candidates of the next level from an accepted level.
pub trait CandidateGenerator: Sync {
    /// Returns the deduplicated candidates of size k + 1, sorted, for the accepted itemsets of size k.
    fn generate( &self, level: &Level ) -> Result<Vec<Itemset>>;

    fn strategy( &self ) -> Strategy;

    /// Poisson rate cutoff the generator prunes with, if any
    fn rate_bound( &self ) -> Option<f64> { None }
}

/// Accepted itemsets of one size together with their existential probabilities.
#[derive( Debug, Clone, Default, PartialEq )]
pub struct Level {
    size: usize,
    probabilities: BTreeMap<Itemset, f64>,
}

impl Level {
    pub fn new( size: usize ) -> Level {
	Level{ size, probabilities: BTreeMap::new() }
    }

    /// Records an accepted itemset. Pre: the itemset has the level's size.
    pub(crate) fn accept( &mut self, itemset: Itemset, probability: f64 ) {
	debug_assert_eq!( itemset.len(), self.size );
	self.probabilities.insert( itemset, probability );
    }

    /// Size of every itemset in this level
    pub fn size( &self ) -> usize {
	self.size
    }

    /// Number of accepted itemsets
    pub fn len( &self ) -> usize {
	self.probabilities.len()
    }

    pub fn is_empty( &self ) -> bool {
	self.probabilities.is_empty()
    }

    pub fn itemsets<'a>( &'a self ) -> impl Iterator<Item = &'a Itemset> + 'a {
	self.probabilities.keys()
    }

    pub fn iter<'a>( &'a self ) -> impl Iterator<Item = (&'a Itemset, f64)> + 'a {
	self.probabilities.iter().map( |(itemset, p)| (itemset, *p) )
    }

    pub fn probability( &self, itemset: &Itemset ) -> Option<f64> {
	self.probabilities.get( itemset ).copied()
    }

    pub fn contains( &self, itemset: &Itemset ) -> bool {
	self.probabilities.contains_key( itemset )
    }

    /// All items occurring in some itemset of the level, ascending
    pub fn item_union( &self ) -> Vec<ItemId> {
	let mut items: Vec<ItemId> = self.itemsets().flat_map( |itemset| itemset.iter() ).collect();
	items.sort_unstable();
	items.dedup();
	items
    }
}

impl Loggable for Level {
    fn log( &self, message: &str, level: tracing::Level ) {
	let entries: Vec<String> = self.iter().map( |(itemset, p)| format!( "{itemset}:{p:.4}" )).collect();
	log_at( level, &format!( "{message} (size {}, {} itemsets) {}", self.size, self.len(), entries.join( " " )));
    }
}

pub use chernoff::{ChernoffBoundEstimator, ExtendedFloat, poisson_cdf, poisson_survival};
pub use context::{MiningConfig, RunContext, RunParameters, Strategy};
pub use generate::{StatisticalBoundPruning, WeightOrderPruning};
pub use oracle::{FrequentnessOracle, ScanOutcome};
pub use probability::existential_probability;
pub use weight::WeightTable;
