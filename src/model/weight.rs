
use rustc_hash::FxHashMap;

use crate::data::{Item, ItemId, Itemset};
use crate::error::{MiningError, Result};

/// Weight in (0, 1] for every item, fixed for a run.
#[derive( Debug, Clone, Default )]
pub struct WeightTable {
    weights: FxHashMap<ItemId, f64>,
    /// m, the largest weight
    max_weight: f64,
}

impl WeightTable {

    /// Creates a table from (item, weight) pairs. Later pairs overwrite earlier ones.
    pub fn new <I: IntoIterator<Item = (ItemId, f64)>> ( pairs: I ) -> Result<WeightTable> {
	let mut weights: FxHashMap<ItemId, f64> = FxHashMap::default();
	for (item, weight) in pairs {
	    if !( weight > 0.0 && weight <= 1.0 ) {
		return Err( MiningError::invalid( format!( "weight {weight} of item {item} is outside (0, 1]" )));
	    }
	    weights.insert( item, weight );
	}
	let max_weight = weights.values().copied().fold( 0.0, f64::max );
	Ok( WeightTable{ weights, max_weight } )
    }

    /// Gives every item the same weight
    pub fn uniform( universe: &[ItemId], weight: f64 ) -> Result<WeightTable> {
	WeightTable::new( universe.iter().map( |item| (*item, weight) ))
    }

    pub fn weight( &self, item: ItemId ) -> Option<f64> {
	self.weights.get( &item ).copied()
    }

    pub fn max_weight( &self ) -> f64 {
	self.max_weight
    }

    pub fn len( &self ) -> usize {
	self.weights.len()
    }

    pub fn is_empty( &self ) -> bool {
	self.weights.is_empty()
    }

    pub fn iter<'a>( &'a self ) -> impl Iterator<Item = (ItemId, f64)> + 'a {
	self.weights.iter().map( |(item, weight)| (*item, *weight) )
    }

    /// Mean weight of the itemset's ids.
    pub fn itemset_weight( &self, itemset: &Itemset ) -> Result<f64> {
	self.mean( itemset.iter(), itemset.len() )
    }

    /// Mean weight of item occurrences, e.g. the items of a transaction.
    pub fn items_weight( &self, items: &[Item] ) -> Result<f64> {
	self.mean( items.iter().map( |item| item.id ), items.len() )
    }

    /// Smallest weight among the itemset's members
    pub fn min_weight( &self, itemset: &Itemset ) -> Result<f64> {
	if itemset.is_empty() {
	    return Err( MiningError::ArithmeticDegeneracy );
	}
	itemset.iter()
	    .map( |item| self.lookup( item ))
	    .try_fold( f64::INFINITY, |acc, weight| weight.map( |w| acc.min( w )))
    }

    fn mean <I: Iterator<Item = ItemId>> ( &self, items: I, length: usize ) -> Result<f64> {
	if length == 0 {
	    return Err( MiningError::ArithmeticDegeneracy );
	}
	let mut sum = 0.0;
	for item in items {
	    sum += self.lookup( item )?;
	}
	Ok( sum / length as f64 )
    }

    fn lookup( &self, item: ItemId ) -> Result<f64> {
	self.weight( item ).ok_or_else( || MiningError::invalid( format!( "item {item} has no weight" )))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn table() -> WeightTable {
	WeightTable::new( vec!( (1, 0.2), (2, 0.9), (3, 0.5), (8, 0.35) )).unwrap()
    }

    #[test]
    fn test_rejects_bad_weights() {
	assert!( WeightTable::new( vec!( (1, 0.0) )).is_err() );
	assert!( WeightTable::new( vec!( (1, 1.01) )).is_err() );
	assert!( WeightTable::new( vec!( (1, f64::NAN) )).is_err() );
	assert_eq!( table().max_weight(), 0.9 );
    }

    #[test]
    fn test_singleton_weight_is_exact() {
	let weights = table();
	for (item, weight) in weights.iter() {
	    assert_eq!( weights.itemset_weight( &Itemset::singleton( item )).unwrap(), weight );
	}
    }

    #[test]
    fn test_mean_weight() {
	let weights = table();
	assert_approx!( weights.itemset_weight( &Itemset::new( vec!( 1, 2, 3 ))).unwrap(), 1.6 / 3.0, 1e-12 );
	assert_approx!( weights.min_weight( &Itemset::new( vec!( 2, 3, 8 ))).unwrap(), 0.35, 1e-12 );

	let items = vec!( Item::new( 2, 0.1 ), Item::new( 8, 1.0 ));
	assert_approx!( weights.items_weight( &items ).unwrap(), 0.625, 1e-12 );
	// both views agree
	assert_eq!( weights.items_weight( &items ).unwrap(), weights.itemset_weight( &Itemset::new( vec!( 2, 8 ))).unwrap() );
    }

    #[test]
    fn test_empty_is_degenerate() {
	let weights = table();
	assert!( matches!( weights.itemset_weight( &Itemset::default() ), Err( MiningError::ArithmeticDegeneracy )));
	assert!( matches!( weights.items_weight( &[] ), Err( MiningError::ArithmeticDegeneracy )));
	assert!( matches!( weights.min_weight( &Itemset::default() ), Err( MiningError::ArithmeticDegeneracy )));
	assert!( matches!( weights.itemset_weight( &Itemset::singleton( 42 )), Err( MiningError::InvalidInput( _ ))));
    }
}
