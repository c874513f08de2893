
//! Synthetic existence probabilities, weights and transactions for test data.

use rand::Rng;
use rand::distributions::Distribution;
use statrs::distribution::{Normal, Uniform};

use crate::error::{MiningError, Result};
use crate::model::WeightTable;

use super::{Item, ItemId, Transaction, UncertainDatabase};

/// Draws existence probabilities from N(0.5, 0.125) rounded to one decimal
pub struct ProbabilityAssigner {
    distribution: Normal,
}

impl ProbabilityAssigner {
    pub fn new() -> ProbabilityAssigner {
	ProbabilityAssigner{
	    distribution: Normal::new( 0.5, f64::sqrt( 0.125 )).expect( "constant parameters are valid" ),
	}
    }

    /// Returns a probability in (0, 1]
    pub fn draw <R: Rng> ( &self, rng: &mut R ) -> f64 {
	let probability = ( self.distribution.sample( rng ) * 10.0 ).round() / 10.0;
	if probability > 1.0 {
	    1.0
	} else if probability <= 0.0 {
	    // zero would mean the item is not there at all
	    0.1
	} else {
	    probability
	}
    }

    /// Attaches a drawn probability to every item of the rows.
    pub fn assign <R: Rng> ( &self, rows: &[Vec<ItemId>], rng: &mut R ) -> Result<UncertainDatabase> {
	let transactions = rows.iter()
	    .map( |row| Transaction::new( row.iter().map( |id| Item::new( *id, self.draw( rng ))).collect() ))
	    .collect::<Result<Vec<Transaction>>>()?;
	Ok( UncertainDatabase::new( transactions ))
    }
}

impl Default for ProbabilityAssigner {
    fn default() -> Self {
	ProbabilityAssigner::new()
    }
}

/// Draws a weight in [0.1, 1] for every item of the universe.
pub fn generate_weight_table <R: Rng> ( universe: &[ItemId], rng: &mut R ) -> Result<WeightTable> {
    let distribution = Uniform::new( 0.1, 1.0 ).map_err( |e| MiningError::invalid( e.to_string() ))?;
    WeightTable::new( universe.iter().map( |item| (*item, distribution.sample( rng ))))
}

/// Generates transactions over items 0..universe_size.
/// Lower items are more frequent: item i occurs with probability 2 * density * (1 - i / universe_size), capped at 1.
pub fn generate_transactions <R: Rng> ( number_transactions: usize, universe_size: usize, density: f64, rng: &mut R ) -> Vec<Vec<ItemId>> {
    let frequencies: Vec<f64> = ( 0 .. universe_size )
	.map( |i| ( 2.0 * density * ( 1.0 - i as f64 / universe_size as f64 )).clamp( 0.0, 1.0 ))
	.collect();
    ( 0 .. number_transactions )
	.map( |_| {
	    frequencies.iter().enumerate()
		.filter( |(_, frequency)| rng.gen_bool( **frequency ))
		.map( |(item, _)| item )
		.collect()
	})
	.collect()
}
