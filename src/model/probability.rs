
use crate::data::{Count, Itemset, UncertainDatabase};

/// Probability that at least minsup transactions contain every item of the itemset.
///
/// Runs the support count distribution over the transactions, keeping counts 0..minsup only.
/// The last cell absorbs all counts of at least minsup, so the work is O(n * minsup).
/// Pre: the itemset is not empty.
pub fn existential_probability( database: &UncertainDatabase, itemset: &Itemset, minsup: Count ) -> f64 {
    debug_assert!( !itemset.is_empty() );
    if minsup == 0 {
	return 1.0;
    }
    let minsup = minsup as usize;
    if minsup > database.len() {
	return 0.0;
    }

    // distribution[k] = Pr( exactly k of the transactions so far contain the itemset ), k < minsup
    // distribution[minsup] = Pr( at least minsup do )
    let mut distribution = vec!( 0.0; minsup + 1 );
    distribution[0] = 1.0;

    for (j, transaction) in database.transactions().iter().enumerate() {
	let p = transaction.presence_probability( itemset );
	if p == 0.0 {
	    continue;
	}
	let q = 1.0 - p;
	// after j + 1 transactions no count above j + 1 is possible
	let top = minsup.min( j + 1 );
	if top == minsup {
	    distribution[minsup] += p * distribution[minsup - 1];
	}
	for k in ( 1 .. top.min( minsup - 1 ) + 1 ).rev() {
	    distribution[k] = q * distribution[k] + p * distribution[k - 1];
	}
	distribution[0] *= q;
    }
    distribution[minsup].clamp( 0.0, 1.0 )
}
