
use std::fmt;
use std::iter::FromIterator;

use bit_set::BitSet;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::error::{MiningError, Result};
use crate::io::produce_fimi;

pub mod synthetic;

pub type ItemId = usize;
pub type Count = u64;

/// Number of transactions one worker counts before its partial counts are merged.
const SCAN_CHUNK: usize = 512;

/// An item occurrence with the probability that it is really present in its transaction.
#[derive( Debug, Clone, Copy, PartialEq, Serialize )]
pub struct Item {
    pub id: ItemId,
    pub probability: f64,
}

/// Set of distinct item ids in ascending order.
#[derive( Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize )]
#[serde( transparent )]
pub struct Itemset( Vec<ItemId> );

/// Transaction of uncertain items.
#[derive( Debug, Clone )]
pub struct Transaction {
    /// sorted by id, ids are unique
    items: Vec<Item>,
    /// ids of all items, for containment checks without search
    members: BitSet,
}

/// Ordered sequence of uncertain transactions. Read-only once built.
#[derive( Debug, Clone )]
pub struct UncertainDatabase {
    transactions: Vec<Transaction>,
    /// all distinct item ids, ascending
    universe: Vec<ItemId>,
}

impl Item {
    pub fn new( id: ItemId, probability: f64 ) -> Item {
	Item{ id, probability }
    }

    pub fn certain( id: ItemId ) -> Item {
	Item{ id, probability: 1.0 }
    }
}

impl Itemset {
    /// Creates the canonical itemset of the given ids. Duplicates collapse.
    pub fn new <I: IntoIterator<Item = ItemId>> ( items: I ) -> Itemset {
	let mut items: Vec<ItemId> = items.into_iter().collect();
	items.sort_unstable();
	items.dedup();
	Itemset( items )
    }

    pub fn singleton( item: ItemId ) -> Itemset {
	Itemset( vec!( item ))
    }

    pub fn len( &self ) -> usize {
	self.0.len()
    }

    pub fn is_empty( &self ) -> bool {
	self.0.is_empty()
    }

    pub fn items( &self ) -> &[ItemId] {
	&self.0
    }

    pub fn iter<'a>( &'a self ) -> impl Iterator<Item = ItemId> + 'a {
	self.0.iter().copied()
    }

    pub fn contains( &self, item: ItemId ) -> bool {
	self.0.binary_search( &item ).is_ok()
    }

    /// Returns the union of this itemset with the single item.
    pub fn with_item( &self, item: ItemId ) -> Itemset {
	let mut items = self.0.clone();
	if let Err( position ) = items.binary_search( &item ) {
	    items.insert( position, item );
	}
	Itemset( items )
    }
}

impl FromIterator<ItemId> for Itemset {
    fn from_iter<I: IntoIterator<Item = ItemId>>( iter: I ) -> Self {
	Itemset::new( iter )
    }
}

impl fmt::Display for Itemset {
    fn fmt( &self, f: &mut fmt::Formatter<'_> ) -> fmt::Result {
	write!( f, "{}", produce_fimi( self.iter(), "{", " ", "}" ))
    }
}

impl Transaction {
    /// Creates a transaction. Probabilities must lie in (0, 1] and ids must be unique.
    pub fn new( mut items: Vec<Item> ) -> Result<Transaction> {
	items.sort_unstable_by_key( |item| item.id );
	let mut members = BitSet::with_capacity( items.last().map_or( 0, |item| item.id + 1 ));
	for item in &items {
	    if !( item.probability > 0.0 && item.probability <= 1.0 ) {
		return Err( MiningError::invalid( format!( "existence probability {} of item {} is outside (0, 1]", item.probability, item.id )));
	    }
	    if !members.insert( item.id ) {
		return Err( MiningError::invalid( format!( "item {} occurs twice in one transaction", item.id )));
	    }
	}
	Ok( Transaction{ items, members } )
    }

    pub fn len( &self ) -> usize {
	self.items.len()
    }

    pub fn is_empty( &self ) -> bool {
	self.items.is_empty()
    }

    pub fn items( &self ) -> &[Item] {
	&self.items
    }

    pub fn contains( &self, item: ItemId ) -> bool {
	self.members.contains( item )
    }

    /// Checks whether every item of the itemset occurs, regardless of probability
    pub fn contains_all( &self, itemset: &Itemset ) -> bool {
	itemset.len() <= self.len() && itemset.iter().all( |item| self.members.contains( item ))
    }

    pub fn probability_of( &self, item: ItemId ) -> Option<f64> {
	if !self.members.contains( item ) {
	    return None;
	}
	self.items.binary_search_by_key( &item, |itm| itm.id )
	    .ok()
	    .map( |index| self.items[ index ].probability )
    }

    /// Probability that all items of the itemset are present in this transaction.
    pub fn presence_probability( &self, itemset: &Itemset ) -> f64 {
	// cannot hold more items than the transaction has
	if itemset.len() > self.len() {
	    return 0.0;
	}
	let mut probability = 1.0;
	for item in itemset.iter() {
	    match self.probability_of( item ) {
		Some( p ) => probability *= p,
		None => return 0.0,
	    }
	}
	probability
    }
}

impl UncertainDatabase {

    pub fn new( transactions: Vec<Transaction> ) -> UncertainDatabase {
	let mut universe: Vec<ItemId> = transactions.iter()
	    .flat_map( |t| t.items.iter().map( |item| item.id ))
	    .collect();
	universe.sort_unstable();
	universe.dedup();
	UncertainDatabase{ transactions, universe }
    }

    /// Builds a database from rows of (id, probability) pairs.
    pub fn from_rows <R, I> ( rows: R ) -> Result<UncertainDatabase> where
	R: IntoIterator<Item = I>,
	I: IntoIterator<Item = (ItemId, f64)>,
    {
	let transactions = rows.into_iter()
	    .map( |row| Transaction::new( row.into_iter().map( |(id, p)| Item::new( id, p )).collect() ))
	    .collect::<Result<Vec<Transaction>>>()?;
	Ok( UncertainDatabase::new( transactions ))
    }

    /// Builds a database where every item is present with certainty.
    pub fn from_certain <R, I> ( rows: R ) -> Result<UncertainDatabase> where
	R: IntoIterator<Item = I>,
	I: IntoIterator<Item = ItemId>,
    {
	UncertainDatabase::from_rows( rows.into_iter().map( |row| row.into_iter().map( |id| (id, 1.0) ).collect::<Vec<_>>() ))
    }

    /// Number of transactions
    pub fn len( &self ) -> usize {
	self.transactions.len()
    }

    pub fn is_empty( &self ) -> bool {
	self.transactions.is_empty()
    }

    pub fn transactions( &self ) -> &[Transaction] {
	&self.transactions
    }

    pub fn universe( &self ) -> &[ItemId] {
	&self.universe
    }

    /// Counts the transactions containing each item.
    pub fn item_supports( &self ) -> FxHashMap<ItemId, Count> {
	let mut counts: FxHashMap<ItemId, Count> = FxHashMap::default();
	for transaction in &self.transactions {
	    for item in transaction.items() {
		*counts.entry( item.id ).or_insert( 0 ) += 1;
	    }
	}
	counts
    }

    /// Returns the number of transactions containing all items of the query
    pub fn query_support( &self, query: &Itemset ) -> Count {
	self.transactions.iter().filter( |t| t.contains_all( query )).count() as Count
    }

    /// Counts the support of every candidate in a single scan.
    /// The scan is split into transaction ranges whose partial counts are summed.
    pub fn count_supports( &self, candidates: &[Itemset] ) -> Vec<Count> {
	let empty = || vec!( 0; candidates.len() );
	self.transactions.par_chunks( SCAN_CHUNK )
	    .map( |chunk| {
		let mut counts = empty();
		for transaction in chunk {
		    for (count, candidate) in counts.iter_mut().zip( candidates ) {
			if transaction.contains_all( candidate ) {
			    *count += 1;
			}
		    }
		}
		counts
	    })
	    .reduce( empty, |mut left, right| {
		for (l, r) in left.iter_mut().zip( right ) {
		    *l += r;
		}
		left
	    })
    }
}
