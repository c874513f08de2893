
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use rand::Rng;

use crate::data::synthetic::ProbabilityAssigner;
use crate::data::{Item, ItemId, Transaction, UncertainDatabase};
use crate::error::{MiningError, Result};
use crate::model::WeightTable;

/// Converts a structure into a string
pub trait PrettyFormatter<T> {
    fn format_pretty( &self, object: &T ) -> String;
}

/// Reads an uncertain database in FIMI format. Items without an explicit probability get one from the assigner.
pub fn read_uncertain_database<P: AsRef<Path>, R: Rng>( path: P, assigner: &ProbabilityAssigner, rng: &mut R ) -> Result<UncertainDatabase> {
    let file = File::open( path )?;
    load_uncertain_database( BufReader::new( file ), assigner, rng )
}

/// Parses one transaction per line, tokens are `id` or `id:probability`
pub fn load_uncertain_database<B: BufRead, R: Rng>( reader: B, assigner: &ProbabilityAssigner, rng: &mut R ) -> Result<UncertainDatabase> {
    let mut transactions = Vec::new();
    for (index, line) in reader.lines().enumerate() {
	let line = line?;
	let number = index + 1;
	if is_skipped( &line ) {
	    continue;
	}
	let mut items = Vec::new();
	for token in line.split_whitespace() {
	    let item = match token.split_once( ':' ) {
		Some( (id, probability) ) => Item::new( parse_id( id, number )?, parse_number( probability, number )? ),
		None => Item::new( parse_id( token, number )?, assigner.draw( rng )),
	    };
	    items.push( item );
	}
	let transaction = Transaction::new( items ).map_err( |err| parse_error( number, err.to_string() ))?;
	transactions.push( transaction );
    }
    Ok( UncertainDatabase::new( transactions ))
}

/// Reads item weights, one `id weight` pair per line
pub fn read_weight_table<P: AsRef<Path>>( path: P ) -> Result<WeightTable> {
    let file = File::open( path )?;
    load_weight_table( BufReader::new( file ))
}

pub fn load_weight_table<B: BufRead>( reader: B ) -> Result<WeightTable> {
    let mut pairs: Vec<(ItemId, f64)> = Vec::new();
    for (index, line) in reader.lines().enumerate() {
	let line = line?;
	let number = index + 1;
	if is_skipped( &line ) {
	    continue;
	}
	let tokens: Vec<&str> = line.split_whitespace().collect();
	if tokens.len() != 2 {
	    return Err( parse_error( number, format!( "expected 'id weight', found '{}'", line.trim() )));
	}
	let id = parse_id( tokens[0], number )?;
	let weight = parse_number( tokens[1], number )?;
	if !( weight > 0.0 && weight <= 1.0 ) {
	    return Err( parse_error( number, format!( "weight {weight} is outside (0, 1]" )));
	}
	pairs.push( (id, weight) );
    }
    WeightTable::new( pairs )
}

/// Creates a fimi string from an iterator over items
pub fn produce_fimi<I: Iterator<Item = ItemId>>( items: I, left_delimiter: &str, separator: &str, right_delimiter: &str ) -> String {
    let mut fimi = String::new();
    fimi.push_str( left_delimiter );
    for (i, item) in items.enumerate() {
	if i > 0 {
	    fimi.push_str( separator );
	}
	fimi.push_str( item.to_string().as_str() );
    }
    fimi.push_str( right_delimiter );
    fimi
}

/// Empty lines and comment or header lines of common dataset formats
fn is_skipped( line: &str ) -> bool {
    let line = line.trim();
    line.is_empty() || line.starts_with( '#' ) || line.starts_with( '%' ) || line.starts_with( '@' )
}

fn parse_id( token: &str, line: usize ) -> Result<ItemId> {
    token.parse::<ItemId>().map_err( |err| parse_error( line, format!( "item id '{token}': {err}" )))
}

fn parse_number( token: &str, line: usize ) -> Result<f64> {
    token.parse::<f64>().map_err( |err| parse_error( line, format!( "number '{token}': {err}" )))
}

fn parse_error( line: usize, message: String ) -> MiningError {
    MiningError::Parse{ line, message }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use crate::data::Itemset;

    #[test]
    fn test_load_database() {
	let text = "# header\n1:0.5 2:1.0 7:0.25\n\n% comment\n2:0.9\n@attribute\n3 4:0.3\n";
	let mut rng = StdRng::seed_from_u64( 3 );
	let database = load_uncertain_database( text.as_bytes(), &ProbabilityAssigner::new(), &mut rng ).unwrap();
	assert_eq!( database.len(), 3 );
	assert_eq!( database.universe(), &[1, 2, 3, 4, 7] );
	assert_eq!( database.transactions()[0].probability_of( 7 ), Some( 0.25 ));
	assert_eq!( database.query_support( &Itemset::singleton( 2 )), 2 );
	// drawn probabilities are valid
	let drawn = database.transactions()[2].probability_of( 3 ).unwrap();
	assert!( drawn > 0.0 && drawn <= 1.0 );
    }

    #[test]
    fn test_load_database_errors() {
	let mut rng = StdRng::seed_from_u64( 3 );
	let assigner = ProbabilityAssigner::new();
	let bad_id = load_uncertain_database( "1 2\nx:0.5\n".as_bytes(), &assigner, &mut rng );
	assert!( matches!( bad_id, Err( MiningError::Parse{ line: 2, .. } )));
	let bad_probability = load_uncertain_database( "1:1.5\n".as_bytes(), &assigner, &mut rng );
	assert!( matches!( bad_probability, Err( MiningError::Parse{ line: 1, .. } )));
	let duplicate = load_uncertain_database( "1\n\n3:0.5 3:0.2\n".as_bytes(), &assigner, &mut rng );
	assert!( matches!( duplicate, Err( MiningError::Parse{ line: 3, .. } )));
	assert!( matches!( read_uncertain_database( "/nonexistent/data.fimi", &assigner, &mut rng ), Err( MiningError::Io( _ ))));
    }

    #[test]
    fn test_load_weights() {
	let weights = load_weight_table( "# id weight\n1 0.5\n2   1.0\n".as_bytes() ).unwrap();
	assert_eq!( weights.len(), 2 );
	assert_eq!( weights.weight( 2 ), Some( 1.0 ));
	assert!( matches!( load_weight_table( "1 0.5\n2\n".as_bytes() ), Err( MiningError::Parse{ line: 2, .. } )));
	assert!( matches!( load_weight_table( "1 0\n".as_bytes() ), Err( MiningError::Parse{ line: 1, .. } )));
    }

    #[test]
    fn test_produce_fimi() {
	assert_eq!( produce_fimi( vec!( 1, 2, 3 ).into_iter(), "{", " ", "}" ), "{1 2 3}" );
	assert_eq!( produce_fimi( Vec::new().into_iter(), "", ",", "" ), "" );
    }
}
