
use serde::ser::SerializeStruct;
use serde::Serialize;

use crate::*;
use crate::io::{PrettyFormatter, produce_fimi};

use super::{LevelDiagnostics, MiningResult};

/// Plain text report of a mining result
pub struct MiningReportFormatter<'w> {
    show_itemsets: bool,
    weights: Option<&'w WeightTable>,
}

impl <'w> PrettyFormatter<MiningResult> for MiningReportFormatter<'w> {

    fn format_pretty( &self, result: &MiningResult ) -> String {
	let mut output = String::new();
	output.push( '\n' ); // so output begins on a new line

	let parameters = result.parameters();
	output = join_lines( output, format!( "strategy:    {}", result.strategy() ));
	output = join_lines( output, format!( "minsup:      {}", parameters.minsup() ));
	output = join_lines( output, format!( "threshold:   {}", parameters.threshold() ));
	if let Some( bound ) = result.rate_bound() {
	    output = join_lines( output, format!( "mu*:         {bound:.6}" ));
	}
	output = join_lines( output, format!( "itemsets:    {}", result.itemset_count() ));
	output = join_lines( output, format!( "termination: {:?} after {:.3}s", result.termination(), result.elapsed().as_secs_f64() ));

	output = join_lines( output, format!( "{:>4} {:>10} {:>10} {:>10} {:>10}", "k", "generated", "counted", "accepted", "ms" ));
	output = result.diagnostics().iter()
	    .map( format_diagnostics )
	    .fold( output, join_lines );

	if self.show_itemsets {
	    output = result.iter()
		.map( |(itemset, probability)| {
		    let weight = self.weights.and_then( |weights| weights.itemset_weight( itemset ).ok() );
		    format_itemset( itemset, probability, weight )
		}).fold( output, join_lines );
	}
	output
    }
}

impl Serialize for Level {
    fn serialize<S>( &self, serializer: S ) -> std::result::Result<S::Ok, S::Error> where S: serde::Serializer {
	#[derive( Serialize )]
	struct Record<'l> {
	    items: &'l Itemset,
	    probability: f64,
	}
	serializer.collect_seq( self.iter().map( |(items, probability)| Record{ items, probability } ))
    }
}

impl Serialize for LevelDiagnostics {
    fn serialize<S>( &self, serializer: S ) -> std::result::Result<S::Ok, S::Error> where S: serde::Serializer {
	let mut state = serializer.serialize_struct( "LevelDiagnostics", 5 )?;
	state.serialize_field( "size", &self.size )?;
	state.serialize_field( "generated", &self.generated )?;
	state.serialize_field( "counted", &self.counted )?;
	state.serialize_field( "accepted", &self.accepted )?;
	state.serialize_field( "elapsed_ms", &( self.elapsed.as_secs_f64() * 1000.0 ))?;
	state.end()
    }
}

impl Serialize for MiningResult {
    fn serialize<S>( &self, serializer: S ) -> std::result::Result<S::Ok, S::Error> where S: serde::Serializer {
	let mut state = serializer.serialize_struct( "MiningResult", 7 )?;
	state.serialize_field( "parameters", &self.parameters )?;
	state.serialize_field( "strategy", &self.strategy )?;
	state.serialize_field( "rate_bound", &self.rate_bound )?;
	state.serialize_field( "levels", &self.levels )?;
	state.serialize_field( "diagnostics", &self.diagnostics )?;
	state.serialize_field( "termination", &self.termination )?;
	state.serialize_field( "elapsed_ms", &( self.elapsed.as_secs_f64() * 1000.0 ))?;
	state.end()
    }
}

fn format_diagnostics( diagnostics: &LevelDiagnostics ) -> String {
    format!( "{:>4} {:>10} {:>10} {:>10} {:>10.3}",
	     diagnostics.size, diagnostics.generated, diagnostics.counted, diagnostics.accepted,
	     diagnostics.elapsed.as_secs_f64() * 1000.0 )
}

fn format_itemset( itemset: &Itemset, probability: f64, weight: Option<f64> ) -> String {
    let items = produce_fimi( itemset.iter(), "", " ", "" );
    match weight {
	Some( weight ) => format!( "{items}:  {probability:.4}  w {weight:.3}" ),
	None => format!( "{items}:  {probability:.4}" ),
    }
}

fn join_lines( mut accumulator: String, addition: String ) -> String {
    accumulator.push_str( addition.as_str() );
    accumulator.push( '\n' );
    accumulator
}

impl <'w> MiningReportFormatter<'w> {
    pub fn new() -> MiningReportFormatter<'w> {
	MiningReportFormatter{
	    show_itemsets: false,
	    weights: None,
	}
    }

    pub fn show_itemsets( &mut self ) { self.show_itemsets = true; }

    /// Prints the weight next to every itemset
    pub fn with_weights( &mut self, weights: &'w WeightTable ) { self.weights = Some( weights ); }
}

impl <'w> Default for MiningReportFormatter<'w> {
    fn default() -> Self {
	MiningReportFormatter::new()
    }
}
