//! `converge facts` - show the facts a run would see.

use anyhow::Result;

use crate::cli::FactsArgs;
use crate::facts;

pub fn run(args: &FactsArgs) -> Result<()> {
    let store = facts::assemble(args.facts.as_deref())?;
    print!("{}", facts::to_toml(&store));
    Ok(())
}
