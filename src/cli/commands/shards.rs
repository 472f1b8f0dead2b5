use shardforge_utils::error::ForgeError;

use super::common::AppContext;

/// `shards`: print the balance.
pub fn execute_shards_command(ctx: &AppContext) -> Result<(), ForgeError> {
    println!("{}", ctx.ledger.balance());
    Ok(())
}

/// `shards add <n>`: promotional credit.
pub fn execute_shards_add_command(ctx: &AppContext, amount: u64) -> Result<(), ForgeError> {
    let mut lock = ctx.session_lock()?;
    let _guard = ctx.acquire(&mut lock)?;

    let balance = ctx.ledger.add_promotional(amount);
    println!("✓ Added {amount} shards. Balance: {balance}");
    Ok(())
}
