//! Per-card art and text commands.

use shardforge_utils::error::{ForgeError, GenerationOp};

use super::common::{AppContext, print_pass_report};

/// `images`: generate art for every pending card.
pub async fn execute_images_command(ctx: &AppContext) -> Result<(), ForgeError> {
    let orchestrator = ctx.orchestrator(GenerationOp::CardImage)?;
    let mut lock = ctx.session_lock()?;
    let _guard = ctx.acquire(&mut lock)?;

    let mut session = ctx.store.load()?;
    let report = orchestrator
        .run_image_pass(&session.theme.title, &mut session.game)
        .await;
    ctx.store.save(&session)?;
    print_pass_report(&report, ctx.ledger.balance());
    Ok(())
}

/// `retry <id>`: one more attempt at a card's art.
pub async fn execute_retry_command(ctx: &AppContext, card_id: &str) -> Result<(), ForgeError> {
    let orchestrator = ctx.orchestrator(GenerationOp::CardImage)?;
    let mut lock = ctx.session_lock()?;
    let _guard = ctx.acquire(&mut lock)?;

    let mut session = ctx.store.load()?;
    let result = orchestrator
        .retry_card_image(&session.theme.title, &mut session.game, card_id)
        .await;
    ctx.store.save(&session)?;
    result?;

    let card = session.game.card(card_id)?;
    println!("✓ Image generated for \"{}\"", card.name);
    println!("Shards remaining: {}", ctx.ledger.balance());
    Ok(())
}

/// `regenerate <id>`: new stats, ability and art for a card.
///
/// Succeeds once the text is replaced; an image failure afterwards is
/// reported but does not undo the text.
pub async fn execute_regenerate_command(ctx: &AppContext, card_id: &str) -> Result<(), ForgeError> {
    let orchestrator = ctx.orchestrator(GenerationOp::CardText)?;
    let mut lock = ctx.session_lock()?;
    let _guard = ctx.acquire(&mut lock)?;

    let mut session = ctx.store.load()?;
    let result = orchestrator
        .regenerate_card(&session.theme, &mut session.game, card_id)
        .await;
    ctx.store.save(&session)?;
    let outcome = result?;

    let card = session.game.card(card_id)?;
    println!("✓ Regenerated \"{}\": {}", card.name, card.ability);
    if let Some(err) = &outcome.image_error {
        eprint!("{}", err.display_for_user());
    } else {
        println!("✓ Image generated");
    }
    println!("Shards remaining: {}", ctx.ledger.balance());
    Ok(())
}
