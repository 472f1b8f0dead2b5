use shardforge_engine::validate_set_request;
use shardforge_utils::error::{ForgeError, GenerationOp};
use tracing::info;

use super::common::{AppContext, print_pass_report};

/// `generate`: build a fresh set for the current theme, then run the image
/// pass unless `no_images` is set.
pub async fn execute_generate_command(
    ctx: &AppContext,
    cards: Option<u32>,
    no_images: bool,
) -> Result<(), ForgeError> {
    let card_count = cards.unwrap_or_else(|| ctx.config.card_count());
    let mut lock = ctx.session_lock()?;
    let _guard = ctx.acquire(&mut lock)?;

    let mut session = ctx.store.load()?;
    // Input problems are reported before the backend is set up.
    validate_set_request(&session.theme, card_count, ctx.config.max_cards())?;
    let orchestrator = ctx.orchestrator(GenerationOp::GameSet)?;
    let result = orchestrator
        .generate_game_set(&session.theme, card_count, &mut session.game)
        .await;
    ctx.store.save(&session)?;
    result?;

    println!(
        "✓ Generated \"{}\": rules and {} cards",
        session.game.set_name,
        session.game.cards.len()
    );

    if no_images {
        info!("Image pass skipped");
        println!("Run 'shardforge images' to generate card art.");
        return Ok(());
    }

    let report = orchestrator
        .run_image_pass(&session.theme.title, &mut session.game)
        .await;
    ctx.store.save(&session)?;
    print_pass_report(&report, ctx.ledger.balance());
    Ok(())
}
