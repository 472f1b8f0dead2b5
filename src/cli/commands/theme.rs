use shardforge_engine::Theme;
use shardforge_utils::error::{ForgeError, GenerationOp};

use super::common::AppContext;

/// `theme`: replace the theme with a suggested one.
///
/// The theme is saved even on failure, so a failed suggestion leaves every
/// field empty.
pub async fn execute_theme_command(ctx: &AppContext) -> Result<(), ForgeError> {
    let orchestrator = ctx.orchestrator(GenerationOp::InitialTheme)?;
    let mut lock = ctx.session_lock()?;
    let _guard = ctx.acquire(&mut lock)?;

    let mut session = ctx.store.load()?;
    let result = orchestrator.load_initial_theme(&mut session.theme).await;
    ctx.store.save(&session)?;
    result?;

    println!("✓ New theme suggested\n");
    print_theme(&session.theme);
    Ok(())
}

/// Field edits for `theme set`; `None` keeps the current value.
#[derive(Debug, Default)]
pub struct ThemeEdits {
    pub title: Option<String>,
    pub description: Option<String>,
    pub set_name: Option<String>,
    pub factions: Option<String>,
    pub locations: Option<String>,
    pub resources: Option<String>,
}

impl ThemeEdits {
    fn apply(self, theme: &mut Theme) {
        let fields = [
            (self.title, &mut theme.title),
            (self.description, &mut theme.description),
            (self.set_name, &mut theme.set_name),
            (self.factions, &mut theme.factions),
            (self.locations, &mut theme.locations),
            (self.resources, &mut theme.resources),
        ];
        for (edit, field) in fields {
            if let Some(value) = edit {
                *field = value;
            }
        }
    }
}

/// `theme set`: edit individual theme fields.
pub fn execute_theme_set_command(ctx: &AppContext, edits: ThemeEdits) -> Result<(), ForgeError> {
    let mut lock = ctx.session_lock()?;
    let _guard = ctx.acquire(&mut lock)?;

    let mut session = ctx.store.load()?;
    edits.apply(&mut session.theme);
    ctx.store.save(&session)?;

    println!("✓ Theme updated\n");
    print_theme(&session.theme);
    Ok(())
}

pub(super) fn print_theme(theme: &Theme) {
    let or_unset = |s: &str| if s.trim().is_empty() { "(unset)".to_string() } else { s.to_string() };
    println!("  Title:       {}", or_unset(&theme.title));
    println!("  Set name:    {}", or_unset(&theme.set_name));
    println!("  Description: {}", or_unset(&theme.description));
    println!("  Factions:    {}", or_unset(&theme.factions));
    println!("  Locations:   {}", or_unset(&theme.locations));
    println!("  Resources:   {}", or_unset(&theme.resources));
}
