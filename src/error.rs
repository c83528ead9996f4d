use color_eyre::eyre::Result;

/// Installs color-eyre report and panic hooks.
pub fn install_hooks() -> Result<()> {
    let hook_builder = color_eyre::config::HookBuilder::default().display_env_section(false);
    let (panic_hook, eyre_hook) = hook_builder.into_hooks();
    eyre_hook.install()?;
    panic_hook.install();
    Ok(())
}
